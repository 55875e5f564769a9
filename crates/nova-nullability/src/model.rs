//! What the engine needs from the host's program model.

use nova_annotations::{AnnotationRecord, DeclId, Declaration, FileId, SourceRootId};

use crate::verdict::NullabilityVerdict;

/// Something that can carry default-nullability annotations.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Container {
    Method(DeclId),
    Class(DeclId),
    Package { name: String },
}

impl Container {
    pub fn package(name: impl Into<String>) -> Self {
        Container::Package { name: name.into() }
    }
}

/// Annotations found on one physical declaration of a container. A package may be declared in
/// several `package-info` files across roots, so lookups return one entry per file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ContainerAnnotations {
    pub file: Option<FileId>,
    pub source_root: Option<SourceRootId>,
    pub annotations: Vec<AnnotationRecord>,
}

/// Where annotation types are looked up from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SearchScope {
    Project,
    /// Types visible from one classpath/source root.
    Root(SourceRootId),
}

impl SearchScope {
    pub fn of(decl: &Declaration) -> SearchScope {
        decl.source_root.map_or(SearchScope::Project, SearchScope::Root)
    }
}

pub trait ProgramModel: Send + Sync {
    fn declaration(&self, id: DeclId) -> Option<Declaration>;

    /// Innermost container of `decl`: a parameter's method, a member's class, a nested class's
    /// outer class, a top-level class's package.
    fn enclosing_container(&self, decl: &Declaration) -> Option<Container>;

    /// Next container outward. Packages continue with their parent package; top-level packages
    /// have none.
    fn enclosing_container_of(&self, container: &Container) -> Option<Container> {
        match container {
            Container::Method(id) | Container::Class(id) => {
                let decl = self.declaration(*id)?;
                self.enclosing_container(&decl)
            }
            Container::Package { name } => {
                let (parent, _) = name.rsplit_once('.')?;
                Some(Container::package(parent))
            }
        }
    }

    fn is_writable(&self, decl: &Declaration) -> bool {
        decl.writable
    }

    /// Annotations written on `decl` in code, in source order.
    fn annotations_present(&self, decl: &Declaration) -> Vec<AnnotationRecord>;

    fn container_annotations(&self, container: &Container) -> Vec<ContainerAnnotations>;

    /// Annotations applied to the annotation type `qualified_name`. Empty when the type cannot be
    /// resolved.
    fn annotation_type_annotations(&self, qualified_name: &str) -> Vec<AnnotationRecord>;

    /// Annotation types visible in `scope` that are annotated with `marker`.
    fn annotation_types_annotated_with(&self, marker: &str, scope: SearchScope) -> Vec<String>;
}

/// Source-level nullability inference, consulted after explicit and external annotations.
pub trait InferenceProvider: Send + Sync {
    fn id(&self) -> &str;

    fn inferred_nullability(&self, decl: &Declaration) -> Option<NullabilityVerdict>;
}
