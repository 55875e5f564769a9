//! In-memory program model for engine tests.

use std::collections::HashMap;
use std::path::Path;
use std::sync::Arc;

use nova_annotations::{
    AnnotationRecord, AnnotationRoot, AnnotationStore, ClassRef, DeclId, Declaration,
    DeclarationKind, FileId, InvalidationTracker, MethodRef, OwnerId, SourceRootId,
};
use nova_nullability::{
    Container, ContainerAnnotations, NullabilityEngine, NullabilityNames, ProgramModel,
    SearchScope,
};
use parking_lot::RwLock;

pub(crate) const LIB_ROOT: SourceRootId = SourceRootId::from_raw(1);
pub(crate) const OTHER_ROOT: SourceRootId = SourceRootId::from_raw(2);

#[derive(Default)]
pub(crate) struct Model {
    inner: RwLock<Inner>,
}

#[derive(Default)]
struct Inner {
    next_id: u32,
    decls: HashMap<DeclId, Declaration>,
    containers: HashMap<DeclId, Container>,
    present: HashMap<DeclId, Vec<AnnotationRecord>>,
    container_annotations: HashMap<Container, Vec<ContainerAnnotations>>,
    /// Annotation type -> (root it is declared in, annotations on the type).
    annotation_types: HashMap<String, (Option<SourceRootId>, Vec<AnnotationRecord>)>,
    /// Counts calls into the model so tests can observe cache hits.
    queries: usize,
}

impl Model {
    pub(crate) fn new() -> Arc<Model> {
        Arc::new(Model::default())
    }

    fn insert(&self, kind: DeclarationKind, root: SourceRootId, container: Container) -> Declaration {
        let mut inner = self.inner.write();
        inner.next_id += 1;
        let id = DeclId::from_raw(inner.next_id);
        let file = match &container {
            Container::Class(outer) | Container::Method(outer) => inner.decls[outer].file,
            Container::Package { .. } => Some(FileId::from_raw(inner.next_id)),
        };
        let mut decl = Declaration::new(id, kind)
            .with_owner("lib")
            .with_source_root(root);
        decl.file = file;
        inner.decls.insert(id, decl.clone());
        inner.containers.insert(id, container);
        decl
    }

    pub(crate) fn add_class(&self, package: &str, name: &str) -> Declaration {
        self.add_class_in(package, name, LIB_ROOT)
    }

    /// A top-level class with its own file in `root`.
    pub(crate) fn add_class_in(&self, package: &str, name: &str, root: SourceRootId) -> Declaration {
        self.insert(
            DeclarationKind::Class(ClassRef::named(package, name)),
            root,
            Container::package(package),
        )
    }

    pub(crate) fn add_method(&self, class: &Declaration, name: &str, params: &[&str]) -> Declaration {
        let method = MethodRef::new(class.kind.class().clone(), name, params.iter().copied());
        self.insert(
            DeclarationKind::Method(method),
            source_root(class),
            Container::Class(class.id),
        )
    }

    pub(crate) fn add_field(&self, class: &Declaration, name: &str) -> Declaration {
        self.insert(
            DeclarationKind::Field {
                class: class.kind.class().clone(),
                name: name.to_string(),
            },
            source_root(class),
            Container::Class(class.id),
        )
    }

    pub(crate) fn add_parameter(&self, method: &Declaration, index: u32) -> Declaration {
        let DeclarationKind::Method(method_ref) = &method.kind else {
            panic!("not a method: {method:?}");
        };
        self.insert(
            DeclarationKind::Parameter {
                method: method_ref.clone(),
                index,
            },
            source_root(method),
            Container::Method(method.id),
        )
    }

    /// Adds an annotation written in code on `decl`.
    pub(crate) fn annotate(&self, decl: &Declaration, record: AnnotationRecord) {
        self.inner
            .write()
            .present
            .entry(decl.id)
            .or_default()
            .push(record);
    }

    /// Adds annotations on `container` as declared in `file` of `root`.
    pub(crate) fn annotate_container(
        &self,
        container: Container,
        file: Option<FileId>,
        root: Option<SourceRootId>,
        annotations: Vec<AnnotationRecord>,
    ) {
        self.inner
            .write()
            .container_annotations
            .entry(container)
            .or_default()
            .push(ContainerAnnotations {
                file,
                source_root: root,
                annotations,
            });
    }

    /// Declares an annotation type visible from every root.
    pub(crate) fn add_annotation_type(&self, qualified_name: &str, meta: Vec<AnnotationRecord>) {
        self.inner
            .write()
            .annotation_types
            .insert(qualified_name.to_string(), (None, meta));
    }

    pub(crate) fn add_annotation_type_in(
        &self,
        qualified_name: &str,
        root: SourceRootId,
        meta: Vec<AnnotationRecord>,
    ) {
        self.inner
            .write()
            .annotation_types
            .insert(qualified_name.to_string(), (Some(root), meta));
    }

    pub(crate) fn queries(&self) -> usize {
        self.inner.read().queries
    }
}

fn source_root(decl: &Declaration) -> SourceRootId {
    decl.source_root.unwrap_or(LIB_ROOT)
}

impl ProgramModel for Model {
    fn declaration(&self, id: DeclId) -> Option<Declaration> {
        self.inner.read().decls.get(&id).cloned()
    }

    fn enclosing_container(&self, decl: &Declaration) -> Option<Container> {
        self.inner.read().containers.get(&decl.id).cloned()
    }

    fn annotations_present(&self, decl: &Declaration) -> Vec<AnnotationRecord> {
        let mut inner = self.inner.write();
        inner.queries += 1;
        inner.present.get(&decl.id).cloned().unwrap_or_default()
    }

    fn container_annotations(&self, container: &Container) -> Vec<ContainerAnnotations> {
        self.inner
            .read()
            .container_annotations
            .get(container)
            .cloned()
            .unwrap_or_default()
    }

    fn annotation_type_annotations(&self, qualified_name: &str) -> Vec<AnnotationRecord> {
        self.inner
            .read()
            .annotation_types
            .get(qualified_name)
            .map(|(_, meta)| meta.clone())
            .unwrap_or_default()
    }

    fn annotation_types_annotated_with(&self, marker: &str, scope: SearchScope) -> Vec<String> {
        self.inner
            .read()
            .annotation_types
            .iter()
            .filter(|(_, (root, meta))| {
                let visible = match (scope, root) {
                    (SearchScope::Project, _) | (_, None) => true,
                    (SearchScope::Root(scope), Some(root)) => scope == *root,
                };
                visible && meta.iter().any(|m| m.has_name(marker))
            })
            .map(|(name, _)| name.clone())
            .collect()
    }
}

pub(crate) struct Env {
    pub(crate) model: Arc<Model>,
    pub(crate) store: Arc<AnnotationStore>,
    pub(crate) root: Arc<AnnotationRoot>,
    pub(crate) engine: NullabilityEngine,
}

/// A model, a store with one writable root for owner `lib` at `dir`, and an engine over both
/// using the default recognized names.
pub(crate) fn env(dir: &Path) -> Env {
    env_with(dir, |builder| builder)
}

pub(crate) fn env_with(
    dir: &Path,
    configure: impl FnOnce(nova_nullability::NullabilityEngineBuilder) -> nova_nullability::NullabilityEngineBuilder,
) -> Env {
    let model = Model::new();
    let store = Arc::new(AnnotationStore::new(Arc::new(InvalidationTracker::new())));
    let root = store.register_root(OwnerId::new("lib"), dir, true);
    let builder = NullabilityEngine::builder(
        model.clone(),
        Arc::clone(&store),
        NullabilityNames::default(),
    );
    let engine = configure(builder).build();
    Env {
        model,
        store,
        root,
        engine,
    }
}
