//! Default nullability declared on enclosing containers.

use std::collections::HashSet;
use std::sync::Arc;

use nova_annotations::{constant_name, AnnotationRecord, Declaration};

use crate::element::ElementKinds;
use crate::meta::{MetaAnnotationResolver, TYPE_QUALIFIER_DEFAULT};
use crate::model::{Container, ContainerAnnotations, ProgramModel};
use crate::verdict::{Nullability, NullabilityVerdict, VerdictSource};

pub const JSPECIFY_NULL_MARKED: &str = "org.jspecify.annotations.NullMarked";
pub const JSPECIFY_NULL_UNMARKED: &str = "org.jspecify.annotations.NullUnmarked";
pub const ECLIPSE_NON_NULL_BY_DEFAULT: &str = "org.eclipse.jdt.annotation.NonNullByDefault";
pub const SPRING_NON_NULL_API: &str = "org.springframework.lang.NonNullApi";
pub const SPRING_NON_NULL_FIELDS: &str = "org.springframework.lang.NonNullFields";

/// Bounds the container walk when a model reports a containment cycle.
const MAX_CONTAINER_DEPTH: usize = 256;

pub struct NullabilityDefaultResolver {
    model: Arc<dyn ProgramModel>,
    meta: Arc<MetaAnnotationResolver>,
}

impl NullabilityDefaultResolver {
    pub fn new(model: Arc<dyn ProgramModel>, meta: Arc<MetaAnnotationResolver>) -> Self {
        Self { model, meta }
    }

    /// Walks outward from `decl`'s innermost container; the first container with an applicable
    /// default decides.
    pub fn resolve(&self, decl: &Declaration, kinds: ElementKinds) -> Option<NullabilityVerdict> {
        if kinds.is_empty() {
            return None;
        }

        let mut seen = HashSet::new();
        let mut next = self.model.enclosing_container(decl);
        while let Some(container) = next {
            if seen.len() >= MAX_CONTAINER_DEPTH || !seen.insert(container.clone()) {
                tracing::debug!(
                    target = "nova.nullability",
                    decl = decl.id.to_raw(),
                    ?container,
                    "container chain loops; stopping default lookup"
                );
                return None;
            }
            if let Some(verdict) = self.container_default(&container, kinds, decl) {
                return Some(verdict);
            }
            next = self.model.enclosing_container_of(&container);
        }
        None
    }

    /// Default declared directly on `container` for any of `kinds`, as seen from `decl`.
    ///
    /// Package annotations declared in another file only count when that file is in the same
    /// classpath/source root as `decl`.
    pub fn container_default(
        &self,
        container: &Container,
        kinds: ElementKinds,
        decl: &Declaration,
    ) -> Option<NullabilityVerdict> {
        let is_package = matches!(container, Container::Package { .. });
        self.model
            .container_annotations(container)
            .iter()
            .filter(|entry| !is_package || visible_from(entry, decl))
            .flat_map(|entry| entry.annotations.iter())
            .find_map(|record| self.annotation_default(record, kinds))
    }

    fn annotation_default(
        &self,
        record: &AnnotationRecord,
        kinds: ElementKinds,
    ) -> Option<NullabilityVerdict> {
        if let Some((targets, value)) = well_known_default(record) {
            return targets
                .intersects(kinds)
                .then(|| NullabilityVerdict::new(value, VerdictSource::ContainerDefault));
        }

        let meta = self.model.annotation_type_annotations(&record.qualified_name);
        let qualifier_default = meta.iter().find(|m| m.has_name(TYPE_QUALIFIER_DEFAULT))?;
        let targets = ElementKinds::from_element_types(qualifier_default.attribute_values("value"));
        if !targets.intersects(kinds) {
            return None;
        }
        let value = self.meta.type_qualifier(&record.qualified_name)?;
        Some(NullabilityVerdict::new(value, VerdictSource::MetaDefault))
    }
}

fn visible_from(entry: &ContainerAnnotations, decl: &Declaration) -> bool {
    (entry.file.is_some() && entry.file == decl.file) || entry.source_root == decl.source_root
}

fn well_known_default(record: &AnnotationRecord) -> Option<(ElementKinds, Nullability)> {
    match record.qualified_name.as_str() {
        JSPECIFY_NULL_MARKED => Some((ElementKinds::ALL, Nullability::NotNull)),
        JSPECIFY_NULL_UNMARKED => Some((ElementKinds::ALL, Nullability::Unknown)),
        ECLIPSE_NON_NULL_BY_DEFAULT => Some(eclipse_default(record)),
        SPRING_NON_NULL_API => Some((
            ElementKinds::PARAMETER | ElementKinds::METHOD,
            Nullability::NotNull,
        )),
        SPRING_NON_NULL_FIELDS => Some((ElementKinds::FIELD, Nullability::NotNull)),
        _ => None,
    }
}

/// `@NonNullByDefault`, `@NonNullByDefault({PARAMETER, RETURN_TYPE})`, or the 1.x
/// `@NonNullByDefault(false)` that cancels an outer default.
fn eclipse_default(record: &AnnotationRecord) -> (ElementKinds, Nullability) {
    let values = record.attribute_values("value");
    if values.iter().any(|v| v.trim() == "false") {
        return (ElementKinds::ALL, Nullability::Unknown);
    }

    let mut targets = ElementKinds::EMPTY;
    let mut any = false;
    for value in values {
        if value.trim() == "true" {
            continue;
        }
        any = true;
        targets |= match constant_name(value) {
            "PARAMETER" => ElementKinds::PARAMETER,
            "RETURN_TYPE" => ElementKinds::METHOD,
            "FIELD" => ElementKinds::FIELD,
            "TYPE_PARAMETER" | "TYPE_BOUND" | "TYPE_ARGUMENT" | "ARRAY_CONTENTS" => {
                ElementKinds::TYPE_USE
            }
            _ => ElementKinds::EMPTY,
        };
    }
    if !any {
        targets = ElementKinds::PARAMETER
            | ElementKinds::METHOD
            | ElementKinds::FIELD
            | ElementKinds::TYPE_USE;
    }
    (targets, Nullability::NotNull)
}
