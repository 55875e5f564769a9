//! JSR-305 style meta-annotations.
//!
//! A *nickname* is an annotation type marked `@TypeQualifierNickname` whose own annotations
//! (directly, or through further nicknames) include a nullability qualifier:
//!
//! ```java
//! @Nonnull(when = When.MAYBE)
//! @TypeQualifierNickname
//! public @interface MaybeNull {}
//! ```

use std::collections::HashMap;
use std::collections::HashSet;
use std::sync::Arc;

use nova_annotations::{constant_name, AnnotationRecord, InvalidationTracker, Tracked};
use parking_lot::RwLock;

use crate::model::{ProgramModel, SearchScope};
use crate::names::NullabilityNames;
use crate::verdict::{Nullability, NullabilityVerdict, VerdictSource};

pub const JSR305_NONNULL: &str = "javax.annotation.Nonnull";
pub const TYPE_QUALIFIER_NICKNAME: &str = "javax.annotation.meta.TypeQualifierNickname";
pub const TYPE_QUALIFIER_DEFAULT: &str = "javax.annotation.meta.TypeQualifierDefault";

pub struct MetaAnnotationResolver {
    model: Arc<dyn ProgramModel>,
    tracker: Arc<InvalidationTracker>,
    names: RwLock<Arc<NullabilityNames>>,
    nicknames: RwLock<HashMap<SearchScope, Tracked<Arc<[String]>>>>,
}

impl std::fmt::Debug for MetaAnnotationResolver {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MetaAnnotationResolver")
            .field("cached_scopes", &self.nicknames.read().len())
            .finish_non_exhaustive()
    }
}

impl MetaAnnotationResolver {
    pub fn new(
        model: Arc<dyn ProgramModel>,
        tracker: Arc<InvalidationTracker>,
        names: Arc<NullabilityNames>,
    ) -> Self {
        Self {
            model,
            tracker,
            names: RwLock::new(names),
            nicknames: RwLock::new(HashMap::new()),
        }
    }

    pub(crate) fn set_names(&self, names: Arc<NullabilityNames>) {
        *self.names.write() = names;
        self.nicknames.write().clear();
    }

    /// Nullability stated by an annotation usage whose type is in the configured lists.
    ///
    /// A `when` argument overrides the list the annotation is in: `ALWAYS` is not-null, `MAYBE`
    /// and `NEVER` are nullable, anything else is unknown.
    pub fn nullability_of(&self, record: &AnnotationRecord) -> Option<Nullability> {
        let listed = self.names.read().classify(&record.qualified_name)?;
        Some(with_when(record, listed))
    }

    /// Like [`Self::nullability_of`], but a bare `javax.annotation.Nonnull` on a nickname or
    /// qualifier default counts even when it is not configured.
    fn qualifier_of(&self, record: &AnnotationRecord) -> Option<Nullability> {
        match self.nullability_of(record) {
            Some(nullability) => Some(nullability),
            None if record.has_name(JSR305_NONNULL) => {
                Some(with_when(record, Nullability::NotNull))
            }
            None => None,
        }
    }

    /// Resolves the nickname `annotation_type` to the nullability it stands for.
    ///
    /// Returns `None` for types that are not nicknames, nicknames without a qualifier, and
    /// nicknames that only refer to each other.
    pub fn resolve_nickname(&self, annotation_type: &str) -> Option<NullabilityVerdict> {
        let mut visited = HashSet::new();
        let value = self.nickname_qualifier(annotation_type, &mut visited)?;
        Some(NullabilityVerdict {
            value,
            source: VerdictSource::None,
            from_nickname: true,
        })
    }

    /// Nullability carried by the annotations on `annotation_type` itself, following nicknames.
    /// Used for `TypeQualifierDefault` annotations, which need not be nicknames.
    pub fn type_qualifier(&self, annotation_type: &str) -> Option<Nullability> {
        let mut visited = HashSet::new();
        visited.insert(annotation_type.to_string());
        let meta = self.model.annotation_type_annotations(annotation_type);
        self.qualifier_among(&meta, &mut visited)
    }

    fn nickname_qualifier(
        &self,
        annotation_type: &str,
        visited: &mut HashSet<String>,
    ) -> Option<Nullability> {
        if !visited.insert(annotation_type.to_string()) {
            return None;
        }
        let meta = self.model.annotation_type_annotations(annotation_type);
        if !meta.iter().any(|m| m.has_name(TYPE_QUALIFIER_NICKNAME)) {
            return None;
        }
        self.qualifier_among(&meta, visited)
    }

    fn qualifier_among(
        &self,
        meta: &[AnnotationRecord],
        visited: &mut HashSet<String>,
    ) -> Option<Nullability> {
        for record in meta {
            if record.has_name(TYPE_QUALIFIER_NICKNAME) || record.has_name(TYPE_QUALIFIER_DEFAULT)
            {
                continue;
            }
            if let Some(nullability) = self.qualifier_of(record) {
                return Some(nullability);
            }
        }
        // Depth-first through nicknames only once no direct qualifier is present.
        for record in meta {
            if let Some(nullability) = self.nickname_qualifier(&record.qualified_name, visited) {
                return Some(nullability);
            }
        }
        None
    }

    /// Every nickname type visible in `scope` that resolves to a nullability.
    ///
    /// Cached per scope until the invalidation tracker advances.
    pub fn nicknames(&self, scope: SearchScope) -> Arc<[String]> {
        if let Some(cached) = self
            .nicknames
            .read()
            .get(&scope)
            .and_then(|tracked| tracked.get_if_fresh(&self.tracker))
        {
            return cached.clone();
        }

        let stamp = self.tracker.stamp();
        let mut found: Vec<String> = self
            .model
            .annotation_types_annotated_with(TYPE_QUALIFIER_NICKNAME, scope)
            .into_iter()
            .filter(|ty| self.resolve_nickname(ty).is_some())
            .collect();
        found.sort();
        found.dedup();
        let found: Arc<[String]> = found.into();

        let mut cache = self.nicknames.write();
        cache.retain(|_, tracked| self.tracker.is_current(tracked.stamp));
        if self.tracker.is_current(stamp) {
            cache.insert(scope, Tracked::new(found.clone(), stamp));
        }
        found
    }
}

fn with_when(record: &AnnotationRecord, listed: Nullability) -> Nullability {
    match record.attribute("when") {
        Some(when) => match constant_name(when) {
            "ALWAYS" => Nullability::NotNull,
            "MAYBE" | "NEVER" => Nullability::Nullable,
            _ => Nullability::Unknown,
        },
        None => listed,
    }
}
