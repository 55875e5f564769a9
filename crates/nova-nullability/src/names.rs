use nova_annotations::AnnotationRecord;
use nova_config::NullabilityConfig;

use crate::verdict::Nullability;

/// Recognized nullability annotation names, fixed for the lifetime of one engine configuration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NullabilityNames {
    not_null: Vec<String>,
    nullable: Vec<String>,
    default_not_null: String,
    default_nullable: String,
}

impl NullabilityNames {
    /// `default_not_null`/`default_nullable` are added to their lists if missing.
    pub fn new(
        not_null: Vec<String>,
        nullable: Vec<String>,
        default_not_null: impl Into<String>,
        default_nullable: impl Into<String>,
    ) -> Self {
        let mut names = Self {
            not_null,
            nullable,
            default_not_null: default_not_null.into(),
            default_nullable: default_nullable.into(),
        };
        if !names.not_null.contains(&names.default_not_null) {
            names.not_null.insert(0, names.default_not_null.clone());
        }
        if !names.nullable.contains(&names.default_nullable) {
            names.nullable.insert(0, names.default_nullable.clone());
        }
        names
    }

    pub fn not_null(&self) -> &[String] {
        &self.not_null
    }

    pub fn nullable(&self) -> &[String] {
        &self.nullable
    }

    pub fn list(&self, nullability: Nullability) -> &[String] {
        match nullability {
            Nullability::NotNull => &self.not_null,
            Nullability::Nullable => &self.nullable,
            Nullability::Unknown => &[],
        }
    }

    /// Annotation written when marking a declaration with `nullability`.
    pub fn default_for(&self, nullability: Nullability) -> Option<&str> {
        match nullability {
            Nullability::NotNull => Some(&self.default_not_null),
            Nullability::Nullable => Some(&self.default_nullable),
            Nullability::Unknown => None,
        }
    }

    /// Which list `qualified_name` is in. The not-null list is checked first.
    pub fn classify(&self, qualified_name: &str) -> Option<Nullability> {
        if self.not_null.iter().any(|n| n == qualified_name) {
            Some(Nullability::NotNull)
        } else if self.nullable.iter().any(|n| n == qualified_name) {
            Some(Nullability::Nullable)
        } else {
            None
        }
    }

    pub fn is_recognized(&self, record: &AnnotationRecord) -> bool {
        self.classify(&record.qualified_name).is_some()
    }
}

impl From<&NullabilityConfig> for NullabilityNames {
    fn from(config: &NullabilityConfig) -> Self {
        NullabilityNames::new(
            config.not_null.clone(),
            config.nullable.clone(),
            config.default_not_null.clone(),
            config.default_nullable.clone(),
        )
    }
}

impl Default for NullabilityNames {
    fn default() -> Self {
        NullabilityNames::from(&NullabilityConfig::default())
    }
}
