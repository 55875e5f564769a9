use std::collections::HashSet;
use std::path::Path;

use crate::diagnostics::{ConfigValidationError, ConfigWarning, ValidationDiagnostics};
use crate::{LoggingConfig, NovaConfig};

/// Context for semantic config validation.
///
/// Checking that annotation roots exist requires a base directory for relative paths; callers
/// loading from a file provide the directory containing it.
#[derive(Debug, Clone, Copy, Default)]
pub struct ConfigValidationContext<'a> {
    /// Directory containing the loaded config file.
    pub config_dir: Option<&'a Path>,
}

impl NovaConfig {
    /// Validate semantic invariants for a configuration.
    ///
    /// Validation is best-effort: it attempts to report as many problems as possible in one pass.
    #[must_use]
    pub fn validate(&self) -> ValidationDiagnostics {
        self.validate_with_context(ConfigValidationContext::default())
    }

    /// Like [`NovaConfig::validate`] but able to resolve relative annotation root paths.
    #[must_use]
    pub fn validate_with_context(&self, ctx: ConfigValidationContext<'_>) -> ValidationDiagnostics {
        let mut out = ValidationDiagnostics::default();

        validate_nullability(self, &mut out);
        validate_external_annotations(self, ctx, &mut out);
        validate_logging(self, &mut out);

        out
    }
}

fn validate_nullability(config: &NovaConfig, out: &mut ValidationDiagnostics) {
    let nullability = &config.nullability;

    for (toml_path, names, default_path, default) in [
        (
            "nullability.not_null",
            &nullability.not_null,
            "nullability.default_not_null",
            &nullability.default_not_null,
        ),
        (
            "nullability.nullable",
            &nullability.nullable,
            "nullability.default_nullable",
            &nullability.default_nullable,
        ),
    ] {
        if names.is_empty() {
            out.warnings.push(ConfigWarning::NullabilityListEmpty {
                toml_path: toml_path.to_string(),
            });
        } else if !names.contains(default) {
            out.errors.push(ConfigValidationError::DefaultNotRecognized {
                toml_path: default_path.to_string(),
                name: default.clone(),
            });
        }

        let mut seen = HashSet::new();
        for (idx, name) in names.iter().enumerate() {
            if name.trim().is_empty() {
                out.errors.push(ConfigValidationError::InvalidValue {
                    toml_path: format!("{toml_path}[{idx}]"),
                    message: "annotation name must not be empty".to_string(),
                });
            } else if !seen.insert(name.as_str()) {
                out.warnings.push(ConfigWarning::DuplicateName {
                    toml_path: format!("{toml_path}[{idx}]"),
                    name: name.clone(),
                });
            }
        }
    }

    let not_null: HashSet<&str> = nullability.not_null.iter().map(String::as_str).collect();
    let mut reported = HashSet::new();
    for name in &nullability.nullable {
        if not_null.contains(name.as_str()) && reported.insert(name.as_str()) {
            out.errors.push(ConfigValidationError::NameInBothLists { name: name.clone() });
        }
    }
}

fn validate_external_annotations(
    config: &NovaConfig,
    ctx: ConfigValidationContext<'_>,
    out: &mut ValidationDiagnostics,
) {
    for (idx, root) in config.external_annotations.roots.iter().enumerate() {
        if root.owner.trim().is_empty() {
            out.errors.push(ConfigValidationError::InvalidValue {
                toml_path: format!("external_annotations.roots[{idx}].owner"),
                message: "must not be empty".to_string(),
            });
        }

        let resolved = if root.path.is_absolute() {
            root.path.clone()
        } else if let Some(base_dir) = ctx.config_dir {
            base_dir.join(&root.path)
        } else {
            continue;
        };
        let toml_path = format!("external_annotations.roots[{idx}].path");
        if !resolved.exists() {
            // Writable roots are created on first write.
            if root.read_only {
                out.warnings
                    .push(ConfigWarning::ExternalAnnotationRootMissing { toml_path, resolved });
            }
            continue;
        }
        if !resolved.is_dir() {
            out.warnings
                .push(ConfigWarning::ExternalAnnotationRootNotDirectory { toml_path, resolved });
        }
    }
}

fn validate_logging(config: &NovaConfig, out: &mut ValidationDiagnostics) {
    let normalized = LoggingConfig::normalize_level_directives(&config.logging.level);
    if !config.logging.level.trim().is_empty()
        && tracing_subscriber::EnvFilter::try_new(normalized.clone()).is_err()
    {
        out.warnings.push(ConfigWarning::LoggingLevelInvalid {
            value: config.logging.level.clone(),
            normalized,
        });
    }
}
