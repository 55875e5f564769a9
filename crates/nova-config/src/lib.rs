use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::sync::{Once, OnceLock};

use parking_lot::ReentrantMutex;
use thiserror::Error;
use tracing_subscriber::fmt::writer::BoxMakeWriter;
use tracing_subscriber::prelude::*;

mod diagnostics;
mod schema;
mod validation;

pub use diagnostics::{
    ConfigDiagnostics, ConfigValidationError, ConfigWarning, ValidationDiagnostics,
};
pub use schema::json_schema;
pub use validation::ConfigValidationContext;

/// Top-level `nova.toml` contents.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize, JsonSchema)]
#[schemars(deny_unknown_fields)]
pub struct NovaConfig {
    /// Annotation types recognized as nullability annotations.
    #[serde(default)]
    pub nullability: NullabilityConfig,

    /// External annotation roots registered at startup.
    #[serde(default)]
    pub external_annotations: ExternalAnnotationsConfig,

    /// Global logging settings for Nova crates.
    #[serde(default)]
    pub logging: LoggingConfig,
}

const JETBRAINS_NOT_NULL: &str = "org.jetbrains.annotations.NotNull";
const JETBRAINS_NULLABLE: &str = "org.jetbrains.annotations.Nullable";

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[schemars(deny_unknown_fields)]
pub struct NullabilityConfig {
    /// Qualified names of annotations meaning "never null", in priority order.
    #[serde(default = "NullabilityConfig::default_not_null_names")]
    pub not_null: Vec<String>,

    /// Qualified names of annotations meaning "may be null", in priority order.
    #[serde(default = "NullabilityConfig::default_nullable_names")]
    pub nullable: Vec<String>,

    /// Annotation written when a declaration is marked not-null. Must be listed in `not_null`.
    #[serde(default = "NullabilityConfig::default_not_null")]
    pub default_not_null: String,

    /// Annotation written when a declaration is marked nullable. Must be listed in `nullable`.
    #[serde(default = "NullabilityConfig::default_nullable")]
    pub default_nullable: String,
}

impl NullabilityConfig {
    fn default_not_null_names() -> Vec<String> {
        [
            JETBRAINS_NOT_NULL,
            "javax.annotation.Nonnull",
            "org.jspecify.annotations.NonNull",
            "androidx.annotation.NonNull",
            "android.support.annotation.NonNull",
            "org.checkerframework.checker.nullness.qual.NonNull",
            "edu.umd.cs.findbugs.annotations.NonNull",
            "jakarta.annotation.Nonnull",
            "lombok.NonNull",
        ]
        .into_iter()
        .map(str::to_owned)
        .collect()
    }

    fn default_nullable_names() -> Vec<String> {
        [
            JETBRAINS_NULLABLE,
            "javax.annotation.Nullable",
            "javax.annotation.CheckForNull",
            "org.jspecify.annotations.Nullable",
            "androidx.annotation.Nullable",
            "android.support.annotation.Nullable",
            "org.checkerframework.checker.nullness.qual.Nullable",
            "edu.umd.cs.findbugs.annotations.Nullable",
            "edu.umd.cs.findbugs.annotations.CheckForNull",
            "jakarta.annotation.Nullable",
        ]
        .into_iter()
        .map(str::to_owned)
        .collect()
    }

    fn default_not_null() -> String {
        JETBRAINS_NOT_NULL.to_owned()
    }

    fn default_nullable() -> String {
        JETBRAINS_NULLABLE.to_owned()
    }
}

impl Default for NullabilityConfig {
    fn default() -> Self {
        Self {
            not_null: Self::default_not_null_names(),
            nullable: Self::default_nullable_names(),
            default_not_null: Self::default_not_null(),
            default_nullable: Self::default_nullable(),
        }
    }
}

#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[schemars(deny_unknown_fields)]
pub struct ExternalAnnotationsConfig {
    #[serde(default)]
    pub roots: Vec<ExternalAnnotationRootConfig>,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[schemars(deny_unknown_fields)]
pub struct ExternalAnnotationRootConfig {
    /// Library, SDK or module the annotations describe.
    pub owner: String,

    /// Directory holding per-package `annotations.xml` files (relative to the config file unless
    /// absolute).
    #[schemars(with = "String")]
    pub path: PathBuf,

    /// Never write into this root.
    #[serde(default)]
    pub read_only: bool,
}

impl ExternalAnnotationsConfig {
    fn resolve_paths(&mut self, base_dir: &Path) {
        for root in &mut self.roots {
            if root.path.is_relative() {
                root.path = base_dir.join(&root.path);
            }
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
#[schemars(deny_unknown_fields)]
pub struct LoggingConfig {
    /// Logging level for all Nova crates.
    #[serde(default = "LoggingConfig::default_level")]
    pub level: String,

    /// Emit logs in JSON format.
    #[serde(default)]
    pub json: bool,

    /// Write logs to stderr.
    #[serde(default = "LoggingConfig::default_stderr")]
    pub stderr: bool,
}

impl LoggingConfig {
    fn default_level() -> String {
        "info".to_owned()
    }

    fn default_stderr() -> bool {
        true
    }

    pub(crate) fn normalize_level_directives(input: &str) -> String {
        let trimmed = input.trim();
        if trimmed.is_empty() {
            return Self::default_level();
        }

        match trimmed.to_ascii_lowercase().as_str() {
            // Simple levels should be forgiving about casing and synonyms.
            "trace" => "trace".to_owned(),
            "debug" => "debug".to_owned(),
            "info" => "info".to_owned(),
            "warn" | "warning" => "warn".to_owned(),
            "error" => "error".to_owned(),
            // Anything else is treated as an `EnvFilter` directive string.
            _ => trimmed.to_owned(),
        }
    }

    fn config_env_filter(&self) -> tracing_subscriber::EnvFilter {
        let directives = Self::normalize_level_directives(&self.level);
        tracing_subscriber::EnvFilter::try_new(directives).unwrap_or_else(|_| {
            tracing_subscriber::EnvFilter::default()
                .add_directive(tracing_subscriber::filter::LevelFilter::INFO.into())
        })
    }

    /// Create the effective `EnvFilter` for Nova tracing.
    ///
    /// `LoggingConfig.level` may be either a simple level (`info`, `debug`, ...)
    /// or a full `tracing_subscriber::EnvFilter` directive string.
    ///
    /// If `RUST_LOG` is set, it is merged into the resulting filter.
    pub fn env_filter(&self) -> tracing_subscriber::EnvFilter {
        let env_directives = std::env::var("RUST_LOG")
            .ok()
            .map(|value| value.trim().to_owned())
            .filter(|value| !value.is_empty());

        let config_directives = Self::normalize_level_directives(&self.level);

        match env_directives {
            Some(env_directives) => {
                let combined = format!("{config_directives},{env_directives}");
                tracing_subscriber::EnvFilter::try_new(combined)
                    .or_else(|_| tracing_subscriber::EnvFilter::try_new(env_directives))
                    .unwrap_or_else(|_| self.config_env_filter())
            }
            None => self.config_env_filter(),
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: Self::default_level(),
            json: false,
            stderr: Self::default_stderr(),
        }
    }
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config file {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to parse toml config: {0}")]
    Toml(String),
}

impl From<toml::de::Error> for ConfigError {
    fn from(err: toml::de::Error) -> Self {
        // `toml::de::Error`'s `Display` embeds a source snippet; keep logs to the message only.
        ConfigError::Toml(err.message().to_owned())
    }
}

impl NovaConfig {
    /// Load a config from a TOML string. Relative root paths are left as written.
    pub fn load_from_str(text: &str) -> Result<Self, ConfigError> {
        Ok(toml::from_str(text)?)
    }

    /// Load a config file from TOML. Relative root paths are resolved against the file's
    /// directory.
    pub fn load_from_path(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let text = read_config(path)?;
        let mut config = Self::load_from_str(&text)?;
        if let Some(dir) = path.parent() {
            config.external_annotations.resolve_paths(dir);
        }
        Ok(config)
    }

    /// Load a config file from TOML and return diagnostics (unknown keys and semantic
    /// validation failures).
    pub fn load_from_path_with_diagnostics(
        path: impl AsRef<Path>,
    ) -> Result<(Self, ConfigDiagnostics), ConfigError> {
        let path = path.as_ref();
        let text = read_config(path)?;

        let ctx = ConfigValidationContext {
            config_dir: path.parent(),
        };
        let (mut config, diagnostics) = Self::load_from_str_with_diagnostics_inner(&text, ctx)?;
        if let Some(dir) = path.parent() {
            config.external_annotations.resolve_paths(dir);
        }
        Ok((config, diagnostics))
    }

    /// Load a config from a TOML string and return diagnostics.
    pub fn load_from_str_with_diagnostics(
        text: &str,
    ) -> Result<(Self, ConfigDiagnostics), ConfigError> {
        Self::load_from_str_with_diagnostics_inner(text, ConfigValidationContext::default())
    }

    fn load_from_str_with_diagnostics_inner(
        text: &str,
        ctx: ConfigValidationContext<'_>,
    ) -> Result<(Self, ConfigDiagnostics), ConfigError> {
        let (config, unknown_keys) =
            diagnostics::deserialize_toml_with_unknown_keys::<NovaConfig>(text)?;

        let mut diagnostics = ConfigDiagnostics {
            unknown_keys,
            ..ConfigDiagnostics::default()
        };
        diagnostics.extend_validation(config.validate_with_context(ctx));

        Ok((config, diagnostics))
    }
}

fn read_config(path: &Path) -> Result<String, ConfigError> {
    std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
        path: path.display().to_string(),
        source,
    })
}

pub const NOVA_CONFIG_ENV_VAR: &str = "NOVA_CONFIG_PATH";

static CONFIG_ENV_LOCK: OnceLock<ReentrantMutex<()>> = OnceLock::new();

fn config_env_lock() -> &'static ReentrantMutex<()> {
    CONFIG_ENV_LOCK.get_or_init(|| ReentrantMutex::new(()))
}

/// Run `f` while holding Nova's config environment lock.
///
/// Environment variables are process-global; tests that set [`NOVA_CONFIG_ENV_VAR`] wrap the
/// mutation and the discovery call in this helper so concurrent discovery doesn't observe it.
pub fn with_config_env_lock<R>(f: impl FnOnce() -> R) -> R {
    let _guard = config_env_lock().lock();
    f()
}

/// Discover the Nova configuration file for a workspace root.
///
/// Search order:
/// 1) `NOVA_CONFIG_PATH` (absolute or relative to `workspace_root`)
/// 2) `nova.toml` in `workspace_root`
/// 3) `.nova.toml` in `workspace_root`
pub fn discover_config_path(workspace_root: &Path) -> Option<PathBuf> {
    let _guard = config_env_lock().lock();
    if let Some(value) = std::env::var_os(NOVA_CONFIG_ENV_VAR) {
        let candidate = PathBuf::from(value);
        let path = if candidate.is_absolute() {
            candidate
        } else {
            workspace_root.join(candidate)
        };
        return Some(path.canonicalize().unwrap_or(path));
    }

    ["nova.toml", ".nova.toml"]
        .into_iter()
        .map(|name| workspace_root.join(name))
        .find(|path| path.is_file())
        .map(|path| path.canonicalize().unwrap_or(path))
}

/// Load the Nova configuration for a workspace root.
///
/// If no config is present, returns [`NovaConfig::default`] and `None`.
pub fn load_for_workspace(
    workspace_root: &Path,
) -> Result<(NovaConfig, Option<PathBuf>), ConfigError> {
    let Some(path) = discover_config_path(workspace_root) else {
        return Ok((NovaConfig::default(), None));
    };

    let config = NovaConfig::load_from_path(&path)?;
    Ok((config, Some(path)))
}

static TRACING_INIT: Once = Once::new();

/// Initializes structured `tracing` logging.
///
/// This function is safe to call multiple times; only the first call installs a
/// global subscriber.
pub fn init_tracing(config: &LoggingConfig) {
    TRACING_INIT.call_once(|| {
        let filter = config.env_filter();

        let make_writer = if !config.stderr {
            BoxMakeWriter::new(std::io::sink)
        } else if cfg!(debug_assertions) {
            // `cargo test` output capture only works for the stdlib's `print!/eprint!` macros.
            BoxMakeWriter::new(tracing_subscriber::fmt::writer::TestWriter::with_stderr)
        } else {
            BoxMakeWriter::new(std::io::stderr)
        };

        let layer: Box<dyn tracing_subscriber::Layer<_> + Send + Sync> = if config.json {
            tracing_subscriber::fmt::layer()
                .json()
                .with_writer(make_writer)
                .with_ansi(false)
                .boxed()
        } else {
            tracing_subscriber::fmt::layer()
                .with_writer(make_writer)
                .with_ansi(false)
                .boxed()
        };

        let subscriber = tracing_subscriber::registry().with(filter).with(layer);
        if tracing::subscriber::set_global_default(subscriber).is_err() {
            tracing::debug!(
                target: "nova.config",
                "a global tracing subscriber was already installed"
            );
        }
    });
}
