use std::path::PathBuf;

use crate::root::RootId;

pub type Result<T> = std::result::Result<T, AnnotationsError>;

/// Failures of external-annotation mutations.
///
/// Reads never fail: unreadable or malformed files are logged and treated as empty.
#[derive(Debug, thiserror::Error)]
pub enum AnnotationsError {
    #[error("io error at {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("{path} is read-only")]
    ReadOnly { path: PathBuf },

    #[error("refusing to overwrite malformed annotations file {path}: {message}")]
    Malformed { path: PathBuf, message: String },

    #[error("declaration cannot be annotated externally (no stable external name)")]
    NoExternalName,

    #[error("invalid package name {package:?}")]
    InvalidPackage { package: String },

    #[error("unknown annotation root {root}")]
    UnknownRoot { root: RootId },
}

impl AnnotationsError {
    pub(crate) fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        AnnotationsError::Io {
            path: path.into(),
            source,
        }
    }
}
