use std::path::PathBuf;
use std::time::Duration;

/// Errors produced by cache naming, metadata, and locking primitives.
#[derive(Debug, thiserror::Error)]
pub enum CacheError {
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    #[error("json error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("walkdir error: {0}")]
    WalkDir(#[from] walkdir::Error),

    #[error("{} not found", .path.display())]
    NotFound { path: PathBuf },

    #[error("invalid metadata document {}: {message}", .path.display())]
    Metadata { path: PathBuf, message: String },

    #[error("timed out after {waited:?} waiting for lock on {}", .path.display())]
    LockTimeout { path: PathBuf, waited: Duration },
}

impl CacheError {
    pub fn is_not_found(&self) -> bool {
        match self {
            Self::NotFound { .. } => true,
            Self::Io(err) => err.kind() == std::io::ErrorKind::NotFound,
            _ => false,
        }
    }
}
