use ferry_archive::ArchiveError;
use ferry_cache::CacheError;
use ferry_remote::RemoteError;

/// Errors surfaced by [`Cache`](crate::Cache) operations.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// The resource does not exist, locally or remotely, or a named archive
    /// member is missing from the extracted archive.
    #[error("{resource} not found")]
    NotFound { resource: String },

    /// The identifier is neither a known remote scheme nor an existing local
    /// path. Malformed input, distinct from [`Error::NotFound`].
    #[error("unable to interpret {input:?} as a URL or as a local path")]
    Unclassifiable { input: String },

    #[error("{resource} uses the archive member syntax but does not reference an archive")]
    NotAnArchive { resource: String },

    #[error("failed to determine home directory")]
    MissingHomeDir,

    #[error(transparent)]
    Cache(#[from] CacheError),

    #[error(transparent)]
    Remote(#[from] RemoteError),

    #[error(transparent)]
    Archive(#[from] ArchiveError),

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}

impl Error {
    /// True for any not-found condition, regardless of which layer reported
    /// it.
    pub fn is_not_found(&self) -> bool {
        match self {
            Self::NotFound { .. } => true,
            Self::Cache(err) => err.is_not_found(),
            Self::Remote(err) => err.is_not_found(),
            Self::Io(err) => err.kind() == std::io::ErrorKind::NotFound,
            _ => false,
        }
    }

    /// True when a lock acquisition deadline was exceeded.
    pub fn is_lock_timeout(&self) -> bool {
        matches!(self, Self::Cache(CacheError::LockTimeout { .. }))
    }
}
