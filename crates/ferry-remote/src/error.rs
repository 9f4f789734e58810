/// Errors surfaced by remote scheme backends.
///
/// The orchestrator dispatches on the classification predicates rather than
/// on backend-specific error types: [`is_not_found`](Self::is_not_found)
/// always propagates to the caller, and
/// [`is_recoverable`](Self::is_recoverable) failures during a version check
/// may be downgraded to "use the newest cached copy".
#[derive(Debug, thiserror::Error)]
pub enum RemoteError {
    #[error("resource {resource} not found")]
    NotFound { resource: String },

    /// Transient, connection-class failure (DNS, refused connection,
    /// timeout, 502/503/504 after retries).
    #[error("recoverable error for {resource}: {reason}")]
    Recoverable { resource: String, reason: String },

    #[error("no client registered for scheme {scheme:?}")]
    UnsupportedScheme { scheme: String },

    #[error("bad {provider} path {url}")]
    InvalidUrl { provider: &'static str, url: String },

    #[error("server returned status {status} for {resource}")]
    Status { resource: String, status: u16 },

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    #[error("{message}")]
    Backend { message: String },
}

impl RemoteError {
    pub fn is_recoverable(&self) -> bool {
        matches!(self, Self::Recoverable { .. })
    }

    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::NotFound { .. })
    }
}
