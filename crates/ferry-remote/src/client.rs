use crate::error::RemoteError;
use std::io::Write;

/// Capability contract a remote scheme backend implements.
///
/// A client is constructed for one resource identifier and queried for the
/// pieces the caching engine needs. Implementations must be honest about the
/// error taxonomy: absence is [`RemoteError::NotFound`], transient network
/// conditions are [recoverable](RemoteError::is_recoverable), and anything
/// else is fatal.
pub trait SchemeClient: Send + Sync + std::fmt::Debug {
    /// The resource identifier this client was built for.
    fn resource(&self) -> &str;

    /// The resource's current version token (ETag or equivalent), or `None`
    /// when the backend has no such notion.
    fn etag(&self) -> Result<Option<String>, RemoteError>;

    /// Total size in bytes when cheaply known. Best-effort; `None` is not an
    /// error.
    fn size(&self) -> Result<Option<u64>, RemoteError>;

    /// Stream the resource's bytes into `sink`.
    ///
    /// A failure here aborts the whole operation; unlike the version check it
    /// is never downgraded to a cached fallback.
    fn fetch(&self, sink: &mut dyn Write) -> Result<(), RemoteError>;

    /// Fetch up to `length` bytes starting at `offset`.
    ///
    /// Backends may decline with `Ok(None)`; the caller then falls back to a
    /// whole-file fetch.
    fn bytes_range(&self, offset: u64, length: usize) -> Result<Option<Vec<u8>>, RemoteError> {
        let _ = (offset, length);
        Ok(None)
    }
}
