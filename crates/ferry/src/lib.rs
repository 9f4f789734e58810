//! Location-transparent access to local and remote files.
//!
//! Hand [`Cache::resolve`] anything (a filesystem path, an `http(s)` URL, a
//! cloud object URL, or a `hub://` repository reference) and get back the
//! path of a local file, downloading and caching it only when needed:
//!
//! ```no_run
//! use ferry::{Cache, CacheConfig};
//!
//! let cache = Cache::new(CacheConfig::default())?;
//!
//! // Remote resources are downloaded once and reused until their version
//! // token (ETag) changes.
//! let weights = cache.resolve("https://example.com/models/weights.bin")?;
//!
//! // Archives can be extracted, and members addressed directly with `!`.
//! let config = cache.resolve_with(
//!     "https://example.com/models/model.tar.gz!config.json",
//!     &ferry::ResolveOptions { extract_archive: true, force_extract: false },
//! )?;
//! # Ok::<(), ferry::Error>(())
//! ```
//!
//! Concurrent callers, whether threads or processes sharing a cache
//! directory, are coordinated with per-entry file locks: for any given
//! resource version,
//! exactly one caller downloads while the rest wait and then reuse the
//! committed artifact. If the version check fails with a connection-class
//! error, the newest already-cached copy is served instead (offline
//! fallback).

mod bytes_range;
mod cache;
mod classify;
mod config;
mod error;
mod progress;
mod resolve;

pub use cache::{Cache, ResolveOptions};
pub use classify::{classify, Classified};
pub use config::CacheConfig;
pub use error::Error;
pub use progress::Progress;

pub use ferry_archive::{is_archive, ArchiveError, ArchiveFormat};
pub use ferry_cache::{
    filename_to_resource, find_latest_cached, resource_to_filename, CacheError, Meta,
};
#[cfg(feature = "hub")]
pub use ferry_remote::HUB_SCHEME;
pub use ferry_remote::{RemoteError, SchemeClient, SchemeRegistry};

use std::path::PathBuf;

/// Resolve `resource` through a default-configured cache rooted at
/// `~/.cache/ferry`. Convenience wrapper around [`Cache::resolve`].
pub fn cached_path(resource: &str) -> Result<PathBuf, Error> {
    Cache::new(CacheConfig::default())?.resolve(resource)
}
