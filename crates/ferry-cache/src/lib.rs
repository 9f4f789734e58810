//! Cache-side primitives for ferry: deterministic cache naming, sidecar
//! metadata, cross-process file locks, and the produce-exactly-once atomic
//! writer.
//!
//! ## On-disk layout
//!
//! For a resource `R` with version token `V`, the cache directory holds:
//! - artifact: `sha256(R)` (or `sha256(R).sha256(V)` when a token exists)
//! - sidecar:  `<artifact>.json`, a [`Meta`] document
//! - lock:     `<artifact>.lock`
//! - extraction variant: `<artifact>-extracted/`, with its own sidecar and lock
//!
//! Distinct version tokens map to distinct artifact names, so a stale reader
//! racing a fresher writer never contends on the same file. Everything is
//! committed by rename from a same-directory temp file, so a partially written
//! artifact is never observable under its final name.

mod discover;
mod error;
mod lock;
mod meta;
mod naming;
mod writer;

pub use discover::{filename_to_resource, find_latest_cached};
pub use error::CacheError;
pub use lock::{CacheLock, LockOptions};
pub use meta::{resource_size, Meta};
pub use naming::{extraction_path, lock_path, meta_path, resource_to_filename};
pub use writer::{ensure_file, ensure_file_locked, EnsureOutcome, EnsuredFile};
