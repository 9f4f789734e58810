//! Validated archive extraction for ferry.
//!
//! Supports zip, tar, tar.gz, and tar.zst archives, detected by content
//! rather than file extension. Before anything is written, every member is
//! checked against a safety policy: only regular files, directories, hard
//! links, and symlinks are allowed, and no member path (or link target) may
//! resolve outside the extraction root. A violation fails the whole
//! extraction; the caller stages into a temp directory, so no partial output
//! ever lands at a final path.

mod error;
mod extract;
mod format;

pub use error::ArchiveError;
pub use extract::extract;
pub use format::{is_archive, ArchiveFormat};
