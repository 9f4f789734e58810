use sha2::{Digest, Sha256};
use std::path::{Path, PathBuf};

/// Convert a resource identifier into the filename used for it in the cache
/// directory, in a repeatable way.
///
/// The name is the lowercase hex SHA-256 of the resource's UTF-8 bytes; when a
/// non-empty version token is given, a `.`-separated digest of the token is
/// appended. Distinct tokens therefore yield distinct filenames, letting
/// several versions of the same resource coexist without a directory index.
///
/// Pure function, no I/O; stable across runs and platforms. The inverse
/// mapping goes through the sidecar metadata (see
/// [`filename_to_resource`](crate::filename_to_resource)), not through
/// reversing the hash.
pub fn resource_to_filename(resource: &str, etag: Option<&str>) -> String {
    let mut filename = hex::encode(Sha256::digest(resource.as_bytes()));

    if let Some(etag) = etag.filter(|etag| !etag.is_empty()) {
        filename.push('.');
        filename.push_str(&hex::encode(Sha256::digest(etag.as_bytes())));
    }

    filename
}

/// Path of the sidecar metadata document for a cached artifact.
pub fn meta_path(cached_path: &Path) -> PathBuf {
    append_suffix(cached_path, ".json")
}

/// Path of the lock file guarding writes to `target`.
pub fn lock_path(target: &Path) -> PathBuf {
    append_suffix(target, ".lock")
}

/// Path of the extraction directory derived from an archive artifact.
pub fn extraction_path(archive: &Path) -> PathBuf {
    append_suffix(archive, "-extracted")
}

fn append_suffix(path: &Path, suffix: &str) -> PathBuf {
    let mut name = path.as_os_str().to_os_string();
    name.push(suffix);
    PathBuf::from(name)
}
