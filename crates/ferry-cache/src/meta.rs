use crate::error::CacheError;
use crate::naming::meta_path;
use serde::{Deserialize, Serialize};
use std::fs::{self, File};
use std::io::Write;
use std::path::{Path, PathBuf};
use std::time::{SystemTime, UNIX_EPOCH};

/// Sidecar metadata written next to every artifact the cache manages.
///
/// Stored as `<cached_path>.json`. Older tooling wrote documents containing
/// only `url` and `etag`; [`Meta::from_path`] still reads those, back-filling
/// the missing fields from the artifact itself.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Meta {
    /// URL or normalized path of the source resource.
    pub resource: String,

    /// Path of the cached artifact this document describes.
    pub cached_path: PathBuf,

    /// Seconds since the unix epoch at which the artifact was committed.
    pub creation_time: f64,

    /// Size of the artifact in bytes (recursive for extraction directories).
    #[serde(default)]
    pub size: u64,

    /// Version token the remote reported when the artifact was fetched, if any.
    #[serde(default)]
    pub etag: Option<String>,

    /// True when `cached_path` is a directory produced by archive extraction.
    #[serde(default)]
    pub extraction_dir: bool,
}

/// Deserialization shape that tolerates legacy documents.
#[derive(Deserialize)]
struct RawMeta {
    resource: Option<String>,
    url: Option<String>,
    cached_path: Option<PathBuf>,
    creation_time: Option<f64>,
    size: Option<u64>,
    etag: Option<String>,
    extraction_dir: Option<bool>,
}

impl Meta {
    /// Build a fresh document for an artifact that was just committed,
    /// statting it for its size.
    pub fn new(
        resource: impl Into<String>,
        cached_path: impl Into<PathBuf>,
        etag: Option<String>,
        extraction_dir: bool,
    ) -> Result<Self, CacheError> {
        let cached_path = cached_path.into();
        let size = resource_size(&cached_path)?;
        Ok(Self {
            resource: resource.into(),
            cached_path,
            creation_time: now_secs(),
            size,
            etag,
            extraction_dir,
        })
    }

    /// Persist the document to `<cached_path>.json`.
    ///
    /// This is always called after the artifact itself has been committed,
    /// under the same lock, so a single write+close is enough here.
    pub fn write(&self) -> Result<(), CacheError> {
        let path = meta_path(&self.cached_path);
        let bytes = serde_json::to_vec(self)?;
        let mut file = File::create(path)?;
        file.write_all(&bytes)?;
        Ok(())
    }

    /// Read a sidecar document, back-filling fields absent from legacy
    /// documents: the artifact path from the sidecar's own name, the creation
    /// time from the artifact's mtime, the size by re-statting the artifact,
    /// and the extraction flag from the `-extracted` naming convention.
    pub fn from_path(path: impl AsRef<Path>) -> Result<Self, CacheError> {
        let path = path.as_ref();
        let bytes = match fs::read(path) {
            Ok(bytes) => bytes,
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => {
                return Err(CacheError::NotFound {
                    path: path.to_path_buf(),
                })
            }
            Err(err) => return Err(err.into()),
        };
        let raw: RawMeta = serde_json::from_slice(&bytes)?;

        let resource = raw
            .resource
            .or(raw.url)
            .ok_or_else(|| CacheError::Metadata {
                path: path.to_path_buf(),
                message: "missing `resource` (or legacy `url`) field".to_string(),
            })?;
        let cached_path = match raw.cached_path {
            Some(cached_path) => cached_path,
            None => artifact_path_for(path),
        };
        let creation_time = match raw.creation_time {
            Some(creation_time) => creation_time,
            None => mtime_secs(&cached_path)?,
        };
        let size = match raw.size {
            Some(size) => size,
            None => resource_size(&cached_path)?,
        };
        let extraction_dir = raw.extraction_dir.unwrap_or_else(|| {
            path.file_name()
                .and_then(|name| name.to_str())
                .is_some_and(|name| name.ends_with("-extracted.json"))
        });

        Ok(Self {
            resource,
            cached_path,
            creation_time,
            size,
            etag: raw.etag,
            extraction_dir,
        })
    }
}

/// Size of a cached artifact in bytes.
///
/// For directories this walks the tree summing regular files, counting each
/// inode exactly once so hard-linked duplicates aren't double-counted, and
/// never following symlinks.
pub fn resource_size(path: &Path) -> Result<u64, CacheError> {
    let metadata = fs::symlink_metadata(path)?;
    if !metadata.is_dir() {
        return Ok(metadata.len());
    }

    #[cfg(unix)]
    let mut seen = std::collections::HashSet::new();

    let mut total = 0u64;
    for entry in walkdir::WalkDir::new(path).follow_links(false) {
        let entry = entry?;
        if !entry.file_type().is_file() {
            continue;
        }
        let metadata = entry.metadata()?;

        #[cfg(unix)]
        {
            use std::os::unix::fs::MetadataExt;
            if !seen.insert((metadata.dev(), metadata.ino())) {
                continue;
            }
        }

        total += metadata.len();
    }
    Ok(total)
}

/// Strip the trailing `.json` from a sidecar path to recover the artifact path.
fn artifact_path_for(meta_path: &Path) -> PathBuf {
    let stripped = meta_path
        .file_name()
        .and_then(|name| name.to_str())
        .and_then(|name| name.strip_suffix(".json"));
    match stripped {
        Some(name) => meta_path.with_file_name(name),
        None => meta_path.to_path_buf(),
    }
}

fn mtime_secs(path: &Path) -> Result<f64, CacheError> {
    let modified = fs::metadata(path)?.modified()?;
    Ok(modified
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_secs_f64())
        .unwrap_or(0.0))
}

fn now_secs() -> f64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_secs_f64())
        .unwrap_or(0.0)
}
