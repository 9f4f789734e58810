use crate::error::CacheError;
use crate::meta::Meta;
use crate::naming::{meta_path, resource_to_filename};
use std::fs;
use std::path::{Path, PathBuf};
use std::time::SystemTime;

/// Locate the most recently modified cache entry for `resource`, across all
/// of its cached versions.
///
/// Candidates are entries whose filename starts with the resource's digest;
/// sidecars, lock files, staging temp files, and extraction directories are
/// skipped. Returns `None` when nothing has been cached yet.
pub fn find_latest_cached(
    resource: &str,
    cache_dir: &Path,
) -> Result<Option<PathBuf>, CacheError> {
    let prefix = resource_to_filename(resource, None);

    let read_dir = match fs::read_dir(cache_dir) {
        Ok(read_dir) => read_dir,
        Err(err) if err.kind() == std::io::ErrorKind::NotFound => return Ok(None),
        Err(err) => return Err(err.into()),
    };

    let mut newest: Option<(PathBuf, SystemTime)> = None;
    for entry in read_dir {
        let entry = entry?;
        let name = entry.file_name();
        let name = name.to_string_lossy();
        if !name.starts_with(&prefix) {
            continue;
        }
        if name.ends_with(".json")
            || name.ends_with(".lock")
            || name.ends_with("-extracted")
            || name.contains(".tmp.")
        {
            continue;
        }

        let modified = entry.metadata()?.modified()?;
        if newest.as_ref().map_or(true, |(_, best)| modified > *best) {
            newest = Some((entry.path(), modified));
        }
    }

    Ok(newest.map(|(path, _)| path))
}

/// Return the resource identifier and version token recorded for a cache
/// filename, read from its sidecar.
///
/// This is the inverse of [`resource_to_filename`]: the hash itself is not
/// reversible, so the sidecar is the source of truth. Fails with NotFound when
/// either the artifact or its sidecar is missing.
pub fn filename_to_resource(
    filename: &str,
    cache_dir: &Path,
) -> Result<(String, Option<String>), CacheError> {
    let cache_path = cache_dir.join(filename);
    if !cache_path.exists() {
        return Err(CacheError::NotFound { path: cache_path });
    }

    let sidecar = meta_path(&cache_path);
    if !sidecar.exists() {
        return Err(CacheError::NotFound { path: sidecar });
    }

    let meta = Meta::from_path(&sidecar)?;
    Ok((meta.resource, meta.etag))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    const URL: &str = "https://example.com/data.bin";

    #[test]
    fn skips_sidecars_locks_temps_and_extraction_dirs() {
        let tmp = tempfile::tempdir().unwrap();
        let name = resource_to_filename(URL, Some("v1"));
        let artifact = tmp.path().join(&name);
        fs::write(&artifact, b"data").unwrap();
        fs::write(tmp.path().join(format!("{name}.json")), b"{}").unwrap();
        fs::write(tmp.path().join(format!("{name}.lock")), b"").unwrap();
        fs::write(tmp.path().join(format!("{name}.tmp.1.0")), b"stage").unwrap();
        fs::create_dir(tmp.path().join(format!("{name}-extracted"))).unwrap();

        let found = find_latest_cached(URL, tmp.path()).unwrap();
        assert_eq!(found, Some(artifact));
    }

    #[test]
    fn picks_the_most_recently_modified_version() {
        let tmp = tempfile::tempdir().unwrap();
        let older = tmp.path().join(resource_to_filename(URL, Some("v1")));
        fs::write(&older, b"old").unwrap();
        // Filesystem mtime granularity can be coarse; leave a real gap.
        std::thread::sleep(Duration::from_millis(1100));
        let newer = tmp.path().join(resource_to_filename(URL, Some("v2")));
        fs::write(&newer, b"new").unwrap();

        let found = find_latest_cached(URL, tmp.path()).unwrap();
        assert_eq!(found, Some(newer));
    }

    #[test]
    fn unrelated_resources_do_not_match() {
        let tmp = tempfile::tempdir().unwrap();
        let other = resource_to_filename("https://example.com/other.bin", None);
        fs::write(tmp.path().join(other), b"other").unwrap();

        assert_eq!(find_latest_cached(URL, tmp.path()).unwrap(), None);
    }

    #[test]
    fn missing_cache_dir_is_empty_not_an_error() {
        let tmp = tempfile::tempdir().unwrap();
        let missing = tmp.path().join("no-such-dir");
        assert_eq!(find_latest_cached(URL, &missing).unwrap(), None);
    }

    #[test]
    fn filename_round_trips_through_the_sidecar() {
        let tmp = tempfile::tempdir().unwrap();
        let name = resource_to_filename(URL, Some("v1"));
        let artifact = tmp.path().join(&name);
        fs::write(&artifact, b"data").unwrap();
        Meta::new(URL, &artifact, Some("v1".to_string()), false)
            .unwrap()
            .write()
            .unwrap();

        let (resource, etag) = filename_to_resource(&name, tmp.path()).unwrap();
        assert_eq!(resource, URL);
        assert_eq!(etag.as_deref(), Some("v1"));
    }

    #[test]
    fn lookup_without_sidecar_is_not_found() {
        let tmp = tempfile::tempdir().unwrap();
        let name = resource_to_filename(URL, None);
        fs::write(tmp.path().join(&name), b"data").unwrap();

        let err = filename_to_resource(&name, tmp.path()).unwrap_err();
        assert!(err.is_not_found());
    }
}
