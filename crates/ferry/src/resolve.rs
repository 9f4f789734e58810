use crate::cache::{Cache, ResolveOptions};
use crate::classify::{classify, Classified};
use crate::error::Error;
use crate::progress::CountingWriter;
use ferry_cache::{
    ensure_file_locked, extraction_path, find_latest_cached, lock_path, meta_path,
    resource_to_filename, CacheLock, Meta,
};
use ferry_remote::sanitize_url;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::UNIX_EPOCH;

impl Cache {
    /// Resolve a resource identifier to a local path.
    ///
    /// Remote resources are version-checked against the backend every call
    /// but downloaded only when the cache has no entry for the current
    /// version token. With `extract_archive` set, recognized archives are
    /// extracted (once) and the extraction directory is returned; an
    /// `archive!member` identifier returns the member's path within that
    /// directory.
    pub fn resolve_with(&self, resource: &str, options: &ResolveOptions) -> Result<PathBuf, Error> {
        if options.extract_archive {
            if let Some((archive_part, member)) = resource.split_once('!') {
                return self.resolve_archive_member(resource, archive_part, member, options);
            }
        }

        match classify(&self.registry, resource)? {
            Classified::Remote { scheme, url } => {
                #[cfg(feature = "hub")]
                if scheme == ferry_remote::HUB_SCHEME {
                    return self.resolve_hub(&url, options);
                }
                let _ = scheme;

                let (file_path, etag) = self.fetch_remote(&url)?;
                if options.extract_archive && ferry_archive::is_archive(&file_path) {
                    let extraction_dir = extraction_path(&file_path);
                    return self.extract_archive(
                        &url,
                        &file_path,
                        &extraction_dir,
                        etag,
                        options.force_extract,
                    );
                }
                Ok(file_path)
            }

            Classified::LocalExisting(path) => {
                let canonical = fs::canonicalize(&path)?;
                if options.extract_archive
                    && canonical.is_file()
                    && ferry_archive::is_archive(&canonical)
                {
                    // The extraction directory's name hashes the canonical
                    // path together with its mtime, so editing the archive
                    // invalidates the cached extraction.
                    let canonical_str = canonical.to_string_lossy().into_owned();
                    let mtime_token = mtime_token(&canonical)?;
                    let name = resource_to_filename(&canonical_str, Some(&mtime_token));
                    let extraction_dir = self.root.join(format!("{name}-extracted"));
                    return self.extract_archive(
                        &canonical_str,
                        &canonical,
                        &extraction_dir,
                        None,
                        options.force_extract,
                    );
                }
                Ok(canonical)
            }

            Classified::LocalMissing(path) => Err(Error::NotFound {
                resource: path.display().to_string(),
            }),
        }
    }

    /// `archive!member`: resolve the archive with extraction forced on, then
    /// address the member inside the extraction directory.
    fn resolve_archive_member(
        &self,
        resource: &str,
        archive_part: &str,
        member: &str,
        options: &ResolveOptions,
    ) -> Result<PathBuf, Error> {
        let extracted = self.resolve_with(
            archive_part,
            &ResolveOptions {
                extract_archive: true,
                force_extract: options.force_extract,
            },
        )?;
        if !extracted.is_dir() {
            return Err(Error::NotAnArchive {
                resource: resource.to_string(),
            });
        }

        let member_path = extracted.join(member);
        if !member_path.exists() {
            return Err(Error::NotFound {
                resource: format!("{member:?} within {archive_part}"),
            });
        }
        Ok(member_path)
    }

    /// Look up `url` in the cache, downloading it if necessary. Returns the
    /// cached path and the version token it corresponds to.
    fn fetch_remote(&self, url: &str) -> Result<(PathBuf, Option<String>), Error> {
        if self.offline {
            return match find_latest_cached(url, &self.root)? {
                Some(latest) => {
                    tracing::info!(
                        target = "ferry",
                        resource = %sanitize_url(url),
                        path = %latest.display(),
                        "offline mode: using latest cached version"
                    );
                    let etag = recorded_etag(&latest);
                    Ok((latest, etag))
                }
                None => Err(Error::NotFound {
                    resource: sanitize_url(url),
                }),
            };
        }

        let client = self.registry.client_for(url)?;

        let etag = match client.etag() {
            Ok(etag) => etag,
            Err(err) if err.is_not_found() => return Err(err.into()),
            Err(err) if err.is_recoverable() => {
                tracing::warn!(
                    target = "ferry",
                    resource = %sanitize_url(url),
                    error = %err,
                    "connection error during version check; will try the latest cached version"
                );
                match find_latest_cached(url, &self.root)? {
                    Some(latest) => {
                        tracing::info!(
                            target = "ferry",
                            resource = %sanitize_url(url),
                            path = %latest.display(),
                            "using latest cached version"
                        );
                        let etag = recorded_etag(&latest);
                        return Ok((latest, etag));
                    }
                    None => {
                        tracing::error!(
                            target = "ferry",
                            resource = %sanitize_url(url),
                            "version check failed and no cached version exists"
                        );
                        return Err(err.into());
                    }
                }
            }
            Err(err) => {
                // The freshness probe itself failing in some other way is not
                // a reason to abort the fetch; cache without a version token.
                tracing::warn!(
                    target = "ferry",
                    resource = %sanitize_url(url),
                    error = %err,
                    "version check failed; caching without a freshness token"
                );
                None
            }
        };

        let filename = resource_to_filename(url, etag.as_deref());
        let cache_path = self.root.join(filename);

        let ensured = ensure_file_locked::<Error, _>(&cache_path, self.lock_options(), |file| {
            tracing::info!(
                target = "ferry",
                resource = %sanitize_url(url),
                path = %cache_path.display(),
                "not found in cache, downloading"
            );
            let total = client.size().unwrap_or_default();
            if let Some(progress) = &self.progress {
                progress.started(url, total);
            }
            let mut writer = CountingWriter::new(file, self.progress.as_deref());
            client.fetch(&mut writer)?;
            if let Some(progress) = &self.progress {
                progress.finished(url, writer.total_written());
            }
            Ok(())
        })?;

        // The sidecar is written under the same lock that committed the
        // artifact, so no other writer can intervene between the two.
        if ensured.was_produced() {
            Meta::new(url, &cache_path, etag.clone(), false)?.write()?;
        } else {
            tracing::debug!(
                target = "ferry",
                resource = %sanitize_url(url),
                "cache is up-to-date"
            );
        }
        drop(ensured);

        Ok((cache_path, etag))
    }

    /// The reserved hub scheme: the hub client library does its own caching
    /// and returns a finalized path, bypassing the locked cache writer.
    #[cfg(feature = "hub")]
    fn resolve_hub(&self, url: &str, options: &ResolveOptions) -> Result<PathBuf, Error> {
        let path = ferry_remote::hub_get(url, &self.root)?;

        let sidecar = meta_path(&path);
        if !sidecar.exists() {
            let synthesized =
                Meta::new(url, &path, None, path.is_dir()).and_then(|meta| meta.write());
            if let Err(err) = synthesized {
                tracing::debug!(
                    target = "ferry",
                    resource = %url,
                    error = %err,
                    "failed to synthesize sidecar for hub artifact"
                );
            }
        }

        if options.extract_archive && path.is_file() && ferry_archive::is_archive(&path) {
            let extraction_dir = extraction_path(&path);
            return self.extract_archive(url, &path, &extraction_dir, None, options.force_extract);
        }
        Ok(path)
    }

    /// Extract `archive` into `extraction_dir` exactly once, under lock, via
    /// a staged temp directory that is atomically renamed into place.
    fn extract_archive(
        &self,
        resource: &str,
        archive: &Path,
        extraction_dir: &Path,
        etag: Option<String>,
        force: bool,
    ) -> Result<PathBuf, Error> {
        // An existing, non-empty extraction directory is reused outright; no
        // lock needed on this fast path.
        if !force && is_non_empty_dir(extraction_dir) {
            return Ok(extraction_dir.to_path_buf());
        }

        let _lock = CacheLock::acquire(&lock_path(extraction_dir), self.lock_options())?;

        // Re-check under the lock; another holder may have just finished.
        if is_non_empty_dir(extraction_dir) {
            if force {
                tracing::warn!(
                    target = "ferry",
                    resource = %sanitize_url(resource),
                    path = %extraction_dir.display(),
                    "extraction directory already exists, overwriting since force_extract is set"
                );
                fs::remove_dir_all(extraction_dir)?;
            } else {
                return Ok(extraction_dir.to_path_buf());
            }
        }

        tracing::info!(
            target = "ferry",
            resource = %sanitize_url(resource),
            path = %extraction_dir.display(),
            "extracting"
        );

        let parent = match extraction_dir.parent() {
            Some(parent) if !parent.as_os_str().is_empty() => parent,
            _ => Path::new("."),
        };
        // Stage into a temp sibling so a failed extraction leaves nothing at
        // the final path; the TempDir cleans itself up on error.
        let staging = tempfile::Builder::new()
            .prefix(".ferry-extract-")
            .tempdir_in(parent)?;
        ferry_archive::extract(archive, staging.path())?;

        let staged = staging.keep();
        if let Err(err) = fs::rename(&staged, extraction_dir) {
            let _ = fs::remove_dir_all(&staged);
            return Err(err.into());
        }

        Meta::new(resource, extraction_dir, etag, true)?.write()?;
        Ok(extraction_dir.to_path_buf())
    }
}

fn recorded_etag(cached: &Path) -> Option<String> {
    Meta::from_path(meta_path(cached))
        .ok()
        .and_then(|meta| meta.etag)
}

fn is_non_empty_dir(path: &Path) -> bool {
    fs::read_dir(path)
        .map(|mut entries| entries.next().is_some())
        .unwrap_or(false)
}

fn mtime_token(path: &Path) -> Result<String, Error> {
    let modified = fs::metadata(path)?.modified()?;
    let nanos = modified
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_nanos())
        .unwrap_or(0);
    Ok(nanos.to_string())
}
