use crate::cache::{Cache, ResolveOptions};
use crate::classify::{classify, Classified};
use crate::error::Error;
use ferry_cache::find_latest_cached;
use std::fs::File;
use std::io::{self, Read, Seek, SeekFrom};
use std::path::Path;

impl Cache {
    /// Read up to `length` bytes of `resource` starting at `offset`.
    ///
    /// This is a best-effort optimization over [`Cache::resolve`]: an
    /// already-cached entry (or an extracted archive member, with
    /// `extract_archive` and the `!` syntax) is read directly; otherwise the
    /// backend's optional range capability is tried; and when the backend
    /// declines, the whole file is downloaded and the range read from disk.
    /// Fewer than `length` bytes are returned when the resource ends early.
    pub fn bytes_range(
        &self,
        resource: &str,
        offset: u64,
        length: usize,
        options: &ResolveOptions,
    ) -> Result<Vec<u8>, Error> {
        if options.extract_archive && resource.contains('!') {
            let path = self.resolve_with(resource, options)?;
            return Ok(read_range(&path, offset, length)?);
        }

        if let Ok(Classified::Remote { scheme, url }) = classify(&self.registry, resource) {
            #[cfg(feature = "hub")]
            let direct = scheme != ferry_remote::HUB_SCHEME;
            #[cfg(not(feature = "hub"))]
            let direct = true;
            let _ = scheme;

            if direct {
                // Serve from an existing cache entry without any network.
                if let Some(latest) = find_latest_cached(&url, &self.root)? {
                    return Ok(read_range(&latest, offset, length)?);
                }

                if !self.offline {
                    let client = self.registry.client_for(&url)?;
                    if let Some(bytes) = client.bytes_range(offset, length)? {
                        return Ok(bytes);
                    }
                }
            }
        }

        let path = self.resolve_with(resource, &ResolveOptions::default())?;
        Ok(read_range(&path, offset, length)?)
    }
}

fn read_range(path: &Path, offset: u64, length: usize) -> io::Result<Vec<u8>> {
    let mut file = File::open(path)?;
    file.seek(SeekFrom::Start(offset))?;
    let mut buf = Vec::with_capacity(length);
    file.take(length as u64).read_to_end(&mut buf)?;
    Ok(buf)
}
