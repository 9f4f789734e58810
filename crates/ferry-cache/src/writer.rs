use crate::error::CacheError;
use crate::lock::{CacheLock, LockOptions};
use crate::naming::lock_path;
use std::fs::{self, File, OpenOptions};
use std::io;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU64, Ordering};

/// What [`ensure_file`] found or did.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum EnsureOutcome {
    /// The artifact already existed; the producer was not invoked.
    AlreadyPresent,
    /// The producer ran and its output was committed.
    Produced,
}

/// Outcome of [`ensure_file_locked`], still holding the entry's lock.
///
/// Dropping this value releases the lock. Followup work that must happen
/// under the same lock as the commit (writing sidecar metadata next to a
/// freshly produced artifact) is done while it is alive.
#[derive(Debug)]
pub struct EnsuredFile {
    outcome: EnsureOutcome,
    _lock: CacheLock,
}

impl EnsuredFile {
    pub fn outcome(&self) -> EnsureOutcome {
        self.outcome
    }

    pub fn was_produced(&self) -> bool {
        self.outcome == EnsureOutcome::Produced
    }
}

/// Ensure the artifact at `target` exists, invoking `produce` at most once
/// across any number of competing threads and processes.
///
/// The producer writes into a temp file created in `target`'s directory (same
/// filesystem, so the final rename is atomic). On producer failure the temp
/// file is deleted and the error propagates; `target` does not exist
/// afterwards. Existence is re-checked after the lock is granted, so callers
/// that lose the race take the fast path and observe the winner's artifact.
pub fn ensure_file<E, F>(
    target: &Path,
    options: LockOptions,
    produce: F,
) -> std::result::Result<EnsureOutcome, E>
where
    E: From<CacheError>,
    F: FnOnce(&mut File) -> std::result::Result<(), E>,
{
    ensure_file_locked(target, options, produce).map(|ensured| ensured.outcome())
}

/// Like [`ensure_file`], but returns with the entry's lock still held so the
/// caller can finish bookkeeping before other writers get in.
pub fn ensure_file_locked<E, F>(
    target: &Path,
    options: LockOptions,
    produce: F,
) -> std::result::Result<EnsuredFile, E>
where
    E: From<CacheError>,
    F: FnOnce(&mut File) -> std::result::Result<(), E>,
{
    let lock = CacheLock::acquire(&lock_path(target), options).map_err(E::from)?;

    if target.exists() {
        return Ok(EnsuredFile {
            outcome: EnsureOutcome::AlreadyPresent,
            _lock: lock,
        });
    }

    let parent = match target.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent,
        _ => Path::new("."),
    };
    fs::create_dir_all(parent).map_err(|err| E::from(CacheError::from(err)))?;

    let (tmp_path, mut file) =
        open_unique_tmp_file(target, parent).map_err(|err| E::from(CacheError::from(err)))?;

    let result = produce(&mut file).and_then(|()| {
        file.sync_all()
            .map_err(|err| E::from(CacheError::from(err)))
    });
    if let Err(err) = result {
        drop(file);
        remove_tmp_best_effort(&tmp_path);
        return Err(err);
    }
    drop(file);

    if let Err(err) = fs::rename(&tmp_path, target) {
        remove_tmp_best_effort(&tmp_path);
        return Err(E::from(CacheError::from(err)));
    }
    sync_dir_best_effort(parent);

    Ok(EnsuredFile {
        outcome: EnsureOutcome::Produced,
        _lock: lock,
    })
}

static TMP_COUNTER: AtomicU64 = AtomicU64::new(0);

fn open_unique_tmp_file(dest: &Path, parent: &Path) -> io::Result<(PathBuf, File)> {
    let file_name = dest
        .file_name()
        .ok_or_else(|| io::Error::other("destination path has no file name"))?;
    let pid = std::process::id();

    loop {
        let counter = TMP_COUNTER.fetch_add(1, Ordering::Relaxed);
        let mut tmp_name = file_name.to_os_string();
        tmp_name.push(format!(".tmp.{pid}.{counter}"));
        let tmp_path = parent.join(tmp_name);

        match OpenOptions::new()
            .write(true)
            .create_new(true)
            .open(&tmp_path)
        {
            Ok(file) => return Ok((tmp_path, file)),
            Err(err) if err.kind() == io::ErrorKind::AlreadyExists => continue,
            Err(err) => return Err(err),
        }
    }
}

fn remove_tmp_best_effort(path: &Path) {
    match fs::remove_file(path) {
        Ok(()) => {}
        Err(err) if err.kind() == io::ErrorKind::NotFound => {}
        Err(err) => {
            tracing::debug!(
                target = "ferry.cache",
                path = %path.display(),
                error = %err,
                "failed to remove temporary file"
            );
        }
    }
}

fn sync_dir_best_effort(dir: &Path) {
    // After publishing via rename, fsync the directory entry so the rename
    // survives a crash.
    #[cfg(unix)]
    {
        let _ = File::open(dir).and_then(|dir| dir.sync_all());
    }

    #[cfg(not(unix))]
    let _ = dir;
}
