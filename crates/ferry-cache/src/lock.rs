use crate::error::CacheError;
use fs2::FileExt as _;
use std::collections::HashMap;
use std::fs::{File, OpenOptions};
use std::io;
use std::path::{Path, PathBuf};
use std::sync::{Mutex, MutexGuard, OnceLock, TryLockError};
use std::time::{Duration, Instant};

const LOCK_POLL_INTERVAL: Duration = Duration::from_millis(50);

/// Acquisition policy for [`CacheLock`].
#[derive(Clone, Copy, Debug, Default)]
pub struct LockOptions {
    /// Give up with [`CacheError::LockTimeout`] after this long. `None` blocks
    /// until the lock is granted.
    pub timeout: Option<Duration>,

    /// Tolerate permission-denied / read-only-filesystem failures when the
    /// lock file already exists: log a warning and proceed without exclusive
    /// protection instead of failing. Supports read-only shared cache mounts.
    pub read_only_ok: bool,
}

/// A filesystem-backed lock that is safe to share across processes.
///
/// Released when the returned value is dropped. `fs2` file locks are
/// process-scoped on Unix platforms (they don't exclude other threads in the
/// same process), so an in-process mutex keyed by lock path provides mutual
/// exclusion between threads while the file lock coordinates across
/// processes.
#[derive(Debug)]
pub struct CacheLock {
    inner: Option<LockedFile>,
}

#[derive(Debug)]
struct LockedFile {
    file: File,
    _path: PathBuf,
    _guard: MutexGuard<'static, ()>,
}

impl CacheLock {
    /// Acquire an exclusive lock on `path`, creating the lock file if needed.
    pub fn acquire(path: &Path, options: LockOptions) -> Result<Self, CacheError> {
        let started = Instant::now();
        let deadline = options.timeout.map(|timeout| started + timeout);

        let mutex = process_lock_for_path(path);
        let guard = match deadline {
            None => mutex.lock().unwrap_or_else(|poisoned| poisoned.into_inner()),
            Some(deadline) => loop {
                match mutex.try_lock() {
                    Ok(guard) => break guard,
                    Err(TryLockError::Poisoned(poisoned)) => break poisoned.into_inner(),
                    Err(TryLockError::WouldBlock) => {}
                }
                if Instant::now() >= deadline {
                    return Err(CacheError::LockTimeout {
                        path: path.to_path_buf(),
                        waited: started.elapsed(),
                    });
                }
                std::thread::sleep(LOCK_POLL_INTERVAL);
            },
        };

        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        let file = match OpenOptions::new()
            .create(true)
            .truncate(false)
            .read(true)
            .write(true)
            .open(path)
        {
            Ok(file) => file,
            Err(err) if is_permission_error(&err) => {
                return Self::degraded(path, options, err);
            }
            Err(err) => return Err(err.into()),
        };

        match deadline {
            None => {
                if let Err(err) = file.lock_exclusive() {
                    if is_permission_error(&err) {
                        return Self::degraded(path, options, err);
                    }
                    return Err(err.into());
                }
            }
            Some(deadline) => loop {
                match file.try_lock_exclusive() {
                    Ok(()) => break,
                    Err(err) if err.kind() == fs2::lock_contended_error().kind() => {
                        if Instant::now() >= deadline {
                            return Err(CacheError::LockTimeout {
                                path: path.to_path_buf(),
                                waited: started.elapsed(),
                            });
                        }
                        std::thread::sleep(LOCK_POLL_INTERVAL);
                    }
                    Err(err) if is_permission_error(&err) => {
                        return Self::degraded(path, options, err);
                    }
                    Err(err) => return Err(err.into()),
                }
            },
        }

        Ok(Self {
            inner: Some(LockedFile {
                file,
                _path: path.to_path_buf(),
                _guard: guard,
            }),
        })
    }

    /// True when acquisition was downgraded and this value holds no lock.
    pub fn is_degraded(&self) -> bool {
        self.inner.is_none()
    }

    fn degraded(path: &Path, options: LockOptions, err: io::Error) -> Result<Self, CacheError> {
        if options.read_only_ok && path.is_file() {
            tracing::warn!(
                target = "ferry.cache",
                lock = %path.display(),
                "lacking permissions required to obtain lock; race conditions are \
                 possible if other processes write to the same resource"
            );
            Ok(Self { inner: None })
        } else {
            Err(err.into())
        }
    }
}

impl Drop for CacheLock {
    fn drop(&mut self) {
        if let Some(locked) = &self.inner {
            let _ = locked.file.unlock();
        }
    }
}

fn is_permission_error(err: &io::Error) -> bool {
    // EPERM (1), EACCES (13), EROFS (30); the latter two have stable kinds.
    matches!(
        err.kind(),
        io::ErrorKind::PermissionDenied | io::ErrorKind::ReadOnlyFilesystem
    ) || err.raw_os_error() == Some(1)
}

fn process_lock_for_path(path: &Path) -> &'static Mutex<()> {
    static PROCESS_LOCKS: OnceLock<Mutex<HashMap<PathBuf, &'static Mutex<()>>>> = OnceLock::new();
    let locks = PROCESS_LOCKS.get_or_init(|| Mutex::new(HashMap::new()));

    let mut map = locks
        .lock()
        .unwrap_or_else(|poisoned| poisoned.into_inner());
    if let Some(existing) = map.get(path) {
        return existing;
    }

    let mutex: &'static Mutex<()> = Box::leak(Box::new(Mutex::new(())));
    map.insert(path.to_path_buf(), mutex);
    mutex
}
