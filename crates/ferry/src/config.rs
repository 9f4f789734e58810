use crate::error::Error;
use std::path::PathBuf;
use std::time::Duration;

/// Configuration for a [`Cache`](crate::Cache).
#[derive(Clone, Debug, Default)]
pub struct CacheConfig {
    /// Override the cache directory. Defaults to `~/.cache/ferry`.
    pub cache_root_override: Option<PathBuf>,

    /// Give up on lock acquisition after this long instead of blocking
    /// forever.
    pub lock_timeout: Option<Duration>,

    /// Tolerate unwritable lock files (read-only shared cache mounts),
    /// trading away the exclusive-writer guarantee. See
    /// [`LockOptions`](ferry_cache::LockOptions).
    pub read_only_ok: bool,

    /// Never touch the network; serve only what is already cached.
    pub offline: bool,
}

impl CacheConfig {
    /// Read the cache root override from `FERRY_CACHE_DIR`.
    ///
    /// This is the only place the environment is consulted; the cache itself
    /// only ever consumes the resolved root.
    pub fn from_env() -> Self {
        Self {
            cache_root_override: std::env::var_os("FERRY_CACHE_DIR").map(PathBuf::from),
            ..Self::default()
        }
    }
}

pub(crate) fn default_cache_root() -> Result<PathBuf, Error> {
    let home = home_dir().ok_or(Error::MissingHomeDir)?;
    Ok(home.join(".cache").join("ferry"))
}

pub(crate) fn home_dir() -> Option<PathBuf> {
    std::env::var_os("HOME")
        .or_else(|| std::env::var_os("USERPROFILE"))
        .map(PathBuf::from)
}
