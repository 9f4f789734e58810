use crate::classify;
use crate::config::{default_cache_root, CacheConfig};
use crate::error::Error;
use crate::progress::Progress;
use ferry_cache::LockOptions;
use ferry_remote::SchemeRegistry;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

/// Per-call options for [`Cache::resolve_with`].
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct ResolveOptions {
    /// Extract the resource when it is a recognized archive, returning the
    /// extraction directory instead of the archive file. Required for the
    /// `archive!member` syntax.
    pub extract_archive: bool,

    /// Re-extract even when a non-empty extraction directory already exists.
    /// Use with care: it deletes the existing directory first.
    pub force_extract: bool,
}

impl ResolveOptions {
    /// Options with `extract_archive` enabled.
    pub fn extracting() -> Self {
        Self {
            extract_archive: true,
            force_extract: false,
        }
    }
}

/// A handle on one cache directory plus the scheme backends used to fill it.
///
/// Cheap to share behind an `Arc`; all methods take `&self`. Any number of
/// caches (in this process or others, even on other machines with shared
/// storage) may point at the same directory: coordination happens through
/// per-entry file locks, never through in-process state.
pub struct Cache {
    pub(crate) root: PathBuf,
    pub(crate) registry: SchemeRegistry,
    pub(crate) lock_timeout: Option<Duration>,
    pub(crate) read_only_ok: bool,
    pub(crate) offline: bool,
    pub(crate) progress: Option<Arc<dyn Progress>>,
}

impl Cache {
    /// A cache with the built-in scheme backends.
    pub fn new(config: CacheConfig) -> Result<Self, Error> {
        Self::with_registry(config, SchemeRegistry::with_default_clients())
    }

    /// A cache using a caller-provided scheme registry.
    pub fn with_registry(config: CacheConfig, registry: SchemeRegistry) -> Result<Self, Error> {
        let root = match config.cache_root_override {
            Some(root) => root,
            None => default_cache_root()?,
        };
        fs::create_dir_all(&root)?;

        Ok(Self {
            root,
            registry,
            lock_timeout: config.lock_timeout,
            read_only_ok: config.read_only_ok,
            offline: config.offline,
            progress: None,
        })
    }

    /// The cache directory.
    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn registry(&self) -> &SchemeRegistry {
        &self.registry
    }

    /// Mutable access to the registry, for registering additional scheme
    /// backends at runtime.
    pub fn registry_mut(&mut self) -> &mut SchemeRegistry {
        &mut self.registry
    }

    /// Install a progress sink that will be fed byte counts during downloads.
    pub fn set_progress(&mut self, progress: Arc<dyn Progress>) {
        self.progress = Some(progress);
    }

    /// Toggle offline mode: never touch the network, serve only what is
    /// already on disk.
    pub fn set_offline(&mut self, offline: bool) {
        self.offline = offline;
    }

    /// True when `input` is a supported-scheme URL or an existing local path.
    pub fn is_resource(&self, input: &str) -> bool {
        classify::is_resource(&self.registry, input)
    }

    /// Resolve a resource identifier to a local path with default options.
    pub fn resolve(&self, resource: &str) -> Result<PathBuf, Error> {
        self.resolve_with(resource, &ResolveOptions::default())
    }

    pub(crate) fn lock_options(&self) -> LockOptions {
        LockOptions {
            timeout: self.lock_timeout,
            read_only_ok: self.read_only_ok,
        }
    }
}
