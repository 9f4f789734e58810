use crate::client::SchemeClient;
use crate::error::RemoteError;
use crate::gcs::GcsClient;
use crate::http::HttpClient;
use crate::util::scheme_of;
use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

/// Constructor for a [`SchemeClient`], invoked with the full resource URL.
pub type ClientFactory =
    Arc<dyn Fn(&str) -> Result<Box<dyn SchemeClient>, RemoteError> + Send + Sync>;

/// Maps URL scheme strings to client factories.
///
/// A registry is an explicit value constructed once and handed to whatever
/// drives the fetch, rather than process-global state; hosts can register
/// additional backends against their own instance at any time. Several
/// scheme aliases may share one factory (`http`/`https`), and registering a
/// scheme that already has a factory replaces it.
pub struct SchemeRegistry {
    factories: HashMap<String, ClientFactory>,
}

impl SchemeRegistry {
    /// A registry with no backends at all.
    pub fn empty() -> Self {
        Self {
            factories: HashMap::new(),
        }
    }

    /// A registry with the built-in backends registered: `http`/`https`,
    /// `gs`, and (with the `s3` feature) `s3`.
    pub fn with_default_clients() -> Self {
        let mut registry = Self::empty();
        registry.register(&["http", "https"], |url| Ok(Box::new(HttpClient::new(url))));
        registry.register(&["gs"], |url| Ok(Box::new(GcsClient::new(url)?)));
        #[cfg(feature = "s3")]
        registry.register(&["s3"], |url| Ok(Box::new(crate::s3::S3Client::new(url)?)));
        registry
    }

    /// Register `factory` for every scheme in `schemes`, replacing any
    /// existing registration.
    pub fn register<F>(&mut self, schemes: &[&str], factory: F)
    where
        F: Fn(&str) -> Result<Box<dyn SchemeClient>, RemoteError> + Send + Sync + 'static,
    {
        let factory: ClientFactory = Arc::new(factory);
        for scheme in schemes {
            self.factories.insert((*scheme).to_string(), factory.clone());
        }
    }

    /// Build a client for `url`, dispatching on its scheme.
    pub fn client_for(&self, url: &str) -> Result<Box<dyn SchemeClient>, RemoteError> {
        let scheme = scheme_of(url).ok_or_else(|| RemoteError::UnsupportedScheme {
            scheme: String::new(),
        })?;
        match self.factories.get(scheme) {
            Some(factory) => factory(url),
            None => Err(RemoteError::UnsupportedScheme {
                scheme: scheme.to_string(),
            }),
        }
    }

    /// True when `scheme` has a registered backend, or is the reserved hub
    /// indirection scheme.
    pub fn is_supported(&self, scheme: &str) -> bool {
        #[cfg(feature = "hub")]
        if scheme == crate::hub::HUB_SCHEME {
            return true;
        }
        self.factories.contains_key(scheme)
    }

    /// All schemes this registry recognizes, sorted.
    pub fn supported_schemes(&self) -> Vec<String> {
        let mut schemes: Vec<String> = self.factories.keys().cloned().collect();
        #[cfg(feature = "hub")]
        schemes.push(crate::hub::HUB_SCHEME.to_string());
        schemes.sort();
        schemes
    }
}

impl Default for SchemeRegistry {
    fn default() -> Self {
        Self::with_default_clients()
    }
}

impl fmt::Debug for SchemeRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SchemeRegistry")
            .field("schemes", &self.supported_schemes())
            .finish()
    }
}
