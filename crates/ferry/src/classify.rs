use crate::config::home_dir;
use crate::error::Error;
use ferry_remote::{scheme_of, SchemeRegistry};
use std::path::PathBuf;

/// What an identifier turned out to be.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Classified {
    /// An existing local file or directory (after `~` expansion).
    LocalExisting(PathBuf),
    /// A local-looking identifier with nothing at that path.
    LocalMissing(PathBuf),
    /// A URL whose scheme has a registered backend (or is the reserved hub
    /// scheme).
    Remote { scheme: String, url: String },
}

/// Decide whether `input` names a local path or a remote resource.
///
/// An identifier with a scheme the registry doesn't recognize, and no local
/// file at that literal string, cannot be classified at all. That is
/// malformed input ([`Error::Unclassifiable`]), not absence.
pub fn classify(registry: &SchemeRegistry, input: &str) -> Result<Classified, Error> {
    if let Some(scheme) = scheme_of(input) {
        if registry.is_supported(scheme) {
            return Ok(Classified::Remote {
                scheme: scheme.to_string(),
                url: input.to_string(),
            });
        }
    }

    let path = expand_user(input);
    if path.exists() {
        Ok(Classified::LocalExisting(path))
    } else if scheme_of(input).is_none() {
        Ok(Classified::LocalMissing(path))
    } else {
        Err(Error::Unclassifiable {
            input: input.to_string(),
        })
    }
}

/// True when `input` is a supported-scheme URL or an existing local path.
pub(crate) fn is_resource(registry: &SchemeRegistry, input: &str) -> bool {
    scheme_of(input).is_some_and(|scheme| registry.is_supported(scheme))
        || expand_user(input).exists()
}

/// Expand a leading `~` to the user's home directory.
pub(crate) fn expand_user(input: &str) -> PathBuf {
    if input == "~" {
        if let Some(home) = home_dir() {
            return home;
        }
    } else if let Some(rest) = input.strip_prefix("~/") {
        if let Some(home) = home_dir() {
            return home.join(rest);
        }
    }
    PathBuf::from(input)
}
