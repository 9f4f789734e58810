//! Remote scheme backends for ferry.
//!
//! A [`SchemeClient`] exposes the four capabilities the caching engine needs
//! from any remote store: a version token ([`SchemeClient::etag`]), a
//! best-effort size, a streaming fetch, and an optional byte-range fetch.
//! The [`SchemeRegistry`] maps URL scheme strings to client factories;
//! backends for `http`/`https` and `gs` are registered by default, `s3` and
//! the `hub` indirection scheme behind the cargo features of the same names.
//!
//! Failure classification is part of the contract: backends report absence as
//! [`RemoteError::NotFound`] and transient connection-class conditions as
//! recoverable (see [`RemoteError::is_recoverable`]); everything else is
//! fatal and surfaces unchanged.

mod client;
mod error;
mod http;
mod registry;
mod util;

mod gcs;
#[cfg(feature = "hub")]
mod hub;
#[cfg(feature = "s3")]
mod s3;

pub use client::SchemeClient;
pub use error::RemoteError;
pub use gcs::GcsClient;
pub use http::HttpClient;
#[cfg(feature = "hub")]
pub use hub::{hub_get, HUB_SCHEME};
pub use registry::{ClientFactory, SchemeRegistry};
#[cfg(feature = "s3")]
pub use s3::S3Client;
pub use util::{sanitize_url, scheme_of};
