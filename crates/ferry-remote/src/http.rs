use crate::client::SchemeClient;
use crate::error::RemoteError;
use crate::util::sanitize_url;
use std::io::{self, Read, Write};
use std::time::Duration;

/// Server statuses worth retrying, and eventually classing recoverable.
pub(crate) const RECOVERABLE_STATUS_CODES: &[u16] = &[502, 503, 504];

const MAX_ATTEMPTS: u32 = 4;
const BACKOFF_BASE: Duration = Duration::from_millis(100);

/// Backend for `http` and `https` resources.
#[derive(Debug)]
pub struct HttpClient {
    resource: String,
}

impl HttpClient {
    pub fn new(resource: impl Into<String>) -> Self {
        Self {
            resource: resource.into(),
        }
    }
}

impl SchemeClient for HttpClient {
    fn resource(&self) -> &str {
        &self.resource
    }

    fn etag(&self) -> Result<Option<String>, RemoteError> {
        let response = call_with_backoff(&self.resource, || ureq::head(&self.resource).call())?;
        Ok(response.header("etag").map(str::to_string))
    }

    fn size(&self) -> Result<Option<u64>, RemoteError> {
        let response = match call_with_backoff(&self.resource, || ureq::head(&self.resource).call())
        {
            Ok(response) => response,
            Err(err) => {
                tracing::debug!(
                    target = "ferry.remote",
                    resource = %sanitize_url(&self.resource),
                    error = %err,
                    "failed to probe content length"
                );
                return Ok(None);
            }
        };
        Ok(response
            .header("content-length")
            .and_then(|value| value.parse::<u64>().ok()))
    }

    fn fetch(&self, sink: &mut dyn Write) -> Result<(), RemoteError> {
        let response = call_with_backoff(&self.resource, || ureq::get(&self.resource).call())?;
        let mut reader = response.into_reader();
        // A failure mid-stream is a plain I/O error: the caller has already
        // committed to this download and must abort, not fall back.
        io::copy(&mut reader, sink)?;
        Ok(())
    }

    fn bytes_range(&self, offset: u64, length: usize) -> Result<Option<Vec<u8>>, RemoteError> {
        if length == 0 {
            return Ok(Some(Vec::new()));
        }
        let range = format!("bytes={}-{}", offset, offset + length as u64 - 1);
        let response = match ureq::get(&self.resource).set("Range", &range).call() {
            Ok(response) => response,
            Err(err) => return Err(map_ureq_error(&self.resource, err)),
        };
        if response.status() != 206 {
            // Server ignored the range request; let the caller fall back to a
            // whole-file fetch.
            return Ok(None);
        }
        let mut buf = Vec::with_capacity(length);
        response
            .into_reader()
            .take(length as u64)
            .read_to_end(&mut buf)?;
        Ok(Some(buf))
    }
}

/// Issue a request, retrying transient failures with exponential backoff
/// before giving up and classifying the error.
pub(crate) fn call_with_backoff(
    resource: &str,
    request: impl Fn() -> Result<ureq::Response, ureq::Error>,
) -> Result<ureq::Response, RemoteError> {
    let mut attempt = 0;
    loop {
        attempt += 1;
        let err = match request() {
            Ok(response) => return Ok(response),
            Err(err) => err,
        };

        let transient = match &err {
            ureq::Error::Status(code, _) => RECOVERABLE_STATUS_CODES.contains(code),
            ureq::Error::Transport(_) => true,
        };
        if !transient || attempt >= MAX_ATTEMPTS {
            return Err(map_ureq_error(resource, err));
        }

        let delay = BACKOFF_BASE * 2u32.saturating_pow(attempt);
        tracing::debug!(
            target = "ferry.remote",
            resource = %sanitize_url(resource),
            attempt,
            delay_ms = delay.as_millis() as u64,
            "transient http failure; retrying"
        );
        std::thread::sleep(delay);
    }
}

pub(crate) fn map_ureq_error(resource: &str, err: ureq::Error) -> RemoteError {
    match err {
        ureq::Error::Status(404, _) => RemoteError::NotFound {
            resource: sanitize_url(resource),
        },
        ureq::Error::Status(code, _) if RECOVERABLE_STATUS_CODES.contains(&code) => {
            RemoteError::Recoverable {
                resource: sanitize_url(resource),
                reason: format!("server returned status {code}"),
            }
        }
        ureq::Error::Status(code, _) => RemoteError::Status {
            resource: sanitize_url(resource),
            status: code,
        },
        ureq::Error::Transport(transport) => RemoteError::Recoverable {
            resource: sanitize_url(resource),
            reason: transport.to_string(),
        },
    }
}
