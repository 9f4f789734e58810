use crate::client::SchemeClient;
use crate::error::RemoteError;
use crate::http::{call_with_backoff, map_ureq_error};
use crate::util::split_cloud_path;
use std::io::{self, Read, Write};

/// Backend for `gs://bucket/object` resources on Google Cloud Storage.
///
/// Objects are reached through the plain HTTPS object endpoint
/// (`storage.googleapis.com/<bucket>/<object>`), which serves anonymously
/// readable objects; the response ETag doubles as the version token.
#[derive(Debug)]
pub struct GcsClient {
    resource: String,
    endpoint: String,
}

impl GcsClient {
    pub fn new(resource: impl Into<String>) -> Result<Self, RemoteError> {
        let resource = resource.into();
        let (bucket, object) = split_cloud_path(&resource, "gs")?;
        let endpoint = format!("https://storage.googleapis.com/{bucket}/{object}");
        Ok(Self { resource, endpoint })
    }
}

impl SchemeClient for GcsClient {
    fn resource(&self) -> &str {
        &self.resource
    }

    fn etag(&self) -> Result<Option<String>, RemoteError> {
        let response = call_with_backoff(&self.resource, || ureq::head(&self.endpoint).call())?;
        Ok(response.header("etag").map(str::to_string))
    }

    fn size(&self) -> Result<Option<u64>, RemoteError> {
        let response = match call_with_backoff(&self.resource, || ureq::head(&self.endpoint).call())
        {
            Ok(response) => response,
            Err(_) => return Ok(None),
        };
        Ok(response
            .header("content-length")
            .and_then(|value| value.parse::<u64>().ok()))
    }

    fn fetch(&self, sink: &mut dyn Write) -> Result<(), RemoteError> {
        let response = call_with_backoff(&self.resource, || ureq::get(&self.endpoint).call())?;
        let mut reader = response.into_reader();
        io::copy(&mut reader, sink)?;
        Ok(())
    }

    fn bytes_range(&self, offset: u64, length: usize) -> Result<Option<Vec<u8>>, RemoteError> {
        if length == 0 {
            return Ok(Some(Vec::new()));
        }
        let range = format!("bytes={}-{}", offset, offset + length as u64 - 1);
        let response = match ureq::get(&self.endpoint).set("Range", &range).call() {
            Ok(response) => response,
            Err(err) => return Err(map_ureq_error(&self.resource, err)),
        };
        if response.status() != 206 {
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
