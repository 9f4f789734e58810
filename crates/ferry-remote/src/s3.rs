use crate::client::SchemeClient;
use crate::error::RemoteError;
use crate::util::{sanitize_url, split_cloud_path};
use aws_sdk_s3::error::SdkError;
use std::io::Write;

/// Backend for `s3://bucket/key` resources, using the AWS SDK with the
/// ambient credential chain.
#[derive(Debug)]
pub struct S3Client {
    resource: String,
    bucket: String,
    key: String,
}

impl S3Client {
    pub fn new(resource: impl Into<String>) -> Result<Self, RemoteError> {
        let resource = resource.into();
        let (bucket, key) = split_cloud_path(&resource, "s3")?;
        Ok(Self {
            resource,
            bucket,
            key,
        })
    }
}

impl SchemeClient for S3Client {
    fn resource(&self) -> &str {
        &self.resource
    }

    fn etag(&self) -> Result<Option<String>, RemoteError> {
        let runtime = runtime()?;
        runtime.block_on(async {
            let client = s3_client().await;
            match client
                .head_object()
                .bucket(&self.bucket)
                .key(&self.key)
                .send()
                .await
            {
                Ok(head) => Ok(head.e_tag().map(str::to_string)),
                Err(err) => {
                    if let SdkError::ServiceError(service) = &err {
                        if service.err().is_not_found() {
                            return Err(RemoteError::NotFound {
                                resource: self.resource.clone(),
                            });
                        }
                    }
                    Err(map_sdk_failure(&self.resource, err))
                }
            }
        })
    }

    fn size(&self) -> Result<Option<u64>, RemoteError> {
        let runtime = runtime()?;
        runtime.block_on(async {
            let client = s3_client().await;
            match client
                .head_object()
                .bucket(&self.bucket)
                .key(&self.key)
                .send()
                .await
            {
                Ok(head) => Ok(head.content_length().and_then(|len| u64::try_from(len).ok())),
                Err(_) => Ok(None),
            }
        })
    }

    fn fetch(&self, sink: &mut dyn Write) -> Result<(), RemoteError> {
        // `fetch` is a sync API; a current-thread runtime is plenty for a
        // single streaming download.
        let runtime = runtime()?;
        runtime.block_on(async {
            let client = s3_client().await;
            let object = client
                .get_object()
                .bucket(&self.bucket)
                .key(&self.key)
                .send()
                .await;
            let mut object = match object {
                Ok(object) => object,
                Err(err) => {
                    if let SdkError::ServiceError(service) = &err {
                        if service.err().is_no_such_key() {
                            return Err(RemoteError::NotFound {
                                resource: self.resource.clone(),
                            });
                        }
                    }
                    return Err(map_sdk_failure(&self.resource, err));
                }
            };

            while let Some(bytes) = object.body.try_next().await.map_err(|err| {
                RemoteError::Backend {
                    message: format!(
                        "s3 read failed for {}: {err}",
                        sanitize_url(&self.resource)
                    ),
                }
            })? {
                sink.write_all(&bytes)?;
            }
            Ok(())
        })
    }
}

async fn s3_client() -> aws_sdk_s3::Client {
    let config = aws_config::load_defaults(aws_config::BehaviorVersion::latest()).await;
    aws_sdk_s3::Client::new(&config)
}

fn runtime() -> Result<tokio::runtime::Runtime, RemoteError> {
    tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()
        .map_err(|err| RemoteError::Backend {
            message: format!("failed to start s3 runtime: {err}"),
        })
}

fn map_sdk_failure<E, R>(resource: &str, err: SdkError<E, R>) -> RemoteError
where
    E: std::fmt::Debug,
    R: std::fmt::Debug,
{
    match &err {
        SdkError::DispatchFailure(_) | SdkError::TimeoutError(_) => RemoteError::Recoverable {
            resource: sanitize_url(resource),
            reason: format!("{err:?}"),
        },
        _ => RemoteError::Backend {
            message: format!("s3 request failed for {}: {err:?}", sanitize_url(resource)),
        },
    }
}
