//! S3-compatible remote source
//!
//! Every fetch builds a fresh client scoped to the requested host and the
//! configured credentials, then retrieves the object and probes its metadata
//! before handing the body back as a stream. There is a single attempt per
//! stage; the first failing stage is reported as a [`RemoteError`].

use crate::{Credentials, FileReader};
use async_trait::async_trait;
use aws_config::timeout::TimeoutConfig;
use aws_config::BehaviorVersion;
use aws_sdk_s3::config::Region;
use aws_sdk_s3::error::DisplayErrorContext;
use reqwest::Url;
use std::time::Duration;

/// Boxed cause carried by [`RemoteError`]
pub type BoxError = Box<dyn std::error::Error + Send + Sync>;

/// Default region used when none is configured
pub const DEFAULT_REGION: &str = "us-east-1";

/// Failure of a single remote fetch, tagged with the stage that failed
#[derive(thiserror::Error, Debug)]
pub enum RemoteError {
    #[error("unable to get remote fs client for host {host:?}: {source}")]
    Client { host: String, source: BoxError },

    #[error("unable to get remote object s3://{bucket}/{key}: {source}")]
    Object {
        bucket: String,
        key: String,
        source: BoxError,
    },

    #[error("unable to get remote file info s3://{bucket}/{key}: {source}")]
    Stat {
        bucket: String,
        key: String,
        source: BoxError,
    },
}

/// Fetches objects from remote storage.
#[async_trait]
pub trait RemoteFetcher: Send + Sync {
    async fn fetch_remote_file(
        &self,
        credentials: &Credentials,
        host: &str,
        bucket: &str,
        key: &str,
    ) -> Result<FileReader, RemoteError>;
}

/// Connection options for [`S3Fetcher`]
#[derive(Debug, Clone)]
pub struct S3Options {
    /// Signing region
    pub region: String,
    /// Use https for hosts given without a scheme
    pub secure: bool,
    /// Per-operation deadline applied by the SDK
    pub timeout: Option<Duration>,
}

impl Default for S3Options {
    fn default() -> Self {
        Self {
            region: DEFAULT_REGION.to_string(),
            secure: false,
            timeout: None,
        }
    }
}

/// [`RemoteFetcher`] for S3 and S3-compatible stores (MinIO, Ceph, ...)
#[derive(Debug, Clone, Default)]
pub struct S3Fetcher {
    options: S3Options,
}

impl S3Fetcher {
    pub fn new(options: S3Options) -> Self {
        Self { options }
    }

    pub fn options(&self) -> &S3Options {
        &self.options
    }

    /// Build a client for `host` using static credentials
    async fn client(
        &self,
        credentials: &Credentials,
        host: &str,
    ) -> Result<aws_sdk_s3::Client, RemoteError> {
        let endpoint = endpoint_url(host, self.options.secure).map_err(|source| {
            RemoteError::Client {
                host: host.to_string(),
                source,
            }
        })?;

        let static_credentials = aws_sdk_s3::config::Credentials::new(
            credentials.access_key.clone(),
            credentials.access_secret.clone(),
            None,
            None,
            "filegetter",
        );

        let mut loader = aws_config::defaults(BehaviorVersion::latest())
            .region(Region::new(self.options.region.clone()))
            .endpoint_url(endpoint.as_str().trim_end_matches('/'))
            .credentials_provider(static_credentials);
        if let Some(timeout) = self.options.timeout {
            loader = loader.timeout_config(
                TimeoutConfig::builder()
                    .operation_timeout(timeout)
                    .build(),
            );
        }
        let sdk_config = loader.load().await;

        // Bucket names are not resolvable as subdomains on most self-hosted stores
        let s3_config = aws_sdk_s3::config::Builder::from(&sdk_config)
            .force_path_style(true)
            .build();

        Ok(aws_sdk_s3::Client::from_conf(s3_config))
    }
}

#[async_trait]
impl RemoteFetcher for S3Fetcher {
    async fn fetch_remote_file(
        &self,
        credentials: &Credentials,
        host: &str,
        bucket: &str,
        key: &str,
    ) -> Result<FileReader, RemoteError> {
        let client = self.client(credentials, host).await?;

        let response = client
            .get_object()
            .bucket(bucket)
            .key(key)
            .send()
            .await
            .map_err(|e| RemoteError::Object {
                bucket: bucket.to_string(),
                key: key.to_string(),
                source: sdk_cause(e),
            })?;

        let head = client
            .head_object()
            .bucket(bucket)
            .key(key)
            .send()
            .await
            .map_err(|e| RemoteError::Stat {
                bucket: bucket.to_string(),
                key: key.to_string(),
                source: sdk_cause(e),
            })?;

        tracing::debug!(
            "Fetched s3://{}/{} from {} ({} bytes)",
            bucket,
            key,
            host,
            head.content_length().unwrap_or_default()
        );

        Ok(Box::pin(response.body.into_async_read()))
    }
}

/// Resolve a host into an endpoint URL.
///
/// Accepts `name`, `name:port` or a full `http(s)://` URL. Bare hosts get
/// `https` when `secure` is set and `http` otherwise.
pub fn endpoint_url(host: &str, secure: bool) -> Result<Url, BoxError> {
    let host = host.trim();
    if host.is_empty() {
        return Err("empty host".into());
    }

    let raw = if host.contains("://") {
        host.to_string()
    } else {
        let scheme = if secure { "https" } else { "http" };
        format!("{scheme}://{host}")
    };

    let url = Url::parse(&raw)?;
    if !matches!(url.scheme(), "http" | "https") {
        return Err(format!("unsupported scheme '{}'", url.scheme()).into());
    }
    if url.host_str().is_none_or(str::is_empty) {
        return Err(format!("no host in '{raw}'").into());
    }

    Ok(url)
}

/// SDK errors only show their full chain through `DisplayErrorContext`
fn sdk_cause<E: std::error::Error>(err: E) -> BoxError {
    DisplayErrorContext(err).to_string().into()
}
