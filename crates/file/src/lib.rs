//! Remote-first file fetching with local fallback
//!
//! This crate fetches a file from S3-compatible object storage when the
//! service is configured for it, and from the local filesystem otherwise.
//! Any remote problem (remote fields missing on the request, client setup,
//! object retrieval, metadata probe) is logged and answered from local disk,
//! so callers only ever see a successful reader tagged with its [`Source`]
//! or the error from opening the local file.
//!
//! # Selection
//!
//! | `use_remote_fs` | host/bucket/key | remote result | outcome                         |
//! |-----------------|-----------------|---------------|---------------------------------|
//! | false           | any             | not called    | local                           |
//! | true            | one is empty    | not called    | warn "missing fields", local    |
//! | true            | all set         | ok            | remote                          |
//! | true            | all set         | error         | warn with cause, local          |
//!
//! # Example
//!
//! ```ignore
//! use filegetter_file::{Credentials, FetchRequest, FileGetter, GetterConfig, S3Options};
//!
//! let getter = FileGetter::new(
//!     GetterConfig::new(true, Credentials::new("key", "secret")),
//!     S3Options::default(),
//! );
//! let request = FetchRequest::new("/var/spool/mail/1.eml")
//!     .with_remote("minio:9000", "mail", "1.eml");
//! let fetched = getter.fetch_file(&request).await?;
//! println!("read from {}", fetched.source);
//! ```

mod local;
mod s3;

use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::PathBuf;
use std::pin::Pin;

pub use local::{LocalFetcher, OsFile};
pub use s3::{
    endpoint_url, BoxError, RemoteError, RemoteFetcher, S3Fetcher, S3Options, DEFAULT_REGION,
};

/// Readable handle returned by a fetch. Dropping it releases the file or connection.
pub type FileReader = Pin<Box<dyn tokio::io::AsyncRead + Send>>;

/// Where a fetched file came from
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Source {
    Local,
    Remote,
}

impl Source {
    pub fn as_str(&self) -> &'static str {
        match self {
            Source::Local => "local",
            Source::Remote => "remote",
        }
    }
}

impl fmt::Display for Source {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Authentication for the remote store
#[derive(Clone, Default, PartialEq, Eq)]
pub struct Credentials {
    pub access_key: String,
    pub access_secret: String,
}

impl Credentials {
    pub fn new(access_key: impl Into<String>, access_secret: impl Into<String>) -> Self {
        Self {
            access_key: access_key.into(),
            access_secret: access_secret.into(),
        }
    }
}

impl fmt::Debug for Credentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credentials")
            .field("access_key", &self.access_key)
            .field("access_secret", &"***")
            .finish()
    }
}

/// Service-wide fetch configuration, built once at startup
#[derive(Debug, Clone, Default)]
pub struct GetterConfig {
    /// Whether this service may read from remote storage at all
    pub use_remote_fs: bool,
    pub credentials: Credentials,
}

impl GetterConfig {
    pub fn new(use_remote_fs: bool, credentials: Credentials) -> Self {
        Self {
            use_remote_fs,
            credentials,
        }
    }
}

/// One file to fetch.
///
/// `local_path` is always required. `host`, `bucket` and `key` are only
/// used together; if any of them is empty the remote store is skipped.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FetchRequest {
    pub local_path: PathBuf,
    pub host: String,
    pub bucket: String,
    pub key: String,
}

impl FetchRequest {
    pub fn new(local_path: impl Into<PathBuf>) -> Self {
        Self {
            local_path: local_path.into(),
            ..Default::default()
        }
    }

    pub fn with_remote(
        mut self,
        host: impl Into<String>,
        bucket: impl Into<String>,
        key: impl Into<String>,
    ) -> Self {
        self.host = host.into();
        self.bucket = bucket.into();
        self.key = key.into();
        self
    }

    /// True when host, bucket and key are all set
    pub fn has_remote_location(&self) -> bool {
        !self.host.is_empty() && !self.bucket.is_empty() && !self.key.is_empty()
    }
}

/// A successfully opened file
pub struct Fetched {
    pub reader: FileReader,
    pub source: Source,
}

impl fmt::Debug for Fetched {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Fetched")
            .field("source", &self.source)
            .finish_non_exhaustive()
    }
}

/// The local open failed. The wrapped error is the one the filesystem returned.
#[derive(thiserror::Error, Debug)]
#[error(transparent)]
pub struct FetchError(#[from] std::io::Error);

impl FetchError {
    /// Failures are always reported against local storage
    pub fn source_tag(&self) -> Source {
        Source::Local
    }

    pub fn kind(&self) -> std::io::ErrorKind {
        self.0.kind()
    }

    pub fn into_inner(self) -> std::io::Error {
        self.0
    }
}

/// Why a fetch did not use remote storage
#[derive(Debug)]
pub enum FallbackReason {
    RemoteUnavailable(RemoteError),
    RemoteFieldsMissing {
        host: String,
        bucket: String,
        key: String,
    },
}

impl fmt::Display for FallbackReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FallbackReason::RemoteUnavailable(err) => {
                write!(f, "falling back to local source - {err}")
            }
            FallbackReason::RemoteFieldsMissing { host, bucket, key } => write!(
                f,
                "falling back to local source - missing fields. \"host\":{host:?}, \"bucket\":{bucket:?}, \"key\":{key:?}"
            ),
        }
    }
}

/// Fetches files from remote storage with a local fallback.
///
/// Generic over both sources; [`FileGetter::new`] wires the S3 and
/// filesystem implementations. The getter holds no mutable state and can be
/// shared across tasks.
pub struct FileGetter<R = S3Fetcher, L = OsFile> {
    config: GetterConfig,
    remote: R,
    local: L,
}

impl FileGetter {
    pub fn new(config: GetterConfig, s3_options: S3Options) -> Self {
        Self::with_fetchers(config, S3Fetcher::new(s3_options), OsFile)
    }
}

impl<R: RemoteFetcher, L: LocalFetcher> FileGetter<R, L> {
    pub fn with_fetchers(config: GetterConfig, remote: R, local: L) -> Self {
        Self {
            config,
            remote,
            local,
        }
    }

    pub fn config(&self) -> &GetterConfig {
        &self.config
    }

    /// Fetch a file, preferring remote storage when enabled.
    ///
    /// Remote errors never reach the caller: they are logged and the local
    /// path is opened instead. On error the local failure is returned as is.
    pub async fn fetch_file(&self, request: &FetchRequest) -> Result<Fetched, FetchError> {
        if self.config.use_remote_fs {
            match self.fetch_remote(request).await {
                Ok(reader) => {
                    tracing::debug!(
                        "Fetched s3://{}/{} from {}",
                        request.bucket,
                        request.key,
                        Source::Remote
                    );
                    return Ok(Fetched {
                        reader,
                        source: Source::Remote,
                    });
                }
                Err(reason) => tracing::warn!("{reason}"),
            }
        }

        let reader = self.local.open(&request.local_path).await?;
        tracing::debug!(
            "Fetched {} from {}",
            request.local_path.display(),
            Source::Local
        );
        Ok(Fetched {
            reader,
            source: Source::Local,
        })
    }

    async fn fetch_remote(&self, request: &FetchRequest) -> Result<FileReader, FallbackReason> {
        if !request.has_remote_location() {
            return Err(FallbackReason::RemoteFieldsMissing {
                host: request.host.clone(),
                bucket: request.bucket.clone(),
                key: request.key.clone(),
            });
        }

        self.remote
            .fetch_remote_file(
                &self.config.credentials,
                &request.host,
                &request.bucket,
                &request.key,
            )
            .await
            .map_err(FallbackReason::RemoteUnavailable)
    }
}
