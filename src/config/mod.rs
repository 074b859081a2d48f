//! Service configuration assembled from CLI flags and environment variables.

mod duration;

pub use duration::parse_duration;

use clap::Parser;
use filegetter_file::{Credentials, GetterConfig, S3Options, DEFAULT_REGION};

/// Remote storage options
#[derive(Parser, Clone)]
pub struct RemoteOpts {
    /// Read files from remote object storage when jobs carry host, bucket and key
    #[arg(long, env = "FILEGETTER_USE_REMOTE_FS")]
    pub use_remote_fs: bool,

    /// Remote storage access key
    #[arg(long, default_value = "", env = "FILEGETTER_ACCESS_KEY")]
    pub access_key: String,

    /// Remote storage access secret
    #[arg(
        long,
        default_value = "",
        env = "FILEGETTER_ACCESS_SECRET",
        hide_env_values = true
    )]
    pub access_secret: String,

    /// Region used to sign remote requests
    #[arg(long, default_value = DEFAULT_REGION, env = "FILEGETTER_REGION")]
    pub region: String,

    /// Use https for hosts given without a scheme
    #[arg(long, env = "FILEGETTER_SECURE")]
    pub secure: bool,

    /// Deadline for each remote operation (e.g. "30", "30s", "5m")
    #[arg(long, env = "FILEGETTER_TIMEOUT")]
    pub timeout: Option<String>,
}

impl RemoteOpts {
    pub fn getter_config(&self) -> GetterConfig {
        GetterConfig::new(
            self.use_remote_fs,
            Credentials::new(self.access_key.clone(), self.access_secret.clone()),
        )
    }

    pub fn s3_options(&self) -> anyhow::Result<S3Options> {
        let timeout = self.timeout.as_deref().map(parse_duration).transpose()?;
        Ok(S3Options {
            region: self.region.clone(),
            secure: self.secure,
            timeout,
        })
    }
}
