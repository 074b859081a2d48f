//! Local filesystem source

use crate::FileReader;
use async_trait::async_trait;
use std::path::Path;

/// Opens files on local storage.
///
/// Errors are returned exactly as the underlying open call produced them so
/// callers can inspect [`std::io::ErrorKind`].
#[async_trait]
pub trait LocalFetcher: Send + Sync {
    async fn open(&self, local_path: &Path) -> std::io::Result<FileReader>;
}

/// [`LocalFetcher`] backed by `tokio::fs`
#[derive(Debug, Clone, Copy, Default)]
pub struct OsFile;

#[async_trait]
impl LocalFetcher for OsFile {
    async fn open(&self, local_path: &Path) -> std::io::Result<FileReader> {
        let file = tokio::fs::File::open(local_path).await?;
        tracing::debug!("Opened local file: {}", local_path.display());
        Ok(Box::pin(file))
    }
}
