//! Job processing loop
//!
//! Jobs are read from a JSON Lines file, one job per line:
//!
//! ```text
//! {"file_path": "/var/spool/mail/1.eml", "host": "minio:9000", "bucket": "mail", "key": "1.eml"}
//! {"file_path": "/var/spool/mail/2.eml"}
//! ```
//!
//! Every job carries a `file_path`; `host`, `bucket` and `key` may be absent.
//! Each fetched file is copied into the output directory under the file name
//! of `file_path`; an existing file of that name is overwritten with a
//! warning. A failing job is logged and counted, leaves no partial output
//! behind, and processing moves on to the next one.

use anyhow::{Context, Result};
use filegetter_file::{FetchRequest, FileGetter, FileReader, LocalFetcher, RemoteFetcher, Source};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tokio::io::AsyncWriteExt;
use tracing::{debug, info, warn};

/// A unit of work
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Job {
    pub file_path: PathBuf,
    #[serde(default)]
    pub host: String,
    #[serde(default)]
    pub bucket: String,
    #[serde(default)]
    pub key: String,
}

impl Job {
    pub fn request(&self) -> FetchRequest {
        FetchRequest::new(self.file_path.clone()).with_remote(
            self.host.clone(),
            self.bucket.clone(),
            self.key.clone(),
        )
    }
}

/// Counts of job outcomes
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct JobSummary {
    pub remote: usize,
    pub local: usize,
    pub failed: usize,
}

impl JobSummary {
    fn record(&mut self, source: Source) {
        match source {
            Source::Remote => self.remote += 1,
            Source::Local => self.local += 1,
        }
    }

    pub fn total(&self) -> usize {
        self.remote + self.local + self.failed
    }
}

/// Fetch one job's file and copy it into `output_dir`
///
/// Returns the source the file came from and the number of bytes copied.
pub async fn process_job<R, L>(
    getter: &FileGetter<R, L>,
    job: &Job,
    output_dir: &Path,
) -> Result<(Source, u64)>
where
    R: RemoteFetcher,
    L: LocalFetcher,
{
    let file_name = job
        .file_path
        .file_name()
        .with_context(|| format!("Job file path has no file name: {}", job.file_path.display()))?;
    let destination = output_dir.join(file_name);

    let mut fetched = getter
        .fetch_file(&job.request())
        .await
        .with_context(|| format!("Failed to fetch {}", job.file_path.display()))?;

    if tokio::fs::try_exists(&destination).await.unwrap_or(false) {
        warn!(
            "Overwriting {} with {}",
            destination.display(),
            job.file_path.display()
        );
    }

    let copied = match copy_to(&mut fetched.reader, &destination).await {
        Ok(copied) => copied,
        Err(e) => {
            if let Err(remove_err) = tokio::fs::remove_file(&destination).await {
                if remove_err.kind() != std::io::ErrorKind::NotFound {
                    warn!(
                        "Failed to remove partial output {}: {remove_err}",
                        destination.display()
                    );
                }
            }
            return Err(e);
        }
    };

    debug!(
        "Copied {} bytes from {} source to {}",
        copied,
        fetched.source,
        destination.display()
    );

    Ok((fetched.source, copied))
}

async fn copy_to(reader: &mut FileReader, destination: &Path) -> Result<u64> {
    let mut output = tokio::fs::File::create(destination)
        .await
        .with_context(|| format!("Failed to create output file: {}", destination.display()))?;
    let copied = tokio::io::copy(reader, &mut output)
        .await
        .with_context(|| format!("Failed to copy into {}", destination.display()))?;
    output.flush().await?;
    Ok(copied)
}

/// Run every job in a JSON Lines file
///
/// Only problems with the jobs file or the output directory abort the run.
pub async fn run_jobs<R, L>(
    getter: &FileGetter<R, L>,
    jobs_file: &Path,
    output_dir: &Path,
) -> Result<JobSummary>
where
    R: RemoteFetcher,
    L: LocalFetcher,
{
    let contents = tokio::fs::read_to_string(jobs_file)
        .await
        .with_context(|| format!("Failed to read jobs file: {}", jobs_file.display()))?;
    tokio::fs::create_dir_all(output_dir)
        .await
        .with_context(|| format!("Failed to create output directory: {}", output_dir.display()))?;

    info!("Processing jobs from: {}", jobs_file.display());

    let mut summary = JobSummary::default();
    for (index, line) in contents.lines().enumerate() {
        let line_number = index + 1;
        if line.trim().is_empty() {
            continue;
        }

        let job: Job = match serde_json::from_str(line) {
            Ok(job) => job,
            Err(e) => {
                warn!("Skipping malformed job on line {line_number}: {e}");
                summary.failed += 1;
                continue;
            }
        };

        match process_job(getter, &job, output_dir).await {
            Ok((source, _)) => summary.record(source),
            Err(e) => {
                warn!("Job on line {line_number} failed: {e:#}");
                summary.failed += 1;
            }
        }
    }

    info!(
        "Processed {} jobs: {} remote, {} local, {} failed",
        summary.total(),
        summary.remote,
        summary.local,
        summary.failed
    );

    Ok(summary)
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use filegetter_file::{Credentials, GetterConfig, OsFile, RemoteError};
    use std::io::Write;
    use std::pin::Pin;
    use std::sync::{Arc, Mutex};
    use std::task::{Context as TaskContext, Poll};
    use tempfile::TempDir;
    use tokio::io::{AsyncRead, AsyncReadExt, ReadBuf};

    /// Remote store that is never reachable
    struct Offline;

    #[async_trait]
    impl RemoteFetcher for Offline {
        async fn fetch_remote_file(
            &self,
            _credentials: &Credentials,
            host: &str,
            _bucket: &str,
            _key: &str,
        ) -> std::result::Result<FileReader, RemoteError> {
            Err(RemoteError::Client {
                host: host.to_string(),
                source: "offline".into(),
            })
        }
    }

    /// Reader whose every read fails, as a dropped disk or connection would
    struct BrokenReader;

    impl AsyncRead for BrokenReader {
        fn poll_read(
            self: Pin<&mut Self>,
            _cx: &mut TaskContext<'_>,
            _buf: &mut ReadBuf<'_>,
        ) -> Poll<std::io::Result<()>> {
            Poll::Ready(Err(std::io::Error::new(
                std::io::ErrorKind::UnexpectedEof,
                "connection reset mid-file",
            )))
        }
    }

    /// Local source that yields some bytes and then fails
    struct Truncating;

    #[async_trait]
    impl LocalFetcher for Truncating {
        async fn open(&self, _local_path: &Path) -> std::io::Result<FileReader> {
            let partial = std::io::Cursor::new(b"first half".to_vec());
            Ok(Box::pin(partial.chain(BrokenReader)))
        }
    }

    #[derive(Clone)]
    struct VecWriter(Arc<Mutex<Vec<u8>>>);

    impl Write for VecWriter {
        fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
            self.0.lock().unwrap().extend_from_slice(buf);
            Ok(buf.len())
        }

        fn flush(&mut self) -> std::io::Result<()> {
            Ok(())
        }
    }

    fn local_only() -> GetterConfig {
        GetterConfig::new(false, Credentials::default())
    }

    fn job_for(path: &Path) -> Job {
        Job {
            file_path: path.to_path_buf(),
            host: String::new(),
            bucket: String::new(),
            key: String::new(),
        }
    }

    #[tokio::test]
    async fn test_failed_copy_leaves_no_output() {
        let output_dir = TempDir::new().unwrap();
        let getter = FileGetter::with_fetchers(local_only(), Offline, Truncating);
        let job = job_for(Path::new("/var/spool/mail/1.eml"));

        let err = process_job(&getter, &job, output_dir.path())
            .await
            .unwrap_err();

        assert!(format!("{err:#}").contains("connection reset mid-file"));
        assert!(!output_dir.path().join("1.eml").exists());
    }

    #[tokio::test]
    async fn test_failed_copy_is_counted_and_run_continues() {
        let work_dir = TempDir::new().unwrap();
        let output_dir = work_dir.path().join("out");
        let jobs_file = work_dir.path().join("jobs.jsonl");
        std::fs::write(
            &jobs_file,
            "{\"file_path\": \"/a/1.eml\"}\n{\"file_path\": \"/a/2.eml\"}\n",
        )
        .unwrap();

        let getter = FileGetter::with_fetchers(local_only(), Offline, Truncating);
        let summary = run_jobs(&getter, &jobs_file, &output_dir).await.unwrap();

        assert_eq!(summary.failed, 2);
        assert_eq!(std::fs::read_dir(&output_dir).unwrap().count(), 0);
    }

    #[tokio::test]
    async fn test_same_file_name_overwrites_with_warning() {
        let source_dir = TempDir::new().unwrap();
        let output_dir = TempDir::new().unwrap();
        for (dir, contents) in [("a", "from a"), ("b", "from b")] {
            std::fs::create_dir(source_dir.path().join(dir)).unwrap();
            std::fs::write(source_dir.path().join(dir).join("1.eml"), contents).unwrap();
        }

        let sink = Arc::new(Mutex::new(Vec::<u8>::new()));
        let writer = {
            let sink = Arc::clone(&sink);
            move || VecWriter(Arc::clone(&sink))
        };
        let subscriber = tracing_subscriber::fmt()
            .with_writer(writer)
            .with_ansi(false)
            .with_max_level(tracing::Level::WARN)
            .finish();
        let _guard = tracing::subscriber::set_default(subscriber);

        let getter = FileGetter::with_fetchers(local_only(), Offline, OsFile);
        let first = job_for(&source_dir.path().join("a").join("1.eml"));
        let second = job_for(&source_dir.path().join("b").join("1.eml"));

        process_job(&getter, &first, output_dir.path()).await.unwrap();
        let logs = String::from_utf8(sink.lock().unwrap().clone()).unwrap();
        assert!(!logs.contains("Overwriting"));

        process_job(&getter, &second, output_dir.path()).await.unwrap();
        let logs = String::from_utf8(sink.lock().unwrap().clone()).unwrap();
        assert!(logs.contains("Overwriting"));

        let mut contents = String::new();
        tokio::fs::File::open(output_dir.path().join("1.eml"))
            .await
            .unwrap()
            .read_to_string(&mut contents)
            .await
            .unwrap();
        assert_eq!(contents, "from b");
    }

    #[test]
    fn test_job_remote_fields_default_to_empty() {
        let job: Job = serde_json::from_str(r#"{"file_path": "/data/1.eml"}"#).unwrap();
        assert_eq!(job.file_path, PathBuf::from("/data/1.eml"));

        let request = job.request();
        assert!(!request.has_remote_location());
        assert_eq!(request.bucket, "");
    }

    #[test]
    fn test_job_request_carries_location() {
        let job: Job = serde_json::from_str(
            r#"{"file_path": "/data/1.eml", "host": "minio:9000", "bucket": "mail", "key": "1.eml"}"#,
        )
        .unwrap();

        let request = job.request();
        assert!(request.has_remote_location());
        assert_eq!(request.host, "minio:9000");
        assert_eq!(request.local_path, PathBuf::from("/data/1.eml"));
    }

    #[test]
    fn test_job_requires_file_path() {
        assert!(serde_json::from_str::<Job>(r#"{"bucket": "mail"}"#).is_err());
    }

    #[test]
    fn test_summary_total() {
        let mut summary = JobSummary::default();
        summary.record(Source::Remote);
        summary.record(Source::Local);
        summary.record(Source::Local);
        summary.failed += 1;

        assert_eq!(summary.remote, 1);
        assert_eq!(summary.local, 2);
        assert_eq!(summary.total(), 4);
    }
}
