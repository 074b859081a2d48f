//! filegetter
//!
//! Fetches job files from S3-compatible object storage, falling back to local
//! disk whenever remote storage is disabled, the job lacks a full remote
//! location, or the remote fetch fails.
//!
//! The selection logic lives in the `filegetter-file` crate; this crate adds
//! the CLI configuration and the job processing loop.
//!
//! # CLI Usage
//!
//! ```bash
//! # Fetch a single file, trying the remote store first
//! filegetter fetch --use-remote-fs \
//!   --access-key key --access-secret secret \
//!   --local-path /var/spool/mail/1.eml \
//!   --host minio:9000 --bucket mail --key 1.eml \
//!   --output 1.eml
//!
//! # Process a JSON Lines file of jobs
//! filegetter jobs --jobs-file jobs.jsonl --output-dir ./fetched
//! ```

pub mod config;
pub mod jobs;
pub mod logging;

pub use config::{parse_duration, RemoteOpts};
pub use filegetter_file as file;
pub use jobs::{process_job, run_jobs, Job, JobSummary};
