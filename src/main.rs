//! Command-line interface for filegetter
//!
//! # Usage Examples
//!
//! ## Single fetch
//! ```bash
//! # Remote first, local fallback
//! FILEGETTER_ACCESS_KEY=key FILEGETTER_ACCESS_SECRET=secret \
//! filegetter fetch --use-remote-fs \
//!   --local-path /var/spool/mail/1.eml \
//!   --host minio:9000 --bucket mail --key 1.eml
//!
//! # Local only, written to a file
//! filegetter fetch --local-path /var/spool/mail/1.eml --output 1.eml
//! ```
//!
//! ## Job loop
//! ```bash
//! filegetter jobs --use-remote-fs \
//!   --jobs-file jobs.jsonl \
//!   --output-dir ./fetched
//! ```
//!
//! Warnings and summaries are logged to stderr by default; set
//! `RUST_LOG=debug` to also see which source satisfied each fetch.

use anyhow::Context;
use clap::{Parser, Subcommand};
use filegetter::file::{FetchRequest, FileGetter};
use filegetter::{run_jobs, RemoteOpts};
use std::path::PathBuf;
use tokio::io::AsyncWriteExt;
use tracing::info;

#[derive(Parser)]
#[command(name = "filegetter")]
#[command(about = "Fetch files from remote object storage with local fallback")]
#[command(long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Fetch a single file
    Fetch {
        /// Local path, used when remote storage is disabled or unavailable
        #[arg(long)]
        local_path: PathBuf,

        /// Remote storage host (name, name:port or URL)
        #[arg(long, default_value = "")]
        host: String,

        /// Remote bucket
        #[arg(long, default_value = "")]
        bucket: String,

        /// Remote object key
        #[arg(long, default_value = "")]
        key: String,

        /// Write the content here instead of stdout
        #[arg(long, short = 'o')]
        output: Option<PathBuf>,

        /// Remote storage options
        #[command(flatten)]
        remote: RemoteOpts,
    },

    /// Process a JSON Lines file of jobs
    Jobs {
        /// Jobs file, one JSON object per line
        #[arg(long)]
        jobs_file: PathBuf,

        /// Directory receiving the fetched files
        #[arg(long, short = 'o')]
        output_dir: PathBuf,

        /// Remote storage options
        #[command(flatten)]
        remote: RemoteOpts,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    if let Err(e) = run().await {
        eprintln!("Error: {e:#}");
        std::process::exit(1);
    }
    Ok(())
}

async fn run() -> anyhow::Result<()> {
    // Initialize tracing
    tracing_subscriber::fmt()
        .with_env_filter(filegetter::logging::env_filter())
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Fetch {
            local_path,
            host,
            bucket,
            key,
            output,
            remote,
        } => {
            let getter = FileGetter::new(remote.getter_config(), remote.s3_options()?);
            let request = FetchRequest::new(local_path).with_remote(host, bucket, key);

            let mut fetched = getter
                .fetch_file(&request)
                .await
                .with_context(|| format!("Failed to fetch {}", request.local_path.display()))?;

            let copied = match output {
                Some(path) => {
                    let mut file = tokio::fs::File::create(&path)
                        .await
                        .with_context(|| format!("Failed to create {}", path.display()))?;
                    let copied = tokio::io::copy(&mut fetched.reader, &mut file).await?;
                    file.flush().await?;
                    copied
                }
                None => {
                    let mut stdout = tokio::io::stdout();
                    let copied = tokio::io::copy(&mut fetched.reader, &mut stdout).await?;
                    stdout.flush().await?;
                    copied
                }
            };

            info!("Fetched {copied} bytes from {} source", fetched.source);
        }
        Commands::Jobs {
            jobs_file,
            output_dir,
            remote,
        } => {
            let getter = FileGetter::new(remote.getter_config(), remote.s3_options()?);
            let summary = run_jobs(&getter, &jobs_file, &output_dir).await?;
            if summary.failed > 0 {
                anyhow::bail!("{} of {} jobs failed", summary.failed, summary.total());
            }
        }
    }

    Ok(())
}
