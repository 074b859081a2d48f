//! Log filter setup for the CLI.

use tracing_subscriber::EnvFilter;

/// Directives used when `RUST_LOG` is unset, empty or invalid
pub const DEFAULT_LOG_FILTER: &str = "info";

/// Filter from `RUST_LOG`, defaulting to [`DEFAULT_LOG_FILTER`] so fallback
/// warnings and job summaries are always printed.
pub fn env_filter() -> EnvFilter {
    filter_from(std::env::var(EnvFilter::DEFAULT_ENV).ok().as_deref())
}

fn filter_from(directives: Option<&str>) -> EnvFilter {
    directives
        .map(str::trim)
        .filter(|d| !d.is_empty())
        .and_then(|d| EnvFilter::try_new(d).ok())
        .unwrap_or_else(|| EnvFilter::new(DEFAULT_LOG_FILTER))
}
