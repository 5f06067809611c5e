//! Console logging for the command-line tool

use tracing_subscriber::EnvFilter;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;

/// Build the `EnvFilter` from the base level plus noisy-crate overrides
///
/// `RUST_LOG`, when set, replaces the whole filter.
pub fn build_env_filter(level: &str) -> anyhow::Result<EnvFilter> {
    if let Ok(filter) = EnvFilter::try_from_default_env() {
        return Ok(filter);
    }

    let mut directives = vec![level.to_string()];

    let noisy: &[(&str, &str)] = &[
        ("arrow", "warn"),
        ("parquet", "warn"),
        ("tokio_postgres", "warn"),
        ("duckdb", "warn"),
    ];
    for (target, lvl) in noisy {
        directives.push(format!("{}={}", target, lvl));
    }

    let filter_str = directives.join(",");
    EnvFilter::try_new(&filter_str)
        .map_err(|e| anyhow::anyhow!("Invalid tracing filter '{}': {}", filter_str, e))
}

/// Install the console subscriber, writing to stderr
///
/// Listings printed by the commands go to stdout, so logs never interleave
/// with piped output.
pub fn init_logging(level: &str) -> anyhow::Result<()> {
    let filter = build_env_filter(level)?;
    let console = tracing_subscriber::fmt::layer()
        .with_target(false)
        .with_writer(std::io::stderr);

    tracing_subscriber::registry()
        .with(filter)
        .with(console)
        .try_init()
        .map_err(|e| anyhow::anyhow!("Failed to install tracing subscriber: {}", e))
}
