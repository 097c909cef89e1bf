//! loadavg: a Unix-style 1/5/15-minute load average for Windows.
//!
//! Run with:  `RUST_LOG=info loadavg`

use anyhow::Result;
use tracing_subscriber::EnvFilter;

fn main() -> Result<()> {
    // Structured logging. RUST_LOG controls verbosity (default: info).
    // Goes to stderr so the spinner line on stdout stays intact.
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .init();

    tracing::info!("loadavg v{} starting", env!("CARGO_PKG_VERSION"));

    loadavg_console::run().map_err(Into::into)
}
