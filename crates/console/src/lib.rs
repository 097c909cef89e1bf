//! Console front end for `loadavg`.
//!
//! Wires the pieces together:
//! - counter source chosen by the config file
//! - sampler + scheduler on a background Tokio runtime
//! - a spinner line on stdout, redrawn until a key is pressed

pub mod spinner;
pub mod terminal;

use loadavg_config::{default_path, load as load_config, LoadavgConfig};
use loadavg_core::{LoadSnapshot, Result, SAMPLE_INTERVAL};
use loadavg_system::{open_source, Sampler, Scheduler};
use spinner::{render_line, Spinner};
use std::io::{self, Write};
use std::time::Duration;
use terminal::{key_pressed, wait_for_key, RawMode};
use tokio::sync::watch;
use tracing::{info, warn};

/// Exit prompt poll interval.
const EXIT_POLL: Duration = Duration::from_millis(250);

// ── Entry point ───────────────────────────────────────────────────────────────

/// Sample and display until a key is pressed, then wait for a second key
/// before returning.
pub fn run() -> Result<()> {
    let config = load_config(default_path()).unwrap_or_else(|e| {
        warn!("{e}; using defaults");
        LoadavgConfig::default()
    });

    let runtime = tokio::runtime::Builder::new_multi_thread()
        .worker_threads(1)
        .thread_name("loadavg-sampler")
        .enable_time()
        .build()?;

    let source = open_source(&config.sampler)?;
    let (sampler, snapshots) = Sampler::new(source, config.sampler.not_found_warn_after);
    let mut scheduler = Scheduler::periodic(sampler, SAMPLE_INTERVAL)?;
    {
        let _rt = runtime.enter();
        scheduler.start()?;
    }

    let refresh = Duration::from_millis(config.display.refresh_ms);
    let displayed = display(&snapshots, refresh);

    // Stop before the counter source (and its buffer) is dropped.
    let sampler = runtime.block_on(scheduler.stop())?;
    info!(
        samples = sampler.snapshot().samples,
        failures = sampler.snapshot().failures,
        "sampler finished"
    );
    drop(sampler);
    displayed?;

    println!("Press any key to exit.");
    let _raw = RawMode::enable()?;
    wait_for_key(EXIT_POLL)?;
    Ok(())
}

// ── Display ───────────────────────────────────────────────────────────────────

/// Redraw the status line every `refresh` until a key is pressed.
fn display(snapshots: &watch::Receiver<LoadSnapshot>, refresh: Duration) -> io::Result<()> {
    let _raw = RawMode::enable()?;
    let mut stdout = io::stdout().lock();
    let mut spinner = Spinner::default();

    loop {
        let averages = snapshots.borrow().averages;
        write!(stdout, "{}\r", render_line(spinner.advance(), &averages))?;
        stdout.flush()?;

        if key_pressed(refresh)? {
            break;
        }
    }

    // Clear the spinner.
    write!(stdout, " \r\n")?;
    stdout.flush()
}
