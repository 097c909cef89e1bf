use crate::counter::CounterSource;
use chrono::Local;
use loadavg_core::{LoadAverage, LoadSnapshot, SampleError};
use tokio::sync::watch;
use tracing::{error, trace, warn};

/// Take one sample and fold it into `state`.
///
/// On error `state` is left untouched.
pub fn tick(source: &mut dyn CounterSource, state: &mut LoadAverage) -> Result<u32, SampleError> {
    let running = source.sample()?;
    state.observe(f64::from(running));
    Ok(running)
}

/// Owns a counter source and the running averages, and publishes a fresh
/// [`LoadSnapshot`] after every tick.
pub struct Sampler {
    source: Box<dyn CounterSource>,
    snapshot: LoadSnapshot,
    consecutive_not_found: u32,
    not_found_warn_after: u32,
    publisher: watch::Sender<LoadSnapshot>,
}

impl Sampler {
    /// `not_found_warn_after` consecutive "counter not found" failures are
    /// escalated to an error log line.
    pub fn new(
        source: Box<dyn CounterSource>,
        not_found_warn_after: u32,
    ) -> (Self, watch::Receiver<LoadSnapshot>) {
        let (publisher, rx) = watch::channel(LoadSnapshot::default());
        let sampler = Self {
            source,
            snapshot: LoadSnapshot::default(),
            consecutive_not_found: 0,
            not_found_warn_after,
            publisher,
        };
        (sampler, rx)
    }

    pub fn averages(&self) -> LoadAverage {
        self.snapshot.averages
    }

    pub fn snapshot(&self) -> &LoadSnapshot {
        &self.snapshot
    }

    /// Sample once and publish. A failed sample is logged and skipped; it
    /// never propagates. Returns the raw value when the averages moved.
    pub fn tick(&mut self) -> Option<u32> {
        let outcome = tick(self.source.as_mut(), &mut self.snapshot.averages);
        let result = match outcome {
            Ok(running) => {
                self.consecutive_not_found = 0;
                self.snapshot.samples += 1;
                self.snapshot.last_observation = Some(running);
                self.snapshot.updated_at = Some(Local::now());
                trace!(running, averages = ?self.snapshot.averages, "sampled");
                Some(running)
            }
            Err(e) => {
                self.snapshot.failures += 1;
                self.record_failure(&e);
                None
            }
        };
        self.publisher.send_replace(self.snapshot.clone());
        result
    }

    fn record_failure(&mut self, e: &SampleError) {
        let source = self.source.name();
        warn!(source, "sample failed; skipping tick: {e}");

        if matches!(e, SampleError::CounterNotFound { .. }) {
            self.consecutive_not_found += 1;
            if self.consecutive_not_found == self.not_found_warn_after {
                error!(
                    source,
                    failures = self.consecutive_not_found,
                    "processor queue length keeps missing from performance data; \
                     this Windows version may not expose it"
                );
            }
        } else {
            self.consecutive_not_found = 0;
        }
    }
}
