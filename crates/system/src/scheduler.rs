//! Fixed-cadence driver for [`Sampler::tick`].
//!
//! One background task owns the sampler, so ticks are serialized: a slow
//! tick delays the next one but never overlaps it. `stop` waits for that
//! task, which means an in-flight sample always finishes first.

use crate::sampler::Sampler;
use loadavg_core::{LoadavgError, Result};
use std::any::Any;
use std::future::Future;
use std::time::Duration;
use tokio::sync::oneshot;
use tokio::task::JoinHandle;
use tokio::time::{Interval, MissedTickBehavior};
use tracing::info;

/// Source of tick deadlines.
pub trait Timer: Send + 'static {
    /// Resolves when the next tick is due. The first call resolves
    /// immediately.
    fn tick(&mut self) -> impl Future<Output = ()> + Send;
}

/// Wall-clock timer with a fixed period measured from tick start.
///
/// Deadlines that pass while a tick is still running are fired back-to-back
/// afterwards instead of being dropped.
#[derive(Debug)]
pub struct IntervalTimer {
    period: Duration,
    interval: Option<Interval>,
}

impl IntervalTimer {
    pub fn new(period: Duration) -> Result<Self> {
        if period.is_zero() {
            return Err(LoadavgError::Scheduler("sample period must be non-zero".into()));
        }
        Ok(Self { period, interval: None })
    }
}

impl Timer for IntervalTimer {
    async fn tick(&mut self) {
        let period = self.period;
        // Armed lazily so construction does not need a runtime.
        let interval = self.interval.get_or_insert_with(|| {
            let mut interval = tokio::time::interval(period);
            interval.set_missed_tick_behavior(MissedTickBehavior::Burst);
            interval
        });
        interval.tick().await;
    }
}

/// Lifecycle of a [`Scheduler`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SchedulerState {
    Idle,
    Running,
    /// Stop was requested; the in-flight tick (if any) is finishing.
    Stopping,
    /// Terminal.
    Stopped,
}

enum Slot<T> {
    Idle { sampler: Sampler, timer: T },
    Running { stop: oneshot::Sender<()>, task: JoinHandle<Sampler> },
    Stopping { task: JoinHandle<Sampler> },
    Stopped,
}

impl<T> Slot<T> {
    fn state(&self) -> SchedulerState {
        match self {
            Self::Idle { .. }     => SchedulerState::Idle,
            Self::Running { .. }  => SchedulerState::Running,
            Self::Stopping { .. } => SchedulerState::Stopping,
            Self::Stopped         => SchedulerState::Stopped,
        }
    }
}

/// Runs a [`Sampler`] on a background task, once per timer tick.
pub struct Scheduler<T: Timer = IntervalTimer> {
    slot: Slot<T>,
}

impl Scheduler<IntervalTimer> {
    /// Scheduler ticking every `period`, starting immediately.
    pub fn periodic(sampler: Sampler, period: Duration) -> Result<Self> {
        Ok(Self::new(sampler, IntervalTimer::new(period)?))
    }
}

impl<T: Timer> Scheduler<T> {
    pub fn new(sampler: Sampler, timer: T) -> Self {
        Self { slot: Slot::Idle { sampler, timer } }
    }

    pub fn state(&self) -> SchedulerState {
        self.slot.state()
    }

    /// Spawn the sampling task on the current Tokio runtime.
    pub fn start(&mut self) -> Result<()> {
        let handle = tokio::runtime::Handle::try_current()
            .map_err(|e| LoadavgError::Scheduler(format!("cannot arm timer: {e}")))?;

        match std::mem::replace(&mut self.slot, Slot::Stopped) {
            Slot::Idle { sampler, timer } => {
                let (stop, stop_rx) = oneshot::channel();
                let task = handle.spawn(run(sampler, timer, stop_rx));
                self.slot = Slot::Running { stop, task };
                info!("sampling started");
                Ok(())
            }
            other => {
                let state = other.state();
                self.slot = other;
                Err(LoadavgError::Scheduler(format!("cannot start a {state:?} scheduler")))
            }
        }
    }

    /// Stop sampling and hand the sampler back.
    ///
    /// Returns once the background task has exited; no tick runs after
    /// that. If this future is dropped early the scheduler stays in
    /// `Stopping` and a later call resumes the wait.
    pub async fn stop(&mut self) -> Result<Sampler> {
        match std::mem::replace(&mut self.slot, Slot::Stopped) {
            Slot::Idle { sampler, .. } => {
                info!("scheduler stopped before it started");
                return Ok(sampler);
            }
            Slot::Running { stop, task } => {
                // The task may already be gone if it panicked; join reports that.
                let _ = stop.send(());
                self.slot = Slot::Stopping { task };
            }
            Slot::Stopping { task } => self.slot = Slot::Stopping { task },
            Slot::Stopped => {
                return Err(LoadavgError::Scheduler("scheduler already stopped".into()));
            }
        }

        let joined = match &mut self.slot {
            Slot::Stopping { task } => task.await,
            _ => return Err(LoadavgError::Scheduler("scheduler lost its task".into())),
        };
        self.slot = Slot::Stopped;

        let sampler = joined.map_err(|e| LoadavgError::Scheduler(format!("sampling task failed: {e}")))?;
        info!(samples = sampler.snapshot().samples, "sampling stopped");
        Ok(sampler)
    }
}

async fn run<T: Timer>(mut sampler: Sampler, mut timer: T, mut stop: oneshot::Receiver<()>) -> Sampler {
    loop {
        tokio::select! {
            // A pending stop wins over a due tick.
            biased;
            _ = &mut stop => break,
            () = timer.tick() => {
                sampler = tick_off_runtime(sampler).await;
            }
        }
    }
    sampler
}

/// Run one tick on the blocking pool. The OS counter queries are
/// synchronous, and the runtime also drives the timer and the stop signal.
async fn tick_off_runtime(mut sampler: Sampler) -> Sampler {
    let joined = tokio::task::spawn_blocking(move || {
        sampler.tick();
        sampler
    })
    .await;
    match joined {
        Ok(sampler) => sampler,
        // Re-raise so `stop` reports the failed task.
        Err(e) => {
            let payload: Box<dyn Any + Send> = match e.try_into_panic() {
                Ok(payload) => payload,
                Err(_) => Box::new("sampling tick was cancelled"),
            };
            std::panic::resume_unwind(payload)
        }
    }
}
