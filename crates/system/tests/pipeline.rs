//! Query source → sampler → scheduler, on a paused clock.

use loadavg_core::decay::{update, DECAY_15MIN, DECAY_1MIN, DECAY_5MIN};
use loadavg_core::{LoadAverage, SAMPLE_INTERVAL};
use loadavg_system::{QueryBackend, QueryCounterSource, QuerySession, Sampler, Scheduler};
use std::collections::VecDeque;
use std::sync::{Arc, Mutex};
use std::time::Duration;

/// Hands out queue lengths from a shared script; a `None` entry makes the
/// collect step fail.
#[derive(Clone)]
struct ScriptedPdh(Arc<Mutex<VecDeque<Option<u32>>>>);

struct ScriptedSession {
    next: Option<u32>,
}

impl QuerySession for ScriptedSession {
    fn add_counter(&mut self, _path: &str) -> Result<(), u32> {
        Ok(())
    }

    fn collect(&mut self) -> Result<(), u32> {
        self.next.map(|_| ()).ok_or(0xC000_07D2)
    }

    fn raw_value(&self) -> Result<u32, u32> {
        self.next.ok_or(0xC000_0BC6)
    }
}

impl QueryBackend for ScriptedPdh {
    type Session = ScriptedSession;

    fn open(&mut self) -> Result<ScriptedSession, u32> {
        let next = self.0.lock().unwrap().pop_front().unwrap_or(Some(0));
        Ok(ScriptedSession { next })
    }
}

fn expected(observations: &[Option<u32>]) -> LoadAverage {
    let mut avg = LoadAverage::default();
    for value in observations.iter().flatten() {
        let y = f64::from(*value);
        avg.short = update(avg.short, y, DECAY_1MIN);
        avg.medium = update(avg.medium, y, DECAY_5MIN);
        avg.long = update(avg.long, y, DECAY_15MIN);
    }
    avg
}

#[tokio::test(start_paused = true)]
async fn averages_follow_the_scripted_queue() {
    let script = vec![Some(4), Some(2), None, Some(7), Some(0), Some(3)];
    let pdh = ScriptedPdh(Arc::new(Mutex::new(script.iter().copied().collect())));

    let (sampler, rx) = Sampler::new(Box::new(QueryCounterSource::new(pdh)), 3);
    let mut scheduler = Scheduler::periodic(sampler, SAMPLE_INTERVAL).unwrap();
    scheduler.start().unwrap();

    // Ticks at 0, 5, 10, 15, 20, 25 seconds.
    tokio::time::sleep(SAMPLE_INTERVAL * 5 + Duration::from_millis(1)).await;
    let sampler = scheduler.stop().await.unwrap();

    let published = rx.borrow().clone();
    assert_eq!(published.samples, 5);
    assert_eq!(published.failures, 1);
    assert_eq!(published.last_observation, Some(3));

    let want = expected(&script);
    let got = sampler.averages();
    for (g, w) in [(got.short, want.short), (got.medium, want.medium), (got.long, want.long)] {
        assert!((g - w).abs() < 1e-12, "{g} vs {w}");
    }
    assert_eq!(published.averages, got);
}
