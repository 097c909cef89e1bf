//! Counter source backed by a counter-query session (PDH on Windows).

use crate::counter::CounterSource;
use loadavg_core::{BackendStep, SampleError};

/// English counter path, independent of the system UI language.
pub const PROCESSOR_QUEUE_LENGTH_PATH: &str = r"\System\Processor Queue Length";

/// An open query. Dropping it closes the session.
///
/// Errors carry the raw OS status code.
pub trait QuerySession {
    fn add_counter(&mut self, path: &str) -> Result<(), u32>;
    fn collect(&mut self) -> Result<(), u32>;
    fn raw_value(&self) -> Result<u32, u32>;
}

/// Opens query sessions.
pub trait QueryBackend: Send {
    type Session: QuerySession;

    fn open(&mut self) -> Result<Self::Session, u32>;
}

/// Opens a fresh session on every sample and closes it before returning.
pub struct QueryCounterSource<B> {
    backend: B,
}

impl<B: QueryBackend> QueryCounterSource<B> {
    pub fn new(backend: B) -> Self {
        Self { backend }
    }
}

impl<B: QueryBackend> CounterSource for QueryCounterSource<B> {
    fn name(&self) -> &'static str {
        "query"
    }

    fn sample(&mut self) -> Result<u32, SampleError> {
        let mut session = self
            .backend
            .open()
            .map_err(|status| SampleError::backend(BackendStep::OpenQuery, status))?;
        session
            .add_counter(PROCESSOR_QUEUE_LENGTH_PATH)
            .map_err(|status| SampleError::backend(BackendStep::AddCounter, status))?;
        session
            .collect()
            .map_err(|status| SampleError::backend(BackendStep::Collect, status))?;
        session
            .raw_value()
            .map_err(|status| SampleError::backend(BackendStep::ReadValue, status))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicU32, Ordering};
    use std::sync::Arc;

    #[derive(Default)]
    struct Script {
        fail_at: Option<BackendStep>,
        opened: AtomicU32,
        closed: AtomicU32,
    }

    struct FakeBackend {
        script: Arc<Script>,
        value: u32,
    }

    struct FakeSession {
        script: Arc<Script>,
        value: u32,
        counter: Option<String>,
        collected: bool,
    }

    const STATUS: u32 = 0xC000_0BB8;

    impl FakeSession {
        fn check(&self, step: BackendStep) -> Result<(), u32> {
            match self.script.fail_at {
                Some(failing) if failing == step => Err(STATUS),
                _ => Ok(()),
            }
        }
    }

    impl QuerySession for FakeSession {
        fn add_counter(&mut self, path: &str) -> Result<(), u32> {
            self.check(BackendStep::AddCounter)?;
            assert_eq!(path, "\\System\\Processor Queue Length");
            self.counter = Some(path.to_string());
            Ok(())
        }

        fn collect(&mut self) -> Result<(), u32> {
            self.check(BackendStep::Collect)?;
            assert!(self.counter.is_some(), "collect before add_counter");
            self.collected = true;
            Ok(())
        }

        fn raw_value(&self) -> Result<u32, u32> {
            self.check(BackendStep::ReadValue)?;
            assert!(self.collected, "read before collect");
            Ok(self.value)
        }
    }

    impl Drop for FakeSession {
        fn drop(&mut self) {
            self.script.closed.fetch_add(1, Ordering::SeqCst);
        }
    }

    impl QueryBackend for FakeBackend {
        type Session = FakeSession;

        fn open(&mut self) -> Result<FakeSession, u32> {
            if self.script.fail_at == Some(BackendStep::OpenQuery) {
                return Err(STATUS);
            }
            self.script.opened.fetch_add(1, Ordering::SeqCst);
            Ok(FakeSession { script: self.script.clone(), value: self.value, counter: None, collected: false })
        }
    }

    fn source(fail_at: Option<BackendStep>) -> (QueryCounterSource<FakeBackend>, Arc<Script>) {
        let script = Arc::new(Script { fail_at, ..Default::default() });
        (QueryCounterSource::new(FakeBackend { script: script.clone(), value: 3 }), script)
    }

    #[test]
    fn reads_the_raw_value_and_closes_every_session() {
        let (mut src, script) = source(None);
        for _ in 0..3 {
            assert_eq!(src.sample(), Ok(3));
        }
        assert_eq!(script.opened.load(Ordering::SeqCst), 3);
        assert_eq!(script.closed.load(Ordering::SeqCst), 3);
    }

    #[test]
    fn each_failing_step_is_reported() {
        for step in [
            BackendStep::OpenQuery,
            BackendStep::AddCounter,
            BackendStep::Collect,
            BackendStep::ReadValue,
        ] {
            let (mut src, script) = source(Some(step));
            assert_eq!(src.sample(), Err(SampleError::BackendUnavailable { step, status: STATUS }));
            // Whatever was opened got closed again.
            assert_eq!(script.opened.load(Ordering::SeqCst), script.closed.load(Ordering::SeqCst));
        }
    }
}
