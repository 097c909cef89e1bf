pub mod counter;
pub mod perf_data;
pub mod query;
pub mod registry;
pub mod sampler;
pub mod scheduler;
#[cfg(windows)]
pub mod win32;

pub use counter::CounterSource;
pub use query::{QueryBackend, QueryCounterSource, QuerySession};
pub use registry::{CounterBuffer, FetchStatus, PerfDataRegistry, RegistryCounterSource};
pub use sampler::Sampler;
pub use scheduler::{IntervalTimer, Scheduler, SchedulerState, Timer};

use loadavg_config::{Backend, SamplerConfig};
use loadavg_core::Result;

/// Build the counter source selected in `config`.
#[cfg(windows)]
pub fn open_source(config: &SamplerConfig) -> Result<Box<dyn CounterSource>> {
    use loadavg_core::LoadavgError;
    use win32::{PdhBackend, PerformanceDataKey};

    let source: Box<dyn CounterSource> = match config.backend {
        Backend::Registry => Box::new(
            RegistryCounterSource::new(
                PerformanceDataKey::open(),
                config.initial_buffer_bytes,
                config.max_buffer_bytes,
            )
            .map_err(|e| LoadavgError::Backend(e.to_string()))?,
        ),
        Backend::Query => Box::new(QueryCounterSource::new(PdhBackend)),
    };
    tracing::info!(backend = source.name(), "counter source ready");
    Ok(source)
}

/// Build the counter source selected in `config`.
#[cfg(not(windows))]
pub fn open_source(config: &SamplerConfig) -> Result<Box<dyn CounterSource>> {
    let backend = match config.backend {
        Backend::Registry => "registry",
        Backend::Query => "query",
    };
    Err(loadavg_core::LoadavgError::Unsupported(format!(
        "the {backend} counter backend needs Windows performance counters"
    )))
}
