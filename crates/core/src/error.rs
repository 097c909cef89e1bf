use std::fmt;
use thiserror::Error;

/// Top-level error type used across the entire application.
#[derive(Debug, Error)]
pub enum LoadavgError {
    #[error("config error: {0}")]
    Config(String),

    #[error("backend error: {0}")]
    Backend(String),

    #[error("scheduler error: {0}")]
    Scheduler(String),

    #[error("unsupported platform: {0}")]
    Unsupported(String),

    #[error("I/O error: {source}")]
    Io {
        #[from]
        source: std::io::Error,
    },
}

pub type Result<T, E = LoadavgError> = std::result::Result<T, E>;

/// The OS call that failed while collecting a sample.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BackendStep {
    /// Opening a counter query session.
    OpenQuery,
    /// Registering the counter path with the session.
    AddCounter,
    /// Collecting the query data.
    Collect,
    /// Reading the raw counter value.
    ReadValue,
    /// Reading the performance-data block from the registry.
    RegistryFetch,
}

impl fmt::Display for BackendStep {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::OpenQuery     => write!(f, "PdhOpenQuery"),
            Self::AddCounter    => write!(f, "PdhAddCounter"),
            Self::Collect       => write!(f, "PdhCollectQueryData"),
            Self::ReadValue     => write!(f, "PdhGetRawCounterValue"),
            Self::RegistryFetch => write!(f, "RegQueryValueEx"),
        }
    }
}

/// Why a single sample could not be taken.
///
/// None of these are fatal: the sampler skips the tick and tries again on the
/// next period.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SampleError {
    #[error("{step} failed with status {status:#x}")]
    BackendUnavailable { step: BackendStep, status: u32 },

    #[error("counter with title index {index} not found in performance data")]
    CounterNotFound { index: u32 },

    #[error("cannot grow performance data buffer to {requested} bytes")]
    AllocationFailure { requested: usize },

    #[error("malformed performance data: {0}")]
    Malformed(String),
}

impl SampleError {
    pub fn backend(step: BackendStep, status: u32) -> Self {
        Self::BackendUnavailable { step, status }
    }
}
