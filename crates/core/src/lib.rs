pub mod decay;
pub mod error;
pub mod state;

pub use decay::{TimeClass, SAMPLE_INTERVAL};
pub use error::{BackendStep, LoadavgError, Result, SampleError};
pub use state::{LoadAverage, LoadSnapshot};
