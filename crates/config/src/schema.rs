use serde::{Deserialize, Serialize};

/// Root configuration structure parsed from `loadavg.toml`.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct LoadavgConfig {
    /// Counter source settings.
    pub sampler: SamplerConfig,
    /// Console output settings.
    pub display: DisplayConfig,
}

/// Which OS subsystem supplies the processor queue length.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum Backend {
    /// `HKEY_PERFORMANCE_DATA` performance-data block.
    #[default]
    Registry,
    /// PDH counter query.
    Query,
}

/// Counter source settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SamplerConfig {
    pub backend: Backend,
    /// Starting size of the registry buffer. The System object needs ~944
    /// bytes, so 1 KiB avoids a growth round-trip on the first fetch.
    pub initial_buffer_bytes: usize,
    /// The registry buffer never grows past this.
    pub max_buffer_bytes: usize,
    /// Consecutive "counter not found" failures before logging an error.
    pub not_found_warn_after: u32,
}

impl Default for SamplerConfig {
    fn default() -> Self {
        Self {
            backend:              Backend::Registry,
            initial_buffer_bytes: 1024,
            max_buffer_bytes:     4 * 1024 * 1024,
            not_found_warn_after: 3,
        }
    }
}

/// Console output settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct DisplayConfig {
    /// Spinner redraw period in milliseconds.
    pub refresh_ms: u64,
}

impl Default for DisplayConfig {
    fn default() -> Self {
        Self { refresh_ms: 100 }
    }
}
