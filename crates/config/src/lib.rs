pub mod schema;

pub use schema::{Backend, DisplayConfig, LoadavgConfig, SamplerConfig};

use loadavg_core::{LoadavgError, Result};
use std::path::{Path, PathBuf};

/// Load configuration from a TOML file.  Returns `LoadavgConfig::default()`
/// if the file doesn't exist.
pub fn load(path: impl AsRef<Path>) -> Result<LoadavgConfig> {
    let path = path.as_ref();
    if !path.exists() {
        tracing::warn!(
            "Config file not found at '{}'; using defaults.",
            path.display()
        );
        return Ok(LoadavgConfig::default());
    }

    let raw = std::fs::read_to_string(path)
        .map_err(|e| LoadavgError::Config(format!("cannot read '{}': {e}", path.display())))?;

    let config: LoadavgConfig =
        toml::from_str(&raw).map_err(|e| LoadavgError::Config(format!("TOML parse error: {e}")))?;
    validate(&config)?;
    Ok(config)
}

fn validate(config: &LoadavgConfig) -> Result<()> {
    let sampler = &config.sampler;
    if sampler.initial_buffer_bytes == 0 {
        return Err(LoadavgError::Config("sampler.initial_buffer_bytes must be > 0".into()));
    }
    if sampler.max_buffer_bytes < sampler.initial_buffer_bytes {
        return Err(LoadavgError::Config(format!(
            "sampler.max_buffer_bytes ({}) is below initial_buffer_bytes ({})",
            sampler.max_buffer_bytes, sampler.initial_buffer_bytes
        )));
    }
    if sampler.not_found_warn_after == 0 {
        return Err(LoadavgError::Config("sampler.not_found_warn_after must be > 0".into()));
    }
    if config.display.refresh_ms == 0 {
        return Err(LoadavgError::Config("display.refresh_ms must be > 0".into()));
    }
    Ok(())
}

/// Return the default config path.
///
/// `$LOADAVG_CONFIG` wins; otherwise `%APPDATA%`, `$XDG_CONFIG_HOME` and
/// `$HOME/.config` are tried in that order.
pub fn default_path() -> PathBuf {
    if let Ok(explicit) = std::env::var("LOADAVG_CONFIG") {
        return PathBuf::from(explicit);
    }
    let base = std::env::var("APPDATA")
        .or_else(|_| std::env::var("XDG_CONFIG_HOME"))
        .map(PathBuf::from)
        .unwrap_or_else(|_| {
            let home = std::env::var("HOME").unwrap_or_else(|_| ".".to_string());
            PathBuf::from(home).join(".config")
        });
    base.join("loadavg").join("loadavg.toml")
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    fn write_config(body: &str) -> tempfile::NamedTempFile {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(body.as_bytes()).unwrap();
        file
    }

    #[test]
    fn missing_file_gives_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let config = load(dir.path().join("nope.toml")).unwrap();
        assert_eq!(config.sampler.backend, Backend::Registry);
        assert_eq!(config.sampler.initial_buffer_bytes, 1024);
        assert_eq!(config.display.refresh_ms, 100);
    }

    #[test]
    fn partial_file_fills_in_defaults() {
        let file = write_config("[sampler]\nbackend = \"query\"\n");
        let config = load(file.path()).unwrap();
        assert_eq!(config.sampler.backend, Backend::Query);
        assert_eq!(config.sampler.not_found_warn_after, 3);
        assert_eq!(config.sampler.max_buffer_bytes, 4 * 1024 * 1024);
        assert_eq!(config.display.refresh_ms, 100);
    }

    #[test]
    fn unknown_backend_is_a_config_error() {
        let file = write_config("[sampler]\nbackend = \"wmi\"\n");
        assert!(matches!(load(file.path()), Err(LoadavgError::Config(_))));
    }

    #[test]
    fn cap_below_initial_size_is_rejected() {
        let file = write_config("[sampler]\ninitial_buffer_bytes = 4096\nmax_buffer_bytes = 1024\n");
        let err = load(file.path()).unwrap_err();
        assert!(err.to_string().contains("max_buffer_bytes"), "{err}");
    }

    #[test]
    fn zero_escalation_threshold_is_rejected() {
        let file = write_config("[sampler]\nnot_found_warn_after = 0\n");
        let err = load(file.path()).unwrap_err();
        assert!(err.to_string().contains("not_found_warn_after"), "{err}");
    }

    #[test]
    fn zero_refresh_is_rejected() {
        let file = write_config("[display]\nrefresh_ms = 0\n");
        assert!(matches!(load(file.path()), Err(LoadavgError::Config(_))));
    }
}
