use std::fs;
use std::path::PathBuf;

use serde::Deserialize;
use thiserror::Error;

pub const CONFIG_ENV_VAR: &str = "DOMSHIM_CONFIG";

const DEFAULT_LOG_FILTER: &str = "info";
const DEFAULT_MAX_PENDING_JOBS: usize = 1000;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read shim config: {0}")]
    Io(#[from] std::io::Error),
    #[error("failed to parse YAML: {0}")]
    Yaml(#[from] serde_yaml::Error),
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct ShimConfig {
    /// `tracing` filter used when `RUST_LOG` is unset.
    pub log_filter: String,
    /// Upper bound on promise jobs drained after each script evaluation.
    pub max_pending_jobs: usize,
    pub echo_console: bool,
}

impl Default for ShimConfig {
    fn default() -> Self {
        Self {
            log_filter: DEFAULT_LOG_FILTER.to_string(),
            max_pending_jobs: DEFAULT_MAX_PENDING_JOBS,
            echo_console: true,
        }
    }
}

impl ShimConfig {
    pub fn load(config_path: Option<PathBuf>) -> Result<Self, ConfigError> {
        match config_path {
            Some(path) if path.exists() => {
                let contents = fs::read_to_string(path)?;
                Ok(serde_yaml::from_str(&contents)?)
            }
            _ => Ok(Self::default()),
        }
    }

    pub fn from_env() -> Result<Self, ConfigError> {
        Self::load(std::env::var(CONFIG_ENV_VAR).ok().map(PathBuf::from))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::NamedTempFile;

    #[test]
    fn loads_default() {
        let config = ShimConfig::load(None).unwrap();
        assert_eq!(config, ShimConfig::default());
        assert_eq!(config.max_pending_jobs, 1000);

        let missing = ShimConfig::load(Some(PathBuf::from("/nonexistent/domshim.yaml"))).unwrap();
        assert_eq!(missing, ShimConfig::default());
    }

    #[test]
    fn loads_from_file() {
        let mut file = NamedTempFile::new().unwrap();
        use std::io::Write;
        writeln!(file, "log_filter: domshim=trace\nmax_pending_jobs: 5").unwrap();
        let config = ShimConfig::load(Some(file.path().to_path_buf())).unwrap();
        assert_eq!(config.log_filter, "domshim=trace");
        assert_eq!(config.max_pending_jobs, 5);
        assert!(config.echo_console);
    }

    #[test]
    fn rejects_malformed_yaml() {
        let mut file = NamedTempFile::new().unwrap();
        use std::io::Write;
        writeln!(file, "max_pending_jobs: [not, a, number]").unwrap();
        let err = ShimConfig::load(Some(file.path().to_path_buf())).unwrap_err();
        assert!(matches!(err, ConfigError::Yaml(_)));
    }
}
