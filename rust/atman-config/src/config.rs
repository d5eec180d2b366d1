// Engine configuration schema, defaults and validation

use crate::{ConfigError, ConfigResult};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Root configuration document (`atman.toml`)
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct AtmanConfig {
    pub engine: EngineConfig,
}

/// Engine tunables. Every field has a working default; a missing file
/// or section is not an error.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    /// Max triples per delta (additions + removals)
    pub batch_limit: usize,
    /// Convergence budget for run_to_completion
    pub max_ticks: u64,
    /// Wall budget for hooks that do not set their own
    pub hook_default_timeout_ms: u64,
    /// Condition result cache entries
    pub cache_capacity: usize,
    /// Condition result cache TTL
    pub cache_ttl_ms: u64,
    /// Fail run_to_completion on any rule failure
    pub strict_tick: bool,
    /// Predicate the status inspector resolves over
    pub status_predicate: String,
    /// Receipt log directory; unset keeps the chain in memory
    #[serde(skip_serializing_if = "Option::is_none")]
    pub lockchain_dir: Option<PathBuf>,
    pub sandbox: SandboxConfig,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            batch_limit: 64,
            max_ticks: 10_000,
            hook_default_timeout_ms: 2_000,
            cache_capacity: 1_024,
            cache_ttl_ms: 60_000,
            strict_tick: false,
            status_predicate: "urn:wf:status".to_string(),
            lockchain_dir: None,
            sandbox: SandboxConfig::default(),
        }
    }
}

/// Default sandbox limits applied to hooks without explicit limits
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SandboxConfig {
    pub cpu_ms: u64,
    pub wall_ms: u64,
    pub heap_bytes: u64,
    pub max_file_handles: u32,
    pub allow_network: bool,
    pub allow_subprocess: bool,
}

impl Default for SandboxConfig {
    fn default() -> Self {
        Self {
            cpu_ms: 1_000,
            wall_ms: 2_000,
            heap_bytes: 64 * 1024 * 1024,
            max_file_handles: 8,
            allow_network: false,
            allow_subprocess: false,
        }
    }
}

/// Load configuration: defaults, overlaid by `path` when it exists,
/// overlaid by `ATMAN_*` environment variables
pub fn load_config(path: Option<&Path>) -> ConfigResult<AtmanConfig> {
    let mut config = match path {
        Some(path) if path.exists() => load_from_file(path)?,
        _ => AtmanConfig::default(),
    };
    crate::env::apply_env_overrides(&mut config)?;
    validate_config(&config)?;
    Ok(config)
}

/// Load configuration from a TOML file
pub fn load_from_file(path: &Path) -> ConfigResult<AtmanConfig> {
    let content =
        std::fs::read_to_string(path).map_err(|e| ConfigError::Io(e.to_string()))?;
    toml::from_str(&content).map_err(|e| ConfigError::Parse(e.to_string()))
}

/// Validate configuration invariants
pub fn validate_config(config: &AtmanConfig) -> ConfigResult<()> {
    let engine = &config.engine;
    if engine.batch_limit == 0 {
        return Err(ConfigError::Validation(
            "batch_limit must be at least 1".to_string(),
        ));
    }
    if engine.max_ticks == 0 {
        return Err(ConfigError::Validation(
            "max_ticks must be at least 1".to_string(),
        ));
    }
    if engine.cache_capacity == 0 {
        return Err(ConfigError::Validation(
            "cache_capacity must be at least 1".to_string(),
        ));
    }
    if engine.sandbox.cpu_ms > engine.sandbox.wall_ms {
        return Err(ConfigError::Validation(format!(
            "sandbox cpu_ms {} exceeds wall_ms {}",
            engine.sandbox.cpu_ms, engine.sandbox.wall_ms
        )));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_defaults_match_engine_contract() {
        let config = EngineConfig::default();
        assert_eq!(config.batch_limit, 64);
        assert_eq!(config.max_ticks, 10_000);
        assert_eq!(config.hook_default_timeout_ms, 2_000);
        assert_eq!(config.cache_capacity, 1_024);
        assert_eq!(config.cache_ttl_ms, 60_000);
        assert!(!config.strict_tick);
        assert!(!config.sandbox.allow_network);
        assert!(!config.sandbox.allow_subprocess);
    }

    #[test]
    fn test_missing_file_yields_defaults() {
        let config = load_config(Some(Path::new("/nonexistent/atman.toml"))).unwrap();
        assert_eq!(config, AtmanConfig::default());
    }

    #[test]
    fn test_partial_file_overlays_defaults() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(
            file,
            "[engine]\nbatch_limit = 8\nstrict_tick = true\n\n[engine.sandbox]\nallow_network = true\n"
        )
        .unwrap();

        let config = load_from_file(file.path()).unwrap();
        assert_eq!(config.engine.batch_limit, 8);
        assert!(config.engine.strict_tick);
        assert!(config.engine.sandbox.allow_network);
        // Untouched fields keep their defaults
        assert_eq!(config.engine.max_ticks, 10_000);
    }

    #[test]
    fn test_malformed_file_is_parse_error() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "engine = \"not a table\"").unwrap();
        assert!(matches!(
            load_from_file(file.path()),
            Err(ConfigError::Parse(_))
        ));
    }

    #[test]
    fn test_validation_rejects_zero_batch_limit() {
        let mut config = AtmanConfig::default();
        config.engine.batch_limit = 0;
        assert!(matches!(
            validate_config(&config),
            Err(ConfigError::Validation(_))
        ));
    }

    #[test]
    fn test_validation_rejects_cpu_over_wall() {
        let mut config = AtmanConfig::default();
        config.engine.sandbox.cpu_ms = 5_000;
        config.engine.sandbox.wall_ms = 1_000;
        assert!(matches!(
            validate_config(&config),
            Err(ConfigError::Validation(_))
        ));
    }
}
