// Environment variable overrides, ATMAN_* prefix

use crate::config::AtmanConfig;
use crate::{ConfigError, ConfigResult};
use std::path::PathBuf;

/// Apply `ATMAN_*` overrides from the process environment
pub fn apply_env_overrides(config: &mut AtmanConfig) -> ConfigResult<()> {
    apply_overrides(config, std::env::vars())
}

/// Apply overrides from an explicit variable list. Unknown `ATMAN_*`
/// names are ignored; unparseable values are validation errors.
pub fn apply_overrides(
    config: &mut AtmanConfig,
    vars: impl Iterator<Item = (String, String)>,
) -> ConfigResult<()> {
    for (key, value) in vars {
        let Some(name) = key.strip_prefix("ATMAN_") else {
            continue;
        };
        match name {
            "BATCH_LIMIT" => config.engine.batch_limit = parse(&key, &value)?,
            "MAX_TICKS" => config.engine.max_ticks = parse(&key, &value)?,
            "HOOK_DEFAULT_TIMEOUT_MS" => {
                config.engine.hook_default_timeout_ms = parse(&key, &value)?
            }
            "CACHE_CAPACITY" => config.engine.cache_capacity = parse(&key, &value)?,
            "CACHE_TTL_MS" => config.engine.cache_ttl_ms = parse(&key, &value)?,
            "STRICT_TICK" => config.engine.strict_tick = parse_bool(&key, &value)?,
            "STATUS_PREDICATE" => config.engine.status_predicate = value,
            "LOCKCHAIN_DIR" => config.engine.lockchain_dir = Some(PathBuf::from(value)),
            "SANDBOX_CPU_MS" => config.engine.sandbox.cpu_ms = parse(&key, &value)?,
            "SANDBOX_WALL_MS" => config.engine.sandbox.wall_ms = parse(&key, &value)?,
            "SANDBOX_HEAP_BYTES" => config.engine.sandbox.heap_bytes = parse(&key, &value)?,
            "SANDBOX_MAX_FILE_HANDLES" => {
                config.engine.sandbox.max_file_handles = parse(&key, &value)?
            }
            "SANDBOX_ALLOW_NETWORK" => {
                config.engine.sandbox.allow_network = parse_bool(&key, &value)?
            }
            "SANDBOX_ALLOW_SUBPROCESS" => {
                config.engine.sandbox.allow_subprocess = parse_bool(&key, &value)?
            }
            _ => {}
        }
    }
    Ok(())
}

fn parse<T: std::str::FromStr>(key: &str, value: &str) -> ConfigResult<T> {
    value
        .parse()
        .map_err(|_| ConfigError::Validation(format!("invalid value for {key}: {value}")))
}

fn parse_bool(key: &str, value: &str) -> ConfigResult<bool> {
    match value.to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Ok(true),
        "0" | "false" | "no" | "off" => Ok(false),
        _ => Err(ConfigError::Validation(format!(
            "invalid boolean for {key}: {value}"
        ))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn vars(pairs: &[(&str, &str)]) -> impl Iterator<Item = (String, String)> {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect::<Vec<_>>()
            .into_iter()
    }

    #[test]
    fn test_numeric_and_boolean_overrides() {
        let mut config = AtmanConfig::default();
        apply_overrides(
            &mut config,
            vars(&[
                ("ATMAN_BATCH_LIMIT", "16"),
                ("ATMAN_STRICT_TICK", "true"),
                ("ATMAN_SANDBOX_ALLOW_NETWORK", "on"),
            ]),
        )
        .unwrap();
        assert_eq!(config.engine.batch_limit, 16);
        assert!(config.engine.strict_tick);
        assert!(config.engine.sandbox.allow_network);
    }

    #[test]
    fn test_unrelated_variables_ignored() {
        let mut config = AtmanConfig::default();
        apply_overrides(
            &mut config,
            vars(&[("PATH", "/usr/bin"), ("ATMAN_UNKNOWN_KNOB", "7")]),
        )
        .unwrap();
        assert_eq!(config, AtmanConfig::default());
    }

    #[test]
    fn test_invalid_number_is_error() {
        let mut config = AtmanConfig::default();
        let result = apply_overrides(&mut config, vars(&[("ATMAN_MAX_TICKS", "plenty")]));
        assert!(matches!(result, Err(ConfigError::Validation(_))));
    }

    #[test]
    fn test_lockchain_dir_override() {
        let mut config = AtmanConfig::default();
        apply_overrides(&mut config, vars(&[("ATMAN_LOCKCHAIN_DIR", "/var/lib/atman")])).unwrap();
        assert_eq!(
            config.engine.lockchain_dir,
            Some(PathBuf::from("/var/lib/atman"))
        );
    }
}
