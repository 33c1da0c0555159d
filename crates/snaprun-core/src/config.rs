//! Runner configuration.
//!
//! Environment variables:
//! - `SNAPRUN_WORKERS`: number of pool workers (default: available parallelism)
//! - `SNAPRUN_QUEUE_CAPACITY`: pending tasks the pool buffers (default: 64)
//! - `SNAPRUN_ENGINE`: engine program to run snapshots with
//! - `SNAPRUN_ENGINE_ARGS`: whitespace-separated arguments for the engine
//! - `SNAPRUN_LOG_JSON`: `1`/`true` for JSON logs

use std::path::PathBuf;

use serde::{Deserialize, Serialize};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("invalid value for {key}: {value:?} ({reason})")]
    Invalid {
        key: &'static str,
        value: String,
        reason: String,
    },
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct PoolConfig {
    pub workers: usize,
    pub queue_capacity: usize,
}

impl Default for PoolConfig {
    fn default() -> Self {
        Self {
            workers: std::thread::available_parallelism().map_or(1, |n| n.get()),
            queue_capacity: 64,
        }
    }
}

impl PoolConfig {
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.workers == 0 {
            return Err(ConfigError::Invalid {
                key: "workers",
                value: "0".into(),
                reason: "must be at least 1".into(),
            });
        }
        if self.queue_capacity == 0 {
            return Err(ConfigError::Invalid {
                key: "queue_capacity",
                value: "0".into(),
                reason: "must be at least 1".into(),
            });
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    pub program: Option<PathBuf>,
    pub args: Vec<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RunnerConfig {
    pub pool: PoolConfig,
    pub engine: EngineConfig,
    pub log_json: bool,
}

impl RunnerConfig {
    /// Load from the process environment on top of the defaults.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let mut config = Self::default();

        if let Some(v) = lookup("SNAPRUN_WORKERS") {
            config.pool.workers = parse_count("SNAPRUN_WORKERS", &v)?;
        }
        if let Some(v) = lookup("SNAPRUN_QUEUE_CAPACITY") {
            config.pool.queue_capacity = parse_count("SNAPRUN_QUEUE_CAPACITY", &v)?;
        }
        if let Some(v) = lookup("SNAPRUN_ENGINE").filter(|v| !v.trim().is_empty()) {
            config.engine.program = Some(PathBuf::from(v.trim()));
        }
        if let Some(v) = lookup("SNAPRUN_ENGINE_ARGS") {
            config.engine.args = v.split_whitespace().map(str::to_string).collect();
        }
        config.log_json = lookup("SNAPRUN_LOG_JSON")
            .map(|v| v == "1" || v.eq_ignore_ascii_case("true"))
            .unwrap_or(false);

        config.pool.validate()?;
        Ok(config)
    }
}

fn parse_count(key: &'static str, value: &str) -> Result<usize, ConfigError> {
    let n: usize = value.trim().parse().map_err(|e: std::num::ParseIntError| {
        ConfigError::Invalid {
            key,
            value: value.to_string(),
            reason: e.to_string(),
        }
    })?;
    if n == 0 {
        return Err(ConfigError::Invalid {
            key,
            value: value.to_string(),
            reason: "must be at least 1".into(),
        });
    }
    Ok(n)
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;
    use std::collections::HashMap;

    fn lookup(vars: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn defaults_without_env() {
        let config = RunnerConfig::from_lookup(lookup(&[])).unwrap();
        assert!(config.pool.workers >= 1);
        assert_eq!(config.pool.queue_capacity, 64);
        assert!(config.engine.program.is_none());
        assert!(!config.log_json);
    }

    #[test]
    fn reads_all_variables() {
        let config = RunnerConfig::from_lookup(lookup(&[
            ("SNAPRUN_WORKERS", "3"),
            ("SNAPRUN_QUEUE_CAPACITY", " 8 "),
            ("SNAPRUN_ENGINE", "/usr/bin/vm"),
            ("SNAPRUN_ENGINE_ARGS", "--run  -"),
            ("SNAPRUN_LOG_JSON", "TRUE"),
        ]))
        .unwrap();

        assert_eq!(config.pool, PoolConfig { workers: 3, queue_capacity: 8 });
        assert_eq!(config.engine.program, Some(PathBuf::from("/usr/bin/vm")));
        assert_eq!(config.engine.args, vec!["--run".to_string(), "-".to_string()]);
        assert!(config.log_json);
    }

    #[rstest]
    #[case::zero_workers("SNAPRUN_WORKERS", "0")]
    #[case::not_a_number("SNAPRUN_WORKERS", "many")]
    #[case::negative_capacity("SNAPRUN_QUEUE_CAPACITY", "-1")]
    fn rejects_bad_counts(#[case] key: &str, #[case] value: &str) {
        let err = RunnerConfig::from_lookup(lookup(&[(key, value)])).unwrap_err();
        assert!(err.to_string().contains(key), "{err}");
    }

    #[test]
    fn deserializes_partial_json() {
        let config: RunnerConfig =
            serde_json::from_str(r#"{ "pool": { "workers": 2 }, "engine": { "program": "vm" } }"#)
                .unwrap();
        assert_eq!(config.pool.workers, 2);
        assert_eq!(config.pool.queue_capacity, 64);
        assert_eq!(config.engine.program, Some(PathBuf::from("vm")));
    }
}
