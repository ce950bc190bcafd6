//! Runtime configuration, read from `TASKQ_*` environment variables.

use std::net::SocketAddr;
use std::time::Duration;

pub const DEFAULT_DATABASE_URL: &str = "sqlite://taskq.db";
pub const DEFAULT_BIND_ADDR: &str = "0.0.0.0:8080";
pub const DEFAULT_SIMULATED_WORK_MS: u64 = 5_000;
pub const DEFAULT_WORKER_NAME: &str = crate::jobs::worker::DEFAULT_WORKER_NAME;

#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum ConfigError {
    #[error("{var} must not be empty")]
    Empty { var: &'static str },
    #[error("{var} is invalid ({value:?}): {reason}")]
    Invalid {
        var: &'static str,
        value: String,
        reason: String,
    },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct JobsConfig {
    pub database_url: String,
    pub bind_addr: SocketAddr,
    /// How long the built-in handlers pretend to work.
    pub simulated_work: Duration,
    pub worker_name: String,
}

impl Default for JobsConfig {
    fn default() -> Self {
        Self {
            database_url: DEFAULT_DATABASE_URL.to_string(),
            bind_addr: SocketAddr::from(([0, 0, 0, 0], 8080)),
            simulated_work: Duration::from_millis(DEFAULT_SIMULATED_WORK_MS),
            worker_name: DEFAULT_WORKER_NAME.to_string(),
        }
    }
}

impl JobsConfig {
    /// Load from the process environment. Unset variables take their defaults.
    ///
    /// - `TASKQ_DATABASE_URL`
    /// - `TASKQ_BIND_ADDR`
    /// - `TASKQ_SIMULATED_WORK_MS`
    /// - `TASKQ_WORKER_NAME`
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|var| std::env::var(var).ok())
    }

    /// Load using `lookup` in place of the environment.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut config = Self::default();

        if let Some(url) = non_empty(&lookup, "TASKQ_DATABASE_URL")? {
            config.database_url = url;
        }
        if let Some(addr) = non_empty(&lookup, "TASKQ_BIND_ADDR")? {
            config.bind_addr = parse("TASKQ_BIND_ADDR", addr)?;
        }
        if let Some(ms) = non_empty(&lookup, "TASKQ_SIMULATED_WORK_MS")? {
            config.simulated_work = Duration::from_millis(parse("TASKQ_SIMULATED_WORK_MS", ms)?);
        }
        if let Some(name) = non_empty(&lookup, "TASKQ_WORKER_NAME")? {
            config.worker_name = name;
        }

        Ok(config)
    }
}

fn non_empty<F>(lookup: &F, var: &'static str) -> Result<Option<String>, ConfigError>
where
    F: Fn(&str) -> Option<String>,
{
    match lookup(var) {
        None => Ok(None),
        Some(v) if v.trim().is_empty() => Err(ConfigError::Empty { var }),
        Some(v) => Ok(Some(v.trim().to_string())),
    }
}

fn parse<T>(var: &'static str, value: String) -> Result<T, ConfigError>
where
    T: std::str::FromStr,
    T::Err: std::fmt::Display,
{
    value.parse().map_err(|e: T::Err| ConfigError::Invalid {
        var,
        reason: e.to_string(),
        value,
    })
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use super::*;

    fn load(vars: &[(&str, &str)]) -> Result<JobsConfig, ConfigError> {
        let env: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        JobsConfig::from_lookup(|var| env.get(var).cloned())
    }

    #[test]
    fn defaults_when_nothing_is_set() {
        let config = load(&[]).unwrap();
        assert_eq!(config, JobsConfig::default());
        assert_eq!(config.bind_addr.to_string(), DEFAULT_BIND_ADDR);
        assert_eq!(config.simulated_work, Duration::from_secs(5));
    }

    #[test]
    fn overrides_are_applied() {
        let config = load(&[
            ("TASKQ_DATABASE_URL", "sqlite::memory:"),
            ("TASKQ_BIND_ADDR", "127.0.0.1:9000"),
            ("TASKQ_SIMULATED_WORK_MS", "0"),
            ("TASKQ_WORKER_NAME", "w1"),
        ])
        .unwrap();

        assert_eq!(config.database_url, "sqlite::memory:");
        assert_eq!(config.bind_addr, "127.0.0.1:9000".parse().unwrap());
        assert_eq!(config.simulated_work, Duration::ZERO);
        assert_eq!(config.worker_name, "w1");
    }

    #[test]
    fn malformed_values_are_errors() {
        let err = load(&[("TASKQ_SIMULATED_WORK_MS", "soon")]).unwrap_err();
        assert!(matches!(err, ConfigError::Invalid { var: "TASKQ_SIMULATED_WORK_MS", .. }));

        let err = load(&[("TASKQ_BIND_ADDR", "localhost")]).unwrap_err();
        assert!(matches!(err, ConfigError::Invalid { var: "TASKQ_BIND_ADDR", .. }));

        let err = load(&[("TASKQ_DATABASE_URL", " ")]).unwrap_err();
        assert_eq!(err, ConfigError::Empty { var: "TASKQ_DATABASE_URL" });
    }
}
