//! Controller configuration loaded from the environment.
//!
//! | Variable | Default | Meaning |
//! |----------|---------|---------|
//! | `CRIER_REPORTERS` | `log` | comma-separated reporter names |
//! | `CRIER_WORKERS` | `1` | reconcile threads per reporter |
//! | `CRIER_RETRY_BASE_MS` | `5` | first retry delay, at least 1 |
//! | `CRIER_RETRY_MAX_MS` | `1000000` | retry delay cap |
//! | `CRIER_RECONCILE_TIMEOUT_SECS` | `0` | per-reconcile deadline, `0` = none |
//! | `CRIER_TERMINAL_ONLY` | `false` | log reporter reports completed jobs only |
//! | `CRIER_SEED_FILE` | unset | JSON array of jobs loaded at start-up |
//! | `CRIER_LOG_FORMAT` | `json` | `json` or `pretty` |

use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;

use crier_core::ReporterName;
use crier_observability::LogFormat;

use crate::controller::Backoff;

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("invalid {var}={value:?}: {reason}")]
pub struct ConfigError {
    pub var: &'static str,
    pub value: String,
    pub reason: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ControllerConfig {
    pub reporters: Vec<ReporterName>,
    pub workers: usize,
    pub backoff: Backoff,
    pub reconcile_timeout: Option<Duration>,
    pub terminal_only: bool,
    pub seed_file: Option<PathBuf>,
    pub log_format: LogFormat,
}

impl Default for ControllerConfig {
    fn default() -> Self {
        Self {
            reporters: vec![ReporterName::new("log").expect("static reporter name is valid")],
            workers: 1,
            backoff: Backoff::default(),
            reconcile_timeout: None,
            terminal_only: false,
            seed_file: None,
            log_format: LogFormat::default(),
        }
    }
}

fn parse<T>(var: &'static str, value: &str) -> Result<T, ConfigError>
where
    T: FromStr,
    T::Err: core::fmt::Display,
{
    value.trim().parse().map_err(|e: T::Err| ConfigError {
        var,
        value: value.to_string(),
        reason: e.to_string(),
    })
}

impl ControllerConfig {
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build from an arbitrary variable source; unset variables keep defaults.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut config = Self::default();

        if let Some(raw) = lookup("CRIER_REPORTERS") {
            let reporters = raw
                .split(',')
                .map(str::trim)
                .filter(|s| !s.is_empty())
                .map(|s| parse::<ReporterName>("CRIER_REPORTERS", s))
                .collect::<Result<Vec<_>, _>>()?;
            if reporters.is_empty() {
                return Err(ConfigError {
                    var: "CRIER_REPORTERS",
                    value: raw,
                    reason: "at least one reporter is required".to_string(),
                });
            }
            let mut seen = std::collections::HashSet::new();
            if let Some(dup) = reporters.iter().find(|r| !seen.insert(*r)) {
                return Err(ConfigError {
                    var: "CRIER_REPORTERS",
                    value: raw.clone(),
                    reason: format!("reporter {dup} listed twice"),
                });
            }
            config.reporters = reporters;
        }

        if let Some(raw) = lookup("CRIER_WORKERS") {
            let workers: usize = parse("CRIER_WORKERS", &raw)?;
            if workers == 0 {
                return Err(ConfigError {
                    var: "CRIER_WORKERS",
                    value: raw,
                    reason: "must be at least 1".to_string(),
                });
            }
            config.workers = workers;
        }

        let base = match lookup("CRIER_RETRY_BASE_MS") {
            Some(raw) => {
                let ms: u64 = parse("CRIER_RETRY_BASE_MS", &raw)?;
                // A zero delay turns a failing reporter into a busy loop.
                if ms == 0 {
                    return Err(ConfigError {
                        var: "CRIER_RETRY_BASE_MS",
                        value: raw,
                        reason: "must be at least 1".to_string(),
                    });
                }
                Duration::from_millis(ms)
            }
            None => config.backoff.base,
        };
        let max = match lookup("CRIER_RETRY_MAX_MS") {
            Some(raw) => Duration::from_millis(parse("CRIER_RETRY_MAX_MS", &raw)?),
            None => config.backoff.max,
        };
        config.backoff = Backoff::exponential(base, max);

        if let Some(raw) = lookup("CRIER_RECONCILE_TIMEOUT_SECS") {
            let secs: u64 = parse("CRIER_RECONCILE_TIMEOUT_SECS", &raw)?;
            config.reconcile_timeout = (secs > 0).then(|| Duration::from_secs(secs));
        }

        if let Some(raw) = lookup("CRIER_TERMINAL_ONLY") {
            config.terminal_only = parse("CRIER_TERMINAL_ONLY", &raw)?;
        }

        config.seed_file = lookup("CRIER_SEED_FILE")
            .filter(|s| !s.trim().is_empty())
            .map(PathBuf::from);

        if let Some(raw) = lookup("CRIER_LOG_FORMAT") {
            config.log_format = parse("CRIER_LOG_FORMAT", &raw)?;
        }

        Ok(config)
    }
}
