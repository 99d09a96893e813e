//! Runtime configuration.
//!
//! All settings come from environment variables. A missing or invalid value
//! falls back to its default; invalid values are logged.
//!
//! | Variable | Default |
//! |---|---|
//! | `RELAY_PORT` | 3001 |
//! | `RELAY_TICK_INTERVAL_MS` | 3000 |
//! | `RELAY_MAX_UPLOAD_BYTES` | 10 MiB |

use std::env;
use std::str::FromStr;
use std::time::Duration;

use tracing::warn;

use crate::dispatcher::DEFAULT_TICK_INTERVAL;

/// Default port if not specified via environment variable.
pub const DEFAULT_PORT: u16 = 3001;

/// Default cap on a report submission body, attachment included.
pub const DEFAULT_MAX_UPLOAD_BYTES: usize = 10 * 1024 * 1024;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Config {
    pub port: u16,

    /// Delay between two status pushes for a report.
    pub tick_interval: Duration,

    pub max_upload_bytes: usize,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            port: DEFAULT_PORT,
            tick_interval: DEFAULT_TICK_INTERVAL,
            max_upload_bytes: DEFAULT_MAX_UPLOAD_BYTES,
        }
    }
}

impl Config {
    /// Load configuration from the process environment.
    pub fn from_env() -> Self {
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Load configuration through an arbitrary variable lookup.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let defaults = Self::default();

        let port = parse_var(&lookup, "RELAY_PORT").unwrap_or(defaults.port);

        let tick_interval = parse_var::<u64>(&lookup, "RELAY_TICK_INTERVAL_MS")
            .filter(|ms| {
                if *ms == 0 {
                    warn!("RELAY_TICK_INTERVAL_MS must be positive, using default");
                }
                *ms > 0
            })
            .map(Duration::from_millis)
            .unwrap_or(defaults.tick_interval);

        let max_upload_bytes =
            parse_var(&lookup, "RELAY_MAX_UPLOAD_BYTES").unwrap_or(defaults.max_upload_bytes);

        Self {
            port,
            tick_interval,
            max_upload_bytes,
        }
    }
}

fn parse_var<T: FromStr>(lookup: &impl Fn(&str) -> Option<String>, key: &str) -> Option<T> {
    let raw = lookup(key)?;
    match raw.trim().parse() {
        Ok(value) => Some(value),
        Err(_) => {
            warn!(key, value = %raw, "Ignoring invalid configuration value");
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn config_from(vars: &[(&str, &str)]) -> Config {
        let vars: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        Config::from_lookup(|key| vars.get(key).cloned())
    }

    #[test]
    fn test_defaults() {
        let config = config_from(&[]);
        assert_eq!(config, Config::default());
        assert_eq!(config.port, 3001);
        assert_eq!(config.tick_interval, Duration::from_secs(3));
    }

    #[test]
    fn test_overrides() {
        let config = config_from(&[
            ("RELAY_PORT", "8080"),
            ("RELAY_TICK_INTERVAL_MS", "250"),
            ("RELAY_MAX_UPLOAD_BYTES", "1024"),
        ]);
        assert_eq!(config.port, 8080);
        assert_eq!(config.tick_interval, Duration::from_millis(250));
        assert_eq!(config.max_upload_bytes, 1024);
    }

    #[test]
    fn test_invalid_values_fall_back() {
        let config = config_from(&[
            ("RELAY_PORT", "eighty"),
            ("RELAY_TICK_INTERVAL_MS", "0"),
            ("RELAY_MAX_UPLOAD_BYTES", "-1"),
        ]);
        assert_eq!(config, Config::default());
    }
}
