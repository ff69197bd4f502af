//! Operator process configuration read from the environment

use std::time::Duration;

use crate::clients::digitalocean::DEFAULT_API_URL;
use crate::{Error, Result};

/// Default metrics port
pub const DEFAULT_METRICS_PORT: u16 = 8080;

/// Default interval between reconciles of a settled cluster
pub const DEFAULT_RECONCILE_INTERVAL_SECS: u64 = 60;

/// Process-wide settings
#[derive(Clone, Debug, PartialEq)]
pub struct OperatorConfig {
    /// Port for the metrics and health server
    pub metrics_port: u16,
    /// Base URL of the DigitalOcean API
    pub api_url: String,
    /// Requeue interval after a successful reconcile
    pub reconcile_interval: Duration,
}

impl Default for OperatorConfig {
    fn default() -> Self {
        Self {
            metrics_port: DEFAULT_METRICS_PORT,
            api_url: DEFAULT_API_URL.to_string(),
            reconcile_interval: Duration::from_secs(DEFAULT_RECONCILE_INTERVAL_SECS),
        }
    }
}

impl OperatorConfig {
    /// Read `METRICS_PORT`, `DIGITALOCEAN_API_URL` and `RECONCILE_INTERVAL_SECS`
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self> {
        let mut config = Self::default();

        if let Some(port) = lookup("METRICS_PORT") {
            config.metrics_port = port
                .parse()
                .map_err(|e| Error::ConfigError(format!("invalid METRICS_PORT {:?}: {}", port, e)))?;
        }

        if let Some(url) = lookup("DIGITALOCEAN_API_URL") {
            if !url.starts_with("http://") && !url.starts_with("https://") {
                return Err(Error::ConfigError(format!(
                    "DIGITALOCEAN_API_URL must start with http:// or https://, got: {}",
                    url
                )));
            }
            config.api_url = url;
        }

        if let Some(secs) = lookup("RECONCILE_INTERVAL_SECS") {
            let secs: u64 = secs.parse().map_err(|e| {
                Error::ConfigError(format!("invalid RECONCILE_INTERVAL_SECS {:?}: {}", secs, e))
            })?;
            if secs == 0 {
                return Err(Error::ConfigError(
                    "RECONCILE_INTERVAL_SECS must be >= 1".to_string(),
                ));
            }
            config.reconcile_interval = Duration::from_secs(secs);
        }

        Ok(config)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup(vars: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let vars: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| vars.get(key).cloned()
    }

    #[test]
    fn test_defaults_without_env() {
        let config = OperatorConfig::from_lookup(lookup(&[])).unwrap();
        assert_eq!(config, OperatorConfig::default());
        assert_eq!(config.api_url, "https://api.digitalocean.com");
    }

    #[test]
    fn test_overrides_from_env() {
        let config = OperatorConfig::from_lookup(lookup(&[
            ("METRICS_PORT", "9100"),
            ("DIGITALOCEAN_API_URL", "http://localhost:3000"),
            ("RECONCILE_INTERVAL_SECS", "120"),
        ]))
        .unwrap();

        assert_eq!(config.metrics_port, 9100);
        assert_eq!(config.api_url, "http://localhost:3000");
        assert_eq!(config.reconcile_interval, Duration::from_secs(120));
    }

    #[test]
    fn test_rejects_invalid_values() {
        assert!(OperatorConfig::from_lookup(lookup(&[("METRICS_PORT", "http")])).is_err());
        assert!(OperatorConfig::from_lookup(lookup(&[("DIGITALOCEAN_API_URL", "localhost")])).is_err());
        assert!(OperatorConfig::from_lookup(lookup(&[("RECONCILE_INTERVAL_SECS", "0")])).is_err());
    }
}
