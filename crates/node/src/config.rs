//! Environment-driven configuration.
//!
//! Every deployable knob comes from the environment; defaults suit a local
//! single-node setup.

use std::env;
use std::time::Duration;
use thiserror::Error;

/// Process configuration, loaded from the environment.
#[derive(Debug, Clone)]
pub struct Config {
    /// `NATS_URL`: broker address.
    pub nats_url: String,

    /// `SCYLLA_HOSTS`: comma-separated contact points.
    pub scylla_hosts: Vec<String>,

    /// `BATCH_SIZE`: events per processor batch.
    pub batch_size: usize,

    /// `FLUSH_INTERVAL_MS`: processor flush cadence.
    pub flush_interval: Duration,

    /// `METRICS_PORT`: processor metrics/health listener.
    pub metrics_port: u16,

    /// `PORT`: query API listener.
    pub port: u16,

    /// `FILTER_SUBJECT`: consumer subject filter.
    pub filter_subject: String,

    /// `DURABLE_NAME`: durable consumer identity.
    pub durable_name: String,

    /// `RESET_CONSUMER`: recreate the durable consumer on startup.
    pub reset_consumer: bool,
}

/// Errors from configuration loading.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// A variable was set but unparseable.
    #[error("Invalid value for {name}: {value}")]
    Invalid {
        /// Variable name.
        name: &'static str,
        /// Observed value.
        value: String,
    },
}

impl Default for Config {
    fn default() -> Self {
        Self {
            nats_url: "nats://127.0.0.1:4222".to_string(),
            scylla_hosts: vec!["127.0.0.1:9042".to_string()],
            batch_size: 1000,
            flush_interval: Duration::from_secs(1),
            metrics_port: 9091,
            port: 8080,
            filter_subject: "facto.events.>".to_string(),
            durable_name: "processor".to_string(),
            reset_consumer: false,
        }
    }
}

impl Config {
    /// Load configuration, falling back to defaults for unset variables.
    pub fn from_env() -> Result<Self, ConfigError> {
        let defaults = Self::default();
        Ok(Self {
            nats_url: string_var("NATS_URL", defaults.nats_url),
            scylla_hosts: env::var("SCYLLA_HOSTS")
                .ok()
                .map(|raw| {
                    raw.split(',')
                        .map(|h| h.trim().to_string())
                        .filter(|h| !h.is_empty())
                        .collect()
                })
                .filter(|hosts: &Vec<String>| !hosts.is_empty())
                .unwrap_or(defaults.scylla_hosts),
            batch_size: parsed_var("BATCH_SIZE", defaults.batch_size)?,
            flush_interval: Duration::from_millis(parsed_var(
                "FLUSH_INTERVAL_MS",
                defaults.flush_interval.as_millis() as u64,
            )?),
            metrics_port: parsed_var("METRICS_PORT", defaults.metrics_port)?,
            port: parsed_var("PORT", defaults.port)?,
            filter_subject: string_var("FILTER_SUBJECT", defaults.filter_subject),
            durable_name: string_var("DURABLE_NAME", defaults.durable_name),
            reset_consumer: bool_var("RESET_CONSUMER")?,
        })
    }

    /// Queue settings derived from this config.
    pub fn queue_config(&self) -> facto_nats::QueueConfig {
        facto_nats::QueueConfig {
            url: self.nats_url.clone(),
            filter_subject: self.filter_subject.clone(),
            durable_name: self.durable_name.clone(),
            max_ack_pending: self.processor_config().max_ack_pending(),
            reset_consumer: self.reset_consumer,
            ..Default::default()
        }
    }

    /// Storage settings derived from this config.
    pub fn store_config(&self) -> facto_scylla::StoreConfig {
        facto_scylla::StoreConfig {
            hosts: self.scylla_hosts.clone(),
            ..Default::default()
        }
    }

    /// Processor tunables derived from this config.
    pub fn processor_config(&self) -> facto_processor::ProcessorConfig {
        facto_processor::ProcessorConfig {
            batch_size: self.batch_size,
            flush_interval: self.flush_interval,
            ..Default::default()
        }
    }
}

fn string_var(name: &'static str, default: String) -> String {
    env::var(name).ok().filter(|v| !v.is_empty()).unwrap_or(default)
}

fn parsed_var<T: std::str::FromStr>(name: &'static str, default: T) -> Result<T, ConfigError> {
    match env::var(name) {
        Ok(raw) if !raw.is_empty() => raw
            .parse()
            .map_err(|_| ConfigError::Invalid { name, value: raw }),
        _ => Ok(default),
    }
}

fn bool_var(name: &'static str) -> Result<bool, ConfigError> {
    match env::var(name) {
        Ok(raw) if !raw.is_empty() => match raw.to_ascii_lowercase().as_str() {
            "1" | "true" | "yes" => Ok(true),
            "0" | "false" | "no" => Ok(false),
            _ => Err(ConfigError::Invalid { name, value: raw }),
        },
        _ => Ok(false),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = Config::default();
        assert_eq!(config.batch_size, 1000);
        assert_eq!(config.flush_interval, Duration::from_secs(1));
        assert_eq!(config.filter_subject, "facto.events.>");
        assert_eq!(config.queue_config().max_ack_pending, 2000);
    }
}
