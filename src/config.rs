use std::env;
use std::str::FromStr;
use std::time::Duration;

use thiserror::Error;

#[derive(Debug, Error, PartialEq)]
pub enum ConfigError {
    #[error("{0} must be set")]
    Missing(&'static str),
    #[error("{key} has an invalid value '{value}'")]
    Invalid { key: &'static str, value: String },
}

#[derive(Debug, Clone, PartialEq)]
pub struct KafkaSettings {
    pub brokers: Vec<String>,
    pub client_id: String,
    pub consumer_group: String,
}

#[derive(Debug, Clone, PartialEq)]
pub struct OutboxSettings {
    pub batch_size: i64,
    pub poll_interval: Duration,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Settings {
    pub database_url: String,
    pub host: String,
    pub port: u16,
    pub kafka: KafkaSettings,
    pub outbox: OutboxSettings,
}

impl Settings {
    /// Reads settings from the process environment (after `.env` is loaded).
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let database_url = lookup("DATABASE_URL").ok_or(ConfigError::Missing("DATABASE_URL"))?;
        let brokers = lookup("KAFKA_BROKERS")
            .unwrap_or_else(|| "localhost:19092".to_string())
            .split(',')
            .map(str::trim)
            .filter(|b| !b.is_empty())
            .map(str::to_string)
            .collect::<Vec<_>>();
        if brokers.is_empty() {
            return Err(ConfigError::Invalid {
                key: "KAFKA_BROKERS",
                value: String::new(),
            });
        }

        let batch_size: i64 = parse_or(&lookup, "OUTBOX_BATCH_SIZE", 100)?;
        if batch_size <= 0 {
            return Err(ConfigError::Invalid {
                key: "OUTBOX_BATCH_SIZE",
                value: batch_size.to_string(),
            });
        }

        Ok(Settings {
            database_url,
            host: lookup("HOST").unwrap_or_else(|| "0.0.0.0".to_string()),
            port: parse_or(&lookup, "PORT", 8080)?,
            kafka: KafkaSettings {
                brokers,
                client_id: lookup("KAFKA_CLIENT_ID").unwrap_or_else(|| "order-service".to_string()),
                consumer_group: lookup("KAFKA_CONSUMER_GROUP")
                    .unwrap_or_else(|| "order-event-transformer".to_string()),
            },
            outbox: OutboxSettings {
                batch_size,
                poll_interval: Duration::from_millis(parse_or(
                    &lookup,
                    "OUTBOX_POLL_INTERVAL_MS",
                    5000,
                )?),
            },
        })
    }
}

fn parse_or<F, T>(lookup: &F, key: &'static str, default: T) -> Result<T, ConfigError>
where
    F: Fn(&str) -> Option<String>,
    T: FromStr,
{
    match lookup(key) {
        None => Ok(default),
        Some(raw) => raw
            .trim()
            .parse()
            .map_err(|_| ConfigError::Invalid { key, value: raw }),
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use super::*;

    fn settings(pairs: &[(&str, &str)]) -> Result<Settings, ConfigError> {
        let vars: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        Settings::from_lookup(|key| vars.get(key).cloned())
    }

    #[test]
    fn defaults_apply_when_only_database_url_is_set() {
        let s = settings(&[("DATABASE_URL", "postgres://localhost/orders")]).unwrap();

        assert_eq!(s.host, "0.0.0.0");
        assert_eq!(s.port, 8080);
        assert_eq!(s.kafka.brokers, vec!["localhost:19092"]);
        assert_eq!(s.kafka.client_id, "order-service");
        assert_eq!(s.kafka.consumer_group, "order-event-transformer");
        assert_eq!(s.outbox.batch_size, 100);
        assert_eq!(s.outbox.poll_interval, Duration::from_secs(5));
    }

    #[test]
    fn database_url_is_required() {
        assert_eq!(settings(&[]), Err(ConfigError::Missing("DATABASE_URL")));
    }

    #[test]
    fn broker_list_is_split_and_trimmed() {
        let s = settings(&[
            ("DATABASE_URL", "postgres://x"),
            ("KAFKA_BROKERS", "k1:9092, k2:9092,"),
        ])
        .unwrap();

        assert_eq!(s.kafka.brokers, vec!["k1:9092", "k2:9092"]);
    }

    #[test]
    fn invalid_numbers_are_reported_with_their_key() {
        let err = settings(&[("DATABASE_URL", "postgres://x"), ("PORT", "eighty")]).unwrap_err();

        assert_eq!(
            err,
            ConfigError::Invalid {
                key: "PORT",
                value: "eighty".to_string()
            }
        );
    }

    #[test]
    fn batch_size_must_be_positive() {
        let err = settings(&[("DATABASE_URL", "postgres://x"), ("OUTBOX_BATCH_SIZE", "0")])
            .unwrap_err();

        assert!(matches!(err, ConfigError::Invalid { key: "OUTBOX_BATCH_SIZE", .. }));
    }

    #[test]
    fn relay_cadence_is_configurable() {
        let s = settings(&[
            ("DATABASE_URL", "postgres://x"),
            ("OUTBOX_POLL_INTERVAL_MS", "250"),
        ])
        .unwrap();

        assert_eq!(s.outbox.poll_interval, Duration::from_millis(250));
    }
}
