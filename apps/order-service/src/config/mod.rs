//! Environment-variable configuring for the order service.
//!
//! Mirrors `cart-service::config`: `AppConfig::from_env` is the single
//! entry point, loading the broker bootstrap address, topic name, consumer
//! group id, and the retry timing values from spec §4.8.

use std::time::Duration;

use thiserror::Error;

/// Configuration errors.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// An environment variable was present but failed to parse.
    #[error("invalid value for {var}: {value}")]
    InvalidValue {
        /// Variable name.
        var: String,
        /// Raw value that failed to parse.
        value: String,
    },
}

/// Kafka client configuration.
#[derive(Debug, Clone)]
pub struct KafkaConfig {
    /// `bootstrap.servers` value.
    pub bootstrap_servers: String,
    /// `ORDERS` topic name (spec §6, default `orders`).
    pub topic: String,
    /// `ORDERS.DLT` dead-letter topic name, derived as `{topic}.dlt`.
    pub dlt_topic: String,
    /// Consumer group id.
    pub group_id: String,
}

/// Consumer retry-with-DLT configuration (spec §4.8): initial 1s, ×2,
/// capped at 10s, max 3 retries.
#[derive(Debug, Clone)]
pub struct RetryConfig {
    /// Initial backoff before the first retry.
    pub initial_backoff: Duration,
    /// Growth factor applied per attempt.
    pub backoff_multiplier: f64,
    /// Maximum backoff duration.
    pub max_backoff: Duration,
    /// Maximum retry attempts before routing to the DLT.
    pub max_retries: u32,
}

/// HTTP server configuration.
#[derive(Debug, Clone)]
pub struct ServerConfig {
    /// Bind port for the HTTP listener.
    pub http_port: u16,
}

/// Root configuration for the `order-service` binary.
#[derive(Debug, Clone)]
pub struct AppConfig {
    /// Kafka client settings.
    pub kafka: KafkaConfig,
    /// Process-pipeline retry settings.
    pub retry: RetryConfig,
    /// HTTP server settings.
    pub server: ServerConfig,
}

impl AppConfig {
    /// Load configuration from the process environment, applying the
    /// documented defaults for anything unset.
    pub fn from_env() -> Result<Self, ConfigError> {
        let topic = env_or("ORDERS_TOPIC", "orders");
        let dlt_topic = format!("{topic}.dlt");

        Ok(Self {
            kafka: KafkaConfig {
                bootstrap_servers: env_or("KAFKA_BOOTSTRAP_SERVERS", "localhost:9092"),
                topic,
                dlt_topic,
                group_id: env_or("ORDERS_CONSUMER_GROUP", "order-service"),
            },
            retry: RetryConfig {
                initial_backoff: Duration::from_millis(parse_env_or_default(
                    "CONSUME_RETRY_INITIAL_MS",
                    1_000,
                )?),
                backoff_multiplier: 2.0,
                max_backoff: Duration::from_millis(parse_env_or_default("CONSUME_RETRY_MAX_MS", 10_000)?),
                max_retries: parse_env_or_default("CONSUME_MAX_RETRIES", 3)?,
            },
            server: ServerConfig {
                http_port: parse_env_or_default("HTTP_PORT", 8081)?,
            },
        })
    }
}

fn env_or(var: &str, default: &str) -> String {
    std::env::var(var).unwrap_or_else(|_| default.to_string())
}

fn parse_env_or_default<T>(var: &str, default: T) -> Result<T, ConfigError>
where
    T: std::str::FromStr,
{
    match std::env::var(var) {
        Ok(value) => value.parse().map_err(|_| ConfigError::InvalidValue {
            var: var.to_string(),
            value,
        }),
        Err(_) => Ok(default),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn dlt_topic_is_derived_from_orders_topic() {
        let topic = "orders".to_string();
        assert_eq!(format!("{topic}.dlt"), "orders.dlt");
    }

    #[test]
    fn retry_budget_matches_spec_defaults() {
        let config = RetryConfig {
            initial_backoff: Duration::from_secs(1),
            backoff_multiplier: 2.0,
            max_backoff: Duration::from_secs(10),
            max_retries: 3,
        };
        assert_eq!(config.initial_backoff, Duration::from_secs(1));
        assert_eq!(config.max_retries, 3);
    }
}
