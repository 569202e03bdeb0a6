//! Configuration module for environment variable parsing.
//!
//! All settings have defaults, so loading never fails; malformed broker URLs
//! only surface as connect failures downstream.

use std::env;
use std::net::SocketAddr;
use std::time::Duration;

use tracing::warn;

/// Application configuration loaded from environment variables.
#[derive(Debug, Clone)]
pub struct Config {
    /// RabbitMQ connection URL
    pub amqp_url: String,

    /// Queue that orders and probe pings are published to
    pub order_queue: String,

    /// Port for the HTTP server to listen on
    pub port: u16,

    /// Declare the queue durable and publish persistent messages
    pub durable_queue: bool,

    /// Upper bound in milliseconds on each broker interaction
    pub broker_timeout_ms: u64,
}

impl Config {
    /// Load configuration from environment variables.
    pub fn from_env() -> Self {
        Config {
            amqp_url: env::var("RABBITMQ_CONNECTION_STRING")
                .unwrap_or_else(|_| "amqp://localhost".to_string()),

            order_queue: env::var("ORDER_QUEUE")
                .unwrap_or_else(|_| "order_queue".to_string()),

            port: env::var("PORT")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(3000),

            durable_queue: parse_bool("QUEUE_DURABLE", false),

            broker_timeout_ms: env::var("BROKER_TIMEOUT_MS")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(5000),
        }
    }

    /// Socket address the HTTP server binds.
    pub fn bind_addr(&self) -> SocketAddr {
        SocketAddr::from(([0, 0, 0, 0], self.port))
    }

    /// Broker interaction timeout as a [`Duration`].
    pub fn broker_timeout(&self) -> Duration {
        Duration::from_millis(self.broker_timeout_ms)
    }
}

/// Parse a boolean flag like "true"/"false" or "1"/"0".
fn parse_bool(name: &str, default: bool) -> bool {
    let raw = match env::var(name) {
        Ok(v) => v,
        Err(_) => return default,
    };

    match raw.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" => true,
        "0" | "false" | "no" => false,
        _ => {
            warn!(env_var = name, value = %raw, "Invalid boolean, using default");
            default
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_bool_valid() {
        env::set_var("TEST_BOOL_VALID", "true");
        assert!(parse_bool("TEST_BOOL_VALID", false));
        env::set_var("TEST_BOOL_VALID", "0");
        assert!(!parse_bool("TEST_BOOL_VALID", true));
        env::remove_var("TEST_BOOL_VALID");
    }

    #[test]
    fn test_parse_bool_invalid_falls_back() {
        env::set_var("TEST_BOOL_INVALID", "maybe");
        assert!(parse_bool("TEST_BOOL_INVALID", true));
        assert!(!parse_bool("TEST_BOOL_INVALID", false));
        env::remove_var("TEST_BOOL_INVALID");
    }

    #[test]
    fn test_parse_bool_default() {
        assert!(parse_bool("NONEXISTENT_BOOL_VAR", true));
        assert!(!parse_bool("NONEXISTENT_BOOL_VAR", false));
    }

    #[test]
    fn test_defaults() {
        env::remove_var("RABBITMQ_CONNECTION_STRING");
        env::remove_var("ORDER_QUEUE");
        env::remove_var("PORT");
        env::remove_var("QUEUE_DURABLE");
        env::remove_var("BROKER_TIMEOUT_MS");

        let config = Config::from_env();
        assert_eq!(config.amqp_url, "amqp://localhost");
        assert_eq!(config.order_queue, "order_queue");
        assert_eq!(config.port, 3000);
        assert!(!config.durable_queue);
        assert_eq!(config.broker_timeout_ms, 5000);
    }

    #[test]
    fn test_bind_addr() {
        let config = Config {
            amqp_url: "amqp://localhost".to_string(),
            order_queue: "order_queue".to_string(),
            port: 8080,
            durable_queue: false,
            broker_timeout_ms: 5000,
        };
        assert_eq!(config.bind_addr().to_string(), "0.0.0.0:8080");
        assert_eq!(config.broker_timeout(), Duration::from_millis(5000));
    }
}
