//! Async RabbitMQ publisher for enqueueing messages.
//!
//! The publisher owns one long-lived connection shared across requests,
//! reconnecting on failure. Each publish opens its own channel and closes it
//! before returning, on success and error paths alike. Every broker
//! interaction is bounded by the configured timeout.

use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use lapin::{
    options::{BasicPublishOptions, ConfirmSelectOptions, QueueDeclareOptions},
    publisher_confirm::Confirmation,
    types::FieldTable,
    BasicProperties, Channel, Connection, ConnectionProperties,
};
use thiserror::Error;
use tokio::sync::RwLock;
use tokio::time::timeout;
use tracing::{info, warn};

use crate::config::Config;

/// Errors from a single publish operation.
///
/// Each variant corresponds to one step of the operation, so the HTTP layer
/// can report which stage failed. No step is retried.
#[derive(Debug, Error)]
pub enum PublishError {
    #[error("failed to connect to RabbitMQ: {0}")]
    Connect(#[source] lapin::Error),

    #[error("failed to create channel: {0}")]
    Channel(#[source] lapin::Error),

    #[error("failed to declare queue: {0}")]
    Declare(#[source] lapin::Error),

    #[error("failed to publish message: {0}")]
    Publish(#[source] lapin::Error),

    #[error("broker rejected the message")]
    Nacked,

    #[error("broker operation timed out after {0}ms")]
    Timeout(u64),
}

/// Async RabbitMQ publisher with connection management.
///
/// The publisher maintains a persistent connection to RabbitMQ,
/// automatically reconnecting on the next publish after a failure. Channels
/// are scoped to a single publish and never shared across requests.
#[derive(Clone)]
pub struct Publisher {
    inner: Arc<PublisherInner>,
}

struct PublisherInner {
    url: String,
    timeout: Duration,
    durable: bool,
    connection: RwLock<Option<Connection>>,
}

impl Publisher {
    /// Create a new publisher for the configured broker.
    pub fn new(config: &Config) -> Self {
        Self {
            inner: Arc::new(PublisherInner {
                url: config.amqp_url.clone(),
                timeout: config.broker_timeout(),
                durable: config.durable_queue,
                connection: RwLock::new(None),
            }),
        }
    }

    /// Establish the shared connection eagerly.
    ///
    /// Publishing reconnects on demand, so callers may treat a failure here
    /// as advisory.
    pub async fn connect(&self) -> Result<(), PublishError> {
        self.ensure_connected().await
    }

    /// Bound a broker interaction by the configured timeout.
    async fn broker_call<T>(
        &self,
        stage: &'static str,
        fut: impl Future<Output = T>,
    ) -> Result<T, PublishError> {
        let timeout_ms = self.inner.timeout.as_millis() as u64;
        match timeout(self.inner.timeout, fut).await {
            Ok(value) => Ok(value),
            Err(_) => {
                warn!(stage, timeout_ms, "rabbitmq_timeout");
                Err(PublishError::Timeout(timeout_ms))
            }
        }
    }

    /// Ensure the shared connection is alive, reconnecting if needed.
    async fn ensure_connected(&self) -> Result<(), PublishError> {
        {
            let connection = self.inner.connection.read().await;
            if let Some(conn) = connection.as_ref() {
                if conn.status().connected() {
                    return Ok(());
                }
            }
        }

        let mut connection = self.inner.connection.write().await;

        // Double-check after acquiring the write lock
        if let Some(conn) = connection.as_ref() {
            if conn.status().connected() {
                return Ok(());
            }
        }

        info!("rabbitmq_connecting");

        let conn = self
            .broker_call(
                "connect",
                Connection::connect(&self.inner.url, ConnectionProperties::default()),
            )
            .await?
            .map_err(PublishError::Connect)?;

        info!("rabbitmq_connected");

        *connection = Some(conn);

        Ok(())
    }

    /// Open a fresh channel on the shared connection.
    async fn open_channel(&self) -> Result<Channel, PublishError> {
        self.ensure_connected().await?;

        let connection = self.inner.connection.read().await;
        let Some(conn) = connection.as_ref() else {
            // close() won the race; report it as a dead connection
            return Err(PublishError::Connect(lapin::Error::InvalidConnectionState(
                lapin::ConnectionState::Closed,
            )));
        };

        self.broker_call("create_channel", conn.create_channel())
            .await?
            .map_err(PublishError::Channel)
    }

    /// Publish one payload to `queue` as a self-contained operation.
    ///
    /// Declares the queue (idempotent), publishes in confirm mode and waits
    /// for the broker's ack. At most one message is published per call; the
    /// channel is closed before returning on every path.
    pub async fn publish(&self, queue: &str, payload: &[u8]) -> Result<(), PublishError> {
        let channel = self.open_channel().await?;

        let result = self.publish_on(&channel, queue, payload).await;

        if let Err(e) = channel.close(200, "publish finished").await {
            warn!(error = %e, "rabbitmq_channel_close_error");
        }

        result
    }

    async fn publish_on(
        &self,
        channel: &Channel,
        queue: &str,
        payload: &[u8],
    ) -> Result<(), PublishError> {
        // Declare the queue (idempotent operation)
        self.broker_call(
            "queue_declare",
            channel.queue_declare(
                queue,
                QueueDeclareOptions {
                    durable: self.inner.durable,
                    ..Default::default()
                },
                FieldTable::default(),
            ),
        )
        .await?
        .map_err(PublishError::Declare)?;

        // Confirm mode, so the publish below waits for the broker's ack
        self.broker_call(
            "confirm_select",
            channel.confirm_select(ConfirmSelectOptions::default()),
        )
        .await?
        .map_err(PublishError::Channel)?;

        let properties = if self.inner.durable {
            BasicProperties::default().with_delivery_mode(2) // Persistent
        } else {
            BasicProperties::default()
        };

        let confirm = self
            .broker_call(
                "basic_publish",
                channel.basic_publish(
                    "",
                    queue,
                    BasicPublishOptions::default(),
                    payload,
                    properties,
                ),
            )
            .await?
            .map_err(PublishError::Publish)?;

        let confirmation = self
            .broker_call("await_confirm", confirm)
            .await?
            .map_err(PublishError::Publish)?;

        if let Confirmation::Nack(_) = confirmation {
            warn!(queue, "rabbitmq_publish_nacked");
            return Err(PublishError::Nacked);
        }

        info!(queue, body_length = payload.len(), "rabbitmq_published");

        Ok(())
    }

    /// Close the shared connection gracefully.
    pub async fn close(&self) {
        let mut connection = self.inner.connection.write().await;

        if let Some(conn) = connection.take() {
            if let Err(e) = conn.close(200, "Normal shutdown").await {
                warn!(error = %e, "rabbitmq_connection_close_error");
            }
        }

        info!("rabbitmq_publisher_closed");
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn test_config(url: &str) -> Config {
        Config {
            amqp_url: url.to_string(),
            order_queue: "order_queue".to_string(),
            port: 3000,
            durable_queue: false,
            broker_timeout_ms: 2000,
        }
    }

    #[test]
    fn test_publisher_creation() {
        let publisher = Publisher::new(&test_config("amqp://localhost:5672"));
        assert!(Arc::strong_count(&publisher.inner) == 1);
    }

    #[test]
    fn test_error_display() {
        assert_eq!(
            PublishError::Timeout(2000).to_string(),
            "broker operation timed out after 2000ms"
        );
        assert_eq!(
            PublishError::Nacked.to_string(),
            "broker rejected the message"
        );
    }

    #[tokio::test]
    async fn test_publish_unreachable_broker_is_connect_error() {
        // Nothing listens on port 1, so the connect step fails fast
        let publisher = Publisher::new(&test_config("amqp://127.0.0.1:1"));

        let err = publisher
            .publish("order_queue", b"ping")
            .await
            .expect_err("publish should fail without a broker");

        assert!(matches!(err, PublishError::Connect(_)));
    }

    #[tokio::test]
    async fn test_close_without_connection() {
        let publisher = Publisher::new(&test_config("amqp://127.0.0.1:1"));
        publisher.close().await;
    }
}
