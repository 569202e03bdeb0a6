//! Queue module for RabbitMQ operations.
//!
//! This module provides the async publisher used by the HTTP layer to
//! enqueue order payloads and health-probe pings.
//!
//! ## Architecture
//!
//! ```text
//! HTTP handlers → Publisher → order_queue → downstream consumers
//! ```

pub mod publisher;

pub use publisher::{PublishError, Publisher};
