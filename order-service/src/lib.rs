//! Order service - HTTP intake bridge for order submissions.
//!
//! This library provides the modules behind the `order-service` binary:
//! - `config`: environment-variable configuration
//! - `queue`: async RabbitMQ publisher
//! - `web`: HTTP routes for order intake and health probes
//!
//! ## Architecture
//!
//! ```text
//! HTTP clients → order-service → order_queue → downstream consumers
//! ```
//!
//! Orders are accepted over HTTP and forwarded unmodified to a RabbitMQ
//! queue; all parsing and fulfilment happens downstream.

pub mod config;
pub mod queue;
pub mod web;

// Re-export commonly used types
pub use config::Config;
pub use queue::{PublishError, Publisher};
pub use web::AppState;
