//! Web server module for order intake and health probes.
//!
//! Three stateless routes:
//! - `GET /healthz`: process liveness, never touches the broker
//! - `GET /healthz/rabbitmq`: broker round-trip readiness probe
//! - `POST /orders`: order submission, enqueued to RabbitMQ

pub mod handlers;

pub use handlers::{
    healthz, rabbitmq_healthz, router, submit_order, AppState, BrokerHealthResponse,
    HealthResponse,
};
