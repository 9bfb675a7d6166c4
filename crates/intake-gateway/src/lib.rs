//! HTTP surface of the intake engine.
//!
//! [`GatewayServer::build`] returns an axum router over an
//! [`IntakeService`](intake_dispatch::IntakeService); [`ApiError`] maps engine
//! errors to status codes and a JSON `{"error": ...}` body.

/// HTTP error mapping.
pub mod error;
/// Route handlers and request bodies.
pub mod handlers;
/// Router construction.
pub mod server;

pub use error::ApiError;
pub use server::{AppState, GatewayServer};
