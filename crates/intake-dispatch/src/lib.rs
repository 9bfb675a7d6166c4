//! Idempotent dispatch for the intake engine.
//!
//! A trigger (explicit call or free-text command) runs one compare-and-swap
//! on the session state. The winner queues the classified file set on a
//! [`DeliveryPool`], whose workers post it downstream with retry and record
//! the outcome in the session store and the audit trail.
//!
//! # Main types
//!
//! - [`IntakeService`]: Facade used by the gateway.
//! - [`Dispatcher`]: Trigger handling and the CAS into `DispatchInFlight`.
//! - [`DeliveryPool`]: Bounded queue plus delivery workers.
//! - [`RetryingDeliverer`]: Exponential backoff over any [`Deliver`].
//! - [`WebhookDeliverer`]: HTTP delivery to the downstream processor.

/// `[dispatch]` configuration.
pub mod config;
/// Payload and deliverers.
pub mod delivery;
/// Trigger handling.
pub mod dispatcher;
/// Delivery workers.
pub mod pool;
/// Retry policy and backoff.
pub mod retry;
/// Service facade.
pub mod service;

pub use config::DispatchConfig;
pub use delivery::{Deliver, DispatchPayload, WebhookDeliverer};
pub use dispatcher::{Dispatcher, TriggerOutcome};
pub use pool::{DeliveryContext, DeliveryPool};
pub use retry::{compute_backoff, is_retryable, RetryPolicy, RetryingDeliverer};
pub use service::{IntakeService, ServiceDeps};
