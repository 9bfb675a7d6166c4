//! Audit trail for the intake engine.
//!
//! # Main types
//!
//! - [`AuditEntry`]: One lifecycle event of a session.
//! - [`AuditSink`]: Append-only sink; failures are swallowed by [`record_best_effort`].
//! - [`JsonlAuditSink`]: Append-only JSONL file written by a background task.
//! - [`WebhookAuditSink`]: Posts entries to an HTTP collector from a background task.
//! - [`MemoryAuditSink`]: In-process sink.

/// Sink selection from configuration.
pub mod config;
/// Audit entry type and event labels.
pub mod entry;
/// JSONL file sink.
pub mod jsonl;
/// In-memory sink.
pub mod memory;
/// Sink trait.
pub mod sink;
/// HTTP collector sink.
pub mod webhook;

pub use config::{AuditConfig, AuditKind};
pub use entry::{events, AuditEntry};
pub use jsonl::{read_entries, JsonlAuditSink};
pub use memory::MemoryAuditSink;
pub use sink::{record_best_effort, AuditSink};
pub use webhook::{WebhookAuditSink, WebhookCollector};
