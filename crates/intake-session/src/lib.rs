//! Session lifecycle state for the intake engine.
//!
//! - [`Session`]: one intake workflow instance and its file snapshot.
//! - [`SessionState`]: lifecycle states and the allowed transitions.
//! - [`SessionStore`]: the table of sessions, with an atomic compare-and-swap.
//! - [`InMemorySessionStore`]: process-memory implementation.

/// Session snapshot and lifecycle states.
pub mod session;
/// Session store trait and in-memory store.
pub mod store;

pub use session::{new_session_id, Session, SessionState};
pub use store::{InMemorySessionStore, SessionStore};
