//! Core types and error definitions for the intake engine.
//!
//! This crate provides the foundational types shared across all intake crates:
//! error handling, storage file representations, the file classifier and the
//! free-text command grammar.
//!
//! # Main types
//!
//! - [`IntakeError`]: Unified error enum for all intake subsystems.
//! - [`IntakeResult`]: Convenience alias for `Result<T, IntakeError>`.
//! - [`FolderRef`]: Handle to a session's storage folder.
//! - [`FileRecord`]: A listed file tagged with its [`FileCategory`].
//! - [`CommandGrammar`]: Maps free text to a [`CommandKind`].

/// File name classification.
pub mod classifier;
/// Free-text command grammar.
pub mod command;
/// Error types.
pub mod error;
/// Storage file and folder types.
pub mod file;

pub use classifier::{classify, FileCategory};
pub use command::{CommandGrammar, CommandKind, CommandPhrases};
pub use error::{IntakeError, IntakeResult};
pub use file::{FileRecord, FolderRef, RemoteFile};
