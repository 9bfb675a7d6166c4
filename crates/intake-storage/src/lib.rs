//! Storage provider access for the intake engine.
//!
//! - [`StorageGateway`]: folder creation and eventually-consistent listing.
//! - [`LocalFolderGateway`]: provider backed by a local directory tree.

/// Storage gateway trait and timeout helper.
pub mod gateway;
/// Local directory provider.
pub mod local;

pub use gateway::{with_timeout, StorageGateway};
pub use local::{LocalFolderGateway, StorageConfig};
