//! Infrastructure adapters for Labkit.
//!
//! This crate implements the ports defined in `labkit-core::application::ports`.
//! It contains all external dependencies and I/O operations.

pub mod catalog;
pub mod command;
pub mod config_source;
pub mod filesystem;
pub mod http;

// Re-export commonly used adapters
pub use catalog::workshop_catalog;
pub use command::SystemCommandRunner;
pub use config_source::YamlConfigSource;
pub use filesystem::{LocalFilesystem, MemoryFilesystem};
pub use http::ReqwestProbe;
