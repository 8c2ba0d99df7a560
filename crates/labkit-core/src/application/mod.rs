//! Application layer for Labkit.
//!
//! This layer contains:
//! - **Services**: Use case orchestration (ConfigResolver, ScaffoldService, ...)
//! - **Ports**: Interface definitions (traits) for external dependencies
//! - **Errors**: Application-specific error types
//!
//! Services coordinate the domain layer through ports; the decision rules
//! themselves (write-or-skip, UI port priority, placeholder substitution)
//! live in `crate::domain`.

pub mod error;
pub mod ports;
pub mod services;

// Re-export main services
pub use services::{
    Aggregator, ConfigResolver, FileMaterializer, FirewallSettings, Mirror, PortOpener,
    ScaffoldReport, ScaffoldService, SmokePlan, SmokeTester,
};

// Re-export port traits (for adapter implementation)
pub use ports::{
    CommandOutcome, CommandRunner, ConfigSource, Filesystem, HttpReply, NetworkProbe, ProbeError,
};

pub use error::ApplicationError;
