// ============================================================================
//  CLEAN MODULE BOUNDARIES
// ============================================================================

//! Core domain layer for Labkit.
//!
//! This module contains pure logic with no I/O. Filesystem, YAML parsing,
//! process execution and HTTP are handled via ports (traits) defined in the
//! application layer.
//!
//! ## Hexagonal Architecture Compliance
//!
//! - **No async**: everything is synchronous and sequential
//! - **No I/O**: no filesystem, network, or external calls
//! - **Immutable values**: resolved config and catalog are read-only for a run
//!
pub mod artifact;
pub mod common;
pub mod config;
pub mod error;
pub mod firewall;
pub mod mirror;
pub mod probe;
pub mod render;

pub use artifact::{
    ArtifactCategory, ArtifactSpec, Catalog, Layout, Payload, WriteAction, WriteDecision,
};
pub use common::RelativePath;
pub(crate) use config::FieldValue;
pub use config::{
    ConfigDocument, ConfigKey, ConfigLoad, ConfigOrigin, ConfigScalar, FieldIssue, Resolution,
    ResolvedConfig,
};
pub use error::{DomainError, ErrorCategory};
pub use firewall::{FirewallMechanism, PortOutcome, PortReport, PortRule};
pub use mirror::{MirrorOutcome, MirrorPair, MirrorRecord};
pub use probe::{
    Discovered, Probe, ProbeKind, ProbeResult, ProbeTimeouts, ResponseShape, SmokeReport,
};
pub use render::{RenderContext, RenderMode};
