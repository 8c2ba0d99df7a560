//! Labkit Core - Hexagonal Architecture Implementation
//!
//! This crate provides the domain and application layers for the Labkit
//! workshop scaffolding tool, following hexagonal (ports and adapters) architecture.
//!
//! ## Architecture Overview
//!
//! ```text
//! ┌─────────────────────────────────────────┐
//! │           labkit-cli (CLI)              │
//! │     (Implements Driving Ports)          │
//! └──────────────────┬──────────────────────┘
//!                    │ calls
//!                    ▼
//! ┌─────────────────────────────────────────┐
//! │         Application Services            │
//! │  (ConfigResolver, ScaffoldService,      │
//! │   PortOpener, SmokeTester)              │
//! └──────────────────┬──────────────────────┘
//!                    │ uses
//!                    ▼
//! ┌─────────────────────────────────────────┐
//! │      Application Ports (Traits)         │
//! │ (Filesystem, ConfigSource,              │
//! │  CommandRunner, NetworkProbe)           │
//! └──────────────────┬──────────────────────┘
//!                    │ implemented by
//!                    ▼
//! ┌─────────────────────────────────────────┐
//! │    labkit-adapters (Infrastructure)     │
//! │ (LocalFilesystem, YamlConfigSource, ..) │
//! └─────────────────────────────────────────┘
//!                    │
//!                    ▼
//! ┌─────────────────────────────────────────┐
//! │         Domain Layer (Pure Logic)       │
//! │ (ArtifactSpec, MirrorPair, Probe, ..)   │
//! └─────────────────────────────────────────┘
//! ```
//!
//! ## Usage
//!
//! ```rust,ignore
//! use labkit_core::prelude::*;
//!
//! // 1. Resolve defaults from the optional YAML file
//! let resolution = ConfigResolver::new(source).resolve("config/app_config.yaml".as_ref());
//!
//! // 2. Materialize, mirror and aggregate the catalog
//! let service = ScaffoldService::new(filesystem, catalog, RenderMode::Literal);
//! let report = service.run("./workshop".as_ref(), &resolution.config, false).unwrap();
//! ```

pub mod domain;

pub mod application;

pub mod error;

// Public API - what external crates should use
pub mod prelude {
    pub use crate::application::{
        Aggregator, ConfigResolver, FileMaterializer, Mirror, PortOpener, ScaffoldReport,
        ScaffoldService, SmokeTester,
        ports::{CommandRunner, ConfigSource, Filesystem, NetworkProbe},
    };
    pub use crate::domain::{
        ArtifactCategory, ArtifactSpec, Catalog, MirrorPair, Payload, PortOutcome, Probe,
        ProbeKind, ProbeResult, RenderContext, RenderMode, ResolvedConfig, SmokeReport,
        WriteAction, WriteDecision,
    };
    pub use crate::error::{LabkitError, LabkitResult};
}

// Version info
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
