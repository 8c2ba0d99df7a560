//! Application services - one per scaffolding concern, plus the orchestrator.

pub mod aggregator;
pub mod config_resolver;
pub mod materializer;
pub mod mirror;
pub mod port_opener;
pub mod scaffold_service;
pub mod smoke_tester;

pub use aggregator::{AggregateDocument, Aggregator};
pub use config_resolver::ConfigResolver;
pub use materializer::FileMaterializer;
pub use mirror::Mirror;
pub use port_opener::{FirewallSettings, PortOpener};
pub use scaffold_service::{ScaffoldReport, ScaffoldService};
pub use smoke_tester::{SmokePlan, SmokeTester};
