//! Application ports (traits) for external dependencies.
//!
//! In hexagonal architecture, ports define interfaces that the application
//! needs from the outside world. Adapters in `labkit-adapters` implement these.
//!
//! ## Port Types
//!
//! - **Driven (Output) Ports**: Called by application, implemented by infrastructure
//!   - `Filesystem`: File operations
//!   - `ConfigSource`: Reading the workshop YAML
//!   - `CommandRunner`: Invoking host tooling (firewall, process and socket listings)
//!   - `NetworkProbe`: Bounded HTTP and TCP checks
//!
//! - **Driving (Input) Ports**: Called by external world, implemented by application
//!   - (Defined in CLI layer, implemented by services)

pub mod output;

pub use output::{
    CommandOutcome, CommandRunner, ConfigSource, Filesystem, HttpReply, NetworkProbe, ProbeError,
};
