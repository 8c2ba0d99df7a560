//! Driven (output) ports - implemented by infrastructure.
//!
//! These traits define what the application needs from external systems.
//! The `labkit-adapters` crate provides implementations.

use std::path::Path;
use std::time::Duration;

use thiserror::Error;

use crate::domain::ConfigLoad;
use crate::error::LabkitResult;

/// Port for filesystem operations.
///
/// Implemented by:
/// - `labkit_adapters::filesystem::LocalFilesystem` (production)
/// - `labkit_adapters::filesystem::MemoryFilesystem` (testing)
///
/// Errors from this port are the only ones allowed to abort a run.
#[cfg_attr(test, mockall::automock)]
pub trait Filesystem: Send + Sync {
    /// Check if path exists.
    fn exists(&self, path: &Path) -> bool;

    /// Check if path exists and is a directory.
    fn is_dir(&self, path: &Path) -> bool;

    /// Create a directory and all parent directories.
    fn create_dir_all(&self, path: &Path) -> LabkitResult<()>;

    /// Write bytes to a file, replacing any previous content.
    fn write_file(&self, path: &Path, content: &[u8]) -> LabkitResult<()>;

    /// Read a whole file.
    fn read_file(&self, path: &Path) -> LabkitResult<Vec<u8>>;
}

/// Port for reading the optional workshop YAML.
///
/// Never fails: a missing or unparsable file is a [`ConfigLoad`] variant.
pub trait ConfigSource: Send + Sync {
    fn load(&self, path: &Path) -> ConfigLoad;
}

/// Outcome of running an external program.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CommandOutcome {
    /// Exit status zero.
    Success { stdout: String },
    /// Ran and exited non-zero, or was killed (`code: None`), including
    /// when it outlived its timeout.
    Failed { code: Option<i32>, stderr: String },
    /// The program is not installed / not on `PATH`.
    NotFound,
}

impl CommandOutcome {
    pub fn succeeded(&self) -> bool {
        matches!(self, Self::Success { .. })
    }

    pub fn stdout(&self) -> Option<&str> {
        match self {
            Self::Success { stdout } => Some(stdout),
            _ => None,
        }
    }

    /// One-line description for logs and report details.
    pub fn summary(&self) -> String {
        match self {
            Self::Success { .. } => "ok".into(),
            Self::Failed { code, stderr } => {
                let first = stderr.lines().next().unwrap_or("").trim();
                match code {
                    Some(c) if first.is_empty() => format!("exit {c}"),
                    Some(c) => format!("exit {c}: {first}"),
                    None => format!("terminated: {first}"),
                }
            }
            Self::NotFound => "not installed".into(),
        }
    }
}

/// Port for invoking host tooling (firewall-cmd, iptables, pgrep, ss).
///
/// A program still running after `timeout` is killed and reported as
/// [`CommandOutcome::Failed`] with no exit code.
pub trait CommandRunner: Send + Sync {
    fn run(&self, program: &str, args: &[&str], timeout: Duration) -> CommandOutcome;
}

/// A completed HTTP exchange, whatever its status.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HttpReply {
    pub status: u16,
    /// e.g. `HTTP/1.1 200 OK`.
    pub status_line: String,
    pub body: String,
}

impl HttpReply {
    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }
}

/// Why a network probe produced no reply.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum ProbeError {
    #[error("timed out after {}s", .after.as_secs_f64())]
    Timeout { after: Duration },

    #[error("unreachable: {0}")]
    Unreachable(String),

    #[error("{0}")]
    Other(String),
}

/// Port for bounded network checks.
///
/// Every call must return within `timeout` (plus scheduling noise); the
/// timeout is enforced by the implementation at the call site.
pub trait NetworkProbe: Send + Sync {
    /// `query` pairs are URL-encoded by the implementation and appended.
    fn http_get(
        &self,
        url: &str,
        query: &[(String, String)],
        timeout: Duration,
    ) -> Result<HttpReply, ProbeError>;

    fn http_head(&self, url: &str, timeout: Duration) -> Result<HttpReply, ProbeError>;

    /// Whether something accepts TCP connections on `127.0.0.1:port`.
    fn tcp_listening(&self, port: u16, timeout: Duration) -> bool;
}
