//! Tool settings.
//!
//! [`AppConfig`] is loaded once at startup and passed down by value.  It
//! holds how labkit probes and where it adds firewall rules, not the
//! workshop's own values (those come from the workshop YAML).
//!
//! # Resolution order (highest priority first)
//!
//! 1. CLI flags (handled at the call-site, not here)
//! 2. `LABKIT__*` environment variables, `__` between sections
//!    (`LABKIT__SMOKE__FUNCTIONAL_TIMEOUT_SECS=20`)
//! 3. Settings file: `--settings FILE`, or `config.toml` in the platform
//!    config directory when present
//! 4. Built-in defaults (always present)

use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::Context as _;
use config::{Config, Environment, File};
use serde::{Deserialize, Serialize};

use labkit_core::{
    application::{FirewallSettings, SmokePlan},
    domain::ProbeTimeouts,
};

const ENV_PREFIX: &str = "LABKIT";

/// Application configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    /// Smoke-test endpoints and timeouts.
    pub smoke: SmokeConfig,
    /// Where allow rules go.
    pub firewall: FirewallConfig,
    /// Output settings.
    pub output: OutputConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SmokeConfig {
    pub readiness_timeout_secs: u64,
    pub functional_timeout_secs: u64,
    pub ip_timeout_secs: u64,
    pub head_timeout_secs: u64,
    pub port_check_timeout_ms: u64,
    /// Deadline for each host command (`pgrep`, `ss`).
    pub command_timeout_secs: u64,
    pub ip_service_url: String,
    pub readiness_path: String,
    pub functional_path: String,
    pub functional_query: Vec<QueryParam>,
    pub ui_port_priority: Vec<u16>,
    pub process_patterns: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct QueryParam {
    pub name: String,
    pub value: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct FirewallConfig {
    pub zone: String,
    pub chain: String,
    pub use_sudo: bool,
    /// Deadline for each firewall command.
    pub command_timeout_secs: u64,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct OutputConfig {
    pub no_color: bool,
}

impl Default for SmokeConfig {
    fn default() -> Self {
        let plan = SmokePlan::default();
        Self {
            readiness_timeout_secs: plan.timeouts.readiness.as_secs(),
            functional_timeout_secs: plan.timeouts.functional.as_secs(),
            ip_timeout_secs: plan.timeouts.ip_discovery.as_secs(),
            head_timeout_secs: plan.timeouts.public_head.as_secs(),
            port_check_timeout_ms: duration_ms(plan.port_check_timeout),
            command_timeout_secs: plan.command_timeout.as_secs(),
            ip_service_url: plan.ip_service_url,
            readiness_path: plan.readiness_path,
            functional_path: plan.functional_path,
            functional_query: plan
                .functional_query
                .into_iter()
                .map(|(name, value)| QueryParam { name, value })
                .collect(),
            ui_port_priority: plan.ui_port_priority,
            process_patterns: plan.process_patterns,
        }
    }
}

impl Default for FirewallConfig {
    fn default() -> Self {
        let settings = FirewallSettings::default();
        Self {
            zone: settings.zone,
            chain: settings.chain,
            use_sudo: settings.use_sudo,
            command_timeout_secs: settings.command_timeout.as_secs(),
        }
    }
}

impl AppConfig {
    /// Load settings: defaults, then the settings file, then the environment.
    ///
    /// An explicit `settings_file` must exist; the platform default is optional.
    pub fn load(settings_file: Option<&Path>) -> anyhow::Result<Self> {
        let defaults =
            Config::try_from(&Self::default()).context("encoding built-in defaults")?;

        let file = match settings_file {
            Some(path) => File::from(path).required(true),
            None => File::from(Self::config_path()).required(false),
        };

        let cfg: Self = Config::builder()
            .add_source(defaults)
            .add_source(file)
            .add_source(
                Environment::with_prefix(ENV_PREFIX)
                    .prefix_separator("__")
                    .separator("__")
                    .try_parsing(true),
            )
            .build()
            .context("reading settings")?
            .try_deserialize()
            .context("settings have the wrong shape")?;

        tracing::debug!(?cfg, "Settings loaded");
        Ok(cfg)
    }

    /// Path to the default settings file.
    ///
    /// Uses `directories::ProjectDirs` for cross-platform correctness,
    /// falling back to `.labkit.toml` in the current directory.
    pub fn config_path() -> PathBuf {
        directories::ProjectDirs::from("com", "labkit", "labkit")
            .map(|d| d.config_dir().join("config.toml"))
            .unwrap_or_else(|| PathBuf::from(".labkit.toml"))
    }

    pub fn to_smoke_plan(&self) -> SmokePlan {
        let s = &self.smoke;
        SmokePlan {
            timeouts: ProbeTimeouts {
                readiness: Duration::from_secs(s.readiness_timeout_secs),
                functional: Duration::from_secs(s.functional_timeout_secs),
                ip_discovery: Duration::from_secs(s.ip_timeout_secs),
                public_head: Duration::from_secs(s.head_timeout_secs),
            },
            process_patterns: s.process_patterns.clone(),
            ui_port_priority: s.ui_port_priority.clone(),
            readiness_path: s.readiness_path.clone(),
            functional_path: s.functional_path.clone(),
            functional_query: s
                .functional_query
                .iter()
                .map(|q| (q.name.clone(), q.value.clone()))
                .collect(),
            ip_service_url: s.ip_service_url.clone(),
            port_check_timeout: Duration::from_millis(s.port_check_timeout_ms),
            command_timeout: Duration::from_secs(s.command_timeout_secs),
        }
    }

    pub fn to_firewall_settings(&self) -> FirewallSettings {
        FirewallSettings {
            zone: self.firewall.zone.clone(),
            chain: self.firewall.chain.clone(),
            use_sudo: self.firewall.use_sudo,
            command_timeout: Duration::from_secs(self.firewall.command_timeout_secs),
        }
    }
}

fn duration_ms(d: Duration) -> u64 {
    u64::try_from(d.as_millis()).unwrap_or(u64::MAX)
}
