//! Port Opener - best-effort inbound allow rules on two mechanisms.
//!
//! The dynamic firewall and the static packet filter are handled by two
//! independent operations. Neither one's outcome gates the other and there
//! is no rollback: a partially applied state is acceptable.

use std::time::Duration;

use tracing::{debug, info, instrument, warn};

use crate::{
    application::ports::{CommandOutcome, CommandRunner},
    domain::{FirewallMechanism, PortOutcome, PortReport, PortRule},
};

const FIREWALL_CMD: &str = "firewall-cmd";
const IPTABLES: &str = "iptables";

/// Where rules go and how commands are invoked.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FirewallSettings {
    pub zone: String,
    pub chain: String,
    pub use_sudo: bool,
    /// Per-command limit; a wedged daemon must not stall the run.
    pub command_timeout: Duration,
}

impl Default for FirewallSettings {
    fn default() -> Self {
        Self {
            zone: "public".into(),
            chain: "INPUT".into(),
            use_sudo: false,
            command_timeout: Duration::from_secs(30),
        }
    }
}

pub struct PortOpener {
    runner: Box<dyn CommandRunner>,
    settings: FirewallSettings,
}

impl PortOpener {
    pub fn new(runner: Box<dyn CommandRunner>, settings: FirewallSettings) -> Self {
        Self { runner, settings }
    }

    /// Run both mechanisms for every port. Never fails.
    #[instrument(skip(self), fields(sudo = self.settings.use_sudo))]
    pub fn open_ports(&self, ports: &[u16]) -> PortReport {
        let mut rules = self.ensure_dynamic_firewall_rule(ports);
        rules.extend(self.ensure_static_filter_rule(ports));

        for rule in &rules {
            match rule.outcome {
                PortOutcome::Failed => warn!("{rule}"),
                _ => info!("{rule}"),
            }
        }
        PortReport { rules }
    }

    /// Add `P/tcp` to the configured zone permanently, then reload once.
    ///
    /// The daemon must report itself running; otherwise every port is
    /// [`PortOutcome::Unavailable`].
    pub fn ensure_dynamic_firewall_rule(&self, ports: &[u16]) -> Vec<PortRule> {
        let mechanism = FirewallMechanism::DynamicFirewall;
        let state = self.exec(FIREWALL_CMD, &["--state"]);
        if !state.succeeded() {
            let detail = match &state {
                CommandOutcome::NotFound => "firewall-cmd not installed".to_string(),
                other => format!("daemon not running ({})", other.summary()),
            };
            debug!(%detail, "Dynamic firewall unavailable");
            return unavailable_for(mechanism, ports, &detail);
        }

        let zone = format!("--zone={}", self.settings.zone);
        let mut rules = Vec::with_capacity(ports.len());
        for &port in ports {
            let spec = format!("{port}/tcp");
            let query = format!("--query-port={spec}");
            let queried = self.exec(FIREWALL_CMD, &[zone.as_str(), query.as_str()]);
            let (outcome, detail) = match queried {
                CommandOutcome::Success { .. } => (PortOutcome::AlreadyPresent, String::new()),
                CommandOutcome::NotFound => {
                    (PortOutcome::Unavailable, "firewall-cmd not installed".into())
                }
                CommandOutcome::Failed { .. } => {
                    let add = format!("--add-port={spec}");
                    match self.exec(FIREWALL_CMD, &["--permanent", zone.as_str(), add.as_str()]) {
                        CommandOutcome::Success { .. } => (PortOutcome::Applied, String::new()),
                        CommandOutcome::NotFound => {
                            (PortOutcome::Unavailable, "firewall-cmd not installed".into())
                        }
                        failed => (PortOutcome::Failed, failed.summary()),
                    }
                }
            };
            rules.push(PortRule {
                mechanism,
                port,
                outcome,
                detail,
            });
        }

        if rules.iter().any(|r| r.outcome == PortOutcome::Applied) {
            let reload = self.exec(FIREWALL_CMD, &["--reload"]);
            if !reload.succeeded() {
                warn!(
                    result = %reload.summary(),
                    "Firewall reload failed; permanent rules apply after next reload"
                );
            }
        }
        rules
    }

    /// Insert an ACCEPT rule at the top of the configured chain unless the
    /// identical rule is already there.
    pub fn ensure_static_filter_rule(&self, ports: &[u16]) -> Vec<PortRule> {
        let mechanism = FirewallMechanism::StaticFilter;
        let mut rules = Vec::with_capacity(ports.len());

        for (i, &port) in ports.iter().enumerate() {
            let rule = rule_spec(port);
            let chain = self.settings.chain.as_str();
            let check = self.exec(IPTABLES, &with_head(&["-C", chain], &rule));
            let (outcome, detail) = match check {
                CommandOutcome::Success { .. } => (PortOutcome::AlreadyPresent, String::new()),
                CommandOutcome::NotFound => {
                    debug!("Static packet filter unavailable");
                    let rest = &ports[i..];
                    rules.extend(unavailable_for(mechanism, rest, "iptables not installed"));
                    return rules;
                }
                CommandOutcome::Failed { .. } => {
                    let insert = with_head(&["-I", chain, "1"], &rule);
                    match self.exec(IPTABLES, &insert) {
                        CommandOutcome::Success { .. } => (PortOutcome::Applied, String::new()),
                        CommandOutcome::NotFound => {
                            (PortOutcome::Unavailable, "iptables not installed".into())
                        }
                        failed => (PortOutcome::Failed, failed.summary()),
                    }
                }
            };
            rules.push(PortRule {
                mechanism,
                port,
                outcome,
                detail,
            });
        }
        rules
    }

    fn exec(&self, program: &str, args: &[&str]) -> CommandOutcome {
        let timeout = self.settings.command_timeout;
        if !self.settings.use_sudo {
            return self.runner.run(program, args, timeout);
        }

        let mut full = Vec::with_capacity(args.len() + 1);
        full.push(program);
        full.extend_from_slice(args);
        match self.runner.run("sudo", &full, timeout) {
            CommandOutcome::Failed { stderr, .. } if stderr.contains("command not found") => {
                CommandOutcome::NotFound
            }
            other => other,
        }
    }
}

/// `-p tcp -m state --state NEW --dport P -j ACCEPT`
fn rule_spec(port: u16) -> Vec<String> {
    let mut spec: Vec<String> = ["-p", "tcp", "-m", "state", "--state", "NEW", "--dport"]
        .iter()
        .map(|s| (*s).to_string())
        .collect();
    spec.push(port.to_string());
    spec.push("-j".into());
    spec.push("ACCEPT".into());
    spec
}

fn with_head<'a>(head: &[&'a str], rule: &'a [String]) -> Vec<&'a str> {
    head.iter()
        .copied()
        .chain(rule.iter().map(String::as_str))
        .collect()
}

fn unavailable_for(mechanism: FirewallMechanism, ports: &[u16], detail: &str) -> Vec<PortRule> {
    ports
        .iter()
        .map(|&port| PortRule {
            mechanism,
            port,
            outcome: PortOutcome::Unavailable,
            detail: detail.to_string(),
        })
        .collect()
}
