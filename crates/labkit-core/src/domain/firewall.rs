use std::fmt;

use serde::Serialize;

/// The two independent ways a host may filter inbound traffic.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum FirewallMechanism {
    /// A running firewall daemon with zones (firewalld).
    DynamicFirewall,
    /// A static packet-filter table (iptables).
    StaticFilter,
}

impl fmt::Display for FirewallMechanism {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::DynamicFirewall => write!(f, "dynamic-firewall"),
            Self::StaticFilter => write!(f, "static-filter"),
        }
    }
}

/// Result of ensuring one allow rule.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum PortOutcome {
    Applied,
    AlreadyPresent,
    Unavailable,
    /// The mechanism exists but refused the rule. Tolerated.
    Failed,
}

impl fmt::Display for PortOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Applied => write!(f, "applied"),
            Self::AlreadyPresent => write!(f, "already present"),
            Self::Unavailable => write!(f, "unavailable"),
            Self::Failed => write!(f, "failed"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PortRule {
    pub mechanism: FirewallMechanism,
    pub port: u16,
    pub outcome: PortOutcome,
    pub detail: String,
}

impl fmt::Display for PortRule {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} tcp/{}: {}", self.mechanism, self.port, self.outcome)?;
        if !self.detail.is_empty() {
            write!(f, " ({})", self.detail)?;
        }
        Ok(())
    }
}

/// Per-mechanism, per-port outcomes of one `open_ports` call.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct PortReport {
    pub rules: Vec<PortRule>,
}

impl PortReport {
    pub fn for_mechanism(&self, mechanism: FirewallMechanism) -> impl Iterator<Item = &PortRule> {
        self.rules.iter().filter(move |r| r.mechanism == mechanism)
    }

    /// Mechanisms that could not be used for at least one port, each with
    /// the first reason given, in report order.
    pub fn unavailable_mechanisms(&self) -> Vec<(FirewallMechanism, &str)> {
        let mut found: Vec<(FirewallMechanism, &str)> = Vec::new();
        for rule in &self.rules {
            if rule.outcome == PortOutcome::Unavailable
                && !found.iter().any(|(m, _)| *m == rule.mechanism)
            {
                found.push((rule.mechanism, rule.detail.as_str()));
            }
        }
        found
    }

    /// True when the mechanism could not be used for any port.
    pub fn unavailable(&self, mechanism: FirewallMechanism) -> bool {
        let mut rules = self.for_mechanism(mechanism).peekable();
        rules.peek().is_some() && rules.all(|r| r.outcome == PortOutcome::Unavailable)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use FirewallMechanism::{DynamicFirewall, StaticFilter};

    fn rule(mechanism: FirewallMechanism, port: u16, outcome: PortOutcome) -> PortRule {
        PortRule {
            mechanism,
            port,
            outcome,
            detail: String::new(),
        }
    }

    #[test]
    fn unavailable_needs_every_rule_unavailable() {
        let report = PortReport {
            rules: vec![
                rule(DynamicFirewall, 8010, PortOutcome::Unavailable),
                rule(DynamicFirewall, 8501, PortOutcome::Unavailable),
                rule(StaticFilter, 8010, PortOutcome::Applied),
                rule(StaticFilter, 8501, PortOutcome::Unavailable),
            ],
        };
        assert!(report.unavailable(DynamicFirewall));
        assert!(!report.unavailable(StaticFilter));
    }

    #[test]
    fn unavailable_mechanisms_are_listed_once_with_reason() {
        let mut missing = rule(StaticFilter, 8010, PortOutcome::Unavailable);
        missing.detail = "iptables not installed".into();
        let report = PortReport {
            rules: vec![
                rule(DynamicFirewall, 8010, PortOutcome::Applied),
                missing.clone(),
                PortRule {
                    port: 8501,
                    ..missing
                },
            ],
        };
        assert_eq!(
            report.unavailable_mechanisms(),
            vec![(StaticFilter, "iptables not installed")]
        );
    }

    #[test]
    fn empty_report_is_not_unavailable() {
        let empty = PortReport::default();
        assert!(!empty.unavailable(StaticFilter));
    }

    #[test]
    fn rule_display() {
        let r = rule(StaticFilter, 8010, PortOutcome::AlreadyPresent);
        assert_eq!(r.to_string(), "static-filter tcp/8010: already present");
    }
}
