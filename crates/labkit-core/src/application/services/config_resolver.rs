//! Config Resolver - derive workshop defaults from the optional YAML file.
//!
//! Degradation rules:
//! - file missing: everything absent, informational message only
//! - file unreadable/malformed: everything absent, diagnostic on stderr
//! - key absent (or null/empty): built-in default for that key, if it has one
//! - key present with the wrong shape: that key absent, warning

use std::path::Path;

use tracing::{debug, error, info, instrument, warn};

use crate::{
    application::ports::ConfigSource,
    domain::{
        ConfigDocument, ConfigKey, ConfigLoad, ConfigOrigin, ConfigScalar, FieldIssue, FieldValue,
        Resolution, ResolvedConfig,
    },
};

/// Loads the workshop YAML and turns it into a [`ResolvedConfig`].
pub struct ConfigResolver {
    source: Box<dyn ConfigSource>,
}

impl ConfigResolver {
    pub fn new(source: Box<dyn ConfigSource>) -> Self {
        Self { source }
    }

    /// Resolve defaults from `config_path`. Never fails.
    #[instrument(skip_all, fields(path = %config_path.display()))]
    pub fn resolve(&self, config_path: &Path) -> Resolution {
        let path = config_path.to_path_buf();
        match self.source.load(config_path) {
            ConfigLoad::Missing => {
                info!("No workshop config found; a template will be created");
                Resolution {
                    config: ResolvedConfig::empty(),
                    origin: ConfigOrigin::Missing { path },
                    defaulted: Vec::new(),
                    issues: Vec::new(),
                }
            }
            ConfigLoad::Unreadable { reason } => {
                error!(%reason, "Workshop config could not be parsed; continuing without defaults");
                Resolution {
                    config: ResolvedConfig::empty(),
                    origin: ConfigOrigin::Unreadable { path, reason },
                    defaulted: Vec::new(),
                    issues: Vec::new(),
                }
            }
            ConfigLoad::Parsed(doc) => {
                let resolution = Self::resolve_document(&doc, path);
                info!(
                    exported = resolution.config.exports().len(),
                    defaulted = resolution.defaulted.len(),
                    malformed = resolution.issues.len(),
                    "Workshop defaults resolved"
                );
                resolution
            }
        }
    }

    /// Field-by-field resolution of an already parsed document.
    pub fn resolve_document(
        doc: &ConfigDocument,
        path: impl Into<std::path::PathBuf>,
    ) -> Resolution {
        let mut config = ResolvedConfig::empty();
        let mut defaulted = Vec::new();
        let mut issues = Vec::new();

        for key in ConfigKey::ALL {
            let raw = doc.get(key.path()).filter(|v| !is_blank(v));
            match raw {
                Some(scalar) => match convert(key, scalar) {
                    Ok(value) => config.set(key, value),
                    Err(expected) => {
                        let issue = FieldIssue {
                            key,
                            found: describe(scalar),
                            expected,
                        };
                        warn!(%key, "{issue}; leaving it unset");
                        issues.push(issue);
                    }
                },
                None => match key.builtin_default() {
                    Some(default) => {
                        if let Ok(value) = convert(key, &default) {
                            debug!(%key, "Using built-in default");
                            config.set(key, value);
                            defaulted.push(key);
                        }
                    }
                    None => debug!(%key, "Absent, no built-in default"),
                },
            }
        }

        Resolution {
            config,
            origin: ConfigOrigin::File { path: path.into() },
            defaulted,
            issues,
        }
    }
}

#[derive(Clone, Copy)]
enum Expect {
    Text,
    Ratio,
    Count,
    Port,
}

fn expectation(key: ConfigKey) -> Expect {
    match key {
        ConfigKey::Temperature | ConfigKey::TopP => Expect::Ratio,
        ConfigKey::MaxTokens => Expect::Count,
        ConfigKey::ApiPort | ConfigKey::StreamlitPort => Expect::Port,
        _ => Expect::Text,
    }
}

fn is_blank(value: &ConfigScalar) -> bool {
    match value {
        ConfigScalar::Null => true,
        ConfigScalar::String(s) => s.trim().is_empty(),
        _ => false,
    }
}

fn describe(value: &ConfigScalar) -> String {
    match value {
        ConfigScalar::String(s) => format!("string {s:?}"),
        ConfigScalar::Integer(i) => format!("integer {i}"),
        ConfigScalar::Float(f) => format!("float {f}"),
        ConfigScalar::Bool(b) => format!("bool {b}"),
        other => other.kind().to_string(),
    }
}

fn convert(key: ConfigKey, value: &ConfigScalar) -> Result<FieldValue, &'static str> {
    match expectation(key) {
        Expect::Text => match value {
            ConfigScalar::String(s) => Ok(FieldValue::Text(s.trim().to_string())),
            // YAML happily types `tag: 1.2` or `compartment: 42` as numbers.
            ConfigScalar::Integer(i) => Ok(FieldValue::Text(i.to_string())),
            ConfigScalar::Float(f) => Ok(FieldValue::Text(f.to_string())),
            _ => Err("a string"),
        },
        Expect::Ratio => {
            let n = match value {
                ConfigScalar::Integer(i) => Some(*i as f64),
                ConfigScalar::Float(f) => Some(*f),
                ConfigScalar::String(s) => s.trim().parse::<f64>().ok(),
                _ => None,
            };
            n.filter(|n| n.is_finite() && *n >= 0.0)
                .map(FieldValue::Ratio)
                .ok_or("a non-negative number")
        }
        Expect::Count => {
            let n = match value {
                ConfigScalar::Integer(i) => u32::try_from(*i).ok(),
                ConfigScalar::String(s) => s.trim().parse::<u32>().ok(),
                _ => None,
            };
            n.map(FieldValue::Count).ok_or("a non-negative integer")
        }
        Expect::Port => {
            let n = match value {
                ConfigScalar::Integer(i) => u16::try_from(*i).ok(),
                ConfigScalar::String(s) => s.trim().parse::<u16>().ok(),
                _ => None,
            };
            n.filter(|p| *p != 0)
                .map(FieldValue::Port)
                .ok_or("a port number (1-65535)")
        }
    }
}
