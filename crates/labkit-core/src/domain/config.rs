//! Workshop defaults resolved from the optional YAML file.
//!
//! The YAML schema is fixed and nested (`oci.*`, `llm.*`, `api.*`,
//! `streamlit.*`, `docker.*`). Adapters flatten the parsed document into a
//! [`ConfigDocument`] of dotted keys to scalars; the resolver in the
//! application layer turns that into a typed [`ResolvedConfig`], one field
//! at a time.

use std::collections::BTreeMap;
use std::fmt;
use std::path::PathBuf;

use serde::Serialize;

/// Every key the resolver knows about.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
pub enum ConfigKey {
    ServiceEndpoint,
    AuthMode,
    CompartmentId,
    ModelId,
    Temperature,
    TopP,
    MaxTokens,
    ApiBasePath,
    ApiPort,
    StreamlitPort,
    DockerRegistry,
    DockerTag,
}

impl ConfigKey {
    pub const ALL: [ConfigKey; 12] = [
        Self::ServiceEndpoint,
        Self::AuthMode,
        Self::CompartmentId,
        Self::ModelId,
        Self::Temperature,
        Self::TopP,
        Self::MaxTokens,
        Self::ApiBasePath,
        Self::ApiPort,
        Self::StreamlitPort,
        Self::DockerRegistry,
        Self::DockerTag,
    ];

    /// Dotted path inside the YAML document.
    pub const fn path(self) -> &'static str {
        match self {
            Self::ServiceEndpoint => "oci.service_endpoint",
            Self::AuthMode => "oci.auth_mode",
            Self::CompartmentId => "oci.compartment_id",
            Self::ModelId => "llm.model_id",
            Self::Temperature => "llm.temperature",
            Self::TopP => "llm.top_p",
            Self::MaxTokens => "llm.max_tokens",
            Self::ApiBasePath => "api.base_path",
            Self::ApiPort => "api.port",
            Self::StreamlitPort => "streamlit.port",
            Self::DockerRegistry => "docker.registry",
            Self::DockerTag => "docker.tag",
        }
    }

    /// Name under which the value is exported to later steps.
    pub const fn export_name(self) -> &'static str {
        match self {
            Self::ServiceEndpoint => "OCI_SERVICE_ENDPOINT",
            Self::AuthMode => "OCI_AUTH_MODE",
            Self::CompartmentId => "OCI_COMPARTMENT_ID",
            Self::ModelId => "LLM_MODEL_ID",
            Self::Temperature => "LLM_TEMPERATURE",
            Self::TopP => "LLM_TOP_P",
            Self::MaxTokens => "LLM_MAX_TOKENS",
            Self::ApiBasePath => "API_BASE_PATH",
            Self::ApiPort => "API_PORT",
            Self::StreamlitPort => "STREAMLIT_PORT",
            Self::DockerRegistry => "DOCKER_REGISTRY",
            Self::DockerTag => "DOCKER_TAG",
        }
    }

    /// Built-in value used when the key is absent from a readable file.
    pub fn builtin_default(self) -> Option<ConfigScalar> {
        match self {
            Self::AuthMode => Some(ConfigScalar::String(DEFAULT_AUTH_MODE.into())),
            Self::ApiBasePath => Some(ConfigScalar::String(DEFAULT_API_BASE_PATH.into())),
            Self::ApiPort => Some(ConfigScalar::Integer(i64::from(DEFAULT_API_PORT))),
            Self::StreamlitPort => Some(ConfigScalar::Integer(i64::from(DEFAULT_STREAMLIT_PORT))),
            Self::DockerTag => Some(ConfigScalar::String(DEFAULT_DOCKER_TAG.into())),
            _ => None,
        }
    }
}

impl fmt::Display for ConfigKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.path())
    }
}

pub const DEFAULT_AUTH_MODE: &str = "instance_principals";
pub const DEFAULT_API_BASE_PATH: &str = "/api";
pub const DEFAULT_API_PORT: u16 = 8010;
pub const DEFAULT_STREAMLIT_PORT: u16 = 8501;
pub const DEFAULT_DOCKER_TAG: &str = "latest";

/// A leaf value from the parsed YAML document.
#[derive(Debug, Clone, PartialEq)]
pub enum ConfigScalar {
    Null,
    Bool(bool),
    Integer(i64),
    Float(f64),
    String(String),
    /// A mapping or sequence where a scalar was expected.
    Composite(&'static str),
}

impl ConfigScalar {
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Null => "null",
            Self::Bool(_) => "bool",
            Self::Integer(_) => "integer",
            Self::Float(_) => "float",
            Self::String(_) => "string",
            Self::Composite(kind) => kind,
        }
    }
}

/// Parsed YAML flattened to dotted keys.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ConfigDocument {
    entries: BTreeMap<String, ConfigScalar>,
}

impl ConfigDocument {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, path: impl Into<String>, value: ConfigScalar) {
        self.entries.insert(path.into(), value);
    }

    pub fn with(mut self, path: impl Into<String>, value: ConfigScalar) -> Self {
        self.insert(path, value);
        self
    }

    pub fn get(&self, path: &str) -> Option<&ConfigScalar> {
        self.entries.get(path)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// Result of asking a [`ConfigSource`] for a file.
///
/// [`ConfigSource`]: crate::application::ports::ConfigSource
#[derive(Debug, Clone, PartialEq)]
pub enum ConfigLoad {
    /// No file at the path.
    Missing,
    /// The file exists but could not be read or parsed as YAML.
    Unreadable { reason: String },
    Parsed(ConfigDocument),
}

/// Typed workshop defaults. Every field is optional.
///
/// Fields are private: once resolved, nothing downstream may change them.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct ResolvedConfig {
    service_endpoint: Option<String>,
    auth_mode: Option<String>,
    compartment_id: Option<String>,
    model_id: Option<String>,
    temperature: Option<f64>,
    top_p: Option<f64>,
    max_tokens: Option<u32>,
    api_base_path: Option<String>,
    api_port: Option<u16>,
    streamlit_port: Option<u16>,
    docker_registry: Option<String>,
    docker_tag: Option<String>,
}

/// A typed value ready to be stored in [`ResolvedConfig`].
#[derive(Debug, Clone, PartialEq)]
pub(crate) enum FieldValue {
    Text(String),
    Ratio(f64),
    Count(u32),
    Port(u16),
}

impl ResolvedConfig {
    /// All fields absent.
    pub fn empty() -> Self {
        Self::default()
    }

    pub fn is_empty(&self) -> bool {
        ConfigKey::ALL.iter().all(|k| self.display(*k).is_none())
    }

    pub(crate) fn set(&mut self, key: ConfigKey, value: FieldValue) {
        use FieldValue::*;
        match (key, value) {
            (ConfigKey::ServiceEndpoint, Text(v)) => self.service_endpoint = Some(v),
            (ConfigKey::AuthMode, Text(v)) => self.auth_mode = Some(v),
            (ConfigKey::CompartmentId, Text(v)) => self.compartment_id = Some(v),
            (ConfigKey::ModelId, Text(v)) => self.model_id = Some(v),
            (ConfigKey::Temperature, Ratio(v)) => self.temperature = Some(v),
            (ConfigKey::TopP, Ratio(v)) => self.top_p = Some(v),
            (ConfigKey::MaxTokens, Count(v)) => self.max_tokens = Some(v),
            (ConfigKey::ApiBasePath, Text(v)) => self.api_base_path = Some(v),
            (ConfigKey::ApiPort, Port(v)) => self.api_port = Some(v),
            (ConfigKey::StreamlitPort, Port(v)) => self.streamlit_port = Some(v),
            (ConfigKey::DockerRegistry, Text(v)) => self.docker_registry = Some(v),
            (ConfigKey::DockerTag, Text(v)) => self.docker_tag = Some(v),
            (key, value) => {
                tracing::warn!(%key, ?value, "value kind does not match key, ignoring");
            }
        }
    }

    pub fn service_endpoint(&self) -> Option<&str> {
        self.service_endpoint.as_deref()
    }

    pub fn auth_mode(&self) -> Option<&str> {
        self.auth_mode.as_deref()
    }

    pub fn compartment_id(&self) -> Option<&str> {
        self.compartment_id.as_deref()
    }

    pub fn model_id(&self) -> Option<&str> {
        self.model_id.as_deref()
    }

    pub fn temperature(&self) -> Option<f64> {
        self.temperature
    }

    pub fn top_p(&self) -> Option<f64> {
        self.top_p
    }

    pub fn max_tokens(&self) -> Option<u32> {
        self.max_tokens
    }

    pub fn api_base_path(&self) -> Option<&str> {
        self.api_base_path.as_deref()
    }

    pub fn api_port(&self) -> Option<u16> {
        self.api_port
    }

    pub fn streamlit_port(&self) -> Option<u16> {
        self.streamlit_port
    }

    pub fn docker_registry(&self) -> Option<&str> {
        self.docker_registry.as_deref()
    }

    pub fn docker_tag(&self) -> Option<&str> {
        self.docker_tag.as_deref()
    }

    /// String form of one field, as it would be exported.
    pub fn display(&self, key: ConfigKey) -> Option<String> {
        match key {
            ConfigKey::ServiceEndpoint => self.service_endpoint.clone(),
            ConfigKey::AuthMode => self.auth_mode.clone(),
            ConfigKey::CompartmentId => self.compartment_id.clone(),
            ConfigKey::ModelId => self.model_id.clone(),
            ConfigKey::Temperature => self.temperature.map(|v| v.to_string()),
            ConfigKey::TopP => self.top_p.map(|v| v.to_string()),
            ConfigKey::MaxTokens => self.max_tokens.map(|v| v.to_string()),
            ConfigKey::ApiBasePath => self.api_base_path.clone(),
            ConfigKey::ApiPort => self.api_port.map(|v| v.to_string()),
            ConfigKey::StreamlitPort => self.streamlit_port.map(|v| v.to_string()),
            ConfigKey::DockerRegistry => self.docker_registry.clone(),
            ConfigKey::DockerTag => self.docker_tag.clone(),
        }
    }

    /// Named variables for present fields, in schema order.
    pub fn exports(&self) -> Vec<(&'static str, String)> {
        ConfigKey::ALL
            .iter()
            .filter_map(|k| self.display(*k).map(|v| (k.export_name(), v)))
            .collect()
    }

    /// `NAME=value` lines, one per present field.
    pub fn to_env_file(&self) -> String {
        let mut out = String::from("# Resolved workshop defaults (regenerated on every run)\n");
        for (name, value) in self.exports() {
            out.push_str(&format!("{name}={}\n", shell_quote(&value)));
        }
        out
    }
}

fn shell_quote(value: &str) -> String {
    if value
        .chars()
        .all(|c| c.is_ascii_alphanumeric() || "._-/:@".contains(c))
    {
        value.to_string()
    } else {
        format!("'{}'", value.replace('\'', r"'\''"))
    }
}

/// Where the resolved values came from.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ConfigOrigin {
    Missing { path: PathBuf },
    Unreadable { path: PathBuf, reason: String },
    File { path: PathBuf },
}

/// A field that was present but could not be used.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FieldIssue {
    pub key: ConfigKey,
    pub found: String,
    pub expected: &'static str,
}

impl fmt::Display for FieldIssue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} is malformed: expected {}, found {}",
            self.key, self.expected, self.found
        )
    }
}

/// Full output of config resolution.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Resolution {
    pub config: ResolvedConfig,
    pub origin: ConfigOrigin,
    /// Keys filled from built-in defaults.
    pub defaulted: Vec<ConfigKey>,
    /// Keys present but malformed, left absent.
    pub issues: Vec<FieldIssue>,
}

impl Resolution {
    pub fn from_file(&self) -> bool {
        matches!(self.origin, ConfigOrigin::File { .. })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_config_exports_nothing() {
        let cfg = ResolvedConfig::empty();
        assert!(cfg.is_empty());
        assert!(cfg.exports().is_empty());
    }

    #[test]
    fn exports_follow_schema_order() {
        let mut cfg = ResolvedConfig::empty();
        cfg.set(ConfigKey::ApiPort, FieldValue::Port(9000));
        cfg.set(ConfigKey::AuthMode, FieldValue::Text("api_key".into()));
        assert_eq!(
            cfg.exports(),
            vec![
                ("OCI_AUTH_MODE", "api_key".to_string()),
                ("API_PORT", "9000".to_string())
            ]
        );
    }

    #[test]
    fn mismatched_value_kind_is_ignored() {
        let mut cfg = ResolvedConfig::empty();
        cfg.set(ConfigKey::ApiPort, FieldValue::Text("x".into()));
        assert_eq!(cfg.api_port(), None);
    }

    #[test]
    fn env_file_quotes_unsafe_values() {
        let mut cfg = ResolvedConfig::empty();
        let model = FieldValue::Text("cohere command r".into());
        cfg.set(ConfigKey::ModelId, model);
        cfg.set(ConfigKey::ApiBasePath, FieldValue::Text("/api".into()));
        let env = cfg.to_env_file();
        assert!(env.contains("LLM_MODEL_ID='cohere command r'\n"));
        assert!(env.contains("API_BASE_PATH=/api\n"));
    }

    #[test]
    fn builtin_defaults_cover_documented_keys() {
        assert_eq!(
            ConfigKey::AuthMode.builtin_default(),
            Some(ConfigScalar::String("instance_principals".into()))
        );
        assert_eq!(
            ConfigKey::ApiPort.builtin_default(),
            Some(ConfigScalar::Integer(8010))
        );
        assert_eq!(ConfigKey::ModelId.builtin_default(), None);
    }
}
