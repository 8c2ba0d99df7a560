//! Workshop YAML reader.
//!
//! The document is flattened into dotted keys (`llm.model_id`). Mapping and
//! sequence nodes are recorded as composites so a key that should be a
//! scalar but holds a structure is reported as malformed rather than absent.

use std::io;
use std::path::Path;

use labkit_core::{
    application::ports::ConfigSource,
    domain::{ConfigDocument, ConfigLoad, ConfigScalar},
};
use serde_yaml::Value;
use tracing::debug;

#[derive(Debug, Clone, Copy, Default)]
pub struct YamlConfigSource;

impl YamlConfigSource {
    pub fn new() -> Self {
        Self
    }

    /// Parse YAML text. An empty document yields an empty [`ConfigDocument`].
    pub fn parse(text: &str) -> ConfigLoad {
        if text
            .lines()
            .all(|l| l.trim().is_empty() || l.trim_start().starts_with('#'))
        {
            return ConfigLoad::Parsed(ConfigDocument::new());
        }

        let value: Value = match serde_yaml::from_str(text) {
            Ok(v) => v,
            Err(e) => {
                return ConfigLoad::Unreadable {
                    reason: e.to_string(),
                };
            }
        };

        let mut doc = ConfigDocument::new();
        match value {
            Value::Null => {}
            Value::Mapping(map) => flatten_mapping("", &map, &mut doc),
            other => {
                return ConfigLoad::Unreadable {
                    reason: format!("top level is a {}, expected a mapping", kind(&other)),
                };
            }
        }
        debug!(keys = doc.len(), "Flattened workshop config");
        ConfigLoad::Parsed(doc)
    }
}

impl ConfigSource for YamlConfigSource {
    fn load(&self, path: &Path) -> ConfigLoad {
        match std::fs::read_to_string(path) {
            Ok(text) => Self::parse(&text),
            Err(e) if e.kind() == io::ErrorKind::NotFound => ConfigLoad::Missing,
            Err(e) => ConfigLoad::Unreadable {
                reason: e.to_string(),
            },
        }
    }
}

fn flatten_mapping(prefix: &str, map: &serde_yaml::Mapping, doc: &mut ConfigDocument) {
    for (key, value) in map {
        let Some(name) = key_name(key) else {
            continue;
        };
        let path = if prefix.is_empty() {
            name
        } else {
            format!("{prefix}.{name}")
        };
        flatten_value(path, value, doc);
    }
}

fn flatten_value(path: String, value: &Value, doc: &mut ConfigDocument) {
    match value {
        Value::Mapping(map) => {
            flatten_mapping(&path, map, doc);
            doc.insert(path, ConfigScalar::Composite("mapping"));
        }
        Value::Sequence(_) => doc.insert(path, ConfigScalar::Composite("sequence")),
        Value::Tagged(tagged) => flatten_value(path, &tagged.value, doc),
        scalar => doc.insert(path, to_scalar(scalar)),
    }
}

fn to_scalar(value: &Value) -> ConfigScalar {
    match value {
        Value::Null => ConfigScalar::Null,
        Value::Bool(b) => ConfigScalar::Bool(*b),
        Value::Number(n) => match n.as_i64() {
            Some(i) => ConfigScalar::Integer(i),
            None => n.as_f64().map_or(ConfigScalar::Composite("number"), ConfigScalar::Float),
        },
        Value::String(s) => ConfigScalar::String(s.clone()),
        Value::Sequence(_) => ConfigScalar::Composite("sequence"),
        Value::Mapping(_) => ConfigScalar::Composite("mapping"),
        Value::Tagged(tagged) => to_scalar(&tagged.value),
    }
}

/// Scalar keys only; `8010: x` becomes `"8010"`.
fn key_name(key: &Value) -> Option<String> {
    match key {
        Value::String(s) => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        Value::Bool(b) => Some(b.to_string()),
        _ => None,
    }
}

fn kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "bool",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Sequence(_) => "sequence",
        Value::Mapping(_) => "mapping",
        Value::Tagged(_) => "tagged value",
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn parsed(text: &str) -> ConfigDocument {
        match YamlConfigSource::parse(text) {
            ConfigLoad::Parsed(doc) => doc,
            other => panic!("expected parsed document, got {other:?}"),
        }
    }

    #[test]
    fn flattens_nested_keys() {
        let yaml = "oci:\n  auth_mode: api_key\n\
                    llm:\n  temperature: 0.3\n  max_tokens: 600\n\
                    api:\n  port: 8010\n";
        let doc = parsed(yaml);
        let auth_mode = ConfigScalar::String("api_key".into());
        assert_eq!(doc.get("oci.auth_mode"), Some(&auth_mode));
        assert_eq!(doc.get("llm.temperature"), Some(&ConfigScalar::Float(0.3)));
        assert_eq!(doc.get("llm.max_tokens"), Some(&ConfigScalar::Integer(600)));
        assert_eq!(doc.get("api.port"), Some(&ConfigScalar::Integer(8010)));
        assert_eq!(doc.get("api"), Some(&ConfigScalar::Composite("mapping")));
    }

    #[test]
    fn structure_where_scalar_expected_is_composite() {
        let doc = parsed("api:\n  port:\n    - 8010\n");
        assert_eq!(
            doc.get("api.port"),
            Some(&ConfigScalar::Composite("sequence"))
        );
    }

    #[test]
    fn null_and_empty_documents() {
        assert_eq!(parsed("").len(), 0);
        let doc = parsed("llm:\n  model_id:\n");
        assert_eq!(doc.get("llm.model_id"), Some(&ConfigScalar::Null));
    }

    #[test]
    fn syntax_error_is_unreadable() {
        assert!(matches!(
            YamlConfigSource::parse("oci: [unclosed"),
            ConfigLoad::Unreadable { .. }
        ));
        assert!(matches!(
            YamlConfigSource::parse("- a\n- b\n"),
            ConfigLoad::Unreadable { .. }
        ));
    }

    #[test]
    fn load_from_disk() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("app_config.yaml");
        let source = YamlConfigSource::new();

        assert_eq!(source.load(&path), ConfigLoad::Missing);

        std::fs::write(&path, "docker:\n  tag: v2\n").unwrap();
        let ConfigLoad::Parsed(doc) = source.load(&path) else {
            panic!("expected parsed document");
        };
        assert_eq!(
            doc.get("docker.tag"),
            Some(&ConfigScalar::String("v2".into()))
        );
    }
}
