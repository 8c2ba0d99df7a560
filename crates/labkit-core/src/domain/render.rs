//! Placeholder substitution for artifact payloads.
//!
//! Payloads carry shell-style tokens such as `$API_PORT`, `${API_PORT}` and
//! `${API_PORT:-8010}`. Historically these were written out untouched, so
//! [`RenderMode::Literal`] is the default. [`RenderMode::Substitute`] fills
//! them from the resolved workshop defaults.
//!
//! ## Edge Cases
//!
//! - Unknown names are left as-is, including their braces and fallback.
//! - A `$` not followed by a name (`$5`, `$ `, trailing `$`) is literal.
//! - An unterminated `${` is literal up to the end of the input.

use std::borrow::Cow;
use std::collections::BTreeMap;
use std::fmt;

use serde::Serialize;

use super::ResolvedConfig;

/// How payloads are turned into bytes on disk.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum RenderMode {
    /// Write payload bytes verbatim.
    #[default]
    Literal,
    /// Replace known placeholders with resolved values.
    Substitute,
}

impl fmt::Display for RenderMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Literal => write!(f, "literal"),
            Self::Substitute => write!(f, "substitute"),
        }
    }
}

/// Variables available to payloads.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RenderContext {
    variables: BTreeMap<String, String>,
}

impl RenderContext {
    /// Build from the exported names of a resolved config.
    pub fn from_config(config: &ResolvedConfig) -> Self {
        Self::from_pairs(config.exports())
    }

    pub fn from_pairs<K, V>(pairs: impl IntoIterator<Item = (K, V)>) -> Self
    where
        K: Into<String>,
        V: Into<String>,
    {
        Self {
            variables: pairs
                .into_iter()
                .map(|(k, v)| (k.into(), v.into()))
                .collect(),
        }
    }

    pub fn get(&self, key: &str) -> Option<&str> {
        self.variables.get(key).map(|s| s.as_str())
    }

    pub fn is_empty(&self) -> bool {
        self.variables.is_empty()
    }

    /// Substitute known placeholders. Borrows when nothing changed.
    pub fn render<'a>(&self, input: &'a str) -> Cow<'a, str> {
        if !input.contains('$') || self.variables.is_empty() {
            return Cow::Borrowed(input);
        }

        let mut out = String::with_capacity(input.len());
        let mut changed = false;
        let mut rest = input;

        while let Some(pos) = rest.find('$') {
            out.push_str(&rest[..pos]);
            let after = &rest[pos..];
            match Token::parse(after) {
                Some(token) => {
                    match self.get(token.name) {
                        Some(value) => {
                            out.push_str(value);
                            changed = true;
                        }
                        None => out.push_str(&after[..token.len]),
                    }
                    rest = &after[token.len..];
                }
                None => {
                    out.push('$');
                    rest = &after[1..];
                }
            }
        }
        out.push_str(rest);

        if changed {
            Cow::Owned(out)
        } else {
            Cow::Borrowed(input)
        }
    }

    /// Distinct placeholder names in order of first appearance.
    pub fn placeholders(input: &str) -> Vec<String> {
        let mut names: Vec<String> = Vec::new();
        let mut rest = input;
        while let Some(pos) = rest.find('$') {
            let after = &rest[pos..];
            match Token::parse(after) {
                Some(token) => {
                    if !names.iter().any(|n| n == token.name) {
                        names.push(token.name.to_string());
                    }
                    rest = &after[token.len..];
                }
                None => rest = &after[1..],
            }
        }
        names
    }
}

/// One `$NAME` / `${NAME}` / `${NAME:-fallback}` occurrence.
struct Token<'a> {
    name: &'a str,
    /// Byte length including the leading `$`.
    len: usize,
}

impl<'a> Token<'a> {
    /// `input` starts with `$`.
    fn parse(input: &'a str) -> Option<Self> {
        let body = &input[1..];
        if let Some(braced) = body.strip_prefix('{') {
            let close = braced.find('}')?;
            let inner = &braced[..close];
            let name = inner.split_once(":-").map_or(inner, |(n, _)| n);
            is_identifier(name).then_some(Token {
                name,
                len: 2 + close + 1,
            })
        } else {
            let end = body
                .char_indices()
                .find(|(_, c)| !(c.is_ascii_alphanumeric() || *c == '_'))
                .map_or(body.len(), |(i, _)| i);
            let name = &body[..end];
            is_identifier(name).then_some(Token { name, len: 1 + end })
        }
    }
}

fn is_identifier(name: &str) -> bool {
    let mut chars = name.chars();
    matches!(chars.next(), Some(c) if c.is_ascii_alphabetic() || c == '_')
        && chars.all(|c| c.is_ascii_alphanumeric() || c == '_')
}
