//! Artifacts, write decisions and the catalog that ties them together.
//!
//! An [`ArtifactSpec`] is one generated file with fixed content. The engine
//! never looks inside a payload except when [`RenderMode::Substitute`] is
//! selected, and even then only to replace placeholder tokens.
//!
//! [`RenderMode::Substitute`]: crate::domain::RenderMode::Substitute

use std::borrow::Cow;
use std::collections::HashSet;
use std::fmt;
use std::path::PathBuf;

use serde::Serialize;

use super::{DomainError, MirrorPair, RelativePath, RenderContext, RenderMode};

/// Broad purpose of an artifact; informational only.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ArtifactCategory {
    Doc,
    Config,
    Guide,
    Env,
}

impl fmt::Display for ArtifactCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Doc => write!(f, "doc"),
            Self::Config => write!(f, "config"),
            Self::Guide => write!(f, "guide"),
            Self::Env => write!(f, "env"),
        }
    }
}

/// Raw artifact bytes, compiled into the binary.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Payload(&'static [u8]);

impl Payload {
    pub const fn from_static(text: &'static str) -> Self {
        Self(text.as_bytes())
    }

    pub fn as_bytes(&self) -> &'static [u8] {
        self.0
    }

    /// Bytes to write under the given render mode.
    ///
    /// Non UTF-8 payloads are always written verbatim.
    pub fn render(&self, ctx: &RenderContext, mode: RenderMode) -> Cow<'_, [u8]> {
        match mode {
            RenderMode::Literal => Cow::Borrowed(self.as_bytes()),
            RenderMode::Substitute => match std::str::from_utf8(self.as_bytes()) {
                Ok(text) => match ctx.render(text) {
                    Cow::Borrowed(_) => Cow::Borrowed(self.as_bytes()),
                    Cow::Owned(s) => Cow::Owned(s.into_bytes()),
                },
                Err(_) => Cow::Borrowed(self.as_bytes()),
            },
        }
    }

    /// Placeholder names in this payload that `ctx` knows a value for.
    pub fn fillable_placeholders(&self, ctx: &RenderContext) -> Vec<String> {
        std::str::from_utf8(self.as_bytes())
            .map(|text| {
                RenderContext::placeholders(text)
                    .into_iter()
                    .filter(|name| ctx.get(name).is_some())
                    .collect()
            })
            .unwrap_or_default()
    }
}

impl From<&'static str> for Payload {
    fn from(s: &'static str) -> Self {
        Self::from_static(s)
    }
}

/// One generated file: where it goes, what it contains.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ArtifactSpec {
    pub relative_path: RelativePath,
    pub payload: Payload,
    pub category: ArtifactCategory,
}

impl ArtifactSpec {
    pub fn new(
        relative_path: impl Into<RelativePath>,
        category: ArtifactCategory,
        payload: impl Into<Payload>,
    ) -> Self {
        Self {
            relative_path: relative_path.into(),
            payload: payload.into(),
            category,
        }
    }

    pub fn doc(path: &str, payload: &'static str) -> Self {
        Self::new(path, ArtifactCategory::Doc, payload)
    }

    pub fn config(path: &str, payload: &'static str) -> Self {
        Self::new(path, ArtifactCategory::Config, payload)
    }

    pub fn guide(path: &str, payload: &'static str) -> Self {
        Self::new(path, ArtifactCategory::Guide, payload)
    }

    pub fn env(path: &str, payload: &'static str) -> Self {
        Self::new(path, ArtifactCategory::Env, payload)
    }
}

/// What happened to a path.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum WriteAction {
    Written,
    Skipped,
}

/// Outcome of one create/skip/overwrite decision.
///
/// Purely informational: drives status output, never branching.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct WriteDecision {
    pub path: PathBuf,
    pub existed_before: bool,
    pub forced: bool,
    pub action: WriteAction,
}

impl WriteDecision {
    /// The two-input idempotency rule: write when absent or forced.
    pub fn decide(path: impl Into<PathBuf>, existed_before: bool, forced: bool) -> Self {
        let action = if !existed_before || forced {
            WriteAction::Written
        } else {
            WriteAction::Skipped
        };
        Self {
            path: path.into(),
            existed_before,
            forced,
            action,
        }
    }

    pub fn written(&self) -> bool {
        self.action == WriteAction::Written
    }
}

impl fmt::Display for WriteDecision {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.action {
            WriteAction::Written if self.existed_before => {
                write!(f, "overwrote {} (forced)", self.path.display())
            }
            WriteAction::Written => write!(f, "created {}", self.path.display()),
            WriteAction::Skipped => write!(
                f,
                "kept {} (exists; use --force to overwrite)",
                self.path.display()
            ),
        }
    }
}

/// Fixed relative locations of everything the scaffold produces.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Layout {
    /// Where the documentation artifacts live; mirror sources resolve here.
    pub docs_dir: RelativePath,
    /// Where mirrored, renamed copies land.
    pub rules_dir: RelativePath,
    /// The combined rules document.
    pub aggregate_path: RelativePath,
    /// Default location of the workshop YAML (also the template artifact).
    pub config_path: RelativePath,
    /// Derived report of the resolved defaults, refreshed every run.
    pub resolved_env_path: RelativePath,
}

/// The hardcoded artifact set plus mirror pairs, read-only for a run.
#[derive(Debug, Clone)]
pub struct Catalog {
    pub artifacts: Vec<ArtifactSpec>,
    pub mirror_pairs: Vec<MirrorPair>,
    pub layout: Layout,
}

impl Catalog {
    pub fn new(
        artifacts: Vec<ArtifactSpec>,
        mirror_pairs: Vec<MirrorPair>,
        layout: Layout,
    ) -> Self {
        Self {
            artifacts,
            mirror_pairs,
            layout,
        }
    }

    /// Check that paths and destinations are unique.
    ///
    /// Mirror sources are deliberately *not* cross-checked against the
    /// artifacts: a pair whose source is missing is skipped at runtime.
    pub fn validate(&self) -> Result<(), DomainError> {
        let mut seen = HashSet::new();
        for artifact in &self.artifacts {
            if !seen.insert(artifact.relative_path.as_path()) {
                return Err(DomainError::DuplicateArtifact {
                    path: artifact.relative_path.to_string(),
                });
            }
        }

        let mut dests = HashSet::new();
        for pair in &self.mirror_pairs {
            pair.validate()?;
            if !dests.insert(pair.dest_name.as_str()) {
                return Err(DomainError::DuplicateMirrorDestination {
                    dest: pair.dest_name.clone(),
                });
            }
        }
        Ok(())
    }

    pub fn artifacts_by(&self, category: ArtifactCategory) -> impl Iterator<Item = &ArtifactSpec> {
        self.artifacts.iter().filter(move |a| a.category == category)
    }

    /// Destination names in declared pair order (the aggregation order).
    pub fn mirror_destinations(&self) -> Vec<&str> {
        self.mirror_pairs.iter().map(|p| p.dest_name.as_str()).collect()
    }
}
