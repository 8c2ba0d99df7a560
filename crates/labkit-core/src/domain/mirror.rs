use serde::Serialize;
use std::path::Path;

use super::{DomainError, WriteDecision};

/// Copy `source_name` (inside the docs directory) to `dest_name` (inside the
/// rules directory). Both are bare file names.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct MirrorPair {
    pub source_name: String,
    pub dest_name: String,
}

impl MirrorPair {
    pub fn new(source_name: impl Into<String>, dest_name: impl Into<String>) -> Self {
        Self {
            source_name: source_name.into(),
            dest_name: dest_name.into(),
        }
    }

    pub fn validate(&self) -> Result<(), DomainError> {
        for name in [&self.source_name, &self.dest_name] {
            if name.is_empty() {
                return Err(self.invalid("empty file name"));
            }
            let path = Path::new(name);
            if path.components().count() != 1 || path.file_name().is_none() {
                return Err(self.invalid("names must be bare file names"));
            }
        }
        Ok(())
    }

    fn invalid(&self, reason: &str) -> DomainError {
        DomainError::InvalidMirrorPair {
            source_name: self.source_name.clone(),
            dest_name: self.dest_name.clone(),
            reason: reason.into(),
        }
    }
}

/// What happened to one pair.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum MirrorOutcome {
    Copied(WriteDecision),
    SourceMissing,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct MirrorRecord {
    pub pair: MirrorPair,
    pub outcome: MirrorOutcome,
}

impl MirrorRecord {
    pub fn decision(&self) -> Option<&WriteDecision> {
        match &self.outcome {
            MirrorOutcome::Copied(d) => Some(d),
            MirrorOutcome::SourceMissing => None,
        }
    }
}
