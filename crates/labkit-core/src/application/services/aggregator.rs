//! Aggregator - concatenate mirrored files into one document.
//!
//! Section order is the declared pair order, never directory-listing order.
//! Bodies are copied byte for byte apart from line-ending CRs.

use std::path::Path;

use serde::Serialize;
use tracing::{debug, instrument};

use crate::{
    application::FileMaterializer,
    domain::WriteDecision,
    error::LabkitResult,
};

/// The combined document and which inputs made it in.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AggregateDocument {
    #[serde(skip)]
    pub content: Vec<u8>,
    pub sections: Vec<String>,
    pub omitted: Vec<String>,
}

pub struct Aggregator<'a> {
    materializer: &'a FileMaterializer,
}

impl<'a> Aggregator<'a> {
    pub fn new(materializer: &'a FileMaterializer) -> Self {
        Self { materializer }
    }

    /// Build the document from `names` (in order) found in `dir`.
    pub fn compose(&self, names: &[&str], dir: &Path) -> LabkitResult<AggregateDocument> {
        let fs = self.materializer.filesystem();
        let mut content = Vec::new();
        let mut sections = Vec::new();
        let mut omitted = Vec::new();

        for name in names {
            let path = dir.join(name);
            if !fs.exists(&path) {
                debug!(file = %name, "Not present, omitted from aggregate");
                omitted.push((*name).to_string());
                continue;
            }
            let bytes = fs.read_file(&path)?;
            push_section(&mut content, name, &bytes);
            sections.push((*name).to_string());
        }

        Ok(AggregateDocument {
            content,
            sections,
            omitted,
        })
    }

    /// Compose and write to `output` under the usual create/skip/overwrite rule.
    #[instrument(skip_all, fields(output = %output.display()))]
    pub fn aggregate(
        &self,
        names: &[&str],
        dir: &Path,
        output: &Path,
        force: bool,
    ) -> LabkitResult<(AggregateDocument, WriteDecision)> {
        let document = self.compose(names, dir)?;
        let decision = self.materializer.materialize(output, &document.content, force)?;
        Ok((document, decision))
    }
}

/// `## name`, the body with line-ending CRs removed, then a blank line.
fn push_section(out: &mut Vec<u8>, name: &str, body: &[u8]) {
    out.extend_from_slice(b"## ");
    out.extend_from_slice(name.as_bytes());
    out.push(b'\n');
    if !body.is_empty() {
        let body = body.strip_suffix(b"\n").unwrap_or(body);
        for line in body.split(|&b| b == b'\n') {
            let end = line.iter().rposition(|&b| b != b'\r').map_or(0, |i| i + 1);
            out.extend_from_slice(&line[..end]);
            out.push(b'\n');
        }
    }
    out.push(b'\n');
}

#[cfg(test)]
mod tests {
    use super::*;

    fn section(name: &str, body: &[u8]) -> Vec<u8> {
        let mut out = Vec::new();
        push_section(&mut out, name, body);
        out
    }

    #[test]
    fn section_strips_carriage_returns() {
        let out = section("00-a.md", b"line one\r\nline two\r\n");
        assert_eq!(out, b"## 00-a.md\nline one\nline two\n\n");
    }

    #[test]
    fn section_keeps_inner_blank_lines() {
        assert_eq!(section("x.md", b"a\n\nb"), b"## x.md\na\n\nb\n\n");
        assert_eq!(section("n.md", b"\n"), b"## n.md\n\n\n");
    }

    #[test]
    fn empty_body_still_gets_header() {
        assert_eq!(section("e.md", b""), b"## e.md\n\n");
    }

    #[test]
    fn non_utf8_bytes_pass_through_unchanged() {
        let out = section("latin1.md", b"caf\xe9\r\n\xff\xfe\n");
        assert_eq!(out, b"## latin1.md\ncaf\xe9\n\xff\xfe\n\n");
    }
}
