//! Smoke-test vocabulary: probes, their results, and the small state the
//! probe sequence discovers along the way.

use std::fmt;
use std::time::Duration;

use serde::Serialize;
use serde_json::Value;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ProbeKind {
    Process,
    Port,
    Http,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ProbeResult {
    Pass,
    Fail,
    Skipped,
}

impl fmt::Display for ProbeResult {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Pass => write!(f, "PASS"),
            Self::Fail => write!(f, "FAIL"),
            Self::Skipped => write!(f, "SKIP"),
        }
    }
}

/// One bounded check. Transient: lives only inside a [`SmokeReport`].
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Probe {
    pub kind: ProbeKind,
    /// Short stable label, e.g. `readiness`.
    pub name: &'static str,
    pub target: String,
    pub timeout_seconds: f64,
    pub result: ProbeResult,
    pub detail: String,
    pub elapsed_ms: u64,
}

impl Probe {
    pub fn new(kind: ProbeKind, name: &'static str, target: impl Into<String>) -> Self {
        Self {
            kind,
            name,
            target: target.into(),
            timeout_seconds: 0.0,
            result: ProbeResult::Skipped,
            detail: String::new(),
            elapsed_ms: 0,
        }
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout_seconds = timeout.as_secs_f64();
        self
    }

    pub fn pass(self, detail: impl Into<String>) -> Self {
        self.finish(ProbeResult::Pass, detail)
    }

    pub fn fail(self, detail: impl Into<String>) -> Self {
        self.finish(ProbeResult::Fail, detail)
    }

    pub fn skip(self, detail: impl Into<String>) -> Self {
        self.finish(ProbeResult::Skipped, detail)
    }

    pub fn timed(mut self, elapsed: Duration) -> Self {
        self.elapsed_ms = u64::try_from(elapsed.as_millis()).unwrap_or(u64::MAX);
        self
    }

    fn finish(mut self, result: ProbeResult, detail: impl Into<String>) -> Self {
        self.result = result;
        self.detail = detail.into();
        self
    }
}

impl fmt::Display for Probe {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}] {} {}", self.result, self.name, self.target)?;
        if !self.detail.is_empty() {
            write!(f, ": {}", self.detail)?;
        }
        Ok(())
    }
}

/// Explicit per-probe timeouts.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ProbeTimeouts {
    pub readiness: Duration,
    pub functional: Duration,
    pub ip_discovery: Duration,
    pub public_head: Duration,
}

impl ProbeTimeouts {
    /// Upper bound on time spent in network probes.
    pub fn total(&self) -> Duration {
        self.readiness + self.functional + self.ip_discovery + self.public_head
    }
}

impl Default for ProbeTimeouts {
    fn default() -> Self {
        Self {
            readiness: Duration::from_secs(6),
            functional: Duration::from_secs(12),
            ip_discovery: Duration::from_secs(6),
            public_head: Duration::from_secs(6),
        }
    }
}

/// State carried from one probe step to the next.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct Discovered {
    pub processes: Vec<String>,
    pub listening: Vec<u16>,
    pub ui_port: Option<u16>,
    pub public_ip: Option<String>,
}

impl Discovered {
    /// First port in `priority` that is listening.
    pub fn pick_ui_port(&self, priority: &[u16]) -> Option<u16> {
        priority.iter().copied().find(|p| self.listening.contains(p))
    }
}

/// Small shape extracted from the functional endpoint's JSON body.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ResponseShape {
    pub has_recipe: bool,
    pub ingredient_count: Option<usize>,
    pub product_preview: Vec<String>,
}

impl ResponseShape {
    pub const PREVIEW_CAP: usize = 3;

    /// `recipe` presence, `recipe.ingredients` length, first product names.
    pub fn extract(body: &Value) -> Self {
        let recipe = body.get("recipe").filter(|r| !r.is_null());
        let ingredient_count = recipe
            .and_then(|r| r.get("ingredients"))
            .and_then(Value::as_array)
            .map(Vec::len);
        let product_preview = body
            .get("products")
            .and_then(Value::as_array)
            .map(|items| {
                items
                    .iter()
                    .take(Self::PREVIEW_CAP)
                    .map(|p| match p.get("name").and_then(Value::as_str) {
                        Some(name) => name.to_string(),
                        None => p.as_str().map_or_else(|| p.to_string(), str::to_string),
                    })
                    .collect()
            })
            .unwrap_or_default();

        Self {
            has_recipe: recipe.is_some(),
            ingredient_count,
            product_preview,
        }
    }
}

impl fmt::Display for ResponseShape {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "recipe={} ingredients={} products={:?}",
            if self.has_recipe { "yes" } else { "no" },
            self.ingredient_count
                .map_or_else(|| "n/a".to_string(), |n| n.to_string()),
            self.product_preview
        )
    }
}

/// Everything a smoke-test run found out.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct SmokeReport {
    pub probes: Vec<Probe>,
    pub discovered: Discovered,
    pub elapsed_ms: u64,
}

impl SmokeReport {
    pub fn count(&self, result: ProbeResult) -> usize {
        self.probes.iter().filter(|p| p.result == result).count()
    }

    pub fn probe(&self, name: &str) -> Option<&Probe> {
        self.probes.iter().find(|p| p.name == name)
    }
}
