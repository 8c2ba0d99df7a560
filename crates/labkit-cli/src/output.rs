//! Output management and formatting.
//!
//! Human lines go to stdout through [`console::Term`]; logs stay on stderr.
//! In JSON mode the only stdout write is the run summary.

use std::io::{self, IsTerminal};
use std::time::Duration;

use console::Term;
use indicatif::{ProgressBar, ProgressStyle};
use owo_colors::OwoColorize;
use serde::Serialize;

use labkit_core::domain::{PortOutcome, PortReport, PortRule, Probe, ProbeResult, WriteDecision};

use crate::cli::global::{GlobalArgs, OutputFormat};
use crate::config::AppConfig;

/// Manages CLI output based on configuration.
pub struct OutputManager {
    resolved_format: OutputFormat,
    quiet: bool,
    verbose: bool,
    no_color: bool,
    term: Term,
}

impl OutputManager {
    /// Build an `OutputManager` from parsed CLI flags and loaded config.
    pub fn new(args: &GlobalArgs, config: &AppConfig, verbose: bool) -> Self {
        // Resolve Auto → Human (TTY) or Plain (piped/redirected).
        let resolved_format = if args.output_format == OutputFormat::Auto {
            if io::stdout().is_terminal() {
                OutputFormat::Human
            } else {
                OutputFormat::Plain
            }
        } else {
            args.output_format
        };

        Self {
            resolved_format,
            quiet: args.quiet,
            verbose,
            no_color: args.no_color
                || config.output.no_color
                || resolved_format == OutputFormat::Plain,
            term: Term::stdout(),
        }
    }

    fn silent(&self) -> bool {
        self.quiet || self.resolved_format == OutputFormat::Json
    }

    // ── Public write methods ───────────────────────────────────────────────

    /// Generic message; suppressed in quiet mode.
    pub fn print(&self, msg: &str) -> io::Result<()> {
        if self.silent() {
            return Ok(());
        }
        self.term.write_line(msg)
    }

    /// Success indicator: `✓ <msg>`.
    pub fn success(&self, msg: &str) -> io::Result<()> {
        if self.silent() {
            return Ok(());
        }
        let line = if self.no_color {
            format!("\u{2713} {msg}") // ✓
        } else {
            format!("{} {}", "\u{2713}".green().bold(), msg.green())
        };
        self.term.write_line(&line)
    }

    /// Neutral indicator: `• <msg>`.
    pub fn kept(&self, msg: &str) -> io::Result<()> {
        if self.silent() {
            return Ok(());
        }
        let line = if self.no_color {
            format!("\u{2022} {msg}") // •
        } else {
            format!("{} {}", "\u{2022}".dimmed(), msg)
        };
        self.term.write_line(&line)
    }

    /// Warning indicator: `⚠ <msg>`.
    pub fn warning(&self, msg: &str) -> io::Result<()> {
        if self.silent() {
            return Ok(());
        }
        let line = if self.no_color {
            format!("\u{26a0} {msg}") // ⚠
        } else {
            format!("{} {}", "\u{26a0}".yellow().bold(), msg.yellow())
        };
        self.term.write_line(&line)
    }

    /// Informational indicator: `ℹ <msg>`.
    pub fn info(&self, msg: &str) -> io::Result<()> {
        if self.silent() {
            return Ok(());
        }
        let line = if self.no_color {
            format!("\u{2139} {msg}") // ℹ
        } else {
            format!("{} {}", "\u{2139}".blue().bold(), msg.blue())
        };
        self.term.write_line(&line)
    }

    /// Diagnostic line, shown only when verbose.
    pub fn detail(&self, msg: &str) -> io::Result<()> {
        if self.silent() || !self.verbose {
            return Ok(());
        }
        let line = if self.no_color {
            format!("  {msg}")
        } else {
            format!("  {}", msg.dimmed())
        };
        self.term.write_line(&line)
    }

    /// Bold cyan header line.
    pub fn header(&self, text: &str) -> io::Result<()> {
        if self.silent() {
            return Ok(());
        }
        let line = if self.no_color {
            text.to_owned()
        } else {
            text.cyan().bold().to_string()
        };
        self.term.write_line(&line)
    }

    // ── Domain lines ──────────────────────────────────────────────────────

    /// One line per write decision.
    pub fn decision(&self, decision: &WriteDecision) -> io::Result<()> {
        if decision.written() {
            self.success(&decision.to_string())
        } else {
            self.kept(&decision.to_string())
        }
    }

    fn port_rule(&self, rule: &PortRule) -> io::Result<()> {
        let line = rule.to_string();
        match rule.outcome {
            PortOutcome::Applied => self.success(&line),
            PortOutcome::AlreadyPresent => self.kept(&line),
            PortOutcome::Unavailable => self.detail(&line),
            PortOutcome::Failed => self.warning(&line),
        }
    }

    /// Every rule, then one line per mechanism that could not be used.
    ///
    /// Per-port "unavailable" lines are verbose-only; the per-mechanism
    /// summary is always shown.
    pub fn port_report(&self, report: &PortReport) -> io::Result<()> {
        for rule in &report.rules {
            self.port_rule(rule)?;
        }
        for (mechanism, reason) in report.unavailable_mechanisms() {
            self.warning(&format!("{mechanism} unavailable ({reason})"))?;
        }
        Ok(())
    }

    pub fn probe(&self, probe: &Probe) -> io::Result<()> {
        let line = format!("{} ({} ms)", probe, probe.elapsed_ms);
        match probe.result {
            ProbeResult::Pass => self.success(&line),
            ProbeResult::Fail => self.warning(&line),
            ProbeResult::Skipped => self.kept(&line),
        }
    }

    /// Pretty JSON on stdout. Written in every format, even when quiet.
    pub fn json<T: Serialize>(&self, value: &T) -> io::Result<()> {
        let text = serde_json::to_string_pretty(value).map_err(io::Error::other)?;
        self.term.write_line(&text)
    }

    /// Spinner for long-running steps; `None` unless rendering for a human.
    pub fn spinner(&self, msg: &str) -> Option<ProgressBar> {
        if self.silent() || self.resolved_format != OutputFormat::Human {
            return None;
        }
        let pb = ProgressBar::new_spinner();
        if let Ok(style) = ProgressStyle::with_template("{spinner:.cyan} {msg} {elapsed}") {
            pb.set_style(style);
        }
        pb.set_message(msg.to_owned());
        pb.enable_steady_tick(Duration::from_millis(100));
        Some(pb)
    }

    // ── Accessors ─────────────────────────────────────────────────────────

    /// `true` if quiet mode suppresses most output.
    pub fn is_quiet(&self) -> bool {
        self.quiet
    }

    /// The resolved (non-Auto) output format.
    pub fn format(&self) -> OutputFormat {
        self.resolved_format
    }
}

// ── tests ─────────────────────────────────────────────────────────────────────
