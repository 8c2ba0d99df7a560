//! CLI argument definitions using the clap derive API.
//!
//! This module is the *only* place that knows about argument names, aliases,
//! help text, and value enums.  No business logic lives here.

use std::path::PathBuf;

use clap::{Args, Parser, ValueEnum};
use labkit_core::domain::RenderMode;

pub mod global;
pub use global::{GlobalArgs, OutputFormat};

// ── Top-level CLI ─────────────────────────────────────────────────────────────

/// Main CLI entry-point.
#[derive(Debug, Parser)]
#[command(
    name     = "labkit",
    bin_name = "labkit",
    version  = env!("CARGO_PKG_VERSION"),
    author   = env!("CARGO_PKG_AUTHORS"),
    about    = "Scaffold a GenAI workshop and verify the running demo",
    long_about = "Labkit writes the workshop documentation, configuration template and \
                  agent rules into a target directory, never overwriting existing files \
                  unless --force is given. It can also open the workshop ports in the \
                  host firewall and run a smoke test against the deployed services.",
    after_help = "EXAMPLES:\n\
        \x20 labkit ./workshop\n\
        \x20 labkit ./workshop --force --yes --render substitute\n\
        \x20 labkit ./workshop --dry-run --output-format json\n\
        \x20 labkit . --open-ports --smoke-test --port 8010 --port 8501",
)]
pub struct Cli {
    /// Reporting flags.
    #[command(flatten)]
    pub global: GlobalArgs,

    /// What to scaffold and verify.
    #[command(flatten)]
    pub run: RunArgs,
}

// ── Run arguments ─────────────────────────────────────────────────────────────

#[derive(Debug, Args)]
pub struct RunArgs {
    /// Directory to scaffold into (created if missing).
    #[arg(value_name = "TARGET", default_value = ".")]
    pub target: PathBuf,

    /// Overwrite files that already exist.
    #[arg(short = 'f', long)]
    pub force: bool,

    /// Skip the confirmation prompt for --force.
    #[arg(short = 'y', long)]
    pub yes: bool,

    /// Add allow rules for the workshop ports to the host firewall.
    #[arg(long)]
    pub open_ports: bool,

    /// Probe the running services after scaffolding.
    #[arg(long)]
    pub smoke_test: bool,

    /// Port to open and expect listening (repeatable).
    ///
    /// Defaults to the configured API and Streamlit ports plus 8502.
    #[arg(
        short = 'p',
        long = "port",
        value_name = "PORT",
        value_parser = clap::value_parser!(u16).range(1..)
    )]
    pub ports: Vec<u16>,

    /// Workshop YAML to read defaults from.
    ///
    /// Defaults to TARGET/config/app_config.yaml.
    #[arg(long, value_name = "FILE")]
    pub config_file: Option<PathBuf>,

    /// How payload placeholders are treated when writing.
    #[arg(long, value_enum, default_value = "literal")]
    pub render: RenderArg,

    /// Show what would be written without touching the filesystem.
    #[arg(long, conflicts_with_all = ["open_ports", "smoke_test"])]
    pub dry_run: bool,

    /// API port the smoke test targets.
    ///
    /// Overrides `API_PORT` and the workshop config.
    #[arg(
        long,
        value_name = "PORT",
        value_parser = clap::value_parser!(u16).range(1..)
    )]
    pub api_port: Option<u16>,

    /// API base path the smoke test targets.
    ///
    /// Overrides `API_BASE_PATH` and the workshop config.
    #[arg(long, value_name = "PATH")]
    pub api_base_path: Option<String>,
}

/// CLI mirror of [`RenderMode`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum RenderArg {
    /// Write payloads byte-for-byte.
    Literal,
    /// Fill `$NAME` / `${NAME}` placeholders from the resolved config.
    Substitute,
}

impl From<RenderArg> for RenderMode {
    fn from(arg: RenderArg) -> Self {
        match arg {
            RenderArg::Literal => RenderMode::Literal,
            RenderArg::Substitute => RenderMode::Substitute,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(args: &[&str]) -> Cli {
        let mut argv = vec!["labkit"];
        argv.extend_from_slice(args);
        Cli::try_parse_from(argv).unwrap()
    }

    #[test]
    fn defaults() {
        let cli = parse(&[]);
        assert_eq!(cli.run.target, PathBuf::from("."));
        assert!(!cli.run.force);
        assert!(cli.run.ports.is_empty());
        assert_eq!(cli.run.render, RenderArg::Literal);
        assert_eq!(cli.global.output_format, OutputFormat::Auto);
    }

    #[test]
    fn repeated_ports() {
        let cli = parse(&["ws", "--port", "8010", "-p", "8501"]);
        assert_eq!(cli.run.target, PathBuf::from("ws"));
        assert_eq!(cli.run.ports, vec![8010, 8501]);
    }

    #[test]
    fn port_zero_rejected() {
        assert!(Cli::try_parse_from(["labkit", "--port", "0"]).is_err());
    }

    #[test]
    fn dry_run_conflicts_with_host_changes() {
        for host_step in ["--open-ports", "--smoke-test"] {
            let parsed = Cli::try_parse_from(["labkit", "--dry-run", host_step]);
            assert!(parsed.is_err());
        }
    }

    #[test]
    fn no_color_flag_without_value() {
        assert!(parse(&["--no-color"]).global.no_color);
    }

    #[test]
    fn api_overrides_are_flags_only() {
        let cli = parse(&["--api-port", "9000", "--api-base-path", "/v2"]);
        assert_eq!(cli.run.api_port, Some(9000));
        assert_eq!(cli.run.api_base_path.as_deref(), Some("/v2"));
        assert!(Cli::try_parse_from(["labkit", "--api-port", "0"]).is_err());
    }

    #[test]
    fn render_substitute() {
        let cli = parse(&["--render", "substitute"]);
        assert_eq!(RenderMode::from(cli.run.render), RenderMode::Substitute);
    }
}
