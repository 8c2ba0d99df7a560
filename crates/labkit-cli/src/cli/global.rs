//! Flags that shape how labkit reports, independent of what it does.
//!
//! Flattened into [`super::Cli`] next to the run arguments.

use clap::Args;
use std::path::PathBuf;

/// Environment toggle that forces at least `-v`.
pub const VERBOSE_ENV: &str = "LABKIT_VERBOSE";

/// Global arguments.
#[derive(Debug, Args)]
pub struct GlobalArgs {
    /// Increase logging verbosity.
    ///
    /// Pass once for INFO (`-v`), twice for DEBUG (`-vv`), three times for
    /// TRACE (`-vvv`).  Conflicts with `--quiet`.
    #[arg(
        short = 'v',
        long = "verbose",
        action = clap::ArgAction::Count,
        help = "Increase verbosity (-v, -vv, -vvv)",
        long_help = "Increase logging verbosity:
    (none)  - Warnings only
    -v      - Info level (progress messages)
    -vv     - Debug level (detailed diagnostics)
    -vvv    - Trace level (very verbose)

Setting LABKIT_VERBOSE=1 (or true/yes/on) acts like a single -v."
    )]
    pub verbose: u8,

    /// Suppress all non-error output.
    #[arg(
        short = 'q',
        long = "quiet",
        conflicts_with = "verbose",
        help = "Suppress non-error output"
    )]
    pub quiet: bool,

    /// Disable ANSI colour codes.
    ///
    /// Automatically honoured when `NO_COLOR` is set to a non-empty value
    /// (see <https://no-color.org>); `0`, `false`, `no` and `off` leave
    /// colour on.
    #[arg(
        long = "no-color",
        env = "NO_COLOR",
        value_parser = clap::builder::FalseyValueParser::new(),
        help = "Disable colored output"
    )]
    pub no_color: bool,

    /// Tool settings file (TOML).
    #[arg(
        long = "settings",
        value_name = "FILE",
        help = "Tool settings file (timeouts, firewall zone, probe endpoints)"
    )]
    pub settings: Option<PathBuf>,

    /// Also write logs to this file.
    #[arg(long = "log-file", value_name = "FILE", help = "Append logs to FILE")]
    pub log_file: Option<PathBuf>,

    /// Output format.
    #[arg(
        long = "output-format",
        value_enum,
        default_value = "auto",
        help = "Output format"
    )]
    pub output_format: OutputFormat,
}

impl GlobalArgs {
    /// Verbosity after applying the environment toggle. Quiet always wins.
    pub fn effective_verbosity(&self, env_verbose: bool) -> u8 {
        if self.quiet {
            0
        } else if env_verbose {
            self.verbose.max(1)
        } else {
            self.verbose
        }
    }

    /// The single switch threaded into output: extra diagnostic lines on/off.
    pub fn is_verbose(&self, env_verbose: bool) -> bool {
        self.effective_verbosity(env_verbose) > 0
    }
}

/// Reads [`VERBOSE_ENV`] from the process environment.
pub fn verbose_from_env() -> bool {
    std::env::var(VERBOSE_ENV).is_ok_and(|v| is_truthy(&v))
}

fn is_truthy(value: &str) -> bool {
    matches!(
        value.trim().to_ascii_lowercase().as_str(),
        "1" | "true" | "yes" | "on"
    )
}

/// How the CLI should render its output.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, clap::ValueEnum)]
pub enum OutputFormat {
    /// Auto-detect based on terminal.
    #[default]
    Auto,
    /// Human-readable with colors.
    Human,
    /// Plain text without colors.
    Plain,
    /// JSON run summary on stdout.
    Json,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn args(verbose: u8, quiet: bool) -> GlobalArgs {
        GlobalArgs {
            verbose,
            quiet,
            no_color: true,
            settings: None,
            log_file: None,
            output_format: OutputFormat::Plain,
        }
    }

    #[test]
    fn truthy_values() {
        for v in ["1", "true", "TRUE", "yes", "On", " on "] {
            assert!(is_truthy(v), "{v}");
        }
        for v in ["", "0", "false", "no", "off", "verbose"] {
            assert!(!is_truthy(v), "{v}");
        }
    }

    #[test]
    fn env_toggle_forces_single_v() {
        assert_eq!(args(0, false).effective_verbosity(true), 1);
        assert_eq!(args(2, false).effective_verbosity(true), 2);
        assert_eq!(args(0, false).effective_verbosity(false), 0);
    }

    #[test]
    fn quiet_beats_env_toggle() {
        assert_eq!(args(0, true).effective_verbosity(true), 0);
        assert!(!args(0, true).is_verbose(true));
    }
}
