//! Implementation of the `labkit` command.
//!
//! Responsibility: wire adapters into the core services, sequence the
//! optional host steps, and display results. No business logic lives here.

use std::fmt;
use std::io::IsTerminal as _;
use std::num::NonZeroU16;
use std::path::Path;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::Serialize;
use tracing::{debug, info, instrument, warn};
use uuid::Uuid;

use labkit_adapters::{
    LocalFilesystem, ReqwestProbe, SystemCommandRunner, YamlConfigSource, catalog::CONFIG_FILE,
    workshop_catalog,
};
use labkit_core::{
    application::{ConfigResolver, PortOpener, ScaffoldReport, ScaffoldService, SmokeTester},
    domain::{
        ConfigOrigin, PortReport, ProbeResult, RenderMode, Resolution, ResolvedConfig,
        SmokeReport, WriteDecision,
        config::{DEFAULT_API_BASE_PATH, DEFAULT_API_PORT, DEFAULT_STREAMLIT_PORT},
    },
};

use crate::{
    cli::{OutputFormat, RunArgs},
    config::AppConfig,
    error::{CliError, CliResult},
    output::OutputManager,
};

/// Second Streamlit port, always expected alongside the configured ones.
const SECONDARY_UI_PORT: u16 = 8502;

/// Smoke-test overrides read from the environment (or `.env`).
const API_PORT_ENV: &str = "API_PORT";
const API_BASE_PATH_ENV: &str = "API_BASE_PATH";

/// Machine-readable account of one invocation (`--output-format json`).
#[derive(Debug, Serialize)]
struct RunSummary<'a> {
    run_id: Uuid,
    started_at: DateTime<Utc>,
    target: &'a Path,
    render_mode: String,
    dry_run: bool,
    config: &'a Resolution,
    #[serde(skip_serializing_if = "Option::is_none")]
    plan: Option<&'a [WriteDecision]>,
    #[serde(skip_serializing_if = "Option::is_none")]
    scaffold: Option<&'a ScaffoldReport>,
    ports: Vec<u16>,
    #[serde(skip_serializing_if = "Option::is_none")]
    firewall: Option<&'a PortReport>,
    #[serde(skip_serializing_if = "Option::is_none")]
    smoke: Option<&'a SmokeReport>,
}

/// Execute a labkit run.
///
/// Dispatch sequence:
/// 1. Resolve the workshop YAML (missing or broken files are not errors)
/// 2. Early-exit with the write plan if `--dry-run`
/// 3. Confirm `--force` on a terminal unless `--yes`
/// 4. Materialize, mirror and aggregate
/// 5. Optionally open ports, then optionally run the smoke test
#[instrument(skip_all, fields(target = %args.target.display(), run_id = tracing::field::Empty))]
pub fn execute(args: RunArgs, config: AppConfig, output: OutputManager) -> CliResult<()> {
    let run_id = Uuid::new_v4();
    let started_at = Utc::now();
    tracing::Span::current().record("run_id", tracing::field::display(run_id));

    let render_mode = RenderMode::from(args.render);
    info!(mode = %render_mode, force = args.force, "Render mode selected");

    // 1. Workshop config
    let config_path = args
        .config_file
        .clone()
        .unwrap_or_else(|| args.target.join(CONFIG_FILE));
    let resolution = ConfigResolver::new(Box::new(YamlConfigSource::new())).resolve(&config_path);
    report_config(&resolution, &output)?;

    let service = ScaffoldService::new(
        Box::new(LocalFilesystem::new()),
        workshop_catalog(),
        render_mode,
    );

    let mut summary = RunSummary {
        run_id,
        started_at,
        target: &args.target,
        render_mode: render_mode.to_string(),
        dry_run: args.dry_run,
        config: &resolution,
        plan: None,
        scaffold: None,
        ports: Vec::new(),
        firewall: None,
        smoke: None,
    };

    // 2. Dry run: describe but do not write.
    if args.dry_run {
        let plan = service.plan(&args.target, args.force)?;
        output.header(&format!("Dry run: {}", args.target.display()))?;
        for decision in &plan {
            output.decision(decision)?;
        }
        let writes = plan.iter().filter(|d| d.written()).count();
        output.info(&format!(
            "{writes} file(s) would be written, {} kept",
            plan.len() - writes
        ))?;
        summary.plan = Some(&plan);
        return emit_summary(&summary, &output);
    }

    // 3. Confirm destructive overwrite
    confirm_force(&args, &output)?;

    // 4. Scaffold
    output.header(&format!("Scaffolding {}", args.target.display()))?;
    let report = service.run(&args.target, &resolution.config, args.force)?;
    report_scaffold(&report, &output)?;
    summary.scaffold = Some(&report);

    if !args.open_ports && !args.smoke_test {
        output.print("")?;
        output.print("Next steps:")?;
        output.print(&format!("  Review {}", config_path.display()))?;
        output.print("  Point your coding agent at AGENT_RULES.md")?;
    }

    // 5. Host steps
    let ports = if args.open_ports || args.smoke_test {
        expected_ports(&args.ports, &resolution.config)
    } else {
        Vec::new()
    };
    debug!(?ports, "Expected ports");

    let firewall = if args.open_ports {
        output.header("Opening ports")?;
        let opener = PortOpener::new(
            Box::new(SystemCommandRunner::new()),
            config.to_firewall_settings(),
        );
        let report = opener.open_ports(&ports);
        output.port_report(&report)?;
        Some(report)
    } else {
        None
    };

    let smoke = if args.smoke_test {
        output.header("Smoke test")?;
        let report = smoke_test(&args, &config, &resolution.config, &ports, &output)?;
        Some(report)
    } else {
        None
    };

    summary.ports = ports;
    summary.firewall = firewall.as_ref();
    summary.smoke = smoke.as_ref();
    emit_summary(&summary, &output)
}

fn emit_summary(summary: &RunSummary<'_>, output: &OutputManager) -> CliResult<()> {
    if output.format() == OutputFormat::Json {
        output.json(summary)?;
    }
    Ok(())
}

// ── Steps ─────────────────────────────────────────────────────────────────────

fn report_config(resolution: &Resolution, output: &OutputManager) -> CliResult<()> {
    match &resolution.origin {
        ConfigOrigin::File { path } => {
            output.detail(&format!("Workshop config: {}", path.display()))?;
        }
        ConfigOrigin::Missing { path } => {
            output.info(&format!(
                "No workshop config at {}; no values exported, the template goes to {CONFIG_FILE}",
                path.display()
            ))?;
        }
        ConfigOrigin::Unreadable { path, reason } => {
            output.warning(&format!(
                "Ignoring unreadable workshop config {}: {reason}",
                path.display()
            ))?;
        }
    }
    for issue in &resolution.issues {
        output.warning(&issue.to_string())?;
    }
    if !resolution.defaulted.is_empty() {
        let keys: Vec<String> = resolution.defaulted.iter().map(ToString::to_string).collect();
        output.detail(&format!("Built-in defaults used for: {}", keys.join(", ")))?;
    }
    Ok(())
}

fn report_scaffold(report: &ScaffoldReport, output: &OutputManager) -> CliResult<()> {
    for decision in report.decisions() {
        output.decision(decision)?;
    }
    for source in report.missing_sources() {
        output.warning(&format!("Mirror source {source} is missing; skipped"))?;
    }
    if let Some(env) = &report.resolved_env {
        output.detail(&format!("Refreshed {}", env.path.display()))?;
    }
    if !report.aggregate_sections.is_empty() {
        output.detail(&format!(
            "Aggregated {} section(s): {}",
            report.aggregate_sections.len(),
            report.aggregate_sections.join(", ")
        ))?;
    }
    output.success(&format!(
        "{} written, {} kept",
        report.written(),
        report.kept()
    ))?;
    Ok(())
}

fn confirm_force(args: &RunArgs, output: &OutputManager) -> CliResult<()> {
    if !args.force
        || args.yes
        || output.is_quiet()
        || !args.target.exists()
        || !std::io::stdin().is_terminal()
    {
        return Ok(());
    }
    if prompt_overwrite(&args.target)? {
        Ok(())
    } else {
        Err(CliError::Cancelled)
    }
}

#[cfg(feature = "interactive")]
fn prompt_overwrite(target: &Path) -> CliResult<bool> {
    dialoguer::Confirm::new()
        .with_prompt(format!(
            "Overwrite existing workshop files in {}?",
            target.display()
        ))
        .default(false)
        .interact()
        .map_err(|e| CliError::IoError {
            message: "confirmation prompt failed".into(),
            source: std::io::Error::other(e),
        })
}

/// Without a prompt, forcing over an existing target needs `--yes`.
#[cfg(not(feature = "interactive"))]
fn prompt_overwrite(target: &Path) -> CliResult<bool> {
    debug!(target = %target.display(), "No confirmation prompt in this build");
    Ok(false)
}

fn smoke_test(
    args: &RunArgs,
    config: &AppConfig,
    resolved: &ResolvedConfig,
    ports: &[u16],
    output: &OutputManager,
) -> CliResult<SmokeReport> {
    let env_port = env_override::<NonZeroU16>(API_PORT_ENV, output)?.map(NonZeroU16::get);
    let api_port = args
        .api_port
        .or(env_port)
        .or(resolved.api_port())
        .unwrap_or(DEFAULT_API_PORT);
    let api_base_path = match &args.api_base_path {
        Some(path) => path.clone(),
        None => env_override::<String>(API_BASE_PATH_ENV, output)?
            .or_else(|| resolved.api_base_path().map(str::to_owned))
            .unwrap_or_else(|| DEFAULT_API_BASE_PATH.to_owned()),
    };
    debug!(api_port, %api_base_path, "Smoke-test target");

    let tester = SmokeTester::new(
        Box::new(SystemCommandRunner::new()),
        Box::new(ReqwestProbe::new()?),
        config.to_smoke_plan(),
    );

    let spinner = output.spinner("Probing services...");
    let report = tester.run_smoke_test(ports, api_port, &api_base_path);
    if let Some(pb) = spinner {
        pb.finish_and_clear();
    }

    for probe in &report.probes {
        output.probe(probe)?;
    }
    if let Some(port) = report.discovered.ui_port {
        output.detail(&format!("UI port: {port}"))?;
    }
    if let Some(ip) = &report.discovered.public_ip {
        output.detail(&format!("Public IP: {ip}"))?;
    }
    output.info(&format!(
        "{} passed, {} failed, {} skipped in {} ms",
        report.count(ProbeResult::Pass),
        report.count(ProbeResult::Fail),
        report.count(ProbeResult::Skipped),
        report.elapsed_ms
    ))?;
    Ok(report)
}

/// An override from the environment. Unset or blank is `None`; a value
/// that does not parse is reported and ignored.
fn env_override<T>(name: &str, output: &OutputManager) -> CliResult<Option<T>>
where
    T: FromStr,
    T::Err: fmt::Display,
{
    let raw = std::env::var(name).ok();
    match parse_override::<T>(raw.as_deref()) {
        Ok(value) => Ok(value),
        Err(e) => {
            let raw = raw.unwrap_or_default();
            warn!(name, value = %raw, error = %e, "Ignoring environment override");
            output.warning(&format!("Ignoring {name}={raw:?}: {e}"))?;
            Ok(None)
        }
    }
}

fn parse_override<T: FromStr>(raw: Option<&str>) -> Result<Option<T>, T::Err> {
    match raw.map(str::trim) {
        None | Some("") => Ok(None),
        Some(value) => value.parse().map(Some),
    }
}

/// Ports to open and expect listening: explicit `--port` values, or the
/// configured API and Streamlit ports plus the secondary UI port. First
/// occurrence wins.
fn expected_ports(overrides: &[u16], config: &ResolvedConfig) -> Vec<u16> {
    let candidates = if overrides.is_empty() {
        vec![
            config.api_port().unwrap_or(DEFAULT_API_PORT),
            config.streamlit_port().unwrap_or(DEFAULT_STREAMLIT_PORT),
            SECONDARY_UI_PORT,
        ]
    } else {
        overrides.to_vec()
    };

    let mut ports = Vec::with_capacity(candidates.len());
    for port in candidates {
        if !ports.contains(&port) {
            ports.push(port);
        }
    }
    ports
}
