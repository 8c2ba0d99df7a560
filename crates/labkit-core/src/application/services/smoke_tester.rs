//! Smoke Tester - a linear sequence of bounded, diagnostic probes.
//!
//! ```text
//! processes -> listening ports -> ui port -> readiness -> functional -> public ip -> public head
//! ```
//!
//! Each step records a [`Probe`] and may add to [`Discovered`]; later steps
//! read what earlier ones found. No step can stop the sequence, and nothing
//! here returns an error.

use std::collections::BTreeSet;
use std::net::IpAddr;
use std::time::{Duration, Instant};

use serde_json::Value;
use tracing::{debug, info, instrument, warn};

use crate::{
    application::ports::{CommandOutcome, CommandRunner, NetworkProbe},
    domain::{
        Discovered, Probe, ProbeKind, ProbeResult, ProbeTimeouts, ResponseShape, SmokeReport,
    },
};

const LOCALHOST: &str = "127.0.0.1";

/// What to probe and how long each probe may take.
#[derive(Debug, Clone, PartialEq)]
pub struct SmokePlan {
    pub timeouts: ProbeTimeouts,
    /// `pgrep -af` patterns: the API server, then the UI server.
    pub process_patterns: Vec<String>,
    pub ui_port_priority: Vec<u16>,
    pub readiness_path: String,
    /// Appended to the API base path.
    pub functional_path: String,
    pub functional_query: Vec<(String, String)>,
    pub ip_service_url: String,
    /// Per-port budget for the connect fallback when `ss` is unavailable.
    pub port_check_timeout: Duration,
    /// Limit for each `pgrep` / `ss` invocation.
    pub command_timeout: Duration,
}

impl Default for SmokePlan {
    fn default() -> Self {
        Self {
            timeouts: ProbeTimeouts::default(),
            process_patterns: vec!["uvicorn".into(), "streamlit".into()],
            ui_port_priority: vec![8501, 8502, 8080],
            readiness_path: "/health".into(),
            functional_path: "/recipes/sample".into(),
            functional_query: vec![
                ("dish".into(), "pancakes".into()),
                ("servings".into(), "2".into()),
            ],
            ip_service_url: "https://api.ipify.org".into(),
            port_check_timeout: Duration::from_millis(500),
            command_timeout: Duration::from_secs(5),
        }
    }
}

pub struct SmokeTester {
    runner: Box<dyn CommandRunner>,
    network: Box<dyn NetworkProbe>,
    plan: SmokePlan,
}

impl SmokeTester {
    pub fn new(
        runner: Box<dyn CommandRunner>,
        network: Box<dyn NetworkProbe>,
        plan: SmokePlan,
    ) -> Self {
        Self {
            runner,
            network,
            plan,
        }
    }

    pub fn plan(&self) -> &SmokePlan {
        &self.plan
    }

    /// Run every probe once, in order.
    #[instrument(skip(self))]
    pub fn run_smoke_test(
        &self,
        expected_ports: &[u16],
        api_port: u16,
        api_base_path: &str,
    ) -> SmokeReport {
        let started = Instant::now();
        let mut discovered = Discovered::default();
        let mut probes = Vec::new();

        probes.extend(self.probe_processes(&mut discovered));
        probes.push(self.probe_ports(expected_ports, &mut discovered));
        probes.push(self.discover_ui_port(&mut discovered));
        probes.push(self.probe_readiness(api_port));
        probes.push(self.probe_functional(api_port, api_base_path));
        probes.push(self.discover_public_ip(&mut discovered));
        probes.push(self.probe_public_head(&discovered));

        for probe in &probes {
            match probe.result {
                ProbeResult::Fail => warn!("{probe}"),
                _ => info!("{probe}"),
            }
        }

        SmokeReport {
            probes,
            discovered,
            elapsed_ms: millis(started.elapsed()),
        }
    }

    fn probe_processes(&self, discovered: &mut Discovered) -> Vec<Probe> {
        let timeout = self.plan.command_timeout;
        self.plan
            .process_patterns
            .iter()
            .map(|pattern| {
                let started = Instant::now();
                let probe = Probe::new(ProbeKind::Process, "process", pattern.clone());
                let probe = match self.runner.run("pgrep", &["-af", pattern.as_str()], timeout) {
                    CommandOutcome::Success { stdout } => {
                        let found: Vec<String> = stdout
                            .lines()
                            .map(str::trim)
                            .filter(|l| !l.is_empty())
                            .map(str::to_string)
                            .collect();
                        let detail = format!("{} running", found.len());
                        discovered.processes.extend(found);
                        probe.pass(detail)
                    }
                    CommandOutcome::NotFound => probe.skip("pgrep not installed"),
                    CommandOutcome::Failed { code: None, stderr } => probe.fail(stderr),
                    CommandOutcome::Failed { .. } => probe.fail("no matching process"),
                };
                probe.timed(started.elapsed())
            })
            .collect()
    }

    fn probe_ports(&self, expected: &[u16], discovered: &mut Discovered) -> Probe {
        let started = Instant::now();
        let target = expected
            .iter()
            .map(u16::to_string)
            .collect::<Vec<_>>()
            .join(",");
        let probe = Probe::new(ProbeKind::Port, "ports", format!("tcp/{target}"));
        if expected.is_empty() {
            return probe.skip("no expected ports");
        }

        let (bound, via) = match self.runner.run("ss", &["-ltnH"], self.plan.command_timeout) {
            CommandOutcome::Success { stdout } => {
                let listening = parse_listening_ports(&stdout);
                let bound: Vec<u16> = expected
                    .iter()
                    .copied()
                    .filter(|p| listening.contains(p))
                    .collect();
                (bound, "ss")
            }
            other => {
                debug!(ss = %other.summary(), "Falling back to connect checks");
                let budget = self.plan.port_check_timeout;
                let bound: Vec<u16> = expected
                    .iter()
                    .copied()
                    .filter(|&p| self.network.tcp_listening(p, budget))
                    .collect();
                (bound, "connect")
            }
        };
        discovered.listening = bound.clone();

        let missing: Vec<String> = expected
            .iter()
            .filter(|p| !bound.contains(*p))
            .map(u16::to_string)
            .collect();
        let probe = if missing.is_empty() {
            probe.pass(format!("all listening (via {via})"))
        } else {
            probe.fail(format!("not listening: {} (via {via})", missing.join(",")))
        };
        probe.timed(started.elapsed())
    }

    fn discover_ui_port(&self, discovered: &mut Discovered) -> Probe {
        let label = priority_label(&self.plan.ui_port_priority);
        let probe = Probe::new(ProbeKind::Port, "ui-port", label);
        discovered.ui_port = discovered.pick_ui_port(&self.plan.ui_port_priority);
        match discovered.ui_port {
            Some(port) => probe.pass(port.to_string()),
            None => probe.skip("none"),
        }
    }

    fn probe_readiness(&self, api_port: u16) -> Probe {
        let url = format!("http://{LOCALHOST}:{api_port}{}", self.plan.readiness_path);
        let timeout = self.plan.timeouts.readiness;
        let probe = Probe::new(ProbeKind::Http, "readiness", url.clone()).with_timeout(timeout);
        let started = Instant::now();

        let probe = match self.network.http_get(&url, &[], timeout) {
            Ok(reply) if reply.is_success() => probe.pass(reply.status_line),
            Ok(reply) => probe.fail(reply.status_line),
            Err(e) => probe.fail(e.to_string()),
        };
        probe.timed(started.elapsed())
    }

    fn probe_functional(&self, api_port: u16, api_base_path: &str) -> Probe {
        let url = format!(
            "http://{LOCALHOST}:{api_port}{}{}",
            normalize_base_path(api_base_path),
            self.plan.functional_path,
        );
        let query = &self.plan.functional_query;
        let timeout = self.plan.timeouts.functional;
        let probe = Probe::new(ProbeKind::Http, "functional", with_query_label(&url, query))
            .with_timeout(timeout);
        let started = Instant::now();

        let probe = match self.network.http_get(&url, query, timeout) {
            Ok(reply) if reply.is_success() => match serde_json::from_str::<Value>(&reply.body) {
                Ok(body) => probe.pass(ResponseShape::extract(&body).to_string()),
                Err(e) => probe.fail(format!("{}, body is not JSON: {e}", reply.status_line)),
            },
            Ok(reply) => probe.fail(reply.status_line),
            Err(e) => probe.fail(e.to_string()),
        };
        probe.timed(started.elapsed())
    }

    fn discover_public_ip(&self, discovered: &mut Discovered) -> Probe {
        let url = &self.plan.ip_service_url;
        let timeout = self.plan.timeouts.ip_discovery;
        let probe = Probe::new(ProbeKind::Http, "public-ip", url.clone()).with_timeout(timeout);
        let started = Instant::now();

        let probe = match self.network.http_get(url, &[], timeout) {
            Ok(reply) if reply.is_success() => match reply.body.trim().parse::<IpAddr>() {
                Ok(ip) => {
                    discovered.public_ip = Some(ip.to_string());
                    probe.pass(ip.to_string())
                }
                Err(_) => probe.fail("response is not an IP address"),
            },
            Ok(reply) => probe.fail(reply.status_line),
            Err(e) => probe.fail(e.to_string()),
        };
        probe.timed(started.elapsed())
    }

    fn probe_public_head(&self, discovered: &Discovered) -> Probe {
        let timeout = self.plan.timeouts.public_head;
        let (Some(ip), Some(port)) = (discovered.public_ip.as_deref(), discovered.ui_port) else {
            let reason = if discovered.public_ip.is_none() {
                "no public IP"
            } else {
                "no UI port"
            };
            return Probe::new(ProbeKind::Http, "public-head", "-").skip(reason);
        };

        let url = format!("http://{}:{port}/", host_literal(ip));
        let probe = Probe::new(ProbeKind::Http, "public-head", url.clone()).with_timeout(timeout);
        let started = Instant::now();

        // Any reply proves reachability; only the status line is reported.
        let probe = match self.network.http_head(&url, timeout) {
            Ok(reply) => probe.pass(reply.status_line),
            Err(e) => probe.fail(e.to_string()),
        };
        probe.timed(started.elapsed())
    }
}

/// Local ports from `ss -ltnH` output (fourth column, after the last `:`).
fn parse_listening_ports(output: &str) -> BTreeSet<u16> {
    output
        .lines()
        .filter_map(|line| line.split_whitespace().nth(3))
        .filter_map(|local| local.rsplit_once(':'))
        .filter_map(|(_, port)| port.parse().ok())
        .collect()
}

/// `/api/` and `api` both become `/api`; empty stays empty.
fn normalize_base_path(base: &str) -> String {
    let trimmed = base.trim().trim_matches('/');
    if trimmed.is_empty() {
        String::new()
    } else {
        format!("/{trimmed}")
    }
}

/// Display form of a request target; the network port does the encoding.
fn with_query_label(url: &str, query: &[(String, String)]) -> String {
    if query.is_empty() {
        return url.to_string();
    }
    let pairs: Vec<String> = query.iter().map(|(k, v)| format!("{k}={v}")).collect();
    format!("{url}?{}", pairs.join("&"))
}

/// IPv6 literals need brackets in a URL authority.
fn host_literal(ip: &str) -> String {
    if ip.contains(':') {
        format!("[{ip}]")
    } else {
        ip.to_string()
    }
}

fn priority_label(priority: &[u16]) -> String {
    priority
        .iter()
        .map(u16::to_string)
        .collect::<Vec<_>>()
        .join(">")
}

fn millis(d: Duration) -> u64 {
    u64::try_from(d.as_millis()).unwrap_or(u64::MAX)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::application::ports::{HttpReply, ProbeError};
    use std::collections::HashMap;
    use std::sync::{Arc, Mutex};

    struct FakeRunner(HashMap<String, CommandOutcome>);

    impl FakeRunner {
        fn new(entries: &[(&str, CommandOutcome)]) -> Self {
            Self(
                entries
                    .iter()
                    .map(|(k, v)| ((*k).to_string(), v.clone()))
                    .collect(),
            )
        }
    }

    impl CommandRunner for FakeRunner {
        fn run(&self, program: &str, args: &[&str], _timeout: Duration) -> CommandOutcome {
            let key = format!("{program} {}", args.join(" "));
            self.0.get(&key).cloned().unwrap_or(CommandOutcome::NotFound)
        }
    }

    #[derive(Default)]
    struct FakeNetwork {
        get: HashMap<String, Result<HttpReply, ProbeError>>,
        head: HashMap<String, Result<HttpReply, ProbeError>>,
        open: Vec<u16>,
        requested: Arc<Mutex<Vec<String>>>,
    }

    impl NetworkProbe for FakeNetwork {
        fn http_get(
            &self,
            url: &str,
            query: &[(String, String)],
            _timeout: Duration,
        ) -> Result<HttpReply, ProbeError> {
            let key = with_query_label(url, query);
            self.requested.lock().unwrap().push(format!("GET {key}"));
            self.get
                .get(&key)
                .cloned()
                .unwrap_or_else(|| Err(ProbeError::Unreachable("connection refused".into())))
        }

        fn http_head(&self, url: &str, _timeout: Duration) -> Result<HttpReply, ProbeError> {
            self.requested.lock().unwrap().push(format!("HEAD {url}"));
            self.head.get(url).cloned().unwrap_or_else(|| {
                Err(ProbeError::Timeout {
                    after: Duration::from_secs(6),
                })
            })
        }

        fn tcp_listening(&self, port: u16, _timeout: Duration) -> bool {
            self.open.contains(&port)
        }
    }

    fn ok(body: &str) -> Result<HttpReply, ProbeError> {
        Ok(HttpReply {
            status: 200,
            status_line: "HTTP/1.1 200 OK".into(),
            body: body.into(),
        })
    }

    fn smoke(runner: FakeRunner, network: FakeNetwork) -> SmokeTester {
        SmokeTester::new(Box::new(runner), Box::new(network), SmokePlan::default())
    }

    fn result_of(report: &SmokeReport, name: &str) -> Option<ProbeResult> {
        report.probe(name).map(|p| p.result)
    }

    const SS_OUTPUT: &str = "\
LISTEN 0      2048         0.0.0.0:8010       0.0.0.0:*
LISTEN 0      128          0.0.0.0:22         0.0.0.0:*
LISTEN 0      2048            [::]:8502          [::]:*
";

    #[test]
    fn parses_ss_local_ports() {
        let ports = parse_listening_ports(SS_OUTPUT);
        assert_eq!(ports.into_iter().collect::<Vec<_>>(), vec![22, 8010, 8502]);
    }

    #[test]
    fn url_helpers() {
        assert_eq!(normalize_base_path("/api/"), "/api");
        assert_eq!(normalize_base_path("api"), "/api");
        assert_eq!(normalize_base_path(""), "");
        assert_eq!(
            with_query_label("http://h/x", &[("dish".into(), "pancakes".into())]),
            "http://h/x?dish=pancakes"
        );
        assert_eq!(with_query_label("http://h/x", &[]), "http://h/x");
        assert_eq!(host_literal("2001:db8::1"), "[2001:db8::1]");
        assert_eq!(host_literal("203.0.113.7"), "203.0.113.7");
    }

    #[test]
    fn nothing_running_reports_failures_without_erroring() {
        let tester = smoke(FakeRunner::new(&[]), FakeNetwork::default());
        let report = tester.run_smoke_test(&[8010, 8501, 8502], 8010, "/api");

        assert_eq!(result_of(&report, "ports"), Some(ProbeResult::Fail));
        assert_eq!(result_of(&report, "ui-port"), Some(ProbeResult::Skipped));
        assert_eq!(result_of(&report, "readiness"), Some(ProbeResult::Fail));
        assert_eq!(result_of(&report, "functional"), Some(ProbeResult::Fail));
        assert_eq!(result_of(&report, "public-ip"), Some(ProbeResult::Fail));
        assert_eq!(
            result_of(&report, "public-head"),
            Some(ProbeResult::Skipped)
        );
        assert_eq!(report.discovered.ui_port, None);
    }

    #[test]
    fn healthy_stack_passes_every_probe() {
        let runner = FakeRunner::new(&[
            (
                "pgrep -af uvicorn",
                CommandOutcome::Success {
                    stdout: "101 uvicorn app.main:app --port 8010\n".into(),
                },
            ),
            (
                "pgrep -af streamlit",
                CommandOutcome::Success {
                    stdout: "202 streamlit run ui.py --server.port 8502\n".into(),
                },
            ),
            (
                "ss -ltnH",
                CommandOutcome::Success {
                    stdout: SS_OUTPUT.into(),
                },
            ),
        ]);
        let mut network = FakeNetwork::default();
        let health = "http://127.0.0.1:8010/health";
        network.get.insert(health.into(), ok(r#"{"status":"ok"}"#));
        let recipe = r#"{"recipe":{"ingredients":["flour","milk"]},"products":[{"name":"Flour"}]}"#;
        network.get.insert(
            "http://127.0.0.1:8010/api/recipes/sample?dish=pancakes&servings=2".into(),
            ok(recipe),
        );
        network.get.insert("https://api.ipify.org".into(), ok("203.0.113.7\n"));
        network.head.insert("http://203.0.113.7:8502/".into(), ok(""));

        let tester = smoke(runner, network);
        let report = tester.run_smoke_test(&[8010, 8502], 8010, "/api");

        assert_eq!(report.count(ProbeResult::Fail), 0, "{:#?}", report.probes);
        assert_eq!(report.discovered.ui_port, Some(8502));
        assert_eq!(report.discovered.public_ip.as_deref(), Some("203.0.113.7"));
        assert_eq!(report.discovered.processes.len(), 2);
        let functional = report
            .probe("functional")
            .map(|p| p.detail.clone())
            .unwrap_or_default();
        assert!(functional.contains("ingredients=2"));
        assert!(functional.contains("Flour"));
    }

    #[test]
    fn connect_fallback_when_ss_missing() {
        let network = FakeNetwork {
            open: vec![8501],
            ..Default::default()
        };
        let tester = smoke(FakeRunner::new(&[]), network);
        let report = tester.run_smoke_test(&[8010, 8501], 8010, "/api");

        let ports = report.probe("ports").cloned();
        assert_eq!(ports.as_ref().map(|p| p.result), Some(ProbeResult::Fail));
        let detail = ports.map(|p| p.detail).unwrap_or_default();
        assert!(detail.contains("8010"));
        assert!(detail.contains("via connect"));
        assert_eq!(report.discovered.listening, vec![8501]);
        assert_eq!(report.discovered.ui_port, Some(8501));
    }

    #[test]
    fn ui_port_is_limited_to_expected_ports() {
        let runner = FakeRunner::new(&[(
            "ss -ltnH",
            CommandOutcome::Success {
                stdout: "LISTEN 0 128 0.0.0.0:8080 0.0.0.0:*\n".into(),
            },
        )]);
        let tester = smoke(runner, FakeNetwork::default());
        let report = tester.run_smoke_test(&[8010], 8010, "/api");
        assert_eq!(report.discovered.ui_port, None);
    }

    #[test]
    fn hung_process_check_is_reported_and_the_sequence_continues() {
        let runner = FakeRunner::new(&[(
            "pgrep -af uvicorn",
            CommandOutcome::Failed {
                code: None,
                stderr: "timed out after 5s".into(),
            },
        )]);
        let tester = smoke(runner, FakeNetwork::default());
        let report = tester.run_smoke_test(&[], 8010, "/api");

        let first = report.probes.first().map(|p| (p.result, p.detail.clone()));
        assert_eq!(
            first,
            Some((ProbeResult::Fail, "timed out after 5s".to_string()))
        );
        assert!(report.probe("public-head").is_some());
    }

    #[test]
    fn non_json_functional_body_is_a_failure() {
        let mut network = FakeNetwork::default();
        network.get.insert(
            "http://127.0.0.1:9000/recipes/sample?dish=pancakes&servings=2".into(),
            ok("<html>"),
        );
        let tester = smoke(FakeRunner::new(&[]), network);
        let report = tester.run_smoke_test(&[], 9000, "");
        let functional = report.probe("functional").unwrap();
        assert_eq!(functional.result, ProbeResult::Fail);
        assert!(functional.detail.contains("not JSON"));
        assert_eq!(result_of(&report, "ports"), Some(ProbeResult::Skipped));
    }

    #[test]
    fn public_head_is_skipped_without_ui_port_even_with_ip() {
        let mut network = FakeNetwork::default();
        network.get.insert("https://api.ipify.org".into(), ok("198.51.100.2"));
        let requested = Arc::clone(&network.requested);
        let tester = smoke(FakeRunner::new(&[]), network);
        let report = tester.run_smoke_test(&[8010], 8010, "/api");

        let head = report.probe("public-head").cloned();
        assert_eq!(head.as_ref().map(|p| p.result), Some(ProbeResult::Skipped));
        assert_eq!(head.map(|p| p.detail), Some("no UI port".to_string()));
        let requested = requested.lock().unwrap();
        assert!(!requested.iter().any(|r| r.starts_with("HEAD")));
    }

    #[test]
    fn probes_carry_their_timeouts() {
        let tester = smoke(FakeRunner::new(&[]), FakeNetwork::default());
        let report = tester.run_smoke_test(&[], 8010, "/api");
        let timeout_of = |name| report.probe(name).map(|p| p.timeout_seconds);
        assert_eq!(timeout_of("readiness"), Some(6.0));
        assert_eq!(timeout_of("functional"), Some(12.0));
    }
}
