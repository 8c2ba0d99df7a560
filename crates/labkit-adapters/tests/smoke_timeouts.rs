//! The smoke sequence against real sockets that accept but never answer.

use std::net::TcpListener;
use std::time::{Duration, Instant};

use labkit_adapters::ReqwestProbe;
use labkit_core::application::ports::{CommandOutcome, CommandRunner};
use labkit_core::application::{SmokePlan, SmokeTester};
use labkit_core::domain::{ProbeResult, ProbeTimeouts};

/// No host tools: every check falls back to the network port.
struct NoTools;

impl CommandRunner for NoTools {
    fn run(&self, _program: &str, _args: &[&str], _timeout: Duration) -> CommandOutcome {
        CommandOutcome::NotFound
    }
}

fn silent_listener() -> (TcpListener, u16) {
    let listener = TcpListener::bind("127.0.0.1:0").unwrap();
    let port = listener.local_addr().unwrap().port();
    (listener, port)
}

#[test]
fn silent_services_cost_no_more_than_their_timeouts() {
    let (_api, api_port) = silent_listener();
    let (_ip_service, ip_port) = silent_listener();

    let step = Duration::from_millis(300);
    let plan = SmokePlan {
        timeouts: ProbeTimeouts {
            readiness: step,
            functional: step,
            ip_discovery: step,
            public_head: step,
        },
        ui_port_priority: Vec::new(),
        ip_service_url: format!("http://127.0.0.1:{ip_port}/"),
        port_check_timeout: step,
        ..SmokePlan::default()
    };
    let budget = plan.timeouts.total() + plan.port_check_timeout;
    let network = ReqwestProbe::new().unwrap();
    let tester = SmokeTester::new(Box::new(NoTools), Box::new(network), plan);

    let started = Instant::now();
    let report = tester.run_smoke_test(&[api_port], api_port, "/api");
    let elapsed = started.elapsed();

    assert!(elapsed <= budget + Duration::from_secs(2), "{elapsed:?}");
    for name in ["readiness", "functional", "public-ip"] {
        let probe = report.probe(name).unwrap();
        assert_eq!(probe.result, ProbeResult::Fail, "{name}");
        assert!(
            probe.detail.contains("timed out"),
            "{name}: {}",
            probe.detail
        );
    }
    assert_eq!(report.probe("ports").unwrap().result, ProbeResult::Pass);
    assert_eq!(
        report.probe("public-head").unwrap().result,
        ProbeResult::Skipped
    );
}
