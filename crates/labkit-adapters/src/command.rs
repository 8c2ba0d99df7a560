//! Host command runner using `std::process`.
//!
//! Each program runs under a deadline: the child is polled with
//! `try_wait` and killed once the deadline passes. Output pipes are drained
//! on helper threads so a chatty child cannot block on a full pipe.

use std::io::{self, Read};
use std::process::{Child, Command, ExitStatus, Stdio};
use std::sync::mpsc::{self, Receiver};
use std::thread;
use std::time::{Duration, Instant};

use labkit_core::application::ports::{CommandOutcome, CommandRunner};
use tracing::{debug, trace, warn};

const POLL_INTERVAL: Duration = Duration::from_millis(20);

/// Runs programs from `PATH`, capturing their output.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemCommandRunner;

impl SystemCommandRunner {
    pub fn new() -> Self {
        Self
    }
}

impl CommandRunner for SystemCommandRunner {
    fn run(&self, program: &str, args: &[&str], timeout: Duration) -> CommandOutcome {
        trace!(program, ?args, ?timeout, "Spawning");
        let spawned = Command::new(program)
            .args(args)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .spawn();

        let mut child = match spawned {
            Ok(child) => child,
            Err(e) if e.kind() == io::ErrorKind::NotFound => {
                debug!(program, "Not installed");
                return CommandOutcome::NotFound;
            }
            Err(e) => {
                return CommandOutcome::Failed {
                    code: None,
                    stderr: e.to_string(),
                };
            }
        };

        let deadline = Instant::now() + timeout;
        let stdout = drain(child.stdout.take());
        let stderr = drain(child.stderr.take());

        let outcome = match wait_until(&mut child, deadline) {
            Ok(Some(status)) => {
                let stdout = collect(&stdout, deadline);
                let stderr = collect(&stderr, deadline);
                if status.success() {
                    CommandOutcome::Success { stdout }
                } else {
                    CommandOutcome::Failed {
                        code: status.code(),
                        stderr,
                    }
                }
            }
            Ok(None) => {
                warn!(program, ?timeout, "Command timed out; killed");
                CommandOutcome::Failed {
                    code: None,
                    stderr: format!("timed out after {}s", timeout.as_secs_f64()),
                }
            }
            Err(e) => CommandOutcome::Failed {
                code: None,
                stderr: e.to_string(),
            },
        };
        debug!(program, result = %outcome.summary(), "Command finished");
        outcome
    }
}

/// Exit status, or `None` after killing a child that outlived `deadline`.
fn wait_until(child: &mut Child, deadline: Instant) -> io::Result<Option<ExitStatus>> {
    loop {
        if let Some(status) = child.try_wait()? {
            return Ok(Some(status));
        }
        if Instant::now() >= deadline {
            let _ = child.kill();
            let _ = child.wait();
            return Ok(None);
        }
        thread::sleep(POLL_INTERVAL);
    }
}

fn drain<R: Read + Send + 'static>(pipe: Option<R>) -> Receiver<Vec<u8>> {
    let (tx, rx) = mpsc::channel();
    if let Some(mut pipe) = pipe {
        thread::spawn(move || {
            let mut buf = Vec::new();
            let _ = pipe.read_to_end(&mut buf);
            let _ = tx.send(buf);
        });
    }
    rx
}

/// Drained output, or empty if a grandchild still holds the pipe open at
/// `deadline`.
fn collect(rx: &Receiver<Vec<u8>>, deadline: Instant) -> String {
    let wait = deadline.saturating_duration_since(Instant::now());
    let bytes = rx.recv_timeout(wait).unwrap_or_default();
    String::from_utf8_lossy(&bytes).into_owned()
}
