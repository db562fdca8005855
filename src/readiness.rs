//! Bounded-retry readiness polling for dependent services
//!
//! Fixed-interval probing with a hard attempt ceiling. Exhaustion is a
//! `ReadinessTimeout`, which callers treat as a warning rather than a
//! failure: the dependent service may still come up on its own later.

use std::net::{TcpStream, ToSocketAddrs};
use std::time::Duration;

use crate::error::{ConvergeError, Result};
use crate::exec;

/// What to probe for readiness
#[derive(Debug, Clone)]
pub enum ProbeTarget {
    /// A TCP endpoint such as `127.0.0.1:10200`
    Tcp { addr: String },
    /// An argv that exits zero once the dependency is ready
    Command { argv: Vec<String> },
}

impl ProbeTarget {
    pub fn describe(&self) -> String {
        match self {
            ProbeTarget::Tcp { addr } => addr.clone(),
            ProbeTarget::Command { argv } => argv.join(" "),
        }
    }

    fn probe(&self, timeout: Duration) -> bool {
        match self {
            ProbeTarget::Tcp { addr } => probe_tcp(addr, timeout),
            ProbeTarget::Command { argv } => exec::succeeds(argv).unwrap_or(false),
        }
    }
}

fn probe_tcp(addr: &str, timeout: Duration) -> bool {
    let Ok(addrs) = addr.to_socket_addrs() else {
        return false;
    };
    for sock_addr in addrs {
        if TcpStream::connect_timeout(&sock_addr, timeout).is_ok() {
            return true;
        }
    }
    false
}

/// One readiness wait: target, fixed poll interval, attempt ceiling
#[derive(Debug, Clone)]
pub struct ReadinessCheck {
    pub target: ProbeTarget,
    pub interval: Duration,
    pub max_attempts: u32,
}

/// Poll until the target is ready or attempts are exhausted.
///
/// Succeeds on the first positive probe. No backoff: the interval is fixed,
/// so the caller never waits longer than `max_attempts * interval` plus the
/// probes themselves.
pub fn await_ready(check: &ReadinessCheck) -> Result<()> {
    let connect_timeout = check.interval.max(Duration::from_millis(100));

    for attempt in 1..=check.max_attempts {
        if check.target.probe(connect_timeout) {
            return Ok(());
        }
        if attempt < check.max_attempts {
            std::thread::sleep(check.interval);
        }
    }

    Err(ConvergeError::ReadinessTimeout {
        target: check.target.describe(),
        attempts: check.max_attempts,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::net::TcpListener;
    use std::time::Instant;
    use tempfile::TempDir;

    fn command_check(argv: &[&str], interval_ms: u64, max_attempts: u32) -> ReadinessCheck {
        ReadinessCheck {
            target: ProbeTarget::Command {
                argv: argv.iter().map(|s| s.to_string()).collect(),
            },
            interval: Duration::from_millis(interval_ms),
            max_attempts,
        }
    }

    #[test]
    fn test_ready_on_first_probe() {
        let check = command_check(&["true"], 10, 3);
        assert!(await_ready(&check).is_ok());
    }

    #[test]
    fn test_timeout_after_exact_attempt_count() {
        let temp = TempDir::new().unwrap();
        let marker = temp.path().join("probes");
        let script = format!("echo x >> {}; exit 1", marker.display());
        let check = command_check(&["sh", "-c", &script], 10, 5);

        let start = Instant::now();
        let result = await_ready(&check);
        let elapsed = start.elapsed();

        match result {
            Err(ConvergeError::ReadinessTimeout { attempts, .. }) => assert_eq!(attempts, 5),
            other => panic!("expected timeout, got {other:?}"),
        }
        let probes = std::fs::read_to_string(&marker).unwrap();
        assert_eq!(probes.lines().count(), 5);
        // 5 probes with 4 sleeps of 10ms between them
        assert!(elapsed < Duration::from_secs(2));
    }

    #[test]
    fn test_tcp_probe_against_listener() {
        let listener = TcpListener::bind("127.0.0.1:0").unwrap();
        let addr = listener.local_addr().unwrap().to_string();
        let check = ReadinessCheck {
            target: ProbeTarget::Tcp { addr },
            interval: Duration::from_millis(10),
            max_attempts: 3,
        };
        assert!(await_ready(&check).is_ok());
    }

    #[test]
    fn test_tcp_probe_unresolvable_host_times_out() {
        let check = ReadinessCheck {
            target: ProbeTarget::Tcp {
                addr: "host.invalid:1".to_string(),
            },
            interval: Duration::from_millis(1),
            max_attempts: 2,
        };
        assert!(matches!(
            await_ready(&check),
            Err(ConvergeError::ReadinessTimeout { attempts: 2, .. })
        ));
    }
}
