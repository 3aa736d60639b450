//! The per-host execution engine.

use std::sync::atomic::{AtomicBool, Ordering};

use tracing::{debug, error};

use crate::connector::Connection;
use crate::error::SessionError;
use crate::session::Session;

/// One host's outcome within a batch.
#[derive(Debug)]
pub struct HostResult<T> {
    pub host: String,
    pub outcome: anyhow::Result<T>,
}

impl<T> HostResult<T> {
    pub fn is_success(&self) -> bool {
        self.outcome.is_ok()
    }
}

/// The aggregate of one command run across a session.
///
/// Results keep host registration order. Unconnected hosts appear in
/// `unconnected` only - they have no result entry.
#[derive(Debug)]
pub struct Batch<T> {
    pub results: Vec<HostResult<T>>,
    pub unconnected: Vec<String>,
    /// True when an interrupt cut the batch short.
    pub interrupted: bool,
}

impl<T> Batch<T> {
    /// Overall success: every visited host succeeded and every host was
    /// reachable. This is what the process exit status reflects.
    pub fn all_succeeded(&self) -> bool {
        self.unconnected.is_empty() && self.results.iter().all(HostResult::is_success)
    }

    /// Per-host failures as `(host, message)` pairs, for the error report.
    pub fn failures(&self) -> Vec<(String, String)> {
        self.results
            .iter()
            .filter_map(|r| match &r.outcome {
                Ok(_) => None,
                Err(e) => Some((r.host.clone(), e.to_string())),
            })
            .collect()
    }
}

/// Runs `invoke` once per live connection, in host registration order.
///
/// Any error `invoke` returns is captured into that host's result; it never
/// propagates past the engine. Hosts that fail to connect are skipped (the
/// session remembers them as unconnected). When, after visiting every host,
/// not a single connection was live, the batch is fatal:
/// [`SessionError::NoConnections`].
///
/// `interrupt` is polled between hosts; when it goes high the batch stops
/// early and returns what was collected so far. Closures that consume lazy
/// row streams should poll the same flag between rows.
pub fn run_per_host<T, F>(
    session: &mut Session,
    interrupt: Option<&AtomicBool>,
    mut invoke: F,
) -> Result<Batch<T>, SessionError>
where
    F: FnMut(&str, &mut dyn Connection) -> anyhow::Result<T>,
{
    let mut results = Vec::new();
    let mut interrupted = false;

    for index in 0..session.len() {
        if interrupt.is_some_and(|flag| flag.load(Ordering::Relaxed)) {
            debug!("batch interrupted, rendering partial results");
            interrupted = true;
            break;
        }
        let host = session.hostname(index).to_string();
        let Some(connection) = session.connect_on_demand(index) else {
            continue;
        };
        let outcome = invoke(&host, connection);
        if let Err(err) = &outcome {
            error!(host = %host, error = %err, "command failed");
        }
        results.push(HostResult { host, outcome });
    }

    if results.is_empty() && !interrupted {
        return Err(SessionError::NoConnections);
    }

    Ok(Batch {
        results,
        unconnected: session.unconnected(),
        interrupted,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::connector::{ConnectOptions, Connector};
    use crate::credentials::Credentials;
    use crate::host::HostSpec;
    use crate::session::SessionConfig;
    use std::any::Any;

    struct FakeConnection {
        host: String,
    }

    impl Connection for FakeConnection {
        fn hostname(&self) -> &str {
            &self.host
        }

        fn as_any(&mut self) -> &mut dyn Any {
            self
        }
    }

    struct FakeConnector {
        fail: Vec<String>,
    }

    impl Connector for FakeConnector {
        fn connect(
            &self,
            host: &HostSpec,
            _credentials: &Credentials,
            _options: &ConnectOptions,
        ) -> anyhow::Result<Box<dyn Connection>> {
            if self.fail.contains(&host.host) {
                anyhow::bail!("unreachable");
            }
            Ok(Box::new(FakeConnection {
                host: host.host.clone(),
            }))
        }
    }

    fn session(names: &[&str], fail: &[&str]) -> Session {
        Session::new(
            names.iter().map(|n| HostSpec::new(*n)).collect(),
            Box::new(FakeConnector {
                fail: fail.iter().map(|s| s.to_string()).collect(),
            }),
            SessionConfig::default(),
        )
    }

    #[test]
    fn test_results_in_registration_order() {
        let mut s = session(&["a", "b", "c"], &[]);
        let batch = run_per_host(&mut s, None, |host, _conn| Ok(host.to_string())).unwrap();
        let hosts: Vec<&str> = batch.results.iter().map(|r| r.host.as_str()).collect();
        assert_eq!(hosts, vec!["a", "b", "c"]);
        assert!(batch.all_succeeded());
    }

    #[test]
    fn test_failed_connection_skipped_but_remembered() {
        let mut s = session(&["a", "b", "c"], &["b"]);
        let batch = run_per_host(&mut s, None, |host, _conn| Ok(host.to_string())).unwrap();
        let hosts: Vec<&str> = batch.results.iter().map(|r| r.host.as_str()).collect();
        assert_eq!(hosts, vec!["a", "c"]);
        assert_eq!(batch.unconnected, vec!["b"]);
        assert!(!batch.all_succeeded());
    }

    #[test]
    fn test_per_host_error_does_not_abort_batch() {
        let mut s = session(&["x", "y"], &[]);
        let batch = run_per_host(&mut s, None, |host, _conn| {
            if host == "y" {
                anyhow::bail!("boom on y");
            }
            Ok(0)
        })
        .unwrap();
        assert_eq!(batch.results.len(), 2);
        assert!(batch.results[0].is_success());
        assert!(!batch.results[1].is_success());
        assert_eq!(batch.failures(), vec![("y".to_string(), "boom on y".to_string())]);
        assert!(!batch.all_succeeded());
    }

    #[test]
    fn test_all_hosts_unreachable_is_fatal() {
        let mut s = session(&["a", "b"], &["a", "b"]);
        let err = run_per_host(&mut s, None, |_h, _c| Ok(())).unwrap_err();
        assert!(matches!(err, SessionError::NoConnections));
    }

    #[test]
    fn test_empty_session_is_fatal() {
        let mut s = session(&[], &[]);
        let err = run_per_host(&mut s, None, |_h, _c| Ok(())).unwrap_err();
        assert!(matches!(err, SessionError::NoConnections));
    }

    #[test]
    fn test_interrupt_stops_between_hosts() {
        let mut s = session(&["a", "b", "c"], &[]);
        let flag = AtomicBool::new(false);
        let batch = run_per_host(&mut s, Some(&flag), |host, _conn| {
            if host == "a" {
                flag.store(true, Ordering::Relaxed);
            }
            Ok(host.to_string())
        })
        .unwrap();
        assert!(batch.interrupted);
        assert_eq!(batch.results.len(), 1);
        assert_eq!(batch.results[0].host, "a");
    }
}
