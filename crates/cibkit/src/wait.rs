//! Waiting for the cluster to converge.
//!
//! Every wait polls a predicate with the retry engine and drops the cached
//! CIB before each poll, so a stale snapshot cannot hide convergence. A
//! failing command inside a poll only means "not yet". Running out of
//! attempts returns `false` unless the options ask to fail on timeout.

use crate::cib::CibStore;
use crate::error::{Error, Result};
use crate::retry::{self, Attempt, Deadline, LogCallback};

/// Whether the cluster is online and usable.
///
/// The controller version, an elected controller and the node-state
/// section must all be obtained within one attempt's deadline. Never
/// fails: errors and timeouts read as offline.
pub fn is_online(store: &mut CibStore) -> bool {
    let deadline = Deadline::after(store.options().attempt_timeout());
    match online_signals(store, &deadline) {
        Ok(online) => online,
        Err(Error::Timeout { .. }) => {
            log::debug!("Online check timeout!");
            false
        }
        Err(e) => {
            log::debug!("Offline: {e}");
            false
        }
    }
}

fn online_signals(store: &mut CibStore, deadline: &Deadline) -> Result<bool> {
    if store.dc_version(deadline.remaining())?.is_empty() {
        return Ok(false);
    }
    let snapshot = store.fetch_within(deadline.remaining())?;
    if snapshot.designated_controller().is_none() || !snapshot.status().has_node_state {
        return Ok(false);
    }
    if deadline.expired() {
        return Err(Error::Timeout {
            command: "online check".to_string(),
            timeout: deadline.limit(),
        });
    }
    Ok(true)
}

/// Wait until the cluster is online.
pub fn wait_for_online(store: &mut CibStore) -> Result<bool> {
    log::debug!(
        "Waiting {} seconds for Pacemaker to become online",
        store.options().retry_policy().total_wait().as_secs()
    );
    let online = poll(store, |store, _| Ok(is_online(store)))?;
    if online {
        log::debug!("Pacemaker is online");
    }
    Ok(online)
}

/// Wait until a primitive has a known status.
pub fn wait_for_status(store: &mut CibStore, primitive: &str, node: Option<&str>) -> Result<bool> {
    log::debug!("Wait for a known status of '{primitive}'{}", on_node(node));
    let known = poll(store, |store, deadline| {
        Ok(store
            .fetch_within(deadline.remaining())?
            .status()
            .primitive_status(primitive, node)
            .is_some())
    })?;
    if known {
        let status = store.primitive_status(primitive, node)?;
        log::debug!(
            "Primitive '{primitive}' has status '{}'{}",
            status.map(|s| s.to_string()).unwrap_or_default(),
            on_node(node)
        );
    }
    Ok(known)
}

/// Wait until a primitive runs, on `node` if given.
pub fn wait_for_start(store: &mut CibStore, primitive: &str, node: Option<&str>) -> Result<bool> {
    log::debug!(
        "Waiting {} seconds for service '{primitive}' to start{}",
        total_wait(store),
        on_node(node)
    );
    let started = poll(store, |store, deadline| {
        Ok(store
            .fetch_within(deadline.remaining())?
            .status()
            .primitive_is_running(primitive, node)
            == Some(true))
    })?;
    if started {
        log::debug!("Service '{primitive}' has started{}", on_node(node));
    }
    Ok(started)
}

/// Wait until a primitive runs as master, on `node` if given.
pub fn wait_for_master(store: &mut CibStore, primitive: &str, node: Option<&str>) -> Result<bool> {
    log::debug!(
        "Waiting {} seconds for service '{primitive}' to start master{}",
        total_wait(store),
        on_node(node)
    );
    let promoted = poll(store, |store, deadline| {
        Ok(store
            .fetch_within(deadline.remaining())?
            .status()
            .primitive_has_master_running(primitive, node)
            == Some(true))
    })?;
    if promoted {
        log::debug!("Service '{primitive}' has started master{}", on_node(node));
    }
    Ok(promoted)
}

/// Wait until a primitive is definitely stopped, on `node` if given.
///
/// An unknown status does not count as stopped.
pub fn wait_for_stop(store: &mut CibStore, primitive: &str, node: Option<&str>) -> Result<bool> {
    log::debug!(
        "Waiting {} seconds for service '{primitive}' to stop{}",
        total_wait(store),
        on_node(node)
    );
    let stopped = poll(store, |store, deadline| {
        Ok(store
            .fetch_within(deadline.remaining())?
            .status()
            .primitive_is_running(primitive, node)
            == Some(false))
    })?;
    if stopped {
        log::debug!("Service '{primitive}' was stopped{}", on_node(node));
    }
    Ok(stopped)
}

fn poll<F>(store: &mut CibStore, mut predicate: F) -> Result<bool>
where
    F: FnMut(&mut CibStore, &Deadline) -> Result<bool>,
{
    let policy = store.options().retry_policy().false_is_failure(true);
    let converged = retry::retry(&policy, Some(&LogCallback), |deadline| {
        store.reset();
        match predicate(&mut *store, deadline) {
            Ok(value) => Attempt::Done(value),
            Err(e) => Attempt::Retry(e),
        }
    })?;
    Ok(converged.unwrap_or(false))
}

fn total_wait(store: &CibStore) -> u64 {
    store.options().retry_policy().total_wait().as_secs()
}

fn on_node(node: Option<&str>) -> String {
    node.map(|n| format!(" on node '{n}'")).unwrap_or_default()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backend::Tool;
    use crate::cib::tests::{CIB, quick_options, store_with};
    use crate::types::Options;
    use std::time::Duration;

    const OFFLINE: &str = r#"<cib dc-uuid="NONE"><configuration/><status/></cib>"#;

    #[test]
    fn test_online_when_all_signals_present() {
        let (runner, mut store) = store_with(CIB);
        runner.push_ok(Tool::CrmAttribute, "2.1.6");
        assert!(is_online(&mut store));
    }

    #[test]
    fn test_offline_when_signals_arrive_late() {
        let runner = std::sync::Arc::new(crate::backend::mock::MockRunner::with_cib(CIB));
        runner.push_ok(Tool::CrmAttribute, "2.1.6");
        runner.set_latency(Duration::from_millis(5));
        let options = Options {
            retry_timeout: 0,
            ..quick_options()
        };
        let mut store = CibStore::new(runner.clone(), options);

        assert!(!is_online(&mut store));
        // every signal was read, just past the deadline
        assert_eq!(runner.call_count(Tool::Cibadmin, "-Q"), 1);
        assert!(store.is_fetched());
    }

    #[test]
    fn test_offline_when_version_read_fails() {
        let (runner, mut store) = store_with(CIB);
        runner.push_err(Tool::CrmAttribute, "Could not connect to the CIB");
        assert!(!is_online(&mut store));
        // the dump is not attempted
        assert_eq!(runner.call_count(Tool::Cibadmin, "-Q"), 0);
    }

    #[test]
    fn test_offline_without_controller_or_version() {
        let (runner, mut store) = store_with(OFFLINE);
        runner.push_ok(Tool::CrmAttribute, "2.1.6");
        assert!(!is_online(&mut store));

        // empty version output
        let (_, mut store) = store_with(CIB);
        assert!(!is_online(&mut store));
    }

    #[test]
    fn test_wait_for_online_polls_fresh_cib() {
        let (runner, mut store) = store_with(CIB);
        runner.push_cib(OFFLINE);
        runner.push_ok(Tool::CrmAttribute, "2.1.6");
        runner.push_ok(Tool::CrmAttribute, "2.1.6");

        assert!(wait_for_online(&mut store).unwrap());
        assert_eq!(runner.call_count(Tool::Cibadmin, "-Q"), 2);
    }

    #[test]
    fn test_wait_for_start_converges() {
        let stopped = CIB.replace(
            r#"<lrm_rsc_op id="vip_start_0" operation="start" call-id="4" rc-code="0" op-status="0"/>"#,
            "",
        );
        let (runner, mut store) = store_with(CIB);
        runner.push_cib(stopped.clone());
        runner.push_cib(stopped);

        assert!(wait_for_start(&mut store, "vip", Some("node-1")).unwrap());
        assert_eq!(runner.call_count(Tool::Cibadmin, "-Q"), 3);
    }

    #[test]
    fn test_wait_for_stop_requires_definite_false() {
        let (runner, mut store) = store_with(CIB);
        assert!(wait_for_stop(&mut store, "webserver", None).unwrap());
        assert_eq!(runner.call_count(Tool::Cibadmin, "-Q"), 1);

        // unknown status on node-1 is not "stopped"
        assert!(!wait_for_stop(&mut store, "webserver", Some("node-1")).unwrap());
        assert_eq!(runner.call_count(Tool::Cibadmin, "-Q"), 4);
    }

    #[test]
    fn test_wait_for_master_and_status() {
        let (_, mut store) = store_with(CIB);
        assert!(wait_for_master(&mut store, "db", Some("node-1")).unwrap());
        assert!(!wait_for_master(&mut store, "db", Some("node-2")).unwrap());
        assert!(wait_for_status(&mut store, "haproxy", None).unwrap());
    }

    #[test]
    fn test_poll_errors_are_absorbed() {
        let (runner, mut store) = store_with(CIB);
        runner.clear_cib();
        assert!(!wait_for_status(&mut store, "vip", None).unwrap());
        assert_eq!(runner.call_count(Tool::Cibadmin, "-Q"), 3);
    }

    #[test]
    fn test_fail_on_timeout_escalates() {
        let runner = std::sync::Arc::new(crate::backend::mock::MockRunner::with_cib(CIB));
        let options = Options {
            retry_fail_on_timeout: true,
            ..quick_options()
        };
        let mut store = CibStore::new(runner, options);
        let err = wait_for_start(&mut store, "webserver", None).unwrap_err();
        assert!(matches!(err, Error::RetryExhausted { attempts: 3, .. }));
    }
}
