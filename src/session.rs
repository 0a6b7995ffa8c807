//! Session controller: owns the control-plane connection and drives
//! the scan-ban-sleep loop.
//!
//! The controller is a three-state machine. It authenticates once at
//! startup, then cycles while authenticated. Any failure inside a
//! cycle is answered with a single re-authentication probe: a lost
//! session is the most common root cause after long uptime, and
//! re-authenticating is cheap and idempotent. If the probe fails the
//! session is degraded, which is terminal for the process lifetime -
//! recovery requires an external restart.

use std::thread;
use std::time::{Duration, Instant};

use log::{error, info, warn};

use crate::api::{ApiError, ControlPlane};
use crate::fingerprint::ClassificationPolicy;
use crate::registry::BanRegistry;
use crate::scanner::{scan_swarms, ScanError};

/// Connection state of the control loop.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    Unauthenticated,
    Authenticated,
    /// Terminal: no recovery path left.
    Degraded,
}

/// Failure of one scan-ban-push cycle. Never escapes the controller.
#[derive(Debug, thiserror::Error)]
pub enum CycleError {
    #[error(transparent)]
    Scan(#[from] ScanError),
    #[error("failed to push banned address list: {0}")]
    PushBans(#[source] ApiError),
}

/// Fatal session failures surfaced to the caller.
#[derive(Debug, thiserror::Error)]
pub enum SessionError {
    #[error("control plane rejected the credentials")]
    AuthRejected,
    #[error("authentication request failed: {0}")]
    Auth(#[source] ApiError),
    #[error("session degraded after failed recovery")]
    Degraded,
}

/// Outcome of one controller step.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CycleOutcome {
    /// Cycle completed; pace before the next one.
    Completed,
    /// Cycle failed but the session was recovered; the next cycle
    /// provides its own pacing, so no extra sleep.
    Recovered,
    /// Recovery failed; the loop must stop.
    Degraded,
}

/// Drives the control loop against one control plane.
pub struct SessionController<C: ControlPlane> {
    api: C,
    policy: ClassificationPolicy,
    registry: BanRegistry,
    poll_interval: Duration,
    state: SessionState,
}

impl<C: ControlPlane> SessionController<C> {
    pub fn new(
        api: C,
        policy: ClassificationPolicy,
        registry: BanRegistry,
        poll_interval: Duration,
    ) -> Self {
        Self {
            api,
            policy,
            registry,
            poll_interval,
            state: SessionState::Unauthenticated,
        }
    }

    pub fn state(&self) -> SessionState {
        self.state
    }

    pub fn registry(&self) -> &BanRegistry {
        &self.registry
    }

    pub fn api(&self) -> &C {
        &self.api
    }

    /// Initial authentication. A rejection or transport error here is
    /// fatal: bad credentials must not hot-loop against the remote API.
    pub fn authenticate(&mut self) -> Result<(), SessionError> {
        match self.api.authenticate() {
            Ok(true) => {
                info!("authenticated against the control plane");
                self.state = SessionState::Authenticated;
                Ok(())
            }
            Ok(false) => {
                self.state = SessionState::Degraded;
                Err(SessionError::AuthRejected)
            }
            Err(err) => {
                self.state = SessionState::Degraded;
                Err(SessionError::Auth(err))
            }
        }
    }

    /// One scan-ban-push cycle.
    fn run_cycle(&mut self, now: Instant) -> Result<(), CycleError> {
        let flagged = scan_swarms(&self.api, &self.policy)?;

        let mut new_bans = 0;
        for address in &flagged {
            if self.registry.insert(address, now) {
                new_bans += 1;
            }
        }

        // Stale entries must never reach the client
        let purged = self.registry.sweep_expired(now);
        self.api
            .set_banned_addresses(&self.registry.serialize())
            .map_err(CycleError::PushBans)?;

        info!(
            "cycle complete: {} flagged, {} new, {} expired, {} active bans",
            flagged.len(),
            new_bans,
            purged,
            self.registry.len()
        );
        Ok(())
    }

    /// One controller step: run a cycle and, on failure, probe the
    /// session with a re-authentication attempt.
    ///
    /// All cycle failures are treated identically - logged and answered
    /// with the probe - since a silently expired session is the most
    /// common root cause.
    pub fn tick(&mut self) -> CycleOutcome {
        match self.run_cycle(Instant::now()) {
            Ok(()) => CycleOutcome::Completed,
            Err(err) => {
                warn!("cycle failed: {err}; re-authenticating");
                match self.api.authenticate() {
                    Ok(true) => {
                        info!("session re-established, resuming");
                        CycleOutcome::Recovered
                    }
                    Ok(false) => {
                        error!("re-authentication rejected; check the WebUI credentials");
                        self.state = SessionState::Degraded;
                        CycleOutcome::Degraded
                    }
                    Err(auth_err) => {
                        error!("re-authentication failed: {auth_err}");
                        self.state = SessionState::Degraded;
                        CycleOutcome::Degraded
                    }
                }
            }
        }
    }

    /// Authenticate and loop until the session degrades.
    pub fn run(&mut self) -> Result<(), SessionError> {
        self.authenticate().inspect_err(|err| {
            error!("initial authentication failed: {err}; check endpoint and credentials");
        })?;

        loop {
            match self.tick() {
                CycleOutcome::Completed => thread::sleep(self.poll_interval),
                CycleOutcome::Recovered => {}
                CycleOutcome::Degraded => {
                    error!("session degraded with no recovery path; stopping");
                    return Err(SessionError::Degraded);
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::{PeerDetail, TorrentSummary};
    use std::cell::RefCell;
    use std::collections::HashMap;

    fn transport_error() -> ApiError {
        ApiError::Read(std::io::Error::new(
            std::io::ErrorKind::ConnectionReset,
            "connection reset",
        ))
    }

    /// Control plane scripted per call: each queue entry is consumed
    /// front-first; an empty queue means "succeed with defaults".
    #[derive(Default)]
    struct ScriptedControlPlane {
        auth_script: RefCell<Vec<Result<bool, ApiError>>>,
        torrents_script: RefCell<Vec<Result<Vec<TorrentSummary>, ApiError>>>,
        pushed: RefCell<Vec<String>>,
    }

    impl ControlPlane for ScriptedControlPlane {
        fn authenticate(&self) -> Result<bool, ApiError> {
            let mut script = self.auth_script.borrow_mut();
            if script.is_empty() {
                Ok(true)
            } else {
                script.remove(0)
            }
        }

        fn list_torrents(&self) -> Result<Vec<TorrentSummary>, ApiError> {
            let mut script = self.torrents_script.borrow_mut();
            if script.is_empty() {
                Ok(Vec::new())
            } else {
                script.remove(0)
            }
        }

        fn torrent_peers(&self, _hash: &str) -> Result<HashMap<String, PeerDetail>, ApiError> {
            Ok(HashMap::new())
        }

        fn set_banned_addresses(&self, banned: &str) -> Result<(), ApiError> {
            self.pushed.borrow_mut().push(banned.to_string());
            Ok(())
        }
    }

    fn controller(api: ScriptedControlPlane) -> SessionController<ScriptedControlPlane> {
        SessionController::new(
            api,
            ClassificationPolicy::default(),
            BanRegistry::new(Duration::from_secs(3600)),
            Duration::from_secs(5),
        )
    }

    #[test]
    fn test_initial_auth_success_reaches_authenticated() {
        let mut controller = controller(ScriptedControlPlane::default());
        assert_eq!(controller.state(), SessionState::Unauthenticated);
        controller.authenticate().unwrap();
        assert_eq!(controller.state(), SessionState::Authenticated);
    }

    #[test]
    fn test_initial_auth_rejection_is_fatal() {
        let api = ScriptedControlPlane::default();
        api.auth_script.borrow_mut().push(Ok(false));

        let mut controller = controller(api);
        let err = controller.authenticate().unwrap_err();
        assert!(matches!(err, SessionError::AuthRejected));
        assert_eq!(controller.state(), SessionState::Degraded);
    }

    #[test]
    fn test_initial_auth_transport_error_is_fatal() {
        let api = ScriptedControlPlane::default();
        api.auth_script.borrow_mut().push(Err(transport_error()));

        let mut controller = controller(api);
        assert!(matches!(
            controller.authenticate().unwrap_err(),
            SessionError::Auth(_)
        ));
        assert_eq!(controller.state(), SessionState::Degraded);
    }

    #[test]
    fn test_cycle_failure_recovers_via_reauthentication() {
        let api = ScriptedControlPlane::default();
        // Initial auth succeeds, the first cycle's torrent fetch fails,
        // the recovery probe succeeds, the next cycle runs clean.
        api.auth_script.borrow_mut().push(Ok(true));
        api.auth_script.borrow_mut().push(Ok(true));
        api.torrents_script.borrow_mut().push(Err(transport_error()));

        let mut controller = controller(api);
        controller.authenticate().unwrap();

        assert_eq!(controller.tick(), CycleOutcome::Recovered);
        assert_eq!(controller.state(), SessionState::Authenticated);

        assert_eq!(controller.tick(), CycleOutcome::Completed);
        assert_eq!(controller.state(), SessionState::Authenticated);
    }

    #[test]
    fn test_failed_recovery_degrades_the_session() {
        let api = ScriptedControlPlane::default();
        api.auth_script.borrow_mut().push(Ok(true));
        api.auth_script.borrow_mut().push(Ok(false));
        api.torrents_script.borrow_mut().push(Err(transport_error()));

        let mut controller = controller(api);
        controller.authenticate().unwrap();

        assert_eq!(controller.tick(), CycleOutcome::Degraded);
        assert_eq!(controller.state(), SessionState::Degraded);
    }

    #[test]
    fn test_successful_cycle_pushes_complete_ban_list() {
        let api = ScriptedControlPlane::default();
        let mut controller = controller(api);
        controller.authenticate().unwrap();

        assert_eq!(controller.tick(), CycleOutcome::Completed);
        let pushed = controller.api.pushed.borrow();
        // Empty swarm: the push still happens, with the empty set
        assert_eq!(pushed.as_slice(), &[String::new()]);
    }
}
