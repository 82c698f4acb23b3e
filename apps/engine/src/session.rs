//! Process-wide session state machine: platform readiness + authentication.
//!
//! All mutation flows through a pure reducer, `reduce(state, event)`, and is
//! published via `watch::send_modify`, so every externally observable snapshot
//! is a complete transition result. In particular `is_authenticated` and
//! `user` always change together; no reader can ever see one without the
//! other.
//!
//! Phases: `Uninitialized → Initializing → Ready(unauth|auth)`; any phase can
//! fall to `AuthError`, and `clear_error` restores the phase recorded in
//! `prior_phase` without re-probing.

use std::fmt;
use std::sync::Arc;

use tokio::sync::watch;
use tokio::time::{sleep, Duration, Instant};
use tracing::{debug, info, warn};

use crate::errors::AppError;
use crate::gateway::{Gateway, Identity as _, PlatformProbe as _};
use crate::models::User;

/// How often the bootstrap loop re-checks platform reachability.
const PLATFORM_POLL_INTERVAL: Duration = Duration::from_millis(100);
/// Hard ceiling on the bootstrap poll. Not cancellable by callers.
const PLATFORM_POLL_TIMEOUT: Duration = Duration::from_secs(10);

const PLATFORM_TIMEOUT_MESSAGE: &str = "Platform failed to load within 10 seconds";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionPhase {
    Uninitialized,
    Initializing,
    Ready,
    AuthError,
}

/// Typed session error: a machine-readable kind alongside the human-readable
/// message shown to users.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionError {
    pub kind: SessionErrorKind,
    pub message: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionErrorKind {
    PlatformUnavailable,
    Identity,
}

impl SessionError {
    fn platform_unavailable(message: impl Into<String>) -> Self {
        Self {
            kind: SessionErrorKind::PlatformUnavailable,
            message: message.into(),
        }
    }

    fn from_gateway(err: &AppError) -> Self {
        let kind = match err {
            AppError::PlatformUnavailable(_) => SessionErrorKind::PlatformUnavailable,
            _ => SessionErrorKind::Identity,
        };
        Self {
            kind,
            message: err.to_string(),
        }
    }
}

impl fmt::Display for SessionError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.message)
    }
}

/// Whole session state. Constructed only by the reducer; callers read
/// snapshots via `SessionStore::state` or a `watch` subscription.
#[derive(Debug, Clone, PartialEq)]
pub struct SessionState {
    pub phase: SessionPhase,
    pub user: Option<User>,
    pub is_authenticated: bool,
    pub is_authenticating: bool,
    pub last_error: Option<SessionError>,
    /// Phase to restore when the current error is cleared.
    pub prior_phase: SessionPhase,
    /// Increments on every transition.
    pub version: u64,
}

impl SessionState {
    fn initial() -> Self {
        Self {
            phase: SessionPhase::Uninitialized,
            user: None,
            is_authenticated: false,
            is_authenticating: false,
            last_error: None,
            prior_phase: SessionPhase::Uninitialized,
            version: 0,
        }
    }
}

#[derive(Debug, Clone)]
pub enum SessionEvent {
    InitStarted,
    AuthProbeStarted,
    Authenticated(User),
    Unauthenticated,
    Failed(SessionError),
    ErrorCleared,
}

/// Pure transition function. Every arm rebuilds the full state so a snapshot
/// can never mix fields from two transitions.
pub fn reduce(state: &SessionState, event: SessionEvent) -> SessionState {
    let version = state.version + 1;
    match event {
        SessionEvent::InitStarted => SessionState {
            phase: SessionPhase::Initializing,
            version,
            ..state.clone()
        },
        SessionEvent::AuthProbeStarted => SessionState {
            is_authenticating: true,
            last_error: None,
            version,
            ..state.clone()
        },
        SessionEvent::Authenticated(user) => SessionState {
            phase: SessionPhase::Ready,
            user: Some(user),
            is_authenticated: true,
            is_authenticating: false,
            last_error: None,
            prior_phase: SessionPhase::Ready,
            version,
        },
        SessionEvent::Unauthenticated => SessionState {
            phase: SessionPhase::Ready,
            user: None,
            is_authenticated: false,
            is_authenticating: false,
            last_error: None,
            prior_phase: SessionPhase::Ready,
            version,
        },
        SessionEvent::Failed(error) => SessionState {
            phase: SessionPhase::AuthError,
            user: None,
            is_authenticated: false,
            is_authenticating: false,
            last_error: Some(error),
            prior_phase: state.prior_phase,
            version,
        },
        SessionEvent::ErrorCleared => {
            if state.phase != SessionPhase::AuthError {
                return state.clone();
            }
            SessionState {
                phase: state.prior_phase,
                last_error: None,
                version,
                ..state.clone()
            }
        }
    }
}

struct Inner {
    gateway: Gateway,
    tx: watch::Sender<SessionState>,
}

/// Handle to the single session state machine. Cloning shares the same state.
#[derive(Clone)]
pub struct SessionStore {
    inner: Arc<Inner>,
}

impl SessionStore {
    pub fn new(gateway: Gateway) -> Self {
        let (tx, _rx) = watch::channel(SessionState::initial());
        Self {
            inner: Arc::new(Inner { gateway, tx }),
        }
    }

    /// Current state snapshot.
    pub fn state(&self) -> SessionState {
        self.inner.tx.borrow().clone()
    }

    /// Subscription to state transitions.
    pub fn subscribe(&self) -> watch::Receiver<SessionState> {
        self.inner.tx.subscribe()
    }

    fn dispatch(&self, event: SessionEvent) {
        self.inner.tx.send_modify(|state| *state = reduce(state, event));
    }

    /// Bootstraps the session. Idempotent: only the first call moves the
    /// machine out of `Uninitialized`; later calls return immediately.
    ///
    /// Polls platform reachability every 100ms until success or the 10s
    /// timeout expires, then probes authentication. The loop owns its timer:
    /// it stops on first success or on the deadline, never by external
    /// cancellation.
    pub async fn init(&self) {
        let mut started = false;
        self.inner.tx.send_modify(|state| {
            if state.phase == SessionPhase::Uninitialized {
                *state = reduce(state, SessionEvent::InitStarted);
                started = true;
            }
        });
        if !started {
            return;
        }

        let deadline = Instant::now() + PLATFORM_POLL_TIMEOUT;
        loop {
            match self.inner.gateway.probe.check().await {
                Ok(()) => break,
                Err(err) => {
                    if Instant::now() >= deadline {
                        warn!(error = %err, "platform never became reachable");
                        self.dispatch(SessionEvent::Failed(SessionError::platform_unavailable(
                            PLATFORM_TIMEOUT_MESSAGE,
                        )));
                        return;
                    }
                    sleep(PLATFORM_POLL_INTERVAL).await;
                }
            }
        }

        debug!("platform reachable, probing auth status");
        self.check_auth_status().await;
    }

    /// Queries sign-in state and settles the machine in `Ready` (either way)
    /// or `AuthError`. Returns whether the session ended up authenticated.
    pub async fn check_auth_status(&self) -> bool {
        self.dispatch(SessionEvent::AuthProbeStarted);

        match self.inner.gateway.identity.is_signed_in().await {
            Ok(true) => match self.inner.gateway.identity.current_user().await {
                Ok(user) => {
                    info!(username = %user.username, "session authenticated");
                    self.dispatch(SessionEvent::Authenticated(user));
                    true
                }
                Err(err) => {
                    self.dispatch(SessionEvent::Failed(SessionError::from_gateway(&err)));
                    false
                }
            },
            Ok(false) => {
                self.dispatch(SessionEvent::Unauthenticated);
                false
            }
            Err(err) => {
                self.dispatch(SessionEvent::Failed(SessionError::from_gateway(&err)));
                false
            }
        }
    }

    /// Signs in via the identity capability, then re-probes auth status.
    pub async fn sign_in(&self) {
        self.dispatch(SessionEvent::AuthProbeStarted);

        match self.inner.gateway.identity.sign_in().await {
            Ok(()) => {
                self.check_auth_status().await;
            }
            Err(err) => {
                self.dispatch(SessionEvent::Failed(SessionError::from_gateway(&err)));
            }
        }
    }

    /// Signs out. Success forces `Ready(unauthenticated)` regardless of the
    /// prior phase.
    pub async fn sign_out(&self) {
        self.dispatch(SessionEvent::AuthProbeStarted);

        match self.inner.gateway.identity.sign_out().await {
            Ok(()) => {
                info!("session signed out");
                self.dispatch(SessionEvent::Unauthenticated);
            }
            Err(err) => {
                self.dispatch(SessionEvent::Failed(SessionError::from_gateway(&err)));
            }
        }
    }

    /// Re-fetches the current user without a full sign-in round trip.
    pub async fn refresh_user(&self) {
        self.dispatch(SessionEvent::AuthProbeStarted);

        match self.inner.gateway.identity.current_user().await {
            Ok(user) => self.dispatch(SessionEvent::Authenticated(user)),
            Err(err) => {
                self.dispatch(SessionEvent::Failed(SessionError::from_gateway(&err)));
            }
        }
    }

    /// Leaves `AuthError`, restoring the prior phase. Clears the error only;
    /// no re-probe.
    pub fn clear_error(&self) {
        self.dispatch(SessionEvent::ErrorCleared);
    }
}
