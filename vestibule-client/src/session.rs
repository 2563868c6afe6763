//! Session lifecycle state machine
//!
//! [`SessionController`] is the single authority for session transitions and
//! the only component that calls the identity-check, login, and signup
//! endpoints. State is published on a watch channel so dependent views
//! subscribe instead of reading ambient globals; all mutation funnels
//! through the controller (single-writer discipline).
//!
//! Refresh is idempotent but not reentrant: concurrent callers join one
//! shared in-flight future, so at most one identity check is on the wire at
//! a time. Logout and re-login bump an epoch counter; an in-flight refresh
//! that observes a stale epoch discards its outcome instead of racing the
//! newer operation for the store.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex};

use futures::future::{BoxFuture, FutureExt, Shared};
use tokio::sync::watch;
use tracing::{debug, info, warn};
use vestibule_core::{
    ApiConfig, AuthPayload, Credential, ErrorContext, LoginRequest, SessionState, SignupRequest,
    VestibuleError, VestibuleResult,
};

use crate::api::{AuthApi, HttpAuthApi};
use crate::store::SessionStore;

type SharedRefresh = Shared<BoxFuture<'static, SessionState>>;

struct ControllerInner {
    api: Arc<dyn AuthApi>,
    store: SessionStore,
    state_tx: watch::Sender<SessionState>,
    /// Shared future joined by concurrent refresh() callers
    inflight: Mutex<Option<SharedRefresh>>,
    /// Bumped by logout and re-login; stale refreshes check it before
    /// touching the store or publishing state
    epoch: AtomicU64,
}

/// Driver of the session state machine
#[derive(Clone)]
pub struct SessionController {
    inner: Arc<ControllerInner>,
}

impl SessionController {
    pub fn new(api: Arc<dyn AuthApi>, store: SessionStore) -> Self {
        let (state_tx, _) = watch::channel(SessionState::Unauthenticated);

        Self {
            inner: Arc::new(ControllerInner {
                api,
                store,
                state_tx,
                inflight: Mutex::new(None),
                epoch: AtomicU64::new(0),
            }),
        }
    }

    /// Convenience constructor wiring up the HTTP transport
    pub fn connect(config: ApiConfig, store: SessionStore) -> VestibuleResult<Self> {
        let api = HttpAuthApi::new(config)?;
        Ok(Self::new(Arc::new(api), store))
    }

    /// Current state snapshot
    pub fn state(&self) -> SessionState {
        self.inner.state()
    }

    /// Subscribe to state transitions
    pub fn subscribe(&self) -> watch::Receiver<SessionState> {
        self.inner.state_tx.subscribe()
    }

    pub fn store(&self) -> &SessionStore {
        &self.inner.store
    }

    /// Validate the stored credential against the server
    ///
    /// With no stored credential this resolves to `Unauthenticated` without
    /// a network call. A rejected or unreachable identity check fails
    /// closed: credential and cached principal are cleared and the state
    /// collapses to `Unauthenticated`. Never returns an error; a failed
    /// silent refresh simply means "show login".
    pub async fn refresh(&self) -> SessionState {
        let shared = {
            let mut slot = self.inner.inflight.lock().unwrap();
            match slot.as_ref() {
                Some(existing) => existing.clone(),
                None => {
                    let epoch = self.inner.epoch.load(Ordering::Acquire);
                    let fut = Arc::clone(&self.inner).run_refresh(epoch).boxed().shared();
                    *slot = Some(fut.clone());
                    fut
                }
            }
        };

        shared.await
    }

    /// Authenticate with the account service
    ///
    /// On success the issued credential is persisted first, then a follow-up
    /// identity check populates the principal; the login response's own
    /// embedded profile is only an optimistic hint. A success response
    /// without a token is a protocol violation and leaves session state
    /// untouched, as does any failure.
    pub async fn login(&self, identifier: &str, secret: &str) -> VestibuleResult<AuthPayload> {
        let request = LoginRequest {
            identifier: identifier.to_string(),
            secret: secret.to_string(),
        };

        let payload = self.inner.api.login(&request).await?;
        self.adopt(payload, "login").await
    }

    /// Create an account; same persist-then-refresh contract as login
    pub async fn register(
        &self,
        name: &str,
        email: &str,
        secret: &str,
    ) -> VestibuleResult<AuthPayload> {
        let request = SignupRequest {
            name: name.to_string(),
            email: email.to_string(),
            secret: secret.to_string(),
        };

        let payload = self.inner.api.signup(&request).await?;
        self.adopt(payload, "register").await
    }

    /// Discard the session locally
    ///
    /// No network call: the token is bearer-style and simply dropped.
    /// Unconditional and deterministic from any prior state; an in-flight
    /// refresh is superseded and its outcome discarded.
    pub fn logout(&self) {
        self.inner.supersede();
        self.inner.store.clear_credential();
        self.inner.store.clear_principal_cache();
        self.inner.state_tx.send_replace(SessionState::Unauthenticated);
        info!("session cleared");
    }

    /// Entry point for dependent fetches that hit a 401/403
    ///
    /// The dependent fetch is not authorized to clear session state itself;
    /// it reports the failure here and a refresh discovers whether the
    /// credential has actually expired.
    pub async fn handle_auth_failure(&self) -> SessionState {
        warn!("dependent fetch reported an authorization failure, re-checking identity");
        self.refresh().await
    }

    /// Persist the issued credential, then refresh for the authoritative
    /// principal
    async fn adopt(&self, payload: AuthPayload, operation: &str) -> VestibuleResult<AuthPayload> {
        let credential = payload
            .access
            .as_deref()
            .and_then(|raw| Credential::new(raw))
            .ok_or_else(|| VestibuleError::MalformedResponse {
                message: format!("{operation} succeeded without an access token"),
                context: ErrorContext::new("session_controller").with_operation(operation),
            })?;

        self.inner.supersede();

        if let Err(e) = self.inner.store.set_credential(credential) {
            warn!(error = %e, "credential held in memory only, session will not survive restart");
        }

        self.refresh().await;

        Ok(payload)
    }
}

impl ControllerInner {
    fn state(&self) -> SessionState {
        self.state_tx.borrow().clone()
    }

    /// Bump the epoch and drop the in-flight refresh slot
    fn supersede(&self) {
        self.epoch.fetch_add(1, Ordering::AcqRel);
        self.inflight.lock().unwrap().take();
    }

    /// Publish `state` unless this refresh has been superseded
    ///
    /// The epoch is re-checked inside the watch channel's critical section,
    /// so a logout landing between the check and the write cannot be
    /// overwritten by a stale `Resolving` or `Authenticated`. Returns
    /// whether the state was published; subscribers are not woken for a
    /// discarded publish.
    fn publish(&self, epoch: u64, state: SessionState) -> bool {
        self.state_tx.send_if_modified(|current| {
            if self.epoch.load(Ordering::Acquire) == epoch {
                *current = state;
                true
            } else {
                false
            }
        })
    }

    /// Publish the final state and clear the in-flight slot, unless this
    /// refresh has been superseded, in which case the newer operation owns
    /// the state and we just report it
    fn settle(&self, epoch: u64, state: SessionState) -> SessionState {
        {
            let mut slot = self.inflight.lock().unwrap();
            if self.epoch.load(Ordering::Acquire) == epoch {
                *slot = None;
            }
        }

        if self.publish(epoch, state.clone()) {
            state
        } else {
            self.state()
        }
    }

    async fn run_refresh(self: Arc<Self>, epoch: u64) -> SessionState {
        let Some(credential) = self.store.credential() else {
            debug!("no stored credential, resolving to unauthenticated");
            return self.settle(epoch, SessionState::Unauthenticated);
        };

        self.publish(epoch, SessionState::Resolving);

        match self.api.current_user(&credential).await {
            Ok(principal) => {
                if self.epoch.load(Ordering::Acquire) != epoch {
                    debug!("refresh superseded, discarding identity check result");
                    return self.settle(epoch, self.state());
                }

                if let Err(e) = self.store.cache_principal(&principal) {
                    warn!(error = %e, "failed to cache principal");
                }

                info!(user = %principal.id, "session refreshed");
                self.settle(epoch, SessionState::Authenticated(principal))
            }
            Err(err) => {
                warn!(error = %err, "identity check failed, failing closed");
                self.publish(epoch, SessionState::Invalid);

                if self.epoch.load(Ordering::Acquire) == epoch {
                    self.store.clear_credential();
                    self.store.clear_principal_cache();
                }

                self.settle(epoch, SessionState::Unauthenticated)
            }
        }
    }
}
