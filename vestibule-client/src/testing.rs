//! Scripted transport for unit tests

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;
use std::time::Duration;

use async_trait::async_trait;
use vestibule_core::{
    AuthPayload, Credential, ErrorContext, LoginRequest, Principal, SignupRequest, VestibuleError,
    VestibuleResult,
};

use crate::api::AuthApi;

pub(crate) fn principal(id: &str, name: &str, email: Option<&str>) -> Principal {
    Principal {
        id: id.to_string(),
        name: name.to_string(),
        email: email.map(str::to_string),
        role: None,
        investment_type: None,
        duration: None,
        created_at: None,
    }
}

fn rejected(status: u16, message: &str) -> VestibuleError {
    VestibuleError::Rejected {
        status,
        message: message.to_string(),
        context: ErrorContext::new("mock_auth_api"),
    }
}

/// In-process [`AuthApi`] with configurable outcomes and call counters
pub(crate) struct MockAuthApi {
    accepted_token: Mutex<Option<String>>,
    me_principal: Mutex<Principal>,
    login_payload: Mutex<Option<AuthPayload>>,
    signup_payload: Mutex<Option<AuthPayload>>,
    users: Mutex<Vec<Principal>>,
    me_delay: Mutex<Option<Duration>>,
    list_delay: Mutex<Option<Duration>>,
    me_calls: AtomicUsize,
    list_queries: Mutex<Vec<Option<String>>>,
}

impl MockAuthApi {
    /// A server that honors exactly one bearer token
    pub(crate) fn accepting(token: &str) -> Self {
        Self {
            accepted_token: Mutex::new(Some(token.to_string())),
            me_principal: Mutex::new(principal("u1", "Ann", Some("a@x.com"))),
            login_payload: Mutex::new(None),
            signup_payload: Mutex::new(None),
            users: Mutex::new(vec![
                principal("u1", "Ann", Some("a@x.com")),
                principal("u2", "Alice", Some("alice@x.com")),
                principal("u3", "Bob", Some("b@x.com")),
            ]),
            me_delay: Mutex::new(None),
            list_delay: Mutex::new(None),
            me_calls: AtomicUsize::new(0),
            list_queries: Mutex::new(Vec::new()),
        }
    }

    pub(crate) fn with_login_payload(self, payload: AuthPayload) -> Self {
        *self.login_payload.lock().unwrap() = Some(payload);
        self
    }

    pub(crate) fn with_signup_payload(self, payload: AuthPayload) -> Self {
        *self.signup_payload.lock().unwrap() = Some(payload);
        self
    }

    pub(crate) fn with_me_delay(self, delay: Duration) -> Self {
        *self.me_delay.lock().unwrap() = Some(delay);
        self
    }

    pub(crate) fn with_list_delay(self, delay: Duration) -> Self {
        *self.list_delay.lock().unwrap() = Some(delay);
        self
    }

    pub(crate) fn set_accepted_token(&self, token: Option<&str>) {
        *self.accepted_token.lock().unwrap() = token.map(str::to_string);
    }

    pub(crate) fn me_calls(&self) -> usize {
        self.me_calls.load(Ordering::SeqCst)
    }

    pub(crate) fn list_queries(&self) -> Vec<Option<String>> {
        self.list_queries.lock().unwrap().clone()
    }

    fn authorize(&self, credential: &Credential) -> VestibuleResult<()> {
        let accepted = self.accepted_token.lock().unwrap();
        match accepted.as_deref() {
            Some(token) if token == credential.expose() => Ok(()),
            _ => Err(rejected(401, "invalid or expired token")),
        }
    }
}

#[async_trait]
impl AuthApi for MockAuthApi {
    async fn login(&self, _request: &LoginRequest) -> VestibuleResult<AuthPayload> {
        match self.login_payload.lock().unwrap().clone() {
            Some(payload) => Ok(payload),
            None => Err(rejected(401, "invalid credentials")),
        }
    }

    async fn signup(&self, _request: &SignupRequest) -> VestibuleResult<AuthPayload> {
        match self.signup_payload.lock().unwrap().clone() {
            Some(payload) => Ok(payload),
            None => Err(rejected(400, "registration failed")),
        }
    }

    async fn current_user(&self, credential: &Credential) -> VestibuleResult<Principal> {
        let delay = *self.me_delay.lock().unwrap();
        if let Some(delay) = delay {
            tokio::time::sleep(delay).await;
        }

        self.me_calls.fetch_add(1, Ordering::SeqCst);
        self.authorize(credential)?;
        Ok(self.me_principal.lock().unwrap().clone())
    }

    async fn list_users(
        &self,
        credential: &Credential,
        query: Option<&str>,
    ) -> VestibuleResult<Vec<Principal>> {
        let delay = *self.list_delay.lock().unwrap();
        if let Some(delay) = delay {
            tokio::time::sleep(delay).await;
        }

        self.list_queries
            .lock()
            .unwrap()
            .push(query.map(str::to_string));
        self.authorize(credential)?;

        let needle = query.unwrap_or("").to_lowercase();
        Ok(self
            .users
            .lock()
            .unwrap()
            .iter()
            .filter(|user| {
                needle.is_empty()
                    || user.name.to_lowercase().contains(&needle)
                    || user
                        .email
                        .as_deref()
                        .is_some_and(|email| email.to_lowercase().contains(&needle))
            })
            .cloned()
            .collect())
    }
}
