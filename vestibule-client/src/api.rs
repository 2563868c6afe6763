//! HTTP transport for the account service
//!
//! The [`AuthApi`] trait is the seam between the session state machine and
//! the network, so tests can substitute a scripted transport. The production
//! implementation is [`HttpAuthApi`], a thin reqwest client over the four
//! endpoints the service exposes.

use async_trait::async_trait;
use serde::de::DeserializeOwned;
use tracing::debug;
use vestibule_core::{
    ApiConfig, AuthPayload, Credential, ErrorBody, ErrorContext, LoginRequest, MePayload,
    Principal, SignupRequest, VestibuleError, VestibuleResult,
};

/// Client capability for the auth and directory endpoints
///
/// `current_user` and `list_users` take the credential explicitly: the
/// transport never reads or mutates session state on its own.
#[async_trait]
pub trait AuthApi: Send + Sync {
    /// `POST /auth/login`
    async fn login(&self, request: &LoginRequest) -> VestibuleResult<AuthPayload>;

    /// `POST /auth/signup`
    async fn signup(&self, request: &SignupRequest) -> VestibuleResult<AuthPayload>;

    /// `GET /auth/me` with bearer credential
    async fn current_user(&self, credential: &Credential) -> VestibuleResult<Principal>;

    /// `GET /users`, optionally filtered by a search query
    async fn list_users(
        &self,
        credential: &Credential,
        query: Option<&str>,
    ) -> VestibuleResult<Vec<Principal>>;
}

/// reqwest-backed implementation of [`AuthApi`]
pub struct HttpAuthApi {
    client: reqwest::Client,
    config: ApiConfig,
}

impl HttpAuthApi {
    /// Build a client for the configured account service
    pub fn new(config: ApiConfig) -> VestibuleResult<Self> {
        let client = reqwest::Client::builder()
            .timeout(std::time::Duration::from_secs(config.timeout_seconds))
            .user_agent(config.user_agent.clone())
            .build()
            .map_err(|e| VestibuleError::Transport {
                message: format!("failed to build HTTP client: {e}"),
                source: Some(Box::new(e)),
                context: ErrorContext::new("http_auth_api").with_operation("new"),
            })?;

        debug!(base_url = %config.base_url, "created account service client");

        Ok(Self { client, config })
    }

    pub fn config(&self) -> &ApiConfig {
        &self.config
    }

    /// Send a request and decode a 2xx body, mapping every failure mode into
    /// the session error taxonomy
    async fn execute<T: DeserializeOwned>(
        &self,
        request: reqwest::RequestBuilder,
        operation: &str,
    ) -> VestibuleResult<T> {
        let response = request.send().await.map_err(|e| VestibuleError::Transport {
            message: format!("request failed: {e}"),
            source: Some(Box::new(e)),
            context: ErrorContext::new("http_auth_api").with_operation(operation),
        })?;

        let status = response.status();
        if !status.is_success() {
            return Err(rejection(response, operation).await);
        }

        response
            .json::<T>()
            .await
            .map_err(|e| VestibuleError::MalformedResponse {
                message: format!("{operation}: {e}"),
                context: ErrorContext::new("http_auth_api").with_operation(operation),
            })
    }
}

/// Turn a non-2xx response into `Rejected`, preserving the server's
/// `{message}` body verbatim when present
async fn rejection(response: reqwest::Response, operation: &str) -> VestibuleError {
    let status = response.status();

    let message = match response.json::<ErrorBody>().await {
        Ok(ErrorBody {
            message: Some(message),
        }) => message,
        _ => status
            .canonical_reason()
            .unwrap_or("request rejected")
            .to_string(),
    };

    debug!(status = status.as_u16(), %message, operation, "server rejected request");

    VestibuleError::Rejected {
        status: status.as_u16(),
        message,
        context: ErrorContext::new("http_auth_api").with_operation(operation),
    }
}

#[async_trait]
impl AuthApi for HttpAuthApi {
    async fn login(&self, request: &LoginRequest) -> VestibuleResult<AuthPayload> {
        let url = self.config.endpoint("/auth/login");
        debug!(%url, identifier = %request.identifier, "logging in");

        self.execute(self.client.post(&url).json(request), "login")
            .await
    }

    async fn signup(&self, request: &SignupRequest) -> VestibuleResult<AuthPayload> {
        let url = self.config.endpoint("/auth/signup");
        debug!(%url, email = %request.email, "registering account");

        self.execute(self.client.post(&url).json(request), "signup")
            .await
    }

    async fn current_user(&self, credential: &Credential) -> VestibuleResult<Principal> {
        let url = self.config.endpoint("/auth/me");

        let payload: MePayload = self
            .execute(
                self.client.get(&url).bearer_auth(credential.expose()),
                "current_user",
            )
            .await?;

        Ok(payload.user)
    }

    async fn list_users(
        &self,
        credential: &Credential,
        query: Option<&str>,
    ) -> VestibuleResult<Vec<Principal>> {
        let url = self.config.endpoint("/users");

        let mut request = self.client.get(&url).bearer_auth(credential.expose());
        if let Some(q) = query.filter(|q| !q.is_empty()) {
            request = request.query(&[("q", q)]);
        }

        self.execute(request, "list_users").await
    }
}
