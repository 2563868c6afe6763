//! Unified error handling for the Vestibule client
//!
//! Errors carry a context block (id, timestamp, component, operation) so a
//! failure deep in the transport layer can be traced back through logs.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;

pub type VestibuleResult<T> = Result<T, VestibuleError>;

type BoxedCause = Box<dyn std::error::Error + Send + Sync>;

/// Context attached to an error at its point of origin
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ErrorContext {
    /// Unique error ID for log correlation
    pub error_id: String,
    /// Timestamp when the error occurred
    pub timestamp: DateTime<Utc>,
    /// Component where the error originated
    pub component: String,
    /// Operation being performed when the error occurred
    pub operation: Option<String>,
}

impl ErrorContext {
    pub fn new(component: &str) -> Self {
        Self {
            error_id: uuid::Uuid::new_v4().to_string(),
            timestamp: Utc::now(),
            component: component.to_string(),
            operation: None,
        }
    }

    pub fn with_operation(mut self, operation: &str) -> Self {
        self.operation = Some(operation.to_string());
        self
    }
}

/// Main error type for the Vestibule client
///
/// The session-facing taxonomy: a missing local credential, a transport
/// failure before any response arrived, a server rejection with a status,
/// a 2xx response missing required fields, and the local side channels
/// (store, config, io, serde).
#[derive(Error, Debug)]
pub enum VestibuleError {
    #[error("no stored credential")]
    NoCredential,

    #[error("transport error: {message}")]
    Transport {
        message: String,
        #[source]
        source: Option<BoxedCause>,
        context: ErrorContext,
    },

    #[error("server rejected request ({status}): {message}")]
    Rejected {
        status: u16,
        message: String,
        context: ErrorContext,
    },

    #[error("malformed server response: {message}")]
    MalformedResponse {
        message: String,
        context: ErrorContext,
    },

    #[error("session store error: {message}")]
    Store {
        message: String,
        #[source]
        source: Option<BoxedCause>,
        context: ErrorContext,
    },

    #[error("configuration error: {message}")]
    Config {
        message: String,
        context: ErrorContext,
    },

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

impl VestibuleError {
    /// Get the error context, if the variant carries one
    pub fn context(&self) -> Option<&ErrorContext> {
        match self {
            VestibuleError::Transport { context, .. } => Some(context),
            VestibuleError::Rejected { context, .. } => Some(context),
            VestibuleError::MalformedResponse { context, .. } => Some(context),
            VestibuleError::Store { context, .. } => Some(context),
            VestibuleError::Config { context, .. } => Some(context),
            _ => None,
        }
    }

    /// HTTP status of a server rejection, if any
    pub fn status(&self) -> Option<u16> {
        match self {
            VestibuleError::Rejected { status, .. } => Some(*status),
            _ => None,
        }
    }

    /// Whether this is an authorization failure (expired or invalid token)
    ///
    /// Dependent fetches use this to decide whether to report the failure to
    /// the session controller; they never clear session state themselves.
    pub fn is_auth_rejection(&self) -> bool {
        matches!(self.status(), Some(401) | Some(403))
    }

    /// Whether retrying the same request could plausibly succeed
    pub fn is_recoverable(&self) -> bool {
        matches!(self, VestibuleError::Transport { .. })
    }
}
