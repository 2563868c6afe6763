//! Vestibule Client - session lifecycle and directory SDK
//!
//! The two load-bearing components are [`SessionStore`] (durable credential
//! and cached identity, failure-tolerant) and [`SessionController`] (the
//! state machine driving login, registration, identity refresh, and logout).
//! Dependent consumers go through [`DirectoryClient`] and
//! [`DirectorySearch`], which honor the credential guard contract: no
//! credential, no request.

pub mod api;
pub mod directory;
pub mod session;
pub mod store;

#[cfg(test)]
pub(crate) mod testing;

pub use api::{AuthApi, HttpAuthApi};
pub use directory::{DirectoryClient, DirectorySearch, SearchSnapshot};
pub use session::SessionController;
pub use store::{SessionStore, StoreError};

// Re-export the core crate so consumers need a single dependency
pub use vestibule_core::{
    ApiConfig, AuthPayload, Credential, Principal, SessionState, VestibuleError, VestibuleResult,
};
