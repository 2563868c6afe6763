//! Durable session storage
//!
//! The store keeps the credential and a best-effort cache of the principal.
//! The in-memory snapshot is the source of truth for the running process;
//! the durable backend only exists so a session survives a restart. Every
//! operation degrades to "acts as if storage is empty" rather than failing
//! the calling flow, because an unavailable substrate (read-only disk, quota,
//! missing home directory) must never block login or logout.

use std::path::{Path, PathBuf};
use std::sync::{Arc, RwLock};

use thiserror::Error;
use tracing::debug;
use vestibule_core::{
    Credential, ErrorContext, Principal, VestibuleError, CREDENTIAL_KEY, PRINCIPAL_CACHE_KEY,
    STORAGE_NAMESPACE,
};

/// Failure writing to the durable backend
///
/// Returned so callers can log it; the in-memory state is already updated by
/// the time this surfaces, so swallowing it is always safe.
#[derive(Error, Debug)]
pub enum StoreError {
    #[error("failed to write {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to encode cached principal: {0}")]
    Encode(#[from] serde_json::Error),
}

impl From<StoreError> for VestibuleError {
    fn from(err: StoreError) -> Self {
        VestibuleError::Store {
            message: err.to_string(),
            source: Some(Box::new(err)),
            context: ErrorContext::new("session_store"),
        }
    }
}

#[derive(Default)]
struct Snapshot {
    credential: Option<Credential>,
    principal: Option<Principal>,
}

enum Backend {
    /// No persistence; session lives as long as the process
    Ephemeral,
    /// Two files under a product-namespaced directory
    Disk { dir: PathBuf },
}

struct StoreInner {
    snapshot: RwLock<Snapshot>,
    backend: Backend,
}

/// Key-value persistence for the credential and cached principal
///
/// Cheaply cloneable; clones share the same snapshot and backend.
#[derive(Clone)]
pub struct SessionStore {
    inner: Arc<StoreInner>,
}

impl SessionStore {
    /// Store with no durable backend
    pub fn in_memory() -> Self {
        Self {
            inner: Arc::new(StoreInner {
                snapshot: RwLock::new(Snapshot::default()),
                backend: Backend::Ephemeral,
            }),
        }
    }

    /// Store persisted under `dir`
    ///
    /// Loads whatever is readable from disk into the snapshot; unreadable or
    /// corrupt files are treated as empty.
    pub fn on_disk(dir: impl Into<PathBuf>) -> Self {
        let dir = dir.into();
        let snapshot = Snapshot {
            credential: load_credential(&dir),
            principal: load_principal(&dir),
        };

        Self {
            inner: Arc::new(StoreInner {
                snapshot: RwLock::new(snapshot),
                backend: Backend::Disk { dir },
            }),
        }
    }

    /// Store persisted under the user's data directory, if one exists
    pub fn default_on_disk() -> Self {
        match dirs::data_dir() {
            Some(base) => Self::on_disk(base.join(STORAGE_NAMESPACE)),
            None => {
                debug!("no user data directory, falling back to in-memory store");
                Self::in_memory()
            }
        }
    }

    /// Current credential; never fails
    pub fn credential(&self) -> Option<Credential> {
        self.inner.snapshot.read().unwrap().credential.clone()
    }

    /// Replace the credential
    ///
    /// The in-memory snapshot is updated unconditionally; the returned error
    /// only reports a failed durable write.
    pub fn set_credential(&self, credential: Credential) -> Result<(), StoreError> {
        self.inner.snapshot.write().unwrap().credential = Some(credential.clone());

        match &self.inner.backend {
            Backend::Ephemeral => Ok(()),
            Backend::Disk { dir } => write_file(dir, CREDENTIAL_KEY, credential.expose().as_bytes()),
        }
    }

    /// Remove the credential; idempotent, never fails
    pub fn clear_credential(&self) {
        self.inner.snapshot.write().unwrap().credential = None;

        if let Backend::Disk { dir } = &self.inner.backend {
            remove_file(dir, CREDENTIAL_KEY);
        }
    }

    /// Cached principal from the last successful identity check; advisory only
    pub fn cached_principal(&self) -> Option<Principal> {
        self.inner.snapshot.read().unwrap().principal.clone()
    }

    /// Cache the principal returned by an identity check
    pub fn cache_principal(&self, principal: &Principal) -> Result<(), StoreError> {
        self.inner.snapshot.write().unwrap().principal = Some(principal.clone());

        match &self.inner.backend {
            Backend::Ephemeral => Ok(()),
            Backend::Disk { dir } => {
                let encoded = serde_json::to_vec(principal)?;
                write_file(dir, PRINCIPAL_CACHE_KEY, &encoded)
            }
        }
    }

    /// Remove the cached principal; idempotent, never fails
    pub fn clear_principal_cache(&self) {
        self.inner.snapshot.write().unwrap().principal = None;

        if let Backend::Disk { dir } = &self.inner.backend {
            remove_file(dir, PRINCIPAL_CACHE_KEY);
        }
    }
}

fn load_credential(dir: &Path) -> Option<Credential> {
    match std::fs::read_to_string(dir.join(CREDENTIAL_KEY)) {
        Ok(raw) => Credential::new(raw.trim()),
        Err(e) => {
            debug!(error = %e, "no persisted credential");
            None
        }
    }
}

fn load_principal(dir: &Path) -> Option<Principal> {
    let raw = std::fs::read(dir.join(PRINCIPAL_CACHE_KEY)).ok()?;
    match serde_json::from_slice(&raw) {
        Ok(principal) => Some(principal),
        Err(e) => {
            debug!(error = %e, "discarding unreadable principal cache");
            None
        }
    }
}

fn write_file(dir: &Path, name: &str, contents: &[u8]) -> Result<(), StoreError> {
    std::fs::create_dir_all(dir).map_err(|source| StoreError::Io {
        path: dir.to_path_buf(),
        source,
    })?;

    let path = dir.join(name);
    std::fs::write(&path, contents).map_err(|source| StoreError::Io { path, source })
}

fn remove_file(dir: &Path, name: &str) {
    let path = dir.join(name);
    if let Err(e) = std::fs::remove_file(&path) {
        if e.kind() != std::io::ErrorKind::NotFound {
            debug!(path = %path.display(), error = %e, "failed to remove persisted state");
        }
    }
}
