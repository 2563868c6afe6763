//! Authenticated user directory
//!
//! [`DirectoryClient`] enforces the dependent-fetch guard: no stored
//! credential means no request at all, and an authorization failure from the
//! directory never clears session state here; it is reported upward so the
//! session controller stays the only state-clearing path.
//!
//! [`DirectorySearch`] layers search-as-you-type on top: submissions inside
//! the debounce window supersede each other, and an already-issued request
//! whose query has been superseded has its result discarded rather than the
//! request aborted.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

use tokio::sync::watch;
use tracing::{debug, warn};
use vestibule_core::{Principal, VestibuleError, VestibuleResult};

use crate::api::AuthApi;
use crate::store::SessionStore;

/// Debounce window of the original admin directory search
pub const DEFAULT_DEBOUNCE: Duration = Duration::from_millis(400);

/// Credential-guarded client for `GET /users`
#[derive(Clone)]
pub struct DirectoryClient {
    api: Arc<dyn AuthApi>,
    store: SessionStore,
}

impl DirectoryClient {
    pub fn new(api: Arc<dyn AuthApi>, store: SessionStore) -> Self {
        Self { api, store }
    }

    /// Fetch the directory, optionally server-filtered by `query`
    ///
    /// Skips the request entirely when no credential is stored. A 401/403
    /// surfaces as `Rejected`; the store is never mutated from here.
    pub async fn list(&self, query: Option<&str>) -> VestibuleResult<Vec<Principal>> {
        let Some(credential) = self.store.credential() else {
            debug!("no credential yet, skipping directory fetch");
            return Err(VestibuleError::NoCredential);
        };

        self.api.list_users(&credential, query).await
    }
}

/// Keep only entries with a matching investment classification
pub fn filter_by_investment(entries: &[Principal], investment: &str) -> Vec<Principal> {
    entries
        .iter()
        .filter(|entry| {
            entry
                .investment_type
                .as_deref()
                .is_some_and(|kind| kind.eq_ignore_ascii_case(investment))
        })
        .cloned()
        .collect()
}

/// Keep only entries with a matching plan duration in years
pub fn filter_by_duration(entries: &[Principal], duration: u32) -> Vec<Principal> {
    entries
        .iter()
        .filter(|entry| entry.duration == Some(duration))
        .cloned()
        .collect()
}

/// Latest published directory search result
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SearchSnapshot {
    pub query: String,
    pub entries: Vec<Principal>,
    pub error: Option<String>,
}

/// Debounced search front end over [`DirectoryClient`]
///
/// Must be used from within a tokio runtime; each submission spawns a task
/// that waits out the debounce window before touching the network.
pub struct DirectorySearch {
    client: DirectoryClient,
    window: Duration,
    generation: Arc<AtomicU64>,
    results: Arc<watch::Sender<SearchSnapshot>>,
}

impl DirectorySearch {
    pub fn new(client: DirectoryClient) -> Self {
        Self::with_window(client, DEFAULT_DEBOUNCE)
    }

    pub fn with_window(client: DirectoryClient, window: Duration) -> Self {
        let (results, _) = watch::channel(SearchSnapshot::default());
        Self {
            client,
            window,
            generation: Arc::new(AtomicU64::new(0)),
            results: Arc::new(results),
        }
    }

    /// Subscribe to published search results
    pub fn subscribe(&self) -> watch::Receiver<SearchSnapshot> {
        self.results.subscribe()
    }

    /// Submit a new search input, superseding any pending one
    ///
    /// The fetch fires only if no newer submission arrives within the
    /// debounce window, and its result is published only if it is still the
    /// newest when the response lands. Out-of-order responses therefore
    /// never overwrite fresher results. Without a credential the fetch is
    /// skipped and the previous snapshot kept.
    pub fn submit(&self, query: impl Into<String>) {
        let query = query.into();
        let generation = self.generation.fetch_add(1, Ordering::SeqCst) + 1;

        let client = self.client.clone();
        let window = self.window;
        let latest = Arc::clone(&self.generation);
        let results = Arc::clone(&self.results);

        tokio::spawn(async move {
            tokio::time::sleep(window).await;
            if latest.load(Ordering::SeqCst) != generation {
                debug!(%query, "search input superseded before sending");
                return;
            }

            let trimmed = query.trim();
            let outcome = client
                .list(if trimmed.is_empty() { None } else { Some(trimmed) })
                .await;

            if latest.load(Ordering::SeqCst) != generation {
                debug!(%query, "discarding superseded search response");
                return;
            }

            match outcome {
                Ok(entries) => {
                    results.send_replace(SearchSnapshot {
                        query,
                        entries,
                        error: None,
                    });
                }
                Err(VestibuleError::NoCredential) => {
                    warn!("no credential yet, directory search skipped");
                }
                Err(err) => {
                    warn!(error = %err, "directory search failed");
                    results.send_replace(SearchSnapshot {
                        query,
                        entries: Vec::new(),
                        error: Some(err.to_string()),
                    });
                }
            }
        });
    }
}
