//! Vehicle search with a single in-flight request per consumer.
//!
//! Submitting a new query cancels the outstanding one; last query wins. A
//! superseded request drops its HTTP future and never touches the session
//! state, so stale responses cannot overwrite newer results.
//!
//! Sessions are handed out as [`SearchLease`]s. The registry entry lives exactly
//! as long as some request holds a lease on it, including requests whose client
//! went away mid-search.

use serde::Serialize;
use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use tokio_util::sync::CancellationToken;

use crate::erp_api::{ErpClient, ErpError};
use crate::models::Vehicle;
use crate::query::SearchQuery;

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SearchFailure {
    pub status: Option<u16>,
    pub message: String,
}

impl From<&ErpError> for SearchFailure {
    fn from(error: &ErpError) -> Self {
        match error {
            ErpError::Status { status, excerpt, .. } => SearchFailure {
                status: Some(*status),
                message: format!("HTTP {status}: {excerpt}"),
            },
            ErpError::Transport(e) => SearchFailure {
                status: None,
                message: e.to_string(),
            },
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum SearchState {
    Idle,
    Loading,
    Ready {
        vehicles: Vec<Vehicle>,
        raw: Option<String>,
    },
    Failed(SearchFailure),
}

#[derive(Debug, Clone, PartialEq)]
pub enum SearchOutcome {
    Completed(SearchState),
    // A newer query replaced this one before it finished; not an error.
    Superseded,
}

// The guarded data stays consistent between statements, so a poisoned lock is still usable.
fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

struct Inner {
    state: SearchState,
    // Id of the outstanding submit and the token that supersedes it
    in_flight: Option<(u64, CancellationToken)>,
    next_id: u64,
}

pub struct SearchSession {
    client: ErpClient,
    inner: Mutex<Inner>,
}

impl SearchSession {
    pub fn new(client: ErpClient) -> Self {
        Self {
            client,
            inner: Mutex::new(Inner {
                state: SearchState::Idle,
                in_flight: None,
                next_id: 0,
            }),
        }
    }

    pub fn state(&self) -> SearchState {
        lock(&self.inner).state.clone()
    }

    pub fn is_idle(&self) -> bool {
        lock(&self.inner).in_flight.is_none()
    }

    pub async fn submit(&self, query: SearchQuery) -> SearchOutcome {
        let token = CancellationToken::new();
        let id = {
            let mut inner = lock(&self.inner);
            inner.next_id += 1;
            let id = inner.next_id;
            if let Some((_, previous)) = inner.in_flight.replace((id, token.clone())) {
                tracing::debug!("Cancelling superseded vehicle search");
                previous.cancel();
            }
            inner.state = SearchState::Loading;
            id
        };
        let _in_flight = InFlight { session: self, id };

        let result = tokio::select! {
            biased;
            () = token.cancelled() => return SearchOutcome::Superseded,
            result = self.client.search_vehicles(&query) => result,
        };

        let next = match result {
            Ok(payload) => SearchState::Ready {
                vehicles: payload.vehicles,
                raw: payload.raw,
            },
            Err(e) => {
                tracing::error!(status = ?e.status(), error = %e, "Vehicle search failed");
                SearchState::Failed(SearchFailure::from(&e))
            }
        };

        // Cancellation is decided under the same lock that installs the next token.
        // Declared after `_in_flight`, so it is released before the guard locks again.
        let mut inner = lock(&self.inner);
        if token.is_cancelled() {
            return SearchOutcome::Superseded;
        }
        inner.in_flight = None;
        inner.state = next.clone();
        SearchOutcome::Completed(next)
    }
}

// Clears the session's in-flight marker when a submit ends without landing,
// e.g. because the request future was dropped mid-search.
struct InFlight<'a> {
    session: &'a SearchSession,
    id: u64,
}

impl Drop for InFlight<'_> {
    fn drop(&mut self) {
        let mut inner = lock(&self.session.inner);
        if inner.in_flight.as_ref().is_some_and(|(id, _)| *id == self.id) {
            inner.in_flight = None;
            if inner.state == SearchState::Loading {
                inner.state = SearchState::Idle;
            }
        }
    }
}

struct Entry {
    session: Arc<SearchSession>,
    holders: usize,
}

type Registry = Arc<Mutex<HashMap<String, Entry>>>;

/// Search sessions keyed by consumer id. An entry stays registered while at
/// least one lease on it is alive.
pub struct SearchSessions {
    client: ErpClient,
    capacity: usize,
    sessions: Registry,
}

impl SearchSessions {
    pub fn new(client: ErpClient, capacity: usize) -> Self {
        Self {
            client,
            capacity,
            sessions: Arc::new(Mutex::new(HashMap::new())),
        }
    }

    /// Session shared by every request from `consumer`. Anonymous consumers,
    /// and new consumers once the registry is full, get a private session.
    pub fn lease(&self, consumer: Option<&str>) -> SearchLease {
        let Some(consumer) = consumer.filter(|c| !c.is_empty()) else {
            return self.untracked();
        };
        let mut sessions = lock(&self.sessions);
        if !sessions.contains_key(consumer) && sessions.len() >= self.capacity {
            tracing::warn!(consumer, capacity = self.capacity, "Search registry full; serving untracked session");
            return self.untracked();
        }
        let entry = sessions.entry(consumer.to_string()).or_insert_with(|| Entry {
            session: Arc::new(SearchSession::new(self.client.clone())),
            holders: 0,
        });
        entry.holders += 1;
        SearchLease {
            session: entry.session.clone(),
            slot: Some((consumer.to_string(), self.sessions.clone())),
        }
    }

    fn untracked(&self) -> SearchLease {
        SearchLease {
            session: Arc::new(SearchSession::new(self.client.clone())),
            slot: None,
        }
    }

    pub fn len(&self) -> usize {
        lock(&self.sessions).len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// A request's hold on a search session. Dropping the last lease for a
/// consumer removes its registry entry.
pub struct SearchLease {
    session: Arc<SearchSession>,
    slot: Option<(String, Registry)>,
}

impl SearchLease {
    pub fn session(&self) -> &SearchSession {
        &self.session
    }
}

impl Drop for SearchLease {
    fn drop(&mut self) {
        let Some((consumer, registry)) = self.slot.take() else {
            return;
        };
        let mut sessions = lock(&registry);
        if let Some(entry) = sessions.get_mut(&consumer) {
            entry.holders = entry.holders.saturating_sub(1);
            if entry.holders == 0 {
                sessions.remove(&consumer);
            }
        }
    }
}
