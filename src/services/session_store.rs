/// Conversation session storage
///
/// Sessions are addressable only by their opaque id. The store owns the
/// concurrency contract: operations on different ids never block one
/// another, while the whole read-modify-write of a single id — including
/// any upstream calls awaited mid-update — runs under that session's
/// exclusive lock, so concurrent updates cannot lose writes.
///
/// The trait keeps the conversation service independent of the backing
/// store; the in-memory implementation below is the default, a Redis- or
/// database-backed one can be swapped in without touching callers.
use std::collections::HashMap;
use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use chrono::Utc;
use tokio::sync::{Mutex, RwLock};

use crate::error::{AppError, AppResult};
use crate::models::Session;

/// Future returned by a session update closure
pub type SessionUpdate = Pin<Box<dyn Future<Output = AppResult<Session>> + Send>>;

/// Read-modify-write closure applied under a session's exclusive lock
///
/// Receives a copy of the current state and returns the state to store.
/// On error nothing is stored.
pub type SessionApply = Box<dyn FnOnce(Session) -> SessionUpdate + Send>;

#[async_trait]
pub trait SessionStore: Send + Sync {
    /// Adds or overwrites the entry for the session's id
    async fn insert(&self, session: Session);

    /// Snapshot read of a session
    async fn get(&self, session_id: &str) -> Option<Session>;

    /// Atomic per-key update
    ///
    /// Runs `apply` while holding the session's lock and stores its
    /// result. Fails with `NotFound` for an unknown (or expired) id;
    /// never creates a session.
    async fn update(&self, session_id: &str, apply: SessionApply) -> AppResult<Session>;
}

/// In-memory session store with idle-TTL eviction
///
/// Sessions idle longer than `ttl` are dropped, lazily on access and by a
/// background sweep. An expired session is indistinguishable from an
/// unknown one.
pub struct InMemorySessionStore {
    sessions: RwLock<HashMap<String, Arc<Mutex<Session>>>>,
    ttl: Duration,
}

impl InMemorySessionStore {
    pub fn new(ttl: Duration) -> Arc<Self> {
        let store = Arc::new(Self {
            sessions: RwLock::new(HashMap::new()),
            ttl,
        });

        let sweep_period = (ttl / 4).max(Duration::from_secs(30));
        let weak = Arc::downgrade(&store);
        tokio::spawn(async move {
            let mut interval = tokio::time::interval(sweep_period);
            loop {
                interval.tick().await;
                let Some(store) = weak.upgrade() else { break };
                store.evict_expired().await;
            }
        });

        store
    }

    fn is_expired(&self, session: &Session) -> bool {
        Utc::now()
            .signed_duration_since(session.updated_at)
            .to_std()
            .map(|idle| idle > self.ttl)
            .unwrap_or(false)
    }

    async fn entry(&self, session_id: &str) -> Option<Arc<Mutex<Session>>> {
        let sessions = self.sessions.read().await;
        sessions.get(session_id).cloned()
    }

    async fn remove(&self, session_id: &str) {
        let mut sessions = self.sessions.write().await;
        sessions.remove(session_id);
    }

    async fn evict_expired(&self) {
        let mut sessions = self.sessions.write().await;
        let before = sessions.len();
        // A session locked mid-operation is in use, leave it for the next pass
        sessions.retain(|_, entry| match entry.try_lock() {
            Ok(session) => !self.is_expired(&session),
            Err(_) => true,
        });
        let evicted = before - sessions.len();
        if evicted > 0 {
            tracing::debug!(evicted, remaining = sessions.len(), "Evicted idle sessions");
        }
    }

    fn not_found(session_id: &str) -> AppError {
        AppError::NotFound(format!("Unknown session: {}", session_id))
    }
}

#[async_trait]
impl SessionStore for InMemorySessionStore {
    async fn insert(&self, session: Session) {
        let mut sessions = self.sessions.write().await;
        sessions.insert(session.session_id.clone(), Arc::new(Mutex::new(session)));
    }

    async fn get(&self, session_id: &str) -> Option<Session> {
        let entry = self.entry(session_id).await?;
        let session = entry.lock().await.clone();

        if self.is_expired(&session) {
            self.remove(session_id).await;
            return None;
        }

        Some(session)
    }

    async fn update(&self, session_id: &str, apply: SessionApply) -> AppResult<Session> {
        let entry = self
            .entry(session_id)
            .await
            .ok_or_else(|| Self::not_found(session_id))?;

        let mut session = entry.lock().await;

        if self.is_expired(&session) {
            drop(session);
            self.remove(session_id).await;
            return Err(Self::not_found(session_id));
        }

        let updated = apply(session.clone()).await?;
        *session = updated.clone();
        Ok(updated)
    }
}
