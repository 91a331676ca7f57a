//! Process-local session store.

use std::io;
use std::sync::{Arc, Weak};
use std::thread;
use std::time::{Duration, Instant};

use dashmap::DashMap;
use serde_json::Value as JsonValue;
use tracing::debug;

use super::{Session, SessionError, Store};

/// Session data held in memory.
#[derive(Debug)]
pub struct MemorySession {
    id: String,
    values: DashMap<String, JsonValue>,
}

impl MemorySession {
    fn new(id: &str) -> Self {
        Self {
            id: id.to_string(),
            values: DashMap::new(),
        }
    }
}

impl Session for MemorySession {
    fn get(&self, key: &str) -> Result<JsonValue, SessionError> {
        self.values
            .get(key)
            .map(|v| v.value().clone())
            .ok_or_else(|| SessionError::KeyNotFound(key.to_string()))
    }

    fn set(&self, key: &str, value: JsonValue) -> Result<(), SessionError> {
        self.values.insert(key.to_string(), value);
        Ok(())
    }

    fn id(&self) -> &str {
        &self.id
    }
}

#[derive(Debug)]
struct Entry {
    session: Arc<MemorySession>,
    expires_at: Instant,
}

/// Sessions kept in a concurrent map with one expiration period for all.
///
/// Expired entries are dropped lazily when they are next touched, in bulk
/// through [`purge_expired`](Self::purge_expired), or periodically by the
/// janitor thread of a store built with [`with_janitor`](Self::with_janitor).
#[derive(Debug)]
pub struct MemoryStore {
    sessions: DashMap<String, Entry>,
    expiration: Duration,
}

impl MemoryStore {
    #[must_use]
    pub fn new(expiration: Duration) -> Self {
        Self {
            sessions: DashMap::new(),
            expiration,
        }
    }

    /// Build a shared store plus a background thread that purges expired
    /// sessions every `interval`.
    ///
    /// The thread holds only a weak reference and exits once the last
    /// `Arc` to the store is dropped.
    ///
    /// # Errors
    ///
    /// Returns an error if the janitor thread cannot be spawned.
    pub fn with_janitor(expiration: Duration, interval: Duration) -> io::Result<Arc<Self>> {
        let store = Arc::new(Self::new(expiration));
        let weak = Arc::downgrade(&store);
        thread::Builder::new()
            .name("lr-session-janitor".to_string())
            .spawn(move || janitor_loop(&weak, interval))?;
        Ok(store)
    }

    /// Drop every expired session, returning how many were removed.
    pub fn purge_expired(&self) -> usize {
        let now = Instant::now();
        let before = self.sessions.len();
        self.sessions.retain(|_, entry| entry.expires_at > now);
        let removed = before.saturating_sub(self.sessions.len());
        if removed > 0 {
            debug!(removed, "purged expired sessions");
        }
        removed
    }

    /// Number of stored sessions, expired ones not yet purged included.
    #[must_use]
    pub fn len(&self) -> usize {
        self.sessions.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.sessions.is_empty()
    }

    fn evict_if_expired(&self, id: &str) -> bool {
        let now = Instant::now();
        self.sessions
            .remove_if(id, |_, entry| entry.expires_at <= now)
            .is_some()
    }
}

fn janitor_loop(store: &Weak<MemoryStore>, interval: Duration) {
    loop {
        thread::sleep(interval);
        let Some(store) = store.upgrade() else {
            debug!("session store dropped, janitor exiting");
            return;
        };
        store.purge_expired();
    }
}

impl Store for MemoryStore {
    fn generate(&self, id: &str) -> Result<Arc<dyn Session>, SessionError> {
        let session = Arc::new(MemorySession::new(id));
        self.sessions.insert(
            id.to_string(),
            Entry {
                session: Arc::clone(&session),
                expires_at: Instant::now() + self.expiration,
            },
        );
        Ok(session)
    }

    fn refresh(&self, id: &str) -> Result<(), SessionError> {
        if self.evict_if_expired(id) {
            return Err(SessionError::NotFound(id.to_string()));
        }
        let mut entry = self
            .sessions
            .get_mut(id)
            .ok_or_else(|| SessionError::NotFound(id.to_string()))?;
        entry.expires_at = Instant::now() + self.expiration;
        Ok(())
    }

    fn remove(&self, id: &str) -> Result<(), SessionError> {
        self.sessions.remove(id);
        Ok(())
    }

    fn get(&self, id: &str) -> Result<Arc<dyn Session>, SessionError> {
        if self.evict_if_expired(id) {
            return Err(SessionError::NotFound(id.to_string()));
        }
        self.sessions
            .get(id)
            .map(|entry| Arc::clone(&entry.session) as Arc<dyn Session>)
            .ok_or_else(|| SessionError::NotFound(id.to_string()))
    }
}
