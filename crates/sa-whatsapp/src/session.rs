//! Per-sender session state for the WhatsApp bot
//!
//! Sessions expire once they have been idle for longer than the store's TTL.
//! Expired entries are pruned whenever a new image is stored.

use std::collections::HashMap;
use std::sync::Arc;

use chrono::{DateTime, TimeDelta, Utc};
use sa_core::MediaPayload;
use tokio::sync::RwLock;
use tracing::debug;

/// Idle time after which a sender's stored image is forgotten
pub const DEFAULT_SESSION_TTL_MINUTES: i64 = 60;

/// In-memory session store keyed by phone number
#[derive(Debug)]
pub struct InMemorySessionStore {
    sessions: Arc<RwLock<HashMap<String, Session>>>,
    ttl: TimeDelta,
}

/// What we remember about one sender
#[derive(Debug, Clone)]
pub struct Session {
    /// Most recent photo, reused when a later text or voice note asks for an assessment
    pub last_image: Option<MediaPayload>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Default for Session {
    fn default() -> Self {
        let now = Utc::now();
        Self {
            last_image: None,
            created_at: now,
            updated_at: now,
        }
    }
}

impl Session {
    fn is_expired(&self, now: DateTime<Utc>, ttl: TimeDelta) -> bool {
        now - self.updated_at > ttl
    }
}

impl Default for InMemorySessionStore {
    fn default() -> Self {
        Self::new()
    }
}

impl InMemorySessionStore {
    /// Create a new session store with the default TTL
    pub fn new() -> Self {
        Self::with_ttl(TimeDelta::minutes(DEFAULT_SESSION_TTL_MINUTES))
    }

    pub fn with_ttl(ttl: TimeDelta) -> Self {
        Self {
            sessions: Arc::new(RwLock::new(HashMap::new())),
            ttl,
        }
    }

    pub async fn remember_image(&self, key: &str, image: MediaPayload) {
        let now = Utc::now();
        let mut sessions = self.sessions.write().await;

        let before = sessions.len();
        sessions.retain(|_, s| !s.is_expired(now, self.ttl));
        if sessions.len() < before {
            debug!(pruned = before - sessions.len(), "Expired sessions removed");
        }

        let session = sessions.entry(key.to_string()).or_default();
        session.last_image = Some(image);
        session.updated_at = now;
    }

    /// Stored image for `key`, unless the session has expired
    pub async fn last_image(&self, key: &str) -> Option<MediaPayload> {
        let now = Utc::now();
        let sessions = self.sessions.read().await;
        sessions
            .get(key)
            .filter(|s| !s.is_expired(now, self.ttl))
            .and_then(|s| s.last_image.clone())
    }

    /// Clear a session
    pub async fn clear(&self, key: &str) {
        let mut sessions = self.sessions.write().await;
        sessions.remove(key);
    }

    /// Get session count
    pub async fn session_count(&self) -> usize {
        let sessions = self.sessions.read().await;
        sessions.len()
    }
}

impl Clone for InMemorySessionStore {
    fn clone(&self) -> Self {
        Self {
            sessions: Arc::clone(&self.sessions),
            ttl: self.ttl,
        }
    }
}
