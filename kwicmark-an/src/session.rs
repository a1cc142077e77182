//! Session-scoped state
//!
//! Cursor positions and review queues live only for the session; the
//! annotation ledger in the database is the system of record. Both maps
//! are keyed by (user, project) so concurrent annotators on the same
//! project never share state.

use crate::adjudication::ReviewQueue;
use std::collections::HashMap;
use tokio::sync::RwLock;

/// Key for per-user per-project session state
pub type SessionKey = (i64, i64);

/// In-memory store of cursor positions, keyed by (user, project)
#[derive(Default)]
pub struct CursorSessions {
    inner: RwLock<HashMap<SessionKey, i64>>,
}

impl CursorSessions {
    pub fn new() -> Self {
        Self::default()
    }

    /// Stored snippet id for this user/project, if a cursor exists
    pub async fn get(&self, user_id: i64, project_id: i64) -> Option<i64> {
        self.inner.read().await.get(&(user_id, project_id)).copied()
    }

    pub async fn set(&self, user_id: i64, project_id: i64, snippet_id: i64) {
        self.inner
            .write()
            .await
            .insert((user_id, project_id), snippet_id);
    }

    /// Drop the cursor (e.g. on logout); the next visit re-initializes
    /// to the first unannotated snippet
    pub async fn clear(&self, user_id: i64, project_id: i64) {
        self.inner.write().await.remove(&(user_id, project_id));
    }
}

/// In-memory store of disagreement review queues, keyed by
/// (superannotator, project)
#[derive(Default)]
pub struct ReviewSessions {
    inner: RwLock<HashMap<SessionKey, ReviewQueue>>,
}

impl ReviewSessions {
    pub fn new() -> Self {
        Self::default()
    }

    /// Remove and return the queue for this session, if one exists;
    /// callers operate on it and `put` it back
    pub async fn take(&self, user_id: i64, project_id: i64) -> Option<ReviewQueue> {
        self.inner.write().await.remove(&(user_id, project_id))
    }

    pub async fn put(&self, user_id: i64, project_id: i64, queue: ReviewQueue) {
        self.inner.write().await.insert((user_id, project_id), queue);
    }
}
