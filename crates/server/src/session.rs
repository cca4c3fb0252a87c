use std::collections::HashMap;
use std::sync::Arc;
use std::time::{Duration, Instant};

use axum::{
    extract::Request,
    http::HeaderValue,
    middleware::Next,
    response::Response,
};
use pantry_ocr::ReceiptDraft;
use tokio::sync::Mutex;
use uuid::Uuid;

pub const SESSION_HEADER: &str = "x-session-id";

/// Sessions untouched for this long are dropped.
pub const DEFAULT_SESSION_TTL: Duration = Duration::from_secs(24 * 60 * 60);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SessionId(pub Uuid);

#[derive(Debug, Clone, Default)]
pub struct SessionState {
    pub receipt_draft: Option<ReceiptDraft>,
    pub suggested_menu: Option<String>,
}

struct Entry {
    state: SessionState,
    last_seen: Instant,
}

/// Per-browser state that is not persisted: the receipt draft under review
/// and the most recent menu suggestion.
///
/// An entry is created only when something is stored in it. Entries idle for
/// longer than the TTL are swept whenever a new one is created.
#[derive(Clone)]
pub struct SessionStore {
    inner: Arc<Mutex<HashMap<Uuid, Entry>>>,
    ttl: Duration,
}

impl Default for SessionStore {
    fn default() -> Self {
        Self::with_ttl(DEFAULT_SESSION_TTL)
    }
}

impl SessionStore {
    pub fn with_ttl(ttl: Duration) -> Self {
        Self {
            inner: Arc::new(Mutex::new(HashMap::new())),
            ttl,
        }
    }

    /// Snapshot of a session; unknown or expired sessions read as empty.
    pub async fn get(&self, id: SessionId) -> SessionState {
        let mut sessions = self.inner.lock().await;
        match sessions.get_mut(&id.0) {
            Some(entry) if entry.last_seen.elapsed() < self.ttl => {
                entry.last_seen = Instant::now();
                entry.state.clone()
            }
            _ => SessionState::default(),
        }
    }

    /// Run `f` against the session, creating it on first use.
    pub async fn update<T>(&self, id: SessionId, f: impl FnOnce(&mut SessionState) -> T) -> T {
        let mut sessions = self.inner.lock().await;
        if !sessions.contains_key(&id.0) {
            let before = sessions.len();
            sessions.retain(|_, e| e.last_seen.elapsed() < self.ttl);
            if sessions.len() < before {
                tracing::debug!(expired = before - sessions.len(), "Swept idle sessions");
            }
        }
        let entry = sessions.entry(id.0).or_insert_with(|| Entry {
            state: SessionState::default(),
            last_seen: Instant::now(),
        });
        if entry.last_seen.elapsed() >= self.ttl {
            entry.state = SessionState::default();
        }
        entry.last_seen = Instant::now();
        f(&mut entry.state)
    }

    /// Run `f` against an existing live session. Returns `None`, and creates
    /// nothing, when the session is unknown or expired.
    pub async fn update_existing<T>(
        &self,
        id: SessionId,
        f: impl FnOnce(&mut SessionState) -> T,
    ) -> Option<T> {
        let mut sessions = self.inner.lock().await;
        let entry = sessions.get_mut(&id.0)?;
        if entry.last_seen.elapsed() >= self.ttl {
            sessions.remove(&id.0);
            return None;
        }
        entry.last_seen = Instant::now();
        Some(f(&mut entry.state))
    }

    /// Number of sessions currently held, expired ones included until swept.
    pub async fn len(&self) -> usize {
        self.inner.lock().await.len()
    }
}

/// Reads the session id header, minting a fresh id when it is absent or
/// malformed, and echoes it on the response.
pub async fn session_layer(mut req: Request, next: Next) -> Response {
    let id = req
        .headers()
        .get(SESSION_HEADER)
        .and_then(|h| h.to_str().ok())
        .and_then(|s| Uuid::parse_str(s.trim()).ok())
        .unwrap_or_else(|| {
            let id = Uuid::new_v4();
            tracing::debug!(session = %id, "Started new session");
            id
        });

    req.extensions_mut().insert(SessionId(id));
    let mut response = next.run(req).await;
    if let Ok(value) = HeaderValue::from_str(&id.to_string()) {
        response.headers_mut().insert(SESSION_HEADER, value);
    }
    response
}
