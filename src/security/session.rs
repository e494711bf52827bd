//! In-memory sessions keyed by a random cookie.

use std::collections::HashMap;
use std::sync::Mutex;
use std::time::{Duration, Instant};

use http::header::COOKIE;
use http::HeaderMap;
use rand::RngCore;
use tracing::debug;

use crate::config::DEFAULT_MAX_SESSIONS;

/// Session cookie name.
pub const SESSION_COOKIE: &str = "forge_session";

/// Identifier of the session a request was served from.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SessionHandle {
    pub id: String,
    /// The session did not exist before this request; send the cookie.
    pub created: bool,
}

struct Entry<T> {
    state: T,
    last_seen: Instant,
}

/// Session state store. Every access runs under one lock, so a closure
/// passed to [`SessionStore::with_session`] sees and mutates state atomically.
pub struct SessionStore<T> {
    sessions: Mutex<HashMap<String, Entry<T>>>,
    idle_ttl: Duration,
    max_sessions: usize,
}

impl<T: Default> SessionStore<T> {
    pub fn new(idle_ttl: Duration) -> Self {
        Self {
            sessions: Mutex::new(HashMap::new()),
            idle_ttl,
            max_sessions: DEFAULT_MAX_SESSIONS,
        }
    }

    /// Cap the number of live sessions (at least one).
    pub fn with_max_sessions(mut self, max: usize) -> Self {
        self.max_sessions = max.max(1);
        self
    }

    /// Run `f` on the session named by `id`, creating one when the id is
    /// absent, unknown or idle for too long.
    pub fn with_session<R>(
        &self,
        id: Option<&str>,
        now: Instant,
        f: impl FnOnce(&mut T) -> R,
    ) -> (SessionHandle, R) {
        let mut sessions = self.sessions.lock().unwrap_or_else(|e| e.into_inner());

        if let Some(id) = id {
            if let Some(entry) = sessions.get_mut(id) {
                if now.saturating_duration_since(entry.last_seen) < self.idle_ttl {
                    entry.last_seen = now;
                    let result = f(&mut entry.state);
                    let handle = SessionHandle {
                        id: id.to_string(),
                        created: false,
                    };
                    return (handle, result);
                }
            }
        }

        let before = sessions.len();
        let ttl = self.idle_ttl;
        sessions.retain(|_, e| now.saturating_duration_since(e.last_seen) < ttl);
        if sessions.len() < before {
            debug!(pruned = before - sessions.len(), "idle sessions removed");
        }

        while sessions.len() >= self.max_sessions {
            let oldest = sessions
                .iter()
                .min_by_key(|(_, e)| e.last_seen)
                .map(|(id, _)| id.clone());
            match oldest {
                Some(id) => {
                    sessions.remove(&id);
                    debug!("session cap reached, evicted least recently seen session");
                }
                None => break,
            }
        }

        let id = new_session_id();
        let mut entry = Entry {
            state: T::default(),
            last_seen: now,
        };
        let result = f(&mut entry.state);
        sessions.insert(id.clone(), entry);

        (SessionHandle { id, created: true }, result)
    }

    /// Run `f` only on an existing, live session.
    pub fn with_existing<R>(
        &self,
        id: &str,
        now: Instant,
        f: impl FnOnce(&mut T) -> R,
    ) -> Option<R> {
        let mut sessions = self.sessions.lock().unwrap_or_else(|e| e.into_inner());
        let entry = sessions.get_mut(id)?;
        if now.saturating_duration_since(entry.last_seen) >= self.idle_ttl {
            sessions.remove(id);
            return None;
        }
        entry.last_seen = now;
        Some(f(&mut entry.state))
    }

    pub fn len(&self) -> usize {
        self.sessions.lock().unwrap_or_else(|e| e.into_inner()).len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

fn new_session_id() -> String {
    let mut bytes = [0u8; 32];
    rand::thread_rng().fill_bytes(&mut bytes);
    hex::encode(bytes)
}

/// Session id from the request's `Cookie` headers.
pub fn session_id_from_headers(headers: &HeaderMap) -> Option<String> {
    headers
        .get_all(COOKIE)
        .iter()
        .filter_map(|v| v.to_str().ok())
        .flat_map(|v| v.split(';'))
        .filter_map(|pair| pair.trim().split_once('='))
        .find(|(name, _)| *name == SESSION_COOKIE)
        .map(|(_, value)| value.trim().to_string())
        .filter(|value| !value.is_empty())
}

/// `Set-Cookie` value for a session.
pub fn session_cookie(id: &str, secure: bool) -> String {
    let mut cookie = format!("{}={}; Path=/; HttpOnly; SameSite=Lax", SESSION_COOKIE, id);
    if secure {
        cookie.push_str("; Secure");
    }
    cookie
}
