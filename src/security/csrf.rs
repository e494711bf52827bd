//! One-time CSRF tokens bound to a session.
//!
//! Each session holds two slots. `current` is the token the next form
//! submission must carry; `pending` is staged after a successful check and
//! becomes `current` the next time a form is rendered. A token therefore
//! validates at most once.

use std::time::{Duration, Instant};

use rand::RngCore;
use subtle::ConstantTimeEq;
use tracing::debug;

use super::session::{SessionHandle, SessionStore};
use crate::config::SecurityConfig;
use crate::core::escape_html;

/// Form field carrying the token.
pub const TOKEN_FIELD: &str = "csrf_token";

/// Random bytes per token (hex encoded to twice as many characters).
pub const TOKEN_BYTES: usize = 32;

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct IssuedToken {
    pub value: String,
    pub issued_at: Instant,
}

impl IssuedToken {
    fn mint(now: Instant) -> Self {
        Self {
            value: generate_token(),
            issued_at: now,
        }
    }

    fn is_live(&self, ttl: Duration, now: Instant) -> bool {
        now.saturating_duration_since(self.issued_at) < ttl
    }
}

/// Fresh random hex token.
pub fn generate_token() -> String {
    let mut bytes = [0u8; TOKEN_BYTES];
    rand::thread_rng().fill_bytes(&mut bytes);
    hex::encode(bytes)
}

/// Per-session token state.
#[derive(Clone, Debug, Default)]
pub struct CsrfSlots {
    current: Option<IssuedToken>,
    pending: Option<IssuedToken>,
}

impl CsrfSlots {
    /// Token to embed in the next form.
    pub fn token(&mut self, ttl: Duration, now: Instant) -> String {
        if let Some(current) = &self.current {
            if current.is_live(ttl, now) {
                return current.value.clone();
            }
        }

        let token = match self.pending.take() {
            Some(pending) => IssuedToken {
                value: pending.value,
                issued_at: now,
            },
            None => IssuedToken::mint(now),
        };
        let value = token.value.clone();
        self.current = Some(token);
        value
    }

    /// Check a submitted token. A match consumes it and stages a successor.
    pub fn validate(&mut self, submitted: &str, now: Instant) -> bool {
        if submitted.is_empty() {
            return false;
        }

        // Age only matters when rendering; a stored token stays valid.
        let matches = match &self.current {
            Some(current) => bool::from(current.value.as_bytes().ct_eq(submitted.as_bytes())),
            None => false,
        };

        if matches {
            self.current = None;
            self.pending = Some(IssuedToken::mint(now));
        }
        matches
    }

    pub fn current(&self) -> Option<&IssuedToken> {
        self.current.as_ref()
    }

    pub fn pending(&self) -> Option<&IssuedToken> {
        self.pending.as_ref()
    }
}

/// Hidden form input carrying `token`.
pub fn token_field(token: &str) -> String {
    format!(
        r#"<input type="hidden" name="{}" value="{}">"#,
        TOKEN_FIELD,
        escape_html(token)
    )
}

/// CSRF protection over the session store.
pub struct CsrfProtection {
    sessions: SessionStore<CsrfSlots>,
    token_ttl: Duration,
}

impl CsrfProtection {
    pub fn new(token_ttl: Duration, session_ttl: Duration) -> Self {
        Self {
            sessions: SessionStore::new(session_ttl),
            token_ttl,
        }
    }

    pub fn from_config(config: &SecurityConfig) -> Self {
        Self {
            sessions: SessionStore::new(config.session_ttl)
                .with_max_sessions(config.max_sessions),
            token_ttl: config.csrf_ttl,
        }
    }

    /// Token for the session named by the request cookie, creating the
    /// session if needed.
    pub fn token(&self, session_id: Option<&str>) -> (SessionHandle, String) {
        self.token_at(session_id, Instant::now())
    }

    pub fn token_at(&self, session_id: Option<&str>, now: Instant) -> (SessionHandle, String) {
        let ttl = self.token_ttl;
        self.sessions
            .with_session(session_id, now, |slots| slots.token(ttl, now))
    }

    /// Hidden input for the session's token.
    pub fn token_field(&self, session_id: Option<&str>) -> (SessionHandle, String) {
        let (handle, token) = self.token(session_id);
        (handle, token_field(&token))
    }

    /// Validate a submitted token against an existing session.
    pub fn validate(&self, session_id: Option<&str>, submitted: &str) -> bool {
        self.validate_at(session_id, submitted, Instant::now())
    }

    pub fn validate_at(&self, session_id: Option<&str>, submitted: &str, now: Instant) -> bool {
        let Some(id) = session_id else {
            debug!("CSRF check without session cookie");
            return false;
        };

        self.sessions
            .with_existing(id, now, |slots| slots.validate(submitted, now))
            .unwrap_or(false)
    }

    pub fn session_count(&self) -> usize {
        self.sessions.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const HOUR: Duration = Duration::from_secs(3600);

    #[test]
    fn test_token_shape() {
        let token = generate_token();
        assert_eq!(token.len(), TOKEN_BYTES * 2);
        assert!(token.chars().all(|c| c.is_ascii_hexdigit()));
        assert_ne!(token, generate_token());
    }

    #[test]
    fn test_token_validates_once() {
        let mut slots = CsrfSlots::default();
        let now = Instant::now();
        let token = slots.token(HOUR, now);

        assert!(slots.validate(&token, now));
        assert!(!slots.validate(&token, now));
        assert!(slots.current().is_none());
        assert!(slots.pending().is_some());
    }

    #[test]
    fn test_pending_token_is_promoted() {
        let mut slots = CsrfSlots::default();
        let now = Instant::now();
        let first = slots.token(HOUR, now);
        assert!(slots.validate(&first, now));

        let staged = slots.pending().unwrap().value.clone();
        let next = slots.token(HOUR, now);
        assert_eq!(next, staged);
        assert_ne!(next, first);
        assert!(slots.validate(&next, now));
    }

    #[test]
    fn test_mismatch_keeps_state() {
        let mut slots = CsrfSlots::default();
        let now = Instant::now();
        let token = slots.token(HOUR, now);

        assert!(!slots.validate("deadbeef", now));
        assert!(!slots.validate("", now));
        assert!(slots.validate(&token, now));
    }

    #[test]
    fn test_stale_form_still_submits() {
        let mut slots = CsrfSlots::default();
        let start = Instant::now();
        let token = slots.token(HOUR, start);

        let later = start + HOUR * 2;
        assert!(slots.validate(&token, later));
        assert!(!slots.validate(&token, later));
    }

    #[test]
    fn test_expired_token_replaced_on_render() {
        let mut slots = CsrfSlots::default();
        let start = Instant::now();
        let token = slots.token(HOUR, start);

        let later = start + HOUR;
        let fresh = slots.token(HOUR, later);
        assert_ne!(fresh, token);
        assert!(!slots.validate(&token, later));
        assert!(slots.validate(&fresh, later));
    }

    #[test]
    fn test_repeated_renders_share_token() {
        let mut slots = CsrfSlots::default();
        let now = Instant::now();
        assert_eq!(slots.token(HOUR, now), slots.token(HOUR, now));
    }

    #[test]
    fn test_protection_requires_session() {
        let csrf = CsrfProtection::new(HOUR, Duration::from_secs(86400));
        let now = Instant::now();
        let (session, token) = csrf.token_at(None, now);
        assert!(session.created);

        assert!(!csrf.validate_at(None, &token, now));
        assert!(!csrf.validate_at(Some("other"), &token, now));
        assert!(csrf.validate_at(Some(&session.id), &token, now));
        assert!(!csrf.validate_at(Some(&session.id), &token, now));
    }

    #[test]
    fn test_protection_token_field() {
        let csrf = CsrfProtection::new(HOUR, Duration::from_secs(86400));
        let (session, field) = csrf.token_field(None);
        assert!(session.created);
        assert_eq!(csrf.session_count(), 1);

        let (again, token) = csrf.token(Some(&session.id));
        assert!(!again.created);
        assert_eq!(field, token_field(&token));
        assert_eq!(csrf.session_count(), 1);
    }

    #[test]
    fn test_from_config_caps_sessions() {
        let config = SecurityConfig {
            max_sessions: 3,
            ..SecurityConfig::default()
        };
        let csrf = CsrfProtection::from_config(&config);
        for _ in 0..10 {
            csrf.token(None);
        }
        assert_eq!(csrf.session_count(), 3);
    }

    #[test]
    fn test_token_field_markup() {
        assert_eq!(
            token_field("ab\"c"),
            r#"<input type="hidden" name="csrf_token" value="ab&quot;c">"#
        );
    }
}
