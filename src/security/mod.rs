//! Request admission: rate limiting, CSRF tokens and sessions.

pub mod client_ip;
pub mod csrf;
pub mod rate_limit;
pub mod session;

pub use csrf::{CsrfProtection, CsrfSlots, TOKEN_FIELD};
pub use rate_limit::{RateLimitResult, RateLimiter};
pub use session::{session_cookie, session_id_from_headers, SessionHandle, SessionStore, SESSION_COOKIE};
