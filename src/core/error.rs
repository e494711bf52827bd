//! Core error types.

use std::fmt;
use std::path::PathBuf;

use http::StatusCode;

use crate::forge::ValidationErrors;

/// Generic text shown to users for failures whose details stay in the logs.
pub const GENERIC_FAILURE_MESSAGE: &str =
    "An error occurred while generating the plugin. Please try again later.";

/// Every way a generation request can fail.
#[derive(Debug)]
pub enum Error {
    /// Missing or mismatched CSRF token.
    InvalidCsrfToken,

    /// Too many requests from one client.
    RateLimited { retry_after: u64 },

    /// Submitted fields failed validation.
    Validation(ValidationErrors),

    /// Template root is missing or not a directory.
    TemplateMissing(PathBuf),

    /// The template walk produced no files.
    EmptyOutput,

    /// Archive could not be created or written.
    Archive { code: &'static str, message: String },

    /// Malformed request body.
    BadRequest(String),

    /// Request body over the accepted size.
    PayloadTooLarge { limit: usize },

    /// Request took longer than the configured timeout.
    Timeout { duration_ms: u64 },

    /// I/O error.
    Io(std::io::Error),

    /// Rate limit record could not be encoded.
    Json(serde_json::Error),
}

impl Error {
    /// HTTP status used when rendering this error.
    pub fn status(&self) -> StatusCode {
        match self {
            Error::InvalidCsrfToken => StatusCode::FORBIDDEN,
            Error::RateLimited { .. } => StatusCode::TOO_MANY_REQUESTS,
            Error::Validation(_) => StatusCode::UNPROCESSABLE_ENTITY,
            Error::BadRequest(_) => StatusCode::BAD_REQUEST,
            Error::PayloadTooLarge { .. } => StatusCode::PAYLOAD_TOO_LARGE,
            Error::Timeout { .. } => StatusCode::GATEWAY_TIMEOUT,
            Error::TemplateMissing(_)
            | Error::EmptyOutput
            | Error::Archive { .. }
            | Error::Io(_)
            | Error::Json(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// Message safe to show to the user.
    ///
    /// Environment failures collapse to a generic text.
    pub fn public_message(&self) -> String {
        match self {
            Error::InvalidCsrfToken => {
                "Invalid security token. Refresh the page and try again.".to_string()
            }
            Error::RateLimited { retry_after } => format!(
                "Too many requests. Try again in {} seconds.",
                retry_after
            ),
            Error::Validation(errors) => errors.to_string(),
            Error::BadRequest(msg) => format!("The submitted form could not be read: {}", msg),
            Error::PayloadTooLarge { limit } => {
                format!("The submitted form is larger than {} bytes.", limit)
            }
            Error::Timeout { .. } => "Generating the plugin took too long.".to_string(),
            Error::EmptyOutput => "Failed to generate the plugin files.".to_string(),
            Error::TemplateMissing(_) | Error::Archive { .. } | Error::Io(_) | Error::Json(_) => {
                GENERIC_FAILURE_MESSAGE.to_string()
            }
        }
    }

    /// Security rejections (CSRF, rate limit).
    pub fn is_security_rejection(&self) -> bool {
        matches!(self, Error::InvalidCsrfToken | Error::RateLimited { .. })
    }
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Error::InvalidCsrfToken => write!(f, "invalid CSRF token"),
            Error::RateLimited { retry_after } => {
                write!(f, "rate limit exceeded, retry after {}s", retry_after)
            }
            Error::Validation(errors) => write!(f, "validation failed: {} error(s)", errors.len()),
            Error::TemplateMissing(path) => {
                write!(f, "template directory not found: {}", path.display())
            }
            Error::EmptyOutput => write!(f, "generator produced no files"),
            Error::Archive { code, message } => {
                write!(f, "archive error [{}]: {}", code, message)
            }
            Error::BadRequest(msg) => write!(f, "bad request: {}", msg),
            Error::PayloadTooLarge { limit } => write!(f, "payload exceeds {} bytes", limit),
            Error::Timeout { duration_ms } => write!(f, "request timeout after {}ms", duration_ms),
            Error::Io(e) => write!(f, "I/O error: {}", e),
            Error::Json(e) => write!(f, "JSON error: {}", e),
        }
    }
}

impl std::error::Error for Error {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Error::Io(e) => Some(e),
            Error::Json(e) => Some(e),
            _ => None,
        }
    }
}

impl From<std::io::Error> for Error {
    fn from(e: std::io::Error) -> Self {
        Error::Io(e)
    }
}

impl From<serde_json::Error> for Error {
    fn from(e: serde_json::Error) -> Self {
        Error::Json(e)
    }
}

impl From<ValidationErrors> for Error {
    fn from(errors: ValidationErrors) -> Self {
        Error::Validation(errors)
    }
}

/// Result type alias for core operations.
pub type Result<T> = std::result::Result<T, Error>;
