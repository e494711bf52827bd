//! Error responses.
//!
//! Every failure of a request ends up here. Browsers get a small HTML page
//! with the escaped message and a link back to the form; other clients get
//! the message as plain text.

use bytes::Bytes;
use http::header::RETRY_AFTER;
use http::HeaderValue;
use hyper::StatusCode;

use super::response::{html_response, text_response, HttpResponse};
use super::routing::FORM_PATH;
use crate::core::{escape_html, nl2br, Error};

/// Get the default reason phrase for an HTTP status code.
#[inline]
pub fn status_reason_phrase(status: u16) -> &'static str {
    match status {
        400 => "Bad Request",
        403 => "Forbidden",
        404 => "Not Found",
        405 => "Method Not Allowed",
        408 => "Request Timeout",
        413 => "Payload Too Large",
        415 => "Unsupported Media Type",
        422 => "Unprocessable Entity",
        429 => "Too Many Requests",
        500 => "Internal Server Error",
        502 => "Bad Gateway",
        503 => "Service Unavailable",
        504 => "Gateway Timeout",
        _ => "Error",
    }
}

/// Check if the Accept header includes text/html.
#[inline]
pub fn accepts_html(accept_header: &str) -> bool {
    if accept_header.is_empty() {
        return false;
    }

    if accept_header == "*/*" || accept_header.starts_with("text/html") {
        return true;
    }

    accept_header
        .split(',')
        .map(|part| part.split(';').next().unwrap_or("").trim())
        .any(|mime| mime == "text/html" || mime == "text/*" || mime == "*/*")
}

/// Error page HTML for `message`.
pub fn render_error(status: StatusCode, message: &str) -> String {
    let title = status_reason_phrase(status.as_u16());
    format!(
        "<!DOCTYPE html>\n\
         <html lang=\"en\">\n\
         <head>\n\
         <meta charset=\"UTF-8\">\n\
         <meta name=\"viewport\" content=\"width=device-width, initial-scale=1.0\">\n\
         <title>{title} - WordPress Plugin Generator</title>\n\
         </head>\n\
         <body>\n\
         <h1>An error occurred</h1>\n\
         <div class=\"error\">{message}</div>\n\
         <p><a href=\"{back}\">&larr; Back to the form</a></p>\n\
         </body>\n\
         </html>\n",
        title = title,
        message = nl2br(&escape_html(message)),
        back = FORM_PATH,
    )
}

/// Response for a failed request.
pub fn error_response(err: &Error, wants_html: bool) -> HttpResponse {
    let status = err.status();
    let message = err.public_message();

    let mut response = if wants_html {
        html_response(status, render_error(status, &message))
    } else {
        text_response(status, Bytes::from(message))
    };

    if let Error::RateLimited { retry_after } = err {
        response
            .headers_mut()
            .insert(RETRY_AFTER, HeaderValue::from(*retry_after));
    }

    response
}
