//! HTTP request body reading and form parsing.

mod multipart;
mod parser;

use bytes::Bytes;
use http::header::{CONTENT_LENGTH, CONTENT_TYPE};
use http::HeaderMap;
use http_body_util::{BodyExt, LengthLimitError, Limited};
use hyper::body::Body;

use crate::core::{Error, FieldSet, Result};

pub use multipart::parse_multipart;
pub use parser::{form_decode, parse_urlencoded};

/// Largest accepted form body.
pub const MAX_BODY_SIZE: usize = 64 * 1024;

/// Read a request body, refusing anything over `limit` bytes.
pub async fn read_body<B>(headers: &HeaderMap, body: B, limit: usize) -> Result<Bytes>
where
    B: Body,
    B::Error: std::error::Error + Send + Sync + 'static,
{
    let declared = headers
        .get(CONTENT_LENGTH)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.parse::<u64>().ok());
    if declared.is_some_and(|len| len > limit as u64) {
        return Err(Error::PayloadTooLarge { limit });
    }

    match Limited::new(body, limit).collect().await {
        Ok(collected) => Ok(collected.to_bytes()),
        Err(e) if e.downcast_ref::<LengthLimitError>().is_some() => {
            Err(Error::PayloadTooLarge { limit })
        }
        Err(e) => Err(Error::BadRequest(format!("failed to read body: {}", e))),
    }
}

/// Decode a form body according to its content type.
pub async fn parse_form(headers: &HeaderMap, body: Bytes) -> Result<FieldSet> {
    let content_type = headers
        .get(CONTENT_TYPE)
        .and_then(|v| v.to_str().ok())
        .unwrap_or("");
    let mime = content_type
        .split(';')
        .next()
        .unwrap_or("")
        .trim()
        .to_ascii_lowercase();

    let pairs = match mime.as_str() {
        "application/x-www-form-urlencoded" | "" => {
            let text = std::str::from_utf8(&body)
                .map_err(|_| Error::BadRequest("form body is not valid UTF-8".to_string()))?;
            parse_urlencoded(text)
        }
        "multipart/form-data" => parse_multipart(content_type, body)
            .await
            .map_err(Error::BadRequest)?,
        other => {
            return Err(Error::BadRequest(format!(
                "unsupported content type '{}'",
                other
            )))
        }
    };

    Ok(pairs.into_iter().collect())
}
