//! One-shot archive delivery.

use bytes::Bytes;
use http::header::{CACHE_CONTROL, CONTENT_DISPOSITION, CONTENT_LENGTH, CONTENT_TYPE, EXPIRES, PRAGMA};
use http::HeaderValue;
use http_body_util::Full;
use hyper::{Response, StatusCode};
use tracing::debug;

use super::HttpResponse;
use crate::core::{Error, Result};
use crate::forge::TempArchive;

pub static APPLICATION_ZIP: HeaderValue = HeaderValue::from_static("application/zip");
pub static NO_CACHE_REVALIDATE: HeaderValue = HeaderValue::from_static("no-cache, must-revalidate");
pub static PRAGMA_NO_CACHE: HeaderValue = HeaderValue::from_static("no-cache");
pub static EXPIRES_NOW: HeaderValue = HeaderValue::from_static("0");

/// Read the archive, delete it, and build the download response.
///
/// The archive file is gone by the time this returns, whatever the outcome.
pub fn archive_response(archive: TempArchive, download_name: &str) -> Result<HttpResponse> {
    let bytes = archive.read()?;
    let path = archive.path().display().to_string();
    drop(archive);
    debug!(path = %path, bytes = bytes.len(), "temp archive delivered and removed");

    let disposition = HeaderValue::from_str(&format!(
        "attachment; filename=\"{}\"",
        download_name
    ))
    .map_err(|e| Error::Archive {
        code: "ZIP_SEND",
        message: e.to_string(),
    })?;

    let len = bytes.len();
    let mut response = Response::new(Full::new(Bytes::from(bytes)));
    *response.status_mut() = StatusCode::OK;

    let headers = response.headers_mut();
    headers.insert(CONTENT_TYPE, APPLICATION_ZIP.clone());
    headers.insert(CONTENT_DISPOSITION, disposition);
    headers.insert(CONTENT_LENGTH, HeaderValue::from(len));
    headers.insert(CACHE_CONTROL, NO_CACHE_REVALIDATE.clone());
    headers.insert(PRAGMA, PRAGMA_NO_CACHE.clone());
    headers.insert(EXPIRES, EXPIRES_NOW.clone());

    Ok(response)
}
