//! HTTP response building.

pub mod download;

use bytes::Bytes;
use http::header::{ALLOW, CACHE_CONTROL, CONTENT_LENGTH, CONTENT_TYPE, LOCATION};
use http::HeaderValue;
use http_body_util::Full;
use hyper::{Response, StatusCode};

pub use download::archive_response;

/// Every response is fully buffered.
pub type HttpResponse = Response<Full<Bytes>>;

pub static EMPTY_BODY: Bytes = Bytes::from_static(b"");
pub static NOT_FOUND_BODY: Bytes = Bytes::from_static(b"Not Found");
pub static METHOD_NOT_ALLOWED_BODY: Bytes = Bytes::from_static(b"Method Not Allowed");

pub static TEXT_HTML_UTF8: HeaderValue = HeaderValue::from_static("text/html; charset=utf-8");
pub static TEXT_PLAIN_UTF8: HeaderValue = HeaderValue::from_static("text/plain; charset=utf-8");
pub static NO_STORE: HeaderValue = HeaderValue::from_static("no-store");

/// Assemble a response from parts that are known to be valid.
fn build(status: StatusCode, content_type: &HeaderValue, body: Bytes) -> HttpResponse {
    let len = body.len();
    let mut response = Response::new(Full::new(body));
    *response.status_mut() = status;
    let headers = response.headers_mut();
    headers.insert(CONTENT_TYPE, content_type.clone());
    headers.insert(CONTENT_LENGTH, HeaderValue::from(len));
    response
}

/// HTML page that must not be cached (it embeds a one-time token).
pub fn html_response(status: StatusCode, html: String) -> HttpResponse {
    let mut response = build(status, &TEXT_HTML_UTF8, Bytes::from(html));
    response
        .headers_mut()
        .insert(CACHE_CONTROL, NO_STORE.clone());
    response
}

pub fn text_response(status: StatusCode, body: Bytes) -> HttpResponse {
    build(status, &TEXT_PLAIN_UTF8, body)
}

#[inline]
pub fn not_found_response() -> HttpResponse {
    text_response(StatusCode::NOT_FOUND, NOT_FOUND_BODY.clone())
}

pub fn method_not_allowed_response(allow: &'static str) -> HttpResponse {
    let mut response = text_response(
        StatusCode::METHOD_NOT_ALLOWED,
        METHOD_NOT_ALLOWED_BODY.clone(),
    );
    response
        .headers_mut()
        .insert(ALLOW, HeaderValue::from_static(allow));
    response
}

/// `303 See Other` to `location`.
pub fn redirect_response(location: &'static str) -> HttpResponse {
    let mut response = Response::new(Full::new(EMPTY_BODY.clone()));
    *response.status_mut() = StatusCode::SEE_OTHER;
    response
        .headers_mut()
        .insert(LOCATION, HeaderValue::from_static(location));
    response
}

/// Same status and headers, no body (for HEAD).
pub fn strip_body(response: HttpResponse) -> HttpResponse {
    let (parts, _) = response.into_parts();
    Response::from_parts(parts, Full::new(EMPTY_BODY.clone()))
}
