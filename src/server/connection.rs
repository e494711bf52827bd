//! TCP/TLS connection handling and the per-request pipeline.

use std::convert::Infallible;
use std::net::{IpAddr, SocketAddr};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, LazyLock};
use std::time::{Duration, Instant};

use http::header::{HeaderName, HeaderValue, ACCEPT, USER_AGENT};
use hyper::body::{Body, Incoming as IncomingBody};
use hyper::service::service_fn;
use hyper::{Method, Request};
use hyper_util::rt::{TokioExecutor, TokioIo, TokioTimer};
use hyper_util::server::conn::auto;
use tokio::net::TcpStream;
use tokio_rustls::TlsAcceptor;
use tracing::{debug, error, info, warn};
use uuid::Uuid;

use super::error_pages::{accepts_html, error_response};
use super::handlers::AppState;
use super::request::{read_body, MAX_BODY_SIZE};
use super::response::{
    method_not_allowed_response, not_found_response, redirect_response, strip_body, HttpResponse,
};
use super::routing::{resolve, Route, FORM_PATH};
use crate::config::RequestTimeout;
use crate::core::Error;
use crate::logging::{log_access, AccessEntry};
use crate::security::client_ip;

static X_REQUEST_ID: LazyLock<HeaderName> =
    LazyLock::new(|| HeaderName::from_static("x-request-id"));

/// How long a client may take to send request headers.
const HEADER_TIMEOUT: Duration = Duration::from_secs(5);

/// TLS handshake limit.
const TLS_HANDSHAKE_TIMEOUT: Duration = Duration::from_secs(10);

/// Longest client-supplied request id echoed back.
const MAX_REQUEST_ID_LEN: usize = 128;

mod http_versions {
    pub const HTTP_10: &str = "HTTP/1.0";
    pub const HTTP_11: &str = "HTTP/1.1";
    pub const HTTP_20: &str = "HTTP/2.0";

    #[inline]
    pub fn from_hyper(version: hyper::Version) -> &'static str {
        match version {
            hyper::Version::HTTP_10 => HTTP_10,
            hyper::Version::HTTP_2 => HTTP_20,
            _ => HTTP_11,
        }
    }
}

/// Check if an error is a common connection reset or timeout.
#[inline]
fn is_connection_error(err_str: &str) -> bool {
    err_str.contains("connection reset")
        || err_str.contains("broken pipe")
        || err_str.contains("Connection reset")
        || err_str.contains("os error 104")
        || err_str.contains("os error 32")
        || err_str.contains("timed out")
        || err_str.contains("HeaderTimeout")
}

/// Request id from the client if it is sane, else a fresh UUID.
fn request_id(req: &Request<IncomingBody>) -> HeaderValue {
    req.headers()
        .get(&*X_REQUEST_ID)
        .filter(|v| !v.is_empty() && v.len() <= MAX_REQUEST_ID_LEN && v.to_str().is_ok())
        .cloned()
        .unwrap_or_else(|| {
            HeaderValue::from_str(&Uuid::new_v4().to_string())
                .unwrap_or_else(|_| HeaderValue::from_static("-"))
        })
}

/// Connection handler context.
pub struct ConnectionContext {
    pub app: Arc<AppState>,
    pub active_connections: Arc<AtomicUsize>,
    pub request_timeout: RequestTimeout,
    pub access_log_enabled: bool,
}

impl ConnectionContext {
    /// Handle an incoming TCP connection (with optional TLS).
    pub async fn handle_connection(
        self: Arc<Self>,
        stream: TcpStream,
        remote_addr: SocketAddr,
        tls_acceptor: Option<TlsAcceptor>,
    ) {
        self.active_connections.fetch_add(1, Ordering::Relaxed);

        match tls_acceptor {
            Some(acceptor) => {
                match tokio::time::timeout(TLS_HANDSHAKE_TIMEOUT, acceptor.accept(stream)).await {
                    Ok(Ok(tls_stream)) => {
                        Arc::clone(&self)
                            .serve(TokioIo::new(tls_stream), remote_addr)
                            .await
                    }
                    Ok(Err(e)) => debug!("TLS handshake failed: {:?}", e),
                    Err(_) => debug!("TLS handshake timeout: {:?}", remote_addr),
                }
            }
            None => {
                Arc::clone(&self)
                    .serve(TokioIo::new(stream), remote_addr)
                    .await
            }
        }

        self.active_connections.fetch_sub(1, Ordering::Relaxed);
    }

    async fn serve<I>(self: Arc<Self>, io: I, remote_addr: SocketAddr)
    where
        I: hyper::rt::Read + hyper::rt::Write + Unpin + Send + 'static,
    {
        let ctx = Arc::clone(&self);
        let service = service_fn(move |req| {
            let ctx = Arc::clone(&ctx);
            async move { ctx.handle_request(req, remote_addr).await }
        });

        if let Err(err) = auto::Builder::new(TokioExecutor::new())
            .http1()
            .timer(TokioTimer::new())
            .header_read_timeout(Some(HEADER_TIMEOUT))
            .keep_alive(true)
            .http2()
            .max_concurrent_streams(250)
            .serve_connection(io, service)
            .await
        {
            let err_str = format!("{:?}", err);
            if !is_connection_error(&err_str) {
                debug!("Connection error: {:?}", err);
            }
        }
    }

    async fn handle_request(
        &self,
        req: Request<IncomingBody>,
        remote_addr: SocketAddr,
    ) -> Result<HttpResponse, Infallible> {
        let request_start = Instant::now();
        let request_id = request_id(&req);

        let method = req.method().clone();
        let path = req.uri().path().to_string();
        let http_version = http_versions::from_hyper(req.version());
        let client = client_ip::resolve(req.headers(), Some(remote_addr.ip()));
        let wants_html = req
            .headers()
            .get(ACCEPT)
            .and_then(|v| v.to_str().ok())
            .map(accepts_html)
            .unwrap_or(false);
        let user_agent = if self.access_log_enabled {
            req.headers()
                .get(USER_AGENT)
                .and_then(|v| v.to_str().ok())
                .map(|s| s.to_string())
        } else {
            None
        };

        let result = match self.request_timeout.as_duration() {
            Some(limit) => match tokio::time::timeout(limit, self.dispatch(req, client)).await {
                Ok(result) => result,
                Err(_) => Err(Error::Timeout {
                    duration_ms: limit.as_millis() as u64,
                }),
            },
            None => self.dispatch(req, client).await,
        };

        let mut response = match result {
            Ok(response) => response,
            Err(err) => {
                let rid = request_id.to_str().unwrap_or("-");
                // Security rejections are logged where they happen.
                if err.status().is_server_error() {
                    error!(request_id = rid, path = %path, error = %err, "request failed");
                } else if !err.is_security_rejection() {
                    info!(request_id = rid, path = %path, error = %err, "request rejected");
                }
                error_response(&err, wants_html)
            }
        };

        if method == Method::HEAD {
            response = strip_body(response);
        }

        response
            .headers_mut()
            .insert(X_REQUEST_ID.clone(), request_id.clone());

        if self.access_log_enabled {
            let client_str = client.to_string();
            log_access(&AccessEntry {
                request_id: request_id.to_str().unwrap_or("-"),
                ip: &client_str,
                method: method.as_str(),
                path: &path,
                http: http_version,
                status: response.status().as_u16(),
                bytes: response.body().size_hint().exact().unwrap_or(0),
                duration_ms: request_start.elapsed().as_secs_f64() * 1000.0,
                ua: user_agent.as_deref(),
            });
        }

        Ok(response)
    }

    async fn dispatch(
        &self,
        req: Request<IncomingBody>,
        client: IpAddr,
    ) -> crate::core::Result<HttpResponse> {
        match resolve(req.method(), req.uri().path()) {
            Route::Form => Ok(self.app.form(req.headers())),
            Route::Generate => {
                let (parts, body) = req.into_parts();
                let body = read_body(&parts.headers, body, MAX_BODY_SIZE).await?;
                self.app.generate(&parts.headers, body, client).await
            }
            Route::RedirectToForm => Ok(redirect_response(FORM_PATH)),
            Route::MethodNotAllowed(allow) => Ok(method_not_allowed_response(allow)),
            Route::NotFound => Ok(not_found_response()),
        }
    }
}

/// Accept failures caused by the peer are noise; anything else is worth a warning.
pub(crate) fn log_accept_error(worker_id: usize, err: &std::io::Error) {
    if is_connection_error(&err.to_string()) {
        debug!("Worker {}: Accept error: {}", worker_id, err);
    } else {
        warn!("Worker {}: Accept error: {}", worker_id, err);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_http_versions_from_hyper() {
        assert_eq!(http_versions::from_hyper(hyper::Version::HTTP_10), "HTTP/1.0");
        assert_eq!(http_versions::from_hyper(hyper::Version::HTTP_11), "HTTP/1.1");
        assert_eq!(http_versions::from_hyper(hyper::Version::HTTP_2), "HTTP/2.0");
    }

    #[test]
    fn test_connection_errors() {
        assert!(is_connection_error("Connection reset by peer (os error 104)"));
        assert!(is_connection_error("broken pipe"));
        assert!(!is_connection_error("invalid HTTP method"));
    }
}
