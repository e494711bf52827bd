//! HTTP front end of the plugin generator.
//!
//! [`Server::bind`] opens one listening socket per accept loop (all sharing
//! the port through `SO_REUSEPORT`) and builds the shared [`AppState`].
//! [`Server::run`] drives the accept loops until [`Server::trigger_shutdown`]
//! is called.
//!
//! # Example
//!
//! ```rust,ignore
//! use plugin_forge::{Config, Server};
//!
//! let server = Server::bind(Config::from_env()?)?;
//! tokio::select! {
//!     result = server.run() => result?,
//!     _ = tokio::signal::ctrl_c() => server.trigger_shutdown(),
//! }
//! server.wait_for_drain(server.drain_timeout()).await;
//! ```
//!
//! # Routes
//!
//! | Method | Path | Response |
//! |--------|------|----------|
//! | `GET`, `HEAD` | `/` | Generator form with a CSRF token |
//! | `POST` | `/generate` | ZIP download or an error page |
//! | `GET` | `/generate` | `303` back to the form |

pub mod connection;
pub mod error_pages;
pub mod handlers;
mod pages;
pub mod request;
pub mod response;
mod routing;

use std::io::BufReader;
use std::net::SocketAddr;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use socket2::{Domain, Protocol, SockRef, Socket, TcpKeepalive, Type};
use tokio::net::TcpListener;
use tokio::sync::watch;
use tokio_rustls::rustls::pki_types::CertificateDer;
use tokio_rustls::rustls::ServerConfig as RustlsConfig;
use tokio_rustls::TlsAcceptor;
use tracing::{debug, error, info, warn};

use crate::config::{Config, ServerConfig, TlsConfig};
use connection::{log_accept_error, ConnectionContext};
pub use handlers::AppState;

type BoxError = Box<dyn std::error::Error + Send + Sync>;

/// The generator's HTTP server.
pub struct Server {
    config: ServerConfig,
    local_addr: SocketAddr,
    listeners: Mutex<Vec<std::net::TcpListener>>,
    context: Arc<ConnectionContext>,
    tls_acceptor: Option<TlsAcceptor>,
    active_connections: Arc<AtomicUsize>,
    shutdown_tx: watch::Sender<bool>,
    shutdown_rx: watch::Receiver<bool>,
    shutdown_initiated: AtomicBool,
}

impl Server {
    /// Build application state and bind the listening sockets.
    ///
    /// Binding happens here rather than in [`Server::run`] so that a port of
    /// `0` resolves to a concrete address before any client connects.
    pub fn bind(config: Config) -> Result<Self, BoxError> {
        let app = Arc::new(AppState::new(config.generator, &config.security)?);

        let tls_acceptor = if config.server.tls.is_enabled() {
            let tls_config = Self::load_tls_config(&config.server.tls)?;
            info!("TLS enabled with ALPN: h2, http/1.1");
            Some(TlsAcceptor::from(Arc::new(tls_config)))
        } else {
            None
        };

        let workers = config.server.worker_count();
        let first = Self::create_reuse_port_listener(config.server.listen_addr)?;
        let local_addr = first.local_addr()?;

        let mut listeners = Vec::with_capacity(workers);
        listeners.push(first);
        // The remaining loops share the port the first socket resolved to.
        #[cfg(unix)]
        for _ in 1..workers {
            listeners.push(Self::create_reuse_port_listener(local_addr)?);
        }

        let active_connections = Arc::new(AtomicUsize::new(0));
        let context = Arc::new(ConnectionContext {
            app,
            active_connections: Arc::clone(&active_connections),
            request_timeout: config.server.request_timeout,
            access_log_enabled: config.logging.access_log,
        });

        let (shutdown_tx, shutdown_rx) = watch::channel(false);

        Ok(Self {
            config: config.server,
            local_addr,
            listeners: Mutex::new(listeners),
            context,
            tls_acceptor,
            active_connections,
            shutdown_tx,
            shutdown_rx,
            shutdown_initiated: AtomicBool::new(false),
        })
    }

    /// Address the server is actually listening on.
    pub fn local_addr(&self) -> SocketAddr {
        self.local_addr
    }

    /// Get current active connections count.
    pub fn active_connections(&self) -> usize {
        self.active_connections.load(Ordering::Relaxed)
    }

    fn load_tls_config(tls: &TlsConfig) -> Result<RustlsConfig, BoxError> {
        let cert_path = tls.cert_path.as_ref().ok_or("TLS cert path not set")?;
        let key_path = tls.key_path.as_ref().ok_or("TLS key path not set")?;

        let mut cert_reader = BufReader::new(std::fs::File::open(cert_path)?);
        let certs: Vec<CertificateDer<'static>> = rustls_pemfile::certs(&mut cert_reader)
            .filter_map(|r| r.ok())
            .collect();

        if certs.is_empty() {
            return Err("No certificates found in cert file".into());
        }

        let mut key_reader = BufReader::new(std::fs::File::open(key_path)?);
        let key = rustls_pemfile::private_key(&mut key_reader)?
            .ok_or("No private key found in key file")?;

        let mut tls_config = RustlsConfig::builder()
            .with_no_client_auth()
            .with_single_cert(certs, key)?;
        tls_config.alpn_protocols = vec![b"h2".to_vec(), b"http/1.1".to_vec()];

        Ok(tls_config)
    }

    /// Creates a socket with SO_REUSEPORT for multi-threaded accept.
    fn create_reuse_port_listener(addr: SocketAddr) -> std::io::Result<std::net::TcpListener> {
        let domain = if addr.is_ipv6() {
            Domain::IPV6
        } else {
            Domain::IPV4
        };

        let socket = Socket::new(domain, Type::STREAM, Some(Protocol::TCP))?;
        socket.set_reuse_address(true)?;
        #[cfg(unix)]
        socket.set_reuse_port(true)?;

        socket.set_nonblocking(true)?;
        socket.bind(&addr.into())?;
        socket.listen(1024)?;

        Ok(socket.into())
    }

    /// Run the accept loops until shutdown is triggered.
    ///
    /// The bound sockets are consumed; a second call returns immediately.
    pub async fn run(&self) -> Result<(), BoxError> {
        let listeners = self
            .listeners
            .lock()
            .map(|mut guard| std::mem::take(&mut *guard))
            .map_err(|_| "listener lock poisoned")?;

        if listeners.is_empty() {
            warn!("Server::run called without bound listeners");
            return Ok(());
        }

        let protocol = if self.tls_acceptor.is_some() {
            "https"
        } else {
            "http"
        };
        info!(
            "Server listening on {}://{} (workers: {})",
            protocol,
            self.local_addr,
            listeners.len()
        );

        let mut handles = Vec::with_capacity(listeners.len());

        for (worker_id, std_listener) in listeners.into_iter().enumerate() {
            let listener = TcpListener::from_std(std_listener)?;
            let ctx = Arc::clone(&self.context);
            let tls_acceptor = self.tls_acceptor.clone();
            let mut shutdown_rx = self.shutdown_rx.clone();

            let handle = tokio::spawn(async move {
                debug!("Worker {} started", worker_id);

                loop {
                    tokio::select! {
                        result = listener.accept() => {
                            let (stream, remote_addr) = match result {
                                Ok(conn) => conn,
                                Err(e) => {
                                    log_accept_error(worker_id, &e);
                                    continue;
                                }
                            };

                            let _ = stream.set_nodelay(true);

                            let keepalive = TcpKeepalive::new()
                                .with_time(Duration::from_secs(5))
                                .with_interval(Duration::from_secs(1))
                                .with_retries(3);
                            let _ = SockRef::from(&stream).set_tcp_keepalive(&keepalive);

                            let ctx = Arc::clone(&ctx);
                            let tls = tls_acceptor.clone();
                            tokio::spawn(async move {
                                ctx.handle_connection(stream, remote_addr, tls).await;
                            });
                        }
                        _ = shutdown_rx.changed() => {
                            debug!("Worker {} received shutdown signal, stopping accept loop", worker_id);
                            break;
                        }
                    }
                }
            });

            handles.push(handle);
        }

        for handle in handles {
            if let Err(e) = handle.await {
                error!("Accept loop panicked: {}", e);
            }
        }

        Ok(())
    }

    /// Trigger graceful shutdown.
    /// Signals all workers to stop accepting new connections.
    pub fn trigger_shutdown(&self) {
        if self.shutdown_initiated.swap(true, Ordering::SeqCst) {
            return;
        }
        let _ = self.shutdown_tx.send(true);
    }

    /// Get the configured drain timeout.
    pub fn drain_timeout(&self) -> Duration {
        self.config.drain_timeout
    }

    /// Wait for all active connections to drain.
    /// Returns true if drained successfully, false if timeout was reached.
    pub async fn wait_for_drain(&self, timeout: Duration) -> bool {
        let start = std::time::Instant::now();
        let check_interval = Duration::from_millis(100);

        loop {
            let active = self.active_connections.load(Ordering::Relaxed);
            if active == 0 {
                return true;
            }

            if start.elapsed() >= timeout {
                warn!("Drain timeout reached with {} active connections", active);
                return false;
            }

            debug!("Waiting for {} connections to drain...", active);
            tokio::time::sleep(check_interval).await;
        }
    }
}
