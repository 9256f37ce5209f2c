//! TCP listener and connection supervisor.

use crate::auth::ScramCredentials;
use crate::config::AuthConfig;
use crate::connection;
use crate::error::ServerError;
use reboltdb_storage::Storage;
use std::net::SocketAddr;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::net::TcpListener;
use tokio::sync::broadcast;

/// Server configuration.
#[derive(Debug, Clone)]
pub struct ServerConfig {
    /// Address to bind to.
    pub bind_addr: SocketAddr,
    /// Timeout applied to each handshake phase.
    pub handshake_timeout: Duration,
    /// Maximum concurrent connections.
    pub max_connections: usize,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind_addr: SocketAddr::from(([0, 0, 0, 0], reboltdb_protocol::DEFAULT_PORT)),
            handshake_timeout: Duration::from_secs(10),
            max_connections: 1024,
        }
    }
}

impl ServerConfig {
    pub fn new(bind_addr: SocketAddr) -> Self {
        Self {
            bind_addr,
            ..Default::default()
        }
    }
}

/// Server statistics.
#[derive(Debug, Default)]
pub struct ServerStats {
    pub connections_total: AtomicU64,
    pub connections_active: AtomicU64,
    pub errors_total: AtomicU64,
}

/// TCP server for reboltdb. Owns the storage handle for the process
/// lifetime; each accepted connection gets its own task and dispatcher.
pub struct Server {
    config: ServerConfig,
    credentials: Arc<ScramCredentials>,
    storage: Arc<Storage>,
    stats: Arc<ServerStats>,
    shutdown: broadcast::Sender<()>,
    running: AtomicBool,
}

impl Server {
    /// Creates a new server over the given storage handle.
    pub fn new(
        config: ServerConfig,
        auth: &AuthConfig,
        storage: Arc<Storage>,
    ) -> Result<Self, ServerError> {
        let credentials = Arc::new(ScramCredentials::from_config(auth)?);
        let (shutdown_tx, _) = broadcast::channel(1);
        Ok(Self {
            config,
            credentials,
            storage,
            stats: Arc::new(ServerStats::default()),
            shutdown: shutdown_tx,
            running: AtomicBool::new(false),
        })
    }

    /// Binds to the configured address and serves until shutdown.
    pub async fn run(&self) -> Result<(), ServerError> {
        let listener = TcpListener::bind(self.config.bind_addr).await?;
        self.run_with_listener(listener).await
    }

    /// Serves on an already-bound listener until shutdown.
    pub async fn run_with_listener(&self, listener: TcpListener) -> Result<(), ServerError> {
        self.running.store(true, Ordering::SeqCst);
        tracing::info!(
            "Listening for TCP connections on {}",
            listener.local_addr()?
        );

        let mut shutdown_rx = self.shutdown.subscribe();

        loop {
            tokio::select! {
                result = listener.accept() => {
                    match result {
                        Ok((stream, addr)) => self.accept(stream, addr),
                        Err(e) => {
                            tracing::error!("Accept error: {}", e);
                        }
                    }
                }
                _ = shutdown_rx.recv() => {
                    tracing::info!("Server shutting down");
                    break;
                }
            }
        }

        self.running.store(false, Ordering::SeqCst);
        Ok(())
    }

    fn accept(&self, stream: tokio::net::TcpStream, addr: SocketAddr) {
        if self.stats.connections_active.load(Ordering::Relaxed)
            >= self.config.max_connections as u64
        {
            tracing::warn!("Connection limit reached, rejecting {}", addr);
            return;
        }

        self.stats.connections_total.fetch_add(1, Ordering::Relaxed);
        self.stats.connections_active.fetch_add(1, Ordering::Relaxed);
        tracing::info!("Accepted connection from {}", addr);

        let credentials = self.credentials.clone();
        let storage = self.storage.clone();
        let stats = self.stats.clone();
        let handshake_timeout = self.config.handshake_timeout;
        let mut conn_shutdown = self.shutdown.subscribe();

        tokio::spawn(async move {
            let result = connection::handle_connection(
                stream,
                addr,
                credentials,
                storage,
                handshake_timeout,
                &mut conn_shutdown,
            )
            .await;

            match result {
                Ok(()) => {}
                Err(ServerError::ShuttingDown) => {
                    tracing::debug!("[{}] closed for shutdown", addr);
                }
                Err(err) => {
                    stats.errors_total.fetch_add(1, Ordering::Relaxed);
                    tracing::error!("[{}] connection error: {}", addr, err);
                }
            }

            stats.connections_active.fetch_sub(1, Ordering::Relaxed);
            tracing::info!("Client disconnected: {}", addr);
        });
    }

    /// Initiates server shutdown. In-flight connections are cancelled and
    /// their tokens released.
    pub fn shutdown(&self) {
        let _ = self.shutdown.send(());
    }

    /// Returns whether the server is running.
    pub fn is_running(&self) -> bool {
        self.running.load(Ordering::SeqCst)
    }

    /// Returns server statistics.
    pub fn stats(&self) -> &ServerStats {
        &self.stats
    }
}
