//! TCP server for the chat daemon.
//!
//! The server:
//! - Listens on a TCP socket for chat clients
//! - Spawns a LifecycleController for each connection
//! - Closes every live session on shutdown
//! - Supports graceful shutdown via CancellationToken
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────┐
//! │   ChatServer    │
//! │                 │
//! │   TcpListener   │
//! └───────┬─────────┘
//!         │ accept()
//!         ▼
//! ┌───────────────────┐     ┌─────────────────┐
//! │LifecycleController│────▶│  RegistryHandle │
//! │   (per client)    │     │                 │
//! └───────────────────┘     └─────────────────┘
//!         │                          ▲
//!         │ join / chat / leave      │ snapshot
//!         ▼                          │
//! ┌─────────────────┐                │
//! │   Broadcaster   │────────────────┘
//! └─────────────────┘
//! ```
//!
//! # Panic-Free Guarantees
//!
//! This module follows the project panic-free policy:
//! - No `.unwrap()`, `.expect()`, `panic!()`, `unreachable!()`, `todo!()`
//! - All fallible operations use `?`, pattern matching, or `unwrap_or`
//! - Server errors are logged and allow continued operation

mod lifecycle;

pub use lifecycle::{LifecycleController, TransportReader};

use std::net::SocketAddr;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

use tokio::net::{TcpListener, TcpStream};
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info};

use chatmsn_core::SessionId;

use crate::broadcast::Broadcaster;
use crate::config::ServerConfig;
use crate::registry::RegistryHandle;
use crate::session::Session;

/// TCP server accepting chat clients.
pub struct ChatServer {
    listener: TcpListener,

    /// Handle to the client registry
    registry: RegistryHandle,

    broadcaster: Broadcaster,

    /// Lines sent to each client before the name prompt
    banner: Arc<[String]>,

    /// Bound on each write to a session
    write_timeout: Duration,

    /// Cancellation token for graceful shutdown
    cancel_token: CancellationToken,

    /// Connection counter for generating session IDs
    connection_counter: AtomicU64,
}

impl ChatServer {
    /// Binds the listening socket.
    ///
    /// # Arguments
    ///
    /// * `config` - Listen address, banner and write timeout
    /// * `registry` - Handle to the client registry
    /// * `cancel_token` - Token for graceful shutdown
    ///
    /// # Errors
    ///
    /// - `ServerError::Bind` if the address is invalid or in use
    pub async fn bind(
        config: &ServerConfig,
        registry: RegistryHandle,
        cancel_token: CancellationToken,
    ) -> Result<Self, ServerError> {
        let address = config.listen_address();
        let listener = TcpListener::bind(&address)
            .await
            .map_err(|e| ServerError::Bind {
                address: address.clone(),
                error: e.to_string(),
            })?;

        Ok(Self {
            listener,
            broadcaster: Broadcaster::new(registry.clone()),
            registry,
            banner: config.banner.iter().cloned().collect(),
            write_timeout: config.write_timeout(),
            cancel_token,
            connection_counter: AtomicU64::new(0),
        })
    }

    /// Returns the bound address (useful when binding port 0).
    pub fn local_addr(&self) -> Result<SocketAddr, ServerError> {
        self.listener
            .local_addr()
            .map_err(|e| ServerError::LocalAddr(e.to_string()))
    }

    /// Broadcaster sharing this server's registry.
    pub fn broadcaster(&self) -> Broadcaster {
        self.broadcaster.clone()
    }

    /// Runs the server.
    ///
    /// Accepts connections until the cancellation token is triggered,
    /// then closes every live session.
    pub async fn run(&self) -> Result<(), ServerError> {
        info!(address = %self.local_addr()?, "Chat server listening");

        loop {
            tokio::select! {
                _ = self.cancel_token.cancelled() => {
                    info!("Server shutdown requested");
                    break;
                }

                result = self.listener.accept() => {
                    match result {
                        Ok((stream, peer_addr)) => {
                            let conn_num = self.connection_counter.fetch_add(1, Ordering::Relaxed);
                            self.handle_connection(stream, peer_addr, conn_num);
                        }
                        Err(e) => {
                            error!(error = %e, "Failed to accept connection");
                        }
                    }
                }
            }
        }

        self.cleanup().await;
        Ok(())
    }

    /// Handles a new client connection by spawning a lifecycle task.
    fn handle_connection(&self, stream: TcpStream, peer_addr: SocketAddr, connection_number: u64) {
        if let Err(e) = stream.set_nodelay(true) {
            debug!(peer = %peer_addr, error = %e, "Failed to set TCP_NODELAY");
        }

        let (reader, writer) = stream.into_split();
        let session = Arc::new(Session::new(
            SessionId::new(connection_number),
            peer_addr,
            writer,
            self.write_timeout,
        ));

        let controller = LifecycleController::new(
            session,
            reader,
            self.registry.clone(),
            self.broadcaster.clone(),
            Arc::clone(&self.banner),
        );

        tokio::spawn(async move {
            let reason = controller.run().await;
            debug!(
                connection = connection_number,
                reason = ?reason,
                "Connection task finished"
            );
        });
    }

    /// Closes every session still registered.
    ///
    /// Each lifecycle task wakes up, unregisters and announces its own
    /// departure to whoever is still connected.
    async fn cleanup(&self) {
        let sessions = self.registry.snapshot().await;
        let count = sessions.len();

        for session in sessions {
            session.close().await;
        }

        info!(closed = count, "Server cleanup complete");
    }
}

/// Errors that can occur in server operations.
#[derive(Debug, thiserror::Error)]
pub enum ServerError {
    #[error("Failed to bind {address}: {error}")]
    Bind { address: String, error: String },

    #[error("Failed to read local address: {0}")]
    LocalAddr(String),
}
