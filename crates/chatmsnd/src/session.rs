//! A single chat connection.
//!
//! The `Session` is shared (`Arc`) between its own lifecycle task, the
//! registry, the broadcaster and the admin console:
//! - the write half of the transport sits behind an async mutex so any
//!   task can deliver a line to it
//! - the read half is NOT stored here; the lifecycle controller owns it
//! - `kicked` and `closed` are atomics, the name is a set-once cell
//! - closing fires a cancellation token that unblocks the owner's read
//!
//! # Panic-Free Guarantees
//!
//! This module follows the project panic-free policy:
//! - No `.unwrap()`, `.expect()`, `panic!()`, `unreachable!()`, `todo!()`
//! - Write failures are returned as `SessionError`, never propagated as panics

use std::net::SocketAddr;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, OnceLock};
use std::time::Duration;

use chrono::{DateTime, Local};
use tokio::io::{AsyncWrite, AsyncWriteExt, BufWriter};
use tokio::sync::Mutex;
use tokio::time::timeout;
use tokio_util::sync::{CancellationToken, WaitForCancellationFuture};
use tracing::debug;

use chatmsn_core::SessionId;

/// Boxed write half of a session transport.
pub type TransportWriter = Box<dyn AsyncWrite + Send + Unpin>;

/// Shared reference to a session.
pub type SessionRef = Arc<Session>;

/// Identity fixed once the join handshake completes.
#[derive(Debug, Clone)]
pub struct JoinInfo {
    /// Display name, as sent by the client (trimmed)
    pub name: String,

    /// When the handshake completed
    pub connected_at: DateTime<Local>,
}

/// One active connection.
pub struct Session {
    id: SessionId,
    peer_addr: SocketAddr,

    /// Buffered write half, shared with every broadcaster
    writer: Mutex<BufWriter<TransportWriter>>,

    /// Bound on every write and on the final shutdown
    write_timeout: Duration,

    /// Set once, when the name arrives
    joined: OnceLock<JoinInfo>,

    kicked: AtomicBool,
    closed: AtomicBool,

    /// Cancelled when the transport is closed locally
    close_token: CancellationToken,
}

impl Session {
    /// Creates a session around the write half of a freshly accepted transport.
    pub fn new(
        id: SessionId,
        peer_addr: SocketAddr,
        writer: impl AsyncWrite + Send + Unpin + 'static,
        write_timeout: Duration,
    ) -> Self {
        let writer: TransportWriter = Box::new(writer);
        Self {
            id,
            peer_addr,
            writer: Mutex::new(BufWriter::new(writer)),
            write_timeout,
            joined: OnceLock::new(),
            kicked: AtomicBool::new(false),
            closed: AtomicBool::new(false),
            close_token: CancellationToken::new(),
        }
    }

    pub fn id(&self) -> SessionId {
        self.id
    }

    pub fn peer_addr(&self) -> SocketAddr {
        self.peer_addr
    }

    /// Display name, `None` until the join handshake completes.
    pub fn name(&self) -> Option<&str> {
        self.joined.get().map(|info| info.name.as_str())
    }

    /// When the join handshake completed.
    pub fn connected_at(&self) -> Option<DateTime<Local>> {
        self.joined.get().map(|info| info.connected_at)
    }

    /// Records the display name and connect time.
    ///
    /// Returns `false` if the session had already joined; the first
    /// name is kept.
    pub fn mark_joined(&self, name: String, connected_at: DateTime<Local>) -> bool {
        self.joined.set(JoinInfo { name, connected_at }).is_ok()
    }

    pub fn is_kicked(&self) -> bool {
        self.kicked.load(Ordering::SeqCst)
    }

    /// Flags the session as kicked.
    ///
    /// Must happen before `close()` so the lifecycle task sees the flag
    /// once its read is interrupted.
    pub fn mark_kicked(&self) {
        self.kicked.store(true, Ordering::SeqCst);
    }

    pub fn is_closed(&self) -> bool {
        self.closed.load(Ordering::SeqCst)
    }

    /// Resolves once the transport has been closed locally.
    pub fn closed(&self) -> WaitForCancellationFuture<'_> {
        self.close_token.cancelled()
    }

    /// Writes one line (a `\n` is appended) and flushes it.
    pub async fn send_line(&self, line: &str) -> Result<(), SessionError> {
        if self.is_closed() {
            return Err(SessionError::Closed);
        }

        let mut writer = self.writer.lock().await;

        match timeout(self.write_timeout, async {
            writer.write_all(line.as_bytes()).await?;
            writer.write_all(b"\n").await?;
            writer.flush().await?;
            Ok::<(), std::io::Error>(())
        })
        .await
        {
            Ok(Ok(())) => Ok(()),
            Ok(Err(e)) => Err(SessionError::Io(e.to_string())),
            Err(_) => Err(SessionError::WriteTimeout),
        }
    }

    /// Writes several lines under a single lock, flushing once.
    pub async fn send_lines(&self, lines: &[&str]) -> Result<(), SessionError> {
        if self.is_closed() {
            return Err(SessionError::Closed);
        }

        let mut writer = self.writer.lock().await;

        match timeout(self.write_timeout, async {
            for line in lines {
                writer.write_all(line.as_bytes()).await?;
                writer.write_all(b"\n").await?;
            }
            writer.flush().await?;
            Ok::<(), std::io::Error>(())
        })
        .await
        {
            Ok(Ok(())) => Ok(()),
            Ok(Err(e)) => Err(SessionError::Io(e.to_string())),
            Err(_) => Err(SessionError::WriteTimeout),
        }
    }

    /// Closes the transport.
    ///
    /// Wakes the lifecycle task blocked on its read, then shuts the
    /// write half down so the peer sees end-of-stream. Only the first
    /// call does anything; it returns `true`, later calls return `false`.
    pub async fn close(&self) -> bool {
        if self.closed.swap(true, Ordering::SeqCst) {
            return false;
        }

        self.close_token.cancel();

        let mut writer = self.writer.lock().await;
        match timeout(self.write_timeout, writer.shutdown()).await {
            Ok(Ok(())) => {}
            Ok(Err(e)) => {
                debug!(session = %self.id, error = %e, "Transport shutdown failed");
            }
            Err(_) => {
                debug!(session = %self.id, "Transport shutdown timed out");
            }
        }

        true
    }
}

impl std::fmt::Debug for Session {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Session")
            .field("id", &self.id)
            .field("peer_addr", &self.peer_addr)
            .field("name", &self.name())
            .field("kicked", &self.is_kicked())
            .field("closed", &self.is_closed())
            .finish()
    }
}

/// Errors delivering to a session.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum SessionError {
    #[error("Session is closed")]
    Closed,

    #[error("I/O error: {0}")]
    Io(String),

    #[error("Write timeout")]
    WriteTimeout,
}
