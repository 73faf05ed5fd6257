//! Lifecycle controller for individual chat connections.
//!
//! Each accepted connection gets its own `LifecycleController` that:
//! - Registers the session and sends the banner and name prompt
//! - Announces the join once the name arrives
//! - Relays every chat line to the other sessions
//! - Leaves the chat on `/exit`, end-of-stream, I/O failure or kick
//!
//! The controller is written against any `AsyncRead`, so tests drive it
//! through in-memory pipes instead of sockets.
//!
//! # Panic-Free Guarantees
//!
//! This module follows the project panic-free policy:
//! - No `.unwrap()`, `.expect()`, `panic!()`, `unreachable!()`, `todo!()`
//! - All fallible operations use `?`, pattern matching, or `unwrap_or`
//! - Connection errors are logged and result in graceful disconnect

use std::sync::Arc;

use chrono::Local;
use tokio::io::{AsyncBufReadExt, AsyncRead, BufReader};
use tracing::{debug, info, warn};

use chatmsn_core::{parse_display_name, ClockTime, ExitReason, OnlineDuration, SessionState};
use chatmsn_protocol::{is_exit_command, strip_line_ending, Notice, NAME_PROMPT};

use crate::broadcast::Broadcaster;
use crate::registry::RegistryHandle;
use crate::session::{JoinInfo, SessionRef};

/// Boxed read half of a session transport.
pub type TransportReader = Box<dyn AsyncRead + Send + Unpin>;

/// Result of waiting for one line from the client.
#[derive(Debug)]
enum ReadOutcome {
    Line(String),
    Eof,
    /// The transport was closed locally (kick or shutdown)
    Closed,
    Failed(std::io::Error),
}

/// Drives one session from accept to close.
///
/// ```text
/// Connecting ──▶ Named ──▶ Active ──▶ Exiting ──▶ Closed
///      └────────── no name ─────────────────────────▲
/// ```
pub struct LifecycleController {
    session: SessionRef,

    /// Buffered read half, owned exclusively by this controller
    reader: BufReader<TransportReader>,

    registry: RegistryHandle,
    broadcaster: Broadcaster,

    /// Lines sent before the name prompt
    banner: Arc<[String]>,

    /// Name and time received, held until the join has been announced
    joining: Option<JoinInfo>,

    state: SessionState,
}

impl LifecycleController {
    /// Creates a controller for a freshly accepted session.
    ///
    /// # Arguments
    ///
    /// * `session` - The session, holding the write half of the transport
    /// * `reader` - Read half of the same transport
    /// * `registry` - Handle to the client registry
    /// * `broadcaster` - Fan-out to the other sessions
    /// * `banner` - Rules block sent before the name prompt
    pub fn new(
        session: SessionRef,
        reader: impl AsyncRead + Send + Unpin + 'static,
        registry: RegistryHandle,
        broadcaster: Broadcaster,
        banner: Arc<[String]>,
    ) -> Self {
        let reader: TransportReader = Box::new(reader);
        Self {
            session,
            reader: BufReader::new(reader),
            registry,
            broadcaster,
            banner,
            joining: None,
            state: SessionState::Connecting,
        }
    }

    /// Runs the state machine to completion.
    ///
    /// Returns why the session left, or `None` if the connection ended
    /// before a name was received (nothing is announced in that case).
    pub async fn run(mut self) -> Option<ExitReason> {
        debug!(
            session = %self.session.id(),
            peer = %self.session.peer_addr(),
            "New client connected"
        );

        let mut exit_reason = None;

        while !self.state.is_terminal() {
            let next = match self.state {
                SessionState::Connecting => self.negotiate_name().await,
                SessionState::Named => self.announce_join().await,
                SessionState::Active => self.relay_next_line().await,
                SessionState::Exiting(reason) => {
                    exit_reason = Some(self.leave(reason).await);
                    SessionState::Closed
                }
                SessionState::Closed => SessionState::Closed,
            };

            debug!(
                session = %self.session.id(),
                from = %self.state,
                to = %next,
                "Session state transition"
            );
            self.state = next;
        }

        exit_reason
    }

    // ========================================================================
    // States
    // ========================================================================

    /// Registers the session, greets the client and waits for its name.
    async fn negotiate_name(&mut self) -> SessionState {
        if let Err(e) = self.registry.add(Arc::clone(&self.session)).await {
            warn!(session = %self.session.id(), error = %e, "Failed to register session");
            self.session.close().await;
            return SessionState::Closed;
        }

        let mut greeting: Vec<&str> = self.banner.iter().map(String::as_str).collect();
        greeting.push(NAME_PROMPT);

        if let Err(e) = self.session.send_lines(&greeting).await {
            debug!(session = %self.session.id(), error = %e, "Failed to send name prompt");
            self.discard().await;
            return SessionState::Closed;
        }

        match self.read_line().await {
            ReadOutcome::Line(line) => {
                self.joining = Some(JoinInfo {
                    name: parse_display_name(&line),
                    connected_at: Local::now(),
                });
                SessionState::Named
            }
            outcome => {
                debug!(
                    session = %self.session.id(),
                    outcome = ?outcome,
                    "Connection ended before a name was received"
                );
                self.discard().await;
                SessionState::Closed
            }
        }
    }

    /// Broadcasts the join notice to everyone else, then records the name.
    ///
    /// The session only becomes visible by name once its own join notice
    /// has gone out, so anyone who sees it named also saw that notice.
    async fn announce_join(&mut self) -> SessionState {
        let Some(JoinInfo { name, connected_at }) = self.joining.take() else {
            self.discard().await;
            return SessionState::Closed;
        };
        let at = ClockTime::from(connected_at);

        info!(session = %self.session.id(), name = %name, at = %at, "Client joined the chat");

        let notice = Notice::joined(name.as_str(), at);
        self.broadcaster
            .broadcast(&notice.to_string(), Some(self.session.id()))
            .await;

        self.session.mark_joined(name, connected_at);
        SessionState::Active
    }

    /// Reads one line and relays it, or decides to leave.
    async fn relay_next_line(&mut self) -> SessionState {
        match self.read_line().await {
            ReadOutcome::Line(line) if is_exit_command(&line) => {
                SessionState::Exiting(self.exit_reason_or(ExitReason::Voluntary))
            }
            ReadOutcome::Line(line) if line.is_empty() => SessionState::Active,
            ReadOutcome::Line(line) => {
                let notice = Notice::chat(self.display_name(), line);
                let message = notice.to_string();
                info!(session = %self.session.id(), "{message}");

                self.broadcaster
                    .broadcast(&message, Some(self.session.id()))
                    .await;
                SessionState::Active
            }
            ReadOutcome::Eof => {
                debug!(session = %self.session.id(), "Client sent EOF");
                SessionState::Exiting(self.exit_reason_or(ExitReason::Voluntary))
            }
            ReadOutcome::Closed => SessionState::Exiting(self.exit_reason_or(ExitReason::Error)),
            ReadOutcome::Failed(e) => {
                let reason = self.exit_reason_or(ExitReason::Error);
                if reason != ExitReason::Kicked {
                    warn!(session = %self.session.id(), error = %e, "Connection read failed");
                }
                SessionState::Exiting(reason)
            }
        }
    }

    /// Removes the session, announces the departure unless kicked, and
    /// closes the transport.
    ///
    /// The kick flag is read again after unregistering: a kick that lands
    /// after the exit was decided still suppresses the departure notice.
    /// Finding the session already gone from the registry means the kick
    /// removed it first. Returns the final exit reason.
    async fn leave(&mut self, reason: ExitReason) -> ExitReason {
        let session_id = self.session.id();
        let name = self.display_name();

        let removed = match self.registry.remove(session_id).await {
            Ok(removed) => removed,
            Err(e) => {
                warn!(session = %session_id, error = %e, "Failed to unregister session");
                true
            }
        };

        let reason = if !removed || self.session.is_kicked() {
            ExitReason::Kicked
        } else {
            reason
        };

        if reason.announces_departure() {
            let online = self
                .session
                .connected_at()
                .map(OnlineDuration::since)
                .unwrap_or_default();
            let notice = Notice::left(name.clone(), online);

            info!(
                session = %session_id,
                name = %name,
                reason = %reason,
                online = %online,
                "Client left the chat"
            );

            self.broadcaster
                .broadcast(&notice.to_string(), Some(session_id))
                .await;
        } else {
            info!(session = %session_id, name = %name, "Kicked client disconnected");
        }

        self.session.close().await;
        reason
    }

    // ========================================================================
    // Helpers
    // ========================================================================

    /// Silent cleanup for connections that never joined.
    async fn discard(&mut self) {
        if let Err(e) = self.registry.remove(self.session.id()).await {
            warn!(session = %self.session.id(), error = %e, "Failed to unregister session");
        }
        self.session.close().await;
    }

    /// Waits for the next line, or for the transport to be closed locally.
    async fn read_line(&mut self) -> ReadOutcome {
        let mut line = String::new();

        let result = tokio::select! {
            biased;
            _ = self.session.closed() => None,
            res = self.reader.read_line(&mut line) => Some(res),
        };

        match result {
            None => ReadOutcome::Closed,
            Some(Ok(0)) => ReadOutcome::Eof,
            Some(Ok(_)) => ReadOutcome::Line(strip_line_ending(&line).to_string()),
            Some(Err(e)) => ReadOutcome::Failed(e),
        }
    }

    /// A kick observed at any point overrides the natural exit reason.
    fn exit_reason_or(&self, otherwise: ExitReason) -> ExitReason {
        if self.session.is_kicked() {
            ExitReason::Kicked
        } else {
            otherwise
        }
    }

    fn display_name(&self) -> String {
        self.session.name().unwrap_or_default().to_string()
    }
}
