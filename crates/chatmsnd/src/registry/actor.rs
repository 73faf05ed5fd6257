//! Registry actor - owns the list of live sessions and processes commands.
//!
//! The RegistryActor is the single owner of membership state in the server.
//! It receives commands via an mpsc channel and publishes events via broadcast.
//!
//! # Panic-Free Guarantees
//!
//! This module follows the project panic-free policy:
//! - No `.unwrap()`, `.expect()`, `panic!()`, `unreachable!()`, `todo!()`
//! - All fallible operations use `?`, pattern matching, or `unwrap_or`
//! - Channel send failures are ignored (the requester went away)

use tokio::sync::{broadcast, mpsc};
use tracing::{debug, info};

use chatmsn_core::{names_match, SessionId};

use super::commands::{RegistryCommand, SessionEvent};
use crate::session::SessionRef;

/// The registry actor - owns all membership state.
///
/// Commands are processed sequentially in a single task, so every
/// snapshot is consistent: a concurrent add or remove lands either
/// entirely before or entirely after it.
///
/// # Ordering
///
/// Sessions are kept in insertion order; `list` output and
/// `find_by_name` ties follow it.
pub struct RegistryActor {
    /// Command receiver
    receiver: mpsc::Receiver<RegistryCommand>,

    /// Live sessions in insertion order
    sessions: Vec<SessionRef>,

    /// Event publisher for membership changes
    event_publisher: broadcast::Sender<SessionEvent>,
}

impl RegistryActor {
    /// Creates a new registry actor.
    pub fn new(
        receiver: mpsc::Receiver<RegistryCommand>,
        event_publisher: broadcast::Sender<SessionEvent>,
    ) -> Self {
        Self {
            receiver,
            sessions: Vec::new(),
            event_publisher,
        }
    }

    /// Runs the actor event loop.
    ///
    /// Processes commands until the channel closes (all handles dropped).
    pub async fn run(mut self) {
        info!("Registry actor starting");

        while let Some(cmd) = self.receiver.recv().await {
            self.handle_command(cmd);
        }

        info!(sessions = self.sessions.len(), "Registry actor stopped");
    }

    /// Dispatches a command to the appropriate handler.
    fn handle_command(&mut self, cmd: RegistryCommand) {
        match cmd {
            RegistryCommand::Add {
                session,
                respond_to,
            } => {
                let result = self.handle_add(session);
                // Ignore send error - client may have dropped the receiver
                let _ = respond_to.send(result);
            }
            RegistryCommand::Remove {
                session_id,
                respond_to,
            } => {
                let result = self.handle_remove(session_id);
                let _ = respond_to.send(result);
            }
            RegistryCommand::Snapshot { respond_to } => {
                let _ = respond_to.send(self.sessions.clone());
            }
            RegistryCommand::FindByName { name, respond_to } => {
                let _ = respond_to.send(self.handle_find_by_name(&name));
            }
            RegistryCommand::Count { respond_to } => {
                let _ = respond_to.send(self.sessions.len());
            }
        }
    }

    // ========================================================================
    // Command Handlers
    // ========================================================================

    fn handle_add(&mut self, session: SessionRef) -> bool {
        let session_id = session.id();

        if self.contains(session_id) {
            debug!(session = %session_id, "Session already registered, ignoring");
            return false;
        }

        self.sessions.push(session);

        info!(
            session = %session_id,
            total_sessions = self.sessions.len(),
            "Session registered"
        );

        // Publish event (ignore if no subscribers)
        let _ = self.event_publisher.send(SessionEvent::Added { session_id });
        true
    }

    fn handle_remove(&mut self, session_id: SessionId) -> bool {
        let before = self.sessions.len();
        self.sessions.retain(|s| s.id() != session_id);

        if self.sessions.len() == before {
            debug!(session = %session_id, "Session not registered, nothing to remove");
            return false;
        }

        info!(
            session = %session_id,
            total_sessions = self.sessions.len(),
            "Session removed"
        );

        let _ = self.event_publisher.send(SessionEvent::Removed { session_id });
        true
    }

    fn handle_find_by_name(&self, name: &str) -> Option<SessionRef> {
        self.sessions
            .iter()
            .find(|s| s.name().is_some_and(|candidate| names_match(candidate, name)))
            .cloned()
    }

    fn contains(&self, session_id: SessionId) -> bool {
        self.sessions.iter().any(|s| s.id() == session_id)
    }
}
