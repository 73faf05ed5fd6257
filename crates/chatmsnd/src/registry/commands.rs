//! Registry actor commands, errors, and events.
//!
//! This module defines the message types for communicating with the `RegistryActor`:
//! - `RegistryCommand`: Commands sent to the actor
//! - `RegistryError`: Errors that can occur during registry operations
//! - `SessionEvent`: Membership events published by the registry
//!
//! All types are designed for async message passing and follow the panic-free policy.

use chatmsn_core::SessionId;
use thiserror::Error;
use tokio::sync::oneshot;

use crate::session::SessionRef;

// ============================================================================
// Registry Commands
// ============================================================================

/// Commands sent to the registry actor.
///
/// Each command carries a oneshot channel for the response, enabling
/// request-response patterns in async code without locks.
#[derive(Debug)]
pub enum RegistryCommand {
    /// Add a session to the registry.
    ///
    /// Responds `true` if inserted, `false` if it was already present.
    Add {
        session: SessionRef,
        respond_to: oneshot::Sender<bool>,
    },

    /// Remove a session from the registry.
    ///
    /// Responds `true` if removed, `false` if it was not present.
    /// Removing an absent session is not an error.
    Remove {
        session_id: SessionId,
        respond_to: oneshot::Sender<bool>,
    },

    /// All current members in insertion order.
    Snapshot {
        respond_to: oneshot::Sender<Vec<SessionRef>>,
    },

    /// First member whose display name matches, ignoring case.
    FindByName {
        name: String,
        respond_to: oneshot::Sender<Option<SessionRef>>,
    },

    /// Number of current members.
    Count { respond_to: oneshot::Sender<usize> },
}

// ============================================================================
// Registry Errors
// ============================================================================

/// Errors that can occur during registry operations.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum RegistryError {
    /// The actor has shut down, so the command could not be delivered
    /// or answered.
    #[error("response channel closed")]
    ChannelClosed,
}

// ============================================================================
// Session Events
// ============================================================================

/// Membership events published by the registry.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SessionEvent {
    /// A session entered the registry.
    Added { session_id: SessionId },

    /// A session left the registry.
    Removed { session_id: SessionId },
}

impl SessionEvent {
    pub fn session_id(&self) -> SessionId {
        match self {
            Self::Added { session_id } | Self::Removed { session_id } => *session_id,
        }
    }
}
