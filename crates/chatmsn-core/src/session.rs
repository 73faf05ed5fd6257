//! Session identity and lifecycle states.

use std::fmt;

// ============================================================================
// Type-Safe Identifiers
// ============================================================================

/// Process-unique identifier for a chat session.
///
/// Display names are not unique, so registry membership and broadcast
/// exclusion are keyed by this id instead. Assigned by the acceptor from
/// a monotonic counter.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct SessionId(u64);

impl SessionId {
    pub fn new(id: u64) -> Self {
        Self(id)
    }

    pub fn as_u64(&self) -> u64 {
        self.0
    }
}

impl fmt::Display for SessionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "session-{}", self.0)
    }
}

impl From<u64> for SessionId {
    fn from(id: u64) -> Self {
        Self(id)
    }
}

// ============================================================================
// Lifecycle
// ============================================================================

/// Why a session left the chat.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExitReason {
    /// Client sent `/exit` or closed its end of the connection.
    Voluntary,

    /// Reading from the transport failed.
    Error,

    /// The operator kicked the session.
    Kicked,
}

impl ExitReason {
    /// Whether the exit is announced to the other sessions with a
    /// "left the chat" notice.
    ///
    /// Kicks are announced by the kick itself.
    #[must_use]
    pub fn announces_departure(&self) -> bool {
        !matches!(self, Self::Kicked)
    }
}

impl fmt::Display for ExitReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Voluntary => write!(f, "left voluntarily"),
            Self::Error => write!(f, "connection error"),
            Self::Kicked => write!(f, "kicked by operator"),
        }
    }
}

/// States of a session's lifecycle.
///
/// ```text
/// Connecting ──▶ Named ──▶ Active ──▶ Exiting ──▶ Closed
///      │                                             ▲
///      └─────────────── (no name received) ──────────┘
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    /// Banner and name prompt sent, waiting for the name line.
    Connecting,

    /// Name received; join not yet announced.
    Named,

    /// Relaying messages.
    Active,

    /// Leaving the chat for the given reason.
    Exiting(ExitReason),

    /// Terminal state: removed from the registry, transport closed.
    Closed,
}

impl SessionState {
    #[must_use]
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Closed)
    }
}

impl fmt::Display for SessionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Connecting => write!(f, "connecting"),
            Self::Named => write!(f, "named"),
            Self::Active => write!(f, "active"),
            Self::Exiting(reason) => write!(f, "exiting ({reason})"),
            Self::Closed => write!(f, "closed"),
        }
    }
}
