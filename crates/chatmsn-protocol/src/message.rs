//! Broadcast notices relayed between sessions.
//!
//! A notice is rendered once into a single line and handed to the
//! broadcaster; nothing outlives the broadcast call.

use chatmsn_core::{ClockTime, OnlineDuration};
use std::fmt;

/// Tag used for operator-authored broadcasts.
pub const SERVER_TAG: &str = "Servidor";

/// A timestamped line broadcast to the chat.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Notice {
    /// A session finished naming itself.
    Joined { at: ClockTime, name: String },

    /// A line sent by a session.
    Chat {
        at: ClockTime,
        name: String,
        body: String,
    },

    /// A session left voluntarily or lost its connection.
    Left {
        at: ClockTime,
        name: String,
        online: OnlineDuration,
    },

    /// The operator kicked a session.
    Kicked { at: ClockTime, name: String },

    /// The operator broadcast a message.
    Server { at: ClockTime, text: String },
}

impl Notice {
    /// Join notice stamped with the moment the name arrived, which can
    /// precede the broadcast.
    pub fn joined(name: impl Into<String>, at: impl Into<ClockTime>) -> Self {
        Self::Joined {
            at: at.into(),
            name: name.into(),
        }
    }

    pub fn chat(name: impl Into<String>, body: impl Into<String>) -> Self {
        Self::Chat {
            at: ClockTime::now(),
            name: name.into(),
            body: body.into(),
        }
    }

    pub fn left(name: impl Into<String>, online: OnlineDuration) -> Self {
        Self::Left {
            at: ClockTime::now(),
            name: name.into(),
            online,
        }
    }

    pub fn kicked(name: impl Into<String>) -> Self {
        Self::Kicked {
            at: ClockTime::now(),
            name: name.into(),
        }
    }

    pub fn server(text: impl Into<String>) -> Self {
        Self::Server {
            at: ClockTime::now(),
            text: text.into(),
        }
    }

    /// Time stamped on the notice.
    pub fn at(&self) -> ClockTime {
        match self {
            Self::Joined { at, .. }
            | Self::Chat { at, .. }
            | Self::Left { at, .. }
            | Self::Kicked { at, .. }
            | Self::Server { at, .. } => *at,
        }
    }
}

impl fmt::Display for Notice {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Joined { at, name } => write!(f, "[{at}] {name} entrou no chat."),
            Self::Chat { at, name, body } => write!(f, "[{at}] [{name}] {body}"),
            Self::Left { at, name, online } => {
                write!(f, "[{at}] {name} saiu do chat (online por {online})")
            }
            Self::Kicked { at, name } => write!(f, "[{at}] {name} foi expulso pelo servidor."),
            Self::Server { at, text } => write!(f, "[{at}] [{SERVER_TAG}] {text}"),
        }
    }
}
