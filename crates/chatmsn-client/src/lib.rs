//! chatmsn client - Library modules
//!
//! Connects to a chatmsn server and relays lines between the terminal
//! and the chat. Two concurrent pumps share one connection:
//!
//! 1. **Read pump**: prints every server line until the stream ends
//! 2. **Write pump**: forwards typed lines, stopping after `/exit`
//!
//! The session ends as soon as the server side ends.

pub mod client;
pub mod error;

// Re-export commonly used types
pub use client::{connect, relay, run, ClientConfig, SessionEnd, CLOSED_BY_SERVER, CONNECTION_LOST};
pub use error::{ClientError, Result};
