//! chatmsn Core - Shared domain types for the group chat service
//!
//! This crate provides the value types shared between
//! the server (chatmsnd) and the client (chatmsn).
//!
//! All code follows the panic-free policy: no `.unwrap()`, `.expect()`,
//! `panic!()`, `unreachable!()`, `todo!()`, or direct indexing `[i]`.

pub mod clock;
pub mod name;
pub mod session;

// Re-exports for convenience
pub use clock::{ClockTime, OnlineDuration};
pub use name::{names_match, parse_display_name};
pub use session::{ExitReason, SessionId, SessionState};
