//! Error types for the chat client.
//!
//! **Panic-Free Policy:** This module follows the project's panic-free guidelines.
//! No `.unwrap()`, `.expect()`, `panic!()`, `unreachable!()`, or `todo!()`.

use std::io;
use thiserror::Error;

// ============================================================================
// Client Error Type
// ============================================================================

/// Chat client errors.
#[derive(Error, Debug)]
pub enum ClientError {
    /// Failed to connect to the server.
    ///
    /// Usually the server is not running or the host/port is wrong.
    #[error("Failed to connect to {address}: {source}")]
    Connect {
        /// The `host:port` that was dialed.
        address: String,
        #[source]
        source: io::Error,
    },

    /// I/O error passthrough.
    ///
    /// Reading the terminal or writing to the server failed.
    #[error("IO error: {0}")]
    Io(#[from] io::Error),
}

/// Convenience Result type alias for client operations.
pub type Result<T> = std::result::Result<T, ClientError>;
