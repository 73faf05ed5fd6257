//! chatmsn Protocol - Line-based wire protocol
//!
//! Every frame is one line of UTF-8 text terminated by `\n`. This crate
//! provides the fixed protocol lines (banner, name prompt, kick notice),
//! the formatting of broadcast notices, and helpers for classifying
//! incoming lines.

pub mod line;
pub mod message;

pub use line::{
    is_exit_command, strip_line_ending, DEFAULT_BANNER, EXIT_COMMAND, KICK_NOTICE, NAME_PROMPT,
};
pub use message::{Notice, SERVER_TAG};
