//! chatmsn - terminal client for the chatmsn group chat
//!
//! # Usage
//!
//! ```text
//! chatmsn <host> <port> <name>
//! chatmsn localhost 22230 alice
//! ```
//!
//! Type lines to chat; `/exit` leaves.

use std::process;

use anyhow::Result;
use clap::Parser;
use tokio::io::BufReader;
use tracing_subscriber::EnvFilter;

use chatmsn_client::{run, ClientConfig, SessionEnd};
use chatmsn_protocol::EXIT_COMMAND;

/// chatmsn - group chat client
#[derive(Parser, Debug)]
#[command(name = "chatmsn", version, about)]
#[command(after_help = format!("Type {EXIT_COMMAND} to leave the chat."))]
struct Args {
    /// Server host name or address
    host: String,

    /// Server port
    port: u16,

    /// Display name announced to the chat
    name: String,
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    // Quiet unless RUST_LOG asks otherwise; stdout belongs to the chat
    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(EnvFilter::from_default_env())
        .init();

    let config = ClientConfig::new(args.host, args.port, args.name);
    let stdin = BufReader::new(tokio::io::stdin());

    let end = run(&config, stdin, tokio::io::stdout()).await?;
    tracing::debug!(end = ?end, "Session finished");

    // stdin may still be blocked in a runtime thread; leave without waiting for it
    let code = match end {
        SessionEnd::ConnectionLost => 1,
        SessionEnd::ServerClosed | SessionEnd::UserExit | SessionEnd::InputClosed => 0,
    };
    process::exit(code);
}
