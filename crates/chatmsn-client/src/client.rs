//! Line relay between the terminal and the chat server.
//!
//! The client:
//! - Prints the first server line and answers with the configured name
//! - Prints every later server line until the connection ends
//! - Forwards typed lines verbatim, stopping after `/exit`
//!
//! Both directions run concurrently. The session is over as soon as the
//! server side ends; when the input side ends first the write half is
//! closed and the client waits briefly for the server to hang up.
//!
//! **Panic-Free Policy:** This module follows the project's panic-free guidelines.
//! No `.unwrap()`, `.expect()`, `panic!()`, `unreachable!()`, or `todo!()`.

use std::time::Duration;

use tokio::io::{
    AsyncBufRead, AsyncBufReadExt, AsyncRead, AsyncWrite, AsyncWriteExt, BufReader, Lines,
};
use tokio::net::TcpStream;
use tokio::time::timeout;
use tracing::{debug, info};

use chatmsn_protocol::is_exit_command;

use crate::error::{ClientError, Result};

/// Printed when the server closes the connection.
pub const CLOSED_BY_SERVER: &str = "Conexão encerrada pelo servidor.";

/// Printed when reading from the server fails.
pub const CONNECTION_LOST: &str = "Conexão encerrada.";

/// How long to wait for the server to hang up after local input ends.
const CLOSE_GRACE: Duration = Duration::from_secs(2);

// ============================================================================
// Configuration
// ============================================================================

/// Where to connect and which name to announce.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClientConfig {
    pub host: String,
    pub port: u16,
    pub name: String,
}

impl ClientConfig {
    pub fn new(host: impl Into<String>, port: u16, name: impl Into<String>) -> Self {
        Self {
            host: host.into(),
            port,
            name: name.into(),
        }
    }

    /// `host:port`, bracketing IPv6 literals.
    pub fn address(&self) -> String {
        if self.host.contains(':') && !self.host.starts_with('[') {
            format!("[{}]:{}", self.host, self.port)
        } else {
            format!("{}:{}", self.host, self.port)
        }
    }
}

/// How a session ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionEnd {
    /// The server closed the connection
    ServerClosed,

    /// Reading from the server failed
    ConnectionLost,

    /// The user typed `/exit`
    UserExit,

    /// Local input reached end-of-file
    InputClosed,
}

// ============================================================================
// Entry Points
// ============================================================================

/// Opens a TCP connection to the server.
pub async fn connect(config: &ClientConfig) -> Result<TcpStream> {
    let stream = TcpStream::connect((config.host.as_str(), config.port))
        .await
        .map_err(|source| ClientError::Connect {
            address: config.address(),
            source,
        })?;

    info!(address = %config.address(), "Connected to chat server");
    Ok(stream)
}

/// Connects and relays between `input`/`output` and the server.
pub async fn run<I, O>(config: &ClientConfig, input: I, output: O) -> Result<SessionEnd>
where
    I: AsyncBufRead + Unpin,
    O: AsyncWrite + Unpin,
{
    let stream = connect(config).await?;
    let (reader, writer) = stream.into_split();
    relay(reader, writer, input, output, &config.name).await
}

/// Runs one chat session over an already open transport.
///
/// # Arguments
///
/// * `server_reader` / `server_writer` - The two halves of the connection
/// * `input` - Lines typed by the user
/// * `output` - Where server lines are printed
/// * `name` - Sent right after the first server line
pub async fn relay<R, W, I, O>(
    server_reader: R,
    server_writer: W,
    input: I,
    mut output: O,
    name: &str,
) -> Result<SessionEnd>
where
    R: AsyncRead + Unpin,
    W: AsyncWrite + Unpin,
    I: AsyncBufRead + Unpin,
    O: AsyncWrite + Unpin,
{
    let mut server_lines = BufReader::new(server_reader).lines();
    let mut server_writer = server_writer;

    match server_lines.next_line().await? {
        Some(first) => write_line(&mut output, &first).await?,
        None => {
            write_line(&mut output, CLOSED_BY_SERVER).await?;
            return Ok(SessionEnd::ServerClosed);
        }
    }

    write_line(&mut server_writer, name).await?;
    debug!(name = %name, "Name sent");

    let read_pump = print_incoming(&mut server_lines, &mut output);
    let write_pump = forward_input(input, server_writer);
    tokio::pin!(read_pump, write_pump);

    let (end, mut server_writer) = tokio::select! {
        end = &mut read_pump => return end,
        result = &mut write_pump => result?,
    };

    // Half-close so the server sees end-of-stream, then drain what it
    // still has to say.
    if let Err(e) = server_writer.shutdown().await {
        debug!(error = %e, "Failed to close write half");
    }

    match timeout(CLOSE_GRACE, &mut read_pump).await {
        Ok(Ok(_)) => {}
        Ok(Err(e)) => debug!(error = %e, "Output failed while draining"),
        Err(_) => debug!("Server did not close the connection in time"),
    }

    Ok(end)
}

// ============================================================================
// Pumps
// ============================================================================

/// Prints server lines until the connection ends.
async fn print_incoming<R, O>(lines: &mut Lines<BufReader<R>>, output: &mut O) -> Result<SessionEnd>
where
    R: AsyncRead + Unpin,
    O: AsyncWrite + Unpin,
{
    loop {
        match lines.next_line().await {
            Ok(Some(line)) => write_line(output, &line).await?,
            Ok(None) => {
                write_line(output, CLOSED_BY_SERVER).await?;
                return Ok(SessionEnd::ServerClosed);
            }
            Err(e) => {
                debug!(error = %e, "Read from server failed");
                write_line(output, CONNECTION_LOST).await?;
                return Ok(SessionEnd::ConnectionLost);
            }
        }
    }
}

/// Sends typed lines until `/exit` or end of input. Hands the writer back.
async fn forward_input<I, W>(input: I, mut writer: W) -> Result<(SessionEnd, W)>
where
    I: AsyncBufRead + Unpin,
    W: AsyncWrite + Unpin,
{
    let mut lines = input.lines();

    while let Some(line) = lines.next_line().await? {
        write_line(&mut writer, &line).await?;
        if is_exit_command(&line) {
            debug!("Exit command sent");
            return Ok((SessionEnd::UserExit, writer));
        }
    }

    debug!("Input closed");
    Ok((SessionEnd::InputClosed, writer))
}

async fn write_line<W>(writer: &mut W, line: &str) -> std::io::Result<()>
where
    W: AsyncWrite + Unpin,
{
    writer.write_all(line.as_bytes()).await?;
    writer.write_all(b"\n").await?;
    writer.flush().await
}
