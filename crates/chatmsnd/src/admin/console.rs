//! Operator console loop.

use std::borrow::Cow;

use tokio::io::{AsyncBufRead, AsyncBufReadExt, AsyncWrite, AsyncWriteExt};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use chatmsn_protocol::strip_line_ending;

use super::{AdminConsole, AdminOutcome};

/// Reads commands from `input` until EOF or cancellation.
///
/// Each command's operator text is written to `output`. Bytes that are
/// not valid UTF-8 are replaced rather than ending the console. Returning
/// never stops the server: the binary keeps serving after stdin closes.
pub async fn run_console<R, W>(
    mut input: R,
    mut output: W,
    console: AdminConsole,
    cancel_token: CancellationToken,
) -> std::io::Result<()>
where
    R: AsyncBufRead + Unpin,
    W: AsyncWrite + Unpin,
{
    let mut buf = Vec::new();

    loop {
        buf.clear();
        let read = tokio::select! {
            _ = cancel_token.cancelled() => {
                debug!("Console shutting down");
                break;
            }
            read = input.read_until(b'\n', &mut buf) => read?,
        };

        if read == 0 {
            info!("Console input closed");
            break;
        }

        let raw = String::from_utf8_lossy(&buf);
        if matches!(raw, Cow::Owned(_)) {
            warn!("Console input was not valid UTF-8");
        }
        let line = strip_line_ending(&raw);

        let outcome = console.handle_line(line).await;
        if outcome == AdminOutcome::Ignored {
            continue;
        }

        output.write_all(format!("{outcome}\n").as_bytes()).await?;
        output.flush().await?;
    }

    Ok(())
}
