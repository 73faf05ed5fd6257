//! Fan-out of chat lines to every live session.
//!
//! Each call delivers to a snapshot of the registry taken when the call
//! starts. Nothing is locked while writing, so a slow recipient only
//! delays the broadcast that is writing to it (up to the session write
//! timeout). Failures are isolated per recipient: the recipient's own
//! lifecycle task notices the broken transport on its next read.

use tracing::debug;

use chatmsn_core::SessionId;

use crate::registry::RegistryHandle;

/// Outcome of one broadcast call.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Delivery {
    /// Recipients the line was written to
    pub delivered: usize,

    /// Recipients whose write failed (closed, I/O error, timeout)
    pub failed: usize,
}

/// Delivers lines to every registered session.
#[derive(Clone)]
pub struct Broadcaster {
    registry: RegistryHandle,
}

impl Broadcaster {
    pub fn new(registry: RegistryHandle) -> Self {
        Self { registry }
    }

    /// Sends `message` to every member except `exclude`.
    ///
    /// `exclude = None` delivers to everyone (server and kick notices).
    pub async fn broadcast(&self, message: &str, exclude: Option<SessionId>) -> Delivery {
        let recipients = self.registry.snapshot().await;
        let mut delivery = Delivery::default();

        for session in &recipients {
            if Some(session.id()) == exclude {
                continue;
            }

            match session.send_line(message).await {
                Ok(()) => delivery.delivered += 1,
                Err(e) => {
                    debug!(
                        session = %session.id(),
                        error = %e,
                        "Failed to deliver broadcast"
                    );
                    delivery.failed += 1;
                }
            }
        }

        delivery
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::net::SocketAddr;
    use std::sync::Arc;
    use std::time::Duration;

    use tokio::io::{AsyncBufReadExt, BufReader, DuplexStream, ReadHalf};
    use tokio::time::timeout;

    use crate::registry::spawn_registry;
    use crate::session::{Session, SessionRef};

    fn connect(id: u64) -> (SessionRef, BufReader<DuplexStream>) {
        let (server, client) = tokio::io::duplex(4096);
        let (_read, write): (ReadHalf<DuplexStream>, _) = tokio::io::split(server);
        let session = Session::new(
            SessionId::new(id),
            SocketAddr::from(([127, 0, 0, 1], 6000)),
            write,
            Duration::from_millis(200),
        );
        (Arc::new(session), BufReader::new(client))
    }

    async fn next_line(reader: &mut BufReader<DuplexStream>) -> Option<String> {
        let mut line = String::new();
        match timeout(Duration::from_millis(200), reader.read_line(&mut line)).await {
            Ok(Ok(n)) if n > 0 => Some(line.trim_end().to_string()),
            _ => None,
        }
    }

    #[tokio::test]
    async fn test_broadcast_skips_excluded_sender() {
        let registry = spawn_registry();
        let broadcaster = Broadcaster::new(registry.clone());

        let (alice, mut alice_rx) = connect(1);
        let (bob, mut bob_rx) = connect(2);
        registry.add(Arc::clone(&alice)).await.unwrap();
        registry.add(Arc::clone(&bob)).await.unwrap();

        let delivery = broadcaster.broadcast("hello", Some(bob.id())).await;
        assert_eq!(delivery, Delivery { delivered: 1, failed: 0 });

        assert_eq!(next_line(&mut alice_rx).await.as_deref(), Some("hello"));
        assert_eq!(next_line(&mut bob_rx).await, None);
    }

    #[tokio::test]
    async fn test_broadcast_without_exclusion_reaches_all() {
        let registry = spawn_registry();
        let broadcaster = Broadcaster::new(registry.clone());

        let mut readers = Vec::new();
        for id in 0..5 {
            let (session, reader) = connect(id);
            registry.add(session).await.unwrap();
            readers.push(reader);
        }

        let delivery = broadcaster.broadcast("[12:00:00] [Servidor] oi", None).await;
        assert_eq!(delivery.delivered, 5);

        for reader in &mut readers {
            assert_eq!(
                next_line(reader).await.as_deref(),
                Some("[12:00:00] [Servidor] oi")
            );
            assert_eq!(next_line(reader).await, None);
        }
    }

    #[tokio::test]
    async fn test_failed_recipient_does_not_stop_fan_out() {
        let registry = spawn_registry();
        let broadcaster = Broadcaster::new(registry.clone());

        let (gone, gone_rx) = connect(1);
        let (closed, _closed_rx) = connect(2);
        let (alive, mut alive_rx) = connect(3);
        registry.add(gone).await.unwrap();
        registry.add(Arc::clone(&closed)).await.unwrap();
        registry.add(alive).await.unwrap();

        drop(gone_rx);
        closed.close().await;

        let delivery = broadcaster.broadcast("still here", None).await;
        assert_eq!(delivery, Delivery { delivered: 1, failed: 2 });
        assert_eq!(next_line(&mut alive_rx).await.as_deref(), Some("still here"));
    }

    #[tokio::test]
    async fn test_broadcast_to_empty_registry() {
        let registry = spawn_registry();
        let broadcaster = Broadcaster::new(registry);

        assert_eq!(broadcaster.broadcast("nobody", None).await, Delivery::default());
    }
}
