//! Operator commands: list, server broadcast and kick.
//!
//! The interpreter is transport-agnostic: it takes a parsed
//! [`AdminCommand`] and returns an [`AdminOutcome`] whose `Display` is
//! the text shown to the operator. The stdin loop lives in `console`.
//!
//! # Panic-Free Guarantees
//!
//! This module follows the project panic-free policy:
//! - No `.unwrap()`, `.expect()`, `panic!()`, `unreachable!()`, `todo!()`
//! - Delivery failures to a kicked client are logged and ignored

mod command;
mod console;

pub use command::AdminCommand;
pub use console::run_console;

use std::fmt;
use std::net::SocketAddr;

use tracing::{debug, info, warn};

use chatmsn_protocol::{Notice, KICK_NOTICE};

use crate::broadcast::{Broadcaster, Delivery};
use crate::registry::RegistryHandle;

/// Placeholder shown for sessions that have not sent a name yet.
const UNNAMED: &str = "<sem nome>";

/// One row of the `list` output.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClientEntry {
    /// `None` until the client answers the name prompt
    pub name: Option<String>,
    pub peer_addr: SocketAddr,
}

/// Result of one operator command.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AdminOutcome {
    /// Registry members, in registry order
    Listing(Vec<ClientEntry>),

    /// A server notice was sent to everyone
    Broadcasted { message: String, delivery: Delivery },

    /// The target was found and removed
    Kicked { target: String, delivery: Delivery },

    NotFound { target: String },

    Ignored,
}

impl fmt::Display for AdminOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Listing(entries) => {
                writeln!(f, "=== Clientes online ===")?;
                for entry in entries {
                    let name = entry.name.as_deref().unwrap_or(UNNAMED);
                    writeln!(f, "{} - {}", name, entry.peer_addr)?;
                }
                write!(f, "=======================")
            }
            Self::Broadcasted { message, .. } => write!(f, "Enviando para clientes: {message}"),
            Self::Kicked { target, .. } => write!(f, "Cliente '{target}' foi expulso."),
            Self::NotFound { target } => write!(f, "Cliente '{target}' não encontrado."),
            Self::Ignored => Ok(()),
        }
    }
}

/// Executes operator commands against the shared registry.
#[derive(Clone)]
pub struct AdminConsole {
    registry: RegistryHandle,
    broadcaster: Broadcaster,
}

impl AdminConsole {
    pub fn new(registry: RegistryHandle, broadcaster: Broadcaster) -> Self {
        Self {
            registry,
            broadcaster,
        }
    }

    /// Parses and executes one console line.
    pub async fn handle_line(&self, line: &str) -> AdminOutcome {
        self.execute(AdminCommand::parse(line)).await
    }

    pub async fn execute(&self, command: AdminCommand) -> AdminOutcome {
        match command {
            AdminCommand::List => AdminOutcome::Listing(self.list().await),
            AdminCommand::Broadcast(text) => self.announce(text).await,
            AdminCommand::Kick(target) => self.kick(&target).await,
            AdminCommand::Ignored => AdminOutcome::Ignored,
        }
    }

    /// Every registry member, named or not.
    pub async fn list(&self) -> Vec<ClientEntry> {
        self.registry
            .snapshot()
            .await
            .iter()
            .map(|session| ClientEntry {
                name: session.name().map(str::to_string),
                peer_addr: session.peer_addr(),
            })
            .collect()
    }

    /// Sends `[HH:MM:SS] [Servidor] <text>` to every session.
    pub async fn announce(&self, text: String) -> AdminOutcome {
        let message = Notice::server(text).to_string();
        let delivery = self.broadcaster.broadcast(&message, None).await;

        info!(
            delivered = delivery.delivered,
            failed = delivery.failed,
            "{message}"
        );

        AdminOutcome::Broadcasted { message, delivery }
    }

    /// Removes the first session whose name matches `target`.
    ///
    /// Order: direct notice, kicked flag, close, unregister, then the
    /// kicked notice to everyone left. The flag is set before the close
    /// so the session's own task never announces a regular departure.
    pub async fn kick(&self, target: &str) -> AdminOutcome {
        let Some(session) = self.registry.find_by_name(target).await else {
            info!(target = %target, "Kick target not found");
            return AdminOutcome::NotFound {
                target: target.to_string(),
            };
        };

        if let Err(e) = session.send_line(KICK_NOTICE).await {
            debug!(session = %session.id(), error = %e, "Failed to deliver kick notice");
        }

        session.mark_kicked();
        session.close().await;

        if let Err(e) = self.registry.remove(session.id()).await {
            warn!(session = %session.id(), error = %e, "Failed to unregister kicked session");
        }

        let name = session.name().unwrap_or(target).to_string();
        let delivery = self
            .broadcaster
            .broadcast(&Notice::kicked(name.as_str()).to_string(), None)
            .await;

        info!(
            session = %session.id(),
            name = %name,
            peer = %session.peer_addr(),
            "Client kicked"
        );

        AdminOutcome::Kicked {
            target: target.to_string(),
            delivery,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use std::time::Duration;

    use chrono::Local;
    use tokio::io::{AsyncBufReadExt, AsyncReadExt, BufReader, DuplexStream};
    use tokio::time::timeout;

    use chatmsn_core::SessionId;

    use crate::registry::spawn_registry;
    use crate::session::{Session, SessionRef};

    fn console() -> (AdminConsole, RegistryHandle) {
        let registry = spawn_registry();
        let console = AdminConsole::new(registry.clone(), Broadcaster::new(registry.clone()));
        (console, registry)
    }

    async fn connect(
        registry: &RegistryHandle,
        id: u64,
        name: Option<&str>,
    ) -> (SessionRef, BufReader<DuplexStream>) {
        let (server, client) = tokio::io::duplex(4096);
        let (_read, write) = tokio::io::split(server);
        let session = Arc::new(Session::new(
            SessionId::new(id),
            SocketAddr::from(([192, 168, 0, id as u8], 5000)),
            write,
            Duration::from_millis(200),
        ));
        if let Some(name) = name {
            session.mark_joined(name.to_string(), Local::now());
        }
        registry.add(Arc::clone(&session)).await.unwrap();
        (session, BufReader::new(client))
    }

    async fn next_line(reader: &mut BufReader<DuplexStream>) -> Option<String> {
        let mut line = String::new();
        match timeout(Duration::from_millis(200), reader.read_line(&mut line)).await {
            Ok(Ok(n)) if n > 0 => Some(line.trim_end().to_string()),
            _ => None,
        }
    }

    #[tokio::test]
    async fn test_list_in_registry_order_with_unnamed() {
        let (console, registry) = console();
        let _a = connect(&registry, 1, Some("alice")).await;
        let _b = connect(&registry, 2, None).await;
        let _c = connect(&registry, 3, Some("carol")).await;

        let outcome = console.handle_line("LISTA").await;
        assert_eq!(
            outcome.to_string(),
            "=== Clientes online ===\n\
             alice - 192.168.0.1:5000\n\
             <sem nome> - 192.168.0.2:5000\n\
             carol - 192.168.0.3:5000\n\
             ======================="
        );
    }

    #[tokio::test]
    async fn test_empty_list() {
        let (console, _registry) = console();
        let outcome = console.execute(AdminCommand::List).await;
        assert_eq!(outcome, AdminOutcome::Listing(Vec::new()));
        assert_eq!(
            outcome.to_string(),
            "=== Clientes online ===\n======================="
        );
    }

    #[tokio::test]
    async fn test_server_broadcast_reaches_everyone() {
        let (console, registry) = console();
        let (_a, mut alice_rx) = connect(&registry, 1, Some("alice")).await;
        let (_b, mut pending_rx) = connect(&registry, 2, None).await;

        let outcome = console.handle_line("/ Manutenção em 5 minutos ").await;
        let AdminOutcome::Broadcasted { message, delivery } = &outcome else {
            panic!("unexpected outcome: {outcome:?}");
        };
        assert!(message.ends_with("] [Servidor] Manutenção em 5 minutos"));
        assert_eq!(delivery.delivered, 2);
        assert!(outcome.to_string().starts_with("Enviando para clientes: ["));

        assert_eq!(next_line(&mut alice_rx).await.as_ref(), Some(message));
        assert_eq!(next_line(&mut pending_rx).await.as_ref(), Some(message));
    }

    #[tokio::test]
    async fn test_kick_sequence() {
        let (console, registry) = console();
        let (_alice, mut alice_rx) = connect(&registry, 1, Some("alice")).await;
        let (bob, mut bob_rx) = connect(&registry, 2, Some("Bob")).await;

        let outcome = console.handle_line("kick bob").await;
        assert_eq!(outcome.to_string(), "Cliente 'bob' foi expulso.");
        assert!(matches!(outcome, AdminOutcome::Kicked { delivery, .. } if delivery.delivered == 1));

        assert!(bob.is_kicked());
        assert!(bob.is_closed());
        assert!(registry.find_by_name("bob").await.is_none());
        assert_eq!(registry.len().await, 1);

        let mut received = String::new();
        bob_rx.read_to_string(&mut received).await.unwrap();
        assert_eq!(received, format!("{KICK_NOTICE}\n"));

        let notice = next_line(&mut alice_rx).await.unwrap();
        assert!(notice.ends_with("] Bob foi expulso pelo servidor."), "got {notice:?}");
    }

    #[tokio::test]
    async fn test_kick_unknown_name() {
        let (console, registry) = console();
        let (_alice, mut alice_rx) = connect(&registry, 1, Some("alice")).await;

        let outcome = console.handle_line("kick zoe").await;
        assert_eq!(
            outcome,
            AdminOutcome::NotFound {
                target: "zoe".to_string()
            }
        );
        assert_eq!(outcome.to_string(), "Cliente 'zoe' não encontrado.");
        assert_eq!(registry.len().await, 1);
        assert_eq!(next_line(&mut alice_rx).await, None);
    }

    #[tokio::test]
    async fn test_kick_first_of_duplicates() {
        let (console, registry) = console();
        let (first, _rx1) = connect(&registry, 1, Some("ana")).await;
        let (second, _rx2) = connect(&registry, 2, Some("ANA")).await;

        console.kick("Ana").await;
        assert!(first.is_kicked());
        assert!(!second.is_kicked());
        assert_eq!(registry.len().await, 1);
    }

    #[tokio::test]
    async fn test_ignored_line_has_no_output() {
        let (console, _registry) = console();
        let outcome = console.handle_line("what").await;
        assert_eq!(outcome, AdminOutcome::Ignored);
        assert_eq!(outcome.to_string(), "");
    }
}
