//! Integration tests for the TCP chat server.
//!
//! These tests run the ChatServer on an ephemeral loopback port and talk
//! to it over real sockets: name negotiation, relaying, exits, kicks and
//! graceful shutdown.
//!
//! Tests CAN use `.unwrap()` and `.expect()`. We test the panic-free
//! behavior of production code through assertions.

use std::net::SocketAddr;
use std::time::Duration;

use chatmsn_protocol::{DEFAULT_BANNER, KICK_NOTICE, NAME_PROMPT};
use chatmsnd::admin::{AdminConsole, AdminOutcome};
use chatmsnd::broadcast::Broadcaster;
use chatmsnd::config::ServerConfig;
use chatmsnd::registry::{spawn_registry, RegistryHandle};
use chatmsnd::server::ChatServer;
use tokio::io::{AsyncBufReadExt, AsyncReadExt, AsyncWriteExt, BufReader};
use tokio::net::tcp::{OwnedReadHalf, OwnedWriteHalf};
use tokio::net::TcpStream;
use tokio::time::{sleep, timeout};
use tokio_util::sync::CancellationToken;

// ============================================================================
// Constants
// ============================================================================

/// Maximum time to wait for one line from the server
const RECV_TIMEOUT: Duration = Duration::from_secs(2);

/// How long to wait before concluding no more lines are coming
const QUIET_PERIOD: Duration = Duration::from_millis(200);

/// Grace period for server shutdown
const SHUTDOWN_GRACE_PERIOD: Duration = Duration::from_millis(100);

// ============================================================================
// Test Helpers
// ============================================================================

/// Test server context that manages server lifecycle.
struct TestServer {
    addr: SocketAddr,
    registry: RegistryHandle,
    admin: AdminConsole,
    cancel_token: CancellationToken,
}

impl TestServer {
    /// Spawns a server with the default banner.
    async fn spawn() -> Self {
        Self::spawn_with_banner(DEFAULT_BANNER.iter().map(|l| l.to_string()).collect()).await
    }

    async fn spawn_with_banner(banner: Vec<String>) -> Self {
        let config = ServerConfig {
            bind_address: "127.0.0.1".to_string(),
            port: 0,
            banner,
            ..Default::default()
        };

        let registry = spawn_registry();
        let cancel_token = CancellationToken::new();

        let server = ChatServer::bind(&config, registry.clone(), cancel_token.clone())
            .await
            .expect("bind test server");
        let addr = server.local_addr().expect("local addr");

        tokio::spawn(async move {
            let _ = server.run().await;
        });

        Self {
            addr,
            admin: AdminConsole::new(registry.clone(), Broadcaster::new(registry.clone())),
            registry,
            cancel_token,
        }
    }

    /// Opens a connection and reads the greeting through the name prompt.
    async fn connect(&self) -> TestClient {
        let stream = TcpStream::connect(self.addr).await.expect("connect to server");
        let mut client = TestClient::new(stream);
        client.read_greeting().await;
        client
    }

    /// Connects and sends a name.
    async fn join(&self, name: &str) -> TestClient {
        let mut client = self.connect().await;
        client.send(name).await;
        client
    }

    /// Waits until `count` sessions have a name.
    async fn wait_for_named(&self, count: usize) {
        let start = tokio::time::Instant::now();
        while start.elapsed() < RECV_TIMEOUT {
            let named = self
                .registry
                .snapshot()
                .await
                .iter()
                .filter(|s| s.name().is_some())
                .count();
            if named >= count {
                return;
            }
            sleep(Duration::from_millis(10)).await;
        }
        panic!("{count} named sessions did not appear within {RECV_TIMEOUT:?}");
    }

    /// Shuts down the server gracefully.
    async fn shutdown(self) {
        self.cancel_token.cancel();
        sleep(SHUTDOWN_GRACE_PERIOD).await;
    }
}

/// Test client connection with line helpers.
struct TestClient {
    reader: BufReader<OwnedReadHalf>,
    writer: OwnedWriteHalf,
}

impl TestClient {
    fn new(stream: TcpStream) -> Self {
        let (reader, writer) = stream.into_split();
        Self {
            reader: BufReader::new(reader),
            writer,
        }
    }

    async fn send(&mut self, line: &str) {
        self.writer.write_all(line.as_bytes()).await.unwrap();
        self.writer.write_all(b"\n").await.unwrap();
        self.writer.flush().await.unwrap();
    }

    /// Receives one line, or `None` on EOF.
    async fn recv(&mut self) -> Option<String> {
        let mut line = String::new();
        let n = timeout(RECV_TIMEOUT, self.reader.read_line(&mut line))
            .await
            .expect("timed out waiting for a line")
            .unwrap();
        (n > 0).then(|| line.trim_end_matches(['\r', '\n']).to_string())
    }

    /// Asserts that nothing arrives for a short while.
    async fn expect_silence(&mut self) {
        let mut line = String::new();
        if let Ok(result) = timeout(QUIET_PERIOD, self.reader.read_line(&mut line)).await {
            let n = result.unwrap();
            assert_eq!(n, 0, "unexpected line: {line:?}");
        }
    }

    /// Reads lines up to and including the name prompt.
    async fn read_greeting(&mut self) -> Vec<String> {
        let mut lines = Vec::new();
        loop {
            let line = self.recv().await.expect("EOF during greeting");
            let done = line == NAME_PROMPT;
            lines.push(line);
            if done {
                return lines;
            }
        }
    }

    /// Reads until the server closes the connection.
    async fn read_to_eof(&mut self) -> String {
        let mut rest = String::new();
        timeout(RECV_TIMEOUT, self.reader.read_to_string(&mut rest))
            .await
            .expect("timed out waiting for EOF")
            .unwrap();
        rest
    }
}

/// Strips the `[HH:MM:SS] ` prefix of a notice.
fn body(line: &str) -> &str {
    assert!(line.starts_with('['), "not a timestamped notice: {line:?}");
    assert_eq!(line.as_bytes().get(9), Some(&b']'), "bad timestamp: {line:?}");
    &line[11..]
}

// ============================================================================
// Connection Tests
// ============================================================================

#[tokio::test]
async fn test_greeting_is_banner_then_prompt() {
    let server = TestServer::spawn().await;
    let stream = TcpStream::connect(server.addr).await.unwrap();
    let mut client = TestClient::new(stream);

    let greeting = client.read_greeting().await;
    let mut expected: Vec<String> = DEFAULT_BANNER.iter().map(|l| l.to_string()).collect();
    expected.push(NAME_PROMPT.to_string());
    assert_eq!(greeting, expected);

    server.shutdown().await;
}

#[tokio::test]
async fn test_unnamed_connection_is_listed() {
    let server = TestServer::spawn_with_banner(Vec::new()).await;
    let _pending = server.connect().await;

    let outcome = server.admin.handle_line("list").await;
    let AdminOutcome::Listing(entries) = &outcome else {
        panic!("expected listing, got {outcome:?}");
    };
    assert_eq!(entries.len(), 1);
    assert_eq!(entries[0].name, None);

    server.shutdown().await;
}

#[tokio::test]
async fn test_disconnect_before_name_is_silent() {
    let server = TestServer::spawn().await;
    let mut alice = server.join("alice").await;
    server.wait_for_named(1).await;

    let ghost = server.connect().await;
    drop(ghost);

    alice.expect_silence().await;

    let start = tokio::time::Instant::now();
    while server.registry.len().await > 1 && start.elapsed() < RECV_TIMEOUT {
        sleep(Duration::from_millis(10)).await;
    }
    assert_eq!(server.registry.len().await, 1);

    server.shutdown().await;
}

// ============================================================================
// Chat Flow Tests
// ============================================================================

#[tokio::test]
async fn test_alice_bob_chat_and_kick() {
    let server = TestServer::spawn().await;

    let mut alice = server.join("alice").await;
    server.wait_for_named(1).await;

    let mut bob = server.join("bob").await;
    assert_eq!(body(&alice.recv().await.unwrap()), "bob entrou no chat.");

    bob.send("hi").await;
    assert_eq!(body(&alice.recv().await.unwrap()), "[bob] hi");

    alice.send("hello bob").await;
    assert_eq!(body(&bob.recv().await.unwrap()), "[alice] hello bob");

    let outcome = server.admin.handle_line("kick BOB").await;
    assert_eq!(outcome.to_string(), "Cliente 'BOB' foi expulso.");

    assert_eq!(bob.recv().await.as_deref(), Some(KICK_NOTICE));
    assert_eq!(bob.read_to_eof().await, "");

    assert_eq!(
        body(&alice.recv().await.unwrap()),
        "bob foi expulso pelo servidor."
    );
    // No "saiu do chat" for a kicked client
    alice.expect_silence().await;

    assert_eq!(server.registry.len().await, 1);
    server.shutdown().await;
}

#[tokio::test]
async fn test_exit_command_announces_departure() {
    let server = TestServer::spawn().await;

    let mut alice = server.join("alice").await;
    server.wait_for_named(1).await;
    let mut bob = server.join("bob").await;
    alice.recv().await.unwrap();

    bob.send("/exit").await;
    assert_eq!(bob.read_to_eof().await, "");

    let line = alice.recv().await.unwrap();
    let text = body(&line);
    assert!(text.starts_with("bob saiu do chat (online por 0 min "), "got {text:?}");
    assert!(text.ends_with(" s)"));
    alice.expect_silence().await;

    server.shutdown().await;
}

#[tokio::test]
async fn test_abrupt_disconnect_announces_departure() {
    let server = TestServer::spawn().await;

    let mut alice = server.join("alice").await;
    server.wait_for_named(1).await;
    let bob = server.join("bob").await;
    alice.recv().await.unwrap();

    drop(bob);

    let line = alice.recv().await.unwrap();
    assert!(body(&line).starts_with("bob saiu do chat"), "got {line:?}");

    server.shutdown().await;
}

#[tokio::test]
async fn test_server_broadcast_reaches_all() {
    let server = TestServer::spawn().await;

    let mut alice = server.join("alice").await;
    server.wait_for_named(1).await;
    let mut bob = server.join("bob").await;
    assert_eq!(body(&alice.recv().await.unwrap()), "bob entrou no chat.");

    server.admin.handle_line("/Servidor reinicia às 18h").await;

    for client in [&mut alice, &mut bob] {
        let line = client.recv().await.unwrap();
        assert_eq!(body(&line), "[Servidor] Servidor reinicia às 18h");
    }

    server.shutdown().await;
}

#[tokio::test]
async fn test_kick_unknown_name_reports_not_found() {
    let server = TestServer::spawn().await;
    let mut alice = server.join("alice").await;
    server.wait_for_named(1).await;

    let outcome = server.admin.handle_line("kick zoe").await;
    assert_eq!(outcome.to_string(), "Cliente 'zoe' não encontrado.");
    alice.expect_silence().await;

    server.shutdown().await;
}

// ============================================================================
// Concurrency Tests
// ============================================================================

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_concurrent_joins_each_see_all_others() {
    const CLIENTS: usize = 50;

    let server = TestServer::spawn_with_banner(Vec::new()).await;

    // Everyone is registered once the prompt has arrived
    let mut clients = Vec::with_capacity(CLIENTS);
    for _ in 0..CLIENTS {
        clients.push(server.connect().await);
    }

    let mut tasks = Vec::with_capacity(CLIENTS);
    for (i, mut client) in clients.into_iter().enumerate() {
        tasks.push(tokio::spawn(async move {
            client.send(&format!("user{i}")).await;

            let mut joins = 0;
            while joins < CLIENTS - 1 {
                let line = client.recv().await.expect("EOF while counting joins");
                assert!(line.ends_with(" entrou no chat."), "got {line:?}");
                assert!(!line.contains(&format!("] user{i} entrou")), "saw own join");
                joins += 1;
            }
            client.expect_silence().await;
            client
        }));
    }

    let mut finished = Vec::with_capacity(CLIENTS);
    for task in tasks {
        finished.push(task.await.unwrap());
    }

    assert_eq!(server.registry.len().await, CLIENTS);
    server.shutdown().await;
}

// ============================================================================
// Shutdown Tests
// ============================================================================

#[tokio::test]
async fn test_shutdown_closes_sessions() {
    let server = TestServer::spawn().await;
    let mut alice = server.join("alice").await;
    server.wait_for_named(1).await;

    let registry = server.registry.clone();
    server.shutdown().await;

    assert_eq!(alice.read_to_eof().await, "");

    let start = tokio::time::Instant::now();
    while !registry.is_empty().await && start.elapsed() < RECV_TIMEOUT {
        sleep(Duration::from_millis(10)).await;
    }
    assert!(registry.is_empty().await);
}
