//! chatmsn daemon - group chat server with an operator console
//!
//! Accepts chat clients over TCP and reads operator commands from stdin.
//! Logs go to stderr; stdout is the operator console.
//!
//! # Usage
//!
//! ```bash
//! # Listen on the default port (22230)
//! chatmsnd
//!
//! # Custom port, no rules banner
//! chatmsnd --port 4000 --no-banner
//!
//! # Explicit config file
//! chatmsnd --config ./server.toml
//! ```
//!
//! Console commands: `list`, `lista`, `/<text>`, `kick <name>`.

use std::path::PathBuf;
use std::process;
use std::time::Duration;

use anyhow::{Context, Result};
use clap::Parser;
use tokio::io::BufReader;
use tokio_util::sync::CancellationToken;
use tracing::{error, info, warn};
use tracing_subscriber::EnvFilter;

use chatmsnd::admin::{run_console, AdminConsole};
use chatmsnd::config::ServerConfig;
use chatmsnd::registry::spawn_registry;
use chatmsnd::server::ChatServer;

/// How long runtime shutdown waits for tasks still blocked (stdin).
const RUNTIME_SHUTDOWN_TIMEOUT: Duration = Duration::from_millis(500);

/// chatmsn daemon - group chat server
#[derive(Parser, Debug)]
#[command(name = "chatmsnd", version, about)]
struct Args {
    /// Path to a TOML config file (default: <config_dir>/chatmsn/server.toml)
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Port to listen on (overrides config and CHATMSN_PORT)
    #[arg(short, long)]
    port: Option<u16>,

    /// Address to bind (overrides config)
    #[arg(short, long)]
    bind: Option<String>,

    /// Skip the rules banner before the name prompt
    #[arg(long)]
    no_banner: bool,
}

fn main() -> Result<()> {
    let args = Args::parse();

    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(
            EnvFilter::from_default_env()
                .add_directive("chatmsnd=info".parse()?)
                .add_directive("chatmsn_core=info".parse()?)
                .add_directive("chatmsn_protocol=info".parse()?),
        )
        .init();

    let config = load_config(&args)?;

    // Built by hand so shutdown can give up on the blocking stdin read
    let runtime = tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()
        .context("Failed to start async runtime")?;

    let result = runtime.block_on(run_server(config));
    runtime.shutdown_timeout(RUNTIME_SHUTDOWN_TIMEOUT);

    result
}

/// Defaults, then the config file, then `CHATMSN_PORT`, then CLI flags.
fn load_config(args: &Args) -> Result<ServerConfig> {
    let mut config = match args.config.as_ref() {
        Some(path) => ServerConfig::load(path)?,
        None => match ServerConfig::default_path() {
            Some(path) if path.exists() => ServerConfig::load(&path)?,
            _ => ServerConfig::default(),
        },
    };

    config = config.with_env_overrides(|key| std::env::var(key).ok())?;

    if let Some(port) = args.port {
        config.port = port;
    }
    if let Some(bind) = args.bind.as_ref() {
        config.bind_address = bind.clone();
    }
    if args.no_banner {
        config.banner.clear();
    }

    Ok(config)
}

async fn run_server(config: ServerConfig) -> Result<()> {
    info!(
        version = env!("CARGO_PKG_VERSION"),
        pid = process::id(),
        "chatmsn daemon starting"
    );

    let cancel_token = CancellationToken::new();

    let shutdown_token = cancel_token.clone();
    tokio::spawn(async move {
        if let Err(e) = wait_for_shutdown_signal().await {
            error!(error = %e, "Error waiting for shutdown signal");
        }
        info!("Shutdown signal received");
        shutdown_token.cancel();
    });

    let registry = spawn_registry();
    info!("Client registry started");

    let server = ChatServer::bind(&config, registry.clone(), cancel_token.clone()).await?;
    let address = server.local_addr()?;
    println!("Servidor iniciado na porta {}", address.port());

    let console = AdminConsole::new(registry, server.broadcaster());
    let console_token = cancel_token.clone();
    tokio::spawn(async move {
        let stdin = BufReader::new(tokio::io::stdin());
        if let Err(e) = run_console(stdin, tokio::io::stdout(), console, console_token).await {
            warn!(error = %e, "Operator console stopped");
        }
    });

    if let Err(e) = server.run().await {
        error!(error = %e, "Server error");
        return Err(e.into());
    }

    info!("chatmsn daemon stopped");
    Ok(())
}

async fn wait_for_shutdown_signal() -> Result<()> {
    #[cfg(unix)]
    {
        use tokio::signal::unix::{signal, SignalKind};

        let mut sigterm = signal(SignalKind::terminate())?;
        let mut sigint = signal(SignalKind::interrupt())?;

        tokio::select! {
            _ = sigterm.recv() => {
                info!("Received SIGTERM");
            }
            _ = sigint.recv() => {
                info!("Received SIGINT");
            }
        }
    }

    #[cfg(not(unix))]
    {
        tokio::signal::ctrl_c().await?;
        info!("Received Ctrl+C");
    }

    Ok(())
}
