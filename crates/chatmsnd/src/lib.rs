//! chatmsn daemon - client registry and broadcast server
//!
//! This crate provides the core infrastructure for the chat server:
//! - `registry` - Client registry actor, the single source of truth for who is online
//! - `session` - One connection: shared writer, name, kicked/closed flags
//! - `broadcast` - Fan-out of chat lines to every registered session
//! - `server` - TCP accept loop and the per-connection lifecycle controller
//! - `admin` - Operator commands (`list`, `/<text>`, `kick <name>`)
//! - `config` - TOML configuration with defaults
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────┐
//! │                       chatmsnd daemon                       │
//! ├─────────────────────────────────────────────────────────────┤
//! │                                                             │
//! │  ┌─────────────────┐     ┌─────────────────────────────┐    │
//! │  │   ChatServer    │────▶│       RegistryActor         │    │
//! │  │  (TcpListener)  │     │ (ordered Vec<SessionRef>)   │    │
//! │  └────────┬────────┘     └──────────────┬──────────────┘    │
//! │           │                             ▲                   │
//! │           │ connections                 │ snapshot / find   │
//! │           ▼                             │                   │
//! │  ┌───────────────────┐   ┌──────────────┴──────────────┐    │
//! │  │LifecycleController│──▶│        Broadcaster          │    │
//! │  │   (per client)    │   └──────────────▲──────────────┘    │
//! │  └───────────────────┘                  │                   │
//! │                          ┌──────────────┴──────────────┐    │
//! │                          │  AdminConsole (stdin)       │    │
//! │                          └─────────────────────────────┘    │
//! └─────────────────────────────────────────────────────────────┘
//! ```
//!
//! # Panic-Free Guarantees
//!
//! All production code in this crate follows the project panic-free policy:
//! - No `.unwrap()`, `.expect()`, `panic!()`, `unreachable!()`, `todo!()`
//! - All fallible operations return `Result` or `Option`
//! - Channel operations handle closure gracefully

pub mod admin;
pub mod broadcast;
pub mod config;
pub mod registry;
pub mod server;
pub mod session;
