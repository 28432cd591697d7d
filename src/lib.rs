//! # OpenRelay
//!
//! A task-based agent-to-agent delegation framework built with Rust.
//!
//! One agent delegates work to another over HTTP, tracking the work as a
//! stateful, potentially long-running task instead of a single blocking
//! call.
//!
//! ## Features
//!
//! - **Skill Catalog:** Schema-described capabilities discovered via an
//!   agent card served at a well-known path
//! - **Task Lifecycle:** `pending → running → {completed, failed,
//!   cancelled}` with append-only messages and artifacts
//! - **Cooperative Cancellation:** Per-task cancellation tokens; handlers
//!   observe the signal, the manager never preempts
//! - **JSON-RPC Transport:** A single dispatch endpoint backed by the task
//!   manager, plus a polling client with exponential backoff

pub mod client;
pub mod config;
pub mod error;
pub mod protocol;
pub mod server;
pub mod skill;
pub mod task;

pub use client::AgentClient;
pub use config::Config;
pub use error::{Error, Result};
pub use server::AgentServer;
pub use skill::{SkillHandler, SkillRegistry};
pub use task::{Task, TaskManager, TaskStatus};

/// Application version from Cargo.toml
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Application name
pub const NAME: &str = env!("CARGO_PKG_NAME");
