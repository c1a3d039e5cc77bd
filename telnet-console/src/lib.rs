//! # Telnet Console
//!
//! Remote administrative console for a live, single-threaded simulation.
//! Operators connect over plain TCP, authenticate against a salted-digest
//! credential store and issue built-in verbs or raw simulation commands.
//!
//! ## Architecture
//!
//! ```text
//! ┌──────────────────────────────────────────────────┐
//! │                    Listener                       │
//! │  port-range bind · allow-list · cap · lockout     │
//! ├────────────────┬─────────────────┬───────────────┤
//! │ Authenticator  │ SessionRegistry │  Maintenance  │
//! │ (Credential-   │ (cap, idle      │  (idle sweep, │
//! │  Actor,        │  sweep, drain)  │   failure     │
//! │  LockoutTracker)│                │   eviction)   │
//! ├────────────────┴─────────────────┴───────────────┤
//! │        CommandRouter  ──▶  PrivilegedActorBroker  │
//! ├──────────────────────────────────────────────────┤
//! │   SimulationActor (serialized jobs on the World)  │
//! └──────────────────────────────────────────────────┘
//!            AuditActor: one line per event
//! ```
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use telnet_console::auth::{AccessLevel, CredentialActor, PasswordDigest};
//! use telnet_console::simulation::{InMemoryWorld, SimulationActor};
//! use telnet_console::{Console, ConsoleConfig};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let config = ConsoleConfig::new().with_password_salt("pepper");
//!     let credentials = CredentialActor::spawn_with_users(
//!         PasswordDigest::new(config.password_salt.clone()),
//!         [("admin".into(), "changeme".into(), AccessLevel::Administrator)],
//!     );
//!     let world = SimulationActor::spawn(InMemoryWorld::new());
//!
//!     let console = Console::start(config, credentials, world).await?;
//!     println!("listening on {}", console.port());
//!
//!     tokio::signal::ctrl_c().await?;
//!     console.shutdown().await?;
//!     Ok(())
//! }
//! ```
//!
//! ## Features
//!
//! - **Gated accept**: allow-list, concurrency cap and address lockout, all silent
//! - **Lockouts**: per-address failure counting with lazy expiry and periodic eviction
//! - **Serialized bridge**: the world is only ever touched from its own job queue
//! - **Scoped actors**: console-created privileged actors die with their session
//! - **Audit trail**: `[YYYY-MM-DD HH:MM:SS] <event>` lines, append-only
//! - **Railway Programming**: All operations return `Result<T, ConsoleError>`

pub mod config;
pub mod error;
pub mod auth;
pub mod audit;
pub mod session;
pub mod simulation;
pub mod telnet;
pub mod connection;
pub mod router;
pub mod maintenance;
pub mod listener;

// Re-exports for convenience
pub use config::ConsoleConfig;
pub use error::{ConsoleError, Result};
pub use listener::{bind_port_range, Console, ConsoleInfo};
pub use maintenance::MaintenanceScheduler;

pub use auth::{AccessLevel, CredentialActor, CredentialHandle, LockoutTracker, PasswordDigest};
pub use audit::{AuditActor, AuditEvent, AuditHandle};
pub use router::{CommandRouter, Verb};
pub use session::{Session, SessionId, SessionRegistry, Termination};
pub use simulation::{
    InMemoryWorld, PrivilegedActorBroker, SimulationActor, SimulationHandle, World, WorldError,
};
