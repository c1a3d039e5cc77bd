//! Simulation bridge: the console's view of the host world
//!
//! The host world is single-threaded mutable state. The console never touches
//! it from a connection worker: every read and write goes through
//! [`SimulationHandle`], which queues closures onto the one task that owns the
//! [`World`].

pub mod actor;
pub mod broker;
pub mod memory;

use std::time::Duration;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::auth::AccessLevel;

pub use actor::{SimulationActor, SimulationHandle, SimulationQueue};
pub use broker::{ActorLease, ActorOrigin, PrivilegedActor, PrivilegedActorBroker, Retention};
pub use memory::{InMemoryWorld, WorldProbe};

/// Identifier of an actor inside the host world
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct ActorId(pub u64);

impl std::fmt::Display for ActorId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// World position of an actor
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Location {
    pub x: i32,
    pub y: i32,
    pub z: i32,
    pub map: String,
}

impl std::fmt::Display for Location {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "({}, {}, {}) ({})", self.x, self.y, self.z, self.map)
    }
}

/// Snapshot of one actor registered with the world
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ActorInfo {
    pub id: ActorId,
    pub name: String,
    pub access: AccessLevel,
    pub location: Location,
    /// Backed by a live client connection
    pub connected: bool,
    /// Torn down but not yet collected by the host
    pub deleted: bool,
}

/// Request for a console-owned actor
#[derive(Debug, Clone)]
pub struct ActorSpec {
    pub name: String,
    pub access: AccessLevel,
    pub hidden: bool,
    pub immobile: bool,
    pub interactive: bool,
}

/// Account as known to the host
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AccountInfo {
    pub username: String,
    pub access: AccessLevel,
}

/// Host-side counters for `status`
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct WorldStats {
    pub uptime: Duration,
    pub connected_actors: usize,
    pub total_actors: usize,
    pub total_items: usize,
}

/// Errors raised by the host world
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum WorldError {
    #[error("account already exists: {0}")]
    AccountExists(String),

    #[error("account not found: {0}")]
    AccountNotFound(String),

    #[error("actor not found: {0}")]
    ActorNotFound(ActorId),

    #[error("command rejected: {0}")]
    CommandRejected(String),

    #[error("session closed")]
    SessionClosed,
}

/// The host simulation as seen by the console.
///
/// Implementations are driven from a single task and may assume exclusive
/// access for the duration of each call.
pub trait World: Send + 'static {
    fn stats(&self) -> WorldStats;

    /// Every actor currently registered, connected or not
    fn actors(&self) -> Vec<ActorInfo>;

    fn spawn_actor(&mut self, spec: ActorSpec) -> Result<ActorId, WorldError>;

    /// Remove an actor; false if it was already gone
    fn remove_actor(&mut self, id: ActorId) -> bool;

    /// Run a command line through the host's command interpreter as `actor`
    fn execute(&mut self, actor: ActorId, command: &str) -> Result<(), WorldError>;

    fn broadcast(&mut self, message: &str);

    fn accounts(&self) -> Vec<AccountInfo>;

    fn create_account(
        &mut self,
        username: &str,
        password: &str,
        access: AccessLevel,
    ) -> Result<(), WorldError>;

    fn set_access(&mut self, username: &str, access: AccessLevel) -> Result<(), WorldError>;

    fn actor(&self, id: ActorId) -> Option<ActorInfo> {
        self.actors().into_iter().find(|a| a.id == id)
    }

    fn account(&self, username: &str) -> Option<AccountInfo> {
        self.accounts()
            .into_iter()
            .find(|a| a.username.eq_ignore_ascii_case(username))
    }
}
