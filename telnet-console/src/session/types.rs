//! Session domain types: SessionId, Session, Termination

use std::net::{IpAddr, SocketAddr};
use std::time::{Duration, Instant};

use chrono::{DateTime, Local};
use parking_lot::RwLock;
use tokio::sync::mpsc;
use uuid::Uuid;

use crate::auth::AccessLevel;
use crate::config::canonical_ip;
use crate::simulation::broker::ActorLease;

/// Opaque session identifier, unique per accepted connection
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SessionId(Uuid);

impl SessionId {
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }

    /// Eight hex characters, as shown to operators
    pub fn short(&self) -> String {
        let mut s = self.0.simple().to_string();
        s.truncate(8);
        s
    }
}

impl Default for SessionId {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for SessionId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.short())
    }
}

/// Why a session is being ended from outside its own worker
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Termination {
    IdleTimeout,
    Shutdown,
}

impl Termination {
    /// Last line sent to the peer before the socket closes
    pub fn notice(&self) -> &'static str {
        match self {
            Self::IdleTimeout => "Session timed out. Goodbye!",
            Self::Shutdown => "Server is shutting down. Goodbye!",
        }
    }
}

#[derive(Debug)]
struct SessionState {
    username: Option<String>,
    access: AccessLevel,
    last_activity: Instant,
}

/// One accepted connection.
///
/// Identity fields are set once by the authenticator; `last_activity` is
/// bumped by every received line.
pub struct Session {
    id: SessionId,
    remote: SocketAddr,
    connected_at: DateTime<Local>,
    state: RwLock<SessionState>,
    outbox: mpsc::UnboundedSender<String>,
    lease: ActorLease,
}

impl Session {
    /// Create a session and the receiving end of its outbox
    pub fn new(remote: SocketAddr) -> (Self, mpsc::UnboundedReceiver<String>) {
        let (outbox, rx) = mpsc::unbounded_channel();
        let session = Self {
            id: SessionId::new(),
            remote,
            connected_at: Local::now(),
            state: RwLock::new(SessionState {
                username: None,
                access: AccessLevel::Player,
                last_activity: Instant::now(),
            }),
            outbox,
            lease: ActorLease::new(),
        };
        (session, rx)
    }

    pub fn id(&self) -> SessionId {
        self.id
    }

    pub fn remote(&self) -> SocketAddr {
        self.remote
    }

    pub fn remote_ip(&self) -> IpAddr {
        canonical_ip(self.remote.ip())
    }

    pub fn connected_at(&self) -> DateTime<Local> {
        self.connected_at
    }

    pub fn username(&self) -> Option<String> {
        self.state.read().username.clone()
    }

    /// Username for logs and listings
    pub fn display_name(&self) -> String {
        self.username().unwrap_or_else(|| "Not authenticated".to_string())
    }

    pub fn access(&self) -> AccessLevel {
        self.state.read().access
    }

    pub fn is_authenticated(&self) -> bool {
        self.state.read().username.is_some()
    }

    /// Record the authenticated identity
    pub fn set_identity(&self, username: impl Into<String>, access: AccessLevel) {
        let mut state = self.state.write();
        state.username = Some(username.into());
        state.access = access;
    }

    pub fn touch(&self) {
        self.touch_at(Instant::now());
    }

    pub fn touch_at(&self, at: Instant) {
        self.state.write().last_activity = at;
    }

    pub fn last_activity(&self) -> Instant {
        self.state.read().last_activity
    }

    pub fn idle_for(&self, now: Instant) -> Duration {
        now.saturating_duration_since(self.last_activity())
    }

    /// Queue a line for delivery by the session's worker.
    ///
    /// Returns false once the worker has gone away.
    pub fn notify(&self, line: impl Into<String>) -> bool {
        self.outbox.send(line.into()).is_ok()
    }

    pub fn lease(&self) -> &ActorLease {
        &self.lease
    }
}

impl std::fmt::Debug for Session {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Session")
            .field("id", &self.id)
            .field("remote", &self.remote)
            .field("username", &self.username())
            .field("access", &self.access())
            .finish()
    }
}
