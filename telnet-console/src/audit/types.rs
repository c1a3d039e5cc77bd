//! Audit domain types: AuditEvent and the reasons carried by it

use std::net::SocketAddr;

use crate::auth::AccessLevel;
use crate::session::{SessionId, Termination};

/// Which gate refused a connection
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RejectReason {
    NotAllowed,
    AtCapacity,
    LockedOut,
}

impl RejectReason {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::NotAllowed => "address not allowed",
            Self::AtCapacity => "session limit reached",
            Self::LockedOut => "address locked out",
        }
    }
}

/// How a session came to an end
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EndReason {
    Exit,
    Disconnected,
    AuthenticationFailed,
    IdleTimeout,
    Shutdown,
    Error,
}

impl EndReason {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Exit => "exit",
            Self::Disconnected => "disconnected",
            Self::AuthenticationFailed => "authentication failed",
            Self::IdleTimeout => "idle timeout",
            Self::Shutdown => "shutdown",
            Self::Error => "error",
        }
    }
}

impl From<Termination> for EndReason {
    fn from(t: Termination) -> Self {
        match t {
            Termination::IdleTimeout => Self::IdleTimeout,
            Termination::Shutdown => Self::Shutdown,
        }
    }
}

/// One line of the audit log
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AuditEvent {
    ConsoleStarted { port: u16 },
    ConsoleStopped,
    ConnectionRejected { remote: SocketAddr, reason: RejectReason },
    SessionStarted { session: SessionId, remote: SocketAddr },
    LoginSucceeded { session: SessionId, username: String, access: AccessLevel, remote: SocketAddr },
    LoginFailed { username: String, remote: SocketAddr },
    TooManyAttempts { remote: SocketAddr },
    LockedOut { remote: SocketAddr, failures: u32 },
    CommandExecuted { username: String, command: String },
    CommandDenied { username: String, command: String },
    Broadcast { username: String, message: String },
    AccountCreated { by: String, username: String, access: AccessLevel },
    AccessChanged { by: String, username: String, access: AccessLevel },
    UserAdded { username: String, access: AccessLevel },
    UserRemoved { username: String },
    SessionEnded { session: SessionId, username: String, reason: EndReason },
}

impl AuditEvent {
    /// Short machine-friendly tag, used as a tracing field
    pub fn kind(&self) -> &'static str {
        match self {
            Self::ConsoleStarted { .. } => "console_started",
            Self::ConsoleStopped => "console_stopped",
            Self::ConnectionRejected { .. } => "connection_rejected",
            Self::SessionStarted { .. } => "session_started",
            Self::LoginSucceeded { .. } => "login_succeeded",
            Self::LoginFailed { .. } => "login_failed",
            Self::TooManyAttempts { .. } => "too_many_attempts",
            Self::LockedOut { .. } => "locked_out",
            Self::CommandExecuted { .. } => "command_executed",
            Self::CommandDenied { .. } => "command_denied",
            Self::Broadcast { .. } => "broadcast",
            Self::AccountCreated { .. } => "account_created",
            Self::AccessChanged { .. } => "access_changed",
            Self::UserAdded { .. } => "user_added",
            Self::UserRemoved { .. } => "user_removed",
            Self::SessionEnded { .. } => "session_ended",
        }
    }
}

impl std::fmt::Display for AuditEvent {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::ConsoleStarted { port } => write!(f, "Telnet console started on port {port}"),
            Self::ConsoleStopped => f.write_str("Telnet console stopped"),
            Self::ConnectionRejected { remote, reason } => {
                write!(f, "Connection rejected from {remote}: {}", reason.as_str())
            }
            Self::SessionStarted { session, remote } => {
                write!(f, "Session {session} opened from {remote}")
            }
            Self::LoginSucceeded { session, username, access, remote } => {
                write!(f, "Login: {username} ({access}) from {remote}, session {session}")
            }
            Self::LoginFailed { username, remote } => {
                write!(f, "Failed login attempt: {username}@{remote}")
            }
            Self::TooManyAttempts { remote } => {
                write!(f, "Too many failed login attempts from {remote}")
            }
            Self::LockedOut { remote, failures } => {
                write!(f, "Address {} locked out after {failures} failed attempts", remote.ip())
            }
            Self::CommandExecuted { username, command } => {
                write!(f, "{username} executed: {command}")
            }
            Self::CommandDenied { username, command } => {
                write!(f, "{username} denied: {command}")
            }
            Self::Broadcast { username, message } => {
                write!(f, "{username} broadcast: {message}")
            }
            Self::AccountCreated { by, username, access } => {
                write!(f, "{by} created account {username} ({access})")
            }
            Self::AccessChanged { by, username, access } => {
                write!(f, "{by} set access of {username} to {access}")
            }
            Self::UserAdded { username, access } => {
                write!(f, "Console user added: {username} ({access})")
            }
            Self::UserRemoved { username } => write!(f, "Console user removed: {username}"),
            Self::SessionEnded { session, username, reason } => {
                write!(f, "Session {session} ({username}) ended: {}", reason.as_str())
            }
        }
    }
}
