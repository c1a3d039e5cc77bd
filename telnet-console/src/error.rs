//! Error types for telnet-console: Railway Programming
//!
//! All operations return `Result<T, ConsoleError>`.
//! No panics, no unwraps in production code paths.

use thiserror::Error;

/// Unified error type for all console operations
#[derive(Error, Debug)]
pub enum ConsoleError {
    // ─── Startup Errors ───

    #[error("No available ports between {start} and {end}")]
    PortRangeExhausted { start: u16, end: u16 },

    #[error("Failed to bind port {port}: {source}")]
    Bind {
        port: u16,
        #[source]
        source: std::io::Error,
    },

    #[error("Configuration error: {0}")]
    Config(String),

    // ─── Auth Errors ───

    #[error("Invalid credentials")]
    InvalidCredentials,

    #[error("User not found: {0}")]
    UserNotFound(String),

    #[error("User already exists: {0}")]
    UserAlreadyExists(String),

    #[error("Insufficient access level: required={required}, have={actual}")]
    InsufficientAccess { required: String, actual: String },

    #[error("Unknown access level: {0}")]
    UnknownAccessLevel(String),

    // ─── Command Errors ───

    #[error("Usage: {0}")]
    Usage(String),

    // ─── Infrastructure Errors ───

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Actor unavailable: {0}")]
    ActorUnavailable(String),

    #[error("Internal error: {0}")]
    Internal(String),
}

/// Result type alias for console operations
pub type Result<T> = std::result::Result<T, ConsoleError>;
