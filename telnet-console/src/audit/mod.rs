//! Audit module: append-only, timestamp-prefixed event log
//!
//! Logins, lockouts, executed commands and session ends are written one
//! line per event to the configured audit file.

pub mod types;
pub mod actor;

pub use actor::{AuditActor, AuditHandle, TIMESTAMP_FORMAT};
pub use types::{AuditEvent, EndReason, RejectReason};
