//! Session module: per-connection state and the registry of live sessions

pub mod types;
pub mod registry;

pub use registry::{EvictedSession, SessionRegistry};
pub use types::{Session, SessionId, Termination};
