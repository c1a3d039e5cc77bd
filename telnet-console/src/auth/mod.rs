//! Authentication module: credentials, digests, lockouts and the login handshake

pub mod types;
pub mod actor;
pub mod digest;
pub mod lockout;
pub mod authenticator;

pub use actor::{CredentialActor, CredentialHandle};
pub use authenticator::{AuthOutcome, Authenticator};
pub use digest::PasswordDigest;
pub use lockout::{FailureOutcome, FailureRecord, LockoutTracker};
pub use types::{AccessLevel, Credential, CredentialSummary, LoginRecord};
