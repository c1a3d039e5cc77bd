//! CredentialActor: Tokio actor owning the operator credential store
//!
//! All operations are processed sequentially via an mpsc channel, so a
//! login's verify-and-update of login statistics is atomic with respect to
//! concurrent registrations and removals.
//!
//! # Usage
//!
//! ```rust,no_run
//! use telnet_console::auth::{AccessLevel, CredentialActor, PasswordDigest};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let handle = CredentialActor::spawn(PasswordDigest::new("my-salt"));
//!
//!     handle.add_user("admin".into(), "changeme".into(), AccessLevel::Administrator).await?;
//!
//!     let record = handle.verify("ADMIN".into(), "changeme".into()).await?;
//!     assert_eq!(record.access, AccessLevel::Administrator);
//!     Ok(())
//! }
//! ```

use std::collections::HashMap;

use chrono::Local;
use tokio::sync::{mpsc, oneshot};
use tracing::{debug, info};

use crate::error::{ConsoleError, Result};

use super::digest::PasswordDigest;
use super::types::*;

// ─── Actor Messages ───

enum CredentialMsg {
    Verify {
        username: String,
        password: String,
        reply: oneshot::Sender<Result<LoginRecord>>,
    },
    AddUser {
        username: String,
        password: String,
        access: AccessLevel,
        reply: oneshot::Sender<Result<CredentialSummary>>,
    },
    RemoveUser {
        username: String,
        reply: oneshot::Sender<Result<()>>,
    },
    ListUsers {
        reply: oneshot::Sender<Vec<CredentialSummary>>,
    },
    Count {
        reply: oneshot::Sender<usize>,
    },
}

// ─── Actor ───

/// Credential store actor: processes credential operations sequentially
pub struct CredentialActor {
    users: HashMap<String, Credential>,
    digest: PasswordDigest,
    rx: mpsc::Receiver<CredentialMsg>,
}

impl CredentialActor {
    /// Spawn an empty credential store and return a handle for sending messages
    pub fn spawn(digest: PasswordDigest) -> CredentialHandle {
        Self::spawn_with_users(digest, std::iter::empty())
    }

    /// Spawn with a bootstrap set of `(username, password, access)` entries.
    ///
    /// Later duplicates of a username (case-insensitive) are ignored.
    pub fn spawn_with_users(
        digest: PasswordDigest,
        users: impl IntoIterator<Item = (String, String, AccessLevel)>,
    ) -> CredentialHandle {
        let mut map = HashMap::new();
        for (username, password, access) in users {
            let key = Credential::key(&username);
            if key.is_empty() || map.contains_key(&key) {
                continue;
            }
            let digest_value = digest.digest(&password);
            map.insert(key, Credential::new(username.trim(), digest_value, access));
        }

        let (tx, rx) = mpsc::channel(256);
        let count = map.len();
        let actor = Self {
            users: map,
            digest,
            rx,
        };

        tokio::spawn(actor.run());
        info!(users = count, "CredentialActor spawned");
        CredentialHandle { tx }
    }

    /// Main event loop
    async fn run(mut self) {
        while let Some(msg) = self.rx.recv().await {
            match msg {
                CredentialMsg::Verify { username, password, reply } => {
                    let _ = reply.send(self.handle_verify(&username, &password));
                }
                CredentialMsg::AddUser { username, password, access, reply } => {
                    let _ = reply.send(self.handle_add_user(username, &password, access));
                }
                CredentialMsg::RemoveUser { username, reply } => {
                    let _ = reply.send(self.handle_remove_user(&username));
                }
                CredentialMsg::ListUsers { reply } => {
                    let mut users: Vec<CredentialSummary> =
                        self.users.values().map(CredentialSummary::from).collect();
                    users.sort_by(|a, b| a.username.to_lowercase().cmp(&b.username.to_lowercase()));
                    let _ = reply.send(users);
                }
                CredentialMsg::Count { reply } => {
                    let _ = reply.send(self.users.len());
                }
            }
        }
        info!("CredentialActor stopped");
    }

    // ─── Handler Implementations ───

    fn handle_verify(&mut self, username: &str, password: &str) -> Result<LoginRecord> {
        // Unknown user and wrong password are indistinguishable to the caller
        let user = self
            .users
            .get_mut(&Credential::key(username))
            .ok_or(ConsoleError::InvalidCredentials)?;

        if !self.digest.verify(password, &user.password_digest) {
            debug!(username = %user.username, "Password digest mismatch");
            return Err(ConsoleError::InvalidCredentials);
        }

        let previous_login = user.last_login;
        user.last_login = Some(Local::now());
        user.login_count += 1;

        Ok(LoginRecord {
            username: user.username.clone(),
            access: user.access,
            previous_login,
            login_count: user.login_count,
        })
    }

    fn handle_add_user(
        &mut self,
        username: String,
        password: &str,
        access: AccessLevel,
    ) -> Result<CredentialSummary> {
        let key = Credential::key(&username);
        if key.is_empty() {
            return Err(ConsoleError::Usage("username must not be empty".into()));
        }
        if password.is_empty() {
            return Err(ConsoleError::Usage("password must not be empty".into()));
        }
        if self.users.contains_key(&key) {
            return Err(ConsoleError::UserAlreadyExists(username));
        }

        let credential = Credential::new(username.trim(), self.digest.digest(password), access);
        let summary = CredentialSummary::from(&credential);
        self.users.insert(key, credential);
        info!(username = %summary.username, access = %access, "User added");
        Ok(summary)
    }

    fn handle_remove_user(&mut self, username: &str) -> Result<()> {
        match self.users.remove(&Credential::key(username)) {
            Some(removed) => {
                info!(username = %removed.username, "User removed");
                Ok(())
            }
            None => Err(ConsoleError::UserNotFound(username.to_string())),
        }
    }
}

// ─── Handle (client-facing API) ───

/// Thread-safe handle to communicate with the CredentialActor
#[derive(Clone)]
pub struct CredentialHandle {
    tx: mpsc::Sender<CredentialMsg>,
}

impl CredentialHandle {
    /// Check a username/password pair and record the login on success
    pub async fn verify(&self, username: String, password: String) -> Result<LoginRecord> {
        let (reply, rx) = oneshot::channel();
        self.tx
            .send(CredentialMsg::Verify { username, password, reply })
            .await
            .map_err(|_| ConsoleError::ActorUnavailable("CredentialActor".into()))?;
        rx.await
            .map_err(|_| ConsoleError::ActorUnavailable("CredentialActor dropped".into()))?
    }

    pub async fn add_user(
        &self,
        username: String,
        password: String,
        access: AccessLevel,
    ) -> Result<CredentialSummary> {
        let (reply, rx) = oneshot::channel();
        self.tx
            .send(CredentialMsg::AddUser { username, password, access, reply })
            .await
            .map_err(|_| ConsoleError::ActorUnavailable("CredentialActor".into()))?;
        rx.await
            .map_err(|_| ConsoleError::ActorUnavailable("CredentialActor dropped".into()))?
    }

    pub async fn remove_user(&self, username: String) -> Result<()> {
        let (reply, rx) = oneshot::channel();
        self.tx
            .send(CredentialMsg::RemoveUser { username, reply })
            .await
            .map_err(|_| ConsoleError::ActorUnavailable("CredentialActor".into()))?;
        rx.await
            .map_err(|_| ConsoleError::ActorUnavailable("CredentialActor dropped".into()))?
    }

    pub async fn list_users(&self) -> Vec<CredentialSummary> {
        let (reply, rx) = oneshot::channel();
        if self.tx.send(CredentialMsg::ListUsers { reply }).await.is_err() {
            return vec![];
        }
        rx.await.unwrap_or_default()
    }

    pub async fn count(&self) -> usize {
        let (reply, rx) = oneshot::channel();
        if self.tx.send(CredentialMsg::Count { reply }).await.is_err() {
            return 0;
        }
        rx.await.unwrap_or(0)
    }
}
