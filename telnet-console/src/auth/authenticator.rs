//! Login handshake
//!
//! `Username: ` then `Password: `, repeated up to the per-connection attempt
//! budget. Blank input uses up an attempt without reaching the credential
//! store. A wrong username and a wrong password produce the same reply.
//! A lockout tripped here only refuses later connections; the current one
//! keeps its remaining attempts.

use std::sync::Arc;

use tokio::io::{AsyncRead, AsyncWrite};
use tracing::{info, warn};

use crate::audit::{AuditEvent, AuditHandle};
use crate::connection::{Connection, Input};
use crate::error::{ConsoleError, Result};
use crate::session::{Session, Termination};

use super::actor::CredentialHandle;
use super::lockout::{FailureOutcome, LockoutTracker};
use super::types::LoginRecord;

/// How the handshake ended
#[derive(Debug, Clone)]
pub enum AuthOutcome {
    Authenticated(LoginRecord),
    /// Attempt budget used up
    Failed,
    /// Peer went away mid-handshake
    Closed,
    Terminated(Termination),
}

enum Field {
    Value(String),
    End(AuthOutcome),
}

/// Drives the login handshake for one connection
#[derive(Clone)]
pub struct Authenticator {
    credentials: CredentialHandle,
    lockout: Arc<LockoutTracker>,
    audit: AuditHandle,
    max_attempts: u32,
}

impl Authenticator {
    pub fn new(
        credentials: CredentialHandle,
        lockout: Arc<LockoutTracker>,
        audit: AuditHandle,
        max_attempts: u32,
    ) -> Self {
        Self {
            credentials,
            lockout,
            audit,
            max_attempts: max_attempts.max(1),
        }
    }

    pub async fn authenticate<S>(&self, conn: &mut Connection<S>, session: &Session) -> Result<AuthOutcome>
    where
        S: AsyncRead + AsyncWrite + Send,
    {
        for attempt in 1..=self.max_attempts {
            conn.send_prompt("Username: ").await?;
            let username = match read_field(conn, session).await? {
                Field::Value(v) => v,
                Field::End(outcome) => return Ok(outcome),
            };
            if username.is_empty() {
                conn.send_line("Invalid username.").await?;
                continue;
            }

            conn.send_prompt("Password: ").await?;
            let password = match read_field(conn, session).await? {
                Field::Value(v) => v,
                Field::End(outcome) => return Ok(outcome),
            };
            if password.is_empty() {
                conn.send_line("Invalid password.").await?;
                continue;
            }

            match self.credentials.verify(username.clone(), password).await {
                Ok(record) => {
                    self.on_success(conn, session, &record).await?;
                    return Ok(AuthOutcome::Authenticated(record));
                }
                Err(ConsoleError::InvalidCredentials) => {
                    let outcome = self.lockout.record_failure(session.remote_ip());
                    warn!(
                        session = %session.id(),
                        remote = %session.remote(),
                        username = %username,
                        attempt,
                        "Login failed"
                    );
                    self.audit.log(AuditEvent::LoginFailed {
                        username,
                        remote: session.remote(),
                    });
                    conn.send_line("Invalid credentials.").await?;

                    if let FailureOutcome::LockedOut { count } = outcome {
                        self.audit.log(AuditEvent::LockedOut {
                            remote: session.remote(),
                            failures: count,
                        });
                    }
                }
                Err(e) => return Err(e),
            }
        }

        self.audit.log(AuditEvent::TooManyAttempts {
            remote: session.remote(),
        });
        conn.send_line("Authentication failed. Goodbye!").await?;
        Ok(AuthOutcome::Failed)
    }

    async fn on_success<S>(&self, conn: &mut Connection<S>, session: &Session, record: &LoginRecord) -> Result<()>
    where
        S: AsyncRead + AsyncWrite + Send,
    {
        session.set_identity(record.username.clone(), record.access);
        self.lockout.reset(session.remote_ip());

        info!(
            session = %session.id(),
            username = %record.username,
            access = %record.access,
            logins = record.login_count,
            "Login succeeded"
        );
        self.audit.log(AuditEvent::LoginSucceeded {
            session: session.id(),
            username: record.username.clone(),
            access: record.access,
            remote: session.remote(),
        });

        let last_login = match record.previous_login {
            Some(at) => at.format("%Y-%m-%d %H:%M:%S").to_string(),
            None => "First time".to_string(),
        };
        conn.send_lines([
            String::new(),
            format!("Welcome, {}! Access Level: {}", record.username, record.access),
            format!("Last login: {last_login}"),
            "Type 'help' for available commands, 'exit' to disconnect.".to_string(),
            String::new(),
        ])
        .await
    }
}

async fn read_field<S>(conn: &mut Connection<S>, session: &Session) -> Result<Field>
where
    S: AsyncRead + AsyncWrite + Send,
{
    Ok(match conn.next_input().await? {
        Input::Line(line) => {
            session.touch();
            Field::Value(line.trim().to_string())
        }
        Input::Eof => Field::End(AuthOutcome::Closed),
        Input::Terminated(reason) => Field::End(AuthOutcome::Terminated(reason)),
    })
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use tokio::io::{AsyncReadExt, AsyncWriteExt, DuplexStream};
    use tokio::sync::oneshot;

    use super::*;
    use crate::audit::AuditActor;
    use crate::auth::{AccessLevel, CredentialActor, PasswordDigest};

    struct Harness {
        auth: Authenticator,
        lockout: Arc<LockoutTracker>,
        audit: AuditHandle,
    }

    fn harness(max_attempts: u32, threshold: u32) -> Harness {
        let credentials = CredentialActor::spawn_with_users(
            PasswordDigest::new("salt"),
            [("Admin".to_string(), "secret".to_string(), AccessLevel::Administrator)],
        );
        let lockout = Arc::new(LockoutTracker::new(threshold, Duration::from_secs(900)));
        let audit = AuditActor::in_memory();
        Harness {
            auth: Authenticator::new(credentials, Arc::clone(&lockout), audit.clone(), max_attempts),
            lockout,
            audit,
        }
    }

    /// Run the handshake against scripted client input; returns outcome and transcript
    async fn run(h: &Harness, input: &'static [u8]) -> (AuthOutcome, Arc<Session>, String) {
        let (server, mut client) = tokio::io::duplex(4096);
        let (_term_tx, term_rx) = oneshot::channel();
        let (session, outbox) = Session::new("127.0.0.1:45000".parse().unwrap());
        let session = Arc::new(session);
        let mut conn = Connection::new(server, term_rx, outbox, 256);

        client.write_all(input).await.unwrap();
        client.shutdown().await.unwrap();

        let outcome = h.auth.authenticate(&mut conn, &session).await.unwrap();
        drop(conn);
        let mut transcript = String::new();
        client.read_to_string(&mut transcript).await.unwrap();
        (outcome, session, transcript)
    }

    #[tokio::test]
    async fn test_successful_login_sets_identity() {
        let h = harness(3, 3);
        let (outcome, session, transcript) = run(&h, b"admin\r\nsecret\r\n").await;

        assert!(matches!(outcome, AuthOutcome::Authenticated(_)));
        assert_eq!(session.username().as_deref(), Some("Admin"));
        assert_eq!(session.access(), AccessLevel::Administrator);
        assert!(transcript.starts_with("Username: Password: "));
        assert!(transcript.contains("Welcome, Admin! Access Level: Administrator"));
        assert!(transcript.contains("Last login: First time"));
    }

    #[tokio::test]
    async fn test_failures_below_threshold_then_success_clears_record() {
        let h = harness(3, 3);
        let (outcome, session, transcript) = run(&h, b"admin\nwrong\nadmin\nsecret\n").await;

        assert!(matches!(outcome, AuthOutcome::Authenticated(_)));
        assert!(transcript.contains("Invalid credentials."));
        assert_eq!(h.lockout.failure_count(session.remote_ip()), 0);
    }

    #[tokio::test]
    async fn test_blank_input_costs_an_attempt_but_not_a_failure() {
        let h = harness(2, 3);
        let (outcome, session, transcript) = run(&h, b"\nadmin\n\n").await;

        assert!(matches!(outcome, AuthOutcome::Failed));
        assert!(transcript.contains("Invalid username."));
        assert!(transcript.contains("Invalid password."));
        assert!(transcript.ends_with("Authentication failed. Goodbye!\r\n"));
        assert_eq!(h.lockout.failure_count(session.remote_ip()), 0);
    }

    #[tokio::test]
    async fn test_threshold_failures_lock_out_and_audit() {
        let h = harness(4, 3);
        let (outcome, session, transcript) =
            run(&h, b"a\nb\nadmin\nnope\nghost\nsecret\nadmin\nwrong\n").await;

        // Locking the address does not cut the remaining budget short
        assert!(matches!(outcome, AuthOutcome::Failed));
        assert_eq!(transcript.matches("Username: ").count(), 4);
        assert!(transcript.ends_with("Authentication failed. Goodbye!\r\n"));
        assert!(h.lockout.is_locked_out(session.remote_ip()));

        let lines = h.audit.recent(10).await;
        assert_eq!(lines.iter().filter(|l| l.contains("Failed login attempt:")).count(), 4);
        assert_eq!(lines.iter().filter(|l| l.contains("locked out after")).count(), 1);
        assert!(lines.iter().any(|l| l.contains("locked out after 3 failed attempts")));
    }

    #[tokio::test]
    async fn test_lockout_leaves_current_attempts_open() {
        let h = harness(3, 2);
        let (outcome, session, transcript) = run(&h, b"admin\nx\nadmin\ny\nadmin\nsecret\n").await;

        assert_eq!(transcript.matches("Username: ").count(), 3);
        assert!(matches!(outcome, AuthOutcome::Authenticated(_)));
        // Success from the address clears its record
        assert!(!h.lockout.is_locked_out(session.remote_ip()));
    }

    #[tokio::test]
    async fn test_eof_mid_handshake_is_closed() {
        let h = harness(3, 3);
        let (outcome, _session, _) = run(&h, b"admin\n").await;
        assert!(matches!(outcome, AuthOutcome::Closed));
    }
}
