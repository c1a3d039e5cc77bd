//! Listener and console lifecycle
//!
//! ```text
//!  accept ──▶ allow-list ──▶ reserve slot ──▶ lockout ──▶ session worker
//!               │ no            │ full          │ locked      │
//!               ▼               ▼               ▼             ▼
//!             close           close      release + close   banner → login → commands
//! ```
//!
//! Refused connections are closed without a word, so a peer cannot tell
//! which gate it hit. Each admitted connection gets its own task; the accept
//! task owns them in a [`JoinSet`] and hands the set back on shutdown.

use std::net::{IpAddr, SocketAddr};
use std::ops::RangeInclusive;
use std::sync::Arc;

use serde::Serialize;
use tokio::net::{TcpListener, TcpStream};
use tokio::sync::{mpsc, oneshot, watch};
use tokio::task::{JoinHandle, JoinSet};
use tracing::{debug, error, info, warn};

use crate::audit::{AuditActor, AuditEvent, AuditHandle, EndReason, RejectReason};
use crate::auth::{
    AccessLevel, AuthOutcome, Authenticator, CredentialHandle, CredentialSummary, LockoutTracker,
};
use crate::config::{canonical_ip, ConsoleConfig};
use crate::connection::{Connection, Input};
use crate::error::{ConsoleError, Result};
use crate::maintenance::MaintenanceScheduler;
use crate::router::CommandRouter;
use crate::session::{Session, SessionRegistry, Termination};
use crate::simulation::{PrivilegedActorBroker, SimulationHandle};

/// Bind the first free port in `range`.
///
/// A port already in use moves on to the next one; any other bind error is
/// returned as is.
pub async fn bind_port_range(addr: IpAddr, range: RangeInclusive<u16>) -> Result<(TcpListener, u16)> {
    for port in range.clone() {
        match TcpListener::bind(SocketAddr::new(addr, port)).await {
            Ok(listener) => {
                // Port 0 asks the OS to pick one
                let bound = listener.local_addr().map(|a| a.port()).unwrap_or(port);
                return Ok((listener, bound));
            }
            Err(e) if e.kind() == std::io::ErrorKind::AddrInUse => {
                info!(port, "Port in use, trying next");
            }
            Err(source) => return Err(ConsoleError::Bind { port, source }),
        }
    }
    Err(ConsoleError::PortRangeExhausted {
        start: *range.start(),
        end: *range.end(),
    })
}

/// Everything a session worker needs, shared behind one `Arc`
struct ConsoleServices {
    config: ConsoleConfig,
    registry: Arc<SessionRegistry>,
    lockout: Arc<LockoutTracker>,
    broker: PrivilegedActorBroker,
    audit: AuditHandle,
    authenticator: Authenticator,
    router: CommandRouter,
}

impl ConsoleServices {
    fn reject(&self, remote: SocketAddr, reason: RejectReason) {
        info!(remote = %remote, reason = reason.as_str(), "Connection rejected");
        self.audit.log(AuditEvent::ConnectionRejected { remote, reason });
    }

    /// Run the three gates; on success the session holds a registry slot
    fn admit(
        &self,
        remote: SocketAddr,
    ) -> Option<(Arc<Session>, oneshot::Receiver<Termination>, mpsc::UnboundedReceiver<String>)> {
        let ip = canonical_ip(remote.ip());
        if !self.config.is_allowed(ip) {
            self.reject(remote, RejectReason::NotAllowed);
            return None;
        }

        let (session, outbox) = Session::new(remote);
        let session = Arc::new(session);
        let Some(terminate) = self.registry.try_register(Arc::clone(&session)) else {
            self.reject(remote, RejectReason::AtCapacity);
            return None;
        };

        if self.lockout.is_locked_out(ip) {
            self.registry.remove(&session.id());
            self.reject(remote, RejectReason::LockedOut);
            return None;
        }

        Some((session, terminate, outbox))
    }

    /// Tear down a session the worker still owns.
    ///
    /// Sessions already taken by the idle sweep or by shutdown were disposed
    /// there.
    async fn finish(&self, session: &Session, reason: EndReason) {
        if self.registry.remove(&session.id()).is_none() {
            return;
        }
        if let Err(e) = self.broker.release(session).await {
            warn!(session = %session.id(), error = ?e, "Failed to release privileged actor");
        }
        info!(session = %session.id(), username = %session.display_name(), reason = reason.as_str(), "Session ended");
        self.audit.log(AuditEvent::SessionEnded {
            session: session.id(),
            username: session.display_name(),
            reason,
        });
    }
}

/// Snapshot of the console for host-side reporting
#[derive(Debug, Clone, Serialize)]
pub struct ConsoleInfo {
    pub port: u16,
    pub active_sessions: usize,
    pub max_sessions: usize,
    pub registered_users: usize,
    pub tracked_addresses: usize,
    pub allowed_addresses: Vec<IpAddr>,
}

impl std::fmt::Display for ConsoleInfo {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let allowed: Vec<String> = self.allowed_addresses.iter().map(|a| a.to_string()).collect();
        writeln!(f, "Telnet console on port {}", self.port)?;
        writeln!(f, "Active sessions: {}/{}", self.active_sessions, self.max_sessions)?;
        writeln!(f, "Registered users: {}", self.registered_users)?;
        writeln!(f, "Tracked failure addresses: {}", self.tracked_addresses)?;
        write!(f, "Allowed addresses: {}", allowed.join(", "))
    }
}

/// A running console: listener, sweeps and session workers
pub struct Console {
    services: Arc<ConsoleServices>,
    credentials: CredentialHandle,
    port: u16,
    local_addr: SocketAddr,
    shutdown_tx: watch::Sender<bool>,
    accept_task: Option<JoinHandle<JoinSet<()>>>,
    maintenance: MaintenanceScheduler,
}

impl Console {
    /// Bind, open the audit log and start accepting operators
    pub async fn start(
        config: ConsoleConfig,
        credentials: CredentialHandle,
        simulation: SimulationHandle,
    ) -> Result<Self> {
        config.validate()?;
        let audit = AuditActor::spawn(&config.audit_log_path).await?;
        Self::start_with_audit(config, credentials, simulation, audit).await
    }

    /// Like [`Console::start`] with a caller-supplied audit sink
    pub async fn start_with_audit(
        config: ConsoleConfig,
        credentials: CredentialHandle,
        simulation: SimulationHandle,
        audit: AuditHandle,
    ) -> Result<Self> {
        config.validate()?;
        let (listener, port) = bind_port_range(config.bind_address, config.port_range.clone()).await?;
        let local_addr = listener.local_addr()?;

        let registry = Arc::new(SessionRegistry::new(config.max_sessions));
        let lockout = Arc::new(LockoutTracker::new(
            config.max_failed_attempts,
            config.lockout_duration,
        ));
        let broker = PrivilegedActorBroker::from_config(simulation, &config);
        let authenticator = Authenticator::new(
            credentials.clone(),
            Arc::clone(&lockout),
            audit.clone(),
            config.max_login_attempts,
        );
        let router = CommandRouter::new(
            Arc::clone(&registry),
            Arc::clone(&lockout),
            credentials.clone(),
            broker.clone(),
            audit.clone(),
            config.elevated_access,
        );

        let mut maintenance = MaintenanceScheduler::new(
            Arc::clone(&registry),
            Arc::clone(&lockout),
            broker.clone(),
            audit.clone(),
        );
        maintenance.start(&config);

        let services = Arc::new(ConsoleServices {
            config,
            registry,
            lockout,
            broker,
            audit,
            authenticator,
            router,
        });

        let (shutdown_tx, shutdown_rx) = watch::channel(false);
        let accept_task = tokio::spawn(accept_loop(listener, Arc::clone(&services), shutdown_rx));

        info!(port, addr = %local_addr, "Telnet console listening");
        services.audit.log(AuditEvent::ConsoleStarted { port });

        Ok(Self {
            services,
            credentials,
            port,
            local_addr,
            shutdown_tx,
            accept_task: Some(accept_task),
            maintenance,
        })
    }

    pub fn port(&self) -> u16 {
        self.port
    }

    pub fn local_addr(&self) -> SocketAddr {
        self.local_addr
    }

    pub fn audit(&self) -> &AuditHandle {
        &self.services.audit
    }

    pub fn lockout(&self) -> &LockoutTracker {
        &self.services.lockout
    }

    pub fn active_sessions(&self) -> usize {
        self.services.registry.len()
    }

    pub async fn info(&self) -> ConsoleInfo {
        ConsoleInfo {
            port: self.port,
            active_sessions: self.services.registry.len(),
            max_sessions: self.services.registry.capacity(),
            registered_users: self.credentials.count().await,
            tracked_addresses: self.services.lockout.tracked(),
            allowed_addresses: self.services.config.allowed_addresses.clone(),
        }
    }

    /// Register a console operator
    pub async fn add_user(&self, username: &str, password: &str, access: AccessLevel) -> Result<CredentialSummary> {
        let summary = self
            .credentials
            .add_user(username.to_string(), password.to_string(), access)
            .await?;
        self.services.audit.log(AuditEvent::UserAdded {
            username: summary.username.clone(),
            access,
        });
        Ok(summary)
    }

    pub async fn remove_user(&self, username: &str) -> Result<()> {
        self.credentials.remove_user(username.to_string()).await?;
        self.services.audit.log(AuditEvent::UserRemoved {
            username: username.to_string(),
        });
        Ok(())
    }

    pub async fn list_users(&self) -> Vec<CredentialSummary> {
        self.credentials.list_users().await
    }

    /// Stop accepting, say goodbye to every session and wait for workers.
    ///
    /// Workers still running after the grace period are aborted.
    pub async fn shutdown(mut self) -> Result<()> {
        info!(port = self.port, "Shutting down telnet console");
        let grace = self.services.config.shutdown_grace;

        let _ = self.shutdown_tx.send(true);
        self.maintenance.stop();

        let mut workers = None;
        if let Some(mut task) = self.accept_task.take() {
            match tokio::time::timeout(grace, &mut task).await {
                Ok(Ok(set)) => workers = Some(set),
                Ok(Err(e)) => error!(error = %e, "Accept loop failed"),
                Err(_) => {
                    warn!("Accept loop did not stop in time");
                    // Dropping its JoinSet aborts every worker
                    task.abort();
                }
            }
        }

        for entry in self.services.registry.drain() {
            let session = entry.terminate(Termination::Shutdown);
            if let Err(e) = self.services.broker.release(&session).await {
                warn!(session = %session.id(), error = ?e, "Failed to release privileged actor");
            }
            self.services.audit.log(AuditEvent::SessionEnded {
                session: session.id(),
                username: session.display_name(),
                reason: EndReason::Shutdown,
            });
        }

        if let Some(mut set) = workers {
            let joined = tokio::time::timeout(grace, async {
                while set.join_next().await.is_some() {}
            })
            .await;
            if joined.is_err() {
                warn!(remaining = set.len(), "Aborting session workers after grace period");
                set.abort_all();
            }
        }

        self.services.audit.log(AuditEvent::ConsoleStopped);
        self.services.audit.flush().await?;
        info!("Telnet console stopped");
        Ok(())
    }
}

impl Drop for Console {
    fn drop(&mut self) {
        let _ = self.shutdown_tx.send(true);
        if let Some(task) = self.accept_task.take() {
            task.abort();
        }
    }
}

async fn accept_loop(
    listener: TcpListener,
    services: Arc<ConsoleServices>,
    mut shutdown: watch::Receiver<bool>,
) -> JoinSet<()> {
    let mut workers = JoinSet::new();
    loop {
        tokio::select! {
            _ = shutdown.changed() => break,

            accepted = listener.accept() => match accepted {
                Ok((stream, remote)) => {
                    debug!(remote = %remote, "Connection accepted");
                    // Dropping `stream` on refusal closes it
                    if let Some((session, terminate, outbox)) = services.admit(remote) {
                        workers.spawn(run_session(Arc::clone(&services), stream, session, terminate, outbox));
                    }
                }
                Err(e) => {
                    warn!(error = %e, "Accept failed");
                    tokio::time::sleep(std::time::Duration::from_millis(100)).await;
                }
            },

            Some(joined) = workers.join_next(), if !workers.is_empty() => {
                if let Err(e) = joined {
                    if e.is_panic() {
                        error!(error = %e, "Session worker panicked");
                    }
                }
            }
        }
    }
    debug!(workers = workers.len(), "Accept loop stopped");
    workers
}

async fn run_session(
    services: Arc<ConsoleServices>,
    stream: TcpStream,
    session: Arc<Session>,
    terminate: oneshot::Receiver<Termination>,
    outbox: mpsc::UnboundedReceiver<String>,
) {
    let _ = stream.set_nodelay(true);
    info!(session = %session.id(), remote = %session.remote(), "New connection");
    services.audit.log(AuditEvent::SessionStarted {
        session: session.id(),
        remote: session.remote(),
    });

    let mut conn = Connection::new(stream, terminate, outbox, services.config.max_line_length);
    let reason = match serve(&services, &mut conn, &session).await {
        Ok(reason) => reason,
        Err(e) => {
            debug!(session = %session.id(), error = %e, "Connection error");
            EndReason::Error
        }
    };
    let _ = conn.shutdown().await;
    drop(conn);

    services.finish(&session, reason).await;
}

async fn serve(
    services: &ConsoleServices,
    conn: &mut Connection<TcpStream>,
    session: &Arc<Session>,
) -> Result<EndReason> {
    conn.send_lines([
        format!("=== {} ===", services.config.banner_title),
        format!("Session ID: {}", session.id()),
        format!("Connected at: {}", session.connected_at().format("%Y-%m-%d %H:%M:%S")),
        String::new(),
    ])
    .await?;

    match services.authenticator.authenticate(conn, session).await? {
        AuthOutcome::Authenticated(_) => {}
        AuthOutcome::Failed => return Ok(EndReason::AuthenticationFailed),
        AuthOutcome::Closed => return Ok(EndReason::Disconnected),
        AuthOutcome::Terminated(t) => {
            conn.send_line(t.notice()).await?;
            return Ok(t.into());
        }
    }

    loop {
        let line = match conn.next_input().await? {
            Input::Line(line) => line,
            Input::Eof => return Ok(EndReason::Disconnected),
            Input::Terminated(t) => {
                conn.send_line(t.notice()).await?;
                return Ok(t.into());
            }
        };

        session.touch();
        if line.trim().is_empty() {
            continue;
        }

        match services.router.dispatch(session, &line).await {
            Ok(reply) => {
                if !reply.lines.is_empty() {
                    conn.send_lines(&reply.lines).await?;
                }
                if reply.close {
                    return Ok(EndReason::Exit);
                }
            }
            Err(e) => {
                warn!(session = %session.id(), command = %line.trim(), error = %e, "Command error");
                conn.send_line(&format!("Error executing command: {e}")).await?;
            }
        }
    }
}
