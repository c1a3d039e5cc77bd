//! Maintenance scheduler for periodic housekeeping
//!
//! Provides background tasks for:
//! - Idle session sweep (notice, actor release, removal)
//! - Stale failure-record eviction

use std::sync::Arc;
use std::time::{Duration, Instant};

use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use crate::audit::{AuditEvent, AuditHandle, EndReason};
use crate::auth::LockoutTracker;
use crate::config::ConsoleConfig;
use crate::session::{SessionRegistry, Termination};
use crate::simulation::PrivilegedActorBroker;

/// Background maintenance scheduler
pub struct MaintenanceScheduler {
    registry: Arc<SessionRegistry>,
    lockout: Arc<LockoutTracker>,
    broker: PrivilegedActorBroker,
    audit: AuditHandle,
    handles: Vec<JoinHandle<()>>,
}

impl MaintenanceScheduler {
    pub fn new(
        registry: Arc<SessionRegistry>,
        lockout: Arc<LockoutTracker>,
        broker: PrivilegedActorBroker,
        audit: AuditHandle,
    ) -> Self {
        Self {
            registry,
            lockout,
            broker,
            audit,
            handles: Vec::new(),
        }
    }

    /// Start both sweeps on the configured interval
    pub fn start(&mut self, config: &ConsoleConfig) {
        self.start_session_sweep(config.sweep_interval, config.idle_timeout);
        self.start_failure_eviction(config.sweep_interval, config.failure_retention);

        info!(
            interval_secs = config.sweep_interval.as_secs(),
            "Maintenance scheduler started"
        );
    }

    /// Start periodic termination of idle sessions
    pub fn start_session_sweep(&mut self, interval: Duration, idle_timeout: Duration) {
        let registry = Arc::clone(&self.registry);
        let broker = self.broker.clone();
        let audit = self.audit.clone();
        let handle = tokio::spawn(async move {
            let mut ticker = tokio::time::interval(interval);
            loop {
                ticker.tick().await;
                let swept =
                    sweep_idle_sessions(&registry, &broker, &audit, idle_timeout, Instant::now()).await;
                if swept > 0 {
                    info!(swept, "Idle sessions terminated");
                }
            }
        });
        self.handles.push(handle);
    }

    /// Start periodic eviction of failure records older than `retention`
    pub fn start_failure_eviction(&mut self, interval: Duration, retention: Duration) {
        let lockout = Arc::clone(&self.lockout);
        let handle = tokio::spawn(async move {
            let mut ticker = tokio::time::interval(interval);
            loop {
                ticker.tick().await;
                let evicted = lockout.evict_stale(retention);
                if evicted > 0 {
                    debug!(evicted, "Stale failure records evicted");
                }
            }
        });
        self.handles.push(handle);
    }

    /// Stop all background tasks
    pub fn stop(&mut self) {
        if self.handles.is_empty() {
            return;
        }
        for handle in self.handles.drain(..) {
            handle.abort();
        }
        info!("Maintenance scheduler stopped");
    }
}

impl Drop for MaintenanceScheduler {
    fn drop(&mut self) {
        self.stop();
    }
}

/// One idle sweep: every session idle longer than `idle_timeout` at `now` is
/// told to close, loses its privileged actor and leaves the registry.
///
/// Returns the number of sessions swept.
pub async fn sweep_idle_sessions(
    registry: &SessionRegistry,
    broker: &PrivilegedActorBroker,
    audit: &AuditHandle,
    idle_timeout: Duration,
    now: Instant,
) -> usize {
    let evicted = registry.take_idle_at(idle_timeout, now);
    let count = evicted.len();

    for entry in evicted {
        let session = entry.terminate(Termination::IdleTimeout);
        if let Err(e) = broker.release(&session).await {
            warn!(session = %session.id(), error = ?e, "Failed to release privileged actor");
        }
        debug!(session = %session.id(), username = %session.display_name(), "Session timed out");
        audit.log(AuditEvent::SessionEnded {
            session: session.id(),
            username: session.display_name(),
            reason: EndReason::IdleTimeout,
        });
    }
    count
}
