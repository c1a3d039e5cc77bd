//! Privileged-actor broker
//!
//! Forwarded console input runs in the world as some actor with enough
//! access. The broker picks that actor inside the simulation context:
//!
//! 1. the actor already leased to the session, if it still exists
//! 2. any live actor at or above the session's tier (when reuse is enabled)
//! 3. a fresh hidden, immobile, non-interactive `ConsoleAdmin_<id>` actor
//!
//! Created actors are owned by the session's [`ActorLease`]. Closing the lease
//! hands the actor back for teardown unless retention is [`Retention::Persistent`].

use std::sync::Arc;

use parking_lot::Mutex;
use tracing::{debug, info, warn};

use crate::config::ConsoleConfig;
use crate::error::Result;
use crate::session::Session;

use super::actor::SimulationHandle;
use super::{ActorId, ActorSpec, World, WorldError};

/// What happens to a created actor when its session ends
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Retention {
    TiedToSession,
    Persistent,
}

/// How the session came to hold an actor
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ActorOrigin {
    /// Spawned by the broker for this session
    Created,
    /// An existing sufficiently-privileged actor; never torn down by the console
    Borrowed,
}

/// Capability to act in the world on behalf of one session
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PrivilegedActor {
    pub id: ActorId,
    pub origin: ActorOrigin,
}

#[derive(Debug, Default)]
struct LeaseState {
    actor: Option<PrivilegedActor>,
    closed: bool,
}

/// The session's slot for its privileged actor.
///
/// Once closed, nothing can be installed again, so a job that resolves after
/// the session ended cannot leave an orphan behind.
#[derive(Debug, Default)]
pub struct ActorLease {
    state: Mutex<LeaseState>,
}

impl ActorLease {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn current(&self) -> Option<PrivilegedActor> {
        self.state.lock().actor
    }

    /// Remember `actor`; false if the lease is already closed
    pub fn install(&self, actor: PrivilegedActor) -> bool {
        let mut state = self.state.lock();
        if state.closed {
            return false;
        }
        state.actor = Some(actor);
        true
    }

    pub fn clear(&self) {
        self.state.lock().actor = None;
    }

    /// Close the lease and take whatever actor it held
    pub fn close(&self) -> Option<PrivilegedActor> {
        let mut state = self.state.lock();
        state.closed = true;
        state.actor.take()
    }

    pub fn is_closed(&self) -> bool {
        self.state.lock().closed
    }
}

/// Resolution rules, copied into each simulation job
#[derive(Debug, Clone, Copy)]
struct ActorPolicy {
    reuse_existing: bool,
}

impl ActorPolicy {
    fn resolve(self, world: &mut dyn World, session: &Session) -> std::result::Result<ActorId, WorldError> {
        let lease = session.lease();
        if lease.is_closed() {
            return Err(WorldError::SessionClosed);
        }
        let tier = session.access();

        if let Some(held) = lease.current() {
            match world.actor(held.id) {
                Some(info) if !info.deleted && info.access >= tier => return Ok(held.id),
                _ => {
                    debug!(session = %session.id(), actor = %held.id, "Leased actor gone, resolving again");
                    lease.clear();
                }
            }
        }

        if self.reuse_existing {
            let existing = world
                .actors()
                .into_iter()
                .find(|a| !a.deleted && a.access >= tier);
            if let Some(info) = existing {
                lease.install(PrivilegedActor {
                    id: info.id,
                    origin: ActorOrigin::Borrowed,
                });
                debug!(session = %session.id(), actor = %info.id, name = %info.name, "Reusing privileged actor");
                return Ok(info.id);
            }
        }

        let id = world.spawn_actor(ActorSpec {
            name: format!("ConsoleAdmin_{}", session.id()),
            access: tier,
            hidden: true,
            immobile: true,
            interactive: false,
        })?;
        let created = PrivilegedActor {
            id,
            origin: ActorOrigin::Created,
        };

        if !lease.install(created) {
            // Session ended while the actor was being created
            world.remove_actor(id);
            return Err(WorldError::SessionClosed);
        }
        info!(session = %session.id(), actor = %id, access = %tier, "Privileged actor created");
        Ok(id)
    }
}

/// Bridges forwarded commands into the world through a privileged actor
#[derive(Clone)]
pub struct PrivilegedActorBroker {
    simulation: SimulationHandle,
    retention: Retention,
    policy: ActorPolicy,
}

impl PrivilegedActorBroker {
    pub fn new(simulation: SimulationHandle, retention: Retention, reuse_existing: bool) -> Self {
        Self {
            simulation,
            retention,
            policy: ActorPolicy { reuse_existing },
        }
    }

    pub fn from_config(simulation: SimulationHandle, config: &ConsoleConfig) -> Self {
        let retention = if config.persist_privileged_actors {
            Retention::Persistent
        } else {
            Retention::TiedToSession
        };
        Self::new(simulation, retention, config.reuse_existing_actors)
    }

    pub fn simulation(&self) -> &SimulationHandle {
        &self.simulation
    }

    pub fn retention(&self) -> Retention {
        self.retention
    }

    /// Queue `command` for execution as the session's privileged actor.
    ///
    /// Returns once the job is queued. Failures inside the world are logged
    /// and delivered to the session's outbox.
    pub async fn execute(&self, session: Arc<Session>, command: String) -> Result<()> {
        let policy = self.policy;
        self.simulation
            .submit("forward_command", move |world| {
                let outcome = policy
                    .resolve(world, &session)
                    .and_then(|actor| world.execute(actor, &command));
                match outcome {
                    Ok(()) => {
                        debug!(session = %session.id(), command = %command, "Forwarded command executed");
                    }
                    // Nobody left to tell
                    Err(WorldError::SessionClosed) => {}
                    Err(e) => {
                        warn!(session = %session.id(), command = %command, error = %e, "Forwarded command failed");
                        session.notify(format!("Command failed: {e}"));
                    }
                }
            })
            .await
    }

    /// Close the session's lease and tear down its created actor per retention
    pub async fn release(&self, session: &Session) -> Result<()> {
        let Some(actor) = session.lease().close() else {
            return Ok(());
        };
        if actor.origin == ActorOrigin::Borrowed {
            return Ok(());
        }

        match self.retention {
            Retention::Persistent => {
                info!(session = %session.id(), actor = %actor.id, "Privileged actor persisted");
                Ok(())
            }
            Retention::TiedToSession => {
                let session_id = session.id();
                self.simulation
                    .submit("remove_actor", move |world| {
                        if world.remove_actor(actor.id) {
                            info!(session = %session_id, actor = %actor.id, "Privileged actor removed");
                        }
                    })
                    .await
            }
        }
    }
}
