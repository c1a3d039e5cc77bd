//! SimulationActor: serialized execution context for the host world
//!
//! Connection workers never call into the [`World`] directly. They submit
//! closures through a [`SimulationHandle`]; the closures run one at a time on
//! whichever loop owns the world:
//!
//! - [`SimulationActor::spawn`] gives the world its own tokio task, or
//! - [`SimulationActor::channel`] hands back a [`SimulationQueue`] that an
//!   existing host tick drains with [`SimulationQueue::run_pending`].
//!
//! Submission is fire-and-forget and never waits on the queue, so a host
//! tick that falls behind cannot stall connection workers. Queries (`who`, `status`, account listing)
//! get their answer back over a oneshot.

use std::panic::{catch_unwind, AssertUnwindSafe};

use tokio::sync::{mpsc, oneshot};
use tracing::{debug, error, info};

use crate::error::{ConsoleError, Result};

use super::World;

type Job = Box<dyn FnOnce(&mut dyn World) + Send + 'static>;

// ─── Messages ───

struct SimulationMsg {
    label: &'static str,
    job: Job,
}

// ─── Actor ───

/// Owner of the job queue feeding the host world
pub struct SimulationActor;

impl SimulationActor {
    /// Move `world` onto a dedicated task and return a handle to it
    pub fn spawn<W: World>(world: W) -> SimulationHandle {
        let (handle, queue) = Self::channel();
        tokio::spawn(queue.run(Box::new(world)));
        info!("SimulationActor spawned");
        handle
    }

    /// Create a handle/queue pair for a host that runs its own update loop
    pub fn channel() -> (SimulationHandle, SimulationQueue) {
        let (tx, rx) = mpsc::unbounded_channel();
        (SimulationHandle { tx }, SimulationQueue { rx })
    }
}

/// Receiving side of the simulation job queue
pub struct SimulationQueue {
    rx: mpsc::UnboundedReceiver<SimulationMsg>,
}

impl SimulationQueue {
    /// Drive jobs until every handle is dropped
    pub async fn run(mut self, mut world: Box<dyn World>) {
        while let Some(msg) = self.rx.recv().await {
            execute(world.as_mut(), msg);
        }
        info!("SimulationActor stopped");
    }

    /// Run every job queued so far without waiting; returns how many ran
    pub fn run_pending(&mut self, world: &mut dyn World) -> usize {
        let mut ran = 0;
        while let Ok(msg) = self.rx.try_recv() {
            execute(world, msg);
            ran += 1;
        }
        ran
    }
}

fn execute(world: &mut dyn World, msg: SimulationMsg) {
    let SimulationMsg { label, job } = msg;
    debug!(job = label, "Running simulation job");
    if let Err(panic) = catch_unwind(AssertUnwindSafe(|| job(world))) {
        let reason = panic
            .downcast_ref::<&str>()
            .map(|s| s.to_string())
            .or_else(|| panic.downcast_ref::<String>().cloned())
            .unwrap_or_else(|| "unknown panic".to_string());
        error!(job = label, reason = %reason, "Simulation job panicked");
    }
}

// ─── Handle ───

/// Thread-safe handle for submitting work to the host world
#[derive(Clone)]
pub struct SimulationHandle {
    tx: mpsc::UnboundedSender<SimulationMsg>,
}

impl SimulationHandle {
    /// Queue a job and return without waiting for it to run
    pub async fn submit<F>(&self, label: &'static str, job: F) -> Result<()>
    where
        F: FnOnce(&mut dyn World) + Send + 'static,
    {
        self.tx
            .send(SimulationMsg {
                label,
                job: Box::new(job),
            })
            .map_err(|_| ConsoleError::ActorUnavailable("SimulationActor".into()))
    }

    /// Run a read-only closure against the world and return its result
    pub async fn query<R, F>(&self, label: &'static str, f: F) -> Result<R>
    where
        R: Send + 'static,
        F: FnOnce(&dyn World) -> R + Send + 'static,
    {
        let (reply, rx) = oneshot::channel();
        self.submit(label, move |world: &mut dyn World| {
            let _ = reply.send(f(&*world));
        })
        .await?;
        rx.await
            .map_err(|_| ConsoleError::ActorUnavailable("SimulationActor dropped".into()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::simulation::memory::InMemoryWorld;

    #[tokio::test]
    async fn test_jobs_run_in_submission_order() {
        let world = InMemoryWorld::new();
        let probe = world.probe();
        let handle = SimulationActor::spawn(world);

        for i in 0..5 {
            handle
                .submit("broadcast", move |w| w.broadcast(&format!("msg {i}")))
                .await
                .unwrap();
        }
        // A query queued behind the broadcasts observes all of them
        handle.query("sync", |_| ()).await.unwrap();

        let expected: Vec<String> = (0..5).map(|i| format!("msg {i}")).collect();
        assert_eq!(probe.broadcasts(), expected);
    }

    #[tokio::test]
    async fn test_panicking_job_does_not_stop_loop() {
        let handle = SimulationActor::spawn(InMemoryWorld::new());

        handle
            .submit("boom", |_| panic!("host blew up"))
            .await
            .unwrap();
        let stats = handle.query("stats", |w| w.stats()).await.unwrap();
        assert_eq!(stats.connected_actors, 0);
    }

    #[tokio::test]
    async fn test_external_loop_drains_queue() {
        let (handle, mut queue) = SimulationActor::channel();
        let mut world = InMemoryWorld::new();
        let probe = world.probe();

        handle.submit("broadcast", |w| w.broadcast("tick")).await.unwrap();
        assert!(probe.broadcasts().is_empty());

        assert_eq!(queue.run_pending(&mut world), 1);
        assert_eq!(probe.broadcasts(), vec!["tick".to_string()]);
    }

    #[tokio::test]
    async fn test_submit_does_not_wait_on_stalled_host() {
        let (handle, mut queue) = SimulationActor::channel();

        // The host never ticks while these are queued
        let queued = tokio::time::timeout(std::time::Duration::from_secs(2), async {
            for _ in 0..5_000 {
                handle.submit("broadcast", |w| w.broadcast("tick")).await.unwrap();
            }
        })
        .await;
        assert!(queued.is_ok(), "submit blocked on an undrained queue");

        let mut world = InMemoryWorld::new();
        assert_eq!(queue.run_pending(&mut world), 5_000);
    }

    #[tokio::test]
    async fn test_submit_fails_once_queue_is_gone() {
        let (handle, queue) = SimulationActor::channel();
        drop(queue);

        let err = handle.submit("broadcast", |w| w.broadcast("tick")).await.unwrap_err();
        assert!(matches!(err, ConsoleError::ActorUnavailable(_)));
    }
}
