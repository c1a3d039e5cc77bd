//! SessionRegistry: the authoritative set of live sessions
//!
//! The capacity check and the insert happen under the same lock, so two
//! concurrent accepts can never both take the last slot. Every removal path
//! (`remove`, `take_idle`, `drain`) takes the entry out of the map, which makes
//! removal happen exactly once: whoever gets the entry back owns its teardown.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::{Duration, Instant};

use parking_lot::Mutex;
use tokio::sync::oneshot;

use super::types::{Session, SessionId, Termination};

struct Entry {
    session: Arc<Session>,
    terminate: oneshot::Sender<Termination>,
}

/// A session taken out of the registry by a sweep or by shutdown
pub struct EvictedSession {
    pub session: Arc<Session>,
    terminate: oneshot::Sender<Termination>,
}

impl EvictedSession {
    /// Signal the session's worker to send the notice and close.
    ///
    /// Returns the session for further teardown.
    pub fn terminate(self, reason: Termination) -> Arc<Session> {
        // The worker may already be gone; nothing left to signal then
        let _ = self.terminate.send(reason);
        self.session
    }
}

/// Concurrency-capped registry of live sessions
pub struct SessionRegistry {
    capacity: usize,
    sessions: Mutex<HashMap<SessionId, Entry>>,
}

impl SessionRegistry {
    pub fn new(capacity: usize) -> Self {
        Self {
            capacity,
            sessions: Mutex::new(HashMap::new()),
        }
    }

    /// Reserve a slot for `session` if the cap allows it.
    ///
    /// Returns the receiver the worker listens on for external termination,
    /// or `None` when the registry is full.
    pub fn try_register(&self, session: Arc<Session>) -> Option<oneshot::Receiver<Termination>> {
        let mut sessions = self.sessions.lock();
        if sessions.len() >= self.capacity || sessions.contains_key(&session.id()) {
            return None;
        }
        let (terminate, rx) = oneshot::channel();
        sessions.insert(session.id(), Entry { session, terminate });
        Some(rx)
    }

    /// Remove a session; `None` if another path already removed it
    pub fn remove(&self, id: &SessionId) -> Option<Arc<Session>> {
        self.sessions.lock().remove(id).map(|e| e.session)
    }

    pub fn take_idle(&self, timeout: Duration) -> Vec<EvictedSession> {
        self.take_idle_at(timeout, Instant::now())
    }

    /// Remove every session idle for longer than `timeout`
    pub fn take_idle_at(&self, timeout: Duration, now: Instant) -> Vec<EvictedSession> {
        let mut sessions = self.sessions.lock();
        let idle: Vec<SessionId> = sessions
            .iter()
            .filter(|(_, e)| e.session.idle_for(now) > timeout)
            .map(|(id, _)| *id)
            .collect();

        idle.iter()
            .filter_map(|id| sessions.remove(id))
            .map(|e| EvictedSession {
                session: e.session,
                terminate: e.terminate,
            })
            .collect()
    }

    /// Remove every session regardless of activity
    pub fn drain(&self) -> Vec<EvictedSession> {
        self.sessions
            .lock()
            .drain()
            .map(|(_, e)| EvictedSession {
                session: e.session,
                terminate: e.terminate,
            })
            .collect()
    }

    /// Live sessions, oldest connection first
    pub fn snapshot(&self) -> Vec<Arc<Session>> {
        let mut sessions: Vec<Arc<Session>> = self
            .sessions
            .lock()
            .values()
            .map(|e| Arc::clone(&e.session))
            .collect();
        sessions.sort_by_key(|s| s.connected_at());
        sessions
    }

    pub fn contains(&self, id: &SessionId) -> bool {
        self.sessions.lock().contains_key(id)
    }

    pub fn len(&self) -> usize {
        self.sessions.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn session() -> Arc<Session> {
        let (session, _rx) = Session::new("127.0.0.1:40000".parse().unwrap());
        Arc::new(session)
    }

    #[test]
    fn test_cap_is_enforced() {
        let registry = SessionRegistry::new(2);
        let a = session();
        assert!(registry.try_register(Arc::clone(&a)).is_some());
        assert!(registry.try_register(session()).is_some());
        assert!(registry.try_register(session()).is_none());
        assert_eq!(registry.len(), 2);

        registry.remove(&a.id());
        assert!(registry.try_register(session()).is_some());
    }

    #[test]
    fn test_duplicate_registration_rejected() {
        let registry = SessionRegistry::new(5);
        let a = session();
        assert!(registry.try_register(Arc::clone(&a)).is_some());
        assert!(registry.try_register(Arc::clone(&a)).is_none());
        assert_eq!(registry.len(), 1);
    }

    #[test]
    fn test_remove_happens_once() {
        let registry = SessionRegistry::new(5);
        let a = session();
        registry.try_register(Arc::clone(&a));

        assert!(registry.remove(&a.id()).is_some());
        assert!(registry.remove(&a.id()).is_none());
    }

    #[tokio::test]
    async fn test_take_idle_signals_worker() {
        let registry = SessionRegistry::new(5);
        let idle = session();
        let fresh = session();
        let mut idle_rx = registry.try_register(Arc::clone(&idle)).unwrap();
        registry.try_register(Arc::clone(&fresh)).unwrap();

        let start = Instant::now();
        let now = start + Duration::from_secs(31 * 60);
        idle.touch_at(start);
        fresh.touch_at(now);

        let evicted = registry.take_idle_at(Duration::from_secs(30 * 60), now);
        assert_eq!(evicted.len(), 1);
        assert_eq!(evicted[0].session.id(), idle.id());
        for e in evicted {
            e.terminate(Termination::IdleTimeout);
        }

        assert_eq!((&mut idle_rx).await.unwrap(), Termination::IdleTimeout);
        assert!(!registry.contains(&idle.id()));
        assert!(registry.contains(&fresh.id()));
        // The worker's own cleanup finds nothing left to remove
        assert!(registry.remove(&idle.id()).is_none());
    }

    #[test]
    fn test_drain_empties_registry() {
        let registry = SessionRegistry::new(5);
        for _ in 0..3 {
            registry.try_register(session());
        }
        assert_eq!(registry.drain().len(), 3);
        assert!(registry.is_empty());
    }
}
