//! In-memory host world
//!
//! Stands in for the real simulation in the binary and in tests. It keeps
//! actors and accounts in ordered maps and records every broadcast and
//! executed command in a [`WorldProbe`] that can be read from outside the
//! simulation context.

use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::Instant;

use parking_lot::Mutex;

use crate::auth::{AccessLevel, PasswordDigest};

use super::{
    AccountInfo, ActorId, ActorInfo, ActorSpec, Location, World, WorldError, WorldStats,
};

#[derive(Debug, Default)]
struct ProbeLog {
    broadcasts: Vec<String>,
    executed: Vec<(ActorId, String)>,
}

/// Read-only window onto what the world has been asked to do
#[derive(Debug, Clone, Default)]
pub struct WorldProbe {
    log: Arc<Mutex<ProbeLog>>,
}

impl WorldProbe {
    pub fn broadcasts(&self) -> Vec<String> {
        self.log.lock().broadcasts.clone()
    }

    /// Executed commands with the actor they ran as
    pub fn executed(&self) -> Vec<(ActorId, String)> {
        self.log.lock().executed.clone()
    }
}

#[derive(Debug, Clone)]
struct Account {
    info: AccountInfo,
    password_digest: String,
}

/// Actor and account registry held entirely in memory
pub struct InMemoryWorld {
    started: Instant,
    next_id: u64,
    actors: BTreeMap<ActorId, ActorInfo>,
    accounts: BTreeMap<String, Account>,
    items: usize,
    rejected: Vec<String>,
    digest: PasswordDigest,
    probe: WorldProbe,
}

impl InMemoryWorld {
    pub fn new() -> Self {
        Self {
            started: Instant::now(),
            next_id: 1,
            actors: BTreeMap::new(),
            accounts: BTreeMap::new(),
            items: 0,
            rejected: Vec::new(),
            digest: PasswordDigest::new("in-memory-world"),
            probe: WorldProbe::default(),
        }
    }

    pub fn probe(&self) -> WorldProbe {
        self.probe.clone()
    }

    /// Add a connected player-controlled actor at the origin
    pub fn with_actor(self, name: &str, access: AccessLevel) -> Self {
        self.with_actor_at(name, access, Location::default())
    }

    pub fn with_actor_at(mut self, name: &str, access: AccessLevel, location: Location) -> Self {
        let id = self.allocate_id();
        self.actors.insert(
            id,
            ActorInfo {
                id,
                name: name.to_string(),
                access,
                location,
                connected: true,
                deleted: false,
            },
        );
        self
    }

    pub fn with_account(mut self, username: &str, password: &str, access: AccessLevel) -> Self {
        // Duplicates are ignored while seeding
        let _ = self.create_account(username, password, access);
        self
    }

    pub fn with_items(mut self, items: usize) -> Self {
        self.items = items;
        self
    }

    /// Reject any executed command starting with `prefix`
    pub fn with_rejected_command(mut self, prefix: &str) -> Self {
        self.rejected.push(prefix.to_lowercase());
        self
    }

    /// Check an account's password the way the host's own login would
    pub fn check_password(&self, username: &str, password: &str) -> bool {
        self.accounts
            .get(&username.to_lowercase())
            .is_some_and(|a| self.digest.verify(password, &a.password_digest))
    }

    fn allocate_id(&mut self) -> ActorId {
        let id = ActorId(self.next_id);
        self.next_id += 1;
        id
    }
}

impl Default for InMemoryWorld {
    fn default() -> Self {
        Self::new()
    }
}

impl Default for Location {
    fn default() -> Self {
        Self {
            x: 0,
            y: 0,
            z: 0,
            map: "Overworld".to_string(),
        }
    }
}

impl World for InMemoryWorld {
    fn stats(&self) -> WorldStats {
        WorldStats {
            uptime: self.started.elapsed(),
            connected_actors: self
                .actors
                .values()
                .filter(|a| a.connected && !a.deleted)
                .count(),
            total_actors: self.actors.len(),
            total_items: self.items,
        }
    }

    fn actors(&self) -> Vec<ActorInfo> {
        self.actors.values().cloned().collect()
    }

    fn spawn_actor(&mut self, spec: ActorSpec) -> Result<ActorId, WorldError> {
        let id = self.allocate_id();
        self.actors.insert(
            id,
            ActorInfo {
                id,
                name: spec.name,
                access: spec.access,
                location: Location::default(),
                // No client behind a console-spawned actor
                connected: spec.interactive,
                deleted: false,
            },
        );
        Ok(id)
    }

    fn remove_actor(&mut self, id: ActorId) -> bool {
        self.actors.remove(&id).is_some()
    }

    fn execute(&mut self, actor: ActorId, command: &str) -> Result<(), WorldError> {
        match self.actors.get(&actor) {
            Some(info) if !info.deleted => {}
            _ => return Err(WorldError::ActorNotFound(actor)),
        }

        let lowered = command.to_lowercase();
        if self.rejected.iter().any(|p| lowered.starts_with(p.as_str())) {
            return Err(WorldError::CommandRejected(command.to_string()));
        }

        self.probe
            .log
            .lock()
            .executed
            .push((actor, command.to_string()));
        Ok(())
    }

    fn broadcast(&mut self, message: &str) {
        self.probe.log.lock().broadcasts.push(message.to_string());
    }

    fn accounts(&self) -> Vec<AccountInfo> {
        self.accounts.values().map(|a| a.info.clone()).collect()
    }

    fn create_account(
        &mut self,
        username: &str,
        password: &str,
        access: AccessLevel,
    ) -> Result<(), WorldError> {
        let key = username.to_lowercase();
        if self.accounts.contains_key(&key) {
            return Err(WorldError::AccountExists(username.to_string()));
        }
        self.accounts.insert(
            key,
            Account {
                info: AccountInfo {
                    username: username.to_string(),
                    access,
                },
                password_digest: self.digest.digest(password),
            },
        );
        Ok(())
    }

    fn set_access(&mut self, username: &str, access: AccessLevel) -> Result<(), WorldError> {
        let account = self
            .accounts
            .get_mut(&username.to_lowercase())
            .ok_or_else(|| WorldError::AccountNotFound(username.to_string()))?;
        account.info.access = access;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_stats_count_only_connected_actors() {
        let mut world = InMemoryWorld::new()
            .with_actor("Alice", AccessLevel::Player)
            .with_items(12);
        world
            .spawn_actor(ActorSpec {
                name: "ConsoleAdmin_test".into(),
                access: AccessLevel::GameMaster,
                hidden: true,
                immobile: true,
                interactive: false,
            })
            .unwrap();

        let stats = world.stats();
        assert_eq!(stats.connected_actors, 1);
        assert_eq!(stats.total_actors, 2);
        assert_eq!(stats.total_items, 12);
    }

    #[test]
    fn test_accounts_are_case_insensitive() {
        let mut world = InMemoryWorld::new().with_account("Alice", "pw", AccessLevel::Player);
        assert_eq!(
            world.create_account("ALICE", "pw", AccessLevel::Player),
            Err(WorldError::AccountExists("ALICE".into()))
        );

        assert!(world.check_password("alice", "pw"));
        assert!(!world.check_password("alice", "nope"));

        world.set_access("alice", AccessLevel::Seer).unwrap();
        assert_eq!(world.account("alice").map(|a| a.access), Some(AccessLevel::Seer));
        assert!(matches!(
            world.set_access("bob", AccessLevel::Seer),
            Err(WorldError::AccountNotFound(_))
        ));
    }

    #[test]
    fn test_execute_requires_live_actor() {
        let mut world = InMemoryWorld::new();
        assert_eq!(
            world.execute(ActorId(99), "where"),
            Err(WorldError::ActorNotFound(ActorId(99)))
        );
    }
}
