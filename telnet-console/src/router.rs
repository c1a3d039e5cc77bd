//! Command router
//!
//! Input lines are split on whitespace; the first token selects a verb from
//! [`VERBS`] case-insensitively. Each verb carries the access requirement that
//! is checked uniformly before its handler runs. Anything that is not a verb
//! is forwarded verbatim to the simulation through the privileged-actor broker.
//!
//! Handlers never touch the world directly. Reads go through
//! [`SimulationHandle::query`]; writes are submitted and their outcome, if it
//! matters to the operator, comes back later on the session outbox.

use std::sync::Arc;
use std::time::{Duration, Instant};

use chrono::Local;
use tracing::{debug, info, warn};

use crate::audit::{AuditEvent, AuditHandle};
use crate::auth::{AccessLevel, CredentialHandle, LockoutTracker};
use crate::error::{ConsoleError, Result};
use crate::session::{Session, SessionRegistry};
use crate::simulation::{PrivilegedActorBroker, SimulationHandle, WorldError};

/// Built-in console verbs
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Verb {
    Help,
    Status,
    Who,
    Sessions,
    Broadcast,
    CreateAccount,
    ListAccounts,
    SetAccess,
    Exit,
}

/// Minimum tier needed to run a verb
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Requirement {
    Any,
    /// The configured elevated tier or above
    Elevated,
}

/// Descriptor for one built-in verb
#[derive(Debug)]
pub struct VerbSpec {
    pub verb: Verb,
    pub names: &'static [&'static str],
    pub requirement: Requirement,
    pub usage: &'static str,
    pub summary: &'static str,
}

pub static VERBS: &[VerbSpec] = &[
    VerbSpec {
        verb: Verb::Help,
        names: &["help"],
        requirement: Requirement::Any,
        usage: "help",
        summary: "Show this help",
    },
    VerbSpec {
        verb: Verb::Status,
        names: &["status"],
        requirement: Requirement::Any,
        usage: "status",
        summary: "Show server status",
    },
    VerbSpec {
        verb: Verb::Who,
        names: &["who"],
        requirement: Requirement::Any,
        usage: "who",
        summary: "Show online actors",
    },
    VerbSpec {
        verb: Verb::Sessions,
        names: &["sessions"],
        requirement: Requirement::Any,
        usage: "sessions",
        summary: "Show active console sessions",
    },
    VerbSpec {
        verb: Verb::Broadcast,
        names: &["broadcast"],
        requirement: Requirement::Elevated,
        usage: "broadcast <message>",
        summary: "Broadcast a message to everyone in the world",
    },
    VerbSpec {
        verb: Verb::CreateAccount,
        names: &["createaccount"],
        requirement: Requirement::Elevated,
        usage: "createaccount <user> <pass> [tier]",
        summary: "Create a simulation account",
    },
    VerbSpec {
        verb: Verb::ListAccounts,
        names: &["listaccounts"],
        requirement: Requirement::Elevated,
        usage: "listaccounts",
        summary: "List simulation accounts",
    },
    VerbSpec {
        verb: Verb::SetAccess,
        names: &["setaccess"],
        requirement: Requirement::Elevated,
        usage: "setaccess <user> <tier>",
        summary: "Change a simulation account's access tier",
    },
    VerbSpec {
        verb: Verb::Exit,
        names: &["exit", "quit"],
        requirement: Requirement::Any,
        usage: "exit/quit",
        summary: "Disconnect",
    },
];

impl Verb {
    pub fn spec(self) -> &'static VerbSpec {
        // Every variant has an entry
        VERBS
            .iter()
            .find(|s| s.verb == self)
            .unwrap_or(&VERBS[0])
    }

    /// Case-insensitive lookup by any of the verb's names
    pub fn lookup(name: &str) -> Option<Verb> {
        VERBS
            .iter()
            .find(|s| s.names.iter().any(|n| n.eq_ignore_ascii_case(name)))
            .map(|s| s.verb)
    }

    pub fn name(self) -> &'static str {
        self.spec().names[0]
    }
}

/// A parsed input line
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    Builtin {
        verb: Verb,
        args: Vec<String>,
        /// Text after the verb, spacing preserved
        rest: String,
    },
    Forward(String),
}

/// Parse one input line; `None` for a blank line
pub fn parse(line: &str) -> Option<Command> {
    let line = line.trim();
    let mut tokens = line.split_whitespace();
    let first = tokens.next()?;

    Some(match Verb::lookup(first) {
        Some(verb) => Command::Builtin {
            verb,
            args: tokens.map(str::to_string).collect(),
            rest: line[first.len()..].trim_start().to_string(),
        },
        None => Command::Forward(line.to_string()),
    })
}

/// Lines to send back, and whether the session ends afterwards
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Reply {
    pub lines: Vec<String>,
    pub close: bool,
}

impl Reply {
    pub fn lines(lines: Vec<String>) -> Self {
        Self { lines, close: false }
    }

    pub fn line(line: impl Into<String>) -> Self {
        Self::lines(vec![line.into()])
    }

    pub fn close(line: impl Into<String>) -> Self {
        Self {
            lines: vec![line.into()],
            close: true,
        }
    }
}

/// Dispatches authenticated input lines
#[derive(Clone)]
pub struct CommandRouter {
    registry: Arc<SessionRegistry>,
    lockout: Arc<LockoutTracker>,
    credentials: CredentialHandle,
    broker: PrivilegedActorBroker,
    audit: AuditHandle,
    elevated: AccessLevel,
}

impl CommandRouter {
    pub fn new(
        registry: Arc<SessionRegistry>,
        lockout: Arc<LockoutTracker>,
        credentials: CredentialHandle,
        broker: PrivilegedActorBroker,
        audit: AuditHandle,
        elevated: AccessLevel,
    ) -> Self {
        Self {
            registry,
            lockout,
            credentials,
            broker,
            audit,
            elevated,
        }
    }

    fn simulation(&self) -> &SimulationHandle {
        self.broker.simulation()
    }

    fn permits(&self, session: &Session, requirement: Requirement) -> bool {
        match requirement {
            Requirement::Any => true,
            Requirement::Elevated => session.access().has_permission(self.elevated),
        }
    }

    /// Handle one input line.
    ///
    /// Usage mistakes come back as an ordinary reply; any other error is left
    /// for the caller to report without ending the session.
    pub async fn dispatch(&self, session: &Arc<Session>, line: &str) -> Result<Reply> {
        let Some(command) = parse(line) else {
            return Ok(Reply::default());
        };

        let result = match command {
            Command::Forward(text) => self.forward(session, text).await,
            Command::Builtin { verb, args, rest } => {
                let spec = verb.spec();
                if !self.permits(session, spec.requirement) {
                    debug!(session = %session.id(), verb = verb.name(), "Verb denied");
                    self.audit.log(AuditEvent::CommandDenied {
                        username: session.display_name(),
                        command: line.trim().to_string(),
                    });
                    return Ok(Reply::line(format!(
                        "Insufficient access level for {}.",
                        verb.name()
                    )));
                }
                self.run(session, verb, &args, rest).await
            }
        };

        match result {
            Err(ConsoleError::Usage(usage)) => Ok(Reply::line(format!("Usage: {usage}"))),
            other => other,
        }
    }

    async fn run(&self, session: &Arc<Session>, verb: Verb, args: &[String], rest: String) -> Result<Reply> {
        match verb {
            Verb::Help => Ok(self.help(session)),
            Verb::Status => self.status().await,
            Verb::Who => self.who().await,
            Verb::Sessions => Ok(self.sessions(session)),
            Verb::Broadcast => self.broadcast(session, rest).await,
            Verb::CreateAccount => self.create_account(session, args).await,
            Verb::ListAccounts => self.list_accounts().await,
            Verb::SetAccess => self.set_access(session, args).await,
            Verb::Exit => Ok(Reply::close("Goodbye!")),
        }
    }

    fn help(&self, session: &Session) -> Reply {
        let mut lines = vec!["=== Available Commands ===".to_string()];
        for spec in VERBS.iter().filter(|s| self.permits(session, s.requirement)) {
            lines.push(format!("{:<36} - {}", spec.usage, spec.summary));
        }
        lines.push(String::new());
        lines.push("=== Simulation Commands ===".to_string());
        lines.push("Any other input is executed as a simulation command.".to_string());
        lines.push(String::new());
        Reply::lines(lines)
    }

    async fn status(&self) -> Result<Reply> {
        let stats = self.simulation().query("status", |w| w.stats()).await?;
        let users = self.credentials.count().await;

        Ok(Reply::lines(vec![
            "=== Server Status ===".to_string(),
            format!("Uptime: {}", format_uptime(stats.uptime)),
            format!("Online Actors: {}", stats.connected_actors),
            format!("Total Actors: {}", stats.total_actors),
            format!("Total Items: {}", stats.total_items),
            format!(
                "Console Sessions: {}/{}",
                self.registry.len(),
                self.registry.capacity()
            ),
            format!("Console Users: {users}"),
            format!("Tracked Failure Addresses: {}", self.lockout.tracked()),
            String::new(),
        ]))
    }

    async fn who(&self) -> Result<Reply> {
        let mut online = self
            .simulation()
            .query("who", |w| {
                w.actors()
                    .into_iter()
                    .filter(|a| a.connected && !a.deleted)
                    .collect::<Vec<_>>()
            })
            .await?;
        online.sort_by(|a, b| a.name.cmp(&b.name));

        let mut lines = vec![format!("=== Online Actors ({}) ===", online.len())];
        if online.is_empty() {
            lines.push("No actors online.".to_string());
        }
        for actor in &online {
            let tier = if actor.access > AccessLevel::Player {
                format!(" [{}]", actor.access)
            } else {
                String::new()
            };
            lines.push(format!("{}{} - {}", actor.name, tier, actor.location));
        }
        lines.push(String::new());
        Ok(Reply::lines(lines))
    }

    fn sessions(&self, current: &Session) -> Reply {
        let sessions = self.registry.snapshot();
        let now = Instant::now();
        let wall = Local::now();

        let mut lines = vec![format!("=== Active Console Sessions ({}) ===", sessions.len())];
        for s in &sessions {
            let marker = if s.id() == current.id() { " (current)" } else { "" };
            let connected = (wall - s.connected_at()).to_std().unwrap_or_default();
            lines.push(format!("{}: {} from {}", s.id(), s.display_name(), s.remote()));
            lines.push(format!(
                "  Connected: {} ago, Last activity: {} ago{}",
                format_clock(connected),
                format_clock(s.idle_for(now)),
                marker
            ));
        }
        lines.push(String::new());
        Reply::lines(lines)
    }

    async fn broadcast(&self, session: &Session, message: String) -> Result<Reply> {
        if message.is_empty() {
            return Err(ConsoleError::Usage(Verb::Broadcast.spec().usage.into()));
        }

        let text = format!("[Broadcast] {message}");
        self.simulation()
            .submit("broadcast", move |w| w.broadcast(&text))
            .await?;

        info!(session = %session.id(), username = %session.display_name(), "Broadcast sent");
        self.audit.log(AuditEvent::Broadcast {
            username: session.display_name(),
            message: message.clone(),
        });
        Ok(Reply::line(format!("Broadcast sent: {message}")))
    }

    async fn create_account(&self, session: &Arc<Session>, args: &[String]) -> Result<Reply> {
        let (username, password, tier) = match args {
            [user, pass] => (user.clone(), pass.clone(), AccessLevel::Player),
            [user, pass, tier] => (user.clone(), pass.clone(), tier.parse::<AccessLevel>()?),
            _ => return Err(ConsoleError::Usage(Verb::CreateAccount.spec().usage.into())),
        };
        ensure_grantable(session, tier)?;

        let notify = Arc::clone(session);
        let audit = self.audit.clone();
        let by = session.display_name();
        let name = username.clone();
        self.simulation()
            .submit("create_account", move |w| {
                match w.create_account(&name, &password, tier) {
                    Ok(()) => {
                        notify.notify(format!("Account created: {name} ({tier})"));
                        audit.log(AuditEvent::AccountCreated {
                            by,
                            username: name,
                            access: tier,
                        });
                    }
                    Err(e) => {
                        warn!(username = %name, error = %e, "Account creation failed");
                        notify.notify(format!("Account creation failed: {e}"));
                    }
                }
            })
            .await?;

        Ok(Reply::line(format!("Account creation submitted: {username}")))
    }

    async fn list_accounts(&self) -> Result<Reply> {
        let accounts = self.simulation().query("list_accounts", |w| w.accounts()).await?;

        let mut lines = vec![format!("=== Accounts ({}) ===", accounts.len())];
        if accounts.is_empty() {
            lines.push("No accounts.".to_string());
        }
        for account in &accounts {
            lines.push(format!("{} - {}", account.username, account.access));
        }
        lines.push(String::new());
        Ok(Reply::lines(lines))
    }

    async fn set_access(&self, session: &Arc<Session>, args: &[String]) -> Result<Reply> {
        let [username, tier] = args else {
            return Err(ConsoleError::Usage(Verb::SetAccess.spec().usage.into()));
        };
        let tier = tier.parse::<AccessLevel>()?;
        ensure_grantable(session, tier)?;

        let caller = session.access();
        let notify = Arc::clone(session);
        let audit = self.audit.clone();
        let by = session.display_name();
        let name = username.clone();
        self.simulation()
            .submit("set_access", move |w| {
                let outcome = match w.account(&name) {
                    None => Err(WorldError::AccountNotFound(name.clone())),
                    Some(current) if current.access > caller => Err(WorldError::CommandRejected(
                        format!("{} outranks you", current.username),
                    )),
                    Some(_) => w.set_access(&name, tier),
                };
                match outcome {
                    Ok(()) => {
                        notify.notify(format!("Access of {name} set to {tier}"));
                        audit.log(AuditEvent::AccessChanged {
                            by,
                            username: name,
                            access: tier,
                        });
                    }
                    Err(e) => {
                        warn!(username = %name, error = %e, "Access change failed");
                        notify.notify(format!("Access change failed: {e}"));
                    }
                }
            })
            .await?;

        Ok(Reply::line(format!("Access change submitted: {username} -> {tier}")))
    }

    async fn forward(&self, session: &Arc<Session>, text: String) -> Result<Reply> {
        self.broker.execute(Arc::clone(session), text.clone()).await?;
        self.audit.log(AuditEvent::CommandExecuted {
            username: session.display_name(),
            command: text.clone(),
        });
        Ok(Reply::line(format!("Command submitted: {text}")))
    }
}

/// Operators cannot hand out more than they have
fn ensure_grantable(session: &Session, tier: AccessLevel) -> Result<()> {
    let actual = session.access();
    if tier > actual {
        return Err(ConsoleError::InsufficientAccess {
            required: tier.to_string(),
            actual: actual.to_string(),
        });
    }
    Ok(())
}

/// `dd:hh:mm:ss`
fn format_uptime(d: Duration) -> String {
    let secs = d.as_secs();
    format!(
        "{:02}:{:02}:{:02}:{:02}",
        secs / 86_400,
        (secs / 3600) % 24,
        (secs / 60) % 60,
        secs % 60
    )
}

/// `hh:mm:ss`, hours unbounded
fn format_clock(d: Duration) -> String {
    let secs = d.as_secs();
    format!("{:02}:{:02}:{:02}", secs / 3600, (secs / 60) % 60, secs % 60)
}

#[cfg(test)]
mod tests {
    use tokio::sync::mpsc;

    use super::*;
    use crate::audit::AuditActor;
    use crate::auth::{CredentialActor, PasswordDigest};
    use crate::simulation::{InMemoryWorld, Location, Retention, SimulationActor, WorldProbe};

    struct Fixture {
        router: CommandRouter,
        registry: Arc<SessionRegistry>,
        sim: SimulationHandle,
        probe: WorldProbe,
    }

    fn fixture(world: InMemoryWorld) -> Fixture {
        let probe = world.probe();
        let sim = SimulationActor::spawn(world);
        let registry = Arc::new(SessionRegistry::new(5));
        let router = CommandRouter::new(
            Arc::clone(&registry),
            Arc::new(LockoutTracker::new(3, Duration::from_secs(900))),
            CredentialActor::spawn(PasswordDigest::new("salt")),
            PrivilegedActorBroker::new(sim.clone(), Retention::TiedToSession, true),
            AuditActor::in_memory(),
            AccessLevel::GameMaster,
        );
        Fixture {
            router,
            registry,
            sim,
            probe,
        }
    }

    fn login(
        registry: &SessionRegistry,
        username: &str,
        access: AccessLevel,
    ) -> (Arc<Session>, mpsc::UnboundedReceiver<String>) {
        let (session, outbox) = Session::new("127.0.0.1:47000".parse().unwrap());
        session.set_identity(username, access);
        let session = Arc::new(session);
        registry.try_register(Arc::clone(&session)).unwrap();
        (session, outbox)
    }

    /// Wait for every job queued so far to run
    async fn settle(sim: &SimulationHandle) {
        sim.query("settle", |_| ()).await.unwrap();
    }

    #[test]
    fn test_parse_verbs_case_insensitively() {
        assert_eq!(parse("   "), None);
        assert_eq!(
            parse("  WHO  "),
            Some(Command::Builtin {
                verb: Verb::Who,
                args: vec![],
                rest: String::new()
            })
        );
        assert_eq!(
            parse("Broadcast  hello   world"),
            Some(Command::Builtin {
                verb: Verb::Broadcast,
                args: vec!["hello".into(), "world".into()],
                rest: "hello   world".into()
            })
        );
        assert!(matches!(parse("quit"), Some(Command::Builtin { verb: Verb::Exit, .. })));
        assert_eq!(parse("add gold 500"), Some(Command::Forward("add gold 500".into())));
    }

    #[test]
    fn test_every_verb_has_a_descriptor() {
        for verb in [
            Verb::Help,
            Verb::Status,
            Verb::Who,
            Verb::Sessions,
            Verb::Broadcast,
            Verb::CreateAccount,
            Verb::ListAccounts,
            Verb::SetAccess,
            Verb::Exit,
        ] {
            assert_eq!(verb.spec().verb, verb);
            assert_eq!(Verb::lookup(verb.name()), Some(verb));
        }
    }

    #[tokio::test]
    async fn test_broadcast_requires_elevated_tier() {
        let f = fixture(InMemoryWorld::new());
        let (player, _rx) = login(&f.registry, "pat", AccessLevel::Player);

        let reply = f.router.dispatch(&player, "broadcast hello").await.unwrap();
        assert_eq!(reply.lines, vec!["Insufficient access level for broadcast."]);
        settle(&f.sim).await;
        assert!(f.probe.broadcasts().is_empty());
    }

    #[tokio::test]
    async fn test_broadcast_reaches_world() {
        let f = fixture(InMemoryWorld::new());
        let (gm, _rx) = login(&f.registry, "gm", AccessLevel::GameMaster);

        let reply = f.router.dispatch(&gm, "broadcast hello").await.unwrap();
        assert_eq!(reply.lines, vec!["Broadcast sent: hello"]);
        settle(&f.sim).await;
        assert_eq!(f.probe.broadcasts(), vec!["[Broadcast] hello".to_string()]);

        let usage = f.router.dispatch(&gm, "broadcast").await.unwrap();
        assert_eq!(usage.lines, vec!["Usage: broadcast <message>"]);
    }

    #[tokio::test]
    async fn test_who_with_no_actors() {
        let f = fixture(InMemoryWorld::new());
        let (s, _rx) = login(&f.registry, "op", AccessLevel::Player);

        let reply = f.router.dispatch(&s, "who").await.unwrap();
        assert_eq!(reply.lines[0], "=== Online Actors (0) ===");
        assert_eq!(reply.lines[1], "No actors online.");
        assert_eq!(reply.lines.len(), 3);
    }

    #[tokio::test]
    async fn test_who_lists_actors_with_location() {
        let world = InMemoryWorld::new()
            .with_actor("Zed", AccessLevel::Player)
            .with_actor_at(
                "Alice",
                AccessLevel::Seer,
                Location {
                    x: 1496,
                    y: 1628,
                    z: 10,
                    map: "Felucca".into(),
                },
            );
        let f = fixture(world);
        let (s, _rx) = login(&f.registry, "op", AccessLevel::Player);

        let reply = f.router.dispatch(&s, "WHO").await.unwrap();
        assert_eq!(reply.lines[0], "=== Online Actors (2) ===");
        assert_eq!(reply.lines[1], "Alice [Seer] - (1496, 1628, 10) (Felucca)");
        assert_eq!(reply.lines[2], "Zed - (0, 0, 0) (Overworld)");
    }

    #[tokio::test]
    async fn test_sessions_marks_current() {
        let f = fixture(InMemoryWorld::new());
        let (me, _rx1) = login(&f.registry, "me", AccessLevel::Player);
        let (_other, _rx2) = login(&f.registry, "other", AccessLevel::Player);

        let reply = f.router.dispatch(&me, "sessions").await.unwrap();
        assert_eq!(reply.lines[0], "=== Active Console Sessions (2) ===");
        let current: Vec<_> = reply.lines.iter().filter(|l| l.ends_with("(current)")).collect();
        assert_eq!(current.len(), 1);
        assert!(reply.lines.iter().any(|l| l.starts_with(&format!("{}: me from", me.id()))));
    }

    #[tokio::test]
    async fn test_status_reports_registry_size() {
        let f = fixture(InMemoryWorld::new().with_actor("Alice", AccessLevel::Player));
        let (s, _rx) = login(&f.registry, "op", AccessLevel::Player);

        let reply = f.router.dispatch(&s, "status").await.unwrap();
        assert!(reply.lines.contains(&"Online Actors: 1".to_string()));
        assert!(reply.lines.contains(&"Console Sessions: 1/5".to_string()));
    }

    #[tokio::test]
    async fn test_exit_closes() {
        let f = fixture(InMemoryWorld::new());
        let (s, _rx) = login(&f.registry, "op", AccessLevel::Player);

        let reply = f.router.dispatch(&s, "Quit").await.unwrap();
        assert!(reply.close);
        assert_eq!(reply.lines, vec!["Goodbye!"]);
    }

    #[tokio::test]
    async fn test_forwarded_command_runs_as_privileged_actor() {
        let f = fixture(InMemoryWorld::new());
        let (s, _rx) = login(&f.registry, "gm", AccessLevel::GameMaster);

        let reply = f.router.dispatch(&s, "add gold 500").await.unwrap();
        assert_eq!(reply.lines, vec!["Command submitted: add gold 500"]);
        settle(&f.sim).await;

        let executed = f.probe.executed();
        assert_eq!(executed.len(), 1);
        assert_eq!(executed[0].1, "add gold 500");
        assert_eq!(s.lease().current().map(|a| a.id), Some(executed[0].0));
    }

    #[tokio::test]
    async fn test_create_account_reports_through_outbox() {
        let f = fixture(InMemoryWorld::new());
        let (s, mut rx) = login(&f.registry, "admin", AccessLevel::Administrator);

        let reply = f
            .router
            .dispatch(&s, "createaccount bob hunter2 counselor")
            .await
            .unwrap();
        assert_eq!(reply.lines, vec!["Account creation submitted: bob"]);
        assert_eq!(rx.recv().await.unwrap(), "Account created: bob (Counselor)");

        f.router.dispatch(&s, "createaccount bob again").await.unwrap();
        let dup = rx.recv().await.unwrap();
        assert!(dup.starts_with("Account creation failed:"), "{dup}");

        let listing = f.router.dispatch(&s, "listaccounts").await.unwrap();
        assert_eq!(listing.lines[0], "=== Accounts (1) ===");
        assert_eq!(listing.lines[1], "bob - Counselor");
    }

    #[tokio::test]
    async fn test_cannot_grant_above_own_tier() {
        let f = fixture(InMemoryWorld::new().with_account("bob", "pw", AccessLevel::Player));
        let (gm, _rx) = login(&f.registry, "gm", AccessLevel::GameMaster);

        let err = f.router.dispatch(&gm, "setaccess bob owner").await.unwrap_err();
        assert!(matches!(err, ConsoleError::InsufficientAccess { .. }));

        let err = f
            .router
            .dispatch(&gm, "createaccount eve pw administrator")
            .await
            .unwrap_err();
        assert!(matches!(err, ConsoleError::InsufficientAccess { .. }));
    }

    #[tokio::test]
    async fn test_set_access_and_bad_tier() {
        let f = fixture(InMemoryWorld::new().with_account("bob", "pw", AccessLevel::Player));
        let (admin, mut rx) = login(&f.registry, "admin", AccessLevel::Administrator);

        f.router.dispatch(&admin, "setaccess bob seer").await.unwrap();
        assert_eq!(rx.recv().await.unwrap(), "Access of bob set to Seer");

        let err = f.router.dispatch(&admin, "setaccess bob wizard").await.unwrap_err();
        assert!(matches!(err, ConsoleError::UnknownAccessLevel(_)));

        let usage = f.router.dispatch(&admin, "setaccess bob").await.unwrap();
        assert_eq!(usage.lines, vec!["Usage: setaccess <user> <tier>"]);
    }

    #[test]
    fn test_uptime_format() {
        assert_eq!(format_uptime(Duration::from_secs(90_061)), "01:01:01:01");
        assert_eq!(format_clock(Duration::from_secs(3_725)), "01:02:05");
    }
}
