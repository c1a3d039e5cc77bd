//! Configuration for the telnet console
//!
//! Every value here is a process-wide constant chosen at startup. Nothing is
//! adjustable per connection or per call.

use std::net::{IpAddr, Ipv4Addr, Ipv6Addr};
use std::ops::RangeInclusive;
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::auth::AccessLevel;
use crate::error::{ConsoleError, Result};

/// Console configuration
#[derive(Debug, Clone)]
pub struct ConsoleConfig {
    /// Interface the listener binds to
    pub bind_address: IpAddr,

    /// Ordered port range; the first free port wins
    pub port_range: RangeInclusive<u16>,

    /// Source addresses allowed to reach the login prompt
    pub allowed_addresses: Vec<IpAddr>,

    /// Concurrency cap on live sessions
    pub max_sessions: usize,

    /// Inactivity allowed before the sweep terminates a session
    pub idle_timeout: Duration,

    /// Username/password rounds offered on a single connection
    pub max_login_attempts: u32,

    /// Failures from one address before it is locked out
    pub max_failed_attempts: u32,

    /// How long a locked-out address is refused
    pub lockout_duration: Duration,

    /// Failure records idle longer than this are evicted
    pub failure_retention: Duration,

    /// Period of the session and failure-record sweeps
    pub sweep_interval: Duration,

    /// Bound on joining the accept loop and session workers at shutdown
    pub shutdown_grace: Duration,

    /// Append-only audit log
    pub audit_log_path: PathBuf,

    /// Process-wide salt for password digests
    pub password_salt: String,

    /// Minimum tier for elevated verbs (broadcast, account management)
    pub elevated_access: AccessLevel,

    /// Keep privileged actors alive after their session ends
    pub persist_privileged_actors: bool,

    /// Execute forwarded commands through an already-present privileged actor
    pub reuse_existing_actors: bool,

    /// Longest accepted input line in bytes
    pub max_line_length: usize,

    /// First line of the connection banner
    pub banner_title: String,
}

impl Default for ConsoleConfig {
    fn default() -> Self {
        Self {
            bind_address: IpAddr::V4(Ipv4Addr::UNSPECIFIED),
            port_range: 6003..=6010,
            allowed_addresses: vec![
                IpAddr::V4(Ipv4Addr::LOCALHOST),
                IpAddr::V6(Ipv6Addr::LOCALHOST),
            ],
            max_sessions: 5,
            idle_timeout: Duration::from_secs(30 * 60),
            max_login_attempts: 3,
            max_failed_attempts: 3,
            lockout_duration: Duration::from_secs(15 * 60),
            failure_retention: Duration::from_secs(3600),
            sweep_interval: Duration::from_secs(60),
            shutdown_grace: Duration::from_secs(5),
            audit_log_path: PathBuf::from("logs/telnet-console.log"),
            password_salt: std::env::var("TELNET_CONSOLE_SALT")
                .unwrap_or_else(|_| "telnet-console-default-salt-change-me".to_string()),
            elevated_access: AccessLevel::GameMaster,
            persist_privileged_actors: false,
            reuse_existing_actors: true,
            max_line_length: 4096,
            banner_title: "Telnet Console".to_string(),
        }
    }
}

impl ConsoleConfig {
    /// Create config with sensible defaults
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_bind_address(mut self, addr: IpAddr) -> Self {
        self.bind_address = addr;
        self
    }

    pub fn with_port_range(mut self, range: RangeInclusive<u16>) -> Self {
        self.port_range = range;
        self
    }

    pub fn with_allowed_addresses(mut self, addrs: impl IntoIterator<Item = IpAddr>) -> Self {
        self.allowed_addresses = addrs.into_iter().collect();
        self
    }

    pub fn with_max_sessions(mut self, max: usize) -> Self {
        self.max_sessions = max;
        self
    }

    pub fn with_idle_timeout(mut self, timeout: Duration) -> Self {
        self.idle_timeout = timeout;
        self
    }

    pub fn with_max_login_attempts(mut self, attempts: u32) -> Self {
        self.max_login_attempts = attempts;
        self
    }

    /// Override lockout threshold and duration together
    pub fn with_lockout(mut self, threshold: u32, duration: Duration) -> Self {
        self.max_failed_attempts = threshold;
        self.lockout_duration = duration;
        self
    }

    pub fn with_failure_retention(mut self, retention: Duration) -> Self {
        self.failure_retention = retention;
        self
    }

    pub fn with_sweep_interval(mut self, interval: Duration) -> Self {
        self.sweep_interval = interval;
        self
    }

    pub fn with_shutdown_grace(mut self, grace: Duration) -> Self {
        self.shutdown_grace = grace;
        self
    }

    pub fn with_audit_log_path(mut self, path: impl AsRef<Path>) -> Self {
        self.audit_log_path = path.as_ref().to_path_buf();
        self
    }

    pub fn with_password_salt(mut self, salt: impl Into<String>) -> Self {
        self.password_salt = salt.into();
        self
    }

    pub fn with_elevated_access(mut self, level: AccessLevel) -> Self {
        self.elevated_access = level;
        self
    }

    pub fn with_persistent_actors(mut self, persist: bool) -> Self {
        self.persist_privileged_actors = persist;
        self
    }

    pub fn with_actor_reuse(mut self, reuse: bool) -> Self {
        self.reuse_existing_actors = reuse;
        self
    }

    pub fn with_banner_title(mut self, title: impl Into<String>) -> Self {
        self.banner_title = title.into();
        self
    }

    /// Check whether a peer address is on the allow-list.
    ///
    /// IPv4-mapped IPv6 peers (`::ffff:a.b.c.d`) match their IPv4 entry.
    pub fn is_allowed(&self, addr: IpAddr) -> bool {
        let addr = canonical_ip(addr);
        self.allowed_addresses
            .iter()
            .any(|allowed| canonical_ip(*allowed) == addr)
    }

    /// Reject configurations the console cannot run with
    pub fn validate(&self) -> Result<()> {
        if self.port_range.is_empty() {
            return Err(ConsoleError::Config("port range is empty".into()));
        }
        if self.max_sessions == 0 {
            return Err(ConsoleError::Config("max_sessions must be at least 1".into()));
        }
        if self.max_login_attempts == 0 {
            return Err(ConsoleError::Config(
                "max_login_attempts must be at least 1".into(),
            ));
        }
        if self.max_failed_attempts == 0 {
            return Err(ConsoleError::Config(
                "max_failed_attempts must be at least 1".into(),
            ));
        }
        if self.sweep_interval.is_zero() {
            return Err(ConsoleError::Config("sweep_interval must be non-zero".into()));
        }
        Ok(())
    }
}

/// Collapse IPv4-mapped IPv6 addresses to plain IPv4
pub(crate) fn canonical_ip(addr: IpAddr) -> IpAddr {
    match addr {
        IpAddr::V6(v6) => match v6.to_ipv4_mapped() {
            Some(v4) => IpAddr::V4(v4),
            None => IpAddr::V6(v6),
        },
        v4 => v4,
    }
}
