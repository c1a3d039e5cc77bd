//! Shared helpers: a bare TCP client and a console on an ephemeral port

#![allow(dead_code)]

use std::net::{IpAddr, SocketAddr};
use std::time::Duration;

use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpStream;

use telnet_console::auth::{AccessLevel, CredentialActor, PasswordDigest};
use telnet_console::simulation::{InMemoryWorld, SimulationActor, SimulationHandle, WorldProbe};
use telnet_console::audit::TIMESTAMP_FORMAT;
use telnet_console::{AuditActor, AuditHandle, Console, ConsoleConfig};

pub const LOCALHOST: IpAddr = IpAddr::V4(std::net::Ipv4Addr::LOCALHOST);
pub const READ_TIMEOUT: Duration = Duration::from_secs(5);

/// Console config bound to an OS-chosen localhost port
pub fn test_config() -> ConsoleConfig {
    ConsoleConfig::new()
        .with_bind_address(LOCALHOST)
        .with_port_range(0..=0)
        .with_allowed_addresses([LOCALHOST])
        .with_password_salt("test-salt")
        .with_shutdown_grace(Duration::from_secs(2))
}

pub struct TestConsole {
    pub console: Console,
    pub simulation: SimulationHandle,
    pub probe: WorldProbe,
    pub audit: AuditHandle,
}

impl TestConsole {
    pub fn addr(&self) -> SocketAddr {
        SocketAddr::new(LOCALHOST, self.console.port())
    }

    pub async fn connect(&self) -> Client {
        Client::connect(self.addr()).await
    }
}

/// Start a console with `admin`/`secret` (Administrator) and
/// `helper`/`helper-pw` (Counselor) over `world`
pub async fn start_console(config: ConsoleConfig, world: InMemoryWorld) -> TestConsole {
    let credentials = CredentialActor::spawn_with_users(
        PasswordDigest::new(config.password_salt.clone()),
        [
            ("admin".into(), "secret".into(), AccessLevel::Administrator),
            ("helper".into(), "helper-pw".into(), AccessLevel::Counselor),
        ],
    );
    let probe = world.probe();
    let simulation = SimulationActor::spawn(world);
    let audit = AuditActor::in_memory();

    let console = Console::start_with_audit(config, credentials, simulation.clone(), audit.clone())
        .await
        .unwrap();

    TestConsole {
        console,
        simulation,
        probe,
        audit,
    }
}

/// Line-agnostic client: reads until a marker shows up in the transcript
pub struct Client {
    stream: TcpStream,
    transcript: String,
    consumed: usize,
}

impl Client {
    pub async fn connect(addr: SocketAddr) -> Self {
        let stream = TcpStream::connect(addr).await.unwrap();
        Self {
            stream,
            transcript: String::new(),
            consumed: 0,
        }
    }

    /// Wait for `marker` past the last match and return everything up to it
    pub async fn expect(&mut self, marker: &str) -> String {
        let deadline = tokio::time::Instant::now() + READ_TIMEOUT;
        loop {
            if let Some(pos) = self.transcript[self.consumed..].find(marker) {
                let end = self.consumed + pos + marker.len();
                let chunk = self.transcript[self.consumed..end].to_string();
                self.consumed = end;
                return chunk;
            }

            let mut buf = [0u8; 1024];
            let read = tokio::time::timeout_at(deadline, self.stream.read(&mut buf))
                .await
                .unwrap_or_else(|_| panic!("timed out waiting for {marker:?}; got {:?}", self.transcript))
                .unwrap();
            assert!(
                read > 0,
                "connection closed while waiting for {marker:?}; got {:?}",
                self.transcript
            );
            self.transcript.push_str(&String::from_utf8_lossy(&buf[..read]));
        }
    }

    /// Read to EOF and return whatever arrived after the last expectation
    pub async fn expect_closed(&mut self) -> String {
        let mut rest = Vec::new();
        tokio::time::timeout(READ_TIMEOUT, self.stream.read_to_end(&mut rest))
            .await
            .expect("connection was not closed")
            .unwrap_or(0);
        self.transcript.push_str(&String::from_utf8_lossy(&rest));
        let tail = self.transcript[self.consumed..].to_string();
        self.consumed = self.transcript.len();
        tail
    }

    pub async fn send(&mut self, line: &str) {
        self.stream
            .write_all(format!("{line}\r\n").as_bytes())
            .await
            .unwrap();
    }

    /// Banner, credentials and the welcome block
    pub async fn login(&mut self, username: &str, password: &str) -> String {
        self.expect("Username: ").await;
        self.send(username).await;
        self.expect("Password: ").await;
        self.send(password).await;
        self.expect("to disconnect.").await
    }

    /// Send a command and collect its reply up to `marker`
    pub async fn command(&mut self, line: &str, marker: &str) -> String {
        self.send(line).await;
        self.expect(marker).await
    }
}

/// Audit lines start with `[YYYY-MM-DD HH:MM:SS] `
pub fn has_audit_prefix(line: &str) -> bool {
    line.starts_with('[')
        && line.get(20..22) == Some("] ")
        && chrono::NaiveDateTime::parse_from_str(&line[1..20], TIMESTAMP_FORMAT).is_ok()
}
