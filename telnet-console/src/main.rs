//! telnet-console: standalone console over an in-memory world
//!
//! Environment:
//! - `TELNET_CONSOLE_SALT`: password digest salt
//! - `TELNET_CONSOLE_USER` / `TELNET_CONSOLE_PASSWORD`: bootstrap administrator
//! - `TELNET_CONSOLE_AUDIT_LOG`: audit log path
//! - `RUST_LOG`: tracing filter

use anyhow::Context;
use tracing::{info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use telnet_console::auth::{AccessLevel, CredentialActor, PasswordDigest};
use telnet_console::simulation::{InMemoryWorld, SimulationActor};
use telnet_console::{Console, ConsoleConfig};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "telnet_console=info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let mut config = ConsoleConfig::default();
    if let Ok(path) = std::env::var("TELNET_CONSOLE_AUDIT_LOG") {
        config = config.with_audit_log_path(path);
    }
    if std::env::var("TELNET_CONSOLE_SALT").is_err() {
        warn!("TELNET_CONSOLE_SALT not set, using the built-in salt");
    }

    let username = std::env::var("TELNET_CONSOLE_USER").unwrap_or_else(|_| "admin".to_string());
    let password = match std::env::var("TELNET_CONSOLE_PASSWORD") {
        Ok(p) => p,
        Err(_) => {
            warn!(username = %username, "TELNET_CONSOLE_PASSWORD not set, bootstrap user has the default password");
            "changeme".to_string()
        }
    };

    let credentials = CredentialActor::spawn_with_users(
        PasswordDigest::new(config.password_salt.clone()),
        [(username, password, AccessLevel::Administrator)],
    );
    let simulation = SimulationActor::spawn(InMemoryWorld::new());

    let console = Console::start(config, credentials, simulation)
        .await
        .context("failed to start telnet console")?;
    info!("{}", console.info().await);

    tokio::signal::ctrl_c()
        .await
        .context("failed to listen for ctrl-c")?;

    console.shutdown().await.context("shutdown failed")?;
    Ok(())
}
