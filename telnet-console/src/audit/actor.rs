//! AuditActor: append-only audit log
//!
//! Every event becomes one line, `[YYYY-MM-DD HH:MM:SS] <event text>`, in
//! local time. Logging is fire-and-forget: callers never wait on the disk.
//! The last few hundred lines are also kept in memory for `recent`.
//!
//! # Usage
//!
//! ```rust,no_run
//! use telnet_console::audit::{AuditActor, AuditEvent};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let audit = AuditActor::spawn("logs/telnet-console.log").await?;
//!
//!     audit.log(AuditEvent::ConsoleStarted { port: 6003 });
//!     audit.flush().await?;
//!
//!     let lines = audit.recent(10).await;
//!     assert_eq!(lines.len(), 1);
//!     Ok(())
//! }
//! ```

use std::collections::VecDeque;
use std::path::{Path, PathBuf};

use chrono::Local;
use tokio::fs::{File, OpenOptions};
use tokio::io::AsyncWriteExt;
use tokio::sync::{mpsc, oneshot};
use tracing::{info, warn};

use crate::error::{ConsoleError, Result};

use super::types::AuditEvent;

const RECENT_CAPACITY: usize = 256;

/// Timestamp layout inside the leading brackets of every audit line
pub const TIMESTAMP_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

// ─── Messages ───

enum AuditMsg {
    Log {
        event: AuditEvent,
    },
    Flush {
        reply: oneshot::Sender<Result<()>>,
    },
    Recent {
        limit: usize,
        reply: oneshot::Sender<Vec<String>>,
    },
}

// ─── Actor ───

/// Audit actor: owns the log file
pub struct AuditActor {
    file: Option<File>,
    path: Option<PathBuf>,
    recent: VecDeque<String>,
    rx: mpsc::UnboundedReceiver<AuditMsg>,
}

impl AuditActor {
    /// Open (or create) the audit file at `path` and spawn the actor
    pub async fn spawn(path: impl AsRef<Path>) -> Result<AuditHandle> {
        let path = path.as_ref().to_path_buf();
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            tokio::fs::create_dir_all(parent).await?;
        }
        let file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&path)
            .await?;

        info!(path = %path.display(), "AuditActor spawned");
        Ok(Self::start(Some(file), Some(path)))
    }

    /// Spawn an actor that keeps lines in memory only
    pub fn in_memory() -> AuditHandle {
        Self::start(None, None)
    }

    fn start(file: Option<File>, path: Option<PathBuf>) -> AuditHandle {
        // Unbounded so that logging never waits, even from sync contexts
        let (tx, rx) = mpsc::unbounded_channel();
        let actor = Self {
            file,
            path,
            recent: VecDeque::with_capacity(RECENT_CAPACITY),
            rx,
        };
        tokio::spawn(actor.run());
        AuditHandle { tx }
    }

    async fn run(mut self) {
        while let Some(msg) = self.rx.recv().await {
            match msg {
                AuditMsg::Log { event } => {
                    if let Err(e) = self.handle_log(&event).await {
                        warn!(error = ?e, kind = event.kind(), "Failed to write audit log");
                    }
                }
                AuditMsg::Flush { reply } => {
                    let _ = reply.send(self.handle_flush().await);
                }
                AuditMsg::Recent { limit, reply } => {
                    let skip = self.recent.len().saturating_sub(limit);
                    let _ = reply.send(self.recent.iter().skip(skip).cloned().collect());
                }
            }
        }
        // Best effort on the way out
        let _ = self.handle_flush().await;
        info!("AuditActor stopped");
    }

    async fn handle_log(&mut self, event: &AuditEvent) -> Result<()> {
        let line = format_line(event);
        info!(kind = event.kind(), "{event}");

        if self.recent.len() == RECENT_CAPACITY {
            self.recent.pop_front();
        }
        self.recent.push_back(line.clone());

        if let Some(file) = self.file.as_mut() {
            file.write_all(line.as_bytes()).await?;
            file.write_all(b"\n").await?;
        }
        Ok(())
    }

    async fn handle_flush(&mut self) -> Result<()> {
        if let Some(file) = self.file.as_mut() {
            file.flush().await.map_err(|e| {
                let path = self
                    .path
                    .as_ref()
                    .map(|p| p.display().to_string())
                    .unwrap_or_default();
                ConsoleError::Internal(format!("audit flush failed for {path}: {e}"))
            })?;
        }
        Ok(())
    }
}

/// `[YYYY-MM-DD HH:MM:SS] <event text>`
pub fn format_line(event: &AuditEvent) -> String {
    format!("[{}] {}", Local::now().format(TIMESTAMP_FORMAT), event)
}

// ─── Handle ───

/// Thread-safe handle to the AuditActor
#[derive(Clone)]
pub struct AuditHandle {
    tx: mpsc::UnboundedSender<AuditMsg>,
}

impl AuditHandle {
    /// Record an event (fire-and-forget)
    pub fn log(&self, event: AuditEvent) {
        let _ = self.tx.send(AuditMsg::Log { event });
    }

    /// Wait until every event logged so far has reached the file
    pub async fn flush(&self) -> Result<()> {
        let (reply, rx) = oneshot::channel();
        self.tx
            .send(AuditMsg::Flush { reply })
            .map_err(|_| ConsoleError::ActorUnavailable("AuditActor".into()))?;
        rx.await
            .map_err(|_| ConsoleError::ActorUnavailable("AuditActor dropped".into()))?
    }

    /// The most recent `limit` lines, oldest first
    pub async fn recent(&self, limit: usize) -> Vec<String> {
        let (reply, rx) = oneshot::channel();
        if self.tx.send(AuditMsg::Recent { limit, reply }).is_err() {
            return vec![];
        }
        rx.await.unwrap_or_default()
    }
}
