//! Per-connection I/O
//!
//! A [`Connection`] is the only thing a session worker reads from or writes
//! to. Waiting for input also services the two other wake-ups a worker has:
//! lines queued on the session outbox are written as they arrive, and an
//! external termination (idle sweep, shutdown) ends the wait.

use tokio::io::{AsyncRead, AsyncWrite, AsyncWriteExt, BufWriter, ReadHalf, WriteHalf};
use tokio::sync::{mpsc, oneshot};

use crate::error::Result;
use crate::session::Termination;
use crate::telnet::{TelnetEvent, TelnetReader};

/// What `next_input` woke up for
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Input {
    Line(String),
    Eof,
    Terminated(Termination),
}

pub struct Connection<S> {
    reader: TelnetReader<ReadHalf<S>>,
    writer: BufWriter<WriteHalf<S>>,
    terminate: Option<oneshot::Receiver<Termination>>,
    outbox: mpsc::UnboundedReceiver<String>,
    outbox_open: bool,
}

impl<S: AsyncRead + AsyncWrite> Connection<S> {
    pub fn new(
        stream: S,
        terminate: oneshot::Receiver<Termination>,
        outbox: mpsc::UnboundedReceiver<String>,
        max_line_len: usize,
    ) -> Self {
        let (read, write) = tokio::io::split(stream);
        Self {
            reader: TelnetReader::new(read, max_line_len),
            writer: BufWriter::new(write),
            terminate: Some(terminate),
            outbox,
            outbox_open: true,
        }
    }

    /// Wait for the next input line, EOF, or an external termination
    pub async fn next_input(&mut self) -> Result<Input> {
        loop {
            tokio::select! {
                biased;

                reason = recv_termination(&mut self.terminate), if self.terminate.is_some() => {
                    // A completed receiver must not be polled again
                    self.terminate = None;
                    if let Some(reason) = reason {
                        return Ok(Input::Terminated(reason));
                    }
                }

                line = self.outbox.recv(), if self.outbox_open => match line {
                    Some(line) => self.send_line(&line).await?,
                    None => self.outbox_open = false,
                },

                event = self.reader.read_event() => match event? {
                    TelnetEvent::Line(line) => return Ok(Input::Line(line)),
                    TelnetEvent::Reply(bytes) => {
                        self.writer.write_all(&bytes).await?;
                        self.writer.flush().await?;
                    }
                    TelnetEvent::Eof => return Ok(Input::Eof),
                },
            }
        }
    }

    pub async fn send_line(&mut self, line: &str) -> Result<()> {
        self.writer.write_all(line.as_bytes()).await?;
        self.writer.write_all(b"\r\n").await?;
        self.writer.flush().await?;
        Ok(())
    }

    pub async fn send_lines<I, L>(&mut self, lines: I) -> Result<()>
    where
        I: IntoIterator<Item = L>,
        L: AsRef<str>,
    {
        for line in lines {
            self.writer.write_all(line.as_ref().as_bytes()).await?;
            self.writer.write_all(b"\r\n").await?;
        }
        self.writer.flush().await?;
        Ok(())
    }

    /// Write a prompt and leave the cursor on the same line
    pub async fn send_prompt(&mut self, prompt: &str) -> Result<()> {
        self.writer.write_all(prompt.as_bytes()).await?;
        self.writer.flush().await?;
        Ok(())
    }

    pub async fn shutdown(&mut self) -> Result<()> {
        self.writer.flush().await?;
        self.writer.shutdown().await?;
        Ok(())
    }
}

async fn recv_termination(rx: &mut Option<oneshot::Receiver<Termination>>) -> Option<Termination> {
    match rx {
        Some(rx) => rx.await.ok(),
        None => std::future::pending().await,
    }
}
