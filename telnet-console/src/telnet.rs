//! Telnet-aware line reader
//!
//! Operators connect with ordinary telnet clients, which open with option
//! negotiation. The reader strips every IAC sequence from the byte stream,
//! refuses `DO`/`WILL` requests, drops subnegotiation blocks and yields the
//! remaining text one line at a time.
//!
//! [`TelnetReader::read_event`] is cancel-safe: bytes read from the socket are
//! kept in the reader until a full line is available, so it can sit in a
//! `tokio::select!` next to other wake-ups.

use bytes::BytesMut;
use memchr::memchr;
use tokio::io::{AsyncRead, AsyncReadExt};

const IAC: u8 = 255;
const DONT: u8 = 254;
const DO: u8 = 253;
const WONT: u8 = 252;
const WILL: u8 = 251;
const SB: u8 = 250;
const SE: u8 = 240;

/// Something the peer sent
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TelnetEvent {
    /// A complete line without its terminator; may be empty
    Line(String),
    /// Negotiation replies to write back before reading on
    Reply(Vec<u8>),
    /// Peer closed the stream. A trailing partial line is discarded.
    Eof,
}

#[derive(Debug, Default, Clone, Copy)]
enum State {
    #[default]
    Data,
    Iac,
    Negotiate(u8),
    Subneg {
        iac_seen: bool,
    },
}

/// Line reader over a telnet byte stream
#[derive(Debug)]
pub struct TelnetReader<R> {
    inner: R,
    raw: BytesMut,
    line: BytesMut,
    replies: Vec<u8>,
    state: State,
    max_line_len: usize,
}

impl<R> TelnetReader<R> {
    pub fn new(inner: R, max_line_len: usize) -> Self {
        Self {
            inner,
            raw: BytesMut::with_capacity(1024),
            line: BytesMut::with_capacity(256),
            replies: Vec::new(),
            state: State::Data,
            max_line_len: max_line_len.max(1),
        }
    }

    pub fn into_inner(self) -> R {
        self.inner
    }

    /// Move everything in `raw` through the IAC state machine
    fn decode_pending(&mut self) {
        for &b in self.raw.iter() {
            self.state = match self.state {
                State::Data => match b {
                    IAC => State::Iac,
                    // CR NUL is how some clients send a bare return
                    0 => State::Data,
                    _ => {
                        self.line.extend_from_slice(&[b]);
                        State::Data
                    }
                },
                State::Iac => match b {
                    IAC => {
                        self.line.extend_from_slice(&[IAC]);
                        State::Data
                    }
                    DO | DONT | WILL | WONT => State::Negotiate(b),
                    SB => State::Subneg { iac_seen: false },
                    // NOP, GA, AYT and friends
                    _ => State::Data,
                },
                State::Negotiate(cmd) => {
                    match cmd {
                        DO => self.replies.extend_from_slice(&[IAC, WONT, b]),
                        WILL => self.replies.extend_from_slice(&[IAC, DONT, b]),
                        _ => {}
                    }
                    State::Data
                }
                State::Subneg { iac_seen: true } if b == SE => State::Data,
                State::Subneg { iac_seen } => State::Subneg {
                    iac_seen: !iac_seen && b == IAC,
                },
            };
        }
        self.raw.clear();
    }
}

fn line_too_long() -> std::io::Error {
    std::io::Error::new(std::io::ErrorKind::InvalidData, "line too long")
}

impl<R: AsyncRead + Unpin> TelnetReader<R> {
    pub async fn read_event(&mut self) -> std::io::Result<TelnetEvent> {
        loop {
            self.decode_pending();

            if !self.replies.is_empty() {
                return Ok(TelnetEvent::Reply(std::mem::take(&mut self.replies)));
            }

            if let Some(i) = memchr(b'\n', &self.line) {
                if i > self.max_line_len {
                    return Err(line_too_long());
                }
                let raw = self.line.split_to(i + 1);
                return Ok(TelnetEvent::Line(decode_line(&raw)));
            }

            if self.line.len() > self.max_line_len {
                return Err(line_too_long());
            }

            let n = self.inner.read_buf(&mut self.raw).await?;
            if n == 0 {
                return Ok(TelnetEvent::Eof);
            }
        }
    }
}

fn decode_line(raw: &[u8]) -> String {
    let mut end = raw.len();
    if end > 0 && raw[end - 1] == b'\n' {
        end -= 1;
    }
    if end > 0 && raw[end - 1] == b'\r' {
        end -= 1;
    }
    String::from_utf8_lossy(&raw[..end]).into_owned()
}
