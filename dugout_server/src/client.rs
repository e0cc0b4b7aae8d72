// TCP client for scorers and observers.
//
// Architecture mirrors the server's reader threads:
// - `connect()` opens the TCP connection on the calling thread and waits (with
//   a timeout) for the STATE the server sends every new session.
// - A background reader thread then calls `read_message()` in a loop,
//   deserializes `ServerMessage`, and pushes into an `mpsc` channel.
// - The caller holds a `BufWriter<TcpStream>` for sending.
// - `poll()` drains the inbox without blocking.
//
// Each client also carries a `BatterPrompt`, which tracks whether the
// operator should be asked for the next batter's name. It is per-client
// state, updated from the messages `poll()` returns, so two clients in the
// same process never share it.

use std::io::{self, BufReader, BufWriter};
use std::net::{Shutdown, TcpStream, ToSocketAddrs};
use std::sync::mpsc::{self, Receiver, Sender};
use std::thread::{self, JoinHandle};
use std::time::Duration;

use dugout_protocol::{Ack, ClientMessage, ServerMessage, read_message, write_message};
use dugout_rules::{Base, PlayResult, Snapshot, UNKNOWN_BATTER};
use thiserror::Error;

/// How long `connect()` waits for the greeting STATE.
const GREETING_TIMEOUT: Duration = Duration::from_secs(5);

#[derive(Debug, Error)]
pub enum ClientError {
    #[error("connect failed: {0}")]
    Connect(#[source] io::Error),
    #[error("network error: {0}")]
    Io(#[from] io::Error),
    #[error("malformed server message: {0}")]
    Json(#[from] serde_json::Error),
    #[error("expected STATE greeting, got {0}")]
    UnexpectedGreeting(String),
}

/// Whether the operator must name the next batter.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct BatterPrompt {
    needed: bool,
}

impl Default for BatterPrompt {
    fn default() -> Self {
        Self { needed: true }
    }
}

impl BatterPrompt {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn needed(&self) -> bool {
        self.needed
    }

    /// The operator named a batter.
    pub fn supplied(&mut self) {
        self.needed = false;
    }

    /// Update from one server message.
    pub fn observe(&mut self, msg: &ServerMessage) {
        match msg {
            ServerMessage::Ack(Ack::Play(report)) => {
                if prompts_new_batter(report.result) || report.batter == UNKNOWN_BATTER {
                    self.needed = true;
                }
            }
            ServerMessage::Ack(Ack::Reset { .. }) | ServerMessage::End(_) => self.needed = true,
            _ => {}
        }
    }
}

/// Results after which a new batter comes up.
pub fn prompts_new_batter(result: PlayResult) -> bool {
    matches!(
        result,
        PlayResult::Out
            | PlayResult::Single
            | PlayResult::Double
            | PlayResult::Triple
            | PlayResult::HomeRun
            | PlayResult::SacFly
            | PlayResult::SacBunt
            | PlayResult::CaughtStealing
    )
}

/// A connected scorer/observer session.
pub struct ScoreClient {
    writer: BufWriter<TcpStream>,
    inbox: Receiver<ServerMessage>,
    _reader_thread: JoinHandle<()>,
    prompt: BatterPrompt,
}

impl ScoreClient {
    /// Connect, read the greeting STATE, and spawn the reader thread.
    pub fn connect(addr: impl ToSocketAddrs) -> Result<(Self, Snapshot), ClientError> {
        let stream = TcpStream::connect(addr).map_err(ClientError::Connect)?;
        stream.set_read_timeout(Some(GREETING_TIMEOUT))?;

        let mut reader = BufReader::new(stream.try_clone()?);
        let writer = BufWriter::new(stream);

        let greeting: ServerMessage = serde_json::from_slice(&read_message(&mut reader)?)?;
        let snapshot = match greeting {
            ServerMessage::State(snapshot) => snapshot,
            other => return Err(ClientError::UnexpectedGreeting(format!("{other:?}"))),
        };

        reader.get_ref().set_read_timeout(None)?;
        let (tx, rx) = mpsc::channel();
        let reader_thread = thread::Builder::new()
            .name("dugout-client-reader".into())
            .spawn(move || reader_loop(reader, tx))?;

        Ok((
            Self {
                writer,
                inbox: rx,
                _reader_thread: reader_thread,
                prompt: BatterPrompt::new(),
            },
            snapshot,
        ))
    }

    /// Report a play. Naming a batter satisfies the batter prompt.
    pub fn send_at_bat(
        &mut self,
        result: PlayResult,
        batter: Option<&str>,
    ) -> Result<(), ClientError> {
        if batter.is_some() {
            self.prompt.supplied();
        }
        self.send(&ClientMessage::AtBat {
            batter: batter.map(str::to_owned),
            result,
        })
    }

    pub fn request_score(&mut self) -> Result<(), ClientError> {
        self.send(&ClientMessage::Score)
    }

    pub fn reset(&mut self) -> Result<(), ClientError> {
        self.send(&ClientMessage::Reset)
    }

    pub fn set_runners(&mut self, runners: &[Base]) -> Result<(), ClientError> {
        self.send(&ClientMessage::SetRunners {
            runners: runners.to_vec(),
        })
    }

    pub fn set_lineup(&mut self, away: &[&str], home: &[&str]) -> Result<(), ClientError> {
        let owned = |names: &[&str]| names.iter().map(|n| n.to_string()).collect();
        self.send(&ClientMessage::SetLineup {
            away_lineup: owned(away),
            home_lineup: owned(home),
        })
    }

    /// Drain all queued server messages (non-blocking).
    pub fn poll(&mut self) -> Vec<ServerMessage> {
        let mut messages = Vec::new();
        while let Ok(msg) = self.inbox.try_recv() {
            self.prompt.observe(&msg);
            messages.push(msg);
        }
        messages
    }

    /// Whether the operator should be asked for the next batter.
    pub fn needs_batter(&self) -> bool {
        self.prompt.needed()
    }

    /// Close the connection. The reader thread exits on EOF.
    pub fn close(&mut self) {
        let _ = self.writer.get_ref().shutdown(Shutdown::Both);
    }

    fn send(&mut self, msg: &ClientMessage) -> Result<(), ClientError> {
        let body = serde_json::to_vec(msg)?;
        write_message(&mut self.writer, &body)?;
        Ok(())
    }
}

fn reader_loop(mut reader: BufReader<TcpStream>, tx: Sender<ServerMessage>) {
    while let Ok(bytes) = read_message(&mut reader) {
        match serde_json::from_slice::<ServerMessage>(&bytes) {
            Ok(msg) => {
                if tx.send(msg).is_err() {
                    break;
                }
            }
            Err(_) => break,
        }
    }
}
