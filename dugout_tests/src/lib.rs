// Test-only scorer/observer for end-to-end integration tests.
//
// Wraps the real `ScoreClient` (from `dugout_server::client`) to provide a
// synchronous, test-friendly API for exercising the full pipeline:
// connect → report play → rules → broadcast → every board agrees.
//
// The only test-specific code here is the blocking polling wrappers around
// `ScoreClient::poll()` and the locally tracked `board`. All networking and
// rule logic uses the same code paths as a live scorer.
//
// See also: `tests/full_pipeline.rs` for the integration test scenarios.

use std::collections::VecDeque;
use std::net::SocketAddr;
use std::thread;
use std::time::{Duration, Instant};

use dugout_protocol::{Ack, ServerMessage};
use dugout_rules::{Base, PlayResult, Snapshot};
use dugout_server::client::ScoreClient;

/// Default timeout for blocking poll operations.
const POLL_TIMEOUT: Duration = Duration::from_secs(5);

/// Sleep duration between poll attempts.
const POLL_INTERVAL: Duration = Duration::from_millis(5);

/// A connected session that remembers the last scoreboard it was sent.
pub struct TestObserver {
    client: ScoreClient,
    pending: VecDeque<ServerMessage>,
    /// Most recent STATE received (the greeting, initially).
    pub board: Snapshot,
}

impl TestObserver {
    pub fn connect(addr: SocketAddr) -> Self {
        let (client, board) = ScoreClient::connect(addr).expect("TestObserver::connect failed");
        Self {
            client,
            pending: VecDeque::new(),
            board,
        }
    }

    /// Report a play and wait for its outcome (play ACK, END, or ERROR).
    /// For an applied play, also waits for the STATE broadcast that follows
    /// it, so `board` is current when this returns.
    pub fn play(&mut self, result: PlayResult, batter: Option<&str>) -> ServerMessage {
        self.client
            .send_at_bat(result, batter)
            .expect("send_at_bat failed");
        let outcome = self.poll_until("play outcome", |msg| {
            matches!(
                msg,
                ServerMessage::Ack(Ack::Play(_)) | ServerMessage::End(_) | ServerMessage::Error { .. }
            )
        });
        if !matches!(outcome, ServerMessage::Error { .. }) {
            self.poll_until_state();
        }
        outcome
    }

    /// Report the same result `n` times, anonymously.
    pub fn play_n(&mut self, result: PlayResult, n: usize) -> Vec<ServerMessage> {
        (0..n).map(|_| self.play(result, None)).collect()
    }

    pub fn request_score(&mut self) -> Snapshot {
        self.client.request_score().expect("request_score failed");
        self.poll_until_state()
    }

    /// Reset the game and wait for the fresh board.
    pub fn reset(&mut self) -> Snapshot {
        self.client.reset().expect("reset failed");
        self.poll_until("reset ACK", |msg| {
            matches!(msg, ServerMessage::Ack(Ack::Reset { .. }))
        });
        self.poll_until_state()
    }

    pub fn set_runners(&mut self, runners: &[Base]) -> Snapshot {
        self.client.set_runners(runners).expect("set_runners failed");
        self.poll_until_state()
    }

    pub fn set_lineup(&mut self, away: &[&str], home: &[&str]) {
        self.client
            .set_lineup(away, home)
            .expect("set_lineup failed");
        self.poll_until("lineup ACK", |msg| {
            matches!(msg, ServerMessage::Ack(Ack::Lineup { .. }))
        });
    }

    pub fn needs_batter(&self) -> bool {
        self.client.needs_batter()
    }

    /// Blocking poll until a STATE arrives. Returns it.
    pub fn poll_until_state(&mut self) -> Snapshot {
        match self.poll_until("STATE", |msg| matches!(msg, ServerMessage::State(_))) {
            ServerMessage::State(snapshot) => snapshot,
            other => unreachable!("poll_until returned {other:?}"),
        }
    }

    /// Blocking poll until a message matching `wanted` arrives. Messages
    /// skipped on the way are dropped, except that every STATE updates
    /// `board`.
    pub fn poll_until(
        &mut self,
        what: &str,
        wanted: impl Fn(&ServerMessage) -> bool,
    ) -> ServerMessage {
        let start = Instant::now();
        loop {
            while let Some(msg) = self.pending.pop_front() {
                if let ServerMessage::State(snapshot) = &msg {
                    self.board = snapshot.clone();
                }
                if wanted(&msg) {
                    return msg;
                }
            }
            assert!(
                start.elapsed() < POLL_TIMEOUT,
                "timed out waiting for {what}"
            );
            self.pending.extend(self.client.poll());
            if self.pending.is_empty() {
                thread::sleep(POLL_INTERVAL);
            }
        }
    }

    /// Non-blocking: everything received but not yet consumed.
    pub fn drain(&mut self) -> Vec<ServerMessage> {
        self.pending.extend(self.client.poll());
        let messages: Vec<ServerMessage> = self.pending.drain(..).collect();
        if let Some(snapshot) = messages.iter().rev().find_map(|msg| match msg {
            ServerMessage::State(snapshot) => Some(snapshot.clone()),
            _ => None,
        }) {
            self.board = snapshot;
        }
        messages
    }

    pub fn close(&mut self) {
        self.client.close();
    }
}
