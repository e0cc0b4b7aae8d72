// Command routing: decoded client messages in, deliveries out.
//
// `CommandRouter` owns the `Scorekeeper` (and therefore the game) plus the
// audit sink. For each inbound message it mutates the game as needed and
// returns an ordered list of `Delivery` values saying which messages go back
// to the sender and which go to every session. The router never touches a
// socket; `server.rs` performs the deliveries in order.
//
// Per command:
// - AB:          reply ACK (or ERROR if the game is over); on a game-ending
//                play, broadcast END instead of replying ACK. Every applied
//                play then broadcasts the new STATE.
// - SCORE:       reply STATE. Never mutates.
// - RESET:       fresh game; broadcast the reset ACK, then STATE.
// - SET_RUNNERS: overwrite bases; broadcast STATE.
// - SET_LINEUP:  store lineups; reply the lineup ACK to the sender only.
// - undecodable: reply ERROR to the sender only.

use dugout_protocol::{ClientMessage, ProtocolError, ServerMessage};
use dugout_rules::{AtBatEvent, Base, Outcome, PlayResult};
use tracing::{debug, info};

use crate::audit::AuditSink;
use crate::scorekeeper::Scorekeeper;

/// Where one outbound message goes.
#[derive(Clone, Debug, PartialEq)]
pub enum Delivery {
    /// To the session that sent the request.
    Reply(ServerMessage),
    /// To every registered session, the sender included.
    Broadcast(ServerMessage),
}

pub struct CommandRouter {
    scorekeeper: Scorekeeper,
    audit: Box<dyn AuditSink>,
}

impl CommandRouter {
    pub fn new(audit: Box<dyn AuditSink>) -> Self {
        Self {
            scorekeeper: Scorekeeper::new(),
            audit,
        }
    }

    pub fn scorekeeper(&self) -> &Scorekeeper {
        &self.scorekeeper
    }

    /// STATE sent to a session when it connects.
    pub fn greeting(&self) -> ServerMessage {
        ServerMessage::State(self.scorekeeper.snapshot())
    }

    /// Route the result of decoding one inbound line.
    pub fn route(&mut self, decoded: Result<ClientMessage, ProtocolError>) -> Vec<Delivery> {
        match decoded {
            Ok(message) => self.handle(message),
            Err(err) => {
                debug!(error = %err, "rejecting undecodable message");
                vec![Delivery::Reply(ServerMessage::error(err.client_text()))]
            }
        }
    }

    pub fn handle(&mut self, message: ClientMessage) -> Vec<Delivery> {
        match message {
            ClientMessage::AtBat { batter, result } => self.at_bat(batter, result),
            ClientMessage::Score => vec![Delivery::Reply(self.greeting())],
            ClientMessage::Reset => self.reset(),
            ClientMessage::SetRunners { runners } => self.set_runners(runners),
            ClientMessage::SetLineup {
                away_lineup,
                home_lineup,
            } => self.set_lineup(away_lineup, home_lineup),
        }
    }

    fn at_bat(&mut self, batter: Option<String>, result: PlayResult) -> Vec<Delivery> {
        let event = AtBatEvent { result, batter };
        let outcome = self.scorekeeper.apply_at_bat(&event);

        let first = match outcome {
            Outcome::Ack(report) => {
                debug!(batter = %report.batter, %result, away = report.away, home = report.home, "play applied");
                Delivery::Reply(ServerMessage::play_ack(report))
            }
            Outcome::End(end) => {
                info!(winner = %end.winner, away = end.away, home = end.home, "game over");
                Delivery::Broadcast(ServerMessage::End(end))
            }
            Outcome::Error(violation) => {
                let reply = ServerMessage::error(violation.to_string());
                self.audit.record(&reply);
                return vec![Delivery::Reply(reply)];
            }
        };

        let state = self.greeting();
        match &first {
            Delivery::Reply(msg) | Delivery::Broadcast(msg) => self.audit.record(msg),
        }
        self.audit.record(&state);
        vec![first, Delivery::Broadcast(state)]
    }

    fn reset(&mut self) -> Vec<Delivery> {
        self.scorekeeper.reset();
        info!("game reset");
        let ack = ServerMessage::reset_ack();
        self.audit.record(&ack);
        vec![Delivery::Broadcast(ack), Delivery::Broadcast(self.greeting())]
    }

    fn set_runners(&mut self, runners: Vec<Base>) -> Vec<Delivery> {
        self.scorekeeper.set_runners(runners.into_iter().collect());
        let state = self.greeting();
        self.audit.record(&state);
        vec![Delivery::Broadcast(state)]
    }

    fn set_lineup(&mut self, away: Vec<String>, home: Vec<String>) -> Vec<Delivery> {
        info!(?away, ?home, "lineups set");
        self.scorekeeper.set_lineups(away.clone(), home.clone());
        let ack = ServerMessage::lineup_ack(away, home);
        self.audit.record(&ack);
        vec![Delivery::Reply(ack)]
    }
}
