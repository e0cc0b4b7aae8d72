// Protocol messages for scorer/observer ↔ server communication.
//
// Two enums define the full protocol vocabulary:
// - `ClientMessage`: sent by a session to the server.
// - `ServerMessage`: sent by the server, either as a reply to one session or
//   broadcast to all of them.
//
// Both are serde internally-tagged enums keyed on `type`, so on the wire a
// message is a flat JSON object such as `{"type":"AB","result":"HR"}`.
//
// ACK comes in three shapes that share the `"ACK"` tag: a play ack (batter,
// result, score, inning, half), a reset ack (`msg: "RESET"`), and a lineup ack
// (`msg: "LINEUP_SET"` plus both lineups). `Ack` is an untagged enum so each
// shape serializes without a discriminator of its own.

use dugout_rules::{Base, GameEnd, PlayReport, PlayResult, Snapshot};
use serde::{Deserialize, Serialize};

/// Messages sent by a session to the server.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ClientMessage {
    /// Report the outcome of a pitch or play.
    #[serde(rename = "AB")]
    AtBat {
        #[serde(default, skip_serializing_if = "Option::is_none")]
        batter: Option<String>,
        result: PlayResult,
    },
    /// Ask for the current scoreboard (reply to sender only).
    Score,
    /// Start a fresh game.
    Reset,
    /// Overwrite the occupied bases.
    SetRunners {
        #[serde(default)]
        runners: Vec<Base>,
    },
    /// Store both batting orders.
    SetLineup {
        #[serde(default)]
        away_lineup: Vec<String>,
        #[serde(default)]
        home_lineup: Vec<String>,
    },
}

impl ClientMessage {
    /// Wire `type` values, upper case.
    pub const TYPES: [&'static str; 5] = ["AB", "SCORE", "RESET", "SET_RUNNERS", "SET_LINEUP"];
}

/// Messages sent by the server to a session.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ServerMessage {
    /// Full scoreboard. Sent on connect, on SCORE, and broadcast after every
    /// state change.
    State(Snapshot),
    /// Acknowledgment of a play, a reset, or a lineup change.
    Ack(Ack),
    /// The game has concluded.
    End(GameEnd),
    /// The request could not be handled.
    Error { msg: String },
}

impl ServerMessage {
    pub fn error(msg: impl Into<String>) -> Self {
        ServerMessage::Error { msg: msg.into() }
    }

    pub fn reset_ack() -> Self {
        ServerMessage::Ack(Ack::Reset {
            msg: AckNote::Reset,
        })
    }

    pub fn lineup_ack(away_lineup: Vec<String>, home_lineup: Vec<String>) -> Self {
        ServerMessage::Ack(Ack::Lineup {
            msg: AckNote::LineupSet,
            away_lineup,
            home_lineup,
        })
    }

    pub fn play_ack(report: PlayReport) -> Self {
        ServerMessage::Ack(Ack::Play(report))
    }
}

/// The three ACK shapes. Variant order matters for deserialization: the most
/// specific shape is tried first.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Ack {
    Play(PlayReport),
    Lineup {
        msg: AckNote,
        away_lineup: Vec<String>,
        home_lineup: Vec<String>,
    },
    Reset {
        msg: AckNote,
    },
}

/// The `msg` marker carried by non-play ACKs.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum AckNote {
    #[serde(rename = "RESET")]
    Reset,
    #[serde(rename = "LINEUP_SET")]
    LineupSet,
}
