// dugout_protocol: wire protocol between scorers/observers and the server.
//
// This crate defines what travels over a session connection: the messages a
// client may send, the messages the server answers or broadcasts with, how an
// inbound line is decoded (and how decoding fails), and how messages are
// delimited on the stream. It is shared by the server and the client and does
// no networking itself.
//
// Module overview:
// - `message.rs`:  `ClientMessage` (AB, SCORE, RESET, SET_RUNNERS,
//                  SET_LINEUP) and `ServerMessage` (STATE, ACK, END, ERROR).
//                  Both are JSON objects tagged by a `type` field.
// - `codec.rs`:    `decode_client_message` with a typed `ProtocolError`, and
//                  `encode` for outbound messages.
// - `framing.rs`:  Newline-delimited framing over any `BufRead`/`Write`
//                  stream: one JSON object per line.
//
// Design decisions:
// - **JSON lines.** Every message is one line of JSON, so a scorer can drive
//   the server from `nc` as easily as from the bundled client.
// - **Domain types on the wire.** Results, bases, and halves are the
//   `dugout_rules` enums, so an unknown result code fails decoding instead of
//   reaching the rule engine.

pub mod codec;
pub mod framing;
pub mod message;

pub use codec::{ProtocolError, decode_client_message, encode};
pub use framing::{MAX_MESSAGE_SIZE, read_message, write_message};
pub use message::{Ack, AckNote, ClientMessage, ServerMessage};
