// Error types for the server crate.
//
// `SendError` covers a single delivery to a single session. Broadcasts
// collect one per failing session (see `registry::BroadcastReport`) and
// never turn them into a failure of the broadcast as a whole.

use thiserror::Error;

use crate::registry::SessionId;

/// A message could not be delivered to one session.
#[derive(Debug, Error)]
pub enum SendError {
    #[error("session {0} is not registered")]
    UnknownSession(SessionId),
    #[error("failed to encode message: {0}")]
    Encode(String),
    /// The peer is not reading and its outbound queue is full.
    #[error("session is not keeping up; outbound queue is full")]
    Backlogged,
    #[error("session writer has stopped")]
    Closed,
}
