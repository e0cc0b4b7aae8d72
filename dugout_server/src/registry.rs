// Connected observer sessions and broadcast fan-out.
//
// `SessionRegistry` is the set of live sessions, keyed by a server-assigned
// `SessionId`. The registry carries no game semantics: it only knows how to
// get bytes onto a session's stream.
//
// Each session gets its own writer thread that owns the write half of the
// connection and drains a bounded `mpsc` queue (`sync_channel`). Sending never
// touches a socket: `send_to` and `broadcast` only enqueue, with `try_send`,
// so a session that stops reading can never stall the caller. The caller is
// the server's main loop, which must keep serving everyone else.
//
// A session is reported as failed when:
// - its queue is full (`SendError::Backlogged`): the peer has stopped reading
//   and `queue_depth` messages are already waiting behind its socket;
// - its writer thread has exited (`SendError::Closed`) after a write error.
// Broadcasts encode the message once and return one `Result` per session in
// the `BroadcastReport`. Deciding what to do about failures (log, drop the
// session) is left to the caller in `server.rs`.
//
// Unregistering drops the queue's sender; the writer thread finishes any
// queued writes it can and exits.

use std::collections::BTreeMap;
use std::fmt;
use std::io::{self, Write};
use std::sync::Arc;
use std::sync::mpsc::{self, Receiver, SyncSender, TrySendError};
use std::thread;

use dugout_protocol::{ServerMessage, encode, write_message};
use tracing::debug;

use crate::error::SendError;

/// Messages that may wait for one session before it counts as stalled.
pub const SESSION_QUEUE_DEPTH: usize = 1024;

/// Server-assigned session identifier. Never reused within a server run.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct SessionId(pub u32);

impl fmt::Display for SessionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// One encoded line, shared by every queue it is broadcast to.
type Frame = Arc<[u8]>;

struct SessionEntry {
    peer: String,
    outbox: SyncSender<Frame>,
}

impl SessionEntry {
    fn enqueue(&self, frame: &Frame) -> Result<(), SendError> {
        self.outbox.try_send(frame.clone()).map_err(|e| match e {
            TrySendError::Full(_) => SendError::Backlogged,
            TrySendError::Disconnected(_) => SendError::Closed,
        })
    }
}

/// Live sessions.
pub struct SessionRegistry {
    sessions: BTreeMap<SessionId, SessionEntry>,
    next_id: u32,
    queue_depth: usize,
}

impl Default for SessionRegistry {
    fn default() -> Self {
        Self::with_queue_depth(SESSION_QUEUE_DEPTH)
    }
}

impl SessionRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_queue_depth(queue_depth: usize) -> Self {
        Self {
            sessions: BTreeMap::new(),
            next_id: 0,
            queue_depth,
        }
    }

    /// Add a session, start its writer thread, and return its new ID.
    pub fn register<W>(&mut self, peer: impl Into<String>, writer: W) -> io::Result<SessionId>
    where
        W: Write + Send + 'static,
    {
        let id = SessionId(self.next_id);
        let (outbox, queue) = mpsc::sync_channel(self.queue_depth);
        thread::Builder::new()
            .name(format!("dugout-session-{}", id.0))
            .spawn(move || write_loop(id, writer, queue))?;

        self.next_id += 1;
        self.sessions.insert(
            id,
            SessionEntry {
                peer: peer.into(),
                outbox,
            },
        );
        Ok(id)
    }

    /// Remove a session. Returns false if it was already gone.
    pub fn unregister(&mut self, id: SessionId) -> bool {
        self.sessions.remove(&id).is_some()
    }

    pub fn contains(&self, id: SessionId) -> bool {
        self.sessions.contains_key(&id)
    }

    pub fn len(&self) -> usize {
        self.sessions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sessions.is_empty()
    }

    pub fn ids(&self) -> Vec<SessionId> {
        self.sessions.keys().copied().collect()
    }

    /// Peer address recorded at registration.
    pub fn peer(&self, id: SessionId) -> Option<&str> {
        self.sessions.get(&id).map(|entry| entry.peer.as_str())
    }

    /// Queue a message for one session.
    pub fn send_to(&self, id: SessionId, msg: &ServerMessage) -> Result<(), SendError> {
        let entry = self
            .sessions
            .get(&id)
            .ok_or(SendError::UnknownSession(id))?;
        let frame = encode_frame(msg).map_err(|e| SendError::Encode(e.to_string()))?;
        entry.enqueue(&frame)
    }

    /// Queue a message for every registered session.
    pub fn broadcast(&self, msg: &ServerMessage) -> BroadcastReport {
        let deliveries = match encode_frame(msg) {
            Ok(frame) => self
                .sessions
                .iter()
                .map(|(id, entry)| (*id, entry.enqueue(&frame)))
                .collect(),
            Err(e) => self
                .sessions
                .keys()
                .map(|id| (*id, Err(SendError::Encode(e.to_string()))))
                .collect(),
        };
        BroadcastReport { deliveries }
    }
}

fn encode_frame(msg: &ServerMessage) -> serde_json::Result<Frame> {
    encode(msg).map(Frame::from)
}

/// Writer thread for one session. Exits when the queue's sender is dropped or
/// a write fails; either way the receiver goes with it, so later sends see
/// `SendError::Closed`.
fn write_loop<W: Write>(id: SessionId, mut writer: W, queue: Receiver<Frame>) {
    for frame in queue {
        if let Err(e) = write_message(&mut writer, &frame) {
            debug!(session = %id, error = %e, "session write failed");
            return;
        }
    }
}

/// Per-session results of one broadcast.
#[derive(Debug, Default)]
pub struct BroadcastReport {
    deliveries: Vec<(SessionId, Result<(), SendError>)>,
}

impl BroadcastReport {
    /// Number of sessions the broadcast was attempted on.
    pub fn attempted(&self) -> usize {
        self.deliveries.len()
    }

    /// Number of sessions the message was queued for.
    pub fn delivered(&self) -> usize {
        self.deliveries.iter().filter(|(_, r)| r.is_ok()).count()
    }

    pub fn failures(&self) -> impl Iterator<Item = (SessionId, &SendError)> {
        self.deliveries
            .iter()
            .filter_map(|(id, result)| result.as_ref().err().map(|e| (*id, e)))
    }

    pub fn failed_ids(&self) -> Vec<SessionId> {
        self.failures().map(|(id, _)| id).collect()
    }

    pub fn is_clean(&self) -> bool {
        self.deliveries.iter().all(|(_, r)| r.is_ok())
    }
}

#[cfg(test)]
mod tests {
    use std::io::{BufRead, Cursor};
    use std::sync::Mutex;
    use std::time::{Duration, Instant};

    use dugout_protocol::read_message;

    use super::*;

    /// In-memory writer whose contents stay readable after it is handed to a
    /// writer thread.
    #[derive(Clone, Default)]
    struct SharedBuf(Arc<Mutex<Vec<u8>>>);

    impl SharedBuf {
        /// Decode every line written so far.
        fn messages(&self) -> Vec<ServerMessage> {
            let bytes = self.0.lock().unwrap().clone();
            let mut cursor = Cursor::new(bytes);
            let mut out = Vec::new();
            while cursor.fill_buf().map(|b| !b.is_empty()).unwrap_or(false) {
                let line = read_message(&mut cursor).unwrap();
                out.push(serde_json::from_slice(&line).unwrap());
            }
            out
        }

        /// Block until `n` messages have been written.
        fn wait_for(&self, n: usize) -> Vec<ServerMessage> {
            let start = Instant::now();
            loop {
                let messages = self.messages();
                if messages.len() >= n {
                    return messages;
                }
                assert!(
                    start.elapsed() < Duration::from_secs(5),
                    "timed out waiting for {n} messages, have {}",
                    messages.len()
                );
                thread::sleep(Duration::from_millis(2));
            }
        }
    }

    impl Write for SharedBuf {
        fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
            self.0.lock().unwrap().extend_from_slice(buf);
            Ok(buf.len())
        }

        fn flush(&mut self) -> io::Result<()> {
            Ok(())
        }
    }

    /// A session whose peer has gone away.
    struct BrokenPipe;

    impl Write for BrokenPipe {
        fn write(&mut self, _buf: &[u8]) -> io::Result<usize> {
            Err(io::Error::new(io::ErrorKind::BrokenPipe, "peer closed"))
        }

        fn flush(&mut self) -> io::Result<()> {
            Ok(())
        }
    }

    /// A session whose peer is connected but never reads: every write blocks
    /// until the test releases it by dropping the sender.
    struct Stalled(Receiver<()>);

    impl Write for Stalled {
        fn write(&mut self, _buf: &[u8]) -> io::Result<usize> {
            let _ = self.0.recv();
            Err(io::Error::new(io::ErrorKind::BrokenPipe, "released"))
        }

        fn flush(&mut self) -> io::Result<()> {
            Ok(())
        }
    }

    #[test]
    fn register_assigns_increasing_ids() {
        let mut registry = SessionRegistry::new();
        let a = registry.register("10.0.0.1:1000", SharedBuf::default()).unwrap();
        let b = registry.register("10.0.0.2:1000", SharedBuf::default()).unwrap();
        assert_eq!(a, SessionId(0));
        assert_eq!(b, SessionId(1));
        assert_eq!(registry.len(), 2);
        assert_eq!(registry.peer(b), Some("10.0.0.2:1000"));
    }

    #[test]
    fn ids_are_not_reused_after_unregister() {
        let mut registry = SessionRegistry::new();
        let a = registry.register("a", SharedBuf::default()).unwrap();
        assert!(registry.unregister(a));
        assert!(!registry.unregister(a));
        let b = registry.register("b", SharedBuf::default()).unwrap();
        assert_ne!(a, b);
        assert!(!registry.contains(a));
    }

    #[test]
    fn broadcast_reaches_every_session() {
        let mut registry = SessionRegistry::new();
        let bufs: Vec<SharedBuf> = (0..4).map(|_| SharedBuf::default()).collect();
        for (i, buf) in bufs.iter().enumerate() {
            registry.register(format!("peer-{i}"), buf.clone()).unwrap();
        }

        let report = registry.broadcast(&ServerMessage::error("hello"));
        assert!(report.is_clean());
        assert_eq!(report.delivered(), 4);
        for buf in &bufs {
            assert_eq!(buf.wait_for(1), vec![ServerMessage::error("hello")]);
        }
    }

    #[test]
    fn messages_arrive_in_send_order() {
        let mut registry = SessionRegistry::new();
        let buf = SharedBuf::default();
        let id = registry.register("a", buf.clone()).unwrap();

        registry.send_to(id, &ServerMessage::error("first")).unwrap();
        registry.broadcast(&ServerMessage::error("second"));
        registry.send_to(id, &ServerMessage::error("third")).unwrap();

        assert_eq!(
            buf.wait_for(3),
            vec![
                ServerMessage::error("first"),
                ServerMessage::error("second"),
                ServerMessage::error("third"),
            ]
        );
    }

    #[test]
    fn broken_session_is_reported_once_its_writer_stops() {
        let mut registry = SessionRegistry::new();
        let good = SharedBuf::default();
        registry.register("good", good.clone()).unwrap();
        let broken = registry.register("broken", BrokenPipe).unwrap();

        // The first write fails on the writer thread; later sends find the
        // queue closed.
        let start = Instant::now();
        let mut sent = 0;
        let report = loop {
            let report = registry.broadcast(&ServerMessage::reset_ack());
            sent += 1;
            if !report.is_clean() {
                break report;
            }
            assert!(start.elapsed() < Duration::from_secs(5));
            thread::sleep(Duration::from_millis(2));
        };

        assert_eq!(report.attempted(), 2);
        assert_eq!(report.delivered(), 1);
        assert_eq!(report.failed_ids(), vec![broken]);
        assert!(matches!(
            report.failures().next(),
            Some((id, SendError::Closed)) if id == broken
        ));
        assert_eq!(good.wait_for(sent).len(), sent);
        // The broadcast does not remove anyone on its own.
        assert_eq!(registry.len(), 2);
    }

    #[test]
    fn stalled_session_backs_up_without_blocking_others() {
        let depth = 4;
        let mut registry = SessionRegistry::with_queue_depth(depth);
        let good = SharedBuf::default();
        registry.register("good", good.clone()).unwrap();
        let (release, hold) = mpsc::channel();
        let stalled = registry
            .register("stalled", Stalled(hold))
            .unwrap();

        // One frame can sit in the blocked write, `depth` more in the queue.
        let mut sent = 0;
        let report = loop {
            let report = registry.broadcast(&ServerMessage::reset_ack());
            sent += 1;
            // Keep the healthy queue empty so only the stalled one can fill.
            good.wait_for(sent);
            if !report.is_clean() {
                break report;
            }
            assert!(sent <= depth + 1, "queue never filled");
        };

        assert!(sent > depth, "failed before the queue was full");
        assert_eq!(report.failed_ids(), vec![stalled]);
        assert!(matches!(
            report.failures().next(),
            Some((_, SendError::Backlogged))
        ));
        // The healthy session got every broadcast, the failing one included.
        assert_eq!(good.wait_for(sent).len(), sent);

        drop(release);
    }

    #[test]
    fn broadcast_to_empty_registry_is_clean() {
        let registry = SessionRegistry::new();
        let report = registry.broadcast(&ServerMessage::reset_ack());
        assert!(report.is_clean());
        assert_eq!(report.attempted(), 0);
    }

    #[test]
    fn send_to_targets_one_session() {
        let mut registry = SessionRegistry::new();
        let a = SharedBuf::default();
        let b = SharedBuf::default();
        let id_a = registry.register("a", a.clone()).unwrap();
        registry.register("b", b.clone()).unwrap();

        registry.send_to(id_a, &ServerMessage::error("only you")).unwrap();
        assert_eq!(a.wait_for(1).len(), 1);
        assert!(b.messages().is_empty());
    }

    #[test]
    fn send_to_unknown_session_fails() {
        let registry = SessionRegistry::new();
        let err = registry
            .send_to(SessionId(7), &ServerMessage::reset_ack())
            .unwrap_err();
        assert!(matches!(err, SendError::UnknownSession(SessionId(7))));
        assert_eq!(err.to_string(), "session #7 is not registered");
    }
}
