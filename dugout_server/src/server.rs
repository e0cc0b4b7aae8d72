// TCP server and main event loop.
//
// Architecture: thread-per-reader with a central `mpsc` channel.
//
// - **Listener thread** (`TcpListener::accept()` loop): accepts new TCP
//   connections and sends `InternalEvent::NewConnection` to the main thread.
// - **Reader threads** (one per session): call `framing::read_message()` in a
//   loop, decode each line into a `ClientMessage` (or a `ProtocolError`), and
//   send `InternalEvent::Inbound` to the main thread. On EOF or a read error
//   they send `InternalEvent::Disconnected` and exit.
// - **Main thread**: owns the `CommandRouter` (and through it the game) and
//   the `SessionRegistry`, receives events from the channel, and performs the
//   deliveries the router asks for. Events are applied one at a time in
//   arrival order, so the game has exactly one writer and no play can
//   interleave with another. There is no turn-taking between sessions: two
//   scorers reporting at once are simply serialized by arrival.
//
// - **Writer threads** (one per session, owned by `SessionRegistry`): drain
//   the session's bounded outbound queue onto its socket. The main thread
//   only enqueues, so a peer that stops reading backs up its own queue and
//   nobody else's.
//
// A session whose delivery fails (queue full, or its writer hit an error) is
// logged and dropped without affecting delivery to anyone else; its socket is
// shut down so its reader and writer threads exit too.
//
// The listener keeps accepting through transient `accept()` errors. Aborted
// or interrupted handshakes are retried at once; anything else (such as
// running out of file descriptors) is logged and retried after
// `POLL_INTERVAL`.
//
// Shutdown: `ServerHandle::stop` clears the `keep_running` flag; the main
// loop notices within `POLL_INTERVAL`, shuts down every session socket, and
// returns.

use std::collections::BTreeMap;
use std::io::{BufReader, BufWriter, ErrorKind};
use std::net::{Shutdown, SocketAddr, TcpListener, TcpStream};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::mpsc::{self, Receiver, RecvTimeoutError, Sender};
use std::thread;
use std::time::Duration;

use dugout_protocol::{ClientMessage, ProtocolError, decode_client_message, read_message};
use tracing::{debug, info, warn};

use crate::audit::{AuditSink, JsonlAudit, NullAudit};
use crate::config::ServerConfig;
use crate::registry::{SessionId, SessionRegistry};
use crate::router::{CommandRouter, Delivery};

/// How often the main loop and the listener check for shutdown.
const POLL_INTERVAL: Duration = Duration::from_millis(50);

/// Events sent from listener/reader threads to the main thread.
enum InternalEvent {
    NewConnection {
        stream: TcpStream,
        peer: SocketAddr,
    },
    Inbound {
        session_id: SessionId,
        decoded: Result<ClientMessage, ProtocolError>,
    },
    Disconnected {
        session_id: SessionId,
    },
}

/// Handle returned by `start_server` to control the running server.
pub struct ServerHandle {
    keep_running: Arc<AtomicBool>,
    thread: Option<thread::JoinHandle<()>>,
}

impl ServerHandle {
    /// Signal the server to stop and wait for it to shut down.
    pub fn stop(mut self) {
        self.keep_running.store(false, Ordering::SeqCst);
        self.join();
    }

    /// Block until the server stops on its own.
    pub fn wait(mut self) {
        self.join();
    }

    fn join(&mut self) {
        if let Some(handle) = self.thread.take() {
            let _ = handle.join();
        }
    }
}

/// Start the server on a background thread, with the audit sink named by the
/// config. Returns a handle for stopping it and the actual bound address
/// (useful when port 0 is used to let the OS pick a free port).
pub fn start_server(config: ServerConfig) -> std::io::Result<(ServerHandle, SocketAddr)> {
    let audit: Box<dyn AuditSink> = match &config.audit_log {
        Some(path) => Box::new(JsonlAudit::open(path)?),
        None => Box::new(NullAudit),
    };
    start_server_with_audit(config, audit)
}

/// Like `start_server`, with a caller-supplied audit sink.
pub fn start_server_with_audit(
    config: ServerConfig,
    audit: Box<dyn AuditSink>,
) -> std::io::Result<(ServerHandle, SocketAddr)> {
    let listener = TcpListener::bind(config.socket_addr())?;
    let addr = listener.local_addr()?;
    listener.set_nonblocking(true)?;
    let keep_running = Arc::new(AtomicBool::new(true));
    let keep_running_clone = keep_running.clone();

    let thread = thread::Builder::new()
        .name("dugout-main".into())
        .spawn(move || {
            run_server(listener, CommandRouter::new(audit), keep_running_clone);
        })?;

    info!(%addr, "scorekeeper listening");
    Ok((
        ServerHandle {
            keep_running,
            thread: Some(thread),
        },
        addr,
    ))
}

/// State owned by the main thread.
struct Hub {
    router: CommandRouter,
    registry: SessionRegistry,
    /// Socket handles used only to shut sessions down.
    connections: BTreeMap<SessionId, TcpStream>,
    tx: Sender<InternalEvent>,
    keep_running: Arc<AtomicBool>,
}

/// Main server loop. Runs until `keep_running` is set to false.
fn run_server(listener: TcpListener, router: CommandRouter, keep_running: Arc<AtomicBool>) {
    let (tx, rx): (Sender<InternalEvent>, Receiver<InternalEvent>) = mpsc::channel();

    // Listener thread: accepts new connections.
    let keep_running_listener = keep_running.clone();
    let tx_listener = tx.clone();
    thread::spawn(move || {
        while keep_running_listener.load(Ordering::SeqCst) {
            match listener.accept() {
                Ok((stream, peer)) => {
                    stream.set_nonblocking(false).ok();
                    let _ = tx_listener.send(InternalEvent::NewConnection { stream, peer });
                }
                Err(ref e) if e.kind() == ErrorKind::WouldBlock => {
                    thread::sleep(POLL_INTERVAL);
                }
                Err(e) => {
                    let delay = accept_retry_delay(e.kind());
                    if delay.is_zero() {
                        debug!(error = %e, "accept aborted");
                    } else {
                        warn!(error = %e, "accept failed; retrying");
                        thread::sleep(delay);
                    }
                }
            }
        }
    });

    let mut hub = Hub {
        router,
        registry: SessionRegistry::new(),
        connections: BTreeMap::new(),
        tx,
        keep_running: keep_running.clone(),
    };

    while keep_running.load(Ordering::SeqCst) {
        match rx.recv_timeout(POLL_INTERVAL) {
            Ok(event) => {
                hub.handle_event(event);
                // Drain any additional events that arrived during handling.
                while let Ok(event) = rx.try_recv() {
                    hub.handle_event(event);
                }
            }
            Err(RecvTimeoutError::Timeout) => {}
            Err(RecvTimeoutError::Disconnected) => break,
        }
    }

    hub.shutdown_all();
    info!("scorekeeper stopped");
}

impl Hub {
    fn handle_event(&mut self, event: InternalEvent) {
        match event {
            InternalEvent::NewConnection { stream, peer } => {
                self.handle_new_connection(stream, peer);
            }
            InternalEvent::Inbound {
                session_id,
                decoded,
            } => {
                let deliveries = self.router.route(decoded);
                self.deliver(session_id, deliveries);
            }
            InternalEvent::Disconnected { session_id } => {
                if self.drop_session(session_id) {
                    info!(session = %session_id, remaining = self.registry.len(), "session left");
                }
            }
        }
    }

    /// Register a new session, greet it with the current STATE, and spawn
    /// its reader thread.
    fn handle_new_connection(&mut self, stream: TcpStream, peer: SocketAddr) {
        let (write_stream, read_stream) = match (stream.try_clone(), stream.try_clone()) {
            (Ok(w), Ok(r)) => (w, r),
            (Err(e), _) | (_, Err(e)) => {
                warn!(%peer, error = %e, "could not clone session stream");
                return;
            }
        };

        let session_id = match self
            .registry
            .register(peer.to_string(), BufWriter::new(write_stream))
        {
            Ok(id) => id,
            Err(e) => {
                warn!(%peer, error = %e, "could not start session writer");
                let _ = stream.shutdown(Shutdown::Both);
                return;
            }
        };
        self.connections.insert(session_id, stream);
        info!(session = %session_id, %peer, sessions = self.registry.len(), "session joined");

        let greeting = self.router.greeting();
        self.deliver(session_id, vec![Delivery::Reply(greeting)]);
        if !self.registry.contains(session_id) {
            return;
        }

        let tx_reader = self.tx.clone();
        let keep_running_reader = self.keep_running.clone();
        thread::spawn(move || {
            reader_loop(
                BufReader::new(read_stream),
                session_id,
                tx_reader,
                keep_running_reader,
            );
        });
    }

    /// Perform the router's deliveries in order.
    fn deliver(&mut self, sender: SessionId, deliveries: Vec<Delivery>) {
        for delivery in deliveries {
            match delivery {
                Delivery::Reply(msg) => {
                    if let Err(e) = self.registry.send_to(sender, &msg) {
                        warn!(session = %sender, error = %e, "reply failed");
                        self.drop_session(sender);
                    }
                }
                Delivery::Broadcast(msg) => {
                    let report = self.registry.broadcast(&msg);
                    for (id, e) in report.failures() {
                        warn!(session = %id, error = %e, "broadcast delivery failed");
                    }
                    for id in report.failed_ids() {
                        self.drop_session(id);
                    }
                    debug!(
                        delivered = report.delivered(),
                        attempted = report.attempted(),
                        "broadcast sent"
                    );
                }
            }
        }
    }

    /// Unregister a session and close its socket. Returns false if it was
    /// already gone.
    fn drop_session(&mut self, id: SessionId) -> bool {
        if let Some(stream) = self.connections.remove(&id) {
            let _ = stream.shutdown(Shutdown::Both);
        }
        self.registry.unregister(id)
    }

    fn shutdown_all(&mut self) {
        for id in self.registry.ids() {
            self.drop_session(id);
        }
    }
}

/// How long the listener waits before accepting again after an error.
/// Failures tied to one incoming connection are retried immediately.
fn accept_retry_delay(kind: ErrorKind) -> Duration {
    match kind {
        ErrorKind::ConnectionAborted | ErrorKind::ConnectionReset | ErrorKind::Interrupted => {
            Duration::ZERO
        }
        _ => POLL_INTERVAL,
    }
}

/// Reader loop for a single session. Runs in its own thread.
fn reader_loop(
    mut reader: BufReader<TcpStream>,
    session_id: SessionId,
    tx: Sender<InternalEvent>,
    keep_running: Arc<AtomicBool>,
) {
    while keep_running.load(Ordering::SeqCst) {
        match read_message(&mut reader) {
            Ok(bytes) => {
                let decoded = decode_client_message(&bytes);
                if tx.send(InternalEvent::Inbound { session_id, decoded }).is_err() {
                    break; // Main thread is gone.
                }
            }
            Err(e) => {
                debug!(session = %session_id, error = %e, "session read ended");
                let _ = tx.send(InternalEvent::Disconnected { session_id });
                break;
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn per_connection_accept_errors_retry_at_once() {
        for kind in [
            ErrorKind::ConnectionAborted,
            ErrorKind::ConnectionReset,
            ErrorKind::Interrupted,
        ] {
            assert_eq!(accept_retry_delay(kind), Duration::ZERO, "{kind:?}");
        }
    }

    #[test]
    fn other_accept_errors_back_off_and_retry() {
        for kind in [ErrorKind::Other, ErrorKind::OutOfMemory, ErrorKind::PermissionDenied] {
            assert_eq!(accept_retry_delay(kind), POLL_INTERVAL, "{kind:?}");
        }
    }
}
