// Write-behind audit trail.
//
// The router hands every notable outbound message (play outcomes, the state
// that follows them, resets, manual corrections) to an `AuditSink`. Recording
// is fire-and-forget: `record` never blocks on disk and never reports failure
// to the caller. The audit trail is a record for humans, not a source of truth;
// the server never reads it back.
//
// Sinks:
// - `NullAudit`:  discards everything (default when no log path is set).
// - `JsonlAudit`: appends `{"timestamp": ..., "data": <message>}` lines to a
//                 file from a background writer thread fed over an `mpsc`
//                 channel. Dropping it closes the channel and waits for the
//                 writer to drain.

use std::fs::{File, OpenOptions};
use std::io::{self, BufWriter, Write};
use std::path::Path;
use std::sync::mpsc::{self, Receiver, Sender};
use std::thread::{self, JoinHandle};

use chrono::{DateTime, Local};
use dugout_protocol::ServerMessage;
use serde::Serialize;
use tracing::warn;

/// Destination for audit records.
pub trait AuditSink: Send {
    fn record(&self, event: &ServerMessage);
}

/// Discards every record.
#[derive(Debug, Default)]
pub struct NullAudit;

impl AuditSink for NullAudit {
    fn record(&self, _event: &ServerMessage) {}
}

#[derive(Serialize)]
struct AuditLine {
    timestamp: DateTime<Local>,
    data: ServerMessage,
}

/// Appends JSON lines to a file on a background thread.
pub struct JsonlAudit {
    tx: Option<Sender<AuditLine>>,
    writer: Option<JoinHandle<()>>,
}

impl JsonlAudit {
    /// Open (or create) `path` for appending and start the writer thread.
    pub fn open(path: impl AsRef<Path>) -> io::Result<Self> {
        let file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(path.as_ref())?;
        let (tx, rx) = mpsc::channel();
        let writer = thread::Builder::new()
            .name("dugout-audit".into())
            .spawn(move || write_loop(BufWriter::new(file), rx))?;
        Ok(Self {
            tx: Some(tx),
            writer: Some(writer),
        })
    }
}

impl AuditSink for JsonlAudit {
    fn record(&self, event: &ServerMessage) {
        let line = AuditLine {
            timestamp: Local::now(),
            data: event.clone(),
        };
        let Some(tx) = &self.tx else {
            return;
        };
        if tx.send(line).is_err() {
            warn!("audit writer has stopped; record dropped");
        }
    }
}

impl Drop for JsonlAudit {
    fn drop(&mut self) {
        // Closing the channel ends the writer loop once it has drained.
        self.tx.take();
        if let Some(writer) = self.writer.take() {
            let _ = writer.join();
        }
    }
}

fn write_loop(mut out: BufWriter<File>, rx: Receiver<AuditLine>) {
    for line in rx {
        let written = serde_json::to_writer(&mut out, &line)
            .map_err(io::Error::from)
            .and_then(|()| out.write_all(b"\n"))
            .and_then(|()| out.flush());
        if let Err(e) = written {
            warn!(error = %e, "failed to append audit record");
        }
    }
}
