//! Event Logger
//!
//! Append-only JSONL logging of attention lifecycle events.

use bevy_ecs::prelude::*;
use std::fs::{File, OpenOptions};
use std::io::{BufWriter, Write};
use std::path::Path;

use attention_events::{generate_event_id, AttentionEvent, AttentionEventKind};

/// Resource for logging attention events to a JSONL file
#[derive(Resource)]
pub struct EventLog {
    writer: Option<BufWriter<File>>,
    event_count: u64,
    next_event_id: u64,
}

impl EventLog {
    /// Create a new event log writing to the specified path
    pub fn new(path: impl AsRef<Path>) -> std::io::Result<Self> {
        let file = OpenOptions::new()
            .create(true)
            .write(true)
            .truncate(true)
            .open(path)?;

        Ok(Self {
            writer: Some(BufWriter::new(file)),
            event_count: 0,
            next_event_id: 1,
        })
    }

    /// Create a log that discards events (for testing)
    pub fn null() -> Self {
        Self {
            writer: None,
            event_count: 0,
            next_event_id: 1,
        }
    }

    /// Get the current event count
    pub fn event_count(&self) -> u64 {
        self.event_count
    }

    /// Record an event. Logging is best-effort; write failures are
    /// reported through tracing and otherwise ignored.
    pub fn record(&mut self, tick: u64, kind: AttentionEventKind) {
        if let Err(e) = self.try_record(tick, kind) {
            tracing::warn!("failed to write attention event: {}", e);
        }
    }

    fn try_record(&mut self, tick: u64, kind: AttentionEventKind) -> std::io::Result<()> {
        let event = AttentionEvent::new(generate_event_id(self.next_event_id), tick, kind);
        self.next_event_id += 1;
        self.event_count += 1;

        if let Some(ref mut writer) = self.writer {
            let json = serde_json::to_string(&event)?;
            writeln!(writer, "{}", json)?;
        }
        Ok(())
    }

    /// Flush the buffer to disk
    pub fn flush(&mut self) -> std::io::Result<()> {
        if let Some(ref mut writer) = self.writer {
            writer.flush()?;
        }
        Ok(())
    }
}

impl Drop for EventLog {
    fn drop(&mut self) {
        if let Err(e) = self.flush() {
            tracing::warn!("failed to flush event log: {}", e);
        }
    }
}
