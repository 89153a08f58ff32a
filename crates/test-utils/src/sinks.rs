use std::sync::{Arc, Mutex};

use taskunit::exec::{LogSink, StatusSink, StatusUpdate};

/// Collects process output lines in memory.
#[derive(Clone, Default)]
pub struct MemoryLogSink {
    lines: Arc<Mutex<Vec<String>>>,
}

impl MemoryLogSink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn lines(&self) -> Vec<String> {
        self.lines.lock().unwrap().clone()
    }
}

impl LogSink for MemoryLogSink {
    fn log_line(&self, line: &str) {
        self.lines.lock().unwrap().push(line.to_string());
    }
}

/// Records every status update.
#[derive(Clone, Default)]
pub struct RecordingStatusSink {
    updates: Arc<Mutex<Vec<StatusUpdate>>>,
}

impl RecordingStatusSink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn updates(&self) -> Vec<StatusUpdate> {
        self.updates.lock().unwrap().clone()
    }
}

impl StatusSink for RecordingStatusSink {
    fn report(&self, update: &StatusUpdate) {
        self.updates.lock().unwrap().push(update.clone());
    }
}
