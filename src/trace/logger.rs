use std::{
    fs::{File, OpenOptions},
    io::{self, Write},
    path::Path,
    sync::Mutex,
};

use tracing::warn;

use crate::trace::trace::HealTraceEvent;

/// Appends heal/learn events to a JSONL file.
///
/// Write failures are logged and dropped; auditing never fails a heal.
pub struct TraceLogger {
    file: Mutex<File>,
}

impl TraceLogger {
    pub fn open(path: impl AsRef<Path>) -> io::Result<Self> {
        let file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(path.as_ref())?;

        Ok(Self {
            file: Mutex::new(file),
        })
    }

    pub fn record(&self, event: &HealTraceEvent) {
        let json = match serde_json::to_string(event) {
            Ok(j) => j,
            Err(e) => {
                warn!(error = %e, "Failed to serialize trace event");
                return;
            }
        };

        let mut file = match self.file.lock() {
            Ok(f) => f,
            Err(e) => {
                warn!(error = %e, "Trace logger lock poisoned");
                return;
            }
        };

        if let Err(e) = writeln!(file, "{}", json) {
            warn!(error = %e, "Failed to write trace event");
        }
    }
}
