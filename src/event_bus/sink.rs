use std::io::{self, Result as IoResult, Stdout, Write};
use std::sync::{Arc, Mutex};

/// Output device consuming rendered event lines.
///
/// `write` may block for backpressure but must not fail under normal
/// operation; the listener logs and keeps going if it does.
pub trait EventSink: Send + Sync {
    fn write(&mut self, line: &str) -> IoResult<()>;
}

/// Writes rendered events to process stdout, flushing per line.
pub struct StdOutSink {
    handle: Stdout,
}

impl Default for StdOutSink {
    fn default() -> Self {
        Self {
            handle: io::stdout(),
        }
    }
}

impl EventSink for StdOutSink {
    fn write(&mut self, line: &str) -> IoResult<()> {
        self.handle.write_all(line.as_bytes())?;
        self.handle.flush()
    }
}

/// Collects rendered lines in memory; for tests and instrumentation.
#[derive(Clone, Default)]
pub struct MemorySink {
    lines: Arc<Mutex<Vec<String>>>,
}

impl MemorySink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn lines(&self) -> Vec<String> {
        self.lines.lock().expect("sink poisoned").clone()
    }

    pub fn len(&self) -> usize {
        self.lines.lock().expect("sink poisoned").len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl EventSink for MemorySink {
    fn write(&mut self, line: &str) -> IoResult<()> {
        self.lines
            .lock()
            .expect("sink poisoned")
            .push(line.to_string());
        Ok(())
    }
}
