//! Sinks for the output lines of a supervised process.
use std::sync::Mutex;

use tracing::{info, warn};

/// Receives a supervised process's output one line at a time.
///
/// Each method is called from the reader thread of its stream, in the order
/// the lines were written. No ordering holds between the two streams.
pub trait OutputTracer: Send + Sync {
    fn trace_stdout(&self, line: &str);

    fn trace_stderr(&self, line: &str);
}

/// Forwards lines to `tracing`: stdout at `info`, stderr at `warn`.
#[derive(Debug, Clone, Default)]
pub struct TracingOutputTracer {
    prefix: String,
}

impl TracingOutputTracer {
    pub fn new(prefix: impl Into<String>) -> Self {
        Self {
            prefix: prefix.into(),
        }
    }

    /// Labels lines with the unqualified class name, e.g. `Kafka: ` for `kafka.Kafka`.
    pub fn for_entry_point(entry_point: &str) -> Self {
        let simple_name = entry_point.rsplit('.').next().unwrap_or(entry_point);
        Self::new(format!("{simple_name}: "))
    }

    pub fn prefix(&self) -> &str {
        &self.prefix
    }
}

impl OutputTracer for TracingOutputTracer {
    fn trace_stdout(&self, line: &str) {
        info!("{}{}", self.prefix, line);
    }

    fn trace_stderr(&self, line: &str) {
        warn!("{}{}", self.prefix, line);
    }
}

/// Everything a process has written so far.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ProcessOutput {
    pub standard_output: String,
    pub standard_error: String,
}

/// Accumulates output in memory. Each line is stored followed by `\n`.
#[derive(Debug, Default)]
pub struct BufferedOutputTracer {
    stdout: Mutex<String>,
    stderr: Mutex<String>,
}

impl BufferedOutputTracer {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn output_so_far(&self) -> ProcessOutput {
        ProcessOutput {
            standard_output: lock(&self.stdout).clone(),
            standard_error: lock(&self.stderr).clone(),
        }
    }
}

impl OutputTracer for BufferedOutputTracer {
    fn trace_stdout(&self, line: &str) {
        let mut buffer = lock(&self.stdout);
        buffer.push_str(line);
        buffer.push('\n');
    }

    fn trace_stderr(&self, line: &str) {
        let mut buffer = lock(&self.stderr);
        buffer.push_str(line);
        buffer.push('\n');
    }
}

fn lock(buffer: &Mutex<String>) -> std::sync::MutexGuard<'_, String> {
    buffer.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}
