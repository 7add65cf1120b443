//! Diagnostic output on the log console
//!
//! Best effort only: writes are clamped to what one console write accepts
//! and kernel failures are dropped. Nothing that matters for correctness
//! may depend on this output.

use core::fmt::{self, Write};

use l4_sys::{Limits, Transport, BASE_LOG_CAP, VCON_WRITE_SIZE};
use log::{LevelFilter, Log, Metadata, Record, SetLoggerError};

use crate::Shim;

fn write_console<T: Transport>(transport: &T, bytes: &[u8]) {
    if bytes.is_empty() {
        return;
    }
    let len = bytes.len().min(Limits::current().vcon_write_size);
    let _ = transport.vcon_send(BASE_LOG_CAP, &bytes[..len]);
}

impl<T: Transport> Shim<T> {
    /// Write `text` to the log console
    ///
    /// Text longer than [`Limits::vcon_write_size`] bytes is cut off; empty
    /// text writes nothing.
    pub fn puts(&self, text: &str) {
        write_console(&self.transport, text.as_bytes());
    }
}

/// Fixed-size line buffer; whatever does not fit is dropped
struct LineBuffer {
    buf: [u8; VCON_WRITE_SIZE],
    len: usize,
}

impl LineBuffer {
    const fn new() -> Self {
        Self { buf: [0; VCON_WRITE_SIZE], len: 0 }
    }

    fn as_bytes(&self) -> &[u8] {
        &self.buf[..self.len]
    }
}

impl Write for LineBuffer {
    fn write_str(&mut self, s: &str) -> fmt::Result {
        let n = s.len().min(self.buf.len() - self.len);
        self.buf[self.len..self.len + n].copy_from_slice(&s.as_bytes()[..n]);
        self.len += n;
        Ok(())
    }
}

/// `log` backend that prints one console write per record
///
/// # Example
/// ```no_run
/// # fn demo<T: l49_shim::Transport + Send + Sync + 'static>(transport: T) {
/// use l49_shim::ConsoleLogger;
/// use log::LevelFilter;
///
/// let logger: &'static _ = Box::leak(Box::new(ConsoleLogger::new(transport, LevelFilter::Info)));
/// logger.install().ok();
/// log::info!("server up");
/// # }
/// ```
pub struct ConsoleLogger<T> {
    transport: T,
    level: LevelFilter,
}

impl<T> ConsoleLogger<T> {
    pub const fn new(transport: T, level: LevelFilter) -> Self {
        Self { transport, level }
    }

    pub fn level(&self) -> LevelFilter {
        self.level
    }
}

impl<T: Transport + Send + Sync + 'static> ConsoleLogger<T> {
    /// Register as the global logger
    pub fn install(&'static self) -> Result<(), SetLoggerError> {
        log::set_logger(self)?;
        log::set_max_level(self.level);
        Ok(())
    }
}

impl<T: Transport + Send + Sync> Log for ConsoleLogger<T> {
    fn enabled(&self, metadata: &Metadata) -> bool {
        metadata.level() <= self.level
    }

    fn log(&self, record: &Record) {
        if !self.enabled(record.metadata()) {
            return;
        }

        let mut line = LineBuffer::new();
        let _ = writeln!(line, "[{} {}] {}", record.level(), record.target(), record.args());
        write_console(&self.transport, line.as_bytes());
    }

    fn flush(&self) {}
}
