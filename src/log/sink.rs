use super::record::{LogLevel, LogRecord};

use std::fs::{File, OpenOptions};
use std::io::{self, BufWriter, Write};
use std::path::Path;

const RED: &str = "\x1b[1;31m";
const BLUE: &str = "\x1b[1;34m";
const CYAN: &str = "\x1b[1;36m";
const RESET: &str = "\x1b[0m";

/// Destination of drained log records.
///
/// A sink is only ever driven by one drain at a time.
pub trait LogSink: Send + 'static {
    fn write(&mut self, record: &LogRecord) -> io::Result<()>;

    fn flush(&mut self) -> io::Result<()>;
}

impl<S: LogSink + ?Sized> LogSink for Box<S> {
    fn write(&mut self, record: &LogRecord) -> io::Result<()> {
        (**self).write(record)
    }

    fn flush(&mut self) -> io::Result<()> {
        (**self).flush()
    }
}

/// Writes colourised records to standard error.
#[derive(Debug, Default)]
pub struct ConsoleSink;

impl ConsoleSink {
    pub fn new() -> Self {
        Self
    }

    fn color(level: LogLevel) -> &'static str {
        match level {
            LogLevel::Prod | LogLevel::Warning | LogLevel::Error => RED,
            LogLevel::Debug => BLUE,
            LogLevel::Trace => CYAN,
        }
    }
}

impl LogSink for ConsoleSink {
    fn write(&mut self, record: &LogRecord) -> io::Result<()> {
        let color = Self::color(record.level);
        writeln!(io::stderr().lock(), "{color}{record}{RESET}")
    }

    fn flush(&mut self) -> io::Result<()> {
        io::stderr().flush()
    }
}

/// Writes plain records, one per line, to any [`Write`] implementation.
pub struct WriterSink<W> {
    writer: W,
}

impl<W: Write + Send + 'static> WriterSink<W> {
    pub fn new(writer: W) -> Self {
        Self { writer }
    }

    /// Returns the wrapped writer.
    pub fn into_inner(self) -> W {
        self.writer
    }
}

impl WriterSink<BufWriter<File>> {
    /// Opens `path` for appending, creating it if needed.
    pub fn append(path: impl AsRef<Path>) -> io::Result<Self> {
        let file = OpenOptions::new().create(true).append(true).open(path)?;
        Ok(Self::new(BufWriter::new(file)))
    }
}

impl<W: Write + Send + 'static> LogSink for WriterSink<W> {
    fn write(&mut self, record: &LogRecord) -> io::Result<()> {
        writeln!(self.writer, "{record}")
    }

    fn flush(&mut self) -> io::Result<()> {
        self.writer.flush()
    }
}
