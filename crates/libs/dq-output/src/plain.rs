//! Line-per-call output for non-interactive standard output.

use std::{
    io::{self, Write},
    sync::{Mutex, PoisonError},
};

use tracing::warn;

use crate::{render::Theme, task::TaskStatus};

/// Prints every progress call as one line, synchronously.
///
/// Keeps no task state: the line is written as soon as the call is made, so
/// output ordering is the call ordering of the producers.
pub struct PlainOutput {
    writer: Mutex<Box<dyn Write + Send>>,
    theme: Theme,
}

impl PlainOutput {
    pub fn stdout() -> Self {
        Self::with_writer(io::stdout())
    }

    pub fn with_writer(writer: impl Write + Send + 'static) -> Self {
        Self {
            writer: Mutex::new(Box::new(writer)),
            theme: Theme::plain(),
        }
    }

    pub(crate) fn line(&self, depth: usize, status: TaskStatus, message: &str) {
        let glyph = self.theme.glyph(status, 0);
        let mut writer = self.writer.lock().unwrap_or_else(PoisonError::into_inner);
        if let Err(err) = writeln!(writer, "{}{glyph} {message}", "  ".repeat(depth)) {
            warn!("Failed to write task output - {err}");
        }
    }

    pub(crate) fn flush(&self) -> io::Result<()> {
        self.writer
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .flush()
    }
}
