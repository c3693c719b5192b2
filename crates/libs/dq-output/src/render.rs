//! Drawing the task tree.

use std::{io, time::Duration};

use console::{Term, style};

use crate::task::{TaskStatus, TaskTree};

/// Spinner animation frames for busy tasks.
pub const SPINNER_FRAMES: [&str; 4] = ["∙∙∙", "●∙∙", "∙●∙", "∙∙●"];

/// Time between two spinner frames.
pub const SPINNER_INTERVAL: Duration = Duration::from_millis(1000 / 7);

/// Glyph styling.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Theme {
    styled: bool,
}

impl Theme {
    /// Coloured glyphs.
    pub fn styled() -> Self {
        Self { styled: true }
    }

    /// Bare glyphs, no escape sequences.
    pub fn plain() -> Self {
        Self { styled: false }
    }

    /// Glyph shown in front of a task message.
    pub fn glyph(&self, status: TaskStatus, frame: usize) -> String {
        let glyph = match status {
            TaskStatus::Busy => SPINNER_FRAMES[frame % SPINNER_FRAMES.len()],
            TaskStatus::Succeeded => "✓",
            TaskStatus::Failed | TaskStatus::Error => "✗",
            TaskStatus::Info => "ℹ",
        };
        if !self.styled {
            return glyph.to_string();
        }
        match status {
            TaskStatus::Busy => style(glyph).color256(69).to_string(),
            TaskStatus::Succeeded => style(glyph).green().to_string(),
            TaskStatus::Failed | TaskStatus::Error => style(glyph).red().to_string(),
            TaskStatus::Info => style(glyph).color256(152).to_string(),
        }
    }
}

/// Sink for the rendered task tree.
///
/// Only the render loop calls into a renderer, always with the latest state.
pub trait TaskRenderer: Send {
    /// Redraw after the tree changed.
    fn draw(&mut self, tree: &TaskTree) -> io::Result<()>;

    /// Final draw before the render loop exits.
    fn finish(&mut self, tree: &TaskTree) -> io::Result<()> {
        self.draw(tree)
    }
}

/// Redraws the tree in place on a terminal.
pub struct TermRenderer {
    term: Term,
    theme: Theme,
    lines: usize,
}

impl TermRenderer {
    pub fn stdout() -> Self {
        Self::new(Term::stdout(), Theme::styled())
    }

    pub fn new(term: Term, theme: Theme) -> Self {
        Self {
            term,
            theme,
            lines: 0,
        }
    }
}

impl TaskRenderer for TermRenderer {
    fn draw(&mut self, tree: &TaskTree) -> io::Result<()> {
        let view = tree.render(&self.theme);
        if self.lines > 0 {
            self.term.clear_last_lines(self.lines)?;
        }
        self.term.write_str(&view)?;
        self.term.flush()?;
        self.lines = view.lines().count();
        Ok(())
    }
}

/// Draws nothing. The state stays available through
/// [`TaskOutput::snapshot`](crate::TaskOutput::snapshot).
#[derive(Debug, Default)]
pub struct NullRenderer;

impl TaskRenderer for NullRenderer {
    fn draw(&mut self, _tree: &TaskTree) -> io::Result<()> {
        Ok(())
    }
}
