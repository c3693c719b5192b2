//! Full screen result table.

use std::io::{self, Stdout};

use crossterm::{
    ExecutableCommand,
    event::{Event, EventStream, KeyCode, KeyEvent, KeyEventKind, KeyModifiers},
    terminal::{EnterAlternateScreen, LeaveAlternateScreen, disable_raw_mode, enable_raw_mode},
};
use futures_util::StreamExt;
use ratatui::{
    Frame, Terminal,
    backend::{Backend, CrosstermBackend},
    layout::{Constraint, Layout},
    style::{Color, Modifier, Style},
    text::Line,
    widgets::{Block, Borders, Row, Table, TableState},
};
use tokio::{sync::mpsc::Sender, task::JoinHandle};
use tracing::{debug, trace};

use crate::{
    columns::TableView,
    view::{Scroll, TableRenderer, ViewEvent, ViewStatus},
};

const COLUMN_WIDTH: u16 = 20;
const PAGE: i32 = 10;
const HELP: &str = "↑/↓ scroll  PgUp/PgDn page  Home/End jump  q quit";

/// Scrollable table drawn with ratatui.
pub struct TerminalTable<B: Backend> {
    terminal: Terminal<B>,
    title: String,
    owns_screen: bool,
}

impl TerminalTable<CrosstermBackend<Stdout>> {
    /// Switch stdout to raw mode on the alternate screen.
    ///
    /// The screen is restored by [`TableRenderer::finish`] or on drop.
    pub fn stdout() -> io::Result<Self> {
        enable_raw_mode()?;
        let mut stdout = io::stdout();
        if let Err(err) = stdout.execute(EnterAlternateScreen) {
            let _ = disable_raw_mode();
            return Err(err);
        }
        let mut terminal = Terminal::new(CrosstermBackend::new(stdout))?;
        terminal.clear()?;
        Ok(Self {
            terminal,
            title: "Results".to_string(),
            owns_screen: true,
        })
    }
}

impl<B: Backend> TerminalTable<B> {
    /// Table on an already prepared terminal.
    pub fn new(terminal: Terminal<B>) -> Self {
        Self {
            terminal,
            title: "Results".to_string(),
            owns_screen: false,
        }
    }

    pub fn with_title(mut self, title: impl Into<String>) -> Self {
        self.title = title.into();
        self
    }

    pub fn terminal(&self) -> &Terminal<B> {
        &self.terminal
    }

    fn restore(&mut self) -> io::Result<()> {
        if !self.owns_screen {
            return Ok(());
        }
        self.owns_screen = false;
        disable_raw_mode()?;
        io::stdout().execute(LeaveAlternateScreen)?;
        Ok(())
    }
}

impl<B: Backend + Send> TableRenderer for TerminalTable<B> {
    fn draw(&mut self, view: &TableView, status: &ViewStatus) -> io::Result<()> {
        let title = self.title.clone();
        self.terminal
            .draw(|frame| render(frame, &title, view, status))?;
        Ok(())
    }

    fn finish(&mut self, _view: &TableView, _status: &ViewStatus) -> io::Result<()> {
        self.restore()
    }
}

impl<B: Backend> Drop for TerminalTable<B> {
    fn drop(&mut self) {
        let _ = self.restore();
    }
}

fn render(frame: &mut Frame<'_>, title: &str, view: &TableView, status: &ViewStatus) {
    let [body, help] = Layout::vertical([Constraint::Min(3), Constraint::Length(1)]).areas(frame.area());

    let header = Row::new(view.columns.clone()).style(Style::default().add_modifier(Modifier::BOLD));
    let rows = view.rows.iter().map(|row| Row::new(row.clone()));
    let widths = view
        .columns
        .iter()
        .map(|_| Constraint::Length(COLUMN_WIDTH));

    let mut block_title = format!("{title} ({} rows)", view.rows.len());
    if status.rejected > 0 {
        block_title.push_str(&format!(" {} rejected", status.rejected));
    }

    let table = Table::new(rows, widths)
        .header(header)
        .block(
            Block::default()
                .borders(Borders::ALL)
                .border_style(Style::default().fg(Color::Indexed(240)))
                .title(block_title),
        )
        .row_highlight_style(Style::default().add_modifier(Modifier::REVERSED));

    let mut state = TableState::default();
    if !view.rows.is_empty() {
        state.select(Some(status.selected));
    }
    frame.render_stateful_widget(table, body, &mut state);
    frame.render_widget(
        Line::styled(HELP, Style::default().fg(Color::Indexed(240))),
        help,
    );
}

/// Map a key press to a view event.
pub fn key_event(key: KeyEvent) -> Option<ViewEvent> {
    if key.kind != KeyEventKind::Press {
        return None;
    }
    let event = match key.code {
        KeyCode::Char('q') | KeyCode::Esc => ViewEvent::Quit,
        KeyCode::Char('c') if key.modifiers.contains(KeyModifiers::CONTROL) => ViewEvent::Quit,
        KeyCode::Up | KeyCode::Char('k') => ViewEvent::Scroll(Scroll::By(-1)),
        KeyCode::Down | KeyCode::Char('j') => ViewEvent::Scroll(Scroll::By(1)),
        KeyCode::PageUp => ViewEvent::Scroll(Scroll::By(-PAGE)),
        KeyCode::PageDown => ViewEvent::Scroll(Scroll::By(PAGE)),
        KeyCode::Home => ViewEvent::Scroll(Scroll::Top),
        KeyCode::End => ViewEvent::Scroll(Scroll::Bottom),
        _ => return None,
    };
    Some(event)
}

/// Read terminal keys and forward them to the view queue.
pub fn spawn_key_reader(tx: Sender<ViewEvent>) -> JoinHandle<()> {
    tokio::spawn(async move {
        let mut events = EventStream::new();
        while let Some(event) = events.next().await {
            let key = match event {
                Ok(Event::Key(key)) => key,
                Ok(_) => continue,
                Err(err) => {
                    debug!("Terminal event stream failed - {err}");
                    break;
                }
            };
            let Some(event) = key_event(key) else {
                continue;
            };
            trace!("Key {:?} -> {:?}", key.code, event);
            let quit = event == ViewEvent::Quit;
            if tx.send(event).await.is_err() || quit {
                break;
            }
        }
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use ratatui::backend::TestBackend;

    fn press(code: KeyCode) -> KeyEvent {
        KeyEvent::new(code, KeyModifiers::NONE)
    }

    #[test]
    fn keys_map_to_events() {
        assert_eq!(key_event(press(KeyCode::Char('q'))), Some(ViewEvent::Quit));
        assert_eq!(
            key_event(KeyEvent::new(KeyCode::Char('c'), KeyModifiers::CONTROL)),
            Some(ViewEvent::Quit)
        );
        assert_eq!(
            key_event(press(KeyCode::Down)),
            Some(ViewEvent::Scroll(Scroll::By(1)))
        );
        assert_eq!(
            key_event(press(KeyCode::PageUp)),
            Some(ViewEvent::Scroll(Scroll::By(-PAGE)))
        );
        assert_eq!(
            key_event(press(KeyCode::End)),
            Some(ViewEvent::Scroll(Scroll::Bottom))
        );
        assert_eq!(key_event(press(KeyCode::Char('x'))), None);
    }

    #[test]
    fn draws_header_rows_and_help() {
        let terminal = Terminal::new(TestBackend::new(60, 8)).unwrap();
        let mut table = TerminalTable::new(terminal).with_title("people");
        let view = TableView {
            columns: vec!["id".to_string(), "name".to_string()],
            rows: vec![
                vec!["1".to_string(), "Alice Smith".to_string()],
                vec!["2".to_string(), "Bob".to_string()],
            ],
        };
        table.draw(&view, &ViewStatus::default()).unwrap();

        let buffer = table.terminal().backend().buffer().clone();
        let text: String = buffer
            .content()
            .iter()
            .map(|cell| cell.symbol())
            .collect();
        assert!(text.contains("people (2 rows)"));
        assert!(text.contains("Alice Smith"));
        assert!(text.contains("Bob"));
        assert!(text.contains("q quit"));
    }
}
