//! Live result view driven by a single consumer loop.
//!
//! Watch readers and the terminal key reader only ever send [`ViewEvent`]s.
//! The loop owns the container, applies every event in arrival order and
//! hands the resulting table to a [`TableRenderer`].

use std::{
    io::{self, Write},
    sync::{
        Arc, Mutex, PoisonError, RwLock,
        atomic::{AtomicBool, Ordering},
    },
};

use console::Term;
use tokio::{
    sync::{
        mpsc::{Receiver, Sender, channel},
        watch,
    },
    task::JoinHandle,
};
use tracing::{debug, error, trace, warn};

use crate::{
    change::ChangeMsg,
    columns::{Columns, TableView},
    container::ResultContainer,
    prelude::*,
    terminal::{TerminalTable, spawn_key_reader},
};

/// Capacity of the view queue.
pub const QUEUE_CAPACITY: usize = 10;

/// Messages consumed by the view loop.
#[derive(Debug, Clone, PartialEq)]
pub enum ViewEvent {
    /// A decoded change batch.
    Change(ChangeMsg),
    /// Move the selected row.
    Scroll(Scroll),
    /// The user asked to leave the view.
    Quit,
    /// The owner closed the view.
    Close,
}

/// Row selection movement.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Scroll {
    By(i32),
    Top,
    Bottom,
}

/// Counters shown next to the table.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ViewStatus {
    /// Change batches applied so far.
    pub batches: usize,
    /// Items skipped because they could not be applied.
    pub rejected: usize,
    /// Index of the selected row.
    pub selected: usize,
}

/// Sink for the rendered table.
pub trait TableRenderer: Send {
    fn draw(&mut self, view: &TableView, status: &ViewStatus) -> io::Result<()>;

    /// Called once when the loop exits.
    fn finish(&mut self, _view: &TableView, _status: &ViewStatus) -> io::Result<()> {
        Ok(())
    }
}

/// Prints every table state as aligned text.
pub struct PlainTable {
    writer: Box<dyn Write + Send>,
}

impl PlainTable {
    pub fn stdout() -> Self {
        Self::with_writer(io::stdout())
    }

    pub fn with_writer(writer: impl Write + Send + 'static) -> Self {
        Self {
            writer: Box::new(writer),
        }
    }
}

impl TableRenderer for PlainTable {
    fn draw(&mut self, view: &TableView, _status: &ViewStatus) -> io::Result<()> {
        if view.columns.is_empty() {
            return Ok(());
        }
        let widths = view.widths();
        let line = |cells: &[String]| {
            cells
                .iter()
                .zip(&widths)
                .map(|(cell, width)| format!("{cell:<width$}"))
                .collect::<Vec<_>>()
                .join("  ")
                .trim_end()
                .to_string()
        };

        writeln!(self.writer, "{}", line(&view.columns))?;
        for row in &view.rows {
            writeln!(self.writer, "{}", line(row))?;
        }
        writeln!(self.writer)?;
        self.writer.flush()
    }
}

/// Renders nothing.
#[derive(Debug, Default)]
pub struct NullTable;

impl TableRenderer for NullTable {
    fn draw(&mut self, _view: &TableView, _status: &ViewStatus) -> io::Result<()> {
        Ok(())
    }
}

/// Handle to a live result view.
///
/// Cloning is cheap; every clone feeds the same loop.
#[derive(Clone)]
pub struct QueryResults {
    shared: Arc<Shared>,
}

struct Shared {
    tx: Sender<ViewEvent>,
    view: Arc<RwLock<(TableView, ViewStatus)>>,
    closed: AtomicBool,
    ended: watch::Receiver<bool>,
    handle: Mutex<Option<JoinHandle<Result<()>>>>,
}

/// The single consumer of a view queue.
pub struct QueryResultsLoop {
    rx: Receiver<ViewEvent>,
    view: Arc<RwLock<(TableView, ViewStatus)>>,
    renderer: Box<dyn TableRenderer>,
    ended: watch::Sender<bool>,
    key_reader: Option<JoinHandle<()>>,
    shared: Arc<Shared>,
}

impl QueryResults {
    /// View on the process standard output.
    ///
    /// Takes over the terminal with a scrollable table when stdout is a
    /// terminal, prints each table state otherwise.
    pub fn for_stdout() -> Result<Self> {
        if !Term::stdout().is_term() {
            return Ok(Self::interactive(PlainTable::stdout()));
        }
        let (results, mut view_loop) = Self::queued(TerminalTable::stdout()?);
        view_loop.key_reader = Some(spawn_key_reader(results.shared.tx.clone()));
        view_loop.spawn();
        Ok(results)
    }

    /// View with its loop already running.
    pub fn interactive(renderer: impl TableRenderer + 'static) -> Self {
        let (results, view_loop) = Self::queued(renderer);
        view_loop.spawn();
        results
    }

    /// View whose loop is not started yet.
    pub fn queued(renderer: impl TableRenderer + 'static) -> (Self, QueryResultsLoop) {
        let (tx, rx) = channel(QUEUE_CAPACITY);
        let (ended_tx, ended_rx) = watch::channel(false);
        let view = Arc::new(RwLock::new((TableView::default(), ViewStatus::default())));
        let shared = Arc::new(Shared {
            tx,
            view: view.clone(),
            closed: AtomicBool::new(false),
            ended: ended_rx,
            handle: Mutex::new(None),
        });
        let view_loop = QueryResultsLoop {
            rx,
            view,
            renderer: Box::new(renderer),
            ended: ended_tx,
            key_reader: None,
            shared: shared.clone(),
        };
        (Self { shared }, view_loop)
    }

    /// Queue a change batch.
    pub async fn change(&self, change: ChangeMsg) {
        self.send(ViewEvent::Change(change)).await
    }

    /// Queue a selection move.
    pub async fn scroll(&self, scroll: Scroll) {
        self.send(ViewEvent::Scroll(scroll)).await
    }

    /// Sender feeding this view, for readers running on their own task.
    pub fn sender(&self) -> Sender<ViewEvent> {
        self.shared.tx.clone()
    }

    async fn send(&self, event: ViewEvent) {
        if let Err(err) = self.shared.tx.send(event).await {
            trace!("Result view loop is gone, dropping {:?}", err.0);
        }
    }

    /// Resolves once the view loop has exited, for whatever reason.
    pub async fn closed(&self) {
        let mut ended = self.shared.ended.clone();
        let _ = ended.wait_for(|ended| *ended).await;
    }

    /// True once the view loop has exited.
    pub fn is_closed(&self) -> bool {
        *self.shared.ended.borrow()
    }

    /// Stop the view loop and wait for it.
    ///
    /// The first call returns the error that stopped the loop, if any. Later
    /// calls wait for the same exit and return `Ok(())`.
    pub async fn close(&self) -> Result<()> {
        if self.shared.closed.swap(true, Ordering::AcqRel) {
            self.closed().await;
            return Ok(());
        }
        self.send(ViewEvent::Close).await;

        let handle = self
            .shared
            .handle
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .take();
        match handle {
            Some(handle) => handle
                .await
                .map_err(|err| Error::LoopAborted(err.to_string()))?,
            None => {
                debug!("Result view closed before its loop was started");
                Ok(())
            }
        }
    }

    /// Copy of the table as last rendered.
    pub fn snapshot(&self) -> TableView {
        self.read().0.clone()
    }

    pub fn status(&self) -> ViewStatus {
        self.read().1
    }

    fn read(&self) -> std::sync::RwLockReadGuard<'_, (TableView, ViewStatus)> {
        self.shared
            .view
            .read()
            .unwrap_or_else(PoisonError::into_inner)
    }
}

impl QueryResultsLoop {
    /// Start consuming the queue on the tokio runtime.
    pub fn spawn(self) {
        let shared = self.shared.clone();
        let handle = tokio::spawn(self.run());
        *shared.handle.lock().unwrap_or_else(PoisonError::into_inner) = Some(handle);
    }

    async fn run(self) -> Result<()> {
        let Self {
            mut rx,
            view,
            mut renderer,
            ended,
            key_reader,
            shared,
        } = self;
        drop(shared);

        let mut container = ResultContainer::new();
        let mut columns = Columns::new();
        let mut status = ViewStatus::default();
        let mut table = TableView::default();

        let outcome = async {
            renderer.draw(&table, &status)?;
            while let Some(event) = rx.recv().await {
                match event {
                    ViewEvent::Close => break,
                    ViewEvent::Quit => {
                        debug!("Result view quit by user");
                        break;
                    }
                    ViewEvent::Change(change) => {
                        let errors = container.apply(change);
                        if !errors.is_empty() {
                            warn!("Rejected {} result changes", errors.len());
                        }
                        status.batches += 1;
                        status.rejected += errors.len();
                        table = TableView::build(&container, &mut columns);
                        status.selected = status.selected.min(table.rows.len().saturating_sub(1));
                    }
                    ViewEvent::Scroll(scroll) => {
                        let last = table.rows.len().saturating_sub(1);
                        status.selected = match scroll {
                            Scroll::Top => 0,
                            Scroll::Bottom => last,
                            Scroll::By(delta) => status
                                .selected
                                .saturating_add_signed(delta as isize)
                                .min(last),
                        };
                    }
                }
                *view.write().unwrap_or_else(PoisonError::into_inner) =
                    (table.clone(), status);
                renderer.draw(&table, &status)?;
            }
            Ok::<(), Error>(())
        }
        .await;

        rx.close();
        if let Some(key_reader) = key_reader {
            key_reader.abort();
        }
        let finished = renderer.finish(&table, &status);
        let _ = ended.send(true);

        if let Err(err) = &outcome {
            error!("Result view stopped - {err}");
        }
        outcome?;
        Ok(finished?)
    }
}
