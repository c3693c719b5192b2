//! Scoped progress handles and the render loop behind them.

use std::sync::{
    Arc, Mutex, PoisonError, RwLock,
    atomic::{AtomicBool, Ordering},
};

use console::Term;
use tokio::{
    sync::{
        mpsc::{Receiver, Sender, channel},
        watch,
    },
    task::JoinHandle,
    time::{MissedTickBehavior, interval},
};
use tracing::{debug, error, trace};

use crate::{
    event::TaskEvent,
    plain::PlainOutput,
    prelude::*,
    render::{SPINNER_INTERVAL, TaskRenderer, TermRenderer},
    task::{TaskStatus, TaskTree},
};

/// Capacity of the queue shared by every scope of one output.
///
/// Producers wait once this many events are pending.
pub const QUEUE_CAPACITY: usize = 10;

/// Progress reporting handle bound to a scope.
///
/// The root handle reports top level tasks; [`TaskOutput::children`] returns a
/// handle whose tasks are nested under a named task. All handles derived from
/// the same root share one queue and one render loop, so cloning is cheap and
/// every method can be called from any task or thread.
#[derive(Clone)]
pub struct TaskOutput {
    scope: Option<String>,
    depth: usize,
    sink: Sink,
}

#[derive(Clone)]
enum Sink {
    Queue(Arc<Queue>),
    Plain(Arc<PlainOutput>),
}

struct Queue {
    tx: Sender<TaskEvent>,
    tree: Arc<RwLock<TaskTree>>,
    closed: AtomicBool,
    ended: watch::Receiver<bool>,
    handle: Mutex<Option<JoinHandle<Result<()>>>>,
}

/// The single consumer of a task output queue.
///
/// Owns every write to the task tree. Created by [`TaskOutput::queued`] and
/// started with [`TaskOutputLoop::spawn`].
pub struct TaskOutputLoop {
    rx: Receiver<TaskEvent>,
    tree: Arc<RwLock<TaskTree>>,
    renderer: Box<dyn TaskRenderer>,
    ended: watch::Sender<bool>,
    queue: Arc<Queue>,
}

impl TaskOutput {
    /// Output for the process standard output.
    ///
    /// Redraws a live task tree when stdout is a terminal, prints one line
    /// per call otherwise. Must be called inside a tokio runtime.
    pub fn for_stdout() -> Self {
        if Term::stdout().is_term() {
            Self::interactive(TermRenderer::stdout())
        } else {
            Self::plain(PlainOutput::stdout())
        }
    }

    /// Queued output with its render loop already running.
    pub fn interactive(renderer: impl TaskRenderer + 'static) -> Self {
        let (output, render_loop) = Self::queued(renderer);
        render_loop.spawn();
        output
    }

    /// Queued output whose render loop is not started yet.
    ///
    /// Producers block once [`QUEUE_CAPACITY`] events are pending until the
    /// loop is spawned.
    pub fn queued(renderer: impl TaskRenderer + 'static) -> (Self, TaskOutputLoop) {
        let (tx, rx) = channel(QUEUE_CAPACITY);
        let (ended_tx, ended_rx) = watch::channel(false);
        let tree = Arc::new(RwLock::new(TaskTree::new()));
        let queue = Arc::new(Queue {
            tx,
            tree: tree.clone(),
            closed: AtomicBool::new(false),
            ended: ended_rx,
            handle: Mutex::new(None),
        });
        let render_loop = TaskOutputLoop {
            rx,
            tree,
            renderer: Box::new(renderer),
            ended: ended_tx,
            queue: queue.clone(),
        };
        let output = Self {
            scope: None,
            depth: 0,
            sink: Sink::Queue(queue),
        };
        (output, render_loop)
    }

    /// Synchronous line-per-call output.
    pub fn plain(output: PlainOutput) -> Self {
        Self {
            scope: None,
            depth: 0,
            sink: Sink::Plain(Arc::new(output)),
        }
    }

    /// Name of the task this handle nests under, `None` at the root.
    pub fn scope(&self) -> Option<&str> {
        self.scope.as_deref()
    }

    /// Handle whose tasks are nested under `name`.
    pub fn children(&self, name: impl Into<String>) -> Self {
        Self {
            scope: Some(name.into()),
            depth: self.depth + 1,
            sink: self.sink.clone(),
        }
    }

    /// Register a new busy task.
    ///
    /// Names must be unique across the whole output; re-adding a name is
    /// ignored by the render loop.
    pub async fn add_task(&self, name: impl Into<String>, message: impl Into<String>) {
        let (name, message) = (name.into(), message.into());
        match &self.sink {
            Sink::Plain(plain) => plain.line(self.depth, TaskStatus::Busy, &message),
            Sink::Queue(queue) => {
                queue
                    .send(TaskEvent::Added {
                        name,
                        message,
                        parent: self.scope.clone(),
                    })
                    .await
            }
        }
    }

    /// Mark a task as failed and replace its message.
    pub async fn fail_task(&self, name: impl Into<String>, message: impl Into<String>) {
        let (name, message) = (name.into(), message.into());
        match &self.sink {
            Sink::Plain(plain) => plain.line(self.depth, TaskStatus::Failed, &message),
            Sink::Queue(queue) => {
                queue
                    .send(TaskEvent::Failed {
                        name,
                        message,
                        parent: self.scope.clone(),
                    })
                    .await
            }
        }
    }

    /// Mark a task as completed and replace its message.
    pub async fn succeed_task(&self, name: impl Into<String>, message: impl Into<String>) {
        let (name, message) = (name.into(), message.into());
        match &self.sink {
            Sink::Plain(plain) => plain.line(self.depth, TaskStatus::Succeeded, &message),
            Sink::Queue(queue) => {
                queue
                    .send(TaskEvent::Succeeded {
                        name,
                        message,
                        parent: self.scope.clone(),
                    })
                    .await
            }
        }
    }

    /// Turn a busy task into an informational line. Finished tasks keep their outcome.
    pub async fn info_task(&self, name: impl Into<String>, message: impl Into<String>) {
        let (name, message) = (name.into(), message.into());
        match &self.sink {
            Sink::Plain(plain) => plain.line(self.depth, TaskStatus::Info, &message),
            Sink::Queue(queue) => {
                queue
                    .send(TaskEvent::Info {
                        name,
                        message,
                        parent: self.scope.clone(),
                    })
                    .await
            }
        }
    }

    /// Append a free-standing informational line.
    pub async fn info_message(&self, message: impl Into<String>) {
        let message = message.into();
        match &self.sink {
            Sink::Plain(plain) => plain.line(0, TaskStatus::Info, &message),
            Sink::Queue(queue) => {
                queue
                    .send(TaskEvent::InfoMessage {
                        message,
                        parent: self.scope.clone(),
                    })
                    .await
            }
        }
    }

    /// Append a free-standing error line.
    pub async fn error(&self, message: impl Into<String>) {
        let message = message.into();
        match &self.sink {
            Sink::Plain(plain) => plain.line(0, TaskStatus::Error, &message),
            Sink::Queue(queue) => {
                queue
                    .send(TaskEvent::Error {
                        message,
                        parent: self.scope.clone(),
                    })
                    .await
            }
        }
    }

    /// Stop the render loop and wait for it to exit.
    ///
    /// Closing through any scope closes the whole output. The first call
    /// returns the error that stopped the loop, if any; later calls wait for
    /// the same exit and return `Ok(())`.
    pub async fn close(&self) -> Result<()> {
        match &self.sink {
            Sink::Plain(plain) => Ok(plain.flush()?),
            Sink::Queue(queue) => queue.close().await,
        }
    }

    /// Copy of the current task tree, `None` for plain output.
    pub fn snapshot(&self) -> Option<TaskTree> {
        match &self.sink {
            Sink::Plain(_) => None,
            Sink::Queue(queue) => Some(
                queue
                    .tree
                    .read()
                    .unwrap_or_else(PoisonError::into_inner)
                    .clone(),
            ),
        }
    }
}

impl Queue {
    async fn send(&self, event: TaskEvent) {
        if let Err(err) = self.tx.send(event).await {
            trace!("Task output loop is gone, dropping {:?}", err.0);
        }
    }

    async fn close(&self) -> Result<()> {
        if self.closed.swap(true, Ordering::AcqRel) {
            // A loop that was dropped unspawned never reports, the wait ends
            // with its sender.
            let mut ended = self.ended.clone();
            let _ = ended.wait_for(|ended| *ended).await;
            return Ok(());
        }
        self.send(TaskEvent::Close).await;

        let handle = self
            .handle
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .take();
        match handle {
            Some(handle) => handle
                .await
                .map_err(|err| Error::LoopAborted(err.to_string()))?,
            None => {
                debug!("Task output closed before its render loop was started");
                Ok(())
            }
        }
    }
}

impl TaskOutputLoop {
    /// Start consuming the queue on the tokio runtime.
    pub fn spawn(self) {
        let queue = self.queue.clone();
        let handle = tokio::spawn(self.run());
        *queue.handle.lock().unwrap_or_else(PoisonError::into_inner) = Some(handle);
    }

    async fn run(self) -> Result<()> {
        let Self {
            mut rx,
            tree,
            mut renderer,
            ended,
            queue,
        } = self;
        // Holding the queue would keep our own sender alive.
        drop(queue);

        let mut ticker = interval(SPINNER_INTERVAL);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);

        let outcome = async {
            loop {
                tokio::select! {
                    event = rx.recv() => {
                        let Some(event) = event else { break };
                        if event == TaskEvent::Close {
                            break;
                        }
                        trace!("Task output event {:?}", event);
                        tree.write()
                            .unwrap_or_else(PoisonError::into_inner)
                            .apply(event)?;
                    }
                    _ = ticker.tick() => {
                        let moved = tree.write().unwrap_or_else(PoisonError::into_inner).tick();
                        if !moved {
                            continue;
                        }
                    }
                }
                let state = tree.read().unwrap_or_else(PoisonError::into_inner);
                renderer.draw(&state)?;
            }
            Ok::<(), Error>(())
        }
        .await;

        rx.close();
        let finished = {
            let state = tree.read().unwrap_or_else(PoisonError::into_inner);
            renderer.finish(&state)
        };
        let _ = ended.send(true);

        if let Err(err) = &outcome {
            error!("Task output stopped - {err}");
        }
        outcome?;
        Ok(finished?)
    }
}
