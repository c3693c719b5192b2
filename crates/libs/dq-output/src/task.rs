//! The task tree owned by the render loop.

use std::collections::HashMap;

use tracing::warn;

use crate::{event::TaskEvent, prelude::*, render::Theme};

/// Status of a single task line.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TaskStatus {
    /// In progress, rendered with a spinner.
    Busy,
    /// Finished successfully.
    Succeeded,
    /// Finished with a failure.
    Failed,
    /// Informational annotation.
    Info,
    /// Free-standing error line.
    Error,
}

impl TaskStatus {
    /// Whether the task has reached a final outcome. Only `Busy` can change.
    pub fn is_settled(self) -> bool {
        !matches!(self, Self::Busy)
    }
}

/// One unit of progress.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Task {
    status: TaskStatus,
    message: String,
    parent: Option<String>,
    children: Vec<String>,
    frame: usize,
}

impl Task {
    fn new(status: TaskStatus, message: String, parent: Option<String>) -> Self {
        Self {
            status,
            message,
            parent,
            children: Vec::new(),
            frame: 0,
        }
    }
    pub fn status(&self) -> TaskStatus {
        self.status
    }
    pub fn message(&self) -> &str {
        &self.message
    }
    /// Name of the enclosing task, `None` for root level tasks.
    pub fn parent(&self) -> Option<&str> {
        self.parent.as_deref()
    }
    /// Child task names in registration order.
    pub fn children(&self) -> &[String] {
        &self.children
    }
    /// Current spinner frame.
    pub fn frame(&self) -> usize {
        self.frame
    }
}

/// Flat task namespace with parent pointers.
///
/// Task names are unique across the whole tree. Tasks are never removed; the
/// tree lives as long as the output it belongs to.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TaskTree {
    tasks: HashMap<String, Task>,
    keys: Vec<String>,
}

impl TaskTree {
    pub fn new() -> Self {
        Self::default()
    }

    /// Apply one queued event.
    ///
    /// Re-adding an existing name is ignored. Events that reference a task or
    /// parent the tree has never seen are rejected.
    pub fn apply(&mut self, event: TaskEvent) -> Result<()> {
        match event {
            TaskEvent::Added {
                name,
                message,
                parent,
            } => self.add(name, message, parent),
            TaskEvent::Failed { name, message, .. } => {
                self.settle(name, message, TaskStatus::Failed)
            }
            TaskEvent::Succeeded { name, message, .. } => {
                self.settle(name, message, TaskStatus::Succeeded)
            }
            TaskEvent::Info { name, message, .. } => {
                self.settle(name, message, TaskStatus::Info)
            }
            TaskEvent::InfoMessage { message, .. } => {
                self.push_line("info", TaskStatus::Info, message);
                Ok(())
            }
            TaskEvent::Error { message, .. } => {
                self.push_line("error", TaskStatus::Error, message);
                Ok(())
            }
            TaskEvent::Close => Ok(()),
        }
    }

    fn add(&mut self, name: String, message: String, parent: Option<String>) -> Result<()> {
        if self.tasks.contains_key(&name) {
            warn!("Task {name} already registered, ignoring");
            return Ok(());
        }
        if let Some(parent_name) = &parent {
            let parent_task =
                self.tasks
                    .get_mut(parent_name)
                    .ok_or_else(|| Error::UnknownParent {
                        name: name.clone(),
                        parent: parent_name.clone(),
                    })?;
            parent_task.children.push(name.clone());
        }
        self.keys.push(name.clone());
        self.tasks
            .insert(name, Task::new(TaskStatus::Busy, message, parent));
        Ok(())
    }

    fn settle(&mut self, name: String, message: String, status: TaskStatus) -> Result<()> {
        let task = self
            .tasks
            .get_mut(&name)
            .ok_or_else(|| Error::UnknownTask(name.clone()))?;
        if task.status.is_settled() {
            warn!(
                "Task {name} already finished as {:?}, ignoring {:?}",
                task.status, status
            );
            return Ok(());
        }
        task.status = status;
        task.message = message;
        Ok(())
    }

    fn push_line(&mut self, prefix: &str, status: TaskStatus, message: String) {
        let key = format!("{prefix}-{}", self.keys.len());
        self.keys.push(key.clone());
        self.tasks.insert(key, Task::new(status, message, None));
    }

    pub fn get(&self, name: &str) -> Option<&Task> {
        self.tasks.get(name)
    }

    /// Every registered key, tasks and free-standing lines, in registration order.
    pub fn keys(&self) -> &[String] {
        &self.keys
    }

    pub fn len(&self) -> usize {
        self.keys.len()
    }

    pub fn is_empty(&self) -> bool {
        self.keys.is_empty()
    }

    /// Root level entries in registration order.
    pub fn roots(&self) -> impl Iterator<Item = (&str, &Task)> {
        self.keys.iter().filter_map(|key| {
            self.tasks
                .get(key)
                .filter(|task| task.parent.is_none())
                .map(|task| (key.as_str(), task))
        })
    }

    pub fn has_busy(&self) -> bool {
        self.tasks
            .values()
            .any(|task| task.status == TaskStatus::Busy)
    }

    /// Advance the spinner of every busy task. Returns false when nothing moved.
    pub fn tick(&mut self) -> bool {
        let mut moved = false;
        for task in self.tasks.values_mut() {
            if task.status == TaskStatus::Busy {
                task.frame = task.frame.wrapping_add(1);
                moved = true;
            }
        }
        moved
    }

    /// Render the tree as text, one line per task.
    ///
    /// Root entries come first in registration order, each followed by its
    /// children, indented two spaces per level.
    pub fn render(&self, theme: &Theme) -> String {
        let mut out = String::new();
        for (_, task) in self.roots() {
            self.render_task(&mut out, task, 0, theme);
        }
        out
    }

    fn render_task(&self, out: &mut String, task: &Task, depth: usize, theme: &Theme) {
        out.push_str(&"  ".repeat(depth));
        out.push_str(&theme.glyph(task.status, task.frame));
        out.push(' ');
        out.push_str(&task.message);
        out.push('\n');

        for child in &task.children {
            if let Some(child) = self.tasks.get(child) {
                self.render_task(out, child, depth + 1, theme);
            }
        }
    }
}
