//! Table projection of a result container.

use serde_json::Value;

use crate::{change::Record, container::ResultContainer, hash::canonical_json};

/// Column headers in first-seen order.
///
/// A field name gets a column the first time any record carries it and keeps
/// that column for the rest of the session.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Columns {
    names: Vec<String>,
}

impl Columns {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register the fields of `record`, returns true when a column was added.
    pub fn observe(&mut self, record: &Record) -> bool {
        let before = self.names.len();
        for key in record.keys() {
            if !self.names.iter().any(|name| name == key) {
                self.names.push(key.clone());
            }
        }
        self.names.len() != before
    }

    /// Cells of `record` in column order, empty where the field is missing.
    pub fn project(&self, record: &Record) -> Vec<String> {
        self.names
            .iter()
            .map(|name| record.get(name).map(display_value).unwrap_or_default())
            .collect()
    }

    pub fn names(&self) -> &[String] {
        &self.names
    }

    pub fn len(&self) -> usize {
        self.names.len()
    }

    pub fn is_empty(&self) -> bool {
        self.names.is_empty()
    }
}

/// Text shown for a single cell.
pub fn display_value(value: &Value) -> String {
    match value {
        Value::String(text) => text.clone(),
        Value::Null => String::new(),
        other => canonical_json(other),
    }
}

/// Rendered state of a result table.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TableView {
    pub columns: Vec<String>,
    pub rows: Vec<Vec<String>>,
}

impl TableView {
    /// Project the live records of `container`, growing `columns` as needed.
    pub fn build(container: &ResultContainer, columns: &mut Columns) -> Self {
        for record in container.rows() {
            columns.observe(record);
        }
        Self {
            columns: columns.names().to_vec(),
            rows: container.rows().map(|record| columns.project(record)).collect(),
        }
    }

    /// Column widths fitting the header and every cell.
    pub fn widths(&self) -> Vec<usize> {
        self.columns
            .iter()
            .enumerate()
            .map(|(i, name)| {
                self.rows
                    .iter()
                    .filter_map(|row| row.get(i))
                    .map(|cell| cell.chars().count())
                    .chain(std::iter::once(name.chars().count()))
                    .max()
                    .unwrap_or(0)
            })
            .collect()
    }
}
