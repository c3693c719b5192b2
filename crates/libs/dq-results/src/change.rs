//! Change batches delivered by a continuous query watch.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// One result row: field name to value.
pub type Record = Map<String, Value>;

/// A result whose content changed.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UpdatedResult {
    /// Content as previously added or updated.
    pub before: Record,
    /// Replacement content.
    pub after: Record,
}

/// One batch of result changes, applied atomically to the view.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChangeMsg {
    #[serde(default)]
    pub added_results: Vec<Record>,
    #[serde(default)]
    pub updated_results: Vec<UpdatedResult>,
    #[serde(default)]
    pub deleted_results: Vec<Record>,
}

impl ChangeMsg {
    pub fn is_empty(&self) -> bool {
        self.added_results.is_empty()
            && self.updated_results.is_empty()
            && self.deleted_results.is_empty()
    }
}
