use std::collections::BTreeMap;

use serde_json::Value;

use super::{ChangeEvent, ChangeKind};

/// In-memory copy of one table kept current from change events.
/// Rows are ordered by id; the last event for an id wins.
#[derive(Debug, Clone, Default)]
pub struct LiveTable {
    table: String,
    rows: BTreeMap<i64, Value>,
}

impl LiveTable {
    pub fn new(table: impl Into<String>) -> Self {
        Self {
            table: table.into(),
            rows: BTreeMap::new(),
        }
    }

    /// Seeds the table from a snapshot; rows without a numeric `id` are skipped.
    pub fn with_snapshot(table: impl Into<String>, snapshot: impl IntoIterator<Item = Value>) -> Self {
        let mut live = Self::new(table);
        for row in snapshot {
            if let Some(id) = record_id(&row) {
                live.rows.insert(id, row);
            }
        }
        live
    }

    /// Returns false when the event belongs to another table or has no id.
    pub fn apply(&mut self, event: &ChangeEvent) -> bool {
        if event.table != self.table {
            return false;
        }
        let Some(id) = record_id(&event.record) else {
            return false;
        };
        match event.kind {
            ChangeKind::Insert | ChangeKind::Update => {
                self.rows.insert(id, event.record.clone());
            }
            ChangeKind::Delete => {
                self.rows.remove(&id);
            }
        }
        true
    }

    pub fn get(&self, id: i64) -> Option<&Value> {
        self.rows.get(&id)
    }

    pub fn rows(&self) -> impl Iterator<Item = &Value> {
        self.rows.values()
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }
}

fn record_id(record: &Value) -> Option<i64> {
    record.get("id").and_then(Value::as_i64)
}
