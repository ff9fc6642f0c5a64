//! Field source interface.
//!
//! The external field-editing system owns individual field values; the core
//! only reads them back, either one field at a time or as the full map for a
//! record. Absence of the whole collaborator is a legal, degraded state: a
//! manager without a field source registers a warning instead of provisioning
//! anything.
//!
//! Reads return `Option` so "not found" stays distinguishable from a stored
//! falsy value (`false`, `0`, `""` all round-trip intact).

use std::collections::HashMap;
use std::sync::{Mutex, MutexGuard, PoisonError};

use serde_json::Value;

use crate::store::RecordId;

/// Deserialized field-value mapping for one page record.
pub type FieldValues = serde_json::Map<String, Value>;

/// External field system, reduced to the reads the options core performs.
pub trait FieldSource: Send + Sync {
    /// Read a single field for a record. `None` means the field was never
    /// saved, never a coerced falsy value.
    fn value(&self, record: RecordId, field: &str) -> Option<Value>;

    /// Full field-value map for a record; `None` when nothing is saved.
    fn values(&self, record: RecordId) -> Option<FieldValues>;
}

/// In-memory [`FieldSource`], for tests and standalone embedders.
#[derive(Debug, Default)]
pub struct MapFields {
    inner: Mutex<HashMap<RecordId, FieldValues>>,
}

impl MapFields {
    pub fn new() -> Self {
        Self::default()
    }

    /// Set one field on a record.
    pub fn set(&self, record: RecordId, field: &str, value: Value) {
        self.lock()
            .entry(record)
            .or_default()
            .insert(field.to_string(), value);
    }

    /// Replace every field on a record.
    pub fn replace(&self, record: RecordId, values: FieldValues) {
        self.lock().insert(record, values);
    }

    /// Drop all fields for a record.
    pub fn clear(&self, record: RecordId) {
        self.lock().remove(&record);
    }

    fn lock(&self) -> MutexGuard<'_, HashMap<RecordId, FieldValues>> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl FieldSource for MapFields {
    fn value(&self, record: RecordId, field: &str) -> Option<Value> {
        self.lock().get(&record)?.get(field).cloned()
    }

    fn values(&self, record: RecordId) -> Option<FieldValues> {
        self.lock().get(&record).cloned()
    }
}
