//! Content store interface.
//!
//! The host's content-storage system is not reimplemented here; it is
//! modelled as the [`ContentStore`] trait. One stored record backs each
//! provisioned options page: a slug (`prefix + page_id`), a type tag, a
//! title, an optional serialized value blob, and a metadata map carrying at
//! least the page's capability.
//!
//! Stores must enforce slug uniqueness per type tag. [`MemoryStore`] is the
//! bundled reference implementation, used by the crate's own tests and by
//! embedders without a host store.

mod memory;

pub use memory::MemoryStore;

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::error::Result;

/// Identifier assigned by the store to each record.
pub type RecordId = u64;

/// Metadata key holding the capability required to view/edit a record.
pub const META_CAPABILITY: &str = "capability";

/// Metadata key holding the optional page description.
pub const META_DESCRIPTION: &str = "description";

/// One persisted page record.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StoredRecord {
    pub id: RecordId,
    pub slug: String,
    pub type_tag: String,
    pub title: String,
    /// Serialized value blob; `None` means nothing was ever saved, which is
    /// distinct from an empty mapping.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub content: Option<String>,
    #[serde(default)]
    pub meta: BTreeMap<String, String>,
}

/// Fields for a record about to be created.
#[derive(Debug, Clone)]
pub struct NewRecord {
    pub slug: String,
    pub type_tag: String,
    pub title: String,
    pub meta: BTreeMap<String, String>,
}

/// Host content storage, reduced to the operations the options core needs.
pub trait ContentStore: Send + Sync {
    /// Find a record by slug within one type tag.
    fn find_by_slug(&self, slug: &str, type_tag: &str) -> Result<Option<StoredRecord>>;

    /// Find a record by slug across all type tags. Used to detect slug
    /// collisions with foreign record types before creating anything.
    fn find_any(&self, slug: &str) -> Result<Option<StoredRecord>>;

    /// Fetch a record by id.
    fn get(&self, id: RecordId) -> Result<Option<StoredRecord>>;

    /// Create a record. Must refuse a `(slug, type_tag)` pair that already
    /// exists.
    fn create(&self, record: NewRecord) -> Result<RecordId>;

    /// Replace a record's value blob.
    fn update_content(&self, id: RecordId, content: &str) -> Result<()>;

    /// Write one metadata entry.
    fn set_meta(&self, id: RecordId, key: &str, value: &str) -> Result<()>;

    /// All records carrying the given type tag.
    fn list_by_type(&self, type_tag: &str) -> Result<Vec<StoredRecord>>;

    /// Re-tag a record with a new type.
    fn set_type(&self, id: RecordId, type_tag: &str) -> Result<()>;

    /// Rename a record's slug.
    fn set_slug(&self, id: RecordId, slug: &str) -> Result<()>;
}
