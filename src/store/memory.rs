//! Reference in-memory content store.
//!
//! Backs the crate's tests and standalone embedders. Records live in a
//! `BTreeMap` so listings come back in stable id order, and a JSON snapshot
//! of the whole store can be loaded and written for persistence across runs.

use std::collections::BTreeMap;
use std::fs::File;
use std::io::{BufReader, BufWriter};
use std::path::Path;
use std::sync::{Mutex, MutexGuard, PoisonError};

use serde::{Deserialize, Serialize};

use super::{ContentStore, NewRecord, RecordId, StoredRecord};
use crate::error::{Error, Result};

#[derive(Debug, Default, Serialize, Deserialize)]
struct Inner {
    next_id: RecordId,
    records: BTreeMap<RecordId, StoredRecord>,
}

/// In-memory [`ContentStore`] with per-type slug uniqueness.
#[derive(Debug, Default)]
pub struct MemoryStore {
    inner: Mutex<Inner>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Load a store snapshot previously written with [`write_json`].
    ///
    /// [`write_json`]: MemoryStore::write_json
    pub fn from_json<P: AsRef<Path>>(path: P) -> Result<Self> {
        let file = File::open(path)?;
        let reader = BufReader::new(file);
        let inner: Inner = serde_json::from_reader(reader)?;
        Ok(Self {
            inner: Mutex::new(inner),
        })
    }

    /// Write the whole store as a JSON snapshot.
    pub fn write_json<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let file = File::create(path)?;
        let writer = BufWriter::new(file);
        serde_json::to_writer_pretty(writer, &*self.lock())?;
        Ok(())
    }

    /// Number of stored records.
    pub fn len(&self) -> usize {
        self.lock().records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.lock().records.is_empty()
    }

    fn lock(&self) -> MutexGuard<'_, Inner> {
        // Single-threaded request model; recover rather than propagate a
        // poisoned lock.
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn missing(id: RecordId) -> Error {
        Error::Persistence(format!("no record with id {id}"))
    }
}

impl ContentStore for MemoryStore {
    fn find_by_slug(&self, slug: &str, type_tag: &str) -> Result<Option<StoredRecord>> {
        Ok(self
            .lock()
            .records
            .values()
            .find(|r| r.slug == slug && r.type_tag == type_tag)
            .cloned())
    }

    fn find_any(&self, slug: &str) -> Result<Option<StoredRecord>> {
        Ok(self
            .lock()
            .records
            .values()
            .find(|r| r.slug == slug)
            .cloned())
    }

    fn get(&self, id: RecordId) -> Result<Option<StoredRecord>> {
        Ok(self.lock().records.get(&id).cloned())
    }

    fn create(&self, record: NewRecord) -> Result<RecordId> {
        let mut inner = self.lock();
        if inner
            .records
            .values()
            .any(|r| r.slug == record.slug && r.type_tag == record.type_tag)
        {
            return Err(Error::Persistence(format!(
                "slug \"{}\" already exists for type \"{}\"",
                record.slug, record.type_tag
            )));
        }
        inner.next_id += 1;
        let id = inner.next_id;
        inner.records.insert(
            id,
            StoredRecord {
                id,
                slug: record.slug,
                type_tag: record.type_tag,
                title: record.title,
                content: None,
                meta: record.meta,
            },
        );
        Ok(id)
    }

    fn update_content(&self, id: RecordId, content: &str) -> Result<()> {
        let mut inner = self.lock();
        let record = inner.records.get_mut(&id).ok_or_else(|| Self::missing(id))?;
        record.content = Some(content.to_string());
        Ok(())
    }

    fn set_meta(&self, id: RecordId, key: &str, value: &str) -> Result<()> {
        let mut inner = self.lock();
        let record = inner.records.get_mut(&id).ok_or_else(|| Self::missing(id))?;
        record.meta.insert(key.to_string(), value.to_string());
        Ok(())
    }

    fn list_by_type(&self, type_tag: &str) -> Result<Vec<StoredRecord>> {
        Ok(self
            .lock()
            .records
            .values()
            .filter(|r| r.type_tag == type_tag)
            .cloned()
            .collect())
    }

    fn set_type(&self, id: RecordId, type_tag: &str) -> Result<()> {
        let mut inner = self.lock();
        let slug = inner
            .records
            .get(&id)
            .ok_or_else(|| Self::missing(id))?
            .slug
            .clone();
        if inner
            .records
            .values()
            .any(|r| r.id != id && r.slug == slug && r.type_tag == type_tag)
        {
            return Err(Error::Persistence(format!(
                "slug \"{slug}\" already exists for type \"{type_tag}\""
            )));
        }
        if let Some(record) = inner.records.get_mut(&id) {
            record.type_tag = type_tag.to_string();
        }
        Ok(())
    }

    fn set_slug(&self, id: RecordId, slug: &str) -> Result<()> {
        let mut inner = self.lock();
        let type_tag = inner
            .records
            .get(&id)
            .ok_or_else(|| Self::missing(id))?
            .type_tag
            .clone();
        if inner
            .records
            .values()
            .any(|r| r.id != id && r.slug == slug && r.type_tag == type_tag)
        {
            return Err(Error::Persistence(format!(
                "slug \"{slug}\" already exists for type \"{type_tag}\""
            )));
        }
        if let Some(record) = inner.records.get_mut(&id) {
            record.slug = slug.to_string();
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn record(slug: &str, type_tag: &str) -> NewRecord {
        NewRecord {
            slug: slug.to_string(),
            type_tag: type_tag.to_string(),
            title: slug.to_string(),
            meta: BTreeMap::new(),
        }
    }

    #[test]
    fn test_create_and_find() {
        let store = MemoryStore::new();
        let id = store.create(record("site-options-general", "site_options")).unwrap();

        let found = store
            .find_by_slug("site-options-general", "site_options")
            .unwrap()
            .unwrap();
        assert_eq!(found.id, id);
        assert!(found.content.is_none());

        assert!(store
            .find_by_slug("site-options-general", "other_type")
            .unwrap()
            .is_none());
        assert!(store.find_any("site-options-general").unwrap().is_some());
    }

    #[test]
    fn test_create_rejects_duplicate_slug_within_type() {
        let store = MemoryStore::new();
        store.create(record("dup", "site_options")).unwrap();

        let result = store.create(record("dup", "site_options"));
        assert!(matches!(result, Err(Error::Persistence(_))));

        // Same slug under a different type tag is allowed.
        assert!(store.create(record("dup", "other_type")).is_ok());
    }

    #[test]
    fn test_update_content_and_meta() {
        let store = MemoryStore::new();
        let id = store.create(record("general", "site_options")).unwrap();

        store.update_content(id, r#"{"a":1}"#).unwrap();
        store.set_meta(id, "capability", "manage_options").unwrap();

        let found = store.get(id).unwrap().unwrap();
        assert_eq!(found.content.as_deref(), Some(r#"{"a":1}"#));
        assert_eq!(found.meta.get("capability").unwrap(), "manage_options");
    }

    #[test]
    fn test_update_missing_record_errors() {
        let store = MemoryStore::new();
        assert!(matches!(
            store.update_content(42, "{}"),
            Err(Error::Persistence(_))
        ));
    }

    #[test]
    fn test_retype_and_reslug() {
        let store = MemoryStore::new();
        let id = store.create(record("old-prefix-seo", "old_type")).unwrap();

        store.set_type(id, "new_type").unwrap();
        store.set_slug(id, "new-prefix-seo").unwrap();

        let found = store.get(id).unwrap().unwrap();
        assert_eq!(found.type_tag, "new_type");
        assert_eq!(found.slug, "new-prefix-seo");
        assert_eq!(store.list_by_type("old_type").unwrap().len(), 0);
        assert_eq!(store.list_by_type("new_type").unwrap().len(), 1);
    }

    #[test]
    fn test_json_snapshot_round_trip() {
        let store = MemoryStore::new();
        let id = store.create(record("general", "site_options")).unwrap();
        store.update_content(id, r#"{"color":"blue"}"#).unwrap();

        let dir = TempDir::new().unwrap();
        let path = dir.path().join("store.json");
        store.write_json(&path).unwrap();

        let restored = MemoryStore::from_json(&path).unwrap();
        assert_eq!(restored.len(), 1);
        let found = restored.get(id).unwrap().unwrap();
        assert_eq!(found.content.as_deref(), Some(r#"{"color":"blue"}"#));

        // Ids keep counting from where the snapshot left off.
        let next = restored.create(record("second", "site_options")).unwrap();
        assert!(next > id);
    }
}
