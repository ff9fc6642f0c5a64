//! Read-through cache for deserialized page options.
//!
//! Entries are keyed by `(group, page_id)` where the group is the owning
//! instance key, so two instances can never collide on a page id. An absent
//! record or empty value blob caches an explicit [`CacheEntry::Empty`]
//! marker; that is a hit like any other, not a miss to retry.
//!
//! Consistency with the store is maintained by invalidate-on-write: every
//! successful save (and every slug rename during migration) drops exactly
//! the affected page's entry.

use std::collections::HashMap;

use crate::fields::FieldValues;

/// One cached read result.
#[derive(Debug, Clone, PartialEq)]
pub(crate) enum CacheEntry {
    /// The record is absent or has never been saved to.
    Empty,
    Values(FieldValues),
}

impl CacheEntry {
    pub(crate) fn to_values(&self) -> FieldValues {
        match self {
            CacheEntry::Empty => FieldValues::new(),
            CacheEntry::Values(values) => values.clone(),
        }
    }
}

/// Per-instance options cache.
#[derive(Debug, Default)]
pub(crate) struct OptionsCache {
    group: String,
    entries: HashMap<String, CacheEntry>,
}

impl OptionsCache {
    pub(crate) fn new(group: &str) -> Self {
        Self {
            group: group.to_string(),
            entries: HashMap::new(),
        }
    }

    fn key(&self, page_id: &str) -> String {
        format!("{}:{page_id}", self.group)
    }

    pub(crate) fn get(&self, page_id: &str) -> Option<&CacheEntry> {
        self.entries.get(&self.key(page_id))
    }

    pub(crate) fn store_values(&mut self, page_id: &str, values: FieldValues) {
        self.entries
            .insert(self.key(page_id), CacheEntry::Values(values));
    }

    pub(crate) fn store_empty(&mut self, page_id: &str) {
        self.entries.insert(self.key(page_id), CacheEntry::Empty);
    }

    /// Drop one page's entry; reports whether anything was cached.
    pub(crate) fn invalidate(&mut self, page_id: &str) -> bool {
        self.entries.remove(&self.key(page_id)).is_some()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_empty_marker_is_a_hit() {
        let mut cache = OptionsCache::new("site");
        assert!(cache.get("general").is_none());

        cache.store_empty("general");
        assert_eq!(cache.get("general"), Some(&CacheEntry::Empty));
        assert!(cache.get("general").unwrap().to_values().is_empty());
    }

    #[test]
    fn test_invalidate_drops_exactly_one_page() {
        let mut cache = OptionsCache::new("site");
        let mut values = FieldValues::new();
        values.insert("color".to_string(), json!("blue"));
        cache.store_values("general", values);
        cache.store_empty("seo");

        assert!(cache.invalidate("general"));
        assert!(!cache.invalidate("general"));
        assert!(cache.get("general").is_none());
        assert!(cache.get("seo").is_some());
    }

    #[test]
    fn test_groups_do_not_collide() {
        let mut site = OptionsCache::new("site");
        let mut shop = OptionsCache::new("shop");

        let mut values = FieldValues::new();
        values.insert("color".to_string(), json!("blue"));
        site.store_values("general", values);
        shop.store_empty("general");

        assert_ne!(site.get("general"), shop.get("general"));
    }
}
