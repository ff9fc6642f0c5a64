//! Options manager: one instance key, its config, and its pages.
//!
//! A manager owns the page descriptors registered under one instance key and
//! orchestrates everything around them: provisioning backing records in the
//! content store, reading saved options through the cache, persisting the
//! field system's saves, and accumulating the notices the host renders when
//! something went wrong.
//!
//! Propagation policy after construction is degrade-and-log: provisioning
//! collisions and store rejections mark the affected page failed and are
//! surfaced through [`notices`], never raised to the caller.
//!
//! [`notices`]: OptionsManager::notices

use std::collections::BTreeMap;
use std::sync::Arc;

use serde_json::Value;

use crate::cache::OptionsCache;
use crate::config::{ConfigOverrides, InstanceConfig};
use crate::error::{Error, Result};
use crate::fields::{FieldSource, FieldValues};
use crate::gate::CapabilityGate;
use crate::page::{PageArgs, PageDescriptor};
use crate::store::{ContentStore, NewRecord, RecordId, META_CAPABILITY, META_DESCRIPTION};

/// What [`OptionsManager::initialize`] did.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InitOutcome {
    /// Pages were provisioned and the instance is live.
    Initialized,
    /// A previous call already initialized this instance; nothing was done.
    AlreadyInitialized,
    /// No field source is available; the instance degraded to a
    /// warning-only state and nothing was provisioned.
    FieldSourceMissing,
}

/// What [`OptionsManager::save_options`] did.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SaveOutcome {
    /// The value blob was written and the page's cache entry invalidated.
    Saved,
    /// The save did not apply to this instance (foreign record, denied
    /// capability, or no values to persist). The store is untouched.
    Skipped,
    /// The store rejected the write; logged, store left as it was.
    Failed,
}

/// Manager for one options instance.
pub struct OptionsManager {
    key: String,
    config: InstanceConfig,
    pages: Vec<PageDescriptor>,
    /// Provisioning results per page id: `Some(id)` on success, `None` for a
    /// page that failed. Presence means provisioning already ran.
    provisioned: BTreeMap<String, Option<RecordId>>,
    creation_errors: Vec<String>,
    dependency_notice: Option<String>,
    initialized: bool,
    cache: OptionsCache,
    store: Arc<dyn ContentStore>,
    gate: Arc<dyn CapabilityGate>,
    fields: Option<Arc<dyn FieldSource>>,
}

impl OptionsManager {
    pub(crate) fn new(
        key: &str,
        overrides: ConfigOverrides,
        store: Arc<dyn ContentStore>,
        gate: Arc<dyn CapabilityGate>,
        fields: Option<Arc<dyn FieldSource>>,
    ) -> Result<Self> {
        let config = InstanceConfig::resolve(key, overrides)?;
        Ok(Self {
            key: key.to_string(),
            config,
            pages: Vec::new(),
            provisioned: BTreeMap::new(),
            creation_errors: Vec::new(),
            dependency_notice: None,
            initialized: false,
            cache: OptionsCache::new(key),
            store,
            gate,
            fields,
        })
    }

    pub fn key(&self) -> &str {
        &self.key
    }

    pub fn config(&self) -> &InstanceConfig {
        &self.config
    }

    /// Registered pages, in registration order.
    pub fn pages(&self) -> &[PageDescriptor] {
        &self.pages
    }

    /// Registered pages whose capability passes the gate for the current
    /// actor.
    pub fn visible_pages(&self) -> Vec<&PageDescriptor> {
        self.pages
            .iter()
            .filter(|page| self.gate.allows(page.capability()))
            .collect()
    }

    /// Storage id of a successfully provisioned page.
    pub fn record_id(&self, page_id: &str) -> Option<RecordId> {
        self.provisioned.get(page_id).copied().flatten()
    }

    /// Creation errors accumulated during provisioning.
    pub fn creation_errors(&self) -> &[String] {
        &self.creation_errors
    }

    /// Everything the host should render as an admin notice: the dependency
    /// warning (if degraded) followed by per-page creation errors.
    pub fn notices(&self) -> Vec<String> {
        self.dependency_notice
            .iter()
            .chain(self.creation_errors.iter())
            .cloned()
            .collect()
    }

    /// Validate and register one page. A duplicate id replaces the earlier
    /// descriptor (last registration wins) since both would derive the same
    /// storage slug anyway.
    pub fn register_page(&mut self, args: PageArgs) -> Result<()> {
        let page = PageDescriptor::new(args)?;
        if let Some(existing) = self.pages.iter_mut().find(|p| p.id() == page.id()) {
            tracing::warn!(
                instance = %self.key,
                page = %page.id(),
                "page id registered twice; replacing the earlier descriptor"
            );
            *existing = page;
        } else {
            self.pages.push(page);
        }
        Ok(())
    }

    /// Register several pages in order. Not atomic: a validation failure
    /// partway through leaves the earlier pages registered.
    pub fn register_pages(&mut self, pages: Vec<PageArgs>) -> Result<()> {
        for args in pages {
            self.register_page(args)?;
        }
        Ok(())
    }

    /// Provision every registered page. Idempotent; without a field source
    /// the instance degrades to a warning and provisions nothing.
    pub fn initialize(&mut self) -> InitOutcome {
        if self.initialized {
            return InitOutcome::AlreadyInitialized;
        }
        self.initialized = true;

        if self.fields.is_none() {
            let notice = format!(
                "Options pages for \"{}\" are disabled because no field source is available.",
                self.key
            );
            tracing::warn!(instance = %self.key, "{notice}");
            self.dependency_notice = Some(notice);
            return InitOutcome::FieldSourceMissing;
        }

        for page in self.pages.clone() {
            self.ensure_page_exists(&page);
        }
        InitOutcome::Initialized
    }

    /// Make sure a page's backing record exists, at most once per page per
    /// process. The descriptor is the source of truth for capability and
    /// description metadata on an existing record.
    pub fn ensure_page_exists(&mut self, page: &PageDescriptor) {
        if self.provisioned.contains_key(page.id()) {
            return;
        }
        let slug = page.slug(&self.config.prefix);

        match self.store.find_by_slug(&slug, &self.config.post_type) {
            Ok(Some(record)) => {
                self.refresh_meta(record.id, &record.meta, page);
                self.provisioned
                    .insert(page.id().to_string(), Some(record.id));
                return;
            }
            Ok(None) => {}
            Err(err) => {
                tracing::error!(instance = %self.key, %slug, %err, "page lookup failed");
                self.provisioned.insert(page.id().to_string(), None);
                return;
            }
        }

        // The slug is free within our type; refuse to create over a foreign
        // record rather than overwrite it.
        match self.store.find_any(&slug) {
            Ok(Some(other)) => {
                let conflict = Error::SlugConflict {
                    slug: slug.clone(),
                    type_tag: other.type_tag.clone(),
                };
                tracing::error!(instance = %self.key, page = %page.id(), %conflict, "provisioning refused");
                self.creation_errors.push(format!(
                    "Options page \"{}\" was not created: {conflict}.",
                    page.title()
                ));
                self.provisioned.insert(page.id().to_string(), None);
                return;
            }
            Ok(None) => {}
            Err(err) => {
                tracing::error!(instance = %self.key, %slug, %err, "slug conflict check failed");
                self.provisioned.insert(page.id().to_string(), None);
                return;
            }
        }

        let mut meta = BTreeMap::new();
        meta.insert(META_CAPABILITY.to_string(), page.capability().to_string());
        if let Some(description) = page.description() {
            meta.insert(META_DESCRIPTION.to_string(), description.to_string());
        }
        let record = NewRecord {
            slug: slug.clone(),
            type_tag: self.config.post_type.clone(),
            title: page.title().to_string(),
            meta,
        };
        match self.store.create(record) {
            Ok(id) => {
                tracing::debug!(instance = %self.key, page = %page.id(), record = id, "page record created");
                self.provisioned.insert(page.id().to_string(), Some(id));
            }
            Err(err) => {
                tracing::error!(instance = %self.key, page = %page.id(), %err, "page record creation failed");
                self.provisioned.insert(page.id().to_string(), None);
            }
        }
    }

    fn refresh_meta(
        &mut self,
        record: RecordId,
        stored: &BTreeMap<String, String>,
        page: &PageDescriptor,
    ) {
        if stored.get(META_CAPABILITY).map(String::as_str) != Some(page.capability()) {
            if let Err(err) = self.store.set_meta(record, META_CAPABILITY, page.capability()) {
                tracing::error!(instance = %self.key, page = %page.id(), %err, "capability refresh failed");
            }
        }
        if let Some(description) = page.description() {
            if stored.get(META_DESCRIPTION).map(String::as_str) != Some(description) {
                if let Err(err) = self.store.set_meta(record, META_DESCRIPTION, description) {
                    tracing::error!(instance = %self.key, page = %page.id(), %err, "description refresh failed");
                }
            }
        }
    }

    /// All saved options for a page, cache-first. An absent record, an empty
    /// value blob, or a blob that does not deserialize to a mapping all read
    /// as an empty map.
    pub fn get_options(&mut self, page_id: &str) -> FieldValues {
        if let Some(entry) = self.cache.get(page_id) {
            return entry.to_values();
        }

        let slug = format!("{}{page_id}", self.config.prefix);
        let record = match self.store.find_by_slug(&slug, &self.config.post_type) {
            Ok(record) => record,
            Err(err) => {
                // Store errors are not cached; the next read retries.
                tracing::error!(instance = %self.key, %slug, %err, "options lookup failed");
                return FieldValues::new();
            }
        };

        let blob = match record.as_ref().and_then(|r| r.content.as_deref()) {
            Some(blob) if !blob.is_empty() => blob,
            _ => {
                self.cache.store_empty(page_id);
                return FieldValues::new();
            }
        };

        let values = parse_options(blob, &self.key, page_id);
        self.cache.store_values(page_id, values.clone());
        values
    }

    /// One saved field for a page, or `default` when the field source is
    /// absent, the record is missing, or the field was never saved. A stored
    /// falsy value is returned as-is.
    pub fn get_option(&self, page_id: &str, field: &str, default: Value) -> Value {
        let Some(fields) = &self.fields else {
            return default;
        };
        let slug = format!("{}{page_id}", self.config.prefix);
        let record = match self.store.find_by_slug(&slug, &self.config.post_type) {
            Ok(Some(record)) => record,
            Ok(None) => return default,
            Err(err) => {
                tracing::error!(instance = %self.key, %slug, %err, "option lookup failed");
                return default;
            }
        };
        fields.value(record.id, field).unwrap_or(default)
    }

    /// Persist the field system's post-save values as the record's value
    /// blob. Driven by the host's save hook, so everything that does not
    /// apply here is a silent skip rather than an error.
    pub fn save_options(&mut self, record_id: RecordId) -> SaveOutcome {
        let record = match self.store.get(record_id) {
            Ok(Some(record)) => record,
            Ok(None) => {
                tracing::debug!(instance = %self.key, record = record_id, "save for unknown record ignored");
                return SaveOutcome::Skipped;
            }
            Err(err) => {
                tracing::error!(instance = %self.key, record = record_id, %err, "save lookup failed");
                return SaveOutcome::Failed;
            }
        };

        if record.type_tag != self.config.post_type {
            return SaveOutcome::Skipped;
        }

        // Gate against the capability stored on the record, failing closed
        // when the metadata is missing.
        let Some(capability) = record.meta.get(META_CAPABILITY) else {
            tracing::warn!(instance = %self.key, record = record_id, "record has no capability metadata; save ignored");
            return SaveOutcome::Skipped;
        };
        if !self.gate.allows(capability) {
            tracing::warn!(instance = %self.key, record = record_id, %capability, "save denied by capability gate");
            return SaveOutcome::Skipped;
        }

        let Some(values) = self.fields.as_ref().and_then(|f| f.values(record_id)) else {
            return SaveOutcome::Skipped;
        };

        let blob = match serde_json::to_string(&values) {
            Ok(blob) => blob,
            Err(err) => {
                tracing::error!(instance = %self.key, record = record_id, %err, "value serialization failed");
                return SaveOutcome::Failed;
            }
        };
        if let Err(err) = self.store.update_content(record_id, &blob) {
            tracing::error!(instance = %self.key, record = record_id, %err, "value blob write failed");
            return SaveOutcome::Failed;
        }

        if let Some(page_id) = record.slug.strip_prefix(&self.config.prefix) {
            self.cache.invalidate(page_id);
        }
        SaveOutcome::Saved
    }

    pub(crate) fn store_handle(&self) -> Arc<dyn ContentStore> {
        Arc::clone(&self.store)
    }

    pub(crate) fn invalidate_cache(&mut self, page_id: &str) -> bool {
        self.cache.invalidate(page_id)
    }
}

/// Tolerant value-blob deserialization: anything that is not a JSON object
/// coerces to an empty map.
fn parse_options(blob: &str, instance: &str, page_id: &str) -> FieldValues {
    match serde_json::from_str::<Value>(blob) {
        Ok(Value::Object(values)) => values,
        Ok(_) => {
            tracing::warn!(%instance, page = %page_id, "value blob is not a mapping; treating as empty");
            FieldValues::new()
        }
        Err(err) => {
            tracing::warn!(%instance, page = %page_id, %err, "value blob failed to parse; treating as empty");
            FieldValues::new()
        }
    }
}
