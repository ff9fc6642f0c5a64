//! Instance registry.
//!
//! The registry is the explicit context object holding every options
//! instance in the process, keyed by instance key. It is constructed once at
//! startup with the shared collaborators (content store, capability gate,
//! optional field source) and passed to callers; there is no global lookup.
//!
//! `create_or_get` is deliberately idempotent: bootstrap code scattered
//! across host modules can call it repeatedly with whatever config it has,
//! and only the first call's configuration sticks.

use std::collections::btree_map::Entry;
use std::collections::BTreeMap;
use std::sync::Arc;

use serde::Serialize;

use crate::config::{ConfigOverrides, InstanceConfig};
use crate::error::{Error, Result};
use crate::fields::{FieldSource, FieldValues};
use crate::gate::CapabilityGate;
use crate::manager::OptionsManager;
use crate::migrate::{self, LegacyConfig, MigrationOutcome};
use crate::page::PageDescriptor;
use crate::store::ContentStore;

/// Keyed store of options managers sharing one set of collaborators.
pub struct InstanceRegistry {
    instances: BTreeMap<String, OptionsManager>,
    store: Arc<dyn ContentStore>,
    gate: Arc<dyn CapabilityGate>,
    fields: Option<Arc<dyn FieldSource>>,
}

impl InstanceRegistry {
    /// A registry without a field source; every instance created from it
    /// initializes into the degraded warning-only state.
    pub fn new(store: Arc<dyn ContentStore>, gate: Arc<dyn CapabilityGate>) -> Self {
        Self {
            instances: BTreeMap::new(),
            store,
            gate,
            fields: None,
        }
    }

    /// Attach the external field system.
    pub fn with_field_source(mut self, fields: Arc<dyn FieldSource>) -> Self {
        self.fields = Some(fields);
        self
    }

    /// Get the manager registered under `key`, creating it when absent. An
    /// existing manager is returned unchanged and `overrides` is ignored, so
    /// repeated bootstrapping is safe.
    pub fn create_or_get(
        &mut self,
        key: &str,
        overrides: ConfigOverrides,
    ) -> Result<&mut OptionsManager> {
        match self.instances.entry(key.to_string()) {
            Entry::Occupied(entry) => {
                tracing::debug!(instance = %key, "instance already registered; overrides ignored");
                Ok(entry.into_mut())
            }
            Entry::Vacant(entry) => {
                let manager = OptionsManager::new(
                    key,
                    overrides,
                    Arc::clone(&self.store),
                    Arc::clone(&self.gate),
                    self.fields.clone(),
                )?;
                Ok(entry.insert(manager))
            }
        }
    }

    pub fn get(&self, key: &str) -> Option<&OptionsManager> {
        self.instances.get(key)
    }

    pub fn get_mut(&mut self, key: &str) -> Option<&mut OptionsManager> {
        self.instances.get_mut(key)
    }

    pub fn contains(&self, key: &str) -> bool {
        self.instances.contains_key(key)
    }

    /// Read-only view over every instance, in key order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &OptionsManager)> {
        self.instances.iter().map(|(k, m)| (k.as_str(), m))
    }

    pub fn len(&self) -> usize {
        self.instances.len()
    }

    pub fn is_empty(&self) -> bool {
        self.instances.is_empty()
    }

    /// Remove an instance; reports whether it existed.
    pub fn destroy(&mut self, key: &str) -> bool {
        self.instances.remove(key).is_some()
    }

    /// Diagnostic snapshot of one instance: its config and, per page, the
    /// derived slug and currently saved values.
    pub fn debug(&mut self, key: &str) -> InstanceReport {
        let Some(manager) = self.instances.get_mut(key) else {
            return InstanceReport {
                success: false,
                instance_key: None,
                config: None,
                pages: Vec::new(),
                error: Some("Instance not found".to_string()),
            };
        };

        let prefix = manager.config().prefix.clone();
        let pages = manager.pages().to_vec();
        let reports = pages
            .into_iter()
            .map(|page| {
                let values = manager.get_options(page.id());
                PageReport {
                    id: page.id().to_string(),
                    title: page.title().to_string(),
                    capability: page.capability().to_string(),
                    description: page.description().map(str::to_string),
                    slug: page.slug(&prefix),
                    values,
                }
            })
            .collect();

        InstanceReport {
            success: true,
            instance_key: Some(key.to_string()),
            config: Some(manager.config().clone()),
            pages: reports,
            error: None,
        }
    }

    /// Bulk-correct previously provisioned records after a config change.
    /// See [`migrate`](crate::migrate) for the steps and the report shape.
    pub fn migrate(
        &mut self,
        key: &str,
        legacy: &LegacyConfig,
        new_pages: &[PageDescriptor],
    ) -> Result<MigrationOutcome> {
        let Some(manager) = self.instances.get_mut(key) else {
            return Err(Error::UnknownInstance {
                key: key.to_string(),
            });
        };
        migrate::run(manager, legacy, new_pages)
    }
}

/// Diagnostic payload for one instance, serializable as-is.
#[derive(Debug, Serialize)]
pub struct InstanceReport {
    pub success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub instance_key: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub config: Option<InstanceConfig>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub pages: Vec<PageReport>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

/// Per-page slice of an [`InstanceReport`].
#[derive(Debug, Serialize)]
pub struct PageReport {
    pub id: String,
    pub title: String,
    pub capability: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    pub slug: String,
    pub values: FieldValues,
}
