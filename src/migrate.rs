//! Migration of provisioned records after a config change.
//!
//! Changing an instance's `post_type` or `prefix` strands every record
//! provisioned under the old values: lookups derive slugs from the new
//! config and find nothing. `run` walks the records still carrying the old
//! type tag and corrects them in place — re-typing, re-slugging, and syncing
//! stored capabilities against the new page definitions — collecting
//! per-record failures instead of stopping at the first one.

use std::collections::{BTreeMap, BTreeSet};

use serde::Serialize;

use crate::error::Result;
use crate::manager::OptionsManager;
use crate::page::PageDescriptor;
use crate::store::{RecordId, META_CAPABILITY};

/// The instance configuration the records were provisioned under. Fields
/// left `None` fall back to the instance's current config, so a caller that
/// only changed the prefix does not have to repeat the post type.
#[derive(Debug, Clone, Default)]
pub struct LegacyConfig {
    pub post_type: Option<String>,
    pub prefix: Option<String>,
}

/// Result of a migration run.
#[derive(Debug, PartialEq, Eq)]
pub enum MigrationOutcome {
    /// No records carry the old type tag; nothing to do.
    NoPostsFound,
    Updated(MigrationReport),
}

/// Aggregate counts for a completed migration.
#[derive(Debug, Default, PartialEq, Eq, Serialize)]
pub struct MigrationReport {
    /// Distinct records touched by any of the steps.
    pub posts_updated: usize,
    pub post_type_changed: usize,
    pub prefix_changed: usize,
    pub capabilities_synced: usize,
    /// Per-record store failures; the run continues past them.
    pub errors: Vec<String>,
}

pub(crate) fn run(
    manager: &mut OptionsManager,
    legacy: &LegacyConfig,
    new_pages: &[PageDescriptor],
) -> Result<MigrationOutcome> {
    let store = manager.store_handle();
    let config = manager.config().clone();
    let old_type = legacy
        .post_type
        .clone()
        .unwrap_or_else(|| config.post_type.clone());
    let old_prefix = legacy
        .prefix
        .clone()
        .unwrap_or_else(|| config.prefix.clone());

    let records = store.list_by_type(&old_type)?;
    if records.is_empty() {
        tracing::debug!(instance = %manager.key(), %old_type, "no records to migrate");
        return Ok(MigrationOutcome::NoPostsFound);
    }

    let capabilities: BTreeMap<&str, &str> = new_pages
        .iter()
        .map(|page| (page.id(), page.capability()))
        .collect();

    let retype = old_type != config.post_type;
    let reslug = old_prefix != config.prefix;
    let mut report = MigrationReport::default();
    let mut touched: BTreeSet<RecordId> = BTreeSet::new();

    for mut record in records {
        if retype {
            match store.set_type(record.id, &config.post_type) {
                Ok(()) => {
                    report.post_type_changed += 1;
                    touched.insert(record.id);
                }
                Err(err) => {
                    report
                        .errors
                        .push(format!("record {}: retype failed: {err}", record.id));
                    continue;
                }
            }
        }

        if reslug {
            if let Some(rest) = record.slug.strip_prefix(&old_prefix) {
                let new_slug = format!("{}{rest}", config.prefix);
                match store.set_slug(record.id, &new_slug) {
                    Ok(()) => {
                        report.prefix_changed += 1;
                        touched.insert(record.id);
                        // The old slug's cached options are stale now.
                        manager.invalidate_cache(rest);
                        record.slug = new_slug;
                    }
                    Err(err) => {
                        report
                            .errors
                            .push(format!("record {}: slug rename failed: {err}", record.id));
                    }
                }
            }
        }

        if let Some(page_id) = record.slug.strip_prefix(&config.prefix) {
            if let Some(&capability) = capabilities.get(page_id) {
                let stored = record.meta.get(META_CAPABILITY).map(String::as_str);
                if stored != Some(capability) {
                    match store.set_meta(record.id, META_CAPABILITY, capability) {
                        Ok(()) => {
                            report.capabilities_synced += 1;
                            touched.insert(record.id);
                        }
                        Err(err) => {
                            report.errors.push(format!(
                                "record {}: capability sync failed: {err}",
                                record.id
                            ));
                        }
                    }
                }
            }
        }
    }

    report.posts_updated = touched.len();
    tracing::debug!(
        instance = %manager.key(),
        posts_updated = report.posts_updated,
        errors = report.errors.len(),
        "migration finished"
    );
    Ok(MigrationOutcome::Updated(report))
}
