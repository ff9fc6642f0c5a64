//! Migration of provisioned records across post_type/prefix config changes.

use std::sync::Arc;

use pretty_assertions::assert_eq;
use serde_json::json;

use pagevault::{
    ConfigOverrides, ContentStore, Error, InstanceRegistry, LegacyConfig, MapFields, MemoryStore,
    MigrationOutcome, PageArgs, PageDescriptor, SaveOutcome, StaticGate, META_CAPABILITY,
};

fn setup() -> (InstanceRegistry, Arc<MemoryStore>, Arc<MapFields>) {
    let store = Arc::new(MemoryStore::new());
    let fields = Arc::new(MapFields::new());
    let registry = InstanceRegistry::new(store.clone(), Arc::new(StaticGate::allow_all()))
        .with_field_source(fields.clone());
    (registry, store, fields)
}

fn legacy_overrides() -> ConfigOverrides {
    ConfigOverrides {
        post_type: Some("legacy_options".to_string()),
        prefix: Some("legacy-".to_string()),
        ..Default::default()
    }
}

fn descriptor(id: &str, capability: &str) -> PageDescriptor {
    PageDescriptor::new(PageArgs::new(id, id, capability)).unwrap()
}

/// Provisions "general" and "seo" under the legacy config, saves one value,
/// then swaps the instance over to the key-derived defaults
/// (`site_options` / `site-options-`).
fn provision_legacy_then_reconfigure(
    registry: &mut InstanceRegistry,
    fields: &MapFields,
) {
    let manager = registry.create_or_get("site", legacy_overrides()).unwrap();
    manager
        .register_pages(vec![
            PageArgs::new("general", "General", "manage_options"),
            PageArgs::new("seo", "SEO", "manage_options"),
        ])
        .unwrap();
    manager.initialize();

    let general = manager.record_id("general").unwrap();
    fields.set(general, "color", json!("blue"));
    assert_eq!(manager.save_options(general), SaveOutcome::Saved);

    // The config change arrives as a fresh bootstrap under the new values.
    registry.destroy("site");
    let manager = registry.create_or_get("site", ConfigOverrides::default()).unwrap();
    manager
        .register_pages(vec![
            PageArgs::new("general", "General", "edit_pages"),
            PageArgs::new("seo", "SEO", "edit_pages"),
        ])
        .unwrap();
}

// =============================================================================
// Full migration
// =============================================================================

#[test]
fn test_migrate_retypes_reslugs_and_syncs_capabilities() {
    let (mut registry, store, fields) = setup();
    provision_legacy_then_reconfigure(&mut registry, &fields);

    let legacy = LegacyConfig {
        post_type: Some("legacy_options".to_string()),
        prefix: Some("legacy-".to_string()),
    };
    let new_pages = [
        descriptor("general", "edit_pages"),
        descriptor("seo", "edit_pages"),
    ];
    let outcome = registry.migrate("site", &legacy, &new_pages).unwrap();

    let report = match outcome {
        MigrationOutcome::Updated(report) => report,
        MigrationOutcome::NoPostsFound => panic!("expected records to migrate"),
    };
    assert_eq!(report.posts_updated, 2);
    assert_eq!(report.post_type_changed, 2);
    assert_eq!(report.prefix_changed, 2);
    assert_eq!(report.capabilities_synced, 2);
    assert!(report.errors.is_empty());

    // Records are reachable under the new config, values intact.
    let general = store
        .find_by_slug("site-options-general", "site_options")
        .unwrap()
        .expect("migrated general record");
    assert_eq!(general.meta.get(META_CAPABILITY).unwrap(), "edit_pages");
    assert_eq!(general.content.as_deref(), Some(r#"{"color":"blue"}"#));
    assert!(store.list_by_type("legacy_options").unwrap().is_empty());

    let manager = registry.get_mut("site").unwrap();
    assert_eq!(manager.get_options("general")["color"], json!("blue"));
}

#[test]
fn test_migrate_invalidates_cache_for_renamed_slugs() {
    let (mut registry, _store, fields) = setup();
    provision_legacy_then_reconfigure(&mut registry, &fields);

    // Before migration the new config finds nothing, and that empty result
    // is cached.
    let manager = registry.get_mut("site").unwrap();
    assert!(manager.get_options("general").is_empty());

    let legacy = LegacyConfig {
        post_type: Some("legacy_options".to_string()),
        prefix: Some("legacy-".to_string()),
    };
    registry
        .migrate("site", &legacy, &[descriptor("general", "edit_pages")])
        .unwrap();

    // The rename dropped the stale entry.
    let manager = registry.get_mut("site").unwrap();
    assert_eq!(manager.get_options("general")["color"], json!("blue"));
}

// =============================================================================
// Partial and degenerate migrations
// =============================================================================

#[test]
fn test_prefix_only_migration_falls_back_to_current_post_type() {
    let (mut registry, store, _fields) = setup();
    let overrides = ConfigOverrides {
        prefix: Some("old-".to_string()),
        ..Default::default()
    };
    let manager = registry.create_or_get("site", overrides).unwrap();
    manager
        .register_page(PageArgs::new("general", "General", "manage_options"))
        .unwrap();
    manager.initialize();

    registry.destroy("site");
    registry.create_or_get("site", ConfigOverrides::default()).unwrap();

    // post_type unchanged, so the legacy value is left unset.
    let legacy = LegacyConfig {
        post_type: None,
        prefix: Some("old-".to_string()),
    };
    let outcome = registry
        .migrate("site", &legacy, &[descriptor("general", "manage_options")])
        .unwrap();

    let report = match outcome {
        MigrationOutcome::Updated(report) => report,
        MigrationOutcome::NoPostsFound => panic!("expected a record to migrate"),
    };
    assert_eq!(report.posts_updated, 1);
    assert_eq!(report.post_type_changed, 0);
    assert_eq!(report.prefix_changed, 1);
    assert_eq!(report.capabilities_synced, 0);

    assert!(store
        .find_by_slug("site-options-general", "site_options")
        .unwrap()
        .is_some());
}

#[test]
fn test_migrate_with_no_source_records() {
    let (mut registry, _store, _fields) = setup();
    registry.create_or_get("site", ConfigOverrides::default()).unwrap();

    let legacy = LegacyConfig {
        post_type: Some("never_existed".to_string()),
        prefix: None,
    };
    let outcome = registry.migrate("site", &legacy, &[]).unwrap();
    assert_eq!(outcome, MigrationOutcome::NoPostsFound);
}

#[test]
fn test_migrate_unknown_instance_is_a_structured_error() {
    let (mut registry, _store, _fields) = setup();

    let result = registry.migrate("ghost", &LegacyConfig::default(), &[]);
    assert!(matches!(
        result,
        Err(Error::UnknownInstance { ref key }) if key == "ghost"
    ));
}

#[test]
fn test_capability_sync_skips_records_already_in_sync() {
    let (mut registry, _store, fields) = setup();
    provision_legacy_then_reconfigure(&mut registry, &fields);

    let legacy = LegacyConfig {
        post_type: Some("legacy_options".to_string()),
        prefix: Some("legacy-".to_string()),
    };
    // The capability map matches what is already stored.
    let new_pages = [
        descriptor("general", "manage_options"),
        descriptor("seo", "manage_options"),
    ];
    let outcome = registry.migrate("site", &legacy, &new_pages).unwrap();

    let report = match outcome {
        MigrationOutcome::Updated(report) => report,
        MigrationOutcome::NoPostsFound => panic!("expected records to migrate"),
    };
    assert_eq!(report.capabilities_synced, 0);
    assert_eq!(report.posts_updated, 2);
}
