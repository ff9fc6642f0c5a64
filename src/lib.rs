#![forbid(unsafe_code)]

//! # pagevault
//!
//! Capability-gated options pages persisted on a pluggable content store.
//!
//! An "options page" is a named collection of saved field values. Pages are
//! registered per instance key, backed by one record each in the host's
//! content store, gated by named capabilities, and read back through a
//! per-page cache. The host's storage, access control, and field-editing
//! systems are injected as traits ([`ContentStore`], [`CapabilityGate`],
//! [`FieldSource`]); the crate ships in-memory implementations of all three
//! for tests and standalone use.
//!
//! ## Example
//!
//! ```rust
//! use std::sync::Arc;
//! use pagevault::{
//!     ConfigOverrides, InstanceRegistry, MapFields, MemoryStore, PageArgs, StaticGate,
//! };
//!
//! fn main() -> pagevault::Result<()> {
//!     let mut registry = InstanceRegistry::new(
//!         Arc::new(MemoryStore::new()),
//!         Arc::new(StaticGate::allow_all()),
//!     )
//!     .with_field_source(Arc::new(MapFields::new()));
//!
//!     let manager = registry.create_or_get("site", ConfigOverrides::default())?;
//!     manager.register_page(PageArgs::new("general", "General", "manage_options"))?;
//!     manager.initialize();
//!
//!     let options = manager.get_options("general");
//!     assert!(options.is_empty());
//!     Ok(())
//! }
//! ```

mod cache;

pub mod config;
pub mod error;
pub mod fields;
pub mod gate;
pub mod location;
pub mod manager;
pub mod migrate;
pub mod page;
pub mod registry;
pub mod store;

// Re-exports
pub use config::{ConfigOverrides, InstanceConfig};
pub use error::{Error, Result};
pub use fields::{FieldSource, FieldValues, MapFields};
pub use gate::{CapabilityGate, StaticGate};
pub use location::MatchOperator;
pub use manager::{InitOutcome, OptionsManager, SaveOutcome};
pub use migrate::{LegacyConfig, MigrationOutcome, MigrationReport};
pub use page::{PageArgs, PageDescriptor};
pub use registry::{InstanceRegistry, InstanceReport, PageReport};
pub use store::{
    ContentStore, MemoryStore, NewRecord, RecordId, StoredRecord, META_CAPABILITY,
    META_DESCRIPTION,
};

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
