//! Error types shared across the crate.
//!
//! Construction-time validation is the only hard-failure path. Everything
//! after an instance is registered degrades instead of raising: provisioning
//! collisions and store rejections are logged, accumulated as notices, and
//! reported through outcome values (`InitOutcome`, `SaveOutcome`,
//! `MigrationOutcome`) rather than propagated as errors.

use thiserror::Error;

/// Convenience result alias used throughout the crate.
pub type Result<T> = std::result::Result<T, Error>;

/// All error conditions produced by pagevault.
#[derive(Debug, Error)]
pub enum Error {
    /// Invalid configuration or page definition, rejected at construction.
    #[error("invalid configuration: {0}")]
    Validation(String),

    /// A derived storage slug is already taken by a record of another type.
    #[error("slug \"{slug}\" already belongs to a \"{type_tag}\" record")]
    SlugConflict { slug: String, type_tag: String },

    /// The content store rejected a read or write.
    #[error("content store error: {0}")]
    Persistence(String),

    /// No instance is registered under the given key.
    #[error("no options instance registered under key \"{key}\"")]
    UnknownInstance { key: String },

    /// Value blob or snapshot (de)serialization failed.
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// Filesystem error while reading or writing a store snapshot.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}
