//! Instance configuration with key-derived defaults.
//!
//! Every options instance carries one [`InstanceConfig`]. Callers rarely
//! spell the whole thing out: defaults are derived from the instance key
//! (`post_type = "<key>_options"`, `prefix = "<key>-options-"`) and a
//! [`ConfigOverrides`] value merges caller-supplied fields over them.
//! Validation happens once, at resolution time, and rejects the instance
//! outright rather than registering a half-configured one.

use serde::{Deserialize, Serialize};
use url::Url;

use crate::error::{Error, Result};

/// Menu slot used when the caller does not pick one.
pub const DEFAULT_MENU_POSITION: u32 = 99;

/// Icon tokens are namespaced with this prefix.
pub const ICON_TOKEN_PREFIX: &str = "dashicons-";

fn default_menu_icon() -> String {
    "dashicons-admin-generic".to_string()
}

fn default_menu_label() -> String {
    "Site Options".to_string()
}

/// Resolved configuration for one options instance.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InstanceConfig {
    /// Type tag stamped on every stored page record.
    pub post_type: String,

    /// Slug prefix; a page's storage slug is `prefix + page_id`.
    pub prefix: String,

    /// Admin menu position hint, consumed by host glue.
    #[serde(default = "default_menu_position")]
    pub menu_position: u32,

    /// Menu icon: an icon token, a `data:` URI, or an absolute URL.
    #[serde(default = "default_menu_icon")]
    pub menu_icon: String,

    /// Display label for the instance's menu entry.
    #[serde(default = "default_menu_label")]
    pub menu_label: String,

    /// Whether the host should keep revisions of stored page records.
    #[serde(default)]
    pub revisions: bool,
}

fn default_menu_position() -> u32 {
    DEFAULT_MENU_POSITION
}

/// Caller-supplied configuration fields, merged over the key-derived
/// defaults. Deserializable so hosts can keep instance definitions in JSON.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ConfigOverrides {
    #[serde(default)]
    pub post_type: Option<String>,
    #[serde(default)]
    pub prefix: Option<String>,
    #[serde(default)]
    pub menu_position: Option<u32>,
    #[serde(default)]
    pub menu_icon: Option<String>,
    #[serde(default)]
    pub menu_label: Option<String>,
    #[serde(default)]
    pub revisions: Option<bool>,
}

impl InstanceConfig {
    /// Default configuration derived from an instance key.
    pub fn for_key(key: &str) -> Self {
        Self {
            post_type: format!("{key}_options"),
            prefix: format!("{key}-options-"),
            menu_position: DEFAULT_MENU_POSITION,
            menu_icon: default_menu_icon(),
            menu_label: default_menu_label(),
            revisions: false,
        }
    }

    /// Merge overrides over the key-derived defaults and validate the result.
    pub fn resolve(key: &str, overrides: ConfigOverrides) -> Result<Self> {
        if key.trim().is_empty() {
            return Err(Error::Validation(
                "instance key must not be empty".to_string(),
            ));
        }

        let defaults = Self::for_key(key);
        let config = Self {
            post_type: overrides.post_type.unwrap_or(defaults.post_type),
            prefix: overrides.prefix.unwrap_or(defaults.prefix),
            menu_position: overrides.menu_position.unwrap_or(defaults.menu_position),
            menu_icon: overrides.menu_icon.unwrap_or(defaults.menu_icon),
            menu_label: overrides.menu_label.unwrap_or(defaults.menu_label),
            revisions: overrides.revisions.unwrap_or(defaults.revisions),
        };
        config.validate()?;
        Ok(config)
    }

    fn validate(&self) -> Result<()> {
        if self.post_type.trim().is_empty() {
            return Err(Error::Validation("post_type must not be empty".to_string()));
        }
        if self.prefix.trim().is_empty() {
            return Err(Error::Validation("prefix must not be empty".to_string()));
        }
        validate_menu_icon(&self.menu_icon)
    }
}

/// Accepts an icon token, a `data:` URI, or an absolute http(s) URL.
fn validate_menu_icon(icon: &str) -> Result<()> {
    if icon.starts_with(ICON_TOKEN_PREFIX) {
        return Ok(());
    }
    match Url::parse(icon) {
        Ok(parsed) if matches!(parsed.scheme(), "http" | "https" | "data") => Ok(()),
        _ => Err(Error::Validation(format!(
            "menu_icon \"{icon}\" is not an icon token, data URI, or absolute URL"
        ))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_derive_from_key() {
        let config = InstanceConfig::for_key("shop");
        assert_eq!(config.post_type, "shop_options");
        assert_eq!(config.prefix, "shop-options-");
        assert_eq!(config.menu_position, 99);
        assert_eq!(config.menu_icon, "dashicons-admin-generic");
        assert!(!config.revisions);
    }

    #[test]
    fn test_overrides_win_over_defaults() {
        let overrides = ConfigOverrides {
            post_type: Some("store_settings".to_string()),
            menu_position: Some(42),
            ..Default::default()
        };
        let config = InstanceConfig::resolve("shop", overrides).unwrap();
        assert_eq!(config.post_type, "store_settings");
        assert_eq!(config.prefix, "shop-options-");
        assert_eq!(config.menu_position, 42);
    }

    #[test]
    fn test_empty_key_rejected() {
        let result = InstanceConfig::resolve("  ", ConfigOverrides::default());
        assert!(matches!(result, Err(Error::Validation(_))));
    }

    #[test]
    fn test_menu_icon_accepts_token_data_uri_and_url() {
        for icon in [
            "dashicons-store",
            "data:image/svg+xml;base64,PHN2Zz48L3N2Zz4=",
            "https://example.com/icon.png",
        ] {
            let overrides = ConfigOverrides {
                menu_icon: Some(icon.to_string()),
                ..Default::default()
            };
            assert!(InstanceConfig::resolve("shop", overrides).is_ok(), "{icon}");
        }
    }

    #[test]
    fn test_menu_icon_rejects_relative_path() {
        let overrides = ConfigOverrides {
            menu_icon: Some("assets/icon.png".to_string()),
            ..Default::default()
        };
        let result = InstanceConfig::resolve("shop", overrides);
        assert!(matches!(result, Err(Error::Validation(_))));
    }

    #[test]
    fn test_overrides_deserialize_from_partial_json() {
        let overrides: ConfigOverrides =
            serde_json::from_str(r#"{"menu_label": "Shop Settings"}"#).unwrap();
        assert_eq!(overrides.menu_label.as_deref(), Some("Shop Settings"));
        assert!(overrides.post_type.is_none());
    }
}
