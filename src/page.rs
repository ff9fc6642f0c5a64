//! Page descriptors.
//!
//! A [`PageDescriptor`] is the code-defined template for one options page:
//! id, display title, required capability, optional description. Descriptors
//! are validated once at construction and immutable afterwards; registering
//! the same id again replaces the whole descriptor rather than mutating it.

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

/// Raw page definition as supplied by the caller (or host JSON config).
#[derive(Debug, Clone, Default, Deserialize)]
pub struct PageArgs {
    #[serde(default)]
    pub id: String,
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub capability: String,
    #[serde(default)]
    pub description: Option<String>,
}

impl PageArgs {
    pub fn new(id: &str, title: &str, capability: &str) -> Self {
        Self {
            id: id.to_string(),
            title: title.to_string(),
            capability: capability.to_string(),
            description: None,
        }
    }

    pub fn with_description(mut self, description: &str) -> Self {
        self.description = Some(description.to_string());
        self
    }
}

/// Validated, immutable description of one options page.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PageDescriptor {
    id: String,
    title: String,
    capability: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    description: Option<String>,
}

impl PageDescriptor {
    /// Validate raw args into a descriptor. `id`, `title`, and `capability`
    /// are all required.
    pub fn new(args: PageArgs) -> Result<Self> {
        if args.id.trim().is_empty() {
            return Err(Error::Validation("page id must not be empty".to_string()));
        }
        if args.title.trim().is_empty() {
            return Err(Error::Validation(format!(
                "page \"{}\" is missing a title",
                args.id
            )));
        }
        if args.capability.trim().is_empty() {
            return Err(Error::Validation(format!(
                "page \"{}\" is missing a capability",
                args.id
            )));
        }
        Ok(Self {
            id: args.id,
            title: args.title,
            capability: args.capability,
            description: args.description,
        })
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn title(&self) -> &str {
        &self.title
    }

    pub fn capability(&self) -> &str {
        &self.capability
    }

    pub fn description(&self) -> Option<&str> {
        self.description.as_deref()
    }

    /// Storage slug for this page under the given instance prefix.
    pub fn slug(&self, prefix: &str) -> String {
        format!("{prefix}{}", self.id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_descriptor_round_trips_args() {
        let args = PageArgs::new("general", "General", "manage_options")
            .with_description("Sitewide settings");
        let page = PageDescriptor::new(args).unwrap();
        assert_eq!(page.id(), "general");
        assert_eq!(page.title(), "General");
        assert_eq!(page.capability(), "manage_options");
        assert_eq!(page.description(), Some("Sitewide settings"));
    }

    #[test]
    fn test_missing_fields_rejected() {
        for args in [
            PageArgs::new("", "General", "manage_options"),
            PageArgs::new("general", "", "manage_options"),
            PageArgs::new("general", "General", ""),
        ] {
            assert!(matches!(
                PageDescriptor::new(args),
                Err(Error::Validation(_))
            ));
        }
    }

    #[test]
    fn test_slug_derivation() {
        let page = PageDescriptor::new(PageArgs::new("seo", "SEO", "manage_options")).unwrap();
        assert_eq!(page.slug("site-options-"), "site-options-seo");
    }

    #[test]
    fn test_args_deserialize_without_description() {
        let args: PageArgs =
            serde_json::from_str(r#"{"id":"general","title":"General","capability":"edit_pages"}"#)
                .unwrap();
        assert!(args.description.is_none());
        assert!(PageDescriptor::new(args).is_ok());
    }
}
