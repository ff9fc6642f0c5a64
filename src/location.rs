//! Location adapter for the host's field-group assignment UI.
//!
//! The host lets editors attach field groups to "locations"; this module
//! exposes every registered options page as a selectable
//! `"instance_key:page_id"` choice and answers whether a given record is the
//! one a selector points at. Matching fails closed: malformed selectors,
//! unknown instances, and foreign record types never match, whatever the
//! operator.

use std::collections::BTreeMap;

use crate::registry::InstanceRegistry;
use crate::store::RecordId;

/// Equality operator supplied by the host's location rule.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MatchOperator {
    Equals,
    NotEquals,
}

impl MatchOperator {
    /// Parse the host's rule parameter (`"=="` / `"!="`).
    pub fn from_param(param: &str) -> Option<Self> {
        match param {
            "==" => Some(Self::Equals),
            "!=" => Some(Self::NotEquals),
            _ => None,
        }
    }
}

/// Every `"instance_key:page_id"` choice mapped to its display label,
/// `"{menu_label} - {page title}"`, across all instances in key order.
pub fn choices(registry: &InstanceRegistry) -> BTreeMap<String, String> {
    let mut choices = BTreeMap::new();
    for (key, manager) in registry.iter() {
        for page in manager.pages() {
            choices.insert(
                format!("{key}:{}", page.id()),
                format!("{} - {}", manager.config().menu_label, page.title()),
            );
        }
    }
    choices
}

/// Does `record_id` back the page a selector points at?
///
/// `record_id` is the record currently being edited in the host, `None` when
/// it has not been persisted yet — an unpersisted record never matches
/// rather than guessing. For a persisted record the comparison is its slug
/// against the selector's derived `prefix + page_id`, with `NotEquals`
/// inverting the result.
pub fn matches(
    registry: &InstanceRegistry,
    selector: &str,
    type_tag: &str,
    record_id: Option<RecordId>,
    operator: MatchOperator,
) -> bool {
    let Some((instance_key, page_id)) = parse_selector(selector) else {
        tracing::debug!(%selector, "malformed location selector");
        return false;
    };
    let Some(manager) = registry.get(instance_key) else {
        return false;
    };
    if manager.config().post_type != type_tag {
        return false;
    }
    let Some(record_id) = record_id else {
        return false;
    };
    let record = match manager.store_handle().get(record_id) {
        Ok(Some(record)) => record,
        Ok(None) => return false,
        Err(err) => {
            tracing::error!(record = record_id, %err, "location record lookup failed");
            return false;
        }
    };

    let hit = record.slug == format!("{}{page_id}", manager.config().prefix);
    match operator {
        MatchOperator::Equals => hit,
        MatchOperator::NotEquals => !hit,
    }
}

/// Exactly two non-empty colon-delimited parts.
fn parse_selector(selector: &str) -> Option<(&str, &str)> {
    let (instance_key, page_id) = selector.split_once(':')?;
    if instance_key.is_empty() || page_id.is_empty() || page_id.contains(':') {
        return None;
    }
    Some((instance_key, page_id))
}
