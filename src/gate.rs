//! Capability checks.
//!
//! Access control stays in the host: the core only ever asks "does the
//! current actor hold this named capability". The check is injected once at
//! registry construction instead of probed for at call sites.

use std::collections::BTreeSet;

/// Host access-control check for the acting user.
pub trait CapabilityGate: Send + Sync {
    fn allows(&self, capability: &str) -> bool;
}

/// Fixed capability set, for tests and standalone embedders.
#[derive(Debug, Clone, Default)]
pub struct StaticGate {
    grant_all: bool,
    granted: BTreeSet<String>,
}

impl StaticGate {
    /// A gate that admits every capability.
    pub fn allow_all() -> Self {
        Self {
            grant_all: true,
            granted: BTreeSet::new(),
        }
    }

    /// A gate granting exactly the given capabilities.
    pub fn with_grants<I, S>(grants: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            grant_all: false,
            granted: grants.into_iter().map(Into::into).collect(),
        }
    }
}

impl CapabilityGate for StaticGate {
    fn allows(&self, capability: &str) -> bool {
        self.grant_all || self.granted.contains(capability)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_allow_all() {
        let gate = StaticGate::allow_all();
        assert!(gate.allows("manage_options"));
        assert!(gate.allows("anything"));
    }

    #[test]
    fn test_grant_set() {
        let gate = StaticGate::with_grants(["edit_pages"]);
        assert!(gate.allows("edit_pages"));
        assert!(!gate.allows("manage_options"));
    }
}
