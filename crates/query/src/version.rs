//! Schema (API) version handling.
//!
//! The schema version is passed explicitly through every call that behaves
//! differently across versions. There is no ambient "current version".

use std::fmt;

use serde::{Deserialize, Serialize};

/// First schema version in which negation (`not`) is rejected in filters.
pub const NEGATION_FORBIDDEN_SINCE: SchemaVersion = SchemaVersion::V_2;

/// First schema version whose things are governed by policies instead of ACLs.
pub const POLICY_RELEVANT_SINCE: SchemaVersion = SchemaVersion::V_2;

/// The JSON schema version a request or event was issued with.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SchemaVersion(u32);

impl SchemaVersion {
    /// Schema version 1 (ACL based authorization).
    pub const V_1: SchemaVersion = SchemaVersion(1);
    /// Schema version 2 (policy based authorization).
    pub const V_2: SchemaVersion = SchemaVersion(2);

    /// Creates a schema version from its integer representation.
    pub const fn new(version: u32) -> Self {
        Self(version)
    }

    /// Returns the integer representation.
    pub const fn as_u32(self) -> u32 {
        self.0
    }

    /// Returns `true` if filters issued with this version must be monotone.
    pub fn forbids_negation(self) -> bool {
        self >= NEGATION_FORBIDDEN_SINCE
    }

    /// Returns `true` if things of this version keep authorization data in the
    /// policy index.
    pub fn is_policy_relevant(self) -> bool {
        self >= POLICY_RELEVANT_SINCE
    }
}

impl Default for SchemaVersion {
    fn default() -> Self {
        Self::V_2
    }
}

impl From<u32> for SchemaVersion {
    fn from(version: u32) -> Self {
        Self(version)
    }
}

impl fmt::Display for SchemaVersion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_negation_threshold() {
        assert!(!SchemaVersion::new(0).forbids_negation());
        assert!(!SchemaVersion::V_1.forbids_negation());
        assert!(SchemaVersion::V_2.forbids_negation());
        assert!(SchemaVersion::new(7).forbids_negation());
    }

    #[test]
    fn test_policy_relevance() {
        assert!(!SchemaVersion::V_1.is_policy_relevant());
        assert!(SchemaVersion::V_2.is_policy_relevant());
    }

    #[test]
    fn test_serde_transparent() {
        let version: SchemaVersion = serde_json::from_str("2").unwrap();
        assert_eq!(version, SchemaVersion::V_2);
        assert_eq!(serde_json::to_string(&SchemaVersion::V_1).unwrap(), "1");
    }
}
