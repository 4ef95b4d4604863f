//! Read permissions per policy resource.
//!
//! Expanding groups or implicit subjects happens upstream; this module only
//! deals with plain subject IDs.

use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};
use serde_json::{Value, json};

use crate::error::{PersistenceError, PersistenceResult};
use crate::fields::{FIELD_GRANTED, FIELD_ID, FIELD_RESOURCE, FIELD_REVOKED, FIELD_THING_ID};

/// The subjects granted and revoked read access on one resource.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ResourcePermissions {
    /// The resource, e.g. `thing:/attributes/color`.
    pub resource: String,
    /// Subjects granted read access.
    pub read_granted: BTreeSet<String>,
    /// Subjects whose read access is revoked.
    pub read_revoked: BTreeSet<String>,
}

impl ResourcePermissions {
    /// Creates permissions for a resource.
    pub fn new(
        resource: impl Into<String>,
        read_granted: BTreeSet<String>,
        read_revoked: BTreeSet<String>,
    ) -> Self {
        Self {
            resource: resource.into(),
            read_granted,
            read_revoked,
        }
    }

    /// Returns `true` if `subject` may read the resource.
    ///
    /// A revocation always wins over a grant.
    pub fn is_granted(&self, subject: &str) -> bool {
        self.read_granted.contains(subject) && !self.read_revoked.contains(subject)
    }

    /// Returns the ID of the policy index entry of this resource.
    ///
    /// Resources always start with `thing:/`. Thing IDs must not contain a
    /// `/`, so the first `/` of the ID belongs to the resource and distinct
    /// `(thing_id, resource)` pairs yield distinct IDs.
    ///
    /// # Errors
    ///
    /// Returns [`PersistenceError::InvalidThingId`] for an empty thing ID or
    /// one containing a `/`.
    pub fn create_policy_entry_id(&self, thing_id: &str) -> PersistenceResult<String> {
        if thing_id.is_empty() || thing_id.contains('/') {
            return Err(PersistenceError::InvalidThingId {
                thing_id: thing_id.to_string(),
            });
        }
        Ok(format!("{}:{}", thing_id, self.resource))
    }

    /// Renders the policy index entry of this resource.
    pub fn to_document(&self, thing_id: &str) -> PersistenceResult<Value> {
        Ok(json!({
            FIELD_ID: self.create_policy_entry_id(thing_id)?,
            FIELD_THING_ID: thing_id,
            FIELD_RESOURCE: self.resource,
            FIELD_GRANTED: self.read_granted,
            FIELD_REVOKED: self.read_revoked,
        }))
    }
}

/// Computes the effective read permissions of a thing's resources.
pub trait PolicyEnforcer: Send + Sync {
    /// Returns the read permissions effective on `resource`.
    fn read_permissions(&self, resource: &str) -> ResourcePermissions;
}

/// One grant or revocation of read access on a resource and its descendants.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ReadRule {
    /// The resource the rule applies to, e.g. `thing:/` or `thing:/features/lamp`.
    pub resource: String,
    /// Subjects granted read access.
    pub granted: BTreeSet<String>,
    /// Subjects revoked read access.
    pub revoked: BTreeSet<String>,
}

/// A [`PolicyEnforcer`] backed by a flat list of read rules.
///
/// A rule applies to its resource and every resource below it, so grants
/// and revocations are inherited down the resource tree. Permissions of all
/// applicable rules are merged.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PolicyRules {
    /// The rules in no particular order.
    #[serde(default)]
    pub rules: Vec<ReadRule>,
}

impl PolicyRules {
    /// Creates an empty rule set that grants nothing.
    pub fn new() -> Self {
        Self::default()
    }

    /// Grants read access on `resource` to the subjects.
    pub fn grant<I, S>(mut self, resource: impl Into<String>, subjects: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.rules.push(ReadRule {
            resource: resource.into(),
            granted: subjects.into_iter().map(Into::into).collect(),
            revoked: BTreeSet::new(),
        });
        self
    }

    /// Revokes read access on `resource` from the subjects.
    pub fn revoke<I, S>(mut self, resource: impl Into<String>, subjects: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.rules.push(ReadRule {
            resource: resource.into(),
            granted: BTreeSet::new(),
            revoked: subjects.into_iter().map(Into::into).collect(),
        });
        self
    }
}

/// Returns `true` if `ancestor` is `resource` or one of its ancestors.
fn covers(ancestor: &str, resource: &str) -> bool {
    match resource.strip_prefix(ancestor) {
        Some("") => true,
        Some(rest) => ancestor.ends_with('/') || rest.starts_with('/'),
        None => false,
    }
}

impl PolicyEnforcer for PolicyRules {
    fn read_permissions(&self, resource: &str) -> ResourcePermissions {
        let mut permissions = ResourcePermissions {
            resource: resource.to_string(),
            ..Default::default()
        };
        for rule in self
            .rules
            .iter()
            .filter(|rule| covers(&rule.resource, resource))
        {
            permissions.read_granted.extend(rule.granted.iter().cloned());
            permissions.read_revoked.extend(rule.revoked.iter().cloned());
        }
        permissions
    }
}
