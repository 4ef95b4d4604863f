//! Updates of the policy index.

use serde_json::{Value, json};

use crate::error::PersistenceResult;
use crate::fields::{FIELD_ID, FIELD_RESOURCE, FIELD_THING_ID};
use crate::keys::resource_prefix_pattern;
use crate::write::permissions::{PolicyEnforcer, ResourcePermissions};
use crate::write::updates::DocumentUpdate;

/// A change of the policy index entries of one thing.
#[derive(Debug, Clone, PartialEq)]
pub enum PolicyUpdate {
    /// Inserts or replaces the entry of one resource.
    Upsert {
        thing_id: String,
        permissions: ResourcePermissions,
    },
    /// Removes the entry of a resource and of every resource below it.
    Delete { thing_id: String, resource: String },
}

impl PolicyUpdate {
    /// Returns the thing the update belongs to.
    pub fn thing_id(&self) -> &str {
        match self {
            PolicyUpdate::Upsert { thing_id, .. } | PolicyUpdate::Delete { thing_id, .. } => {
                thing_id
            }
        }
    }

    /// Returns the resource the update is rooted at.
    pub fn resource(&self) -> &str {
        match self {
            PolicyUpdate::Upsert { permissions, .. } => &permissions.resource,
            PolicyUpdate::Delete { resource, .. } => resource,
        }
    }

    /// Converts the update into a write against the policy collection.
    pub fn to_document_update(&self) -> PersistenceResult<DocumentUpdate> {
        match self {
            PolicyUpdate::Upsert {
                thing_id,
                permissions,
            } => Ok(DocumentUpdate::ReplaceOne {
                filter: json!({ FIELD_ID: permissions.create_policy_entry_id(thing_id)? }),
                replacement: permissions.to_document(thing_id)?,
                upsert: true,
            }),
            PolicyUpdate::Delete { thing_id, resource } => Ok(DocumentUpdate::DeleteMany {
                filter: json!({
                    FIELD_THING_ID: thing_id,
                    FIELD_RESOURCE: { "$regex": resource_prefix_pattern(resource) },
                }),
            }),
        }
    }
}

/// Appends `resource` and every leaf resource below it, according to the
/// shape of `value`.
///
/// A non-empty object contributes the resources of its children; any other
/// value is a leaf.
pub fn collect_leaf_resources(resource: &str, value: &Value, resources: &mut Vec<String>) {
    match value {
        Value::Object(map) if !map.is_empty() => {
            for (key, child) in map {
                collect_leaf_resources(&format!("{resource}/{key}"), child, resources);
            }
        }
        _ => resources.push(resource.to_string()),
    }
}

/// Builds the policy updates that re-index a subtree of a thing.
///
/// The subtree rooted at `root` is deleted first, then each resource gets a
/// fresh entry with the permissions the enforcer computes for it.
pub struct PolicyUpdates<'a> {
    thing_id: &'a str,
    enforcer: &'a dyn PolicyEnforcer,
    updates: Vec<PolicyUpdate>,
}

impl<'a> PolicyUpdates<'a> {
    /// Starts by deleting the entries at and below `root`.
    pub fn replacing(thing_id: &'a str, root: &str, enforcer: &'a dyn PolicyEnforcer) -> Self {
        Self {
            thing_id,
            enforcer,
            updates: vec![PolicyUpdate::Delete {
                thing_id: thing_id.to_string(),
                resource: root.to_string(),
            }],
        }
    }

    /// Adds an entry for one resource.
    pub fn upsert(&mut self, resource: &str) -> &mut Self {
        self.updates.push(PolicyUpdate::Upsert {
            thing_id: self.thing_id.to_string(),
            permissions: self.enforcer.read_permissions(resource),
        });
        self
    }

    /// Adds an entry for every leaf resource of `value` below `resource`.
    pub fn upsert_leaves(&mut self, resource: &str, value: &Value) -> &mut Self {
        let mut resources = Vec::new();
        collect_leaf_resources(resource, value, &mut resources);
        for resource in resources {
            self.upsert(&resource);
        }
        self
    }

    /// Returns the updates in application order.
    pub fn into_vec(self) -> Vec<PolicyUpdate> {
        self.updates
    }
}
