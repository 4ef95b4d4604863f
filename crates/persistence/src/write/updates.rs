//! Document updates against the thing index.
//!
//! Partial changes are expressed as two updates per event: a `$pull` that
//! removes the stale `__internal` entries of the changed key prefix, followed
//! by a `$push` of the new entries together with a `$set` of the
//! denormalized field. The store cannot pull from and push to the same array
//! in one update, hence the split.

use serde_json::{Map, Value, json};
use tracing::warn;

use crate::error::PersistenceError;
use crate::fields::{
    FIELD_ACL, FIELD_ATTRIBUTES, FIELD_FEATURES, FIELD_GRANTED, FIELD_ID, FIELD_INTERNAL,
    FIELD_INTERNAL_FEATURE_ID, FIELD_INTERNAL_KEY, FIELD_INTERNAL_VALUE, FIELD_NAMESPACE,
    FIELD_POLICY_ID, FIELD_PROPERTIES, FIELD_REVISION, KEY_ATTRIBUTES, KEY_FEATURE_ID,
    KEY_FEATURE_PROPERTIES,
};
use crate::keys::{escape_key, escape_keys, key_prefix_pattern, map_sort_key, namespace_of};
use crate::write::events::{AccessControlList, AclEntry, Feature, Thing};
use crate::write::index_length::IndexLengthRestrictionEnforcer;

/// One write operation against a collection, in bulk-write form.
#[derive(Debug, Clone, PartialEq)]
pub enum DocumentUpdate {
    /// Applies update operators to the first matching document.
    UpdateOne {
        filter: Value,
        update: Value,
        upsert: bool,
    },
    /// Replaces the first matching document.
    ReplaceOne {
        filter: Value,
        replacement: Value,
        upsert: bool,
    },
    /// Deletes the first matching document.
    DeleteOne { filter: Value },
    /// Deletes every matching document.
    DeleteMany { filter: Value },
}

impl DocumentUpdate {
    /// Returns the filter selecting the affected documents.
    pub fn filter(&self) -> &Value {
        match self {
            DocumentUpdate::UpdateOne { filter, .. }
            | DocumentUpdate::ReplaceOne { filter, .. }
            | DocumentUpdate::DeleteOne { filter }
            | DocumentUpdate::DeleteMany { filter } => filter,
        }
    }

    /// Renders the operation as a bulk-write model document.
    pub fn to_document(&self) -> Value {
        match self {
            DocumentUpdate::UpdateOne {
                filter,
                update,
                upsert,
            } => json!({
                "updateOne": { "filter": filter, "update": update, "upsert": upsert }
            }),
            DocumentUpdate::ReplaceOne {
                filter,
                replacement,
                upsert,
            } => json!({
                "replaceOne": { "filter": filter, "replacement": replacement, "upsert": upsert }
            }),
            DocumentUpdate::DeleteOne { filter } => json!({ "deleteOne": { "filter": filter } }),
            DocumentUpdate::DeleteMany { filter } => json!({ "deleteMany": { "filter": filter } }),
        }
    }
}

/// Selects a thing document by ID.
pub fn by_thing_id(thing_id: &str) -> Value {
    json!({ FIELD_ID: thing_id })
}

/// Collects `__internal` entries of a thing within its length budget.
///
/// Objects recurse into their children, array elements are indexed under
/// the key of the array, every other value (including an empty object) is
/// indexed as it is. Entries whose key alone exceeds the budget are dropped
/// with a warning.
#[derive(Debug)]
pub struct InternalEntries<'a> {
    enforcer: &'a IndexLengthRestrictionEnforcer,
    entries: Vec<Value>,
}

impl<'a> InternalEntries<'a> {
    /// Starts an empty collection.
    pub fn new(enforcer: &'a IndexLengthRestrictionEnforcer) -> Self {
        Self {
            enforcer,
            entries: Vec::new(),
        }
    }

    /// Adds the entries of all attributes.
    pub fn attributes(&mut self, attributes: &Map<String, Value>) -> &mut Self {
        for (key, value) in attributes {
            self.values(&format!("{KEY_ATTRIBUTES}{key}"), value, None);
        }
        self
    }

    /// Adds the entries of one attribute.
    pub fn attribute(&mut self, pointer: &str, value: &Value) -> &mut Self {
        self.values(&attribute_key(pointer), value, None);
        self
    }

    /// Adds the entries of a set of features.
    pub fn features<'f>(
        &mut self,
        features: impl IntoIterator<Item = (&'f String, &'f Feature)>,
    ) -> &mut Self {
        for (feature_id, feature) in features {
            self.feature(feature_id, feature);
        }
        self
    }

    /// Adds the presence marker and property entries of one feature.
    pub fn feature(&mut self, feature_id: &str, feature: &Feature) -> &mut Self {
        self.entries.push(json!({
            FIELD_INTERNAL_KEY: KEY_FEATURE_ID,
            FIELD_INTERNAL_VALUE: feature_id,
            FIELD_INTERNAL_FEATURE_ID: feature_id,
        }));
        if let Some(properties) = &feature.properties {
            self.feature_properties(feature_id, properties);
        }
        self
    }

    /// Adds the entries of all properties of a feature.
    pub fn feature_properties(
        &mut self,
        feature_id: &str,
        properties: &Map<String, Value>,
    ) -> &mut Self {
        for (key, value) in properties {
            self.values(
                &format!("{KEY_FEATURE_PROPERTIES}{key}"),
                value,
                Some(feature_id),
            );
        }
        self
    }

    /// Adds the entries of one feature property.
    pub fn feature_property(&mut self, feature_id: &str, pointer: &str, value: &Value) -> &mut Self {
        self.values(&feature_property_key(pointer), value, Some(feature_id));
        self
    }

    /// Adds the read entries of a v1 access control list.
    pub fn acl(&mut self, acl: &AccessControlList) -> &mut Self {
        for (subject, entry) in acl {
            self.acl_entry(subject, entry);
        }
        self
    }

    /// Adds the read entries of one subject, if it may read.
    pub fn acl_entry(&mut self, subject: &str, entry: &AclEntry) -> &mut Self {
        if entry.read {
            self.entries.push(json!({ FIELD_ACL: subject }));
            self.entries.push(json!({ FIELD_GRANTED: subject }));
        }
        self
    }

    /// Returns the collected entries.
    pub fn into_vec(self) -> Vec<Value> {
        self.entries
    }

    fn values(&mut self, key: &str, value: &Value, feature_id: Option<&str>) {
        match value {
            Value::Object(map) if !map.is_empty() => {
                for (child, value) in map {
                    self.values(&format!("{key}/{child}"), value, feature_id);
                }
            }
            Value::Array(items) => {
                for item in items {
                    self.values(key, item, feature_id);
                }
            }
            leaf => self.leaf(key, leaf, feature_id),
        }
    }

    fn leaf(&mut self, key: &str, value: &Value, feature_id: Option<&str>) {
        match self.enforcer.enforce(key, value) {
            Ok(value) => {
                let mut entry = json!({ FIELD_INTERNAL_KEY: key, FIELD_INTERNAL_VALUE: value });
                if let Some(feature_id) = feature_id {
                    entry[FIELD_INTERNAL_FEATURE_ID] = json!(feature_id);
                }
                self.entries.push(entry);
            }
            Err(err @ PersistenceError::IndexKeyTooLong { .. }) => {
                warn!(key, error = %err, "Dropping index entry");
            }
            Err(err) => {
                warn!(key, error = %err, "Dropping index entry after unexpected error");
            }
        }
    }
}

/// Internal key of an attribute.
pub fn attribute_key(pointer: &str) -> String {
    format!("{KEY_ATTRIBUTES}{}", pointer.trim_matches('/'))
}

/// Internal key of a feature property.
pub fn feature_property_key(pointer: &str) -> String {
    format!("{KEY_FEATURE_PROPERTIES}{}", pointer.trim_matches('/'))
}

/// Denormalized `features` field of a set of features.
pub fn features_document<'f>(
    features: impl IntoIterator<Item = (&'f String, &'f Feature)>,
) -> Value {
    let features: Map<String, Value> = features
        .into_iter()
        .map(|(feature_id, feature)| (escape_key(feature_id), feature_document(feature)))
        .collect();
    Value::Object(features)
}

/// Denormalized form of one feature.
pub fn feature_document(feature: &Feature) -> Value {
    match &feature.properties {
        Some(properties) => {
            json!({ FIELD_PROPERTIES: escape_keys(&Value::Object(properties.clone())) })
        }
        None => json!({}),
    }
}

/// Builds the full index document of a thing.
pub fn thing_document(
    thing_id: &str,
    revision: i64,
    thing: &Thing,
    enforcer: &IndexLengthRestrictionEnforcer,
) -> Value {
    let mut internal = InternalEntries::new(enforcer);
    if let Some(attributes) = &thing.attributes {
        internal.attributes(attributes);
    }
    if let Some(features) = &thing.features {
        internal.features(features);
    }
    if let Some(acl) = &thing.acl {
        internal.acl(acl);
    }

    let mut document = json!({
        FIELD_ID: thing_id,
        FIELD_NAMESPACE: namespace_of(thing_id),
        FIELD_REVISION: revision,
    });
    if let Some(policy_id) = &thing.policy_id {
        document[FIELD_POLICY_ID] = json!(policy_id);
    }
    document[FIELD_INTERNAL] = Value::Array(internal.into_vec());
    if let Some(attributes) = &thing.attributes {
        document[FIELD_ATTRIBUTES] = escape_keys(&Value::Object(attributes.clone()));
    }
    if let Some(features) = &thing.features {
        document[FIELD_FEATURES] = features_document(features);
    }
    document
}

/// Condition on `__internal` entries whose key is `key` or below it.
pub fn key_condition(key: &str) -> Value {
    json!({ FIELD_INTERNAL_KEY: { "$regex": key_prefix_pattern(key) } })
}

/// Condition on `__internal` entries of one feature.
pub fn feature_condition(feature_id: &str) -> Value {
    json!({ FIELD_INTERNAL_FEATURE_ID: feature_id })
}

/// Condition on `__internal` entries of any feature.
pub fn any_feature_condition() -> Value {
    json!({ FIELD_INTERNAL_FEATURE_ID: { "$exists": true } })
}

/// Condition on `__internal` entries of one feature whose key is `key` or
/// below it.
pub fn feature_key_condition(feature_id: &str, key: &str) -> Value {
    json!({
        FIELD_INTERNAL_FEATURE_ID: feature_id,
        FIELD_INTERNAL_KEY: { "$regex": key_prefix_pattern(key) },
    })
}

/// Condition on the ACL entries of one subject, or of all subjects.
pub fn acl_condition(subject: Option<&str>) -> Value {
    match subject {
        Some(subject) => json!({ "$or": [{ FIELD_ACL: subject }, { FIELD_GRANTED: subject }] }),
        None => json!({ "$or": [
            { FIELD_ACL: { "$exists": true } },
            { FIELD_GRANTED: { "$exists": true } },
        ] }),
    }
}

/// Document path of a denormalized attribute.
pub fn attribute_path(pointer: &str) -> String {
    map_sort_key(&[FIELD_ATTRIBUTES, pointer])
}

/// Document path of a denormalized feature.
pub fn feature_path(feature_id: &str) -> String {
    format!("{}.{}", FIELD_FEATURES, escape_key(feature_id))
}

/// Document path of the denormalized properties of a feature, or of one
/// property when a pointer is given.
pub fn feature_properties_path(feature_id: &str, pointer: Option<&str>) -> String {
    let properties = format!("{}.{}", feature_path(feature_id), FIELD_PROPERTIES);
    match pointer {
        Some(pointer) => format!("{}.{}", properties, map_sort_key(&[pointer])),
        None => properties,
    }
}

/// Replaces the `__internal` entries matching `condition` by `entries` and
/// sets the denormalized field at `path`.
pub fn replace_entries(
    thing_id: &str,
    condition: Value,
    entries: Vec<Value>,
    path: &str,
    value: Value,
) -> Vec<DocumentUpdate> {
    vec![
        DocumentUpdate::UpdateOne {
            filter: by_thing_id(thing_id),
            update: json!({ "$pull": { FIELD_INTERNAL: condition } }),
            upsert: false,
        },
        DocumentUpdate::UpdateOne {
            filter: by_thing_id(thing_id),
            update: json!({
                "$push": { FIELD_INTERNAL: { "$each": entries } },
                "$set": { path: value },
            }),
            upsert: false,
        },
    ]
}

/// Removes the `__internal` entries matching `condition` and unsets the
/// denormalized field at `path`.
pub fn remove_entries(thing_id: &str, condition: Value, path: &str) -> Vec<DocumentUpdate> {
    vec![DocumentUpdate::UpdateOne {
        filter: by_thing_id(thing_id),
        update: json!({
            "$pull": { FIELD_INTERNAL: condition },
            "$unset": { path: "" },
        }),
        upsert: false,
    }]
}

/// Replaces the ACL entries matching `condition` by `entries`.
pub fn replace_acl_entries(
    thing_id: &str,
    condition: Value,
    entries: Vec<Value>,
) -> Vec<DocumentUpdate> {
    let mut updates = vec![DocumentUpdate::UpdateOne {
        filter: by_thing_id(thing_id),
        update: json!({ "$pull": { FIELD_INTERNAL: condition } }),
        upsert: false,
    }];
    if !entries.is_empty() {
        updates.push(DocumentUpdate::UpdateOne {
            filter: by_thing_id(thing_id),
            update: json!({ "$push": { FIELD_INTERNAL: { "$each": entries } } }),
            upsert: false,
        });
    }
    updates
}

/// Sets the revision of a thing document.
pub fn set_revision(thing_id: &str, revision: i64) -> DocumentUpdate {
    DocumentUpdate::UpdateOne {
        filter: by_thing_id(thing_id),
        update: json!({ "$set": { FIELD_REVISION: revision } }),
        upsert: false,
    }
}
