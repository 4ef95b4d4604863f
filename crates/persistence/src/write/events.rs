//! Thing events consumed by the index maintainer.
//!
//! Events arrive as JSON:
//!
//! ```json
//! {
//!   "type": "featurePropertyModified",
//!   "thingId": "org.example:lamp",
//!   "revision": 12,
//!   "schemaVersion": 2,
//!   "featureId": "light",
//!   "pointer": "brightness",
//!   "value": 80
//! }
//! ```

use std::collections::BTreeMap;
use std::fmt;

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use thingsearch_query::SchemaVersion;

/// Permissions of one subject in a v1 access control list.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AclEntry {
    /// Read permission.
    #[serde(rename = "READ", default)]
    pub read: bool,
    /// Write permission.
    #[serde(rename = "WRITE", default)]
    pub write: bool,
    /// Administrate permission.
    #[serde(rename = "ADMINISTRATE", default)]
    pub administrate: bool,
}

/// A v1 access control list keyed by subject ID.
pub type AccessControlList = BTreeMap<String, AclEntry>;

/// A feature of a thing.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Feature {
    /// The feature properties.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub properties: Option<Map<String, Value>>,
}

/// The searchable state of a thing.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Thing {
    /// ID of the governing policy (v2).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub policy_id: Option<String>,
    /// Access control list (v1).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub acl: Option<AccessControlList>,
    /// Attributes.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub attributes: Option<Map<String, Value>>,
    /// Features keyed by feature ID.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub features: Option<BTreeMap<String, Feature>>,
}

/// A change of a thing.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ThingEvent {
    /// ID of the changed thing.
    pub thing_id: String,
    /// Revision of the thing after the change.
    pub revision: i64,
    /// Schema version the change was issued with.
    #[serde(default)]
    pub schema_version: SchemaVersion,
    /// What changed.
    #[serde(flatten)]
    pub payload: ThingEventPayload,
}

impl ThingEvent {
    /// Creates an event.
    pub fn new(
        thing_id: impl Into<String>,
        revision: i64,
        schema_version: SchemaVersion,
        payload: ThingEventPayload,
    ) -> Self {
        Self {
            thing_id: thing_id.into(),
            revision,
            schema_version,
            payload,
        }
    }

    /// Returns the kind of this event.
    pub fn kind(&self) -> EventKind {
        self.payload.kind()
    }
}

/// The change carried by a [`ThingEvent`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "camelCase", rename_all_fields = "camelCase")]
#[allow(missing_docs)]
pub enum ThingEventPayload {
    ThingCreated {
        thing: Thing,
    },
    ThingModified {
        thing: Thing,
    },
    ThingDeleted,
    AclModified {
        acl: AccessControlList,
    },
    AclEntryCreated {
        subject: String,
        permissions: AclEntry,
    },
    AclEntryModified {
        subject: String,
        permissions: AclEntry,
    },
    AclEntryDeleted {
        subject: String,
    },
    AttributesCreated {
        attributes: Map<String, Value>,
    },
    AttributesModified {
        attributes: Map<String, Value>,
    },
    AttributesDeleted,
    AttributeCreated {
        pointer: String,
        value: Value,
    },
    AttributeModified {
        pointer: String,
        value: Value,
    },
    AttributeDeleted {
        pointer: String,
    },
    FeaturesCreated {
        features: BTreeMap<String, Feature>,
    },
    FeaturesModified {
        features: BTreeMap<String, Feature>,
    },
    FeaturesDeleted,
    FeatureCreated {
        feature_id: String,
        feature: Feature,
    },
    FeatureModified {
        feature_id: String,
        feature: Feature,
    },
    FeatureDeleted {
        feature_id: String,
    },
    FeaturePropertiesCreated {
        feature_id: String,
        properties: Map<String, Value>,
    },
    FeaturePropertiesModified {
        feature_id: String,
        properties: Map<String, Value>,
    },
    FeaturePropertiesDeleted {
        feature_id: String,
    },
    FeaturePropertyCreated {
        feature_id: String,
        pointer: String,
        value: Value,
    },
    FeaturePropertyModified {
        feature_id: String,
        pointer: String,
        value: Value,
    },
    FeaturePropertyDeleted {
        feature_id: String,
        pointer: String,
    },
}

impl ThingEventPayload {
    /// Returns the kind of this payload.
    pub fn kind(&self) -> EventKind {
        match self {
            ThingEventPayload::ThingCreated { .. } => EventKind::ThingCreated,
            ThingEventPayload::ThingModified { .. } => EventKind::ThingModified,
            ThingEventPayload::ThingDeleted => EventKind::ThingDeleted,
            ThingEventPayload::AclModified { .. } => EventKind::AclModified,
            ThingEventPayload::AclEntryCreated { .. } => EventKind::AclEntryCreated,
            ThingEventPayload::AclEntryModified { .. } => EventKind::AclEntryModified,
            ThingEventPayload::AclEntryDeleted { .. } => EventKind::AclEntryDeleted,
            ThingEventPayload::AttributesCreated { .. } => EventKind::AttributesCreated,
            ThingEventPayload::AttributesModified { .. } => EventKind::AttributesModified,
            ThingEventPayload::AttributesDeleted => EventKind::AttributesDeleted,
            ThingEventPayload::AttributeCreated { .. } => EventKind::AttributeCreated,
            ThingEventPayload::AttributeModified { .. } => EventKind::AttributeModified,
            ThingEventPayload::AttributeDeleted { .. } => EventKind::AttributeDeleted,
            ThingEventPayload::FeaturesCreated { .. } => EventKind::FeaturesCreated,
            ThingEventPayload::FeaturesModified { .. } => EventKind::FeaturesModified,
            ThingEventPayload::FeaturesDeleted => EventKind::FeaturesDeleted,
            ThingEventPayload::FeatureCreated { .. } => EventKind::FeatureCreated,
            ThingEventPayload::FeatureModified { .. } => EventKind::FeatureModified,
            ThingEventPayload::FeatureDeleted { .. } => EventKind::FeatureDeleted,
            ThingEventPayload::FeaturePropertiesCreated { .. } => {
                EventKind::FeaturePropertiesCreated
            }
            ThingEventPayload::FeaturePropertiesModified { .. } => {
                EventKind::FeaturePropertiesModified
            }
            ThingEventPayload::FeaturePropertiesDeleted { .. } => {
                EventKind::FeaturePropertiesDeleted
            }
            ThingEventPayload::FeaturePropertyCreated { .. } => EventKind::FeaturePropertyCreated,
            ThingEventPayload::FeaturePropertyModified { .. } => {
                EventKind::FeaturePropertyModified
            }
            ThingEventPayload::FeaturePropertyDeleted { .. } => EventKind::FeaturePropertyDeleted,
        }
    }
}

/// The type of a thing event, without its data.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[allow(missing_docs)]
pub enum EventKind {
    ThingCreated,
    ThingModified,
    ThingDeleted,
    AclModified,
    AclEntryCreated,
    AclEntryModified,
    AclEntryDeleted,
    AttributesCreated,
    AttributesModified,
    AttributesDeleted,
    AttributeCreated,
    AttributeModified,
    AttributeDeleted,
    FeaturesCreated,
    FeaturesModified,
    FeaturesDeleted,
    FeatureCreated,
    FeatureModified,
    FeatureDeleted,
    FeaturePropertiesCreated,
    FeaturePropertiesModified,
    FeaturePropertiesDeleted,
    FeaturePropertyCreated,
    FeaturePropertyModified,
    FeaturePropertyDeleted,
}

impl EventKind {
    /// All event kinds.
    pub const ALL: [EventKind; 25] = [
        EventKind::ThingCreated,
        EventKind::ThingModified,
        EventKind::ThingDeleted,
        EventKind::AclModified,
        EventKind::AclEntryCreated,
        EventKind::AclEntryModified,
        EventKind::AclEntryDeleted,
        EventKind::AttributesCreated,
        EventKind::AttributesModified,
        EventKind::AttributesDeleted,
        EventKind::AttributeCreated,
        EventKind::AttributeModified,
        EventKind::AttributeDeleted,
        EventKind::FeaturesCreated,
        EventKind::FeaturesModified,
        EventKind::FeaturesDeleted,
        EventKind::FeatureCreated,
        EventKind::FeatureModified,
        EventKind::FeatureDeleted,
        EventKind::FeaturePropertiesCreated,
        EventKind::FeaturePropertiesModified,
        EventKind::FeaturePropertiesDeleted,
        EventKind::FeaturePropertyCreated,
        EventKind::FeaturePropertyModified,
        EventKind::FeaturePropertyDeleted,
    ];

    /// Returns `true` for events that replace or remove the whole thing.
    pub fn is_whole_thing(self) -> bool {
        matches!(
            self,
            EventKind::ThingCreated | EventKind::ThingModified | EventKind::ThingDeleted
        )
    }
}

impl fmt::Display for EventKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Debug::fmt(self, f)
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    #[test]
    fn test_event_from_json() {
        let event: ThingEvent = serde_json::from_value(json!({
            "type": "featurePropertyModified",
            "thingId": "org.example:lamp",
            "revision": 12,
            "schemaVersion": 2,
            "featureId": "light",
            "pointer": "brightness",
            "value": 80
        }))
        .unwrap();

        assert_eq!(event.kind(), EventKind::FeaturePropertyModified);
        assert_eq!(event.schema_version, SchemaVersion::V_2);
        match event.payload {
            ThingEventPayload::FeaturePropertyModified {
                feature_id,
                pointer,
                value,
            } => {
                assert_eq!(feature_id, "light");
                assert_eq!(pointer, "brightness");
                assert_eq!(value, json!(80));
            }
            other => panic!("Expected feature property modified, got {:?}", other),
        }
    }

    #[test]
    fn test_thing_created_with_acl() {
        let event: ThingEvent = serde_json::from_value(json!({
            "type": "thingCreated",
            "thingId": "ns:t",
            "revision": 1,
            "schemaVersion": 1,
            "thing": {
                "acl": {"s1": {"READ": true, "WRITE": true}},
                "attributes": {"color": "red"}
            }
        }))
        .unwrap();

        match event.payload {
            ThingEventPayload::ThingCreated { thing } => {
                let acl = thing.acl.unwrap();
                assert!(acl["s1"].read);
                assert!(!acl["s1"].administrate);
            }
            other => panic!("Expected thing created, got {:?}", other),
        }
    }

    #[test]
    fn test_unit_payload_and_default_version() {
        let event: ThingEvent = serde_json::from_value(json!({
            "type": "thingDeleted",
            "thingId": "ns:t",
            "revision": 3
        }))
        .unwrap();
        assert_eq!(event.kind(), EventKind::ThingDeleted);
        assert_eq!(event.schema_version, SchemaVersion::default());
    }
}
