//! Per-event persistence strategies.
//!
//! Each event kind maps to one strategy that knows which part of the thing
//! index document and which policy index entries the event touches.
//! [`strategy_for`] resolves the strategy of an event kind.

use serde_json::{Map, Value};

use thingsearch_query::expression::THING_RESOURCE_PREFIX;

use crate::error::{PersistenceError, PersistenceResult};
use crate::fields::{FIELD_ATTRIBUTES, FIELD_FEATURES, KEY_FEATURE_PROPERTIES};
use crate::keys::escape_keys;
use crate::write::events::{EventKind, Feature, ThingEvent, ThingEventPayload};
use crate::write::index_length::IndexLengthRestrictionEnforcer;
use crate::write::permissions::PolicyEnforcer;
use crate::write::policy_update::{PolicyUpdate, PolicyUpdates};
use crate::write::updates::{
    DocumentUpdate, InternalEntries, acl_condition, any_feature_condition, attribute_key,
    attribute_path, by_thing_id, feature_condition, feature_document, feature_key_condition,
    feature_path, feature_properties_path, feature_property_key, features_document, key_condition,
    remove_entries, replace_acl_entries, replace_entries, thing_document,
};

/// Translates one kind of thing event into index updates.
pub trait EventToPersistenceStrategy: Send + Sync {
    /// Returns the updates of the thing index document, in order.
    fn thing_updates(
        &self,
        event: &ThingEvent,
        enforcer: &IndexLengthRestrictionEnforcer,
    ) -> PersistenceResult<Vec<DocumentUpdate>>;

    /// Returns the updates of the policy index.
    ///
    /// Events of schema versions without policies yield no updates.
    fn policy_updates(
        &self,
        event: &ThingEvent,
        policy_enforcer: &dyn PolicyEnforcer,
    ) -> PersistenceResult<Vec<PolicyUpdate>> {
        if !event.schema_version.is_policy_relevant() {
            return Ok(Vec::new());
        }
        self.relevant_policy_updates(event, policy_enforcer)
    }

    /// Returns the policy updates of a policy relevant event.
    fn relevant_policy_updates(
        &self,
        event: &ThingEvent,
        policy_enforcer: &dyn PolicyEnforcer,
    ) -> PersistenceResult<Vec<PolicyUpdate>>;
}

/// Returns the strategy handling events of `kind`.
pub fn strategy_for(kind: EventKind) -> &'static dyn EventToPersistenceStrategy {
    match kind {
        EventKind::ThingCreated | EventKind::ThingModified => &ThingReplacedStrategy,
        EventKind::ThingDeleted => &ThingDeletedStrategy,
        EventKind::AclModified => &AclModifiedStrategy,
        EventKind::AclEntryCreated | EventKind::AclEntryModified => &AclEntryChangedStrategy,
        EventKind::AclEntryDeleted => &AclEntryDeletedStrategy,
        EventKind::AttributesCreated | EventKind::AttributesModified => {
            &AttributesChangedStrategy
        }
        EventKind::AttributesDeleted => &AttributesDeletedStrategy,
        EventKind::AttributeCreated | EventKind::AttributeModified => &AttributeChangedStrategy,
        EventKind::AttributeDeleted => &AttributeDeletedStrategy,
        EventKind::FeaturesCreated | EventKind::FeaturesModified => &FeaturesChangedStrategy,
        EventKind::FeaturesDeleted => &FeaturesDeletedStrategy,
        EventKind::FeatureCreated | EventKind::FeatureModified => &FeatureChangedStrategy,
        EventKind::FeatureDeleted => &FeatureDeletedStrategy,
        EventKind::FeaturePropertiesCreated | EventKind::FeaturePropertiesModified => {
            &FeaturePropertiesChangedStrategy
        }
        EventKind::FeaturePropertiesDeleted => &FeaturePropertiesDeletedStrategy,
        EventKind::FeaturePropertyCreated | EventKind::FeaturePropertyModified => {
            &FeaturePropertyChangedStrategy
        }
        EventKind::FeaturePropertyDeleted => &FeaturePropertyDeletedStrategy,
    }
}

fn unexpected(event: &ThingEvent) -> PersistenceError {
    PersistenceError::malformed_event(
        &event.thing_id,
        format!("no persistence strategy handles {} here", event.kind()),
    )
}

fn attributes_resource() -> String {
    format!("{THING_RESOURCE_PREFIX}{}", FIELD_ATTRIBUTES)
}

fn attribute_resource(pointer: &str) -> String {
    format!("{THING_RESOURCE_PREFIX}{}", attribute_key(pointer))
}

fn features_resource() -> String {
    format!("{THING_RESOURCE_PREFIX}{}", FIELD_FEATURES)
}

fn feature_resource(feature_id: &str) -> String {
    format!("{THING_RESOURCE_PREFIX}{FIELD_FEATURES}/{feature_id}")
}

fn feature_properties_resource(feature_id: &str) -> String {
    format!("{}/properties", feature_resource(feature_id))
}

fn feature_property_resource(feature_id: &str, pointer: &str) -> String {
    format!(
        "{}/{}",
        feature_properties_resource(feature_id),
        pointer.trim_matches('/')
    )
}

fn upsert_attributes(updates: &mut PolicyUpdates<'_>, attributes: &Map<String, Value>) {
    for (key, value) in attributes {
        updates.upsert_leaves(&attribute_resource(key), value);
    }
}

fn upsert_feature(updates: &mut PolicyUpdates<'_>, feature_id: &str, feature: &Feature) {
    updates.upsert(&feature_resource(feature_id));
    if let Some(properties) = &feature.properties {
        upsert_feature_properties(updates, feature_id, properties);
    }
}

fn upsert_feature_properties(
    updates: &mut PolicyUpdates<'_>,
    feature_id: &str,
    properties: &Map<String, Value>,
) {
    for (key, value) in properties {
        updates.upsert_leaves(&feature_property_resource(feature_id, key), value);
    }
}

fn delete_only(event: &ThingEvent, resource: String) -> Vec<PolicyUpdate> {
    vec![PolicyUpdate::Delete {
        thing_id: event.thing_id.clone(),
        resource,
    }]
}

/// `thingCreated` and `thingModified` replace the whole document.
struct ThingReplacedStrategy;

impl EventToPersistenceStrategy for ThingReplacedStrategy {
    fn thing_updates(
        &self,
        event: &ThingEvent,
        enforcer: &IndexLengthRestrictionEnforcer,
    ) -> PersistenceResult<Vec<DocumentUpdate>> {
        let (ThingEventPayload::ThingCreated { thing } | ThingEventPayload::ThingModified { thing }) =
            &event.payload
        else {
            return Err(unexpected(event));
        };
        Ok(vec![DocumentUpdate::ReplaceOne {
            filter: by_thing_id(&event.thing_id),
            replacement: thing_document(&event.thing_id, event.revision, thing, enforcer),
            upsert: true,
        }])
    }

    fn relevant_policy_updates(
        &self,
        event: &ThingEvent,
        policy_enforcer: &dyn PolicyEnforcer,
    ) -> PersistenceResult<Vec<PolicyUpdate>> {
        let (ThingEventPayload::ThingCreated { thing } | ThingEventPayload::ThingModified { thing }) =
            &event.payload
        else {
            return Err(unexpected(event));
        };
        let mut updates =
            PolicyUpdates::replacing(&event.thing_id, THING_RESOURCE_PREFIX, policy_enforcer);
        updates.upsert(THING_RESOURCE_PREFIX);
        if let Some(attributes) = &thing.attributes {
            upsert_attributes(&mut updates, attributes);
        }
        for (feature_id, feature) in thing.features.iter().flatten() {
            upsert_feature(&mut updates, feature_id, feature);
        }
        Ok(updates.into_vec())
    }
}

struct ThingDeletedStrategy;

impl EventToPersistenceStrategy for ThingDeletedStrategy {
    fn thing_updates(
        &self,
        event: &ThingEvent,
        _enforcer: &IndexLengthRestrictionEnforcer,
    ) -> PersistenceResult<Vec<DocumentUpdate>> {
        Ok(vec![DocumentUpdate::DeleteOne {
            filter: by_thing_id(&event.thing_id),
        }])
    }

    fn relevant_policy_updates(
        &self,
        event: &ThingEvent,
        _policy_enforcer: &dyn PolicyEnforcer,
    ) -> PersistenceResult<Vec<PolicyUpdate>> {
        Ok(delete_only(event, THING_RESOURCE_PREFIX.to_string()))
    }
}

struct AclModifiedStrategy;

impl EventToPersistenceStrategy for AclModifiedStrategy {
    fn thing_updates(
        &self,
        event: &ThingEvent,
        enforcer: &IndexLengthRestrictionEnforcer,
    ) -> PersistenceResult<Vec<DocumentUpdate>> {
        let ThingEventPayload::AclModified { acl } = &event.payload else {
            return Err(unexpected(event));
        };
        let mut entries = InternalEntries::new(enforcer);
        entries.acl(acl);
        Ok(replace_acl_entries(
            &event.thing_id,
            acl_condition(None),
            entries.into_vec(),
        ))
    }

    fn relevant_policy_updates(
        &self,
        _event: &ThingEvent,
        _policy_enforcer: &dyn PolicyEnforcer,
    ) -> PersistenceResult<Vec<PolicyUpdate>> {
        Ok(Vec::new())
    }
}

struct AclEntryChangedStrategy;

impl EventToPersistenceStrategy for AclEntryChangedStrategy {
    fn thing_updates(
        &self,
        event: &ThingEvent,
        enforcer: &IndexLengthRestrictionEnforcer,
    ) -> PersistenceResult<Vec<DocumentUpdate>> {
        let (ThingEventPayload::AclEntryCreated {
            subject,
            permissions,
        }
        | ThingEventPayload::AclEntryModified {
            subject,
            permissions,
        }) = &event.payload
        else {
            return Err(unexpected(event));
        };
        let mut entries = InternalEntries::new(enforcer);
        entries.acl_entry(subject, permissions);
        Ok(replace_acl_entries(
            &event.thing_id,
            acl_condition(Some(subject.as_str())),
            entries.into_vec(),
        ))
    }

    fn relevant_policy_updates(
        &self,
        _event: &ThingEvent,
        _policy_enforcer: &dyn PolicyEnforcer,
    ) -> PersistenceResult<Vec<PolicyUpdate>> {
        Ok(Vec::new())
    }
}

struct AclEntryDeletedStrategy;

impl EventToPersistenceStrategy for AclEntryDeletedStrategy {
    fn thing_updates(
        &self,
        event: &ThingEvent,
        _enforcer: &IndexLengthRestrictionEnforcer,
    ) -> PersistenceResult<Vec<DocumentUpdate>> {
        let ThingEventPayload::AclEntryDeleted { subject } = &event.payload else {
            return Err(unexpected(event));
        };
        Ok(replace_acl_entries(
            &event.thing_id,
            acl_condition(Some(subject.as_str())),
            Vec::new(),
        ))
    }

    fn relevant_policy_updates(
        &self,
        _event: &ThingEvent,
        _policy_enforcer: &dyn PolicyEnforcer,
    ) -> PersistenceResult<Vec<PolicyUpdate>> {
        Ok(Vec::new())
    }
}

struct AttributesChangedStrategy;

impl EventToPersistenceStrategy for AttributesChangedStrategy {
    fn thing_updates(
        &self,
        event: &ThingEvent,
        enforcer: &IndexLengthRestrictionEnforcer,
    ) -> PersistenceResult<Vec<DocumentUpdate>> {
        let (ThingEventPayload::AttributesCreated { attributes }
        | ThingEventPayload::AttributesModified { attributes }) = &event.payload
        else {
            return Err(unexpected(event));
        };
        let mut entries = InternalEntries::new(enforcer);
        entries.attributes(attributes);
        Ok(replace_entries(
            &event.thing_id,
            key_condition(FIELD_ATTRIBUTES),
            entries.into_vec(),
            FIELD_ATTRIBUTES,
            escape_keys(&Value::Object(attributes.clone())),
        ))
    }

    fn relevant_policy_updates(
        &self,
        event: &ThingEvent,
        policy_enforcer: &dyn PolicyEnforcer,
    ) -> PersistenceResult<Vec<PolicyUpdate>> {
        let (ThingEventPayload::AttributesCreated { attributes }
        | ThingEventPayload::AttributesModified { attributes }) = &event.payload
        else {
            return Err(unexpected(event));
        };
        let mut updates =
            PolicyUpdates::replacing(&event.thing_id, &attributes_resource(), policy_enforcer);
        upsert_attributes(&mut updates, attributes);
        Ok(updates.into_vec())
    }
}

struct AttributesDeletedStrategy;

impl EventToPersistenceStrategy for AttributesDeletedStrategy {
    fn thing_updates(
        &self,
        event: &ThingEvent,
        _enforcer: &IndexLengthRestrictionEnforcer,
    ) -> PersistenceResult<Vec<DocumentUpdate>> {
        Ok(remove_entries(
            &event.thing_id,
            key_condition(FIELD_ATTRIBUTES),
            FIELD_ATTRIBUTES,
        ))
    }

    fn relevant_policy_updates(
        &self,
        event: &ThingEvent,
        _policy_enforcer: &dyn PolicyEnforcer,
    ) -> PersistenceResult<Vec<PolicyUpdate>> {
        Ok(delete_only(event, attributes_resource()))
    }
}

struct AttributeChangedStrategy;

impl EventToPersistenceStrategy for AttributeChangedStrategy {
    fn thing_updates(
        &self,
        event: &ThingEvent,
        enforcer: &IndexLengthRestrictionEnforcer,
    ) -> PersistenceResult<Vec<DocumentUpdate>> {
        let (ThingEventPayload::AttributeCreated { pointer, value }
        | ThingEventPayload::AttributeModified { pointer, value }) = &event.payload
        else {
            return Err(unexpected(event));
        };
        let mut entries = InternalEntries::new(enforcer);
        entries.attribute(pointer, value);
        Ok(replace_entries(
            &event.thing_id,
            key_condition(&attribute_key(pointer)),
            entries.into_vec(),
            &attribute_path(pointer),
            escape_keys(value),
        ))
    }

    fn relevant_policy_updates(
        &self,
        event: &ThingEvent,
        policy_enforcer: &dyn PolicyEnforcer,
    ) -> PersistenceResult<Vec<PolicyUpdate>> {
        let (ThingEventPayload::AttributeCreated { pointer, value }
        | ThingEventPayload::AttributeModified { pointer, value }) = &event.payload
        else {
            return Err(unexpected(event));
        };
        let resource = attribute_resource(pointer);
        let mut updates = PolicyUpdates::replacing(&event.thing_id, &resource, policy_enforcer);
        updates.upsert_leaves(&resource, value);
        Ok(updates.into_vec())
    }
}

struct AttributeDeletedStrategy;

impl EventToPersistenceStrategy for AttributeDeletedStrategy {
    fn thing_updates(
        &self,
        event: &ThingEvent,
        _enforcer: &IndexLengthRestrictionEnforcer,
    ) -> PersistenceResult<Vec<DocumentUpdate>> {
        let ThingEventPayload::AttributeDeleted { pointer } = &event.payload else {
            return Err(unexpected(event));
        };
        Ok(remove_entries(
            &event.thing_id,
            key_condition(&attribute_key(pointer)),
            &attribute_path(pointer),
        ))
    }

    fn relevant_policy_updates(
        &self,
        event: &ThingEvent,
        _policy_enforcer: &dyn PolicyEnforcer,
    ) -> PersistenceResult<Vec<PolicyUpdate>> {
        let ThingEventPayload::AttributeDeleted { pointer } = &event.payload else {
            return Err(unexpected(event));
        };
        Ok(delete_only(event, attribute_resource(pointer)))
    }
}

struct FeaturesChangedStrategy;

impl EventToPersistenceStrategy for FeaturesChangedStrategy {
    fn thing_updates(
        &self,
        event: &ThingEvent,
        enforcer: &IndexLengthRestrictionEnforcer,
    ) -> PersistenceResult<Vec<DocumentUpdate>> {
        let (ThingEventPayload::FeaturesCreated { features }
        | ThingEventPayload::FeaturesModified { features }) = &event.payload
        else {
            return Err(unexpected(event));
        };
        let mut entries = InternalEntries::new(enforcer);
        entries.features(features);
        Ok(replace_entries(
            &event.thing_id,
            any_feature_condition(),
            entries.into_vec(),
            FIELD_FEATURES,
            features_document(features),
        ))
    }

    fn relevant_policy_updates(
        &self,
        event: &ThingEvent,
        policy_enforcer: &dyn PolicyEnforcer,
    ) -> PersistenceResult<Vec<PolicyUpdate>> {
        let (ThingEventPayload::FeaturesCreated { features }
        | ThingEventPayload::FeaturesModified { features }) = &event.payload
        else {
            return Err(unexpected(event));
        };
        let mut updates =
            PolicyUpdates::replacing(&event.thing_id, &features_resource(), policy_enforcer);
        for (feature_id, feature) in features {
            upsert_feature(&mut updates, feature_id, feature);
        }
        Ok(updates.into_vec())
    }
}

struct FeaturesDeletedStrategy;

impl EventToPersistenceStrategy for FeaturesDeletedStrategy {
    fn thing_updates(
        &self,
        event: &ThingEvent,
        _enforcer: &IndexLengthRestrictionEnforcer,
    ) -> PersistenceResult<Vec<DocumentUpdate>> {
        Ok(remove_entries(
            &event.thing_id,
            any_feature_condition(),
            FIELD_FEATURES,
        ))
    }

    fn relevant_policy_updates(
        &self,
        event: &ThingEvent,
        _policy_enforcer: &dyn PolicyEnforcer,
    ) -> PersistenceResult<Vec<PolicyUpdate>> {
        Ok(delete_only(event, features_resource()))
    }
}

struct FeatureChangedStrategy;

impl EventToPersistenceStrategy for FeatureChangedStrategy {
    fn thing_updates(
        &self,
        event: &ThingEvent,
        enforcer: &IndexLengthRestrictionEnforcer,
    ) -> PersistenceResult<Vec<DocumentUpdate>> {
        let (ThingEventPayload::FeatureCreated {
            feature_id,
            feature,
        }
        | ThingEventPayload::FeatureModified {
            feature_id,
            feature,
        }) = &event.payload
        else {
            return Err(unexpected(event));
        };
        let mut entries = InternalEntries::new(enforcer);
        entries.feature(feature_id, feature);
        Ok(replace_entries(
            &event.thing_id,
            feature_condition(feature_id),
            entries.into_vec(),
            &feature_path(feature_id),
            feature_document(feature),
        ))
    }

    fn relevant_policy_updates(
        &self,
        event: &ThingEvent,
        policy_enforcer: &dyn PolicyEnforcer,
    ) -> PersistenceResult<Vec<PolicyUpdate>> {
        let (ThingEventPayload::FeatureCreated {
            feature_id,
            feature,
        }
        | ThingEventPayload::FeatureModified {
            feature_id,
            feature,
        }) = &event.payload
        else {
            return Err(unexpected(event));
        };
        let mut updates = PolicyUpdates::replacing(
            &event.thing_id,
            &feature_resource(feature_id),
            policy_enforcer,
        );
        upsert_feature(&mut updates, feature_id, feature);
        Ok(updates.into_vec())
    }
}

struct FeatureDeletedStrategy;

impl EventToPersistenceStrategy for FeatureDeletedStrategy {
    fn thing_updates(
        &self,
        event: &ThingEvent,
        _enforcer: &IndexLengthRestrictionEnforcer,
    ) -> PersistenceResult<Vec<DocumentUpdate>> {
        let ThingEventPayload::FeatureDeleted { feature_id } = &event.payload else {
            return Err(unexpected(event));
        };
        Ok(remove_entries(
            &event.thing_id,
            feature_condition(feature_id),
            &feature_path(feature_id),
        ))
    }

    fn relevant_policy_updates(
        &self,
        event: &ThingEvent,
        _policy_enforcer: &dyn PolicyEnforcer,
    ) -> PersistenceResult<Vec<PolicyUpdate>> {
        let ThingEventPayload::FeatureDeleted { feature_id } = &event.payload else {
            return Err(unexpected(event));
        };
        Ok(delete_only(event, feature_resource(feature_id)))
    }
}

struct FeaturePropertiesChangedStrategy;

impl EventToPersistenceStrategy for FeaturePropertiesChangedStrategy {
    fn thing_updates(
        &self,
        event: &ThingEvent,
        enforcer: &IndexLengthRestrictionEnforcer,
    ) -> PersistenceResult<Vec<DocumentUpdate>> {
        let (ThingEventPayload::FeaturePropertiesCreated {
            feature_id,
            properties,
        }
        | ThingEventPayload::FeaturePropertiesModified {
            feature_id,
            properties,
        }) = &event.payload
        else {
            return Err(unexpected(event));
        };
        let mut entries = InternalEntries::new(enforcer);
        entries.feature_properties(feature_id, properties);
        Ok(replace_entries(
            &event.thing_id,
            feature_key_condition(feature_id, KEY_FEATURE_PROPERTIES.trim_end_matches('/')),
            entries.into_vec(),
            &feature_properties_path(feature_id, None),
            escape_keys(&Value::Object(properties.clone())),
        ))
    }

    fn relevant_policy_updates(
        &self,
        event: &ThingEvent,
        policy_enforcer: &dyn PolicyEnforcer,
    ) -> PersistenceResult<Vec<PolicyUpdate>> {
        let (ThingEventPayload::FeaturePropertiesCreated {
            feature_id,
            properties,
        }
        | ThingEventPayload::FeaturePropertiesModified {
            feature_id,
            properties,
        }) = &event.payload
        else {
            return Err(unexpected(event));
        };
        let mut updates = PolicyUpdates::replacing(
            &event.thing_id,
            &feature_properties_resource(feature_id),
            policy_enforcer,
        );
        upsert_feature_properties(&mut updates, feature_id, properties);
        Ok(updates.into_vec())
    }
}

struct FeaturePropertiesDeletedStrategy;

impl EventToPersistenceStrategy for FeaturePropertiesDeletedStrategy {
    fn thing_updates(
        &self,
        event: &ThingEvent,
        _enforcer: &IndexLengthRestrictionEnforcer,
    ) -> PersistenceResult<Vec<DocumentUpdate>> {
        let ThingEventPayload::FeaturePropertiesDeleted { feature_id } = &event.payload else {
            return Err(unexpected(event));
        };
        Ok(remove_entries(
            &event.thing_id,
            feature_key_condition(feature_id, KEY_FEATURE_PROPERTIES.trim_end_matches('/')),
            &feature_properties_path(feature_id, None),
        ))
    }

    fn relevant_policy_updates(
        &self,
        event: &ThingEvent,
        _policy_enforcer: &dyn PolicyEnforcer,
    ) -> PersistenceResult<Vec<PolicyUpdate>> {
        let ThingEventPayload::FeaturePropertiesDeleted { feature_id } = &event.payload else {
            return Err(unexpected(event));
        };
        Ok(delete_only(event, feature_properties_resource(feature_id)))
    }
}

struct FeaturePropertyChangedStrategy;

impl EventToPersistenceStrategy for FeaturePropertyChangedStrategy {
    fn thing_updates(
        &self,
        event: &ThingEvent,
        enforcer: &IndexLengthRestrictionEnforcer,
    ) -> PersistenceResult<Vec<DocumentUpdate>> {
        let (ThingEventPayload::FeaturePropertyCreated {
            feature_id,
            pointer,
            value,
        }
        | ThingEventPayload::FeaturePropertyModified {
            feature_id,
            pointer,
            value,
        }) = &event.payload
        else {
            return Err(unexpected(event));
        };
        let mut entries = InternalEntries::new(enforcer);
        entries.feature_property(feature_id, pointer, value);
        Ok(replace_entries(
            &event.thing_id,
            feature_key_condition(feature_id, &feature_property_key(pointer)),
            entries.into_vec(),
            &feature_properties_path(feature_id, Some(pointer)),
            escape_keys(value),
        ))
    }

    fn relevant_policy_updates(
        &self,
        event: &ThingEvent,
        policy_enforcer: &dyn PolicyEnforcer,
    ) -> PersistenceResult<Vec<PolicyUpdate>> {
        let (ThingEventPayload::FeaturePropertyCreated {
            feature_id,
            pointer,
            value,
        }
        | ThingEventPayload::FeaturePropertyModified {
            feature_id,
            pointer,
            value,
        }) = &event.payload
        else {
            return Err(unexpected(event));
        };
        let resource = feature_property_resource(feature_id, pointer);
        let mut updates = PolicyUpdates::replacing(&event.thing_id, &resource, policy_enforcer);
        updates.upsert_leaves(&resource, value);
        Ok(updates.into_vec())
    }
}

struct FeaturePropertyDeletedStrategy;

impl EventToPersistenceStrategy for FeaturePropertyDeletedStrategy {
    fn thing_updates(
        &self,
        event: &ThingEvent,
        _enforcer: &IndexLengthRestrictionEnforcer,
    ) -> PersistenceResult<Vec<DocumentUpdate>> {
        let ThingEventPayload::FeaturePropertyDeleted {
            feature_id,
            pointer,
        } = &event.payload
        else {
            return Err(unexpected(event));
        };
        Ok(remove_entries(
            &event.thing_id,
            feature_key_condition(feature_id, &feature_property_key(pointer)),
            &feature_properties_path(feature_id, Some(pointer)),
        ))
    }

    fn relevant_policy_updates(
        &self,
        event: &ThingEvent,
        _policy_enforcer: &dyn PolicyEnforcer,
    ) -> PersistenceResult<Vec<PolicyUpdate>> {
        let ThingEventPayload::FeaturePropertyDeleted {
            feature_id,
            pointer,
        } = &event.payload
        else {
            return Err(unexpected(event));
        };
        Ok(delete_only(
            event,
            feature_property_resource(feature_id, pointer),
        ))
    }
}
