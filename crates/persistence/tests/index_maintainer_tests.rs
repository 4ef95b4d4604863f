//! Tests for keeping the index in sync with thing events.

mod common;

use std::collections::BTreeSet;

use serde_json::{Map, Value, json};

use common::{Harness, event_from_json, ids, lamp, readable_by, thing_created};
use thingsearch_persistence::read::SearchRequest;
use thingsearch_persistence::write::{
    AclEntry, EventKind, EventTranslator, Feature, PolicyRules, Thing, ThingEvent,
    ThingEventPayload, strategy_for,
};
use thingsearch_persistence::SearchConfig;
use thingsearch_query::SchemaVersion;

// ============================================================================
// Helper Functions
// ============================================================================

fn properties(value: Value) -> Map<String, Value> {
    match value {
        Value::Object(map) => map,
        other => panic!("Expected an object, got {}", other),
    }
}

/// A payload of the given kind with small sample content.
fn sample_payload(kind: EventKind) -> ThingEventPayload {
    let feature = Feature {
        properties: Some(properties(json!({"on": true}))),
    };
    let thing = Thing {
        policy_id: Some("ns:policy".to_string()),
        attributes: Some(properties(json!({"color": "red"}))),
        ..Default::default()
    };
    let permissions = AclEntry {
        read: true,
        ..Default::default()
    };
    match kind {
        EventKind::ThingCreated => ThingEventPayload::ThingCreated { thing },
        EventKind::ThingModified => ThingEventPayload::ThingModified { thing },
        EventKind::ThingDeleted => ThingEventPayload::ThingDeleted,
        EventKind::AclModified => ThingEventPayload::AclModified {
            acl: [("s1".to_string(), permissions)].into_iter().collect(),
        },
        EventKind::AclEntryCreated => ThingEventPayload::AclEntryCreated {
            subject: "s1".to_string(),
            permissions,
        },
        EventKind::AclEntryModified => ThingEventPayload::AclEntryModified {
            subject: "s1".to_string(),
            permissions,
        },
        EventKind::AclEntryDeleted => ThingEventPayload::AclEntryDeleted {
            subject: "s1".to_string(),
        },
        EventKind::AttributesCreated => ThingEventPayload::AttributesCreated {
            attributes: properties(json!({"a": 1})),
        },
        EventKind::AttributesModified => ThingEventPayload::AttributesModified {
            attributes: properties(json!({"a": 1})),
        },
        EventKind::AttributesDeleted => ThingEventPayload::AttributesDeleted,
        EventKind::AttributeCreated => ThingEventPayload::AttributeCreated {
            pointer: "a".to_string(),
            value: json!(1),
        },
        EventKind::AttributeModified => ThingEventPayload::AttributeModified {
            pointer: "a".to_string(),
            value: json!(1),
        },
        EventKind::AttributeDeleted => ThingEventPayload::AttributeDeleted {
            pointer: "a".to_string(),
        },
        EventKind::FeaturesCreated => ThingEventPayload::FeaturesCreated {
            features: [("f".to_string(), feature)].into_iter().collect(),
        },
        EventKind::FeaturesModified => ThingEventPayload::FeaturesModified {
            features: [("f".to_string(), feature)].into_iter().collect(),
        },
        EventKind::FeaturesDeleted => ThingEventPayload::FeaturesDeleted,
        EventKind::FeatureCreated => ThingEventPayload::FeatureCreated {
            feature_id: "f".to_string(),
            feature,
        },
        EventKind::FeatureModified => ThingEventPayload::FeatureModified {
            feature_id: "f".to_string(),
            feature,
        },
        EventKind::FeatureDeleted => ThingEventPayload::FeatureDeleted {
            feature_id: "f".to_string(),
        },
        EventKind::FeaturePropertiesCreated => ThingEventPayload::FeaturePropertiesCreated {
            feature_id: "f".to_string(),
            properties: properties(json!({"on": true})),
        },
        EventKind::FeaturePropertiesModified => ThingEventPayload::FeaturePropertiesModified {
            feature_id: "f".to_string(),
            properties: properties(json!({"on": true})),
        },
        EventKind::FeaturePropertiesDeleted => ThingEventPayload::FeaturePropertiesDeleted {
            feature_id: "f".to_string(),
        },
        EventKind::FeaturePropertyCreated => ThingEventPayload::FeaturePropertyCreated {
            feature_id: "f".to_string(),
            pointer: "on".to_string(),
            value: json!(true),
        },
        EventKind::FeaturePropertyModified => ThingEventPayload::FeaturePropertyModified {
            feature_id: "f".to_string(),
            pointer: "on".to_string(),
            value: json!(true),
        },
        EventKind::FeaturePropertyDeleted => ThingEventPayload::FeaturePropertyDeleted {
            feature_id: "f".to_string(),
            pointer: "on".to_string(),
        },
    }
}

fn is_acl_kind(kind: EventKind) -> bool {
    matches!(
        kind,
        EventKind::AclModified
            | EventKind::AclEntryCreated
            | EventKind::AclEntryModified
            | EventKind::AclEntryDeleted
    )
}

fn entry_resources(harness: &Harness, thing_id: &str) -> BTreeSet<String> {
    harness
        .index
        .policy_entries(thing_id)
        .iter()
        .filter_map(|entry| entry["resource"].as_str().map(str::to_string))
        .collect()
}

// ============================================================================
// Policy Update Gating
// ============================================================================

/// Every sample payload reports the kind it was built for.
#[test]
fn test_sample_payloads_cover_all_kinds() {
    for kind in EventKind::ALL {
        assert_eq!(sample_payload(kind).kind(), kind);
    }
}

/// Events of schema version 1 never produce policy updates.
#[test]
fn test_v1_events_produce_no_policy_updates() {
    let rules = readable_by(&["s1"]);
    for kind in EventKind::ALL {
        let event = ThingEvent::new("ns:t", 2, SchemaVersion::V_1, sample_payload(kind));
        let updates = strategy_for(kind)
            .policy_updates(&event, &rules)
            .expect("Policy updates should succeed");
        assert!(updates.is_empty(), "{} should produce no policy updates", kind);
    }
}

/// From schema version 2 on, only ACL events are without policy updates.
#[test]
fn test_v2_policy_updates_skip_acl_events() {
    let rules = readable_by(&["s1"]);
    for kind in EventKind::ALL {
        let event = ThingEvent::new("ns:t", 2, SchemaVersion::V_2, sample_payload(kind));
        let updates = strategy_for(kind)
            .policy_updates(&event, &rules)
            .expect("Policy updates should succeed");
        assert_eq!(
            updates.is_empty(),
            is_acl_kind(kind),
            "Unexpected policy updates for {}",
            kind
        );
    }
}

/// Every translated batch of a partial event ends with a revision update.
#[test]
fn test_partial_batches_set_revision() {
    let translator = EventTranslator::new(&SearchConfig::default());
    let rules = PolicyRules::new();
    for kind in EventKind::ALL {
        let event = ThingEvent::new("ns:t", 7, SchemaVersion::V_2, sample_payload(kind));
        let batch = translator
            .translate(&event, &rules)
            .expect("Translation should succeed");
        let last = batch
            .thing_updates
            .last()
            .expect("Batch should have thing updates")
            .to_document();
        let sets_revision = last["updateOne"]["update"]["$set"]["_revision"] == json!(7);
        assert_eq!(sets_revision, !kind.is_whole_thing(), "{}", kind);
    }
}

// ============================================================================
// Applying Events
// ============================================================================

/// Applying the same feature deletion twice leaves the same document.
#[tokio::test]
async fn test_feature_deleted_is_idempotent() {
    let harness = Harness::new(readable_by(&["s1"]));
    harness.apply(&thing_created("ns:lamp", lamp("red", 50))).await;

    let deleted = event_from_json(json!({
        "type": "featureDeleted",
        "thingId": "ns:lamp",
        "revision": 2,
        "featureId": "light"
    }));
    harness.apply(&deleted).await;
    let once = harness.index.thing("ns:lamp").expect("Thing should exist");
    harness.apply(&deleted).await;
    let twice = harness.index.thing("ns:lamp").expect("Thing should exist");

    assert_eq!(once, twice);
    assert_eq!(once["_revision"], json!(2));
    assert!(once["features"].get("light").is_none());
    assert!(once["features"].get("sensor~11").is_some());
    let internal = once["__internal"].as_array().expect("Entries should exist");
    assert!(internal.iter().all(|entry| entry.get("f") != Some(&json!("light"))));
}

/// Modifying an attribute replaces its entries and is visible to search.
#[tokio::test]
async fn test_attribute_modification_is_searchable() {
    let harness = Harness::new(readable_by(&["s1"]));
    harness.apply(&thing_created("ns:lamp", lamp("red", 50))).await;

    harness
        .apply_json(json!({
            "type": "attributeModified",
            "thingId": "ns:lamp",
            "revision": 2,
            "pointer": "color",
            "value": "blue"
        }))
        .await;

    let red = SearchRequest::new(["s1"]).with_filter(r#"eq(attributes/color,"red")"#);
    let blue = SearchRequest::new(["s1"]).with_filter(r#"eq(attributes/color,"blue")"#);
    assert!(harness.search_ids(&red).is_empty());
    assert_eq!(harness.search_ids(&blue), ids(&["ns:lamp"]));

    let document = harness.index.thing("ns:lamp").expect("Thing should exist");
    assert_eq!(document["attributes"]["color"], json!("blue"));
    let color_entries = document["__internal"]
        .as_array()
        .expect("Entries should exist")
        .iter()
        .filter(|entry| entry.get("k") == Some(&json!("attributes/color")))
        .count();
    assert_eq!(color_entries, 1);
}

/// A deleted thing disappears from the index and its policy entries go too.
#[tokio::test]
async fn test_thing_deleted_removes_everything() {
    let harness = Harness::new(readable_by(&["s1"]));
    harness.apply(&thing_created("ns:lamp", lamp("red", 50))).await;
    assert!(!harness.index.policy_entries("ns:lamp").is_empty());

    harness
        .apply_json(json!({
            "type": "thingDeleted",
            "thingId": "ns:lamp",
            "revision": 2
        }))
        .await;

    assert!(harness.index.thing("ns:lamp").is_none());
    assert!(harness.index.policy_entries("ns:lamp").is_empty());
    assert_eq!(harness.count(SearchRequest::new(["s1"])), 0);
}

/// Partial events for unknown things change nothing.
#[tokio::test]
async fn test_partial_event_for_unknown_thing_is_ignored() {
    let harness = Harness::new(readable_by(&["s1"]));
    harness
        .apply_json(json!({
            "type": "attributeCreated",
            "thingId": "ns:ghost",
            "revision": 3,
            "pointer": "color",
            "value": "red"
        }))
        .await;
    assert_eq!(harness.index.thing_count(), 0);
}

// ============================================================================
// Authorization Data
// ============================================================================

/// A v1 thing is visible to subjects with READ in its ACL only.
#[tokio::test]
async fn test_v1_acl_controls_visibility() {
    let harness = Harness::new(PolicyRules::new());
    harness
        .apply_json(json!({
            "type": "thingCreated",
            "thingId": "ns:old",
            "revision": 1,
            "schemaVersion": 1,
            "thing": {
                "acl": {
                    "s1": {"READ": true, "WRITE": true},
                    "s2": {"READ": false, "WRITE": true}
                },
                "attributes": {"color": "red"}
            }
        }))
        .await;

    let request = |subject: &str| {
        SearchRequest::new([subject])
            .with_filter(r#"eq(attributes/color,"red")"#)
            .with_schema_version(SchemaVersion::V_1)
    };
    assert_eq!(harness.search_ids(&request("s1")), ids(&["ns:old"]));
    assert!(harness.search_ids(&request("s2")).is_empty());
    assert!(harness.search_ids(&request("s3")).is_empty());
    assert!(harness.index.policy_entries("ns:old").is_empty());
}

/// Deleting an ACL entry takes the subject's visibility away.
#[tokio::test]
async fn test_acl_entry_deleted_revokes_visibility() {
    let harness = Harness::new(PolicyRules::new());
    harness
        .apply_json(json!({
            "type": "thingCreated",
            "thingId": "ns:old",
            "revision": 1,
            "schemaVersion": 1,
            "thing": {"acl": {"s1": {"READ": true}, "s2": {"READ": true}}}
        }))
        .await;
    harness
        .apply_json(json!({
            "type": "aclEntryDeleted",
            "thingId": "ns:old",
            "revision": 2,
            "schemaVersion": 1,
            "subject": "s1"
        }))
        .await;

    let request = |subject: &str| {
        SearchRequest::new([subject]).with_schema_version(SchemaVersion::V_1)
    };
    assert!(harness.search_ids(&request("s1")).is_empty());
    assert_eq!(harness.search_ids(&request("s2")), ids(&["ns:old"]));
}

/// A v2 thing gets one policy entry per root, feature and leaf value.
#[tokio::test]
async fn test_policy_entries_are_written() {
    let harness = Harness::new(readable_by(&["s1"]).revoke("thing:/attributes/color", ["s2"]));
    harness.apply(&thing_created("ns:lamp", lamp("red", 50))).await;

    let expected: BTreeSet<String> = [
        "thing:/",
        "thing:/attributes/color",
        "thing:/attributes/location/room",
        "thing:/features/light",
        "thing:/features/light/properties/brightness",
        "thing:/features/light/properties/on",
        "thing:/features/sensor.1",
        "thing:/features/sensor.1/properties/temp",
    ]
    .into_iter()
    .map(str::to_string)
    .collect();
    assert_eq!(entry_resources(&harness, "ns:lamp"), expected);

    let color = harness
        .index
        .policy_entries("ns:lamp")
        .into_iter()
        .find(|entry| entry["resource"] == json!("thing:/attributes/color"))
        .expect("Color entry should exist");
    assert_eq!(color["_id"], json!("ns:lamp:thing:/attributes/color"));
    assert_eq!(color["gr"], json!(["s1"]));
    assert_eq!(color["rv"], json!(["s2"]));
}

/// Deleting a feature removes the policy entries below it.
#[tokio::test]
async fn test_feature_deleted_removes_policy_entries() {
    let harness = Harness::new(readable_by(&["s1"]));
    harness.apply(&thing_created("ns:lamp", lamp("red", 50))).await;
    harness
        .apply_json(json!({
            "type": "featureDeleted",
            "thingId": "ns:lamp",
            "revision": 2,
            "featureId": "light"
        }))
        .await;

    let resources = entry_resources(&harness, "ns:lamp");
    assert!(resources.contains("thing:/features/sensor.1/properties/temp"));
    assert!(
        resources
            .iter()
            .all(|resource| !resource.starts_with("thing:/features/light"))
    );
}
