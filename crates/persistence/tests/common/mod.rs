//! Test infrastructure for the thing search persistence layer.
//!
//! Provides an in-memory index wired to a translator, event fixtures and a
//! few search shortcuts.

#![allow(dead_code)]

use serde_json::{Value, json};

use thingsearch_persistence::backends::{InMemorySearchIndex, SearchOutcome};
use thingsearch_persistence::read::{SearchRequest, ThingSearchQueryCompiler};
use thingsearch_persistence::write::{EventTranslator, PolicyRules, ThingEvent, apply_event};
use thingsearch_persistence::SearchConfig;

/// An in-memory index together with the components writing to and reading
/// from it.
pub struct Harness {
    /// The index store.
    pub index: InMemorySearchIndex,
    /// Translates events for the index.
    pub translator: EventTranslator,
    /// Compiles search requests for the index.
    pub compiler: ThingSearchQueryCompiler,
    /// Policy rules applied to every event.
    pub rules: PolicyRules,
}

impl Harness {
    /// Creates a harness with the default configuration and the given rules.
    pub fn new(rules: PolicyRules) -> Self {
        let config = SearchConfig::default();
        Self {
            index: InMemorySearchIndex::new(config.clone()),
            translator: EventTranslator::new(&config),
            compiler: ThingSearchQueryCompiler::new(config),
            rules,
        }
    }

    /// Applies an event and asserts that it succeeded.
    pub async fn apply(&self, event: &ThingEvent) {
        let result = apply_event(&self.index, &self.translator, event, &self.rules).await;
        assert!(
            result.is_success(),
            "Applying {:?} should succeed, got {:?}",
            event.kind(),
            result.error()
        );
    }

    /// Applies an event given as JSON.
    pub async fn apply_json(&self, event: Value) {
        self.apply(&event_from_json(event)).await;
    }

    /// Runs a search and returns the matching thing IDs.
    pub fn search_ids(&self, request: &SearchRequest) -> Vec<String> {
        let aggregation = self
            .compiler
            .compile(request)
            .expect("Request should compile");
        match self.index.search(&aggregation).expect("Search should succeed") {
            SearchOutcome::Ids(ids) => ids,
            other => panic!("Expected IDs, got {:?}", other),
        }
    }

    /// Runs a count request.
    pub fn count(&self, request: SearchRequest) -> u64 {
        let aggregation = self
            .compiler
            .compile(&request.as_count())
            .expect("Request should compile");
        match self.index.search(&aggregation).expect("Search should succeed") {
            SearchOutcome::Count(count) => count,
            other => panic!("Expected a count, got {:?}", other),
        }
    }
}

/// Parses an event from JSON.
pub fn event_from_json(event: Value) -> ThingEvent {
    serde_json::from_value(event).expect("Event JSON should be valid")
}

/// A `thingCreated` event of schema version 2.
pub fn thing_created(thing_id: &str, thing: Value) -> ThingEvent {
    event_from_json(json!({
        "type": "thingCreated",
        "thingId": thing_id,
        "revision": 1,
        "schemaVersion": 2,
        "thing": thing
    }))
}

/// A lamp with a color attribute and two features.
pub fn lamp(color: &str, brightness: i64) -> Value {
    json!({
        "policyId": "org.example:policy",
        "attributes": {"color": color, "location": {"room": "kitchen"}},
        "features": {
            "light": {"properties": {"on": true, "brightness": brightness}},
            "sensor.1": {"properties": {"temp": 21.5}}
        }
    })
}

/// Rules granting read access on the whole thing to `subjects`.
pub fn readable_by(subjects: &[&str]) -> PolicyRules {
    PolicyRules::new().grant("thing:/", subjects.iter().copied())
}

/// Converts string slices into owned IDs for comparisons.
pub fn ids(values: &[&str]) -> Vec<String> {
    values.iter().map(|value| value.to_string()).collect()
}
