//! In-memory index store.
//!
//! Keeps the thing and policy collections as JSON documents and evaluates
//! the compiled pipelines and write batches with the same semantics the
//! document store gives them. Useful for tests and for replaying events
//! locally.
//!
//! # Example
//!
//! ```
//! use thingsearch_persistence::backends::memory::{InMemorySearchIndex, SearchOutcome};
//! use thingsearch_persistence::read::{SearchRequest, ThingSearchQueryCompiler};
//!
//! let index = InMemorySearchIndex::default();
//! let compiler = ThingSearchQueryCompiler::default();
//! let aggregation = compiler
//!     .compile(&SearchRequest::new(["subject"]).as_count())
//!     .unwrap();
//! assert_eq!(index.search(&aggregation).unwrap(), SearchOutcome::Count(0));
//! ```

pub mod matcher;
pub mod modifier;

use std::collections::BTreeMap;

use async_trait::async_trait;
use parking_lot::RwLock;
use serde_json::{Map, Value, json};
use tracing::{debug, warn};

use crate::config::SearchConfig;
use crate::error::{PersistenceError, PersistenceResult};
use crate::fields::{FIELD_COUNT, FIELD_ID, FIELD_THING_ID};
use crate::read::aggregation::{Aggregation, Stage};
use crate::write::executor::{PersistenceWriteExecutor, PersistenceWriteResult, WriteBatch};
use crate::write::updates::DocumentUpdate;

use self::matcher::{matches, resolve_path, sort_order};
use self::modifier::apply_update;

type Collection = BTreeMap<String, Value>;

/// Result of a search against the index.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SearchOutcome {
    /// IDs of the matching things in result order.
    Ids(Vec<String>),
    /// Number of matching things.
    Count(u64),
}

/// An index store holding both collections in memory.
#[derive(Debug)]
pub struct InMemorySearchIndex {
    config: SearchConfig,
    things: RwLock<Collection>,
    policies: RwLock<Collection>,
}

impl Default for InMemorySearchIndex {
    fn default() -> Self {
        Self::new(SearchConfig::default())
    }
}

impl InMemorySearchIndex {
    /// Creates an empty index using the collection names of `config`.
    pub fn new(config: SearchConfig) -> Self {
        Self {
            config,
            things: RwLock::new(BTreeMap::new()),
            policies: RwLock::new(BTreeMap::new()),
        }
    }

    /// Returns the index document of a thing.
    pub fn thing(&self, thing_id: &str) -> Option<Value> {
        self.things.read().get(thing_id).cloned()
    }

    /// Returns the number of indexed things.
    pub fn thing_count(&self) -> usize {
        self.things.read().len()
    }

    /// Returns the policy index entries of a thing, ordered by ID.
    pub fn policy_entries(&self, thing_id: &str) -> Vec<Value> {
        self.policies
            .read()
            .values()
            .filter(|entry| entry.get(FIELD_THING_ID).and_then(Value::as_str) == Some(thing_id))
            .cloned()
            .collect()
    }

    /// Runs a pipeline and returns the resulting documents.
    pub fn aggregate(&self, aggregation: &Aggregation) -> PersistenceResult<Vec<Value>> {
        let mut documents: Vec<Value> = self.things.read().values().cloned().collect();

        for stage in aggregation.stages() {
            documents = match stage {
                Stage::Match(filter) => {
                    let mut kept = Vec::with_capacity(documents.len());
                    for document in documents {
                        if matches(&document, filter)? {
                            kept.push(document);
                        }
                    }
                    kept
                }
                Stage::Lookup {
                    from,
                    local_field,
                    foreign_field,
                    as_field,
                } => self.lookup(documents, from, local_field, foreign_field, as_field)?,
                Stage::Sort(keys) => {
                    documents.sort_by(|left, right| {
                        keys.iter()
                            .map(|(path, direction)| {
                                let order =
                                    sort_order(resolve_path(left, path), resolve_path(right, path));
                                if direction.as_sign() < 0 {
                                    order.reverse()
                                } else {
                                    order
                                }
                            })
                            .find(|order| order.is_ne())
                            .unwrap_or(std::cmp::Ordering::Equal)
                    });
                    documents
                }
                Stage::Skip(n) => documents.into_iter().skip(as_count(*n)).collect(),
                Stage::Limit(n) => documents.into_iter().take(as_count(*n)).collect(),
                Stage::Count(field) => {
                    // no document at all for an empty input
                    if documents.is_empty() {
                        Vec::new()
                    } else {
                        vec![json!({ field.as_str(): documents.len() })]
                    }
                }
                Stage::Project(fields) => documents
                    .into_iter()
                    .map(|document| {
                        let projected: Map<String, Value> = fields
                            .iter()
                            .filter_map(|field| {
                                document.get(field).map(|value| (field.clone(), value.clone()))
                            })
                            .collect();
                        Value::Object(projected)
                    })
                    .collect(),
            };
        }
        Ok(documents)
    }

    /// Runs a pipeline and extracts thing IDs or the count.
    pub fn search(&self, aggregation: &Aggregation) -> PersistenceResult<SearchOutcome> {
        let documents = self.aggregate(aggregation)?;
        if aggregation.is_count() {
            let count = documents
                .first()
                .and_then(|document| document.get(FIELD_COUNT))
                .and_then(Value::as_u64)
                .unwrap_or(0);
            return Ok(SearchOutcome::Count(count));
        }
        Ok(SearchOutcome::Ids(
            documents
                .iter()
                .filter_map(|document| document.get(FIELD_ID).and_then(Value::as_str))
                .map(str::to_string)
                .collect(),
        ))
    }

    fn lookup(
        &self,
        documents: Vec<Value>,
        from: &str,
        local_field: &str,
        foreign_field: &str,
        as_field: &str,
    ) -> PersistenceResult<Vec<Value>> {
        let foreign = self.collection(from)?.read();
        documents
            .into_iter()
            .map(|mut document| {
                let local = resolve_path(&document, local_field).cloned();
                let joined: Vec<Value> = foreign
                    .values()
                    .filter(|entry| resolve_path(entry, foreign_field) == local.as_ref())
                    .cloned()
                    .collect();
                match &mut document {
                    Value::Object(map) => {
                        map.insert(as_field.to_string(), Value::Array(joined));
                        Ok(document)
                    }
                    other => Err(PersistenceError::backend(format!(
                        "cannot join onto non-document {}",
                        other
                    ))),
                }
            })
            .collect()
    }

    fn collection(&self, name: &str) -> PersistenceResult<&RwLock<Collection>> {
        if name == self.config.things_collection {
            Ok(&self.things)
        } else if name == self.config.policies_collection {
            Ok(&self.policies)
        } else {
            Err(PersistenceError::backend(format!(
                "unknown collection {}",
                name
            )))
        }
    }

    fn apply_batch(&self, batch: &WriteBatch) -> PersistenceResult<()> {
        let mut things_guard = self.things.write();
        let mut policies_guard = self.policies.write();

        // work on copies so a failing batch leaves the index untouched
        let mut things = things_guard.clone();
        let mut policies = policies_guard.clone();

        for update in &batch.thing_updates {
            apply(&mut things, update)?;
        }
        for update in &batch.policy_updates {
            apply(&mut policies, &update.to_document_update()?)?;
        }

        *things_guard = things;
        *policies_guard = policies;
        Ok(())
    }
}

#[async_trait]
impl PersistenceWriteExecutor for InMemorySearchIndex {
    async fn execute(&self, batch: WriteBatch) -> PersistenceWriteResult {
        match self.apply_batch(&batch) {
            Ok(()) => {
                debug!(
                    thing_id = %batch.thing_id,
                    revision = batch.revision,
                    "Applied write batch"
                );
                PersistenceWriteResult::ok()
            }
            Err(err) => {
                warn!(
                    thing_id = %batch.thing_id,
                    revision = batch.revision,
                    error = %err,
                    "Failed to apply write batch"
                );
                PersistenceWriteResult::failed(err)
            }
        }
    }
}

fn as_count(n: u64) -> usize {
    usize::try_from(n).unwrap_or(usize::MAX)
}

fn document_id(document: &Value) -> PersistenceResult<String> {
    document
        .get(FIELD_ID)
        .and_then(Value::as_str)
        .map(str::to_string)
        .ok_or_else(|| PersistenceError::backend(format!("document without string _id: {}", document)))
}

fn first_match(collection: &Collection, filter: &Value) -> PersistenceResult<Option<String>> {
    for (id, document) in collection {
        if matches(document, filter)? {
            return Ok(Some(id.clone()));
        }
    }
    Ok(None)
}

fn apply(collection: &mut Collection, update: &DocumentUpdate) -> PersistenceResult<()> {
    match update {
        DocumentUpdate::UpdateOne {
            filter,
            update,
            upsert,
        } => match first_match(collection, filter)? {
            Some(id) => {
                if let Some(document) = collection.get_mut(&id) {
                    apply_update(document, update)?;
                }
                Ok(())
            }
            None if *upsert => {
                let mut document = json!({ FIELD_ID: filter.get(FIELD_ID).cloned().unwrap_or(Value::Null) });
                apply_update(&mut document, update)?;
                collection.insert(document_id(&document)?, document);
                Ok(())
            }
            None => Ok(()),
        },
        DocumentUpdate::ReplaceOne {
            filter,
            replacement,
            upsert,
        } => {
            let existing = first_match(collection, filter)?;
            if existing.is_none() && !*upsert {
                return Ok(());
            }
            if let Some(id) = existing {
                collection.remove(&id);
            }
            collection.insert(document_id(replacement)?, replacement.clone());
            Ok(())
        }
        DocumentUpdate::DeleteOne { filter } => {
            if let Some(id) = first_match(collection, filter)? {
                collection.remove(&id);
            }
            Ok(())
        }
        DocumentUpdate::DeleteMany { filter } => {
            let mut removed = Vec::new();
            for (id, document) in collection.iter() {
                if matches(document, filter)? {
                    removed.push(id.clone());
                }
            }
            for id in removed {
                collection.remove(&id);
            }
            Ok(())
        }
    }
}
