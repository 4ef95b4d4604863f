//! Aggregation pipelines and their builder.
//!
//! A search compiles into this pipeline against the thing index:
//!
//! 1. unless sudo, `$lookup` of the policy index entries of each thing
//! 2. `$match` of the compiled filter, joined with the authorization clause
//!    unless sudo
//! 3. `$sort` per the sort options, `_id` ascending as tie breaker
//! 4. `$skip` and `$limit`, or `$count` for count requests
//! 5. `$project` of `_id` for non-count requests
//!
//! The authorization clause accepts a thing if one of the requesting
//! subjects is in its v1 ACL, or if for every resource the filter refers to
//! (the root `thing:/` when it refers to none) a policy entry at or below
//! that resource grants read access to one of the subjects without revoking
//! it for any of them.

use std::collections::BTreeSet;

use serde_json::{Map, Value, json};
use thingsearch_query::expression::THING_RESOURCE_PREFIX;
use thingsearch_query::{
    Criteria, FieldExpression, QueryError, QueryOptions, QueryResult, SortDirection, SortField,
};

use crate::config::SearchConfig;
use crate::fields::{
    FIELD_ACL, FIELD_COUNT, FIELD_GRANTED, FIELD_ID, FIELD_INTERNAL, FIELD_POLICIES,
    FIELD_RESOURCE, FIELD_REVOKED, FIELD_THING_ID,
};
use crate::keys::{map_sort_key, resource_prefix_pattern};
use crate::read::filter::{compile_filter, match_nothing};
use crate::read::resources::referenced_resources;

/// One stage of an aggregation pipeline.
#[derive(Debug, Clone, PartialEq)]
pub enum Stage {
    /// `$match`
    Match(Value),
    /// `$lookup`
    Lookup {
        from: String,
        local_field: String,
        foreign_field: String,
        as_field: String,
    },
    /// `$sort` by document paths in order.
    Sort(Vec<(String, SortDirection)>),
    /// `$skip`
    Skip(u64),
    /// `$limit`
    Limit(u64),
    /// `$count` into the named field.
    Count(String),
    /// `$project` of the named fields.
    Project(Vec<String>),
}

impl Stage {
    /// Renders the stage as a MongoDB pipeline document.
    pub fn to_document(&self) -> Value {
        match self {
            Stage::Match(filter) => json!({ "$match": filter }),
            Stage::Lookup {
                from,
                local_field,
                foreign_field,
                as_field,
            } => json!({
                "$lookup": {
                    "from": from,
                    "localField": local_field,
                    "foreignField": foreign_field,
                    "as": as_field,
                }
            }),
            Stage::Sort(keys) => {
                let sort: Map<String, Value> = keys
                    .iter()
                    .map(|(path, direction)| (path.clone(), json!(direction.as_sign())))
                    .collect();
                json!({ "$sort": sort })
            }
            Stage::Skip(n) => json!({ "$skip": n }),
            Stage::Limit(n) => json!({ "$limit": n }),
            Stage::Count(field) => json!({ "$count": field }),
            Stage::Project(fields) => {
                let projection: Map<String, Value> =
                    fields.iter().map(|field| (field.clone(), json!(1))).collect();
                json!({ "$project": projection })
            }
        }
    }
}

/// An immutable, fully built aggregation.
#[derive(Debug, Clone, PartialEq)]
pub struct Aggregation {
    stages: Vec<Stage>,
    count: bool,
    sudo: bool,
    authorized_subject_ids: BTreeSet<String>,
}

impl Aggregation {
    /// Returns the pipeline stages in execution order.
    pub fn stages(&self) -> &[Stage] {
        &self.stages
    }

    /// Returns `true` if the pipeline counts instead of listing things.
    pub fn is_count(&self) -> bool {
        self.count
    }

    /// Returns `true` if the pipeline skips authorization.
    pub fn is_sudo(&self) -> bool {
        self.sudo
    }

    /// Returns the subjects the pipeline was authorized for.
    pub fn authorized_subject_ids(&self) -> &BTreeSet<String> {
        &self.authorized_subject_ids
    }

    /// Renders the pipeline as MongoDB documents.
    pub fn to_pipeline(&self) -> Vec<Value> {
        self.stages.iter().map(Stage::to_document).collect()
    }
}

/// Accumulates the parts of an aggregation; [`AggregationBuilder::build`]
/// checks them and produces the immutable [`Aggregation`].
#[derive(Debug, Clone)]
pub struct AggregationBuilder<'a> {
    config: &'a SearchConfig,
    criteria: Criteria,
    authorized_subject_ids: BTreeSet<String>,
    sudo: bool,
    count: bool,
    options: QueryOptions,
}

impl<'a> AggregationBuilder<'a> {
    /// Starts a builder for the given criteria.
    pub fn new(config: &'a SearchConfig, criteria: Criteria) -> Self {
        Self {
            config,
            criteria,
            authorized_subject_ids: BTreeSet::new(),
            sudo: false,
            count: false,
            options: QueryOptions::default(),
        }
    }

    /// Adds subjects the request is authorized for.
    pub fn authorization_subjects<I, S>(mut self, subjects: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.authorized_subject_ids
            .extend(subjects.into_iter().map(Into::into));
        self
    }

    /// Sets whether authorization is skipped.
    pub fn sudo(mut self, sudo: bool) -> Self {
        self.sudo = sudo;
        self
    }

    /// Sets whether matching things are counted instead of listed.
    pub fn count(mut self, count: bool) -> Self {
        self.count = count;
        self
    }

    /// Sets the normalized sort and limit options.
    pub fn options(mut self, options: QueryOptions) -> Self {
        self.options = options;
        self
    }

    /// Builds the aggregation.
    ///
    /// # Errors
    ///
    /// Returns [`QueryError::InvalidOption`] if the limit count is zero or
    /// exceeds the configured maximum page size. Count requests ignore the
    /// options entirely.
    pub fn build(self) -> QueryResult<Aggregation> {
        let (skip, limit) = if self.count { (0, 0) } else { self.page()? };
        let filter = compile_filter(&self.criteria);

        let mut stages = Vec::new();
        if self.sudo {
            stages.push(Stage::Match(filter));
        } else {
            stages.push(Stage::Lookup {
                from: self.config.policies_collection.clone(),
                local_field: FIELD_ID.to_string(),
                foreign_field: FIELD_THING_ID.to_string(),
                as_field: FIELD_POLICIES.to_string(),
            });
            let authorization = authorization_filter(
                &referenced_resources(&self.criteria),
                &self.authorized_subject_ids,
            );
            stages.push(Stage::Match(json!({ "$and": [filter, authorization] })));
        }

        if self.count {
            stages.push(Stage::Count(FIELD_COUNT.to_string()));
        } else {
            stages.push(Stage::Sort(self.sort_keys()));
            if skip > 0 {
                stages.push(Stage::Skip(skip));
            }
            stages.push(Stage::Limit(limit));
            stages.push(Stage::Project(vec![FIELD_ID.to_string()]));
        }

        Ok(Aggregation {
            stages,
            count: self.count,
            sudo: self.sudo,
            authorized_subject_ids: self.authorized_subject_ids,
        })
    }

    fn page(&self) -> QueryResult<(u64, u64)> {
        let Some((skip, count)) = self.options.limit else {
            return Ok((0, self.config.default_page_size));
        };
        if count == 0 || count > self.config.max_page_size {
            return Err(QueryError::InvalidOption {
                message: format!(
                    "limit count {} is out of range; it must be between 1 and {}",
                    count, self.config.max_page_size
                ),
                source: None,
            });
        }
        Ok((skip, count))
    }

    fn sort_keys(&self) -> Vec<(String, SortDirection)> {
        let mut keys: Vec<(String, SortDirection)> = Vec::new();
        for entry in &self.options.sort {
            let path = sort_path(&entry.field);
            if !keys.iter().any(|(seen, _)| *seen == path) {
                keys.push((path, entry.direction));
            }
        }
        if !keys.iter().any(|(path, _)| path == FIELD_ID) {
            keys.push((FIELD_ID.to_string(), SortDirection::Ascending));
        }
        keys
    }
}

/// Document path of a sort field.
pub fn sort_path(field: &SortField) -> String {
    match field.expression() {
        FieldExpression::ThingId => FIELD_ID.to_string(),
        FieldExpression::Attribute(key) => map_sort_key(&["attributes", key.as_str()]),
        FieldExpression::FeatureIdProperty {
            feature_id,
            property,
        } => map_sort_key(&[
            "features",
            feature_id.as_str(),
            "properties",
            property.as_str(),
        ]),
        other => map_sort_key(&[other.path()]),
    }
}

/// Builds the authorization clause for the given resources and subjects.
///
/// An empty subject set matches nothing.
///
/// Resources are checked independently of the values that matched the
/// filter. A `features/*/properties/p` filter is therefore authorized by any
/// readable feature, even when the matching value lives under a feature the
/// subjects cannot read.
pub fn authorization_filter(resources: &BTreeSet<String>, subjects: &BTreeSet<String>) -> Value {
    if subjects.is_empty() {
        return match_nothing();
    }

    let subjects: Vec<&String> = subjects.iter().collect();
    let acl_clause = json!({
        FIELD_INTERNAL: { "$elemMatch": { FIELD_ACL: { "$in": subjects } } }
    });

    let root = [THING_RESOURCE_PREFIX.to_string()];
    let resources: Vec<&String> = if resources.is_empty() {
        root.iter().collect()
    } else {
        resources.iter().collect()
    };

    let policy_clauses: Vec<Value> = resources
        .into_iter()
        .map(|resource| {
            json!({
                FIELD_POLICIES: {
                    "$elemMatch": {
                        FIELD_RESOURCE: { "$regex": resource_prefix_pattern(resource) },
                        FIELD_GRANTED: { "$in": subjects },
                        FIELD_REVOKED: { "$nin": subjects },
                    }
                }
            })
        })
        .collect();

    json!({ "$or": [acl_clause, { "$and": policy_clauses }] })
}
