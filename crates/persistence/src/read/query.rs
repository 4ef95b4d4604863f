//! Compilation of search requests into aggregations.

use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use thingsearch_query::monotonicity::ensure_monotonicity;
use thingsearch_query::{QueryFilterCriteriaFactory, QueryOptions, QueryResult, SchemaVersion};

use crate::config::SearchConfig;
use crate::read::aggregation::{Aggregation, AggregationBuilder};

/// A search or count request as received from a caller.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct SearchRequest {
    /// RQL filter; absent or blank matches every thing.
    pub filter: Option<String>,
    /// Option strings, each a comma-joined list of `sort`/`limit` options.
    pub options: Option<Vec<String>>,
    /// Namespaces the search is restricted to.
    pub namespaces: Option<BTreeSet<String>>,
    /// Subjects the requester acts as.
    pub authorized_subject_ids: BTreeSet<String>,
    /// Schema version the request was issued with.
    pub schema_version: SchemaVersion,
    /// Skip authorization; reserved for internal callers.
    pub sudo: bool,
    /// Count matching things instead of listing them.
    pub count: bool,
}

impl SearchRequest {
    /// Creates a request matching every thing, for the given subjects.
    pub fn new<I, S>(subjects: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            authorized_subject_ids: subjects.into_iter().map(Into::into).collect(),
            ..Default::default()
        }
    }

    /// Sets the RQL filter.
    pub fn with_filter(mut self, filter: impl Into<String>) -> Self {
        self.filter = Some(filter.into());
        self
    }

    /// Appends an option string.
    pub fn with_option(mut self, option: impl Into<String>) -> Self {
        self.options.get_or_insert_with(Vec::new).push(option.into());
        self
    }

    /// Restricts the search to the given namespaces.
    pub fn with_namespaces<I, S>(mut self, namespaces: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.namespaces = Some(namespaces.into_iter().map(Into::into).collect());
        self
    }

    /// Sets the schema version.
    pub fn with_schema_version(mut self, version: SchemaVersion) -> Self {
        self.schema_version = version;
        self
    }

    /// Marks the request as sudo.
    pub fn as_sudo(mut self) -> Self {
        self.sudo = true;
        self
    }

    /// Marks the request as a count request.
    pub fn as_count(mut self) -> Self {
        self.count = true;
        self
    }
}

/// Compiles [`SearchRequest`]s into [`Aggregation`]s.
#[derive(Debug, Clone, Default)]
pub struct ThingSearchQueryCompiler {
    config: SearchConfig,
    criteria_factory: QueryFilterCriteriaFactory,
}

impl ThingSearchQueryCompiler {
    /// Creates a compiler with the given configuration.
    pub fn new(config: SearchConfig) -> Self {
        Self {
            config,
            criteria_factory: QueryFilterCriteriaFactory::new(),
        }
    }

    /// Returns the configuration.
    pub fn config(&self) -> &SearchConfig {
        &self.config
    }

    /// Compiles a request.
    ///
    /// The filter is parsed (and restricted to the request's namespaces, if
    /// any), checked for monotonicity unless the request is sudo, combined
    /// with the parsed options and handed to the [`AggregationBuilder`].
    /// Count requests ignore options.
    pub fn compile(&self, request: &SearchRequest) -> QueryResult<Aggregation> {
        match self.try_compile(request) {
            Ok(aggregation) => {
                debug!(
                    filter = ?request.filter,
                    schema_version = %request.schema_version,
                    sudo = request.sudo,
                    count = request.count,
                    stages = aggregation.stages().len(),
                    "Compiled search request"
                );
                Ok(aggregation)
            }
            Err(err) => {
                warn!(
                    filter = ?request.filter,
                    error_code = err.error_code(),
                    error = %err,
                    "Rejected search request"
                );
                Err(err)
            }
        }
    }

    fn try_compile(&self, request: &SearchRequest) -> QueryResult<Aggregation> {
        let filter = request.filter.as_deref();
        let criteria = match &request.namespaces {
            Some(namespaces) => self
                .criteria_factory
                .filter_criteria_restricted_by_namespaces(filter, namespaces)?,
            None => self.criteria_factory.filter_criteria(filter)?,
        };

        if !request.sudo {
            ensure_monotonicity(&criteria, request.schema_version)?;
        }

        let options = if request.count {
            QueryOptions::default()
        } else {
            QueryOptions::parse(request.options.as_deref().unwrap_or_default())?
        };

        AggregationBuilder::new(&self.config, criteria)
            .authorization_subjects(request.authorized_subject_ids.iter().cloned())
            .sudo(request.sudo)
            .count(request.count)
            .options(options)
            .build()
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;
    use thingsearch_query::QueryError;

    use super::*;
    use crate::read::aggregation::Stage;

    #[test]
    fn test_request_json_shape() {
        let request: SearchRequest = serde_json::from_value(json!({
            "filter": "eq(attributes/a,1)",
            "options": ["limit(0,10)"],
            "authorizedSubjectIds": ["s1"],
            "schemaVersion": 1,
        }))
        .unwrap();
        assert_eq!(request.schema_version, SchemaVersion::V_1);
        assert!(!request.sudo);
        assert_eq!(request.namespaces, None);
    }

    #[test]
    fn test_negation_rejected_for_v2_but_not_for_sudo() {
        let compiler = ThingSearchQueryCompiler::default();
        let request = SearchRequest::new(["s1"]).with_filter("not(eq(attributes/a,1))");

        assert!(matches!(
            compiler.compile(&request),
            Err(QueryError::NegationNotAllowed { .. })
        ));
        assert!(compiler.compile(&request.clone().as_sudo()).is_ok());
        assert!(
            compiler
                .compile(&request.with_schema_version(SchemaVersion::V_1))
                .is_ok()
        );
    }

    #[test]
    fn test_invalid_options_are_reported() {
        let compiler = ThingSearchQueryCompiler::default();
        let request = SearchRequest::new(["s1"]).with_option("sort(+_namespace)");
        assert!(matches!(
            compiler.compile(&request),
            Err(QueryError::InvalidOption { .. })
        ));
    }

    #[test]
    fn test_count_ignores_options() {
        let compiler = ThingSearchQueryCompiler::default();
        let request = SearchRequest::new(["s1"])
            .with_option("limit(0,5000)")
            .as_count();
        let aggregation = compiler.compile(&request).unwrap();
        assert!(aggregation.is_count());
        assert!(matches!(aggregation.stages().last(), Some(Stage::Count(_))));
    }

    #[test]
    fn test_namespace_restriction_is_compiled() {
        let compiler = ThingSearchQueryCompiler::default();
        let request = SearchRequest::new(["s1"])
            .with_namespaces(["org.a"])
            .as_sudo();
        let aggregation = compiler.compile(&request).unwrap();
        assert_eq!(
            aggregation.stages()[0],
            Stage::Match(json!({"$and": [
                {"$or": [{"_id": {"$regex": "^org\\.a:.*$"}}]},
                {}
            ]}))
        );
    }
}
