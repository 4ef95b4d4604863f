//! Sort and limit options.
//!
//! Option strings are comma-joined `sort(...)` and `limit(...)` directives.
//! Several requests may each carry an option string; [`QueryOptions`] folds
//! all of them into one normalized form.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::{QueryError, QueryResult};
use crate::expression::{SortField, ThingsFieldExpressionFactory};
use crate::rql::{RqlOption, RqlParser};

/// Sort direction of one sort key.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum SortDirection {
    /// Ascending (`+`).
    #[default]
    Ascending,
    /// Descending (`-`).
    Descending,
}

impl SortDirection {
    /// Returns the sign used in the MongoDB `$sort` stage.
    pub fn as_sign(self) -> i32 {
        match self {
            SortDirection::Ascending => 1,
            SortDirection::Descending => -1,
        }
    }
}

impl fmt::Display for SortDirection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SortDirection::Ascending => write!(f, "+"),
            SortDirection::Descending => write!(f, "-"),
        }
    }
}

impl FromStr for SortDirection {
    type Err = QueryError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "+" => Ok(SortDirection::Ascending),
            "-" => Ok(SortDirection::Descending),
            other => Err(QueryError::InvalidOption {
                message: format!("unknown sort direction '{}'", other),
                source: None,
            }),
        }
    }
}

/// One sort key: a sortable field and a direction.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SortEntry {
    /// The field to sort by.
    pub field: SortField,
    /// The direction.
    pub direction: SortDirection,
}

/// A single parsed option.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum QueryOption {
    /// Sort by the keys in order.
    Sort(Vec<SortEntry>),
    /// Skip `skip` results and return at most `count`.
    Limit { skip: u64, count: u64 },
}

/// Parses an option string into resolved options.
///
/// # Errors
///
/// Every failure, including syntax errors, unknown fields and fields that
/// cannot be sorted, is reported as [`QueryError::InvalidOption`] with the
/// original error attached as its source.
pub fn parse_options(text: &str) -> QueryResult<Vec<QueryOption>> {
    let factory = ThingsFieldExpressionFactory::new();
    let parsed = RqlParser::parse_options(text).map_err(QueryError::into_invalid_option)?;

    parsed
        .into_iter()
        .map(|option| match option {
            RqlOption::Sort(keys) => keys
                .into_iter()
                .map(|key| {
                    Ok(SortEntry {
                        field: factory.sort_by(&key.property)?,
                        direction: key.direction,
                    })
                })
                .collect::<QueryResult<Vec<_>>>()
                .map(QueryOption::Sort)
                .map_err(QueryError::into_invalid_option),
            RqlOption::Limit { skip, count } => Ok(QueryOption::Limit { skip, count }),
        })
        .collect()
}

/// The normalized sort keys and limit of a request.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct QueryOptions {
    /// Sort keys in precedence order, each field at most once.
    pub sort: Vec<SortEntry>,
    /// `(skip, count)` of the last `limit` option, if any.
    pub limit: Option<(u64, u64)>,
}

impl QueryOptions {
    /// Folds parsed options into their normalized form.
    ///
    /// Sort keys are concatenated; a field that was already seen keeps its
    /// first position and direction. The last limit wins.
    pub fn from_options(options: impl IntoIterator<Item = QueryOption>) -> Self {
        let mut normalized = QueryOptions::default();
        for option in options {
            match option {
                QueryOption::Sort(entries) => {
                    for entry in entries {
                        if !normalized.sort.iter().any(|seen| seen.field == entry.field) {
                            normalized.sort.push(entry);
                        }
                    }
                }
                QueryOption::Limit { skip, count } => normalized.limit = Some((skip, count)),
            }
        }
        normalized
    }

    /// Parses every option string and folds the result.
    ///
    /// Empty or blank strings are ignored.
    pub fn parse<S: AsRef<str>>(texts: &[S]) -> QueryResult<Self> {
        let mut options = Vec::new();
        for text in texts {
            let text = text.as_ref().trim();
            if !text.is_empty() {
                options.extend(parse_options(text)?);
            }
        }
        Ok(Self::from_options(options))
    }
}
