//! Resource Query Language (RQL) syntax.
//!
//! The parser produces a syntax tree whose leaves still carry raw property
//! paths. Resolving those paths into field expressions is the job of
//! [`crate::filter::QueryFilterCriteriaFactory`] and
//! [`crate::options::parse_options`].
//!
//! # Grammar
//!
//! ```text
//! query     = "and(" query ("," query)* ")"
//!           / "or(" query ("," query)* ")"
//!           / "not(" query ")"
//!           / compareOp "(" property "," value ")"
//!           / "in(" property ("," value)+ ")"
//!           / "exists(" property ")"
//! compareOp = "eq" / "ne" / "gt" / "ge" / "lt" / "le" / "like"
//! value     = string / number / "true" / "false" / "null"
//! options   = option ("," option)*
//! option    = "sort(" sortKey ("," sortKey)* ")" / "limit(" int "," int ")"
//! sortKey   = ("+" / "-") property
//! ```

mod parser;

pub use parser::{MAX_DEPTH, RqlParser};

use crate::criteria::Literal;
use crate::options::SortDirection;

/// Comparison operators taking exactly one value.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CompareOp {
    /// Equal
    Eq,
    /// Not equal
    Ne,
    /// Greater than
    Gt,
    /// Greater than or equal
    Ge,
    /// Less than
    Lt,
    /// Less than or equal
    Le,
    /// Wildcard match
    Like,
}

impl CompareOp {
    /// Parses an operator name.
    pub fn parse(name: &str) -> Option<Self> {
        match name {
            "eq" => Some(CompareOp::Eq),
            "ne" => Some(CompareOp::Ne),
            "gt" => Some(CompareOp::Gt),
            "ge" => Some(CompareOp::Ge),
            "lt" => Some(CompareOp::Lt),
            "le" => Some(CompareOp::Le),
            "like" => Some(CompareOp::Like),
            _ => None,
        }
    }
}

/// A parsed RQL filter.
#[derive(Debug, Clone, PartialEq)]
pub enum RqlNode {
    /// `and(...)`
    And(Vec<RqlNode>),
    /// `or(...)`
    Or(Vec<RqlNode>),
    /// `not(...)`
    Not(Box<RqlNode>),
    /// A single-value comparison.
    Compare {
        /// The comparison operator.
        op: CompareOp,
        /// The raw property path.
        property: String,
        /// The value compared against.
        value: Literal,
    },
    /// `in(property, value, ...)`
    In {
        /// The raw property path.
        property: String,
        /// The accepted values, in input order.
        values: Vec<Literal>,
    },
    /// `exists(property)`
    Exists {
        /// The raw property path.
        property: String,
    },
}

/// A parsed RQL option.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RqlOption {
    /// `sort(+a,-b)`
    Sort(Vec<RqlSortKey>),
    /// `limit(skip,count)`
    Limit {
        /// Number of results to skip.
        skip: u64,
        /// Maximum number of results to return.
        count: u64,
    },
}

/// One key of a `sort` option.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RqlSortKey {
    /// The raw property path.
    pub property: String,
    /// The direction given by the sign.
    pub direction: SortDirection,
}
