//! Predicates, literals and the criteria tree.

use std::fmt;

use serde_json::{Number, Value};

use crate::expression::{ExistsField, FilterField};

/// A literal value of a filter predicate.
#[derive(Debug, Clone, PartialEq)]
pub enum Literal {
    /// `null`
    Null,
    /// `true` or `false`
    Bool(bool),
    /// An integer or floating point number.
    Number(Number),
    /// A string.
    String(String),
}

impl Literal {
    /// Converts the literal into its JSON representation.
    pub fn to_json(&self) -> Value {
        match self {
            Literal::Null => Value::Null,
            Literal::Bool(b) => Value::Bool(*b),
            Literal::Number(n) => Value::Number(n.clone()),
            Literal::String(s) => Value::String(s.clone()),
        }
    }
}

impl From<&str> for Literal {
    fn from(value: &str) -> Self {
        Literal::String(value.to_string())
    }
}

impl From<i64> for Literal {
    fn from(value: i64) -> Self {
        Literal::Number(value.into())
    }
}

impl From<bool> for Literal {
    fn from(value: bool) -> Self {
        Literal::Bool(value)
    }
}

impl fmt::Display for Literal {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.to_json())
    }
}

/// A comparison of a field against one or more literals.
#[derive(Debug, Clone, PartialEq)]
pub enum Predicate {
    /// Equal
    Eq(Literal),
    /// Not equal
    Ne(Literal),
    /// Greater than
    Gt(Literal),
    /// Greater than or equal
    Ge(Literal),
    /// Less than
    Lt(Literal),
    /// Less than or equal
    Le(Literal),
    /// Wildcard match: `*` matches any run of characters, `?` exactly one.
    Like(String),
    /// Equal to any of the literals.
    In(Vec<Literal>),
}

/// An immutable criteria tree.
///
/// Field references are typed, so a `Field` or `Exists` node can only hold
/// an expression that passed the matching capability check.
#[derive(Debug, Clone, PartialEq)]
pub enum Criteria {
    /// Matches if all children match.
    And(Vec<Criteria>),
    /// Matches if at least one child matches.
    Or(Vec<Criteria>),
    /// Matches if none of the children match. `not(q)` is `Nor([q])`.
    Nor(Vec<Criteria>),
    /// Matches everything.
    Any,
    /// Matches if the field is present.
    Exists(ExistsField),
    /// Matches if the field satisfies the predicate.
    Field(FilterField, Predicate),
}

impl Criteria {
    /// Creates a field criteria.
    pub fn field(field: FilterField, predicate: Predicate) -> Self {
        Criteria::Field(field, predicate)
    }

    /// Creates the negation of the given criteria.
    pub fn not(criteria: Criteria) -> Self {
        Criteria::Nor(vec![criteria])
    }

    /// Returns `true` if the tree contains a `Nor` node.
    pub fn contains_negation(&self) -> bool {
        match self {
            Criteria::Nor(_) => true,
            Criteria::And(children) | Criteria::Or(children) => {
                children.iter().any(Criteria::contains_negation)
            }
            Criteria::Any | Criteria::Exists(_) | Criteria::Field(..) => false,
        }
    }
}
