//! Thing Search Query Model
//!
//! This crate turns the textual search language of the thing search service
//! into typed, immutable query trees:
//!
//! - [`expression`] - field expressions, their capabilities and the path resolver
//! - [`criteria`] - predicates, literals and the criteria tree
//! - [`visitor`] - compositional interpreters over criteria trees
//! - [`rql`] - the RQL filter and option parser
//! - [`filter`] - criteria construction, optionally restricted to namespaces
//! - [`monotonicity`] - rejection of negation for newer schema versions
//! - [`options`] - sort and limit options
//! - [`version`] - the schema version threaded through every version-gated call
//! - [`error`] - typed query errors
//!
//! Everything here is pure. Nothing is cached and nothing is shared mutably;
//! trees are built per request and discarded after compilation.
//!
//! # Example
//!
//! ```
//! use thingsearch_query::{
//!     QueryFilterCriteriaFactory, SchemaVersion, monotonicity::ensure_monotonicity,
//! };
//!
//! let factory = QueryFilterCriteriaFactory::new();
//! let criteria = factory
//!     .filter_criteria(Some(r#"and(eq(attributes/color,"red"),exists(features/lamp))"#))
//!     .unwrap();
//! assert!(ensure_monotonicity(&criteria, SchemaVersion::V_2).is_ok());
//!
//! let negated = factory
//!     .filter_criteria(Some(r#"not(eq(attributes/color,"red"))"#))
//!     .unwrap();
//! assert!(ensure_monotonicity(&negated, SchemaVersion::V_2).is_err());
//! ```

#![warn(missing_docs)]
#![warn(rustdoc::missing_crate_level_docs)]

pub mod criteria;
pub mod error;
pub mod expression;
pub mod filter;
pub mod monotonicity;
pub mod options;
pub mod rql;
pub mod version;
pub mod visitor;

pub use criteria::{Criteria, Literal, Predicate};
pub use error::{ErrorDescription, QueryError, QueryResult};
pub use expression::{
    Capability, ExistsField, FieldExpression, FilterField, SortField, ThingsFieldExpressionFactory,
};
pub use filter::QueryFilterCriteriaFactory;
pub use options::{QueryOption, QueryOptions, SortDirection, SortEntry};
pub use version::SchemaVersion;
pub use visitor::CriteriaVisitor;
