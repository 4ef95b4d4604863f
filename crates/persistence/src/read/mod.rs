//! The read path: compiling search requests into aggregation pipelines.
//!
//! [`ThingSearchQueryCompiler`] is the entry point. It parses the filter,
//! enforces monotonicity, normalizes options and hands everything to the
//! [`AggregationBuilder`].

pub mod aggregation;
pub mod filter;
pub mod query;
pub mod resources;

pub use aggregation::{Aggregation, AggregationBuilder, Stage};
pub use filter::compile_filter;
pub use query::{SearchRequest, ThingSearchQueryCompiler};
pub use resources::referenced_resources;
