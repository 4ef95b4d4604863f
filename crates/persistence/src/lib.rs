//! Thing Search Persistence Layer
//!
//! This crate maps the typed query model of `thingsearch-query` onto a
//! document-store index and keeps that index in sync with thing events.
//!
//! # Features
//!
//! - **Query compilation**: search requests become MongoDB-shaped aggregation pipelines
//! - **Authorization**: every pipeline is filtered by v1 ACLs or v2 policy entries
//! - **Incremental indexing**: each thing event becomes an ordered batch of document updates
//! - **Index limits**: entries are kept within the store's key length budget
//!
//! # Architecture
//!
//! - [`config`] - Settings shared by the read and the write path
//! - [`error`] - Error types for all operations
//! - [`fields`] - Field names of the index documents
//! - [`keys`] - Key escaping and path construction
//! - [`read`] - Filter compilation, authorization and the aggregation builder
//! - [`write`] - Events, persistence strategies, policy updates and the executor
//! - [`backends`] - Index store implementations
//!
//! # Quick Start
//!
//! ```
//! use serde_json::json;
//! use thingsearch_persistence::backends::{InMemorySearchIndex, SearchOutcome};
//! use thingsearch_persistence::read::{SearchRequest, ThingSearchQueryCompiler};
//! use thingsearch_persistence::write::{EventTranslator, PolicyRules, ThingEvent, apply_event};
//! use thingsearch_persistence::SearchConfig;
//!
//! # tokio_test_block(async {
//! let config = SearchConfig::default();
//! let index = InMemorySearchIndex::new(config.clone());
//! let translator = EventTranslator::new(&config);
//! let rules = PolicyRules::new().grant("thing:/", ["subject"]);
//!
//! let event: ThingEvent = serde_json::from_value(json!({
//!     "type": "thingCreated",
//!     "thingId": "org.example:lamp",
//!     "revision": 1,
//!     "thing": {"attributes": {"color": "red"}}
//! }))
//! .unwrap();
//! assert!(apply_event(&index, &translator, &event, &rules).await.is_success());
//!
//! let compiler = ThingSearchQueryCompiler::new(config);
//! let request = SearchRequest::new(["subject"]).with_filter(r#"eq(attributes/color,"red")"#);
//! let aggregation = compiler.compile(&request).unwrap();
//! assert_eq!(
//!     index.search(&aggregation).unwrap(),
//!     SearchOutcome::Ids(vec!["org.example:lamp".to_string()])
//! );
//! # });
//! # fn tokio_test_block<F: std::future::Future>(future: F) -> F::Output {
//! #     tokio::runtime::Builder::new_current_thread().build().unwrap().block_on(future)
//! # }
//! ```

#![warn(missing_docs)]
#![warn(rustdoc::missing_crate_level_docs)]

pub mod backends;
pub mod config;
pub mod error;
pub mod fields;
pub mod keys;
pub mod read;
pub mod write;

// Re-export commonly used types
pub use config::SearchConfig;
pub use error::{PersistenceError, PersistenceResult};
pub use read::{Aggregation, AggregationBuilder, SearchRequest, Stage, ThingSearchQueryCompiler};
pub use write::{
    EventTranslator, PersistenceWriteExecutor, PersistenceWriteResult, PolicyEnforcer,
    PolicyRules, ThingEvent, WriteBatch,
};

/// Crate version.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Crate name.
pub const NAME: &str = env!("CARGO_PKG_NAME");
