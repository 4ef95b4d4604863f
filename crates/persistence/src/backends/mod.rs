//! Index store implementations.
//!
//! The core produces store-neutral pipelines ([`crate::read::Aggregation`])
//! and write batches ([`crate::write::WriteBatch`]); a backend evaluates
//! them.
//!
//! # Available Backends
//!
//! | Backend | Description |
//! |---------|-------------|
//! | [`memory`] | Both collections as JSON documents behind read/write locks |

pub mod memory;

pub use memory::{InMemorySearchIndex, SearchOutcome};
