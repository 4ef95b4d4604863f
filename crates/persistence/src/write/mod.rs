//! The write path: keeping the thing and policy indexes in sync with thing
//! events.
//!
//! An [`EventTranslator`] resolves the [`EventToPersistenceStrategy`] of an
//! event and produces a [`WriteBatch`] of document and policy updates, which
//! a [`PersistenceWriteExecutor`] applies.

pub mod events;
pub mod executor;
pub mod index_length;
pub mod permissions;
pub mod policy_update;
pub mod strategies;
pub mod updates;

pub use events::{
    AccessControlList, AclEntry, EventKind, Feature, Thing, ThingEvent, ThingEventPayload,
};
pub use executor::{
    EventTranslator, PersistenceWriteExecutor, PersistenceWriteResult, WriteBatch, apply_event,
};
pub use index_length::IndexLengthRestrictionEnforcer;
pub use permissions::{PolicyEnforcer, PolicyRules, ReadRule, ResourcePermissions};
pub use policy_update::PolicyUpdate;
pub use strategies::{EventToPersistenceStrategy, strategy_for};
pub use updates::DocumentUpdate;
