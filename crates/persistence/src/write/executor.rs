//! Translation of thing events into write batches and their execution.

use async_trait::async_trait;
use tracing::{debug, warn};

use crate::config::SearchConfig;
use crate::error::{PersistenceError, PersistenceResult};
use crate::write::events::ThingEvent;
use crate::write::index_length::IndexLengthRestrictionEnforcer;
use crate::write::permissions::PolicyEnforcer;
use crate::write::policy_update::PolicyUpdate;
use crate::write::strategies::strategy_for;
use crate::write::updates::{DocumentUpdate, set_revision};

/// All index changes caused by one event.
#[derive(Debug, Clone, PartialEq)]
pub struct WriteBatch {
    /// The changed thing.
    pub thing_id: String,
    /// Revision of the thing after the event.
    pub revision: i64,
    /// Updates of the thing index, applied in order.
    pub thing_updates: Vec<DocumentUpdate>,
    /// Updates of the policy index, applied in order after the thing updates.
    pub policy_updates: Vec<PolicyUpdate>,
}

impl WriteBatch {
    /// Returns `true` if the batch changes nothing.
    pub fn is_empty(&self) -> bool {
        self.thing_updates.is_empty() && self.policy_updates.is_empty()
    }
}

/// Turns thing events into [`WriteBatch`]es.
#[derive(Debug, Clone)]
pub struct EventTranslator {
    max_index_content_length: usize,
}

impl EventTranslator {
    /// Creates a translator using the index limits of `config`.
    pub fn new(config: &SearchConfig) -> Self {
        Self {
            max_index_content_length: config.max_index_content_length,
        }
    }

    /// Translates one event.
    ///
    /// Partial changes additionally bump the `_revision` of the document;
    /// whole-thing events carry the revision in the replacement.
    ///
    /// # Errors
    ///
    /// Returns [`PersistenceError::InvalidThingId`] for an empty thing ID
    /// and [`PersistenceError::MalformedEvent`] for an event its strategy
    /// cannot handle.
    pub fn translate(
        &self,
        event: &ThingEvent,
        policy_enforcer: &dyn PolicyEnforcer,
    ) -> PersistenceResult<WriteBatch> {
        if event.thing_id.is_empty() {
            return Err(PersistenceError::InvalidThingId {
                thing_id: event.thing_id.clone(),
            });
        }

        let kind = event.kind();
        let strategy = strategy_for(kind);
        let enforcer =
            IndexLengthRestrictionEnforcer::new(&event.thing_id, self.max_index_content_length);

        let mut thing_updates = strategy.thing_updates(event, &enforcer)?;
        if !kind.is_whole_thing() {
            thing_updates.push(set_revision(&event.thing_id, event.revision));
        }
        let policy_updates = strategy.policy_updates(event, policy_enforcer)?;

        debug!(
            thing_id = %event.thing_id,
            revision = event.revision,
            kind = %kind,
            thing_updates = thing_updates.len(),
            policy_updates = policy_updates.len(),
            "Translated thing event"
        );

        Ok(WriteBatch {
            thing_id: event.thing_id.clone(),
            revision: event.revision,
            thing_updates,
            policy_updates,
        })
    }
}

/// Outcome of executing a [`WriteBatch`].
#[derive(Debug)]
pub struct PersistenceWriteResult {
    success: bool,
    error: Option<PersistenceError>,
}

impl PersistenceWriteResult {
    /// A successful write.
    pub fn ok() -> Self {
        Self {
            success: true,
            error: None,
        }
    }

    /// A failed write.
    pub fn failed(error: PersistenceError) -> Self {
        Self {
            success: false,
            error: Some(error),
        }
    }

    /// Returns `true` if every operation was applied.
    pub fn is_success(&self) -> bool {
        self.success
    }

    /// Returns the failure, if any.
    pub fn error(&self) -> Option<&PersistenceError> {
        self.error.as_ref()
    }
}

/// Applies write batches to an index store.
#[async_trait]
pub trait PersistenceWriteExecutor: Send + Sync {
    /// Applies the thing updates and then the policy updates of `batch`, in
    /// order, stopping at the first failure.
    async fn execute(&self, batch: WriteBatch) -> PersistenceWriteResult;
}

/// Translates `event` and executes the resulting batch.
///
/// A translation failure is reported as a failed result and nothing is
/// written.
pub async fn apply_event<E>(
    executor: &E,
    translator: &EventTranslator,
    event: &ThingEvent,
    policy_enforcer: &dyn PolicyEnforcer,
) -> PersistenceWriteResult
where
    E: PersistenceWriteExecutor + ?Sized,
{
    match translator.translate(event, policy_enforcer) {
        Ok(batch) => executor.execute(batch).await,
        Err(err) => {
            warn!(
                thing_id = %event.thing_id,
                kind = %event.kind(),
                error = %err,
                "Failed to translate thing event"
            );
            PersistenceWriteResult::failed(err)
        }
    }
}
