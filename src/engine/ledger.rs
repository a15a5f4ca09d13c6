//! Append-only per-session event ledger, the single source of truth all
//! derived state is folded from.

use std::sync::Arc;

use uuid::Uuid;

use crate::{
    dao::session_store::SessionStore,
    error::ServiceError,
    state::session::GameEvent,
};

/// Thin ordering-aware facade over the store's event operations.
///
/// Sequences are assigned by the store at append time (max + 1, starting at
/// 1) and are never reused or renumbered: deleting an event leaves a gap,
/// and ledger order stays well-defined by the surviving sequence values.
#[derive(Clone)]
pub struct EventLedger {
    store: Arc<dyn SessionStore>,
}

impl EventLedger {
    /// Wrap a store handle.
    pub fn new(store: Arc<dyn SessionStore>) -> Self {
        Self { store }
    }

    /// Append a single event, returning it with its assigned sequence.
    ///
    /// A failed write surfaces as [`ServiceError::Unavailable`] and the event
    /// is not considered recorded.
    pub async fn append(&self, event: GameEvent) -> Result<GameEvent, ServiceError> {
        let session_id = event.session_id;
        let mut stored = self.store.append_events(session_id, vec![event.into()]).await?;
        let entity = stored
            .pop()
            .ok_or_else(|| ServiceError::Consistency("append returned no event".into()))?;
        Ok(entity.into())
    }

    /// Append a batch of events atomically, in order, returning them with
    /// their assigned sequences.
    pub async fn append_all(
        &self,
        session_id: Uuid,
        events: Vec<GameEvent>,
    ) -> Result<Vec<GameEvent>, ServiceError> {
        if events.is_empty() {
            return Ok(Vec::new());
        }
        let stored = self
            .store
            .append_events(session_id, events.into_iter().map(Into::into).collect())
            .await?;
        Ok(stored.into_iter().map(Into::into).collect())
    }

    /// All events for a session ordered by ascending sequence.
    pub async fn list_ordered(&self, session_id: Uuid) -> Result<Vec<GameEvent>, ServiceError> {
        let entities = self.store.events_ordered(session_id).await?;
        Ok(entities.into_iter().map(Into::into).collect())
    }

    /// Remove and return the highest-sequence event, if any.
    pub async fn remove_last(&self, session_id: Uuid) -> Result<Option<GameEvent>, ServiceError> {
        let removed = self.store.remove_last_event(session_id).await?;
        Ok(removed.map(Into::into))
    }

    /// Delete the event at an exact sequence. Remaining events keep their
    /// sequences. Returns whether anything was deleted.
    pub async fn delete_at(&self, session_id: Uuid, sequence: u64) -> Result<bool, ServiceError> {
        Ok(self.store.delete_event_at(session_id, sequence).await?)
    }
}
