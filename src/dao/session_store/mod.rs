pub mod memory;

use futures::future::BoxFuture;
use uuid::Uuid;

use crate::dao::models::{EventEntity, LineupEntryEntity, SessionEntity, SessionListItemEntity};
use crate::dao::storage::StorageResult;

/// Abstraction over the persistence layer for sessions, ledger events, and
/// lineup rows.
///
/// `append_events` is the only write that assigns data: it stamps each event
/// with the next per-session `sequence` (max + 1, starting at 1) and must be
/// atomic per session, so concurrent appends can never produce duplicate or
/// out-of-order sequences. Every batch is all-or-nothing.
pub trait SessionStore: Send + Sync {
    fn save_session(&self, session: SessionEntity) -> BoxFuture<'static, StorageResult<()>>;
    fn find_session(&self, id: Uuid) -> BoxFuture<'static, StorageResult<Option<SessionEntity>>>;
    fn list_sessions(&self) -> BoxFuture<'static, StorageResult<Vec<SessionListItemEntity>>>;
    fn append_events(
        &self,
        session_id: Uuid,
        events: Vec<EventEntity>,
    ) -> BoxFuture<'static, StorageResult<Vec<EventEntity>>>;
    fn events_ordered(&self, session_id: Uuid)
    -> BoxFuture<'static, StorageResult<Vec<EventEntity>>>;
    fn remove_last_event(
        &self,
        session_id: Uuid,
    ) -> BoxFuture<'static, StorageResult<Option<EventEntity>>>;
    fn delete_event_at(
        &self,
        session_id: Uuid,
        sequence: u64,
    ) -> BoxFuture<'static, StorageResult<bool>>;
    fn replace_lineup(
        &self,
        session_id: Uuid,
        entries: Vec<LineupEntryEntity>,
    ) -> BoxFuture<'static, StorageResult<()>>;
    fn find_lineup(
        &self,
        session_id: Uuid,
    ) -> BoxFuture<'static, StorageResult<Vec<LineupEntryEntity>>>;
    fn clear_session_data(&self, session_id: Uuid) -> BoxFuture<'static, StorageResult<()>>;
    fn health_check(&self) -> BoxFuture<'static, StorageResult<()>>;
}
