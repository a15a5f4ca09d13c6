//! In-process [`SessionStore`] backend.
//!
//! Used both as the default runtime backend and as the test double. Per-map
//! entry guards give the append path its required atomicity: sequence
//! assignment and the write happen under one exclusive entry reference.

use std::sync::Arc;

use dashmap::DashMap;
use futures::future::BoxFuture;
use uuid::Uuid;

use crate::dao::models::{EventEntity, LineupEntryEntity, SessionEntity, SessionListItemEntity};
use crate::dao::session_store::SessionStore;
use crate::dao::storage::StorageResult;

/// DashMap-backed store keyed by session id.
#[derive(Default)]
pub struct MemoryStore {
    inner: Arc<Inner>,
}

#[derive(Default)]
struct Inner {
    sessions: DashMap<Uuid, SessionEntity>,
    events: DashMap<Uuid, Vec<EventEntity>>,
    lineups: DashMap<Uuid, Vec<LineupEntryEntity>>,
}

impl MemoryStore {
    /// Create an empty store.
    pub fn new() -> Self {
        Self::default()
    }
}

impl SessionStore for MemoryStore {
    fn save_session(&self, session: SessionEntity) -> BoxFuture<'static, StorageResult<()>> {
        let inner = self.inner.clone();
        Box::pin(async move {
            inner.sessions.insert(session.id, session);
            Ok(())
        })
    }

    fn find_session(&self, id: Uuid) -> BoxFuture<'static, StorageResult<Option<SessionEntity>>> {
        let inner = self.inner.clone();
        Box::pin(async move { Ok(inner.sessions.get(&id).map(|entry| entry.clone())) })
    }

    fn list_sessions(&self) -> BoxFuture<'static, StorageResult<Vec<SessionListItemEntity>>> {
        let inner = self.inner.clone();
        Box::pin(async move {
            let mut items: Vec<SessionListItemEntity> = inner
                .sessions
                .iter()
                .map(|entry| entry.value().clone().into())
                .collect();
            items.sort_by_key(|item| item.scheduled_at);
            Ok(items)
        })
    }

    fn append_events(
        &self,
        session_id: Uuid,
        mut events: Vec<EventEntity>,
    ) -> BoxFuture<'static, StorageResult<Vec<EventEntity>>> {
        let inner = self.inner.clone();
        Box::pin(async move {
            // The entry guard is held across assignment and push, making the
            // whole batch atomic with respect to other appends.
            let mut ledger = inner.events.entry(session_id).or_default();
            let mut next = ledger.last().map(|event| event.sequence + 1).unwrap_or(1);
            for event in &mut events {
                event.sequence = next;
                next += 1;
            }
            ledger.extend(events.iter().cloned());
            Ok(events)
        })
    }

    fn events_ordered(
        &self,
        session_id: Uuid,
    ) -> BoxFuture<'static, StorageResult<Vec<EventEntity>>> {
        let inner = self.inner.clone();
        Box::pin(async move {
            Ok(inner
                .events
                .get(&session_id)
                .map(|entry| entry.clone())
                .unwrap_or_default())
        })
    }

    fn remove_last_event(
        &self,
        session_id: Uuid,
    ) -> BoxFuture<'static, StorageResult<Option<EventEntity>>> {
        let inner = self.inner.clone();
        Box::pin(async move {
            Ok(inner
                .events
                .get_mut(&session_id)
                .and_then(|mut entry| entry.pop()))
        })
    }

    fn delete_event_at(
        &self,
        session_id: Uuid,
        sequence: u64,
    ) -> BoxFuture<'static, StorageResult<bool>> {
        let inner = self.inner.clone();
        Box::pin(async move {
            let Some(mut ledger) = inner.events.get_mut(&session_id) else {
                return Ok(false);
            };
            let before = ledger.len();
            // Remaining events keep their sequence values; gaps are allowed.
            ledger.retain(|event| event.sequence != sequence);
            Ok(ledger.len() != before)
        })
    }

    fn replace_lineup(
        &self,
        session_id: Uuid,
        entries: Vec<LineupEntryEntity>,
    ) -> BoxFuture<'static, StorageResult<()>> {
        let inner = self.inner.clone();
        Box::pin(async move {
            inner.lineups.insert(session_id, entries);
            Ok(())
        })
    }

    fn find_lineup(
        &self,
        session_id: Uuid,
    ) -> BoxFuture<'static, StorageResult<Vec<LineupEntryEntity>>> {
        let inner = self.inner.clone();
        Box::pin(async move {
            Ok(inner
                .lineups
                .get(&session_id)
                .map(|entry| entry.clone())
                .unwrap_or_default())
        })
    }

    fn clear_session_data(&self, session_id: Uuid) -> BoxFuture<'static, StorageResult<()>> {
        let inner = self.inner.clone();
        Box::pin(async move {
            inner.events.remove(&session_id);
            inner.lineups.remove(&session_id);
            Ok(())
        })
    }

    fn health_check(&self) -> BoxFuture<'static, StorageResult<()>> {
        Box::pin(async { Ok(()) })
    }
}

#[cfg(test)]
mod tests {
    use std::time::SystemTime;

    use super::*;
    use crate::dao::models::{EventKind, Side};

    fn draft(session_id: Uuid, kind: EventKind) -> EventEntity {
        EventEntity {
            id: Uuid::new_v4(),
            session_id,
            player_id: Some(Uuid::new_v4()),
            side: Side::Home,
            quarter: 1,
            clock_seconds_remaining: 600,
            kind,
            points_value: kind.points_value(),
            sequence: 0,
            recorded_at: SystemTime::now(),
        }
    }

    #[tokio::test]
    async fn append_assigns_gapless_increasing_sequences() {
        let store = MemoryStore::new();
        let session_id = Uuid::new_v4();

        let first = store
            .append_events(session_id, vec![draft(session_id, EventKind::Made2)])
            .await
            .unwrap();
        let second = store
            .append_events(
                session_id,
                vec![
                    draft(session_id, EventKind::Assist),
                    draft(session_id, EventKind::Steal),
                ],
            )
            .await
            .unwrap();

        assert_eq!(first[0].sequence, 1);
        assert_eq!(second[0].sequence, 2);
        assert_eq!(second[1].sequence, 3);

        let stored = store.events_ordered(session_id).await.unwrap();
        let sequences: Vec<u64> = stored.iter().map(|event| event.sequence).collect();
        assert_eq!(sequences, vec![1, 2, 3]);
    }

    #[tokio::test]
    async fn delete_at_leaves_gaps_without_renumbering() {
        let store = MemoryStore::new();
        let session_id = Uuid::new_v4();

        store
            .append_events(
                session_id,
                vec![
                    draft(session_id, EventKind::Made2),
                    draft(session_id, EventKind::Made3),
                    draft(session_id, EventKind::Turnover),
                ],
            )
            .await
            .unwrap();

        assert!(store.delete_event_at(session_id, 2).await.unwrap());
        assert!(!store.delete_event_at(session_id, 2).await.unwrap());

        let stored = store.events_ordered(session_id).await.unwrap();
        let sequences: Vec<u64> = stored.iter().map(|event| event.sequence).collect();
        assert_eq!(sequences, vec![1, 3]);

        // The next append continues from the highest surviving sequence.
        let appended = store
            .append_events(session_id, vec![draft(session_id, EventKind::Block)])
            .await
            .unwrap();
        assert_eq!(appended[0].sequence, 4);
    }

    #[tokio::test]
    async fn concurrent_appends_never_collide() {
        let store = Arc::new(MemoryStore::new());
        let session_id = Uuid::new_v4();

        let mut handles = Vec::new();
        for _ in 0..8 {
            let store = store.clone();
            handles.push(tokio::spawn(async move {
                store
                    .append_events(session_id, vec![draft(session_id, EventKind::Made1)])
                    .await
                    .unwrap()
            }));
        }
        for handle in handles {
            handle.await.unwrap();
        }

        let stored = store.events_ordered(session_id).await.unwrap();
        let mut sequences: Vec<u64> = stored.iter().map(|event| event.sequence).collect();
        sequences.sort_unstable();
        assert_eq!(sequences, (1..=8).collect::<Vec<u64>>());
    }

    #[tokio::test]
    async fn remove_last_pops_highest_sequence() {
        let store = MemoryStore::new();
        let session_id = Uuid::new_v4();

        store
            .append_events(
                session_id,
                vec![
                    draft(session_id, EventKind::Made2),
                    draft(session_id, EventKind::PersonalFoul),
                ],
            )
            .await
            .unwrap();

        let removed = store.remove_last_event(session_id).await.unwrap().unwrap();
        assert_eq!(removed.sequence, 2);
        assert_eq!(removed.kind, EventKind::PersonalFoul);
        assert!(
            store
                .remove_last_event(Uuid::new_v4())
                .await
                .unwrap()
                .is_none()
        );
    }
}
