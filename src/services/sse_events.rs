use serde::Serialize;
use tracing::warn;

use crate::{
    dto::{
        session::{EventSummary, SessionSnapshot},
        sse::ServerEvent,
    },
    state::{SharedState, session::{GameEvent, SessionRuntime}},
};

const EVENT_SESSION_SNAPSHOT: &str = "session.snapshot";
const EVENT_SESSION_EVENT: &str = "session.event";

/// Broadcast a full snapshot of one session to stream subscribers.
///
/// Every state-changing operation ends with this so scoreboard clients never
/// need to diff incremental updates.
pub fn broadcast_session(state: &SharedState, runtime: &SessionRuntime) {
    let snapshot = SessionSnapshot::from_runtime(runtime);
    send_event(state, EVENT_SESSION_SNAPSHOT, &snapshot);
}

/// Broadcast one freshly appended ledger event.
pub fn broadcast_event_recorded(state: &SharedState, event: &GameEvent) {
    let summary = EventSummary::from(event.clone());
    send_event(state, EVENT_SESSION_EVENT, &summary);
}

fn send_event(state: &SharedState, event: &str, payload: &impl Serialize) {
    match ServerEvent::json(Some(event.to_string()), payload) {
        Ok(event) => state.sse().broadcast(event),
        Err(err) => warn!(event, error = %err, "failed to serialize SSE payload"),
    }
}
