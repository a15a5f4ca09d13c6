use std::time::SystemTime;

use uuid::Uuid;

use crate::{
    dto::{
        parse_rfc3339,
        session::{CreateSessionRequest, EventSummary, SessionListItem, SessionSnapshot},
    },
    engine::ledger::EventLedger,
    error::ServiceError,
    services::sse_events,
    state::{
        SharedState,
        session::{Session, SessionRuntime},
    },
};

/// Create and persist a fresh session at quarter one with a full, stopped
/// clock and no lineups.
pub async fn create_session(
    state: &SharedState,
    request: CreateSessionRequest,
) -> Result<SessionSnapshot, ServiceError> {
    if request.home_team_id == request.away_team_id {
        return Err(ServiceError::InvalidInput(
            "home and away must be different teams".into(),
        ));
    }
    for team_id in [request.home_team_id, request.away_team_id] {
        if state.roster().eligible_players(team_id).await?.is_none() {
            return Err(ServiceError::InvalidInput(format!(
                "team `{team_id}` has no configured roster"
            )));
        }
    }

    let scheduled_at = match request.scheduled_at.as_deref() {
        Some(raw) => parse_rfc3339(raw).ok_or_else(|| {
            ServiceError::InvalidInput(format!("invalid RFC 3339 timestamp `{raw}`"))
        })?,
        None => SystemTime::now(),
    };

    let session = Session::new(
        scheduled_at,
        request.home_team_id,
        request.away_team_id,
        state.config().quarter_length_secs,
    );
    let runtime = SessionRuntime::new(session);

    state.persist_runtime(&runtime).await?;
    let snapshot = SessionSnapshot::from_runtime(&runtime);
    sse_events::broadcast_session(state, &runtime);
    state.insert_runtime(runtime);

    Ok(snapshot)
}

/// List every stored session, most relevant to session pickers.
pub async fn list_sessions(state: &SharedState) -> Result<Vec<SessionListItem>, ServiceError> {
    let items = state.store().list_sessions().await?;
    Ok(items.into_iter().map(Into::into).collect())
}

/// Full snapshot of one session, hydrating it from the store if needed.
pub async fn get_session(
    state: &SharedState,
    session_id: Uuid,
) -> Result<SessionSnapshot, ServiceError> {
    let handle = state.load_runtime(session_id).await?;
    let guard = handle.read().await;
    Ok(SessionSnapshot::from_runtime(&guard))
}

/// The session's full ledger in ascending sequence order.
pub async fn list_events(
    state: &SharedState,
    session_id: Uuid,
) -> Result<Vec<EventSummary>, ServiceError> {
    // Hydration doubles as the existence check.
    state.load_runtime(session_id).await?;
    let ledger = EventLedger::new(state.store());
    let events = ledger.list_ordered(session_id).await?;
    Ok(events.into_iter().map(Into::into).collect())
}
