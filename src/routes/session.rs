use axum::{
    Json, Router,
    extract::{Path, State},
    routing::{get, post},
};
use uuid::Uuid;

use crate::{
    dto::session::{CreateSessionRequest, EventSummary, SessionListItem, SessionSnapshot},
    error::AppError,
    services::session_service,
    state::SharedState,
};

/// Routes for session creation and read-side queries.
pub fn router() -> Router<SharedState> {
    Router::new()
        .route("/sessions", post(create_session).get(list_sessions))
        .route("/sessions/{id}", get(get_session))
        .route("/sessions/{id}/events", get(list_events))
}

/// Create a fresh session between two teams.
#[utoipa::path(
    post,
    path = "/sessions",
    tag = "session",
    request_body = CreateSessionRequest,
    responses(
        (status = 200, description = "Session created", body = SessionSnapshot)
    )
)]
pub async fn create_session(
    State(state): State<SharedState>,
    Json(payload): Json<CreateSessionRequest>,
) -> Result<Json<SessionSnapshot>, AppError> {
    let snapshot = session_service::create_session(&state, payload).await?;
    Ok(Json(snapshot))
}

/// List every stored session.
#[utoipa::path(
    get,
    path = "/sessions",
    tag = "session",
    responses(
        (status = 200, description = "Stored sessions", body = [SessionListItem])
    )
)]
pub async fn list_sessions(
    State(state): State<SharedState>,
) -> Result<Json<Vec<SessionListItem>>, AppError> {
    let sessions = session_service::list_sessions(&state).await?;
    Ok(Json(sessions))
}

/// Full snapshot of one session.
#[utoipa::path(
    get,
    path = "/sessions/{id}",
    tag = "session",
    params(("id" = Uuid, Path, description = "Identifier of the session")),
    responses(
        (status = 200, description = "Session snapshot", body = SessionSnapshot)
    )
)]
pub async fn get_session(
    State(state): State<SharedState>,
    Path(id): Path<Uuid>,
) -> Result<Json<SessionSnapshot>, AppError> {
    let snapshot = session_service::get_session(&state, id).await?;
    Ok(Json(snapshot))
}

/// The session's full event ledger in recording order.
#[utoipa::path(
    get,
    path = "/sessions/{id}/events",
    tag = "session",
    params(("id" = Uuid, Path, description = "Identifier of the session")),
    responses(
        (status = 200, description = "Ledger events in ascending sequence order", body = [EventSummary])
    )
)]
pub async fn list_events(
    State(state): State<SharedState>,
    Path(id): Path<Uuid>,
) -> Result<Json<Vec<EventSummary>>, AppError> {
    let events = session_service::list_events(&state, id).await?;
    Ok(Json(events))
}
