use axum::{
    Json, Router,
    extract::{Path, State},
    routing::{delete, post, put},
};
use uuid::Uuid;
use validator::Validate;

use crate::{
    dto::{
        control::{
            QuarterLineupRequest, RecordEventRequest, RecordedEventResponse, SetupRequest,
            SubstitutionRequest, UndoResponse,
        },
        session::SessionSnapshot,
    },
    error::AppError,
    services::control_service,
    state::SharedState,
};

/// Routes for live session control operations.
pub fn router() -> Router<SharedState> {
    Router::new()
        .route("/sessions/{id}/lineup/setup", post(setup_lineup))
        .route("/sessions/{id}/lineup/quarter", post(change_quarter_lineup))
        .route("/sessions/{id}/substitute", post(substitute))
        .route("/sessions/{id}/events", post(record_event))
        .route("/sessions/{id}/clock/toggle", post(toggle_clock))
        .route("/sessions/{id}/clock/override", post(arm_override))
        .route("/sessions/{id}/quarter/{n}", put(set_quarter))
        .route("/sessions/{id}/undo", post(undo_last))
        .route("/sessions/{id}/events/{sequence}", delete(delete_event_at))
        .route("/sessions/{id}/finish", post(finish))
        .route("/sessions/{id}/reset", post(reset_session))
}

/// Set the initial five for one side.
#[utoipa::path(
    post,
    path = "/sessions/{id}/lineup/setup",
    tag = "control",
    params(("id" = Uuid, Path, description = "Identifier of the session")),
    request_body = SetupRequest,
    responses(
        (status = 200, description = "Lineup stored", body = SessionSnapshot)
    )
)]
pub async fn setup_lineup(
    State(state): State<SharedState>,
    Path(id): Path<Uuid>,
    Json(payload): Json<SetupRequest>,
) -> Result<Json<SessionSnapshot>, AppError> {
    payload.validate()?;
    let snapshot = control_service::setup_lineup(&state, id, payload).await?;
    Ok(Json(snapshot))
}

/// Replace one side's five at a fresh quarter mark.
#[utoipa::path(
    post,
    path = "/sessions/{id}/lineup/quarter",
    tag = "control",
    params(("id" = Uuid, Path, description = "Identifier of the session")),
    request_body = QuarterLineupRequest,
    responses(
        (status = 200, description = "Lineup replaced", body = SessionSnapshot)
    )
)]
pub async fn change_quarter_lineup(
    State(state): State<SharedState>,
    Path(id): Path<Uuid>,
    Json(payload): Json<QuarterLineupRequest>,
) -> Result<Json<SessionSnapshot>, AppError> {
    payload.validate()?;
    let snapshot = control_service::change_quarter_lineup(&state, id, payload).await?;
    Ok(Json(snapshot))
}

/// Swap players while the quarter clock is live.
#[utoipa::path(
    post,
    path = "/sessions/{id}/substitute",
    tag = "control",
    params(("id" = Uuid, Path, description = "Identifier of the session")),
    request_body = SubstitutionRequest,
    responses(
        (status = 200, description = "Substitution applied", body = SessionSnapshot)
    )
)]
pub async fn substitute(
    State(state): State<SharedState>,
    Path(id): Path<Uuid>,
    Json(payload): Json<SubstitutionRequest>,
) -> Result<Json<SessionSnapshot>, AppError> {
    payload.validate()?;
    let snapshot = control_service::substitute(&state, id, payload).await?;
    Ok(Json(snapshot))
}

/// Append one in-game event to the ledger.
#[utoipa::path(
    post,
    path = "/sessions/{id}/events",
    tag = "control",
    params(("id" = Uuid, Path, description = "Identifier of the session")),
    request_body = RecordEventRequest,
    responses(
        (status = 200, description = "Event recorded", body = RecordedEventResponse)
    )
)]
pub async fn record_event(
    State(state): State<SharedState>,
    Path(id): Path<Uuid>,
    Json(payload): Json<RecordEventRequest>,
) -> Result<Json<RecordedEventResponse>, AppError> {
    let response = control_service::record_event(&state, id, payload).await?;
    Ok(Json(response))
}

/// Pause a running clock or resume a paused one.
#[utoipa::path(
    post,
    path = "/sessions/{id}/clock/toggle",
    tag = "control",
    params(("id" = Uuid, Path, description = "Identifier of the session")),
    responses(
        (status = 200, description = "Clock toggled", body = SessionSnapshot)
    )
)]
pub async fn toggle_clock(
    State(state): State<SharedState>,
    Path(id): Path<Uuid>,
) -> Result<Json<SessionSnapshot>, AppError> {
    let snapshot = control_service::toggle_clock(&state, id).await?;
    Ok(Json(snapshot))
}

/// Arm the single-use paused-entry override.
#[utoipa::path(
    post,
    path = "/sessions/{id}/clock/override",
    tag = "control",
    params(("id" = Uuid, Path, description = "Identifier of the session")),
    responses(
        (status = 200, description = "Override armed", body = SessionSnapshot)
    )
)]
pub async fn arm_override(
    State(state): State<SharedState>,
    Path(id): Path<Uuid>,
) -> Result<Json<SessionSnapshot>, AppError> {
    let snapshot = control_service::arm_override(&state, id).await?;
    Ok(Json(snapshot))
}

/// Manually move the session to a quarter with a full, stopped clock.
#[utoipa::path(
    put,
    path = "/sessions/{id}/quarter/{n}",
    tag = "control",
    params(
        ("id" = Uuid, Path, description = "Identifier of the session"),
        ("n" = u8, Path, description = "Quarter to move to (1-4)")
    ),
    responses(
        (status = 200, description = "Quarter set", body = SessionSnapshot)
    )
)]
pub async fn set_quarter(
    State(state): State<SharedState>,
    Path((id, quarter)): Path<(Uuid, u8)>,
) -> Result<Json<SessionSnapshot>, AppError> {
    let snapshot = control_service::set_quarter(&state, id, quarter).await?;
    Ok(Json(snapshot))
}

/// Remove the most recent ledger event.
#[utoipa::path(
    post,
    path = "/sessions/{id}/undo",
    tag = "control",
    params(("id" = Uuid, Path, description = "Identifier of the session")),
    responses(
        (status = 200, description = "Last event removed", body = UndoResponse)
    )
)]
pub async fn undo_last(
    State(state): State<SharedState>,
    Path(id): Path<Uuid>,
) -> Result<Json<UndoResponse>, AppError> {
    let response = control_service::undo_last(&state, id).await?;
    Ok(Json(response))
}

/// Delete the event at an exact sequence, leaving a gap in the ledger.
///
/// Allowed while the session is in progress and after it is done, so a
/// scoring mistake can still be corrected post-game.
#[utoipa::path(
    delete,
    path = "/sessions/{id}/events/{sequence}",
    tag = "control",
    params(
        ("id" = Uuid, Path, description = "Identifier of the session"),
        ("sequence" = u64, Path, description = "Sequence of the event to delete")
    ),
    responses(
        (status = 200, description = "Event deleted; totals refolded", body = SessionSnapshot)
    )
)]
pub async fn delete_event_at(
    State(state): State<SharedState>,
    Path((id, sequence)): Path<(Uuid, u64)>,
) -> Result<Json<SessionSnapshot>, AppError> {
    let snapshot = control_service::delete_event_at(&state, id, sequence).await?;
    Ok(Json(snapshot))
}

/// Close the session early.
#[utoipa::path(
    post,
    path = "/sessions/{id}/finish",
    tag = "control",
    params(("id" = Uuid, Path, description = "Identifier of the session")),
    responses(
        (status = 200, description = "Session finished", body = SessionSnapshot)
    )
)]
pub async fn finish(
    State(state): State<SharedState>,
    Path(id): Path<Uuid>,
) -> Result<Json<SessionSnapshot>, AppError> {
    let snapshot = control_service::finish(&state, id).await?;
    Ok(Json(snapshot))
}

/// Wipe the session back to `not_started`.
#[utoipa::path(
    post,
    path = "/sessions/{id}/reset",
    tag = "control",
    params(("id" = Uuid, Path, description = "Identifier of the session")),
    responses(
        (status = 200, description = "Session reset", body = SessionSnapshot)
    )
)]
pub async fn reset_session(
    State(state): State<SharedState>,
    Path(id): Path<Uuid>,
) -> Result<Json<SessionSnapshot>, AppError> {
    let snapshot = control_service::reset_session(&state, id).await?;
    Ok(Json(snapshot))
}
