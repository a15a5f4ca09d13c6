use utoipa::OpenApi;

#[derive(OpenApi)]
/// Aggregated OpenAPI specification for Courtside Back.
#[openapi(
    paths(
        crate::routes::health::healthcheck,
        crate::routes::session::create_session,
        crate::routes::session::list_sessions,
        crate::routes::session::get_session,
        crate::routes::session::list_events,
        crate::routes::control::setup_lineup,
        crate::routes::control::record_event,
        crate::routes::control::substitute,
        crate::routes::control::change_quarter_lineup,
        crate::routes::control::toggle_clock,
        crate::routes::control::arm_override,
        crate::routes::control::set_quarter,
        crate::routes::control::undo_last,
        crate::routes::control::delete_event_at,
        crate::routes::control::finish,
        crate::routes::control::reset_session,
        crate::routes::sse::event_stream,
    ),
    components(
        schemas(
            crate::dto::health::HealthResponse,
            crate::dto::session::CreateSessionRequest,
            crate::dto::session::SessionSnapshot,
            crate::dto::session::SessionListItem,
            crate::dto::session::LineupEntrySummary,
            crate::dto::session::EventSummary,
            crate::dto::control::SetupRequest,
            crate::dto::control::RecordEventRequest,
            crate::dto::control::SubstitutionRequest,
            crate::dto::control::QuarterLineupRequest,
            crate::dto::control::RecordedEventResponse,
            crate::dto::control::UndoResponse,
            crate::dao::models::Side,
            crate::dao::models::SessionStatus,
            crate::dao::models::EventKind,
        )
    ),
    tags(
        (name = "health", description = "Health check endpoints"),
        (name = "session", description = "Session creation and read-side queries"),
        (name = "control", description = "Live session control operations"),
        (name = "sse", description = "Server-sent events stream"),
    )
)]
pub struct ApiDoc;
