use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use uuid::Uuid;

use crate::{
    dao::models::{EventKind, SessionListItemEntity, SessionStatus, Side},
    dto::format_system_time,
    state::session::{GameEvent, SessionRuntime},
};

/// Payload used to create a brand-new session.
#[derive(Debug, Deserialize, ToSchema)]
pub struct CreateSessionRequest {
    pub home_team_id: Uuid,
    pub away_team_id: Uuid,
    /// RFC 3339 scheduled start; defaults to now when omitted.
    #[serde(default)]
    pub scheduled_at: Option<String>,
}

/// Full projection of one live session exposed to REST and SSE clients.
#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct SessionSnapshot {
    pub id: Uuid,
    pub scheduled_at: String,
    pub status: SessionStatus,
    pub home_team_id: Uuid,
    pub away_team_id: Uuid,
    pub home_score: u16,
    pub away_score: u16,
    pub home_fouls: u16,
    pub away_fouls: u16,
    pub quarter: u8,
    pub clock_seconds_remaining: u16,
    pub clock_running: bool,
    pub override_armed: bool,
    pub lineups: Vec<LineupEntrySummary>,
    pub updated_at: String,
}

impl SessionSnapshot {
    /// Project a runtime into its client-facing snapshot.
    pub fn from_runtime(runtime: &SessionRuntime) -> Self {
        let session = &runtime.session;
        Self {
            id: session.id,
            scheduled_at: format_system_time(session.scheduled_at),
            status: runtime.status(),
            home_team_id: session.home_team_id,
            away_team_id: session.away_team_id,
            home_score: session.home_score,
            away_score: session.away_score,
            home_fouls: session.home_fouls,
            away_fouls: session.away_fouls,
            quarter: session.quarter,
            clock_seconds_remaining: session.clock_seconds_remaining,
            clock_running: session.clock_running,
            override_armed: session.override_armed,
            lineups: runtime
                .lineup
                .iter()
                .map(|(player_id, entry)| LineupEntrySummary {
                    player_id: *player_id,
                    side: entry.side,
                    on_court: entry.on_court,
                    is_starter: entry.is_starter,
                    personal_fouls: entry.personal_fouls,
                    seconds_played: entry.seconds_played,
                })
                .collect(),
            updated_at: format_system_time(session.updated_at),
        }
    }
}

/// One roster player's lineup state within a snapshot.
#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct LineupEntrySummary {
    pub player_id: Uuid,
    pub side: Side,
    pub on_court: bool,
    pub is_starter: bool,
    pub personal_fouls: u8,
    pub seconds_played: u32,
}

/// Compact row returned by the session listing.
#[derive(Debug, Serialize, ToSchema)]
pub struct SessionListItem {
    pub id: Uuid,
    pub scheduled_at: String,
    pub status: SessionStatus,
    pub home_team_id: Uuid,
    pub away_team_id: Uuid,
    pub home_score: u16,
    pub away_score: u16,
}

impl From<SessionListItemEntity> for SessionListItem {
    fn from(entity: SessionListItemEntity) -> Self {
        Self {
            id: entity.id,
            scheduled_at: format_system_time(entity.scheduled_at),
            status: entity.status,
            home_team_id: entity.home_team_id,
            away_team_id: entity.away_team_id,
            home_score: entity.home_score,
            away_score: entity.away_score,
        }
    }
}

/// Client-facing projection of one ledger event.
#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct EventSummary {
    pub id: Uuid,
    pub sequence: u64,
    pub kind: EventKind,
    pub side: Side,
    pub player_id: Option<Uuid>,
    pub quarter: u8,
    pub clock_seconds_remaining: u16,
    pub points_value: u8,
    pub recorded_at: String,
}

impl From<GameEvent> for EventSummary {
    fn from(event: GameEvent) -> Self {
        Self {
            id: event.id,
            sequence: event.sequence,
            kind: event.kind,
            side: event.side,
            player_id: event.player_id,
            quarter: event.quarter,
            clock_seconds_remaining: event.clock_seconds_remaining,
            points_value: event.points_value,
            recorded_at: format_system_time(event.recorded_at),
        }
    }
}
