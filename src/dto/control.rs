use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use uuid::Uuid;
use validator::Validate;

use crate::{
    dao::models::{EventKind, Side},
    dto::session::{EventSummary, SessionSnapshot},
};

/// Initial five for one side, set before the session starts.
#[derive(Debug, Deserialize, ToSchema, Validate)]
pub struct SetupRequest {
    pub side: Side,
    /// Exactly five distinct roster players.
    #[validate(length(equal = 5))]
    pub players: Vec<Uuid>,
}

/// One in-game action to append to the ledger.
#[derive(Debug, Deserialize, ToSchema)]
pub struct RecordEventRequest {
    pub kind: EventKind,
    pub side: Side,
    /// Required for player-attributed kinds, forbidden for team-level ones.
    #[serde(default)]
    pub player_id: Option<Uuid>,
}

/// In-game swap of equal numbers of players for one side.
#[derive(Debug, Deserialize, ToSchema, Validate)]
pub struct SubstitutionRequest {
    pub side: Side,
    #[validate(length(min = 1))]
    pub players_in: Vec<Uuid>,
    #[validate(length(min = 1))]
    pub players_out: Vec<Uuid>,
}

/// Replacement five for one side at a fresh quarter mark.
#[derive(Debug, Deserialize, ToSchema, Validate)]
pub struct QuarterLineupRequest {
    pub side: Side,
    #[validate(length(equal = 5))]
    pub players: Vec<Uuid>,
}

/// Response to a recorded event: the stored event and the refreshed session.
#[derive(Debug, Serialize, ToSchema)]
pub struct RecordedEventResponse {
    pub event: EventSummary,
    pub session: SessionSnapshot,
}

/// Response to an undo: the removed event and the refreshed session.
#[derive(Debug, Serialize, ToSchema)]
pub struct UndoResponse {
    pub undone: EventSummary,
    pub session: SessionSnapshot,
}
