use serde::{Deserialize, Serialize};
use std::time::SystemTime;
use utoipa::ToSchema;
use uuid::Uuid;

/// Which bench an event or lineup entry belongs to.
///
/// Scores are always folded by this stable assignment, never by display
/// position or team name.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash, ToSchema)]
#[serde(rename_all = "lowercase")]
pub enum Side {
    /// The team listed as home for the session.
    Home,
    /// The team listed as away for the session.
    Away,
}

/// Coarse lifecycle status of a session.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum SessionStatus {
    /// Created, lineups incomplete, no in-game events allowed.
    NotStarted,
    /// Both lineups complete; events may be recorded subject to the clock.
    InProgress,
    /// Fourth quarter expired or the operator closed the session.
    Done,
}

/// Every action the ledger can record.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash, ToSchema)]
#[serde(rename_all = "kebab-case")]
pub enum EventKind {
    /// Made free throw (1 point).
    #[serde(rename = "made-1")]
    Made1,
    /// Made field goal (2 points).
    #[serde(rename = "made-2")]
    Made2,
    /// Made three-pointer (3 points).
    #[serde(rename = "made-3")]
    Made3,
    /// Missed free throw.
    #[serde(rename = "missed-1")]
    Missed1,
    /// Missed field goal.
    #[serde(rename = "missed-2")]
    Missed2,
    /// Missed three-point attempt.
    #[serde(rename = "missed-3")]
    Missed3,
    /// Rebound off the team's own missed shot.
    OffensiveRebound,
    /// Rebound off the opponent's missed shot.
    DefensiveRebound,
    /// Pass leading directly to a made basket.
    Assist,
    /// Ball taken from the opponent.
    Steal,
    /// Shot attempt rejected.
    Block,
    /// Possession lost.
    Turnover,
    /// Personal foul charged to a player and their bench.
    PersonalFoul,
    /// Team timeout (team-level, no player attached).
    Timeout,
    /// Player entering the court during a substitution.
    SubstitutionIn,
    /// Player leaving the court during a substitution.
    SubstitutionOut,
    /// Marker for a between-quarters lineup re-plan.
    LineupChange,
}

impl EventKind {
    /// Points this event adds to its side's score.
    pub fn points_value(self) -> u8 {
        match self {
            EventKind::Made1 => 1,
            EventKind::Made2 => 2,
            EventKind::Made3 => 3,
            _ => 0,
        }
    }

    /// Whether the event contributes to the score fold.
    pub fn is_scoring(self) -> bool {
        self.points_value() > 0
    }

    /// Whether the event must carry a player id.
    ///
    /// Timeouts and lineup-change markers are team-level.
    pub fn requires_player(self) -> bool {
        !matches!(self, EventKind::Timeout | EventKind::LineupChange)
    }
}

/// Persisted representation of one ledger event.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct EventEntity {
    /// Primary key of the event.
    pub id: Uuid,
    /// Session this event belongs to.
    pub session_id: Uuid,
    /// Player the event is attributed to; absent for team-level events.
    pub player_id: Option<Uuid>,
    /// Bench the event counts for.
    pub side: Side,
    /// Quarter (1..=4) when the event happened.
    pub quarter: u8,
    /// Seconds left on the quarter clock when the event was recorded.
    pub clock_seconds_remaining: u16,
    /// What happened.
    pub kind: EventKind,
    /// Points value derived from `kind` at append time.
    pub points_value: u8,
    /// Strictly increasing per-session ordinal assigned by the store.
    pub sequence: u64,
    /// Wall-clock timestamp, for auditing only; ordering is by `sequence`.
    pub recorded_at: SystemTime,
}

/// Persisted aggregate for one contest.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct SessionEntity {
    /// Primary key of the session.
    pub id: Uuid,
    /// Scheduled start of the contest.
    pub scheduled_at: SystemTime,
    /// Stable identifier of the home team.
    pub home_team_id: Uuid,
    /// Stable identifier of the away team.
    pub away_team_id: Uuid,
    /// Lifecycle status.
    pub status: SessionStatus,
    /// Home score; must equal the fold of home scoring events.
    pub home_score: u16,
    /// Away score; must equal the fold of away scoring events.
    pub away_score: u16,
    /// Team foul count for the home bench.
    pub home_fouls: u16,
    /// Team foul count for the away bench.
    pub away_fouls: u16,
    /// Current quarter (1..=4).
    pub quarter: u8,
    /// Seconds left on the quarter clock at the last checkpoint.
    pub clock_seconds_remaining: u16,
    /// Whether the countdown is running.
    pub clock_running: bool,
    /// Single-use flag allowing one event to be recorded while paused.
    pub override_armed: bool,
    /// Last time the session row was written.
    pub updated_at: SystemTime,
}

/// Persisted per-(session, player) lineup row.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct LineupEntryEntity {
    /// Session the row belongs to.
    pub session_id: Uuid,
    /// Roster player the row describes.
    pub player_id: Uuid,
    /// Bench the player plays for in this session.
    pub side: Side,
    /// Whether the player is currently on court.
    pub on_court: bool,
    /// Whether the player was part of the initial five.
    pub is_starter: bool,
    /// Personal fouls accumulated in this session.
    pub personal_fouls: u8,
    /// Seconds of playing time credited by the clock.
    pub seconds_played: u32,
}

/// Subset of [`SessionEntity`] returned by session listings.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct SessionListItemEntity {
    /// Primary key of the session.
    pub id: Uuid,
    /// Scheduled start of the contest.
    pub scheduled_at: SystemTime,
    /// Stable identifier of the home team.
    pub home_team_id: Uuid,
    /// Stable identifier of the away team.
    pub away_team_id: Uuid,
    /// Lifecycle status.
    pub status: SessionStatus,
    /// Home score at the last write.
    pub home_score: u16,
    /// Away score at the last write.
    pub away_score: u16,
}

impl From<SessionEntity> for SessionListItemEntity {
    fn from(entity: SessionEntity) -> Self {
        Self {
            id: entity.id,
            scheduled_at: entity.scheduled_at,
            home_team_id: entity.home_team_id,
            away_team_id: entity.away_team_id,
            status: entity.status,
            home_score: entity.home_score,
            away_score: entity.away_score,
        }
    }
}
