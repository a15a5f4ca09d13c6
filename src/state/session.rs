use std::time::SystemTime;

use indexmap::IndexMap;
use uuid::Uuid;

use crate::{
    dao::models::{EventEntity, LineupEntryEntity, SessionEntity, SessionStatus},
    state::lifecycle::LifecycleStateMachine,
};

pub use crate::dao::models::{EventKind, Side};

/// Number of players each side fields while a session is in progress.
pub const PLAYERS_ON_COURT: usize = 5;

/// Runtime representation of one ledger event.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GameEvent {
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
    /// Strictly increasing per-session ordinal; 0 until the store assigns it.
    pub sequence: u64,
    /// Wall-clock timestamp, for auditing only.
    pub recorded_at: SystemTime,
}

impl GameEvent {
    /// Build an event ready for appending, with the points value derived from
    /// the kind and the sequence left for the store to assign.
    pub fn draft(
        session_id: Uuid,
        kind: EventKind,
        player_id: Option<Uuid>,
        side: Side,
        quarter: u8,
        clock_seconds_remaining: u16,
    ) -> Self {
        Self {
            id: Uuid::new_v4(),
            session_id,
            player_id,
            side,
            quarter,
            clock_seconds_remaining,
            kind,
            points_value: kind.points_value(),
            sequence: 0,
            recorded_at: SystemTime::now(),
        }
    }
}

/// A roster player's per-session on-court state.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LineupEntry {
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

/// Mutable aggregate for one contest, excluding lifecycle status (owned by
/// the per-session state machine) and the lineup map.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Session {
    /// Primary key of the session.
    pub id: Uuid,
    /// Scheduled start of the contest.
    pub scheduled_at: SystemTime,
    /// Stable identifier of the home team.
    pub home_team_id: Uuid,
    /// Stable identifier of the away team.
    pub away_team_id: Uuid,
    /// Home score; kept equal to the fold of home scoring events.
    pub home_score: u16,
    /// Away score; kept equal to the fold of away scoring events.
    pub away_score: u16,
    /// Team foul count for the home bench.
    pub home_fouls: u16,
    /// Team foul count for the away bench.
    pub away_fouls: u16,
    /// Current quarter (1..=4).
    pub quarter: u8,
    /// Seconds left on the quarter clock.
    pub clock_seconds_remaining: u16,
    /// Whether the countdown is running.
    pub clock_running: bool,
    /// Single-use flag allowing one event to be recorded while paused.
    pub override_armed: bool,
    /// Last time the session was written to the store.
    pub updated_at: SystemTime,
}

impl Session {
    /// Build a fresh session at quarter 1 with a full, stopped clock.
    pub fn new(
        scheduled_at: SystemTime,
        home_team_id: Uuid,
        away_team_id: Uuid,
        quarter_length_secs: u16,
    ) -> Self {
        Self {
            id: Uuid::new_v4(),
            scheduled_at,
            home_team_id,
            away_team_id,
            home_score: 0,
            away_score: 0,
            home_fouls: 0,
            away_fouls: 0,
            quarter: 1,
            clock_seconds_remaining: quarter_length_secs,
            clock_running: false,
            override_armed: false,
            updated_at: SystemTime::now(),
        }
    }

    /// Stable team id for a bench.
    pub fn team_id(&self, side: Side) -> Uuid {
        match side {
            Side::Home => self.home_team_id,
            Side::Away => self.away_team_id,
        }
    }
}

/// Everything the facade needs to operate one live session: scalar state,
/// lifecycle machine, and the lineup map keyed by player id.
#[derive(Debug)]
pub struct SessionRuntime {
    /// Scalar session state.
    pub session: Session,
    /// Lifecycle machine owning the session status.
    pub lifecycle: LifecycleStateMachine,
    /// Lineup entries keyed by player id, in insertion order.
    pub lineup: IndexMap<Uuid, LineupEntry>,
    /// Clock ticks since the last persisted checkpoint.
    pub ticks_since_checkpoint: u32,
}

impl SessionRuntime {
    /// Wrap a fresh session with an idle lifecycle and empty lineup.
    pub fn new(session: Session) -> Self {
        Self {
            session,
            lifecycle: LifecycleStateMachine::new(),
            lineup: IndexMap::new(),
            ticks_since_checkpoint: 0,
        }
    }

    /// Current lifecycle status.
    pub fn status(&self) -> SessionStatus {
        self.lifecycle.status()
    }

    /// Number of on-court players for a bench.
    pub fn on_court_count(&self, side: Side) -> usize {
        self.lineup
            .values()
            .filter(|entry| entry.side == side && entry.on_court)
            .count()
    }

    /// Whether both benches field exactly five on-court players.
    pub fn lineups_complete(&self) -> bool {
        self.on_court_count(Side::Home) == PLAYERS_ON_COURT
            && self.on_court_count(Side::Away) == PLAYERS_ON_COURT
    }

    /// Whether the current quarter's clock has not yet ticked.
    pub fn at_fresh_quarter(&self, quarter_length_secs: u16) -> bool {
        self.session.clock_seconds_remaining == quarter_length_secs && !self.session.clock_running
    }

    /// Project the session scalar state into its persisted form.
    pub fn to_entity(&self) -> SessionEntity {
        SessionEntity {
            id: self.session.id,
            scheduled_at: self.session.scheduled_at,
            home_team_id: self.session.home_team_id,
            away_team_id: self.session.away_team_id,
            status: self.status(),
            home_score: self.session.home_score,
            away_score: self.session.away_score,
            home_fouls: self.session.home_fouls,
            away_fouls: self.session.away_fouls,
            quarter: self.session.quarter,
            clock_seconds_remaining: self.session.clock_seconds_remaining,
            clock_running: self.session.clock_running,
            override_armed: self.session.override_armed,
            updated_at: self.session.updated_at,
        }
    }

    /// Project the lineup map into persisted rows.
    pub fn lineup_entities(&self) -> Vec<LineupEntryEntity> {
        self.lineup
            .iter()
            .map(|(player_id, entry)| LineupEntryEntity {
                session_id: self.session.id,
                player_id: *player_id,
                side: entry.side,
                on_court: entry.on_court,
                is_starter: entry.is_starter,
                personal_fouls: entry.personal_fouls,
                seconds_played: entry.seconds_played,
            })
            .collect()
    }

    /// Rehydrate a runtime from persisted rows, seeding the lifecycle machine
    /// at the stored status.
    pub fn from_entities(entity: SessionEntity, lineup: Vec<LineupEntryEntity>) -> Self {
        let session = Session {
            id: entity.id,
            scheduled_at: entity.scheduled_at,
            home_team_id: entity.home_team_id,
            away_team_id: entity.away_team_id,
            home_score: entity.home_score,
            away_score: entity.away_score,
            home_fouls: entity.home_fouls,
            away_fouls: entity.away_fouls,
            quarter: entity.quarter,
            clock_seconds_remaining: entity.clock_seconds_remaining,
            // A rehydrated clock is never running; the countdown task died
            // with the previous process and must be restarted explicitly.
            clock_running: false,
            override_armed: entity.override_armed,
            updated_at: entity.updated_at,
        };

        let lineup = lineup
            .into_iter()
            .map(|row| {
                (
                    row.player_id,
                    LineupEntry {
                        side: row.side,
                        on_court: row.on_court,
                        is_starter: row.is_starter,
                        personal_fouls: row.personal_fouls,
                        seconds_played: row.seconds_played,
                    },
                )
            })
            .collect();

        Self {
            session,
            lifecycle: LifecycleStateMachine::at(entity.status),
            lineup,
            ticks_since_checkpoint: 0,
        }
    }
}

impl From<EventEntity> for GameEvent {
    fn from(value: EventEntity) -> Self {
        Self {
            id: value.id,
            session_id: value.session_id,
            player_id: value.player_id,
            side: value.side,
            quarter: value.quarter,
            clock_seconds_remaining: value.clock_seconds_remaining,
            kind: value.kind,
            points_value: value.points_value,
            sequence: value.sequence,
            recorded_at: value.recorded_at,
        }
    }
}

impl From<GameEvent> for EventEntity {
    fn from(value: GameEvent) -> Self {
        Self {
            id: value.id,
            session_id: value.session_id,
            player_id: value.player_id,
            side: value.side,
            quarter: value.quarter,
            clock_seconds_remaining: value.clock_seconds_remaining,
            kind: value.kind,
            points_value: value.points_value,
            sequence: value.sequence,
            recorded_at: value.recorded_at,
        }
    }
}
