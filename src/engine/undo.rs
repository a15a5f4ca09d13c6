//! Undo of the most recent ledger event.
//!
//! Removal is a pop of the highest sequence; cached state is repaired with a
//! typed inverse derived from the removed event's kind, then cross-checked
//! against a full fold of the surviving ledger. The fold wins: if the typed
//! inverse and the fold disagree, the fold's totals are installed and the
//! divergence is logged as a defect.

use tracing::error;
use uuid::Uuid;

use crate::{
    dao::models::{EventKind, Side},
    engine::{ledger::EventLedger, score},
    error::ServiceError,
    state::session::{GameEvent, SessionRuntime},
};

/// Typed inverse of one event, applied to cached session state when the
/// event is removed from the ledger.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Reversal {
    /// Take points back off a side's score.
    Points {
        /// Bench the points were credited to.
        side: Side,
        /// Points to remove.
        points: u8,
    },
    /// Take a foul back off a side's team count and the player's tally.
    Foul {
        /// Bench the foul was charged to.
        side: Side,
        /// Fouling player, when the event was attributed.
        player_id: Option<Uuid>,
    },
    /// Send a player who entered the court back to the bench.
    ReturnToBench {
        /// Player to bench.
        player_id: Option<Uuid>,
    },
    /// Put a player who left the court back on it.
    ReturnToCourt {
        /// Player to restore.
        player_id: Option<Uuid>,
    },
    /// The event changed no cached state.
    Neutral,
}

/// Derive the typed inverse for an event. Exhaustive over every kind so a
/// new kind cannot silently become un-undoable.
pub fn reversal_for(event: &GameEvent) -> Reversal {
    match event.kind {
        EventKind::Made1 | EventKind::Made2 | EventKind::Made3 => Reversal::Points {
            side: event.side,
            points: event.points_value,
        },
        EventKind::PersonalFoul => Reversal::Foul {
            side: event.side,
            player_id: event.player_id,
        },
        EventKind::SubstitutionIn => Reversal::ReturnToBench {
            player_id: event.player_id,
        },
        EventKind::SubstitutionOut => Reversal::ReturnToCourt {
            player_id: event.player_id,
        },
        EventKind::Missed1
        | EventKind::Missed2
        | EventKind::Missed3
        | EventKind::OffensiveRebound
        | EventKind::DefensiveRebound
        | EventKind::Assist
        | EventKind::Steal
        | EventKind::Block
        | EventKind::Turnover
        | EventKind::Timeout
        | EventKind::LineupChange => Reversal::Neutral,
    }
}

/// Apply a typed inverse to the runtime's cached state.
///
/// Undoing one half of a substitution pair intentionally leaves the lineup
/// off the five-a-side mark; the invariant is re-checked by the next lineup
/// mutation, not here.
pub fn apply_reversal(runtime: &mut SessionRuntime, reversal: Reversal) {
    match reversal {
        Reversal::Points { side, points } => {
            let score = match side {
                Side::Home => &mut runtime.session.home_score,
                Side::Away => &mut runtime.session.away_score,
            };
            *score = score.saturating_sub(u16::from(points));
        }
        Reversal::Foul { side, player_id } => {
            let fouls = match side {
                Side::Home => &mut runtime.session.home_fouls,
                Side::Away => &mut runtime.session.away_fouls,
            };
            *fouls = fouls.saturating_sub(1);
            // A player already substituted out keeps their personal tally;
            // only the side counter is reversed.
            if let Some(entry) = player_id.and_then(|id| runtime.lineup.get_mut(&id))
                && entry.on_court
            {
                entry.personal_fouls = entry.personal_fouls.saturating_sub(1);
            }
        }
        Reversal::ReturnToBench { player_id } => {
            if let Some(entry) = player_id.and_then(|id| runtime.lineup.get_mut(&id)) {
                entry.on_court = false;
            }
        }
        Reversal::ReturnToCourt { player_id } => {
            if let Some(entry) = player_id.and_then(|id| runtime.lineup.get_mut(&id)) {
                entry.on_court = true;
            }
        }
        Reversal::Neutral => {}
    }
}

/// Remove the most recent event and repair cached state.
///
/// Returns the removed event, or `None` when the ledger is empty (the facade
/// decides how to surface that). After the typed inverse, totals are
/// recomputed from the
/// surviving ledger; the recomputed values are authoritative and a mismatch
/// with the typed inverse is logged as a defect.
pub async fn undo_last(
    ledger: &EventLedger,
    runtime: &mut SessionRuntime,
) -> Result<Option<GameEvent>, ServiceError> {
    let Some(removed) = ledger.remove_last(runtime.session.id).await? else {
        return Ok(None);
    };

    apply_reversal(runtime, reversal_for(&removed));

    let survivors = ledger.list_ordered(runtime.session.id).await?;
    let totals = score::recompute(&survivors);
    if score::verify(&runtime.session, &survivors).is_err() {
        error!(
            session_id = %runtime.session.id,
            sequence = removed.sequence,
            "typed inverse diverged from ledger fold after undo; installing folded totals"
        );
    }
    score::apply_recomputed(&mut runtime.session, totals);

    Ok(Some(removed))
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;
    use std::time::SystemTime;

    use super::*;
    use crate::{
        dao::session_store::memory::MemoryStore,
        state::session::{LineupEntry, Session},
    };

    fn runtime() -> SessionRuntime {
        let session = Session::new(SystemTime::now(), Uuid::new_v4(), Uuid::new_v4(), 600);
        SessionRuntime::new(session)
    }

    fn ledger() -> EventLedger {
        EventLedger::new(Arc::new(MemoryStore::new()))
    }

    fn entry(side: Side, on_court: bool) -> LineupEntry {
        LineupEntry {
            side,
            on_court,
            is_starter: false,
            personal_fouls: 0,
            seconds_played: 0,
        }
    }

    async fn record(
        ledger: &EventLedger,
        runtime: &mut SessionRuntime,
        kind: EventKind,
        player_id: Option<Uuid>,
        side: Side,
    ) -> GameEvent {
        let draft = GameEvent::draft(
            runtime.session.id,
            kind,
            player_id,
            side,
            runtime.session.quarter,
            runtime.session.clock_seconds_remaining,
        );
        let stored = ledger.append(draft).await.unwrap();
        score::apply_event(&mut runtime.session, &stored);
        if stored.kind == EventKind::PersonalFoul
            && let Some(entry) = stored.player_id.and_then(|id| runtime.lineup.get_mut(&id))
        {
            entry.personal_fouls += 1;
        }
        stored
    }

    #[tokio::test]
    async fn undo_on_empty_ledger_is_a_noop() {
        let ledger = ledger();
        let mut runtime = runtime();
        let removed = undo_last(&ledger, &mut runtime).await.unwrap();
        assert!(removed.is_none());
        assert_eq!(runtime.session.home_score, 0);
    }

    #[tokio::test]
    async fn undo_removes_points_and_matches_the_fold() {
        let ledger = ledger();
        let mut runtime = runtime();
        let shooter = Uuid::new_v4();
        runtime.lineup.insert(shooter, entry(Side::Home, true));

        record(&ledger, &mut runtime, EventKind::Made2, Some(shooter), Side::Home).await;
        record(&ledger, &mut runtime, EventKind::Made3, Some(shooter), Side::Home).await;
        assert_eq!(runtime.session.home_score, 5);

        let removed = undo_last(&ledger, &mut runtime).await.unwrap().unwrap();
        assert_eq!(removed.kind, EventKind::Made3);
        assert_eq!(runtime.session.home_score, 2);

        let survivors = ledger.list_ordered(runtime.session.id).await.unwrap();
        assert_eq!(survivors.len(), 1);
        score::verify(&runtime.session, &survivors).unwrap();
    }

    #[tokio::test]
    async fn undo_of_a_foul_reverses_both_counters() {
        let ledger = ledger();
        let mut runtime = runtime();
        let player = Uuid::new_v4();
        runtime.lineup.insert(player, entry(Side::Away, true));

        record(
            &ledger,
            &mut runtime,
            EventKind::PersonalFoul,
            Some(player),
            Side::Away,
        )
        .await;
        assert_eq!(runtime.session.away_fouls, 1);
        assert_eq!(runtime.lineup[&player].personal_fouls, 1);

        undo_last(&ledger, &mut runtime).await.unwrap().unwrap();
        assert_eq!(runtime.session.away_fouls, 0);
        assert_eq!(runtime.lineup[&player].personal_fouls, 0);
    }

    #[tokio::test]
    async fn foul_undo_skips_the_personal_tally_of_a_benched_player() {
        let ledger = ledger();
        let mut runtime = runtime();
        let player = Uuid::new_v4();
        runtime.lineup.insert(player, entry(Side::Away, true));

        record(
            &ledger,
            &mut runtime,
            EventKind::PersonalFoul,
            Some(player),
            Side::Away,
        )
        .await;
        runtime.lineup.get_mut(&player).unwrap().on_court = false;

        undo_last(&ledger, &mut runtime).await.unwrap().unwrap();
        assert_eq!(runtime.session.away_fouls, 0);
        // The benched player's tally stays as recorded.
        assert_eq!(runtime.lineup[&player].personal_fouls, 1);
    }

    #[tokio::test]
    async fn undo_of_substitution_halves_flips_court_presence() {
        let ledger = ledger();
        let mut runtime = runtime();
        let leaving = Uuid::new_v4();
        let entering = Uuid::new_v4();
        runtime.lineup.insert(leaving, entry(Side::Home, false));
        runtime.lineup.insert(entering, entry(Side::Home, true));

        record(
            &ledger,
            &mut runtime,
            EventKind::SubstitutionOut,
            Some(leaving),
            Side::Home,
        )
        .await;
        record(
            &ledger,
            &mut runtime,
            EventKind::SubstitutionIn,
            Some(entering),
            Side::Home,
        )
        .await;

        // Undo the in-half: the entering player goes back to the bench.
        let removed = undo_last(&ledger, &mut runtime).await.unwrap().unwrap();
        assert_eq!(removed.kind, EventKind::SubstitutionIn);
        assert!(!runtime.lineup[&entering].on_court);

        // Undo the out-half: the leaving player is back on court.
        let removed = undo_last(&ledger, &mut runtime).await.unwrap().unwrap();
        assert_eq!(removed.kind, EventKind::SubstitutionOut);
        assert!(runtime.lineup[&leaving].on_court);
    }

    #[tokio::test]
    async fn folded_totals_win_over_a_corrupt_cache() {
        let ledger = ledger();
        let mut runtime = runtime();
        let shooter = Uuid::new_v4();
        runtime.lineup.insert(shooter, entry(Side::Home, true));

        record(&ledger, &mut runtime, EventKind::Made2, Some(shooter), Side::Home).await;
        record(&ledger, &mut runtime, EventKind::Made1, Some(shooter), Side::Home).await;
        // Corrupt the cache; the fold over the survivors must repair it.
        runtime.session.home_score = 40;

        undo_last(&ledger, &mut runtime).await.unwrap().unwrap();
        assert_eq!(runtime.session.home_score, 2);
    }

    #[tokio::test]
    async fn neutral_events_undo_without_touching_totals() {
        let ledger = ledger();
        let mut runtime = runtime();
        record(&ledger, &mut runtime, EventKind::Timeout, None, Side::Home).await;
        record(
            &ledger,
            &mut runtime,
            EventKind::Turnover,
            Some(Uuid::new_v4()),
            Side::Away,
        )
        .await;

        let removed = undo_last(&ledger, &mut runtime).await.unwrap().unwrap();
        assert_eq!(removed.kind, EventKind::Turnover);
        assert_eq!(runtime.session.home_score, 0);
        assert_eq!(runtime.session.away_score, 0);
    }
}
