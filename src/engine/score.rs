//! Score and team-foul derivation.
//!
//! Two paths that must always agree: an incremental update applied on each
//! append (a cache), and a full fold over the ledger (the correctness
//! oracle). Every state-changing path other than plain append writes totals
//! from the fold.

use crate::{
    dao::models::{EventKind, Side},
    error::ServiceError,
    state::session::{GameEvent, Session},
};

/// Derived side totals produced by a fold over the ledger.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Totals {
    /// Points for the home bench.
    pub home_points: u16,
    /// Points for the away bench.
    pub away_points: u16,
    /// Team fouls for the home bench.
    pub home_fouls: u16,
    /// Team fouls for the away bench.
    pub away_fouls: u16,
}

impl Totals {
    /// Fold one event into the totals.
    pub fn absorb(&mut self, event: &GameEvent) {
        if event.kind.is_scoring() {
            match event.side {
                Side::Home => self.home_points += u16::from(event.points_value),
                Side::Away => self.away_points += u16::from(event.points_value),
            }
        }
        if event.kind == EventKind::PersonalFoul {
            match event.side {
                Side::Home => self.home_fouls += 1,
                Side::Away => self.away_fouls += 1,
            }
        }
    }
}

/// Incrementally apply one freshly appended event to the session's cached
/// totals.
pub fn apply_event(session: &mut Session, event: &GameEvent) {
    if event.kind.is_scoring() {
        match event.side {
            Side::Home => session.home_score += u16::from(event.points_value),
            Side::Away => session.away_score += u16::from(event.points_value),
        }
    }
    if event.kind == EventKind::PersonalFoul {
        match event.side {
            Side::Home => session.home_fouls += 1,
            Side::Away => session.away_fouls += 1,
        }
    }
}

/// Fold every event in ledger order into authoritative side totals.
///
/// Grouping is strictly by the event's stable `side`; team names play no part
/// in reconstruction.
pub fn recompute(events: &[GameEvent]) -> Totals {
    let mut totals = Totals::default();
    for event in events {
        totals.absorb(event);
    }
    totals
}

/// Overwrite the session's cached totals with recomputed ones.
pub fn apply_recomputed(session: &mut Session, totals: Totals) {
    session.home_score = totals.home_points;
    session.away_score = totals.away_points;
    session.home_fouls = totals.home_fouls;
    session.away_fouls = totals.away_fouls;
}

/// Check that the cached totals equal the fold of the given ledger state.
///
/// A mismatch is a latent logic defect, surfaced as
/// [`ServiceError::Consistency`] and never auto-corrected silently.
pub fn verify(session: &Session, events: &[GameEvent]) -> Result<Totals, ServiceError> {
    let totals = recompute(events);
    let cached = Totals {
        home_points: session.home_score,
        away_points: session.away_score,
        home_fouls: session.home_fouls,
        away_fouls: session.away_fouls,
    };
    if cached != totals {
        return Err(ServiceError::Consistency(format!(
            "cached totals {cached:?} disagree with ledger fold {totals:?} for session {}",
            session.id
        )));
    }
    Ok(totals)
}

#[cfg(test)]
mod tests {
    use std::time::SystemTime;

    use uuid::Uuid;

    use super::*;
    use crate::state::session::GameEvent;

    fn session() -> Session {
        Session::new(SystemTime::now(), Uuid::new_v4(), Uuid::new_v4(), 600)
    }

    fn event(session_id: Uuid, kind: EventKind, side: Side) -> GameEvent {
        GameEvent::draft(session_id, kind, Some(Uuid::new_v4()), side, 1, 580)
    }

    #[test]
    fn incremental_and_fold_agree_over_a_mixed_sequence() {
        let mut session = session();
        let kinds = [
            (EventKind::Made2, Side::Home),
            (EventKind::Made3, Side::Away),
            (EventKind::Missed2, Side::Home),
            (EventKind::PersonalFoul, Side::Away),
            (EventKind::Made1, Side::Away),
            (EventKind::Turnover, Side::Home),
            (EventKind::PersonalFoul, Side::Away),
            (EventKind::Made2, Side::Home),
        ];

        let mut ledger = Vec::new();
        for (kind, side) in kinds {
            let event = event(session.id, kind, side);
            apply_event(&mut session, &event);
            ledger.push(event);
        }

        let totals = verify(&session, &ledger).expect("paths must agree");
        assert_eq!(totals.home_points, 4);
        assert_eq!(totals.away_points, 4);
        assert_eq!(totals.home_fouls, 0);
        assert_eq!(totals.away_fouls, 2);
    }

    #[test]
    fn non_scoring_events_leave_totals_untouched() {
        let mut session = session();
        for kind in [
            EventKind::Missed1,
            EventKind::Missed3,
            EventKind::OffensiveRebound,
            EventKind::DefensiveRebound,
            EventKind::Assist,
            EventKind::Steal,
            EventKind::Block,
            EventKind::Turnover,
            EventKind::Timeout,
            EventKind::SubstitutionIn,
            EventKind::SubstitutionOut,
            EventKind::LineupChange,
        ] {
            let event = event(session.id, kind, Side::Home);
            apply_event(&mut session, &event);
        }
        assert_eq!(session.home_score, 0);
        assert_eq!(session.away_score, 0);
        assert_eq!(session.home_fouls, 0);
    }

    #[test]
    fn verify_reports_divergence() {
        let mut session = session();
        let scoring = event(session.id, EventKind::Made2, Side::Home);
        apply_event(&mut session, &scoring);
        // Simulate a corrupt cache.
        session.home_score += 1;

        let err = verify(&session, std::slice::from_ref(&scoring)).unwrap_err();
        assert!(matches!(err, ServiceError::Consistency(_)));
    }

    #[test]
    fn recomputed_totals_overwrite_the_cache() {
        let mut session = session();
        session.home_score = 42;
        session.away_fouls = 9;

        let events = vec![
            event(session.id, EventKind::Made3, Side::Away),
            event(session.id, EventKind::PersonalFoul, Side::Home),
        ];
        apply_recomputed(&mut session, recompute(&events));

        assert_eq!(session.home_score, 0);
        assert_eq!(session.away_score, 3);
        assert_eq!(session.home_fouls, 1);
        assert_eq!(session.away_fouls, 0);
    }
}
