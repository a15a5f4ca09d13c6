//! Lineup planning: initial setup, between-quarter re-plans, and in-game
//! substitutions.
//!
//! The three operations share one underlying mutation but differ in legality
//! rules and in the ledger entries they produce. Each planner is pure: it
//! validates against the current runtime and returns the replacement lineup
//! map plus the events to append, leaving the commit (persist + append +
//! runtime swap) to the facade so a rejected plan never touches state.

use std::collections::HashSet;

use indexmap::IndexMap;
use uuid::Uuid;

use crate::{
    dao::models::{EventKind, SessionStatus, Side},
    error::ServiceError,
    state::session::{GameEvent, LineupEntry, PLAYERS_ON_COURT, SessionRuntime},
};

/// Validated outcome of a lineup operation, ready to commit.
#[derive(Debug)]
pub struct LineupPlan {
    /// Replacement lineup map for the whole session.
    pub entries: IndexMap<Uuid, LineupEntry>,
    /// Ledger events the operation produces, in append order.
    pub events: Vec<GameEvent>,
}

/// Plan the initial five for one side. Legal only while `not_started`;
/// produces no ledger events (pre-game configuration is not in-game action).
pub fn plan_setup(
    runtime: &SessionRuntime,
    side: Side,
    players: &[Uuid],
    roster: &HashSet<Uuid>,
) -> Result<LineupPlan, ServiceError> {
    if runtime.status() != SessionStatus::NotStarted {
        return Err(ServiceError::InvalidState(
            "initial lineup can only be set before the session starts".into(),
        ));
    }

    let five = validate_five(players)?;
    ensure_rostered(&five, roster)?;

    let mut entries = runtime.lineup.clone();
    // Re-running setup replaces the side's previous five entirely.
    entries.retain(|_, entry| entry.side != side);
    for player_id in five {
        entries.insert(
            player_id,
            LineupEntry {
                side,
                on_court: true,
                is_starter: true,
                personal_fouls: 0,
                seconds_played: 0,
            },
        );
    }

    ensure_five_on_court(&entries, side)?;

    Ok(LineupPlan {
        entries,
        events: Vec::new(),
    })
}

/// Plan an in-game swap. Legal only while `in_progress` and once the quarter
/// clock has ticked; the fresh-quarter mark belongs to the quarter re-plan.
pub fn plan_substitution(
    runtime: &SessionRuntime,
    side: Side,
    players_in: &[Uuid],
    players_out: &[Uuid],
    quarter_length_secs: u16,
) -> Result<LineupPlan, ServiceError> {
    if runtime.status() != SessionStatus::InProgress {
        return Err(ServiceError::InvalidState(
            "substitutions require a session in progress".into(),
        ));
    }
    if runtime.at_fresh_quarter(quarter_length_secs) {
        return Err(ServiceError::InvalidState(
            "quarter clock has not started; use the quarter lineup change".into(),
        ));
    }

    if players_in.is_empty() {
        return Err(ServiceError::InvalidInput(
            "substitution requires at least one player in".into(),
        ));
    }
    if players_in.len() != players_out.len() {
        return Err(ServiceError::InvalidInput(format!(
            "unequal substitution counts: {} in, {} out",
            players_in.len(),
            players_out.len()
        )));
    }
    ensure_distinct(players_in)?;
    ensure_distinct(players_out)?;
    if players_in.iter().any(|id| players_out.contains(id)) {
        return Err(ServiceError::InvalidInput(
            "a player cannot be substituted in and out in the same swap".into(),
        ));
    }

    let mut entries = runtime.lineup.clone();

    for player_id in players_out {
        let entry = entries.get_mut(player_id).ok_or_else(|| {
            ServiceError::InvalidInput(format!("player `{player_id}` has no lineup entry"))
        })?;
        if entry.side != side {
            return Err(ServiceError::InvalidInput(format!(
                "player `{player_id}` plays for the other bench"
            )));
        }
        if !entry.on_court {
            return Err(ServiceError::InvalidInput(format!(
                "player `{player_id}` is not on court"
            )));
        }
        entry.on_court = false;
    }

    for player_id in players_in {
        match entries.get_mut(player_id) {
            Some(entry) => {
                if entry.side != side {
                    return Err(ServiceError::InvalidInput(format!(
                        "player `{player_id}` plays for the other bench"
                    )));
                }
                if entry.on_court {
                    return Err(ServiceError::InvalidInput(format!(
                        "player `{player_id}` is already on court"
                    )));
                }
                entry.on_court = true;
            }
            None => {
                entries.insert(
                    *player_id,
                    LineupEntry {
                        side,
                        on_court: true,
                        is_starter: false,
                        personal_fouls: 0,
                        seconds_played: 0,
                    },
                );
            }
        }
    }

    ensure_five_on_court(&entries, side)?;

    let events = swap_events(runtime, side, players_out, players_in);

    Ok(LineupPlan { entries, events })
}

/// Plan a between-quarters re-plan of one side's five. Legal only while
/// `in_progress` at the fresh-quarter mark; returning players keep their
/// personal fouls and playing time.
pub fn plan_quarter_change(
    runtime: &SessionRuntime,
    side: Side,
    players: &[Uuid],
    quarter_length_secs: u16,
    roster: &HashSet<Uuid>,
) -> Result<LineupPlan, ServiceError> {
    if runtime.status() != SessionStatus::InProgress {
        return Err(ServiceError::InvalidState(
            "quarter lineup change requires a session in progress".into(),
        ));
    }
    if !runtime.at_fresh_quarter(quarter_length_secs) {
        return Err(ServiceError::InvalidState(
            "quarter clock already started; use a substitution".into(),
        ));
    }

    let five = validate_five(players)?;
    ensure_rostered(&five, roster)?;

    let incoming_set: HashSet<Uuid> = five.iter().copied().collect();
    let outgoing: Vec<Uuid> = runtime
        .lineup
        .iter()
        .filter(|(id, entry)| entry.side == side && entry.on_court && !incoming_set.contains(id))
        .map(|(id, _)| *id)
        .collect();
    let incoming: Vec<Uuid> = five
        .iter()
        .filter(|id| {
            runtime
                .lineup
                .get(*id)
                .map(|entry| !entry.on_court)
                .unwrap_or(true)
        })
        .copied()
        .collect();

    let mut entries = runtime.lineup.clone();
    for player_id in &outgoing {
        if let Some(entry) = entries.get_mut(player_id) {
            entry.on_court = false;
        }
    }
    for player_id in &five {
        match entries.get_mut(player_id) {
            Some(entry) => {
                if entry.side != side {
                    return Err(ServiceError::InvalidInput(format!(
                        "player `{player_id}` plays for the other bench"
                    )));
                }
                // Fouls and minutes survive the quarter change.
                entry.on_court = true;
            }
            None => {
                entries.insert(
                    *player_id,
                    LineupEntry {
                        side,
                        on_court: true,
                        is_starter: false,
                        personal_fouls: 0,
                        seconds_played: 0,
                    },
                );
            }
        }
    }

    ensure_five_on_court(&entries, side)?;

    let mut events = vec![GameEvent::draft(
        runtime.session.id,
        EventKind::LineupChange,
        None,
        side,
        runtime.session.quarter,
        runtime.session.clock_seconds_remaining,
    )];
    events.extend(swap_events(runtime, side, &outgoing, &incoming));

    Ok(LineupPlan { entries, events })
}

/// One substitution-out/substitution-in pair per actually swapped player.
fn swap_events(
    runtime: &SessionRuntime,
    side: Side,
    players_out: &[Uuid],
    players_in: &[Uuid],
) -> Vec<GameEvent> {
    let session = &runtime.session;
    let mut events = Vec::with_capacity(players_out.len() + players_in.len());
    for (out_id, in_id) in players_out.iter().zip(players_in.iter()) {
        events.push(GameEvent::draft(
            session.id,
            EventKind::SubstitutionOut,
            Some(*out_id),
            side,
            session.quarter,
            session.clock_seconds_remaining,
        ));
        events.push(GameEvent::draft(
            session.id,
            EventKind::SubstitutionIn,
            Some(*in_id),
            side,
            session.quarter,
            session.clock_seconds_remaining,
        ));
    }
    events
}

fn validate_five(players: &[Uuid]) -> Result<Vec<Uuid>, ServiceError> {
    if players.len() != PLAYERS_ON_COURT {
        return Err(ServiceError::InvalidInput(format!(
            "exactly {PLAYERS_ON_COURT} players required, got {}",
            players.len()
        )));
    }
    ensure_distinct(players)?;
    Ok(players.to_vec())
}

fn ensure_distinct(players: &[Uuid]) -> Result<(), ServiceError> {
    let mut seen = HashSet::new();
    for player_id in players {
        if !seen.insert(*player_id) {
            return Err(ServiceError::InvalidInput(format!(
                "duplicate player `{player_id}` in request"
            )));
        }
    }
    Ok(())
}

fn ensure_rostered(players: &[Uuid], roster: &HashSet<Uuid>) -> Result<(), ServiceError> {
    for player_id in players {
        if !roster.contains(player_id) {
            return Err(ServiceError::InvalidInput(format!(
                "player `{player_id}` is not on the team roster"
            )));
        }
    }
    Ok(())
}

/// Shared invariant every lineup mutation converges on: exactly five
/// on-court entries for the side, or the whole plan is rejected.
fn ensure_five_on_court(
    entries: &IndexMap<Uuid, LineupEntry>,
    side: Side,
) -> Result<(), ServiceError> {
    let count = entries
        .values()
        .filter(|entry| entry.side == side && entry.on_court)
        .count();
    if count != PLAYERS_ON_COURT {
        return Err(ServiceError::InvalidInput(format!(
            "lineup for {side:?} would have {count} players on court, expected {PLAYERS_ON_COURT}"
        )));
    }
    Ok(())
}
