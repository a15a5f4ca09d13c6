//! Operator-facing session control: lineups, event recording, clock, quarter
//! override, undo, finish, and reset.
//!
//! Every operation here follows the same shape: take the session's write
//! lock, validate against the live runtime, persist, then broadcast a fresh
//! snapshot. Mutations reach the in-memory runtime only after the plan has
//! been validated in full, so a rejected request leaves no trace.

use std::collections::HashSet;
use std::time::SystemTime;

use uuid::Uuid;

use crate::{
    dao::models::{EventKind, SessionStatus, Side},
    dto::{
        control::{
            QuarterLineupRequest, RecordEventRequest, RecordedEventResponse, SetupRequest,
            SubstitutionRequest, UndoResponse,
        },
        session::SessionSnapshot,
    },
    engine::{ledger::EventLedger, lineup, score, undo},
    error::ServiceError,
    services::sse_events,
    state::{
        SharedState,
        lifecycle::{LifecycleEvent, run_transition},
        session::{GameEvent, SessionRuntime},
    },
};

/// Set the initial five for one side. When both benches reach five the
/// session transitions to `in_progress` as part of the same call.
pub async fn setup_lineup(
    state: &SharedState,
    session_id: Uuid,
    request: SetupRequest,
) -> Result<SessionSnapshot, ServiceError> {
    let handle = state.load_runtime(session_id).await?;
    let mut guard = handle.write().await;

    let roster = roster_for(state, &guard, request.side).await?;
    let plan = lineup::plan_setup(&guard, request.side, &request.players, &roster)?;

    guard.lineup = plan.entries;
    guard.session.updated_at = SystemTime::now();
    state.persist_runtime(&guard).await?;

    if guard.lineups_complete() {
        let mut entity = guard.to_entity();
        entity.status = SessionStatus::InProgress;
        let store = state.store();
        run_transition(&mut guard.lifecycle, LifecycleEvent::LineupComplete, || {
            async move { Ok(store.save_session(entity).await?) }
        })
        .await?;
    }

    sse_events::broadcast_session(state, &guard);
    Ok(SessionSnapshot::from_runtime(&guard))
}

/// Append one in-game event to the ledger and update derived totals.
///
/// Events are accepted only while the session is in progress and either the
/// clock is running or the single-use paused-entry override is armed; any
/// recorded event consumes the override.
pub async fn record_event(
    state: &SharedState,
    session_id: Uuid,
    request: RecordEventRequest,
) -> Result<RecordedEventResponse, ServiceError> {
    let handle = state.load_runtime(session_id).await?;
    let mut guard = handle.write().await;

    if guard.status() != SessionStatus::InProgress {
        return Err(ServiceError::InvalidState(
            "events can only be recorded while the session is in progress".into(),
        ));
    }
    if !guard.session.clock_running && !guard.session.override_armed {
        return Err(ServiceError::InvalidState(
            "clock is stopped; arm the paused-entry override to record".into(),
        ));
    }

    validate_event_shape(&guard, &request)?;

    let draft = GameEvent::draft(
        session_id,
        request.kind,
        request.player_id,
        request.side,
        guard.session.quarter,
        guard.session.clock_seconds_remaining,
    );
    let ledger = EventLedger::new(state.store());
    let stored = ledger.append(draft).await?;

    score::apply_event(&mut guard.session, &stored);
    if stored.kind == EventKind::PersonalFoul
        && let Some(entry) = stored.player_id.and_then(|id| guard.lineup.get_mut(&id))
    {
        entry.personal_fouls += 1;
    }
    // The override admits exactly one event; any successful append consumes
    // it, even when the clock was running and the gate never needed it.
    guard.session.override_armed = false;
    guard.session.updated_at = SystemTime::now();
    state.persist_runtime(&guard).await?;

    sse_events::broadcast_event_recorded(state, &stored);
    sse_events::broadcast_session(state, &guard);

    Ok(RecordedEventResponse {
        event: stored.into(),
        session: SessionSnapshot::from_runtime(&guard),
    })
}

/// Swap equal numbers of on-court and bench players for one side while the
/// quarter clock is live.
pub async fn substitute(
    state: &SharedState,
    session_id: Uuid,
    request: SubstitutionRequest,
) -> Result<SessionSnapshot, ServiceError> {
    let handle = state.load_runtime(session_id).await?;
    let mut guard = handle.write().await;

    let roster = roster_for(state, &guard, request.side).await?;
    for player_id in &request.players_in {
        if !roster.contains(player_id) {
            return Err(ServiceError::InvalidInput(format!(
                "player `{player_id}` is not on the team roster"
            )));
        }
    }

    let plan = lineup::plan_substitution(
        &guard,
        request.side,
        &request.players_in,
        &request.players_out,
        state.config().quarter_length_secs,
    )?;

    commit_lineup_plan(state, session_id, &mut guard, plan).await?;
    Ok(SessionSnapshot::from_runtime(&guard))
}

/// Replace one side's five at a fresh quarter mark, preserving the carried
/// stats of returning players.
pub async fn change_quarter_lineup(
    state: &SharedState,
    session_id: Uuid,
    request: QuarterLineupRequest,
) -> Result<SessionSnapshot, ServiceError> {
    let handle = state.load_runtime(session_id).await?;
    let mut guard = handle.write().await;

    let roster = roster_for(state, &guard, request.side).await?;
    let plan = lineup::plan_quarter_change(
        &guard,
        request.side,
        &request.players,
        state.config().quarter_length_secs,
        &roster,
    )?;

    commit_lineup_plan(state, session_id, &mut guard, plan).await?;
    Ok(SessionSnapshot::from_runtime(&guard))
}

/// Pause a running clock or resume a paused one.
pub async fn toggle_clock(
    state: &SharedState,
    session_id: Uuid,
) -> Result<SessionSnapshot, ServiceError> {
    let handle = state.load_runtime(session_id).await?;
    let mut guard = handle.write().await;

    if guard.status() != SessionStatus::InProgress {
        return Err(ServiceError::InvalidState(
            "clock control requires a session in progress".into(),
        ));
    }

    if guard.session.clock_running {
        guard.session.clock_running = false;
        state.clock().cancel(session_id);
    } else {
        if guard.session.clock_seconds_remaining == 0 {
            return Err(ServiceError::InvalidState(
                "quarter clock is at zero".into(),
            ));
        }
        guard.session.clock_running = true;
    }
    guard.session.updated_at = SystemTime::now();
    state.persist_runtime(&guard).await?;

    // Schedule only after the running flag is persisted, so a countdown task
    // never observes a stale pause.
    if guard.session.clock_running {
        state.clock().start(state.clone(), session_id);
    }

    sse_events::broadcast_session(state, &guard);
    Ok(SessionSnapshot::from_runtime(&guard))
}

/// Arm the single-use override that admits one event while the clock is
/// stopped.
pub async fn arm_override(
    state: &SharedState,
    session_id: Uuid,
) -> Result<SessionSnapshot, ServiceError> {
    let handle = state.load_runtime(session_id).await?;
    let mut guard = handle.write().await;

    if guard.status() != SessionStatus::InProgress {
        return Err(ServiceError::InvalidState(
            "override requires a session in progress".into(),
        ));
    }
    if guard.session.clock_running {
        return Err(ServiceError::InvalidState(
            "override applies only while the clock is stopped".into(),
        ));
    }

    guard.session.override_armed = true;
    guard.session.updated_at = SystemTime::now();
    state.persist_runtime(&guard).await?;

    sse_events::broadcast_session(state, &guard);
    Ok(SessionSnapshot::from_runtime(&guard))
}

/// Manually move the session to a quarter with a full, stopped clock.
pub async fn set_quarter(
    state: &SharedState,
    session_id: Uuid,
    quarter: u8,
) -> Result<SessionSnapshot, ServiceError> {
    if !(1..=4).contains(&quarter) {
        return Err(ServiceError::InvalidInput(format!(
            "quarter must be between 1 and 4, got {quarter}"
        )));
    }

    let handle = state.load_runtime(session_id).await?;
    let mut guard = handle.write().await;

    if guard.status() != SessionStatus::InProgress {
        return Err(ServiceError::InvalidState(
            "quarter override requires a session in progress".into(),
        ));
    }

    guard.session.clock_running = false;
    state.clock().cancel(session_id);
    guard.session.quarter = quarter;
    guard.session.clock_seconds_remaining = state.config().quarter_length_secs;
    guard.session.updated_at = SystemTime::now();
    state.persist_runtime(&guard).await?;

    sse_events::broadcast_session(state, &guard);
    Ok(SessionSnapshot::from_runtime(&guard))
}

/// Remove the most recent ledger event and repair derived state.
pub async fn undo_last(
    state: &SharedState,
    session_id: Uuid,
) -> Result<UndoResponse, ServiceError> {
    let handle = state.load_runtime(session_id).await?;
    let mut guard = handle.write().await;

    if guard.status() != SessionStatus::InProgress {
        return Err(ServiceError::InvalidState(
            "undo requires a session in progress".into(),
        ));
    }

    let ledger = EventLedger::new(state.store());
    let Some(undone) = undo::undo_last(&ledger, &mut guard).await? else {
        return Err(ServiceError::InvalidState(
            "nothing to undo: the ledger is empty".into(),
        ));
    };

    guard.session.updated_at = SystemTime::now();
    state.persist_runtime(&guard).await?;
    sse_events::broadcast_session(state, &guard);

    Ok(UndoResponse {
        undone: undone.into(),
        session: SessionSnapshot::from_runtime(&guard),
    })
}

/// Admin correction: delete the event at an exact sequence, leaving a gap.
///
/// Surviving events keep their sequences and totals are refolded from the
/// surviving ledger. Unlike the other mutating operations this is also
/// allowed on a `done` session, so a scoring mistake can still be corrected
/// after the final buzzer. Substitution bookkeeping events cannot be deleted
/// this way; their lineup side effects are only reversible through undo.
pub async fn delete_event_at(
    state: &SharedState,
    session_id: Uuid,
    sequence: u64,
) -> Result<SessionSnapshot, ServiceError> {
    let handle = state.load_runtime(session_id).await?;
    let mut guard = handle.write().await;

    if guard.status() == SessionStatus::NotStarted {
        return Err(ServiceError::InvalidState(
            "event deletion requires a started session".into(),
        ));
    }

    let ledger = EventLedger::new(state.store());
    let target = ledger
        .list_ordered(session_id)
        .await?
        .into_iter()
        .find(|event| event.sequence == sequence)
        .ok_or_else(|| {
            ServiceError::NotFound(format!("no event with sequence {sequence}"))
        })?;
    if matches!(
        target.kind,
        EventKind::SubstitutionIn | EventKind::SubstitutionOut | EventKind::LineupChange
    ) {
        return Err(ServiceError::InvalidInput(
            "substitution events can only be removed through undo".into(),
        ));
    }

    if !ledger.delete_at(session_id, sequence).await? {
        return Err(ServiceError::NotFound(format!(
            "no event with sequence {sequence}"
        )));
    }

    // Reverse the per-player tally, then refold the side totals.
    undo::apply_reversal(&mut guard, undo::reversal_for(&target));
    let survivors = ledger.list_ordered(session_id).await?;
    score::apply_recomputed(&mut guard.session, score::recompute(&survivors));

    guard.session.updated_at = SystemTime::now();
    state.persist_runtime(&guard).await?;

    sse_events::broadcast_session(state, &guard);
    Ok(SessionSnapshot::from_runtime(&guard))
}

/// Close the session early, freezing scores and the ledger as they stand.
pub async fn finish(
    state: &SharedState,
    session_id: Uuid,
) -> Result<SessionSnapshot, ServiceError> {
    let handle = state.load_runtime(session_id).await?;
    let mut guard = handle.write().await;

    guard.session.clock_running = false;
    state.clock().cancel(session_id);

    let mut entity = guard.to_entity();
    entity.status = SessionStatus::Done;
    let store = state.store();
    run_transition(&mut guard.lifecycle, LifecycleEvent::Finish, || async move {
        Ok(store.save_session(entity).await?)
    })
    .await?;

    guard.session.updated_at = SystemTime::now();
    state.persist_runtime(&guard).await?;

    sse_events::broadcast_session(state, &guard);
    Ok(SessionSnapshot::from_runtime(&guard))
}

/// Wipe the session back to `not_started`: ledger and lineup purged, scores
/// and clock reset, teams and schedule kept.
pub async fn reset_session(
    state: &SharedState,
    session_id: Uuid,
) -> Result<SessionSnapshot, ServiceError> {
    let handle = state.load_runtime(session_id).await?;
    let mut guard = handle.write().await;

    guard.session.clock_running = false;
    state.clock().cancel(session_id);

    let store = state.store();
    run_transition(&mut guard.lifecycle, LifecycleEvent::Reset, || async move {
        Ok(store.clear_session_data(session_id).await?)
    })
    .await?;

    guard.session.home_score = 0;
    guard.session.away_score = 0;
    guard.session.home_fouls = 0;
    guard.session.away_fouls = 0;
    guard.session.quarter = 1;
    guard.session.clock_seconds_remaining = state.config().quarter_length_secs;
    guard.session.override_armed = false;
    guard.session.updated_at = SystemTime::now();
    guard.lineup.clear();
    guard.ticks_since_checkpoint = 0;
    state.persist_runtime(&guard).await?;

    sse_events::broadcast_session(state, &guard);
    Ok(SessionSnapshot::from_runtime(&guard))
}

/// Eligible players for the side's team, or an input error when the roster
/// provider does not know the team.
async fn roster_for(
    state: &SharedState,
    runtime: &SessionRuntime,
    side: Side,
) -> Result<HashSet<Uuid>, ServiceError> {
    let team_id = runtime.session.team_id(side);
    match state.roster().eligible_players(team_id).await? {
        Some(roster) => Ok(roster),
        None => Err(ServiceError::InvalidInput(format!(
            "team `{team_id}` has no configured roster"
        ))),
    }
}

/// Substitution-style events are produced by lineup operations only; player
/// attribution must match the lineup.
fn validate_event_shape(
    runtime: &SessionRuntime,
    request: &RecordEventRequest,
) -> Result<(), ServiceError> {
    if matches!(
        request.kind,
        EventKind::SubstitutionIn | EventKind::SubstitutionOut | EventKind::LineupChange
    ) {
        return Err(ServiceError::InvalidInput(
            "substitution events are recorded through the lineup operations".into(),
        ));
    }

    if request.kind.requires_player() {
        let player_id = request.player_id.ok_or_else(|| {
            ServiceError::InvalidInput(format!("{:?} events require a player_id", request.kind))
        })?;
        let entry = runtime.lineup.get(&player_id).ok_or_else(|| {
            ServiceError::InvalidInput(format!("player `{player_id}` has no lineup entry"))
        })?;
        if entry.side != request.side {
            return Err(ServiceError::InvalidInput(format!(
                "player `{player_id}` plays for the other bench"
            )));
        }
        if !entry.on_court {
            return Err(ServiceError::InvalidInput(format!(
                "player `{player_id}` is not on court"
            )));
        }
    } else if request.player_id.is_some() {
        return Err(ServiceError::InvalidInput(format!(
            "{:?} events are team-level and carry no player",
            request.kind
        )));
    }

    Ok(())
}

/// Shared tail for the lineup mutations: append the plan's events, install
/// the replacement lineup, persist, and broadcast.
async fn commit_lineup_plan(
    state: &SharedState,
    session_id: Uuid,
    guard: &mut SessionRuntime,
    plan: lineup::LineupPlan,
) -> Result<(), ServiceError> {
    let ledger = EventLedger::new(state.store());
    ledger.append_all(session_id, plan.events).await?;

    guard.lineup = plan.entries;
    guard.session.updated_at = SystemTime::now();
    state.persist_runtime(guard).await?;

    sse_events::broadcast_session(state, guard);
    Ok(())
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;
    use std::sync::Arc;

    use rand::{Rng, SeedableRng, rngs::StdRng, seq::IndexedRandom};

    use super::*;
    use crate::{
        config::AppConfig,
        dao::{roster::StaticRoster, session_store::memory::MemoryStore},
        dto::session::CreateSessionRequest,
        services::session_service,
        state::AppState,
    };

    const QUARTER: u16 = 600;

    struct Fixture {
        state: SharedState,
        session_id: Uuid,
        home_players: Vec<Uuid>,
        away_players: Vec<Uuid>,
    }

    async fn fixture() -> Fixture {
        let home_team = Uuid::new_v4();
        let away_team = Uuid::new_v4();
        let home_players: Vec<Uuid> = (0..7).map(|_| Uuid::new_v4()).collect();
        let away_players: Vec<Uuid> = (0..7).map(|_| Uuid::new_v4()).collect();

        let mut rosters = HashMap::new();
        rosters.insert(home_team, home_players.iter().copied().collect());
        rosters.insert(away_team, away_players.iter().copied().collect());

        let config = AppConfig {
            quarter_length_secs: QUARTER,
            rosters: rosters.clone(),
            ..AppConfig::default()
        };
        let state = AppState::new(
            config,
            Arc::new(MemoryStore::new()),
            Arc::new(StaticRoster::new(rosters)),
        );

        let snapshot = session_service::create_session(
            &state,
            CreateSessionRequest {
                home_team_id: home_team,
                away_team_id: away_team,
                scheduled_at: None,
            },
        )
        .await
        .unwrap();

        Fixture {
            state,
            session_id: snapshot.id,
            home_players,
            away_players,
        }
    }

    async fn setup_both_lineups(fx: &Fixture) {
        for (side, players) in [
            (Side::Home, &fx.home_players),
            (Side::Away, &fx.away_players),
        ] {
            setup_lineup(
                &fx.state,
                fx.session_id,
                SetupRequest {
                    side,
                    players: players[..5].to_vec(),
                },
            )
            .await
            .unwrap();
        }
    }

    /// Move the session off the fresh-quarter mark with the clock stopped
    /// again afterwards.
    async fn burn_one_second(fx: &Fixture) {
        toggle_clock(&fx.state, fx.session_id).await.unwrap();
        // Let the countdown task create its interval before paused time moves,
        // or the advance below is not observed as a tick.
        tokio::task::yield_now().await;
        tokio::time::advance(std::time::Duration::from_secs(1)).await;
        tokio::task::yield_now().await;
        toggle_clock(&fx.state, fx.session_id).await.unwrap();
    }

    fn score_request(kind: EventKind, player_id: Uuid, side: Side) -> RecordEventRequest {
        RecordEventRequest {
            kind,
            side,
            player_id: Some(player_id),
        }
    }

    #[tokio::test(start_paused = true)]
    async fn full_session_flow_from_setup_to_scores() {
        let fx = fixture().await;

        // Recording before the lineups are complete is refused.
        let err = record_event(
            &fx.state,
            fx.session_id,
            score_request(EventKind::Made2, fx.home_players[0], Side::Home),
        )
        .await
        .unwrap_err();
        assert!(matches!(err, ServiceError::InvalidState(_)));

        setup_both_lineups(&fx).await;
        let snapshot = session_service::get_session(&fx.state, fx.session_id)
            .await
            .unwrap();
        assert_eq!(snapshot.status, SessionStatus::InProgress);

        toggle_clock(&fx.state, fx.session_id).await.unwrap();
        let made = record_event(
            &fx.state,
            fx.session_id,
            score_request(EventKind::Made3, fx.home_players[1], Side::Home),
        )
        .await
        .unwrap();
        assert_eq!(made.event.sequence, 1);
        assert_eq!(made.session.home_score, 3);

        record_event(
            &fx.state,
            fx.session_id,
            score_request(EventKind::PersonalFoul, fx.away_players[0], Side::Away),
        )
        .await
        .unwrap();

        let snapshot = session_service::get_session(&fx.state, fx.session_id)
            .await
            .unwrap();
        assert_eq!(snapshot.home_score, 3);
        assert_eq!(snapshot.away_fouls, 1);
        let fouler = snapshot
            .lineups
            .iter()
            .find(|entry| entry.player_id == fx.away_players[0])
            .unwrap();
        assert_eq!(fouler.personal_fouls, 1);
    }

    #[tokio::test]
    async fn paused_entry_override_admits_exactly_one_event() {
        let fx = fixture().await;
        setup_both_lineups(&fx).await;

        // Clock stopped and no override: refused.
        let err = record_event(
            &fx.state,
            fx.session_id,
            score_request(EventKind::Made2, fx.home_players[0], Side::Home),
        )
        .await
        .unwrap_err();
        assert!(matches!(err, ServiceError::InvalidState(_)));

        let armed = arm_override(&fx.state, fx.session_id).await.unwrap();
        assert!(armed.override_armed);

        let recorded = record_event(
            &fx.state,
            fx.session_id,
            score_request(EventKind::Made2, fx.home_players[0], Side::Home),
        )
        .await
        .unwrap();
        assert_eq!(recorded.session.home_score, 2);
        assert!(!recorded.session.override_armed);

        // The override was consumed; a second paused event is refused again.
        let err = record_event(
            &fx.state,
            fx.session_id,
            score_request(EventKind::Made1, fx.home_players[0], Side::Home),
        )
        .await
        .unwrap_err();
        assert!(matches!(err, ServiceError::InvalidState(_)));
    }

    #[tokio::test(start_paused = true)]
    async fn recording_with_the_clock_running_consumes_the_override() {
        let fx = fixture().await;
        setup_both_lineups(&fx).await;

        // Arm while paused, then resume before anything is recorded.
        arm_override(&fx.state, fx.session_id).await.unwrap();
        toggle_clock(&fx.state, fx.session_id).await.unwrap();

        let recorded = record_event(
            &fx.state,
            fx.session_id,
            score_request(EventKind::Made2, fx.home_players[0], Side::Home),
        )
        .await
        .unwrap();
        // A forgotten override must not survive a clock-running event.
        assert!(!recorded.session.override_armed);

        // Paused again, the stale override no longer admits anything.
        toggle_clock(&fx.state, fx.session_id).await.unwrap();
        let err = record_event(
            &fx.state,
            fx.session_id,
            score_request(EventKind::Made1, fx.home_players[0], Side::Home),
        )
        .await
        .unwrap_err();
        assert!(matches!(err, ServiceError::InvalidState(_)));
    }

    #[tokio::test]
    async fn undo_restores_totals_to_the_ledger_fold() {
        let fx = fixture().await;
        setup_both_lineups(&fx).await;
        arm_override(&fx.state, fx.session_id).await.unwrap();
        record_event(
            &fx.state,
            fx.session_id,
            score_request(EventKind::Made3, fx.away_players[2], Side::Away),
        )
        .await
        .unwrap();

        let response = undo_last(&fx.state, fx.session_id).await.unwrap();
        assert_eq!(response.undone.kind, EventKind::Made3);
        assert_eq!(response.session.away_score, 0);

        let events = session_service::list_events(&fx.state, fx.session_id)
            .await
            .unwrap();
        assert!(events.is_empty());

        // A second undo on the empty ledger is refused.
        let err = undo_last(&fx.state, fx.session_id).await.unwrap_err();
        assert!(matches!(err, ServiceError::InvalidState(_)));
    }

    #[tokio::test(start_paused = true)]
    async fn fresh_quarter_gates_substitution_versus_quarter_change() {
        let fx = fixture().await;
        setup_both_lineups(&fx).await;

        // At the fresh mark only the quarter re-plan is legal.
        let err = substitute(
            &fx.state,
            fx.session_id,
            SubstitutionRequest {
                side: Side::Home,
                players_in: vec![fx.home_players[5]],
                players_out: vec![fx.home_players[0]],
            },
        )
        .await
        .unwrap_err();
        assert!(matches!(err, ServiceError::InvalidState(_)));

        let mut five = fx.home_players[1..5].to_vec();
        five.push(fx.home_players[5]);
        change_quarter_lineup(
            &fx.state,
            fx.session_id,
            QuarterLineupRequest {
                side: Side::Home,
                players: five,
            },
        )
        .await
        .unwrap();

        // Once the clock has ticked the gates flip.
        burn_one_second(&fx).await;
        let err = change_quarter_lineup(
            &fx.state,
            fx.session_id,
            QuarterLineupRequest {
                side: Side::Home,
                players: fx.home_players[..5].to_vec(),
            },
        )
        .await
        .unwrap_err();
        assert!(matches!(err, ServiceError::InvalidState(_)));

        let snapshot = substitute(
            &fx.state,
            fx.session_id,
            SubstitutionRequest {
                side: Side::Home,
                players_in: vec![fx.home_players[0]],
                players_out: vec![fx.home_players[5]],
            },
        )
        .await
        .unwrap();
        let on_court: Vec<Uuid> = snapshot
            .lineups
            .iter()
            .filter(|entry| entry.side == Side::Home && entry.on_court)
            .map(|entry| entry.player_id)
            .collect();
        assert_eq!(on_court.len(), 5);
        assert!(on_court.contains(&fx.home_players[0]));
        assert!(!on_court.contains(&fx.home_players[5]));
    }

    #[tokio::test]
    async fn finish_freezes_and_reset_wipes() {
        let fx = fixture().await;
        setup_both_lineups(&fx).await;
        arm_override(&fx.state, fx.session_id).await.unwrap();
        record_event(
            &fx.state,
            fx.session_id,
            score_request(EventKind::Made2, fx.home_players[0], Side::Home),
        )
        .await
        .unwrap();

        let snapshot = finish(&fx.state, fx.session_id).await.unwrap();
        assert_eq!(snapshot.status, SessionStatus::Done);
        assert_eq!(snapshot.home_score, 2);

        // Done sessions refuse further events but stay readable.
        let err = record_event(
            &fx.state,
            fx.session_id,
            score_request(EventKind::Made2, fx.home_players[0], Side::Home),
        )
        .await
        .unwrap_err();
        assert!(matches!(err, ServiceError::InvalidState(_)));
        session_service::get_session(&fx.state, fx.session_id)
            .await
            .unwrap();

        let snapshot = reset_session(&fx.state, fx.session_id).await.unwrap();
        assert_eq!(snapshot.status, SessionStatus::NotStarted);
        assert_eq!(snapshot.home_score, 0);
        assert_eq!(snapshot.quarter, 1);
        assert!(snapshot.lineups.is_empty());
        let events = session_service::list_events(&fx.state, fx.session_id)
            .await
            .unwrap();
        assert!(events.is_empty());
    }

    #[tokio::test]
    async fn deleting_mid_ledger_leaves_a_gap_and_refolds_totals() {
        let fx = fixture().await;
        setup_both_lineups(&fx).await;

        for kind in [EventKind::Made2, EventKind::Made3, EventKind::Made1] {
            arm_override(&fx.state, fx.session_id).await.unwrap();
            record_event(
                &fx.state,
                fx.session_id,
                score_request(kind, fx.home_players[0], Side::Home),
            )
            .await
            .unwrap();
        }

        let snapshot = delete_event_at(&fx.state, fx.session_id, 2).await.unwrap();
        assert_eq!(snapshot.home_score, 3);

        let sequences: Vec<u64> = session_service::list_events(&fx.state, fx.session_id)
            .await
            .unwrap()
            .iter()
            .map(|event| event.sequence)
            .collect();
        assert_eq!(sequences, vec![1, 3]);

        let err = delete_event_at(&fx.state, fx.session_id, 2)
            .await
            .unwrap_err();
        assert!(matches!(err, ServiceError::NotFound(_)));
    }

    #[tokio::test]
    async fn admin_delete_still_corrects_a_finished_session() {
        let fx = fixture().await;

        // Before the session starts there is nothing to correct.
        let err = delete_event_at(&fx.state, fx.session_id, 1)
            .await
            .unwrap_err();
        assert!(matches!(err, ServiceError::InvalidState(_)));

        setup_both_lineups(&fx).await;
        arm_override(&fx.state, fx.session_id).await.unwrap();
        record_event(
            &fx.state,
            fx.session_id,
            score_request(EventKind::Made2, fx.home_players[0], Side::Home),
        )
        .await
        .unwrap();
        finish(&fx.state, fx.session_id).await.unwrap();

        let snapshot = delete_event_at(&fx.state, fx.session_id, 1).await.unwrap();
        assert_eq!(snapshot.home_score, 0);
        assert_eq!(snapshot.status, SessionStatus::Done);
    }

    #[tokio::test]
    async fn random_legal_sequences_keep_cache_and_fold_in_agreement() {
        let fx = fixture().await;
        setup_both_lineups(&fx).await;

        let mut rng = StdRng::seed_from_u64(7);
        let kinds = [
            EventKind::Made1,
            EventKind::Made2,
            EventKind::Made3,
            EventKind::Missed2,
            EventKind::PersonalFoul,
            EventKind::Assist,
            EventKind::Steal,
            EventKind::Turnover,
        ];

        for _ in 0..200 {
            if rng.random_bool(0.25) {
                match undo_last(&fx.state, fx.session_id).await {
                    // Empty-ledger undos are refused; everything else is a bug.
                    Ok(_) | Err(ServiceError::InvalidState(_)) => {}
                    Err(other) => panic!("unexpected undo error: {other}"),
                }
                continue;
            }

            let side = if rng.random_bool(0.5) {
                Side::Home
            } else {
                Side::Away
            };
            let players = match side {
                Side::Home => &fx.home_players,
                Side::Away => &fx.away_players,
            };
            let kind = *kinds.choose(&mut rng).unwrap();
            let player_id = players[..5].choose(&mut rng).copied().unwrap();

            arm_override(&fx.state, fx.session_id).await.unwrap();
            record_event(&fx.state, fx.session_id, score_request(kind, player_id, side))
                .await
                .unwrap();
        }

        let handle = fx.state.runtime(fx.session_id).unwrap();
        let guard = handle.read().await;
        let ledger = EventLedger::new(fx.state.store());
        let events = ledger.list_ordered(fx.session_id).await.unwrap();
        score::verify(&guard.session, &events).unwrap();
    }
}
