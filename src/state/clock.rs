//! Cooperative per-session countdown.
//!
//! One cancellable task per session decrements the quarter clock once per
//! real second while it is running. `start` always cancels any previously
//! scheduled task for the same session before spawning a new one; a duplicate
//! loop would double-count elapsed time, which is the primary race this
//! module exists to prevent.

use std::time::Duration;

use dashmap::DashMap;
use tokio::{
    task::JoinHandle,
    time::{MissedTickBehavior, interval},
};
use tracing::{debug, warn};
use uuid::Uuid;

use crate::{
    dao::models::SessionStatus,
    services::sse_events,
    state::{
        SharedState,
        lifecycle::{LifecycleEvent, run_transition},
        session::SessionRuntime,
    },
};

/// Registry of countdown tasks keyed by session id.
pub struct ClockController {
    tasks: DashMap<Uuid, JoinHandle<()>>,
}

impl ClockController {
    pub(crate) fn new() -> Self {
        Self {
            tasks: DashMap::new(),
        }
    }

    /// Schedule the countdown loop for a session, cancelling any previously
    /// scheduled loop for the same session first.
    ///
    /// The caller is responsible for having set `clock_running = true` and
    /// persisted the session before calling this.
    pub fn start(&self, state: SharedState, session_id: Uuid) {
        self.cancel(session_id);
        let handle = tokio::spawn(run_countdown(state, session_id));
        self.tasks.insert(session_id, handle);
    }

    /// Cancel the countdown loop for a session, if one is scheduled.
    pub fn cancel(&self, session_id: Uuid) -> bool {
        match self.tasks.remove(&session_id) {
            Some((_, handle)) => {
                handle.abort();
                true
            }
            None => false,
        }
    }

    /// Whether a countdown task is currently scheduled for the session.
    pub fn is_scheduled(&self, session_id: Uuid) -> bool {
        self.tasks.contains_key(&session_id)
    }

    /// Drop the bookkeeping entry for a task that ended on its own.
    fn forget(&self, session_id: Uuid) {
        self.tasks.remove(&session_id);
    }
}

enum TickOutcome {
    Continue,
    Stop,
}

async fn run_countdown(state: SharedState, session_id: Uuid) {
    let mut ticker = interval(Duration::from_secs(1));
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
    // The first tick of a fresh interval completes immediately; consume it so
    // the first decrement happens a full second after start.
    ticker.tick().await;

    loop {
        ticker.tick().await;
        match tick_once(&state, session_id).await {
            TickOutcome::Continue => {}
            TickOutcome::Stop => break,
        }
    }

    state.clock().forget(session_id);
}

/// Apply one elapsed second to the session: decrement the clock, credit
/// playing time to the on-court ten, checkpoint the store on a throttled
/// schedule, and handle the zero mark (quarter advance or session end).
async fn tick_once(state: &SharedState, session_id: Uuid) -> TickOutcome {
    let Some(runtime) = state.runtime(session_id) else {
        return TickOutcome::Stop;
    };
    let mut guard = runtime.write().await;

    if !guard.session.clock_running {
        // Paused (or reset) between ticks; the controller entry is cleaned up
        // by whoever paused it, this task just stops decrementing.
        return TickOutcome::Stop;
    }

    guard.session.clock_seconds_remaining = guard.session.clock_seconds_remaining.saturating_sub(1);
    for entry in guard.lineup.values_mut() {
        if entry.on_court {
            entry.seconds_played += 1;
        }
    }
    guard.ticks_since_checkpoint += 1;

    if guard.session.clock_seconds_remaining == 0 {
        handle_zero(state, &mut guard).await;
        sse_events::broadcast_session(state, &guard);
        return TickOutcome::Stop;
    }

    if guard.ticks_since_checkpoint >= state.config().clock_checkpoint_secs {
        match state.persist_runtime(&guard).await {
            // On failure the counter is left as-is so the next tick retries
            // the checkpoint; in-memory time stays authoritative.
            Ok(()) => guard.ticks_since_checkpoint = 0,
            Err(err) => warn!(
                session_id = %session_id,
                error = %err,
                "clock checkpoint write failed; retrying next tick"
            ),
        }
    }

    TickOutcome::Continue
}

/// The quarter clock just hit zero: pause, then either advance to the next
/// quarter at the full length or end the session after the fourth.
async fn handle_zero(state: &SharedState, guard: &mut SessionRuntime) {
    guard.session.clock_running = false;

    if guard.session.quarter < 4 {
        guard.session.quarter += 1;
        guard.session.clock_seconds_remaining = state.config().quarter_length_secs;
        debug!(
            session_id = %guard.session.id,
            quarter = guard.session.quarter,
            "quarter expired; advanced to next quarter"
        );
        if let Err(err) = state.persist_runtime(guard).await {
            warn!(
                session_id = %guard.session.id,
                error = %err,
                "failed to persist quarter boundary; in-memory state kept"
            );
        }
        guard.ticks_since_checkpoint = 0;
        return;
    }

    // Fourth quarter expired: drive the lifecycle to done around the persist.
    let entity = guard.to_entity();
    let store = state.store();
    let outcome = run_transition(&mut guard.lifecycle, LifecycleEvent::ClockExpired, || {
        let mut entity = entity;
        entity.status = SessionStatus::Done;
        async move { Ok(store.save_session(entity).await?) }
    })
    .await;

    match outcome {
        Ok((_, status)) => {
            guard.ticks_since_checkpoint = 0;
            debug!(session_id = %guard.session.id, ?status, "fourth quarter expired; session done");
            if let Err(err) = state.persist_runtime(guard).await {
                warn!(
                    session_id = %guard.session.id,
                    error = %err,
                    "failed to persist final session state"
                );
            }
        }
        Err(err) => warn!(
            session_id = %guard.session.id,
            error = %err,
            "failed to finish session at the final buzzer"
        ),
    }
}
