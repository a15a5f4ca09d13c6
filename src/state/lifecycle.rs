use std::time::Instant;

use thiserror::Error;
use uuid::Uuid;

use crate::dao::models::SessionStatus;
use crate::error::ServiceError;

/// Events that can be applied to a session's lifecycle machine.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LifecycleEvent {
    /// Both benches reached five on-court players.
    LineupComplete,
    /// The fourth-quarter clock reached zero.
    ClockExpired,
    /// The operator closed the session early.
    Finish,
    /// Complete reset back to `not_started`; the caller purges the ledger
    /// and lineup as part of the same operation.
    Reset,
}

/// Error returned when attempting to apply an invalid transition.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("invalid transition: {event:?} cannot be applied while {from:?}")]
pub struct InvalidTransition {
    /// Status the machine was in when the invalid event was received.
    pub from: SessionStatus,
    /// The event that cannot be applied from this status.
    pub event: LifecycleEvent,
}

/// Errors that can occur when planning a lifecycle transition.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PlanError {
    /// A transition is already pending and must be applied or aborted.
    AlreadyPending,
    /// The requested transition is not valid from the current status.
    InvalidTransition(InvalidTransition),
}

/// Errors that can occur when applying a planned lifecycle transition.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ApplyError {
    /// No transition is currently pending.
    NoPending,
    /// Plan ID does not match the pending plan.
    IdMismatch {
        /// Expected plan ID.
        expected: PlanId,
        /// Provided plan ID.
        got: PlanId,
    },
    /// Status changed since the plan was created.
    StatusMismatch {
        /// Status when the plan was created.
        expected: SessionStatus,
        /// Current status.
        actual: SessionStatus,
    },
}

/// Errors that can occur when aborting a planned lifecycle transition.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AbortError {
    /// No transition is currently pending.
    NoPending,
    /// Plan ID does not match the pending plan.
    IdMismatch {
        /// Expected plan ID.
        expected: PlanId,
        /// Provided plan ID.
        got: PlanId,
    },
}

/// Unique identifier for a planned lifecycle transition.
pub type PlanId = Uuid;

/// A validated transition that has not yet been applied.
#[derive(Debug, Clone)]
pub struct Plan {
    /// Unique identifier for this plan.
    pub id: PlanId,
    /// Status the machine is currently in.
    pub from: SessionStatus,
    /// Status the machine will transition to.
    pub to: SessionStatus,
    /// Event that triggered this transition.
    pub event: LifecycleEvent,
    /// Timestamp when this plan was created.
    pub pending_since: Instant,
}

/// Per-session state machine for `not_started → in_progress → done`, with an
/// explicit reset edge back to `not_started` from anywhere.
///
/// Transitions are two-phase: `plan` validates the edge, the caller performs
/// the associated persistence work, and `apply` (or `abort` on failure)
/// settles the machine. A plan in flight blocks further plans.
#[derive(Debug, Clone)]
pub struct LifecycleStateMachine {
    status: SessionStatus,
    pending: Option<Plan>,
}

impl Default for LifecycleStateMachine {
    fn default() -> Self {
        Self::at(SessionStatus::NotStarted)
    }
}

impl LifecycleStateMachine {
    /// Create a machine in the `not_started` status.
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a machine seeded at a persisted status.
    pub fn at(status: SessionStatus) -> Self {
        Self {
            status,
            pending: None,
        }
    }

    /// Inspect the current status.
    pub fn status(&self) -> SessionStatus {
        self.status
    }

    /// Plan a transition by validating that the event can be applied from the
    /// current status.
    pub fn plan(&mut self, event: LifecycleEvent) -> Result<Plan, PlanError> {
        if self.pending.is_some() {
            return Err(PlanError::AlreadyPending);
        }

        let next = self
            .compute_transition(event)
            .map_err(PlanError::InvalidTransition)?;

        let plan = Plan {
            id: Uuid::new_v4(),
            from: self.status,
            to: next,
            event,
            pending_since: Instant::now(),
        };

        self.pending = Some(plan.clone());

        Ok(plan)
    }

    /// Apply a planned transition, moving the machine to the next status.
    pub fn apply(&mut self, plan_id: PlanId) -> Result<SessionStatus, ApplyError> {
        let plan = self.pending.take().ok_or(ApplyError::NoPending)?;

        if plan.id != plan_id {
            let expected = plan.id;
            self.pending = Some(plan);
            return Err(ApplyError::IdMismatch {
                expected,
                got: plan_id,
            });
        }

        if self.status != plan.from {
            return Err(ApplyError::StatusMismatch {
                expected: plan.from,
                actual: self.status,
            });
        }

        self.status = plan.to;
        Ok(self.status)
    }

    /// Abort a planned transition without applying it.
    pub fn abort(&mut self, plan_id: PlanId) -> Result<(), AbortError> {
        let plan = self.pending.as_ref().ok_or(AbortError::NoPending)?;

        if plan.id != plan_id {
            return Err(AbortError::IdMismatch {
                expected: plan.id,
                got: plan_id,
            });
        }

        self.pending = None;
        Ok(())
    }

    fn compute_transition(
        &self,
        event: LifecycleEvent,
    ) -> Result<SessionStatus, InvalidTransition> {
        let next = match (self.status, event) {
            (SessionStatus::NotStarted, LifecycleEvent::LineupComplete) => {
                SessionStatus::InProgress
            }
            (SessionStatus::InProgress, LifecycleEvent::ClockExpired) => SessionStatus::Done,
            (SessionStatus::InProgress, LifecycleEvent::Finish) => SessionStatus::Done,
            (_, LifecycleEvent::Reset) => SessionStatus::NotStarted,
            (from, event) => return Err(InvalidTransition { from, event }),
        };

        Ok(next)
    }
}

/// Run a lifecycle transition around a unit of persistence work: plan the
/// edge, run the work, then apply on success or abort on failure.
///
/// The work future must not borrow the runtime that owns this machine; call
/// sites clone the entities they persist.
pub async fn run_transition<F, Fut, T>(
    lifecycle: &mut LifecycleStateMachine,
    event: LifecycleEvent,
    work: F,
) -> Result<(T, SessionStatus), ServiceError>
where
    F: FnOnce() -> Fut,
    Fut: std::future::Future<Output = Result<T, ServiceError>>,
{
    let plan = lifecycle.plan(event)?;
    let plan_id = plan.id;

    match work().await {
        Ok(value) => {
            let next = lifecycle.apply(plan_id)?;
            Ok((value, next))
        }
        Err(err) => {
            if let Err(abort_err) = lifecycle.abort(plan_id) {
                tracing::warn!(
                    event = ?event,
                    plan_id = %plan_id,
                    error = ?abort_err,
                    "failed to abort lifecycle transition after work error"
                );
            }
            Err(err)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn apply(sm: &mut LifecycleStateMachine, event: LifecycleEvent) -> SessionStatus {
        let plan = sm.plan(event).unwrap();
        sm.apply(plan.id).unwrap()
    }

    #[test]
    fn initial_status_is_not_started() {
        let sm = LifecycleStateMachine::new();
        assert_eq!(sm.status(), SessionStatus::NotStarted);
    }

    #[test]
    fn full_happy_path_through_session() {
        let mut sm = LifecycleStateMachine::new();

        assert_eq!(
            apply(&mut sm, LifecycleEvent::LineupComplete),
            SessionStatus::InProgress
        );
        assert_eq!(
            apply(&mut sm, LifecycleEvent::ClockExpired),
            SessionStatus::Done
        );
    }

    #[test]
    fn manual_finish_requires_in_progress() {
        let mut sm = LifecycleStateMachine::new();
        let err = sm.plan(LifecycleEvent::Finish).unwrap_err();
        match err {
            PlanError::InvalidTransition(invalid) => {
                assert_eq!(invalid.from, SessionStatus::NotStarted);
                assert_eq!(invalid.event, LifecycleEvent::Finish);
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[test]
    fn reset_is_reachable_from_every_status() {
        for seed in [
            SessionStatus::NotStarted,
            SessionStatus::InProgress,
            SessionStatus::Done,
        ] {
            let mut sm = LifecycleStateMachine::at(seed);
            assert_eq!(
                apply(&mut sm, LifecycleEvent::Reset),
                SessionStatus::NotStarted
            );
        }
    }

    #[test]
    fn lineup_complete_is_invalid_once_in_progress() {
        let mut sm = LifecycleStateMachine::at(SessionStatus::InProgress);
        let err = sm.plan(LifecycleEvent::LineupComplete).unwrap_err();
        assert!(matches!(err, PlanError::InvalidTransition(_)));
    }

    #[test]
    fn pending_plan_blocks_further_plans() {
        let mut sm = LifecycleStateMachine::new();
        let _plan = sm.plan(LifecycleEvent::LineupComplete).unwrap();
        assert_eq!(
            sm.plan(LifecycleEvent::LineupComplete).unwrap_err(),
            PlanError::AlreadyPending
        );
    }

    #[test]
    fn abort_clears_pending() {
        let mut sm = LifecycleStateMachine::new();
        let plan = sm.plan(LifecycleEvent::LineupComplete).unwrap();
        sm.abort(plan.id).unwrap();
        assert_eq!(sm.status(), SessionStatus::NotStarted);
        assert!(sm.plan(LifecycleEvent::LineupComplete).is_ok());
    }

    #[tokio::test]
    async fn run_transition_aborts_on_failed_work() {
        let mut sm = LifecycleStateMachine::new();
        let result = run_transition(&mut sm, LifecycleEvent::LineupComplete, || async {
            Err::<(), _>(ServiceError::InvalidInput("boom".into()))
        })
        .await;

        assert!(result.is_err());
        assert_eq!(sm.status(), SessionStatus::NotStarted);
        // The machine accepts a fresh plan after the abort.
        assert!(sm.plan(LifecycleEvent::LineupComplete).is_ok());
    }
}
