use thiserror::Error;

use crate::flows::states::{SubmissionEvent, SubmissionState, TransitionOutcome};

#[derive(Clone, Debug, Error, PartialEq, Eq)]
pub enum FlowTransitionError {
    #[error("invalid transition from {state:?} using event {event:?}")]
    InvalidTransition { state: SubmissionState, event: SubmissionEvent },
}

pub fn transition(
    current: SubmissionState,
    event: SubmissionEvent,
) -> Result<TransitionOutcome, FlowTransitionError> {
    use SubmissionEvent::{
        Acknowledged, FieldsValidated, RelaysCompleted, RowBuilt, StageFailed, UserNotified,
        ValidationFailed,
    };
    use SubmissionState::{
        Building, Failed, Notified, Received, Rejected, Relaying, Validated, Writing,
    };

    let to = match (current, event) {
        (Received, Acknowledged) => Validated,
        (Validated, FieldsValidated) => Relaying,
        (Validated, ValidationFailed) => Rejected,
        (Relaying, RelaysCompleted) => Building,
        (Building, RowBuilt) => Writing,
        (Relaying, StageFailed) | (Building, StageFailed) | (Writing, StageFailed) => Failed,
        (Writing, UserNotified) | (Rejected, UserNotified) | (Failed, UserNotified) => Notified,
        _ => return Err(FlowTransitionError::InvalidTransition { state: current, event }),
    };

    Ok(TransitionOutcome { from: current, to, event })
}

/// Tracks one submission through its states and keeps the applied transitions.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SubmissionFlow {
    state: SubmissionState,
    trail: Vec<TransitionOutcome>,
}

impl Default for SubmissionFlow {
    fn default() -> Self {
        Self::new()
    }
}

impl SubmissionFlow {
    pub fn new() -> Self {
        Self { state: SubmissionState::Received, trail: Vec::new() }
    }

    pub fn state(&self) -> SubmissionState {
        self.state
    }

    pub fn apply(&mut self, event: SubmissionEvent) -> Result<SubmissionState, FlowTransitionError> {
        let outcome = transition(self.state, event)?;
        self.state = outcome.to;
        self.trail.push(outcome);
        Ok(self.state)
    }

    pub fn trail(&self) -> &[TransitionOutcome] {
        &self.trail
    }

    pub fn into_trail(self) -> Vec<TransitionOutcome> {
        self.trail
    }
}
