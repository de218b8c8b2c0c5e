use serde::{Deserialize, Serialize};

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum SubmissionState {
    Received,
    Validated,
    Rejected,
    Relaying,
    Building,
    Writing,
    Failed,
    Notified,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum SubmissionEvent {
    Acknowledged,
    FieldsValidated,
    ValidationFailed,
    RelaysCompleted,
    RowBuilt,
    StageFailed,
    UserNotified,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct TransitionOutcome {
    pub from: SubmissionState,
    pub to: SubmissionState,
    pub event: SubmissionEvent,
}
