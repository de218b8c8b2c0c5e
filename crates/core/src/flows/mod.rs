pub mod engine;
pub mod states;

pub use engine::{transition, FlowTransitionError, SubmissionFlow};
pub use states::{SubmissionEvent, SubmissionState, TransitionOutcome};
