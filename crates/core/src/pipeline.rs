//! Submission orchestration: relay attachments, build the row, write it, and
//! tell the submitting user how it went.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use tracing::{error, info, warn};

use crate::domain::{RowUpdateBuilder, RowUpdatePayload, Submission};
use crate::errors::{MissingField, NotifyError, PipelineError, SheetError, ValidationError};
use crate::fanout::FanOut;
use crate::flows::{SubmissionEvent, SubmissionFlow, SubmissionState, TransitionOutcome};
use crate::messages;

#[async_trait]
pub trait SheetWriter: Send + Sync {
    /// Overwrites exactly `payload.range`, interpreting values as user-entered.
    async fn write_row(&self, payload: &RowUpdatePayload) -> Result<(), SheetError>;
}

#[async_trait]
pub trait Notifier: Send + Sync {
    async fn notify_user(&self, user_id: &str, text: &str) -> Result<(), NotifyError>;
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SubmissionContext {
    pub correlation_id: String,
}

impl Default for SubmissionContext {
    fn default() -> Self {
        Self { correlation_id: "unknown-correlation-id".to_owned() }
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum SubmissionOutcome {
    Rejected { error: ValidationError },
    Failed { row_number: String, error: PipelineError },
    Completed { row_number: String, status: String, attachment_count: usize },
}

impl SubmissionOutcome {
    pub fn user_message(&self) -> String {
        match self {
            Self::Rejected { error } => messages::validation_rejected(error),
            Self::Failed { row_number, .. } => messages::submission_failed(row_number),
            Self::Completed { row_number, status, attachment_count } => {
                messages::submission_completed(row_number, status, *attachment_count)
            }
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SubmissionReport {
    pub user_id: String,
    pub outcome: SubmissionOutcome,
    pub final_state: SubmissionState,
    pub trail: Vec<TransitionOutcome>,
    pub notified: bool,
}

#[derive(Clone)]
pub struct SubmissionPipeline {
    fan_out: FanOut,
    rows: RowUpdateBuilder,
    sheets: Arc<dyn SheetWriter>,
    notifier: Arc<dyn Notifier>,
    sheet_timeout: Duration,
}

impl SubmissionPipeline {
    pub fn new(
        fan_out: FanOut,
        rows: RowUpdateBuilder,
        sheets: Arc<dyn SheetWriter>,
        notifier: Arc<dyn Notifier>,
        sheet_timeout: Duration,
    ) -> Self {
        Self { fan_out, rows, sheets, notifier, sheet_timeout }
    }

    /// Callers must have acknowledged the inbound interaction already; this
    /// runs the slow part and always ends with one message to the user.
    pub async fn process(
        &self,
        user_id: &str,
        extracted: Result<Submission, ValidationError>,
        ctx: &SubmissionContext,
    ) -> SubmissionReport {
        let mut flow = SubmissionFlow::new();
        advance(&mut flow, SubmissionEvent::Acknowledged, ctx);

        let outcome = match extracted {
            Err(error) => {
                advance(&mut flow, SubmissionEvent::ValidationFailed, ctx);
                let missing: Vec<&str> =
                    error.missing.iter().map(MissingField::field_name).collect();
                warn!(
                    event_name = "pipeline.submission.rejected",
                    correlation_id = %ctx.correlation_id,
                    user_id,
                    missing = ?missing,
                    "submission failed validation; no external calls made"
                );
                SubmissionOutcome::Rejected { error }
            }
            Ok(submission) => {
                advance(&mut flow, SubmissionEvent::FieldsValidated, ctx);
                info!(
                    event_name = "pipeline.submission.started",
                    correlation_id = %ctx.correlation_id,
                    user_id,
                    row_number = %submission.row_number,
                    attachment_count = submission.attachment_ids.len(),
                    "processing claim submission"
                );

                match self.run(&submission, &mut flow, ctx).await {
                    Ok(attachment_count) => SubmissionOutcome::Completed {
                        row_number: submission.row_number,
                        status: submission.status,
                        attachment_count,
                    },
                    Err(pipeline_error) => {
                        advance(&mut flow, SubmissionEvent::StageFailed, ctx);
                        error!(
                            event_name = "pipeline.submission.failed",
                            correlation_id = %ctx.correlation_id,
                            user_id,
                            row_number = %submission.row_number,
                            error = %pipeline_error,
                            "claim submission failed"
                        );
                        SubmissionOutcome::Failed {
                            row_number: submission.row_number,
                            error: pipeline_error,
                        }
                    }
                }
            }
        };

        let notified = self.notify(user_id, &outcome.user_message(), ctx).await;
        if notified {
            advance(&mut flow, SubmissionEvent::UserNotified, ctx);
        }

        SubmissionReport {
            user_id: user_id.to_owned(),
            outcome,
            final_state: flow.state(),
            trail: flow.into_trail(),
            notified,
        }
    }

    async fn run(
        &self,
        submission: &Submission,
        flow: &mut SubmissionFlow,
        ctx: &SubmissionContext,
    ) -> Result<usize, PipelineError> {
        let assets = self.fan_out.relay_all(&submission.attachment_ids).await?;
        flow.apply(SubmissionEvent::RelaysCompleted)?;

        let payload = self.rows.build(submission, &assets);
        flow.apply(SubmissionEvent::RowBuilt)?;

        match tokio::time::timeout(self.sheet_timeout, self.sheets.write_row(&payload)).await {
            Ok(result) => result?,
            Err(_) => {
                return Err(SheetError::Timeout { timeout_secs: self.sheet_timeout.as_secs() }.into())
            }
        }

        info!(
            event_name = "pipeline.sheet.row_written",
            correlation_id = %ctx.correlation_id,
            range = %payload.range,
            attachment_count = assets.len(),
            "spreadsheet row updated"
        );
        Ok(assets.len())
    }

    async fn notify(&self, user_id: &str, text: &str, ctx: &SubmissionContext) -> bool {
        match self.notifier.notify_user(user_id, text).await {
            Ok(()) => true,
            Err(notify_error) => {
                warn!(
                    event_name = "pipeline.notify.failed",
                    correlation_id = %ctx.correlation_id,
                    user_id,
                    error = %notify_error,
                    "failed to notify submitting user; not retrying"
                );
                false
            }
        }
    }
}

fn advance(flow: &mut SubmissionFlow, event: SubmissionEvent, ctx: &SubmissionContext) {
    if let Err(transition_error) = flow.apply(event) {
        warn!(
            event_name = "pipeline.flow.invalid_transition",
            correlation_id = %ctx.correlation_id,
            error = %transition_error,
            "ignored invalid submission transition"
        );
    }
}
