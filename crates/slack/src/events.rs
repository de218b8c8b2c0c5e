use std::{collections::HashMap, sync::Arc};

use async_trait::async_trait;
use claimdesk_core::{
    Submission, SubmissionContext, SubmissionOutcome, SubmissionPipeline, ValidationError,
};
use thiserror::Error;
use tracing::{info, warn};

use crate::{
    blocks::{claim_modal, ModalView, CLAIM_CALLBACK_ID},
    client::SlackApiError,
    commands::{normalize_claim_command, CommandParseError},
    form::extract_submission,
    payloads::{InteractionPayload, SlashCommandPayload, ViewState},
};

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum SlackEvent {
    SlashCommand(SlashCommandPayload),
    ViewSubmission(ViewSubmissionEvent),
    Unsupported { event_type: String },
}

impl SlackEvent {
    pub fn from_interaction(payload: InteractionPayload) -> Self {
        match (payload.interaction_type.as_str(), payload.view) {
            ("view_submission", Some(view)) => Self::ViewSubmission(ViewSubmissionEvent {
                user_id: payload.user.id,
                callback_id: view.callback_id,
                state: view.state,
            }),
            (other, _) => Self::Unsupported { event_type: other.to_owned() },
        }
    }

    pub fn event_type(&self) -> SlackEventType {
        match self {
            Self::SlashCommand(_) => SlackEventType::SlashCommand,
            Self::ViewSubmission(_) => SlackEventType::ViewSubmission,
            Self::Unsupported { .. } => SlackEventType::Unsupported,
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub enum SlackEventType {
    SlashCommand,
    ViewSubmission,
    Unsupported,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ViewSubmissionEvent {
    pub user_id: String,
    pub callback_id: String,
    pub state: ViewState,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct EventContext {
    pub correlation_id: String,
}

impl Default for EventContext {
    fn default() -> Self {
        Self { correlation_id: "unknown-correlation-id".to_owned() }
    }
}

/// Every accepted event is acknowledged before its slow work starts; the
/// work itself runs on a spawned task.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum HandlerResult {
    Acknowledged,
    Ignored,
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum EventHandlerError {
    #[error(transparent)]
    Parse(#[from] CommandParseError),
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum DispatchError {
    #[error(transparent)]
    Handler(#[from] EventHandlerError),
}

#[async_trait]
pub trait EventHandler: Send + Sync {
    fn event_type(&self) -> SlackEventType;
    async fn handle(
        &self,
        event: &SlackEvent,
        ctx: &EventContext,
    ) -> Result<HandlerResult, EventHandlerError>;
}

#[derive(Default)]
pub struct EventDispatcher {
    handlers: HashMap<SlackEventType, Arc<dyn EventHandler>>,
}

impl EventDispatcher {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register<H>(&mut self, handler: H)
    where
        H: EventHandler + 'static,
    {
        self.handlers.insert(handler.event_type(), Arc::new(handler));
    }

    pub async fn dispatch(
        &self,
        event: &SlackEvent,
        ctx: &EventContext,
    ) -> Result<HandlerResult, DispatchError> {
        let Some(handler) = self.handlers.get(&event.event_type()) else {
            return Ok(HandlerResult::Ignored);
        };

        handler.handle(event, ctx).await.map_err(DispatchError::from)
    }

    pub fn handler_count(&self) -> usize {
        self.handlers.len()
    }
}

/// Dispatcher wired with the two handlers the claim bot needs.
pub fn claim_dispatcher(
    opener: Arc<dyn ModalOpener>,
    sink: Arc<dyn SubmissionSink>,
) -> EventDispatcher {
    let mut dispatcher = EventDispatcher::new();
    dispatcher.register(SlashCommandHandler::new(opener));
    dispatcher.register(ViewSubmissionHandler::new(sink));
    dispatcher
}

#[async_trait]
pub trait ModalOpener: Send + Sync {
    async fn open_modal(&self, trigger_id: &str, view: &ModalView) -> Result<(), SlackApiError>;
}

/// Receives an extracted (or rejected) claim form for processing.
#[async_trait]
pub trait SubmissionSink: Send + Sync {
    async fn submit(
        &self,
        user_id: &str,
        extracted: Result<Submission, ValidationError>,
        ctx: &EventContext,
    );
}

#[async_trait]
impl SubmissionSink for SubmissionPipeline {
    async fn submit(
        &self,
        user_id: &str,
        extracted: Result<Submission, ValidationError>,
        ctx: &EventContext,
    ) {
        let context = SubmissionContext { correlation_id: ctx.correlation_id.clone() };
        let report = self.process(user_id, extracted, &context).await;
        let outcome = match &report.outcome {
            SubmissionOutcome::Rejected { .. } => "rejected",
            SubmissionOutcome::Failed { .. } => "failed",
            SubmissionOutcome::Completed { .. } => "completed",
        };
        info!(
            event_name = "pipeline.submission.finished",
            correlation_id = %ctx.correlation_id,
            user_id,
            outcome,
            final_state = ?report.final_state,
            notified = report.notified,
            "claim submission finished"
        );
    }
}

pub struct SlashCommandHandler {
    opener: Arc<dyn ModalOpener>,
}

impl SlashCommandHandler {
    pub fn new(opener: Arc<dyn ModalOpener>) -> Self {
        Self { opener }
    }
}

#[async_trait]
impl EventHandler for SlashCommandHandler {
    fn event_type(&self) -> SlackEventType {
        SlackEventType::SlashCommand
    }

    async fn handle(
        &self,
        event: &SlackEvent,
        ctx: &EventContext,
    ) -> Result<HandlerResult, EventHandlerError> {
        let SlackEvent::SlashCommand(payload) = event else {
            return Ok(HandlerResult::Ignored);
        };

        let command = normalize_claim_command(payload.clone())?;
        info!(
            event_name = "ingress.slack.command_received",
            correlation_id = %ctx.correlation_id,
            user_id = %command.user_id,
            channel_id = %command.channel_id,
            "opening claim modal"
        );

        let opener = Arc::clone(&self.opener);
        let correlation_id = ctx.correlation_id.clone();
        tokio::spawn(async move {
            if let Err(error) = opener.open_modal(&command.trigger_id, &claim_modal()).await {
                warn!(
                    event_name = "ingress.slack.modal_open_failed",
                    correlation_id = %correlation_id,
                    user_id = %command.user_id,
                    error = %error,
                    "failed to open claim modal"
                );
            }
        });

        Ok(HandlerResult::Acknowledged)
    }
}

pub struct ViewSubmissionHandler {
    sink: Arc<dyn SubmissionSink>,
}

impl ViewSubmissionHandler {
    pub fn new(sink: Arc<dyn SubmissionSink>) -> Self {
        Self { sink }
    }
}

#[async_trait]
impl EventHandler for ViewSubmissionHandler {
    fn event_type(&self) -> SlackEventType {
        SlackEventType::ViewSubmission
    }

    async fn handle(
        &self,
        event: &SlackEvent,
        ctx: &EventContext,
    ) -> Result<HandlerResult, EventHandlerError> {
        let SlackEvent::ViewSubmission(submission) = event else {
            return Ok(HandlerResult::Ignored);
        };
        if submission.callback_id != CLAIM_CALLBACK_ID {
            return Ok(HandlerResult::Ignored);
        }

        let extracted = extract_submission(&submission.user_id, &submission.state);
        info!(
            event_name = "ingress.slack.submission_received",
            correlation_id = %ctx.correlation_id,
            user_id = %submission.user_id,
            valid = extracted.is_ok(),
            "claim form submitted"
        );

        let sink = Arc::clone(&self.sink);
        let user_id = submission.user_id.clone();
        let ctx = ctx.clone();
        tokio::spawn(async move {
            sink.submit(&user_id, extracted, &ctx).await;
        });

        Ok(HandlerResult::Acknowledged)
    }
}
