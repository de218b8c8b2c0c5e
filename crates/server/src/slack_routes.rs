//! Slack HTTP ingress: `/slack/commands` and `/slack/interactions`.
//!
//! Both routes sit behind signature verification and answer with an empty
//! 200 once the event is handed to the dispatcher.

use std::sync::Arc;

use axum::{
    body::Body,
    extract::{Request, State},
    http::StatusCode,
    middleware::{self, Next},
    response::{IntoResponse, Response},
    routing::post,
    Form, Router,
};
use chrono::Utc;
use claimdesk_slack::{
    payloads::{InteractionForm, InteractionPayload, SlashCommandPayload},
    signature::{SIGNATURE_HEADER, TIMESTAMP_HEADER},
    EventContext, EventDispatcher, HandlerResult, SignatureVerifier, SlackEvent,
};
use http_body_util::{BodyExt, LengthLimitError, Limited};
use tracing::{info, warn};
use uuid::Uuid;

const MAX_BODY_BYTES: usize = 1024 * 1024;

#[derive(Clone)]
pub struct SlackState {
    dispatcher: Arc<EventDispatcher>,
    verifier: Arc<SignatureVerifier>,
}

impl SlackState {
    pub fn new(dispatcher: EventDispatcher, verifier: SignatureVerifier) -> Self {
        Self { dispatcher: Arc::new(dispatcher), verifier: Arc::new(verifier) }
    }
}

pub fn router(state: SlackState) -> Router {
    Router::new()
        .route("/slack/commands", post(slash_command))
        .route("/slack/interactions", post(interaction))
        .route_layer(middleware::from_fn_with_state(state.clone(), verify_signature))
        .with_state(state)
}

/// Buffers the body, checks the `v0` signature over the raw bytes and hands
/// an identical request on to the form extractors.
async fn verify_signature(State(state): State<SlackState>, request: Request, next: Next) -> Response {
    let (parts, body) = request.into_parts();
    let bytes = match Limited::new(body, MAX_BODY_BYTES).collect().await {
        Ok(collected) => collected.to_bytes(),
        Err(error) => {
            let status = if error.downcast_ref::<LengthLimitError>().is_some() {
                StatusCode::PAYLOAD_TOO_LARGE
            } else {
                StatusCode::BAD_REQUEST
            };
            warn!(
                event_name = "ingress.slack.body_unreadable",
                path = %parts.uri.path(),
                status = status.as_u16(),
                error = %error,
                "could not read slack request body"
            );
            return status.into_response();
        }
    };

    let header = |name: &str| parts.headers.get(name).and_then(|value| value.to_str().ok());
    let now = u64::try_from(Utc::now().timestamp()).unwrap_or_default();
    if let Err(error) =
        state.verifier.verify(header(TIMESTAMP_HEADER), header(SIGNATURE_HEADER), &bytes, now)
    {
        warn!(
            event_name = "ingress.slack.signature_rejected",
            path = %parts.uri.path(),
            error = %error,
            "rejected unsigned or stale slack request"
        );
        return StatusCode::UNAUTHORIZED.into_response();
    }

    next.run(Request::from_parts(parts, Body::from(bytes))).await
}

async fn slash_command(
    State(state): State<SlackState>,
    Form(payload): Form<SlashCommandPayload>,
) -> Response {
    let ctx = request_context();
    match state.dispatcher.dispatch(&SlackEvent::SlashCommand(payload), &ctx).await {
        Ok(_) => StatusCode::OK.into_response(),
        Err(error) => {
            warn!(
                event_name = "ingress.slack.command_rejected",
                correlation_id = %ctx.correlation_id,
                error = %error,
                "slash command not handled"
            );
            (StatusCode::OK, "Only /claim is supported.").into_response()
        }
    }
}

async fn interaction(State(state): State<SlackState>, Form(form): Form<InteractionForm>) -> Response {
    let ctx = request_context();
    let payload = match InteractionPayload::parse(&form.payload) {
        Ok(payload) => payload,
        Err(error) => {
            warn!(
                event_name = "ingress.slack.interaction_undecodable",
                correlation_id = %ctx.correlation_id,
                error = %error,
                "could not decode interaction payload"
            );
            return StatusCode::BAD_REQUEST.into_response();
        }
    };

    let event = SlackEvent::from_interaction(payload);
    match state.dispatcher.dispatch(&event, &ctx).await {
        Ok(HandlerResult::Ignored) => {
            info!(
                event_name = "ingress.slack.interaction_ignored",
                correlation_id = %ctx.correlation_id,
                event_type = ?event.event_type(),
                "interaction acknowledged without processing"
            );
        }
        Ok(HandlerResult::Acknowledged) => {}
        Err(error) => {
            warn!(
                event_name = "ingress.slack.interaction_failed",
                correlation_id = %ctx.correlation_id,
                error = %error,
                "interaction handler failed"
            );
        }
    }
    StatusCode::OK.into_response()
}

fn request_context() -> EventContext {
    EventContext { correlation_id: format!("req-{}", Uuid::new_v4()) }
}
