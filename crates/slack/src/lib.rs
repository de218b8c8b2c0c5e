//! Slack interface for claimdesk
//!
//! - **Payloads** (`payloads`) - slash command and interaction bodies
//! - **Signatures** (`signature`) - `v0` request signing checks
//! - **Commands** (`commands`) - `/claim` normalization
//! - **Block Kit** (`blocks`) - the claim modal
//! - **Form** (`form`) - modal state to [`claimdesk_core::Submission`]
//! - **Events** (`events`) - dispatcher and handlers
//! - **Client** (`client`) - Web API calls (`views.open`, `files.info`, downloads, DMs)
//!
//! # Flow
//!
//! ```text
//! /claim ──► SlashCommandHandler ──► views.open(claim modal)
//! view_submission ──► ViewSubmissionHandler ──► extract_submission ──► SubmissionSink
//! ```

pub mod blocks;
pub mod client;
pub mod commands;
pub mod events;
pub mod form;
pub mod payloads;
pub mod signature;

pub use client::{SlackApiError, SlackWebClient};
pub use events::{
    claim_dispatcher, EventContext, EventDispatcher, HandlerResult, ModalOpener, SlackEvent,
    SubmissionSink,
};
pub use signature::{SignatureError, SignatureVerifier};
