use thiserror::Error;

use crate::payloads::SlashCommandPayload;

pub const CLAIM_COMMAND: &str = "/claim";

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ClaimCommand {
    pub user_id: String,
    pub channel_id: String,
    pub trigger_id: String,
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum CommandParseError {
    #[error("unsupported slash command: {0}")]
    UnsupportedCommand(String),
    #[error("slash command `{0}` arrived without a trigger id")]
    MissingTrigger(String),
}

/// `/claim` takes no arguments; any text after it is ignored.
pub fn normalize_claim_command(
    payload: SlashCommandPayload,
) -> Result<ClaimCommand, CommandParseError> {
    let command = payload.command.trim();
    if !command.eq_ignore_ascii_case(CLAIM_COMMAND) {
        return Err(CommandParseError::UnsupportedCommand(payload.command));
    }
    if payload.trigger_id.trim().is_empty() {
        return Err(CommandParseError::MissingTrigger(payload.command));
    }

    Ok(ClaimCommand {
        user_id: payload.user_id,
        channel_id: payload.channel_id,
        trigger_id: payload.trigger_id,
    })
}
