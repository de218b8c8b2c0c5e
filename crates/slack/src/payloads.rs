//! Inbound Slack payloads as delivered to the HTTP endpoints.
//!
//! Every field the platform may omit is optional or defaulted so decoding
//! never fails on a partially filled form.

use std::collections::HashMap;

use serde::Deserialize;

/// `application/x-www-form-urlencoded` body of a slash command request.
#[derive(Clone, Debug, Default, PartialEq, Eq, Deserialize)]
pub struct SlashCommandPayload {
    pub command: String,
    #[serde(default)]
    pub text: String,
    #[serde(default)]
    pub user_id: String,
    #[serde(default)]
    pub channel_id: String,
    #[serde(default)]
    pub trigger_id: String,
}

/// Interaction requests arrive as a form with a single `payload` field
/// holding JSON.
#[derive(Clone, Debug, Deserialize)]
pub struct InteractionForm {
    pub payload: String,
}

#[derive(Clone, Debug, Default, PartialEq, Eq, Deserialize)]
pub struct InteractionPayload {
    #[serde(rename = "type")]
    pub interaction_type: String,
    #[serde(default)]
    pub user: InteractionUser,
    #[serde(default)]
    pub view: Option<ViewPayload>,
}

impl InteractionPayload {
    pub fn parse(raw: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(raw)
    }
}

#[derive(Clone, Debug, Default, PartialEq, Eq, Deserialize)]
pub struct InteractionUser {
    #[serde(default)]
    pub id: String,
}

#[derive(Clone, Debug, Default, PartialEq, Eq, Deserialize)]
pub struct ViewPayload {
    #[serde(default)]
    pub id: String,
    #[serde(default)]
    pub callback_id: String,
    #[serde(default)]
    pub state: ViewState,
}

/// `view.state.values`: block id -> action id -> submitted element value.
#[derive(Clone, Debug, Default, PartialEq, Eq, Deserialize)]
pub struct ViewState {
    #[serde(default)]
    pub values: HashMap<String, HashMap<String, ElementValue>>,
}

impl ViewState {
    pub fn element(&self, block_id: &str, action_id: &str) -> Option<&ElementValue> {
        self.values.get(block_id).and_then(|block| block.get(action_id))
    }
}

#[derive(Clone, Debug, Default, PartialEq, Eq, Deserialize)]
pub struct ElementValue {
    #[serde(rename = "type", default)]
    pub element_type: String,
    #[serde(default)]
    pub value: Option<String>,
    #[serde(default)]
    pub selected_option: Option<SelectedOption>,
    #[serde(default)]
    pub files: Option<Vec<FileDescriptor>>,
}

#[derive(Clone, Debug, Default, PartialEq, Eq, Deserialize)]
pub struct SelectedOption {
    #[serde(default)]
    pub value: Option<String>,
}

#[derive(Clone, Debug, Default, PartialEq, Eq, Deserialize)]
pub struct FileDescriptor {
    #[serde(default)]
    pub id: Option<String>,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub mimetype: Option<String>,
}
