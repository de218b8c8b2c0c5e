use claimdesk_core::{ClaimStatus, MAX_ATTACHMENTS};
use serde::Serialize;

pub const CLAIM_CALLBACK_ID: &str = "claim_submission";

pub const ROW_NUMBER_BLOCK: &str = "row_number_block";
pub const ROW_NUMBER_ACTION: &str = "row_number";
pub const STATUS_BLOCK: &str = "status_block";
pub const STATUS_ACTION: &str = "status";
pub const NOTES_BLOCK: &str = "notes_block";
pub const NOTES_ACTION: &str = "notes";
pub const ATTACHMENTS_BLOCK: &str = "attachments_block";
pub const ATTACHMENTS_ACTION: &str = "attachments";

const IMAGE_FILE_TYPES: [&str; 5] = ["png", "jpg", "jpeg", "gif", "webp"];

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum TextObject {
    PlainText { text: String },
}

impl TextObject {
    pub fn plain(text: impl Into<String>) -> Self {
        Self::PlainText { text: text.into() }
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct OptionObject {
    pub text: TextObject,
    pub value: String,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum InputElement {
    PlainTextInput {
        action_id: String,
        #[serde(skip_serializing_if = "std::ops::Not::not")]
        multiline: bool,
        #[serde(skip_serializing_if = "Option::is_none")]
        placeholder: Option<TextObject>,
    },
    StaticSelect {
        action_id: String,
        #[serde(skip_serializing_if = "Option::is_none")]
        placeholder: Option<TextObject>,
        options: Vec<OptionObject>,
    },
    FileInput {
        action_id: String,
        filetypes: Vec<String>,
        max_files: usize,
    },
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Block {
    Input {
        block_id: String,
        label: TextObject,
        element: InputElement,
        #[serde(skip_serializing_if = "std::ops::Not::not")]
        optional: bool,
    },
}

/// A `views.open` modal definition.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct ModalView {
    #[serde(rename = "type")]
    pub view_type: &'static str,
    pub callback_id: String,
    pub title: TextObject,
    pub submit: TextObject,
    pub close: TextObject,
    pub blocks: Vec<Block>,
}

pub struct ModalBuilder {
    callback_id: String,
    title: String,
    submit: String,
    close: String,
    blocks: Vec<Block>,
}

impl ModalBuilder {
    pub fn new(callback_id: impl Into<String>, title: impl Into<String>) -> Self {
        Self {
            callback_id: callback_id.into(),
            title: title.into(),
            submit: "Submit".to_owned(),
            close: "Cancel".to_owned(),
            blocks: Vec::new(),
        }
    }

    pub fn input<F>(mut self, block_id: impl Into<String>, label: impl Into<String>, build: F) -> Self
    where
        F: FnOnce(&mut InputBuilder),
    {
        let mut builder = InputBuilder::default();
        build(&mut builder);
        if let Some(element) = builder.element {
            self.blocks.push(Block::Input {
                block_id: block_id.into(),
                label: TextObject::plain(label),
                element,
                optional: builder.optional,
            });
        }
        self
    }

    pub fn build(self) -> ModalView {
        ModalView {
            view_type: "modal",
            callback_id: self.callback_id,
            title: TextObject::plain(self.title),
            submit: TextObject::plain(self.submit),
            close: TextObject::plain(self.close),
            blocks: self.blocks,
        }
    }
}

#[derive(Default)]
pub struct InputBuilder {
    element: Option<InputElement>,
    optional: bool,
}

impl InputBuilder {
    pub fn optional(&mut self) -> &mut Self {
        self.optional = true;
        self
    }

    pub fn text(&mut self, action_id: &str, placeholder: Option<&str>) -> &mut Self {
        self.element = Some(InputElement::PlainTextInput {
            action_id: action_id.to_owned(),
            multiline: false,
            placeholder: placeholder.map(TextObject::plain),
        });
        self
    }

    pub fn multiline(&mut self, action_id: &str) -> &mut Self {
        self.element = Some(InputElement::PlainTextInput {
            action_id: action_id.to_owned(),
            multiline: true,
            placeholder: None,
        });
        self
    }

    pub fn select<'a>(
        &mut self,
        action_id: &str,
        placeholder: &str,
        options: impl IntoIterator<Item = (&'a str, &'a str)>,
    ) -> &mut Self {
        self.element = Some(InputElement::StaticSelect {
            action_id: action_id.to_owned(),
            placeholder: Some(TextObject::plain(placeholder)),
            options: options
                .into_iter()
                .map(|(label, value)| OptionObject {
                    text: TextObject::plain(label),
                    value: value.to_owned(),
                })
                .collect(),
        });
        self
    }

    pub fn files(&mut self, action_id: &str, filetypes: &[&str], max_files: usize) -> &mut Self {
        self.element = Some(InputElement::FileInput {
            action_id: action_id.to_owned(),
            filetypes: filetypes.iter().map(|kind| (*kind).to_owned()).collect(),
            max_files,
        });
        self
    }
}

/// The single form this bot collects.
pub fn claim_modal() -> ModalView {
    ModalBuilder::new(CLAIM_CALLBACK_ID, "Submit claim")
        .input(ROW_NUMBER_BLOCK, "Row number", |input| {
            input.text(ROW_NUMBER_ACTION, Some("e.g. 42"));
        })
        .input(STATUS_BLOCK, "Status", |input| {
            input.select(
                STATUS_ACTION,
                "Choose a status",
                ClaimStatus::ALL.iter().map(|status| (status.label(), status.as_str())),
            );
        })
        .input(NOTES_BLOCK, "Notes", |input| {
            input.multiline(NOTES_ACTION).optional();
        })
        .input(ATTACHMENTS_BLOCK, "Photos", |input| {
            input.files(ATTACHMENTS_ACTION, &IMAGE_FILE_TYPES, MAX_ATTACHMENTS).optional();
        })
        .build()
}
