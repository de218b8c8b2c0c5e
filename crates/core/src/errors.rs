use thiserror::Error;

use crate::flows::FlowTransitionError;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum MissingField {
    RowNumber,
}

impl MissingField {
    pub fn field_name(&self) -> &'static str {
        match self {
            Self::RowNumber => "row_number",
        }
    }

    pub fn user_message(&self) -> &'static str {
        match self {
            Self::RowNumber => "Row number is required.",
        }
    }
}

/// Raised before any external call is made.
#[derive(Clone, Debug, Error, PartialEq, Eq)]
#[error("submission is missing required fields: {missing:?}")]
pub struct ValidationError {
    pub missing: Vec<MissingField>,
}

impl ValidationError {
    pub fn new(missing: Vec<MissingField>) -> Self {
        Self { missing }
    }
}

#[derive(Clone, Debug, Error, PartialEq, Eq)]
pub enum RelayError {
    #[error("metadata lookup failed for attachment `{file_id}`: {detail}")]
    Metadata { file_id: String, detail: String },
    #[error("download failed for attachment `{file_id}`: {detail}")]
    Download { file_id: String, detail: String },
    #[error("upload failed for attachment `{file_id}`: {detail}")]
    Upload { file_id: String, detail: String },
    #[error("permission grant failed for attachment `{file_id}`: {detail}")]
    Permission { file_id: String, detail: String },
    #[error("relay for attachment `{file_id}` timed out after {timeout_secs}s")]
    Timeout { file_id: String, timeout_secs: u64 },
    #[error("relay task for attachment `{file_id}` aborted: {detail}")]
    Aborted { file_id: String, detail: String },
}

impl RelayError {
    pub fn file_id(&self) -> &str {
        match self {
            Self::Metadata { file_id, .. }
            | Self::Download { file_id, .. }
            | Self::Upload { file_id, .. }
            | Self::Permission { file_id, .. }
            | Self::Timeout { file_id, .. }
            | Self::Aborted { file_id, .. } => file_id,
        }
    }

    pub fn stage(&self) -> &'static str {
        match self {
            Self::Metadata { .. } => "metadata",
            Self::Download { .. } => "download",
            Self::Upload { .. } => "upload",
            Self::Permission { .. } => "permission",
            Self::Timeout { .. } => "timeout",
            Self::Aborted { .. } => "aborted",
        }
    }
}

#[derive(Clone, Debug, Error, PartialEq, Eq)]
pub enum SheetError {
    #[error("spreadsheet rejected update of `{range}` with status {status}: {detail}")]
    Rejected { range: String, status: u16, detail: String },
    #[error("spreadsheet request failed: {0}")]
    Transport(String),
    #[error("spreadsheet credential unavailable: {0}")]
    Credential(String),
    #[error("spreadsheet update timed out after {timeout_secs}s")]
    Timeout { timeout_secs: u64 },
}

#[derive(Clone, Debug, Error, PartialEq, Eq)]
pub enum NotifyError {
    #[error("notification rejected by chat platform: {0}")]
    Rejected(String),
    #[error("notification request failed: {0}")]
    Transport(String),
}

#[derive(Clone, Debug, Error, PartialEq, Eq)]
pub enum PipelineError {
    #[error(transparent)]
    Relay(#[from] RelayError),
    #[error(transparent)]
    Sheet(#[from] SheetError),
    #[error(transparent)]
    Flow(#[from] FlowTransitionError),
}
