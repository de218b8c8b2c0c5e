pub mod config;
pub mod domain;
pub mod errors;
pub mod fanout;
pub mod flows;
pub mod messages;
pub mod pipeline;
pub mod relay;

#[cfg(test)]
mod test_support;

pub use config::{AppConfig, ConfigError, ConfigOverrides, LoadOptions, LogFormat};
pub use domain::{
    AttachmentRef, ClaimStatus, RowUpdateBuilder, RowUpdatePayload, Submission, UploadedAsset,
    MAX_ATTACHMENTS, ROW_WIDTH,
};
pub use errors::{
    MissingField, NotifyError, PipelineError, RelayError, SheetError, ValidationError,
};
pub use fanout::FanOut;
pub use flows::{SubmissionEvent, SubmissionFlow, SubmissionState};
pub use pipeline::{
    Notifier, SheetWriter, SubmissionContext, SubmissionOutcome, SubmissionPipeline,
    SubmissionReport,
};
pub use relay::{public_view_url, ByteStream, FileRelay, FileSource, FileStore};
