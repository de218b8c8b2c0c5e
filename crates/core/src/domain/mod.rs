pub mod row;
pub mod submission;

pub use row::{RowUpdateBuilder, RowUpdatePayload, ROW_WIDTH};
pub use submission::{AttachmentRef, ClaimStatus, Submission, UploadedAsset, MAX_ATTACHMENTS};
