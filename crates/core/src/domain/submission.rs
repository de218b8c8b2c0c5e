use std::fmt;

use serde::{Deserialize, Serialize};

/// Upper bound the claim form places on attachments. Downstream code never
/// relies on it; it only sizes the modal's file input.
pub const MAX_ATTACHMENTS: usize = 5;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ClaimStatus {
    BackToStock,
    Unsellable,
    NeedsParts,
    SellableOpenBox,
}

impl ClaimStatus {
    pub const ALL: [ClaimStatus; 4] =
        [Self::BackToStock, Self::Unsellable, Self::NeedsParts, Self::SellableOpenBox];

    /// Literal written into the spreadsheet and carried as the select option value.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::BackToStock => "BackToStock",
            Self::Unsellable => "Unsellable",
            Self::NeedsParts => "NeedsParts",
            Self::SellableOpenBox => "SellableOpenBox",
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            Self::BackToStock => "Back to stock",
            Self::Unsellable => "Unsellable",
            Self::NeedsParts => "Needs parts",
            Self::SellableOpenBox => "Sellable (open box)",
        }
    }
}

impl fmt::Display for ClaimStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for ClaimStatus {
    type Err = String;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|status| status.as_str() == value.trim())
            .ok_or_else(|| format!("unknown claim status `{value}`"))
    }
}

/// One completed claim form from one user.
///
/// `status` is kept as the raw submitted string: unknown or empty values are
/// written to the sheet untouched.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Submission {
    pub user_id: String,
    pub row_number: String,
    pub status: String,
    pub notes: String,
    pub attachment_ids: Vec<String>,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct AttachmentRef {
    pub source_file_id: String,
    pub download_url: String,
    pub display_name: String,
    pub mime_type: String,
    pub size_bytes: Option<u64>,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct UploadedAsset {
    pub public_url: String,
}

impl UploadedAsset {
    pub fn new(public_url: impl Into<String>) -> Self {
        Self { public_url: public_url.into() }
    }
}
