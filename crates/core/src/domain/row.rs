use serde::Serialize;

use crate::domain::submission::{Submission, UploadedAsset};

/// Cells in the `L:S` block written for every claim.
pub const ROW_WIDTH: usize = 8;

const TRAILING_URL_SLOTS: usize = 4;

/// Fixed-width overwrite of one sheet row.
///
/// `values` is always `ROW_WIDTH` long so that unused columns are cleared
/// rather than left holding a previous claim's links.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct RowUpdatePayload {
    pub range: String,
    pub values: [String; ROW_WIDTH],
}

impl RowUpdatePayload {
    /// Two-dimensional form expected by the values API (one row).
    pub fn rows(&self) -> Vec<Vec<String>> {
        vec![self.values.to_vec()]
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct RowUpdateBuilder {
    sheet_name: String,
}

impl RowUpdateBuilder {
    pub fn new(sheet_name: impl Into<String>) -> Self {
        Self { sheet_name: sheet_name.into() }
    }

    pub fn build(&self, submission: &Submission, assets: &[UploadedAsset]) -> RowUpdatePayload {
        let image = assets.first().map(|asset| image_formula(&asset.public_url)).unwrap_or_default();

        // Anything past the fifth attachment has no column and is dropped.
        let mut trailing = assets
            .iter()
            .skip(1)
            .take(TRAILING_URL_SLOTS)
            .map(|asset| asset.public_url.clone());
        let mut next_url = || trailing.next().unwrap_or_default();

        RowUpdatePayload {
            range: row_range(&self.sheet_name, &submission.row_number),
            values: [
                submission.status.clone(),
                String::new(),
                submission.notes.clone(),
                image,
                next_url(),
                next_url(),
                next_url(),
                next_url(),
            ],
        }
    }
}

/// The row number is substituted verbatim; a non-numeric value yields a range
/// the spreadsheet API rejects.
pub fn row_range(sheet_name: &str, row_number: &str) -> String {
    format!("{sheet_name}!L{row_number}:S{row_number}")
}

/// The URL is embedded literally, quotes included.
pub fn image_formula(url: &str) -> String {
    format!("=IMAGE(\"{url}\", 1)")
}
