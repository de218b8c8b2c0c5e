use std::sync::Arc;

use async_trait::async_trait;
use claimdesk_core::{RowUpdatePayload, SheetError, SheetWriter};
use secrecy::ExposeSecret;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::credentials::TokenProvider;
use crate::drive::endpoint;

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct ValueRange<'a> {
    range: &'a str,
    major_dimension: &'static str,
    values: Vec<Vec<String>>,
}

#[derive(Debug, Deserialize)]
struct GoogleErrorBody {
    error: GoogleErrorDetail,
}

#[derive(Debug, Deserialize)]
struct GoogleErrorDetail {
    #[serde(default)]
    message: String,
}

#[derive(Clone)]
pub struct SheetsClient {
    http: reqwest::Client,
    api_base_url: String,
    spreadsheet_id: String,
    tokens: Arc<dyn TokenProvider>,
}

impl SheetsClient {
    pub fn new(
        http: reqwest::Client,
        api_base_url: impl Into<String>,
        spreadsheet_id: impl Into<String>,
        tokens: Arc<dyn TokenProvider>,
    ) -> Self {
        Self {
            http,
            api_base_url: api_base_url.into(),
            spreadsheet_id: spreadsheet_id.into(),
            tokens,
        }
    }
}

#[async_trait]
impl SheetWriter for SheetsClient {
    async fn write_row(&self, payload: &RowUpdatePayload) -> Result<(), SheetError> {
        let token = self
            .tokens
            .access_token()
            .await
            .map_err(|error| SheetError::Credential(error.to_string()))?;
        let url = endpoint(
            &self.api_base_url,
            &["spreadsheets", self.spreadsheet_id.as_str(), "values", payload.range.as_str()],
        )
        .map_err(SheetError::Transport)?;

        let body =
            ValueRange { range: &payload.range, major_dimension: "ROWS", values: payload.rows() };
        let response = self
            .http
            .put(url)
            .bearer_auth(token.expose_secret())
            .query(&[("valueInputOption", "USER_ENTERED")])
            .json(&body)
            .send()
            .await
            .map_err(|error| SheetError::Transport(error.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            let raw = response.text().await.unwrap_or_default();
            let detail = serde_json::from_str::<GoogleErrorBody>(&raw)
                .map(|body| body.error.message)
                .unwrap_or(raw);
            return Err(SheetError::Rejected {
                range: payload.range.clone(),
                status: status.as_u16(),
                detail,
            });
        }

        debug!(
            event_name = "google.sheets.values_updated",
            range = %payload.range,
            "sheet values updated"
        );
        Ok(())
    }
}
