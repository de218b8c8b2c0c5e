use std::sync::Arc;

use async_trait::async_trait;
use claimdesk_core::{AttachmentRef, ByteStream, FileStore, RelayError};
use reqwest::{header, Url};
use secrecy::ExposeSecret;
use serde::Deserialize;
use serde_json::json;
use tracing::debug;

use crate::credentials::TokenProvider;

#[derive(Debug, Deserialize)]
struct CreatedFile {
    #[serde(default)]
    id: Option<String>,
}

/// Creates files in one Drive folder and shares them by link.
#[derive(Clone)]
pub struct DriveClient {
    http: reqwest::Client,
    api_base_url: String,
    upload_base_url: String,
    folder_id: String,
    tokens: Arc<dyn TokenProvider>,
}

impl DriveClient {
    pub fn new(
        http: reqwest::Client,
        api_base_url: impl Into<String>,
        upload_base_url: impl Into<String>,
        folder_id: impl Into<String>,
        tokens: Arc<dyn TokenProvider>,
    ) -> Self {
        Self {
            http,
            api_base_url: api_base_url.into(),
            upload_base_url: upload_base_url.into(),
            folder_id: folder_id.into(),
            tokens,
        }
    }

    /// Opens a resumable upload session and returns its URL.
    async fn start_session(
        &self,
        attachment: &AttachmentRef,
        token: &str,
    ) -> Result<String, RelayError> {
        let upload_error = |detail: String| RelayError::Upload {
            file_id: attachment.source_file_id.clone(),
            detail,
        };

        let url = endpoint(&self.upload_base_url, &["files"]).map_err(&upload_error)?;
        let mut request = self
            .http
            .post(url)
            .bearer_auth(token)
            .query(&[("uploadType", "resumable"), ("supportsAllDrives", "true"), ("fields", "id")])
            .header("X-Upload-Content-Type", &attachment.mime_type)
            .json(&json!({
                "name": attachment.display_name,
                "mimeType": attachment.mime_type,
                "parents": [self.folder_id],
            }));
        if let Some(size) = attachment.size_bytes {
            request = request.header("X-Upload-Content-Length", size);
        }

        let response = request.send().await.map_err(|error| upload_error(error.to_string()))?;
        let status = response.status();
        if !status.is_success() {
            return Err(upload_error(format!("upload session rejected with HTTP {}", status.as_u16())));
        }

        response
            .headers()
            .get(header::LOCATION)
            .and_then(|value| value.to_str().ok())
            .map(str::to_owned)
            .ok_or_else(|| upload_error("upload session has no Location header".to_owned()))
    }
}

#[async_trait]
impl FileStore for DriveClient {
    async fn create(
        &self,
        attachment: &AttachmentRef,
        content: ByteStream,
    ) -> Result<String, RelayError> {
        let upload_error = |detail: String| RelayError::Upload {
            file_id: attachment.source_file_id.clone(),
            detail,
        };

        let token = self.tokens.access_token().await.map_err(|error| upload_error(error.to_string()))?;
        let session_url = self.start_session(attachment, token.expose_secret()).await?;
        debug!(
            event_name = "pipeline.relay.upload_session_opened",
            file_id = %attachment.source_file_id,
            "drive resumable session opened"
        );

        let mut request = self
            .http
            .put(session_url)
            .bearer_auth(token.expose_secret())
            .header(header::CONTENT_TYPE, &attachment.mime_type)
            .body(reqwest::Body::wrap_stream(content));
        if let Some(size) = attachment.size_bytes {
            request = request.header(header::CONTENT_LENGTH, size);
        }

        let response = request.send().await.map_err(|error| upload_error(error.to_string()))?;
        let status = response.status();
        if !status.is_success() {
            return Err(upload_error(format!("upload rejected with HTTP {}", status.as_u16())));
        }

        let created: CreatedFile =
            response.json().await.map_err(|error| upload_error(error.to_string()))?;
        Ok(created.id.unwrap_or_default())
    }

    async fn grant_public_read(
        &self,
        attachment: &AttachmentRef,
        stored_file_id: &str,
    ) -> Result<(), RelayError> {
        let permission_error = |detail: String| RelayError::Permission {
            file_id: attachment.source_file_id.clone(),
            detail,
        };

        let token =
            self.tokens.access_token().await.map_err(|error| permission_error(error.to_string()))?;
        let url = endpoint(&self.api_base_url, &["files", stored_file_id, "permissions"])
            .map_err(&permission_error)?;

        let response = self
            .http
            .post(url)
            .bearer_auth(token.expose_secret())
            .query(&[("supportsAllDrives", "true")])
            .json(&json!({ "role": "reader", "type": "anyone" }))
            .send()
            .await
            .map_err(|error| permission_error(error.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            return Err(permission_error(format!("HTTP {}", status.as_u16())));
        }
        Ok(())
    }
}

/// Appends path segments to a base URL, percent-encoding each one.
pub(crate) fn endpoint(base_url: &str, segments: &[&str]) -> Result<Url, String> {
    let mut url = Url::parse(base_url).map_err(|error| format!("invalid base url `{base_url}`: {error}"))?;
    url.path_segments_mut()
        .map_err(|()| format!("base url `{base_url}` cannot take a path"))?
        .pop_if_empty()
        .extend(segments);
    Ok(url)
}
