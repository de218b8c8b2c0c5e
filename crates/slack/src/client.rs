//! Slack Web API calls the claim flow needs: `views.open`, `files.info`,
//! private file download and `chat.postMessage`.

use async_trait::async_trait;
use claimdesk_core::{AttachmentRef, ByteStream, FileSource, Notifier, NotifyError, RelayError};
use futures::TryStreamExt;
use secrecy::{ExposeSecret, SecretString};
use serde::{de::DeserializeOwned, Deserialize, Serialize};
use serde_json::json;
use thiserror::Error;
use tracing::debug;

use crate::blocks::ModalView;
use crate::events::ModalOpener;

#[derive(Clone, Debug, Error, PartialEq, Eq)]
pub enum SlackApiError {
    #[error("slack request for `{method}` failed: {detail}")]
    Transport { method: String, detail: String },
    #[error("slack returned HTTP {status} for `{method}`")]
    Status { method: String, status: u16 },
    #[error("slack method `{method}` returned error `{error}`")]
    Api { method: String, error: String },
    #[error("could not decode slack response for `{method}`: {detail}")]
    Decode { method: String, detail: String },
}

#[derive(Clone, Debug, Default, PartialEq, Eq, Deserialize)]
pub struct SlackFile {
    pub id: String,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub title: Option<String>,
    #[serde(default)]
    pub mimetype: Option<String>,
    #[serde(default)]
    pub size: Option<u64>,
    #[serde(default)]
    pub url_private_download: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ApiResponse {
    ok: bool,
    #[serde(default)]
    error: Option<String>,
}

#[derive(Debug, Deserialize)]
struct FileInfoResponse {
    ok: bool,
    #[serde(default)]
    error: Option<String>,
    #[serde(default)]
    file: Option<SlackFile>,
}

#[derive(Clone)]
pub struct SlackWebClient {
    http: reqwest::Client,
    api_base_url: String,
    bot_token: SecretString,
}

impl SlackWebClient {
    pub fn new(http: reqwest::Client, api_base_url: impl Into<String>, bot_token: SecretString) -> Self {
        Self { http, api_base_url: api_base_url.into(), bot_token }
    }

    fn method_url(&self, method: &str) -> String {
        format!("{}/{method}", self.api_base_url.trim_end_matches('/'))
    }

    pub async fn open_view(&self, trigger_id: &str, view: &ModalView) -> Result<(), SlackApiError> {
        let response: ApiResponse =
            self.post_json("views.open", &json!({ "trigger_id": trigger_id, "view": view })).await?;
        ensure_ok("views.open", response.ok, response.error)
    }

    pub async fn post_message(&self, channel: &str, text: &str) -> Result<(), SlackApiError> {
        let response: ApiResponse =
            self.post_json("chat.postMessage", &json!({ "channel": channel, "text": text })).await?;
        ensure_ok("chat.postMessage", response.ok, response.error)
    }

    pub async fn file_info(&self, file_id: &str) -> Result<SlackFile, SlackApiError> {
        const METHOD: &str = "files.info";
        let response = self
            .http
            .get(self.method_url(METHOD))
            .bearer_auth(self.bot_token.expose_secret())
            .query(&[("file", file_id)])
            .send()
            .await
            .map_err(|error| transport(METHOD, error))?;
        let body: FileInfoResponse = decode(METHOD, response).await?;
        ensure_ok(METHOD, body.ok, body.error)?;
        body.file.ok_or_else(|| SlackApiError::Decode {
            method: METHOD.to_owned(),
            detail: "response has no `file` object".to_owned(),
        })
    }

    async fn post_json<B, R>(&self, method: &str, body: &B) -> Result<R, SlackApiError>
    where
        B: Serialize + ?Sized,
        R: DeserializeOwned,
    {
        let response = self
            .http
            .post(self.method_url(method))
            .bearer_auth(self.bot_token.expose_secret())
            .json(body)
            .send()
            .await
            .map_err(|error| transport(method, error))?;
        decode(method, response).await
    }
}

fn transport(method: &str, error: reqwest::Error) -> SlackApiError {
    SlackApiError::Transport { method: method.to_owned(), detail: error.to_string() }
}

async fn decode<R: DeserializeOwned>(method: &str, response: reqwest::Response) -> Result<R, SlackApiError> {
    let status = response.status();
    if !status.is_success() {
        return Err(SlackApiError::Status { method: method.to_owned(), status: status.as_u16() });
    }
    response
        .json()
        .await
        .map_err(|error| SlackApiError::Decode { method: method.to_owned(), detail: error.to_string() })
}

fn ensure_ok(method: &str, ok: bool, error: Option<String>) -> Result<(), SlackApiError> {
    if ok {
        return Ok(());
    }
    Err(SlackApiError::Api {
        method: method.to_owned(),
        error: error.unwrap_or_else(|| "unknown_error".to_owned()),
    })
}

#[async_trait]
impl FileSource for SlackWebClient {
    async fn lookup(&self, file_id: &str) -> Result<AttachmentRef, RelayError> {
        let file = self.file_info(file_id).await.map_err(|error| RelayError::Metadata {
            file_id: file_id.to_owned(),
            detail: error.to_string(),
        })?;

        let download_url = file
            .url_private_download
            .filter(|url| !url.trim().is_empty())
            .ok_or_else(|| RelayError::Metadata {
                file_id: file_id.to_owned(),
                detail: "file has no url_private_download".to_owned(),
            })?;

        Ok(AttachmentRef {
            source_file_id: file_id.to_owned(),
            download_url,
            display_name: file.name.or(file.title).unwrap_or_else(|| file_id.to_owned()),
            mime_type: file.mimetype.unwrap_or_else(|| "application/octet-stream".to_owned()),
            size_bytes: file.size,
        })
    }

    async fn open(&self, attachment: &AttachmentRef) -> Result<ByteStream, RelayError> {
        let download_error = |detail: String| RelayError::Download {
            file_id: attachment.source_file_id.clone(),
            detail,
        };

        let response = self
            .http
            .get(&attachment.download_url)
            .bearer_auth(self.bot_token.expose_secret())
            .send()
            .await
            .map_err(|error| download_error(error.to_string()))?;
        let status = response.status();
        if !status.is_success() {
            return Err(download_error(format!("HTTP {}", status.as_u16())));
        }

        debug!(
            event_name = "pipeline.relay.download_opened",
            file_id = %attachment.source_file_id,
            content_length = ?response.content_length(),
            "streaming attachment from slack"
        );
        Ok(Box::pin(response.bytes_stream().map_err(std::io::Error::other)))
    }
}

#[async_trait]
impl Notifier for SlackWebClient {
    /// Posting to a user id delivers a direct message from the bot.
    async fn notify_user(&self, user_id: &str, text: &str) -> Result<(), NotifyError> {
        self.post_message(user_id, text).await.map_err(|error| match error {
            SlackApiError::Api { error, .. } => NotifyError::Rejected(error),
            other => NotifyError::Transport(other.to_string()),
        })
    }
}

#[async_trait]
impl ModalOpener for SlackWebClient {
    async fn open_modal(&self, trigger_id: &str, view: &ModalView) -> Result<(), SlackApiError> {
        self.open_view(trigger_id, view).await
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;
    use std::sync::Arc;

    use axum::{
        extract::{Path, Query, State},
        http::{HeaderMap, StatusCode},
        routing::{get, post},
        Json, Router,
    };
    use claimdesk_core::{FileSource, Notifier, NotifyError, RelayError};
    use futures::TryStreamExt;
    use serde_json::{json, Value};
    use tokio::sync::Mutex;

    use super::{SlackApiError, SlackWebClient};
    use crate::blocks::claim_modal;

    #[derive(Clone, Default)]
    struct Recorded {
        base_url: Arc<Mutex<String>>,
        auth_headers: Arc<Mutex<Vec<String>>>,
        posts: Arc<Mutex<Vec<(String, Value)>>>,
    }

    async fn record_auth(state: &Recorded, headers: &HeaderMap) {
        let auth = headers
            .get("authorization")
            .and_then(|value| value.to_str().ok())
            .unwrap_or_default()
            .to_owned();
        state.auth_headers.lock().await.push(auth);
    }

    async fn files_info(
        State(state): State<Recorded>,
        headers: HeaderMap,
        Query(query): Query<HashMap<String, String>>,
    ) -> Json<Value> {
        record_auth(&state, &headers).await;
        let base = state.base_url.lock().await.clone();
        match query.get("file").map(String::as_str) {
            Some("F1") => Json(json!({
                "ok": true,
                "file": {
                    "id": "F1",
                    "name": "damage.png",
                    "mimetype": "image/png",
                    "size": 11,
                    "url_private_download": format!("{base}/download/F1")
                }
            })),
            Some("F-nourl") => Json(json!({"ok": true, "file": {"id": "F-nourl", "name": "x.png"}})),
            _ => Json(json!({"ok": false, "error": "file_not_found"})),
        }
    }

    async fn download(
        State(state): State<Recorded>,
        headers: HeaderMap,
        Path(id): Path<String>,
    ) -> Result<&'static str, StatusCode> {
        record_auth(&state, &headers).await;
        if id == "F1" {
            Ok("hello bytes")
        } else {
            Err(StatusCode::FORBIDDEN)
        }
    }

    async fn api_post(
        State(state): State<Recorded>,
        Path(method): Path<String>,
        Json(body): Json<Value>,
    ) -> Json<Value> {
        state.posts.lock().await.push((method, body.clone()));
        if body["channel"] == "U-gone" {
            return Json(json!({"ok": false, "error": "user_not_found"}));
        }
        Json(json!({"ok": true}))
    }

    async fn serve() -> (SlackWebClient, Recorded) {
        let state = Recorded::default();
        let router = Router::new()
            .route("/api/files.info", get(files_info))
            .route("/api/{method}", post(api_post))
            .route("/download/{id}", get(download))
            .with_state(state.clone());

        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.expect("bind");
        let addr = listener.local_addr().expect("local addr");
        tokio::spawn(async move {
            axum::serve(listener, router).await.expect("serve");
        });

        let base = format!("http://{addr}");
        *state.base_url.lock().await = base.clone();
        let client =
            SlackWebClient::new(reqwest::Client::new(), format!("{base}/api"), "xoxb-test".to_owned().into());
        (client, state)
    }

    #[tokio::test]
    async fn lookup_maps_file_metadata() {
        let (client, state) = serve().await;

        let attachment = client.lookup("F1").await.expect("lookup");

        assert_eq!(attachment.display_name, "damage.png");
        assert_eq!(attachment.mime_type, "image/png");
        assert_eq!(attachment.size_bytes, Some(11));
        assert!(attachment.download_url.ends_with("/download/F1"));
        assert_eq!(state.auth_headers.lock().await.clone(), vec!["Bearer xoxb-test".to_owned()]);
    }

    #[tokio::test]
    async fn lookup_without_download_url_is_metadata_error() {
        let (client, _) = serve().await;

        let error = client.lookup("F-nourl").await.expect_err("must fail");
        assert!(matches!(error, RelayError::Metadata { ref file_id, .. } if file_id == "F-nourl"));
    }

    #[tokio::test]
    async fn lookup_api_error_is_metadata_error() {
        let (client, _) = serve().await;

        let error = client.lookup("F404").await.expect_err("must fail");
        assert!(matches!(error, RelayError::Metadata { ref detail, .. } if detail.contains("file_not_found")));
    }

    #[tokio::test]
    async fn open_streams_body_with_bearer_auth() {
        let (client, state) = serve().await;
        let attachment = client.lookup("F1").await.expect("lookup");

        let stream = client.open(&attachment).await.expect("open");
        let body: Vec<u8> = stream
            .try_fold(Vec::new(), |mut acc, chunk| async move {
                acc.extend_from_slice(&chunk);
                Ok(acc)
            })
            .await
            .expect("read");

        assert_eq!(body, b"hello bytes");
        assert_eq!(state.auth_headers.lock().await.len(), 2);
    }

    #[tokio::test]
    async fn non_success_download_is_download_error() {
        let (client, state) = serve().await;
        let base = state.base_url.lock().await.clone();
        let attachment = claimdesk_core::AttachmentRef {
            source_file_id: "F2".to_owned(),
            download_url: format!("{base}/download/F2"),
            display_name: "f2.png".to_owned(),
            mime_type: "image/png".to_owned(),
            size_bytes: None,
        };

        let error = client.open(&attachment).await.err().expect("must fail");
        assert_eq!(error, RelayError::Download { file_id: "F2".to_owned(), detail: "HTTP 403".to_owned() });
    }

    #[tokio::test]
    async fn notify_posts_direct_message_to_user() {
        let (client, state) = serve().await;

        client.notify_user("U1", "Row 4 updated.").await.expect("notify");

        let posts = state.posts.lock().await.clone();
        assert_eq!(posts[0].0, "chat.postMessage");
        assert_eq!(posts[0].1, json!({"channel": "U1", "text": "Row 4 updated."}));
    }

    #[tokio::test]
    async fn notify_surfaces_platform_rejection() {
        let (client, _) = serve().await;

        let error = client.notify_user("U-gone", "hi").await.expect_err("must fail");
        assert_eq!(error, NotifyError::Rejected("user_not_found".to_owned()));
    }

    #[tokio::test]
    async fn open_view_sends_trigger_and_modal() {
        let (client, state) = serve().await;

        client.open_view("trigger-9", &claim_modal()).await.expect("open view");

        let posts = state.posts.lock().await.clone();
        assert_eq!(posts[0].0, "views.open");
        assert_eq!(posts[0].1["trigger_id"], "trigger-9");
        assert_eq!(posts[0].1["view"]["callback_id"], "claim_submission");
    }

    #[tokio::test]
    async fn unreachable_api_is_transport_error() {
        let client = SlackWebClient::new(
            reqwest::Client::new(),
            "http://127.0.0.1:1/api",
            "xoxb-test".to_owned().into(),
        );

        let error = client.post_message("U1", "hi").await.expect_err("must fail");
        assert!(matches!(error, SlackApiError::Transport { .. }));
    }
}
