use std::sync::Arc;
use std::time::Duration;

use axum::Router;
use claimdesk_core::config::AppConfig;
use claimdesk_core::{FanOut, FileRelay, RowUpdateBuilder, SubmissionPipeline};
use claimdesk_google::{DriveClient, OAuthClientSettings, RefreshTokenCredentials, SheetsClient};
use claimdesk_slack::{claim_dispatcher, SignatureVerifier, SlackWebClient};
use thiserror::Error;
use tracing::info;

use crate::{health, slack_routes};

const CONNECT_TIMEOUT: Duration = Duration::from_secs(10);

pub struct Application {
    pub config: AppConfig,
    pub state: slack_routes::SlackState,
}

impl Application {
    pub fn router(&self) -> Router {
        router(self.state.clone())
    }
}

#[derive(Debug, Error)]
pub enum BootstrapError {
    #[error("http client construction failed: {0}")]
    HttpClient(#[source] reqwest::Error),
}

/// Wires the collaborators from an already validated config. Nothing here
/// talks to Slack or Google yet.
pub async fn bootstrap_with_config(config: AppConfig) -> Result<Application, BootstrapError> {
    info!(
        event_name = "system.bootstrap.start",
        correlation_id = "bootstrap",
        "starting application bootstrap"
    );
    let http = reqwest::Client::builder()
        .connect_timeout(CONNECT_TIMEOUT)
        .build()
        .map_err(BootstrapError::HttpClient)?;

    let slack = Arc::new(SlackWebClient::new(
        http.clone(),
        config.slack.api_base_url.clone(),
        config.slack.bot_token.clone(),
    ));

    let google = &config.google;
    let tokens = Arc::new(RefreshTokenCredentials::new(
        http.clone(),
        OAuthClientSettings {
            client_id: google.client_id.clone(),
            client_secret: google.client_secret.clone(),
            refresh_token: google.refresh_token.clone(),
            token_url: google.token_url.clone(),
        },
    ));
    let drive = Arc::new(DriveClient::new(
        http.clone(),
        google.drive_api_base_url.clone(),
        google.drive_upload_base_url.clone(),
        google.drive_folder_id.clone(),
        tokens.clone(),
    ));
    let sheets = Arc::new(SheetsClient::new(
        http,
        google.sheets_api_base_url.clone(),
        google.spreadsheet_id.clone(),
        tokens,
    ));

    let pipeline_config = &config.pipeline;
    let relay = FileRelay::new(slack.clone(), drive, pipeline_config.transfer_timeout());
    let pipeline = SubmissionPipeline::new(
        FanOut::new(relay, pipeline_config.relay_concurrency),
        RowUpdateBuilder::new(google.sheet_name.clone()),
        sheets,
        slack.clone(),
        pipeline_config.sheet_timeout(),
    );

    let dispatcher = claim_dispatcher(slack, Arc::new(pipeline));
    let verifier = SignatureVerifier::new(
        config.slack.signing_secret.clone(),
        Duration::from_secs(pipeline_config.signature_tolerance_secs),
    );
    info!(
        event_name = "system.bootstrap.wired",
        correlation_id = "bootstrap",
        handlers = dispatcher.handler_count(),
        relay_concurrency = pipeline_config.relay_concurrency,
        sheet_name = %google.sheet_name,
        "claim pipeline wired"
    );

    let state = slack_routes::SlackState::new(dispatcher, verifier);
    Ok(Application { config, state })
}

pub fn router(state: slack_routes::SlackState) -> Router {
    health::router().merge(slack_routes::router(state))
}

#[cfg(test)]
mod tests {
    use axum::{
        body::Body,
        http::{Request, StatusCode},
    };
    use claimdesk_core::config::{AppConfig, ConfigOverrides, LoadOptions};
    use tower::ServiceExt;

    use crate::bootstrap::bootstrap_with_config;

    fn valid_overrides() -> ConfigOverrides {
        ConfigOverrides {
            slack_bot_token: Some("xoxb-test".to_string()),
            slack_signing_secret: Some("signing-secret".to_string()),
            google_client_id: Some("client-id.apps.googleusercontent.com".to_string()),
            google_client_secret: Some("client-secret".to_string()),
            google_refresh_token: Some("1//refresh".to_string()),
            google_drive_folder_id: Some("folder-1".to_string()),
            google_spreadsheet_id: Some("sheet-1".to_string()),
            ..ConfigOverrides::default()
        }
    }

    fn load(overrides: ConfigOverrides) -> Result<AppConfig, String> {
        AppConfig::load(LoadOptions { overrides, ..LoadOptions::default() })
            .map_err(|error| error.to_string())
    }

    #[test]
    fn startup_fails_fast_without_signing_secret() {
        let message = load(ConfigOverrides {
            slack_signing_secret: Some(String::new()),
            ..valid_overrides()
        })
        .expect_err("must fail");

        assert!(message.contains("slack.signing_secret"), "{message}");
    }

    #[test]
    fn startup_rejects_app_level_token_as_bot_token() {
        let message = load(ConfigOverrides {
            slack_bot_token: Some("xapp-1-abc".to_string()),
            ..valid_overrides()
        })
        .expect_err("must fail");

        assert!(message.contains("slack.bot_token"), "{message}");
    }

    #[tokio::test]
    async fn bootstrap_wires_routes_with_valid_config() {
        let config = load(valid_overrides()).expect("valid config");
        let app = bootstrap_with_config(config)
            .await
            .expect("bootstrap should succeed with valid config");

        assert_eq!(app.config.google.sheet_name, "Amazon");

        let health = app
            .router()
            .oneshot(Request::builder().uri("/health").body(Body::empty()).expect("request"))
            .await
            .expect("response");
        assert_eq!(health.status(), StatusCode::OK);

        let unsigned = app
            .router()
            .oneshot(
                Request::builder()
                    .method("POST")
                    .uri("/slack/commands")
                    .header("content-type", "application/x-www-form-urlencoded")
                    .body(Body::from("command=%2Fclaim&trigger_id=t"))
                    .expect("request"),
            )
            .await
            .expect("response");
        assert_eq!(unsigned.status(), StatusCode::UNAUTHORIZED);
    }
}
