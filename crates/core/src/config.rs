use std::env;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use secrecy::{ExposeSecret, SecretString};
use serde::{Deserialize, Serialize};
use thiserror::Error;

#[derive(Clone, Debug)]
pub struct AppConfig {
    pub slack: SlackConfig,
    pub google: GoogleConfig,
    pub pipeline: PipelineConfig,
    pub server: ServerConfig,
    pub logging: LoggingConfig,
}

#[derive(Clone, Debug)]
pub struct SlackConfig {
    pub bot_token: SecretString,
    pub signing_secret: SecretString,
    pub api_base_url: String,
}

#[derive(Clone, Debug)]
pub struct GoogleConfig {
    pub client_id: String,
    pub client_secret: SecretString,
    pub refresh_token: SecretString,
    pub token_url: String,
    pub drive_folder_id: String,
    pub spreadsheet_id: String,
    pub sheet_name: String,
    pub drive_api_base_url: String,
    pub drive_upload_base_url: String,
    pub sheets_api_base_url: String,
}

#[derive(Clone, Debug)]
pub struct PipelineConfig {
    pub relay_concurrency: usize,
    pub transfer_timeout_secs: u64,
    pub sheet_timeout_secs: u64,
    pub signature_tolerance_secs: u64,
}

impl PipelineConfig {
    pub fn transfer_timeout(&self) -> Duration {
        Duration::from_secs(self.transfer_timeout_secs)
    }

    pub fn sheet_timeout(&self) -> Duration {
        Duration::from_secs(self.sheet_timeout_secs)
    }
}

#[derive(Clone, Debug)]
pub struct ServerConfig {
    pub bind_address: String,
    pub port: u16,
    pub graceful_shutdown_secs: u64,
}

#[derive(Clone, Debug)]
pub struct LoggingConfig {
    pub level: String,
    pub format: LogFormat,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LogFormat {
    Compact,
    Pretty,
    Json,
}

#[derive(Clone, Debug, Default)]
pub struct ConfigOverrides {
    pub slack_bot_token: Option<String>,
    pub slack_signing_secret: Option<String>,
    pub google_client_id: Option<String>,
    pub google_client_secret: Option<String>,
    pub google_refresh_token: Option<String>,
    pub google_drive_folder_id: Option<String>,
    pub google_spreadsheet_id: Option<String>,
    pub sheet_name: Option<String>,
    pub relay_concurrency: Option<usize>,
    pub server_port: Option<u16>,
    pub log_level: Option<String>,
}

#[derive(Clone, Debug, Default)]
pub struct LoadOptions {
    pub config_path: Option<PathBuf>,
    pub require_file: bool,
    pub overrides: ConfigOverrides,
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("could not read config file `{path}`: {source}")]
    ReadFile { path: PathBuf, source: std::io::Error },
    #[error("could not parse config file `{path}`: {source}")]
    ParseFile { path: PathBuf, source: toml::de::Error },
    #[error("required config file was not found: `{0}`")]
    MissingConfigFile(PathBuf),
    #[error("environment variable interpolation failed for `{var}`")]
    MissingEnvInterpolation { var: String },
    #[error("unterminated environment interpolation expression")]
    UnterminatedInterpolation,
    #[error("invalid environment override for `{key}`: `{value}`")]
    InvalidEnvOverride { key: String, value: String },
    #[error("configuration validation failed: {0}")]
    Validation(String),
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            slack: SlackConfig {
                bot_token: String::new().into(),
                signing_secret: String::new().into(),
                api_base_url: "https://slack.com/api".to_string(),
            },
            google: GoogleConfig {
                client_id: String::new(),
                client_secret: String::new().into(),
                refresh_token: String::new().into(),
                token_url: "https://oauth2.googleapis.com/token".to_string(),
                drive_folder_id: String::new(),
                spreadsheet_id: String::new(),
                sheet_name: "Amazon".to_string(),
                drive_api_base_url: "https://www.googleapis.com/drive/v3".to_string(),
                drive_upload_base_url: "https://www.googleapis.com/upload/drive/v3".to_string(),
                sheets_api_base_url: "https://sheets.googleapis.com/v4".to_string(),
            },
            pipeline: PipelineConfig {
                relay_concurrency: 5,
                transfer_timeout_secs: 120,
                sheet_timeout_secs: 30,
                signature_tolerance_secs: 300,
            },
            server: ServerConfig {
                bind_address: "0.0.0.0".to_string(),
                port: 3000,
                graceful_shutdown_secs: 15,
            },
            logging: LoggingConfig { level: "info".to_string(), format: LogFormat::Compact },
        }
    }
}

fn secret_value(value: String) -> SecretString {
    value.into()
}

impl std::str::FromStr for LogFormat {
    type Err = ConfigError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_ascii_lowercase().as_str() {
            "compact" => Ok(Self::Compact),
            "pretty" => Ok(Self::Pretty),
            "json" => Ok(Self::Json),
            other => Err(ConfigError::Validation(format!(
                "unsupported log format `{other}` (expected compact|pretty|json)"
            ))),
        }
    }
}

impl AppConfig {
    pub fn load(options: LoadOptions) -> Result<Self, ConfigError> {
        let mut config = Self::default();
        let maybe_path = resolve_config_path(options.config_path.as_deref());

        if let Some(path) = maybe_path {
            let patch = read_patch(&path)?;
            config.apply_patch(patch);
        } else if options.require_file {
            let expected = options.config_path.unwrap_or_else(|| PathBuf::from("claimdesk.toml"));
            return Err(ConfigError::MissingConfigFile(expected));
        }

        config.apply_env_overrides()?;
        config.apply_overrides(options.overrides);
        config.validate()?;

        Ok(config)
    }

    fn apply_patch(&mut self, patch: ConfigPatch) {
        if let Some(slack) = patch.slack {
            if let Some(bot_token) = slack.bot_token {
                self.slack.bot_token = secret_value(bot_token);
            }
            if let Some(signing_secret) = slack.signing_secret {
                self.slack.signing_secret = secret_value(signing_secret);
            }
            if let Some(api_base_url) = slack.api_base_url {
                self.slack.api_base_url = api_base_url;
            }
        }

        if let Some(google) = patch.google {
            if let Some(client_id) = google.client_id {
                self.google.client_id = client_id;
            }
            if let Some(client_secret) = google.client_secret {
                self.google.client_secret = secret_value(client_secret);
            }
            if let Some(refresh_token) = google.refresh_token {
                self.google.refresh_token = secret_value(refresh_token);
            }
            if let Some(token_url) = google.token_url {
                self.google.token_url = token_url;
            }
            if let Some(drive_folder_id) = google.drive_folder_id {
                self.google.drive_folder_id = drive_folder_id;
            }
            if let Some(spreadsheet_id) = google.spreadsheet_id {
                self.google.spreadsheet_id = spreadsheet_id;
            }
            if let Some(sheet_name) = google.sheet_name {
                self.google.sheet_name = sheet_name;
            }
            if let Some(drive_api_base_url) = google.drive_api_base_url {
                self.google.drive_api_base_url = drive_api_base_url;
            }
            if let Some(drive_upload_base_url) = google.drive_upload_base_url {
                self.google.drive_upload_base_url = drive_upload_base_url;
            }
            if let Some(sheets_api_base_url) = google.sheets_api_base_url {
                self.google.sheets_api_base_url = sheets_api_base_url;
            }
        }

        if let Some(pipeline) = patch.pipeline {
            if let Some(relay_concurrency) = pipeline.relay_concurrency {
                self.pipeline.relay_concurrency = relay_concurrency;
            }
            if let Some(transfer_timeout_secs) = pipeline.transfer_timeout_secs {
                self.pipeline.transfer_timeout_secs = transfer_timeout_secs;
            }
            if let Some(sheet_timeout_secs) = pipeline.sheet_timeout_secs {
                self.pipeline.sheet_timeout_secs = sheet_timeout_secs;
            }
            if let Some(signature_tolerance_secs) = pipeline.signature_tolerance_secs {
                self.pipeline.signature_tolerance_secs = signature_tolerance_secs;
            }
        }

        if let Some(server) = patch.server {
            if let Some(bind_address) = server.bind_address {
                self.server.bind_address = bind_address;
            }
            if let Some(port) = server.port {
                self.server.port = port;
            }
            if let Some(graceful_shutdown_secs) = server.graceful_shutdown_secs {
                self.server.graceful_shutdown_secs = graceful_shutdown_secs;
            }
        }

        if let Some(logging) = patch.logging {
            if let Some(level) = logging.level {
                self.logging.level = level;
            }
            if let Some(format) = logging.format {
                self.logging.format = format;
            }
        }
    }

    fn apply_env_overrides(&mut self) -> Result<(), ConfigError> {
        if let Some(value) = read_env("CLAIMDESK_SLACK_BOT_TOKEN") {
            self.slack.bot_token = secret_value(value);
        }
        if let Some(value) = read_env("CLAIMDESK_SLACK_SIGNING_SECRET") {
            self.slack.signing_secret = secret_value(value);
        }
        if let Some(value) = read_env("CLAIMDESK_SLACK_API_BASE_URL") {
            self.slack.api_base_url = value;
        }

        if let Some(value) = read_env("CLAIMDESK_GOOGLE_CLIENT_ID") {
            self.google.client_id = value;
        }
        if let Some(value) = read_env("CLAIMDESK_GOOGLE_CLIENT_SECRET") {
            self.google.client_secret = secret_value(value);
        }
        if let Some(value) = read_env("CLAIMDESK_GOOGLE_REFRESH_TOKEN") {
            self.google.refresh_token = secret_value(value);
        }
        if let Some(value) = read_env("CLAIMDESK_GOOGLE_TOKEN_URL") {
            self.google.token_url = value;
        }
        if let Some(value) = read_env("CLAIMDESK_GOOGLE_DRIVE_FOLDER_ID") {
            self.google.drive_folder_id = value;
        }
        if let Some(value) = read_env("CLAIMDESK_GOOGLE_SPREADSHEET_ID") {
            self.google.spreadsheet_id = value;
        }
        if let Some(value) = read_env("CLAIMDESK_GOOGLE_SHEET_NAME") {
            self.google.sheet_name = value;
        }
        if let Some(value) = read_env("CLAIMDESK_GOOGLE_DRIVE_API_BASE_URL") {
            self.google.drive_api_base_url = value;
        }
        if let Some(value) = read_env("CLAIMDESK_GOOGLE_DRIVE_UPLOAD_BASE_URL") {
            self.google.drive_upload_base_url = value;
        }
        if let Some(value) = read_env("CLAIMDESK_GOOGLE_SHEETS_API_BASE_URL") {
            self.google.sheets_api_base_url = value;
        }

        if let Some(value) = read_env("CLAIMDESK_PIPELINE_RELAY_CONCURRENCY") {
            self.pipeline.relay_concurrency =
                parse_usize("CLAIMDESK_PIPELINE_RELAY_CONCURRENCY", &value)?;
        }
        if let Some(value) = read_env("CLAIMDESK_PIPELINE_TRANSFER_TIMEOUT_SECS") {
            self.pipeline.transfer_timeout_secs =
                parse_u64("CLAIMDESK_PIPELINE_TRANSFER_TIMEOUT_SECS", &value)?;
        }
        if let Some(value) = read_env("CLAIMDESK_PIPELINE_SHEET_TIMEOUT_SECS") {
            self.pipeline.sheet_timeout_secs =
                parse_u64("CLAIMDESK_PIPELINE_SHEET_TIMEOUT_SECS", &value)?;
        }
        if let Some(value) = read_env("CLAIMDESK_PIPELINE_SIGNATURE_TOLERANCE_SECS") {
            self.pipeline.signature_tolerance_secs =
                parse_u64("CLAIMDESK_PIPELINE_SIGNATURE_TOLERANCE_SECS", &value)?;
        }

        if let Some(value) = read_env("CLAIMDESK_SERVER_BIND_ADDRESS") {
            self.server.bind_address = value;
        }
        let port = read_env("CLAIMDESK_SERVER_PORT")
            .map(|value| ("CLAIMDESK_SERVER_PORT", value))
            .or_else(|| read_env("PORT").map(|value| ("PORT", value)));
        if let Some((key, value)) = port {
            self.server.port = parse_u16(key, &value)?;
        }
        if let Some(value) = read_env("CLAIMDESK_SERVER_GRACEFUL_SHUTDOWN_SECS") {
            self.server.graceful_shutdown_secs =
                parse_u64("CLAIMDESK_SERVER_GRACEFUL_SHUTDOWN_SECS", &value)?;
        }

        let log_level =
            read_env("CLAIMDESK_LOGGING_LEVEL").or_else(|| read_env("CLAIMDESK_LOG_LEVEL"));
        if let Some(value) = log_level {
            self.logging.level = value;
        }
        let log_format =
            read_env("CLAIMDESK_LOGGING_FORMAT").or_else(|| read_env("CLAIMDESK_LOG_FORMAT"));
        if let Some(value) = log_format {
            self.logging.format = value.parse()?;
        }

        Ok(())
    }

    fn apply_overrides(&mut self, overrides: ConfigOverrides) {
        if let Some(bot_token) = overrides.slack_bot_token {
            self.slack.bot_token = secret_value(bot_token);
        }
        if let Some(signing_secret) = overrides.slack_signing_secret {
            self.slack.signing_secret = secret_value(signing_secret);
        }
        if let Some(client_id) = overrides.google_client_id {
            self.google.client_id = client_id;
        }
        if let Some(client_secret) = overrides.google_client_secret {
            self.google.client_secret = secret_value(client_secret);
        }
        if let Some(refresh_token) = overrides.google_refresh_token {
            self.google.refresh_token = secret_value(refresh_token);
        }
        if let Some(drive_folder_id) = overrides.google_drive_folder_id {
            self.google.drive_folder_id = drive_folder_id;
        }
        if let Some(spreadsheet_id) = overrides.google_spreadsheet_id {
            self.google.spreadsheet_id = spreadsheet_id;
        }
        if let Some(sheet_name) = overrides.sheet_name {
            self.google.sheet_name = sheet_name;
        }
        if let Some(relay_concurrency) = overrides.relay_concurrency {
            self.pipeline.relay_concurrency = relay_concurrency;
        }
        if let Some(port) = overrides.server_port {
            self.server.port = port;
        }
        if let Some(log_level) = overrides.log_level {
            self.logging.level = log_level;
        }
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        validate_slack(&self.slack)?;
        validate_google(&self.google)?;
        validate_pipeline(&self.pipeline)?;
        validate_server(&self.server)?;
        validate_logging(&self.logging)?;
        Ok(())
    }
}

fn resolve_config_path(explicit_path: Option<&Path>) -> Option<PathBuf> {
    if let Some(path) = explicit_path {
        return path.exists().then_some(path.to_path_buf());
    }

    [PathBuf::from("claimdesk.toml"), PathBuf::from("config/claimdesk.toml")]
        .into_iter()
        .find(|path| path.exists())
}

fn read_patch(path: &Path) -> Result<ConfigPatch, ConfigError> {
    let raw = fs::read_to_string(path)
        .map_err(|source| ConfigError::ReadFile { path: path.to_path_buf(), source })?;

    let interpolated = interpolate_env_vars(&raw)?;
    toml::from_str::<ConfigPatch>(&interpolated)
        .map_err(|source| ConfigError::ParseFile { path: path.to_path_buf(), source })
}

fn interpolate_env_vars(input: &str) -> Result<String, ConfigError> {
    let mut output = String::with_capacity(input.len());
    let mut chars = input.chars().peekable();

    while let Some(ch) = chars.next() {
        if ch == '$' && matches!(chars.peek(), Some('{')) {
            chars.next();
            let mut key = String::new();

            loop {
                match chars.next() {
                    Some('}') => break,
                    Some(next) => key.push(next),
                    None => return Err(ConfigError::UnterminatedInterpolation),
                }
            }

            let value = env::var(&key)
                .map_err(|_| ConfigError::MissingEnvInterpolation { var: key.clone() })?;
            output.push_str(&value);
            continue;
        }

        output.push(ch);
    }

    Ok(output)
}

fn validate_slack(slack: &SlackConfig) -> Result<(), ConfigError> {
    let bot_token = slack.bot_token.expose_secret();
    if bot_token.is_empty() {
        return Err(ConfigError::Validation(
            "slack.bot_token is required. Get it from https://api.slack.com/apps > Your App > OAuth & Permissions > Bot User OAuth Token".to_string()
        ));
    }
    if !bot_token.starts_with("xoxb-") {
        let hint = if bot_token.starts_with("xapp-") {
            " (hint: you may have used the app-level token instead of the bot token)"
        } else {
            ""
        };
        return Err(ConfigError::Validation(format!(
            "slack.bot_token must start with `xoxb-`{hint}. Get it from https://api.slack.com/apps"
        )));
    }

    if slack.signing_secret.expose_secret().trim().is_empty() {
        return Err(ConfigError::Validation(
            "slack.signing_secret is required. Get it from https://api.slack.com/apps > Your App > Basic Information > Signing Secret".to_string()
        ));
    }

    validate_http_url("slack.api_base_url", &slack.api_base_url)
}

fn validate_google(google: &GoogleConfig) -> Result<(), ConfigError> {
    let required = [
        ("google.client_id", google.client_id.as_str()),
        ("google.client_secret", google.client_secret.expose_secret()),
        ("google.refresh_token", google.refresh_token.expose_secret()),
        ("google.drive_folder_id", google.drive_folder_id.as_str()),
        ("google.spreadsheet_id", google.spreadsheet_id.as_str()),
    ];
    if let Some((key, _)) = required.iter().find(|(_, value)| value.trim().is_empty()) {
        return Err(ConfigError::Validation(format!("{key} is required")));
    }

    let sheet_name = google.sheet_name.trim();
    if sheet_name.is_empty() || sheet_name.contains('!') {
        return Err(ConfigError::Validation(
            "google.sheet_name must be a non-empty tab name without `!`".to_string(),
        ));
    }

    validate_http_url("google.token_url", &google.token_url)?;
    validate_http_url("google.drive_api_base_url", &google.drive_api_base_url)?;
    validate_http_url("google.drive_upload_base_url", &google.drive_upload_base_url)?;
    validate_http_url("google.sheets_api_base_url", &google.sheets_api_base_url)
}

fn validate_pipeline(pipeline: &PipelineConfig) -> Result<(), ConfigError> {
    if pipeline.relay_concurrency == 0 {
        return Err(ConfigError::Validation(
            "pipeline.relay_concurrency must be greater than zero".to_string(),
        ));
    }

    if pipeline.transfer_timeout_secs == 0 || pipeline.transfer_timeout_secs > 3_600 {
        return Err(ConfigError::Validation(
            "pipeline.transfer_timeout_secs must be in range 1..=3600".to_string(),
        ));
    }

    if pipeline.sheet_timeout_secs == 0 || pipeline.sheet_timeout_secs > 300 {
        return Err(ConfigError::Validation(
            "pipeline.sheet_timeout_secs must be in range 1..=300".to_string(),
        ));
    }

    if pipeline.signature_tolerance_secs == 0 || pipeline.signature_tolerance_secs > 3_600 {
        return Err(ConfigError::Validation(
            "pipeline.signature_tolerance_secs must be in range 1..=3600".to_string(),
        ));
    }

    Ok(())
}

fn validate_server(server: &ServerConfig) -> Result<(), ConfigError> {
    if server.port == 0 {
        return Err(ConfigError::Validation("server.port must be greater than zero".to_string()));
    }

    if server.graceful_shutdown_secs == 0 {
        return Err(ConfigError::Validation(
            "server.graceful_shutdown_secs must be greater than zero".to_string(),
        ));
    }

    Ok(())
}

fn validate_logging(logging: &LoggingConfig) -> Result<(), ConfigError> {
    let level = logging.level.trim().to_ascii_lowercase();
    match level.as_str() {
        "trace" | "debug" | "info" | "warn" | "error" => Ok(()),
        _ => Err(ConfigError::Validation(
            "logging.level must be one of trace|debug|info|warn|error".to_string(),
        )),
    }
}

fn validate_http_url(key: &str, value: &str) -> Result<(), ConfigError> {
    if !value.starts_with("http://") && !value.starts_with("https://") {
        return Err(ConfigError::Validation(format!("{key} must start with http:// or https://")));
    }
    Ok(())
}

fn read_env(key: &str) -> Option<String> {
    env::var(key).ok().filter(|value| !value.trim().is_empty())
}

fn parse_u16(key: &str, value: &str) -> Result<u16, ConfigError> {
    value.parse::<u16>().map_err(|_| ConfigError::InvalidEnvOverride {
        key: key.to_string(),
        value: value.to_string(),
    })
}

fn parse_u64(key: &str, value: &str) -> Result<u64, ConfigError> {
    value.parse::<u64>().map_err(|_| ConfigError::InvalidEnvOverride {
        key: key.to_string(),
        value: value.to_string(),
    })
}

fn parse_usize(key: &str, value: &str) -> Result<usize, ConfigError> {
    value.parse::<usize>().map_err(|_| ConfigError::InvalidEnvOverride {
        key: key.to_string(),
        value: value.to_string(),
    })
}

#[derive(Debug, Default, Deserialize)]
struct ConfigPatch {
    slack: Option<SlackPatch>,
    google: Option<GooglePatch>,
    pipeline: Option<PipelinePatch>,
    server: Option<ServerPatch>,
    logging: Option<LoggingPatch>,
}

#[derive(Debug, Default, Deserialize)]
struct SlackPatch {
    bot_token: Option<String>,
    signing_secret: Option<String>,
    api_base_url: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
struct GooglePatch {
    client_id: Option<String>,
    client_secret: Option<String>,
    refresh_token: Option<String>,
    token_url: Option<String>,
    drive_folder_id: Option<String>,
    spreadsheet_id: Option<String>,
    sheet_name: Option<String>,
    drive_api_base_url: Option<String>,
    drive_upload_base_url: Option<String>,
    sheets_api_base_url: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
struct PipelinePatch {
    relay_concurrency: Option<usize>,
    transfer_timeout_secs: Option<u64>,
    sheet_timeout_secs: Option<u64>,
    signature_tolerance_secs: Option<u64>,
}

#[derive(Debug, Default, Deserialize)]
struct ServerPatch {
    bind_address: Option<String>,
    port: Option<u16>,
    graceful_shutdown_secs: Option<u64>,
}

#[derive(Debug, Default, Deserialize)]
struct LoggingPatch {
    level: Option<String>,
    format: Option<LogFormat>,
}
