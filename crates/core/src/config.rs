use std::env;
use std::fs;
use std::path::{Path, PathBuf};

use secrecy::SecretString;
use serde::{Deserialize, Serialize};
use thiserror::Error;

#[derive(Clone, Debug)]
pub struct AppConfig {
    /// Company name this deployment answers for; surfaced in startup logs.
    pub company: String,
    pub mode: RunMode,
    pub pipeline: PipelineConfig,
    pub server: ServerConfig,
    pub intercom: IntercomConfig,
    pub slack: SlackConfig,
    pub orchestrator: OrchestratorConfig,
    pub assistant: AssistantConfig,
    pub logging: LoggingConfig,
}

/// Which capability implementations are active for this deployment.
#[derive(Clone, Debug)]
pub struct PipelineConfig {
    pub deciders: Vec<String>,
    pub context_creators: Vec<String>,
    pub actors: Vec<String>,
}

#[derive(Clone, Debug)]
pub struct ServerConfig {
    pub bind_address: String,
    pub port: u16,
    /// Stream answer fragments to the client as they are generated instead
    /// of waiting for the full answer and the actor responses.
    pub streaming: bool,
}

#[derive(Clone, Debug)]
pub struct IntercomConfig {
    pub api_base: String,
    pub token: Option<SecretString>,
    pub client_secret: Option<SecretString>,
    /// Admin id the bot replies as.
    pub admin_id: Option<String>,
    /// Authors with an email at this domain get direct replies instead of
    /// internal notes.
    pub internal_email_domain: String,
    pub include_response: bool,
    pub include_context: bool,
}

#[derive(Clone, Debug)]
pub struct SlackConfig {
    pub webhook_url: Option<SecretString>,
}

#[derive(Clone, Debug)]
pub struct OrchestratorConfig {
    pub endpoint: Option<String>,
    pub admin_token: Option<SecretString>,
}

#[derive(Clone, Debug)]
pub struct AssistantConfig {
    pub endpoint: String,
    pub timeout_secs: u64,
}

#[derive(Clone, Debug)]
pub struct LoggingConfig {
    pub level: String,
    pub format: LogFormat,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RunMode {
    Development,
    Production,
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
    pub company: Option<String>,
    pub mode: Option<RunMode>,
    pub deciders: Option<Vec<String>>,
    pub context_creators: Option<Vec<String>>,
    pub actors: Option<Vec<String>>,
    pub streaming: Option<bool>,
    pub intercom_api_base: Option<String>,
    pub intercom_token: Option<String>,
    pub intercom_client_secret: Option<String>,
    pub intercom_admin_id: Option<String>,
    pub intercom_internal_email_domain: Option<String>,
    pub intercom_include_response: Option<bool>,
    pub intercom_include_context: Option<bool>,
    pub slack_webhook_url: Option<String>,
    pub orchestrator_endpoint: Option<String>,
    pub orchestrator_admin_token: Option<String>,
    pub assistant_endpoint: Option<String>,
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
            company: "Example".to_string(),
            mode: RunMode::Development,
            pipeline: PipelineConfig {
                deciders: vec!["intercom".to_string()],
                context_creators: vec!["intercom".to_string()],
                actors: vec!["intercom".to_string()],
            },
            server: ServerConfig {
                bind_address: "0.0.0.0".to_string(),
                port: 5000,
                streaming: false,
            },
            intercom: IntercomConfig {
                api_base: "https://api.intercom.io".to_string(),
                token: None,
                client_secret: None,
                admin_id: None,
                internal_email_domain: "example.com".to_string(),
                include_response: true,
                include_context: true,
            },
            slack: SlackConfig { webhook_url: None },
            orchestrator: OrchestratorConfig { endpoint: None, admin_token: None },
            assistant: AssistantConfig {
                endpoint: "http://localhost:8000".to_string(),
                timeout_secs: 120,
            },
            logging: LoggingConfig { level: "info".to_string(), format: LogFormat::Compact },
        }
    }
}

fn secret_value(value: String) -> SecretString {
    value.into()
}

impl std::str::FromStr for RunMode {
    type Err = ConfigError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_ascii_lowercase().as_str() {
            "development" => Ok(Self::Development),
            "production" => Ok(Self::Production),
            other => Err(ConfigError::Validation(format!(
                "unsupported run mode `{other}` (expected development|production)"
            ))),
        }
    }
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
            let expected = options.config_path.unwrap_or_else(|| PathBuf::from("docbot.toml"));
            return Err(ConfigError::MissingConfigFile(expected));
        }

        config.apply_env_overrides()?;
        config.apply_overrides(options.overrides);
        config.validate()?;

        Ok(config)
    }

    fn apply_patch(&mut self, patch: ConfigPatch) {
        if let Some(company) = patch.company {
            self.company = company;
        }
        if let Some(mode) = patch.mode {
            self.mode = mode;
        }

        if let Some(pipeline) = patch.pipeline {
            if let Some(deciders) = pipeline.deciders {
                self.pipeline.deciders = deciders;
            }
            if let Some(context_creators) = pipeline.context_creators {
                self.pipeline.context_creators = context_creators;
            }
            if let Some(actors) = pipeline.actors {
                self.pipeline.actors = actors;
            }
        }

        if let Some(server) = patch.server {
            if let Some(bind_address) = server.bind_address {
                self.server.bind_address = bind_address;
            }
            if let Some(port) = server.port {
                self.server.port = port;
            }
            if let Some(streaming) = server.streaming {
                self.server.streaming = streaming;
            }
        }

        if let Some(intercom) = patch.intercom {
            if let Some(api_base) = intercom.api_base {
                self.intercom.api_base = api_base;
            }
            if let Some(token_value) = intercom.token {
                self.intercom.token = Some(secret_value(token_value));
            }
            if let Some(client_secret_value) = intercom.client_secret {
                self.intercom.client_secret = Some(secret_value(client_secret_value));
            }
            if let Some(admin_id) = intercom.admin_id {
                self.intercom.admin_id = Some(admin_id);
            }
            if let Some(domain) = intercom.internal_email_domain {
                self.intercom.internal_email_domain = domain;
            }
            if let Some(include_response) = intercom.include_response {
                self.intercom.include_response = include_response;
            }
            if let Some(include_context) = intercom.include_context {
                self.intercom.include_context = include_context;
            }
        }

        if let Some(slack) = patch.slack {
            if let Some(webhook_url_value) = slack.webhook_url {
                self.slack.webhook_url = Some(secret_value(webhook_url_value));
            }
        }

        if let Some(orchestrator) = patch.orchestrator {
            if let Some(endpoint) = orchestrator.endpoint {
                self.orchestrator.endpoint = Some(endpoint);
            }
            if let Some(admin_token_value) = orchestrator.admin_token {
                self.orchestrator.admin_token = Some(secret_value(admin_token_value));
            }
        }

        if let Some(assistant) = patch.assistant {
            if let Some(endpoint) = assistant.endpoint {
                self.assistant.endpoint = endpoint;
            }
            if let Some(timeout_secs) = assistant.timeout_secs {
                self.assistant.timeout_secs = timeout_secs;
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
        if let Some(value) = read_env("DOCBOT_COMPANY") {
            self.company = value;
        }
        if let Some(value) = read_env("DOCBOT_MODE") {
            self.mode = value.parse()?;
        }

        if let Some(value) = read_env("DOCBOT_PIPELINE_DECIDERS") {
            self.pipeline.deciders = parse_list(&value);
        }
        if let Some(value) = read_env("DOCBOT_PIPELINE_CONTEXT_CREATORS") {
            self.pipeline.context_creators = parse_list(&value);
        }
        if let Some(value) = read_env("DOCBOT_PIPELINE_ACTORS") {
            self.pipeline.actors = parse_list(&value);
        }

        if let Some(value) = read_env("DOCBOT_SERVER_BIND_ADDRESS") {
            self.server.bind_address = value;
        }
        if let Some(value) = read_env("DOCBOT_SERVER_PORT") {
            self.server.port = parse_u16("DOCBOT_SERVER_PORT", &value)?;
        }
        if let Some(value) = read_env("DOCBOT_SERVER_STREAMING") {
            self.server.streaming = parse_bool("DOCBOT_SERVER_STREAMING", &value)?;
        }

        if let Some(value) = read_env("DOCBOT_INTERCOM_API_BASE") {
            self.intercom.api_base = value;
        }
        if let Some(value) = read_env("DOCBOT_INTERCOM_TOKEN") {
            self.intercom.token = Some(secret_value(value));
        }
        if let Some(value) = read_env("DOCBOT_INTERCOM_CLIENT_SECRET") {
            self.intercom.client_secret = Some(secret_value(value));
        }
        if let Some(value) = read_env("DOCBOT_INTERCOM_ADMIN_ID") {
            self.intercom.admin_id = Some(value);
        }
        if let Some(value) = read_env("DOCBOT_INTERCOM_INTERNAL_EMAIL_DOMAIN") {
            self.intercom.internal_email_domain = value;
        }
        if let Some(value) = read_env("DOCBOT_INTERCOM_INCLUDE_RESPONSE") {
            self.intercom.include_response =
                parse_bool("DOCBOT_INTERCOM_INCLUDE_RESPONSE", &value)?;
        }
        if let Some(value) = read_env("DOCBOT_INTERCOM_INCLUDE_CONTEXT") {
            self.intercom.include_context = parse_bool("DOCBOT_INTERCOM_INCLUDE_CONTEXT", &value)?;
        }

        if let Some(value) = read_env("DOCBOT_SLACK_WEBHOOK_URL") {
            self.slack.webhook_url = Some(secret_value(value));
        }

        if let Some(value) = read_env("DOCBOT_ORCHESTRATOR_ENDPOINT") {
            self.orchestrator.endpoint = Some(value);
        }
        if let Some(value) = read_env("DOCBOT_ORCHESTRATOR_ADMIN_TOKEN") {
            self.orchestrator.admin_token = Some(secret_value(value));
        }

        if let Some(value) = read_env("DOCBOT_ASSISTANT_ENDPOINT") {
            self.assistant.endpoint = value;
        }
        if let Some(value) = read_env("DOCBOT_ASSISTANT_TIMEOUT_SECS") {
            self.assistant.timeout_secs = parse_u64("DOCBOT_ASSISTANT_TIMEOUT_SECS", &value)?;
        }

        if let Some(value) = read_env("DOCBOT_LOGGING_LEVEL") {
            self.logging.level = value;
        }
        if let Some(value) = read_env("DOCBOT_LOGGING_FORMAT") {
            self.logging.format = value.parse()?;
        }

        Ok(())
    }

    fn apply_overrides(&mut self, overrides: ConfigOverrides) {
        if let Some(company) = overrides.company {
            self.company = company;
        }
        if let Some(mode) = overrides.mode {
            self.mode = mode;
        }
        if let Some(deciders) = overrides.deciders {
            self.pipeline.deciders = deciders;
        }
        if let Some(context_creators) = overrides.context_creators {
            self.pipeline.context_creators = context_creators;
        }
        if let Some(actors) = overrides.actors {
            self.pipeline.actors = actors;
        }
        if let Some(streaming) = overrides.streaming {
            self.server.streaming = streaming;
        }
        if let Some(api_base) = overrides.intercom_api_base {
            self.intercom.api_base = api_base;
        }
        if let Some(token) = overrides.intercom_token {
            self.intercom.token = Some(secret_value(token));
        }
        if let Some(client_secret) = overrides.intercom_client_secret {
            self.intercom.client_secret = Some(secret_value(client_secret));
        }
        if let Some(admin_id) = overrides.intercom_admin_id {
            self.intercom.admin_id = Some(admin_id);
        }
        if let Some(domain) = overrides.intercom_internal_email_domain {
            self.intercom.internal_email_domain = domain;
        }
        if let Some(include_response) = overrides.intercom_include_response {
            self.intercom.include_response = include_response;
        }
        if let Some(include_context) = overrides.intercom_include_context {
            self.intercom.include_context = include_context;
        }
        if let Some(webhook_url) = overrides.slack_webhook_url {
            self.slack.webhook_url = Some(secret_value(webhook_url));
        }
        if let Some(endpoint) = overrides.orchestrator_endpoint {
            self.orchestrator.endpoint = Some(endpoint);
        }
        if let Some(admin_token) = overrides.orchestrator_admin_token {
            self.orchestrator.admin_token = Some(secret_value(admin_token));
        }
        if let Some(endpoint) = overrides.assistant_endpoint {
            self.assistant.endpoint = endpoint;
        }
        if let Some(log_level) = overrides.log_level {
            self.logging.level = log_level;
        }
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        validate_pipeline(&self.pipeline)?;
        validate_server(&self.server)?;
        validate_assistant(&self.assistant)?;
        validate_logging(&self.logging)?;
        Ok(())
    }
}

#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
struct ConfigPatch {
    company: Option<String>,
    mode: Option<RunMode>,
    pipeline: Option<PipelinePatch>,
    server: Option<ServerPatch>,
    intercom: Option<IntercomPatch>,
    slack: Option<SlackPatch>,
    orchestrator: Option<OrchestratorPatch>,
    assistant: Option<AssistantPatch>,
    logging: Option<LoggingPatch>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
struct PipelinePatch {
    deciders: Option<Vec<String>>,
    context_creators: Option<Vec<String>>,
    actors: Option<Vec<String>>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
struct ServerPatch {
    bind_address: Option<String>,
    port: Option<u16>,
    streaming: Option<bool>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
struct IntercomPatch {
    api_base: Option<String>,
    token: Option<String>,
    client_secret: Option<String>,
    admin_id: Option<String>,
    internal_email_domain: Option<String>,
    include_response: Option<bool>,
    include_context: Option<bool>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
struct SlackPatch {
    webhook_url: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
struct OrchestratorPatch {
    endpoint: Option<String>,
    admin_token: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
struct AssistantPatch {
    endpoint: Option<String>,
    timeout_secs: Option<u64>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
struct LoggingPatch {
    level: Option<String>,
    format: Option<LogFormat>,
}

fn resolve_config_path(explicit_path: Option<&Path>) -> Option<PathBuf> {
    if let Some(path) = explicit_path {
        return path.exists().then_some(path.to_path_buf());
    }

    [PathBuf::from("docbot.toml"), PathBuf::from("config/docbot.toml")]
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

fn validate_pipeline(pipeline: &PipelineConfig) -> Result<(), ConfigError> {
    if pipeline.deciders.len() != 1 {
        return Err(ConfigError::Validation(format!(
            "pipeline.deciders must name exactly one decider (found {})",
            pipeline.deciders.len()
        )));
    }
    if pipeline.context_creators.len() != 1 {
        return Err(ConfigError::Validation(format!(
            "pipeline.context_creators must name exactly one context creator (found {})",
            pipeline.context_creators.len()
        )));
    }

    let all = pipeline.deciders.iter().chain(&pipeline.context_creators).chain(&pipeline.actors);
    for name in all {
        if name.trim().is_empty() {
            return Err(ConfigError::Validation(
                "pipeline capability names must not be empty".to_string(),
            ));
        }
    }

    Ok(())
}

fn validate_server(server: &ServerConfig) -> Result<(), ConfigError> {
    if server.port == 0 {
        return Err(ConfigError::Validation("server.port must be greater than zero".to_string()));
    }
    if server.bind_address.trim().is_empty() {
        return Err(ConfigError::Validation("server.bind_address must not be empty".to_string()));
    }
    Ok(())
}

fn validate_assistant(assistant: &AssistantConfig) -> Result<(), ConfigError> {
    if !assistant.endpoint.starts_with("http://") && !assistant.endpoint.starts_with("https://") {
        return Err(ConfigError::Validation(
            "assistant.endpoint must start with http:// or https://".to_string(),
        ));
    }
    if assistant.timeout_secs == 0 || assistant.timeout_secs > 600 {
        return Err(ConfigError::Validation(
            "assistant.timeout_secs must be in range 1..=600".to_string(),
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

fn read_env(key: &str) -> Option<String> {
    env::var(key).ok().filter(|value| !value.trim().is_empty())
}

fn parse_list(value: &str) -> Vec<String> {
    value.split(',').map(str::trim).filter(|item| !item.is_empty()).map(String::from).collect()
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

fn parse_bool(key: &str, value: &str) -> Result<bool, ConfigError> {
    match value.trim().to_ascii_lowercase().as_str() {
        "true" | "1" | "yes" => Ok(true),
        "false" | "0" | "no" => Ok(false),
        _ => Err(ConfigError::InvalidEnvOverride {
            key: key.to_string(),
            value: value.to_string(),
        }),
    }
}
