//! Startup wiring: config to resolved pipeline to router.
//!
//! All capability credentials are checked here, at bootstrap, so a
//! misconfigured deployment fails before it binds a socket.

use std::sync::Arc;

use thiserror::Error;
use tracing::info;

use docbot_assistant::{Assistant, AssistantError, RemoteAssistant};
use docbot_core::config::{AppConfig, ConfigError, LoadOptions};
use docbot_core::pipeline::{CapabilityRegistry, DefaultPersonaSelector, Pipeline};
use docbot_intercom::{
    IntercomClient, IntercomContextCreator, IntercomResponseActor, IntercomResponseDecider,
    OrchestratorClient,
};
use docbot_slack::{SlackNotifier, SlackResponseActor};

use crate::example::{ExampleContextCreator, ExampleResponseActor, ExampleResponseDecider};
use crate::webhook::{self, AppState};

#[derive(Debug, Error)]
pub enum BootstrapError {
    #[error(transparent)]
    Config(#[from] ConfigError),
    #[error("assistant client construction failed: {0}")]
    Assistant(#[from] AssistantError),
}

pub struct Application {
    pub config: AppConfig,
    pub pipeline: Arc<Pipeline>,
    pub assistant: Arc<dyn Assistant>,
}

impl Application {
    pub fn router(&self) -> axum::Router {
        webhook::router(AppState {
            pipeline: self.pipeline.clone(),
            assistant: self.assistant.clone(),
            streaming: self.config.server.streaming,
        })
    }
}

pub fn bootstrap(options: LoadOptions) -> Result<Application, BootstrapError> {
    let config = AppConfig::load(options)?;
    bootstrap_with_config(config)
}

pub fn bootstrap_with_config(config: AppConfig) -> Result<Application, BootstrapError> {
    let pipeline = default_registry().resolve(&config)?;
    let assistant =
        RemoteAssistant::new(config.assistant.endpoint.clone(), config.assistant.timeout_secs)?;

    info!(
        event_name = "system.bootstrap.pipeline_resolved",
        company = %config.company,
        decider = %config.pipeline.deciders.join(","),
        context_creator = %config.pipeline.context_creators.join(","),
        actors = %config.pipeline.actors.join(","),
        streaming = config.server.streaming,
        "capability pipeline resolved"
    );

    Ok(Application { config, pipeline: Arc::new(pipeline), assistant: Arc::new(assistant) })
}

/// Registry of every capability this binary ships.
pub fn default_registry() -> CapabilityRegistry {
    let mut registry = CapabilityRegistry::new();

    registry.register_decider("intercom", |config| {
        let client = intercom_client(config)?;
        let client_secret = config
            .intercom
            .client_secret
            .clone()
            .ok_or_else(|| missing("intercom.client_secret"))?;
        Ok(Arc::new(IntercomResponseDecider::new(
            client,
            client_secret,
            config.intercom.internal_email_domain.clone(),
        )))
    });
    registry.register_context_creator("intercom", |config| {
        let orchestrator = match (&config.orchestrator.endpoint, &config.orchestrator.admin_token)
        {
            (Some(endpoint), Some(token)) => {
                Some(Arc::new(OrchestratorClient::new(endpoint.clone(), token.clone())))
            }
            _ => None,
        };
        Ok(Arc::new(IntercomContextCreator::new(
            intercom_client(config)?,
            orchestrator,
            Arc::new(DefaultPersonaSelector),
            config.mode,
        )))
    });
    registry.register_actor("intercom", |config| {
        Ok(Arc::new(IntercomResponseActor::new(
            intercom_client(config)?,
            config.intercom.include_response,
            config.intercom.include_context,
        )))
    });

    registry.register_actor("slack", |config| {
        let webhook_url = config.slack.webhook_url.clone().ok_or_else(|| {
            ConfigError::Validation(
                "slack.webhook_url is required for the `slack` actor".to_string(),
            )
        })?;
        Ok(Arc::new(SlackResponseActor::new(SlackNotifier::new(webhook_url))))
    });

    registry.register_decider("example", |_| Ok(Arc::new(ExampleResponseDecider)));
    registry.register_context_creator("example", |_| Ok(Arc::new(ExampleContextCreator)));
    registry.register_actor("example", |_| Ok(Arc::new(ExampleResponseActor)));

    registry
}

fn intercom_client(config: &AppConfig) -> Result<Arc<IntercomClient>, ConfigError> {
    let token = config.intercom.token.clone().ok_or_else(|| missing("intercom.token"))?;
    let admin_id = config.intercom.admin_id.clone().ok_or_else(|| missing("intercom.admin_id"))?;
    Ok(Arc::new(IntercomClient::new(config.intercom.api_base.clone(), token, admin_id)))
}

fn missing(field: &str) -> ConfigError {
    ConfigError::Validation(format!("{field} is required for the `intercom` integration"))
}

#[cfg(test)]
mod tests {
    use docbot_core::config::{AppConfig, ConfigError};

    use crate::bootstrap::default_registry;

    fn config(deciders: &[&str], creators: &[&str], actors: &[&str]) -> AppConfig {
        let mut config = AppConfig::default();
        config.pipeline.deciders = deciders.iter().map(ToString::to_string).collect();
        config.pipeline.context_creators = creators.iter().map(ToString::to_string).collect();
        config.pipeline.actors = actors.iter().map(ToString::to_string).collect();
        config
    }

    #[test]
    fn example_pipeline_resolves_without_credentials() {
        let pipeline = default_registry()
            .resolve(&config(&["example"], &["example"], &["example"]))
            .expect("example pipeline needs no credentials");

        assert_eq!(pipeline.actors.len(), 1);
    }

    #[test]
    fn intercom_decider_requires_credentials() {
        let error = default_registry()
            .resolve(&config(&["intercom"], &["example"], &[]))
            .expect_err("missing intercom credentials must be fatal");

        assert!(matches!(error, ConfigError::Validation(message) if message.contains("intercom.")));
    }

    #[test]
    fn intercom_pipeline_resolves_with_credentials() {
        let mut config = config(&["intercom"], &["intercom"], &["intercom", "slack"]);
        config.intercom.token = Some("tok".to_string().into());
        config.intercom.client_secret = Some("secret".to_string().into());
        config.intercom.admin_id = Some("42".to_string());
        config.slack.webhook_url = Some("https://hooks.slack.example/x".to_string().into());

        let pipeline = default_registry().resolve(&config).expect("full pipeline resolves");
        assert_eq!(pipeline.actors.len(), 2);
    }

    #[test]
    fn slack_actor_requires_webhook_url() {
        let mut config = config(&["example"], &["example"], &["slack"]);
        config.slack.webhook_url = None;

        let error = default_registry()
            .resolve(&config)
            .expect_err("slack actor without webhook url must be fatal");

        assert!(
            matches!(error, ConfigError::Validation(message) if message.contains("slack.webhook_url"))
        );
    }
}
