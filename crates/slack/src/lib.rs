//! Slack integration - incoming-webhook notifications
//!
//! A pure side-effect actor: after the assistant answers, the prompt and the
//! answer are posted to a Slack channel via an incoming webhook so the team
//! can watch what the bot is telling users. It never shapes the HTTP
//! response - another configured actor (or the stream) owns that.

use async_trait::async_trait;
use reqwest::Client;
use secrecy::{ExposeSecret, SecretString};
use serde_json::json;
use thiserror::Error;

use docbot_core::pipeline::{ActionResult, AnswerBundle, ConversationInfo, ResponseActor};
use docbot_core::PipelineError;

const BOT_USERNAME: &str = "AI Bot";
const BOT_ICON: &str = ":ghost:";

#[derive(Debug, Error)]
pub enum SlackError {
    #[error("slack webhook request failed: {0}")]
    Http(#[from] reqwest::Error),
}

/// Posts messages to a Slack incoming webhook.
#[derive(Clone)]
pub struct SlackNotifier {
    http: Client,
    webhook_url: SecretString,
}

impl SlackNotifier {
    pub fn new(webhook_url: SecretString) -> Self {
        Self { http: Client::new(), webhook_url }
    }

    pub async fn post_message(&self, text: &str) -> Result<(), SlackError> {
        self.http
            .post(self.webhook_url.expose_secret())
            .json(&json!({
                "text": text,
                "username": BOT_USERNAME,
                "icon_emoji": BOT_ICON,
            }))
            .send()
            .await?
            .error_for_status()?;
        Ok(())
    }
}

pub struct SlackResponseActor {
    notifier: SlackNotifier,
}

impl SlackResponseActor {
    pub fn new(notifier: SlackNotifier) -> Self {
        Self { notifier }
    }
}

#[async_trait]
impl ResponseActor for SlackResponseActor {
    async fn act(
        &self,
        _conversation: &ConversationInfo,
        answer: &AnswerBundle,
    ) -> Result<Option<ActionResult>, PipelineError> {
        let to_integration =
            |error: SlackError| PipelineError::Integration(error.to_string());

        self.notifier
            .post_message(&format!("*PROMPT*\n{}", answer.prompt_context))
            .await
            .map_err(to_integration)?;
        self.notifier
            .post_message(&format!("*RESPONSE*\n{}", answer.answer))
            .await
            .map_err(to_integration)?;

        Ok(None)
    }
}
