//! Builds the assistant-facing user context from a parsed conversation.

use std::sync::Arc;

use async_trait::async_trait;
use serde_json::Value;
use tracing::warn;

use docbot_core::pipeline::{ContextCreator, ConversationInfo, PersonaSelector, UserContext};
use docbot_core::{PipelineError, RunMode};

use crate::client::IntercomClient;
use crate::orchestrator::OrchestratorClient;

const NO_INFORMATION: &str = "No user information present.";
const DEFAULT_LANGUAGE: &str = "Javascript";

pub struct IntercomContextCreator {
    client: Arc<IntercomClient>,
    orchestrator: Option<Arc<OrchestratorClient>>,
    persona: Arc<dyn PersonaSelector>,
    mode: RunMode,
}

impl IntercomContextCreator {
    pub fn new(
        client: Arc<IntercomClient>,
        orchestrator: Option<Arc<OrchestratorClient>>,
        persona: Arc<dyn PersonaSelector>,
        mode: RunMode,
    ) -> Self {
        Self { client, orchestrator, persona, mode }
    }

    async fn database_line(&self, conversation: &ConversationInfo) -> Option<String> {
        // Database listings only exist in development environments.
        if self.mode != RunMode::Development {
            return None;
        }
        let orchestrator = self.orchestrator.as_ref()?;
        let org_id = conversation.source_url.as_deref().map(org_id_from_url)?;

        let databases = orchestrator.databases(org_id).await;
        if databases.is_empty() {
            return Some("- The user has not created any databases".to_string());
        }

        let mut line = "- Here are all the end-users databases: ".to_string();
        for database in &databases {
            line.push_str(&format!("- {database}\n"));
        }
        Some(line)
    }
}

/// The organization id is the last path segment of the conversation's
/// source URL.
fn org_id_from_url(url: &str) -> &str {
    let path = url.split('?').next().unwrap_or(url);
    path.rsplit('/').next().unwrap_or(path)
}

fn contact_field<'a>(contact: &'a Value, field: &str) -> Option<&'a str> {
    contact.get(field).and_then(Value::as_str)
}

#[async_trait]
impl ContextCreator for IntercomContextCreator {
    async fn create(&self, conversation: &ConversationInfo) -> Result<UserContext, PipelineError> {
        let name = contact_field(&conversation.contact, "name");
        let email = contact_field(&conversation.contact, "email");

        let narrative = match (name, email) {
            (Some(name), Some(email)) => {
                let language = conversation
                    .contact
                    .get("custom_attributes")
                    .and_then(|attributes| attributes.get("programmingLanguage"))
                    .and_then(Value::as_str)
                    .unwrap_or(DEFAULT_LANGUAGE);

                let mut narrative = format!(
                    "Here is information on the user:\n\
                     - User Name: {name}\n\
                     - User Email: {email}\n\
                     - User Primary Programming Language (also known as favorite programming \
                     language and preferred programming language): {language}\n"
                );
                if let Some(line) = self.database_line(conversation).await {
                    narrative.push_str(&line);
                }
                narrative
            }
            _ => NO_INFORMATION.to_string(),
        };

        // Fire-and-forget: a failed debug echo never blocks the answer.
        if conversation.debug_mode {
            let message = format!(
                "Generating response: \nContext: {narrative}\n\nQuestion: {}\n",
                conversation.user_question
            );
            if let Err(error) =
                self.client.send_message(&conversation.conversation_id, &message).await
            {
                warn!(
                    event_name = "intercom.context.debug_echo_failed",
                    conversation_id = %conversation.conversation_id,
                    error = %error,
                    "failed to send debug context message"
                );
            }
        }

        Ok(UserContext {
            user_question: conversation.user_question.clone(),
            persona: self.persona.select(&conversation.contact),
            context_narrative: narrative,
        })
    }
}
