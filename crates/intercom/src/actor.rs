//! Delivers the assistant's answer back into the Intercom conversation.

use std::sync::Arc;

use async_trait::async_trait;
use serde_json::json;

use docbot_core::pipeline::{ActionResult, AnswerBundle, ConversationInfo, ResponseActor};
use docbot_core::PipelineError;

use crate::client::IntercomClient;

pub struct IntercomResponseActor {
    client: Arc<IntercomClient>,
    include_response: bool,
    include_context: bool,
}

impl IntercomResponseActor {
    pub fn new(client: Arc<IntercomClient>, include_response: bool, include_context: bool) -> Self {
        Self { client, include_response, include_context }
    }
}

#[async_trait]
impl ResponseActor for IntercomResponseActor {
    async fn act(
        &self,
        conversation: &ConversationInfo,
        answer: &AnswerBundle,
    ) -> Result<Option<ActionResult>, PipelineError> {
        let to_integration = |error: crate::client::IntercomError| {
            PipelineError::Integration(error.to_string())
        };

        if conversation.debug_mode {
            self.client
                .send_message(
                    &conversation.conversation_id,
                    &format!("\nDocuments retrieved: {}", answer.retrieved_docs),
                )
                .await
                .map_err(to_integration)?;
        }

        // Internal users get the answer directly; everyone else gets it as a
        // note for a human agent to review first.
        if conversation.is_internal_user {
            self.client
                .send_message(&conversation.conversation_id, &answer.answer)
                .await
                .map_err(to_integration)?;
        } else {
            self.client
                .add_note(
                    &conversation.conversation_id,
                    &format!("Assistant Suggested Response: {}", answer.answer),
                )
                .await
                .map_err(to_integration)?;
        }

        let mut body = json!({"ok": true, "message": "Response submitted successfully."});
        if self.include_response {
            body["response"] = json!(answer.answer);
        }
        if self.include_context {
            body["context"] = json!(answer.prompt_context);
        }

        Ok(Some(ActionResult { status: 201, body }))
    }
}
