//! A self-contained integration for local runs and smoke tests.
//!
//! Accepts `{"question": "..."}` bodies with no signature check, asks the
//! assistant with the default persona and no narrative, and logs the answer
//! instead of delivering it anywhere.

use async_trait::async_trait;
use serde_json::json;
use tracing::info;

use docbot_core::pipeline::{
    ActionResult, AnswerBundle, ContextCreator, ConversationInfo, ResponseActor, ResponseDecider,
    ResponseDecision, UserContext, WebhookRequest,
};
use docbot_core::PipelineError;

pub struct ExampleResponseDecider;

#[async_trait]
impl ResponseDecider for ExampleResponseDecider {
    async fn decide(&self, request: &WebhookRequest) -> Result<ResponseDecision, PipelineError> {
        let Some(question) = request.body.get("question").and_then(|value| value.as_str()) else {
            return Ok(ResponseDecision::early(
                400,
                json!({"ok": false, "message": "Include 'question' field in the POST request"}),
            ));
        };

        Ok(ResponseDecision::proceed(ConversationInfo::from_question(question)))
    }
}

pub struct ExampleContextCreator;

#[async_trait]
impl ContextCreator for ExampleContextCreator {
    async fn create(&self, conversation: &ConversationInfo) -> Result<UserContext, PipelineError> {
        Ok(UserContext {
            user_question: conversation.user_question.clone(),
            persona: "default".to_string(),
            context_narrative: String::new(),
        })
    }
}

pub struct ExampleResponseActor;

#[async_trait]
impl ResponseActor for ExampleResponseActor {
    async fn act(
        &self,
        conversation: &ConversationInfo,
        answer: &AnswerBundle,
    ) -> Result<Option<ActionResult>, PipelineError> {
        info!(
            event_name = "example.actor.answered",
            question = %conversation.user_question,
            answer = %answer.answer,
            "example integration produced an answer"
        );

        Ok(Some(ActionResult {
            status: 201,
            body: json!({"ok": true, "message": "Response submitted successfully."}),
        }))
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use docbot_core::pipeline::{ResponseDecider, ResponseDecision, WebhookRequest};

    use crate::example::ExampleResponseDecider;

    fn request(body: serde_json::Value) -> WebhookRequest {
        WebhookRequest::new([], body.to_string().into_bytes(), body)
    }

    #[tokio::test]
    async fn question_field_proceeds() {
        let decision = ExampleResponseDecider
            .decide(&request(json!({"question": "How do I create a token?"})))
            .await
            .expect("decide");

        let ResponseDecision::Proceed { conversation } = decision else {
            panic!("expected proceed, got {decision:?}");
        };
        assert_eq!(conversation.user_question, "How do I create a token?");
    }

    #[tokio::test]
    async fn missing_question_is_a_bad_request() {
        let decision = ExampleResponseDecider
            .decide(&request(json!({"other": "field"})))
            .await
            .expect("decide");

        let ResponseDecision::EarlyReturn { status, body } = decision else {
            panic!("expected early return, got {decision:?}");
        };
        assert_eq!(status, 400);
        assert_eq!(body["message"], "Include 'question' field in the POST request");
    }

    #[tokio::test]
    async fn non_string_question_is_a_bad_request() {
        let decision = ExampleResponseDecider
            .decide(&request(json!({"question": 42})))
            .await
            .expect("decide");

        assert!(matches!(decision, ResponseDecision::EarlyReturn { status: 400, .. }));
    }
}
