//! Assistant collaborator contract
//!
//! The retrieval-augmented answer engine (vector search, embeddings, prompt
//! templating) lives in a separate service. This crate pins down its
//! input/output contract for the pipeline:
//!
//! - input: a `UserContext` (question, persona, context narrative)
//! - output: an `AssistantReply` - an ordered stream of answer fragments
//!   plus the retrieved-documents text and the fully rendered prompt
//!
//! `RemoteAssistant` talks to the real service over HTTP;
//! `ScriptedAssistant` is a deterministic stand-in for tests and local runs.

pub mod remote;

use async_trait::async_trait;
use futures::stream::{self, BoxStream, StreamExt};
use thiserror::Error;

use docbot_core::pipeline::UserContext;

pub use remote::RemoteAssistant;

/// Ordered answer fragments, yielded in generation order.
pub type AnswerStream = BoxStream<'static, Result<String, AssistantError>>;

#[derive(Debug, Error)]
pub enum AssistantError {
    #[error("assistant request failed: {0}")]
    Http(#[from] reqwest::Error),
    #[error("assistant protocol error: {0}")]
    Protocol(String),
}

/// The assistant's answer to one request.
pub struct AssistantReply {
    pub answer: AnswerStream,
    pub retrieved_docs: String,
    pub prompt_context: String,
}

#[async_trait]
pub trait Assistant: Send + Sync {
    async fn respond(&self, context: &UserContext) -> Result<AssistantReply, AssistantError>;
}

/// Replays a fixed script; answers are yielded as the configured chunks.
#[derive(Clone, Debug, Default)]
pub struct ScriptedAssistant {
    pub chunks: Vec<String>,
    pub retrieved_docs: String,
    pub prompt_context: String,
}

impl ScriptedAssistant {
    pub fn answering(chunks: impl IntoIterator<Item = impl Into<String>>) -> Self {
        Self {
            chunks: chunks.into_iter().map(Into::into).collect(),
            retrieved_docs: String::new(),
            prompt_context: String::new(),
        }
    }
}

#[async_trait]
impl Assistant for ScriptedAssistant {
    async fn respond(&self, _context: &UserContext) -> Result<AssistantReply, AssistantError> {
        let chunks: Vec<Result<String, AssistantError>> =
            self.chunks.iter().cloned().map(Ok).collect();
        Ok(AssistantReply {
            answer: stream::iter(chunks).boxed(),
            retrieved_docs: self.retrieved_docs.clone(),
            prompt_context: self.prompt_context.clone(),
        })
    }
}

#[cfg(test)]
mod tests {
    use futures::StreamExt;

    use docbot_core::pipeline::UserContext;

    use crate::{Assistant, ScriptedAssistant};

    fn context() -> UserContext {
        UserContext {
            user_question: "How do I create a token?".to_string(),
            persona: "default".to_string(),
            context_narrative: String::new(),
        }
    }

    #[tokio::test]
    async fn scripted_assistant_replays_chunks_in_order() {
        let assistant = ScriptedAssistant::answering(["Use ", "the tokens ", "page."]);

        let reply = assistant.respond(&context()).await.expect("reply");
        let chunks: Vec<String> = reply
            .answer
            .map(|chunk| chunk.expect("scripted chunks never fail"))
            .collect()
            .await;

        assert_eq!(chunks.join(""), "Use the tokens page.");
    }
}
