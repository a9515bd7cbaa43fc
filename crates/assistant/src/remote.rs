//! HTTP client for the external assistant query service.
//!
//! Wire protocol for `POST {endpoint}/query`:
//! - request: `{"question": ..., "persona": ..., "context": ...}`
//! - response: one JSON metadata line
//!   (`{"retrieved_docs": ..., "prompt_context": ...}\n`) followed by the
//!   raw answer text, streamed in generation order.

use std::time::Duration;

use futures::StreamExt;
use reqwest::Client;
use serde::{Deserialize, Serialize};

use docbot_core::pipeline::UserContext;

use crate::{Assistant, AssistantError, AssistantReply};

#[derive(Debug, Serialize)]
struct QueryRequest<'a> {
    question: &'a str,
    persona: &'a str,
    context: &'a str,
}

#[derive(Debug, Default, Deserialize)]
struct QueryMetadata {
    #[serde(default)]
    retrieved_docs: String,
    #[serde(default)]
    prompt_context: String,
}

pub struct RemoteAssistant {
    http: Client,
    endpoint: String,
}

impl RemoteAssistant {
    pub fn new(endpoint: impl Into<String>, timeout_secs: u64) -> Result<Self, AssistantError> {
        let http = Client::builder().timeout(Duration::from_secs(timeout_secs)).build()?;
        Ok(Self { http, endpoint: endpoint.into().trim_end_matches('/').to_string() })
    }
}

#[async_trait::async_trait]
impl Assistant for RemoteAssistant {
    async fn respond(&self, context: &UserContext) -> Result<AssistantReply, AssistantError> {
        let url = format!("{}/query", self.endpoint);
        let response = self
            .http
            .post(url)
            .json(&QueryRequest {
                question: &context.user_question,
                persona: &context.persona,
                context: &context.context_narrative,
            })
            .send()
            .await?
            .error_for_status()?;

        let mut byte_stream = response.bytes_stream();

        // Buffer until the metadata line terminator; anything after it is
        // already answer text.
        let mut buffered: Vec<u8> = Vec::new();
        let newline = loop {
            if let Some(position) = buffered.iter().position(|&byte| byte == b'\n') {
                break position;
            }
            match byte_stream.next().await {
                Some(chunk) => buffered.extend_from_slice(&chunk?),
                None => {
                    return Err(AssistantError::Protocol(
                        "stream ended before the metadata preamble".to_string(),
                    ))
                }
            }
        };

        let metadata: QueryMetadata = serde_json::from_slice(&buffered[..newline])
            .map_err(|error| AssistantError::Protocol(format!("invalid metadata line: {error}")))?;
        let leftover = String::from_utf8_lossy(&buffered[newline + 1..]).into_owned();

        let initial = (!leftover.is_empty()).then_some(Ok(leftover));
        let rest = byte_stream.map(|chunk| {
            chunk
                .map(|bytes| String::from_utf8_lossy(&bytes).into_owned())
                .map_err(AssistantError::from)
        });
        let answer = futures::stream::iter(initial).chain(rest).boxed();

        Ok(AssistantReply {
            answer,
            retrieved_docs: metadata.retrieved_docs,
            prompt_context: metadata.prompt_context,
        })
    }
}
