//! Pipeline contracts - the three capability seams every integration
//! implements, plus the request-scoped records that flow between them.
//!
//! A request moves through exactly three stages:
//! 1. `ResponseDecider` - inspect the raw webhook and either short-circuit
//!    with an HTTP response or emit a parsed `ConversationInfo`
//! 2. `ContextCreator` - turn `ConversationInfo` into the question/persona/
//!    narrative bundle the assistant consumes
//! 3. `ResponseActor` (0..N) - perform side effects with the answer and
//!    optionally shape the final HTTP payload
//!
//! Which implementations run is decided at startup by resolving configured
//! names against the `CapabilityRegistry` (see `registry`).

mod registry;

use std::collections::HashMap;

use async_trait::async_trait;
use serde_json::Value;

use crate::errors::PipelineError;

pub use registry::{CapabilityRegistry, Pipeline};

/// A raw inbound webhook delivery, as received by the HTTP layer.
///
/// `raw` preserves the exact bytes the sender signed; `body` is the parsed
/// JSON view the deciders work with. Header names are stored lowercased.
#[derive(Clone, Debug)]
pub struct WebhookRequest {
    headers: HashMap<String, String>,
    pub raw: Vec<u8>,
    pub body: Value,
}

impl WebhookRequest {
    pub fn new(
        headers: impl IntoIterator<Item = (String, String)>,
        raw: Vec<u8>,
        body: Value,
    ) -> Self {
        let headers =
            headers.into_iter().map(|(name, value)| (name.to_ascii_lowercase(), value)).collect();
        Self { headers, raw, body }
    }

    /// Look up a header, case-insensitively.
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers.get(&name.to_ascii_lowercase()).map(String::as_str)
    }
}

/// The outcome of the decision stage.
///
/// The two arms are mutually exclusive by construction: an early return
/// always carries its response, and a proceed always carries the parsed
/// conversation record.
#[derive(Clone, Debug, PartialEq)]
pub enum ResponseDecision {
    EarlyReturn { status: u16, body: Value },
    Proceed { conversation: ConversationInfo },
}

impl ResponseDecision {
    pub fn early(status: u16, body: Value) -> Self {
        Self::EarlyReturn { status, body }
    }

    pub fn proceed(conversation: ConversationInfo) -> Self {
        Self::Proceed { conversation }
    }
}

/// Parsed record describing one inbound conversation event.
///
/// Created once by the decider, immutable afterwards, consumed by the
/// context creator and the actors.
#[derive(Clone, Debug, PartialEq)]
pub struct ConversationInfo {
    pub conversation_id: String,
    /// Contact profile as returned by the source integration, if any.
    pub contact: Value,
    /// The effective message with HTML stripped.
    pub user_question: String,
    /// Whether the author belongs to the configured internal email domain.
    pub is_internal_user: bool,
    /// Whether the question carried the `[DEBUG]` marker.
    pub debug_mode: bool,
    pub source_url: Option<String>,
}

impl ConversationInfo {
    /// Minimal record for integrations that only carry a question.
    pub fn from_question(question: impl Into<String>) -> Self {
        Self {
            conversation_id: String::new(),
            contact: Value::Null,
            user_question: question.into(),
            is_internal_user: false,
            debug_mode: false,
            source_url: None,
        }
    }
}

/// The normalized bundle handed to the assistant collaborator.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct UserContext {
    pub user_question: String,
    pub persona: String,
    pub context_narrative: String,
}

/// The assistant's completed output, as seen by the actors.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct AnswerBundle {
    pub answer: String,
    pub retrieved_docs: String,
    pub prompt_context: String,
}

/// An actor's contribution to the final HTTP response.
#[derive(Clone, Debug, PartialEq)]
pub struct ActionResult {
    pub status: u16,
    pub body: Value,
}

#[async_trait]
pub trait ResponseDecider: Send + Sync {
    async fn decide(&self, request: &WebhookRequest) -> Result<ResponseDecision, PipelineError>;
}

#[async_trait]
pub trait ContextCreator: Send + Sync {
    async fn create(&self, conversation: &ConversationInfo) -> Result<UserContext, PipelineError>;
}

#[async_trait]
pub trait ResponseActor: Send + Sync {
    /// Perform side effects with the completed answer. Returning `None`
    /// leaves the HTTP response to another configured actor.
    async fn act(
        &self,
        conversation: &ConversationInfo,
        answer: &AnswerBundle,
    ) -> Result<Option<ActionResult>, PipelineError>;
}

/// Chooses the prompt persona for a contact.
///
/// Pluggable seam for routing different user populations to different
/// prompts; the default implementation always picks `"default"`.
pub trait PersonaSelector: Send + Sync {
    fn select(&self, contact: &Value) -> String;
}

#[derive(Clone, Copy, Debug, Default)]
pub struct DefaultPersonaSelector;

impl PersonaSelector for DefaultPersonaSelector {
    fn select(&self, _contact: &Value) -> String {
        "default".to_string()
    }
}
