//! The Intercom response decider - a strict-order early-return chain.
//!
//! Each inbound delivery is checked against the protocol states in order,
//! first match wins: invalid signature, duplicate delivery, ping, empty
//! source, unauthorized author, empty question. Only a delivery that clears
//! every check produces a `ConversationInfo` for the rest of the pipeline.

use std::sync::Arc;

use async_trait::async_trait;
use secrecy::{ExposeSecret, SecretString};
use serde_json::{json, Value};
use tracing::debug;

use docbot_core::html::strip_tags;
use docbot_core::pipeline::{
    ConversationInfo, ResponseDecider, ResponseDecision, WebhookRequest,
};
use docbot_core::PipelineError;

use crate::client::IntercomClient;
use crate::payload::{Author, WebhookEnvelope};
use crate::signature::{verify_signature, SIGNATURE_HEADER};

/// Initiation channels allowed to trigger a bot response.
const ALLOWED_DELIVERED_AS: [&str; 5] = [
    "customer_initiated",
    "admin_initiated",
    "campaigns_initiated",
    "operator_initiated",
    "automated",
];

/// Part type emitted when a conversation is assigned; never a user message.
const ASSIGNMENT_PART_TYPE: &str = "default_assignment";

/// Literal marker in a question that switches the request into debug mode.
const DEBUG_MARKER: &str = "[DEBUG]";

pub struct IntercomResponseDecider {
    client: Arc<IntercomClient>,
    client_secret: SecretString,
    internal_email_domain: String,
}

impl IntercomResponseDecider {
    pub fn new(
        client: Arc<IntercomClient>,
        client_secret: SecretString,
        internal_email_domain: impl Into<String>,
    ) -> Self {
        Self { client, client_secret, internal_email_domain: internal_email_domain.into() }
    }
}

fn reject(status: u16, ok: bool, message: &str) -> ResponseDecision {
    ResponseDecision::early(status, json!({"ok": ok, "message": message}))
}

#[async_trait]
impl ResponseDecider for IntercomResponseDecider {
    async fn decide(&self, request: &WebhookRequest) -> Result<ResponseDecision, PipelineError> {
        if verify_signature(
            request.header(SIGNATURE_HEADER),
            &request.raw,
            self.client_secret.expose_secret(),
        )
        .is_err()
        {
            return Ok(reject(401, false, "Invalid signature."));
        }

        // Duplicate and ping acks hold regardless of the rest of the
        // payload, so they are checked on the raw JSON before the typed
        // parse gets a chance to reject it.
        let attempts =
            request.body.get("delivery_attempts").and_then(Value::as_u64).unwrap_or(1);
        if attempts > 1 {
            return Ok(reject(208, true, "Already reported."));
        }

        let item_type = request.body.pointer("/data/item/type").and_then(Value::as_str);
        if item_type == Some("ping") {
            return Ok(reject(200, true, "Successful ping."));
        }

        let envelope: WebhookEnvelope = match serde_json::from_value(request.body.clone()) {
            Ok(envelope) => envelope,
            Err(_) => return Ok(reject(400, false, "Malformed payload.")),
        };

        let Some(item) = envelope.data.and_then(|data| data.item) else {
            return Ok(reject(400, false, "Malformed payload."));
        };

        let Some(source) = item.source else {
            return Ok(reject(400, false, "Empty source."));
        };

        // Prefer the newest authored reply over the conversation opener.
        // Assignment parts and empty bodies never count as messages.
        let parts = item
            .conversation_parts
            .as_ref()
            .map(|envelope| envelope.conversation_parts.as_slice())
            .unwrap_or_default();
        let effective_part = parts.iter().find(|part| {
            part.part_type.as_deref() != Some(ASSIGNMENT_PART_TYPE)
                && part.body.as_deref().is_some_and(|body| !body.is_empty())
        });

        let (message_body, author) = match effective_part {
            Some(part) => (part.body.clone().unwrap_or_default(), part.author.clone()),
            None => (source.body.clone().unwrap_or_default(), source.author.clone()),
        };

        let delivered_as =
            source.delivered_as.clone().unwrap_or_else(|| "not_customer_initiated".to_string());
        let Some(author) = author else {
            return Ok(reject(403, false, "Unauthorized user."));
        };
        let authorized = author.author_type == "user"
            && ALLOWED_DELIVERED_AS.contains(&delivered_as.as_str());
        if !authorized {
            debug!(
                event_name = "intercom.decision.unauthorized",
                author_type = %author.author_type,
                delivered_as = %delivered_as,
                "author is not allowed to trigger a response"
            );
            return Ok(reject(403, false, "Unauthorized user."));
        }

        let user_question = strip_tags(&message_body);
        if user_question.is_empty() {
            return Ok(reject(400, false, "Query provided was empty"));
        }

        let contact = self
            .client
            .contact(author.id.as_deref().unwrap_or_default())
            .await
            .map_err(|error| PipelineError::Integration(error.to_string()))?;

        Ok(ResponseDecision::proceed(ConversationInfo {
            conversation_id: item.id.unwrap_or_default(),
            contact,
            is_internal_user: is_internal(&author, &self.internal_email_domain),
            debug_mode: user_question.contains(DEBUG_MARKER),
            source_url: source.url,
            user_question,
        }))
    }
}

fn is_internal(author: &Author, domain: &str) -> bool {
    author
        .email
        .as_deref()
        .is_some_and(|email| email.ends_with(&format!("@{domain}")))
}
