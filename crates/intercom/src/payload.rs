//! Typed model of the Intercom conversation webhook payload.
//!
//! Only the fields the pipeline reads are modeled; everything else is
//! ignored. Absent and `null` fields are treated the same.

use serde::Deserialize;

#[derive(Clone, Debug, Deserialize)]
pub struct WebhookEnvelope {
    #[serde(default)]
    pub data: Option<EventData>,
}

#[derive(Clone, Debug, Deserialize)]
pub struct EventData {
    #[serde(default)]
    pub item: Option<ConversationItem>,
}

#[derive(Clone, Debug, Deserialize)]
pub struct ConversationItem {
    #[serde(default)]
    pub id: Option<String>,
    #[serde(default)]
    pub source: Option<Source>,
    #[serde(default)]
    pub conversation_parts: Option<PartsEnvelope>,
}

/// The message that opened the conversation.
#[derive(Clone, Debug, Deserialize)]
pub struct Source {
    #[serde(default)]
    pub body: Option<String>,
    #[serde(default)]
    pub author: Option<Author>,
    #[serde(default)]
    pub delivered_as: Option<String>,
    #[serde(default)]
    pub url: Option<String>,
}

#[derive(Clone, Debug, Deserialize)]
pub struct PartsEnvelope {
    #[serde(default)]
    pub conversation_parts: Vec<ConversationPart>,
}

/// A reply within an existing conversation.
#[derive(Clone, Debug, Deserialize)]
pub struct ConversationPart {
    #[serde(default)]
    pub part_type: Option<String>,
    #[serde(default)]
    pub body: Option<String>,
    #[serde(default)]
    pub author: Option<Author>,
}

#[derive(Clone, Debug, Deserialize)]
pub struct Author {
    /// `user` for end users; admins and bots carry other values.
    #[serde(rename = "type", default)]
    pub author_type: String,
    #[serde(default)]
    pub id: Option<String>,
    #[serde(default)]
    pub email: Option<String>,
}
