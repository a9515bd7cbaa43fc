//! Intercom integration - webhook intake and reply dispatch
//!
//! Implements all three pipeline capabilities for Intercom conversation
//! webhooks:
//! - **Signature** (`signature`) - HMAC-SHA1 verification of `X-Hub-Signature`
//! - **Payload** (`payload`) - typed model of the conversation webhook shape
//! - **Decision** (`decision`) - the early-return state machine
//! - **Context** (`context`) - contact narrative + persona for the assistant
//! - **Actor** (`actor`) - reply/note dispatch back into the conversation
//! - **Client** (`client`) - thin Intercom REST client
//! - **Orchestrator** (`orchestrator`) - best-effort org database lookup
//!
//! # Webhook contract
//!
//! Intercom POSTs a conversation event with a `X-Hub-Signature: sha1=<hex>`
//! header computed over the exact request body bytes with the app's client
//! secret. Status codes are part of the protocol: 200 ping ack, 208 duplicate
//! delivery, 400 empty source/question, 401 bad signature, 403 unauthorized
//! author.

pub mod actor;
pub mod client;
pub mod context;
pub mod decision;
pub mod orchestrator;
pub mod payload;
pub mod signature;

pub use actor::IntercomResponseActor;
pub use client::{IntercomClient, IntercomError};
pub use context::IntercomContextCreator;
pub use decision::IntercomResponseDecider;
pub use orchestrator::OrchestratorClient;
pub use signature::{sign, verify_signature, SignatureError, SIGNATURE_HEADER};
