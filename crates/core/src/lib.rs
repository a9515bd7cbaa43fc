//! docbot core - configuration and pipeline contracts
//!
//! This crate holds everything the integrations and the server share:
//! - **Configuration** (`config`) - immutable `AppConfig` loaded once at startup
//! - **Errors** (`errors`) - request-time error taxonomy
//! - **Pipeline** (`pipeline`) - the three capability contracts
//!   (`ResponseDecider`, `ContextCreator`, `ResponseActor`) plus the
//!   capability registry that maps configured names to instances
//! - **HTML** (`html`) - tag stripping for inbound message bodies
//!
//! # Architecture
//!
//! ```text
//! Webhook → Decider → ContextCreator → Assistant → Actor(s) → Response
//!              ↑ early return short-circuits the rest of the chain
//! ```
//!
//! Every request is handled statelessly: `ConversationInfo` and `UserContext`
//! are owned by the single in-flight request. The only shared state is the
//! `Pipeline` resolved from the registry at startup, which is read-only.

pub mod config;
pub mod errors;
pub mod html;
pub mod pipeline;

pub use config::{AppConfig, ConfigError, ConfigOverrides, LoadOptions, RunMode};
pub use errors::PipelineError;
pub use pipeline::{
    ActionResult, AnswerBundle, CapabilityRegistry, ContextCreator, ConversationInfo,
    DefaultPersonaSelector, PersonaSelector, Pipeline, ResponseActor, ResponseDecider,
    ResponseDecision, UserContext, WebhookRequest,
};
