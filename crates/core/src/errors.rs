use thiserror::Error;

/// Failures raised while a request is flowing through the pipeline.
///
/// Protocol rejections (bad signature, duplicate delivery, unauthorized
/// author, ...) are *not* errors - they are `ResponseDecision::EarlyReturn`
/// values with their own status codes. Everything here maps to a generic
/// 500 at the HTTP boundary and is reported exactly once.
#[derive(Debug, Error)]
pub enum PipelineError {
    #[error("integration call failed: {0}")]
    Integration(String),
    #[error("no configured response actor produced a response")]
    NoActionResult,
}
