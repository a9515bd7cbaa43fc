//! The `/chat` routes: health probe and webhook intake.
//!
//! A delivery runs decider -> context creator -> assistant -> actors. In
//! batch mode the answer stream is drained before the actors run and the
//! last actor result shapes the HTTP response. In streaming mode answer
//! fragments are forwarded to the client as they arrive and the actors run
//! after the stream completes; a client disconnect mid-stream skips them.

use std::convert::Infallible;
use std::fmt::Display;
use std::sync::Arc;

use axum::body::{Body, Bytes};
use axum::extract::State;
use axum::http::{header, HeaderMap, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::routing::get;
use axum::{Json, Router};
use futures::StreamExt;
use serde_json::{json, Value};
use tokio::sync::mpsc;
use tokio_stream::wrappers::ReceiverStream;
use tracing::{error, info};
use uuid::Uuid;

use docbot_assistant::{Assistant, AssistantReply};
use docbot_core::pipeline::{
    AnswerBundle, ConversationInfo, Pipeline, ResponseDecision, WebhookRequest,
};
use docbot_core::PipelineError;

#[derive(Clone)]
pub struct AppState {
    pub pipeline: Arc<Pipeline>,
    pub assistant: Arc<dyn Assistant>,
    pub streaming: bool,
}

pub fn router(state: AppState) -> Router {
    Router::new().route("/chat", get(health).post(receive_webhook)).with_state(state)
}

async fn health() -> Json<Value> {
    Json(json!({"ok": true, "message": "App is running"}))
}

async fn receive_webhook(
    State(state): State<AppState>,
    headers: HeaderMap,
    body: Bytes,
) -> Response {
    let correlation_id = Uuid::new_v4().to_string();

    let parsed: Value = match serde_json::from_slice(&body) {
        Ok(value) => value,
        Err(_) => {
            info!(
                event_name = "webhook.request.malformed",
                correlation_id = %correlation_id,
                "delivery body was not valid JSON"
            );
            return respond(400, json!({"ok": false, "message": "Malformed payload."}));
        }
    };

    info!(
        event_name = "webhook.request.received",
        correlation_id = %correlation_id,
        bytes = body.len(),
        "webhook delivery received"
    );

    let header_pairs = headers.iter().filter_map(|(name, value)| {
        value.to_str().ok().map(|value| (name.as_str().to_string(), value.to_string()))
    });
    let request = WebhookRequest::new(header_pairs, body.to_vec(), parsed);

    let decision = match state.pipeline.decider.decide(&request).await {
        Ok(decision) => decision,
        Err(error) => return internal_error(&correlation_id, &error),
    };

    let conversation = match decision {
        ResponseDecision::EarlyReturn { status, body } => {
            info!(
                event_name = "webhook.request.early_return",
                correlation_id = %correlation_id,
                status,
                "delivery short-circuited by the decider"
            );
            return respond(status, body);
        }
        ResponseDecision::Proceed { conversation } => conversation,
    };

    let context = match state.pipeline.context_creator.create(&conversation).await {
        Ok(context) => context,
        Err(error) => return internal_error(&correlation_id, &error),
    };

    let reply = match state.assistant.respond(&context).await {
        Ok(reply) => reply,
        Err(error) => return internal_error(&correlation_id, &error),
    };

    if state.streaming {
        stream_response(state, conversation, reply, correlation_id)
    } else {
        batch_response(&state, &conversation, reply, &correlation_id).await
    }
}

/// Drain the answer, run every configured actor in order, and let the last
/// actor that returned a result shape the response.
async fn batch_response(
    state: &AppState,
    conversation: &ConversationInfo,
    reply: AssistantReply,
    correlation_id: &str,
) -> Response {
    let AssistantReply { mut answer, retrieved_docs, prompt_context } = reply;

    let mut text = String::new();
    while let Some(chunk) = answer.next().await {
        match chunk {
            Ok(fragment) => text.push_str(&fragment),
            Err(error) => return internal_error(correlation_id, &error),
        }
    }

    let bundle = AnswerBundle { answer: text, retrieved_docs, prompt_context };

    let mut retained = None;
    for actor in &state.pipeline.actors {
        match actor.act(conversation, &bundle).await {
            Ok(Some(result)) => retained = Some(result),
            Ok(None) => {}
            Err(error) => return internal_error(correlation_id, &error),
        }
    }

    match retained {
        Some(result) => {
            info!(
                event_name = "webhook.request.completed",
                correlation_id = %correlation_id,
                status = result.status,
                "delivery processed"
            );
            respond(result.status, result.body)
        }
        None => internal_error(correlation_id, &PipelineError::NoActionResult),
    }
}

/// Forward answer fragments to the client as they arrive, then run the
/// actors once the stream is fully consumed.
fn stream_response(
    state: AppState,
    conversation: ConversationInfo,
    reply: AssistantReply,
    correlation_id: String,
) -> Response {
    let AssistantReply { mut answer, retrieved_docs, prompt_context } = reply;
    let (tx, rx) = mpsc::channel::<Result<Bytes, Infallible>>(16);
    let pipeline = state.pipeline.clone();

    tokio::spawn(async move {
        let mut accumulated = String::new();
        while let Some(chunk) = answer.next().await {
            let fragment = match chunk {
                Ok(fragment) => fragment,
                Err(error) => {
                    error!(
                        event_name = "webhook.stream.assistant_failed",
                        correlation_id = %correlation_id,
                        error = %error,
                        "assistant stream failed mid-answer"
                    );
                    return;
                }
            };
            accumulated.push_str(&fragment);
            if tx.send(Ok(Bytes::from(fragment))).await.is_err() {
                // Actors assume a fully delivered answer; a client that went
                // away never got one.
                info!(
                    event_name = "webhook.stream.client_disconnected",
                    correlation_id = %correlation_id,
                    "client disconnected mid-stream, skipping actors"
                );
                return;
            }
        }

        // Close the stream to the client before the actor side effects run.
        drop(tx);

        let bundle = AnswerBundle { answer: accumulated, retrieved_docs, prompt_context };
        for actor in &pipeline.actors {
            if let Err(error) = actor.act(&conversation, &bundle).await {
                error!(
                    event_name = "webhook.stream.actor_failed",
                    correlation_id = %correlation_id,
                    error = %error,
                    "response actor failed after stream completion"
                );
            }
        }
        info!(
            event_name = "webhook.stream.completed",
            correlation_id = %correlation_id,
            "streamed delivery processed"
        );
    });

    (
        StatusCode::CREATED,
        [(header::CONTENT_TYPE, "text/event-stream")],
        Body::from_stream(ReceiverStream::new(rx)),
    )
        .into_response()
}

fn respond(status: u16, body: Value) -> Response {
    let status = StatusCode::from_u16(status).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);
    (status, Json(body)).into_response()
}

fn internal_error(correlation_id: &str, error: &dyn Display) -> Response {
    error!(
        event_name = "webhook.request.failed",
        correlation_id = %correlation_id,
        error = %error,
        "delivery processing failed"
    );
    respond(500, json!({"ok": false, "message": "Internal server error."}))
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use async_trait::async_trait;
    use axum::body::Body;
    use axum::http::{Request, StatusCode};
    use serde_json::Value;
    use tokio::sync::Mutex;
    use tower::ServiceExt;

    use docbot_assistant::ScriptedAssistant;
    use docbot_core::pipeline::{
        ActionResult, AnswerBundle, ContextCreator, ConversationInfo, Pipeline, ResponseActor,
        ResponseDecider, ResponseDecision, UserContext, WebhookRequest,
    };
    use docbot_core::PipelineError;

    use crate::example::{ExampleContextCreator, ExampleResponseActor, ExampleResponseDecider};
    use crate::webhook::{router, AppState};

    struct RecordingActor {
        bundles: Arc<Mutex<Vec<AnswerBundle>>>,
    }

    #[async_trait]
    impl ResponseActor for RecordingActor {
        async fn act(
            &self,
            _conversation: &ConversationInfo,
            answer: &AnswerBundle,
        ) -> Result<Option<ActionResult>, PipelineError> {
            self.bundles.lock().await.push(answer.clone());
            Ok(None)
        }
    }

    struct PassthroughDecider;

    #[async_trait]
    impl ResponseDecider for PassthroughDecider {
        async fn decide(
            &self,
            request: &WebhookRequest,
        ) -> Result<ResponseDecision, PipelineError> {
            let question =
                request.body.get("question").and_then(Value::as_str).unwrap_or_default();
            Ok(ResponseDecision::proceed(ConversationInfo::from_question(question)))
        }
    }

    struct PassthroughContext;

    #[async_trait]
    impl ContextCreator for PassthroughContext {
        async fn create(
            &self,
            conversation: &ConversationInfo,
        ) -> Result<UserContext, PipelineError> {
            Ok(UserContext {
                user_question: conversation.user_question.clone(),
                persona: "default".to_string(),
                context_narrative: String::new(),
            })
        }
    }

    fn example_state(streaming: bool) -> AppState {
        AppState {
            pipeline: Arc::new(Pipeline {
                decider: Arc::new(ExampleResponseDecider),
                context_creator: Arc::new(ExampleContextCreator),
                actors: vec![Arc::new(ExampleResponseActor)],
            }),
            assistant: Arc::new(ScriptedAssistant::answering(["Use ", "the tokens page."])),
            streaming,
        }
    }

    fn post(body: &str) -> Request<Body> {
        Request::builder()
            .method("POST")
            .uri("/chat")
            .header("content-type", "application/json")
            .body(Body::from(body.to_string()))
            .expect("request")
    }

    async fn body_json(response: axum::response::Response) -> Value {
        let bytes = axum::body::to_bytes(response.into_body(), 1 << 20).await.expect("body");
        serde_json::from_slice(&bytes).expect("json body")
    }

    #[tokio::test]
    async fn health_check_reports_running() {
        let app = router(example_state(false));
        let response = app
            .oneshot(Request::builder().uri("/chat").body(Body::empty()).expect("request"))
            .await
            .expect("response");

        assert_eq!(response.status(), StatusCode::OK);
        let body = body_json(response).await;
        assert_eq!(body["message"], "App is running");
    }

    #[tokio::test]
    async fn invalid_json_body_is_rejected() {
        let app = router(example_state(false));
        let response = app.oneshot(post("{not json")).await.expect("response");

        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        let body = body_json(response).await;
        assert_eq!(body["message"], "Malformed payload.");
    }

    #[tokio::test]
    async fn early_return_status_and_body_pass_through() {
        let app = router(example_state(false));
        let response = app.oneshot(post("{\"other\": 1}")).await.expect("response");

        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        let body = body_json(response).await;
        assert_eq!(body["message"], "Include 'question' field in the POST request");
    }

    #[tokio::test]
    async fn batch_delivery_runs_the_full_pipeline() {
        let app = router(example_state(false));
        let response =
            app.oneshot(post("{\"question\": \"How do I create a token?\"}")).await.expect("response");

        assert_eq!(response.status(), StatusCode::CREATED);
        let body = body_json(response).await;
        assert_eq!(body["ok"], true);
        assert_eq!(body["message"], "Response submitted successfully.");
    }

    #[tokio::test]
    async fn no_actor_result_is_an_internal_error() {
        let bundles = Arc::new(Mutex::new(Vec::new()));
        let state = AppState {
            pipeline: Arc::new(Pipeline {
                decider: Arc::new(PassthroughDecider),
                context_creator: Arc::new(PassthroughContext),
                actors: vec![Arc::new(RecordingActor { bundles: bundles.clone() })],
            }),
            assistant: Arc::new(ScriptedAssistant::answering(["answer"])),
            streaming: false,
        };

        let response =
            router(state).oneshot(post("{\"question\": \"q\"}")).await.expect("response");

        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(bundles.lock().await.len(), 1, "the actor still ran");
    }

    #[tokio::test]
    async fn streaming_delivery_sends_fragments_then_runs_actors() {
        let bundles = Arc::new(Mutex::new(Vec::new()));
        let state = AppState {
            pipeline: Arc::new(Pipeline {
                decider: Arc::new(PassthroughDecider),
                context_creator: Arc::new(PassthroughContext),
                actors: vec![Arc::new(RecordingActor { bundles: bundles.clone() })],
            }),
            assistant: Arc::new(ScriptedAssistant {
                chunks: vec!["Use ".to_string(), "the tokens page.".to_string()],
                retrieved_docs: "- doc one".to_string(),
                prompt_context: "full prompt".to_string(),
            }),
            streaming: true,
        };

        let response =
            router(state).oneshot(post("{\"question\": \"q\"}")).await.expect("response");

        assert_eq!(response.status(), StatusCode::CREATED);
        let bytes = axum::body::to_bytes(response.into_body(), 1 << 20).await.expect("body");
        assert_eq!(String::from_utf8_lossy(&bytes), "Use the tokens page.");

        // Actors run on a spawned task after the stream closes.
        for _ in 0..50 {
            if !bundles.lock().await.is_empty() {
                break;
            }
            tokio::time::sleep(std::time::Duration::from_millis(10)).await;
        }
        let recorded = bundles.lock().await;
        assert_eq!(recorded.len(), 1);
        assert_eq!(recorded[0].answer, "Use the tokens page.");
        assert_eq!(recorded[0].retrieved_docs, "- doc one");
    }
}
