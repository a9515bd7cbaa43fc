use reqwest::Client;
use secrecy::{ExposeSecret, SecretString};
use serde_json::{json, Value};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum IntercomError {
    #[error("intercom request failed: {0}")]
    Http(#[from] reqwest::Error),
}

/// Thin client for the two Intercom REST calls the pipeline makes:
/// fetching a contact profile and replying to a conversation.
///
/// Injected into each capability that needs it; `api_base` is configurable
/// so tests can point at a local stub.
#[derive(Clone)]
pub struct IntercomClient {
    http: Client,
    api_base: String,
    token: SecretString,
    admin_id: String,
}

impl IntercomClient {
    pub fn new(api_base: impl Into<String>, token: SecretString, admin_id: impl Into<String>) -> Self {
        Self {
            http: Client::new(),
            api_base: api_base.into().trim_end_matches('/').to_string(),
            token,
            admin_id: admin_id.into(),
        }
    }

    /// Fetch a contact or lead profile by its Intercom id.
    pub async fn contact(&self, contact_id: &str) -> Result<Value, IntercomError> {
        let url = format!("{}/contacts/{contact_id}", self.api_base);
        let response = self
            .http
            .get(url)
            .bearer_auth(self.token.expose_secret())
            .send()
            .await?
            .error_for_status()?;
        Ok(response.json().await?)
    }

    /// Reply to a conversation with a visible message from the bot admin.
    pub async fn send_message(
        &self,
        conversation_id: &str,
        body: &str,
    ) -> Result<Value, IntercomError> {
        self.reply(conversation_id, "comment", body).await
    }

    /// Attach an internal note to a conversation, invisible to the end user.
    pub async fn add_note(&self, conversation_id: &str, body: &str) -> Result<Value, IntercomError> {
        self.reply(conversation_id, "note", body).await
    }

    async fn reply(
        &self,
        conversation_id: &str,
        message_type: &str,
        body: &str,
    ) -> Result<Value, IntercomError> {
        let url = format!("{}/conversations/{conversation_id}/reply", self.api_base);
        let payload = json!({
            "type": "admin",
            "admin_id": self.admin_id,
            "message_type": message_type,
            "body": body,
        });

        let response = self
            .http
            .post(url)
            .bearer_auth(self.token.expose_secret())
            .json(&payload)
            .send()
            .await?
            .error_for_status()?;
        Ok(response.json().await?)
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use axum::extract::{Path, State};
    use axum::routing::{get, post};
    use axum::{Json, Router};
    use serde_json::{json, Value};
    use tokio::sync::Mutex;

    use crate::client::IntercomClient;

    type Recorded = Arc<Mutex<Vec<Value>>>;

    async fn spawn_stub() -> (String, Recorded) {
        let recorded: Recorded = Arc::new(Mutex::new(Vec::new()));
        let app = Router::new()
            .route(
                "/contacts/{id}",
                get(|Path(id): Path<String>| async move {
                    Json(json!({"id": id, "name": "Ada", "email": "ada@example.com"}))
                }),
            )
            .route(
                "/conversations/{id}/reply",
                post(
                    |State(recorded): State<Recorded>, Json(body): Json<Value>| async move {
                        recorded.lock().await.push(body);
                        Json(json!({"type": "conversation"}))
                    },
                ),
            )
            .with_state(recorded.clone());

        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.expect("bind stub");
        let address = listener.local_addr().expect("stub address");
        tokio::spawn(async move {
            let _ = axum::serve(listener, app).await;
        });

        (format!("http://{address}"), recorded)
    }

    #[tokio::test]
    async fn contact_fetch_returns_profile() {
        let (base, _) = spawn_stub().await;
        let client = IntercomClient::new(base, "token".to_string().into(), "admin-1");

        let contact = client.contact("u-42").await.expect("contact fetch should succeed");

        assert_eq!(contact["id"], "u-42");
        assert_eq!(contact["name"], "Ada");
    }

    #[tokio::test]
    async fn message_and_note_use_distinct_message_types() {
        let (base, recorded) = spawn_stub().await;
        let client = IntercomClient::new(base, "token".to_string().into(), "admin-1");

        client.send_message("c-1", "hello").await.expect("message should send");
        client.add_note("c-1", "fyi").await.expect("note should send");

        let recorded = recorded.lock().await;
        assert_eq!(recorded[0]["message_type"], "comment");
        assert_eq!(recorded[0]["admin_id"], "admin-1");
        assert_eq!(recorded[1]["message_type"], "note");
        assert_eq!(recorded[1]["body"], "fyi");
    }

    #[tokio::test]
    async fn http_failure_surfaces_as_error() {
        // Nothing is listening on this port.
        let client =
            IntercomClient::new("http://127.0.0.1:1", "token".to_string().into(), "admin-1");

        assert!(client.contact("u-1").await.is_err());
    }
}
