use reqwest::Client;
use secrecy::{ExposeSecret, SecretString};
use serde_json::Value;
use tracing::warn;

/// Client for the internal orchestrator admin API.
///
/// The database listing only enriches the user narrative, so every failure
/// degrades to an empty result instead of failing the request.
#[derive(Clone)]
pub struct OrchestratorClient {
    http: Client,
    endpoint: String,
    admin_token: SecretString,
}

impl OrchestratorClient {
    pub fn new(endpoint: impl Into<String>, admin_token: SecretString) -> Self {
        Self {
            http: Client::new(),
            endpoint: endpoint.into().trim_end_matches('/').to_string(),
            admin_token,
        }
    }

    /// List the databases belonging to an organization, best-effort.
    pub async fn databases(&self, org_id: &str) -> Vec<Value> {
        match self.fetch(org_id).await {
            Ok(databases) => databases,
            Err(error) => {
                warn!(
                    event_name = "intercom.orchestrator.lookup_failed",
                    org_id,
                    error = %error,
                    "orchestrator database lookup failed, continuing without databases"
                );
                Vec::new()
            }
        }
    }

    async fn fetch(&self, org_id: &str) -> Result<Vec<Value>, reqwest::Error> {
        let url = format!("{}/v2/admin/databases", self.endpoint);
        let response = self
            .http
            .get(url)
            .query(&[("orgId", org_id)])
            .bearer_auth(self.admin_token.expose_secret())
            .send()
            .await?
            .error_for_status()?;
        response.json().await
    }
}

#[cfg(test)]
mod tests {
    use axum::extract::Query;
    use axum::routing::get;
    use axum::{Json, Router};
    use serde_json::{json, Value};
    use std::collections::HashMap;

    use crate::orchestrator::OrchestratorClient;

    #[tokio::test]
    async fn lookup_returns_databases_for_org() {
        let app = Router::new().route(
            "/v2/admin/databases",
            get(|Query(params): Query<HashMap<String, String>>| async move {
                let org = params.get("orgId").cloned().unwrap_or_default();
                Json(json!([{"name": "db-1", "org": org}]))
            }),
        );
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.expect("bind stub");
        let address = listener.local_addr().expect("stub address");
        tokio::spawn(async move {
            let _ = axum::serve(listener, app).await;
        });

        let client =
            OrchestratorClient::new(format!("http://{address}"), "token".to_string().into());
        let databases: Vec<Value> = client.databases("org-1").await;

        assert_eq!(databases.len(), 1);
        assert_eq!(databases[0]["org"], "org-1");
    }

    #[tokio::test]
    async fn lookup_failure_degrades_to_empty() {
        let client = OrchestratorClient::new("http://127.0.0.1:1", "token".to_string().into());

        assert!(client.databases("org-1").await.is_empty());
    }
}
