//! HTTP implementation of the query gateway.

use async_trait::async_trait;
use serde::Deserialize;
use url::Url;

use super::{QueryGateway, QueryRequest, QueryResponse};
use crate::config::GatewayConfig;
use crate::error::{ConfigError, GatewayError};
use crate::session::SessionStore;

/// Error body shape used by the answering service.
#[derive(Debug, Deserialize)]
struct ErrorBody {
    detail: String,
}

/// Gateway that POSTs `{"question": ...}` and reads `{"answer": ...}`.
///
/// # Example
///
/// ```rust,no_run
/// use ragchat_client::gateway::{HttpQueryGateway, QueryGateway};
///
/// # async fn example() -> Result<(), Box<dyn std::error::Error>> {
/// let gateway = HttpQueryGateway::new("http://localhost:8000/chat/query")?;
/// let answer = gateway.ask("What is 2+2?").await?;
/// # Ok(())
/// # }
/// ```
#[derive(Debug, Clone)]
pub struct HttpQueryGateway {
    endpoint: Url,
    http: reqwest::Client,
    credential_source: Option<SessionStore>,
}

impl HttpQueryGateway {
    /// Create a gateway for a full endpoint URL.
    pub fn new(endpoint: impl AsRef<str>) -> Result<Self, ConfigError> {
        Self::with_client(endpoint, reqwest::Client::new())
    }

    /// Create a gateway with a custom reqwest client.
    pub fn with_client(
        endpoint: impl AsRef<str>,
        http: reqwest::Client,
    ) -> Result<Self, ConfigError> {
        let endpoint = Url::parse(endpoint.as_ref())?;
        Ok(Self {
            endpoint,
            http,
            credential_source: None,
        })
    }

    /// Build from configuration. The session store is consulted only when
    /// `attach_credential` is enabled.
    pub fn from_config(
        config: &GatewayConfig,
        session: &SessionStore,
    ) -> Result<Self, ConfigError> {
        let http = reqwest::Client::builder()
            .timeout(config.timeout())
            .build()?;
        let mut gateway = Self::with_client(config.endpoint(&config.query_path)?, http)?;
        if config.attach_credential {
            gateway = gateway.with_credential_source(session.clone());
        }
        Ok(gateway)
    }

    /// Send `Authorization: Bearer <token>` whenever the store holds one.
    #[must_use]
    pub fn with_credential_source(mut self, session: SessionStore) -> Self {
        self.credential_source = Some(session);
        self
    }

    #[must_use]
    pub fn endpoint(&self) -> &Url {
        &self.endpoint
    }

    async fn read_answer(response: reqwest::Response) -> Result<String, GatewayError> {
        let status = response.status();
        let body = response.bytes().await?;

        if !status.is_success() {
            let message = serde_json::from_slice::<ErrorBody>(&body)
                .map(|e| e.detail)
                .unwrap_or_else(|_| String::from_utf8_lossy(&body).into_owned());
            return Err(GatewayError::status(status.as_u16(), message));
        }

        serde_json::from_slice::<QueryResponse>(&body)
            .map(|r| r.answer)
            .map_err(|e| GatewayError::malformed(format!("unexpected response body: {e}")))
    }
}

#[async_trait]
impl QueryGateway for HttpQueryGateway {
    async fn ask(&self, question: &str) -> Result<String, GatewayError> {
        let req = QueryRequest {
            question: question.to_string(),
        };

        let mut request = self.http.post(self.endpoint.clone()).json(&req);
        if let Some(token) = self.credential_source.as_ref().and_then(SessionStore::credential) {
            request = request.bearer_auth(token);
        }

        tracing::debug!(
            name: "gateway.request",
            endpoint = %self.endpoint,
            authenticated = self.credential_source.is_some(),
            "Sending question"
        );

        let response = request.send().await?;
        Self::read_answer(response).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::GatewayErrorKind;
    use crate::session::MemoryKeyValueStore;
    use axum::{Json, Router, http::HeaderMap, http::StatusCode, routing::post};
    use std::sync::Arc;

    async fn spawn(app: Router) -> String {
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });
        format!("http://{addr}/chat/query")
    }

    #[tokio::test]
    async fn test_ask_returns_answer() {
        let app = Router::new().route(
            "/chat/query",
            post(|Json(req): Json<QueryRequest>| async move {
                Json(QueryResponse {
                    answer: format!("echo: {}", req.question),
                })
            }),
        );
        let gateway = HttpQueryGateway::new(spawn(app).await).unwrap();

        let answer = gateway.ask("What is 2+2?").await.unwrap();
        assert_eq!(answer, "echo: What is 2+2?");
    }

    #[tokio::test]
    async fn test_non_success_status_uses_detail() {
        let app = Router::new().route(
            "/chat/query",
            post(|| async {
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    Json(serde_json::json!({ "detail": "vector store offline" })),
                )
            }),
        );
        let gateway = HttpQueryGateway::new(spawn(app).await).unwrap();

        let err = gateway.ask("x").await.unwrap_err();
        assert_eq!(err.kind, GatewayErrorKind::Status(500));
        assert_eq!(err.message, "vector store offline");
    }

    #[tokio::test]
    async fn test_missing_answer_field_is_malformed() {
        let app = Router::new().route(
            "/chat/query",
            post(|| async { Json(serde_json::json!({ "result": "4" })) }),
        );
        let gateway = HttpQueryGateway::new(spawn(app).await).unwrap();

        let err = gateway.ask("x").await.unwrap_err();
        assert_eq!(err.kind, GatewayErrorKind::Malformed);
    }

    #[tokio::test]
    async fn test_unreachable_is_network_error() {
        let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
        let addr = listener.local_addr().unwrap();
        drop(listener);

        let gateway = HttpQueryGateway::new(format!("http://{addr}/chat/query")).unwrap();
        let err = gateway.ask("x").await.unwrap_err();
        assert_eq!(err.kind, GatewayErrorKind::Network);
    }

    #[tokio::test]
    async fn test_credential_attached_only_when_configured() {
        let app = Router::new().route(
            "/chat/query",
            post(|headers: HeaderMap| async move {
                let auth = headers
                    .get("authorization")
                    .and_then(|v| v.to_str().ok())
                    .unwrap_or("none")
                    .to_string();
                Json(QueryResponse { answer: auth })
            }),
        );
        let url = spawn(app).await;

        let session = SessionStore::new(Arc::new(MemoryKeyValueStore::new()));
        session.establish("alice", "jwt-1").unwrap();

        let public = HttpQueryGateway::new(&url).unwrap();
        assert_eq!(public.ask("q").await.unwrap(), "none");

        let authed = HttpQueryGateway::new(&url)
            .unwrap()
            .with_credential_source(session.clone());
        assert_eq!(authed.ask("q").await.unwrap(), "Bearer jwt-1");

        session.clear();
        assert_eq!(authed.ask("q").await.unwrap(), "none");
    }

    #[test]
    fn test_from_config_resolves_endpoint() {
        let cfg = crate::config::ClientConfig::default();
        let session = SessionStore::new(Arc::new(MemoryKeyValueStore::new()));
        let gateway = HttpQueryGateway::from_config(&cfg.gateway, &session).unwrap();
        assert_eq!(gateway.endpoint().as_str(), "http://localhost:8000/chat/query");
        assert!(gateway.credential_source.is_none());
    }
}
