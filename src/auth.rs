//! Login and signup against the account service.
//!
//! Login is the only writer of the session store: a successful login
//! persists the returned token and username.

use serde::{Deserialize, Serialize};
use url::Url;

use crate::config::{
    AuthConfig, DEFAULT_LOGIN_PATH, DEFAULT_SIGNUP_PATH, GatewayConfig, join_endpoint,
};
use crate::error::{AuthError, ConfigError};
use crate::session::{Session, SessionStore};

const LOGIN_FAILED: &str = "Login failed";
const SIGNUP_FAILED: &str = "Signup failed";

#[derive(Serialize)]
struct LoginRequest<'a> {
    username: &'a str,
    password: &'a str,
}

#[derive(Serialize)]
struct SignupRequest<'a> {
    username: &'a str,
    email: &'a str,
    password: &'a str,
}

/// Successful login body.
#[derive(Debug, Clone, Deserialize)]
pub struct LoginResponse {
    pub access_token: String,
    pub username: String,
}

/// Successful signup body.
#[derive(Debug, Clone, Deserialize)]
pub struct SignupResponse {
    pub msg: String,
}

#[derive(Debug, Clone)]
pub struct AuthClient {
    login_url: Url,
    signup_url: Url,
    http: reqwest::Client,
    session: SessionStore,
}

impl AuthClient {
    pub fn new(base_url: impl AsRef<str>, session: SessionStore) -> Result<Self, ConfigError> {
        let base_url = base_url.as_ref();
        Ok(Self {
            login_url: join_endpoint(base_url, DEFAULT_LOGIN_PATH)?,
            signup_url: join_endpoint(base_url, DEFAULT_SIGNUP_PATH)?,
            http: reqwest::Client::new(),
            session,
        })
    }

    pub fn from_config(
        gateway: &GatewayConfig,
        auth: &AuthConfig,
        session: SessionStore,
    ) -> Result<Self, ConfigError> {
        let http = reqwest::Client::builder()
            .timeout(gateway.timeout())
            .build()?;
        Ok(Self {
            login_url: gateway.endpoint(&auth.login_path)?,
            signup_url: gateway.endpoint(&auth.signup_path)?,
            http,
            session,
        })
    }

    /// Authenticate and persist the session.
    pub async fn login(&self, username: &str, password: &str) -> Result<Session, AuthError> {
        let response = self
            .http
            .post(self.login_url.clone())
            .json(&LoginRequest { username, password })
            .send()
            .await?;

        let body: LoginResponse = Self::handle_response(response, LOGIN_FAILED).await?;
        self.session.establish(&body.username, &body.access_token)?;
        Ok(self.session.session())
    }

    /// Create an account. Does not log in.
    pub async fn signup(
        &self,
        username: &str,
        email: &str,
        password: &str,
    ) -> Result<String, AuthError> {
        let response = self
            .http
            .post(self.signup_url.clone())
            .json(&SignupRequest {
                username,
                email,
                password,
            })
            .send()
            .await?;

        let body: SignupResponse = Self::handle_response(response, SIGNUP_FAILED).await?;
        tracing::info!(name: "auth.signup.succeeded", username = %username, "Account created");
        Ok(body.msg)
    }

    async fn handle_response<T: serde::de::DeserializeOwned>(
        response: reqwest::Response,
        fallback: &str,
    ) -> Result<T, AuthError> {
        let status = response.status();
        if status.is_success() {
            return Ok(response.json().await?);
        }

        // `detail` is a string for domain errors and a list for validation errors.
        let detail = response
            .json::<serde_json::Value>()
            .await
            .ok()
            .and_then(|v| v.get("detail").and_then(|d| d.as_str()).map(String::from))
            .unwrap_or_else(|| fallback.to_string());

        tracing::warn!(
            name: "auth.rejected",
            status = status.as_u16(),
            detail = %detail,
            "Account service rejected request"
        );
        Err(AuthError::Rejected(detail))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::session::MemoryKeyValueStore;
    use axum::{Json, Router, http::StatusCode, routing::post};
    use serde_json::{Value, json};
    use std::sync::Arc;

    async fn spawn(app: Router) -> String {
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });
        format!("http://{addr}")
    }

    fn account_service() -> Router {
        Router::new()
            .route(
                "/login",
                post(|Json(body): Json<Value>| async move {
                    if body["password"] == "secret" {
                        (
                            StatusCode::OK,
                            Json(json!({ "access_token": "jwt-1", "username": body["username"] })),
                        )
                    } else {
                        (
                            StatusCode::BAD_REQUEST,
                            Json(json!({ "detail": "Username or password is incorrect" })),
                        )
                    }
                }),
            )
            .route(
                "/signup",
                post(|Json(body): Json<Value>| async move {
                    if body["username"] == "taken" {
                        (
                            StatusCode::BAD_REQUEST,
                            Json(json!({ "detail": "Account already exists" })),
                        )
                    } else {
                        (
                            StatusCode::OK,
                            Json(json!({ "msg": "User created successfully" })),
                        )
                    }
                }),
            )
    }

    fn session() -> SessionStore {
        SessionStore::new(Arc::new(MemoryKeyValueStore::new()))
    }

    #[tokio::test]
    async fn test_login_persists_session() {
        let store = session();
        let client = AuthClient::new(spawn(account_service()).await, store.clone()).unwrap();

        let session = client.login("alice", "secret").await.unwrap();
        assert!(session.present);
        assert_eq!(store.identity(), "alice");
        assert_eq!(store.credential().as_deref(), Some("jwt-1"));
    }

    #[tokio::test]
    async fn test_login_rejection_surfaces_detail() {
        let store = session();
        let client = AuthClient::new(spawn(account_service()).await, store.clone()).unwrap();

        let err = client.login("alice", "wrong").await.unwrap_err();
        assert_eq!(err.to_string(), "Username or password is incorrect");
        assert!(store.credential().is_none());
    }

    #[tokio::test]
    async fn test_login_without_detail_uses_fallback() {
        let app = Router::new().route(
            "/login",
            post(|| async { (StatusCode::UNPROCESSABLE_ENTITY, Json(json!({ "detail": [] }))) }),
        );
        let client = AuthClient::new(spawn(app).await, session()).unwrap();

        let err = client.login("a", "b").await.unwrap_err();
        assert!(matches!(err, AuthError::Rejected(ref d) if d == "Login failed"));
    }

    #[tokio::test]
    async fn test_signup() {
        let store = session();
        let client = AuthClient::new(spawn(account_service()).await, store.clone()).unwrap();

        let msg = client.signup("bob", "bob@example.com", "pw").await.unwrap();
        assert_eq!(msg, "User created successfully");
        assert!(store.credential().is_none());

        let err = client
            .signup("taken", "t@example.com", "pw")
            .await
            .unwrap_err();
        assert_eq!(err.to_string(), "Account already exists");
    }
}
