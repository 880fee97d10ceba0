//! Boundary to the remote answering service.
//!
//! One question in, one answer out. The gateway never retries and never
//! validates its input; the controller only calls it with non-blank text.

mod http;

pub use http::HttpQueryGateway;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::error::GatewayError;

/// Request body for the query endpoint.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct QueryRequest {
    pub question: String,
}

/// Response body from the query endpoint.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct QueryResponse {
    pub answer: String,
}

/// Sends a single question and awaits its answer.
#[async_trait]
pub trait QueryGateway: Send + Sync + std::fmt::Debug {
    /// Ask one question. Single attempt.
    async fn ask(&self, question: &str) -> Result<String, GatewayError>;
}
