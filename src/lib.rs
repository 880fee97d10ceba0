//! Conversation session client for a remote question-answering service.
//!
//! Authenticates a user, runs a single question/answer exchange loop,
//! and keeps a local transcript plus the last few questions asked.
//!
//! # Architecture
//!
//! - **Session**: identity and access token over a key-value backing
//! - **Gateway**: one HTTP call per question, no retries
//! - **Conversation**: optimistic transcript, bounded history, and the
//!   controller reconciling them with gateway results
//! - **Auth**: login/signup client that populates the session
//!
//! # Modules
//!
//! - [`auth`]: account service client
//! - [`config`]: layered configuration (defaults, file, env, CLI)
//! - [`conversation`]: transcript, history, controller
//! - [`error`]: error types
//! - [`gateway`]: query gateway trait and HTTP implementation
//! - [`session`]: session store and key-value backings

// Allow pedantic clippy warnings that don't add value for this codebase
#![allow(clippy::missing_fields_in_debug)]
#![allow(clippy::cargo_common_metadata)]
#![allow(clippy::multiple_crate_versions)]

pub mod auth;
pub mod config;
pub mod conversation;
pub mod error;
pub mod gateway;
pub mod session;

use std::sync::Arc;

use crate::auth::AuthClient;
use crate::config::ClientConfig;
use crate::conversation::ConversationController;
use crate::error::{ConfigError, StoreError};
use crate::gateway::HttpQueryGateway;
use crate::session::{FileKeyValueStore, KeyValueStore, MemoryKeyValueStore, SessionStore};

/// Everything a UI layer needs, wired from one configuration.
#[derive(Debug, Clone)]
pub struct ClientState {
    /// Session store shared by auth, gateway, and controller.
    pub session: SessionStore,
    /// Account service client.
    pub auth: AuthClient,
    /// Conversation controller.
    pub controller: Arc<ConversationController>,
    /// Configuration the state was built from.
    pub config: Arc<ClientConfig>,
}

/// Failure wiring the client together.
#[derive(Debug, thiserror::Error)]
pub enum InitError {
    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error(transparent)]
    Store(#[from] StoreError),
}

impl ClientState {
    pub fn from_config(config: ClientConfig) -> Result<Self, InitError> {
        let kv: Arc<dyn KeyValueStore> = match config.store_path() {
            Some(path) => Arc::new(FileKeyValueStore::open(path)?),
            None => Arc::new(MemoryKeyValueStore::new()),
        };
        let session =
            SessionStore::with_placeholder(kv, config.session.placeholder_identity.clone());

        let gateway = Arc::new(HttpQueryGateway::from_config(&config.gateway, &session)?);
        let auth = AuthClient::from_config(&config.gateway, &config.auth, session.clone())?;
        let controller = Arc::new(ConversationController::from_config(
            &config,
            gateway,
            session.clone(),
        ));

        Ok(Self {
            session,
            auth,
            controller,
            config: Arc::new(config),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_state_from_default_config() {
        let state = ClientState::from_config(ClientConfig::default()).unwrap();
        assert_eq!(state.controller.current_identity(), "User");
        assert!(state.session.credential().is_none());
    }

    #[test]
    fn test_state_restores_persisted_session() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("session.json");
        FileKeyValueStore::open(&path)
            .unwrap()
            .set("username", "alice")
            .unwrap();

        let mut config = ClientConfig::default();
        config.session.store_path = Some(path.to_string_lossy().into_owned());

        let state = ClientState::from_config(config).unwrap();
        assert_eq!(state.controller.current_identity(), "alice");
        assert_eq!(state.controller.avatar_label(), "A");
    }
}
