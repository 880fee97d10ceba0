//! Conversation state: transcript, recent questions, and the controller
//! that drives them.
//!
//! # Architecture
//!
//! - [`Transcript`]: append-only list of [`Turn`]s
//! - [`HistoryTracker`]: last five questions, most recent first
//! - [`ConversationController`]: submission state machine over a
//!   [`QueryGateway`](crate::gateway::QueryGateway)
//!
//! # Example
//!
//! ```rust,no_run
//! use std::sync::Arc;
//! use ragchat_client::conversation::ConversationController;
//! use ragchat_client::gateway::HttpQueryGateway;
//! use ragchat_client::session::{MemoryKeyValueStore, SessionStore};
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let session = SessionStore::new(Arc::new(MemoryKeyValueStore::new()));
//! let gateway = Arc::new(HttpQueryGateway::new("http://localhost:8000/chat/query")?);
//! let controller = ConversationController::new(gateway, session);
//!
//! controller.submit("What is 2+2?").await;
//! println!("{:?}", controller.transcript());
//! # Ok(())
//! # }
//! ```

mod controller;
mod event;
mod history;
mod transcript;

pub use controller::{ControllerOptions, ConversationController, PendingQuery, ViewAccess};
pub use event::{ControllerEvent, SubmissionState, SubmitOutcome};
pub use history::HistoryTracker;
pub use transcript::{Speaker, Transcript, Turn, TurnId};
