//! Authenticated session storage.
//!
//! The session is a username/access-token pair kept in a key-value
//! collaborator, the way a browser keeps it in local storage. The
//! controller reads it and clears it on logout; only the login flow
//! writes it.
//!
//! # Architecture
//!
//! - [`KeyValueStore`]: the persistence contract (`token`, `username` keys)
//! - [`MemoryKeyValueStore`], [`FileKeyValueStore`]: backings
//! - [`SessionStore`]: identity/credential reads with placeholder fallback
//!
//! # Example
//!
//! ```rust
//! use std::sync::Arc;
//! use ragchat_client::session::{MemoryKeyValueStore, SessionStore};
//!
//! let store = SessionStore::new(Arc::new(MemoryKeyValueStore::new()));
//! assert_eq!(store.identity(), "User");
//!
//! store.establish("alice", "token-123").unwrap();
//! assert_eq!(store.identity(), "alice");
//!
//! store.clear();
//! assert!(store.credential().is_none());
//! ```

mod kv;
mod store;

pub use kv::{FileKeyValueStore, KeyValueStore, MemoryKeyValueStore};
pub use store::{DEFAULT_PLACEHOLDER, Session, SessionStore, TOKEN_KEY, USERNAME_KEY};
