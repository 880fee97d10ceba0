//! Authenticated identity held over a key-value backing.

use std::sync::Arc;

use super::kv::KeyValueStore;
use crate::error::StoreError;

/// Key holding the access token.
pub const TOKEN_KEY: &str = "token";
/// Key holding the display identity.
pub const USERNAME_KEY: &str = "username";
/// Identity shown when no user is stored.
pub const DEFAULT_PLACEHOLDER: &str = "User";

/// Snapshot of the authenticated session.
#[derive(Clone, PartialEq, Eq)]
pub struct Session {
    pub identity: String,
    pub credential: Option<String>,
    pub present: bool,
}

impl std::fmt::Debug for Session {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Session")
            .field("identity", &self.identity)
            .field("credential", &self.credential.as_ref().map(|_| "<redacted>"))
            .field("present", &self.present)
            .finish()
    }
}

/// Read/clear access to the stored session.
///
/// Cheap to clone; clones share the same backing.
#[derive(Debug, Clone)]
pub struct SessionStore {
    kv: Arc<dyn KeyValueStore>,
    placeholder: String,
}

impl SessionStore {
    /// Create a store with the default `"User"` placeholder.
    pub fn new(kv: Arc<dyn KeyValueStore>) -> Self {
        Self::with_placeholder(kv, DEFAULT_PLACEHOLDER)
    }

    /// Create a store with a custom placeholder identity.
    ///
    /// An empty placeholder falls back to the default so the identity is
    /// never empty.
    pub fn with_placeholder(kv: Arc<dyn KeyValueStore>, placeholder: impl Into<String>) -> Self {
        let placeholder = placeholder.into();
        let placeholder = if placeholder.trim().is_empty() {
            DEFAULT_PLACEHOLDER.to_string()
        } else {
            placeholder
        };
        Self { kv, placeholder }
    }

    /// Stored identity, or the placeholder when absent or blank.
    #[must_use]
    pub fn identity(&self) -> String {
        self.kv
            .get(USERNAME_KEY)
            .filter(|name| !name.trim().is_empty())
            .unwrap_or_else(|| self.placeholder.clone())
    }

    /// Stored access token, if any.
    #[must_use]
    pub fn credential(&self) -> Option<String> {
        self.kv.get(TOKEN_KEY).filter(|token| !token.is_empty())
    }

    #[must_use]
    pub fn session(&self) -> Session {
        let credential = self.credential();
        Session {
            identity: self.identity(),
            present: credential.is_some(),
            credential,
        }
    }

    /// Persist a successful login.
    pub fn establish(&self, identity: &str, credential: &str) -> Result<(), StoreError> {
        self.kv.set(TOKEN_KEY, credential)?;
        self.kv.set(USERNAME_KEY, identity)?;
        tracing::info!(name: "session.established", identity = %identity, "Session established");
        Ok(())
    }

    /// Remove identity and credential.
    ///
    /// Never fails: a backing write error is logged, and reads after this
    /// call still observe the cleared state.
    pub fn clear(&self) {
        if let Err(e) = self.kv.clear() {
            tracing::error!(
                name: "session.clear.failed",
                error = %e,
                "Failed to persist session clear"
            );
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::session::MemoryKeyValueStore;

    fn store() -> SessionStore {
        SessionStore::new(Arc::new(MemoryKeyValueStore::new()))
    }

    #[test]
    fn test_absent_session_uses_placeholder() {
        let store = store();
        assert_eq!(store.identity(), "User");
        assert!(store.credential().is_none());

        let session = store.session();
        assert!(!session.present);
        assert_eq!(session.identity, "User");
    }

    #[test]
    fn test_establish_then_clear() {
        let store = store();
        store.establish("alice", "jwt-abc").unwrap();

        let session = store.session();
        assert!(session.present);
        assert_eq!(session.identity, "alice");
        assert_eq!(session.credential.as_deref(), Some("jwt-abc"));

        store.clear();
        assert_eq!(store.identity(), "User");
        assert!(store.credential().is_none());
        assert!(!store.session().present);
    }

    #[test]
    fn test_empty_username_falls_back() {
        let kv = Arc::new(MemoryKeyValueStore::new());
        kv.set(USERNAME_KEY, "").unwrap();
        let store = SessionStore::new(kv);
        assert_eq!(store.identity(), "User");
    }

    #[test]
    fn test_whitespace_username_falls_back() {
        let kv = Arc::new(MemoryKeyValueStore::new());
        kv.set(USERNAME_KEY, "  \t").unwrap();
        let store = SessionStore::new(kv);
        assert_eq!(store.identity(), "User");
        assert_eq!(store.session().identity, "User");
    }

    #[test]
    fn test_custom_placeholder() {
        let store = SessionStore::with_placeholder(Arc::new(MemoryKeyValueStore::new()), "Guest");
        assert_eq!(store.identity(), "Guest");

        let blank = SessionStore::with_placeholder(Arc::new(MemoryKeyValueStore::new()), "  ");
        assert_eq!(blank.identity(), "User");
    }

    #[test]
    fn test_clones_share_backing() {
        let store = store();
        let other = store.clone();
        store.establish("carol", "t").unwrap();
        assert_eq!(other.identity(), "carol");
        other.clear();
        assert!(store.credential().is_none());
    }

    #[test]
    fn test_debug_redacts_credential() {
        let store = store();
        store.establish("dave", "super-secret").unwrap();
        let dbg = format!("{:?}", store.session());
        assert!(!dbg.contains("super-secret"));
        assert!(dbg.contains("redacted"));
    }
}
