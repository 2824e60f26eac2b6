//! Session registry: at most one live session per user.
//!
//! Maps canonical (lower-cased) usernames to the connection UID that
//! owns the session. The claim is an atomic check-then-insert so two
//! racing logins for the same user cannot both succeed; the release is
//! guarded by the owner UID so a late teardown cannot evict a newer
//! session for the same user.

use dashmap::DashMap;
use dashmap::mapref::entry::Entry;

/// Server-wide registry of logged-in users.
#[derive(Debug, Default)]
pub struct SessionRegistry {
    sessions: DashMap<String, String>,
}

impl SessionRegistry {
    /// Create an empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Atomically claim the session slot for `user` on behalf of the
    /// connection `uid`. Returns `false` when another connection
    /// already holds it.
    pub fn claim(&self, user: &str, uid: &str) -> bool {
        match self.sessions.entry(user.to_string()) {
            Entry::Occupied(_) => false,
            Entry::Vacant(slot) => {
                slot.insert(uid.to_string());
                true
            }
        }
    }

    /// Release the session slot for `user`, but only if `uid` owns it.
    /// Returns `true` when an entry was removed.
    pub fn release(&self, user: &str, uid: &str) -> bool {
        self.sessions
            .remove_if(user, |_, owner| owner == uid)
            .is_some()
    }

    /// The UID currently holding the session for `user`, if any.
    pub fn holder(&self, user: &str) -> Option<String> {
        self.sessions.get(user).map(|entry| entry.value().clone())
    }

    /// Number of live sessions.
    pub fn len(&self) -> usize {
        self.sessions.len()
    }

    /// Whether no sessions are live.
    pub fn is_empty(&self) -> bool {
        self.sessions.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_claim_and_release() {
        let registry = SessionRegistry::new();

        assert!(registry.claim("jdoe", "1.100"));
        assert_eq!(registry.holder("jdoe"), Some("1.100".to_string()));
        assert_eq!(registry.len(), 1);

        assert!(registry.release("jdoe", "1.100"));
        assert!(registry.is_empty());
        assert_eq!(registry.holder("jdoe"), None);
    }

    #[test]
    fn test_second_claim_fails() {
        let registry = SessionRegistry::new();

        assert!(registry.claim("jdoe", "1.100"));
        assert!(!registry.claim("jdoe", "2.200"));
        assert_eq!(registry.holder("jdoe"), Some("1.100".to_string()));
    }

    #[test]
    fn test_distinct_users_coexist() {
        let registry = SessionRegistry::new();

        assert!(registry.claim("jdoe", "1.100"));
        assert!(registry.claim("jdoe2", "2.200"));
        assert_eq!(registry.len(), 2);
    }

    #[test]
    fn test_release_is_owner_guarded() {
        let registry = SessionRegistry::new();

        assert!(registry.claim("jdoe", "1.100"));

        // A stale teardown from another connection must not evict the owner.
        assert!(!registry.release("jdoe", "2.200"));
        assert_eq!(registry.holder("jdoe"), Some("1.100".to_string()));

        assert!(registry.release("jdoe", "1.100"));
        assert!(registry.is_empty());
    }

    #[test]
    fn test_reclaim_after_release() {
        let registry = SessionRegistry::new();

        assert!(registry.claim("jdoe", "1.100"));
        assert!(registry.release("jdoe", "1.100"));
        assert!(registry.claim("jdoe", "2.200"));
        assert_eq!(registry.holder("jdoe"), Some("2.200".to_string()));
    }
}
