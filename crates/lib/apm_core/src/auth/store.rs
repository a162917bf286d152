//! Reactive holder of the current session.

use std::sync::Arc;

use tokio::sync::watch;
use tracing::debug;

use super::session::Session;

/// Current session, observable through [`watch`] receivers.
///
/// Cloning the store yields another handle to the same session.
#[derive(Clone)]
pub struct SessionStore {
    tx: Arc<watch::Sender<Option<Arc<Session>>>>,
}

impl SessionStore {
    pub fn new() -> Self {
        let (tx, _rx) = watch::channel(None);
        Self { tx: Arc::new(tx) }
    }

    /// Snapshot of the current session.
    pub fn current(&self) -> Option<Arc<Session>> {
        self.tx.borrow().clone()
    }

    pub fn is_authenticated(&self) -> bool {
        self.tx.borrow().is_some()
    }

    /// Subscribe to session changes.
    pub fn subscribe(&self) -> watch::Receiver<Option<Arc<Session>>> {
        self.tx.subscribe()
    }

    /// Replace the active session, returning the shared handle.
    pub fn replace(&self, session: Session) -> Arc<Session> {
        let session = Arc::new(session);
        debug!(subject = %session.subject_id, role = %session.role, "session replaced");
        self.tx.send_replace(Some(Arc::clone(&session)));
        session
    }

    /// Drop the active session. Notifies subscribers only on an actual change.
    pub fn clear(&self) {
        self.tx.send_if_modified(|current| current.take().is_some());
    }
}

impl Default for SessionStore {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::auth::session::Role;

    fn session(id: &str) -> Session {
        Session {
            subject_id: id.to_string(),
            role: Role::Admin,
            email: format!("{id}@example.com"),
            display_name: id.to_string(),
            token: format!("token-{id}"),
            expires_at: None,
        }
    }

    #[test]
    fn starts_empty() {
        let store = SessionStore::new();
        assert!(store.current().is_none());
        assert!(!store.is_authenticated());
    }

    #[test]
    fn replace_is_visible_through_clones() {
        let store = SessionStore::new();
        let other = store.clone();
        store.replace(session("a"));
        assert_eq!(other.current().unwrap().subject_id, "a");
    }

    #[tokio::test]
    async fn subscribers_observe_replace_and_clear() {
        let store = SessionStore::new();
        let mut rx = store.subscribe();

        store.replace(session("a"));
        rx.changed().await.unwrap();
        assert_eq!(rx.borrow_and_update().as_ref().unwrap().subject_id, "a");

        store.clear();
        rx.changed().await.unwrap();
        assert!(rx.borrow_and_update().is_none());
    }

    #[test]
    fn clearing_twice_is_harmless() {
        let store = SessionStore::new();
        store.replace(session("a"));
        store.clear();
        store.clear();
        assert!(store.current().is_none());
    }
}
