//! Auth Session
//!
//! An explicit session handle passed to every component that gates writes.
//! Components subscribe while mounted; dropping the subscription
//! unsubscribes.

use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tokio::sync::watch;

/// Credentials issued by the auth provider
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AuthSession {
    pub user_id: String,
    pub email: Option<String>,
    pub access_token: String,
    /// Expiry, unix seconds
    pub expires_at: Option<i64>,
}

impl AuthSession {
    pub fn new(user_id: impl Into<String>, access_token: impl Into<String>) -> Self {
        Self {
            user_id: user_id.into(),
            email: None,
            access_token: access_token.into(),
            expires_at: None,
        }
    }

    pub fn expiring_at(mut self, expires_at: i64) -> Self {
        self.expires_at = Some(expires_at);
        self
    }

    pub fn is_expired(&self, now: i64) -> bool {
        self.expires_at.map_or(false, |at| at <= now)
    }
}

/// Shared, cloneable session handle
#[derive(Clone)]
pub struct Session {
    tx: Arc<watch::Sender<Option<AuthSession>>>,
}

impl Session {
    pub fn signed_out() -> Self {
        let (tx, _) = watch::channel(None);
        Self { tx: Arc::new(tx) }
    }

    pub fn signed_in(auth: AuthSession) -> Self {
        let session = Self::signed_out();
        session.sign_in(auth);
        session
    }

    pub fn sign_in(&self, auth: AuthSession) {
        log::info!("Signed in as {}", auth.user_id);
        self.tx.send_replace(Some(auth));
    }

    pub fn sign_out(&self) {
        if self.tx.send_replace(None).is_some() {
            log::info!("Signed out");
        }
    }

    pub fn current(&self) -> Option<AuthSession> {
        self.tx.borrow().clone()
    }

    /// True while signed in with an unexpired session
    pub fn can_write(&self) -> bool {
        let now = chrono::Utc::now().timestamp();
        self.tx
            .borrow()
            .as_ref()
            .map_or(false, |auth| !auth.is_expired(now))
    }

    pub fn access_token(&self) -> Option<String> {
        self.tx.borrow().as_ref().map(|auth| auth.access_token.clone())
    }

    pub fn subscribe(&self) -> SessionSubscription {
        SessionSubscription {
            rx: self.tx.subscribe(),
        }
    }

    pub fn subscriber_count(&self) -> usize {
        self.tx.receiver_count()
    }
}

impl std::fmt::Debug for Session {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Session")
            .field("user", &self.current().map(|a| a.user_id))
            .finish()
    }
}

/// Live view of auth changes, held for the lifetime of a mounted component
pub struct SessionSubscription {
    rx: watch::Receiver<Option<AuthSession>>,
}

impl SessionSubscription {
    pub fn current(&self) -> Option<AuthSession> {
        self.rx.borrow().clone()
    }

    /// Wait for the next auth change. `None` once every session handle is gone.
    pub async fn changed(&mut self) -> Option<Option<AuthSession>> {
        self.rx.changed().await.ok()?;
        Some(self.rx.borrow_and_update().clone())
    }

    pub fn unsubscribe(self) {}
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_signed_out_cannot_write() {
        let session = Session::signed_out();
        assert!(!session.can_write());
        assert!(session.access_token().is_none());
    }

    #[test]
    fn test_expired_session_cannot_write() {
        let past = chrono::Utc::now().timestamp() - 60;
        let session = Session::signed_in(AuthSession::new("u", "t").expiring_at(past));
        assert!(session.current().is_some());
        assert!(!session.can_write());

        let future = chrono::Utc::now().timestamp() + 3600;
        session.sign_in(AuthSession::new("u", "t2").expiring_at(future));
        assert!(session.can_write());
        assert_eq!(session.access_token().as_deref(), Some("t2"));
    }

    #[test]
    fn test_unsubscribe_on_drop() {
        let session = Session::signed_out();
        let a = session.subscribe();
        let b = session.subscribe();
        assert_eq!(session.subscriber_count(), 2);
        drop(a);
        b.unsubscribe();
        assert_eq!(session.subscriber_count(), 0);
    }

    #[tokio::test]
    async fn test_subscription_sees_changes() {
        let session = Session::signed_out();
        let mut sub = session.subscribe();
        let handle = session.clone();
        tokio::spawn(async move {
            handle.sign_in(AuthSession::new("editor", "token"));
        });
        let change = sub.changed().await.unwrap();
        assert_eq!(change.unwrap().user_id, "editor");
        assert!(sub.current().is_some());

        session.sign_out();
        assert_eq!(sub.changed().await, Some(None));
    }
}
