//! Auth-state events and the observers that react to them.
//!
//! Sign in, sign out and session expiry are published on an [AuthEvents]
//! channel held in the app state. Anything that needs to react, such as the
//! transaction cache, implements [AuthStateObserver] and is started with
//! [spawn_observer].

use tokio::{
    sync::broadcast::{self, error::RecvError},
    task::JoinHandle,
};

use crate::transaction::TransactionCache;

use super::UserId;

/// A change in a user's authentication state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AuthEvent {
    /// The user logged in or registered.
    SignedIn(UserId),
    /// The user logged out.
    SignedOut(UserId),
    /// The user made a request with a session past its expiry.
    SessionExpired(UserId),
}

impl AuthEvent {
    /// The user the event is about.
    pub fn user_id(&self) -> UserId {
        match self {
            AuthEvent::SignedIn(user_id)
            | AuthEvent::SignedOut(user_id)
            | AuthEvent::SessionExpired(user_id) => *user_id,
        }
    }
}

/// The publishing side of the auth-state channel.
#[derive(Debug, Clone)]
pub struct AuthEvents {
    sender: broadcast::Sender<AuthEvent>,
}

impl AuthEvents {
    /// Create a channel that buffers up to `capacity` events per slow observer.
    pub fn new(capacity: usize) -> Self {
        let (sender, _) = broadcast::channel(capacity);

        Self { sender }
    }

    /// Send `event` to every subscribed observer.
    pub fn publish(&self, event: AuthEvent) {
        tracing::debug!("publishing auth event {event:?}");

        if self.sender.send(event).is_err() {
            tracing::debug!("no observers subscribed to auth events");
        }
    }

    /// Subscribe to events published after this call.
    pub fn subscribe(&self) -> broadcast::Receiver<AuthEvent> {
        self.sender.subscribe()
    }
}

impl Default for AuthEvents {
    fn default() -> Self {
        Self::new(64)
    }
}

/// Reacts to changes in authentication state.
pub trait AuthStateObserver: Send + 'static {
    /// Handle a single event.
    fn on_auth_event(&mut self, event: AuthEvent);
}

/// Run `observer` on a background task until the channel closes.
pub fn spawn_observer<O: AuthStateObserver>(events: &AuthEvents, mut observer: O) -> JoinHandle<()> {
    let mut receiver = events.subscribe();

    tokio::spawn(async move {
        loop {
            match receiver.recv().await {
                Ok(event) => observer.on_auth_event(event),
                Err(RecvError::Lagged(skipped)) => {
                    tracing::warn!("auth observer fell behind and skipped {skipped} events");
                }
                Err(RecvError::Closed) => break,
            }
        }
    })
}

/// Drops a user's cached transactions when their session ends.
#[derive(Debug, Clone)]
pub struct CacheInvalidationObserver {
    cache: TransactionCache,
}

impl CacheInvalidationObserver {
    /// Create an observer for `cache`.
    pub fn new(cache: TransactionCache) -> Self {
        Self { cache }
    }
}

impl AuthStateObserver for CacheInvalidationObserver {
    fn on_auth_event(&mut self, event: AuthEvent) {
        let user_id = match event {
            AuthEvent::SignedOut(user_id) | AuthEvent::SessionExpired(user_id) => user_id,
            AuthEvent::SignedIn(_) => return,
        };

        match self.cache.lock() {
            Ok(mut cache) => {
                if cache.invalidate(&user_id) {
                    tracing::debug!("cleared cached transactions for user {user_id}");
                }
            }
            Err(error) => tracing::error!("could not acquire the cache lock: {error}"),
        }
    }
}
