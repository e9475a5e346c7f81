//! Session lifecycle: credential storage, expiry polling, and the events
//! emitted when a session ends.

mod clock;
mod credential;
mod events;

use std::sync::Arc;
use std::time::Duration;

use anyhow::Result;
pub use clock::{DEFAULT_POLL_INTERVAL, SessionClock};
pub use credential::{
    Credential, CredentialPersistence, CredentialStore, EphemeralPersistence, LogoutReason,
    SessionFile, TimeSource, mask_token,
};
pub use events::SessionEvent;
use tokio::sync::broadcast;

use crate::decision::{Redirect, RedirectReason};

const EVENT_CAPACITY: usize = 16;

/// The only writer of the credential store.
///
/// Forced logouts (expiry, server invalidation) clear the store before the
/// corresponding event is sent, so any gate evaluation that starts after a
/// logout observes the cleared credential.
#[derive(Debug)]
pub struct Session {
    store: Arc<CredentialStore>,
    events: broadcast::Sender<SessionEvent>,
    sign_in_route: String,
}

impl Session {
    pub fn new(store: Arc<CredentialStore>, sign_in_route: impl Into<String>) -> Self {
        let (events, _) = broadcast::channel(EVENT_CAPACITY);
        Self {
            store,
            events,
            sign_in_route: sign_in_route.into(),
        }
    }

    /// Read-only access for gates and clients.
    pub fn credentials(&self) -> &CredentialStore {
        &self.store
    }

    pub fn subscribe(&self) -> broadcast::Receiver<SessionEvent> {
        self.events.subscribe()
    }

    pub fn sign_in_route(&self) -> &str {
        &self.sign_in_route
    }

    /// Stores a freshly issued credential.
    ///
    /// # Errors
    /// Returns an error if the credential could not be persisted. The
    /// in-memory session is still established.
    pub fn sign_in(&self, token: &str, expires_in: Option<Duration>) -> Result<Credential> {
        let stored = self.store.set(token, expires_in);
        tracing::info!(
            token = %mask_token(token),
            expires_in_secs = expires_in.map(|d| d.as_secs()),
            "session established"
        );
        self.emit(SessionEvent::SignedIn);
        stored
    }

    /// Explicit logout. Returns whether a session was present.
    pub fn sign_out(&self) -> bool {
        let had = self.store.clear(LogoutReason::SignedOut);
        if had {
            tracing::info!("signed out");
            self.emit(SessionEvent::SignedOut);
        }
        had
    }

    /// The backend rejected the credential. Emits `Invalidated` only if a
    /// credential was actually cleared.
    pub fn invalidate(&self) -> Option<Redirect> {
        if !self.store.clear(LogoutReason::Invalidated) {
            return None;
        }
        let redirect = Redirect::new(&self.sign_in_route, RedirectReason::SessionInvalidated);
        tracing::info!("session invalidated by backend");
        self.emit(SessionEvent::Invalidated {
            redirect: redirect.clone(),
        });
        Some(redirect)
    }

    /// Forced logout when the credential is past its expiry.
    ///
    /// Returns the redirect only to the caller that actually performed the
    /// logout; every other caller, concurrent or later, gets `None`.
    pub fn expire_if_due(&self) -> Option<Redirect> {
        self.store.expire_if_due()?;
        let redirect = Redirect::new(&self.sign_in_route, RedirectReason::SessionExpired);
        tracing::info!("session expired");
        self.emit(SessionEvent::Expired {
            redirect: redirect.clone(),
        });
        Some(redirect)
    }

    /// Redirect to sign-in, flagged with why the last session ended.
    pub fn sign_in_redirect(&self) -> Redirect {
        let reason = match self.store.last_logout() {
            Some(LogoutReason::Expired) => RedirectReason::SessionExpired,
            Some(LogoutReason::Invalidated) => RedirectReason::SessionInvalidated,
            Some(LogoutReason::SignedOut) | None => RedirectReason::NotAuthenticated,
        };
        Redirect::new(&self.sign_in_route, reason)
    }

    fn emit(&self, event: SessionEvent) {
        // No subscribers is fine.
        let _ = self.events.send(event);
    }
}
