use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use tokio::time::{Instant, MissedTickBehavior};
use tokio_util::sync::CancellationToken;

use super::Session;
use crate::decision::Redirect;

pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_secs(10);

/// Periodic expiry check for the current session.
///
/// Expiry detection goes through [`Session::expire_if_due`], so the expired
/// event fires once per expiry no matter how many ticks (or gates) observe
/// it afterwards.
#[derive(Debug)]
pub struct SessionClock {
    session: Arc<Session>,
    interval: Duration,
    running: Mutex<Option<CancellationToken>>,
}

impl SessionClock {
    pub fn new(session: Arc<Session>, interval: Duration) -> Self {
        Self {
            session,
            interval: interval.max(Duration::from_millis(1)),
            running: Mutex::new(None),
        }
    }

    pub fn interval(&self) -> Duration {
        self.interval
    }

    /// Checks immediately, then keeps polling on the interval until
    /// [`stop`](Self::stop). Restarts polling if already running.
    ///
    /// Must be called from within a tokio runtime.
    pub fn start(&self) -> Option<Redirect> {
        let token = CancellationToken::new();
        if let Some(previous) = self.lock().replace(token.clone()) {
            previous.cancel();
        }

        let immediate = self.check();

        let session = Arc::clone(&self.session);
        let interval = self.interval;
        tokio::spawn(async move {
            let mut ticker = tokio::time::interval_at(Instant::now() + interval, interval);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
            loop {
                tokio::select! {
                    () = token.cancelled() => break,
                    _ = ticker.tick() => {
                        if let Some(redirect) = session.expire_if_due() {
                            tracing::debug!(%redirect, "expiry detected by session clock");
                        }
                    }
                }
            }
            tracing::debug!("session clock stopped");
        });

        immediate
    }

    pub fn stop(&self) {
        if let Some(token) = self.lock().take() {
            token.cancel();
        }
    }

    pub fn is_running(&self) -> bool {
        self.lock().as_ref().is_some_and(|t| !t.is_cancelled())
    }

    /// Pure query: no token counts as expired, a token without expiry never
    /// does.
    pub fn is_expired(&self) -> bool {
        self.session.credentials().is_expired()
    }

    /// Runs one expiry check, forcing a logout if due.
    pub fn check(&self) -> Option<Redirect> {
        self.session.expire_if_due()
    }

    fn lock(&self) -> MutexGuard<'_, Option<CancellationToken>> {
        self.running.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl Drop for SessionClock {
    fn drop(&mut self) {
        self.stop();
    }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicU64, Ordering};

    use super::*;
    use crate::session::{CredentialStore, SessionEvent};

    fn session_with_clock() -> (Arc<Session>, Arc<AtomicU64>) {
        let now = Arc::new(AtomicU64::new(0));
        let handle = Arc::clone(&now);
        let store = CredentialStore::ephemeral()
            .with_time_source(Arc::new(move || handle.load(Ordering::SeqCst)));
        (Arc::new(Session::new(Arc::new(store), "login")), now)
    }

    #[tokio::test(start_paused = true)]
    async fn test_start_performs_immediate_check() {
        let (session, now) = session_with_clock();
        session
            .sign_in("tok", Some(Duration::from_millis(10)))
            .unwrap();
        now.store(20, Ordering::SeqCst);

        let clock = SessionClock::new(Arc::clone(&session), Duration::from_secs(10));
        let redirect = clock.start().unwrap();
        assert_eq!(redirect.to_url(), "/login?sessionExpired=true");
        assert!(!session.credentials().has_token());
        clock.stop();
    }

    #[tokio::test(start_paused = true)]
    async fn test_poll_fires_expired_exactly_once() {
        let (session, now) = session_with_clock();
        session
            .sign_in("tok", Some(Duration::from_secs(15)))
            .unwrap();
        let mut events = session.subscribe();

        let clock = SessionClock::new(Arc::clone(&session), Duration::from_secs(10));
        assert_eq!(clock.start(), None);
        assert!(clock.is_running());

        now.store(16_000, Ordering::SeqCst);
        for _ in 0..4 {
            tokio::time::sleep(Duration::from_secs(10)).await;
        }

        assert!(matches!(
            events.try_recv().unwrap(),
            SessionEvent::Expired { .. }
        ));
        assert!(events.try_recv().is_err());
        assert!(clock.is_expired());
        clock.stop();
        assert!(!clock.is_running());
    }

    #[tokio::test(start_paused = true)]
    async fn test_stopped_clock_does_not_expire() {
        let (session, now) = session_with_clock();
        session.sign_in("tok", Some(Duration::from_secs(5))).unwrap();

        let clock = SessionClock::new(Arc::clone(&session), Duration::from_secs(10));
        clock.start();
        clock.stop();

        now.store(60_000, Ordering::SeqCst);
        tokio::time::sleep(Duration::from_secs(30)).await;
        assert!(session.credentials().has_token());
        assert!(clock.is_expired());
    }

    #[test]
    fn test_missing_expiry_is_not_expired() {
        let (session, now) = session_with_clock();
        session.sign_in("tok", None).unwrap();
        now.store(u64::MAX, Ordering::SeqCst);
        let clock = SessionClock::new(session, DEFAULT_POLL_INTERVAL);
        assert!(!clock.is_expired());
        assert_eq!(clock.check(), None);
    }
}
