use std::sync::Arc;
use std::time::Duration;

use anyhow::Result;
use bankgate_types::{OnboardingStatus, Role};
use tokio::sync::watch;

use super::ActorProfile;
use super::machine::{self, Transition};

/// Published profile state.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ProfileSnapshot {
    pub profile: Option<ActorProfile>,
    /// Profile loads started but not yet completed.
    pub in_flight: usize,
    /// Bumped on every completed load, seed or reset.
    pub generation: u64,
    /// Bumped on every reset. Loads started under an older epoch are
    /// discarded when they complete.
    pub epoch: u64,
    pub last_error: Option<String>,
}

impl ProfileSnapshot {
    pub fn role(&self) -> Option<&Role> {
        self.profile.as_ref().and_then(|p| p.role.as_ref())
    }

    pub fn is_settled(&self) -> bool {
        self.in_flight == 0
    }
}

/// Current actor profile, shared between the profile flows (writers) and the
/// authorization gate (reader).
///
/// Changes are published on a watch channel, so readers always see the most
/// recently completed load.
#[derive(Debug)]
pub struct ProfileStore {
    tx: watch::Sender<ProfileSnapshot>,
}

impl Default for ProfileStore {
    fn default() -> Self {
        Self::new()
    }
}

impl ProfileStore {
    pub fn new() -> Self {
        let (tx, _) = watch::channel(ProfileSnapshot::default());
        Self { tx }
    }

    pub fn snapshot(&self) -> ProfileSnapshot {
        self.tx.borrow().clone()
    }

    pub fn subscribe(&self) -> watch::Receiver<ProfileSnapshot> {
        self.tx.subscribe()
    }

    pub fn profile(&self) -> Option<ActorProfile> {
        self.tx.borrow().profile.clone()
    }

    pub fn role(&self) -> Option<Role> {
        self.tx.borrow().role().cloned()
    }

    /// Marks a load as started. The returned ticket must be completed with
    /// the load's result; dropping it counts as an abandoned load.
    pub fn begin_load(self: &Arc<Self>) -> LoadTicket {
        let mut epoch = 0;
        self.tx.send_modify(|s| {
            s.in_flight += 1;
            epoch = s.epoch;
        });
        self.ticket(epoch)
    }

    /// Starts a load only when no role is known and no load is in flight.
    ///
    /// A profile seeded without a role still counts as unknown. The check
    /// and the increment are one atomic update, so concurrent callers start
    /// at most one load.
    pub fn begin_initial_load(self: &Arc<Self>) -> Option<LoadTicket> {
        let mut epoch = 0;
        let started = self.tx.send_if_modified(|s| {
            if s.role().is_some() || s.in_flight > 0 {
                return false;
            }
            s.in_flight += 1;
            epoch = s.epoch;
            true
        });
        started.then(|| self.ticket(epoch))
    }

    fn ticket(self: &Arc<Self>, epoch: u64) -> LoadTicket {
        LoadTicket {
            store: Arc::clone(self),
            epoch,
            done: false,
        }
    }

    /// Replaces the profile directly, e.g. from a login response.
    pub fn seed(&self, profile: ActorProfile) -> Transition {
        let mut transition = Transition {
            from: None,
            to: profile.status,
        };
        self.tx.send_modify(|s| transition = apply(s, profile));
        transition
    }

    /// Records a new onboarding status after a profile submission.
    pub fn update_status(&self, status: OnboardingStatus) -> Option<Transition> {
        let mut transition = None;
        self.tx.send_if_modified(|s| {
            let Some(mut profile) = s.profile.clone() else {
                return false;
            };
            profile.status = status;
            transition = Some(apply(s, profile));
            true
        });
        transition
    }

    /// Forgets the profile after the session ends. Loads still in flight
    /// keep their slot but their results are dropped.
    pub fn reset(&self) {
        self.tx.send_modify(|s| {
            s.profile = None;
            s.last_error = None;
            s.generation += 1;
            s.epoch += 1;
        });
    }

    /// Waits until no load is in flight and returns that snapshot, or `None`
    /// if `timeout` elapses first.
    pub async fn settled(&self, timeout: Duration) -> Option<ProfileSnapshot> {
        let mut rx = self.tx.subscribe();
        match tokio::time::timeout(timeout, rx.wait_for(ProfileSnapshot::is_settled)).await {
            Ok(Ok(snapshot)) => Some(snapshot.clone()),
            Ok(Err(_)) | Err(_) => None,
        }
    }

    fn finish(&self, epoch: u64, result: Option<Result<ActorProfile>>) {
        self.tx.send_modify(|s| {
            s.in_flight = s.in_flight.saturating_sub(1);
            if epoch != s.epoch {
                tracing::debug!(
                    epoch,
                    current = s.epoch,
                    "discarding profile load from ended session"
                );
                return;
            }
            match result {
                Some(Ok(profile)) => {
                    apply(s, profile);
                    s.last_error = None;
                }
                Some(Err(err)) => {
                    tracing::warn!("profile load failed: {err:#}");
                    s.last_error = Some(format!("{err:#}"));
                    s.generation += 1;
                }
                None => tracing::debug!("profile load abandoned"),
            }
        });
    }
}

fn apply(snapshot: &mut ProfileSnapshot, profile: ActorProfile) -> Transition {
    let previous = snapshot.profile.as_ref().map(|p| p.status);
    let transition = machine::transition(previous, profile.status);
    snapshot.profile = Some(profile);
    snapshot.generation += 1;
    transition
}

/// An in-flight profile load.
#[derive(Debug)]
pub struct LoadTicket {
    store: Arc<ProfileStore>,
    epoch: u64,
    done: bool,
}

impl LoadTicket {
    pub fn complete(mut self, result: Result<ActorProfile>) {
        self.done = true;
        self.store.finish(self.epoch, Some(result));
    }
}

impl Drop for LoadTicket {
    fn drop(&mut self) {
        if !self.done {
            self.store.finish(self.epoch, None);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn customer(status: OnboardingStatus) -> ActorProfile {
        ActorProfile::new(Some(Role::CUSTOMER), status)
    }

    #[test]
    fn test_role_absent_until_loaded() {
        let store = ProfileStore::new();
        assert_eq!(store.role(), None);
        store.seed(customer(OnboardingStatus::Active));
        assert_eq!(store.role(), Some(Role::CUSTOMER));
        store.reset();
        assert_eq!(store.role(), None);
    }

    #[tokio::test]
    async fn test_settled_waits_for_in_flight_load() {
        let store = Arc::new(ProfileStore::new());
        let ticket = store.begin_load();

        let waiter = {
            let store = Arc::clone(&store);
            tokio::spawn(async move { store.settled(Duration::from_secs(5)).await })
        };
        tokio::task::yield_now().await;
        ticket.complete(Ok(customer(OnboardingStatus::PendingApproval)));

        let snapshot = waiter.await.unwrap().unwrap();
        assert_eq!(snapshot.role(), Some(&Role::CUSTOMER));
        assert!(snapshot.is_settled());
    }

    #[tokio::test]
    async fn test_latest_completed_load_wins() {
        let store = Arc::new(ProfileStore::new());
        store.seed(customer(OnboardingStatus::PendingDetails));

        let first = store.begin_load();
        let second = store.begin_load();
        second.complete(Ok(customer(OnboardingStatus::PendingApproval)));
        first.complete(Ok(ActorProfile::new(
            Some(Role::ADMIN),
            OnboardingStatus::Active,
        )));

        let snapshot = store.settled(Duration::from_secs(1)).await.unwrap();
        assert_eq!(snapshot.role(), Some(&Role::ADMIN));
    }

    #[tokio::test(start_paused = true)]
    async fn test_settled_times_out() {
        let store = Arc::new(ProfileStore::new());
        let _ticket = store.begin_load();
        assert_eq!(store.settled(Duration::from_secs(3)).await, None);
    }

    #[tokio::test]
    async fn test_failed_load_records_error_and_keeps_profile() {
        let store = Arc::new(ProfileStore::new());
        store.seed(customer(OnboardingStatus::Active));
        store
            .begin_load()
            .complete(Err(anyhow::anyhow!("backend unavailable")));

        let snapshot = store.settled(Duration::from_secs(1)).await.unwrap();
        assert_eq!(snapshot.last_error.as_deref(), Some("backend unavailable"));
        assert_eq!(snapshot.role(), Some(&Role::CUSTOMER));
    }

    #[test]
    fn test_initial_load_started_once() {
        let store = Arc::new(ProfileStore::new());
        let ticket = store.begin_initial_load().unwrap();
        assert!(store.begin_initial_load().is_none());
        ticket.complete(Ok(customer(OnboardingStatus::Active)));
        assert!(store.begin_initial_load().is_none());
    }

    #[tokio::test]
    async fn test_load_from_ended_session_is_discarded() {
        let store = Arc::new(ProfileStore::new());
        let stale = store.begin_load();
        store.reset();
        store.seed(customer(OnboardingStatus::Active));

        stale.complete(Ok(ActorProfile::new(
            Some(Role::ADMIN),
            OnboardingStatus::Active,
        )));

        let snapshot = store.settled(Duration::from_secs(1)).await.unwrap();
        assert_eq!(snapshot.role(), Some(&Role::CUSTOMER));
        assert_eq!(snapshot.in_flight, 0);
    }

    #[test]
    fn test_stale_failure_does_not_record_error() {
        let store = Arc::new(ProfileStore::new());
        let stale = store.begin_load();
        store.reset();
        stale.complete(Err(anyhow::anyhow!("401")));
        let snapshot = store.snapshot();
        assert_eq!(snapshot.last_error, None);
        assert!(snapshot.is_settled());
    }

    #[test]
    fn test_initial_load_starts_for_profile_without_role() {
        let store = Arc::new(ProfileStore::new());
        store.seed(ActorProfile::new(None, OnboardingStatus::Active));
        let ticket = store.begin_initial_load().unwrap();
        ticket.complete(Ok(customer(OnboardingStatus::Active)));
        assert_eq!(store.role(), Some(Role::CUSTOMER));
        assert!(store.begin_initial_load().is_none());
    }

    #[test]
    fn test_dropped_ticket_releases_in_flight() {
        let store = Arc::new(ProfileStore::new());
        drop(store.begin_load());
        assert!(store.snapshot().is_settled());
    }

    #[test]
    fn test_update_status_reports_transition() {
        let store = ProfileStore::new();
        assert_eq!(store.update_status(OnboardingStatus::Active), None);

        store.seed(customer(OnboardingStatus::PendingDetails));
        let transition = store
            .update_status(OnboardingStatus::PendingApproval)
            .unwrap();
        assert!(transition.is_expected());
        assert_eq!(
            store.profile().unwrap().status,
            OnboardingStatus::PendingApproval
        );
    }
}
