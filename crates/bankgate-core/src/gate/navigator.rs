use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use serde::Serialize;
use tokio_util::sync::CancellationToken;

use super::{AuthenticationGate, AuthorizationGate};
use crate::config::Config;
use crate::decision::{Redirect, RedirectReason};
use crate::navigation::RoutePath;
use crate::profile::ProfileStore;

/// Which gates a destination declares.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum GuardKind {
    Public,
    Authenticated,
    /// Authentication, then authorization.
    Authorized,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum NavigationOutcome {
    Admitted { destination: String },
    Redirected { redirect: Redirect },
    /// A newer navigation started before this one was decided.
    Superseded,
}

impl NavigationOutcome {
    pub fn is_admitted(&self) -> bool {
        matches!(self, Self::Admitted { .. })
    }

    pub fn redirect(&self) -> Option<&Redirect> {
        match self {
            Self::Redirected { redirect } => Some(redirect),
            Self::Admitted { .. } | Self::Superseded => None,
        }
    }
}

/// Runs the gate chain for each navigation request.
///
/// Only the latest navigation may produce a decision: starting a new one
/// cancels whatever is still pending, and the cancelled request resolves to
/// [`NavigationOutcome::Superseded`].
#[derive(Debug)]
pub struct Navigator {
    authentication: AuthenticationGate,
    authorization: AuthorizationGate,
    profiles: Arc<ProfileStore>,
    authenticated_only: Vec<RoutePath>,
    profile_editor: RoutePath,
    pending: Mutex<Pending>,
}

#[derive(Debug, Default)]
struct Pending {
    seq: u64,
    token: Option<CancellationToken>,
}

impl Navigator {
    pub fn new(
        authentication: AuthenticationGate,
        authorization: AuthorizationGate,
        profiles: Arc<ProfileStore>,
        config: &Config,
    ) -> Self {
        Self {
            authentication,
            authorization,
            profiles,
            authenticated_only: config.routes.authenticated_only_destinations(),
            profile_editor: RoutePath::parse(&config.routes.profile_editor),
            pending: Mutex::new(Pending::default()),
        }
    }

    pub fn guard_for(&self, path: &RoutePath) -> GuardKind {
        if self.authentication.is_public(path) {
            GuardKind::Public
        } else if self.authenticated_only.contains(path) {
            GuardKind::Authenticated
        } else {
            GuardKind::Authorized
        }
    }

    pub async fn navigate(&self, destination: &str) -> NavigationOutcome {
        let (seq, token) = self.begin();

        let path = RoutePath::parse(destination);
        let outcome = tokio::select! {
            biased;
            () = token.cancelled() => NavigationOutcome::Superseded,
            outcome = self.evaluate(&path, destination) => outcome,
        };
        let outcome = if token.is_cancelled() {
            NavigationOutcome::Superseded
        } else {
            outcome
        };

        self.finish(seq);

        tracing::debug!(%path, ?outcome, "navigation decided");
        outcome
    }

    /// Cancels the pending navigation, if any.
    pub fn cancel_pending(&self) {
        if let Some(token) = self.lock().token.take() {
            token.cancel();
        }
    }

    fn begin(&self) -> (u64, CancellationToken) {
        let token = CancellationToken::new();
        let mut pending = self.lock();
        pending.seq += 1;
        if let Some(previous) = pending.token.replace(token.clone()) {
            previous.cancel();
        }
        (pending.seq, token)
    }

    fn finish(&self, seq: u64) {
        let mut pending = self.lock();
        if pending.seq == seq {
            pending.token = None;
        }
    }

    async fn evaluate(&self, path: &RoutePath, destination: &str) -> NavigationOutcome {
        let guard = self.guard_for(path);
        if guard == GuardKind::Public {
            return admitted(path);
        }

        let decision = self.authentication.check(destination);
        if let Some(redirect) = decision.redirect {
            return NavigationOutcome::Redirected { redirect };
        }

        if guard == GuardKind::Authorized {
            let decision = self.authorization.check(destination).await;
            if let Some(redirect) = decision.redirect {
                return NavigationOutcome::Redirected { redirect };
            }
        }

        if let Some(redirect) = self.onboarding_redirect(path) {
            return NavigationOutcome::Redirected { redirect };
        }
        admitted(path)
    }

    /// Actors still onboarding may only reach the profile editor.
    fn onboarding_redirect(&self, path: &RoutePath) -> Option<Redirect> {
        let profile = self.profiles.profile()?;
        if !profile.needs_onboarding() || path.starts_with(&self.profile_editor) {
            return None;
        }
        Some(Redirect::new(
            self.profile_editor.to_string(),
            RedirectReason::OnboardingIncomplete,
        ))
    }

    fn lock(&self) -> MutexGuard<'_, Pending> {
        self.pending.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

fn admitted(path: &RoutePath) -> NavigationOutcome {
    NavigationOutcome::Admitted {
        destination: path.to_string(),
    }
}
