use std::fmt;
use std::sync::Arc;

use bankgate_types::Role;

use crate::config::Config;
use crate::decision::{AccessDecision, Redirect, RedirectReason};
use crate::navigation::{NavigationCatalog, RoutePath};
use crate::profile::{ProfileLoader, ProfileStore};
use crate::session::Session;

/// Second checkpoint: may this role enter the destination?
///
/// Never trusts the authentication gate's earlier verdict; the credential
/// is re-read before and after the role lookup, which is the only point
/// where this gate suspends.
pub struct AuthorizationGate {
    session: Arc<Session>,
    catalog: Arc<NavigationCatalog>,
    profiles: Arc<ProfileStore>,
    loader: Option<Arc<dyn ProfileLoader>>,
    config: Arc<Config>,
    public: Vec<RoutePath>,
}

impl fmt::Debug for AuthorizationGate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AuthorizationGate")
            .field("catalog", &self.catalog)
            .field("has_loader", &self.loader.is_some())
            .finish_non_exhaustive()
    }
}

impl AuthorizationGate {
    pub fn new(
        session: Arc<Session>,
        catalog: Arc<NavigationCatalog>,
        profiles: Arc<ProfileStore>,
        config: Arc<Config>,
    ) -> Self {
        let public = config.routes.public_destinations();
        Self {
            session,
            catalog,
            profiles,
            loader: None,
            config,
            public,
        }
    }

    /// Lets the gate start the first profile load itself when none is known.
    #[must_use]
    pub fn with_loader(mut self, loader: Arc<dyn ProfileLoader>) -> Self {
        self.loader = Some(loader);
        self
    }

    pub async fn check(&self, destination: &str) -> AccessDecision {
        let path = RoutePath::parse(destination);
        if self.public.contains(&path) {
            return AccessDecision::admit();
        }
        if let Some(denied) = self.require_session() {
            return denied;
        }

        let role = self.resolve_role().await;
        let admitted = match &role {
            Some(role) => self.catalog.can_access(destination, Some(role)).await,
            None => false,
        };

        // The session may have ended while waiting.
        if let Some(denied) = self.require_session() {
            return denied;
        }

        let Some(role) = role else {
            tracing::debug!(%path, "no role available; redirecting to fallback");
            return AccessDecision::redirect(Redirect::new(
                &self.config.routes.fallback,
                RedirectReason::RoleUnavailable,
            ));
        };

        if admitted {
            tracing::debug!(%path, role = %role, "authorized");
            return AccessDecision::admit();
        }

        let home = RoutePath::parse(self.config.home_for(&role));
        let target = if home == path {
            RoutePath::parse(&self.config.routes.fallback)
        } else {
            home
        };
        tracing::debug!(%path, role = %role, %target, "forbidden");
        AccessDecision::redirect(Redirect::new(target.to_string(), RedirectReason::Forbidden))
    }

    fn require_session(&self) -> Option<AccessDecision> {
        if let Some(redirect) = self.session.expire_if_due() {
            return Some(AccessDecision::redirect(redirect));
        }
        if self.session.credentials().is_authenticated() {
            None
        } else {
            Some(AccessDecision::redirect(self.session.sign_in_redirect()))
        }
    }

    /// Waits once for the profile store to settle and takes the role from
    /// the most recently completed load.
    async fn resolve_role(&self) -> Option<Role> {
        if let Some(loader) = &self.loader
            && let Some(ticket) = self.profiles.begin_initial_load()
        {
            let loader = Arc::clone(loader);
            tokio::spawn(async move {
                let result = loader.load_profile().await;
                ticket.complete(result);
            });
        }

        let timeout = self.config.role_lookup_timeout();
        let Some(snapshot) = self.profiles.settled(timeout).await else {
            tracing::warn!(
                timeout_secs = timeout.as_secs(),
                "timed out waiting for actor role"
            );
            return None;
        };
        if snapshot.role().is_none()
            && let Some(err) = &snapshot.last_error
        {
            tracing::warn!("role unavailable after failed profile load: {err}");
        }
        snapshot.role().cloned()
    }
}
