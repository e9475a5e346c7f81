use std::sync::Arc;

use crate::config::RoutesConfig;
use crate::decision::AccessDecision;
use crate::navigation::RoutePath;
use crate::session::Session;

/// First checkpoint: is there a live session?
#[derive(Debug, Clone)]
pub struct AuthenticationGate {
    session: Arc<Session>,
    public: Vec<RoutePath>,
}

impl AuthenticationGate {
    pub fn new(session: Arc<Session>, routes: &RoutesConfig) -> Self {
        Self {
            session,
            public: routes.public_destinations(),
        }
    }

    pub fn is_public(&self, path: &RoutePath) -> bool {
        self.public.contains(path)
    }

    /// Admits public destinations unconditionally, and anything else only
    /// with an unexpired credential.
    ///
    /// An expired credential is logged out here before the redirect is
    /// produced, exactly as the session clock would.
    pub fn check(&self, destination: &str) -> AccessDecision {
        let path = RoutePath::parse(destination);
        if self.is_public(&path) {
            return AccessDecision::admit();
        }

        if let Some(redirect) = self.session.expire_if_due() {
            tracing::debug!(%path, "expired credential detected at navigation");
            return AccessDecision::redirect(redirect);
        }

        if self.session.credentials().is_authenticated() {
            AccessDecision::admit()
        } else {
            AccessDecision::redirect(self.session.sign_in_redirect())
        }
    }
}
