//! Process-wide wiring of the session, catalog, profile and gate handles.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::{Context, Result};
use tokio::sync::broadcast::error::RecvError;
use tokio_util::sync::CancellationToken;

use crate::backend::{BackendClient, Registration};
use crate::config::{Config, paths};
use crate::decision::Redirect;
use crate::gate::{AuthenticationGate, AuthorizationGate, NavigationOutcome, Navigator};
use crate::navigation::{MenuItem, NavigationCatalog, source};
use crate::profile::{
    ActorProfile, FieldError, ProfileLoader, ProfileStore, ProfileSubmission, Transition,
    landing_destination,
};
use crate::session::{CredentialStore, Session, SessionClock, SessionEvent, SessionFile};

/// Everything a routing surface needs, built once from [`Config`].
///
/// The credential store and the navigation catalog are shared singletons;
/// only the session handle writes the former and only the catalog's own
/// load routine writes the latter.
#[derive(Debug)]
pub struct Portal {
    config: Arc<Config>,
    home: PathBuf,
    session: Arc<Session>,
    clock: SessionClock,
    catalog: Arc<NavigationCatalog>,
    profiles: Arc<ProfileStore>,
    backend: Arc<BackendClient>,
    navigator: Navigator,
    background: CancellationToken,
}

/// Why a profile submission was not sent.
#[derive(Debug, thiserror::Error)]
pub enum SubmitError {
    #[error("profile not loaded")]
    NoProfile,
    #[error("{} field(s) invalid", .0.len())]
    Invalid(Vec<FieldError>),
    #[error(transparent)]
    Backend(#[from] anyhow::Error),
}

impl Portal {
    /// Loads config from the default location and builds the portal.
    ///
    /// # Errors
    /// Returns an error if the config cannot be parsed or is invalid.
    pub fn open() -> Result<Self> {
        let config = Config::load()?;
        Self::from_config(config, &paths::bankgate_home())
    }

    /// # Errors
    /// Returns an error if the API base URL or navigation source is invalid.
    pub fn from_config(config: Config, home: &Path) -> Result<Self> {
        let config = Arc::new(config);

        let store = CredentialStore::open(Box::new(SessionFile::new(home.join("session.json"))));
        let session = Arc::new(Session::new(
            Arc::new(store),
            config.routes.sign_in.clone(),
        ));

        let backend = Arc::new(
            BackendClient::new(&config.api_base_url, Arc::clone(&session))
                .context("Failed to create backend client")?,
        );

        let location = config.navigation.location(home)?;
        let catalog = Arc::new(
            NavigationCatalog::new(source::from_location(location))
                .with_snapshot(config.navigation.cache_path(home)),
        );

        let profiles = Arc::new(ProfileStore::new());
        let authentication = AuthenticationGate::new(Arc::clone(&session), &config.routes);
        let loader: Arc<dyn ProfileLoader> = Arc::clone(&backend) as Arc<dyn ProfileLoader>;
        let authorization = AuthorizationGate::new(
            Arc::clone(&session),
            Arc::clone(&catalog),
            Arc::clone(&profiles),
            Arc::clone(&config),
        )
        .with_loader(loader);
        let navigator = Navigator::new(
            authentication,
            authorization,
            Arc::clone(&profiles),
            &config,
        );
        let clock = SessionClock::new(Arc::clone(&session), config.poll_interval());

        Ok(Self {
            config,
            home: home.to_path_buf(),
            session,
            clock,
            catalog,
            profiles,
            backend,
            navigator,
            background: CancellationToken::new(),
        })
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    pub fn home(&self) -> &Path {
        &self.home
    }

    pub fn session(&self) -> &Arc<Session> {
        &self.session
    }

    pub fn clock(&self) -> &SessionClock {
        &self.clock
    }

    pub fn catalog(&self) -> &Arc<NavigationCatalog> {
        &self.catalog
    }

    pub fn profiles(&self) -> &Arc<ProfileStore> {
        &self.profiles
    }

    pub fn backend(&self) -> &Arc<BackendClient> {
        &self.backend
    }

    pub fn navigator(&self) -> &Navigator {
        &self.navigator
    }

    /// Starts expiry polling and forgets the profile whenever the session
    /// ends. Returns the redirect if the stored session already expired.
    ///
    /// Must be called from within a tokio runtime.
    pub fn start(&self) -> Option<Redirect> {
        let profiles = Arc::clone(&self.profiles);
        let mut events = self.session.subscribe();
        let cancel = self.background.clone();
        tokio::spawn(async move {
            loop {
                let event = tokio::select! {
                    () = cancel.cancelled() => break,
                    event = events.recv() => event,
                };
                match event {
                    Ok(SessionEvent::SignedIn) => {}
                    Ok(_) | Err(RecvError::Lagged(_)) => profiles.reset(),
                    Err(RecvError::Closed) => break,
                }
            }
        });
        self.clock.start()
    }

    pub fn shutdown(&self) {
        self.clock.stop();
        self.navigator.cancel_pending();
        self.background.cancel();
    }

    /// Signs in and returns where to land.
    ///
    /// # Errors
    /// Returns an error if the backend rejects the login.
    pub async fn login(
        &self,
        identifier: &str,
        password: &str,
        requested: Option<&str>,
    ) -> Result<Redirect> {
        let signed_in = self
            .backend
            .login(identifier, password)
            .await
            .context("Login failed")?;
        self.profiles.seed(signed_in.profile.clone());
        Ok(landing_destination(
            &signed_in.profile,
            requested,
            &self.config,
        ))
    }

    /// Creates an account, signs in and returns where to land.
    ///
    /// # Errors
    /// Returns an error if the backend refuses the registration.
    pub async fn register(&self, registration: &Registration) -> Result<Redirect> {
        let signed_in = self
            .backend
            .register(registration)
            .await
            .context("Registration failed")?;
        self.profiles.seed(signed_in.profile.clone());
        Ok(landing_destination(&signed_in.profile, None, &self.config))
    }

    /// Explicit logout. Returns whether a session was present.
    pub fn logout(&self) -> bool {
        self.navigator.cancel_pending();
        let had = self.session.sign_out();
        self.profiles.reset();
        had
    }

    /// Reloads the profile from the backend.
    ///
    /// # Errors
    /// Returns an error if the backend call fails; the error is also
    /// recorded on the profile store.
    pub async fn refresh_profile(&self) -> Result<ActorProfile> {
        let ticket = self.profiles.begin_load();
        match self.backend.fetch_profile().await {
            Ok(profile) => {
                ticket.complete(Ok(profile.clone()));
                Ok(profile)
            }
            Err(err) => {
                let err = anyhow::Error::from(err).context("Failed to load profile");
                ticket.complete(Err(anyhow::anyhow!("{err:#}")));
                Err(err)
            }
        }
    }

    /// Current profile, loading it once if a session exists but no profile
    /// is known yet.
    pub async fn current_profile(&self) -> Option<ActorProfile> {
        if let Some(profile) = self.profiles.profile() {
            return Some(profile);
        }
        if !self.session.credentials().is_authenticated() {
            return None;
        }
        self.refresh_profile().await.ok()
    }

    /// Validates against the current state's editor policy, then submits.
    ///
    /// # Errors
    /// Returns [`SubmitError::Invalid`] with every failing field, or the
    /// backend failure.
    pub async fn submit_profile(
        &self,
        submission: &ProfileSubmission,
    ) -> Result<Transition, SubmitError> {
        let profile = self.current_profile().await.ok_or(SubmitError::NoProfile)?;
        profile
            .editor_policy()
            .validate(submission)
            .map_err(SubmitError::Invalid)?;

        let status = self
            .backend
            .submit_customer_details(submission)
            .await
            .context("Profile submission failed")?;
        self.profiles
            .update_status(status)
            .ok_or(SubmitError::NoProfile)
    }

    pub async fn navigate(&self, destination: &str) -> NavigationOutcome {
        self.navigator.navigate(destination).await
    }

    /// Menu for the current actor; empty without a known role.
    pub async fn menu(&self) -> Vec<MenuItem> {
        let role = self.current_profile().await.and_then(|p| p.role);
        self.catalog.menu_for(role.as_ref()).await
    }

    /// Where the current actor would land after signing in.
    pub async fn landing(&self, requested: Option<&str>) -> Option<Redirect> {
        let profile = self.current_profile().await?;
        Some(landing_destination(&profile, requested, &self.config))
    }
}

impl Drop for Portal {
    fn drop(&mut self) {
        self.background.cancel();
    }
}

#[cfg(test)]
mod tests {
    use std::fs;
    use std::time::Duration;

    use bankgate_types::{OnboardingStatus, ProfileField, Role};
    use serde_json::json;
    use tempfile::TempDir;
    use wiremock::matchers::{method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    use super::*;
    use crate::config::default_navigation_template;
    use crate::decision::RedirectReason;

    fn portal(server: &MockServer) -> (Portal, TempDir) {
        let home = tempfile::tempdir().unwrap();
        fs::write(
            home.path().join("navigation.json"),
            default_navigation_template(),
        )
        .unwrap();
        let config = Config {
            api_base_url: server.uri(),
            session_poll_secs: 1,
            ..Config::default()
        };
        let portal = Portal::from_config(config, home.path()).unwrap();
        (portal, home)
    }

    async fn mount_login(server: &MockServer, body: serde_json::Value) {
        Mock::given(method("POST"))
            .and(path("/auth/login"))
            .respond_with(ResponseTemplate::new(200).set_body_json(body))
            .mount(server)
            .await;
    }

    #[tokio::test]
    async fn test_active_customer_lands_on_home() {
        let server = MockServer::start().await;
        mount_login(
            &server,
            json!({ "token": "tok", "expiresIn": 600_000, "role": "customer", "status": "ACTIVE" }),
        )
        .await;
        let (portal, _home) = portal(&server);

        let landing = portal.login("jane", "pw", None).await.unwrap();
        assert_eq!(landing.to_url(), "/dashboard/home");
        assert!(portal.navigate("/dashboard/neft").await.is_admitted());
    }

    #[tokio::test]
    async fn test_pending_details_lands_on_profile_editor() {
        let server = MockServer::start().await;
        mount_login(
            &server,
            json!({ "token": "tok", "role": "customer", "status": "PENDING_DETAILS" }),
        )
        .await;
        let (portal, _home) = portal(&server);

        let landing = portal
            .login("jane", "pw", Some("/dashboard/upi"))
            .await
            .unwrap();
        assert_eq!(landing.to_url(), "/dashboard/profile?firstLogin=true");
    }

    #[tokio::test]
    async fn test_expiry_during_navigation_redirects_with_flag() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/users/profile"))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_body_json(json!({ "roles": [{ "name": "customer" }], "status": "ACTIVE" }))
                    .set_delay(Duration::from_millis(1_800)),
            )
            .mount(&server)
            .await;
        let (portal, _home) = portal(&server);
        portal
            .session()
            .sign_in("short-lived", Some(Duration::from_millis(300)))
            .unwrap();
        let mut events = portal.session().subscribe();
        assert_eq!(portal.start(), None);

        let outcome = portal.navigate("/dashboard/neft").await;
        let redirect = outcome.redirect().unwrap();
        assert_eq!(redirect.reason, Some(RedirectReason::SessionExpired));
        assert_eq!(redirect.to_url(), "/login?sessionExpired=true");
        assert!(!portal.session().credentials().has_token());
        // The load still in flight completes after expiry and is dropped.
        let settled = portal.profiles().settled(Duration::from_secs(5)).await;
        assert!(settled.is_some_and(|s| s.in_flight == 0));
        assert_eq!(portal.profiles().role(), None);

        let mut expired = 0;
        while let Ok(event) = events.try_recv() {
            if matches!(event, SessionEvent::Expired { .. }) {
                expired += 1;
            }
        }
        assert_eq!(expired, 1);
        portal.shutdown();
    }

    #[tokio::test]
    async fn test_server_invalidation_ends_session() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/users/profile"))
            .respond_with(ResponseTemplate::new(401))
            .mount(&server)
            .await;
        let (portal, _home) = portal(&server);
        portal.session().sign_in("revoked", None).unwrap();

        assert!(portal.refresh_profile().await.is_err());
        let outcome = portal.navigate("/dashboard/neft").await;
        assert_eq!(
            outcome.redirect().unwrap().to_url(),
            "/login?sessionInvalidated=true"
        );
    }

    #[tokio::test]
    async fn test_session_survives_restart() {
        let server = MockServer::start().await;
        let (portal, home) = portal(&server);
        portal
            .session()
            .sign_in("kept", Some(Duration::from_secs(600)))
            .unwrap();
        drop(portal);

        let config = Config {
            api_base_url: server.uri(),
            ..Config::default()
        };
        let reopened = Portal::from_config(config, home.path()).unwrap();
        assert_eq!(
            reopened.session().credentials().token().as_deref(),
            Some("kept")
        );
        assert!(reopened.logout());
        assert!(!home.path().join("session.json").exists());
    }

    #[tokio::test]
    async fn test_menu_follows_loaded_role() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/users/profile"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "roles": [{ "name": "accountant" }],
                "status": "ACTIVE"
            })))
            .mount(&server)
            .await;
        let (portal, _home) = portal(&server);
        assert!(portal.menu().await.is_empty());

        portal.session().sign_in("tok", None).unwrap();
        let menu = portal.menu().await;
        let ids: Vec<&str> = menu
            .iter()
            .flat_map(|item| item.children.iter())
            .map(|item| item.id.as_str())
            .collect();
        assert!(ids.contains(&"bulk-upload"));
        assert!(!ids.contains(&"neft"));
        assert_eq!(portal.profiles().role(), Some(Role::ACCOUNTANT));
    }

    #[tokio::test]
    async fn test_submit_profile_validates_before_sending() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/users/customer-details"))
            .respond_with(
                ResponseTemplate::new(200).set_body_json(json!({ "userStatus": "PENDING_APPROVAL" })),
            )
            .expect(1)
            .mount(&server)
            .await;
        let (portal, _home) = portal(&server);
        portal.session().sign_in("tok", None).unwrap();
        portal.profiles().seed(ActorProfile::new(
            Some(Role::CUSTOMER),
            OnboardingStatus::PendingDetails,
        ));

        let err = portal
            .submit_profile(&ProfileSubmission::new())
            .await
            .unwrap_err();
        assert!(matches!(err, SubmitError::Invalid(ref errors) if !errors.is_empty()));

        let complete = [
            ProfileField::FirstName,
            ProfileField::LastName,
            ProfileField::Mobile,
            ProfileField::Address,
            ProfileField::City,
            ProfileField::State,
            ProfileField::NationalId,
            ProfileField::DateOfBirth,
            ProfileField::Occupation,
        ]
        .into_iter()
        .fold(ProfileSubmission::new(), |s, f| s.with(f, "x"))
        .with(ProfileField::Email, "jane@example.com");

        let transition = portal.submit_profile(&complete).await.unwrap();
        assert_eq!(transition.to, OnboardingStatus::PendingApproval);
        assert!(transition.is_expected());
    }
}
