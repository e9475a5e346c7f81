//! Identity/profile backend client.
//!
//! Every authenticated call sends the stored bearer token. A 401 response
//! ends the session exactly like expiry does, with its own redirect reason.

use std::sync::Arc;
use std::time::Duration;

use bankgate_types::{OnboardingStatus, Role};
use reqwest::StatusCode;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use url::Url;

use crate::profile::{ActorProfile, ProfileFuture, ProfileLoader, ProfileSubmission};
use crate::session::{Credential, Session};

pub const USER_AGENT: &str = concat!("bankgate/", env!("CARGO_PKG_VERSION"));

const REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

#[derive(Debug, thiserror::Error)]
pub enum BackendError {
    #[error("not signed in")]
    NotSignedIn,
    #[error("session rejected by backend (HTTP 401)")]
    Unauthorized,
    #[error("backend returned HTTP {status}: {body}")]
    Status { status: u16, body: String },
    #[error("request failed: {0}")]
    Transport(#[from] reqwest::Error),
    #[error("unexpected response: {0}")]
    Decode(String),
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct LoginRequest<'a> {
    username_or_email_or_mobile: &'a str,
    password: &'a str,
}

/// Fields of a new account.
#[derive(Debug, Clone, Serialize)]
pub struct Registration {
    pub username: String,
    pub email: String,
    pub mobile: String,
    pub password: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct RoleEntry {
    name: String,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
struct UserPayload {
    role: Option<String>,
    #[serde(default)]
    roles: Vec<RoleEntry>,
    status: Option<String>,
    rejection_reason: Option<String>,
    customer: Option<CustomerPayload>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
struct CustomerPayload {
    status: Option<String>,
    rejection_reason: Option<String>,
}

impl UserPayload {
    /// Role name: first entry of `roles`, else `role`.
    fn role(&self) -> Option<Role> {
        self.roles
            .first()
            .map(|r| r.name.as_str())
            .or(self.role.as_deref())
            .and_then(Role::parse)
    }

    fn status(&self) -> Option<&str> {
        self.status
            .as_deref()
            .or_else(|| self.customer.as_ref()?.status.as_deref())
    }

    fn into_profile(self, default_role: Option<Role>) -> ActorProfile {
        let role = self.role().or(default_role);
        let status = self
            .status()
            .map(OnboardingStatus::from_reported)
            .unwrap_or_default();
        let rejection_reason = self
            .rejection_reason
            .or_else(|| self.customer.and_then(|c| c.rejection_reason));
        ActorProfile {
            role,
            status,
            rejection_reason,
        }
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct AuthResponse {
    token: String,
    /// Token lifetime in milliseconds.
    expires_in: Option<u64>,
    #[serde(flatten)]
    top: UserPayload,
    user: Option<UserPayload>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct SubmitResponse {
    user_status: Option<String>,
    status: Option<String>,
}

/// Result of a successful login or registration.
#[derive(Debug, Clone)]
pub struct SignedIn {
    pub credential: Credential,
    pub profile: ActorProfile,
}

#[derive(Debug, Clone)]
pub struct BackendClient {
    http: reqwest::Client,
    base_url: String,
    session: Arc<Session>,
}

impl BackendClient {
    /// # Errors
    /// Returns an error if `base_url` is not a valid URL or the HTTP client
    /// cannot be built.
    pub fn new(base_url: &str, session: Arc<Session>) -> anyhow::Result<Self> {
        use anyhow::Context;

        Url::parse(base_url).with_context(|| format!("Invalid API base URL: {base_url}"))?;
        let http = reqwest::Client::builder()
            .user_agent(USER_AGENT)
            .timeout(REQUEST_TIMEOUT)
            .build()
            .context("Failed to build HTTP client")?;
        Ok(Self {
            http,
            base_url: base_url.trim_end_matches('/').to_string(),
            session,
        })
    }

    pub fn session(&self) -> &Arc<Session> {
        &self.session
    }

    /// `POST /auth/login`. Stores the returned credential.
    ///
    /// # Errors
    /// Returns an error if the request fails or credentials are rejected.
    pub async fn login(&self, identifier: &str, password: &str) -> Result<SignedIn, BackendError> {
        let body = LoginRequest {
            username_or_email_or_mobile: identifier,
            password,
        };
        let response: AuthResponse = self.post_public("auth/login", &body).await?;
        Ok(self.establish(response, None))
    }

    /// `POST /auth/register`. New accounts start as customers with details
    /// pending unless the backend says otherwise.
    ///
    /// # Errors
    /// Returns an error if the request fails or registration is refused.
    pub async fn register(&self, registration: &Registration) -> Result<SignedIn, BackendError> {
        let response: AuthResponse = self.post_public("auth/register", registration).await?;
        Ok(self.establish(response, Some(Role::CUSTOMER)))
    }

    /// `GET /users/profile`.
    ///
    /// # Errors
    /// Returns [`BackendError::NotSignedIn`] without a credential and
    /// [`BackendError::Unauthorized`] (after ending the session) on 401.
    pub async fn fetch_profile(&self) -> Result<ActorProfile, BackendError> {
        let token = self.token()?;
        let request = self.http.get(self.endpoint("users/profile")).bearer_auth(token);
        let payload: UserPayload = self.send(request).await?;
        Ok(payload.into_profile(Some(Role::CUSTOMER)))
    }

    /// `POST /users/customer-details`. Returns the resulting status.
    ///
    /// # Errors
    /// Same as [`fetch_profile`](Self::fetch_profile).
    pub async fn submit_customer_details(
        &self,
        submission: &ProfileSubmission,
    ) -> Result<OnboardingStatus, BackendError> {
        let token = self.token()?;
        let request = self
            .http
            .post(self.endpoint("users/customer-details"))
            .bearer_auth(token)
            .json(submission);
        let response: SubmitResponse = self.send(request).await?;
        let status = response
            .user_status
            .or(response.status)
            .ok_or_else(|| BackendError::Decode("missing userStatus".to_string()))?;
        Ok(OnboardingStatus::from_reported(&status))
    }

    fn establish(&self, response: AuthResponse, default_role: Option<Role>) -> SignedIn {
        let expires_in = response
            .expires_in
            .filter(|ms| *ms > 0)
            .map(Duration::from_millis);
        let credential = match self.session.sign_in(&response.token, expires_in) {
            Ok(credential) => credential,
            Err(err) => {
                tracing::warn!("session kept in memory only: {err:#}");
                self.session
                    .credentials()
                    .get()
                    .unwrap_or_else(|| Credential::new(response.token.clone(), None))
            }
        };

        let payload = match response.user {
            Some(mut user) => {
                user.role = user.role.or(response.top.role);
                user.status = user.status.or(response.top.status);
                user
            }
            None => response.top,
        };
        SignedIn {
            credential,
            profile: payload.into_profile(default_role),
        }
    }

    fn token(&self) -> Result<String, BackendError> {
        self.session
            .credentials()
            .token()
            .ok_or(BackendError::NotSignedIn)
    }

    fn endpoint(&self, path: &str) -> String {
        format!("{}/{path}", self.base_url)
    }

    async fn post_public<B, T>(&self, path: &str, body: &B) -> Result<T, BackendError>
    where
        B: Serialize + ?Sized,
        T: DeserializeOwned,
    {
        let request = self.http.post(self.endpoint(path)).json(body);
        self.send(request).await
    }

    async fn send<T: DeserializeOwned>(
        &self,
        request: reqwest::RequestBuilder,
    ) -> Result<T, BackendError> {
        let response = request.send().await?;
        let status = response.status();

        if status == StatusCode::UNAUTHORIZED {
            if self.session.invalidate().is_some() {
                tracing::warn!("backend rejected the session token");
            }
            return Err(BackendError::Unauthorized);
        }
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(BackendError::Status {
                status: status.as_u16(),
                body,
            });
        }

        let bytes = response.bytes().await?;
        serde_json::from_slice(&bytes).map_err(|e| BackendError::Decode(e.to_string()))
    }
}

impl ProfileLoader for BackendClient {
    fn load_profile(&self) -> ProfileFuture<'_> {
        Box::pin(async move { self.fetch_profile().await.map_err(anyhow::Error::from) })
    }
}
