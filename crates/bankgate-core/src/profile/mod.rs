//! Actor profile state: the onboarding machine, editor policy and the
//! post-login landing decision.

pub mod machine;
mod policy;
mod store;

use std::future::Future;
use std::pin::Pin;

use anyhow::Result;
use bankgate_types::{OnboardingStatus, Role};
pub use machine::Transition;
pub use policy::{EditorPolicy, FieldError, ProfileSubmission, rejection_notice};
use serde::{Deserialize, Serialize};
pub use store::{LoadTicket, ProfileSnapshot, ProfileStore};

use crate::config::Config;
use crate::decision::{Redirect, RedirectReason};
use crate::navigation::RoutePath;

/// What the gates know about the authenticated actor.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ActorProfile {
    pub role: Option<Role>,
    #[serde(rename = "onboardingStatus", default)]
    pub status: OnboardingStatus,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub rejection_reason: Option<String>,
}

impl ActorProfile {
    pub fn new(role: Option<Role>, status: OnboardingStatus) -> Self {
        Self {
            role,
            status,
            rejection_reason: None,
        }
    }

    pub fn is_staff(&self) -> bool {
        self.role.as_ref().is_some_and(Role::is_staff)
    }

    /// Non-staff actors must finish onboarding before using the portal.
    pub fn needs_onboarding(&self) -> bool {
        !self.is_staff()
            && matches!(
                self.status,
                OnboardingStatus::PendingDetails | OnboardingStatus::Rejected
            )
    }

    pub fn editor_policy(&self) -> EditorPolicy {
        EditorPolicy::for_status(self.status)
    }
}

pub type ProfileFuture<'a> = Pin<Box<dyn Future<Output = Result<ActorProfile>> + Send + 'a>>;

/// Fetches the actor's profile from the backend.
pub trait ProfileLoader: Send + Sync {
    fn load_profile(&self) -> ProfileFuture<'_>;
}

/// Where an actor lands right after authenticating.
///
/// Staff go to their home. Actors still onboarding go to the profile editor
/// whatever deep link they asked for. Everyone else gets the deep link when
/// it names a protected destination, otherwise their home.
pub fn landing_destination(
    profile: &ActorProfile,
    requested: Option<&str>,
    config: &Config,
) -> Redirect {
    let home = profile
        .role
        .as_ref()
        .map_or(config.routes.home.as_str(), |role| config.home_for(role));

    if profile.is_staff() {
        return Redirect::plain(home);
    }
    if profile.needs_onboarding() {
        return Redirect::new(
            &config.routes.profile_editor,
            RedirectReason::OnboardingIncomplete,
        );
    }

    let public = config.routes.public_destinations();
    match requested.map(RoutePath::parse) {
        Some(path) if !path.is_root() && !public.contains(&path) => {
            Redirect::plain(path.to_string())
        }
        _ => Redirect::plain(home),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn profile(role: Role, status: OnboardingStatus) -> ActorProfile {
        ActorProfile::new(Some(role), status)
    }

    #[test]
    fn test_active_customer_lands_home() {
        let config = Config::default();
        let landing = landing_destination(
            &profile(Role::CUSTOMER, OnboardingStatus::Active),
            None,
            &config,
        );
        assert_eq!(landing.to_url(), "/dashboard/home");
    }

    #[test]
    fn test_pending_details_ignores_deep_link() {
        let config = Config::default();
        let landing = landing_destination(
            &profile(Role::CUSTOMER, OnboardingStatus::PendingDetails),
            Some("/dashboard/neft"),
            &config,
        );
        assert_eq!(landing.to_url(), "/dashboard/profile?firstLogin=true");
        let rejected = landing_destination(
            &profile(Role::USER, OnboardingStatus::Rejected),
            None,
            &config,
        );
        assert_eq!(rejected.target, "dashboard/profile");
    }

    #[test]
    fn test_deep_link_honored_once_onboarded() {
        let config = Config::default();
        for status in [OnboardingStatus::Active, OnboardingStatus::PendingApproval] {
            let landing = landing_destination(
                &profile(Role::CUSTOMER, status),
                Some("/dashboard/neft?from=mail"),
                &config,
            );
            assert_eq!(landing.to_url(), "/dashboard/neft");
        }
    }

    #[test]
    fn test_public_deep_link_is_ignored() {
        let config = Config::default();
        let landing = landing_destination(
            &profile(Role::CUSTOMER, OnboardingStatus::Active),
            Some("/login"),
            &config,
        );
        assert_eq!(landing.to_url(), "/dashboard/home");
    }

    #[test]
    fn test_staff_land_on_their_home_regardless_of_status() {
        let config = Config::default();
        let admin = landing_destination(
            &profile(Role::ADMIN, OnboardingStatus::PendingDetails),
            Some("/dashboard/neft"),
            &config,
        );
        assert_eq!(admin.to_url(), "/dashboard/admin");
        let accountant = landing_destination(
            &profile(Role::ACCOUNTANT, OnboardingStatus::Active),
            None,
            &config,
        );
        assert_eq!(accountant.to_url(), "/dashboard/transactions/bulk-upload");
    }

    #[test]
    fn test_profile_deserializes_backend_status_aliases() {
        let profile: ActorProfile = serde_json::from_str(
            r#"{"role":"Customer","onboardingStatus":"pending_review","rejectionReason":null}"#,
        )
        .unwrap();
        assert_eq!(profile.role, Some(Role::CUSTOMER));
        assert_eq!(profile.status, OnboardingStatus::PendingApproval);
    }
}
