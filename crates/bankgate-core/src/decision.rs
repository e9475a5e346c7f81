//! Gate outcomes.

use std::fmt;

use serde::Serialize;

/// Why an actor was sent somewhere other than the requested destination.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum RedirectReason {
    NotAuthenticated,
    SessionExpired,
    /// The backend rejected the credential (e.g. HTTP 401).
    SessionInvalidated,
    Forbidden,
    RoleUnavailable,
    OnboardingIncomplete,
}

impl RedirectReason {
    /// Query flag the sign-in and profile views read to pick their message.
    pub fn query_flag(self) -> Option<&'static str> {
        match self {
            Self::SessionExpired => Some("sessionExpired=true"),
            Self::SessionInvalidated => Some("sessionInvalidated=true"),
            Self::OnboardingIncomplete => Some("firstLogin=true"),
            Self::NotAuthenticated | Self::Forbidden | Self::RoleUnavailable => None,
        }
    }

    pub fn message(self) -> &'static str {
        match self {
            Self::NotAuthenticated => "Please sign in to continue.",
            Self::SessionExpired => "Your session has expired. Please login again.",
            Self::SessionInvalidated => "Your session is no longer valid. Please login again.",
            Self::Forbidden => "You do not have access to that area.",
            Self::RoleUnavailable => "Your profile could not be loaded.",
            Self::OnboardingIncomplete => "Please complete your profile to continue.",
        }
    }
}

/// Destination to navigate to instead.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Redirect {
    /// Normalized destination, without a leading separator.
    pub target: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reason: Option<RedirectReason>,
}

impl Redirect {
    pub fn new(target: impl Into<String>, reason: RedirectReason) -> Self {
        Self {
            target: target.into(),
            reason: Some(reason),
        }
    }

    /// Redirect without a reason flag, e.g. a post-login landing.
    pub fn plain(target: impl Into<String>) -> Self {
        Self {
            target: target.into(),
            reason: None,
        }
    }

    /// Absolute URL form, e.g. `/login?sessionExpired=true`.
    pub fn to_url(&self) -> String {
        let target = self.target.trim_start_matches('/');
        match self.reason.and_then(RedirectReason::query_flag) {
            Some(flag) => format!("/{target}?{flag}"),
            None => format!("/{target}"),
        }
    }
}

impl fmt::Display for Redirect {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_url())
    }
}

/// Result of one gate evaluation. Never persisted.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AccessDecision {
    pub admitted: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub redirect: Option<Redirect>,
}

impl AccessDecision {
    pub fn admit() -> Self {
        Self {
            admitted: true,
            redirect: None,
        }
    }

    pub fn redirect(redirect: Redirect) -> Self {
        Self {
            admitted: false,
            redirect: Some(redirect),
        }
    }

    pub fn is_admitted(&self) -> bool {
        self.admitted
    }

    pub fn reason(&self) -> Option<RedirectReason> {
        self.redirect.as_ref().and_then(|r| r.reason)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_redirect_url_carries_expiry_flag() {
        let redirect = Redirect::new("login", RedirectReason::SessionExpired);
        assert_eq!(redirect.to_url(), "/login?sessionExpired=true");
        let plain = Redirect::new("/login", RedirectReason::NotAuthenticated);
        assert_eq!(plain.to_url(), "/login");
    }

    #[test]
    fn test_decision_constructors() {
        assert!(AccessDecision::admit().is_admitted());
        let denied = AccessDecision::redirect(Redirect::new("dashboard/home", RedirectReason::Forbidden));
        assert!(!denied.is_admitted());
        assert_eq!(denied.reason(), Some(RedirectReason::Forbidden));
    }
}
