use std::fmt;

use serde::{Deserialize, Serialize};

/// Server-reported lifecycle state of an actor's profile.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(from = "String", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum OnboardingStatus {
    /// Profile details still have to be submitted.
    #[default]
    PendingDetails,
    /// Details submitted, waiting for a reviewer.
    PendingApproval,
    Active,
    /// Reviewer rejected the submission; details must be resubmitted.
    Rejected,
}

impl OnboardingStatus {
    /// Maps a status string reported by the backend.
    ///
    /// Matching is case-insensitive. `PENDING_REVIEW` is the backend's name for
    /// [`OnboardingStatus::PendingApproval`]. Anything unrecognized falls back to
    /// the most restrictive state, [`OnboardingStatus::PendingDetails`].
    pub fn from_reported(raw: &str) -> Self {
        match raw.trim().to_ascii_uppercase().as_str() {
            "PENDING_APPROVAL" | "PENDING_REVIEW" => Self::PendingApproval,
            "ACTIVE" => Self::Active,
            "REJECTED" => Self::Rejected,
            _ => Self::PendingDetails,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Self::PendingDetails => "PENDING_DETAILS",
            Self::PendingApproval => "PENDING_APPROVAL",
            Self::Active => "ACTIVE",
            Self::Rejected => "REJECTED",
        }
    }

    pub fn all() -> &'static [OnboardingStatus] {
        &[
            Self::PendingDetails,
            Self::PendingApproval,
            Self::Active,
            Self::Rejected,
        ]
    }
}

impl From<String> for OnboardingStatus {
    fn from(value: String) -> Self {
        Self::from_reported(&value)
    }
}

impl fmt::Display for OnboardingStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_from_reported_known_values() {
        assert_eq!(
            OnboardingStatus::from_reported("PENDING_DETAILS"),
            OnboardingStatus::PendingDetails
        );
        assert_eq!(
            OnboardingStatus::from_reported("active"),
            OnboardingStatus::Active
        );
        assert_eq!(
            OnboardingStatus::from_reported("REJECTED"),
            OnboardingStatus::Rejected
        );
    }

    #[test]
    fn test_pending_review_alias() {
        assert_eq!(
            OnboardingStatus::from_reported("PENDING_REVIEW"),
            OnboardingStatus::PendingApproval
        );
    }

    #[test]
    fn test_unknown_status_is_most_restrictive() {
        assert_eq!(
            OnboardingStatus::from_reported("SUSPENDED"),
            OnboardingStatus::PendingDetails
        );
        assert_eq!(
            OnboardingStatus::from_reported(""),
            OnboardingStatus::PendingDetails
        );
    }

    #[test]
    fn test_serde_serializes_screaming_and_parses_leniently() {
        let json = serde_json::to_string(&OnboardingStatus::PendingApproval).unwrap();
        assert_eq!(json, "\"PENDING_APPROVAL\"");
        let status: OnboardingStatus = serde_json::from_str("\"pending_review\"").unwrap();
        assert_eq!(status, OnboardingStatus::PendingApproval);
    }
}
