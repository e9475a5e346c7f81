//! Onboarding state machine.
//!
//! The backend owns the status; this side only classifies each reported
//! change. Every reported status is accepted, because the server is the
//! authority, but changes outside the known graph are logged.

use bankgate_types::OnboardingStatus;
use serde::Serialize;

use OnboardingStatus::{Active, PendingApproval, PendingDetails, Rejected};

/// One observed status change.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Transition {
    /// `None` on the first load after authentication.
    pub from: Option<OnboardingStatus>,
    pub to: OnboardingStatus,
}

impl Transition {
    pub fn is_initial(&self) -> bool {
        self.from.is_none()
    }

    pub fn is_change(&self) -> bool {
        self.from != Some(self.to)
    }

    /// Whether this change follows a known onboarding edge.
    ///
    /// Initial states and unchanged reloads are always expected.
    pub fn is_expected(&self) -> bool {
        match self.from {
            None => true,
            Some(from) => from == self.to || is_edge(from, self.to),
        }
    }
}

/// Known edges of the onboarding graph.
///
/// Details are submitted for approval; approval activates, review may reject.
/// A rejected profile is resubmitted, which either reopens details or goes
/// straight back to review.
pub fn is_edge(from: OnboardingStatus, to: OnboardingStatus) -> bool {
    matches!(
        (from, to),
        (PendingDetails, PendingApproval | Rejected)
            | (PendingApproval, Active | Rejected)
            | (Rejected, PendingDetails | PendingApproval)
            | (Active, Active)
    )
}

/// Classifies a reported status against the previous one, logging
/// unexpected jumps.
pub fn transition(from: Option<OnboardingStatus>, to: OnboardingStatus) -> Transition {
    let transition = Transition { from, to };
    if !transition.is_expected() {
        tracing::warn!(
            from = %from.map_or("none", OnboardingStatus::as_str),
            to = %to,
            "unexpected onboarding transition reported by backend"
        );
    } else if transition.is_change() {
        tracing::debug!(to = %to, "onboarding status changed");
    }
    transition
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_main_path() {
        assert!(is_edge(PendingDetails, PendingApproval));
        assert!(is_edge(PendingApproval, Active));
        assert!(is_edge(Active, Active));
    }

    #[test]
    fn test_rejection_and_resubmission() {
        assert!(is_edge(PendingDetails, Rejected));
        assert!(is_edge(Rejected, PendingDetails));
        assert!(is_edge(PendingApproval, Rejected));
    }

    #[test]
    fn test_unknown_jumps() {
        assert!(!is_edge(PendingDetails, Active));
        assert!(!is_edge(Active, PendingDetails));
        assert!(!transition(Some(Active), Rejected).is_expected());
    }

    #[test]
    fn test_initial_and_reload_are_expected() {
        let initial = transition(None, Active);
        assert!(initial.is_initial());
        assert!(initial.is_expected());

        let reload = transition(Some(PendingApproval), PendingApproval);
        assert!(reload.is_expected());
        assert!(!reload.is_change());
    }
}
