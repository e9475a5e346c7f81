//! What the profile editor allows in each onboarding state.

use std::collections::BTreeMap;

use bankgate_types::{OnboardingStatus, ProfileField};
use serde::{Deserialize, Serialize};

use super::ActorProfile;

const JUSTIFICATION_MIN_CHARS: usize = 10;

const COMPLETION_FIELDS: &[ProfileField] = &[
    ProfileField::FirstName,
    ProfileField::LastName,
    ProfileField::Email,
    ProfileField::Mobile,
    ProfileField::Address,
    ProfileField::City,
    ProfileField::State,
    ProfileField::NationalId,
    ProfileField::DateOfBirth,
    ProfileField::Occupation,
];

const UPDATE_FIELDS: &[ProfileField] = &[
    ProfileField::FirstName,
    ProfileField::LastName,
    ProfileField::Email,
    ProfileField::Mobile,
    ProfileField::Reason,
];

/// Profile form values keyed by field, serialized with backend field names.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ProfileSubmission {
    fields: BTreeMap<ProfileField, String>,
}

impl ProfileSubmission {
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn with(mut self, field: ProfileField, value: impl Into<String>) -> Self {
        self.set(field, value);
        self
    }

    pub fn set(&mut self, field: ProfileField, value: impl Into<String>) {
        self.fields.insert(field, value.into());
    }

    /// Trimmed value; blank counts as missing.
    pub fn get(&self, field: ProfileField) -> Option<&str> {
        self.fields
            .get(&field)
            .map(|v| v.trim())
            .filter(|v| !v.is_empty())
    }

    pub fn iter(&self) -> impl Iterator<Item = (ProfileField, &str)> {
        self.fields.iter().map(|(k, v)| (*k, v.as_str()))
    }
}

/// A single validation failure, phrased for display.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FieldError {
    pub field: ProfileField,
    pub message: String,
}

impl FieldError {
    fn new(field: ProfileField, message: impl Into<String>) -> Self {
        Self {
            field,
            message: message.into(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct EditorPolicy {
    pub status: OnboardingStatus,
}

impl EditorPolicy {
    pub fn for_status(status: OnboardingStatus) -> Self {
        Self { status }
    }

    /// Details must be completed (or resubmitted) right away.
    pub fn starts_editable(self) -> bool {
        matches!(
            self.status,
            OnboardingStatus::PendingDetails | OnboardingStatus::Rejected
        )
    }

    /// Only active profiles open read-only with an explicit edit toggle.
    pub fn can_toggle_edit(self) -> bool {
        self.status == OnboardingStatus::Active
    }

    /// Submissions are locked while a review is pending.
    pub fn accepts_submission(self) -> bool {
        self.status != OnboardingStatus::PendingApproval
    }

    pub fn required_fields(self) -> &'static [ProfileField] {
        match self.status {
            OnboardingStatus::PendingDetails | OnboardingStatus::Rejected => COMPLETION_FIELDS,
            OnboardingStatus::Active => UPDATE_FIELDS,
            OnboardingStatus::PendingApproval => &[],
        }
    }

    pub fn is_required(self, field: ProfileField) -> bool {
        self.required_fields().contains(&field)
    }

    /// Validates a submission for this state.
    ///
    /// # Errors
    /// Returns every failing field, in field order. A state that does not
    /// accept submissions fails with a single error on the justification
    /// field.
    pub fn validate(self, submission: &ProfileSubmission) -> Result<(), Vec<FieldError>> {
        if !self.accepts_submission() {
            return Err(vec![FieldError::new(
                ProfileField::Reason,
                "Profile is under review and cannot be changed",
            )]);
        }

        let mut errors: Vec<FieldError> = self
            .required_fields()
            .iter()
            .filter(|field| submission.get(**field).is_none())
            .map(|field| FieldError::new(*field, format!("{} is required", field.label())))
            .collect();

        if let Some(email) = submission.get(ProfileField::Email)
            && !looks_like_email(email)
        {
            errors.push(FieldError::new(
                ProfileField::Email,
                "Please enter a valid email address",
            ));
        }

        if self.status == OnboardingStatus::Active
            && let Some(reason) = submission.get(ProfileField::Reason)
            && reason.chars().count() < JUSTIFICATION_MIN_CHARS
        {
            errors.push(FieldError::new(
                ProfileField::Reason,
                format!(
                    "{} must be at least {JUSTIFICATION_MIN_CHARS} characters",
                    ProfileField::Reason.label()
                ),
            ));
        }

        errors.sort_by_key(|e| e.field);
        if errors.is_empty() { Ok(()) } else { Err(errors) }
    }
}

/// Banner text the editor shows for a rejected profile.
pub fn rejection_notice(profile: &ActorProfile) -> Option<String> {
    if profile.status != OnboardingStatus::Rejected {
        return None;
    }
    Some(match profile.rejection_reason.as_deref().map(str::trim) {
        Some(reason) if !reason.is_empty() => {
            format!("Your profile was rejected: {reason}. Please update and resubmit.")
        }
        _ => "Your profile was rejected. Please update and resubmit.".to_string(),
    })
}

fn looks_like_email(value: &str) -> bool {
    let Some((local, domain)) = value.split_once('@') else {
        return false;
    };
    !local.is_empty()
        && !domain.is_empty()
        && !domain.contains('@')
        && !value.chars().any(char::is_whitespace)
        && !domain.starts_with('.')
        && !domain.ends_with('.')
}

#[cfg(test)]
mod tests {
    use bankgate_types::Role;

    use super::*;

    fn complete_details() -> ProfileSubmission {
        COMPLETION_FIELDS
            .iter()
            .fold(ProfileSubmission::new(), |s, f| s.with(*f, "value"))
            .with(ProfileField::Email, "jane@example.com")
    }

    #[test]
    fn test_editable_states() {
        assert!(EditorPolicy::for_status(OnboardingStatus::PendingDetails).starts_editable());
        assert!(EditorPolicy::for_status(OnboardingStatus::Rejected).starts_editable());
        assert!(!EditorPolicy::for_status(OnboardingStatus::PendingApproval).starts_editable());
        assert!(!EditorPolicy::for_status(OnboardingStatus::Active).starts_editable());
        assert!(EditorPolicy::for_status(OnboardingStatus::Active).can_toggle_edit());
        assert!(!EditorPolicy::for_status(OnboardingStatus::Rejected).can_toggle_edit());
    }

    #[test]
    fn test_completion_requires_broad_set() {
        let policy = EditorPolicy::for_status(OnboardingStatus::PendingDetails);
        assert!(policy.is_required(ProfileField::NationalId));
        assert!(!policy.is_required(ProfileField::Reason));

        let errors = policy.validate(&ProfileSubmission::new()).unwrap_err();
        assert_eq!(errors.len(), COMPLETION_FIELDS.len());
        assert_eq!(errors[0].message, "First Name is required");

        assert!(policy.validate(&complete_details()).is_ok());
    }

    #[test]
    fn test_active_update_needs_justification() {
        let policy = EditorPolicy::for_status(OnboardingStatus::Active);
        assert!(!policy.is_required(ProfileField::Address));

        let base = ProfileSubmission::new()
            .with(ProfileField::FirstName, "Jane")
            .with(ProfileField::LastName, "Doe")
            .with(ProfileField::Email, "jane@example.com")
            .with(ProfileField::Mobile, "5550100");

        let missing = policy.validate(&base).unwrap_err();
        assert_eq!(missing.len(), 1);
        assert_eq!(missing[0].field, ProfileField::Reason);

        let short = policy
            .validate(&base.clone().with(ProfileField::Reason, "moved"))
            .unwrap_err();
        assert!(short[0].message.contains("at least 10"));

        assert!(
            policy
                .validate(&base.with(ProfileField::Reason, "Moved to a new city"))
                .is_ok()
        );
    }

    #[test]
    fn test_pending_approval_rejects_submission() {
        let policy = EditorPolicy::for_status(OnboardingStatus::PendingApproval);
        assert!(!policy.accepts_submission());
        assert!(policy.validate(&complete_details()).is_err());
    }

    #[test]
    fn test_email_shape() {
        let policy = EditorPolicy::for_status(OnboardingStatus::PendingDetails);
        let errors = policy
            .validate(&complete_details().with(ProfileField::Email, "not-an-email"))
            .unwrap_err();
        assert_eq!(errors.len(), 1);
        assert_eq!(errors[0].field, ProfileField::Email);
        assert!(looks_like_email("a@b.co"));
        assert!(!looks_like_email("a@"));
        assert!(!looks_like_email("a b@c.d"));
    }

    #[test]
    fn test_blank_values_count_as_missing() {
        let policy = EditorPolicy::for_status(OnboardingStatus::PendingDetails);
        let errors = policy
            .validate(&complete_details().with(ProfileField::City, "   "))
            .unwrap_err();
        assert_eq!(errors[0].field, ProfileField::City);
    }

    #[test]
    fn test_submission_serializes_with_backend_keys() {
        let submission = ProfileSubmission::new().with(ProfileField::ZipCode, "12345");
        let json = serde_json::to_value(&submission).unwrap();
        assert_eq!(json["zipCode"], "12345");
    }

    #[test]
    fn test_rejection_notice() {
        let mut profile = ActorProfile::new(Some(Role::CUSTOMER), OnboardingStatus::Rejected);
        assert_eq!(
            rejection_notice(&profile).unwrap(),
            "Your profile was rejected. Please update and resubmit."
        );
        profile.rejection_reason = Some("ID unreadable".to_string());
        assert!(rejection_notice(&profile).unwrap().contains("ID unreadable"));
        profile.status = OnboardingStatus::Active;
        assert_eq!(rejection_notice(&profile), None);
    }
}
