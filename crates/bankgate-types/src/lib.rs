//! Shared vocabulary for bankgate: roles, onboarding statuses, profile fields.

mod onboarding;
mod profile;
mod role;

pub use onboarding::OnboardingStatus;
pub use profile::ProfileField;
pub use role::Role;
