use serde::{Deserialize, Serialize};

/// Fields of the customer profile form.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum ProfileField {
    FirstName,
    LastName,
    Email,
    Mobile,
    Address,
    City,
    State,
    ZipCode,
    NationalId,
    DateOfBirth,
    Occupation,
    AnnualIncome,
    EmergencyContactName,
    EmergencyContactPhone,
    /// Justification note attached to updates of an active profile.
    Reason,
}

impl ProfileField {
    pub fn all() -> &'static [ProfileField] {
        &[
            Self::FirstName,
            Self::LastName,
            Self::Email,
            Self::Mobile,
            Self::Address,
            Self::City,
            Self::State,
            Self::ZipCode,
            Self::NationalId,
            Self::DateOfBirth,
            Self::Occupation,
            Self::AnnualIncome,
            Self::EmergencyContactName,
            Self::EmergencyContactPhone,
            Self::Reason,
        ]
    }

    /// Looks a field up by its wire name.
    pub fn from_key(key: &str) -> Option<Self> {
        Self::all().iter().copied().find(|f| f.key() == key.trim())
    }

    /// Wire name used by the backend payloads.
    pub fn key(self) -> &'static str {
        match self {
            Self::FirstName => "firstName",
            Self::LastName => "lastName",
            Self::Email => "email",
            Self::Mobile => "mobile",
            Self::Address => "address",
            Self::City => "city",
            Self::State => "state",
            Self::ZipCode => "zipCode",
            Self::NationalId => "nationalId",
            Self::DateOfBirth => "dateOfBirth",
            Self::Occupation => "occupation",
            Self::AnnualIncome => "annualIncome",
            Self::EmergencyContactName => "emergencyContactName",
            Self::EmergencyContactPhone => "emergencyContactPhone",
            Self::Reason => "reason",
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            Self::FirstName => "First Name",
            Self::LastName => "Last Name",
            Self::Email => "Email",
            Self::Mobile => "Mobile Number",
            Self::Address => "Address",
            Self::City => "City",
            Self::State => "State",
            Self::ZipCode => "ZIP Code",
            Self::NationalId => "National ID",
            Self::DateOfBirth => "Date of Birth",
            Self::Occupation => "Occupation",
            Self::AnnualIncome => "Annual Income",
            Self::EmergencyContactName => "Emergency Contact Name",
            Self::EmergencyContactPhone => "Emergency Contact Phone",
            Self::Reason => "Reason for Update",
        }
    }
}
