use std::borrow::Cow;
use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

/// Role identifier attached to an authenticated actor.
///
/// Roles are compared by their normalized (trimmed, lowercase) name. The
/// well-known roles are available as associated constants; any other name is
/// still a valid role, so navigation trees may declare roles the portal does
/// not special-case.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub struct Role(Cow<'static, str>);

impl Role {
    pub const CUSTOMER: Role = Role(Cow::Borrowed("customer"));
    pub const USER: Role = Role(Cow::Borrowed("user"));
    pub const ACCOUNTANT: Role = Role(Cow::Borrowed("accountant"));
    pub const ADMIN: Role = Role(Cow::Borrowed("admin"));
    pub const SUPERADMIN: Role = Role(Cow::Borrowed("superadmin"));

    /// Builds a role from a raw name. Returns `None` for blank input.
    pub fn parse(raw: &str) -> Option<Self> {
        let normalized = raw.trim().to_ascii_lowercase();
        if normalized.is_empty() {
            return None;
        }
        Some(Self(Cow::Owned(normalized)))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Staff roles skip customer onboarding and land on their own area.
    pub fn is_staff(&self) -> bool {
        matches!(self.as_str(), "admin" | "superadmin" | "accountant")
    }

    /// Display form with the first letter capitalized ("Admin", "Customer").
    pub fn display_name(&self) -> String {
        let mut chars = self.0.chars();
        match chars.next() {
            Some(first) => first.to_uppercase().chain(chars).collect(),
            None => String::new(),
        }
    }
}

impl From<String> for Role {
    fn from(value: String) -> Self {
        let normalized = value.trim().to_ascii_lowercase();
        Self(Cow::Owned(normalized))
    }
}

impl From<Role> for String {
    fn from(value: Role) -> Self {
        value.0.into_owned()
    }
}

impl FromStr for Role {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s).ok_or_else(|| "role name cannot be empty".to_string())
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_normalizes_case_and_whitespace() {
        assert_eq!(Role::parse("  ADMIN "), Some(Role::ADMIN));
        assert_eq!(Role::parse("Analyst").unwrap().as_str(), "analyst");
        assert_eq!(Role::parse("   "), None);
    }

    #[test]
    fn test_constants_equal_owned_names() {
        assert_eq!(Role::from("customer".to_string()), Role::CUSTOMER);
        assert_ne!(Role::CUSTOMER, Role::USER);
    }

    #[test]
    fn test_staff_roles() {
        assert!(Role::ADMIN.is_staff());
        assert!(Role::SUPERADMIN.is_staff());
        assert!(Role::ACCOUNTANT.is_staff());
        assert!(!Role::CUSTOMER.is_staff());
        assert!(!Role::parse("analyst").unwrap().is_staff());
    }

    #[test]
    fn test_serde_uses_plain_string() {
        let json = serde_json::to_string(&Role::SUPERADMIN).unwrap();
        assert_eq!(json, "\"superadmin\"");
        let role: Role = serde_json::from_str("\"Accountant\"").unwrap();
        assert_eq!(role, Role::ACCOUNTANT);
    }

    #[test]
    fn test_display_name_capitalizes() {
        assert_eq!(Role::ADMIN.display_name(), "Admin");
    }
}
