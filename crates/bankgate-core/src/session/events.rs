use serde::Serialize;

use crate::decision::Redirect;

/// Lifecycle notifications for the current session.
///
/// `Expired` and `Invalidated` carry the sign-in redirect so consumers can
/// show the matching message without re-deriving it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum SessionEvent {
    SignedIn,
    SignedOut,
    Expired { redirect: Redirect },
    Invalidated { redirect: Redirect },
}

impl SessionEvent {
    /// Redirect the UI should follow, if any.
    pub fn redirect(&self) -> Option<&Redirect> {
        match self {
            Self::Expired { redirect } | Self::Invalidated { redirect } => Some(redirect),
            Self::SignedIn | Self::SignedOut => None,
        }
    }
}
