//! Checkpoints evaluated before a protected view is built.

mod authentication;
mod authorization;
mod navigator;

pub use authentication::AuthenticationGate;
pub use authorization::AuthorizationGate;
pub use navigator::{GuardKind, NavigationOutcome, Navigator};
