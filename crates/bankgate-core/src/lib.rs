//! Session tracking, navigation gates and onboarding state for the banking
//! portal client.

pub mod backend;
pub mod config;
pub mod decision;
pub mod gate;
pub mod navigation;
pub mod portal;
pub mod profile;
pub mod session;

pub use config::Config;
pub use decision::{AccessDecision, Redirect, RedirectReason};
pub use portal::Portal;
