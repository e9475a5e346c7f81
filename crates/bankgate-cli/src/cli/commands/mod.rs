//! CLI command handlers.

pub mod auth;
pub mod config;
pub mod navigation;
pub mod profile;
pub mod session;
