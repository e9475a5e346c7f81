//! Configuration management for bankgate.
//!
//! Loads configuration from ${BANKGATE_HOME}/config.toml with sensible defaults.

use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::{Context, Result};
use bankgate_types::Role;
use serde::{Deserialize, Serialize};
use url::Url;

use crate::navigation::RoutePath;

/// Returns the default config template with comments.
///
/// This is embedded from default_config.toml at compile time.
fn default_config_template() -> &'static str {
    include_str!("../default_config.toml")
}

/// Returns the starter navigation document written by `Config::init`.
pub fn default_navigation_template() -> &'static str {
    include_str!("../default_navigation.json")
}

/// Merges user config values into the default template.
///
/// Keeps new comments/sections from the template while preserving the user's
/// customized values.
fn merge_with_template(user_config: &str) -> Result<String> {
    use toml_edit::DocumentMut;

    let mut doc: DocumentMut = default_config_template()
        .parse()
        .context("Failed to parse default config template")?;
    let user_doc: DocumentMut = user_config.parse().context("Failed to parse user config")?;

    merge_items(doc.as_table_mut(), user_doc.as_table());

    Ok(doc.to_string())
}

/// Recursively merges items from source table into target table.
fn merge_items(target: &mut toml_edit::Table, source: &toml_edit::Table) {
    use toml_edit::Item;

    for (key, value) in source.iter() {
        match value {
            Item::Value(v) => {
                target[key] = Item::Value(v.clone());
            }
            Item::Table(src_table) => {
                if let Some(Item::Table(target_table)) = target.get_mut(key) {
                    merge_items(target_table, src_table);
                } else {
                    target[key] = Item::Table(src_table.clone());
                }
            }
            Item::ArrayOfTables(src_arr) => {
                target[key] = Item::ArrayOfTables(src_arr.clone());
            }
            Item::None => {}
        }
    }
}

pub mod paths {
    //! Path resolution for bankgate configuration and state.
    //!
    //! BANKGATE_HOME resolution order:
    //! 1. BANKGATE_HOME environment variable (if set)
    //! 2. ~/.config/bankgate (default)

    use std::path::PathBuf;

    /// Returns the bankgate home directory.
    pub fn bankgate_home() -> PathBuf {
        if let Ok(home) = std::env::var("BANKGATE_HOME") {
            return PathBuf::from(home);
        }

        dirs::home_dir().map_or_else(
            || PathBuf::from(".bankgate"),
            |h| h.join(".config").join("bankgate"),
        )
    }

    /// Returns the path to the config.toml file.
    pub fn config_path() -> PathBuf {
        bankgate_home().join("config.toml")
    }

    /// Returns the path to the persisted credential.
    pub fn session_path() -> PathBuf {
        bankgate_home().join("session.json")
    }

    /// Returns the directory for rolling log files.
    pub fn logs_dir() -> PathBuf {
        bankgate_home().join("logs")
    }
}

/// Where the navigation tree document is fetched from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum NavigationLocation {
    File(PathBuf),
    Remote(Url),
}

/// Navigation catalog configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct NavigationConfig {
    /// File path (absolute or relative to home) or http(s) URL.
    pub source: String,
    /// Last-known-good snapshot file (absolute or relative to home).
    pub cache_file: Option<String>,
}

impl Default for NavigationConfig {
    fn default() -> Self {
        Self {
            source: "navigation.json".to_string(),
            cache_file: Some("navigation.cache.json".to_string()),
        }
    }
}

impl NavigationConfig {
    /// Resolves `source` against `home`.
    ///
    /// # Errors
    /// Returns an error if `source` looks like a URL but does not parse.
    pub fn location(&self, home: &Path) -> Result<NavigationLocation> {
        let source = self.source.trim();
        if source.starts_with("http://") || source.starts_with("https://") {
            let url = Url::parse(source)
                .with_context(|| format!("Invalid navigation source URL: {source}"))?;
            return Ok(NavigationLocation::Remote(url));
        }
        Ok(NavigationLocation::File(resolve_under(home, source)))
    }

    pub fn cache_path(&self, home: &Path) -> Option<PathBuf> {
        self.cache_file
            .as_deref()
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .map(|s| resolve_under(home, s))
    }
}

fn resolve_under(home: &Path, raw: &str) -> PathBuf {
    let path = Path::new(raw);
    if path.is_absolute() {
        path.to_path_buf()
    } else {
        home.join(path)
    }
}

/// Well-known destinations and gate assignments.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RoutesConfig {
    pub sign_in: String,
    pub sign_up: String,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub public: Vec<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub authenticated_only: Vec<String>,
    pub profile_editor: String,
    pub home: String,
    pub fallback: String,
}

impl Default for RoutesConfig {
    fn default() -> Self {
        Self {
            sign_in: "login".to_string(),
            sign_up: "register".to_string(),
            public: Vec::new(),
            authenticated_only: vec!["dashboard".to_string(), "dashboard/profile".to_string()],
            profile_editor: "dashboard/profile".to_string(),
            home: "dashboard/home".to_string(),
            fallback: "dashboard".to_string(),
        }
    }
}

impl RoutesConfig {
    /// Destinations admitted without a session: sign-in, sign-up and `public`.
    pub fn public_destinations(&self) -> Vec<RoutePath> {
        [self.sign_in.as_str(), self.sign_up.as_str()]
            .into_iter()
            .chain(self.public.iter().map(String::as_str))
            .map(RoutePath::parse)
            .collect()
    }

    pub fn authenticated_only_destinations(&self) -> Vec<RoutePath> {
        self.authenticated_only
            .iter()
            .map(|s| RoutePath::parse(s))
            .collect()
    }
}

/// Main configuration structure.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Base URL of the identity/profile backend
    pub api_base_url: String,

    /// Session expiry poll interval in seconds
    pub session_poll_secs: u64,

    /// Maximum wait for the actor's role in the authorization gate (seconds)
    pub role_lookup_timeout_secs: u64,

    #[serde(default)]
    pub navigation: NavigationConfig,

    #[serde(default)]
    pub routes: RoutesConfig,

    /// Role -> home destination
    #[serde(default = "default_homes")]
    pub homes: BTreeMap<Role, String>,
}

fn default_homes() -> BTreeMap<Role, String> {
    BTreeMap::from([
        (Role::ADMIN, "dashboard/admin".to_string()),
        (Role::SUPERADMIN, "dashboard/admin".to_string()),
        (
            Role::ACCOUNTANT,
            "dashboard/transactions/bulk-upload".to_string(),
        ),
    ])
}

impl Default for Config {
    fn default() -> Self {
        Self {
            api_base_url: Self::DEFAULT_API_BASE_URL.to_string(),
            session_poll_secs: Self::DEFAULT_SESSION_POLL_SECS,
            role_lookup_timeout_secs: Self::DEFAULT_ROLE_LOOKUP_TIMEOUT_SECS,
            navigation: NavigationConfig::default(),
            routes: RoutesConfig::default(),
            homes: default_homes(),
        }
    }
}

impl Config {
    const DEFAULT_API_BASE_URL: &str = "http://localhost:8080/api";
    const DEFAULT_SESSION_POLL_SECS: u64 = 10;
    const DEFAULT_ROLE_LOOKUP_TIMEOUT_SECS: u64 = 10;

    /// Loads configuration from the default config path.
    ///
    /// # Errors
    /// Returns an error if the file exists but cannot be read or parsed.
    pub fn load() -> Result<Self> {
        Self::load_from(&paths::config_path())
    }

    /// Loads configuration from a specific path.
    /// Returns defaults if file doesn't exist.
    ///
    /// # Errors
    /// Returns an error if the file exists but cannot be read or parsed.
    pub fn load_from(path: &Path) -> Result<Self> {
        if path.exists() {
            let contents = fs::read_to_string(path)
                .with_context(|| format!("Failed to read config from {}", path.display()))?;
            toml::from_str(&contents)
                .with_context(|| format!("Failed to parse config from {}", path.display()))
        } else {
            Ok(Config::default())
        }
    }

    /// Creates a default config file at the given path, plus a starter
    /// navigation document next to it when none exists.
    ///
    /// # Errors
    /// Returns an error if the config file already exists or cannot be written.
    pub fn init(path: &Path) -> Result<()> {
        if path.exists() {
            anyhow::bail!("Config file already exists at {}", path.display());
        }

        Self::write_config(path, default_config_template())?;

        if let Some(parent) = path.parent() {
            let nav_path = parent.join(NavigationConfig::default().source);
            if !nav_path.exists() {
                fs::write(&nav_path, default_navigation_template()).with_context(|| {
                    format!("Failed to write navigation to {}", nav_path.display())
                })?;
            }
        }
        Ok(())
    }

    /// Saves only the `api_base_url` field to a specific config file path.
    ///
    /// Creates the file with default template if it doesn't exist.
    /// If file exists, merges user values into the latest template.
    ///
    /// # Errors
    /// Returns an error if the URL is invalid or the file cannot be written.
    pub fn save_api_base_url_to(path: &Path, api_base_url: &str) -> Result<()> {
        use toml_edit::{DocumentMut, value};

        Url::parse(api_base_url).with_context(|| format!("Invalid URL: {api_base_url}"))?;

        let contents = if path.exists() {
            let user_config = fs::read_to_string(path)
                .with_context(|| format!("Failed to read config from {}", path.display()))?;
            merge_with_template(&user_config)?
        } else {
            default_config_template().to_string()
        };

        let mut doc: DocumentMut = contents
            .parse()
            .with_context(|| format!("Failed to parse config from {}", path.display()))?;
        doc["api_base_url"] = value(api_base_url);

        Self::write_config(path, &doc.to_string())
    }

    pub fn poll_interval(&self) -> Duration {
        Duration::from_secs(self.session_poll_secs.max(1))
    }

    pub fn role_lookup_timeout(&self) -> Duration {
        Duration::from_secs(self.role_lookup_timeout_secs.max(1))
    }

    /// Home destination for a role, falling back to `routes.home`.
    pub fn home_for(&self, role: &Role) -> &str {
        self.homes
            .get(role)
            .map_or(self.routes.home.as_str(), String::as_str)
    }

    fn write_config(path: &Path, content: &str) -> Result<()> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)
                .with_context(|| format!("Failed to create directory {}", parent.display()))?;
        }

        let tmp_path = path.with_extension("toml.tmp");
        fs::write(&tmp_path, content)
            .with_context(|| format!("Failed to write config to {}", tmp_path.display()))?;
        fs::rename(&tmp_path, path).with_context(|| {
            format!(
                "Failed to rename {} to {}",
                tmp_path.display(),
                path.display()
            )
        })?;

        Ok(())
    }
}
