//! Credential storage.
//!
//! The credential lives in memory behind a lock so gates can read it
//! synchronously, and is written through to `<home>/session.json` (0600) so
//! it survives restarts. Tokens are never logged or displayed in full.

use std::fmt;
use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::{Arc, PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard};
use std::time::{Duration, SystemTime, UNIX_EPOCH};

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

pub(crate) fn now_millis_u64() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .ok()
        .and_then(|d| u64::try_from(d.as_millis()).ok())
        .unwrap_or(u64::MAX)
}

/// Returns a masked version of a token for display (first 8 chars + ...).
pub fn mask_token(token: &str) -> String {
    if token.len() <= 12 {
        return "***".to_string();
    }
    let prefix: String = token.chars().take(8).collect();
    format!("{prefix}...")
}

/// Bearer token proving a completed login, with an optional absolute expiry.
///
/// Persisted under the well-known keys `token` and `tokenExpiry`.
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Credential {
    pub token: String,
    /// Expiry in milliseconds since epoch. Absent means "never expires".
    #[serde(
        rename = "tokenExpiry",
        default,
        skip_serializing_if = "Option::is_none"
    )]
    pub expires_at: Option<u64>,
}

impl Credential {
    pub fn new(token: impl Into<String>, expires_at: Option<u64>) -> Self {
        Self {
            token: token.into(),
            expires_at,
        }
    }

    /// Expired once `now_ms` reaches `expires_at`. A credential without an
    /// expiry is treated as valid, for compatibility with tokens stored before
    /// expiry tracking existed.
    pub fn is_expired_at(&self, now_ms: u64) -> bool {
        self.expires_at.is_some_and(|expiry| now_ms >= expiry)
    }

    /// Remaining lifetime; `None` when the expiry is unknown.
    pub fn remaining_at(&self, now_ms: u64) -> Option<Duration> {
        self.expires_at
            .map(|expiry| Duration::from_millis(expiry.saturating_sub(now_ms)))
    }
}

impl fmt::Debug for Credential {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credential")
            .field("token", &mask_token(&self.token))
            .field("expires_at", &self.expires_at)
            .finish()
    }
}

/// Why the credential was last removed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum LogoutReason {
    SignedOut,
    Expired,
    /// The backend rejected the token.
    Invalidated,
}

/// Backing storage for the credential.
pub trait CredentialPersistence: Send + Sync {
    /// # Errors
    /// Returns an error if stored state exists but cannot be read.
    fn load(&self) -> Result<Option<Credential>>;

    /// Replaces stored state; `None` removes it.
    ///
    /// # Errors
    /// Returns an error if the write fails.
    fn save(&self, credential: Option<&Credential>) -> Result<()>;
}

/// JSON file with restricted permissions, replaced atomically.
#[derive(Debug, Clone)]
pub struct SessionFile {
    path: PathBuf,
}

impl SessionFile {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl CredentialPersistence for SessionFile {
    fn load(&self) -> Result<Option<Credential>> {
        if !self.path.exists() {
            return Ok(None);
        }
        let contents = fs::read_to_string(&self.path)
            .with_context(|| format!("Failed to read session from {}", self.path.display()))?;
        let credential: Credential = serde_json::from_str(&contents)
            .with_context(|| format!("Failed to parse session from {}", self.path.display()))?;
        if credential.token.is_empty() {
            return Ok(None);
        }
        Ok(Some(credential))
    }

    fn save(&self, credential: Option<&Credential>) -> Result<()> {
        let Some(credential) = credential else {
            if self.path.exists() {
                fs::remove_file(&self.path).with_context(|| {
                    format!("Failed to remove session file {}", self.path.display())
                })?;
            }
            return Ok(());
        };

        let dir = self
            .path
            .parent()
            .filter(|p| !p.as_os_str().is_empty())
            .unwrap_or_else(|| Path::new("."));
        fs::create_dir_all(dir)
            .with_context(|| format!("Failed to create directory {}", dir.display()))?;

        let contents =
            serde_json::to_string_pretty(credential).context("Failed to serialize session")?;

        // NamedTempFile is created with 0600 on unix.
        let mut tmp = tempfile::NamedTempFile::new_in(dir)
            .with_context(|| format!("Failed to create temp file in {}", dir.display()))?;
        tmp.write_all(contents.as_bytes())
            .with_context(|| format!("Failed to write session in {}", dir.display()))?;
        tmp.persist(&self.path)
            .with_context(|| format!("Failed to write {}", self.path.display()))?;
        Ok(())
    }
}

/// Keeps nothing across restarts.
#[derive(Debug, Clone, Copy, Default)]
pub struct EphemeralPersistence;

impl CredentialPersistence for EphemeralPersistence {
    fn load(&self) -> Result<Option<Credential>> {
        Ok(None)
    }

    fn save(&self, _credential: Option<&Credential>) -> Result<()> {
        Ok(())
    }
}

/// Wall-clock source in milliseconds since epoch.
pub type TimeSource = Arc<dyn Fn() -> u64 + Send + Sync>;

#[derive(Debug, Default)]
struct StoreState {
    credential: Option<Credential>,
    last_logout: Option<LogoutReason>,
}

/// Single source of truth for the current credential.
///
/// Reads never touch storage. Every mutation replaces the whole credential
/// under one write lock, so token and expiry are always observed together.
/// Mutators are crate-private: the session handle is the only writer.
pub struct CredentialStore {
    state: RwLock<StoreState>,
    persistence: Box<dyn CredentialPersistence>,
    now: TimeSource,
}

impl fmt::Debug for CredentialStore {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CredentialStore")
            .field("state", &*self.read())
            .finish_non_exhaustive()
    }
}

impl CredentialStore {
    /// Opens the store, restoring any persisted credential.
    ///
    /// Unreadable persisted state is logged and treated as signed out.
    pub fn open(persistence: Box<dyn CredentialPersistence>) -> Self {
        let credential = match persistence.load() {
            Ok(credential) => credential,
            Err(err) => {
                tracing::warn!("ignoring unreadable session state: {err:#}");
                None
            }
        };
        Self {
            state: RwLock::new(StoreState {
                credential,
                last_logout: None,
            }),
            persistence,
            now: Arc::new(now_millis_u64),
        }
    }

    pub fn ephemeral() -> Self {
        Self::open(Box::new(EphemeralPersistence))
    }

    #[must_use]
    pub fn with_time_source(mut self, now: TimeSource) -> Self {
        self.now = now;
        self
    }

    pub fn now_millis(&self) -> u64 {
        (self.now)()
    }

    pub fn get(&self) -> Option<Credential> {
        self.read().credential.clone()
    }

    pub fn token(&self) -> Option<String> {
        self.read().credential.as_ref().map(|c| c.token.clone())
    }

    pub fn has_token(&self) -> bool {
        self.read().credential.is_some()
    }

    /// No token is trivially expired; a token without expiry never is.
    pub fn is_expired(&self) -> bool {
        let now = self.now_millis();
        self.read()
            .credential
            .as_ref()
            .is_none_or(|c| c.is_expired_at(now))
    }

    /// A token is present and not expired.
    pub fn is_authenticated(&self) -> bool {
        !self.is_expired()
    }

    /// Remaining session time; `None` when signed out or the expiry is unknown.
    pub fn remaining(&self) -> Option<Duration> {
        let now = self.now_millis();
        self.read()
            .credential
            .as_ref()
            .and_then(|c| c.remaining_at(now))
    }

    pub fn last_logout(&self) -> Option<LogoutReason> {
        self.read().last_logout
    }

    /// Stores a freshly issued token. `expires_in` is relative to now.
    ///
    /// The in-memory credential is replaced even if persisting fails.
    ///
    /// # Errors
    /// Returns an error if the credential could not be persisted.
    pub(crate) fn set(&self, token: &str, expires_in: Option<Duration>) -> Result<Credential> {
        let expires_at = expires_in.map(|lifetime| {
            let millis = u64::try_from(lifetime.as_millis()).unwrap_or(u64::MAX);
            self.now_millis().saturating_add(millis)
        });
        let credential = Credential::new(token, expires_at);

        let mut state = self.write();
        state.credential = Some(credential.clone());
        state.last_logout = None;
        self.persistence
            .save(Some(&credential))
            .context("Failed to persist credential")?;
        Ok(credential)
    }

    /// Removes token and expiry together. Returns whether a credential was
    /// present.
    pub(crate) fn clear(&self, reason: LogoutReason) -> bool {
        let mut state = self.write();
        let had = state.credential.take().is_some();
        if had {
            state.last_logout = Some(reason);
        }
        self.persist_cleared();
        had
    }

    /// Clears the credential if, and only if, it is present and expired.
    ///
    /// The check and the clear happen under one write lock, so concurrent
    /// callers observe exactly one successful expiry.
    pub(crate) fn expire_if_due(&self) -> Option<Credential> {
        let now = self.now_millis();
        let mut state = self.write();
        if !state
            .credential
            .as_ref()
            .is_some_and(|c| c.is_expired_at(now))
        {
            return None;
        }
        let expired = state.credential.take();
        state.last_logout = Some(LogoutReason::Expired);
        self.persist_cleared();
        expired
    }

    fn persist_cleared(&self) {
        if let Err(err) = self.persistence.save(None) {
            tracing::warn!("failed to remove persisted session: {err:#}");
        }
    }

    fn read(&self) -> RwLockReadGuard<'_, StoreState> {
        self.state.read().unwrap_or_else(PoisonError::into_inner)
    }

    fn write(&self) -> RwLockWriteGuard<'_, StoreState> {
        self.state.write().unwrap_or_else(PoisonError::into_inner)
    }
}
