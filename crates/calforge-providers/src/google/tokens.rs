//! OAuth token persistence.

use std::fs;
use std::path::{Path, PathBuf};
use std::sync::{PoisonError, RwLock};

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::error::{ProviderError, ProviderResult};

/// Access tokens are treated as expired this long before Google says so.
const EXPIRY_MARGIN_SECS: i64 = 60;

/// An OAuth token set as stored on disk.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TokenInfo {
    pub access_token: String,
    pub refresh_token: Option<String>,
    pub expires_at: Option<DateTime<Utc>>,
    /// Scopes granted when the tokens were issued.
    pub scopes: Vec<String>,
    pub last_refresh: DateTime<Utc>,
}

impl TokenInfo {
    pub fn new(
        access_token: impl Into<String>,
        refresh_token: Option<String>,
        expires_in_secs: Option<i64>,
        scopes: Vec<String>,
    ) -> Self {
        Self {
            access_token: access_token.into(),
            refresh_token,
            expires_at: expires_in_secs.map(expiry_from_now),
            scopes,
            last_refresh: Utc::now(),
        }
    }

    /// Returns true if the access token is expired or about to expire.
    ///
    /// Tokens without an expiry never expire.
    pub fn is_expired(&self) -> bool {
        self.expires_at.is_some_and(|at| Utc::now() >= at)
    }

    pub fn has_scopes(&self, required: &[String]) -> bool {
        required.iter().all(|scope| self.scopes.contains(scope))
    }

    /// Replaces the access token after a refresh.
    pub fn update_access_token(
        &mut self,
        access_token: impl Into<String>,
        expires_in_secs: Option<i64>,
    ) {
        self.access_token = access_token.into();
        self.expires_at = expires_in_secs.map(expiry_from_now);
        self.last_refresh = Utc::now();
    }
}

fn expiry_from_now(secs: i64) -> DateTime<Utc> {
    Utc::now() + Duration::seconds(secs - EXPIRY_MARGIN_SECS)
}

/// File-backed token store with an in-memory copy.
///
/// Writes go to a temporary sibling first and are renamed into place; on
/// Unix the file is restricted to the owner.
#[derive(Debug)]
pub struct TokenStorage {
    path: PathBuf,
    tokens: RwLock<Option<TokenInfo>>,
}

impl TokenStorage {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            tokens: RwLock::new(None),
        }
    }

    /// Loads tokens from disk.
    ///
    /// Returns `Ok(false)` when no token file exists yet.
    pub fn load(&self) -> ProviderResult<bool> {
        if !self.path.exists() {
            debug!("no token file at {:?}", self.path);
            return Ok(false);
        }

        let content = fs::read_to_string(&self.path)
            .map_err(|e| ProviderError::storage("read token file", &self.path, e))?;

        let tokens: TokenInfo = serde_json::from_str(&content).map_err(|e| {
            ProviderError::configuration(format!("failed to parse token file: {}", e))
        })?;

        info!("loaded tokens from {:?}", self.path);
        *self.tokens.write().unwrap_or_else(PoisonError::into_inner) = Some(tokens);
        Ok(true)
    }

    fn save(&self, tokens: &TokenInfo) -> ProviderResult<()> {
        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent)
                .map_err(|e| ProviderError::storage("create token directory", parent, e))?;
        }

        let temp_path = self.path.with_extension("json.tmp");
        let content = serde_json::to_string_pretty(tokens)
            .map_err(|e| ProviderError::internal(format!("failed to serialize tokens: {}", e)))?;

        fs::write(&temp_path, &content)
            .map_err(|e| ProviderError::storage("write token file", &temp_path, e))?;

        #[cfg(unix)]
        {
            use std::os::unix::fs::PermissionsExt;
            let _ = fs::set_permissions(&temp_path, fs::Permissions::from_mode(0o600));
        }

        fs::rename(&temp_path, &self.path)
            .map_err(|e| ProviderError::storage("replace token file", &self.path, e))?;

        debug!("saved tokens to {:?}", self.path);
        Ok(())
    }

    pub fn get(&self) -> Option<TokenInfo> {
        self.tokens
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    /// Stores new tokens in memory and on disk.
    pub fn set(&self, tokens: TokenInfo) -> ProviderResult<()> {
        self.save(&tokens)?;
        *self.tokens.write().unwrap_or_else(PoisonError::into_inner) = Some(tokens);
        Ok(())
    }

    /// Records a refreshed access token and persists it.
    pub fn update_access_token(
        &self,
        access_token: impl Into<String>,
        expires_in_secs: Option<i64>,
    ) -> ProviderResult<()> {
        let mut guard = self.tokens.write().unwrap_or_else(PoisonError::into_inner);
        let tokens = guard
            .as_mut()
            .ok_or_else(|| ProviderError::internal("no tokens to update"))?;
        tokens.update_access_token(access_token, expires_in_secs);
        self.save(tokens)
    }

    /// Forgets the tokens, removing the file if present.
    pub fn clear(&self) -> ProviderResult<()> {
        *self.tokens.write().unwrap_or_else(PoisonError::into_inner) = None;
        if self.path.exists() {
            fs::remove_file(&self.path)
                .map_err(|e| ProviderError::storage("remove token file", &self.path, e))?;
            info!("cleared tokens from {:?}", self.path);
        }
        Ok(())
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Returns true if no tokens are stored or they lack `required_scopes`.
    pub fn needs_reauth(&self, required_scopes: &[String]) -> bool {
        match self
            .tokens
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .as_ref()
        {
            None => true,
            Some(tokens) => !tokens.has_scopes(required_scopes),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn scopes(names: &[&str]) -> Vec<String> {
        names.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn token_info_creation() {
        let token = TokenInfo::new(
            "access-token",
            Some("refresh-token".to_string()),
            Some(3600),
            scopes(&["events"]),
        );

        assert_eq!(token.access_token, "access-token");
        assert_eq!(token.refresh_token.as_deref(), Some("refresh-token"));
        assert!(token.expires_at.is_some());
        assert!(!token.is_expired());
    }

    #[test]
    fn short_lived_token_counts_as_expired() {
        let token = TokenInfo::new("access", None, Some(30), vec![]);
        assert!(token.is_expired());

        let forever = TokenInfo::new("access", None, None, vec![]);
        assert!(!forever.is_expired());
    }

    #[test]
    fn update_resets_expiry() {
        let mut token = TokenInfo::new("old", None, Some(3600), vec![]);
        token.expires_at = Some(Utc::now() - Duration::hours(1));
        assert!(token.is_expired());

        token.update_access_token("new", Some(3600));
        assert_eq!(token.access_token, "new");
        assert!(!token.is_expired());
    }

    #[test]
    fn scope_check() {
        let token = TokenInfo::new("access", None, None, scopes(&["a", "b"]));
        assert!(token.has_scopes(&scopes(&["a"])));
        assert!(token.has_scopes(&scopes(&["a", "b"])));
        assert!(!token.has_scopes(&scopes(&["c"])));
    }

    #[test]
    fn save_and_load() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("token.json");
        let storage = TokenStorage::new(&path);

        let token = TokenInfo::new("access-token", Some("refresh".into()), Some(3600), scopes(&["a"]));
        storage.set(token).unwrap();
        assert!(path.exists());
        assert!(!path.with_extension("json.tmp").exists());

        #[cfg(unix)]
        {
            use std::os::unix::fs::PermissionsExt;
            let mode = fs::metadata(&path).unwrap().permissions().mode();
            assert_eq!(mode & 0o777, 0o600);
        }

        let reloaded = TokenStorage::new(&path);
        assert!(reloaded.load().unwrap());
        assert_eq!(reloaded.get().unwrap().access_token, "access-token");
    }

    #[test]
    fn update_persists() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("token.json");
        let storage = TokenStorage::new(&path);

        assert!(storage.update_access_token("x", None).is_err());

        storage
            .set(TokenInfo::new("first", Some("refresh".into()), Some(3600), vec![]))
            .unwrap();
        storage.update_access_token("second", Some(3600)).unwrap();

        let reloaded = TokenStorage::new(&path);
        reloaded.load().unwrap();
        let tokens = reloaded.get().unwrap();
        assert_eq!(tokens.access_token, "second");
        assert_eq!(tokens.refresh_token.as_deref(), Some("refresh"));
    }

    #[test]
    fn clear_removes_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("token.json");
        let storage = TokenStorage::new(&path);

        storage.set(TokenInfo::new("access", None, None, vec![])).unwrap();
        storage.clear().unwrap();
        assert!(!path.exists());
        assert!(storage.get().is_none());
        storage.clear().unwrap();
    }

    #[test]
    fn missing_and_corrupt_files() {
        let dir = tempfile::tempdir().unwrap();
        let storage = TokenStorage::new(dir.path().join("token.json"));
        assert!(!storage.load().unwrap());
        assert!(storage.get().is_none());

        fs::write(storage.path(), "{not json").unwrap();
        let err = storage.load().unwrap_err();
        assert!(err.message().starts_with("failed to parse token file"));
    }

    #[test]
    fn needs_reauth() {
        let dir = tempfile::tempdir().unwrap();
        let storage = TokenStorage::new(dir.path().join("token.json"));
        let required = scopes(&["events"]);

        assert!(storage.needs_reauth(&required));

        storage
            .set(TokenInfo::new("access", None, None, scopes(&["events"])))
            .unwrap();
        assert!(!storage.needs_reauth(&required));
        assert!(storage.needs_reauth(&scopes(&["events", "readonly"])));
    }
}
