//! [`CalendarProvider`] implementation for Google Calendar.

use calforge_core::CalendarEvent;
use tokio::sync::RwLock;
use tracing::{debug, info, warn};

use crate::error::{ProviderError, ProviderResult};
use crate::provider::{BoxFuture, CalendarInfo, CalendarProvider, CreatedEvent};

use super::client::{EventRequest, GoogleCalendarClient};
use super::config::GoogleConfig;
use super::oauth::OAuthClient;
use super::tokens::TokenStorage;

/// Google Calendar provider.
///
/// Stored tokens are loaded on construction; the browser flow only runs
/// when [`authenticate`](Self::authenticate) is called.
pub struct GoogleProvider {
    config: GoogleConfig,
    token_storage: TokenStorage,
    oauth_client: OAuthClient,
    api_client: RwLock<Option<GoogleCalendarClient>>,
}

impl GoogleProvider {
    pub fn new(config: GoogleConfig) -> ProviderResult<Self> {
        config
            .validate()
            .map_err(|e| ProviderError::configuration(e).with_provider("google"))?;

        let token_storage = TokenStorage::new(&config.token_path);
        if let Err(e) = token_storage.load() {
            warn!("ignoring unreadable token file: {}", e);
        }

        let oauth_client = OAuthClient::new(config.credentials.clone(), config.timeout)?;

        Ok(Self {
            config,
            token_storage,
            oauth_client,
            api_client: RwLock::new(None),
        })
    }

    pub fn config(&self) -> &GoogleConfig {
        &self.config
    }

    /// Runs the OAuth consent flow and stores the resulting tokens.
    pub async fn authenticate(&self) -> ProviderResult<()> {
        info!("starting Google authentication flow");

        let tokens = self
            .oauth_client
            .authorize(&self.config.scopes, self.config.loopback_port_range)
            .await?;
        self.token_storage.set(tokens.clone())?;

        let client = GoogleCalendarClient::new(&tokens.access_token, self.config.timeout)?;
        *self.api_client.write().await = Some(client);

        info!("authentication successful, tokens saved to {:?}", self.token_storage.path());
        Ok(())
    }

    /// Authenticates unless usable tokens with the configured scopes exist.
    ///
    /// `force` discards stored tokens first.
    pub async fn ensure_authorized(&self, force: bool) -> ProviderResult<()> {
        if force {
            self.token_storage.clear()?;
            *self.api_client.write().await = None;
        }
        if force || self.needs_reauth() || !self.is_authenticated() {
            self.authenticate().await?;
        }
        Ok(())
    }

    /// Checks if the stored tokens are missing or lack the configured scopes.
    pub fn needs_reauth(&self) -> bool {
        self.token_storage.needs_reauth(&self.config.scopes)
    }

    /// Makes sure an API client exists with a non-expired access token,
    /// refreshing it if needed.
    async fn ensure_client(&self) -> ProviderResult<()> {
        let tokens = self.token_storage.get().ok_or_else(|| {
            ProviderError::not_authenticated("no stored tokens")
                .with_provider("google")
        })?;

        if !tokens.is_expired() {
            let mut client = self.api_client.write().await;
            if client.is_none() {
                *client = Some(GoogleCalendarClient::new(
                    &tokens.access_token,
                    self.config.timeout,
                )?);
            }
            return Ok(());
        }

        let refresh_token = tokens.refresh_token.as_deref().ok_or_else(|| {
            ProviderError::not_authenticated("no refresh token, run 'calforge auth --force'")
                .with_provider("google")
        })?;

        debug!("refreshing expired access token");
        let (access_token, expires_in) = self.oauth_client.refresh_token(refresh_token).await?;
        self.token_storage
            .update_access_token(&access_token, expires_in)?;

        let mut client = self.api_client.write().await;
        match client.as_mut() {
            Some(c) => c.set_access_token(&access_token),
            None => {
                *client = Some(GoogleCalendarClient::new(&access_token, self.config.timeout)?);
            }
        }
        Ok(())
    }

    async fn list_calendars_impl(&self) -> ProviderResult<Vec<CalendarInfo>> {
        self.ensure_client().await?;

        let client = self.api_client.read().await;
        let client = client
            .as_ref()
            .ok_or_else(|| ProviderError::internal("API client not available"))?;

        let calendars = client
            .list_calendars()
            .await
            .map_err(|e| e.with_provider("google"))?;

        Ok(calendars
            .into_iter()
            .map(|c| {
                let mut info = CalendarInfo::new(c.id, c.summary).with_primary(c.primary);
                if let Some(tz) = c.time_zone {
                    info = info.with_timezone(tz);
                }
                info.description = c.description;
                info
            })
            .collect())
    }

    async fn create_event_impl(&self, event: &CalendarEvent) -> ProviderResult<CreatedEvent> {
        self.ensure_client().await?;

        let request = EventRequest::from_event(event);
        let client = self.api_client.read().await;
        let client = client
            .as_ref()
            .ok_or_else(|| ProviderError::internal("API client not available"))?;

        client
            .insert_event(&self.config.calendar_id, &request)
            .await
            .map_err(|e| e.with_provider("google"))
    }
}

impl CalendarProvider for GoogleProvider {
    fn name(&self) -> &str {
        "google"
    }

    fn list_calendars(&self) -> BoxFuture<'_, ProviderResult<Vec<CalendarInfo>>> {
        Box::pin(async move { self.list_calendars_impl().await })
    }

    fn create_event<'a>(
        &'a self,
        event: &'a CalendarEvent,
    ) -> BoxFuture<'a, ProviderResult<CreatedEvent>> {
        Box::pin(async move { self.create_event_impl(event).await })
    }

    fn is_authenticated(&self) -> bool {
        // a refresh token is as good as a live access token
        self.token_storage
            .get()
            .is_some_and(|t| !t.is_expired() || t.refresh_token.is_some())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::google::config::OAuthCredentials;
    use crate::google::tokens::TokenInfo;

    fn test_config(dir: &tempfile::TempDir) -> GoogleConfig {
        let credentials =
            OAuthCredentials::new("test-client.apps.googleusercontent.com", "test-secret");
        GoogleConfig::new(credentials).with_token_path(dir.path().join("token.json"))
    }

    #[test]
    fn provider_creation() {
        let dir = tempfile::tempdir().unwrap();
        let provider = GoogleProvider::new(test_config(&dir)).unwrap();
        assert_eq!(provider.name(), "google");
        assert_eq!(provider.config().calendar_id, "primary");
    }

    #[test]
    fn invalid_config_is_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let config = test_config(&dir).with_scopes(vec![]);
        let err = GoogleProvider::new(config).err().unwrap();
        assert_eq!(err.code(), crate::error::ProviderErrorCode::Configuration);
        assert_eq!(err.provider(), Some("google"));
    }

    #[test]
    fn not_authenticated_without_tokens() {
        let dir = tempfile::tempdir().unwrap();
        let provider = GoogleProvider::new(test_config(&dir)).unwrap();
        assert!(!provider.is_authenticated());
        assert!(provider.needs_reauth());
    }

    #[test]
    fn stored_tokens_are_picked_up() {
        let dir = tempfile::tempdir().unwrap();
        let config = test_config(&dir);
        TokenStorage::new(&config.token_path)
            .set(TokenInfo::new(
                "access",
                Some("refresh".to_string()),
                Some(3600),
                config.scopes.clone(),
            ))
            .unwrap();

        let provider = GoogleProvider::new(config).unwrap();
        assert!(provider.is_authenticated());
        assert!(!provider.needs_reauth());
    }

    #[test]
    fn expired_token_with_refresh_still_counts() {
        let dir = tempfile::tempdir().unwrap();
        let config = test_config(&dir);
        TokenStorage::new(&config.token_path)
            .set(TokenInfo::new("access", Some("refresh".into()), Some(0), vec![]))
            .unwrap();

        let provider = GoogleProvider::new(config).unwrap();
        assert!(provider.is_authenticated());
        assert!(provider.needs_reauth());
    }

    #[tokio::test]
    async fn create_without_tokens_fails_fast() {
        let dir = tempfile::tempdir().unwrap();
        let provider = GoogleProvider::new(test_config(&dir)).unwrap();
        let day = chrono::NaiveDate::from_ymd_opt(2025, 1, 1).unwrap();
        let event = CalendarEvent::new(
            "x",
            calforge_core::EventTime::AllDay(day),
            calforge_core::EventTime::AllDay(day.succ_opt().unwrap()),
        );

        let err = provider.create_event(&event).await.unwrap_err();
        assert_eq!(err.code(), crate::error::ProviderErrorCode::NotAuthenticated);
        assert!(err.affects_batch());
        assert_eq!(err.hint(), Some("run 'calforge auth' to sign in again"));
    }
}
