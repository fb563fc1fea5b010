//! Client configuration.
//!
//! All settings live in a single `config.toml` file at
//! `~/.config/calforge/config.toml` by default. Every key is optional.
//!
//! ```toml
//! timezone = "Europe/Paris"
//! calendar_id = "primary"
//!
//! [google]
//! credentials_file = "credentials.json"
//! client_id = "env::GOOGLE_CLIENT_ID"
//! client_secret = "pass::google/calforge"
//! request_delay_ms = 100
//! ```
//!
//! `client_id`/`client_secret` take precedence over `credentials_file` and
//! support the secret references described in [`crate::secret`].

use std::path::{Path, PathBuf};

use calforge_core::Zone;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::{ClientError, ClientResult};

/// Configuration for the calforge client.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ClientConfig {
    /// Zone templates are interpreted in: `"local"` or an IANA name.
    pub timezone: String,

    /// Calendar events are created in.
    pub calendar_id: String,

    /// Include descriptions in summaries.
    pub verbose: bool,

    /// Google Calendar settings.
    pub google: GoogleSettings,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            timezone: "local".to_string(),
            calendar_id: "primary".to_string(),
            verbose: false,
            google: GoogleSettings::default(),
        }
    }
}

/// Google Calendar settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct GoogleSettings {
    /// Google Cloud Console OAuth client JSON.
    pub credentials_file: PathBuf,

    /// OAuth client ID (supports `pass::` and `env::` prefixes).
    pub client_id: Option<String>,

    /// OAuth client secret (supports `pass::` and `env::` prefixes).
    pub client_secret: Option<String>,

    /// Where tokens are stored; `<config_dir>/calforge/token.json` if unset.
    pub token_path: Option<PathBuf>,

    /// HTTP timeout in seconds.
    pub timeout_secs: u64,

    /// Pause between event insertions, in milliseconds.
    pub request_delay_ms: u64,

    /// Ports tried for the OAuth redirect listener.
    pub loopback_port_range: (u16, u16),
}

impl Default for GoogleSettings {
    fn default() -> Self {
        Self {
            credentials_file: PathBuf::from("credentials.json"),
            client_id: None,
            client_secret: None,
            token_path: None,
            timeout_secs: 30,
            request_delay_ms: 100,
            loopback_port_range: (8080, 8090),
        }
    }
}

impl ClientConfig {
    /// Loads configuration from the default path, falling back to defaults
    /// when the file does not exist.
    pub fn load() -> ClientResult<Self> {
        let path = Self::default_path();
        if path.exists() {
            Self::load_from(&path)
        } else {
            debug!("no config file at {}, using defaults", path.display());
            Ok(Self::default())
        }
    }

    /// Loads configuration from a specific path.
    pub fn load_from(path: &Path) -> ClientResult<Self> {
        let content = std::fs::read_to_string(path).map_err(|e| {
            ClientError::Config(format!("failed to read {}: {}", path.display(), e))
        })?;
        let config = toml::from_str(&content).map_err(|e| {
            ClientError::Config(format!("failed to parse {}: {}", path.display(), e))
        })?;
        debug!("loaded config from {}", path.display());
        Ok(config)
    }

    /// Returns the default configuration file path.
    pub fn default_path() -> PathBuf {
        Self::default_config_dir().join("config.toml")
    }

    /// Returns the default configuration directory.
    pub fn default_config_dir() -> PathBuf {
        dirs::config_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join("calforge")
    }

    /// Checks the settings that can be verified without network access.
    pub fn validate(&self) -> ClientResult<()> {
        Zone::from_name(&self.timezone)
            .map_err(|e| ClientError::Config(e.to_string()))?;

        if self.calendar_id.trim().is_empty() {
            return Err(ClientError::Config("calendar_id must not be empty".to_string()));
        }

        let google = &self.google;
        if google.timeout_secs == 0 {
            return Err(ClientError::Config(
                "google.timeout_secs must be greater than zero".to_string(),
            ));
        }
        let (start, end) = google.loopback_port_range;
        if start == 0 || start > end {
            return Err(ClientError::Config(format!(
                "google.loopback_port_range {}-{} is not a valid range",
                start, end
            )));
        }

        Ok(())
    }
}

#[cfg(feature = "google")]
impl ClientConfig {
    /// Builds the provider configuration, resolving credentials.
    pub fn google_config(&self) -> ClientResult<calforge_providers::google::GoogleConfig> {
        use std::time::Duration;

        use calforge_providers::google::GoogleConfig;

        let credentials = self.google.resolve_credentials()?;
        credentials
            .validate()
            .map_err(|e| ClientError::Config(format!("invalid Google credentials: {}", e)))?;

        let (start, end) = self.google.loopback_port_range;
        let mut config = GoogleConfig::new(credentials)
            .with_calendar_id(&self.calendar_id)
            .with_timeout(Duration::from_secs(self.google.timeout_secs))
            .with_request_delay(Duration::from_millis(self.google.request_delay_ms))
            .with_loopback_port_range(start, end);

        if let Some(ref path) = self.google.token_path {
            config = config.with_token_path(path);
        }

        Ok(config)
    }
}

#[cfg(feature = "google")]
impl GoogleSettings {
    /// Resolves OAuth credentials.
    ///
    /// Inline `client_id` + `client_secret` win over `credentials_file`;
    /// setting only one of them is an error.
    pub fn resolve_credentials(
        &self,
    ) -> ClientResult<calforge_providers::google::OAuthCredentials> {
        use calforge_providers::google::OAuthCredentials;

        match (self.client_id.as_deref(), self.client_secret.as_deref()) {
            (Some(id), Some(secret)) => {
                let id = crate::secret::resolve(id)
                    .map_err(|e| ClientError::Config(format!("failed to resolve client_id: {}", e)))?;
                let secret = crate::secret::resolve(secret).map_err(|e| {
                    ClientError::Config(format!("failed to resolve client_secret: {}", e))
                })?;
                Ok(OAuthCredentials::new(id, secret))
            }
            (None, None) => {
                if !self.credentials_file.exists() {
                    return Err(ClientError::Config(format!(
                        "Google credentials not found. Download the OAuth client JSON from \
                         the Google Cloud Console and save it as {}, or set client_id and \
                         client_secret under [google] in {}",
                        self.credentials_file.display(),
                        ClientConfig::default_path().display()
                    )));
                }
                OAuthCredentials::from_file(&self.credentials_file).map_err(ClientError::Config)
            }
            (Some(_), None) => Err(ClientError::Config(
                "client_secret is missing from the [google] section".to_string(),
            )),
            (None, Some(_)) => Err(ClientError::Config(
                "client_id is missing from the [google] section".to_string(),
            )),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults() {
        let config = ClientConfig::default();
        assert_eq!(config.timezone, "local");
        assert_eq!(config.calendar_id, "primary");
        assert!(!config.verbose);
        assert_eq!(config.google.credentials_file, PathBuf::from("credentials.json"));
        assert_eq!(config.google.timeout_secs, 30);
        assert_eq!(config.google.request_delay_ms, 100);
        assert_eq!(config.google.loopback_port_range, (8080, 8090));
        assert!(config.validate().is_ok());
    }

    #[test]
    fn partial_file_keeps_defaults() {
        let config: ClientConfig = toml::from_str(
            r#"
timezone = "America/New_York"

[google]
request_delay_ms = 250
"#,
        )
        .unwrap();
        assert_eq!(config.timezone, "America/New_York");
        assert_eq!(config.calendar_id, "primary");
        assert_eq!(config.google.request_delay_ms, 250);
        assert_eq!(config.google.timeout_secs, 30);
    }

    #[test]
    fn load_from_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        std::fs::write(&path, "calendar_id = \"team@group.calendar.google.com\"\nverbose = true\n")
            .unwrap();

        let config = ClientConfig::load_from(&path).unwrap();
        assert_eq!(config.calendar_id, "team@group.calendar.google.com");
        assert!(config.verbose);
    }

    #[test]
    fn load_errors_name_the_file() {
        let dir = tempfile::tempdir().unwrap();
        let missing = dir.path().join("missing.toml");
        let err = ClientConfig::load_from(&missing).unwrap_err();
        assert!(err.to_string().contains("failed to read"));

        let broken = dir.path().join("broken.toml");
        std::fs::write(&broken, "timezone = [").unwrap();
        let err = ClientConfig::load_from(&broken).unwrap_err();
        assert!(err.to_string().contains("failed to parse"));
    }

    #[test]
    fn dump_round_trips() {
        let mut config = ClientConfig::default();
        config.google.client_id = Some("env::GOOGLE_CLIENT_ID".to_string());
        let text = toml::to_string_pretty(&config).unwrap();
        let back: ClientConfig = toml::from_str(&text).unwrap();
        assert_eq!(back.google.client_id.as_deref(), Some("env::GOOGLE_CLIENT_ID"));
        assert_eq!(back.google.loopback_port_range, (8080, 8090));
    }

    #[test]
    fn validation_failures() {
        let mut config = ClientConfig {
            timezone: "Mars/Olympus_Mons".to_string(),
            ..Default::default()
        };
        assert!(config.validate().is_err());

        config.timezone = "UTC".to_string();
        config.calendar_id = "  ".to_string();
        assert!(config.validate().is_err());

        config.calendar_id = "primary".to_string();
        config.google.loopback_port_range = (9000, 8000);
        assert!(config.validate().is_err());

        config.google.loopback_port_range = (9000, 9000);
        config.google.timeout_secs = 0;
        assert!(config.validate().is_err());
    }

    #[cfg(feature = "google")]
    mod google {
        use super::*;

        #[test]
        fn inline_credentials_win() {
            let mut config = ClientConfig::default();
            config.google.client_id = Some("inline.apps.googleusercontent.com".to_string());
            config.google.client_secret = Some("inline-secret".to_string());
            config.google.credentials_file = PathBuf::from("/nonexistent/credentials.json");

            let creds = config.google.resolve_credentials().unwrap();
            assert_eq!(creds.client_id, "inline.apps.googleusercontent.com");
            assert_eq!(creds.client_secret, "inline-secret");
        }

        #[test]
        fn env_references_are_resolved() {
            unsafe {
                std::env::set_var("_CALFORGE_CFG_ID", "env.apps.googleusercontent.com");
                std::env::set_var("_CALFORGE_CFG_SECRET", "env-secret");
            }
            let config: ClientConfig = toml::from_str(
                r#"
[google]
client_id = "env::_CALFORGE_CFG_ID"
client_secret = "env::_CALFORGE_CFG_SECRET"
"#,
            )
            .unwrap();
            let creds = config.google.resolve_credentials().unwrap();
            assert_eq!(creds.client_id, "env.apps.googleusercontent.com");
            assert_eq!(creds.client_secret, "env-secret");
            unsafe {
                std::env::remove_var("_CALFORGE_CFG_ID");
                std::env::remove_var("_CALFORGE_CFG_SECRET");
            }
        }

        #[test]
        fn credentials_file_fallback() {
            let dir = tempfile::tempdir().unwrap();
            let path = dir.path().join("credentials.json");
            std::fs::write(
                &path,
                r#"{"installed": {"client_id": "file.apps.googleusercontent.com", "client_secret": "file-secret"}}"#,
            )
            .unwrap();

            let mut config = ClientConfig::default();
            config.google.credentials_file = path;
            let creds = config.google.resolve_credentials().unwrap();
            assert_eq!(creds.client_id, "file.apps.googleusercontent.com");
        }

        #[test]
        fn missing_credentials() {
            let mut config = ClientConfig::default();
            config.google.credentials_file = PathBuf::from("/nonexistent/credentials.json");
            let err = config.google.resolve_credentials().unwrap_err();
            assert!(err.to_string().contains("credentials not found"));

            config.google.client_id = Some("only-id.apps.googleusercontent.com".to_string());
            let err = config.google.resolve_credentials().unwrap_err();
            assert!(err.to_string().contains("client_secret"));
        }

        #[test]
        fn provider_config_carries_settings() {
            let dir = tempfile::tempdir().unwrap();
            let mut config = ClientConfig {
                calendar_id: "work".to_string(),
                ..Default::default()
            };
            config.google.client_id = Some("x.apps.googleusercontent.com".to_string());
            config.google.client_secret = Some("y".to_string());
            config.google.token_path = Some(dir.path().join("token.json"));
            config.google.request_delay_ms = 0;
            config.google.loopback_port_range = (9100, 9105);

            let google = config.google_config().unwrap();
            assert_eq!(google.calendar_id, "work");
            assert_eq!(google.token_path, dir.path().join("token.json"));
            assert_eq!(google.request_delay, std::time::Duration::ZERO);
            assert_eq!(google.loopback_port_range, (9100, 9105));
            assert_eq!(google.timeout, std::time::Duration::from_secs(30));
        }

        #[test]
        fn malformed_client_id_is_rejected() {
            let mut config = ClientConfig::default();
            config.google.client_id = Some("not-a-google-id".to_string());
            config.google.client_secret = Some("secret".to_string());
            let err = config.google_config().unwrap_err();
            assert!(err.to_string().contains("invalid Google credentials"));
        }
    }
}
