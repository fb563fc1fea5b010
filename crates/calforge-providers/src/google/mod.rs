//! Google Calendar backend.
//!
//! # Authentication Flow
//!
//! 1. The user supplies their own OAuth client ID/secret (Google requires it)
//! 2. A loopback listener is bound on the first free port of the configured range
//! 3. The browser opens Google's consent page with a PKCE challenge
//! 4. Google redirects to the loopback listener with an authorization code
//! 5. The code is exchanged for access and refresh tokens, which are persisted
//!
//! # Example
//!
//! ```ignore
//! use calforge_providers::google::{GoogleConfig, GoogleProvider, OAuthCredentials};
//! use calforge_providers::create_events;
//!
//! let credentials = OAuthCredentials::from_file("credentials.json")?;
//! let provider = GoogleProvider::new(GoogleConfig::new(credentials))?;
//! provider.ensure_authorized(false).await?;
//!
//! let delay = provider.config().request_delay;
//! let results = create_events(&provider, &events, delay, |i, n, r| {
//!     println!("[{i}/{n}] {}", r.name);
//! })
//! .await;
//! ```

mod client;
mod config;
mod oauth;
mod provider;
mod tokens;

pub use client::{CalendarListEntry, EventDateTime, EventReminders, EventRequest, ReminderOverride};
pub use config::{GoogleConfig, OAuthCredentials};
pub use oauth::{OAuthClient, PkceFlow};
pub use provider::GoogleProvider;
pub use tokens::{TokenInfo, TokenStorage};
