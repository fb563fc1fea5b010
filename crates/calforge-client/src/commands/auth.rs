//! `calforge auth`: run the Google consent flow.

use calforge_providers::CalendarProvider;
use calforge_providers::google::GoogleProvider;
use tracing::info;

use crate::config::ClientConfig;
use crate::error::ClientResult;

pub async fn run(config: &ClientConfig, force: bool) -> ClientResult<()> {
    let provider = GoogleProvider::new(config.google_config()?)?;

    if provider.is_authenticated() && !provider.needs_reauth() && !force {
        println!("Already authenticated with Google Calendar.");
        println!("Use --force to re-authenticate.");
        return Ok(());
    }

    println!("Starting Google Calendar authentication...");
    println!();
    println!("A browser window will open for you to authorize access.");
    println!("If the browser doesn't open, check the terminal for a URL to copy.");
    println!();

    provider.ensure_authorized(force).await?;

    info!("Google authentication successful");
    println!("Authentication successful!");
    println!("Tokens saved to {}", provider.config().token_path.display());
    Ok(())
}
