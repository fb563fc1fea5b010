//! `calforge add`: create template events in Google Calendar.

use calforge_core::render_summary;
use calforge_providers::EventResult;

use crate::cli::TemplateArgs;
use crate::config::ClientConfig;
use crate::error::ClientResult;

/// Parses the template, then prints it (`dry_run`) or uploads it.
pub async fn run(config: &ClientConfig, args: &TemplateArgs, dry_run: bool) -> ClientResult<()> {
    let events = super::load_events(config, args)?;
    if events.is_empty() {
        println!("No events found in {}", args.input.display());
        return Ok(());
    }

    print!("{}", render_summary(&events, config.verbose));

    if dry_run {
        println!();
        println!("Dry run: {} events would be created in '{}'.", events.len(), config.calendar_id);
        return Ok(());
    }

    upload(config, &events).await
}

#[cfg(feature = "google")]
async fn upload(config: &ClientConfig, events: &[calforge_core::CalendarEvent]) -> ClientResult<()> {
    use calforge_providers::create_events;
    use calforge_providers::google::GoogleProvider;

    let provider = GoogleProvider::new(config.google_config()?)?;
    provider.ensure_authorized(false).await?;

    println!();
    println!("Creating {} events in '{}'...", events.len(), config.calendar_id);

    let delay = provider.config().request_delay;
    let results = create_events(&provider, events, delay, |current, total, result| {
        println!("{}", progress_line(current, total, result));
    })
    .await;

    println!();
    println!("{}", completion_line(&results));
    for line in failure_advice(&results) {
        println!("{line}");
    }
    Ok(())
}

#[cfg(not(feature = "google"))]
async fn upload(_config: &ClientConfig, _events: &[calforge_core::CalendarEvent]) -> ClientResult<()> {
    Err(crate::error::ClientError::Config(
        "built without Google Calendar support, use --dry-run or export".to_string(),
    ))
}

/// Formats one line of batch progress.
pub(crate) fn progress_line(current: usize, total: usize, result: &EventResult) -> String {
    match (&result.outcome, result.link()) {
        (Ok(_), Some(link)) => format!("[OK] [{current}/{total}] {} ({link})", result.name),
        (Ok(_), None) => format!("[OK] [{current}/{total}] {}", result.name),
        (Err(e), _) if e.is_retryable() => {
            format!("[ERR] [{current}/{total}] {}: {e} (retryable)", result.name)
        }
        (Err(e), _) => format!("[ERR] [{current}/{total}] {}: {e}", result.name),
    }
}

pub(crate) fn completion_line(results: &[EventResult]) -> String {
    let created = results.iter().filter(|r| r.is_success()).count();
    format!(
        "Done! Created {} events ({} failed)",
        created,
        results.len() - created
    )
}

/// Follow-up lines for a batch with failures: how many were transient, and
/// one hint per distinct cause the user can act on.
pub(crate) fn failure_advice(results: &[EventResult]) -> Vec<String> {
    let errors: Vec<_> = results.iter().filter_map(|r| r.outcome.as_ref().err()).collect();
    let mut lines = Vec::new();

    let retryable = errors.iter().filter(|e| e.is_retryable()).count();
    if retryable > 0 {
        lines.push(format!(
            "{retryable} failed events hit transient errors and can be retried"
        ));
    }

    let mut hints: Vec<&str> = Vec::new();
    for hint in errors.iter().filter_map(|e| e.hint()) {
        if !hints.contains(&hint) {
            hints.push(hint);
        }
    }
    if errors.iter().any(|e| e.affects_batch()) {
        lines.push("The remaining events cannot succeed until this is fixed.".to_string());
    }
    lines.extend(hints.into_iter().map(|h| format!("hint: {h}")));
    lines
}
