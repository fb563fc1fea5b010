//! Plain-text listing of converted events.

use std::fmt::Write;

use crate::event::CalendarEvent;
use crate::time::EventTime;

const DESCRIPTION_LIMIT: usize = 100;

/// Renders a numbered summary of `events`.
///
/// In verbose mode descriptions are included, cut to 100 characters.
pub fn render_summary(events: &[CalendarEvent], verbose: bool) -> String {
    let mut out = String::from("Events to be created:\n-------------------\n");

    for (i, event) in events.iter().enumerate() {
        let when = match &event.start {
            EventTime::DateTime(dt) => dt.format("%a, %b %-d %Y %-I:%M %p").to_string(),
            EventTime::AllDay(date) => format!("{} (All day)", date.format("%a, %b %-d %Y")),
        };

        let _ = writeln!(out, "{:3}. {}", i + 1, event.name);
        let _ = writeln!(out, "     Date: {when}");

        if !event.location.is_empty() {
            let _ = writeln!(out, "     Loc: {}", event.location);
        }

        if let Some(rule) = &event.recurrence {
            let _ = write!(out, "     Repeats: {}", rule.frequency.as_str().to_lowercase());
            if let Some(until) = rule.until {
                let _ = write!(out, " until {}", until.format("%b %-d, %Y"));
            }
            out.push('\n');
        }

        if verbose && !event.description.is_empty() {
            let _ = writeln!(out, "     Desc: {}", truncate(&event.description));
        }

        out.push('\n');
    }

    out
}

fn truncate(text: &str) -> String {
    match text.char_indices().nth(DESCRIPTION_LIMIT) {
        Some((idx, _)) => format!("{}...", &text[..idx]),
        None => text.to_string(),
    }
}
