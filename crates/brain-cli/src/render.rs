//! Plain-text presentation helpers.

use chrono::{DateTime, Utc};

use brain_types::parse_timestamp;

/// Scores above this are shown as a strong match.
pub const HIGH_SCORE: f64 = 0.7;

/// Scores above this (and up to [`HIGH_SCORE`]) are a fair match.
pub const MEDIUM_SCORE: f64 = 0.5;

/// Human-friendly age of a persisted timestamp relative to `now`.
///
/// Unparsable input is returned unchanged. Future timestamps read as
/// "just now".
pub fn relative_time(raw: &str, now: DateTime<Utc>) -> String {
    let Some(ts) = parse_timestamp(raw) else {
        return raw.to_string();
    };

    let elapsed = now.signed_duration_since(ts);
    let seconds = elapsed.num_seconds();
    let days = elapsed.num_days();

    if seconds < 60 {
        "just now".to_string()
    } else if seconds < 3600 {
        format!("{} min ago", seconds / 60)
    } else if days == 0 {
        let hours = seconds / 3600;
        format!("{} hour{} ago", hours, if hours > 1 { "s" } else { "" })
    } else if days == 1 {
        "yesterday".to_string()
    } else if days < 7 {
        format!("{days} days ago")
    } else {
        ts.format("%b %d, %Y").to_string()
    }
}

/// First `max_chars` characters of `text`, with "..." appended when cut.
pub fn truncate_preview(text: &str, max_chars: usize) -> String {
    match text.char_indices().nth(max_chars) {
        Some((cut, _)) => format!("{}...", &text[..cut]),
        None => text.to_string(),
    }
}

/// Qualitative label for a final score.
pub fn score_label(score: f64) -> &'static str {
    if score > HIGH_SCORE {
        "strong"
    } else if score > MEDIUM_SCORE {
        "fair"
    } else {
        "weak"
    }
}
