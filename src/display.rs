//! Human-readable rendering of stored survey values.

use chrono::{Local, NaiveDateTime, TimeZone as _};

/// Shown wherever a field has no value.
pub const NOT_PROVIDED: &str = "[Not Provided]";

/// Display format for timestamp fields, also accepted as input.
pub const DISPLAY_TIME_FORMAT: &str = "%Y-%m-%d %H:%M";

/// Format Unix seconds as `YYYY-MM-DD HH:MM` in local time.
pub fn format_timestamp(unix_seconds: i64) -> Option<String> {
    Local
        .timestamp_opt(unix_seconds, 0)
        .single()
        .map(|time| time.format(DISPLAY_TIME_FORMAT).to_string())
}

/// Parse a `YYYY-MM-DD HH:MM` local time back into Unix seconds.
///
/// Ambiguous local times (DST fall-back) resolve to the earlier instant.
pub fn parse_display_time(text: &str) -> Option<i64> {
    let naive = NaiveDateTime::parse_from_str(text.trim(), DISPLAY_TIME_FORMAT).ok()?;
    Local
        .from_local_datetime(&naive)
        .earliest()
        .map(|time| time.timestamp())
}

/// Render an optional text field.
pub fn render_text(value: Option<&str>) -> String {
    match value.map(str::trim) {
        Some(text) if !text.is_empty() => text.to_string(),
        _ => NOT_PROVIDED.to_string(),
    }
}

/// Render an optional timestamp field.
pub fn render_timestamp(value: Option<i64>) -> String {
    value
        .and_then(format_timestamp)
        .unwrap_or_else(|| NOT_PROVIDED.to_string())
}

/// Render an optional flag.
pub fn render_flag(value: Option<bool>) -> String {
    match value {
        Some(true) => "Yes".into(),
        Some(false) => "No".into(),
        None => NOT_PROVIDED.into(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn timestamp_round_trips_through_display_format() {
        let original = 1_741_722_179_i64;
        let truncated = original - original.rem_euclid(60);

        let rendered = format_timestamp(original).expect("timestamp in range");
        assert_eq!(rendered.len(), "YYYY-MM-DD HH:MM".len());
        assert_eq!(parse_display_time(&rendered), Some(truncated));
    }

    #[test]
    fn parse_rejects_other_formats() {
        assert_eq!(parse_display_time("03/11/2025 2:42 PM"), None);
        assert_eq!(parse_display_time(""), None);
    }

    #[test]
    fn absent_values_render_as_not_provided() {
        assert_eq!(render_text(None), NOT_PROVIDED);
        assert_eq!(render_text(Some("   ")), NOT_PROVIDED);
        assert_eq!(render_timestamp(None), NOT_PROVIDED);
        assert_eq!(render_flag(None), NOT_PROVIDED);
        assert_eq!(render_text(Some("Main St")), "Main St");
        assert_eq!(render_flag(Some(true)), "Yes");
    }
}
