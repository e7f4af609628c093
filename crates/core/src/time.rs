//! Minute formatting.

/// Render minutes as `"<h> hr <m> min"`.
pub fn format_minutes(minutes: u64) -> String {
    format!("{} hr {} min", minutes / 60, minutes % 60)
}
