//! Display helpers for CLI output: relative times, truncation, color.

/// Relative-time helper: seconds -> human string.
pub fn relative_time(seconds: i64) -> String {
    let s = seconds.unsigned_abs();
    if s < 60 {
        "just now".to_string()
    } else if s < 3600 {
        format!("{}m ago", s / 60)
    } else if s < 86400 {
        format!("{}h ago", s / 3600)
    } else if s < 86400 * 30 {
        format!("{}d ago", s / 86400)
    } else {
        format!("{}w ago", s / (86400 * 7))
    }
}

/// Right-truncate to `max_chars` characters, appending `…` if truncated.
pub fn truncate(text: &str, max_chars: usize) -> String {
    if text.chars().count() <= max_chars {
        return text.to_string();
    }
    let kept: String = text.chars().take(max_chars.saturating_sub(1)).collect();
    format!("{kept}\u{2026}")
}

/// Resolve --color flag to bool.
pub fn resolve_color(color: &str) -> bool {
    use std::io::IsTerminal;
    match color {
        "always" => true,
        "never" => false,
        _ => std::io::stdout().is_terminal(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn relative_time_just_now() {
        assert_eq!(relative_time(30), "just now");
        assert_eq!(relative_time(-5), "just now");
    }

    #[test]
    fn relative_time_minutes() {
        assert_eq!(relative_time(180), "3m ago");
    }

    #[test]
    fn relative_time_hours() {
        assert_eq!(relative_time(7200), "2h ago");
    }

    #[test]
    fn relative_time_days_and_weeks() {
        assert_eq!(relative_time(86400 * 3), "3d ago");
        assert_eq!(relative_time(86400 * 70), "10w ago");
    }

    #[test]
    fn truncate_short() {
        assert_eq!(truncate("api", 10), "api");
        assert_eq!(truncate("exactly-10", 10), "exactly-10");
    }

    #[test]
    fn truncate_long() {
        let result = truncate("backend and frontend", 10);
        assert_eq!(result.chars().count(), 10);
        assert!(result.ends_with('\u{2026}'));
        assert!(result.starts_with("backend a"));
    }

    #[test]
    fn truncate_counts_chars_not_bytes() {
        assert_eq!(truncate("ääää", 4), "ääää");
        assert_eq!(truncate("äääää", 4), "äää\u{2026}");
    }

    #[test]
    fn explicit_color_flags() {
        assert!(resolve_color("always"));
        assert!(!resolve_color("never"));
    }
}
