//! Formatted output helpers for CLI commands.

use std::time::Duration;

/// Formats a duration the way it is accepted on the command line (e.g. "1m 30s").
#[must_use]
pub fn format_duration(d: Duration) -> String {
    humantime::format_duration(d).to_string()
}

/// One line of a health report.
#[must_use]
pub fn status_line(name: &str, healthy: bool) -> String {
    if healthy {
        format!("✓ {name} Healthy")
    } else {
        format!("✗ {name} Unhealthy")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn format_duration_displays_seconds() {
        assert_eq!(format_duration(Duration::from_secs(60)), "1m");
        assert_eq!(format_duration(Duration::from_secs(45)), "45s");
    }

    #[test]
    fn format_duration_displays_compound() {
        assert_eq!(format_duration(Duration::from_secs(3690)), "1h 1m 30s");
    }

    #[test]
    fn format_duration_round_trips_through_parse() {
        let d = Duration::from_millis(1250);
        assert_eq!(
            crate::commands::health::parse_duration(&format_duration(d)),
            Some(d)
        );
    }

    #[test]
    fn status_line_marks_state() {
        assert_eq!(status_line("Warden", true), "✓ Warden Healthy");
        assert_eq!(status_line("Herald", false), "✗ Herald Unhealthy");
    }
}
