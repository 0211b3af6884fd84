use chrono::{DateTime, Utc};

/// Returns the current timestamp in RFC 3339 format (ISO 8601).
///
/// This is what gets persisted in the installation state file, so it has to
/// stay machine-parsable across runs while remaining readable to anyone who
/// opens the file.
pub fn current_timestamp() -> String {
    Utc::now().to_rfc3339()
}

/// Converts an RFC 3339 timestamp into a relative description like
/// "2 hours ago", used when reporting that an install was skipped.
///
/// Returns `None` when the stored timestamp does not parse, which can happen
/// if a human edited the state file.
pub fn time_since(timestamp: &str) -> Option<String> {
    DateTime::parse_from_rfc3339(timestamp)
        .map(|dt| {
            let duration = Utc::now().signed_duration_since(dt.with_timezone(&Utc));
            if duration.num_days() > 0 {
                format!("{} days ago", duration.num_days())
            } else if duration.num_hours() > 0 {
                format!("{} hours ago", duration.num_hours())
            } else if duration.num_minutes() > 0 {
                format!("{} minutes ago", duration.num_minutes())
            } else {
                "just now".to_string()
            }
        })
        .ok()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn current_timestamp_round_trips_through_parser() {
        let stamp = current_timestamp();
        assert!(DateTime::parse_from_rfc3339(&stamp).is_ok());
    }

    #[test]
    fn fresh_timestamps_read_as_just_now() {
        let stamp = current_timestamp();
        assert_eq!(time_since(&stamp).as_deref(), Some("just now"));
    }

    #[test]
    fn garbage_timestamps_yield_none() {
        assert_eq!(time_since("yesterday-ish"), None);
    }
}
