use chrono::{DateTime, Duration, Utc};

/// "45m", "1h 30m", "2h".
pub fn format_duration(minutes: u32) -> String {
    if minutes < 60 {
        return format!("{}m", minutes);
    }

    let hours = minutes / 60;
    let rest = minutes % 60;
    if rest > 0 {
        format!("{}h {}m", hours, rest)
    } else {
        format!("{}h", hours)
    }
}

/// Countdown display, "MM:SS". Minutes are not wrapped into hours.
pub fn format_clock(seconds: u32) -> String {
    format!("{:02}:{:02}", seconds / 60, seconds % 60)
}

pub fn is_overdue(deadline: DateTime<Utc>, now: DateTime<Utc>) -> bool {
    now > deadline
}

/// Due in the future but within `hours` from `now`.
pub fn is_due_soon(deadline: DateTime<Utc>, hours: i64, now: DateTime<Utc>) -> bool {
    deadline > now && deadline < now + Duration::hours(hours)
}

pub fn priority_label(score: f64) -> &'static str {
    if score >= 8.0 {
        "High"
    } else if score >= 6.0 {
        "Medium"
    } else if score >= 4.0 {
        "Low"
    } else {
        "Very Low"
    }
}
