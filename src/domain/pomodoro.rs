use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Body of `POST /pomodoro/log`.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct PomodoroLog {
    pub start_time: DateTime<Utc>,
    pub end_time: DateTime<Utc>,
    /// Whole minutes, rounded up.
    pub duration: u32,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub task_id: Option<i64>,
}

impl PomodoroLog {
    pub fn ending_at(end_time: DateTime<Utc>, focus_seconds: u32, task_id: Option<i64>) -> Self {
        Self {
            start_time: end_time - chrono::Duration::seconds(i64::from(focus_seconds)),
            end_time,
            duration: focus_seconds.div_ceil(60),
            task_id,
        }
    }
}
