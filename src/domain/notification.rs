use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// A pending task due tomorrow, from `GET /notifications/`.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Notification {
    pub task_id: i64,
    pub task_title: String,
    pub subject_name: String,
    pub due_date: DateTime<Utc>,
    pub subject_id: i64,
}
