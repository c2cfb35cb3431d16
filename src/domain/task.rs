use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::subject::Subject;

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Task {
    pub id: i64,
    pub title: String,
    pub status: TaskStatus,
    pub estimated_time: u32, // minutes
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub predicted_time: Option<u32>,
    #[serde(default)]
    pub deadline: Option<DateTime<Utc>>,
    #[serde(default)]
    pub task_type: TaskType,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub subject_id: Option<i64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub subject: Option<Subject>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub created_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum TaskStatus {
    Pending,
    InProgress,
    Complete,
    Cancelled,
}

#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum TaskType {
    Reading,
    Assignment,
    Practice,
    Exam,
    Project,
    Review,
    #[default]
    General,
}

impl TaskStatus {
    pub const BOARD: [TaskStatus; 3] = [
        TaskStatus::Pending,
        TaskStatus::InProgress,
        TaskStatus::Complete,
    ];

    /// Complete is the only status that needs extra input before a task may enter it.
    pub fn is_terminal(self) -> bool {
        self == TaskStatus::Complete
    }

    pub fn as_str(self) -> &'static str {
        match self {
            TaskStatus::Pending => "pending",
            TaskStatus::InProgress => "in_progress",
            TaskStatus::Complete => "complete",
            TaskStatus::Cancelled => "cancelled",
        }
    }
}

impl std::fmt::Display for TaskStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for TaskStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().replace('-', "_").as_str() {
            "pending" | "todo" => Ok(TaskStatus::Pending),
            "in_progress" | "doing" => Ok(TaskStatus::InProgress),
            "complete" | "done" => Ok(TaskStatus::Complete),
            "cancelled" => Ok(TaskStatus::Cancelled),
            other => Err(format!("Unknown task status: {}", other)),
        }
    }
}

impl Task {
    pub fn new(id: i64, title: impl Into<String>, estimated_time: u32) -> Self {
        Self {
            id,
            title: title.into(),
            status: TaskStatus::Pending,
            estimated_time,
            predicted_time: None,
            deadline: None,
            task_type: TaskType::General,
            subject_id: None,
            subject: None,
            created_at: None,
        }
    }

    pub fn with_status(mut self, status: TaskStatus) -> Self {
        self.status = status;
        self
    }

    pub fn update_status(&mut self, status: TaskStatus) {
        self.status = status;
    }

    pub fn is_complete(&self) -> bool {
        self.status == TaskStatus::Complete
    }

    pub fn is_overdue(&self) -> bool {
        self.is_overdue_at(Utc::now())
    }

    pub fn is_overdue_at(&self, now: DateTime<Utc>) -> bool {
        match self.deadline {
            Some(due) => due < now && !self.is_complete(),
            None => false,
        }
    }
}

/// Body of `POST /tasks/{subject_id}`.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct NewTask {
    pub title: String,
    pub estimated_time: u32,
    pub deadline: Option<DateTime<Utc>>,
    #[serde(default)]
    pub task_type: TaskType,
}

/// Body of `PATCH /tasks/{id}/status`.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
pub struct TaskStatusUpdate {
    pub status: TaskStatus,
}

/// Body of `POST /tasks/{id}/reschedule`.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
pub struct RescheduleRequest {
    pub days_from_now: i64,
}
