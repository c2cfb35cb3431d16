use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::task::Task;

/// A logged, completed study session as returned by `POST /sessions/{task_id}/complete`.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct StudySession {
    pub id: i64,
    pub task_id: i64,
    pub user_id: i64,
    pub actual_duration: u32,
    pub user_difficulty_rating: u8,
    pub completed_at: DateTime<Utc>,
    pub task: Task,
}

/// Body of `POST /sessions/{task_id}/complete`.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub struct SessionCompletion {
    pub actual_duration: u32,
    pub user_difficulty_rating: u8,
}

pub const MIN_DIFFICULTY: u8 = 1;
pub const MAX_DIFFICULTY: u8 = 5;
pub const DEFAULT_DIFFICULTY: u8 = 3;
