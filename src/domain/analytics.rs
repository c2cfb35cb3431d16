use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use super::study_session::StudySession;

/// Response of `GET /analytics/summary`.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct AnalyticsSummary {
    #[serde(default)]
    pub subjects: Vec<SubjectAnalytics>,
    #[serde(default)]
    pub daily: DailyAnalytics,
    #[serde(default)]
    pub weekly: WeeklyStreak,
    #[serde(default)]
    pub performance: PerformanceMetrics,
    #[serde(default)]
    pub task_distribution: Vec<TaskDistribution>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct SubjectAnalytics {
    pub subject_name: String,
    pub total_minutes_studied: u32,
    #[serde(default)]
    pub sessions_count: u32,
    #[serde(default)]
    pub avg_session_duration: f64,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct DailyAnalytics {
    pub tasks_planned: u32,
    pub tasks_completed: u32,
    #[serde(default)]
    pub completion_rate: f64,
    #[serde(default)]
    pub focus_time: u32,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct WeeklyStreak {
    pub streak_days: u32,
    #[serde(default)]
    pub longest_streak: u32,
    /// Minutes studied per ISO date, e.g. `{"2025-09-01": 120}`.
    #[serde(default)]
    pub daily_summary: BTreeMap<String, u32>,
    #[serde(default)]
    pub weekly_goal: u32,
    #[serde(default)]
    pub total_weekly_minutes: u32,
}

impl WeeklyStreak {
    /// Percentage of the weekly goal reached, capped at 100.
    pub fn goal_progress(&self) -> f64 {
        if self.weekly_goal == 0 {
            return 0.0;
        }
        (f64::from(self.total_weekly_minutes) / f64::from(self.weekly_goal) * 100.0).min(100.0)
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct PerformanceMetrics {
    pub productivity_score: u32,
    pub focus_sessions: u32,
    pub average_session_quality: f64,
    pub improvement_trend: f64,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct TaskDistribution {
    pub subject_name: String,
    pub task_count: u32,
}

impl AnalyticsSummary {
    pub fn total_minutes_studied(&self) -> u32 {
        self.subjects.iter().map(|s| s.total_minutes_studied).sum()
    }
}

/// Response of `GET /history/summary`.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct HistorySummary {
    pub stats: HistoryStats,
    #[serde(default)]
    pub timeline_data: Vec<TimelinePoint>,
    #[serde(default)]
    pub subject_chart_data: Vec<SubjectDistribution>,
    #[serde(default)]
    pub difficulty_chart_data: Vec<DifficultyDistribution>,
    #[serde(default)]
    pub recent_sessions: Vec<StudySession>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct HistoryStats {
    pub total_sessions: u32,
    pub total_hours: f64,
    pub avg_difficulty: f64,
    pub avg_duration: f64,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct TimelinePoint {
    pub date: String,
    pub duration: u32,
    pub difficulty: u8,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct SubjectDistribution {
    pub subject: String,
    pub duration: u32,
    pub sessions: u32,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct DifficultyDistribution {
    pub difficulty: String,
    pub count: u32,
}

/// Response of `GET /analytics/recommendations`.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct Insights {
    pub recommendations: Vec<String>,
}
