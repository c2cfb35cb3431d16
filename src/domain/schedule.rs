use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Body of `POST /ml/predict-time`.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct PredictTimeRequest {
    pub task_ids: Vec<i64>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct TimePrediction {
    pub task_id: i64,
    pub predicted_time_minutes: f64,
    #[serde(default)]
    pub confidence_score: f64,
}

impl TimePrediction {
    pub fn rounded_minutes(&self) -> u32 {
        self.predicted_time_minutes.max(0.0).round() as u32
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct TimePredictionResponse {
    pub predictions: Vec<TimePrediction>,
    #[serde(default)]
    pub model_version: String,
}

impl TimePredictionResponse {
    pub fn for_task(&self, task_id: i64) -> Option<&TimePrediction> {
        self.predictions.iter().find(|p| p.task_id == task_id)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ScheduleTask {
    pub task_id: i64,
    pub task_name: String,
    pub subject_name: String,
    pub estimated_time: u32,
    pub predicted_time: u32,
    pub priority_score: f64,
    pub recommendation_reason: String,
}

/// Response of `GET /ml/schedule/generate`.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct DailySchedule {
    pub schedule: Vec<ScheduleTask>,
    #[serde(default)]
    pub insights: Vec<String>,
    pub generated_at: DateTime<Utc>,
}

impl DailySchedule {
    pub fn total_predicted_minutes(&self) -> u32 {
        self.schedule.iter().map(|t| t.predicted_time).sum()
    }
}
