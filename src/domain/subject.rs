use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

pub const DEFAULT_COLOR_TAG: &str = "#3B82F6";

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Subject {
    pub id: i64,
    pub name: String,
    #[serde(default = "default_color_tag")]
    pub color_tag: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub user_id: Option<i64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub created_at: Option<DateTime<Utc>>,
}

fn default_color_tag() -> String {
    DEFAULT_COLOR_TAG.to_string()
}

/// Body of `POST /subjects/`.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct NewSubject {
    pub name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub color_tag: Option<String>,
}

/// Response of `GET /subjects/{id}/summary`.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct SubjectSummary {
    pub completed_tasks: u32,
    pub pending_tasks: u32,
    pub completion_rate: f64,
    pub avg_estimated_time: f64,
    pub avg_predicted_time: f64,
    pub total_tasks: u32,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_color_tag_defaults_when_missing() {
        let subject: Subject = serde_json::from_str(r#"{"id": 1, "name": "Physics"}"#).unwrap();
        assert_eq!(subject.color_tag, DEFAULT_COLOR_TAG);
        assert!(subject.user_id.is_none());
    }

    #[test]
    fn test_new_subject_omits_missing_color() {
        let body = serde_json::to_value(NewSubject { name: "Physics".into(), color_tag: None }).unwrap();
        assert_eq!(body, serde_json::json!({"name": "Physics"}));
    }
}
