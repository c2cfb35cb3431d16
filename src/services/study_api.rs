//! Typed endpoints of the study backend.

use tracing::info;

use super::api_client::{ApiClient, ApiError, ApiRequest};
use crate::domain::analytics::{AnalyticsSummary, HistorySummary, Insights};
use crate::domain::notification::Notification;
use crate::domain::pomodoro::PomodoroLog;
use crate::domain::schedule::{DailySchedule, PredictTimeRequest, TimePredictionResponse};
use crate::domain::session::{Credentials, MessageResponse, Registration, TokenResponse};
use crate::domain::study_session::{SessionCompletion, StudySession};
use crate::domain::subject::{NewSubject, Subject, SubjectSummary};
use crate::domain::task::{NewTask, RescheduleRequest, Task, TaskStatus, TaskStatusUpdate};

impl ApiClient {
    /// Exchange credentials for a bearer token and install it in the auth store.
    /// Returns whether the resulting session is usable.
    pub async fn login(&self, credentials: &Credentials) -> Result<bool, ApiError> {
        let response: TokenResponse = self.post("/auth/login", credentials).await?;
        let accepted = self.auth().set_token(Some(&response.access_token)).await;
        info!(username = %credentials.username, accepted, "Login completed");
        Ok(accepted)
    }

    pub async fn register(&self, registration: &Registration) -> Result<MessageResponse, ApiError> {
        self.post("/auth/register", registration).await
    }

    pub async fn list_subjects(&self) -> Result<Vec<Subject>, ApiError> {
        self.get("/subjects/").await
    }

    pub async fn get_subject(&self, subject_id: i64) -> Result<Subject, ApiError> {
        self.get(&format!("/subjects/{}", subject_id)).await
    }

    pub async fn subject_summary(&self, subject_id: i64) -> Result<SubjectSummary, ApiError> {
        self.get(&format!("/subjects/{}/summary", subject_id)).await
    }

    pub async fn create_subject(&self, subject: &NewSubject) -> Result<Subject, ApiError> {
        self.post("/subjects/", subject).await
    }

    /// Every task of the user, as shown on the board.
    pub async fn list_all_tasks(&self) -> Result<Vec<Task>, ApiError> {
        self.get("/tasks/").await
    }

    pub async fn list_tasks(&self, subject_id: i64) -> Result<Vec<Task>, ApiError> {
        self.get(&format!("/tasks/{}", subject_id)).await
    }

    pub async fn create_task(&self, subject_id: i64, task: &NewTask) -> Result<Task, ApiError> {
        self.post(&format!("/tasks/{}", subject_id), task).await
    }

    pub async fn update_task_status(
        &self,
        task_id: i64,
        status: TaskStatus,
    ) -> Result<serde_json::Value, ApiError> {
        self.patch(
            &format!("/tasks/{}/status", task_id),
            &TaskStatusUpdate { status },
        )
        .await
    }

    /// Schedule a revision of a task `days_from_now` days ahead. Returns the new task.
    pub async fn reschedule_task(&self, task_id: i64, days_from_now: i64) -> Result<Task, ApiError> {
        self.post(
            &format!("/tasks/{}/reschedule", task_id),
            &RescheduleRequest { days_from_now },
        )
        .await
    }

    pub async fn complete_task(
        &self,
        task_id: i64,
        completion: &SessionCompletion,
    ) -> Result<StudySession, ApiError> {
        self.post(&format!("/sessions/{}/complete", task_id), completion)
            .await
    }

    pub async fn analytics_summary(&self) -> Result<AnalyticsSummary, ApiError> {
        self.get("/analytics/summary").await
    }

    pub async fn recommendations(&self) -> Result<Insights, ApiError> {
        self.get("/analytics/recommendations").await
    }

    pub async fn history_summary(&self) -> Result<HistorySummary, ApiError> {
        self.get("/history/summary").await
    }

    pub async fn notifications(&self) -> Result<Vec<Notification>, ApiError> {
        self.get("/notifications/").await
    }

    pub async fn log_pomodoro(&self, log: &PomodoroLog) -> Result<serde_json::Value, ApiError> {
        self.post("/pomodoro/log", log).await
    }

    pub async fn predict_time(&self, task_ids: Vec<i64>) -> Result<TimePredictionResponse, ApiError> {
        self.post("/ml/predict-time", &PredictTimeRequest { task_ids })
            .await
    }

    pub async fn generate_schedule(&self, max_tasks: u32) -> Result<DailySchedule, ApiError> {
        self.send_json(ApiRequest::get("/ml/schedule/generate").with_query("max_tasks", max_tasks))
            .await
    }
}
