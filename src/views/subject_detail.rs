use tracing::{debug, info, warn};

use crate::domain::subject::{Subject, SubjectSummary};
use crate::domain::task::{Task, TaskStatus};
use crate::services::api_client::{ApiClient, ApiError};
use crate::services::events::AppEvent;

pub const SUBJECT_NOT_FOUND: &str =
    "Subject not found. It may have been deleted or you don't have permission to access it.";
pub const SUBJECT_LOGIN_REQUIRED: &str = "You need to be logged in to view this subject.";
pub const SUBJECT_LOAD_FAILED: &str = "Failed to load subject details. Please try again.";

/// One subject with its tasks, summary and predicted task durations.
#[derive(Debug, Clone)]
pub struct SubjectDetail {
    subject_id: i64,
    subject: Option<Subject>,
    tasks: Vec<Task>,
    summary: Option<SubjectSummary>,
    show_completed: bool,
    is_loading: bool,
    is_predicting: bool,
    error: Option<String>,
}

impl SubjectDetail {
    pub fn new(subject_id: i64) -> Self {
        Self {
            subject_id,
            subject: None,
            tasks: Vec::new(),
            summary: None,
            show_completed: false,
            is_loading: false,
            is_predicting: false,
            error: None,
        }
    }

    pub fn error_message(error: &ApiError) -> &'static str {
        match error {
            ApiError::NotFound(_) => SUBJECT_NOT_FOUND,
            ApiError::Unauthorized => SUBJECT_LOGIN_REQUIRED,
            _ => SUBJECT_LOAD_FAILED,
        }
    }

    pub async fn load(&mut self, api: &ApiClient) {
        self.is_loading = true;
        self.error = None;
        let id = self.subject_id;

        let loaded = tokio::try_join!(api.get_subject(id), api.list_tasks(id), api.subject_summary(id));
        match loaded {
            Ok((subject, tasks, summary)) => {
                info!(subject_id = id, tasks = tasks.len(), "Subject loaded");
                self.subject = Some(subject);
                self.tasks = tasks;
                self.summary = Some(summary);
                self.is_loading = false;
                self.predict(api).await;
            }
            Err(e) => {
                warn!(subject_id = id, error = %e, "Failed to fetch subject details");
                self.error = Some(Self::error_message(&e).to_string());
                self.is_loading = false;
            }
        }
    }

    /// Ask for predicted durations of pending tasks. Failures keep the
    /// estimates as they are.
    pub async fn predict(&mut self, api: &ApiClient) {
        let pending: Vec<i64> = self
            .tasks
            .iter()
            .filter(|t| t.status == TaskStatus::Pending)
            .map(|t| t.id)
            .collect();
        if pending.is_empty() {
            return;
        }

        self.is_predicting = true;
        match api.predict_time(pending).await {
            Ok(response) => {
                debug!(model = %response.model_version, count = response.predictions.len(), "Predictions received");
                for task in &mut self.tasks {
                    if let Some(prediction) = response.for_task(task.id) {
                        task.predicted_time = Some(prediction.rounded_minutes());
                    }
                }
            }
            Err(e) => warn!(subject_id = self.subject_id, error = %e, "Time prediction unavailable"),
        }
        self.is_predicting = false;
    }

    pub fn subject_id(&self) -> i64 {
        self.subject_id
    }

    pub fn subject(&self) -> Option<&Subject> {
        self.subject.as_ref()
    }

    pub fn tasks(&self) -> &[Task] {
        &self.tasks
    }

    pub fn summary(&self) -> Option<&SubjectSummary> {
        self.summary.as_ref()
    }

    pub fn is_loading(&self) -> bool {
        self.is_loading
    }

    pub fn is_predicting(&self) -> bool {
        self.is_predicting
    }

    pub fn error(&self) -> Option<&str> {
        self.error.as_deref()
    }

    pub fn show_completed(&self) -> bool {
        self.show_completed
    }

    pub fn set_show_completed(&mut self, show: bool) {
        self.show_completed = show;
    }

    pub fn visible_tasks(&self) -> Vec<&Task> {
        self.tasks
            .iter()
            .filter(|t| self.show_completed || t.status != TaskStatus::Complete)
            .collect()
    }

    pub fn apply_event(&mut self, event: &AppEvent) {
        match event {
            AppEvent::TaskAdded(task) | AppEvent::TaskRescheduled { revision: task, .. } => {
                let belongs = task.subject_id == Some(self.subject_id);
                if belongs && !self.tasks.iter().any(|t| t.id == task.id) {
                    self.tasks.push(task.clone());
                }
            }
            AppEvent::SessionSaved(session) => {
                if let Some(task) = self.tasks.iter_mut().find(|t| t.id == session.task_id) {
                    task.update_status(TaskStatus::Complete);
                }
            }
            AppEvent::TaskStatusChanged { task_id, status } => {
                if let Some(task) = self.tasks.iter_mut().find(|t| t.id == *task_id) {
                    task.update_status(*status);
                }
            }
            AppEvent::SubjectAdded(_) | AppEvent::PomodoroLogged { .. } => {}
        }
    }
}
