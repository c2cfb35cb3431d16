use tracing::{info, warn};

use crate::domain::analytics::AnalyticsSummary;
use crate::domain::subject::Subject;
use crate::services::api_client::ApiClient;
use crate::services::events::AppEvent;

pub const DASHBOARD_LOAD_ERROR: &str = "Failed to load dashboard data. Please try again.";

/// Landing page: the user's subjects and a summary of recent study.
#[derive(Debug, Clone, Default)]
pub struct Dashboard {
    subjects: Vec<Subject>,
    summary: Option<AnalyticsSummary>,
    is_loading: bool,
    error: Option<String>,
}

impl Dashboard {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn load(&mut self, api: &ApiClient) {
        self.is_loading = true;
        self.error = None;

        match tokio::try_join!(api.list_subjects(), api.analytics_summary()) {
            Ok((subjects, summary)) => {
                info!(subjects = subjects.len(), "Dashboard loaded");
                self.subjects = subjects;
                self.summary = Some(summary);
            }
            Err(e) => {
                warn!(error = %e, "Failed to fetch dashboard data");
                self.subjects.clear();
                self.summary = None;
                self.error = Some(DASHBOARD_LOAD_ERROR.to_string());
            }
        }

        self.is_loading = false;
    }

    pub fn subjects(&self) -> &[Subject] {
        &self.subjects
    }

    pub fn summary(&self) -> Option<&AnalyticsSummary> {
        self.summary.as_ref()
    }

    pub fn is_loading(&self) -> bool {
        self.is_loading
    }

    pub fn error(&self) -> Option<&str> {
        self.error.as_deref()
    }

    pub fn apply_event(&mut self, event: &AppEvent) {
        if let AppEvent::SubjectAdded(subject) = event {
            if !self.subjects.iter().any(|s| s.id == subject.id) {
                self.subjects.push(subject.clone());
            }
        }
    }
}
