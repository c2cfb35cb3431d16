use tracing::warn;

use crate::domain::notification::Notification;
use crate::services::api_client::ApiClient;

/// Tasks due tomorrow, as reported by the backend.
#[derive(Debug, Clone, Default)]
pub struct NotificationCenter {
    notifications: Vec<Notification>,
    is_open: bool,
}

impl NotificationCenter {
    pub fn new() -> Self {
        Self::default()
    }

    /// Fetch failures leave the list empty.
    pub async fn refresh(&mut self, api: &ApiClient) {
        self.notifications = match api.notifications().await {
            Ok(notifications) => notifications,
            Err(e) => {
                warn!(error = %e, "Failed to fetch notifications");
                Vec::new()
            }
        };
    }

    pub fn notifications(&self) -> &[Notification] {
        &self.notifications
    }

    pub fn count(&self) -> usize {
        self.notifications.len()
    }

    pub fn is_open(&self) -> bool {
        self.is_open
    }

    pub fn toggle(&mut self) -> bool {
        self.is_open = !self.is_open;
        self.is_open
    }

    /// Link target for a notification.
    pub fn subject_route(notification: &Notification) -> String {
        format!("/subjects/{}", notification.subject_id)
    }
}
