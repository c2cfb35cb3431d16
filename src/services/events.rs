use tokio::sync::broadcast;
use tracing::debug;

use crate::domain::study_session::StudySession;
use crate::domain::subject::Subject;
use crate::domain::task::{Task, TaskStatus};

/// Things that happened which other views may want to react to.
#[derive(Clone, Debug, PartialEq)]
pub enum AppEvent {
    SubjectAdded(Subject),
    TaskAdded(Task),
    SessionSaved(StudySession),
    TaskRescheduled { original_task_id: i64, revision: Task },
    TaskStatusChanged { task_id: i64, status: TaskStatus },
    PomodoroLogged { task_id: Option<i64>, duration_minutes: u32 },
}

impl AppEvent {
    pub fn name(&self) -> &'static str {
        match self {
            AppEvent::SubjectAdded(_) => "subject_added",
            AppEvent::TaskAdded(_) => "task_added",
            AppEvent::SessionSaved(_) => "session_saved",
            AppEvent::TaskRescheduled { .. } => "task_rescheduled",
            AppEvent::TaskStatusChanged { .. } => "task_status_changed",
            AppEvent::PomodoroLogged { .. } => "pomodoro_logged",
        }
    }
}

/// Fan-out of [`AppEvent`]s. Cloning shares the channel.
#[derive(Clone)]
pub struct EventBus {
    sender: broadcast::Sender<AppEvent>,
}

impl EventBus {
    pub fn new() -> Self {
        Self::with_capacity(256)
    }

    pub fn with_capacity(capacity: usize) -> Self {
        let (sender, _) = broadcast::channel(capacity);
        Self { sender }
    }

    pub fn subscribe(&self) -> broadcast::Receiver<AppEvent> {
        self.sender.subscribe()
    }

    /// Returns the number of subscribers that received the event.
    pub fn publish(&self, event: AppEvent) -> usize {
        let name = event.name();
        // No subscribers is fine
        let delivered = self.sender.send(event).unwrap_or(0);
        debug!(event = name, delivered, "Published event");
        delivered
    }
}

impl Default for EventBus {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_publish_reaches_every_subscriber() {
        let bus = EventBus::new();
        let mut first = bus.subscribe();
        let mut second = bus.clone().subscribe();

        let event = AppEvent::TaskStatusChanged { task_id: 3, status: TaskStatus::InProgress };
        assert_eq!(bus.publish(event.clone()), 2);

        assert_eq!(first.recv().await.unwrap(), event);
        assert_eq!(second.recv().await.unwrap(), event);
    }

    #[test]
    fn test_publish_without_subscribers() {
        let bus = EventBus::new();
        assert_eq!(bus.publish(AppEvent::PomodoroLogged { task_id: None, duration_minutes: 25 }), 0);
    }
}
