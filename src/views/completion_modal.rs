use chrono::NaiveDate;
use parking_lot::Mutex;
use tracing::{debug, info, warn};

use super::form::{FormError, FormState};
use crate::domain::study_session::{SessionCompletion, StudySession, DEFAULT_DIFFICULTY, MAX_DIFFICULTY, MIN_DIFFICULTY};
use crate::domain::task::{Task, TaskStatus};
use crate::services::api_client::ApiClient;
use crate::services::events::{AppEvent, EventBus};

pub const MISSING_DURATION: &str = "Please enter the actual time taken.";
pub const INVALID_DURATION: &str = "Actual time must be a whole number of minutes.";
pub const INVALID_DIFFICULTY: &str = "Difficulty must be between 1 and 5.";
pub const MISSING_REVISION_DATE: &str = "Please pick a revision date.";
pub const REVISION_NOT_IN_FUTURE: &str = "The revision date must be after today.";
pub const SAVE_FAILED: &str = "Could not save session. Please try again.";
pub const RESCHEDULE_FAILED: &str = "Session saved, but the revision could not be scheduled. Please try again.";

#[derive(Debug)]
struct CompletionFields {
    actual_duration: String,
    difficulty: u8,
    revision_date: Option<NaiveDate>,
    /// Set once the backend has stored the session; retries never send it again.
    saved: Option<StudySession>,
    state: FormState,
}

/// Result of a successful save & reschedule.
#[derive(Debug, Clone, PartialEq)]
pub struct Rescheduled {
    pub completed: Task,
    pub revision: Task,
}

/// Collects session details before a task is marked complete.
///
/// Methods take `&self` so the form can be shared with the task running the
/// request; a second submit while one is in flight is refused.
#[derive(Debug)]
pub struct CompletionForm {
    task: Task,
    fields: Mutex<CompletionFields>,
}

impl CompletionForm {
    pub fn new(task: Task) -> Self {
        Self {
            task,
            fields: Mutex::new(CompletionFields {
                actual_duration: String::new(),
                difficulty: DEFAULT_DIFFICULTY,
                revision_date: None,
                saved: None,
                state: FormState::default(),
            }),
        }
    }

    pub fn task(&self) -> &Task {
        &self.task
    }

    pub fn set_actual_duration(&self, input: impl Into<String>) {
        self.fields.lock().actual_duration = input.into();
    }

    pub fn actual_duration(&self) -> String {
        self.fields.lock().actual_duration.clone()
    }

    pub fn set_difficulty(&self, rating: u8) {
        self.fields.lock().difficulty = rating;
    }

    pub fn difficulty(&self) -> u8 {
        self.fields.lock().difficulty
    }

    pub fn set_revision_date(&self, date: Option<NaiveDate>) {
        self.fields.lock().revision_date = date;
    }

    pub fn revision_date(&self) -> Option<NaiveDate> {
        self.fields.lock().revision_date
    }

    pub fn is_submitting(&self) -> bool {
        self.fields.lock().state.is_submitting()
    }

    /// Whether the study session already reached the backend.
    pub fn is_saved(&self) -> bool {
        self.fields.lock().saved.is_some()
    }

    pub fn error(&self) -> Option<String> {
        self.fields.lock().state.error().map(str::to_string)
    }

    fn validated(fields: &CompletionFields) -> Result<SessionCompletion, &'static str> {
        let raw = fields.actual_duration.trim();
        if raw.is_empty() {
            return Err(MISSING_DURATION);
        }
        let actual_duration = match raw.parse::<u32>() {
            Ok(minutes) if minutes > 0 => minutes,
            _ => return Err(INVALID_DURATION),
        };
        if !(MIN_DIFFICULTY..=MAX_DIFFICULTY).contains(&fields.difficulty) {
            return Err(INVALID_DIFFICULTY);
        }

        Ok(SessionCompletion {
            actual_duration,
            user_difficulty_rating: fields.difficulty,
        })
    }

    /// Validate and lock the form in one step.
    fn begin(&self, reschedule_from: Option<NaiveDate>) -> Result<(SessionCompletion, Option<i64>), FormError> {
        let mut fields = self.fields.lock();
        if fields.state.is_submitting() {
            return Err(FormError::AlreadySubmitting);
        }

        let completion = match Self::validated(&fields) {
            Ok(completion) => completion,
            Err(message) => return Err(fields.state.reject(message)),
        };

        let days = match reschedule_from {
            None => None,
            Some(today) => match fields.revision_date {
                None => return Err(fields.state.reject(MISSING_REVISION_DATE)),
                Some(date) => {
                    let days = (date - today).num_days();
                    if days <= 0 {
                        return Err(fields.state.reject(REVISION_NOT_IN_FUTURE));
                    }
                    Some(days)
                }
            },
        };

        fields.state.begin()?;
        Ok((completion, days))
    }

    /// Store the session once. Returns the session and whether this call saved it.
    async fn complete(
        &self,
        api: &ApiClient,
        completion: &SessionCompletion,
    ) -> Result<(StudySession, bool), FormError> {
        let confirmed = self.fields.lock().saved.clone();
        if let Some(session) = confirmed {
            debug!(task_id = self.task.id, session_id = session.id, "Session already saved");
            return Ok((session, false));
        }

        match api.complete_task(self.task.id, completion).await {
            Ok(mut session) => {
                info!(
                    task_id = self.task.id,
                    actual_duration = completion.actual_duration,
                    difficulty = completion.user_difficulty_rating,
                    "Study session saved"
                );
                session.task.update_status(TaskStatus::Complete);
                self.fields.lock().saved = Some(session.clone());
                Ok((session, true))
            }
            Err(e) => {
                warn!(task_id = self.task.id, error = %e, "Failed to complete session");
                Err(self.fields.lock().state.fail(SAVE_FAILED, e))
            }
        }
    }

    /// Mark the task complete. Returns the completed task.
    pub async fn save_session(&self, api: &ApiClient, events: &EventBus) -> Result<Task, FormError> {
        let (completion, _) = self.begin(None)?;
        let (session, fresh) = self.complete(api, &completion).await?;

        let completed = session.task.clone();
        self.fields.lock().state.succeed();
        if fresh {
            events.publish(AppEvent::SessionSaved(session));
        }
        Ok(completed)
    }

    /// Mark the task complete, then schedule a revision task on the chosen date.
    pub async fn save_and_reschedule(
        &self,
        api: &ApiClient,
        events: &EventBus,
        today: NaiveDate,
    ) -> Result<Rescheduled, FormError> {
        let (completion, days) = self.begin(Some(today))?;
        let days_from_now = days.unwrap_or(1);

        let (session, fresh) = self.complete(api, &completion).await?;
        let completed = session.task.clone();
        // The session is saved even if the revision cannot be scheduled
        if fresh {
            events.publish(AppEvent::SessionSaved(session));
        }

        match api.reschedule_task(self.task.id, days_from_now).await {
            Ok(revision) => {
                info!(task_id = self.task.id, revision_id = revision.id, days_from_now, "Revision scheduled");
                self.fields.lock().state.succeed();
                events.publish(AppEvent::TaskRescheduled {
                    original_task_id: self.task.id,
                    revision: revision.clone(),
                });
                Ok(Rescheduled { completed, revision })
            }
            Err(e) => {
                warn!(task_id = self.task.id, error = %e, "Failed to schedule revision");
                Err(self.fields.lock().state.fail(RESCHEDULE_FAILED, e))
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::services::api_client::ApiError;
    use crate::test_helpers::TestContext;
    use serde_json::json;

    fn session_body(task_id: i64) -> serde_json::Value {
        json!({
            "id": 9, "task_id": task_id, "user_id": 1, "actual_duration": 35,
            "user_difficulty_rating": 4, "completed_at": "2025-09-01T10:00:00Z",
            "task": {"id": task_id, "title": "Essay", "estimated_time": 40, "status": "complete"}
        })
    }

    fn form() -> CompletionForm {
        CompletionForm::new(Task::new(4, "Essay", 40).with_status(TaskStatus::InProgress))
    }

    fn day(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    #[test]
    fn test_defaults() {
        let form = form();
        assert_eq!(form.difficulty(), 3);
        assert!(form.actual_duration().is_empty());
        assert!(!form.is_submitting());
        assert!(form.error().is_none());
    }

    #[tokio::test]
    async fn test_empty_duration_never_hits_network() {
        let ctx = TestContext::logged_in().await.unwrap();
        let form = form();
        form.set_actual_duration("   ");

        let err = form.save_session(&ctx.api, &ctx.events).await.unwrap_err();

        assert_eq!(err, FormError::Validation(MISSING_DURATION.into()));
        assert_eq!(form.error().as_deref(), Some(MISSING_DURATION));
        assert!(!form.is_submitting());
        assert!(ctx.transport.requests().is_empty());
    }

    #[tokio::test]
    async fn test_invalid_inputs_rejected_locally() {
        let ctx = TestContext::logged_in().await.unwrap();
        let form = form();

        form.set_actual_duration("abc");
        assert_eq!(
            form.save_session(&ctx.api, &ctx.events).await.unwrap_err(),
            FormError::Validation(INVALID_DURATION.into())
        );

        form.set_actual_duration("30");
        form.set_difficulty(7);
        assert_eq!(
            form.save_session(&ctx.api, &ctx.events).await.unwrap_err(),
            FormError::Validation(INVALID_DIFFICULTY.into())
        );

        form.set_difficulty(2);
        form.set_revision_date(Some(day(2025, 9, 1)));
        assert_eq!(
            form.save_and_reschedule(&ctx.api, &ctx.events, day(2025, 9, 1)).await.unwrap_err(),
            FormError::Validation(REVISION_NOT_IN_FUTURE.into())
        );

        assert!(ctx.transport.requests().is_empty());
    }

    #[tokio::test]
    async fn test_save_session_publishes_completed_task() {
        let ctx = TestContext::logged_in().await.unwrap();
        ctx.transport.respond(200, session_body(4));
        let mut events = ctx.events.subscribe();

        let form = form();
        form.set_actual_duration("35");
        form.set_difficulty(4);
        let task = form.save_session(&ctx.api, &ctx.events).await.unwrap();

        assert_eq!(task.id, 4);
        assert_eq!(task.status, TaskStatus::Complete);
        assert!(!form.is_submitting());

        let sent = ctx.transport.requests();
        assert_eq!(sent[0].path, "/sessions/4/complete");
        assert_eq!(sent[0].body, Some(json!({"actual_duration": 35, "user_difficulty_rating": 4})));

        match events.recv().await.unwrap() {
            AppEvent::SessionSaved(session) => assert_eq!(session.task.id, 4),
            other => panic!("unexpected event {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_failure_shows_message_and_unlocks() {
        let ctx = TestContext::logged_in().await.unwrap();
        ctx.transport.fail(ApiError::Transport("connection reset".into()));

        let form = form();
        form.set_actual_duration("35");
        let err = form.save_session(&ctx.api, &ctx.events).await.unwrap_err();

        assert!(matches!(err, FormError::Api(ApiError::Transport(_))));
        assert_eq!(form.error().as_deref(), Some(SAVE_FAILED));
        assert!(!form.is_submitting());
    }

    #[tokio::test]
    async fn test_second_submit_while_in_flight_is_refused() {
        let ctx = TestContext::logged_in().await.unwrap();
        let gate = ctx.transport.hold();
        ctx.transport.respond(200, session_body(4));

        let form = form();
        form.set_actual_duration("35");

        let (first, second) = tokio::join!(form.save_session(&ctx.api, &ctx.events), async {
            assert!(form.is_submitting());
            let second = form.save_session(&ctx.api, &ctx.events).await;
            gate.notify_one();
            second
        });

        assert!(first.is_ok());
        assert_eq!(second.unwrap_err(), FormError::AlreadySubmitting);
        assert_eq!(ctx.transport.requests().len(), 1);
    }

    #[tokio::test]
    async fn test_save_and_reschedule() {
        let ctx = TestContext::logged_in().await.unwrap();
        ctx.transport.route("/sessions/4/complete", 200, session_body(4));
        ctx.transport.route(
            "/tasks/4/reschedule",
            201,
            json!({"id": 12, "title": "Revise: Essay", "estimated_time": 40, "status": "pending"}),
        );
        let mut events = ctx.events.subscribe();

        let form = form();
        form.set_actual_duration("35");
        form.set_revision_date(Some(day(2025, 9, 4)));
        let result = form
            .save_and_reschedule(&ctx.api, &ctx.events, day(2025, 9, 1))
            .await
            .unwrap();

        assert_eq!(result.completed.status, TaskStatus::Complete);
        assert_eq!(result.revision.id, 12);

        let sent = ctx.transport.requests();
        assert_eq!(sent.len(), 2);
        assert_eq!(sent[0].path, "/sessions/4/complete");
        assert_eq!(sent[1].body, Some(json!({"days_from_now": 3})));

        assert!(matches!(events.recv().await.unwrap(), AppEvent::SessionSaved(_)));
        assert!(matches!(
            events.recv().await.unwrap(),
            AppEvent::TaskRescheduled { original_task_id: 4, .. }
        ));
    }

    #[tokio::test]
    async fn test_retry_after_failed_reschedule_only_reschedules() {
        let ctx = TestContext::logged_in().await.unwrap();
        ctx.transport.route("/sessions/4/complete", 200, session_body(4));
        ctx.transport
            .route_error("/tasks/4/reschedule", ApiError::Transport("connection reset".into()));
        ctx.transport.route(
            "/tasks/4/reschedule",
            201,
            json!({"id": 12, "title": "Revise: Essay", "estimated_time": 40, "status": "pending"}),
        );
        let mut events = ctx.events.subscribe();

        let form = form();
        form.set_actual_duration("35");
        form.set_revision_date(Some(day(2025, 9, 4)));

        let err = form
            .save_and_reschedule(&ctx.api, &ctx.events, day(2025, 9, 1))
            .await
            .unwrap_err();
        assert!(matches!(err, FormError::Api(ApiError::Transport(_))));
        assert_eq!(form.error().as_deref(), Some(RESCHEDULE_FAILED));
        assert!(form.is_saved());
        assert!(!form.is_submitting());

        let result = form
            .save_and_reschedule(&ctx.api, &ctx.events, day(2025, 9, 1))
            .await
            .unwrap();
        assert_eq!(result.revision.id, 12);
        assert_eq!(result.completed.status, TaskStatus::Complete);
        assert!(form.error().is_none());

        assert_eq!(ctx.transport.requests_to("/sessions/4/complete").len(), 1);
        assert_eq!(ctx.transport.requests_to("/tasks/4/reschedule").len(), 2);

        assert!(matches!(events.recv().await.unwrap(), AppEvent::SessionSaved(_)));
        assert!(matches!(
            events.recv().await.unwrap(),
            AppEvent::TaskRescheduled { original_task_id: 4, .. }
        ));
        assert!(events.try_recv().is_err());
    }
}
