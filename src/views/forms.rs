use chrono::{DateTime, NaiveDate, Utc};
use tracing::{info, warn};

use super::form::{FormError, FormState};
use crate::domain::session::{Credentials, Identity, Registration};
use crate::domain::subject::{NewSubject, Subject};
use crate::domain::task::{NewTask, Task, TaskType};
use crate::services::api_client::{ApiClient, ApiError};
use crate::services::events::{AppEvent, EventBus};
use crate::utils::{validate_email, validate_password};

pub const LOGIN_REQUIRED_FIELDS: &str = "Username and password are required.";
pub const LOGIN_FAILED: &str = "Invalid username or password.";
pub const SIGNUP_REQUIRED_FIELDS: &str = "Email, username and password are required.";
pub const SIGNUP_INVALID_EMAIL: &str = "Please enter a valid email address.";
pub const SIGNUP_FAILED: &str = "Failed to create account. Please try again.";
pub const SUBJECT_NAME_REQUIRED: &str = "Subject name cannot be empty.";
pub const SUBJECT_FAILED: &str = "Failed to add subject.";
pub const TASK_REQUIRED_FIELDS: &str = "Title and estimated time are required.";
pub const TASK_INVALID_DEADLINE: &str = "Deadline must be a date (YYYY-MM-DD).";
pub const TASK_FAILED: &str = "Could not add the task. Please try again.";

#[derive(Debug, Clone, Default)]
pub struct LoginForm {
    pub username: String,
    pub password: String,
    state: FormState,
}

impl LoginForm {
    pub fn new(username: impl Into<String>, password: impl Into<String>) -> Self {
        Self {
            username: username.into(),
            password: password.into(),
            state: FormState::default(),
        }
    }

    pub fn state(&self) -> &FormState {
        &self.state
    }

    /// Log in and return who we are now. The token lands in the auth store.
    pub async fn submit(&mut self, api: &ApiClient) -> Result<Identity, FormError> {
        if self.username.trim().is_empty() || self.password.is_empty() {
            return Err(self.state.reject(LOGIN_REQUIRED_FIELDS));
        }
        self.state.begin()?;

        let credentials = Credentials {
            username: self.username.trim().to_string(),
            password: self.password.clone(),
        };
        let outcome = match api.login(&credentials).await {
            Ok(true) => api.auth().user().ok_or(ApiError::Unauthorized),
            Ok(false) => Err(ApiError::Unauthorized),
            Err(e) => Err(e),
        };

        match outcome {
            Ok(user) => {
                self.state.succeed();
                self.password.clear();
                Ok(user)
            }
            Err(e) => {
                warn!(username = %credentials.username, error = %e, "Login failed");
                Err(self.state.fail(LOGIN_FAILED, e))
            }
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct SignupForm {
    pub email: String,
    pub username: String,
    pub password: String,
    state: FormState,
}

impl SignupForm {
    pub fn new(email: impl Into<String>, username: impl Into<String>, password: impl Into<String>) -> Self {
        Self {
            email: email.into(),
            username: username.into(),
            password: password.into(),
            state: FormState::default(),
        }
    }

    pub fn state(&self) -> &FormState {
        &self.state
    }

    fn validate(&self) -> Result<(), String> {
        if self.email.trim().is_empty() || self.username.trim().is_empty() || self.password.is_empty() {
            return Err(SIGNUP_REQUIRED_FIELDS.to_string());
        }
        if !validate_email(self.email.trim()) {
            return Err(SIGNUP_INVALID_EMAIL.to_string());
        }
        let check = validate_password(&self.password);
        if !check.is_valid() {
            return Err(check.errors.join(". "));
        }
        Ok(())
    }

    /// Register the account. On success the user continues at the login page.
    pub async fn submit(&mut self, api: &ApiClient) -> Result<String, FormError> {
        if let Err(message) = self.validate() {
            return Err(self.state.reject(message));
        }
        self.state.begin()?;

        let registration = Registration {
            username: self.username.trim().to_string(),
            email: self.email.trim().to_string(),
            password: self.password.clone(),
        };
        match api.register(&registration).await {
            Ok(response) => {
                info!(username = %registration.username, "Account created");
                self.state.succeed();
                self.password.clear();
                Ok(response.message)
            }
            Err(e) => {
                warn!(username = %registration.username, error = %e, "Registration failed");
                Err(self.state.fail(SIGNUP_FAILED, e))
            }
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct AddSubjectForm {
    pub name: String,
    pub color_tag: Option<String>,
    state: FormState,
}

impl AddSubjectForm {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Default::default()
        }
    }

    pub fn state(&self) -> &FormState {
        &self.state
    }

    pub async fn submit(&mut self, api: &ApiClient, events: &EventBus) -> Result<Subject, FormError> {
        let name = self.name.trim().to_string();
        if name.is_empty() {
            return Err(self.state.reject(SUBJECT_NAME_REQUIRED));
        }
        self.state.begin()?;

        let request = NewSubject {
            name,
            color_tag: self.color_tag.clone(),
        };
        match api.create_subject(&request).await {
            Ok(subject) => {
                info!(subject_id = subject.id, name = %subject.name, "Subject added");
                self.state.succeed();
                self.name.clear();
                self.color_tag = None;
                events.publish(AppEvent::SubjectAdded(subject.clone()));
                Ok(subject)
            }
            Err(e) => {
                warn!(error = %e, "Failed to add subject");
                Err(self.state.fail(SUBJECT_FAILED, e))
            }
        }
    }
}

#[derive(Debug, Clone)]
pub struct AddTaskForm {
    pub subject_id: i64,
    pub title: String,
    /// Raw input, minutes.
    pub estimated_time: String,
    /// Raw input, `YYYY-MM-DD` or RFC 3339. Empty means no deadline.
    pub deadline: String,
    pub task_type: TaskType,
    state: FormState,
}

impl AddTaskForm {
    pub fn new(subject_id: i64) -> Self {
        Self {
            subject_id,
            title: String::new(),
            estimated_time: String::new(),
            deadline: String::new(),
            task_type: TaskType::default(),
            state: FormState::default(),
        }
    }

    pub fn state(&self) -> &FormState {
        &self.state
    }

    fn parse_deadline(raw: &str) -> Result<Option<DateTime<Utc>>, ()> {
        let raw = raw.trim();
        if raw.is_empty() {
            return Ok(None);
        }
        if let Ok(at) = DateTime::parse_from_rfc3339(raw) {
            return Ok(Some(at.with_timezone(&Utc)));
        }
        NaiveDate::parse_from_str(raw, "%Y-%m-%d")
            .ok()
            .and_then(|d| d.and_hms_opt(0, 0, 0))
            .map(|d| Some(d.and_utc()))
            .ok_or(())
    }

    fn validated(&self) -> Result<NewTask, &'static str> {
        let title = self.title.trim();
        let estimated_time = self.estimated_time.trim().parse::<u32>().ok().filter(|m| *m > 0);
        let (false, Some(estimated_time)) = (title.is_empty(), estimated_time) else {
            return Err(TASK_REQUIRED_FIELDS);
        };
        let deadline = Self::parse_deadline(&self.deadline).map_err(|_| TASK_INVALID_DEADLINE)?;

        Ok(NewTask {
            title: title.to_string(),
            estimated_time,
            deadline,
            task_type: self.task_type,
        })
    }

    pub async fn submit(&mut self, api: &ApiClient, events: &EventBus) -> Result<Task, FormError> {
        let request = match self.validated() {
            Ok(request) => request,
            Err(message) => return Err(self.state.reject(message)),
        };
        self.state.begin()?;

        match api.create_task(self.subject_id, &request).await {
            Ok(mut task) => {
                task.subject_id.get_or_insert(self.subject_id);
                info!(task_id = task.id, subject_id = self.subject_id, "Task added");
                self.state.succeed();
                self.title.clear();
                self.estimated_time.clear();
                self.deadline.clear();
                events.publish(AppEvent::TaskAdded(task.clone()));
                Ok(task)
            }
            Err(e) => {
                warn!(subject_id = self.subject_id, error = %e, "Failed to add task");
                Err(self.state.fail(TASK_FAILED, e))
            }
        }
    }
}
