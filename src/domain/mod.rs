pub mod analytics;
pub mod notification;
pub mod pomodoro;
pub mod schedule;
pub mod session;
pub mod study_session;
pub mod subject;
pub mod task;
