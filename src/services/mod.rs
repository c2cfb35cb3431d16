pub mod api_client;
pub mod auth_store;
pub mod events;
pub mod pomodoro;
mod study_api;

pub use api_client::{ApiClient, ApiError, HttpTransport, ReqwestTransport};
pub use auth_store::AuthStore;
pub use events::{AppEvent, EventBus};
pub use pomodoro::{Phase, PomodoroRunner, PomodoroTimer};
