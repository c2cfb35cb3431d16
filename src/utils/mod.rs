pub mod format;
pub mod validation;

pub use format::{format_clock, format_duration, is_due_soon, is_overdue, priority_label};
pub use validation::{validate_email, validate_password, PasswordCheck};
