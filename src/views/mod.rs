pub mod completion_modal;
pub mod dashboard;
pub mod form;
pub mod forms;
pub mod notifications;
pub mod route_gate;
pub mod subject_detail;
pub mod task_board;

pub use completion_modal::{CompletionForm, Rescheduled};
pub use dashboard::Dashboard;
pub use form::{FormError, FormState};
pub use forms::{AddSubjectForm, AddTaskForm, LoginForm, SignupForm};
pub use notifications::NotificationCenter;
pub use route_gate::{GateDecision, GateState, RouteGate};
pub use subject_detail::SubjectDetail;
pub use task_board::{DragEndResult, DragResult, DropOutcome, DropTarget, KanbanColumn, TaskBoard};
