use std::collections::HashSet;
use tracing::{debug, info, warn};

use crate::domain::task::{Task, TaskStatus};
use crate::services::api_client::{ApiClient, ApiError};
use crate::services::events::{AppEvent, EventBus};

#[derive(Debug, Clone, PartialEq)]
pub struct KanbanColumn {
    pub status: TaskStatus,
    pub title: String,
    pub tasks: Vec<Task>,
}

impl KanbanColumn {
    fn for_status(status: TaskStatus) -> Self {
        let title = match status {
            TaskStatus::Pending => "To Do",
            TaskStatus::InProgress => "In Progress",
            TaskStatus::Complete => "Done",
            TaskStatus::Cancelled => "Cancelled",
        };
        Self {
            status,
            title: title.to_string(),
            tasks: Vec::new(),
        }
    }

    fn position(&self, task_id: i64) -> Option<usize> {
        self.tasks.iter().position(|t| t.id == task_id)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DropTarget {
    pub status: TaskStatus,
    pub index: usize,
}

impl DropTarget {
    pub fn new(status: TaskStatus, index: usize) -> Self {
        Self { status, index }
    }
}

/// End of a drag gesture. `destination` is `None` when the card was released
/// outside every column.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DragResult {
    pub task_id: i64,
    pub source: DropTarget,
    pub destination: Option<DropTarget>,
}

/// Column state captured before a provisional move.
#[derive(Debug, Clone, PartialEq)]
pub struct BoardSnapshot {
    columns: Vec<KanbanColumn>,
}

#[derive(Debug, Clone, PartialEq)]
pub enum DropOutcome {
    Ignored,
    /// The task was dropped on Done. Columns are untouched until the
    /// completion flow reports a saved session.
    CompletionRequested(Task),
    ProvisionalMove {
        snapshot: BoardSnapshot,
        task_id: i64,
        from: TaskStatus,
        to: TaskStatus,
    },
}

#[derive(Debug, Clone, PartialEq)]
pub enum DragEndResult {
    Ignored,
    CompletionRequested(Task),
    Committed { task_id: i64, status: TaskStatus },
    Reverted { task_id: i64, error: ApiError },
}

/// Kanban board over every task of the user.
#[derive(Debug, Clone)]
pub struct TaskBoard {
    columns: Vec<KanbanColumn>,
    pending_completion: Option<Task>,
    is_loading: bool,
    error: Option<String>,
}

pub const LOAD_ERROR: &str = "Could not load tasks. Please try again.";

impl TaskBoard {
    pub fn new() -> Self {
        Self {
            columns: TaskStatus::BOARD.iter().map(|s| KanbanColumn::for_status(*s)).collect(),
            pending_completion: None,
            is_loading: false,
            error: None,
        }
    }

    pub fn with_tasks(tasks: Vec<Task>) -> Self {
        let mut board = Self::new();
        board.set_tasks(tasks);
        board
    }

    /// Regroup tasks by status. Tasks whose status has no column are not shown.
    pub fn set_tasks(&mut self, tasks: Vec<Task>) {
        for column in &mut self.columns {
            column.tasks.clear();
        }
        let mut seen = HashSet::new();
        for task in tasks {
            if !seen.insert(task.id) {
                warn!(task_id = task.id, "Duplicate task in listing, keeping the first");
                continue;
            }
            if let Some(column) = self.column_mut(task.status) {
                column.tasks.push(task);
            }
        }
    }

    pub async fn load(&mut self, api: &ApiClient) {
        self.is_loading = true;
        self.error = None;

        match api.list_all_tasks().await {
            Ok(tasks) => {
                info!(count = tasks.len(), "Loaded board");
                self.set_tasks(tasks);
            }
            Err(e) => {
                warn!(error = %e, "Failed to load tasks");
                self.set_tasks(Vec::new());
                self.error = Some(LOAD_ERROR.to_string());
            }
        }

        self.is_loading = false;
    }

    pub fn columns(&self) -> &[KanbanColumn] {
        &self.columns
    }

    pub fn column(&self, status: TaskStatus) -> Option<&KanbanColumn> {
        self.columns.iter().find(|c| c.status == status)
    }

    fn column_mut(&mut self, status: TaskStatus) -> Option<&mut KanbanColumn> {
        self.columns.iter_mut().find(|c| c.status == status)
    }

    pub fn tasks_in(&self, status: TaskStatus) -> &[Task] {
        self.column(status).map(|c| c.tasks.as_slice()).unwrap_or(&[])
    }

    pub fn find(&self, task_id: i64) -> Option<&Task> {
        self.columns.iter().flat_map(|c| c.tasks.iter()).find(|t| t.id == task_id)
    }

    pub fn len(&self) -> usize {
        self.columns.iter().map(|c| c.tasks.len()).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn pending_completion(&self) -> Option<&Task> {
        self.pending_completion.as_ref()
    }

    pub fn is_loading(&self) -> bool {
        self.is_loading
    }

    pub fn error(&self) -> Option<&str> {
        self.error.as_deref()
    }

    /// Every task sits in exactly one column, the one matching its status.
    pub fn is_consistent(&self) -> bool {
        let mut seen = HashSet::new();
        self.columns.iter().all(|column| {
            column
                .tasks
                .iter()
                .all(|task| task.status == column.status && seen.insert(task.id))
        })
    }

    pub fn snapshot(&self) -> BoardSnapshot {
        BoardSnapshot {
            columns: self.columns.clone(),
        }
    }

    pub fn restore(&mut self, snapshot: BoardSnapshot) {
        self.columns = snapshot.columns;
    }

    fn locate(&self, task_id: i64, hint: TaskStatus) -> Option<(usize, usize)> {
        let in_hint = self
            .columns
            .iter()
            .position(|c| c.status == hint)
            .and_then(|ci| self.columns[ci].position(task_id).map(|ti| (ci, ti)));

        in_hint.or_else(|| {
            self.columns
                .iter()
                .enumerate()
                .find_map(|(ci, c)| c.position(task_id).map(|ti| (ci, ti)))
        })
    }

    /// Local half of a drag: decide what the drop means and, for ordinary
    /// moves, apply it to the columns right away.
    pub fn apply_drop(&mut self, drop: &DragResult) -> DropOutcome {
        let Some(destination) = drop.destination else {
            debug!(task_id = drop.task_id, "Dropped outside the board");
            return DropOutcome::Ignored;
        };
        if destination.status == drop.source.status {
            return DropOutcome::Ignored;
        }
        let Some(dest_index) = self.columns.iter().position(|c| c.status == destination.status) else {
            return DropOutcome::Ignored;
        };
        let Some((source_index, task_index)) = self.locate(drop.task_id, drop.source.status) else {
            warn!(task_id = drop.task_id, "Dropped task is not on the board");
            return DropOutcome::Ignored;
        };

        let from = self.columns[source_index].status;
        if from == destination.status {
            return DropOutcome::Ignored;
        }

        if destination.status.is_terminal() {
            let task = self.columns[source_index].tasks[task_index].clone();
            info!(task_id = task.id, "Completion requested");
            self.pending_completion = Some(task.clone());
            return DropOutcome::CompletionRequested(task);
        }

        let snapshot = self.snapshot();
        let mut task = self.columns[source_index].tasks.remove(task_index);
        task.update_status(destination.status);

        let dest = &mut self.columns[dest_index].tasks;
        let index = destination.index.min(dest.len());
        dest.insert(index, task);

        debug!(task_id = drop.task_id, from = %from, to = %destination.status, "Provisional move applied");
        DropOutcome::ProvisionalMove {
            snapshot,
            task_id: drop.task_id,
            from,
            to: destination.status,
        }
    }

    /// Full drag handling: provisional move, remote status update, and a
    /// revert to the pre-drag columns if the update fails. Only a confirmed
    /// move is announced on the bus.
    pub async fn on_drag_end(&mut self, drop: DragResult, api: &ApiClient, events: &EventBus) -> DragEndResult {
        match self.apply_drop(&drop) {
            DropOutcome::Ignored => DragEndResult::Ignored,
            DropOutcome::CompletionRequested(task) => DragEndResult::CompletionRequested(task),
            DropOutcome::ProvisionalMove {
                snapshot,
                task_id,
                from,
                to,
            } => match api.update_task_status(task_id, to).await {
                Ok(_) => {
                    info!(task_id, from = %from, to = %to, "Task status updated");
                    events.publish(AppEvent::TaskStatusChanged { task_id, status: to });
                    DragEndResult::Committed { task_id, status: to }
                }
                Err(error) => {
                    warn!(task_id, error = %error, "Status update failed, reverting");
                    self.restore(snapshot);
                    DragEndResult::Reverted { task_id, error }
                }
            },
        }
    }

    /// Move a task whose session was saved into Done.
    pub fn handle_session_saved(&mut self, task: Task) {
        for column in &mut self.columns {
            column.tasks.retain(|t| t.id != task.id);
        }
        if let Some(done) = self.column_mut(TaskStatus::Complete) {
            done.tasks.push(task.with_status(TaskStatus::Complete));
        }
        self.pending_completion = None;
    }

    pub fn cancel_completion(&mut self) -> Option<Task> {
        self.pending_completion.take()
    }

    fn upsert(&mut self, task: Task) {
        for column in &mut self.columns {
            column.tasks.retain(|t| t.id != task.id);
        }
        if let Some(column) = self.column_mut(task.status) {
            column.tasks.push(task);
        }
    }

    pub fn apply_event(&mut self, event: &AppEvent) {
        match event {
            AppEvent::TaskAdded(task) => self.upsert(task.clone()),
            AppEvent::SessionSaved(session) => self.handle_session_saved(session.task.clone()),
            AppEvent::TaskRescheduled { revision, .. } => self.upsert(revision.clone()),
            AppEvent::TaskStatusChanged { task_id, status } => {
                if let Some(task) = self.find(*task_id).cloned() {
                    if task.status != *status {
                        self.upsert(task.with_status(*status));
                    }
                }
            }
            AppEvent::SubjectAdded(_) | AppEvent::PomodoroLogged { .. } => {}
        }
    }
}

impl Default for TaskBoard {
    fn default() -> Self {
        Self::new()
    }
}
