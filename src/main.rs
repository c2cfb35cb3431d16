use anyhow::{bail, Result};
use chrono::{Local, NaiveDate};
use clap::{Parser, Subcommand};
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use studyflow::config::AppConfig;
use studyflow::domain::task::TaskStatus;
use studyflow::repository::{database::init_database, Repository};
use studyflow::services::{ApiClient, AuthStore, EventBus, PomodoroRunner};
use studyflow::utils::{format_duration, priority_label};
use studyflow::views::{
    AddSubjectForm, AddTaskForm, CompletionForm, Dashboard, DragEndResult, DragResult, DropTarget, GateDecision,
    LoginForm, NotificationCenter, RouteGate, SignupForm, SubjectDetail, TaskBoard,
};

#[derive(Parser, Debug)]
#[command(name = "studyflow")]
#[command(version)]
#[command(about = "Study planner client: subjects, tasks, pomodoro and analytics")]
struct Cli {
    /// Backend address, overrides the configuration file
    #[arg(long, global = true)]
    api_url: Option<String>,

    /// Configuration file to use instead of the default location
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Log in and remember the session
    Login {
        username: String,
        #[arg(long)]
        password: String,
    },
    /// Create an account
    Signup {
        email: String,
        username: String,
        #[arg(long)]
        password: String,
    },
    /// Forget the stored session
    Logout,
    /// Show the logged-in user
    Whoami,
    /// List subjects with a short study summary
    Subjects,
    /// Add a subject
    AddSubject {
        name: String,
        /// Hex color, e.g. "#EF4444"
        #[arg(long)]
        color: Option<String>,
    },
    /// Show the tasks of a subject
    Tasks {
        subject_id: i64,
        /// Include completed tasks
        #[arg(long)]
        all: bool,
    },
    /// Add a task to a subject
    AddTask {
        subject_id: i64,
        title: String,
        /// Estimated time in minutes
        #[arg(long)]
        minutes: String,
        /// Due date, YYYY-MM-DD
        #[arg(long)]
        deadline: Option<String>,
    },
    /// Show the kanban board
    Board,
    /// Move a task to another column (todo, doing)
    Move { task_id: i64, status: TaskStatus },
    /// Mark a task complete and log the study session
    Complete {
        task_id: i64,
        /// Actual time taken in minutes
        #[arg(long)]
        minutes: String,
        /// Difficulty from 1 (easy) to 5 (hard)
        #[arg(long, default_value_t = 3)]
        difficulty: u8,
        /// Schedule a revision task on this date (YYYY-MM-DD)
        #[arg(long)]
        revise_on: Option<NaiveDate>,
    },
    /// Run one pomodoro focus session
    Pomodoro {
        /// Task the session is spent on
        #[arg(long)]
        task: Option<i64>,
    },
    /// Study analytics and recommendations
    Analytics,
    /// Past study sessions
    History,
    /// Tasks due tomorrow
    Notifications,
    /// Suggested plan for today
    Schedule {
        #[arg(long)]
        max_tasks: Option<u32>,
    },
}

impl Command {
    fn is_protected(&self) -> bool {
        !matches!(self, Command::Login { .. } | Command::Signup { .. } | Command::Logout)
    }
}

struct App {
    config: AppConfig,
    auth: AuthStore,
    api: ApiClient,
    events: EventBus,
}

impl App {
    async fn init(cli: &Cli) -> Result<Self> {
        let mut config = match &cli.config {
            Some(path) => {
                let mut config = AppConfig::load_from(path)?;
                config.apply_env_overrides();
                config
            }
            None => AppConfig::load()?,
        };
        if let Some(url) = &cli.api_url {
            config.api_base_url = url.clone();
        }

        let pool = init_database(&config.resolve_database_path()?).await?;
        let repository = Repository::new(pool);
        let auth = AuthStore::new(Arc::new(repository.sessions));
        auth.hydrate().await;

        let api = ApiClient::from_config(&config, auth.clone());
        Ok(Self {
            config,
            auth,
            api,
            events: EventBus::new(),
        })
    }

    async fn require_session(&self) -> Result<()> {
        self.auth.expire_if_stale().await;
        let mut gate = RouteGate::new(self.config.login_route.clone());
        match gate.wait(&mut self.auth.subscribe()).await {
            GateDecision::Render => Ok(()),
            GateDecision::Redirect(route) => {
                bail!("Not logged in (redirect to {}). Run `studyflow login <username> --password <password>` first.", route)
            }
            GateDecision::Wait | GateDecision::Redirecting => bail!("Not logged in"),
        }
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize logging
    tracing_subscriber::fmt().with_writer(std::io::stderr).init();

    let cli = Cli::parse();
    let app = App::init(&cli).await?;

    if cli.command.is_protected() {
        app.require_session().await?;
    }

    run(&app, cli.command).await
}

async fn run(app: &App, command: Command) -> Result<()> {
    match command {
        Command::Login { username, password } => {
            let mut form = LoginForm::new(username, password);
            let user = form.submit(&app.api).await.map_err(|_| anyhow::anyhow!(form_message(form.state().error())))?;
            println!("Logged in as {}", user.username);
        }
        Command::Signup { email, username, password } => {
            let mut form = SignupForm::new(email, username, password);
            match form.submit(&app.api).await {
                Ok(message) => println!("{}. You can now log in.", message),
                Err(_) => bail!(form_message(form.state().error())),
            }
        }
        Command::Logout => {
            if app.auth.logout().await {
                println!("Logged out");
            } else {
                println!("No active session");
            }
        }
        Command::Whoami => {
            let snapshot = app.auth.snapshot();
            if let Some(user) = snapshot.user {
                match user.user_id {
                    Some(id) => println!("{} (id {})", user.username, id),
                    None => println!("{}", user.username),
                }
                println!("Pomodoro sessions: {}", snapshot.active_sessions);
            }
        }
        Command::Subjects => {
            let mut dashboard = Dashboard::new();
            dashboard.load(&app.api).await;
            if let Some(error) = dashboard.error() {
                bail!(error.to_string());
            }
            for subject in dashboard.subjects() {
                println!("#{:<4} {} [{}]", subject.id, subject.name, subject.color_tag);
            }
            if let Some(summary) = dashboard.summary() {
                println!();
                println!("Studied: {}", format_duration(summary.total_minutes_studied()));
                println!(
                    "Today: {}/{} tasks, streak {} days",
                    summary.daily.tasks_completed, summary.daily.tasks_planned, summary.weekly.streak_days
                );
            }
        }
        Command::AddSubject { name, color } => {
            let mut form = AddSubjectForm::new(name);
            form.color_tag = color;
            match form.submit(&app.api, &app.events).await {
                Ok(subject) => println!("Added subject #{} {}", subject.id, subject.name),
                Err(_) => bail!(form_message(form.state().error())),
            }
        }
        Command::Tasks { subject_id, all } => {
            let mut page = SubjectDetail::new(subject_id);
            page.load(&app.api).await;
            if let Some(error) = page.error() {
                bail!(error.to_string());
            }
            page.set_show_completed(all);

            if let Some(subject) = page.subject() {
                println!("{}", subject.name);
            }
            if let Some(summary) = page.summary() {
                println!(
                    "{} of {} tasks done ({:.0}%)",
                    summary.completed_tasks, summary.total_tasks, summary.completion_rate
                );
            }
            for task in page.visible_tasks() {
                let predicted = task
                    .predicted_time
                    .map(|m| format!(", predicted {}", format_duration(m)))
                    .unwrap_or_default();
                let overdue = if task.is_overdue() { " OVERDUE" } else { "" };
                println!(
                    "  #{:<4} [{}] {} ({}{}){}",
                    task.id,
                    task.status,
                    task.title,
                    format_duration(task.estimated_time),
                    predicted,
                    overdue
                );
            }
        }
        Command::AddTask { subject_id, title, minutes, deadline } => {
            let mut form = AddTaskForm::new(subject_id);
            form.title = title;
            form.estimated_time = minutes;
            form.deadline = deadline.unwrap_or_default();
            match form.submit(&app.api, &app.events).await {
                Ok(task) => println!("Added task #{} {}", task.id, task.title),
                Err(_) => bail!(form_message(form.state().error())),
            }
        }
        Command::Board => {
            let board = load_board(app).await?;
            for column in board.columns() {
                println!("{} ({})", column.title, column.tasks.len());
                for task in &column.tasks {
                    println!("  #{:<4} {} ({})", task.id, task.title, format_duration(task.estimated_time));
                }
            }
        }
        Command::Move { task_id, status } => {
            let mut board = load_board(app).await?;
            let Some(task) = board.find(task_id).cloned() else {
                bail!("Task #{} is not on the board", task_id);
            };
            let index = board.tasks_in(status).len();
            let drop = DragResult {
                task_id,
                source: DropTarget::new(task.status, 0),
                destination: Some(DropTarget::new(status, index)),
            };

            match board.on_drag_end(drop, &app.api, &app.events).await {
                DragEndResult::Committed { status, .. } => println!("Moved #{} to {}", task_id, status),
                DragEndResult::Ignored => println!("Nothing to do"),
                DragEndResult::CompletionRequested(_) => {
                    println!("Use `studyflow complete {} --minutes <n>` to finish a task", task_id)
                }
                DragEndResult::Reverted { error, .. } => bail!("Could not move task: {}", error),
            }
        }
        Command::Complete { task_id, minutes, difficulty, revise_on } => {
            let board = load_board(app).await?;
            let Some(task) = board.find(task_id).cloned() else {
                bail!("Task #{} is not on the board", task_id);
            };

            let form = CompletionForm::new(task);
            form.set_actual_duration(minutes);
            form.set_difficulty(difficulty);
            form.set_revision_date(revise_on);

            let result = match revise_on {
                Some(_) => form
                    .save_and_reschedule(&app.api, &app.events, Local::now().date_naive())
                    .await
                    .map(|r| format!("Completed #{}; revision #{} scheduled", r.completed.id, r.revision.id)),
                None => form
                    .save_session(&app.api, &app.events)
                    .await
                    .map(|t| format!("Completed #{} {}", t.id, t.title)),
            };
            match result {
                Ok(message) => println!("{}", message),
                Err(_) => bail!(form_message(form.error().as_deref())),
            }
        }
        Command::Pomodoro { task } => {
            let mut runner = PomodoroRunner::new(&app.config.pomodoro, app.api.clone(), app.events.clone());
            if let Some(task_id) = task {
                runner = runner.for_task(task_id);
            }
            runner.start();

            let mut ticker = tokio::time::interval(Duration::from_secs(1));
            loop {
                tokio::select! {
                    _ = tokio::signal::ctrl_c() => {
                        runner.reset();
                        println!();
                        println!("Pomodoro cancelled");
                        return Ok(());
                    }
                    _ = ticker.tick() => {
                        let timer = runner.timer();
                        eprint!("\r{} {}", timer.phase().label(), timer.display());
                        if !runner.is_running() {
                            break;
                        }
                    }
                }
            }
            runner.finished().await;
            println!();
            println!("Focus session done. Sessions so far: {}", app.auth.active_sessions());
        }
        Command::Analytics => {
            let summary = app.api.analytics_summary().await?;
            println!("Studied: {}", format_duration(summary.total_minutes_studied()));
            for subject in &summary.subjects {
                println!("  {:<20} {}", subject.subject_name, format_duration(subject.total_minutes_studied));
            }
            println!(
                "Streak: {} days (longest {}), weekly goal {:.0}%",
                summary.weekly.streak_days,
                summary.weekly.longest_streak,
                summary.weekly.goal_progress()
            );
            println!("Productivity score: {}", summary.performance.productivity_score);

            if let Ok(insights) = app.api.recommendations().await {
                for recommendation in insights.recommendations {
                    println!("* {}", recommendation);
                }
            }
        }
        Command::History => {
            let history = app.api.history_summary().await?;
            println!(
                "{} sessions, {:.1} hours, average difficulty {:.1}",
                history.stats.total_sessions, history.stats.total_hours, history.stats.avg_difficulty
            );
            for session in &history.recent_sessions {
                println!(
                    "  {} {} ({}, difficulty {})",
                    session.completed_at.format("%Y-%m-%d"),
                    session.task.title,
                    format_duration(session.actual_duration),
                    session.user_difficulty_rating
                );
            }
        }
        Command::Notifications => {
            let mut center = NotificationCenter::new();
            center.refresh(&app.api).await;
            if center.count() == 0 {
                println!("No tasks due tomorrow");
            }
            for notification in center.notifications() {
                println!(
                    "{} ({}) due {}",
                    notification.task_title,
                    notification.subject_name,
                    notification.due_date.format("%Y-%m-%d %H:%M")
                );
            }
        }
        Command::Schedule { max_tasks } => {
            let max_tasks = max_tasks.unwrap_or(app.config.schedule_max_tasks);
            let plan = app.api.generate_schedule(max_tasks).await?;
            for (i, item) in plan.schedule.iter().enumerate() {
                println!(
                    "{}. {} ({}) {} [{}]",
                    i + 1,
                    item.task_name,
                    item.subject_name,
                    format_duration(item.predicted_time),
                    priority_label(item.priority_score)
                );
                println!("   {}", item.recommendation_reason);
            }
            println!("Total: {}", format_duration(plan.total_predicted_minutes()));
            for insight in &plan.insights {
                println!("* {}", insight);
            }
        }
    }

    Ok(())
}

async fn load_board(app: &App) -> Result<TaskBoard> {
    let mut board = TaskBoard::new();
    board.load(&app.api).await;
    if let Some(error) = board.error() {
        bail!(error.to_string());
    }
    Ok(board)
}

fn form_message(error: Option<&str>) -> String {
    error.unwrap_or("Request failed").to_string()
}
