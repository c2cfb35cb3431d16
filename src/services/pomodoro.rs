use chrono::Utc;
use parking_lot::Mutex;
use std::sync::Arc;
use std::time::Duration;
use tokio::task::JoinHandle;
use tokio::time::{interval, MissedTickBehavior};
use tracing::{debug, info, warn};

use super::api_client::ApiClient;
use super::events::{AppEvent, EventBus};
use crate::config::PomodoroConfig;
use crate::domain::pomodoro::PomodoroLog;
use crate::utils::format_clock;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    Focus,
    Break,
}

impl Phase {
    pub fn label(self) -> &'static str {
        match self {
            Phase::Focus => "Focus Session",
            Phase::Break => "Break Time!",
        }
    }

    fn next(self) -> Self {
        match self {
            Phase::Focus => Phase::Break,
            Phase::Break => Phase::Focus,
        }
    }
}

/// Countdown between focus and break phases, advanced one second per `tick`.
#[derive(Debug, Clone, PartialEq)]
pub struct PomodoroTimer {
    focus_seconds: u32,
    break_seconds: u32,
    phase: Phase,
    remaining: u32,
    active: bool,
}

impl PomodoroTimer {
    pub fn new(config: &PomodoroConfig) -> Self {
        Self::with_durations(config.focus_seconds(), config.break_seconds())
    }

    pub fn with_durations(focus_seconds: u32, break_seconds: u32) -> Self {
        Self {
            focus_seconds,
            break_seconds,
            phase: Phase::Focus,
            remaining: focus_seconds,
            active: false,
        }
    }

    pub fn phase(&self) -> Phase {
        self.phase
    }

    pub fn remaining(&self) -> u32 {
        self.remaining
    }

    pub fn is_active(&self) -> bool {
        self.active
    }

    pub fn focus_seconds(&self) -> u32 {
        self.focus_seconds
    }

    fn phase_seconds(&self, phase: Phase) -> u32 {
        match phase {
            Phase::Focus => self.focus_seconds,
            Phase::Break => self.break_seconds,
        }
    }

    /// Start or pause. Returns the new active flag.
    pub fn toggle(&mut self) -> bool {
        self.active = !self.active;
        self.active
    }

    pub fn start(&mut self) {
        self.active = true;
    }

    pub fn pause(&mut self) {
        self.active = false;
    }

    pub fn reset(&mut self) {
        self.active = false;
        self.phase = Phase::Focus;
        self.remaining = self.focus_seconds;
    }

    /// Advance one second. Returns the phase that just finished, if any; the
    /// timer then stops and loads the next phase.
    pub fn tick(&mut self) -> Option<Phase> {
        if !self.active {
            return None;
        }

        self.remaining = self.remaining.saturating_sub(1);
        if self.remaining > 0 {
            return None;
        }

        let finished = self.phase;
        self.active = false;
        self.phase = finished.next();
        self.remaining = self.phase_seconds(self.phase);
        Some(finished)
    }

    /// Fraction of the current phase already elapsed, 0.0 to 1.0.
    pub fn progress(&self) -> f64 {
        let total = self.phase_seconds(self.phase);
        if total == 0 {
            return 1.0;
        }
        f64::from(total.saturating_sub(self.remaining)) / f64::from(total)
    }

    pub fn display(&self) -> String {
        format_clock(self.remaining)
    }
}

/// Drives a [`PomodoroTimer`] from a one-second interval while it is armed.
///
/// The background task is aborted on pause, reset and drop.
pub struct PomodoroRunner {
    timer: Arc<Mutex<PomodoroTimer>>,
    api: ApiClient,
    events: EventBus,
    task_id: Option<i64>,
    handle: Option<JoinHandle<()>>,
}

impl PomodoroRunner {
    pub fn new(config: &PomodoroConfig, api: ApiClient, events: EventBus) -> Self {
        Self::with_timer(PomodoroTimer::new(config), api, events)
    }

    pub fn with_timer(timer: PomodoroTimer, api: ApiClient, events: EventBus) -> Self {
        Self {
            timer: Arc::new(Mutex::new(timer)),
            api,
            events,
            task_id: None,
            handle: None,
        }
    }

    /// Attribute logged focus sessions to a task.
    pub fn for_task(mut self, task_id: i64) -> Self {
        self.task_id = Some(task_id);
        self
    }

    pub fn timer(&self) -> PomodoroTimer {
        self.timer.lock().clone()
    }

    pub fn is_running(&self) -> bool {
        self.handle.as_ref().is_some_and(|h| !h.is_finished())
    }

    pub fn start(&mut self) {
        if self.is_running() {
            return;
        }

        self.timer.lock().start();
        let timer = self.timer.clone();
        let api = self.api.clone();
        let events = self.events.clone();
        let task_id = self.task_id;

        self.handle = Some(tokio::spawn(async move {
            let mut ticker = interval(Duration::from_secs(1));
            ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
            // The first tick completes immediately
            ticker.tick().await;

            loop {
                ticker.tick().await;

                let (finished, focus_seconds) = {
                    let mut timer = timer.lock();
                    (timer.tick(), timer.focus_seconds())
                };

                match finished {
                    Some(Phase::Focus) => {
                        info!(task_id = ?task_id, "Focus session finished");
                        log_focus_session(&api, &events, focus_seconds, task_id).await;
                        break;
                    }
                    Some(Phase::Break) => {
                        info!("Break finished");
                        break;
                    }
                    None if !timer.lock().is_active() => break,
                    None => {}
                }
            }
        }));
    }

    pub fn pause(&mut self) {
        self.cancel();
        self.timer.lock().pause();
    }

    pub fn toggle(&mut self) {
        if self.is_running() {
            self.pause();
        } else {
            self.start();
        }
    }

    pub fn reset(&mut self) {
        self.cancel();
        self.timer.lock().reset();
    }

    /// Wait for the current phase to run out. Returns immediately when the
    /// runner is not armed.
    pub async fn finished(&mut self) {
        if let Some(handle) = self.handle.take() {
            if let Err(e) = handle.await {
                if !e.is_cancelled() {
                    warn!(error = %e, "Pomodoro task failed");
                }
            }
        }
    }

    fn cancel(&mut self) {
        if let Some(handle) = self.handle.take() {
            handle.abort();
            debug!("Pomodoro ticker cancelled");
        }
    }
}

impl Drop for PomodoroRunner {
    fn drop(&mut self) {
        self.cancel();
    }
}

async fn log_focus_session(api: &ApiClient, events: &EventBus, focus_seconds: u32, task_id: Option<i64>) {
    let log = PomodoroLog::ending_at(Utc::now(), focus_seconds, task_id);

    match api.log_pomodoro(&log).await {
        Ok(_) => {
            let count = api.auth().record_pomodoro_session().await;
            info!(duration = log.duration, sessions = count, "Pomodoro session logged");
            events.publish(AppEvent::PomodoroLogged {
                task_id,
                duration_minutes: log.duration,
            });
        }
        Err(e) => warn!(error = %e, "Failed to log pomodoro session"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_helpers::TestContext;
    use serde_json::json;

    #[test]
    fn test_timer_counts_down_only_while_active() {
        let mut timer = PomodoroTimer::with_durations(3, 2);
        assert_eq!(timer.tick(), None);
        assert_eq!(timer.remaining(), 3);

        assert!(timer.toggle());
        assert_eq!(timer.tick(), None);
        assert_eq!(timer.display(), "00:02");

        assert!(!timer.toggle());
        assert_eq!(timer.tick(), None);
        assert_eq!(timer.remaining(), 2);
    }

    #[test]
    fn test_focus_end_flips_to_break() {
        let mut timer = PomodoroTimer::with_durations(2, 5);
        timer.start();
        assert_eq!(timer.tick(), None);
        assert_eq!(timer.tick(), Some(Phase::Focus));

        assert!(!timer.is_active());
        assert_eq!(timer.phase(), Phase::Break);
        assert_eq!(timer.remaining(), 5);
        assert_eq!(timer.phase().label(), "Break Time!");
    }

    #[test]
    fn test_reset_returns_to_focus() {
        let mut timer = PomodoroTimer::with_durations(2, 1);
        timer.start();
        timer.tick();
        timer.tick();
        timer.reset();

        assert_eq!(timer.phase(), Phase::Focus);
        assert_eq!(timer.remaining(), 2);
        assert!(!timer.is_active());
        assert_eq!(timer.progress(), 0.0);
    }

    #[test]
    fn test_progress() {
        let mut timer = PomodoroTimer::with_durations(4, 1);
        timer.start();
        timer.tick();
        assert_eq!(timer.progress(), 0.25);
        assert_eq!(PomodoroTimer::with_durations(0, 0).progress(), 1.0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_runner_logs_focus_but_not_break() {
        let ctx = TestContext::logged_in().await.unwrap();
        ctx.transport.route("/pomodoro/log", 201, json!({"message": "Pomodoro session logged successfully"}));
        let mut events = ctx.events.subscribe();

        let mut runner = PomodoroRunner::with_timer(
            PomodoroTimer::with_durations(90, 3),
            ctx.api.clone(),
            ctx.events.clone(),
        )
        .for_task(7);

        runner.start();
        runner.finished().await;

        let logged = ctx.transport.requests_to("/pomodoro/log");
        assert_eq!(logged.len(), 1);
        let body = logged[0].body.clone().unwrap();
        assert_eq!(body["duration"], 2);
        assert_eq!(body["task_id"], 7);
        assert_eq!(ctx.auth.active_sessions(), 1);
        assert_eq!(
            events.recv().await.unwrap(),
            AppEvent::PomodoroLogged { task_id: Some(7), duration_minutes: 2 }
        );

        assert_eq!(runner.timer().phase(), Phase::Break);
        runner.start();
        runner.finished().await;

        assert_eq!(ctx.transport.requests_to("/pomodoro/log").len(), 1);
        assert_eq!(runner.timer().phase(), Phase::Focus);
        assert_eq!(ctx.auth.active_sessions(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_pause_cancels_ticker() {
        let ctx = TestContext::logged_in().await.unwrap();
        let mut runner = PomodoroRunner::with_timer(
            PomodoroTimer::with_durations(10, 3),
            ctx.api.clone(),
            ctx.events.clone(),
        );

        runner.start();
        tokio::time::sleep(Duration::from_millis(3500)).await;
        runner.pause();
        let paused_at = runner.timer().remaining();

        tokio::time::sleep(Duration::from_secs(5)).await;
        assert_eq!(runner.timer().remaining(), paused_at);
        assert!(paused_at < 10);
        assert!(!runner.is_running());
        assert!(ctx.transport.requests().is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn test_failed_log_is_ignored() {
        let ctx = TestContext::logged_in().await.unwrap();
        ctx.transport.route("/pomodoro/log", 500, json!({"detail": "boom"}));

        let mut runner = PomodoroRunner::with_timer(
            PomodoroTimer::with_durations(2, 1),
            ctx.api.clone(),
            ctx.events.clone(),
        );
        runner.start();
        runner.finished().await;

        assert_eq!(ctx.auth.active_sessions(), 0);
        assert_eq!(runner.timer().phase(), Phase::Break);
    }
}
