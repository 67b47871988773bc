use chrono::{DateTime, Utc};

/// Externally visible timer lifecycle, including the first-note prompt stage.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TimerPhase {
    Idle,
    AwaitingFirstNote,
    Running,
    Paused,
    Stopped,
}

/// Internal engine state; the session maps it into a [`TimerPhase`].
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub enum TimerState {
    #[default]
    Idle,
    Running,
    Paused,
    Stopped,
}

/// Wall-clock stopwatch over one running span at a time.
///
/// The engine holds no accumulated total itself: the span it measures is
/// banked by the caller (into the active task's `elapsed_ms` or the manual
/// bank) whenever the span ends. Display code derives elapsed time from
/// `now`, so a suspended process snaps to the correct value on next render.
#[derive(Debug, Default, Clone, PartialEq)]
pub struct TimerEngine {
    state: TimerState,
    start_time: Option<DateTime<Utc>>,
}

impl TimerEngine {
    pub fn state(&self) -> TimerState {
        self.state
    }

    pub fn is_running(&self) -> bool {
        self.state == TimerState::Running
    }

    /// Milliseconds of the span running at `now`; zero when not running.
    pub fn running_ms(&self, now: DateTime<Utc>) -> i64 {
        self.start_time
            .map(|start| (now - start).num_milliseconds().max(0))
            .unwrap_or(0)
    }

    /// Begins (or resumes) a span at `now`.
    pub(crate) fn resume(&mut self, now: DateTime<Utc>) {
        self.state = TimerState::Running;
        self.start_time = Some(now);
    }

    /// Ends the running span, returning the milliseconds it lasted.
    pub(crate) fn pause(&mut self, now: DateTime<Utc>) -> i64 {
        let span = self.running_ms(now);
        self.state = TimerState::Paused;
        self.start_time = None;
        span
    }

    /// Freezes a flushed session for the summary.
    pub(crate) fn mark_stopped(&mut self) {
        self.state = TimerState::Stopped;
        self.start_time = None;
    }

    /// Restores a reloaded session directly into the paused state.
    pub(crate) fn mark_paused(&mut self) {
        self.state = TimerState::Paused;
        self.start_time = None;
    }

    pub(crate) fn reset(&mut self) {
        *self = Self::default();
    }
}

/// Formats whole seconds as `HH:MM:SS`, truncating, never rounding up.
pub fn format_hms(total_seconds: i64) -> String {
    let total_seconds = total_seconds.max(0);
    let hours = total_seconds / 3600;
    let minutes = (total_seconds % 3600) / 60;
    let seconds = total_seconds % 60;
    format!("{:02}:{:02}:{:02}", hours, minutes, seconds)
}
