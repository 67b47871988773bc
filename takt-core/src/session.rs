use std::sync::Arc;

use chrono::{DateTime, NaiveDate, Utc};

use crate::activity::ActivityLog;
use crate::clock::{Clock, SystemClock};
use crate::error::SessionError;
use crate::queue::TaskQueue;
use crate::store::QueueStore;
use crate::submit::SubmissionBasis;
use crate::task::{ManualSelection, Task, TaskDraft, TaskId};
use crate::timer::{format_hms, TimerEngine, TimerPhase, TimerState};

/// Result of a start request: either the timer is running, or the session
/// needs its first note before anything changes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StartOutcome {
    Started,
    NeedsFirstNote { suggested: Option<String> },
}

/// What the main card should show.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Focus {
    /// A task owns the timer (running, paused mid-session, or stopped
    /// awaiting submission).
    Active(TaskId),
    /// Nothing active; the queue head is primed for a one-click start.
    NextInQueue(TaskId),
    /// Empty queue; the manual project/issue form drives the timer.
    Manual,
}

/// A start waiting on the first-note prompt. Nothing is mutated until the
/// note arrives; cancelling drops this and leaves every task as it was.
#[derive(Debug, Clone, PartialEq)]
enum PendingStart {
    Task {
        id: TaskId,
        suggested: Option<String>,
    },
    Manual,
}

/// Single owner of queue, timer engine, activity logs and the store.
///
/// Every mutation funnels through one path: validate, mutate, persist,
/// notify. Observers re-read state through the accessors; the session never
/// pushes data, only a revision bump.
pub struct Session {
    clock: Arc<dyn Clock>,
    store: QueueStore,
    queue: TaskQueue,
    engine: TimerEngine,
    active_task_id: Option<TaskId>,
    manual_selection: Option<ManualSelection>,
    manual_log: ActivityLog,
    manual_banked_ms: i64,
    pending_start: Option<PendingStart>,
    last_task_id: Option<TaskId>,
    revision: u64,
    listener: Option<Box<dyn FnMut(u64) + Send>>,
}

impl Session {
    pub fn new(store: QueueStore) -> Self {
        Self::with_clock(store, Arc::new(SystemClock))
    }

    /// Builds a session with an injected clock, restoring persisted state.
    /// A restored active task always comes back paused, never running.
    pub fn with_clock(store: QueueStore, clock: Arc<dyn Clock>) -> Self {
        let tasks = store.load();
        let last_task_id = tasks.iter().map(|t| t.id).max();
        let active_task_id = store
            .load_active_id()
            .filter(|id| tasks.iter().any(|t| t.id == *id));

        let mut engine = TimerEngine::default();
        if active_task_id.is_some() {
            engine.mark_paused();
        }

        Self {
            clock,
            store,
            queue: TaskQueue::from_tasks(tasks),
            engine,
            active_task_id,
            manual_selection: None,
            manual_log: ActivityLog::default(),
            manual_banked_ms: 0,
            pending_start: None,
            last_task_id,
            revision: 0,
            listener: None,
        }
    }

    /// Registers a change callback invoked with the new revision after every
    /// mutation.
    pub fn set_listener(&mut self, listener: impl FnMut(u64) + Send + 'static) {
        self.listener = Some(Box::new(listener));
    }

    pub fn revision(&self) -> u64 {
        self.revision
    }

    // ===== Read side =====

    pub fn tasks(&self) -> &[Task] {
        self.queue.tasks()
    }

    pub fn task(&self, id: TaskId) -> Option<&Task> {
        self.queue.get(id)
    }

    pub fn active_task(&self) -> Option<&Task> {
        self.active_task_id.and_then(|id| self.queue.get(id))
    }

    pub fn manual_selection(&self) -> Option<&ManualSelection> {
        self.manual_selection.as_ref()
    }

    pub fn phase(&self) -> TimerPhase {
        if self.pending_start.is_some() {
            return TimerPhase::AwaitingFirstNote;
        }
        match self.engine.state() {
            TimerState::Idle => TimerPhase::Idle,
            TimerState::Running => TimerPhase::Running,
            TimerState::Paused => TimerPhase::Paused,
            TimerState::Stopped => TimerPhase::Stopped,
        }
    }

    pub fn focus(&self) -> Focus {
        if let Some(id) = self.active_task_id {
            return Focus::Active(id);
        }
        if let Some(head) = self.queue.head() {
            return Focus::NextInQueue(head.id);
        }
        Focus::Manual
    }

    pub fn can_start(&self) -> bool {
        match self.phase() {
            TimerPhase::Running | TimerPhase::Stopped | TimerPhase::AwaitingFirstNote => false,
            TimerPhase::Idle | TimerPhase::Paused => {
                self.active_task_id.is_some()
                    || !self.queue.is_empty()
                    || self.manual_selection.is_some()
            }
        }
    }

    /// Activity log of whatever owns the timer (active task or manual form).
    pub fn activities(&self) -> &ActivityLog {
        match self.active_task() {
            Some(task) => &task.activities,
            None => &self.manual_log,
        }
    }

    /// Total tracked milliseconds at `now`: the owner's bank plus the live
    /// span. Pure in `now`, so rendering never accumulates drift.
    pub fn total_elapsed_ms(&self, now: DateTime<Utc>) -> i64 {
        let base = match self.active_task() {
            Some(task) => task.elapsed_ms,
            None => self.manual_banked_ms,
        };
        base + self.engine.running_ms(now)
    }

    /// Whole tracked seconds at `now` (floor).
    pub fn elapsed_seconds(&self, now: DateTime<Utc>) -> i64 {
        self.total_elapsed_ms(now) / 1000
    }

    /// `HH:MM:SS` for the timer display.
    pub fn elapsed_display(&self, now: DateTime<Utc>) -> String {
        format_hms(self.elapsed_seconds(now))
    }

    pub fn today(&self) -> NaiveDate {
        self.clock.now().date_naive()
    }

    // ===== Queue operations =====

    /// Validates and appends a task. The first enqueue into an empty queue
    /// immediately surfaces the task as "next".
    pub fn enqueue(&mut self, draft: TaskDraft) -> Result<TaskId, SessionError> {
        let (project_id, issue_id) = draft.checked_ids()?;
        let id = TaskId::allocate(self.clock.now(), self.last_task_id);
        self.last_task_id = Some(id);

        self.queue.push(Task {
            id,
            project_id,
            project_name: draft.project_name,
            issue_id,
            subject: draft.subject,
            note: draft.note,
            activity_id: draft.activity_id,
            activity_name: draft.activity_name,
            elapsed_ms: 0,
            start_time: None,
            is_running: false,
            activities: ActivityLog::default(),
        });
        self.commit()?;
        Ok(id)
    }

    /// Removes a task. Removing the ACTIVE task is a hard delete: the live
    /// session is torn down and the next queue head surfaces with its own
    /// accumulated time.
    pub fn dequeue(&mut self, id: TaskId) -> Result<Task, SessionError> {
        let Some(task) = self.queue.remove(id) else {
            return Err(SessionError::Invariant(format!("task {} is not queued", id)));
        };

        if self.active_task_id == Some(id) {
            self.active_task_id = None;
            self.engine.reset();
        }
        if matches!(&self.pending_start, Some(PendingStart::Task { id: pending, .. }) if *pending == id)
        {
            self.pending_start = None;
        }

        self.commit()?;
        Ok(task)
    }

    /// Applies a drag-reorder. Anything that is not a permutation of the
    /// current ids is refused so a partial update cannot corrupt the queue.
    pub fn reorder(&mut self, order: &[TaskId]) -> Result<(), SessionError> {
        if !self.queue.reorder(order) {
            tracing::warn!("rejected queue reorder that was not a permutation");
            return Err(SessionError::Invariant(
                "reorder must keep exactly the current tasks".into(),
            ));
        }
        self.commit()
    }

    // ===== Manual form =====

    /// Sets the manual project/issue selection used when the queue is empty.
    /// Not persisted; the queue always pre-empts it.
    pub fn select_manual(&mut self, selection: ManualSelection) {
        self.manual_selection = Some(selection);
        self.touch();
    }

    pub fn clear_manual_selection(&mut self) {
        self.manual_selection = None;
        self.touch();
    }

    // ===== Timer operations =====

    /// Starts tracking: resumes a paused session, else starts the queue head,
    /// else starts a manual session from the form selection.
    pub fn start(&mut self) -> Result<StartOutcome, SessionError> {
        if self.pending_start.is_some() {
            return Err(SessionError::Invariant(
                "a start is already awaiting its first note".into(),
            ));
        }
        match self.phase() {
            TimerPhase::Running => {
                return Err(SessionError::Invariant("timer is already running".into()))
            }
            TimerPhase::Stopped => {
                return Err(SessionError::Invariant(
                    "stopped session awaits submission or reset".into(),
                ))
            }
            _ => {}
        }

        if let Some(id) = self.active_task_id {
            return self.resume_active(id);
        }
        if let Some(head) = self.queue.head() {
            let id = head.id;
            return self.start_task(id);
        }

        // Manual session: resume a paused span, or prompt on first start.
        if self.engine.state() == TimerState::Paused {
            let now = self.clock.now();
            self.engine.resume(now);
            self.commit()?;
            return Ok(StartOutcome::Started);
        }
        if self.manual_selection.is_none() {
            return Err(SessionError::Validation(
                "select a project and issue first".into(),
            ));
        }
        if self.manual_log.is_empty() && self.manual_banked_ms == 0 {
            self.pending_start = Some(PendingStart::Manual);
            self.touch();
            return Ok(StartOutcome::NeedsFirstNote { suggested: None });
        }
        self.start_manual(None)?;
        Ok(StartOutcome::Started)
    }

    /// Starts (or resumes) a specific queued task. Switching away from a
    /// running task pauses it in the same operation; a task that was never
    /// worked on first asks for its initial note.
    pub fn start_task(&mut self, id: TaskId) -> Result<StartOutcome, SessionError> {
        if self.pending_start.is_some() {
            return Err(SessionError::Invariant(
                "a start is already awaiting its first note".into(),
            ));
        }
        if self.active_task_id == Some(id) {
            return match self.phase() {
                TimerPhase::Running => {
                    Err(SessionError::Invariant("task is already running".into()))
                }
                TimerPhase::Stopped => Err(SessionError::Invariant(
                    "stopped session awaits submission or reset".into(),
                )),
                _ => self.resume_active(id),
            };
        }
        if self.phase() == TimerPhase::Stopped {
            return Err(SessionError::Invariant(
                "stopped session awaits submission or reset".into(),
            ));
        }
        let Some(task) = self.queue.get(id) else {
            return Err(SessionError::Invariant(format!("task {} is not queued", id)));
        };

        if task.has_history() {
            self.activate_task(id, None)?;
            Ok(StartOutcome::Started)
        } else {
            let suggested = task.note.clone();
            self.pending_start = Some(PendingStart::Task {
                id,
                suggested: suggested.clone(),
            });
            self.touch();
            Ok(StartOutcome::NeedsFirstNote { suggested })
        }
    }

    /// Completes a start that was waiting on its first note. A blank note is
    /// allowed and simply records nothing.
    pub fn provide_first_note(&mut self, note: &str) -> Result<(), SessionError> {
        let Some(pending) = self.pending_start.take() else {
            return Err(SessionError::Invariant("no start awaiting a note".into()));
        };
        match pending {
            PendingStart::Task { id, .. } => self.activate_task(id, Some(note)),
            PendingStart::Manual => self.start_manual(Some(note)),
        }
    }

    /// Abandons a pending start. Zero state change: whatever was running
    /// keeps running.
    pub fn cancel_start(&mut self) -> Result<(), SessionError> {
        if self.pending_start.take().is_none() {
            return Err(SessionError::Invariant("no start awaiting a note".into()));
        }
        self.touch();
        Ok(())
    }

    /// Pauses the running session, banking the live span into its owner.
    pub fn pause(&mut self) -> Result<(), SessionError> {
        if self.phase() != TimerPhase::Running {
            return Err(SessionError::Invariant("timer is not running".into()));
        }
        let now = self.clock.now();
        self.flush_running(now);
        self.commit()
    }

    /// Stops the session for submission: banks the live span and finalizes
    /// the open activity entry so durations sum to the floored total.
    pub fn stop(&mut self) -> Result<(), SessionError> {
        match self.phase() {
            TimerPhase::Running | TimerPhase::Paused => {}
            _ => return Err(SessionError::Invariant("no session to stop".into())),
        }
        let now = self.clock.now();
        self.flush_running(now);
        let total = self.total_elapsed_ms(now);
        self.activities_mut().close_last(total);
        self.engine.mark_stopped();
        self.commit()
    }

    /// Ends the session without submitting. A task keeps its banked time and
    /// returns to the queue; manual bookkeeping is discarded.
    pub fn reset(&mut self) -> Result<(), SessionError> {
        let now = self.clock.now();
        self.flush_running(now);
        if let Some(task) = self.active_task_id.and_then(|id| self.queue.get_mut(id)) {
            task.is_running = false;
            task.start_time = None;
        }
        self.active_task_id = None;
        self.manual_banked_ms = 0;
        self.manual_log.clear();
        self.engine.reset();
        self.pending_start = None;
        self.commit()
    }

    /// Records a performed-task note against the running or paused session.
    /// Returns whether an entry was added (blank notes are dropped).
    pub fn add_activity(&mut self, text: &str) -> Result<bool, SessionError> {
        match self.phase() {
            TimerPhase::Running | TimerPhase::Paused => {}
            _ => {
                return Err(SessionError::Invariant(
                    "no session to log an activity against".into(),
                ))
            }
        }
        let now = self.clock.now();
        let total = self.total_elapsed_ms(now);
        let added = self.activities_mut().append(text, now, total);
        if added {
            self.commit()?;
        }
        Ok(added)
    }

    /// Snapshot for the submission summary; only valid once stopped.
    pub fn submission_basis(&self) -> Result<SubmissionBasis, SessionError> {
        if self.phase() != TimerPhase::Stopped {
            return Err(SessionError::Invariant(
                "stop the timer before submitting".into(),
            ));
        }
        let now = self.clock.now();
        let elapsed_seconds = self.elapsed_seconds(now);

        let (issue_id, subject, activity_id) = match self.active_task() {
            Some(task) => (task.issue_id, task.subject.clone(), task.activity_id),
            None => match &self.manual_selection {
                Some(sel) => (sel.issue_id, sel.subject.clone(), sel.activity_id),
                None => {
                    return Err(SessionError::Validation(
                        "no issue to submit against".into(),
                    ))
                }
            },
        };

        Ok(SubmissionBasis {
            issue_id,
            subject,
            activity_id,
            elapsed_seconds,
            comments: self.activities().joined_comments(),
        })
    }

    /// Removes the submitted task and clears the session. Prefers the active
    /// task; falls back to matching the issue id, because a manually started
    /// session has no queue entry of its own.
    pub fn advance_after_submit(&mut self, issue_id: u32) -> Result<(), SessionError> {
        let target = self
            .active_task_id
            .filter(|id| self.queue.contains(*id))
            .or_else(|| self.queue.find_by_issue(issue_id).map(|t| t.id));
        if let Some(id) = target {
            self.queue.remove(id);
        }

        self.active_task_id = None;
        self.manual_banked_ms = 0;
        self.manual_log.clear();
        self.engine.reset();
        self.pending_start = None;
        self.commit()
    }

    // ===== Internals =====

    fn activities_mut(&mut self) -> &mut ActivityLog {
        let active = self.active_task_id;
        match active.and_then(|id| self.queue.get_mut(id)) {
            Some(task) => &mut task.activities,
            None => &mut self.manual_log,
        }
    }

    /// Banks the running span into its owner and leaves the engine paused.
    /// No-op when nothing is running.
    fn flush_running(&mut self, now: DateTime<Utc>) {
        if !self.engine.is_running() {
            return;
        }
        let span = self.engine.pause(now);
        let active = self.active_task_id;
        match active.and_then(|id| self.queue.get_mut(id)) {
            Some(task) => {
                task.elapsed_ms += span;
                task.is_running = false;
                task.start_time = None;
            }
            None => self.manual_banked_ms += span,
        }
    }

    fn resume_active(&mut self, id: TaskId) -> Result<StartOutcome, SessionError> {
        let now = self.clock.now();
        let Some(task) = self.queue.get_mut(id) else {
            return Err(SessionError::Invariant(
                "active task vanished from the queue".into(),
            ));
        };
        task.is_running = true;
        task.start_time = Some(now);
        self.engine.resume(now);
        self.commit()?;
        Ok(StartOutcome::Started)
    }

    /// Makes `id` the active running task: flushes and pauses whoever was
    /// running, then starts the newcomer's span, all in one step so there is
    /// never a moment with two running tasks.
    fn activate_task(&mut self, id: TaskId, first_note: Option<&str>) -> Result<(), SessionError> {
        if !self.queue.contains(id) {
            return Err(SessionError::Invariant(format!("task {} is not queued", id)));
        }
        let now = self.clock.now();
        self.flush_running(now);

        if let Some(prev) = self
            .active_task_id
            .filter(|prev| *prev != id)
            .and_then(|prev| self.queue.get_mut(prev))
        {
            prev.is_running = false;
            prev.start_time = None;
        }

        let Some(task) = self.queue.get_mut(id) else {
            return Err(SessionError::Invariant(format!("task {} is not queued", id)));
        };
        task.is_running = true;
        task.start_time = Some(now);
        if let Some(note) = first_note {
            let base = task.elapsed_ms;
            task.activities.append(note, now, base);
        }

        self.active_task_id = Some(id);
        self.engine.resume(now);
        self.commit()
    }

    fn start_manual(&mut self, first_note: Option<&str>) -> Result<(), SessionError> {
        let now = self.clock.now();
        self.flush_running(now);
        if let Some(note) = first_note {
            let base = self.manual_banked_ms;
            self.manual_log.append(note, now, base);
        }
        self.engine.resume(now);
        self.commit()
    }

    /// Persist-then-notify; the single exit point of every mutation.
    fn commit(&mut self) -> Result<(), SessionError> {
        self.store.save(self.queue.tasks())?;
        self.store.save_active_id(self.active_task_id)?;
        self.touch();
        Ok(())
    }

    fn touch(&mut self) {
        self.revision += 1;
        if let Some(listener) = &mut self.listener {
            listener(self.revision);
        }
    }
}
