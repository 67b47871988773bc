use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::activity::ActivityLog;
use crate::error::SessionError;

/// Millisecond creation timestamp, bumped by one on collision so two adds in
/// the same millisecond stay unique and ids remain monotonic.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize,
)]
#[serde(transparent)]
pub struct TaskId(i64);

impl TaskId {
    pub fn value(&self) -> i64 {
        self.0
    }

    pub(crate) fn allocate(now: DateTime<Utc>, last: Option<TaskId>) -> TaskId {
        let now_ms = now.timestamp_millis();
        match last {
            Some(TaskId(prev)) if now_ms <= prev => TaskId(prev + 1),
            _ => TaskId(now_ms),
        }
    }
}

impl From<i64> for TaskId {
    fn from(value: i64) -> Self {
        TaskId(value)
    }
}

impl fmt::Display for TaskId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// A queued unit of work linked to a Redmine issue, carrying its own
/// resumable timer state and activity log.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Task {
    pub id: TaskId,
    pub project_id: u32,
    pub project_name: String,
    pub issue_id: u32,
    pub subject: String,
    #[serde(default)]
    pub note: Option<String>,
    #[serde(default)]
    pub activity_id: Option<u32>,
    #[serde(default)]
    pub activity_name: Option<String>,
    /// Milliseconds banked across pauses; never decreases.
    #[serde(default)]
    pub elapsed_ms: i64,
    /// Wall clock of the last resume; `None` whenever the task is not running.
    #[serde(default)]
    pub start_time: Option<DateTime<Utc>>,
    /// Cached "this task owns the running timer" flag; forced off on reload.
    #[serde(default)]
    pub is_running: bool,
    #[serde(default)]
    pub activities: ActivityLog,
}

impl Task {
    /// True once the task has been worked on; resuming skips the first-note
    /// prompt.
    pub fn has_history(&self) -> bool {
        self.elapsed_ms > 0 || !self.activities.is_empty()
    }

    /// Whole seconds on the task's own bank (excludes any live span).
    pub fn banked_seconds(&self) -> i64 {
        self.elapsed_ms / 1000
    }
}

/// Input for enqueueing a task, validated by the session.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct TaskDraft {
    pub project_id: Option<u32>,
    pub project_name: String,
    pub issue_id: Option<u32>,
    pub subject: String,
    pub note: Option<String>,
    pub activity_id: Option<u32>,
    pub activity_name: Option<String>,
}

impl TaskDraft {
    /// Quick-add draft from a fetched issue (watched/assigned lists).
    pub fn from_issue(issue: &redmine::Issue) -> Self {
        Self {
            project_id: Some(issue.project.id),
            project_name: issue.project.name.clone(),
            issue_id: Some(issue.id),
            subject: issue.subject.clone(),
            ..Self::default()
        }
    }

    pub(crate) fn checked_ids(&self) -> Result<(u32, u32), SessionError> {
        let project_id = self
            .project_id
            .ok_or_else(|| SessionError::Validation("a project must be selected".into()))?;
        let issue_id = self
            .issue_id
            .ok_or_else(|| SessionError::Validation("an issue must be selected".into()))?;
        if self.subject.trim().is_empty() {
            return Err(SessionError::Validation("the issue subject is empty".into()));
        }
        Ok((project_id, issue_id))
    }
}

/// Project/issue picked in the manual form, used when the queue is empty.
#[derive(Debug, Clone, PartialEq)]
pub struct ManualSelection {
    pub project_id: u32,
    pub project_name: String,
    pub issue_id: u32,
    pub subject: String,
    pub activity_id: Option<u32>,
    pub activity_name: Option<String>,
}
