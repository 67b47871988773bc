use std::collections::HashSet;

use crate::task::{Task, TaskId};

/// Pending tasks in priority order; the head is "next" when nothing is active.
#[derive(Debug, Default, Clone, PartialEq)]
pub struct TaskQueue {
    tasks: Vec<Task>,
}

impl TaskQueue {
    pub fn from_tasks(tasks: Vec<Task>) -> Self {
        Self { tasks }
    }

    pub fn tasks(&self) -> &[Task] {
        &self.tasks
    }

    pub fn len(&self) -> usize {
        self.tasks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tasks.is_empty()
    }

    pub fn head(&self) -> Option<&Task> {
        self.tasks.first()
    }

    pub fn get(&self, id: TaskId) -> Option<&Task> {
        self.tasks.iter().find(|t| t.id == id)
    }

    pub(crate) fn get_mut(&mut self, id: TaskId) -> Option<&mut Task> {
        self.tasks.iter_mut().find(|t| t.id == id)
    }

    pub fn contains(&self, id: TaskId) -> bool {
        self.tasks.iter().any(|t| t.id == id)
    }

    /// First task referencing the given Redmine issue.
    pub fn find_by_issue(&self, issue_id: u32) -> Option<&Task> {
        self.tasks.iter().find(|t| t.issue_id == issue_id)
    }

    pub(crate) fn push(&mut self, task: Task) {
        self.tasks.push(task);
    }

    pub(crate) fn remove(&mut self, id: TaskId) -> Option<Task> {
        let index = self.tasks.iter().position(|t| t.id == id)?;
        Some(self.tasks.remove(index))
    }

    /// Applies a caller-supplied order if it is a permutation of the current
    /// ids; otherwise leaves the queue untouched and returns false.
    pub(crate) fn reorder(&mut self, order: &[TaskId]) -> bool {
        if order.len() != self.tasks.len() {
            return false;
        }
        let current: HashSet<TaskId> = self.tasks.iter().map(|t| t.id).collect();
        let proposed: HashSet<TaskId> = order.iter().copied().collect();
        if current != proposed {
            return false;
        }

        self.tasks
            .sort_by_key(|t| order.iter().position(|id| *id == t.id));
        true
    }
}
