use std::path::PathBuf;

use thiserror::Error;

use crate::task::{Task, TaskId};

const QUEUE_FILE: &str = "queue.json";
const ACTIVE_TASK_FILE: &str = "active_task";

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("cannot determine data directory")]
    NoDataDir,
    #[error("failed to persist queue state: {0}")]
    Io(#[from] std::io::Error),
    #[error("failed to encode queue state: {0}")]
    Encode(#[from] serde_json::Error),
}

/// File-backed store for the task queue and the active-task marker.
///
/// Reads are tolerant: missing or unreadable data yields an empty queue so a
/// corrupt file never wedges startup. Writes are synchronous; every mutating
/// session operation persists before returning.
#[derive(Debug, Clone)]
pub struct QueueStore {
    root: PathBuf,
}

impl QueueStore {
    /// Store under the platform data directory (`.../takt`).
    pub fn open_default() -> Result<Self, StoreError> {
        let root = dirs::data_dir().ok_or(StoreError::NoDataDir)?.join("takt");
        Ok(Self { root })
    }

    /// Store rooted at an explicit directory.
    pub fn at(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    fn queue_path(&self) -> PathBuf {
        self.root.join(QUEUE_FILE)
    }

    fn active_task_path(&self) -> PathBuf {
        self.root.join(ACTIVE_TASK_FILE)
    }

    /// Loads the queue. A reload never resumes a ticking timer: any task
    /// saved mid-run comes back paused.
    pub fn load(&self) -> Vec<Task> {
        let path = self.queue_path();
        let raw = match std::fs::read_to_string(&path) {
            Ok(raw) => raw,
            Err(_) => return Vec::new(),
        };

        let mut tasks: Vec<Task> = match serde_json::from_str(&raw) {
            Ok(tasks) => tasks,
            Err(e) => {
                tracing::warn!("discarding unreadable queue file {}: {}", path.display(), e);
                return Vec::new();
            }
        };

        for task in &mut tasks {
            task.is_running = false;
            task.start_time = None;
        }
        tasks
    }

    pub fn save(&self, tasks: &[Task]) -> Result<(), StoreError> {
        std::fs::create_dir_all(&self.root)?;
        let raw = serde_json::to_string_pretty(tasks)?;
        std::fs::write(self.queue_path(), raw)?;
        Ok(())
    }

    /// The persisted active-task marker, if any.
    pub fn load_active_id(&self) -> Option<TaskId> {
        let raw = std::fs::read_to_string(self.active_task_path()).ok()?;
        raw.trim().parse::<i64>().ok().map(TaskId::from)
    }

    pub fn save_active_id(&self, id: Option<TaskId>) -> Result<(), StoreError> {
        let path = self.active_task_path();
        match id {
            Some(id) => {
                std::fs::create_dir_all(&self.root)?;
                std::fs::write(path, id.value().to_string())?;
            }
            None => {
                if path.exists() {
                    std::fs::remove_file(path)?;
                }
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::DateTime;

    fn task(id: i64) -> Task {
        Task {
            id: TaskId::from(id),
            project_id: 1,
            project_name: "Platform".into(),
            issue_id: 77,
            subject: "Fix login".into(),
            note: Some("check saml flow".into()),
            activity_id: Some(9),
            activity_name: Some("Development".into()),
            elapsed_ms: 125_000,
            start_time: None,
            is_running: false,
            activities: Default::default(),
        }
    }

    #[test]
    fn save_load_roundtrip_is_stable() {
        let dir = tempfile::tempdir().unwrap();
        let store = QueueStore::at(dir.path());

        let tasks = vec![task(1), task(2)];
        store.save(&tasks).unwrap();
        let loaded = store.load();
        assert_eq!(loaded, tasks);

        // Saving what was loaded reproduces the same file.
        store.save(&loaded).unwrap();
        assert_eq!(store.load(), tasks);
    }

    #[test]
    fn running_tasks_come_back_paused() {
        let dir = tempfile::tempdir().unwrap();
        let store = QueueStore::at(dir.path());

        let mut running = task(1);
        running.is_running = true;
        running.start_time = DateTime::from_timestamp_millis(1_700_000_000_000);
        store.save(&[running.clone()]).unwrap();

        let loaded = store.load();
        assert!(!loaded[0].is_running);
        assert!(loaded[0].start_time.is_none());
        // Banked time is untouched.
        assert_eq!(loaded[0].elapsed_ms, running.elapsed_ms);
    }

    #[test]
    fn corrupt_or_missing_data_loads_empty() {
        let dir = tempfile::tempdir().unwrap();
        let store = QueueStore::at(dir.path());
        assert!(store.load().is_empty());

        std::fs::create_dir_all(dir.path()).unwrap();
        std::fs::write(dir.path().join(QUEUE_FILE), "{not json").unwrap();
        assert!(store.load().is_empty());
    }

    #[test]
    fn active_marker_roundtrips_and_clears() {
        let dir = tempfile::tempdir().unwrap();
        let store = QueueStore::at(dir.path());
        assert_eq!(store.load_active_id(), None);

        store.save_active_id(Some(TaskId::from(42))).unwrap();
        assert_eq!(store.load_active_id(), Some(TaskId::from(42)));

        store.save_active_id(None).unwrap();
        assert_eq!(store.load_active_id(), None);
    }
}
