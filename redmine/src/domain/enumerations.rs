use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TimeEntryActivity {
    pub id: u32,
    pub name: String,
    #[serde(default)]
    pub is_default: bool,
}

impl TimeEntryActivity {
    /// Redmine's configured default, falling back to the first listed activity.
    pub fn default_in(activities: &[TimeEntryActivity]) -> Option<&TimeEntryActivity> {
        activities
            .iter()
            .find(|a| a.is_default)
            .or_else(|| activities.first())
    }
}

#[derive(Debug, Deserialize)]
pub struct TimeEntryActivitiesEnvelope {
    pub time_entry_activities: Vec<TimeEntryActivity>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IssueStatus {
    pub id: u32,
    pub name: String,
    #[serde(default)]
    pub is_closed: bool,
}

#[derive(Debug, Deserialize)]
pub struct IssueStatusesEnvelope {
    pub issue_statuses: Vec<IssueStatus>,
}
