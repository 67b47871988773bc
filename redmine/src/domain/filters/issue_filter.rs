use super::{RedmineFilter, PAGE_LIMIT};

/// Issue list scopes the client exposes. All scopes except [`IssueFilter::Ids`]
/// restrict to open issues.
pub enum IssueFilter {
    /// Open issues of one project.
    Project(u32),
    /// Open issues assigned to the authenticated user.
    AssignedToMe,
    /// Open issues the authenticated user watches.
    WatchedByMe,
    /// Specific issues regardless of status.
    Ids(Vec<u32>),
}

impl RedmineFilter for IssueFilter {
    fn as_redmine_query(&self) -> String {
        match self {
            Self::Project(project_id) => format!(
                "project_id={}&status_id=open&limit={}",
                project_id, PAGE_LIMIT
            ),
            Self::AssignedToMe => {
                format!("assigned_to_id=me&status_id=open&limit={}", PAGE_LIMIT)
            }
            Self::WatchedByMe => format!("watcher_id=me&status_id=open&limit={}", PAGE_LIMIT),
            Self::Ids(ids) => {
                let ids = ids
                    .iter()
                    .map(|id| id.to_string())
                    .collect::<Vec<_>>()
                    .join(",");
                format!("issue_id={}&status_id=*&limit={}", ids, PAGE_LIMIT)
            }
        }
    }
}
