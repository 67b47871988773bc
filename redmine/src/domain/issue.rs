use serde::{Deserialize, Serialize};

use super::{IssueStatus, NamedRef};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Issue {
    pub id: u32,
    pub subject: String,
    pub project: NamedRef,
    #[serde(default)]
    pub status: Option<IssueStatus>,
    #[serde(default)]
    pub assigned_to: Option<NamedRef>,
}

#[derive(Debug, Deserialize)]
pub struct IssuesPage {
    pub issues: Vec<Issue>,
    #[serde(default)]
    pub total_count: usize,
}
