use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Project {
    pub id: u32,
    pub name: String,
    #[serde(default)]
    pub identifier: Option<String>,
}

/// One page of `GET /projects.json`; `total_count` drives the pagination loop.
#[derive(Debug, Deserialize)]
pub struct ProjectsPage {
    pub projects: Vec<Project>,
    pub total_count: usize,
}
