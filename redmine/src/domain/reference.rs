use serde::{Deserialize, Serialize};

/// Compact `{id, name}` reference Redmine embeds in other resources.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NamedRef {
    pub id: u32,
    pub name: String,
}

/// `{id}`-only reference, e.g. the issue a time entry belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct IdRef {
    pub id: u32,
}
