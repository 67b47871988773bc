use serde::{Deserialize, Serialize};

/// A time-entry custom field definition, as inferred from existing entries.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CustomField {
    pub id: u32,
    pub name: String,
}

impl CustomField {
    /// Heuristic used to auto-detect the billable flag field ("billable",
    /// "billing", "billed to", ...).
    pub fn looks_billable(&self) -> bool {
        self.name.to_lowercase().contains("bill")
    }
}

/// A custom field value as sent with (or read from) a time entry.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CustomFieldValue {
    pub id: u32,
    pub value: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
}

impl CustomFieldValue {
    pub fn new(id: u32, value: impl Into<String>) -> Self {
        Self {
            id,
            value: value.into(),
            name: None,
        }
    }
}
