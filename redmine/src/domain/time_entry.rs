use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use super::{CustomFieldValue, IdRef, NamedRef};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TimeEntry {
    pub id: u32,
    pub project: NamedRef,
    #[serde(default)]
    pub issue: Option<IdRef>,
    pub activity: NamedRef,
    pub hours: f64,
    #[serde(default)]
    pub comments: String,
    pub spent_on: NaiveDate,
    #[serde(default)]
    pub custom_fields: Vec<CustomFieldValue>,
}

#[derive(Debug, Deserialize)]
pub struct TimeEntriesPage {
    pub time_entries: Vec<TimeEntry>,
    #[serde(default)]
    pub total_count: usize,
}

/// Body of `POST /time_entries.json`, wrapped in `{"time_entry": ...}` by the client.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct NewTimeEntry {
    pub issue_id: u32,
    pub hours: f64,
    pub comments: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub activity_id: Option<u32>,
    pub spent_on: NaiveDate,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub custom_fields: Vec<CustomFieldValue>,
}

/// Partial update for `PUT /time_entries/{id}.json`; `None` fields are left untouched.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct TimeEntryUpdate {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub hours: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub comments: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub activity_id: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub spent_on: Option<NaiveDate>,
}
