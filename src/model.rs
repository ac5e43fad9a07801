use std::collections::BTreeMap;

use chrono::NaiveDate;
use serde::{Deserialize, Deserializer, Serialize};

use crate::date_utils::parse_iso;

/// Number of tasks per ISO date. Only dates with at least one task are present.
pub type TaskCounts = BTreeMap<String, u32>;

/// Tasks per ISO date, in backend order
pub type TasksByDate = BTreeMap<String, Vec<Task>>;

/// A scheduled warning as delivered by the backend
///
/// Tasks are never mutated on this side. Fields the backend omits or sends as
/// `null` fall back to empty values, and a date that does not parse is
/// treated as missing.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct Task {
    #[serde(default)]
    pub id: Option<i64>,

    /// Row number in the imported spreadsheet
    #[serde(default)]
    pub stt: Option<i64>,

    #[serde(default, deserialize_with = "null_as_default")]
    pub department: String,

    #[serde(default, deserialize_with = "null_as_default")]
    pub content: String,

    #[serde(default, deserialize_with = "lenient_date")]
    pub warning_date: Option<NaiveDate>,
}

impl Task {
    pub fn new(department: &str, content: &str, warning_date: Option<NaiveDate>) -> Self {
        Task {
            id: None,
            stt: None,
            department: department.to_string(),
            content: content.to_string(),
            warning_date,
        }
    }
}

/// Treat an explicit `null` like a missing field
fn null_as_default<'de, D, T>(deserializer: D) -> Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: Default + Deserialize<'de>,
{
    Ok(Option::<T>::deserialize(deserializer)?.unwrap_or_default())
}

fn lenient_date<'de, D>(deserializer: D) -> Result<Option<NaiveDate>, D::Error>
where
    D: Deserializer<'de>,
{
    let raw = Option::<String>::deserialize(deserializer)?;
    Ok(raw.as_deref().and_then(parse_iso))
}

/// `{ data: ... }` envelope of the counts and by-date endpoints
#[derive(Debug, Default, Deserialize)]
pub struct DataEnvelope<T> {
    #[serde(default)]
    pub data: Option<T>,
}

/// `{ tasks: [...] }` envelope of the task list endpoints
#[derive(Debug, Default, Deserialize)]
pub struct TasksEnvelope {
    #[serde(default, deserialize_with = "null_as_default")]
    pub tasks: Vec<Task>,
}

#[derive(Debug, Default, Deserialize)]
pub struct DepartmentsEnvelope {
    #[serde(default, deserialize_with = "null_as_default")]
    pub departments: Vec<String>,
}

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct User {
    #[serde(default)]
    pub id: Option<i64>,
    #[serde(default, deserialize_with = "null_as_default")]
    pub username: String,
    #[serde(default, deserialize_with = "null_as_default")]
    pub role: String,
}

/// Reply of `/api/admin/me` and `/api/admin/login`
#[derive(Clone, Debug, Default, Deserialize)]
pub struct AuthReply {
    #[serde(default, deserialize_with = "null_as_default")]
    pub success: bool,
    #[serde(default)]
    pub user: Option<User>,
    #[serde(default)]
    pub error: Option<String>,
}

#[derive(Clone, Debug, Default, PartialEq, Deserialize)]
pub struct StoredDateRange {
    #[serde(default, deserialize_with = "lenient_date")]
    pub min_date: Option<NaiveDate>,
    #[serde(default, deserialize_with = "lenient_date")]
    pub max_date: Option<NaiveDate>,
}

/// Totals over everything the backend stores
#[derive(Clone, Debug, Default, PartialEq, Deserialize)]
pub struct BoardStats {
    #[serde(default, deserialize_with = "null_as_default")]
    pub total_tasks: u64,
    #[serde(default, deserialize_with = "null_as_default")]
    pub total_departments: u64,
    #[serde(default, deserialize_with = "null_as_default")]
    pub date_range: StoredDateRange,
}

#[derive(Debug, Default, Deserialize)]
pub struct StatsEnvelope {
    #[serde(default, deserialize_with = "null_as_default")]
    pub success: bool,
    #[serde(default)]
    pub stats: Option<BoardStats>,
}

/// Row accounting of one spreadsheet pass
#[derive(Clone, Debug, Default, PartialEq, Deserialize)]
pub struct ImportStats {
    #[serde(default, deserialize_with = "null_as_default")]
    pub total_rows: u64,
    #[serde(default, deserialize_with = "null_as_default")]
    pub valid_rows: u64,
    #[serde(default, deserialize_with = "null_as_default")]
    pub invalid_rows: u64,
    #[serde(default, deserialize_with = "null_as_default")]
    pub new_records: u64,
    #[serde(default, deserialize_with = "null_as_default")]
    pub duplicates_skipped: u64,
}

#[derive(Clone, Debug, Default, PartialEq, Deserialize)]
pub struct PreviewDateRange {
    #[serde(default, deserialize_with = "lenient_date")]
    pub min: Option<NaiveDate>,
    #[serde(default, deserialize_with = "lenient_date")]
    pub max: Option<NaiveDate>,
}

/// What an import would bring in, computed by the backend without saving
#[derive(Clone, Debug, Default, PartialEq, Deserialize)]
pub struct ImportPreview {
    #[serde(default, deserialize_with = "null_as_default")]
    pub total_tasks: u64,
    #[serde(default, deserialize_with = "null_as_default")]
    pub departments: Vec<String>,
    #[serde(default, deserialize_with = "null_as_default")]
    pub total_departments: u64,
    #[serde(default, deserialize_with = "null_as_default")]
    pub date_range: PreviewDateRange,
    #[serde(default, deserialize_with = "null_as_default")]
    pub sample_tasks: Vec<Task>,
}

/// Reply of `/api/admin/preview` and `/api/admin/import`
#[derive(Clone, Debug, Default, Deserialize)]
pub struct ImportReply {
    #[serde(default, deserialize_with = "null_as_default")]
    pub success: bool,
    #[serde(default)]
    pub message: Option<String>,
    #[serde(default)]
    pub error: Option<String>,
    #[serde(default)]
    pub preview: Option<ImportPreview>,
    #[serde(default, deserialize_with = "null_as_default")]
    pub stats: ImportStats,
    #[serde(default, deserialize_with = "null_as_default")]
    pub errors: Vec<String>,
}

/// Generic `{ success, message, error }` reply
#[derive(Clone, Debug, Default, Deserialize)]
pub struct StatusReply {
    #[serde(default, deserialize_with = "null_as_default")]
    pub success: bool,
    #[serde(default)]
    pub message: Option<String>,
    #[serde(default)]
    pub error: Option<String>,
}
