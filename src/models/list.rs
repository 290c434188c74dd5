use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::sanitize;

/// Metadata key holding a list's ordered member ids as a JSON array.
pub const MEMBER_IDS_KEY: &str = "member_ids";

/// Title of the list created by the startup bootstrap when none exist.
pub const DEFAULT_LIST_TITLE: &str = "Recommended List";

/// A curated, ordered list of companies. The list references companies by
/// id and does not own them; members may dangle after a company record is
/// deleted and readers must tolerate that.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CompanyList {
    pub id: i64,
    pub title: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// A list together with its ordered membership, used for detail responses.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ListWithMembers {
    #[serde(flatten)]
    pub list: CompanyList,
    pub member_ids: Vec<i64>,
}

/// Input for creating a new list.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreateListInput {
    pub title: String,
}

/// Input for renaming a list.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RenameListInput {
    pub title: String,
}

/// Input for replacing a list's membership wholesale. Entries are raw JSON
/// values because reorder submissions arrive loosely typed; normalization
/// happens on write.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReplaceMembersInput {
    pub ids: Vec<Value>,
}

/// The curation screen's two columns: companies not yet in the list
/// (alphabetical by name) and the ordered members.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Curation {
    pub available: Vec<i64>,
    pub selected: Vec<i64>,
}

/// Normalize a raw id sequence: coerce each entry to an integer, keep
/// strictly positive values, preserve order. Duplicates are not removed.
pub fn normalize_member_ids(values: &[Value]) -> Vec<i64> {
    values
        .iter()
        .map(sanitize::int_like)
        .filter(|id| *id > 0)
        .collect()
}
