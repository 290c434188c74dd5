use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Metadata keys attached to company records.
pub const RATING_KEY: &str = "rating";
pub const HAS_FREE_TRIAL_KEY: &str = "has_free_trial";
pub const BENEFITS_KEY: &str = "benefits";
pub const CONS_KEY: &str = "cons";

/// One directory entry.
///
/// `summary` is sanitized HTML (restricted tag set, filtered at ingest) and
/// is the only field rendered as markup; everything else is plain text.
/// `benefits` and `cons` hold up to three non-empty entries; an empty
/// sequence is not stored at all, so assembly defaults it here.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Company {
    pub id: i64,
    pub name: String,
    pub summary: String,
    pub rating: i64,
    pub has_free_trial: bool,
    pub benefits: Vec<String>,
    pub cons: Vec<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Compact company info for listings, mirroring the columns an admin
/// overview shows next to the name.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CompanySummary {
    pub id: i64,
    pub name: String,
    pub rating: i64,
    pub has_free_trial: bool,
}

/// One loosely-typed import row. Every field is optional and several are
/// kept as raw JSON values because source documents mix types freely
/// (`"rating": "8"`, `"has_free_trial": 1`). Coercion happens during
/// upsert, not during deserialization.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CompanyRow {
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub rating: Option<Value>,
    #[serde(default)]
    pub benefits: Option<Value>,
    #[serde(default)]
    pub cons: Option<Value>,
    #[serde(default)]
    pub has_free_trial: Option<Value>,
    #[serde(default)]
    pub summary: Option<String>,
}

/// Input for the admin edit path. All fields are optional for partial
/// updates. Unlike the import path, the rating is clamped to [0, 10] and
/// benefits/cons are capped at three entries when this input is applied.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct UpdateCompanyInput {
    pub name: Option<String>,
    pub summary: Option<String>,
    pub rating: Option<i64>,
    pub has_free_trial: Option<bool>,
    pub benefits: Option<Vec<String>>,
    pub cons: Option<Vec<String>>,
}
