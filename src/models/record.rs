use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// A stored record. Companies and lists are projections of this shape:
/// `title` carries the company name or list title, `body` carries the
/// company summary (empty for lists).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Record {
    pub id: i64,
    pub kind: RecordKind,
    pub title: String,
    pub body: String,
    pub status: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// The kind of a stored record.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum RecordKind {
    Company,
    List,
}

impl RecordKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Company => "company",
            Self::List => "list",
        }
    }

    pub fn from_str(s: &str) -> Option<Self> {
        match s {
            "company" => Some(Self::Company),
            "list" => Some(Self::List),
            _ => None,
        }
    }
}

/// Status given to records created by this crate. Nothing here ever writes
/// drafts, so the single constant stands in for a status enum.
pub const STATUS_PUBLISHED: &str = "published";
