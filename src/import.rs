//! Bulk company ingestion from JSON documents.
//!
//! A document is an array of loosely-typed rows; each row with a usable
//! name is upserted and counted. Rows without a name are skipped, not
//! errors — partial documents still import the rest.

use std::path::Path;

use anyhow::{Context, Result};

use crate::db::Database;
use crate::models::CompanyRow;

pub fn import_rows(db: &Database, rows: &[CompanyRow]) -> Result<usize> {
    let mut imported = 0;
    for row in rows {
        if db.upsert_company_from_row(row)?.is_some() {
            imported += 1;
        }
    }
    tracing::info!("imported {imported} of {} rows", rows.len());
    Ok(imported)
}

pub fn import_file(db: &Database, path: &Path) -> Result<usize> {
    let raw = std::fs::read_to_string(path)
        .with_context(|| format!("reading {}", path.display()))?;
    let rows: Vec<CompanyRow> =
        serde_json::from_str(&raw).with_context(|| format!("parsing {}", path.display()))?;
    import_rows(db, &rows)
}
