mod schema;

use std::path::PathBuf;
use std::sync::{Arc, Mutex};

use anyhow::Result;
use chrono::Utc;
use rusqlite::Connection;
use serde_json::{json, Value};
use uuid::Uuid;

use crate::models::*;
use crate::sanitize;

pub struct Database {
    conn: Arc<Mutex<Connection>>,
}

impl Database {
    pub fn open(path: PathBuf) -> Result<Self> {
        let parent = path
            .parent()
            .ok_or_else(|| anyhow::anyhow!("Database path has no parent directory"))?;
        std::fs::create_dir_all(parent)?;
        let conn = Connection::open(&path)?;
        conn.pragma_update(None, "journal_mode", "WAL")?;
        conn.pragma_update(None, "foreign_keys", "ON")?;
        Ok(Self {
            conn: Arc::new(Mutex::new(conn)),
        })
    }

    pub fn open_default() -> Result<Self> {
        let dirs = directories::ProjectDirs::from("", "", "company-directory")
            .ok_or_else(|| anyhow::anyhow!("Could not determine data directory"))?;
        let db_path = dirs.data_dir().join("directory.db");
        Self::open(db_path)
    }

    pub fn open_memory() -> Result<Self> {
        let conn = Connection::open_in_memory()?;
        conn.pragma_update(None, "foreign_keys", "ON")?;
        Ok(Self {
            conn: Arc::new(Mutex::new(conn)),
        })
    }

    pub fn migrate(&self) -> Result<()> {
        let conn = self.conn.lock().expect("database lock poisoned");
        schema::run_migrations(&conn)
    }

    // ============================================================
    // Record primitives
    // ============================================================

    pub fn create_record(&self, kind: RecordKind, title: &str, body: &str) -> Result<Record> {
        let conn = self.conn.lock().expect("database lock poisoned");
        let now = Utc::now();

        conn.execute(
            "INSERT INTO records (kind, title, body, status, created_at, updated_at)
             VALUES (?, ?, ?, ?, ?, ?)",
            (
                kind.as_str(),
                title,
                body,
                STATUS_PUBLISHED,
                now.to_rfc3339(),
                now.to_rfc3339(),
            ),
        )?;

        Ok(Record {
            id: conn.last_insert_rowid(),
            kind,
            title: title.to_string(),
            body: body.to_string(),
            status: STATUS_PUBLISHED.to_string(),
            created_at: now,
            updated_at: now,
        })
    }

    pub fn get_record(&self, id: i64) -> Result<Option<Record>> {
        let conn = self.conn.lock().expect("database lock poisoned");
        let mut stmt = conn.prepare(
            "SELECT id, kind, title, body, status, created_at, updated_at
             FROM records WHERE id = ?",
        )?;

        let mut rows = stmt.query([id])?;
        if let Some(row) = rows.next()? {
            Ok(Some(Record {
                id: row.get(0)?,
                kind: parse_kind(1, row.get::<_, String>(1)?)?,
                title: row.get(2)?,
                body: row.get(3)?,
                status: row.get(4)?,
                created_at: parse_datetime(row.get::<_, String>(5)?),
                updated_at: parse_datetime(row.get::<_, String>(6)?),
            }))
        } else {
            Ok(None)
        }
    }

    pub fn records_by_kind(&self, kind: RecordKind) -> Result<Vec<Record>> {
        let conn = self.conn.lock().expect("database lock poisoned");
        let mut stmt = conn.prepare(
            "SELECT id, kind, title, body, status, created_at, updated_at
             FROM records WHERE kind = ? ORDER BY title COLLATE NOCASE, id",
        )?;

        let records = stmt
            .query_map([kind.as_str()], |row| {
                Ok(Record {
                    id: row.get(0)?,
                    kind: parse_kind(1, row.get::<_, String>(1)?)?,
                    title: row.get(2)?,
                    body: row.get(3)?,
                    status: row.get(4)?,
                    created_at: parse_datetime(row.get::<_, String>(5)?),
                    updated_at: parse_datetime(row.get::<_, String>(6)?),
                })
            })?
            .collect::<Result<Vec<_>, _>>()?;

        Ok(records)
    }

    /// Ids of all records of a kind, sorted alphabetically by title.
    pub fn record_ids_by_kind(&self, kind: RecordKind) -> Result<Vec<i64>> {
        let conn = self.conn.lock().expect("database lock poisoned");
        let mut stmt = conn.prepare(
            "SELECT id FROM records WHERE kind = ? ORDER BY title COLLATE NOCASE, id",
        )?;

        let ids = stmt
            .query_map([kind.as_str()], |row| row.get(0))?
            .collect::<Result<Vec<i64>, _>>()?;

        Ok(ids)
    }

    pub fn count_records(&self, kind: RecordKind) -> Result<i64> {
        let conn = self.conn.lock().expect("database lock poisoned");
        let count = conn.query_row(
            "SELECT COUNT(*) FROM records WHERE kind = ?",
            [kind.as_str()],
            |row| row.get(0),
        )?;
        Ok(count)
    }

    pub fn set_record_title(&self, id: i64, title: &str) -> Result<()> {
        let conn = self.conn.lock().expect("database lock poisoned");
        conn.execute(
            "UPDATE records SET title = ?, updated_at = ? WHERE id = ?",
            (title, Utc::now().to_rfc3339(), id),
        )?;
        Ok(())
    }

    pub fn set_record_body(&self, id: i64, body: &str) -> Result<()> {
        let conn = self.conn.lock().expect("database lock poisoned");
        conn.execute(
            "UPDATE records SET body = ?, updated_at = ? WHERE id = ?",
            (body, Utc::now().to_rfc3339(), id),
        )?;
        Ok(())
    }

    pub fn delete_record(&self, id: i64) -> Result<bool> {
        let conn = self.conn.lock().expect("database lock poisoned");
        let rows = conn.execute("DELETE FROM records WHERE id = ?", [id])?;
        Ok(rows > 0)
    }

    pub fn meta_get(&self, record_id: i64, key: &str) -> Result<Option<Value>> {
        let conn = self.conn.lock().expect("database lock poisoned");
        let mut stmt = conn
            .prepare("SELECT meta_value FROM record_meta WHERE record_id = ? AND meta_key = ?")?;

        let mut rows = stmt.query((record_id, key))?;
        if let Some(row) = rows.next()? {
            let raw: String = row.get(0)?;
            // Malformed metadata reads as absent rather than erroring.
            Ok(serde_json::from_str(&raw).ok())
        } else {
            Ok(None)
        }
    }

    pub fn meta_set(&self, record_id: i64, key: &str, value: &Value) -> Result<()> {
        let conn = self.conn.lock().expect("database lock poisoned");
        conn.execute(
            "INSERT INTO record_meta (record_id, meta_key, meta_value) VALUES (?, ?, ?)
             ON CONFLICT (record_id, meta_key) DO UPDATE SET meta_value = excluded.meta_value",
            (record_id, key, serde_json::to_string(value)?),
        )?;
        Ok(())
    }

    pub fn meta_delete(&self, record_id: i64, key: &str) -> Result<()> {
        let conn = self.conn.lock().expect("database lock poisoned");
        conn.execute(
            "DELETE FROM record_meta WHERE record_id = ? AND meta_key = ?",
            (record_id, key),
        )?;
        Ok(())
    }

    // ============================================================
    // Actors and permissions
    // ============================================================

    /// Create an actor and return it with its freshly generated bearer
    /// token. The token is only ever shown once.
    pub fn create_actor(
        &self,
        name: &str,
        is_manager: bool,
        edit_all: bool,
    ) -> Result<(Actor, String)> {
        let conn = self.conn.lock().expect("database lock poisoned");
        let token = Uuid::new_v4().to_string();
        let now = Utc::now();

        conn.execute(
            "INSERT INTO actors (name, token, is_manager, edit_all, created_at)
             VALUES (?, ?, ?, ?, ?)",
            (
                name,
                &token,
                is_manager as i64,
                edit_all as i64,
                now.to_rfc3339(),
            ),
        )?;

        let actor = Actor {
            id: conn.last_insert_rowid(),
            name: name.to_string(),
            is_manager,
            edit_all,
        };

        Ok((actor, token))
    }

    pub fn find_actor_by_token(&self, token: &str) -> Result<Option<Actor>> {
        let conn = self.conn.lock().expect("database lock poisoned");
        let mut stmt =
            conn.prepare("SELECT id, name, is_manager, edit_all FROM actors WHERE token = ?")?;

        let mut rows = stmt.query([token])?;
        if let Some(row) = rows.next()? {
            Ok(Some(Actor {
                id: row.get(0)?,
                name: row.get(1)?,
                is_manager: row.get::<_, i64>(2)? != 0,
                edit_all: row.get::<_, i64>(3)? != 0,
            }))
        } else {
            Ok(None)
        }
    }

    pub fn grant_edit(&self, actor_id: i64, record_id: i64) -> Result<()> {
        let conn = self.conn.lock().expect("database lock poisoned");
        conn.execute(
            "INSERT OR IGNORE INTO record_grants (actor_id, record_id) VALUES (?, ?)",
            (actor_id, record_id),
        )?;
        Ok(())
    }

    /// Record-level edit permission: a blanket `edit_all` flag or an
    /// individual grant on the record.
    pub fn can_edit(&self, actor: &Actor, record_id: i64) -> Result<bool> {
        if actor.edit_all {
            return Ok(true);
        }
        if actor.id <= 0 {
            return Ok(false);
        }

        let conn = self.conn.lock().expect("database lock poisoned");
        let count: i64 = conn.query_row(
            "SELECT COUNT(*) FROM record_grants WHERE actor_id = ? AND record_id = ?",
            (actor.id, record_id),
            |row| row.get(0),
        )?;
        Ok(count > 0)
    }

    // ============================================================
    // Company operations
    // ============================================================

    /// Exact, case-insensitive lookup by company name. `COLLATE NOCASE`
    /// matches the index on (kind, title); near-matches never qualify.
    pub fn find_company_by_exact_name(&self, name: &str) -> Result<Option<Company>> {
        if name.is_empty() {
            return Ok(None);
        }

        let id: Option<i64> = {
            let conn = self.conn.lock().expect("database lock poisoned");
            let mut stmt = conn.prepare(
                "SELECT id FROM records
                 WHERE kind = ? AND title = ? COLLATE NOCASE
                 ORDER BY id LIMIT 1",
            )?;
            let mut rows = stmt.query((RecordKind::Company.as_str(), name))?;
            match rows.next()? {
                Some(row) => Some(row.get(0)?),
                None => None,
            }
        };

        match id {
            Some(id) => self.get_company(id),
            None => Ok(None),
        }
    }

    pub fn get_company(&self, id: i64) -> Result<Option<Company>> {
        let Some(record) = self.get_record(id)? else {
            return Ok(None);
        };
        if record.kind != RecordKind::Company {
            return Ok(None);
        }
        self.company_from_record(record).map(Some)
    }

    pub fn company_summaries(&self) -> Result<Vec<CompanySummary>> {
        self.records_by_kind(RecordKind::Company)?
            .into_iter()
            .map(|record| {
                let rating = self
                    .meta_get(record.id, RATING_KEY)?
                    .map(|v| sanitize::int_like(&v))
                    .unwrap_or(0);
                let has_free_trial = self
                    .meta_get(record.id, HAS_FREE_TRIAL_KEY)?
                    .map(|v| sanitize::bool_like(&v))
                    .unwrap_or(false);
                Ok(CompanySummary {
                    id: record.id,
                    name: record.title,
                    rating,
                    has_free_trial,
                })
            })
            .collect()
    }

    /// Create or update a company from one loosely-typed import row.
    ///
    /// Returns `None` when the row has no usable name. An existing company
    /// (matched by exact name, any letter case) keeps its stored name and
    /// only has its summary replaced; either way the rating, trial flag,
    /// benefits and cons are overwritten from this row. The rating is taken
    /// as-is here — only the admin edit path clamps it.
    pub fn upsert_company_from_row(&self, row: &CompanyRow) -> Result<Option<i64>> {
        let name = sanitize::text_field(row.name.as_deref().unwrap_or(""));
        if name.is_empty() {
            return Ok(None);
        }

        let rating = row.rating.as_ref().map(sanitize::int_like).unwrap_or(0);
        let has_free_trial = row
            .has_free_trial
            .as_ref()
            .map(sanitize::bool_like)
            .unwrap_or(false);
        let benefits = clean_entries(row.benefits.as_ref());
        let cons = clean_entries(row.cons.as_ref());
        let summary = sanitize::rich_text(row.summary.as_deref().unwrap_or(""));

        let id = match self.find_company_by_exact_name(&name)? {
            Some(existing) => {
                self.set_record_body(existing.id, &summary)?;
                existing.id
            }
            None => {
                self.create_record(RecordKind::Company, &name, &summary)?
                    .id
            }
        };

        self.meta_set(id, RATING_KEY, &json!(rating))?;
        self.meta_set(id, HAS_FREE_TRIAL_KEY, &json!(has_free_trial))?;
        self.replace_string_meta(id, BENEFITS_KEY, &benefits)?;
        self.replace_string_meta(id, CONS_KEY, &cons)?;

        Ok(Some(id))
    }

    fn company_from_record(&self, record: Record) -> Result<Company> {
        let rating = self
            .meta_get(record.id, RATING_KEY)?
            .map(|v| sanitize::int_like(&v))
            .unwrap_or(0);
        let has_free_trial = self
            .meta_get(record.id, HAS_FREE_TRIAL_KEY)?
            .map(|v| sanitize::bool_like(&v))
            .unwrap_or(false);
        let benefits = self
            .meta_get(record.id, BENEFITS_KEY)?
            .map(|v| sanitize::string_seq(&v))
            .unwrap_or_default();
        let cons = self
            .meta_get(record.id, CONS_KEY)?
            .map(|v| sanitize::string_seq(&v))
            .unwrap_or_default();

        Ok(Company {
            id: record.id,
            name: record.title,
            summary: record.body,
            rating,
            has_free_trial,
            benefits,
            cons,
            created_at: record.created_at,
            updated_at: record.updated_at,
        })
    }

    /// Store a string-sequence metadata field, collapsing an empty
    /// sequence to absence.
    pub fn replace_string_meta(&self, record_id: i64, key: &str, entries: &[String]) -> Result<()> {
        if entries.is_empty() {
            self.meta_delete(record_id, key)
        } else {
            self.meta_set(record_id, key, &json!(entries))
        }
    }

    // ============================================================
    // List operations
    // ============================================================

    pub fn create_list(&self, title: &str) -> Result<CompanyList> {
        let record = self.create_record(RecordKind::List, title, "")?;
        Ok(list_from_record(record))
    }

    pub fn get_list(&self, id: i64) -> Result<Option<CompanyList>> {
        let Some(record) = self.get_record(id)? else {
            return Ok(None);
        };
        if record.kind != RecordKind::List {
            return Ok(None);
        }
        Ok(Some(list_from_record(record)))
    }

    pub fn lists(&self) -> Result<Vec<CompanyList>> {
        Ok(self
            .records_by_kind(RecordKind::List)?
            .into_iter()
            .map(list_from_record)
            .collect())
    }

    /// The list's membership in stored order. Absent or malformed
    /// metadata reads as empty; entries are normalized on every read.
    pub fn ordered_members(&self, list_id: i64) -> Result<Vec<i64>> {
        let values = match self.meta_get(list_id, MEMBER_IDS_KEY)? {
            Some(Value::Array(items)) => items,
            _ => Vec::new(),
        };
        Ok(normalize_member_ids(&values))
    }

    /// Replace the membership wholesale with the normalized submission.
    /// An empty normalized sequence clears the metadata row entirely, so
    /// "emptied" and "never set" persist identically. Returns the number
    /// of members stored.
    pub fn replace_members(&self, list_id: i64, raw: &[Value]) -> Result<usize> {
        let ids = normalize_member_ids(raw);
        if ids.is_empty() {
            self.meta_delete(list_id, MEMBER_IDS_KEY)?;
            return Ok(0);
        }
        self.meta_set(list_id, MEMBER_IDS_KEY, &json!(ids))?;
        Ok(ids.len())
    }
}

impl Clone for Database {
    fn clone(&self) -> Self {
        Self {
            conn: self.conn.clone(),
        }
    }
}

/// Sanitize a loosely-typed string sequence for storage: each entry is
/// cleaned as a text field and empties are dropped.
fn clean_entries(value: Option<&Value>) -> Vec<String> {
    value
        .map(sanitize::string_seq)
        .unwrap_or_default()
        .iter()
        .map(|entry| sanitize::text_field(entry))
        .filter(|entry| !entry.is_empty())
        .collect()
}

fn list_from_record(record: Record) -> CompanyList {
    CompanyList {
        id: record.id,
        title: record.title,
        created_at: record.created_at,
        updated_at: record.updated_at,
    }
}

fn parse_kind(column: usize, s: String) -> rusqlite::Result<RecordKind> {
    RecordKind::from_str(&s).ok_or_else(|| {
        rusqlite::Error::FromSqlConversionFailure(
            column,
            rusqlite::types::Type::Text,
            format!("unknown record kind: {s}").into(),
        )
    })
}

fn parse_datetime(s: String) -> chrono::DateTime<Utc> {
    chrono::DateTime::parse_from_rfc3339(&s)
        .map(|dt| dt.with_timezone(&Utc))
        .unwrap_or_else(|_| Utc::now())
}
