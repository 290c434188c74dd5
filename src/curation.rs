//! Admin-facing operations: list creation, renaming, order curation and
//! company detail edits.
//!
//! Every mutation takes an explicit [`Actor`] and checks, in order, the
//! general manage capability, input validity, record existence/kind and
//! record-level edit permission — failing closed before any write. The
//! anti-forgery token is checked one layer up, at the HTTP handler, before
//! any of this runs.

use std::collections::HashSet;

use crate::db::Database;
use crate::error::Error;
use crate::models::*;
use crate::sanitize;

/// The two-column curation view for a list: `selected` is the stored
/// member order, `available` is every other company, alphabetical by name.
pub fn available_and_selected(db: &Database, list_id: i64) -> Result<Curation, Error> {
    db.get_list(list_id)?.ok_or(Error::NotFound("list"))?;

    let selected = db.ordered_members(list_id)?;
    let chosen: HashSet<i64> = selected.iter().copied().collect();
    let available = db
        .record_ids_by_kind(RecordKind::Company)?
        .into_iter()
        .filter(|id| !chosen.contains(id))
        .collect();

    Ok(Curation {
        available,
        selected,
    })
}

/// Create the default list when no list exists yet. Runs once at startup,
/// keeping read paths free of hidden writes; returns the created list or
/// `None` when lists were already present.
pub fn bootstrap_default_list(db: &Database) -> Result<Option<CompanyList>, Error> {
    if db.count_records(RecordKind::List)? > 0 {
        return Ok(None);
    }
    let list = db.create_list(DEFAULT_LIST_TITLE)?;
    tracing::info!("created default list '{}' (id {})", list.title, list.id);
    Ok(Some(list))
}

pub fn create_list(
    db: &Database,
    actor: &Actor,
    input: &CreateListInput,
) -> Result<CompanyList, Error> {
    require_manager(actor)?;

    let title = sanitize::text_field(&input.title);
    if title.is_empty() {
        return Err(Error::Validation("empty-title"));
    }

    let list = db.create_list(&title)?;
    // The creator can always edit their own list, even without edit_all.
    if actor.id > 0 {
        db.grant_edit(actor.id, list.id)?;
    }

    Ok(list)
}

pub fn rename_list(
    db: &Database,
    actor: &Actor,
    list_id: i64,
    input: &RenameListInput,
) -> Result<CompanyList, Error> {
    require_manager(actor)?;

    let title = sanitize::text_field(&input.title);
    if list_id <= 0 || title.is_empty() {
        return Err(Error::Validation("bad-input"));
    }

    db.get_list(list_id)?.ok_or(Error::NotFound("list"))?;
    require_edit(db, actor, list_id)?;

    db.set_record_title(list_id, &title)?;
    db.get_list(list_id)?.ok_or(Error::NotFound("list"))
}

/// Replace a list's membership with the submitted order. The raw sequence
/// is normalized on write; an empty result clears the stored membership.
/// Returns the number of members stored.
pub fn save_order(
    db: &Database,
    actor: &Actor,
    list_id: i64,
    input: &ReplaceMembersInput,
) -> Result<usize, Error> {
    require_manager(actor)?;

    if list_id <= 0 {
        return Err(Error::Validation("no-list"));
    }

    db.get_list(list_id)?.ok_or(Error::NotFound("list"))?;
    require_edit(db, actor, list_id)?;

    Ok(db.replace_members(list_id, &input.ids)?)
}

/// Apply an admin edit to a company. Unlike the bulk import path, the
/// rating is clamped to [0, 10] and benefits/cons keep at most the first
/// three submitted entries. Requires edit permission on the company but
/// not the manage capability, matching the regular editing flow.
pub fn update_company(
    db: &Database,
    actor: &Actor,
    company_id: i64,
    input: &UpdateCompanyInput,
) -> Result<Company, Error> {
    db.get_company(company_id)?
        .ok_or(Error::NotFound("company"))?;
    require_edit(db, actor, company_id)?;

    if let Some(name) = &input.name {
        let name = sanitize::text_field(name);
        if name.is_empty() {
            return Err(Error::Validation("empty-name"));
        }
        db.set_record_title(company_id, &name)?;
    }

    if let Some(summary) = &input.summary {
        db.set_record_body(company_id, &sanitize::rich_text(summary))?;
    }

    if let Some(rating) = input.rating {
        db.meta_set(company_id, RATING_KEY, &serde_json::json!(rating.clamp(0, 10)))?;
    }

    if let Some(has_free_trial) = input.has_free_trial {
        db.meta_set(
            company_id,
            HAS_FREE_TRIAL_KEY,
            &serde_json::json!(has_free_trial),
        )?;
    }

    if let Some(benefits) = &input.benefits {
        db.replace_string_meta(company_id, BENEFITS_KEY, &form_entries(benefits))?;
    }

    if let Some(cons) = &input.cons {
        db.replace_string_meta(company_id, CONS_KEY, &form_entries(cons))?;
    }

    db.get_company(company_id)?
        .ok_or(Error::NotFound("company"))
}

fn require_manager(actor: &Actor) -> Result<(), Error> {
    if actor.is_manager {
        Ok(())
    } else {
        Err(Error::Forbidden)
    }
}

fn require_edit(db: &Database, actor: &Actor, record_id: i64) -> Result<(), Error> {
    if db.can_edit(actor, record_id)? {
        Ok(())
    } else {
        Err(Error::Forbidden)
    }
}

/// Form submissions carry a fixed number of inputs: keep the first three,
/// then sanitize and drop the empties among them.
fn form_entries(entries: &[String]) -> Vec<String> {
    entries
        .iter()
        .take(3)
        .map(|entry| sanitize::text_field(entry))
        .filter(|entry| !entry.is_empty())
        .collect()
}
