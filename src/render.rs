//! Server-side HTML rendering of a curated list, for embedding in a page.

use anyhow::Result;

use crate::db::Database;
use crate::models::Company;
use crate::sanitize;

/// Render a list as an embeddable HTML fragment.
///
/// Non-positive ids and empty lists get fixed placeholders. Members whose
/// company record no longer exists are skipped without a gap marker, so a
/// list whose members were all deleted renders as an empty container —
/// emptiness is judged on the stored membership, before resolution.
pub fn company_list(db: &Database, list_id: i64) -> Result<String> {
    if list_id <= 0 {
        return Ok(placeholder("No list selected."));
    }

    let members = db.ordered_members(list_id)?;
    if members.is_empty() {
        return Ok(placeholder("List is empty."));
    }

    let mut out = String::from("<ul class=\"company-list\">");
    for member_id in members {
        let Some(company) = db.get_company(member_id)? else {
            continue; // skip missing/deleted items
        };
        push_company(&mut out, &company);
    }
    out.push_str("</ul>");

    Ok(out)
}

fn placeholder(message: &str) -> String {
    format!(
        "<div class=\"company-list\"><em>{}</em></div>",
        sanitize::escape(message)
    )
}

fn push_company(out: &mut String, company: &Company) {
    out.push_str("<li class=\"company\">");

    out.push_str(&format!("<h3>{}</h3>", sanitize::escape(&company.name)));
    out.push_str(&format!(
        "<div class=\"company-rating\">Rating: {}/10</div>",
        company.rating
    ));

    if company.has_free_trial {
        out.push_str("<span class=\"free-trial-badge\">Free Trial</span>");
    }

    push_entry_block(out, "company-benefits", "Benefits:", &company.benefits);
    push_entry_block(out, "company-cons", "Cons:", &company.cons);

    // The summary was sanitized on the way in and is inserted as markup;
    // escaping it again would encode its tags.
    out.push_str(&format!(
        "<div class=\"company-summary\">{}</div>",
        company.summary
    ));

    out.push_str("</li>");
}

fn push_entry_block(out: &mut String, class: &str, heading: &str, entries: &[String]) {
    if entries.is_empty() {
        return;
    }

    out.push_str(&format!(
        "<div class=\"{}\"><strong>{}</strong><ul>",
        class,
        sanitize::escape(heading)
    ));
    for entry in entries {
        out.push_str(&format!("<li>{}</li>", sanitize::escape(entry)));
    }
    out.push_str("</ul></div>");
}
