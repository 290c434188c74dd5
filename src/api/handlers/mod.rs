use axum::{
    extract::{Path, State},
    http::HeaderMap,
    response::{Html, IntoResponse, Redirect},
    Extension, Json,
};
use serde_json::json;

use super::{middleware, AppState};
use crate::error::Error;
use crate::models::*;
use crate::{curation, import, render};

/// Reject the request unless it carries the valid anti-forgery token for
/// this actor and action. Runs before any other validation.
fn require_action_token(
    state: &AppState,
    actor: &Actor,
    headers: &HeaderMap,
    action: &str,
) -> Result<(), Error> {
    let presented = headers
        .get(middleware::ACTION_TOKEN_HEADER)
        .and_then(|v| v.to_str().ok())
        .unwrap_or("");

    if middleware::verify_action_token(&state.security.forgery_secret, actor, action, presented) {
        Ok(())
    } else {
        Err(Error::Forbidden)
    }
}

// ============================================================
// Health
// ============================================================

pub async fn health() -> impl IntoResponse {
    Json(json!({ "status": "ok" }))
}

// ============================================================
// Tokens
// ============================================================

pub async fn issue_token(
    State(state): State<AppState>,
    Extension(actor): Extension<Actor>,
    Path(action): Path<String>,
) -> Result<Json<serde_json::Value>, Error> {
    if !middleware::actions::ALL.contains(&action.as_str()) {
        return Err(Error::NotFound("action"));
    }

    let token = middleware::issue_action_token(&state.security.forgery_secret, &actor, &action);
    Ok(Json(json!({ "action": action, "token": token })))
}

// ============================================================
// Companies
// ============================================================

pub async fn list_companies(
    State(state): State<AppState>,
) -> Result<Json<Vec<CompanySummary>>, Error> {
    Ok(Json(state.db.company_summaries()?))
}

pub async fn get_company(
    State(state): State<AppState>,
    Path(id): Path<i64>,
) -> Result<Json<Company>, Error> {
    state
        .db
        .get_company(id)?
        .map(Json)
        .ok_or(Error::NotFound("company"))
}

pub async fn update_company(
    State(state): State<AppState>,
    Extension(actor): Extension<Actor>,
    headers: HeaderMap,
    Path(id): Path<i64>,
    Json(input): Json<UpdateCompanyInput>,
) -> Result<Json<Company>, Error> {
    require_action_token(&state, &actor, &headers, middleware::actions::COMPANY_DETAILS)?;
    curation::update_company(&state.db, &actor, id, &input).map(Json)
}

// ============================================================
// Lists
// ============================================================

pub async fn list_lists(State(state): State<AppState>) -> Result<Json<Vec<CompanyList>>, Error> {
    Ok(Json(state.db.lists()?))
}

pub async fn get_list(
    State(state): State<AppState>,
    Path(id): Path<i64>,
) -> Result<Json<ListWithMembers>, Error> {
    let list = state.db.get_list(id)?.ok_or(Error::NotFound("list"))?;
    let member_ids = state.db.ordered_members(id)?;
    Ok(Json(ListWithMembers { list, member_ids }))
}

pub async fn create_list(
    State(state): State<AppState>,
    Extension(actor): Extension<Actor>,
    headers: HeaderMap,
    Json(input): Json<CreateListInput>,
) -> Result<(axum::http::StatusCode, Json<CompanyList>), Error> {
    require_action_token(&state, &actor, &headers, middleware::actions::MANAGE_LISTS)?;
    let list = curation::create_list(&state.db, &actor, &input)?;
    Ok((axum::http::StatusCode::CREATED, Json(list)))
}

pub async fn rename_list(
    State(state): State<AppState>,
    Extension(actor): Extension<Actor>,
    headers: HeaderMap,
    Path(id): Path<i64>,
    Json(input): Json<RenameListInput>,
) -> Result<Json<CompanyList>, Error> {
    require_action_token(&state, &actor, &headers, middleware::actions::MANAGE_LISTS)?;
    curation::rename_list(&state.db, &actor, id, &input).map(Json)
}

pub async fn get_members(
    State(state): State<AppState>,
    Path(id): Path<i64>,
) -> Result<Json<Vec<i64>>, Error> {
    Ok(Json(state.db.ordered_members(id)?))
}

pub async fn replace_members(
    State(state): State<AppState>,
    Extension(actor): Extension<Actor>,
    headers: HeaderMap,
    Path(id): Path<i64>,
    Json(input): Json<ReplaceMembersInput>,
) -> Result<Json<serde_json::Value>, Error> {
    require_action_token(&state, &actor, &headers, middleware::actions::MANAGE_LISTS)?;
    let count = curation::save_order(&state.db, &actor, id, &input)?;
    Ok(Json(json!({ "count": count })))
}

pub async fn get_curation(
    State(state): State<AppState>,
    Path(id): Path<i64>,
) -> Result<Json<Curation>, Error> {
    curation::available_and_selected(&state.db, id).map(Json)
}

// ============================================================
// Import
// ============================================================

/// Bulk import follows the post/redirect/get pattern: on success the
/// client is sent back to the admin companies page with the count in the
/// query string.
pub async fn import_companies(
    State(state): State<AppState>,
    Extension(actor): Extension<Actor>,
    headers: HeaderMap,
    Json(rows): Json<Vec<CompanyRow>>,
) -> Result<Redirect, Error> {
    require_action_token(&state, &actor, &headers, middleware::actions::IMPORT_COMPANIES)?;
    if !actor.is_manager {
        return Err(Error::Forbidden);
    }

    let imported = import::import_rows(&state.db, &rows)?;
    Ok(Redirect::to(&format!(
        "/admin/companies?imported={imported}"
    )))
}

// ============================================================
// Rendering
// ============================================================

pub async fn render_list(
    State(state): State<AppState>,
    Path(id): Path<i64>,
) -> Result<Html<String>, Error> {
    Ok(Html(render::company_list(&state.db, id)?))
}
