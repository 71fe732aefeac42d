//! The private journal: entry creation and the paginated listing.

use axum::extract::{Query, State};
use axum::http::StatusCode;
use axum::response::Redirect;
use axum::{Extension, Form, Json};
use chrono::{DateTime, Utc};
use serde::Deserialize;
use tracing::warn;
use uuid::Uuid;

use dienynas_db::models::EntryRow;
use dienynas_types::api::{CurrentUser, EntryForm, EntryResponse, Page};

use crate::error::ApiError;
use crate::forms;
use crate::state::AppState;

#[derive(Debug, Deserialize)]
pub struct ListQuery {
    #[serde(default = "default_page")]
    pub page: u32,
}

fn default_page() -> u32 {
    1
}

/// GET /irasai?page=N. The caller's own entries, newest first. Listing is
/// always scoped to the authenticated user; there is no cross-user read.
pub async fn list_entries(
    State(state): State<AppState>,
    Extension(user): Extension<CurrentUser>,
    Query(query): Query<ListQuery>,
) -> Result<Json<Page<EntryResponse>>, ApiError> {
    let page = query.page.max(1);
    let page_size = state.config.entries_per_page;
    let offset = (page as u64 - 1) * page_size as u64;

    let db = state.db.clone();
    let owner = user.id.to_string();
    let (rows, total) = tokio::task::spawn_blocking(move || {
        let rows = db.entries_page(&owner, page_size, offset)?;
        let total = db.count_entries(&owner)?;
        Ok::<_, anyhow::Error>((rows, total))
    })
    .await
    .map_err(|e| anyhow::anyhow!("listing task failed: {e}"))??;

    let items = rows.into_iter().map(entry_response).collect();

    Ok(Json(Page {
        items,
        page,
        page_size,
        total_items: total,
        total_pages: total_pages(total, page_size),
    }))
}

/// GET /naujas_irasas. The form is rendered externally; the route exists
/// so the auth gate covers the form view too.
pub async fn new_entry_form() -> StatusCode {
    StatusCode::OK
}

/// POST /naujas_irasas. Owner and timestamp come from the request context,
/// never from the form.
pub async fn create_entry(
    State(state): State<AppState>,
    Extension(user): Extension<CurrentUser>,
    Form(form): Form<EntryForm>,
) -> Result<Redirect, ApiError> {
    let errors = forms::validate_entry(&form.body);
    if !errors.is_empty() {
        return Err(ApiError::Validation(errors));
    }

    let id = Uuid::new_v4().to_string();
    let owner = user.id.to_string();
    let body = form.body;
    let db = state.db.clone();
    tokio::task::spawn_blocking(move || db.insert_entry(&id, &owner, &body, Utc::now()))
        .await
        .map_err(|e| anyhow::anyhow!("insert task failed: {e}"))??;

    Ok(Redirect::to("/irasai?notice=created"))
}

fn total_pages(total_items: u64, page_size: u32) -> u32 {
    total_items.div_ceil(page_size as u64) as u32
}

fn entry_response(row: EntryRow) -> EntryResponse {
    EntryResponse {
        id: row.id.parse().unwrap_or_else(|e| {
            warn!("corrupt entry id '{}': {}", row.id, e);
            Uuid::default()
        }),
        created_at: parse_timestamp(&row.created_at, &row.id),
        body: row.body,
    }
}

pub(crate) fn parse_timestamp(raw: &str, id: &str) -> DateTime<Utc> {
    raw.parse::<DateTime<Utc>>()
        .or_else(|_| {
            // Rows stamped by SQLite's datetime('now') default carry no
            // timezone; treat them as UTC.
            chrono::NaiveDateTime::parse_from_str(raw, "%Y-%m-%d %H:%M:%S").map(|ndt| ndt.and_utc())
        })
        .unwrap_or_else(|e| {
            warn!("corrupt created_at '{}' on row '{}': {}", raw, id, e);
            DateTime::default()
        })
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::SecondsFormat;

    #[test]
    fn page_count_rounds_up() {
        assert_eq!(total_pages(0, 3), 0);
        assert_eq!(total_pages(3, 3), 1);
        assert_eq!(total_pages(4, 3), 2);
        assert_eq!(total_pages(7, 3), 3);
    }

    #[test]
    fn stored_timestamps_parse_back_exactly() {
        let now = Utc::now();
        let raw = now.to_rfc3339_opts(SecondsFormat::Micros, true);
        let parsed = parse_timestamp(&raw, "e1");
        assert_eq!(
            parsed.to_rfc3339_opts(SecondsFormat::Micros, true),
            raw
        );
    }

    #[test]
    fn sqlite_default_timestamps_parse_as_utc() {
        let parsed = parse_timestamp("2026-08-07 10:15:00", "u1");
        assert_eq!(parsed.to_rfc3339(), "2026-08-07T10:15:00+00:00");
    }
}
