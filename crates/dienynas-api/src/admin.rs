//! Read-only administrative listings. Everything here sits behind both
//! `require_auth` and `require_admin`.

use axum::Json;
use axum::extract::State;
use tracing::warn;
use uuid::Uuid;

use dienynas_types::models::{Entry, User};

use crate::entries::parse_timestamp;
use crate::error::ApiError;
use crate::state::AppState;

/// GET /admin/vartotojai
pub async fn list_users(State(state): State<AppState>) -> Result<Json<Vec<User>>, ApiError> {
    let db = state.db.clone();
    let rows = tokio::task::spawn_blocking(move || db.all_users())
        .await
        .map_err(|e| anyhow::anyhow!("listing task failed: {e}"))??;

    let users = rows
        .into_iter()
        .map(|row| User {
            id: parse_id(&row.id),
            name: row.name,
            email: row.email,
            avatar: row.avatar,
            created_at: parse_timestamp(&row.created_at, &row.id),
        })
        .collect();

    Ok(Json(users))
}

/// GET /admin/irasai. Every user's entries, newest first.
pub async fn list_entries(State(state): State<AppState>) -> Result<Json<Vec<Entry>>, ApiError> {
    let db = state.db.clone();
    let rows = tokio::task::spawn_blocking(move || db.all_entries())
        .await
        .map_err(|e| anyhow::anyhow!("listing task failed: {e}"))??;

    let entries = rows
        .into_iter()
        .map(|row| Entry {
            id: parse_id(&row.id),
            owner_id: parse_id(&row.user_id),
            created_at: parse_timestamp(&row.created_at, &row.id),
            body: row.body,
        })
        .collect();

    Ok(Json(entries))
}

fn parse_id(raw: &str) -> Uuid {
    raw.parse().unwrap_or_else(|e| {
        warn!("corrupt id '{}': {}", raw, e);
        Uuid::default()
    })
}
