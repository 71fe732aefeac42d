//! Session authority: issues the session cookie at login, resolves it back
//! to a user on later requests, and guards the authenticated routes.
//!
//! The client holds a signed, http-only cookie carrying an opaque token;
//! the server half is a row in the sessions table. Logging out deletes the
//! row.

use axum::{
    Extension,
    extract::{Request, State},
    middleware::Next,
    response::Response,
};
use axum_extra::extract::cookie::{Cookie, SignedCookieJar};
use chrono::{Duration, Utc};
use tracing::warn;
use uuid::Uuid;

use dienynas_db::models::UserRow;
use dienynas_types::api::CurrentUser;

use crate::error::ApiError;
use crate::state::AppState;

pub const SESSION_COOKIE: &str = "session";
pub const LOGIN_PATH: &str = "/prisijungti";

/// Server-side lifetime: a "remember me" login stays valid for 30 days, a
/// plain login for one day. The cookie itself is only made persistent for
/// "remember me"; otherwise it expires with the browser session.
const REMEMBER_DAYS: i64 = 30;
const SHORT_DAYS: i64 = 1;

/// Issue a session for `user_id` and add its cookie to the jar.
pub fn establish(
    state: &AppState,
    jar: SignedCookieJar,
    user_id: &str,
    remember: bool,
) -> anyhow::Result<SignedCookieJar> {
    let token = Uuid::new_v4().to_string();
    let now = Utc::now();
    let days = if remember { REMEMBER_DAYS } else { SHORT_DAYS };
    state
        .db
        .create_session(&token, user_id, now, now + Duration::days(days))?;

    let mut cookie = Cookie::build((SESSION_COOKIE, token))
        .path("/")
        .http_only(true);
    if remember {
        cookie = cookie.max_age(time::Duration::days(REMEMBER_DAYS));
    }

    Ok(jar.add(cookie.build()))
}

/// Delete the session row (if any) and drop the cookie.
pub fn clear(state: &AppState, jar: SignedCookieJar) -> anyhow::Result<SignedCookieJar> {
    if let Some(cookie) = jar.get(SESSION_COOKIE) {
        state.db.delete_session(cookie.value())?;
    }
    Ok(jar.remove(Cookie::build(SESSION_COOKIE).path("/")))
}

/// Resolve the session cookie to its user, if it maps to a live session.
pub async fn authenticate(
    state: &AppState,
    jar: &SignedCookieJar,
) -> anyhow::Result<Option<CurrentUser>> {
    let Some(cookie) = jar.get(SESSION_COOKIE) else {
        return Ok(None);
    };
    let token = cookie.value().to_string();

    let db = state.db.clone();
    let row = tokio::task::spawn_blocking(move || db.session_user(&token, Utc::now()))
        .await
        .map_err(|e| anyhow::anyhow!("session lookup task failed: {e}"))??;

    row.map(current_user_from_row).transpose()
}

fn current_user_from_row(row: UserRow) -> anyhow::Result<CurrentUser> {
    Ok(CurrentUser {
        id: row
            .id
            .parse()
            .map_err(|e| anyhow::anyhow!("corrupt user id '{}': {e}", row.id))?,
        name: row.name,
        email: row.email,
        avatar: row.avatar,
    })
}

/// Gate for routes that need a logged-in user. On success the resolved
/// [`CurrentUser`] is attached to the request for handlers to extract.
pub async fn require_auth(
    State(state): State<AppState>,
    jar: SignedCookieJar,
    mut req: Request,
    next: Next,
) -> Result<Response, ApiError> {
    let user = authenticate(&state, &jar)
        .await?
        .ok_or(ApiError::NotAuthenticated)?;
    req.extensions_mut().insert(user);
    Ok(next.run(req).await)
}

/// Layered inside `require_auth`; only the configured administrator email
/// gets through.
pub async fn require_admin(
    State(state): State<AppState>,
    Extension(user): Extension<CurrentUser>,
    req: Request,
    next: Next,
) -> Result<Response, ApiError> {
    if user.email != state.config.admin_email {
        warn!("admin access denied for {}", user.email);
        return Err(ApiError::Forbidden);
    }
    Ok(next.run(req).await)
}
