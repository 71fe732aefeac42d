use argon2::password_hash::{SaltString, rand_core::OsRng};
use argon2::{Argon2, PasswordHash, PasswordHasher, PasswordVerifier};
use axum::Form;
use axum::extract::State;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Redirect, Response};
use axum_extra::extract::cookie::SignedCookieJar;
use tracing::info;
use uuid::Uuid;

use dienynas_types::api::{LoginForm, RegisterForm};

use crate::avatar::DEFAULT_AVATAR;
use crate::error::ApiError;
use crate::forms;
use crate::session;
use crate::state::AppState;

/// GET /registruotis. An authenticated visitor is sent home; the form
/// itself is rendered by the template layer in front of this API.
pub async fn register_form(
    State(state): State<AppState>,
    jar: SignedCookieJar,
) -> Result<Response, ApiError> {
    if session::authenticate(&state, &jar).await?.is_some() {
        return Ok(Redirect::to("/").into_response());
    }
    Ok(StatusCode::OK.into_response())
}

/// POST /registruotis
pub async fn register(
    State(state): State<AppState>,
    jar: SignedCookieJar,
    Form(form): Form<RegisterForm>,
) -> Result<Response, ApiError> {
    if session::authenticate(&state, &jar).await?.is_some() {
        return Ok(Redirect::to("/").into_response());
    }

    let errors = forms::validate_register(&form, state.db.as_ref())?;
    if !errors.is_empty() {
        return Err(ApiError::Validation(errors));
    }

    // Hash password with Argon2id
    let salt = SaltString::generate(&mut OsRng);
    let password_hash = Argon2::default()
        .hash_password(form.password.as_bytes(), &salt)
        .map_err(|e| anyhow::anyhow!("password hashing failed: {e}"))?
        .to_string();

    let user_id = Uuid::new_v4();
    state.db.create_user(
        &user_id.to_string(),
        &form.name,
        &form.email,
        &password_hash,
        DEFAULT_AVATAR,
    )?;

    info!("user registered: {} ({})", form.name, form.email);

    Ok(Redirect::to("/?notice=registered").into_response())
}

/// GET /prisijungti
pub async fn login_form(
    State(state): State<AppState>,
    jar: SignedCookieJar,
) -> Result<Response, ApiError> {
    if session::authenticate(&state, &jar).await?.is_some() {
        return Ok(Redirect::to("/").into_response());
    }
    Ok(StatusCode::OK.into_response())
}

/// POST /prisijungti
pub async fn login(
    State(state): State<AppState>,
    jar: SignedCookieJar,
    Form(form): Form<LoginForm>,
) -> Result<Response, ApiError> {
    if session::authenticate(&state, &jar).await?.is_some() {
        return Ok(Redirect::to("/").into_response());
    }

    let errors = forms::validate_login(&form);
    if !errors.is_empty() {
        return Err(ApiError::Validation(errors));
    }

    // Unknown email and wrong password fail identically.
    let user = state
        .db
        .user_by_email(&form.email)?
        .ok_or(ApiError::BadCredentials)?;

    let parsed = PasswordHash::new(&user.password)
        .map_err(|e| anyhow::anyhow!("stored password hash unreadable: {e}"))?;
    Argon2::default()
        .verify_password(form.password.as_bytes(), &parsed)
        .map_err(|_| ApiError::BadCredentials)?;

    let jar = session::establish(&state, jar, &user.id, form.remember)?;

    info!("user logged in: {}", user.name);

    Ok((jar, Redirect::to("/?notice=logged_in")).into_response())
}

/// GET /atsijungti
pub async fn logout(
    State(state): State<AppState>,
    jar: SignedCookieJar,
) -> Result<Response, ApiError> {
    let jar = session::clear(&state, jar)?;
    Ok((jar, Redirect::to("/?notice=logged_out")).into_response())
}
