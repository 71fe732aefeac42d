//! Account view and update. The update arrives as multipart form data
//! because it may carry a replacement avatar image.

use axum::extract::{Multipart, State};
use axum::response::Redirect;
use axum::{Extension, Json};
use tracing::info;

use dienynas_types::api::{AccountView, CurrentUser, FieldError};

use crate::avatar;
use crate::error::ApiError;
use crate::forms;
use crate::state::AppState;

/// GET /paskyra. Current values for form pre-fill.
pub async fn account_view(Extension(user): Extension<CurrentUser>) -> Json<AccountView> {
    Json(AccountView {
        name: user.name,
        email: user.email,
        avatar: user.avatar,
    })
}

/// POST /paskyra
pub async fn update_account(
    State(state): State<AppState>,
    Extension(user): Extension<CurrentUser>,
    mut multipart: Multipart,
) -> Result<Redirect, ApiError> {
    let mut name = None;
    let mut email = None;
    let mut upload: Option<(String, Vec<u8>)> = None;

    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| anyhow::anyhow!("bad multipart body: {e}"))?
    {
        match field.name().unwrap_or("") {
            "name" => {
                name = Some(
                    field
                        .text()
                        .await
                        .map_err(|e| anyhow::anyhow!("bad multipart field: {e}"))?,
                )
            }
            "email" => {
                email = Some(
                    field
                        .text()
                        .await
                        .map_err(|e| anyhow::anyhow!("bad multipart field: {e}"))?,
                )
            }
            "avatar" => {
                // A file input left empty still submits a part, with an
                // empty filename and body.
                let filename = field.file_name().map(|s| s.to_string());
                let bytes = field
                    .bytes()
                    .await
                    .map_err(|e| anyhow::anyhow!("bad multipart field: {e}"))?;
                if let Some(filename) = filename.filter(|f| !f.is_empty()) {
                    if !bytes.is_empty() {
                        upload = Some((filename, bytes.to_vec()));
                    }
                }
            }
            _ => {}
        }
    }

    let name = name.unwrap_or_default();
    let email = email.unwrap_or_default();

    let mut errors = forms::validate_account(&name, &email, &user, state.db.as_ref())?;

    // Reject a bad upload before anything gets written.
    if let Some((filename, _)) = &upload {
        if !avatar::allowed(filename) {
            errors.push(FieldError::new(
                "avatar",
                "only jpg and png images are accepted",
            ));
        }
    }

    if !errors.is_empty() {
        return Err(ApiError::Validation(errors));
    }

    let stored = match upload {
        Some((filename, bytes)) => {
            let dir = state.config.upload_dir.clone();
            let old = user.avatar.clone();
            tokio::task::spawn_blocking(move || avatar::replace(&dir, &old, &filename, &bytes))
                .await
                .map_err(|e| anyhow::anyhow!("avatar task failed: {e}"))??
        }
        None => user.avatar.clone(),
    };

    state
        .db
        .update_user(&user.id.to_string(), &name, &email, &stored)?;

    info!("account updated: {}", name);

    Ok(Redirect::to("/paskyra?notice=updated"))
}
