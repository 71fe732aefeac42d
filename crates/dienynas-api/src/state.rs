use std::path::PathBuf;
use std::sync::Arc;

use axum::extract::FromRef;
use axum_extra::extract::cookie::Key;

use dienynas_db::Database;

/// Runtime settings the handlers need. Everything here is supplied from the
/// environment by the server binary; nothing is hard-coded.
#[derive(Debug, Clone)]
pub struct AppConfig {
    pub admin_email: String,
    pub upload_dir: PathBuf,
    pub entries_per_page: u32,
}

#[derive(Clone)]
pub struct AppState {
    pub db: Arc<Database>,
    pub config: Arc<AppConfig>,
    key: Key,
}

impl AppState {
    /// `secret` signs the session cookie; must be at least 32 bytes.
    pub fn new(db: Database, config: AppConfig, secret: &[u8]) -> Self {
        Self {
            db: Arc::new(db),
            config: Arc::new(config),
            key: Key::derive_from(secret),
        }
    }
}

/// Lets the signed-cookie extractor find the signing key in our state.
impl FromRef<AppState> for Key {
    fn from_ref(state: &AppState) -> Key {
        state.key.clone()
    }
}
