use std::net::SocketAddr;
use std::path::PathBuf;

use axum::{Json, Router, middleware, routing::get};
use tower_http::services::ServeDir;
use tower_http::trace::TraceLayer;
use tracing::info;

use dienynas_api::session::{require_admin, require_auth};
use dienynas_api::state::{AppConfig, AppState};
use dienynas_api::{account, admin, auth, entries};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load .env if present
    let _ = dotenvy::dotenv();

    // Init logging
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "dienynas=debug,tower_http=debug".into()),
        )
        .init();

    // Config
    let secret = std::env::var("DIENYNAS_SECRET_KEY")
        .unwrap_or_else(|_| "dev-secret-change-me-dev-secret-change-me".into());
    anyhow::ensure!(
        secret.len() >= 32,
        "DIENYNAS_SECRET_KEY must be at least 32 bytes"
    );
    let db_path = std::env::var("DIENYNAS_DB_PATH").unwrap_or_else(|_| "dienynas.db".into());
    let host = std::env::var("DIENYNAS_HOST").unwrap_or_else(|_| "0.0.0.0".into());
    let port: u16 = std::env::var("DIENYNAS_PORT")
        .unwrap_or_else(|_| "3000".into())
        .parse()?;
    let admin_email =
        std::env::var("DIENYNAS_ADMIN_EMAIL").unwrap_or_else(|_| "admin@example.com".into());
    let upload_dir =
        PathBuf::from(std::env::var("DIENYNAS_UPLOAD_DIR").unwrap_or_else(|_| "uploads".into()));
    let entries_per_page: u32 = std::env::var("DIENYNAS_PAGE_SIZE")
        .unwrap_or_else(|_| "3".into())
        .parse()?;

    std::fs::create_dir_all(&upload_dir)?;

    // Init database
    let db = dienynas_db::Database::open(&PathBuf::from(&db_path))?;
    let purged = db.purge_expired_sessions(chrono::Utc::now())?;
    if purged > 0 {
        info!("purged {purged} expired sessions");
    }

    let state = AppState::new(
        db,
        AppConfig {
            admin_email,
            upload_dir: upload_dir.clone(),
            entries_per_page,
        },
        secret.as_bytes(),
    );

    // Routes
    let public_routes = Router::new()
        .route("/", get(home))
        .route("/registruotis", get(auth::register_form).post(auth::register))
        .route("/prisijungti", get(auth::login_form).post(auth::login))
        .route("/atsijungti", get(auth::logout))
        .with_state(state.clone());

    let protected_routes = Router::new()
        .route(
            "/paskyra",
            get(account::account_view).post(account::update_account),
        )
        .route("/irasai", get(entries::list_entries))
        .route(
            "/naujas_irasas",
            get(entries::new_entry_form).post(entries::create_entry),
        )
        .layer(middleware::from_fn_with_state(state.clone(), require_auth))
        .with_state(state.clone());

    let admin_routes = Router::new()
        .route("/admin/vartotojai", get(admin::list_users))
        .route("/admin/irasai", get(admin::list_entries))
        .layer(middleware::from_fn_with_state(state.clone(), require_admin))
        .layer(middleware::from_fn_with_state(state.clone(), require_auth))
        .with_state(state);

    let app = Router::new()
        .merge(public_routes)
        .merge(protected_routes)
        .merge(admin_routes)
        .nest_service("/static/avatars", ServeDir::new(upload_dir))
        .layer(TraceLayer::new_for_http());

    let addr: SocketAddr = format!("{host}:{port}").parse()?;
    info!("Dienynas server listening on {}", addr);

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}

async fn home() -> Json<serde_json::Value> {
    Json(serde_json::json!({
        "app": "dienynas",
        "version": env!("CARGO_PKG_VERSION"),
    }))
}
