pub mod appresult;
pub mod auth;
pub mod chats;
pub mod config;
pub mod db;
pub mod models;
pub mod profiles;
pub mod rooms;

use std::sync::Arc;

use axum::{extract::FromRef, routing::get, Router};
use sqlx::SqlitePool;
use tower_http::{cors::CorsLayer, trace::TraceLayer};

pub use appresult::{AppError, AppResult};
pub use config::Config;
pub use rooms::Rooms;

#[derive(Clone, FromRef)]
pub struct AppState {
    pub db_pool: SqlitePool,
    pub rooms: Arc<Rooms>,
    pub config: Arc<Config>,
}

impl AppState {
    pub fn new(db_pool: SqlitePool, config: Config) -> Self {
        Self {
            db_pool,
            rooms: Arc::new(Rooms::new()),
            config: Arc::new(config),
        }
    }
}

pub fn router(app_state: AppState) -> Router {
    let api = Router::new()
        .merge(auth::router())
        .merge(profiles::router())
        .merge(chats::router());

    Router::new()
        .route("/health", get(|| async { "ok" }))
        .nest("/api", api)
        .merge(rooms::router())
        .with_state(app_state)
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
}
