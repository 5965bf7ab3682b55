pub mod config;
pub mod database;
pub mod redis_client;
pub mod models;
pub mod controllers;
pub mod middleware;
pub mod cache;
pub mod services;
pub mod error;

use axum::{extract::DefaultBodyLimit, routing::get, Router};
use std::sync::Arc;
use std::time::Duration;
use tower_http::{cors::CorsLayer, services::ServeDir, trace::TraceLayer};
use tracing::{info, warn};

use crate::{
    models::user::{NewUser, User},
    services::{jwt::JwtService, media::MediaStorage, password},
};

// Shared state для всего приложения
#[derive(Clone)]
pub struct AppState {
    pub db: database::Database,
    pub cache: cache::CacheService,
    pub config: config::Config,
    pub jwt: JwtService,
    pub media: MediaStorage,
}

impl AppState {
    /// Connects to PostgreSQL (waiting for it to come up) and applies migrations.
    pub async fn new(config: config::Config) -> anyhow::Result<Arc<Self>> {
        let db = database::Database::connect_with_retry(
            &config.database.url,
            config.database.pool_size,
            config.database.connect_retries,
        )
        .await?;
        info!("Database connected");

        db.run_migrations().await?;

        Ok(Self::with_database(config, db)?)
    }

    /// Builds the state around an existing pool without touching the network.
    pub fn with_database(config: config::Config, db: database::Database) -> redis::RedisResult<Arc<Self>> {
        let redis = redis_client::RedisClient::new(
            &config.redis.url,
            Duration::from_millis(config.redis.connect_timeout_ms),
        )?;
        let cache = cache::CacheService::new(redis, db.clone(), &config.redis);
        let jwt = JwtService::new(&config.jwt);
        let media = MediaStorage::new(&config.media);

        Ok(Arc::new(Self {
            db,
            cache,
            config,
            jwt,
            media,
        }))
    }

    /// Creates the configured staff account, or promotes it if it already exists.
    pub async fn ensure_admin(&self) -> Result<(), error::ApiError> {
        let Some(admin) = &self.config.admin else {
            return Ok(());
        };

        match User::find_by_email(&self.db.pool, &admin.email).await? {
            Some(user) if user.is_staff => {}
            Some(user) => {
                User::promote_to_staff(&self.db.pool, user.id).await?;
                warn!("Existing user {} promoted to staff", user.email);
            }
            None => {
                let password_hash =
                    password::hash_password(admin.password.clone(), self.config.jwt.bcrypt_cost).await?;
                let user = User::create(
                    &self.db.pool,
                    &NewUser {
                        email: admin.email.clone(),
                        password_hash,
                        first_name: String::new(),
                        last_name: String::new(),
                        is_staff: true,
                    },
                )
                .await?;
                info!("Admin account {} created", user.email);
            }
        }
        Ok(())
    }
}

/// The full HTTP surface: API routes, uploaded media and health checks.
pub fn app(state: Arc<AppState>) -> Router {
    let media_path = state.config.media.url.trim_end_matches('/').to_string();
    let body_limit = state.config.media.max_upload_bytes;

    let mut router = Router::new()
        .route("/", get(|| async { "Cinema API v1.0" }))
        .route("/health", get(|| async { "OK" }))
        .nest("/api", controllers::routes());

    // Only a local path prefix can be served from disk
    if media_path.starts_with('/') && media_path.len() > 1 {
        router = router.nest_service(&media_path, ServeDir::new(state.media.root()));
    }

    router
        .with_state(state)
        .layer(DefaultBodyLimit::max(body_limit))
        .layer(CorsLayer::permissive())
        .layer(TraceLayer::new_for_http())
}
