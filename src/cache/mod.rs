use crate::{config::RedisConfig, database::Database, models::MovieSession, redis_client::RedisClient};
use tracing::{info, warn};

pub mod seats;
pub mod sessions;

pub use seats::SeatClaim;

/// Read-through cache in front of PostgreSQL. Redis failures are logged and
/// fall back to the database, they never fail a request.
#[derive(Clone)]
pub struct CacheService {
    redis: RedisClient,
    db: Database,
    taken_places_ttl: u64,
    seat_hold_ttl: u64,
}

impl CacheService {
    pub fn new(redis: RedisClient, db: Database, config: &RedisConfig) -> Self {
        Self {
            redis,
            db,
            taken_places_ttl: config.taken_places_ttl_seconds,
            seat_hold_ttl: config.seat_hold_seconds,
        }
    }

    // Прогрев кеша занятых мест для ближайших сеансов
    pub async fn warmup_cache(&self) {
        info!("Starting cache warmup...");

        let ids = match MovieSession::upcoming_ids(&self.db.pool, 24).await {
            Ok(ids) => ids,
            Err(e) => {
                warn!("Cache warmup skipped: {:?}", e);
                return;
            }
        };

        for id in &ids {
            let _ = self.taken_places(*id).await;
        }

        info!("Cache warmup done, {} sessions loaded", ids.len());
    }
}
