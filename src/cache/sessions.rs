use crate::cache::CacheService;
use crate::models::{movie_session::SeatPosition, MovieSession};
use redis::AsyncCommands;
use tracing::{debug, warn};

/// Counter bumped on every invalidation of a session's taken places.
pub fn taken_places_generation_key(session_id: i64) -> String {
    format!("session:{}:taken:gen", session_id)
}

/// Cached taken places of a session, valid only for one generation.
pub fn taken_places_key(session_id: i64, generation: u64) -> String {
    format!("session:{}:taken:{}", session_id, generation)
}

impl CacheService {
    /// Taken seats of a session, from Redis when cached, otherwise from the database.
    ///
    /// The generation is read before the database query. If a booking commits
    /// in between, its invalidation moves the generation on, and the list
    /// written here lands under a key nobody reads anymore.
    pub async fn taken_places(&self, session_id: i64) -> Result<Vec<SeatPosition>, sqlx::Error> {
        let generation = self.taken_places_generation(session_id).await;

        if let Some(generation) = generation {
            if let Some(places) = self.get_taken_from_cache(session_id, generation).await {
                return Ok(places);
            }
        }

        let places = MovieSession::taken_places(&self.db.pool, session_id).await?;
        if let Some(generation) = generation {
            if let Err(e) = self.save_taken_to_cache(session_id, generation, &places).await {
                warn!("Failed to cache taken places for session {}: {:?}", session_id, e);
            }
        }
        Ok(places)
    }

    pub async fn invalidate_taken_places(&self, session_ids: &[i64]) {
        if session_ids.is_empty() {
            return;
        }
        let mut conn = match self.redis.connection().await {
            Ok(conn) => conn,
            Err(e) => {
                warn!("Redis unavailable, taken places not invalidated: {:?}", e);
                return;
            }
        };

        let mut pipe = redis::pipe();
        for id in session_ids {
            pipe.incr(taken_places_generation_key(*id), 1).ignore();
        }
        let result: Result<(), _> = pipe.query_async(&mut conn).await;
        match result {
            Ok(()) => debug!("Invalidated taken places for sessions {:?}", session_ids),
            Err(e) => warn!("Failed to invalidate taken places: {:?}", e),
        }
    }

    /// `None` when Redis cannot be asked, so the cache is bypassed entirely.
    async fn taken_places_generation(&self, session_id: i64) -> Option<u64> {
        let mut conn = self.redis.connection().await.ok()?;
        let generation: Option<u64> = conn
            .get(taken_places_generation_key(session_id))
            .await
            .ok()?;
        Some(generation.unwrap_or(0))
    }

    async fn get_taken_from_cache(&self, session_id: i64, generation: u64) -> Option<Vec<SeatPosition>> {
        let mut conn = self.redis.connection().await.ok()?;
        let data: Option<String> = conn.get(taken_places_key(session_id, generation)).await.ok()?;
        data.and_then(|d| serde_json::from_str(&d).ok())
    }

    async fn save_taken_to_cache(
        &self,
        session_id: i64,
        generation: u64,
        places: &[SeatPosition],
    ) -> Result<(), redis::RedisError> {
        let data = serde_json::to_string(places).map_err(|_| {
            redis::RedisError::from((redis::ErrorKind::TypeError, "Serialize error"))
        })?;
        let mut conn = self.redis.connection().await?;
        conn.set_ex(taken_places_key(session_id, generation), data, self.taken_places_ttl)
            .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{config::RedisConfig, database::Database, redis_client::RedisClient};
    use sqlx::PgPool;
    use std::time::Duration;

    #[test]
    fn key_is_scoped_by_session_and_generation() {
        assert_eq!(taken_places_key(42, 0), "session:42:taken:0");
        assert_ne!(taken_places_key(42, 0), taken_places_key(42, 1));
        assert_eq!(taken_places_generation_key(42), "session:42:taken:gen");
    }

    async fn session_with_order(pool: &PgPool) -> (i64, i64) {
        let session_id: i64 = sqlx::query_scalar(
            "WITH h AS (INSERT INTO cinema_hall (name, rows, seats_in_row) VALUES ('Blue', 5, 5) RETURNING id),
                  m AS (INSERT INTO movie (title, description, duration) VALUES ('Matrix', '', 136) RETURNING id)
             INSERT INTO movie_session (show_time, movie_id, cinema_hall_id)
             SELECT '2022-06-02 14:00', m.id, h.id FROM m, h
             RETURNING id",
        )
        .fetch_one(pool)
        .await
        .unwrap();
        let order_id: i64 = sqlx::query_scalar(
            "WITH u AS (INSERT INTO users (email, password_hash) VALUES ('buyer@cinema.test', '-') RETURNING id)
             INSERT INTO orders (user_id) SELECT id FROM u RETURNING id",
        )
        .fetch_one(pool)
        .await
        .unwrap();
        (session_id, order_id)
    }

    // Needs a Redis server: TEST_REDIS_URL=redis://127.0.0.1:6379
    #[sqlx::test(migrations = "./src/migrations")]
    async fn late_cache_write_does_not_hide_a_sale(pool: PgPool) {
        let Ok(redis_url) = std::env::var("TEST_REDIS_URL") else {
            eprintln!("TEST_REDIS_URL not set, skipping");
            return;
        };
        let redis = RedisClient::new(&redis_url, Duration::from_secs(2)).unwrap();
        let cache = CacheService::new(
            redis,
            Database { pool: pool.clone() },
            &RedisConfig {
                url: redis_url,
                taken_places_ttl_seconds: 300,
                seat_hold_seconds: 30,
                connect_timeout_ms: 2000,
            },
        );
        let (session_id, order_id) = session_with_order(&pool).await;
        // ids repeat across test databases, start from a fresh generation
        cache.invalidate_taken_places(&[session_id]).await;

        // reader misses the cache and loads the list before the sale
        let generation = cache.taken_places_generation(session_id).await.unwrap();
        let before = MovieSession::taken_places(&pool, session_id).await.unwrap();
        assert!(before.is_empty());

        // sale commits and invalidates
        sqlx::query("INSERT INTO ticket (movie_session_id, order_id, row, seat) VALUES ($1, $2, 2, 3)")
            .bind(session_id)
            .bind(order_id)
            .execute(&pool)
            .await
            .unwrap();
        cache.invalidate_taken_places(&[session_id]).await;

        // reader finally writes its old list
        cache.save_taken_to_cache(session_id, generation, &before).await.unwrap();

        let places = cache.taken_places(session_id).await.unwrap();
        assert_eq!(places, vec![SeatPosition { row: 2, seat: 3 }]);
    }
}
