use crate::cache::CacheService;
use redis::AsyncCommands;
use tracing::warn;

/// Outcome of trying to hold a seat while an order is being written.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SeatClaim {
    /// We hold the key and must release it.
    Claimed(String),
    /// Another request holds this seat right now.
    Held,
    /// Redis could not be reached; the database constraint still applies.
    Unavailable,
}

pub fn seat_claim_key(session_id: i64, row: i32, seat: i32) -> String {
    format!("seat:{}:{}:{}:claim", session_id, row, seat)
}

impl CacheService {
    // Атомарный захват места: SET NX EX, без гонок
    pub async fn claim_seat(&self, session_id: i64, row: i32, seat: i32, user_id: i64) -> SeatClaim {
        let key = seat_claim_key(session_id, row, seat);
        let mut conn = match self.redis.connection().await {
            Ok(conn) => conn,
            Err(e) => {
                warn!("Redis unavailable, seat claim skipped: {:?}", e);
                return SeatClaim::Unavailable;
            }
        };

        let result: Result<Option<String>, _> = redis::cmd("SET")
            .arg(&key)
            .arg(user_id)
            .arg("NX")
            .arg("EX")
            .arg(self.seat_hold_ttl)
            .query_async(&mut conn)
            .await;

        match result {
            Ok(Some(_)) => SeatClaim::Claimed(key),
            Ok(None) => SeatClaim::Held,
            Err(e) => {
                warn!("Seat claim failed for {}: {:?}", key, e);
                SeatClaim::Unavailable
            }
        }
    }

    pub async fn release_seats(&self, keys: &[String]) {
        if keys.is_empty() {
            return;
        }
        let mut conn = match self.redis.connection().await {
            Ok(conn) => conn,
            Err(e) => {
                // claims expire on their own
                warn!("Redis unavailable, {} seat claims left to expire: {:?}", keys.len(), e);
                return;
            }
        };
        let result: Result<(), _> = conn.del(keys).await;
        if let Err(e) = result {
            warn!("Failed to release seat claims: {:?}", e);
        }
    }
}
