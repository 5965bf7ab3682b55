//! booking.rs
//!
//! Оформление заказа: набор билетов на конкретные места сеансов создаётся
//! целиком или не создаётся вовсе.
//!
//! Порядок работы:
//! 1.  **Проверка запроса**: заказ не пустой, одно и то же место сеанса не
//!     встречается дважды, сеансы существуют, ряд и место лежат в пределах зала.
//! 2.  **Захват мест в Redis**: `SET NX EX` на каждое место. Если место уже
//!     держит параллельный запрос, заказ отклоняется сразу. Недоступность Redis
//!     не блокирует продажу.
//! 3.  **Транзакция в PostgreSQL**: заказ и все билеты пишутся в одной
//!     транзакции. Уникальный индекс `(movie_session_id, row, seat)` является
//!     окончательной защитой от двойной продажи: при нарушении транзакция
//!     откатывается целиком.
//! 4.  **Уборка**: захваты в Redis снимаются, кеш занятых мест затронутых
//!     сеансов инвалидируется.

use std::collections::{BTreeSet, HashSet};
use std::sync::Arc;
use thiserror::Error;
use tracing::{info, warn};

use crate::{
    cache::SeatClaim,
    database::is_unique_violation,
    error::ApiError,
    models::{order::TicketRequest, CinemaHall, MovieSession, Order, Ticket},
    AppState,
};

#[derive(Debug, Error)]
pub enum BookingError {
    #[error("Order must contain at least one ticket.")]
    Empty,

    #[error("Row {row} seat {seat} of movie session {movie_session} is requested more than once.")]
    Duplicate { movie_session: i64, row: i32, seat: i32 },

    #[error("Movie session {0} does not exist.")]
    UnknownSession(i64),

    #[error("row number must be in available range: (1, rows): (1, {max}), got {value}.")]
    RowOutOfRange { value: i32, max: i32 },

    #[error("seat number must be in available range: (1, seats_in_row): (1, {max}), got {value}.")]
    SeatOutOfRange { value: i32, max: i32 },

    #[error("Row {row} seat {seat} of movie session {movie_session} is already taken.")]
    Taken { movie_session: i64, row: i32, seat: i32 },

    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),
}

impl From<BookingError> for ApiError {
    fn from(err: BookingError) -> Self {
        let message = err.to_string();
        match err {
            BookingError::Database(e) => ApiError::Database(e),
            BookingError::Taken { .. } => ApiError::Conflict(message),
            _ => ApiError::BadRequest(message),
        }
    }
}

/// Rejects empty orders and orders naming the same seat of a session twice.
pub fn ensure_distinct(tickets: &[TicketRequest]) -> Result<(), BookingError> {
    if tickets.is_empty() {
        return Err(BookingError::Empty);
    }
    let mut seen = HashSet::with_capacity(tickets.len());
    for t in tickets {
        if !seen.insert((t.movie_session, t.row, t.seat)) {
            return Err(BookingError::Duplicate {
                movie_session: t.movie_session,
                row: t.row,
                seat: t.seat,
            });
        }
    }
    Ok(())
}

/// Row and seat must both fall inside the hall, counting from 1.
pub fn validate_seat(hall: &CinemaHall, row: i32, seat: i32) -> Result<(), BookingError> {
    if !(1..=hall.rows).contains(&row) {
        return Err(BookingError::RowOutOfRange { value: row, max: hall.rows });
    }
    if !(1..=hall.seats_in_row).contains(&seat) {
        return Err(BookingError::SeatOutOfRange { value: seat, max: hall.seats_in_row });
    }
    Ok(())
}

pub struct PlacedOrder {
    pub order: Order,
    pub tickets: Vec<Ticket>,
}

pub struct BookingService {
    state: Arc<AppState>,
}

impl BookingService {
    pub fn new(state: Arc<AppState>) -> Self {
        Self { state }
    }

    pub async fn place_order(&self, user_id: i64, tickets: &[TicketRequest]) -> Result<PlacedOrder, BookingError> {
        ensure_distinct(tickets)?;

        let session_ids: Vec<i64> = tickets
            .iter()
            .map(|t| t.movie_session)
            .collect::<BTreeSet<_>>()
            .into_iter()
            .collect();

        let halls = MovieSession::halls_for(&self.state.db.pool, &session_ids).await?;
        for t in tickets {
            let hall = halls
                .get(&t.movie_session)
                .ok_or(BookingError::UnknownSession(t.movie_session))?;
            validate_seat(hall, t.row, t.seat)?;
        }

        let claims = self.claim_seats(user_id, tickets).await?;
        let result = self.insert_order(user_id, tickets).await;
        self.state.cache.release_seats(&claims).await;
        let placed = result?;

        self.state.cache.invalidate_taken_places(&session_ids).await;
        info!(
            "Order {} placed by user {} with {} tickets",
            placed.order.id,
            user_id,
            placed.tickets.len()
        );

        Ok(placed)
    }

    /// Holds every requested seat in Redis. On the first seat held elsewhere,
    /// everything claimed so far is released and the order is rejected.
    async fn claim_seats(&self, user_id: i64, tickets: &[TicketRequest]) -> Result<Vec<String>, BookingError> {
        let mut claimed = Vec::with_capacity(tickets.len());
        for t in tickets {
            match self
                .state
                .cache
                .claim_seat(t.movie_session, t.row, t.seat, user_id)
                .await
            {
                SeatClaim::Claimed(key) => claimed.push(key),
                SeatClaim::Unavailable => {}
                SeatClaim::Held => {
                    self.state.cache.release_seats(&claimed).await;
                    return Err(BookingError::Taken {
                        movie_session: t.movie_session,
                        row: t.row,
                        seat: t.seat,
                    });
                }
            }
        }
        Ok(claimed)
    }

    async fn insert_order(&self, user_id: i64, tickets: &[TicketRequest]) -> Result<PlacedOrder, BookingError> {
        let mut tx = self.state.db.pool.begin().await?;

        let order = sqlx::query_as::<_, Order>(
            "INSERT INTO orders (user_id) VALUES ($1) RETURNING id, created_at, user_id",
        )
        .bind(user_id)
        .fetch_one(&mut *tx)
        .await?;

        let mut created = Vec::with_capacity(tickets.len());
        for t in tickets {
            let ticket = sqlx::query_as::<_, Ticket>(
                "INSERT INTO ticket (movie_session_id, order_id, row, seat)
                 VALUES ($1, $2, $3, $4)
                 RETURNING id, movie_session_id, order_id, row, seat",
            )
            .bind(t.movie_session)
            .bind(order.id)
            .bind(t.row)
            .bind(t.seat)
            .fetch_one(&mut *tx)
            .await;

            match ticket {
                Ok(ticket) => created.push(ticket),
                Err(e) if is_unique_violation(&e) => {
                    warn!(
                        "Seat {}/{} of session {} already sold, rolling back order",
                        t.row, t.seat, t.movie_session
                    );
                    tx.rollback().await?;
                    return Err(BookingError::Taken {
                        movie_session: t.movie_session,
                        row: t.row,
                        seat: t.seat,
                    });
                }
                Err(e) => return Err(e.into()),
            }
        }

        tx.commit().await?;
        Ok(PlacedOrder { order, tickets: created })
    }
}
