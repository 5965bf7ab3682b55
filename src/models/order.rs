use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};
use sqlx::{FromRow, PgPool};
use validator::Validate;

use super::movie_session::MovieSessionListItem;

#[derive(Debug, Clone, FromRow)]
pub struct Order {
    pub id: i64,
    pub created_at: NaiveDateTime,
    pub user_id: i64,
}

#[derive(Debug, Clone, FromRow)]
pub struct Ticket {
    pub id: i64,
    pub movie_session_id: i64,
    pub order_id: i64,
    pub row: i32,
    pub seat: i32,
}

/// One requested seat of an order.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, Validate, PartialEq, Eq, Hash)]
pub struct TicketRequest {
    pub movie_session: i64,
    #[validate(range(min = 1, message = "Ensure this value is greater than or equal to 1."))]
    pub row: i32,
    #[validate(range(min = 1, message = "Ensure this value is greater than or equal to 1."))]
    pub seat: i32,
}

#[derive(Debug, Deserialize, Validate)]
pub struct CreateOrder {
    #[validate(length(min = 1, message = "Order must contain at least one ticket."), nested)]
    pub tickets: Vec<TicketRequest>,
}

#[derive(Debug, Clone, Serialize)]
pub struct TicketResponse {
    pub id: i64,
    pub row: i32,
    pub seat: i32,
    pub movie_session: MovieSessionListItem,
}

#[derive(Debug, Clone, Serialize)]
pub struct OrderResponse {
    pub id: i64,
    pub created_at: NaiveDateTime,
    pub tickets: Vec<TicketResponse>,
}

impl Order {
    pub async fn count_for_user(pool: &PgPool, user_id: i64) -> Result<i64, sqlx::Error> {
        sqlx::query_scalar::<_, i64>("SELECT COUNT(*) FROM orders WHERE user_id = $1")
            .bind(user_id)
            .fetch_one(pool)
            .await
    }

    /// One page of the user's orders, newest first.
    pub async fn page_for_user(
        pool: &PgPool,
        user_id: i64,
        limit: i64,
        offset: i64,
    ) -> Result<Vec<Order>, sqlx::Error> {
        sqlx::query_as::<_, Order>(
            "SELECT id, created_at, user_id FROM orders
             WHERE user_id = $1
             ORDER BY created_at DESC, id DESC
             LIMIT $2 OFFSET $3",
        )
        .bind(user_id)
        .bind(limit)
        .bind(offset)
        .fetch_all(pool)
        .await
    }
}

impl Ticket {
    pub async fn for_orders(pool: &PgPool, order_ids: &[i64]) -> Result<Vec<Ticket>, sqlx::Error> {
        sqlx::query_as::<_, Ticket>(
            "SELECT id, movie_session_id, order_id, row, seat FROM ticket
             WHERE order_id = ANY($1)
             ORDER BY id",
        )
        .bind(order_ids)
        .fetch_all(pool)
        .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_ticket_list_fails_validation() {
        let order = CreateOrder { tickets: vec![] };
        let errors = order.validate().unwrap_err();
        assert!(errors.field_errors().contains_key("tickets"));
    }

    #[test]
    fn ticket_seat_must_be_positive() {
        let ticket = TicketRequest { movie_session: 1, row: 1, seat: 0 };
        assert!(ticket.validate().is_err());
    }

    #[test]
    fn order_validates_each_ticket() {
        let order = CreateOrder {
            tickets: vec![
                TicketRequest { movie_session: 1, row: 1, seat: 1 },
                TicketRequest { movie_session: 1, row: 0, seat: 2 },
            ],
        };
        let errors = order.validate().unwrap_err();
        assert!(errors.errors().contains_key("tickets"));
        assert!(!errors.field_errors().contains_key("tickets"));
    }
}
