use serde::{Deserialize, Serialize};
use sqlx::{FromRow, PgPool};
use validator::Validate;

#[derive(Debug, Clone, FromRow)]
pub struct CinemaHall {
    pub id: i64,
    pub name: String,
    pub rows: i32,
    pub seats_in_row: i32,
}

impl CinemaHall {
    pub fn capacity(&self) -> i64 {
        i64::from(self.rows) * i64::from(self.seats_in_row)
    }
}

#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct CinemaHallResponse {
    pub id: i64,
    pub name: String,
    pub rows: i32,
    pub seats_in_row: i32,
    pub capacity: i64,
}

impl From<CinemaHall> for CinemaHallResponse {
    fn from(hall: CinemaHall) -> Self {
        let capacity = hall.capacity();
        CinemaHallResponse {
            id: hall.id,
            name: hall.name,
            rows: hall.rows,
            seats_in_row: hall.seats_in_row,
            capacity,
        }
    }
}

#[derive(Debug, Deserialize, Validate)]
pub struct CreateCinemaHall {
    #[validate(length(min = 1, max = 255, message = "This field may not be blank."))]
    pub name: String,
    #[validate(range(min = 1, message = "Ensure this value is greater than or equal to 1."))]
    pub rows: i32,
    #[validate(range(min = 1, message = "Ensure this value is greater than or equal to 1."))]
    pub seats_in_row: i32,
}

impl CinemaHall {
    pub async fn list(pool: &PgPool) -> Result<Vec<CinemaHall>, sqlx::Error> {
        sqlx::query_as::<_, CinemaHall>("SELECT id, name, rows, seats_in_row FROM cinema_hall ORDER BY id")
            .fetch_all(pool)
            .await
    }

    pub async fn find(pool: &PgPool, id: i64) -> Result<Option<CinemaHall>, sqlx::Error> {
        sqlx::query_as::<_, CinemaHall>("SELECT id, name, rows, seats_in_row FROM cinema_hall WHERE id = $1")
            .bind(id)
            .fetch_optional(pool)
            .await
    }

    pub async fn create(pool: &PgPool, new: &CreateCinemaHall) -> Result<CinemaHall, sqlx::Error> {
        sqlx::query_as::<_, CinemaHall>(
            "INSERT INTO cinema_hall (name, rows, seats_in_row) VALUES ($1, $2, $3)
             RETURNING id, name, rows, seats_in_row",
        )
        .bind(&new.name)
        .bind(new.rows)
        .bind(new.seats_in_row)
        .fetch_one(pool)
        .await
    }
}
