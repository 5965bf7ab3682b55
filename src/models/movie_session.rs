use chrono::{NaiveDate, NaiveDateTime};
use serde::{Deserialize, Serialize};
use sqlx::{FromRow, PgPool};
use std::collections::HashMap;

use super::{cinema_hall::CinemaHallResponse, datetime, movie::MovieListItem, CinemaHall};

#[derive(Debug, Clone, FromRow)]
pub struct MovieSession {
    pub id: i64,
    pub show_time: NaiveDateTime,
    pub movie_id: i64,
    pub cinema_hall_id: i64,
}

/// Write-side representation: related objects as ids.
#[derive(Debug, Clone, Serialize)]
pub struct MovieSessionResponse {
    pub id: i64,
    pub show_time: NaiveDateTime,
    pub movie: i64,
    pub cinema_hall: i64,
}

impl From<MovieSession> for MovieSessionResponse {
    fn from(session: MovieSession) -> Self {
        MovieSessionResponse {
            id: session.id,
            show_time: session.show_time,
            movie: session.movie_id,
            cinema_hall: session.cinema_hall_id,
        }
    }
}

/// A seat of a hall, as shown in `taken_places`.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
pub struct SeatPosition {
    pub row: i32,
    pub seat: i32,
}

// Строка списка сеансов вместе с агрегатами по залу и билетам
#[derive(Debug, Clone, FromRow)]
pub struct MovieSessionRow {
    pub id: i64,
    pub show_time: NaiveDateTime,
    pub movie_title: String,
    pub movie_image: Option<String>,
    pub cinema_hall_name: String,
    pub cinema_hall_capacity: i64,
    pub tickets_sold: i64,
}

#[derive(Debug, Clone, Serialize)]
pub struct MovieSessionListItem {
    pub id: i64,
    pub show_time: NaiveDateTime,
    pub movie_title: String,
    pub movie_image: Option<String>,
    pub cinema_hall_name: String,
    pub cinema_hall_capacity: i64,
    pub tickets_available: i64,
}

impl MovieSessionListItem {
    pub fn new(row: MovieSessionRow, movie_image: Option<String>) -> Self {
        MovieSessionListItem {
            id: row.id,
            show_time: row.show_time,
            movie_title: row.movie_title,
            movie_image,
            cinema_hall_name: row.cinema_hall_name,
            cinema_hall_capacity: row.cinema_hall_capacity,
            tickets_available: (row.cinema_hall_capacity - row.tickets_sold).max(0),
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct MovieSessionDetail {
    pub id: i64,
    pub show_time: NaiveDateTime,
    pub movie: MovieListItem,
    pub cinema_hall: CinemaHallResponse,
    pub taken_places: Vec<SeatPosition>,
}

#[derive(Debug, Deserialize)]
pub struct CreateMovieSession {
    #[serde(deserialize_with = "datetime::deserialize")]
    pub show_time: NaiveDateTime,
    pub movie: i64,
    pub cinema_hall: i64,
}

#[derive(Debug, Default, Deserialize)]
pub struct PatchMovieSession {
    #[serde(default, deserialize_with = "datetime::deserialize_option")]
    pub show_time: Option<NaiveDateTime>,
    pub movie: Option<i64>,
    pub cinema_hall: Option<i64>,
}

#[derive(Debug, Clone, Default)]
pub struct SessionFilter {
    pub date: Option<NaiveDate>,
    pub movie: Option<i64>,
}

const LIST_SELECT: &str = r#"
    SELECT
        ms.id,
        ms.show_time,
        m.title AS movie_title,
        m.image AS movie_image,
        ch.name AS cinema_hall_name,
        (ch.rows * ch.seats_in_row)::BIGINT AS cinema_hall_capacity,
        (SELECT COUNT(*) FROM ticket t WHERE t.movie_session_id = ms.id) AS tickets_sold
    FROM movie_session ms
    JOIN movie m ON m.id = ms.movie_id
    JOIN cinema_hall ch ON ch.id = ms.cinema_hall_id
"#;

impl MovieSession {
    pub async fn list(pool: &PgPool, filter: &SessionFilter) -> Result<Vec<MovieSessionRow>, sqlx::Error> {
        sqlx::query_as::<_, MovieSessionRow>(&format!(
            "{} WHERE ($1::DATE IS NULL OR ms.show_time::DATE = $1)
                 AND ($2::BIGINT IS NULL OR ms.movie_id = $2)
             ORDER BY ms.id",
            LIST_SELECT
        ))
        .bind(filter.date)
        .bind(filter.movie)
        .fetch_all(pool)
        .await
    }

    pub async fn list_by_ids(pool: &PgPool, ids: &[i64]) -> Result<Vec<MovieSessionRow>, sqlx::Error> {
        sqlx::query_as::<_, MovieSessionRow>(&format!("{} WHERE ms.id = ANY($1)", LIST_SELECT))
            .bind(ids)
            .fetch_all(pool)
            .await
    }

    pub async fn find(pool: &PgPool, id: i64) -> Result<Option<MovieSession>, sqlx::Error> {
        sqlx::query_as::<_, MovieSession>(
            "SELECT id, show_time, movie_id, cinema_hall_id FROM movie_session WHERE id = $1",
        )
        .bind(id)
        .fetch_optional(pool)
        .await
    }

    pub async fn create(pool: &PgPool, new: &CreateMovieSession) -> Result<MovieSession, sqlx::Error> {
        sqlx::query_as::<_, MovieSession>(
            "INSERT INTO movie_session (show_time, movie_id, cinema_hall_id) VALUES ($1, $2, $3)
             RETURNING id, show_time, movie_id, cinema_hall_id",
        )
        .bind(new.show_time)
        .bind(new.movie)
        .bind(new.cinema_hall)
        .fetch_one(pool)
        .await
    }

    /// Applies the given fields; `None` keeps the stored value.
    pub async fn update(pool: &PgPool, id: i64, changes: &PatchMovieSession) -> Result<Option<MovieSession>, sqlx::Error> {
        sqlx::query_as::<_, MovieSession>(
            "UPDATE movie_session SET
                show_time = COALESCE($2, show_time),
                movie_id = COALESCE($3, movie_id),
                cinema_hall_id = COALESCE($4, cinema_hall_id)
             WHERE id = $1
             RETURNING id, show_time, movie_id, cinema_hall_id",
        )
        .bind(id)
        .bind(changes.show_time)
        .bind(changes.movie)
        .bind(changes.cinema_hall)
        .fetch_optional(pool)
        .await
    }

    pub async fn delete(pool: &PgPool, id: i64) -> Result<bool, sqlx::Error> {
        let result = sqlx::query("DELETE FROM movie_session WHERE id = $1")
            .bind(id)
            .execute(pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }

    pub async fn taken_places(pool: &PgPool, id: i64) -> Result<Vec<SeatPosition>, sqlx::Error> {
        sqlx::query_as::<_, (i32, i32)>(
            "SELECT row, seat FROM ticket WHERE movie_session_id = $1 ORDER BY row, seat",
        )
        .bind(id)
        .fetch_all(pool)
        .await
        .map(|rows| rows.into_iter().map(|(row, seat)| SeatPosition { row, seat }).collect())
    }

    /// Hall of every session in `ids`, keyed by session id. Unknown ids are absent.
    pub async fn halls_for(pool: &PgPool, ids: &[i64]) -> Result<HashMap<i64, CinemaHall>, sqlx::Error> {
        let rows = sqlx::query_as::<_, (i64, i64, String, i32, i32)>(
            "SELECT ms.id, ch.id, ch.name, ch.rows, ch.seats_in_row
             FROM movie_session ms
             JOIN cinema_hall ch ON ch.id = ms.cinema_hall_id
             WHERE ms.id = ANY($1)",
        )
        .bind(ids)
        .fetch_all(pool)
        .await?;

        Ok(rows
            .into_iter()
            .map(|(session_id, id, name, rows, seats_in_row)| {
                (session_id, CinemaHall { id, name, rows, seats_in_row })
            })
            .collect())
    }

    /// Sessions starting within the next `hours`.
    pub async fn upcoming_ids(pool: &PgPool, hours: i32) -> Result<Vec<i64>, sqlx::Error> {
        sqlx::query_scalar::<_, i64>(
            "SELECT id FROM movie_session
             WHERE show_time >= NOW() AND show_time < NOW() + make_interval(hours => $1)
             ORDER BY show_time",
        )
        .bind(hours)
        .fetch_all(pool)
        .await
    }
}
