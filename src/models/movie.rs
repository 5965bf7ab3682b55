use serde::{Deserialize, Serialize};
use sqlx::{FromRow, PgPool, Postgres, QueryBuilder, Row};
use std::collections::HashMap;
use validator::Validate;

use super::{actor::ActorResponse, Actor, Genre};

#[derive(Debug, Clone, FromRow)]
pub struct Movie {
    pub id: i64,
    pub title: String,
    pub description: String,
    pub duration: i32,
    pub image: Option<String>,
}

/// Row of the movie list: related names flattened to strings.
#[derive(Debug, Clone, Serialize)]
pub struct MovieListItem {
    pub id: i64,
    pub title: String,
    pub description: String,
    pub duration: i32,
    pub genres: Vec<String>,
    pub actors: Vec<String>,
    pub image: Option<String>,
}

#[derive(Debug, Clone, Serialize)]
pub struct MovieDetail {
    pub id: i64,
    pub title: String,
    pub description: String,
    pub duration: i32,
    pub genres: Vec<Genre>,
    pub actors: Vec<ActorResponse>,
    pub image: Option<String>,
}

impl MovieListItem {
    pub fn new(movie: Movie, genres: &[Genre], actors: &[Actor], image: Option<String>) -> Self {
        MovieListItem {
            id: movie.id,
            title: movie.title,
            description: movie.description,
            duration: movie.duration,
            genres: genres.iter().map(|g| g.name.clone()).collect(),
            actors: actors.iter().map(Actor::full_name).collect(),
            image,
        }
    }
}

impl MovieDetail {
    pub fn new(movie: Movie, genres: Vec<Genre>, actors: Vec<Actor>, image: Option<String>) -> Self {
        MovieDetail {
            id: movie.id,
            title: movie.title,
            description: movie.description,
            duration: movie.duration,
            genres,
            actors: actors.into_iter().map(ActorResponse::from).collect(),
            image,
        }
    }
}

#[derive(Debug, Deserialize, Validate)]
pub struct CreateMovie {
    #[validate(length(min = 1, max = 255, message = "This field may not be blank."))]
    pub title: String,
    pub description: String,
    #[validate(range(min = 1, message = "Ensure this value is greater than or equal to 1."))]
    pub duration: i32,
    #[serde(default)]
    pub genres: Vec<i64>,
    #[serde(default)]
    pub actors: Vec<i64>,
}

/// List filters. Genre and actor lists match a movie having any of the ids.
#[derive(Debug, Clone, Default)]
pub struct MovieFilter {
    pub title: Option<String>,
    pub genres: Vec<i64>,
    pub actors: Vec<i64>,
}

/// Escapes LIKE wildcards so user input matches literally.
pub fn escape_like(value: &str) -> String {
    let mut escaped = String::with_capacity(value.len());
    for c in value.chars() {
        if matches!(c, '\\' | '%' | '_') {
            escaped.push('\\');
        }
        escaped.push(c);
    }
    escaped
}

impl Movie {
    pub async fn list(pool: &PgPool, filter: &MovieFilter) -> Result<Vec<Movie>, sqlx::Error> {
        let mut qb: QueryBuilder<Postgres> = QueryBuilder::new(
            "SELECT m.id, m.title, m.description, m.duration, m.image FROM movie m WHERE TRUE",
        );

        if let Some(title) = &filter.title {
            qb.push(" AND m.title ILIKE ")
                .push_bind(format!("%{}%", escape_like(title)));
        }
        // EXISTS instead of JOIN keeps rows distinct
        if !filter.genres.is_empty() {
            qb.push(" AND EXISTS (SELECT 1 FROM movie_genres mg WHERE mg.movie_id = m.id AND mg.genre_id = ANY(")
                .push_bind(filter.genres.clone())
                .push("))");
        }
        if !filter.actors.is_empty() {
            qb.push(" AND EXISTS (SELECT 1 FROM movie_actors ma WHERE ma.movie_id = m.id AND ma.actor_id = ANY(")
                .push_bind(filter.actors.clone())
                .push("))");
        }
        qb.push(" ORDER BY m.id");

        qb.build_query_as::<Movie>().fetch_all(pool).await
    }

    pub async fn find(pool: &PgPool, id: i64) -> Result<Option<Movie>, sqlx::Error> {
        sqlx::query_as::<_, Movie>("SELECT id, title, description, duration, image FROM movie WHERE id = $1")
            .bind(id)
            .fetch_optional(pool)
            .await
    }

    pub async fn create(pool: &PgPool, new: &CreateMovie) -> Result<Movie, sqlx::Error> {
        let mut tx = pool.begin().await?;

        let movie = sqlx::query_as::<_, Movie>(
            "INSERT INTO movie (title, description, duration) VALUES ($1, $2, $3)
             RETURNING id, title, description, duration, image",
        )
        .bind(&new.title)
        .bind(&new.description)
        .bind(new.duration)
        .fetch_one(&mut *tx)
        .await?;

        if !new.genres.is_empty() {
            sqlx::query(
                "INSERT INTO movie_genres (movie_id, genre_id)
                 SELECT $1, UNNEST($2::BIGINT[]) ON CONFLICT DO NOTHING",
            )
            .bind(movie.id)
            .bind(&new.genres)
            .execute(&mut *tx)
            .await?;
        }
        if !new.actors.is_empty() {
            sqlx::query(
                "INSERT INTO movie_actors (movie_id, actor_id)
                 SELECT $1, UNNEST($2::BIGINT[]) ON CONFLICT DO NOTHING",
            )
            .bind(movie.id)
            .bind(&new.actors)
            .execute(&mut *tx)
            .await?;
        }

        tx.commit().await?;
        Ok(movie)
    }

    pub async fn set_image(pool: &PgPool, id: i64, image: &str) -> Result<Option<Movie>, sqlx::Error> {
        sqlx::query_as::<_, Movie>(
            "UPDATE movie SET image = $2 WHERE id = $1
             RETURNING id, title, description, duration, image",
        )
        .bind(id)
        .bind(image)
        .fetch_optional(pool)
        .await
    }

    /// Genres of each movie in `movie_ids`, ordered by genre id.
    pub async fn genres_for(pool: &PgPool, movie_ids: &[i64]) -> Result<HashMap<i64, Vec<Genre>>, sqlx::Error> {
        let rows = sqlx::query(
            "SELECT mg.movie_id, g.id, g.name
             FROM movie_genres mg
             JOIN genre g ON g.id = mg.genre_id
             WHERE mg.movie_id = ANY($1)
             ORDER BY g.id",
        )
        .bind(movie_ids)
        .fetch_all(pool)
        .await?;

        let mut map: HashMap<i64, Vec<Genre>> = HashMap::new();
        for r in rows {
            map.entry(r.get("movie_id")).or_default().push(Genre {
                id: r.get("id"),
                name: r.get("name"),
            });
        }
        Ok(map)
    }

    pub async fn actors_for(pool: &PgPool, movie_ids: &[i64]) -> Result<HashMap<i64, Vec<Actor>>, sqlx::Error> {
        let rows = sqlx::query(
            "SELECT ma.movie_id, a.id, a.first_name, a.last_name
             FROM movie_actors ma
             JOIN actor a ON a.id = ma.actor_id
             WHERE ma.movie_id = ANY($1)
             ORDER BY a.id",
        )
        .bind(movie_ids)
        .fetch_all(pool)
        .await?;

        let mut map: HashMap<i64, Vec<Actor>> = HashMap::new();
        for r in rows {
            map.entry(r.get("movie_id")).or_default().push(Actor {
                id: r.get("id"),
                first_name: r.get("first_name"),
                last_name: r.get("last_name"),
            });
        }
        Ok(map)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn like_wildcards_are_escaped() {
        assert_eq!(escape_like("100% movie_"), "100\\% movie\\_");
        assert_eq!(escape_like("plain"), "plain");
    }

    #[test]
    fn list_item_flattens_relations() {
        let movie = Movie {
            id: 1,
            title: "Interstellar".to_string(),
            description: "Space".to_string(),
            duration: 169,
            image: None,
        };
        let genres = vec![Genre { id: 1, name: "Drama".to_string() }];
        let actors = vec![Actor {
            id: 2,
            first_name: "Matthew".to_string(),
            last_name: "McConaughey".to_string(),
        }];

        let item = MovieListItem::new(movie, &genres, &actors, None);
        assert_eq!(item.genres, vec!["Drama"]);
        assert_eq!(item.actors, vec!["Matthew McConaughey"]);

        let json = serde_json::to_value(&item).unwrap();
        assert!(json.get("image").is_some());
    }

    #[test]
    fn create_payload_ignores_image_field() {
        let payload: CreateMovie = serde_json::from_value(serde_json::json!({
            "title": "Title",
            "description": "Description",
            "duration": 90,
            "image": "poster.jpg"
        }))
        .unwrap();

        assert!(payload.genres.is_empty());
        assert!(payload.validate().is_ok());
    }
}
