use serde::{Deserialize, Serialize};
use sqlx::{FromRow, PgPool};
use validator::Validate;

#[derive(Debug, Clone, FromRow)]
pub struct Actor {
    pub id: i64,
    pub first_name: String,
    pub last_name: String,
}

impl Actor {
    pub fn full_name(&self) -> String {
        format!("{} {}", self.first_name, self.last_name)
    }
}

#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct ActorResponse {
    pub id: i64,
    pub first_name: String,
    pub last_name: String,
    pub full_name: String,
}

impl From<Actor> for ActorResponse {
    fn from(actor: Actor) -> Self {
        let full_name = actor.full_name();
        ActorResponse {
            id: actor.id,
            first_name: actor.first_name,
            last_name: actor.last_name,
            full_name,
        }
    }
}

#[derive(Debug, Deserialize, Validate)]
pub struct CreateActor {
    #[validate(length(min = 1, max = 255, message = "This field may not be blank."))]
    pub first_name: String,
    #[validate(length(min = 1, max = 255, message = "This field may not be blank."))]
    pub last_name: String,
}

impl Actor {
    pub async fn list(pool: &PgPool) -> Result<Vec<Actor>, sqlx::Error> {
        sqlx::query_as::<_, Actor>("SELECT id, first_name, last_name FROM actor ORDER BY id")
            .fetch_all(pool)
            .await
    }

    pub async fn create(pool: &PgPool, new: &CreateActor) -> Result<Actor, sqlx::Error> {
        sqlx::query_as::<_, Actor>(
            "INSERT INTO actor (first_name, last_name) VALUES ($1, $2)
             RETURNING id, first_name, last_name",
        )
        .bind(&new.first_name)
        .bind(&new.last_name)
        .fetch_one(pool)
        .await
    }

    pub async fn existing_ids(pool: &PgPool, ids: &[i64]) -> Result<Vec<i64>, sqlx::Error> {
        sqlx::query_scalar::<_, i64>("SELECT id FROM actor WHERE id = ANY($1)")
            .bind(ids)
            .fetch_all(pool)
            .await
    }
}
