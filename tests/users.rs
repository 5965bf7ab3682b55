//! Accounts, tokens and staff checks against a real database.

mod common;

use axum::{
    body::Body,
    http::{header, Method, Request, StatusCode},
};
use cinema_service::app;
use common::{get, post, request, send, state_with_pool, user_with_token, PASSWORD};
use serde_json::json;
use sqlx::PgPool;

#[sqlx::test(migrations = "./src/migrations")]
async fn email_can_only_be_registered_once(pool: PgPool) {
    let state = state_with_pool(pool);
    let register = |email: &str| {
        request(
            Method::POST,
            "/api/user/register/",
            None,
            Some(json!({ "email": email, "password": "12345", "first_name": "Ann" })),
        )
    };

    let (status, body) = send(app(state.clone()), register("ann@cinema.test")).await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(body["email"], "ann@cinema.test");
    assert_eq!(body["is_staff"], false);
    assert!(body.get("password").is_none());

    let (status, body) = send(app(state), register("Ann@Cinema.test")).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(body["errors"]["email"].is_array());
}

#[sqlx::test(migrations = "./src/migrations")]
async fn login_returns_working_tokens(pool: PgPool) {
    let state = state_with_pool(pool);
    user_with_token(&state, "viewer@cinema.test", false).await;

    let (status, _) = send(
        app(state.clone()),
        request(
            Method::POST,
            "/api/user/token/",
            None,
            Some(json!({ "email": "viewer@cinema.test", "password": "wrong" })),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);

    let (status, tokens) = send(
        app(state.clone()),
        request(
            Method::POST,
            "/api/user/token/",
            None,
            Some(json!({ "email": "viewer@cinema.test", "password": PASSWORD })),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert!(tokens["refresh"].is_string());

    let access = tokens["access"].as_str().unwrap();
    let (status, me) = get(&state, "/api/user/me/", access).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(me["email"], "viewer@cinema.test");
}

#[sqlx::test(migrations = "./src/migrations")]
async fn profile_update_rehashes_password(pool: PgPool) {
    let state = state_with_pool(pool);
    let (_, token) = user_with_token(&state, "viewer@cinema.test", false).await;

    let (status, me) = send(
        app(state.clone()),
        request(
            Method::PATCH,
            "/api/user/me/",
            Some(&token),
            Some(json!({ "last_name": "Smith", "password": "new-secret" })),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(me["last_name"], "Smith");

    let (status, _) = send(
        app(state),
        request(
            Method::POST,
            "/api/user/token/",
            None,
            Some(json!({ "email": "viewer@cinema.test", "password": "new-secret" })),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
}

#[sqlx::test(migrations = "./src/migrations")]
async fn staff_rights_follow_the_stored_account(pool: PgPool) {
    let state = state_with_pool(pool.clone());
    let (staff, token) = user_with_token(&state, "admin@cinema.test", true).await;

    let (status, _) = post(&state, "/api/cinema/genres/", &token, json!({ "name": "Drama" })).await;
    assert_eq!(status, StatusCode::CREATED);

    sqlx::query("UPDATE users SET is_staff = FALSE WHERE id = $1")
        .bind(staff.id)
        .execute(&pool)
        .await
        .unwrap();
    let (status, _) = post(&state, "/api/cinema/genres/", &token, json!({ "name": "Comedy" })).await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    sqlx::query("UPDATE users SET is_staff = TRUE, is_active = FALSE WHERE id = $1")
        .bind(staff.id)
        .execute(&pool)
        .await
        .unwrap();
    let (status, _) = post(&state, "/api/cinema/genres/", &token, json!({ "name": "Comedy" })).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
}

#[sqlx::test(migrations = "./src/migrations")]
async fn malformed_bodies_are_bad_requests(pool: PgPool) {
    let state = state_with_pool(pool);
    let (_, staff) = user_with_token(&state, "admin@cinema.test", true).await;

    let req = Request::builder()
        .method(Method::POST)
        .uri("/api/cinema/genres/")
        .header(header::AUTHORIZATION, format!("Bearer {}", staff))
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from("{\"name\":"))
        .unwrap();
    let (status, body) = send(app(state.clone()), req).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(body["error"].is_string());

    let (status, body) = post(
        &state,
        "/api/cinema/cinema_halls/",
        &staff,
        json!({ "name": "Tiny", "rows": 0, "seats_in_row": 5 }),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(body["errors"]["rows"].is_array());
}
