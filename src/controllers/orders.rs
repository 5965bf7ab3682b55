use axum::{
    extract::{Query, State},
    http::StatusCode,
    response::IntoResponse,
    routing::get,
    Json, Router,
};
use serde::Deserialize;
use std::collections::HashMap;
use std::sync::Arc;

use super::{movie_sessions::list_items, page_links, page_offset, Page, Validated};
use crate::{
    error::ApiResult,
    middleware::AuthUser,
    models::{
        movie_session::MovieSessionListItem,
        order::{CreateOrder, OrderResponse, TicketResponse},
        MovieSession, Order, Ticket,
    },
    services::booking::BookingService,
    AppState,
};

const PAGE_SIZE: i64 = 10;
const ORDERS_PATH: &str = "/api/cinema/orders/";

pub fn routes() -> Router<Arc<AppState>> {
    Router::new().route("/orders/", get(list_orders).post(create_order))
}

/// Session list items for every session referenced by `tickets`, keyed by id.
async fn sessions_for(
    state: &AppState,
    tickets: &[Ticket],
) -> Result<HashMap<i64, MovieSessionListItem>, sqlx::Error> {
    let mut ids: Vec<i64> = tickets.iter().map(|t| t.movie_session_id).collect();
    ids.sort_unstable();
    ids.dedup();

    let rows = MovieSession::list_by_ids(&state.db.pool, &ids).await?;
    Ok(list_items(state, rows).into_iter().map(|item| (item.id, item)).collect())
}

fn ticket_responses(
    tickets: Vec<Ticket>,
    sessions: &HashMap<i64, MovieSessionListItem>,
) -> Vec<TicketResponse> {
    tickets
        .into_iter()
        .filter_map(|t| {
            sessions.get(&t.movie_session_id).map(|session| TicketResponse {
                id: t.id,
                row: t.row,
                seat: t.seat,
                movie_session: session.clone(),
            })
        })
        .collect()
}

/* ---------- LIST ---------- */

#[derive(Debug, Deserialize)]
struct PageQuery {
    #[serde(default = "first_page")]
    page: i64,
}

fn first_page() -> i64 {
    1
}

// GET /api/cinema/orders/?page=2
async fn list_orders(
    State(state): State<Arc<AppState>>,
    user: AuthUser,
    Query(query): Query<PageQuery>,
) -> ApiResult<impl IntoResponse> {
    let count = Order::count_for_user(&state.db.pool, user.user_id).await?;
    let offset = page_offset(query.page, PAGE_SIZE, count)?;
    let orders = Order::page_for_user(&state.db.pool, user.user_id, PAGE_SIZE, offset).await?;

    let order_ids: Vec<i64> = orders.iter().map(|o| o.id).collect();
    let tickets = Ticket::for_orders(&state.db.pool, &order_ids).await?;
    let sessions = sessions_for(&state, &tickets).await?;

    let mut by_order: HashMap<i64, Vec<Ticket>> = HashMap::new();
    for t in tickets {
        by_order.entry(t.order_id).or_default().push(t);
    }

    let results = orders
        .into_iter()
        .map(|order| OrderResponse {
            id: order.id,
            created_at: order.created_at,
            tickets: ticket_responses(by_order.remove(&order.id).unwrap_or_default(), &sessions),
        })
        .collect();

    let (next, previous) = page_links(ORDERS_PATH, query.page, PAGE_SIZE, count);
    Ok(Json(Page { count, next, previous, results }))
}

/* ---------- CREATE ---------- */

// POST /api/cinema/orders/
async fn create_order(
    State(state): State<Arc<AppState>>,
    user: AuthUser,
    Validated(req): Validated<CreateOrder>,
) -> ApiResult<impl IntoResponse> {
    let placed = BookingService::new(state.clone())
        .place_order(user.user_id, &req.tickets)
        .await?;

    let sessions = sessions_for(&state, &placed.tickets).await?;
    let response = OrderResponse {
        id: placed.order.id,
        created_at: placed.order.created_at,
        tickets: ticket_responses(placed.tickets, &sessions),
    };

    Ok((StatusCode::CREATED, Json(response)))
}
