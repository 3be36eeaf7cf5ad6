use axum::response::IntoResponse;
use axum::routing::get;
use axum::{Json, Router};
use serde_json::json;

use crate::WebState;

mod admin;
mod networks;
mod planner;
mod routes;
mod stops;
mod trips;

pub fn routes(state: WebState) -> Router {
    Router::new()
        .route("/ping", get(ping))
        .nest("/v1", v1_routes(state))
}

fn v1_routes(state: WebState) -> Router {
    Router::new()
        .merge(admin::routes(state.clone()))
        .merge(networks::routes(state.clone()))
        .merge(planner::routes(state.clone()))
        .merge(routes::routes(state.clone()))
        .merge(stops::routes(state.clone()))
        .merge(trips::routes(state))
}

async fn ping() -> impl IntoResponse {
    Json(json!({ "message": "pong!" }))
}
