use axum::extract::State;
use axum::http::{HeaderMap, StatusCode};
use axum::response::IntoResponse;
use axum::routing::{get, post};
use axum::{Json, Router};
use chrono::Utc;
use serde_json::json;
use utility::holidays::MADRID_TZ;

use crate::common::{constant_time_eq, ApiError};
use crate::WebState;

pub(crate) fn routes(state: WebState) -> Router {
    Router::new()
        .route("/readyz", get(readiness))
        .route("/status", get(status))
        .route("/admin/reload", post(reload))
        .with_state(state)
}

/// 503 until the first schedule load completes; the process must not take
/// departures or planner traffic before that.
async fn readiness(State(state): State<WebState>) -> impl IntoResponse {
    if state.store.is_loaded() {
        (StatusCode::OK, Json(json!({ "status": "ready" })))
    } else {
        (
            StatusCode::SERVICE_UNAVAILABLE,
            Json(json!({ "status": "loading" })),
        )
    }
}

async fn status(State(state): State<WebState>) -> impl IntoResponse {
    Json(json!({
        "schedule_loaded": state.store.is_loaded(),
        "scheduler": state.scheduler.status(),
    }))
}

/// Rebuild the schedule snapshot asynchronously. Requires the admin token;
/// the comparison is constant-time.
async fn reload(
    State(state): State<WebState>,
    headers: HeaderMap,
) -> Result<impl IntoResponse, ApiError> {
    let Some(expected) = state.admin_token.as_deref() else {
        return Err(ApiError::Unauthorized);
    };
    let provided = headers
        .get("x-admin-token")
        .and_then(|value| value.to_str().ok())
        .unwrap_or("");
    if !constant_time_eq(provided, expected) {
        return Err(ApiError::Unauthorized);
    }

    let pool = state.pool.clone();
    let store = state.store.clone();
    tokio::spawn(async move {
        let today = Utc::now().with_timezone(&MADRID_TZ).date_naive();
        match store.load(&pool, today).await {
            Ok(()) => log::info!("schedule reload complete"),
            Err(why) => log::error!("schedule reload failed: {why}"),
        }
    });

    Ok((StatusCode::ACCEPTED, Json(json!({ "status": "reloading" }))))
}
