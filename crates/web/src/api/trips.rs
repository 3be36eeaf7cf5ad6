use axum::extract::{Path, State};
use axum::routing::get;
use axum::{Json, Router};
use database::queries;
use model::route::format_seconds;
use serde::Serialize;
use utility::text::normalize_headsign;

use crate::common::{ApiError, RouteResult};
use crate::WebState;

pub(crate) fn routes(state: WebState) -> Router {
    Router::new()
        .route("/trips/:id", get(get_trip))
        .with_state(state)
}

#[serde_with::skip_serializing_none]
#[derive(Serialize)]
struct TripStopResponse {
    stop_id: String,
    stop_name: String,
    arrival_time: String,
    departure_time: String,
    stop_sequence: i32,
    stop_lat: f64,
    stop_lon: f64,
}

#[serde_with::skip_serializing_none]
#[derive(Serialize)]
struct TripDetailResponse {
    id: String,
    route_id: String,
    route_short_name: String,
    route_long_name: String,
    route_color: Option<String>,
    headsign: Option<String>,
    direction_id: Option<i16>,
    stops: Vec<TripStopResponse>,
}

async fn get_trip(
    State(state): State<WebState>,
    Path(trip_id): Path<String>,
) -> RouteResult<TripDetailResponse> {
    let trip = match queries::trip::get(&state.pool, &trip_id).await {
        Ok(trip) => trip,
        Err(database::DatabaseError::NotFound) => {
            return Err(ApiError::NotFound(format!("trip {trip_id} not found")))
        }
        Err(why) => return Err(why.into()),
    };

    let route = queries::route::get(&state.pool, &trip.route_id).await.ok();
    let calls = queries::trip::calls(&state.pool, &trip_id).await?;

    let stops: Vec<TripStopResponse> = calls
        .into_iter()
        .map(|call| TripStopResponse {
            stop_id: call.stop_id,
            stop_name: call.stop_name,
            arrival_time: format_seconds(call.arrival_seconds.max(0) as u32),
            departure_time: format_seconds(call.departure_seconds.max(0) as u32),
            stop_sequence: call.stop_sequence,
            stop_lat: call.stop_lat,
            stop_lon: call.stop_lon,
        })
        .collect();

    let headsign = trip
        .headsign
        .or_else(|| stops.last().map(|stop| stop.stop_name.clone()))
        .map(|text| normalize_headsign(&text));

    Ok(Json(TripDetailResponse {
        id: trip.id,
        route_id: trip.route_id,
        route_short_name: route
            .as_ref()
            .map(|route| route.short_name.clone())
            .unwrap_or_default(),
        route_long_name: route
            .as_ref()
            .and_then(|route| route.long_name.clone())
            .unwrap_or_default(),
        route_color: route.and_then(|route| route.color),
        headsign,
        direction_id: trip.direction_id,
        stops,
    }))
}
