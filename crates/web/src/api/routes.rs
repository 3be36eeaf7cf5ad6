use std::collections::HashMap;

use axum::extract::{Path, Query, State};
use axum::routing::get;
use axum::{Json, Router};
use database::queries;
use database::PgPool;
use model::network::{hidden_base_routes, VariantPolicy};
use model::route::{format_seconds, Route, RouteFrequency};
use model::shape::ShapePoint;
use model::stop::Stop;
use serde::{Deserialize, Serialize};
use utility::geo;

use crate::common::{ApiError, RouteResult};
use crate::WebState;

pub(crate) fn routes(state: WebState) -> Router {
    Router::new()
        .route("/routes", get(list_routes))
        .route("/routes/:id", get(get_route))
        .route("/routes/:id/stops", get(get_route_stops))
        .route("/routes/:id/frequencies", get(get_route_frequencies))
        .route("/routes/:id/operating-hours", get(get_operating_hours))
        .route("/routes/:id/shape", get(get_route_shape))
        .with_state(state)
}

#[derive(Deserialize)]
struct RoutesQuery {
    agency_id: Option<String>,
    network_id: Option<String>,
    search: Option<String>,
}

/// Routes listing with per-network variant policies applied: phantom
/// Cercanías bases (C4 when C4a/C4b exist) disappear, independent Metro
/// pairs like L7/L7B stay.
async fn list_routes(
    State(state): State<WebState>,
    Query(params): Query<RoutesQuery>,
) -> RouteResult<Vec<Route>> {
    let routes = queries::route::list(
        &state.pool,
        params.agency_id.as_deref(),
        params.network_id.as_deref(),
        params.search.as_deref(),
    )
    .await?;

    let policies: HashMap<String, VariantPolicy> =
        queries::network::all_networks(&state.pool)
            .await?
            .into_iter()
            .map(|network| (network.code, network.variant_policy))
            .collect();

    let mut names_by_network: HashMap<String, Vec<String>> = HashMap::new();
    for route in &routes {
        if let Some(network_id) = route.network_id.as_deref() {
            names_by_network
                .entry(network_id.to_owned())
                .or_default()
                .push(route.short_name.clone());
        }
    }

    let mut hidden_by_network: HashMap<String, Vec<String>> = HashMap::new();
    for (network_id, names) in &names_by_network {
        let policy = policies.get(network_id).copied().unwrap_or_default();
        let hidden =
            hidden_base_routes(policy, names.iter().map(String::as_str));
        hidden_by_network.insert(network_id.clone(), hidden);
    }

    let filtered = routes
        .into_iter()
        .filter(|route| {
            let Some(network_id) = route.network_id.as_deref() else {
                return true;
            };
            hidden_by_network
                .get(network_id)
                .map_or(true, |hidden| !hidden.contains(&route.short_name))
        })
        .collect();
    Ok(Json(filtered))
}

async fn get_route(
    State(state): State<WebState>,
    Path(route_id): Path<String>,
) -> RouteResult<Route> {
    match queries::route::get(&state.pool, &route_id).await {
        Ok(route) => Ok(Json(route)),
        Err(database::DatabaseError::NotFound) => {
            Err(ApiError::NotFound(format!("route {route_id} not found")))
        }
        Err(why) => Err(why.into()),
    }
}

#[serde_with::skip_serializing_none]
#[derive(Serialize)]
struct RouteStopResponse {
    #[serde(flatten)]
    stop: Stop,
    stop_sequence: i32,
}

/// Stops along a route in order, grouped by parent station so a station
/// with several platforms appears once.
async fn get_route_stops(
    State(state): State<WebState>,
    Path(route_id): Path<String>,
) -> RouteResult<Vec<RouteStopResponse>> {
    if let Err(database::DatabaseError::NotFound) =
        queries::route::get(&state.pool, &route_id).await
    {
        return Err(ApiError::NotFound(format!("route {route_id} not found")));
    }

    let rows = queries::route::stops_of_route(&state.pool, &route_id).await?;

    let mut seen: Vec<(String, Stop, i32)> = Vec::new();
    let mut parent_cache: HashMap<String, Option<Stop>> = HashMap::new();

    for (stop, sequence) in rows {
        let (key, resolved) = match &stop.parent_station_id {
            Some(parent_id) => {
                let parent = match parent_cache.get(parent_id) {
                    Some(cached) => cached.clone(),
                    None => {
                        let fetched =
                            queries::stop::get(&state.pool, parent_id).await.ok();
                        parent_cache.insert(parent_id.clone(), fetched.clone());
                        fetched
                    }
                };
                match parent {
                    Some(parent) => (parent_id.clone(), parent),
                    None => (stop.id.clone(), stop),
                }
            }
            None => (stop.id.clone(), stop),
        };
        if !seen.iter().any(|(existing, _, _)| existing == &key) {
            seen.push((key, resolved, sequence));
        }
    }

    seen.sort_by_key(|(_, _, sequence)| *sequence);
    Ok(Json(
        seen.into_iter()
            .map(|(_, stop, stop_sequence)| RouteStopResponse { stop, stop_sequence })
            .collect(),
    ))
}

#[derive(Serialize)]
struct RouteFrequencyResponse {
    route_id: String,
    day_type: String,
    start_time: String,
    end_time: String,
    headway_secs: u32,
    headway_minutes: f64,
}

async fn get_route_frequencies(
    State(state): State<WebState>,
    Path(route_id): Path<String>,
) -> RouteResult<Vec<RouteFrequencyResponse>> {
    if let Err(database::DatabaseError::NotFound) =
        queries::route::get(&state.pool, &route_id).await
    {
        return Err(ApiError::NotFound(format!("route {route_id} not found")));
    }

    let frequencies = queries::route::frequencies(&state.pool, &route_id).await?;
    Ok(Json(
        frequencies
            .into_iter()
            .map(|frequency| RouteFrequencyResponse {
                route_id: frequency.route_id.clone(),
                day_type: frequency.day_type.to_string(),
                start_time: format_seconds(frequency.start_seconds),
                end_time: format_seconds(frequency.end_seconds),
                headway_secs: frequency.headway_secs,
                headway_minutes: (frequency.headway_secs as f64 / 60.0 * 10.0).round() / 10.0,
            })
            .collect(),
    ))
}

#[serde_with::skip_serializing_none]
#[derive(Serialize, Clone)]
struct DayOperatingHours {
    first_departure: Option<String>,
    last_departure: Option<String>,
    total_trips: i64,
}

#[serde_with::skip_serializing_none]
#[derive(Serialize)]
struct RouteOperatingHoursResponse {
    route_id: String,
    route_short_name: String,
    weekday: Option<DayOperatingHours>,
    friday: Option<DayOperatingHours>,
    saturday: Option<DayOperatingHours>,
    sunday: Option<DayOperatingHours>,
    is_suspended: bool,
    suspension_message: Option<String>,
}

/// Alert phrasings that mean the trains themselves are suspended…
const SUSPENSION_KEYWORDS: [&str; 7] = [
    "suspende el servicio de trenes",
    "servicio de trenes suspendido",
    "se suspende el servicio",
    "sin servicio de trenes",
    "no circula",
    "circulación suspendida",
    "línea cerrada",
];

/// …as opposed to broken elevators and escalators, which are not.
const FACILITY_KEYWORDS: [&str; 5] =
    ["ascensor", "escalera", "aseo", "igogailu", "eskailera"];

async fn suspension_for_route(
    pool: &PgPool,
    route: &Route,
) -> Result<Option<String>, ApiError> {
    let alerts = queries::realtime::active_alerts(pool).await?;
    if alerts.is_empty() {
        return Ok(None);
    }
    let alert_ids: Vec<String> = alerts.iter().map(|alert| alert.alert_id.clone()).collect();
    let entities = queries::realtime::entities_for_alerts(pool, &alert_ids).await?;

    for alert in &alerts {
        let affects_route = entities.iter().any(|entity| {
            entity.alert_id == alert.alert_id
                && (entity.route_id.as_deref() == Some(route.id.as_str())
                    || entity.route_short_name.as_deref() == Some(route.short_name.as_str()))
        });
        if !affects_route {
            continue;
        }

        let text = format!(
            "{} {}",
            alert.description_text.as_deref().unwrap_or(""),
            alert.header_text.as_deref().unwrap_or("")
        )
        .to_lowercase();

        if FACILITY_KEYWORDS.iter().any(|keyword| text.contains(keyword)) {
            continue;
        }
        if SUSPENSION_KEYWORDS.iter().any(|keyword| text.contains(keyword)) {
            return Ok(alert
                .description_text
                .clone()
                .or_else(|| alert.header_text.clone()));
        }
    }
    Ok(None)
}

fn frequency_day_hours(frequencies: &[RouteFrequency]) -> Option<DayOperatingHours> {
    if frequencies.is_empty() {
        return None;
    }
    // Windows starting before 05:00 belong to the previous service day.
    let morning_cutoff = 5 * 3600;
    let first = frequencies
        .iter()
        .filter(|frequency| frequency.start_seconds >= morning_cutoff)
        .map(|frequency| frequency.start_seconds)
        .min()
        .or_else(|| frequencies.iter().map(|frequency| frequency.start_seconds).min());
    let last = frequencies
        .iter()
        .map(RouteFrequency::effective_end_seconds)
        .max();
    Some(DayOperatingHours {
        first_departure: first.map(format_seconds),
        last_departure: last.map(format_seconds),
        total_trips: 0,
    })
}

async fn get_operating_hours(
    State(state): State<WebState>,
    Path(route_id): Path<String>,
) -> RouteResult<RouteOperatingHoursResponse> {
    let route = match queries::route::get(&state.pool, &route_id).await {
        Ok(route) => route,
        Err(database::DatabaseError::NotFound) => {
            return Err(ApiError::NotFound(format!("route {route_id} not found")))
        }
        Err(why) => return Err(why.into()),
    };

    let suspension_message = suspension_for_route(&state.pool, &route).await?;
    let is_suspended = suspension_message.is_some();

    let trips = queries::trip::trips_with_calendar(&state.pool, &route_id).await?;

    let mut response = RouteOperatingHoursResponse {
        route_id: route_id.clone(),
        route_short_name: route.short_name.clone(),
        weekday: None,
        friday: None,
        saturday: None,
        sunday: None,
        is_suspended,
        suspension_message,
    };

    if trips.is_empty() {
        // Frequency-operated route: derive hours from its headway windows.
        let frequencies = queries::route::frequencies(&state.pool, &route_id).await?;
        if !is_suspended {
            let by_day = |day: &str| {
                frequencies
                    .iter()
                    .filter(|frequency| frequency.day_type.as_str() == day)
                    .cloned()
                    .collect::<Vec<_>>()
            };
            response.weekday = frequency_day_hours(&by_day("weekday"));
            response.friday = frequency_day_hours(&by_day("friday"))
                .or_else(|| frequency_day_hours(&by_day("weekday")));
            response.saturday = frequency_day_hours(&by_day("saturday"));
            response.sunday = frequency_day_hours(&by_day("sunday"));
        }
        return Ok(Json(response));
    }

    if is_suspended {
        return Ok(Json(response));
    }

    let mut weekday_trips = Vec::new();
    let mut saturday_trips = Vec::new();
    let mut sunday_trips = Vec::new();
    for trip in trips {
        if trip.saturday && !trip.sunday {
            saturday_trips.push(trip.trip_id);
        } else if trip.sunday {
            sunday_trips.push(trip.trip_id);
        } else if trip.monday || trip.tuesday || trip.wednesday {
            weekday_trips.push(trip.trip_id);
        }
    }

    response.weekday = schedule_day_hours(&state.pool, weekday_trips).await?;
    // Cercanías runs the same timetable on Fridays.
    response.friday = response.weekday.clone();
    response.saturday = schedule_day_hours(&state.pool, saturday_trips).await?;
    response.sunday = schedule_day_hours(&state.pool, sunday_trips).await?;

    Ok(Json(response))
}

async fn schedule_day_hours(
    pool: &PgPool,
    trip_ids: Vec<String>,
) -> Result<Option<DayOperatingHours>, ApiError> {
    if trip_ids.is_empty() {
        return Ok(None);
    }
    let bounds = queries::trip::departure_bounds(pool, &trip_ids).await?;
    Ok(bounds.first_departure.map(|first| DayOperatingHours {
        first_departure: Some(format_seconds(first.max(0) as u32)),
        last_departure: bounds
            .last_departure
            .map(|last| format_seconds(last.max(0) as u32)),
        total_trips: bounds.trip_count,
    }))
}

#[derive(Serialize)]
struct ShapePointResponse {
    lat: f64,
    lon: f64,
    sequence: i32,
}

#[derive(Serialize)]
struct RouteShapeResponse {
    route_id: String,
    route_short_name: String,
    shape: Vec<ShapePointResponse>,
}

/// Madrid variant routes export only the branch geometry; the trunk lives
/// under the base route's shape. Stitch them at the closest endpoints.
fn combine_variant_shapes(
    base: Vec<ShapePoint>,
    variant: Vec<ShapePoint>,
) -> Vec<(f64, f64)> {
    if variant.is_empty() {
        return base.into_iter().map(|point| (point.lat, point.lon)).collect();
    }

    let base_first = (base[0].lat, base[0].lon);
    let base_last = (base[base.len() - 1].lat, base[base.len() - 1].lon);
    let variant_first = (variant[0].lat, variant[0].lon);
    let variant_last = (variant[variant.len() - 1].lat, variant[variant.len() - 1].lon);

    let distances = [
        geo::haversine_m(base_last.0, base_last.1, variant_first.0, variant_first.1),
        geo::haversine_m(base_last.0, base_last.1, variant_last.0, variant_last.1),
        geo::haversine_m(base_first.0, base_first.1, variant_first.0, variant_first.1),
        geo::haversine_m(base_first.0, base_first.1, variant_last.0, variant_last.1),
    ];
    let closest = distances
        .iter()
        .enumerate()
        .min_by(|a, b| a.1.total_cmp(b.1))
        .map(|(index, _)| index)
        .unwrap_or(0);

    let base_points: Vec<(f64, f64)> =
        base.iter().map(|point| (point.lat, point.lon)).collect();
    let variant_points: Vec<(f64, f64)> =
        variant.iter().map(|point| (point.lat, point.lon)).collect();

    match closest {
        // base end → variant start
        0 => base_points
            .iter()
            .chain(variant_points.iter().skip(1))
            .copied()
            .collect(),
        // base end → variant end (variant reversed)
        1 => base_points
            .iter()
            .chain(variant_points.iter().rev().skip(1))
            .copied()
            .collect(),
        // variant start → base start (variant reversed, then base)
        2 => variant_points
            .iter()
            .rev()
            .skip(1)
            .chain(base_points.iter())
            .copied()
            .collect(),
        // variant end → base start
        _ => variant_points
            .iter()
            .take(variant_points.len() - 1)
            .chain(base_points.iter())
            .copied()
            .collect(),
    }
}

fn variant_base(short_name: &str) -> Option<&str> {
    match short_name {
        "C4a" | "C4b" => Some("C4"),
        "C8a" | "C8b" => Some("C8"),
        _ => None,
    }
}

async fn get_route_shape(
    State(state): State<WebState>,
    Path(route_id): Path<String>,
) -> RouteResult<RouteShapeResponse> {
    let route = match queries::route::get(&state.pool, &route_id).await {
        Ok(route) => route,
        Err(database::DatabaseError::NotFound) => {
            return Err(ApiError::NotFound(format!("route {route_id} not found")))
        }
        Err(why) => return Err(why.into()),
    };

    let shape_id = queries::trip::shape_id_for_route(&state.pool, &route_id).await?;
    let Some(shape_id) = shape_id else {
        return Ok(Json(RouteShapeResponse {
            route_id,
            route_short_name: route.short_name,
            shape: Vec::new(),
        }));
    };

    let variant_points = queries::trip::shape_points(&state.pool, &shape_id).await?;
    let coordinates = match variant_base(&route.short_name) {
        Some(base_name) => {
            let base_shape_id = format!("10_{base_name}");
            let base_points =
                queries::trip::shape_points(&state.pool, &base_shape_id).await?;
            if base_points.is_empty() {
                variant_points
                    .into_iter()
                    .map(|point| (point.lat, point.lon))
                    .collect()
            } else {
                combine_variant_shapes(base_points, variant_points)
            }
        }
        None => variant_points
            .into_iter()
            .map(|point| (point.lat, point.lon))
            .collect(),
    };

    Ok(Json(RouteShapeResponse {
        route_id,
        route_short_name: route.short_name,
        shape: coordinates
            .into_iter()
            .enumerate()
            .map(|(index, (lat, lon))| ShapePointResponse {
                lat,
                lon,
                sequence: index as i32,
            })
            .collect(),
    }))
}
