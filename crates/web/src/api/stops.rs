use axum::extract::{Path, Query, State};
use axum::response::{IntoResponse, Response};
use axum::routing::get;
use axum::{Json, Router};
use chrono::{DateTime, Utc};
use database::queries;
use departures::{Departure, DepartureQuery};
use model::occupancy::OccupancyStatus;
use model::stop::{Stop, StopPlatform};
use serde::{Deserialize, Serialize};
use utility::holidays::MADRID_TZ;

use crate::common::{ApiError, RouteResult};
use crate::WebState;

pub(crate) fn routes(state: WebState) -> Router {
    Router::new()
        .route("/stops", get(list_stops))
        .route("/stops/nearby", get(nearby_stops))
        .route("/stops/:id", get(get_stop))
        .route("/stops/:id/departures", get(stop_departures))
        .route("/stops/:id/platforms", get(stop_platforms))
        .route("/stops/:id/correspondences", get(stop_correspondences))
        .with_state(state)
}

fn network_prefix(network_id: &str) -> Option<&'static str> {
    match network_id {
        "TMB_METRO" => Some("TMB_METRO_"),
        "FGC" => Some("FGC_"),
        "EUSKOTREN" => Some("EUSKOTREN_"),
        "METRO_BILBAO" => Some("METRO_BILBAO_"),
        "11T" => Some("METRO_"),
        "12T" => Some("ML_"),
        // Renfe núcleos share one namespace
        id if id.ends_with('T') => Some("RENFE_"),
        _ => None,
    }
}

#[derive(Deserialize)]
struct ListQuery {
    search: Option<String>,
    network_id: Option<String>,
    limit: Option<i64>,
}

async fn list_stops(
    State(state): State<WebState>,
    Query(params): Query<ListQuery>,
) -> RouteResult<Vec<Stop>> {
    let prefix = params.network_id.as_deref().and_then(network_prefix);
    let limit = params.limit.unwrap_or(600).clamp(1, 1000);
    let stops =
        queries::stop::search(&state.pool, params.search.as_deref(), prefix, limit).await?;
    Ok(Json(stops))
}

#[derive(Deserialize)]
struct NearbyQuery {
    lat: f64,
    lon: f64,
    radius_km: Option<f64>,
    transport_type: Option<String>,
    limit: Option<usize>,
}

#[serde_with::skip_serializing_none]
#[derive(Serialize)]
struct NearbyStop {
    #[serde(flatten)]
    stop: Stop,
    distance_m: f64,
}

/// Prefixes of stops with realtime coverage; the default nearby filter.
const REALTIME_PREFIXES: [&str; 9] = [
    "TMB_METRO_P.",
    "TMB_METRO_1.",
    "RENFE_",
    "FGC_",
    "METRO_",
    "ML_",
    "METRO_BILBAO_",
    "EUSKOTREN_",
    "TRAM_",
];

fn transport_filter(transport_type: Option<&str>, stop_id: &str) -> bool {
    match transport_type {
        Some("all") => true,
        Some("metro") => {
            ["TMB_METRO_P.", "TMB_METRO_1.", "METRO_", "ML_", "METRO_BILBAO_", "FGC_"]
                .iter()
                .any(|prefix| stop_id.starts_with(prefix))
        }
        Some("cercanias") => stop_id.starts_with("RENFE_"),
        Some("fgc") => stop_id.starts_with("FGC_"),
        Some("tram") => stop_id.starts_with("TRAM_"),
        _ => REALTIME_PREFIXES
            .iter()
            .any(|prefix| stop_id.starts_with(prefix)),
    }
}

async fn nearby_stops(
    State(state): State<WebState>,
    Query(params): Query<NearbyQuery>,
) -> RouteResult<Vec<NearbyStop>> {
    if !(-90.0..=90.0).contains(&params.lat) || !(-180.0..=180.0).contains(&params.lon) {
        return Err(ApiError::BadRequest("coordinates out of range".to_owned()));
    }
    let radius_m = params.radius_km.unwrap_or(50.0).clamp(1.0, 200.0) * 1000.0;
    let limit = params.limit.unwrap_or(100).clamp(1, 1000);

    let stops = queries::stop::nearby(&state.pool, params.lat, params.lon, radius_m, limit)
        .await?
        .into_iter()
        .filter(|(stop, _)| transport_filter(params.transport_type.as_deref(), &stop.id))
        .map(|(stop, distance_m)| NearbyStop { stop, distance_m })
        .collect();
    Ok(Json(stops))
}

async fn get_stop(
    State(state): State<WebState>,
    Path(stop_id): Path<String>,
) -> RouteResult<Stop> {
    match queries::stop::get(&state.pool, &stop_id).await {
        Ok(stop) => Ok(Json(stop)),
        Err(database::DatabaseError::NotFound) => {
            Err(ApiError::NotFound(format!("stop {stop_id} not found")))
        }
        Err(why) => Err(why.into()),
    }
}

#[derive(Deserialize)]
struct DeparturesParams {
    route_id: Option<String>,
    limit: Option<usize>,
    #[serde(default)]
    compact: bool,
}

#[serde_with::skip_serializing_none]
#[derive(Serialize)]
struct CompactDeparture {
    line: String,
    color: Option<String>,
    dest: Option<String>,
    mins: i64,
    plat: Option<String>,
    delay: bool,
    occ: Option<OccupancyStatus>,
    exp: bool,
    exp_color: Option<String>,
}

#[derive(Serialize)]
struct CompactDeparturesWrapper {
    stop_id: String,
    stop_name: String,
    departures: Vec<CompactDeparture>,
    updated_at: DateTime<Utc>,
}

fn compact(departure: &Departure) -> CompactDeparture {
    CompactDeparture {
        line: departure.route_short_name.clone(),
        color: departure.route_color.clone(),
        dest: departure
            .headsign
            .as_deref()
            .map(|headsign| headsign.chars().take(20).collect()),
        mins: departure.sort_minutes(),
        plat: departure.platform.clone(),
        delay: departure.is_delayed,
        occ: departure.occupancy_status,
        exp: departure.is_express,
        exp_color: departure.express_color.clone(),
    }
}

async fn stop_departures(
    State(state): State<WebState>,
    Path(stop_id): Path<String>,
    Query(params): Query<DeparturesParams>,
) -> Result<Response, ApiError> {
    let query = DepartureQuery {
        stop_id: stop_id.clone(),
        route_id: params.route_id,
        limit: params.limit.unwrap_or(20),
        now: Utc::now().with_timezone(&MADRID_TZ),
    };
    let departures = departures::departures(&state.pool, &state.store, &query).await?;

    if params.compact {
        let stop = queries::stop::get(&state.pool, &stop_id).await?;
        let wrapper = CompactDeparturesWrapper {
            stop_id,
            stop_name: stop.name,
            departures: departures.iter().map(compact).collect(),
            updated_at: Utc::now(),
        };
        return Ok(Json(wrapper).into_response());
    }

    Ok(Json(departures).into_response())
}

#[derive(Serialize)]
struct StopPlatformsResponse {
    stop_id: String,
    stop_name: String,
    platforms: Vec<StopPlatform>,
}

async fn stop_platforms(
    State(state): State<WebState>,
    Path(stop_id): Path<String>,
) -> RouteResult<StopPlatformsResponse> {
    let stop = match queries::stop::get(&state.pool, &stop_id).await {
        Ok(stop) => stop,
        Err(database::DatabaseError::NotFound) => {
            return Err(ApiError::NotFound(format!("stop {stop_id} not found")))
        }
        Err(why) => return Err(why.into()),
    };

    let mut platforms = queries::stop::platforms(&state.pool, &stop_id).await?;

    // Platforms imported without a color inherit their first line's color.
    for platform in &mut platforms {
        if platform.color.is_some() {
            continue;
        }
        let Some(first_line) = platform
            .lines
            .as_deref()
            .and_then(|lines| lines.split(',').next())
            .map(str::trim)
        else {
            continue;
        };
        let routes =
            queries::route::by_short_name(&state.pool, first_line, None).await?;
        platform.color = routes.into_iter().find_map(|route| route.color);
    }

    Ok(Json(StopPlatformsResponse {
        stop_id,
        stop_name: stop.name,
        platforms,
    }))
}

#[serde_with::skip_serializing_none]
#[derive(Serialize)]
struct CorrespondenceResponse {
    to_stop_id: String,
    to_stop_name: String,
    to_lines: Option<String>,
    to_transport_types: Vec<String>,
    distance_m: Option<f64>,
    walk_time_s: Option<i32>,
    source: Option<String>,
}

#[derive(Serialize)]
struct StopCorrespondencesResponse {
    stop_id: String,
    stop_name: String,
    correspondences: Vec<CorrespondenceResponse>,
}

async fn stop_correspondences(
    State(state): State<WebState>,
    Path(stop_id): Path<String>,
) -> RouteResult<StopCorrespondencesResponse> {
    let stop = match queries::stop::get(&state.pool, &stop_id).await {
        Ok(stop) => stop,
        Err(database::DatabaseError::NotFound) => {
            return Err(ApiError::NotFound(format!("stop {stop_id} not found")))
        }
        Err(why) => return Err(why.into()),
    };

    let links = queries::stop::correspondences_from(&state.pool, &stop_id).await?;
    let mut correspondences = Vec::with_capacity(links.len());

    for link in links {
        let Ok(to_stop) = queries::stop::get(&state.pool, &link.to_stop_id).await else {
            continue;
        };

        let mut lines = Vec::new();
        let mut transport_types = Vec::new();
        for (value, kind) in [
            (&to_stop.cor_metro, "metro"),
            (&to_stop.cor_cercanias, "cercanias"),
            (&to_stop.cor_ml, "metro_ligero"),
            (&to_stop.cor_tranvia, "tranvia"),
        ] {
            if let Some(value) = value.as_deref().filter(|v| !v.is_empty()) {
                lines.push(value.to_owned());
                transport_types.push(kind.to_owned());
            }
        }

        correspondences.push(CorrespondenceResponse {
            to_stop_id: link.to_stop_id,
            to_stop_name: to_stop.name,
            to_lines: (!lines.is_empty()).then(|| lines.join(", ")),
            to_transport_types: transport_types,
            distance_m: link.distance_m,
            walk_time_s: link.walk_time_s,
            source: link.source,
        });
    }

    Ok(Json(StopCorrespondencesResponse {
        stop_id,
        stop_name: stop.name,
        correspondences,
    }))
}
