use std::collections::{HashMap, HashSet};
use std::sync::Arc;

use chrono::NaiveDate;
use database::{queries, DatabaseError, PgPool};
use model::route::format_seconds;
use schedule::{NotLoaded, ScheduleStore, Snapshot};
use serde::Serialize;
use utility::geo;

use crate::raptor::{self, BackPointer};

#[derive(Debug, Clone)]
pub struct PlanRequest {
    pub from_stop: String,
    pub to_stop: String,
    /// Seconds since local midnight; defaults to the query wall clock.
    pub departure_seconds: Option<u32>,
    pub date: NaiveDate,
    pub now_seconds: u32,
    pub max_transfers: usize,
    pub max_alternatives: usize,
}

#[derive(Debug)]
pub enum PlanError {
    NotFound,
    NotLoaded,
    Unavailable(DatabaseError),
}

impl std::fmt::Display for PlanError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            PlanError::NotFound => write!(f, "stop not found"),
            PlanError::NotLoaded => write!(f, "schedule not loaded"),
            PlanError::Unavailable(why) => write!(f, "planner unavailable: {why}"),
        }
    }
}

impl std::error::Error for PlanError {}

impl From<NotLoaded> for PlanError {
    fn from(_: NotLoaded) -> Self {
        PlanError::NotLoaded
    }
}

impl From<DatabaseError> for PlanError {
    fn from(why: DatabaseError) -> Self {
        PlanError::Unavailable(why)
    }
}

#[serde_with::skip_serializing_none]
#[derive(Debug, Clone, Serialize)]
pub struct JourneyStop {
    pub id: String,
    pub name: String,
    pub lat: f64,
    pub lon: f64,
}

#[serde_with::skip_serializing_none]
#[derive(Debug, Clone, Serialize)]
pub struct JourneySegment {
    /// "transit" or "walking".
    pub kind: String,
    pub mode: String,
    pub line_id: Option<String>,
    pub line_name: Option<String>,
    pub line_color: Option<String>,
    pub headsign: Option<String>,
    pub origin: JourneyStop,
    pub destination: JourneyStop,
    pub departure: String,
    pub arrival: String,
    pub duration_minutes: i64,
    pub intermediate_stops: Vec<JourneyStop>,
    pub distance_meters: Option<f64>,
    pub coordinates: Vec<(f64, f64)>,
    pub suggested_heading: f64,
}

#[derive(Debug, Clone, Serialize)]
pub struct Journey {
    pub departure: String,
    pub arrival: String,
    pub duration_minutes: i64,
    pub transfers: usize,
    pub walking_minutes: i64,
    pub segments: Vec<JourneySegment>,
}

#[serde_with::skip_serializing_none]
#[derive(Debug, Clone, Serialize)]
pub struct JourneyAlert {
    pub id: String,
    pub line_id: Option<String>,
    pub line_name: Option<String>,
    pub message: Option<String>,
    pub severity: String,
    pub active_from: Option<String>,
    pub active_until: Option<String>,
}

#[serde_with::skip_serializing_none]
#[derive(Debug, Clone, Serialize)]
pub struct JourneyPlan {
    pub success: bool,
    pub message: Option<String>,
    pub journeys: Vec<Journey>,
    pub alerts: Vec<JourneyAlert>,
}

#[derive(Debug, Clone)]
enum Leg {
    Transit {
        trip_id: Arc<str>,
        from_stop: Arc<str>,
        to_stop: Arc<str>,
        board_seconds: u32,
        alight_seconds: u32,
    },
    Walk {
        from_stop: Arc<str>,
        to_stop: Arc<str>,
        walk_seconds: u32,
    },
}

struct Candidate {
    arrival: u32,
    legs: Vec<Leg>,
}

impl Candidate {
    fn transfers(&self) -> usize {
        self.transit_count().saturating_sub(1)
    }

    fn transit_count(&self) -> usize {
        self.legs
            .iter()
            .filter(|leg| matches!(leg, Leg::Transit { .. }))
            .count()
    }

    fn walking_seconds(&self) -> u32 {
        self.legs
            .iter()
            .map(|leg| match leg {
                Leg::Walk { walk_seconds, .. } => *walk_seconds,
                Leg::Transit { .. } => 0,
            })
            .sum()
    }

    fn dominates(&self, other: &Candidate) -> bool {
        let at_least_as_good = self.arrival <= other.arrival
            && self.transfers() <= other.transfers()
            && self.walking_seconds() <= other.walking_seconds();
        let strictly_better = self.arrival < other.arrival
            || self.transfers() < other.transfers()
            || self.walking_seconds() < other.walking_seconds();
        at_least_as_good && strictly_better
    }
}

/// Resolve a user-facing stop ID to its platform set, as the departures
/// engine does: stations resolve to their children, plain stops to
/// themselves.
fn resolve(snapshot: &Snapshot, stop_id: &str) -> Result<Vec<Arc<str>>, PlanError> {
    let children = snapshot.children(stop_id);
    if !children.is_empty() {
        return Ok(children.to_vec());
    }
    if snapshot.stop_info(stop_id).is_none() {
        return Err(PlanError::NotFound);
    }
    Ok(vec![Arc::from(stop_id)])
}

pub async fn plan_journey(
    pool: &PgPool,
    store: &ScheduleStore,
    request: &PlanRequest,
) -> Result<JourneyPlan, PlanError> {
    let snapshot = store.snapshot()?;
    let departure_seconds = request.departure_seconds.unwrap_or(request.now_seconds);

    let origins = resolve(&snapshot, &request.from_stop)?;
    let destinations: HashSet<Arc<str>> =
        resolve(&snapshot, &request.to_stop)?.into_iter().collect();

    // Same station on both ends: a single zero-length journey.
    if request.from_stop == request.to_stop
        || origins.iter().any(|origin| destinations.contains(origin))
    {
        let time = format_seconds(departure_seconds);
        return Ok(JourneyPlan {
            success: true,
            message: None,
            journeys: vec![Journey {
                departure: time.clone(),
                arrival: time,
                duration_minutes: 0,
                transfers: 0,
                walking_minutes: 0,
                segments: Vec::new(),
            }],
            alerts: Vec::new(),
        });
    }

    let active_services = snapshot.active_services(request.date);
    let result = raptor::run(
        &snapshot,
        &origins,
        &destinations,
        departure_seconds,
        &active_services,
        request.max_transfers + 1,
    );

    let mut candidates = Vec::new();
    for round in 0..result.back.len() {
        for destination in &destinations {
            if !result.back[round].contains_key(destination) {
                continue;
            }
            let Some(arrival) = result.labels[round].get(destination).copied() else {
                continue;
            };
            if let Some(legs) = reconstruct(&result, round, destination) {
                if !legs.is_empty() {
                    candidates.push(Candidate { arrival, legs });
                }
            }
        }
    }

    if candidates.is_empty() {
        return Ok(JourneyPlan {
            success: false,
            message: Some(format!(
                "no journey found from {} to {} within {} transfers",
                request.from_stop, request.to_stop, request.max_transfers
            )),
            journeys: Vec::new(),
            alerts: Vec::new(),
        });
    }

    let mut pareto: Vec<Candidate> = Vec::new();
    candidates.sort_by_key(|candidate| {
        (candidate.arrival, candidate.transfers(), candidate.walking_seconds())
    });
    for candidate in candidates {
        if !pareto.iter().any(|kept| kept.dominates(&candidate)) {
            pareto.retain(|kept| !candidate.dominates(kept));
            pareto.push(candidate);
        }
    }
    pareto.truncate(request.max_alternatives.max(1));

    let mut journeys = Vec::with_capacity(pareto.len());
    let mut used_routes: HashSet<String> = HashSet::new();
    for candidate in &pareto {
        journeys.push(
            build_journey(pool, &snapshot, candidate, departure_seconds, &mut used_routes)
                .await?,
        );
    }

    let alerts = alerts_for_routes(pool, &snapshot, &used_routes).await?;

    Ok(JourneyPlan {
        success: true,
        message: None,
        journeys,
        alerts,
    })
}

/// Walk the back pointers from a destination to the origin. Labels carry
/// forward across rounds, so a boarding stop's pointer may live in an
/// earlier round than the leg that used it.
fn reconstruct(
    result: &raptor::RaptorResult,
    round: usize,
    destination: &Arc<str>,
) -> Option<Vec<Leg>> {
    let pointer_at = |round: usize, stop: &Arc<str>| {
        (0..=round)
            .rev()
            .find_map(|r| result.back[r].get(stop).map(|pointer| (r, pointer)))
    };

    let mut legs = Vec::new();
    let mut current = destination.clone();
    let mut current_round = round;

    loop {
        let (found_round, pointer) = pointer_at(current_round, &current)?;
        match pointer {
            BackPointer::Origin => break,
            BackPointer::Walk {
                from_stop,
                walk_seconds,
            } => {
                legs.push(Leg::Walk {
                    from_stop: from_stop.clone(),
                    to_stop: current.clone(),
                    walk_seconds: *walk_seconds,
                });
                current = from_stop.clone();
                current_round = found_round;
            }
            BackPointer::Transit {
                trip_id,
                board_stop,
                board_seconds,
            } => {
                let alight_seconds =
                    result.labels[found_round].get(&current).copied().unwrap_or(0);
                legs.push(Leg::Transit {
                    trip_id: trip_id.clone(),
                    from_stop: board_stop.clone(),
                    to_stop: current.clone(),
                    board_seconds: *board_seconds,
                    alight_seconds,
                });
                current = board_stop.clone();
                current_round = found_round.saturating_sub(1);
            }
        }
        if legs.len() > 32 {
            // A chain this long means corrupted pointers; bail out.
            return None;
        }
    }

    legs.reverse();
    Some(legs)
}

fn journey_stop(snapshot: &Snapshot, stop_id: &str) -> JourneyStop {
    match snapshot.stop_info(stop_id) {
        Some(info) => JourneyStop {
            id: stop_id.to_owned(),
            name: info.name.to_string(),
            lat: info.lat,
            lon: info.lon,
        },
        None => JourneyStop {
            id: stop_id.to_owned(),
            name: stop_id.to_owned(),
            lat: 0.0,
            lon: 0.0,
        },
    }
}

async fn build_journey(
    pool: &PgPool,
    snapshot: &Snapshot,
    candidate: &Candidate,
    departure_seconds: u32,
    used_routes: &mut HashSet<String>,
) -> Result<Journey, PlanError> {
    let mut segments = Vec::with_capacity(candidate.legs.len());
    let mut clock = departure_seconds;
    let mut journey_departure = None;

    for leg in &candidate.legs {
        match leg {
            Leg::Walk {
                from_stop,
                to_stop,
                walk_seconds,
            } => {
                let origin = journey_stop(snapshot, from_stop);
                let destination = journey_stop(snapshot, to_stop);
                let distance = geo::haversine_m(
                    origin.lat,
                    origin.lon,
                    destination.lat,
                    destination.lon,
                );
                let heading = geo::initial_bearing(
                    origin.lat,
                    origin.lon,
                    destination.lat,
                    destination.lon,
                );
                let departure = clock;
                let arrival = clock + walk_seconds;
                clock = arrival;
                journey_departure.get_or_insert(departure);
                segments.push(JourneySegment {
                    kind: "walking".to_owned(),
                    mode: "walk".to_owned(),
                    line_id: None,
                    line_name: None,
                    line_color: None,
                    headsign: None,
                    coordinates: vec![
                        (origin.lat, origin.lon),
                        (destination.lat, destination.lon),
                    ],
                    departure: format_seconds(departure),
                    arrival: format_seconds(arrival),
                    duration_minutes: (*walk_seconds as i64) / 60,
                    intermediate_stops: Vec::new(),
                    distance_meters: Some(distance),
                    suggested_heading: heading,
                    origin,
                    destination,
                });
            }
            Leg::Transit {
                trip_id,
                from_stop,
                to_stop,
                board_seconds,
                alight_seconds,
            } => {
                let origin = journey_stop(snapshot, from_stop);
                let destination = journey_stop(snapshot, to_stop);
                let trip_info = snapshot.trip_info(trip_id);
                let route_id = trip_info.map(|info| info.route_id.to_string());
                let route_info =
                    route_id.as_deref().and_then(|id| snapshot.route_info(id));
                if let Some(route_id) = &route_id {
                    used_routes.insert(route_id.clone());
                }

                let intermediate_stops = snapshot
                    .stop_times(trip_id)
                    .map(|stop_times| {
                        stop_times
                            .iter()
                            .skip_while(|call| call.stop_id != *from_stop)
                            .skip(1)
                            .take_while(|call| call.stop_id != *to_stop)
                            .map(|call| journey_stop(snapshot, &call.stop_id))
                            .collect::<Vec<_>>()
                    })
                    .unwrap_or_default();

                let coordinates =
                    transit_coordinates(pool, trip_id, &origin, &intermediate_stops, &destination)
                        .await?;
                let heading = geo::initial_bearing(
                    origin.lat,
                    origin.lon,
                    destination.lat,
                    destination.lon,
                );

                clock = *alight_seconds;
                journey_departure.get_or_insert(*board_seconds);
                segments.push(JourneySegment {
                    kind: "transit".to_owned(),
                    mode: route_info
                        .map(|info| mode_name(info.route_type).to_owned())
                        .unwrap_or_else(|| "rail".to_owned()),
                    line_id: route_id,
                    line_name: route_info.map(|info| info.short_name.to_string()),
                    line_color: route_info.and_then(|info| {
                        info.color.as_ref().map(|color| color.to_string())
                    }),
                    headsign: trip_info.and_then(|info| {
                        info.headsign.as_ref().map(|headsign| headsign.to_string())
                    }),
                    departure: format_seconds(*board_seconds),
                    arrival: format_seconds(*alight_seconds),
                    duration_minutes: (*alight_seconds as i64 - *board_seconds as i64) / 60,
                    intermediate_stops,
                    distance_meters: None,
                    coordinates,
                    suggested_heading: heading,
                    origin,
                    destination,
                });
            }
        }
    }

    let journey_departure = journey_departure.unwrap_or(departure_seconds);
    Ok(Journey {
        departure: format_seconds(journey_departure),
        arrival: format_seconds(candidate.arrival),
        duration_minutes: (candidate.arrival as i64 - journey_departure as i64) / 60,
        transfers: candidate.transfers(),
        walking_minutes: (candidate.walking_seconds() as i64) / 60,
        segments,
    })
}

fn mode_name(route_type: i16) -> &'static str {
    match route_type {
        0 => "tram",
        1 => "metro",
        2 => "rail",
        3 => "bus",
        _ => "rail",
    }
}

/// Shape geometry when the trip has one, otherwise the stop polyline.
async fn transit_coordinates(
    pool: &PgPool,
    trip_id: &str,
    origin: &JourneyStop,
    intermediates: &[JourneyStop],
    destination: &JourneyStop,
) -> Result<Vec<(f64, f64)>, PlanError> {
    let shape_id = match queries::trip::get(pool, trip_id).await {
        Ok(trip) => trip.shape_id,
        Err(DatabaseError::NotFound) => None,
        Err(why) => return Err(why.into()),
    };
    if let Some(shape_id) = shape_id {
        let points = queries::trip::shape_points(pool, &shape_id).await?;
        if !points.is_empty() {
            return Ok(points.into_iter().map(|point| (point.lat, point.lon)).collect());
        }
    }

    let mut coordinates = Vec::with_capacity(intermediates.len() + 2);
    coordinates.push((origin.lat, origin.lon));
    coordinates.extend(intermediates.iter().map(|stop| (stop.lat, stop.lon)));
    coordinates.push((destination.lat, destination.lon));
    Ok(coordinates)
}

async fn alerts_for_routes(
    pool: &PgPool,
    snapshot: &Snapshot,
    used_routes: &HashSet<String>,
) -> Result<Vec<JourneyAlert>, PlanError> {
    if used_routes.is_empty() {
        return Ok(Vec::new());
    }

    let used_short_names: HashSet<String> = used_routes
        .iter()
        .filter_map(|route_id| snapshot.route_info(route_id))
        .map(|info| info.short_name.to_string())
        .collect();

    let alerts = queries::realtime::active_alerts(pool).await?;
    if alerts.is_empty() {
        return Ok(Vec::new());
    }
    let alert_ids: Vec<String> = alerts.iter().map(|alert| alert.alert_id.clone()).collect();
    let entities = queries::realtime::entities_for_alerts(pool, &alert_ids).await?;

    let mut entities_by_alert: HashMap<&str, Vec<&database::data_model::realtime::AlertEntityRow>> =
        HashMap::new();
    for entity in &entities {
        entities_by_alert
            .entry(entity.alert_id.as_str())
            .or_default()
            .push(entity);
    }

    let mut result = Vec::new();
    for alert in &alerts {
        let Some(alert_entities) = entities_by_alert.get(alert.alert_id.as_str()) else {
            continue;
        };
        let matched = alert_entities.iter().find(|entity| {
            entity
                .route_id
                .as_deref()
                .is_some_and(|route_id| used_routes.contains(route_id))
                || entity
                    .route_short_name
                    .as_deref()
                    .is_some_and(|short_name| used_short_names.contains(short_name))
        });
        let Some(matched) = matched else {
            continue;
        };

        result.push(JourneyAlert {
            id: alert.alert_id.clone(),
            line_id: matched.route_id.clone(),
            line_name: matched.route_short_name.clone(),
            message: alert
                .description_text
                .clone()
                .or_else(|| alert.header_text.clone()),
            severity: format!("{:?}", alert.effect),
            active_from: alert.active_period_start.map(|t| t.to_rfc3339()),
            active_until: alert.active_period_end.map(|t| t.to_rfc3339()),
        });
    }

    Ok(result)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn candidate(arrival: u32, transits: usize, walk: u32) -> Candidate {
        let mut legs = Vec::new();
        for index in 0..transits {
            legs.push(Leg::Transit {
                trip_id: Arc::from(format!("T{index}").as_str()),
                from_stop: Arc::from("A"),
                to_stop: Arc::from("B"),
                board_seconds: 0,
                alight_seconds: arrival,
            });
        }
        if walk > 0 {
            legs.push(Leg::Walk {
                from_stop: Arc::from("B"),
                to_stop: Arc::from("C"),
                walk_seconds: walk,
            });
        }
        Candidate { arrival, legs }
    }

    #[test]
    fn domination_requires_strict_improvement_somewhere() {
        let fast = candidate(30_000, 2, 0);
        let slow = candidate(30_600, 2, 0);
        assert!(fast.dominates(&slow));
        assert!(!slow.dominates(&fast));
        assert!(!fast.dominates(&fast));
    }

    #[test]
    fn fewer_transfers_survive_a_later_arrival() {
        let fast_with_transfer = candidate(30_000, 2, 0);
        let slow_direct = candidate(30_600, 1, 0);
        assert!(!fast_with_transfer.dominates(&slow_direct));
        assert!(!slow_direct.dominates(&fast_with_transfer));
    }

    #[test]
    fn walking_counts_only_walk_legs() {
        let with_walk = candidate(30_000, 1, 240);
        assert_eq!(with_walk.walking_seconds(), 240);
        assert_eq!(with_walk.transfers(), 0);
    }
}
