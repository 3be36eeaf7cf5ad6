//! Frequency-based departure synthesis for networks that publish headways
//! instead of stop_times (Metro Madrid, Metro Ligero, Tranvía Sevilla, …).

use database::{queries, DatabaseError, PgPool};
use model::route::{format_seconds, is_static_gtfs_route, Route, RouteFrequency};
use model::stop::Stop;
use utility::holidays::DayType;

use crate::hours;
use crate::types::Departure;

/// Stop-ID prefixes eligible for synthesized departures.
pub(crate) const FREQUENCY_PREFIXES: [&str; 5] =
    ["METRO_", "ML_", "TRAM_SEV_", "TMB_METRO_1.", "FGC_"];

pub(crate) fn is_frequency_stop(stop_id: &str) -> bool {
    FREQUENCY_PREFIXES
        .iter()
        .any(|prefix| stop_id.starts_with(prefix))
}

/// The frequency window to synthesize from: the one covering `now`, else the
/// next upcoming one today. Friday falls back to the weekday table when the
/// operator publishes no separate Friday headways.
async fn applicable_frequency(
    pool: &PgPool,
    route_id: &str,
    day_type: DayType,
    current_seconds: u32,
) -> Result<Option<(RouteFrequency, bool)>, DatabaseError> {
    let mut frequencies =
        queries::route::frequencies_for_day(pool, route_id, day_type).await?;
    if frequencies.is_empty() && day_type == DayType::Friday {
        frequencies =
            queries::route::frequencies_for_day(pool, route_id, DayType::Weekday).await?;
    }

    if let Some(active) = frequencies
        .iter()
        .find(|frequency| frequency.contains(current_seconds))
    {
        return Ok(Some((active.clone(), false)));
    }

    let upcoming = frequencies
        .iter()
        .filter(|frequency| frequency.start_seconds > current_seconds)
        .min_by_key(|frequency| frequency.start_seconds);
    Ok(upcoming.map(|frequency| (frequency.clone(), true)))
}

/// Line names a stop advertises, resolved to routes when the sequence table
/// has no entry for it. Metro lines are numbered without their L prefix in
/// the import, Metro Ligero without ML.
async fn routes_from_lineas(
    pool: &PgPool,
    stop: &Stop,
) -> Result<Vec<Route>, DatabaseError> {
    let Some(lineas) = stop.lineas.as_deref() else {
        return Ok(Vec::new());
    };

    let is_metro = stop.id.starts_with("METRO_");
    let is_ml = stop.id.starts_with("ML_");
    let network_id = match stop.id.split('_').next() {
        Some("TMB") => Some("TMB_METRO"),
        Some("FGC") => Some("FGC"),
        Some("METRO") => Some("11T"),
        Some("ML") => Some("12T"),
        _ => None,
    };

    let mut routes = Vec::new();
    for line in lineas.split(',') {
        let line = line.trim();
        if line.is_empty() {
            continue;
        }
        let search_name = if is_metro && line.chars().all(|c| c.is_ascii_digit()) {
            format!("L{line}")
        } else if is_ml && line.chars().all(|c| c.is_ascii_digit()) {
            format!("ML{line}")
        } else {
            line.to_owned()
        };
        let mut found =
            queries::route::by_short_name(pool, &search_name, network_id).await?;
        routes.append(&mut found);
    }
    Ok(routes)
}

/// Synthesize estimated departures at headway intervals for every route
/// serving the stop.
pub(crate) async fn frequency_departures(
    pool: &PgPool,
    stop: &Stop,
    route_filter: Option<&str>,
    limit: usize,
    day_type: DayType,
    current_seconds: u32,
) -> Result<Vec<Departure>, DatabaseError> {
    let mut routes = queries::route::routes_at_stops(pool, &[stop.id.clone()]).await?;
    if routes.is_empty() {
        routes = routes_from_lineas(pool, stop).await?;
    }
    if let Some(filter) = route_filter {
        routes.retain(|route| route.id == filter);
    }
    if routes.is_empty() {
        return Ok(Vec::new());
    }

    let route_count = routes.len();
    let mut departures = Vec::new();

    for route in routes {
        // A closed line shows nothing, rather than tomorrow's first trains.
        if is_static_gtfs_route(&route.id) {
            let today_frequencies =
                queries::route::frequencies_for_day(pool, &route.id, day_type).await?;
            if !hours::is_operating(&today_frequencies, current_seconds) {
                continue;
            }
        }

        let Some((frequency, is_future)) =
            applicable_frequency(pool, &route.id, day_type, current_seconds).await?
        else {
            continue;
        };

        let stop_seq =
            queries::route::sequence_at_stop(pool, &route.id, &stop.id).await?;
        let sequence = queries::route::stop_sequence(pool, &route.id).await?;
        let (first, last) = (sequence.first(), sequence.last());

        let mut directions: Vec<(u8, String)> = Vec::new();
        if let (Some(first), Some(last)) = (first, last) {
            let (is_at_first, is_at_last) = match &stop_seq {
                Some(seq) => (seq.sequence == first.sequence, seq.sequence == last.sequence),
                None => (first.stop_id == stop.id, last.stop_id == stop.id),
            };
            // At a terminus only the outbound direction exists.
            if !is_at_last {
                if let Ok(last_stop) = queries::stop::get(pool, &last.stop_id).await {
                    directions.push((0, last_stop.name));
                }
            }
            if !is_at_first {
                if let Ok(first_stop) = queries::stop::get(pool, &first.stop_id).await {
                    directions.push((1, first_stop.name));
                }
            }
        }
        if directions.is_empty() {
            directions.push((
                0,
                route
                    .long_name
                    .clone()
                    .unwrap_or_else(|| route.short_name.clone()),
            ));
        }

        let per_direction = (limit / directions.len().max(1) / route_count).max(1);
        departures.extend(synthesize(
            &route,
            &frequency,
            &directions,
            current_seconds,
            is_future,
            per_direction,
            stop_seq.map(|seq| seq.sequence).unwrap_or(0),
        ));
    }

    departures.sort_by_key(Departure::sort_minutes);
    departures.truncate(limit);
    Ok(departures)
}

/// Generate the departures themselves: aligned to the next minute boundary
/// (or the window start when service has not begun), spaced one headway
/// apart, with direction 1 offset by half a headway so opposing platforms do
/// not tick in lockstep.
fn synthesize(
    route: &Route,
    frequency: &RouteFrequency,
    directions: &[(u8, String)],
    current_seconds: u32,
    is_future: bool,
    per_direction: usize,
    stop_sequence: i32,
) -> Vec<Departure> {
    let headway = frequency.headway_secs;
    let base = if is_future {
        frequency.start_seconds
    } else {
        current_seconds.div_ceil(60) * 60
    };

    let mut departures = Vec::new();
    for (direction_id, headsign) in directions {
        let mut departure_seconds = base + (headway / 2) * (*direction_id as u32);
        for index in 0..per_direction {
            let minutes_until =
                (departure_seconds as i64 - current_seconds as i64).max(0) / 60;
            departures.push(Departure {
                trip_id: format!("{}_FREQ_{direction_id}_{index}", route.id),
                route_id: route.id.clone(),
                route_short_name: route.short_name.clone(),
                route_color: route.color.clone(),
                headsign: Some(headsign.clone()),
                departure_time: format_seconds(departure_seconds % 86_400),
                departure_seconds,
                minutes_until,
                stop_sequence,
                platform: None,
                platform_estimated: false,
                delay_seconds: None,
                realtime_departure_time: None,
                realtime_minutes_until: None,
                is_delayed: false,
                train_position: None,
                occupancy_status: None,
                occupancy_percentage: None,
                occupancy_per_car: None,
                is_express: false,
                express_name: None,
                express_color: None,
                frequency_based: true,
                headway_secs: Some(headway),
            });
            departure_seconds += headway;
        }
    }
    departures
}

#[cfg(test)]
mod tests {
    use super::*;

    fn route() -> Route {
        Route {
            id: "METRO_1".to_owned(),
            agency_id: None,
            network_id: Some("11T".to_owned()),
            short_name: "L1".to_owned(),
            long_name: Some("Pinar de Chamartín - Valdecarros".to_owned()),
            route_type: 1,
            color: Some("2DBEF0".to_owned()),
            text_color: None,
            is_circular: false,
        }
    }

    fn frequency(start: u32, end: u32, headway: u32) -> RouteFrequency {
        RouteFrequency {
            route_id: "METRO_1".to_owned(),
            day_type: DayType::Weekday,
            start_seconds: start,
            end_seconds: end,
            headway_secs: headway,
        }
    }

    #[test]
    fn departures_align_to_minute_and_step_by_headway() {
        // Query at exactly 08:00:00
        let departures = synthesize(
            &route(),
            &frequency(7 * 3600, 9 * 3600 + 1800, 180),
            &[(0, "Valdecarros".to_owned())],
            28_800,
            false,
            3,
            5,
        );
        assert_eq!(departures.len(), 3);
        assert_eq!(departures[0].departure_seconds, 28_800);
        assert_eq!(departures[1].departure_seconds, 28_980);
        assert_eq!(departures[2].departure_seconds, 29_160);
        assert!(departures.iter().all(|d| d.frequency_based));
        assert!(departures.iter().all(|d| d.headway_secs == Some(180)));
    }

    #[test]
    fn mid_minute_queries_round_up() {
        let departures = synthesize(
            &route(),
            &frequency(7 * 3600, 9 * 3600, 180),
            &[(0, "Valdecarros".to_owned())],
            28_815,
            false,
            1,
            0,
        );
        assert_eq!(departures[0].departure_seconds, 28_860);
    }

    #[test]
    fn opposite_direction_is_offset_by_half_headway() {
        let departures = synthesize(
            &route(),
            &frequency(7 * 3600, 9 * 3600, 180),
            &[(0, "Valdecarros".to_owned()), (1, "Pinar".to_owned())],
            28_800,
            false,
            1,
            0,
        );
        assert_eq!(departures.len(), 2);
        assert_eq!(departures[0].departure_seconds, 28_800);
        assert_eq!(departures[1].departure_seconds, 28_890);
    }

    #[test]
    fn future_window_starts_at_window_open() {
        let departures = synthesize(
            &route(),
            &frequency(7 * 3600, 9 * 3600, 300),
            &[(0, "Valdecarros".to_owned())],
            6 * 3600,
            true,
            2,
            0,
        );
        assert_eq!(departures[0].departure_seconds, 7 * 3600);
        assert_eq!(departures[0].minutes_until, 60);
    }

    #[test]
    fn frequency_prefixes_cover_the_headway_networks() {
        assert!(is_frequency_stop("METRO_109"));
        assert!(is_frequency_stop("TMB_METRO_1.111"));
        assert!(is_frequency_stop("FGC_PC1"));
        assert!(!is_frequency_stop("RENFE_17000"));
    }
}
