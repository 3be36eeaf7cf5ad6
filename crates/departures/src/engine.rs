use std::collections::{HashMap, HashSet};

use chrono::Timelike;
use database::queries;
use database::PgPool;
use itertools::Itertools;
use model::occupancy::{parse_occupancy_per_car, percentage_to_status};
use model::route::{format_seconds, is_static_gtfs_route, RouteFrequency};
use model::stop::Stop;
use schedule::ScheduleStore;
use utility::holidays::effective_day_type;
use utility::text::normalize_headsign;

use crate::civis::detect_civis;
use crate::dedup::dedup_departures;
use crate::frequency::{frequency_departures, is_frequency_stop};
use crate::hours;
use crate::types::{Departure, DepartureQuery, DeparturesError, TrainPosition};

/// Answer one departures query: resolve the stop to its platforms, read the
/// scheduled board, fuse in realtime data and synthesized frequencies, gate,
/// deduplicate and sort.
pub async fn departures(
    pool: &PgPool,
    store: &ScheduleStore,
    query: &DepartureQuery,
) -> Result<Vec<Departure>, DeparturesError> {
    let limit = query.clamped_limit();
    let stop = queries::stop::get(pool, &query.stop_id).await?;

    let resolved = resolve_to_platforms(pool, &stop).await?;

    let now = query.now;
    let current_seconds = now.num_seconds_from_midnight();
    let today = now.date_naive();
    let day_type = effective_day_type(today);

    let snapshot = store.snapshot()?;
    let active_services: Vec<String> = snapshot
        .active_services(today)
        .iter()
        .map(|service| service.to_string())
        .collect();
    if active_services.is_empty() {
        return Ok(Vec::new());
    }

    let rows = queries::departures::scheduled_departures(
        pool,
        &resolved,
        current_seconds as i64,
        &active_services,
        query.route_id.as_deref(),
        (limit * 3) as i64,
    )
    .await?;

    let frequency_eligible = resolved.iter().any(|id| is_frequency_stop(id));

    // No scheduled data at all: the board is synthesized from headways.
    if rows.is_empty() && frequency_eligible {
        return Ok(frequency_departures(
            pool,
            &stop,
            query.route_id.as_deref(),
            limit,
            day_type,
            current_seconds,
        )
        .await?);
    }

    // Lines at the stop with no stop_times still deserve estimates next to
    // the scheduled ones.
    let mut frequency_supplement = Vec::new();
    if frequency_eligible && !rows.is_empty() {
        let covered: HashSet<&str> = rows.iter().map(|row| row.route_id.as_str()).collect();
        let all_route_ids = queries::route::route_ids_at_stops(pool, &resolved).await?;
        for route_id in all_route_ids {
            if covered.contains(route_id.as_str()) {
                continue;
            }
            if let Some(filter) = query.route_id.as_deref() {
                if filter != route_id {
                    continue;
                }
            }
            frequency_supplement.extend(
                frequency_departures(
                    pool,
                    &stop,
                    Some(&route_id),
                    limit,
                    day_type,
                    current_seconds,
                )
                .await?,
            );
        }
    }

    let trip_ids: Vec<String> = rows.iter().map(|row| row.trip_id.clone()).unique().collect();

    let stop_counts = queries::departures::stop_counts(pool, &trip_ids).await?;
    let last_stop_names = queries::departures::last_stop_names(pool, &trip_ids).await?;

    let trip_delays: HashMap<String, i32> =
        queries::realtime::trip_updates_for_trips(pool, &trip_ids)
            .await?
            .into_iter()
            .map(|update| (update.trip_id, update.delay_secs))
            .collect();

    let mut stop_delays: HashMap<String, i32> = HashMap::new();
    let mut stop_platforms: HashMap<String, String> = HashMap::new();
    let mut stop_occupancy: HashMap<String, (Option<i32>, Option<String>)> = HashMap::new();
    for update in
        queries::realtime::stop_time_updates_at_stops(pool, &trip_ids, &resolved).await?
    {
        if let Some(delay) = update.departure_delay.or(update.arrival_delay) {
            stop_delays.insert(update.trip_id.clone(), delay);
        }
        if let Some(platform) = update.platform {
            stop_platforms.insert(update.trip_id.clone(), platform);
        }
        if update.occupancy_percent.is_some() || update.occupancy_per_car.is_some() {
            stop_occupancy.insert(
                update.trip_id.clone(),
                (update.occupancy_percent, update.occupancy_per_car),
            );
        }
    }

    // Stop-indexed platform fallback for operators whose realtime trip IDs
    // never match the static schedule.
    let platforms_by_stop: HashMap<String, String> =
        queries::realtime::recent_platforms_by_stop(pool, &resolved)
            .await?
            .into_iter()
            .collect();

    let queried_numeric = strip_renfe_prefix(&query.stop_id);
    let mut train_positions: HashMap<String, TrainPosition> = HashMap::new();
    let mut vehicle_platforms: HashMap<String, String> = HashMap::new();
    for position in queries::realtime::vehicle_positions_for_trips(pool, &trip_ids).await? {
        let Some(trip_id) = position.trip_id.clone() else {
            continue;
        };
        let current_stop_name = position
            .stop_id
            .as_deref()
            .and_then(|stop_id| snapshot.stop_info(stop_id))
            .map(|info| info.name.to_string());
        train_positions.insert(
            trip_id.clone(),
            TrainPosition {
                latitude: position.lat,
                longitude: position.lon,
                current_stop_name,
                status: position.status.as_str().to_owned(),
            },
        );

        let at_queried_stop = position
            .stop_id
            .as_deref()
            .map(|stop_id| strip_renfe_prefix(stop_id) == queried_numeric)
            .unwrap_or(false);
        if let (Some(platform), true, true) = (
            position.platform,
            at_queried_stop,
            position.status.is_at_station(),
        ) {
            vehicle_platforms.insert(trip_id, platform);
        }
    }

    let mut frequencies_cache: HashMap<String, Vec<RouteFrequency>> = HashMap::new();
    let mut result = Vec::with_capacity(rows.len());

    for row in rows {
        let route_short_name = row.route_short_name.clone().unwrap_or_default();
        let route_short_name = route_short_name.trim().to_owned();
        let departure_seconds = row.departure_seconds.max(0) as u32;

        // Static-only networks are gated by their operating window; the
        // departure time is what gets checked, not the query time, so
        // tomorrow's first trains never leak into tonight's board.
        if is_static_gtfs_route(&row.route_id) {
            if !frequencies_cache.contains_key(&row.route_id) {
                let loaded =
                    queries::route::frequencies_for_day(pool, &row.route_id, day_type)
                        .await?;
                frequencies_cache.insert(row.route_id.clone(), loaded);
            }
            if !hours::is_operating(&frequencies_cache[&row.route_id], departure_seconds) {
                continue;
            }
        }

        let minutes_until = (departure_seconds as i64 - current_seconds as i64) / 60;

        let delay_seconds = stop_delays
            .get(&row.trip_id)
            .or_else(|| trip_delays.get(&row.trip_id))
            .copied();

        let mut realtime_departure_time = None;
        let mut realtime_minutes_until = None;
        let mut is_delayed = false;
        if let Some(delay) = delay_seconds.filter(|delay| *delay != 0) {
            is_delayed = delay > 60;
            let realtime_seconds = departure_seconds as i64 + delay as i64;
            realtime_departure_time =
                Some(format_seconds((realtime_seconds.rem_euclid(86_400)) as u32));
            realtime_minutes_until =
                Some(((realtime_seconds - current_seconds as i64).max(0)) / 60);
        }

        let headsign = row
            .trip_headsign
            .clone()
            .or_else(|| last_stop_names.get(&row.trip_id).cloned())
            .map(|text| normalize_headsign(&text));

        let mut platform_estimated = false;
        let mut platform = stop_platforms
            .get(&row.trip_id)
            .or_else(|| vehicle_platforms.get(&row.trip_id))
            .or_else(|| platforms_by_stop.get(&row.stop_id))
            .cloned();
        if platform.is_none() {
            platform = queries::history::predict_for_departure(
                pool,
                &row.stop_id,
                &route_short_name,
                headsign.as_deref().unwrap_or(""),
                today,
            )
            .await?;
            platform_estimated = platform.is_some();
        }

        let (occupancy_percentage, occupancy_status, occupancy_per_car) =
            match stop_occupancy.get(&row.trip_id) {
                Some((percent, per_car)) => (
                    *percent,
                    percent.map(percentage_to_status),
                    per_car.as_deref().and_then(parse_occupancy_per_car),
                ),
                None => (None, None, None),
            };

        let stop_count = stop_counts.get(&row.trip_id).copied().unwrap_or(0);
        let (is_express, express_name, express_color) = detect_civis(
            &row.route_id,
            &route_short_name,
            stop_count,
            row.network_id.as_deref(),
        );

        let train_position = train_positions.get(&row.trip_id).cloned();

        result.push(Departure {
            trip_id: row.trip_id,
            route_id: row.route_id,
            route_short_name,
            route_color: row.route_color,
            headsign,
            departure_time: format_seconds(departure_seconds % 86_400),
            departure_seconds,
            minutes_until,
            stop_sequence: row.stop_sequence,
            platform,
            platform_estimated,
            delay_seconds,
            realtime_departure_time,
            realtime_minutes_until,
            is_delayed,
            train_position,
            occupancy_status,
            occupancy_percentage,
            occupancy_per_car,
            is_express,
            express_name,
            express_color,
            frequency_based: false,
            headway_secs: None,
        });
    }

    result.extend(frequency_supplement);

    let mut result = dedup_departures(result);
    result.sort_by_key(Departure::sort_minutes);
    result.truncate(limit);
    Ok(result)
}

fn strip_renfe_prefix(stop_id: &str) -> &str {
    stop_id.strip_prefix("RENFE_").unwrap_or(stop_id)
}

/// Stations resolve to their platform children, since stop_times reference
/// platforms. Two operators need suffix heuristics when the hierarchy rows
/// are missing: TMB parent IDs map onto line-1 platform codes, FGC parents
/// fan out to their numbered platforms.
async fn resolve_to_platforms(
    pool: &PgPool,
    stop: &Stop,
) -> Result<Vec<String>, DeparturesError> {
    if !stop.is_station() {
        return Ok(vec![stop.id.clone()]);
    }

    let children = queries::stop::children(pool, &stop.id).await?;
    if !children.is_empty() {
        return Ok(children);
    }

    if let Some(code) = stop.id.strip_prefix("TMB_METRO_P.") {
        let digits: String = code.chars().filter(|c| c.is_ascii_digit()).collect();
        let suffix = &digits[digits.len().saturating_sub(3)..];
        let candidate = format!("TMB_METRO_1.{suffix}");
        if queries::stop::exists(pool, &candidate).await? {
            return Ok(vec![candidate]);
        }
        return Ok(vec![stop.id.clone()]);
    }

    let ends_in_digit = stop.id.chars().last().is_some_and(|c| c.is_ascii_digit());
    if stop.id.starts_with("FGC_") && !ends_in_digit {
        let platforms =
            queries::stop::ids_like(pool, &format!("{}%", stop.id), &stop.id).await?;
        if !platforms.is_empty() {
            return Ok(platforms);
        }
    }

    Ok(vec![stop.id.clone()])
}
