//! The scheduled-departures join and its companion lookups.

use std::collections::HashMap;

use sqlx::{Executor, Postgres};

use crate::Result;

use super::convert_error;

/// One row of the StopTime × Trip × Route join behind a departures query.
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct ScheduledDepartureRow {
    pub trip_id: String,
    pub stop_id: String,
    pub stop_sequence: i32,
    pub departure_seconds: i32,
    pub trip_headsign: Option<String>,
    pub route_id: String,
    pub route_short_name: Option<String>,
    pub route_color: Option<String>,
    pub network_id: Option<String>,
}

/// Upcoming scheduled departures at a set of platforms. Excludes the final
/// call of each trip (the vehicle arrives there but does not depart again).
/// The caller passes an over-fetch limit to absorb post-filter attrition.
pub async fn scheduled_departures<'c, E>(
    executor: E,
    stop_ids: &[String],
    min_departure_seconds: i64,
    active_services: &[String],
    route_filter: Option<&str>,
    limit: i64,
) -> Result<Vec<ScheduledDepartureRow>>
where
    E: Executor<'c, Database = Postgres>,
{
    sqlx::query_as(
        "
        WITH max_seq AS (
            SELECT trip_id, MAX(stop_sequence) AS max_sequence
            FROM gtfs_stop_times
            GROUP BY trip_id
        )
        SELECT
            st.trip_id,
            st.stop_id,
            st.stop_sequence,
            st.departure_seconds,
            t.headsign AS trip_headsign,
            r.id AS route_id,
            r.short_name AS route_short_name,
            r.color AS route_color,
            r.network_id
        FROM gtfs_stop_times st
        JOIN gtfs_trips t ON t.id = st.trip_id
        JOIN gtfs_routes r ON r.id = t.route_id
        JOIN max_seq ms ON ms.trip_id = st.trip_id
        WHERE st.stop_id = ANY($1)
          AND st.departure_seconds >= $2
          AND t.service_id = ANY($3)
          AND st.stop_sequence < ms.max_sequence
          AND ($4::text IS NULL OR t.route_id = $4)
        ORDER BY st.departure_seconds
        LIMIT $5;
        ",
    )
    .bind(stop_ids)
    .bind(min_departure_seconds)
    .bind(active_services)
    .bind(route_filter)
    .bind(limit)
    .fetch_all(executor)
    .await
    .map_err(convert_error)
}

/// Stop count per trip, for express-service detection.
pub async fn stop_counts<'c, E>(
    executor: E,
    trip_ids: &[String],
) -> Result<HashMap<String, i64>>
where
    E: Executor<'c, Database = Postgres>,
{
    let rows: Vec<(String, i64)> = sqlx::query_as(
        "
        SELECT trip_id, COUNT(*) AS stop_count
        FROM gtfs_stop_times
        WHERE trip_id = ANY($1)
        GROUP BY trip_id;
        ",
    )
    .bind(trip_ids)
    .fetch_all(executor)
    .await
    .map_err(convert_error)?;
    Ok(rows.into_iter().collect())
}

/// Name of the last stop of each trip, used as the headsign fallback.
pub async fn last_stop_names<'c, E>(
    executor: E,
    trip_ids: &[String],
) -> Result<HashMap<String, String>>
where
    E: Executor<'c, Database = Postgres>,
{
    let rows: Vec<(String, String)> = sqlx::query_as(
        "
        WITH max_seq AS (
            SELECT trip_id, MAX(stop_sequence) AS max_sequence
            FROM gtfs_stop_times
            WHERE trip_id = ANY($1)
            GROUP BY trip_id
        )
        SELECT st.trip_id, s.name
        FROM gtfs_stop_times st
        JOIN max_seq ms
          ON ms.trip_id = st.trip_id AND ms.max_sequence = st.stop_sequence
        JOIN gtfs_stops s ON s.id = st.stop_id;
        ",
    )
    .bind(trip_ids)
    .fetch_all(executor)
    .await
    .map_err(convert_error)?;
    Ok(rows.into_iter().collect())
}
