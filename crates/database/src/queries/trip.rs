use model::shape::ShapePoint;
use model::trip::Trip;
use sqlx::{Executor, Postgres};

use crate::data_model::shape::ShapePointRow;
use crate::data_model::trip::TripRow;
use crate::Result;

use super::convert_error;

pub async fn get<'c, E>(executor: E, id: &str) -> Result<Trip>
where
    E: Executor<'c, Database = Postgres>,
{
    let row: TripRow = sqlx::query_as(
        "
        SELECT id, route_id, service_id, headsign, direction_id, shape_id
        FROM gtfs_trips
        WHERE id = $1;
        ",
    )
    .bind(id)
    .fetch_one(executor)
    .await
    .map_err(convert_error)?;
    Ok(row.into())
}

/// The calls of a trip joined with stop names and coordinates, in order.
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct TripCallRow {
    pub stop_id: String,
    pub stop_name: String,
    pub stop_lat: f64,
    pub stop_lon: f64,
    pub stop_sequence: i32,
    pub arrival_seconds: i32,
    pub departure_seconds: i32,
}

pub async fn calls<'c, E>(executor: E, trip_id: &str) -> Result<Vec<TripCallRow>>
where
    E: Executor<'c, Database = Postgres>,
{
    sqlx::query_as(
        "
        SELECT
            st.stop_id,
            s.name AS stop_name,
            s.lat AS stop_lat,
            s.lon AS stop_lon,
            st.stop_sequence,
            st.arrival_seconds,
            st.departure_seconds
        FROM gtfs_stop_times st
        JOIN gtfs_stops s ON s.id = st.stop_id
        WHERE st.trip_id = $1
        ORDER BY st.stop_sequence;
        ",
    )
    .bind(trip_id)
    .fetch_all(executor)
    .await
    .map_err(convert_error)
}

/// Any shape_id used by a route, for drawing its path.
pub async fn shape_id_for_route<'c, E>(executor: E, route_id: &str) -> Result<Option<String>>
where
    E: Executor<'c, Database = Postgres>,
{
    sqlx::query_scalar(
        "
        SELECT shape_id FROM gtfs_trips
        WHERE route_id = $1 AND shape_id IS NOT NULL
        LIMIT 1;
        ",
    )
    .bind(route_id)
    .fetch_optional(executor)
    .await
    .map_err(convert_error)
}

pub async fn shape_points<'c, E>(executor: E, shape_id: &str) -> Result<Vec<ShapePoint>>
where
    E: Executor<'c, Database = Postgres>,
{
    let rows: Vec<ShapePointRow> = sqlx::query_as(
        "
        SELECT shape_id, sequence, lat, lon, dist_traveled
        FROM gtfs_shapes
        WHERE shape_id = $1
        ORDER BY sequence;
        ",
    )
    .bind(shape_id)
    .fetch_all(executor)
    .await
    .map_err(convert_error)?;
    Ok(rows.into_iter().map(Into::into).collect())
}

/// First departure per day-type bucket, for the operating-hours endpoint.
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct TripWithCalendarRow {
    pub trip_id: String,
    pub monday: bool,
    pub tuesday: bool,
    pub wednesday: bool,
    pub saturday: bool,
    pub sunday: bool,
}

pub async fn trips_with_calendar<'c, E>(
    executor: E,
    route_id: &str,
) -> Result<Vec<TripWithCalendarRow>>
where
    E: Executor<'c, Database = Postgres>,
{
    sqlx::query_as(
        "
        SELECT t.id AS trip_id, c.monday, c.tuesday, c.wednesday, c.saturday, c.sunday
        FROM gtfs_trips t
        JOIN gtfs_calendar c ON c.service_id = t.service_id
        WHERE t.route_id = $1;
        ",
    )
    .bind(route_id)
    .fetch_all(executor)
    .await
    .map_err(convert_error)
}

#[derive(Debug, Clone, sqlx::FromRow)]
pub struct DepartureBoundsRow {
    pub first_departure: Option<i32>,
    pub last_departure: Option<i32>,
    pub trip_count: i64,
}

/// Earliest (morning, >= 05:00) and latest departure over a set of trips.
/// The 00:00-04:59 band belongs to the previous service day in GTFS terms.
pub async fn departure_bounds<'c, E>(
    executor: E,
    trip_ids: &[String],
) -> Result<DepartureBoundsRow>
where
    E: Executor<'c, Database = Postgres>,
{
    sqlx::query_as(
        "
        SELECT
            MIN(departure_seconds) FILTER (WHERE departure_seconds >= 18000)
                AS first_departure,
            MAX(departure_seconds) AS last_departure,
            COUNT(DISTINCT trip_id) AS trip_count
        FROM gtfs_stop_times
        WHERE trip_id = ANY($1);
        ",
    )
    .bind(trip_ids)
    .fetch_one(executor)
    .await
    .map_err(convert_error)
}
