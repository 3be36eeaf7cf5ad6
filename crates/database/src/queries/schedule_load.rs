//! Bulk reads feeding the in-memory schedule store. The stop_times table is
//! by far the largest and is streamed; the rest fit comfortably in one fetch.

use chrono::NaiveDate;
use futures::stream::BoxStream;
use sqlx::{Executor, PgPool, Postgres};

use crate::data_model::calendar::{CalendarExceptionRow, CalendarRow};
use crate::data_model::transfer::CorrespondenceRow;
use crate::Result;

use super::convert_error;

#[derive(Debug, Clone, sqlx::FromRow)]
pub struct StoreStopRow {
    pub id: String,
    pub name: Option<String>,
    pub lat: Option<f64>,
    pub lon: Option<f64>,
    pub location_type: i16,
    pub parent_station_id: Option<String>,
}

pub async fn stops<'c, E>(executor: E) -> Result<Vec<StoreStopRow>>
where
    E: Executor<'c, Database = Postgres>,
{
    sqlx::query_as(
        "
        SELECT id, name, lat, lon, location_type, parent_station_id
        FROM gtfs_stops;
        ",
    )
    .fetch_all(executor)
    .await
    .map_err(convert_error)
}

#[derive(Debug, Clone, sqlx::FromRow)]
pub struct StoreRouteRow {
    pub id: String,
    pub short_name: Option<String>,
    pub color: Option<String>,
    pub route_type: Option<i16>,
}

pub async fn routes<'c, E>(executor: E) -> Result<Vec<StoreRouteRow>>
where
    E: Executor<'c, Database = Postgres>,
{
    sqlx::query_as("SELECT id, short_name, color, route_type FROM gtfs_routes;")
        .fetch_all(executor)
        .await
        .map_err(convert_error)
}

/// Calendars whose validity window covers the given date.
pub async fn calendars<'c, E>(executor: E, today: NaiveDate) -> Result<Vec<CalendarRow>>
where
    E: Executor<'c, Database = Postgres>,
{
    sqlx::query_as(
        "
        SELECT service_id, monday, tuesday, wednesday, thursday, friday,
               saturday, sunday, start_date, end_date
        FROM gtfs_calendar
        WHERE start_date <= $1 AND end_date >= $1;
        ",
    )
    .bind(today)
    .fetch_all(executor)
    .await
    .map_err(convert_error)
}

pub async fn calendar_exceptions<'c, E>(executor: E) -> Result<Vec<CalendarExceptionRow>>
where
    E: Executor<'c, Database = Postgres>,
{
    sqlx::query_as("SELECT service_id, date, exception_type FROM gtfs_calendar_dates;")
        .fetch_all(executor)
        .await
        .map_err(convert_error)
}

#[derive(Debug, Clone, sqlx::FromRow)]
pub struct StoreTripRow {
    pub id: String,
    pub route_id: String,
    pub service_id: Option<String>,
    pub headsign: Option<String>,
}

pub async fn trips<'c, E>(executor: E) -> Result<Vec<StoreTripRow>>
where
    E: Executor<'c, Database = Postgres>,
{
    sqlx::query_as("SELECT id, route_id, service_id, headsign FROM gtfs_trips;")
        .fetch_all(executor)
        .await
        .map_err(convert_error)
}

#[derive(Debug, Clone, sqlx::FromRow)]
pub struct StoreStopTimeRow {
    pub trip_id: String,
    pub stop_id: String,
    pub arrival_seconds: Option<i32>,
    pub departure_seconds: Option<i32>,
}

/// Streaming read over ~millions of rows, ordered so the consumer can build
/// per-trip sequences in a single pass.
pub fn stop_times_stream(pool: &PgPool) -> BoxStream<'_, sqlx::Result<StoreStopTimeRow>> {
    sqlx::query_as(
        "
        SELECT trip_id, stop_id, arrival_seconds, departure_seconds
        FROM gtfs_stop_times
        ORDER BY trip_id, stop_sequence;
        ",
    )
    .fetch(pool)
}

pub async fn correspondences<'c, E>(executor: E) -> Result<Vec<CorrespondenceRow>>
where
    E: Executor<'c, Database = Postgres>,
{
    sqlx::query_as(
        "
        SELECT from_stop_id, to_stop_id, distance_m, walk_time_s, source
        FROM stop_correspondence
        WHERE walk_time_s IS NOT NULL;
        ",
    )
    .fetch_all(executor)
    .await
    .map_err(convert_error)
}
