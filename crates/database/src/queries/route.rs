use model::route::{Route, RouteFrequency, StopRouteSequence};
use sqlx::{Executor, Postgres};
use utility::holidays::DayType;

use crate::data_model::route::{RouteFrequencyRow, RouteRow, StopRouteSequenceRow};
use crate::Result;

use super::convert_error;

const ROUTE_COLUMNS: &str = "
    id, agency_id, network_id, short_name, long_name, route_type, color,
    text_color, is_circular
";

pub async fn get<'c, E>(executor: E, id: &str) -> Result<Route>
where
    E: Executor<'c, Database = Postgres>,
{
    let row: RouteRow = sqlx::query_as(&format!(
        "SELECT {ROUTE_COLUMNS} FROM gtfs_routes WHERE id = $1;"
    ))
    .bind(id)
    .fetch_one(executor)
    .await
    .map_err(convert_error)?;
    Ok(row.into())
}

pub async fn list<'c, E>(
    executor: E,
    agency_id: Option<&str>,
    network_id: Option<&str>,
    search: Option<&str>,
) -> Result<Vec<Route>>
where
    E: Executor<'c, Database = Postgres>,
{
    let rows: Vec<RouteRow> = sqlx::query_as(&format!(
        "
        SELECT {ROUTE_COLUMNS}
        FROM gtfs_routes
        WHERE ($1::text IS NULL OR agency_id = $1)
          AND ($2::text IS NULL OR network_id = $2)
          AND ($3::text IS NULL OR short_name ILIKE $3 OR long_name ILIKE $3)
        ORDER BY short_name;
        "
    ))
    .bind(agency_id)
    .bind(network_id)
    .bind(search.map(|s| format!("%{s}%")))
    .fetch_all(executor)
    .await
    .map_err(convert_error)?;
    Ok(rows.into_iter().map(Into::into).collect())
}

pub async fn by_short_name<'c, E>(
    executor: E,
    short_name: &str,
    network_id: Option<&str>,
) -> Result<Vec<Route>>
where
    E: Executor<'c, Database = Postgres>,
{
    let rows: Vec<RouteRow> = sqlx::query_as(&format!(
        "
        SELECT {ROUTE_COLUMNS}
        FROM gtfs_routes
        WHERE TRIM(short_name) = $1
          AND ($2::text IS NULL OR network_id = $2);
        "
    ))
    .bind(short_name)
    .bind(network_id)
    .fetch_all(executor)
    .await
    .map_err(convert_error)?;
    Ok(rows.into_iter().map(Into::into).collect())
}

/// Frequency windows for one route. Rows with invalid day types, unparsable
/// times or a zero headway were rejected at import; any that slipped through
/// are dropped here and logged.
pub async fn frequencies<'c, E>(executor: E, route_id: &str) -> Result<Vec<RouteFrequency>>
where
    E: Executor<'c, Database = Postgres>,
{
    let rows: Vec<RouteFrequencyRow> = sqlx::query_as(
        "
        SELECT route_id, day_type, start_time, end_time, headway_secs
        FROM route_frequencies
        WHERE route_id = $1
        ORDER BY day_type, start_time;
        ",
    )
    .bind(route_id)
    .fetch_all(executor)
    .await
    .map_err(convert_error)?;

    let mut frequencies = Vec::with_capacity(rows.len());
    for row in rows {
        let route_id = row.route_id.clone();
        match row.into_frequency() {
            Some(frequency) => frequencies.push(frequency),
            None => log::warn!("discarding invalid frequency row for {route_id}"),
        }
    }
    Ok(frequencies)
}

pub async fn frequencies_for_day<'c, E>(
    executor: E,
    route_id: &str,
    day_type: DayType,
) -> Result<Vec<RouteFrequency>>
where
    E: Executor<'c, Database = Postgres>,
{
    let rows: Vec<RouteFrequencyRow> = sqlx::query_as(
        "
        SELECT route_id, day_type, start_time, end_time, headway_secs
        FROM route_frequencies
        WHERE route_id = $1 AND day_type = $2
        ORDER BY start_time;
        ",
    )
    .bind(route_id)
    .bind(day_type.as_str())
    .fetch_all(executor)
    .await
    .map_err(convert_error)?;
    Ok(rows.into_iter().filter_map(|row| row.into_frequency()).collect())
}

pub async fn routes_at_stops<'c, E>(executor: E, stop_ids: &[String]) -> Result<Vec<Route>>
where
    E: Executor<'c, Database = Postgres>,
{
    let rows: Vec<RouteRow> = sqlx::query_as(&format!(
        "
        SELECT DISTINCT {ROUTE_COLUMNS}
        FROM gtfs_routes
        JOIN stop_route_sequence srs ON srs.route_id = gtfs_routes.id
        WHERE srs.stop_id = ANY($1);
        "
    ))
    .bind(stop_ids)
    .fetch_all(executor)
    .await
    .map_err(convert_error)?;
    Ok(rows.into_iter().map(Into::into).collect())
}

pub async fn route_ids_at_stops<'c, E>(
    executor: E,
    stop_ids: &[String],
) -> Result<Vec<String>>
where
    E: Executor<'c, Database = Postgres>,
{
    sqlx::query_scalar(
        "SELECT DISTINCT route_id FROM stop_route_sequence WHERE stop_id = ANY($1);",
    )
    .bind(stop_ids)
    .fetch_all(executor)
    .await
    .map_err(convert_error)
}

/// Ordered stop sequence of a route.
pub async fn stop_sequence<'c, E>(
    executor: E,
    route_id: &str,
) -> Result<Vec<StopRouteSequence>>
where
    E: Executor<'c, Database = Postgres>,
{
    let rows: Vec<StopRouteSequenceRow> = sqlx::query_as(
        "
        SELECT route_id, stop_id, sequence
        FROM stop_route_sequence
        WHERE route_id = $1
        ORDER BY sequence;
        ",
    )
    .bind(route_id)
    .fetch_all(executor)
    .await
    .map_err(convert_error)?;
    Ok(rows.into_iter().map(Into::into).collect())
}

/// Stops of a route joined with their sequence positions, in order.
pub async fn stops_of_route<'c, E>(
    executor: E,
    route_id: &str,
) -> Result<Vec<(model::stop::Stop, i32)>>
where
    E: Executor<'c, Database = Postgres>,
{
    #[derive(sqlx::FromRow)]
    struct Row {
        #[sqlx(flatten)]
        stop: crate::data_model::stop::StopRow,
        sequence: i32,
    }

    let rows: Vec<Row> = sqlx::query_as(
        "
        SELECT
            s.id, s.code, s.name, s.lat, s.lon, s.location_type,
            s.parent_station_id, s.zone_id, s.province, s.lineas,
            s.accesibilidad, s.cor_bus, s.cor_metro, s.cor_ml,
            s.cor_cercanias, s.cor_tranvia,
            srs.sequence
        FROM gtfs_stops s
        JOIN stop_route_sequence srs ON srs.stop_id = s.id
        WHERE srs.route_id = $1
        ORDER BY srs.sequence;
        ",
    )
    .bind(route_id)
    .fetch_all(executor)
    .await
    .map_err(convert_error)?;
    Ok(rows.into_iter().map(|row| (row.stop.into(), row.sequence)).collect())
}

pub async fn sequence_at_stop<'c, E>(
    executor: E,
    route_id: &str,
    stop_id: &str,
) -> Result<Option<StopRouteSequence>>
where
    E: Executor<'c, Database = Postgres>,
{
    let row: Option<StopRouteSequenceRow> = sqlx::query_as(
        "
        SELECT route_id, stop_id, sequence
        FROM stop_route_sequence
        WHERE route_id = $1 AND stop_id = $2;
        ",
    )
    .bind(route_id)
    .bind(stop_id)
    .fetch_optional(executor)
    .await
    .map_err(convert_error)?;
    Ok(row.map(Into::into))
}
