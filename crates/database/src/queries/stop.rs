use model::stop::{Stop, StopAccess, StopPlatform, StopVestibule};
use model::transfer::Correspondence;
use sqlx::{Executor, Postgres};
use utility::geo;

use crate::data_model::stop::{
    StopAccessRow, StopPlatformRow, StopRow, StopVestibuleRow,
};
use crate::data_model::transfer::CorrespondenceRow;
use crate::Result;

use super::convert_error;

const STOP_COLUMNS: &str = "
    id, code, name, lat, lon, location_type, parent_station_id, zone_id,
    province, lineas, accesibilidad, cor_bus, cor_metro, cor_ml,
    cor_cercanias, cor_tranvia
";

pub async fn get<'c, E>(executor: E, id: &str) -> Result<Stop>
where
    E: Executor<'c, Database = Postgres>,
{
    let row: StopRow = sqlx::query_as(&format!(
        "SELECT {STOP_COLUMNS} FROM gtfs_stops WHERE id = $1;"
    ))
    .bind(id)
    .fetch_one(executor)
    .await
    .map_err(convert_error)?;
    Ok(row.into())
}

pub async fn children<'c, E>(executor: E, parent_id: &str) -> Result<Vec<String>>
where
    E: Executor<'c, Database = Postgres>,
{
    sqlx::query_scalar("SELECT id FROM gtfs_stops WHERE parent_station_id = $1;")
        .bind(parent_id)
        .fetch_all(executor)
        .await
        .map_err(convert_error)
}

/// IDs matching a LIKE pattern, excluding one exact ID. Used by the FGC
/// platform-suffix heuristic (`FGC_PC` → `FGC_PC1`, `FGC_PC2`, …).
pub async fn ids_like<'c, E>(
    executor: E,
    pattern: &str,
    exclude: &str,
) -> Result<Vec<String>>
where
    E: Executor<'c, Database = Postgres>,
{
    sqlx::query_scalar("SELECT id FROM gtfs_stops WHERE id LIKE $1 AND id != $2;")
        .bind(pattern)
        .bind(exclude)
        .fetch_all(executor)
        .await
        .map_err(convert_error)
}

pub async fn exists<'c, E>(executor: E, id: &str) -> Result<bool>
where
    E: Executor<'c, Database = Postgres>,
{
    sqlx::query_scalar("SELECT EXISTS(SELECT 1 FROM gtfs_stops WHERE id = $1);")
        .bind(id)
        .fetch_one(executor)
        .await
        .map_err(convert_error)
}

pub async fn search<'c, E>(
    executor: E,
    name_pattern: Option<&str>,
    id_prefix: Option<&str>,
    limit: i64,
) -> Result<Vec<Stop>>
where
    E: Executor<'c, Database = Postgres>,
{
    let rows: Vec<StopRow> = sqlx::query_as(&format!(
        "
        SELECT {STOP_COLUMNS}
        FROM gtfs_stops
        WHERE ($1::text IS NULL OR name ILIKE $1)
          AND ($2::text IS NULL OR id LIKE $2)
        ORDER BY name
        LIMIT $3;
        "
    ))
    .bind(name_pattern.map(|p| format!("%{p}%")))
    .bind(id_prefix.map(|p| format!("{p}%")))
    .bind(limit)
    .fetch_all(executor)
    .await
    .map_err(convert_error)?;
    Ok(rows.into_iter().map(Into::into).collect())
}

/// Stations (or parentless stops) near a point, ordered by distance.
/// Bounding-box prefilter in SQL, exact haversine in Rust.
pub async fn nearby<'c, E>(
    executor: E,
    lat: f64,
    lon: f64,
    radius_m: f64,
    limit: usize,
) -> Result<Vec<(Stop, f64)>>
where
    E: Executor<'c, Database = Postgres>,
{
    let ((min_lat, min_lon), (max_lat, max_lon)) = geo::bounding_box(lat, lon, radius_m);

    let rows: Vec<StopRow> = sqlx::query_as(&format!(
        "
        SELECT {STOP_COLUMNS}
        FROM gtfs_stops
        WHERE lat BETWEEN $1 AND $2
          AND lon BETWEEN $3 AND $4
          AND (location_type = 1 OR parent_station_id IS NULL)
          AND id NOT LIKE '%_E.%'
          AND id NOT LIKE 'TMB_METRO_2.%';
        "
    ))
    .bind(min_lat)
    .bind(max_lat)
    .bind(min_lon)
    .bind(max_lon)
    .fetch_all(executor)
    .await
    .map_err(convert_error)?;

    let mut stops: Vec<(Stop, f64)> = rows
        .into_iter()
        .map(Stop::from)
        .map(|stop| {
            let distance = geo::haversine_m(lat, lon, stop.lat, stop.lon);
            (stop, distance)
        })
        .filter(|(_, distance)| *distance <= radius_m)
        .collect();
    stops.sort_by(|a, b| a.1.total_cmp(&b.1));
    stops.truncate(limit);
    Ok(stops)
}

pub async fn platforms<'c, E>(executor: E, stop_id: &str) -> Result<Vec<StopPlatform>>
where
    E: Executor<'c, Database = Postgres>,
{
    let rows: Vec<StopPlatformRow> = sqlx::query_as(
        "
        SELECT stop_id, lines, lat, lon, color, source
        FROM stop_platforms
        WHERE stop_id = $1
        ORDER BY lines;
        ",
    )
    .bind(stop_id)
    .fetch_all(executor)
    .await
    .map_err(convert_error)?;
    Ok(rows.into_iter().map(Into::into).collect())
}

pub async fn accesses<'c, E>(executor: E, stop_id: &str) -> Result<Vec<StopAccess>>
where
    E: Executor<'c, Database = Postgres>,
{
    let rows: Vec<StopAccessRow> = sqlx::query_as(
        "SELECT stop_id, name, lat, lon FROM stop_accesses WHERE stop_id = $1;",
    )
    .bind(stop_id)
    .fetch_all(executor)
    .await
    .map_err(convert_error)?;
    Ok(rows.into_iter().map(Into::into).collect())
}

pub async fn vestibules<'c, E>(executor: E, stop_id: &str) -> Result<Vec<StopVestibule>>
where
    E: Executor<'c, Database = Postgres>,
{
    let rows: Vec<StopVestibuleRow> = sqlx::query_as(
        "SELECT stop_id, name, lat, lon FROM stop_vestibules WHERE stop_id = $1;",
    )
    .bind(stop_id)
    .fetch_all(executor)
    .await
    .map_err(convert_error)?;
    Ok(rows.into_iter().map(Into::into).collect())
}

pub async fn correspondences_from<'c, E>(
    executor: E,
    stop_id: &str,
) -> Result<Vec<Correspondence>>
where
    E: Executor<'c, Database = Postgres>,
{
    let rows: Vec<CorrespondenceRow> = sqlx::query_as(
        "
        SELECT from_stop_id, to_stop_id, distance_m, walk_time_s, source
        FROM stop_correspondence
        WHERE from_stop_id = $1;
        ",
    )
    .bind(stop_id)
    .fetch_all(executor)
    .await
    .map_err(convert_error)?;
    Ok(rows.into_iter().map(Into::into).collect())
}
