use chrono::Utc;
use model::realtime::{Alert, AlertEnrichment, StopTimeUpdate, TripUpdate, VehiclePosition};
use sqlx::{Executor, PgPool, Postgres};

use crate::data_model::realtime::{
    cause_to_str, effect_to_str, AlertEntityRow, AlertRow, StopTimeUpdateRow,
    TripUpdateRow, VehiclePositionRow,
};
use crate::Result;

use super::convert_error;

pub async fn upsert_vehicle_position<'c, E>(
    executor: E,
    position: &VehiclePosition,
) -> Result<()>
where
    E: Executor<'c, Database = Postgres>,
{
    sqlx::query(
        "
        INSERT INTO gtfs_rt_vehicle_positions(
            vehicle_id, trip_id, latitude, longitude, current_status,
            stop_id, label, platform, timestamp, updated_at
        )
        VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, NOW())
        ON CONFLICT (vehicle_id)
        DO UPDATE SET
            trip_id = EXCLUDED.trip_id,
            latitude = EXCLUDED.latitude,
            longitude = EXCLUDED.longitude,
            current_status = EXCLUDED.current_status,
            stop_id = EXCLUDED.stop_id,
            label = EXCLUDED.label,
            platform = EXCLUDED.platform,
            timestamp = EXCLUDED.timestamp,
            updated_at = EXCLUDED.updated_at;
        ",
    )
    .bind(&position.vehicle_id)
    .bind(&position.trip_id)
    .bind(position.lat)
    .bind(position.lon)
    .bind(position.status.as_str())
    .bind(&position.stop_id)
    .bind(&position.label)
    .bind(&position.platform)
    .bind(position.timestamp)
    .execute(executor)
    .await
    .map_err(convert_error)?;
    Ok(())
}

/// Upsert one trip update and atomically replace its stop-time-update
/// children. Runs inside its own transaction.
pub async fn put_trip_update(pool: &PgPool, update: &TripUpdate) -> Result<()> {
    let mut tx = pool.begin().await.map_err(convert_error)?;

    sqlx::query("DELETE FROM gtfs_rt_stop_time_updates WHERE trip_id = $1;")
        .bind(&update.trip_id)
        .execute(&mut *tx)
        .await
        .map_err(convert_error)?;

    sqlx::query(
        "
        INSERT INTO gtfs_rt_trip_updates(
            trip_id, delay, vehicle_id, wheelchair_accessible, timestamp, updated_at
        )
        VALUES ($1, $2, $3, $4, $5, NOW())
        ON CONFLICT (trip_id)
        DO UPDATE SET
            delay = EXCLUDED.delay,
            vehicle_id = EXCLUDED.vehicle_id,
            wheelchair_accessible = EXCLUDED.wheelchair_accessible,
            timestamp = EXCLUDED.timestamp,
            updated_at = EXCLUDED.updated_at;
        ",
    )
    .bind(&update.trip_id)
    .bind(update.delay_secs)
    .bind(&update.vehicle_id)
    .bind(update.wheelchair_accessible)
    .bind(update.timestamp)
    .execute(&mut *tx)
    .await
    .map_err(convert_error)?;

    for stop_time in &update.stop_time_updates {
        insert_stop_time_update(&mut *tx, stop_time).await?;
    }

    tx.commit().await.map_err(convert_error)
}

async fn insert_stop_time_update<'c, E>(executor: E, update: &StopTimeUpdate) -> Result<()>
where
    E: Executor<'c, Database = Postgres>,
{
    sqlx::query(
        "
        INSERT INTO gtfs_rt_stop_time_updates(
            trip_id, stop_id, arrival_delay, arrival_time, departure_delay,
            departure_time, platform, occupancy_percent, occupancy_per_car, headsign
        )
        VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10);
        ",
    )
    .bind(&update.trip_id)
    .bind(&update.stop_id)
    .bind(update.arrival_delay)
    .bind(update.arrival_time)
    .bind(update.departure_delay)
    .bind(update.departure_time)
    .bind(&update.platform)
    .bind(update.occupancy_percent)
    .bind(&update.occupancy_per_car)
    .bind(&update.headsign)
    .execute(executor)
    .await
    .map_err(convert_error)?;
    Ok(())
}

pub async fn get_alert<'c, E>(executor: E, alert_id: &str) -> Result<Option<AlertRow>>
where
    E: Executor<'c, Database = Postgres>,
{
    sqlx::query_as(
        "
        SELECT alert_id, cause, effect, header_text, description_text, url,
               active_period_start, active_period_end,
               ai_severity, ai_status, ai_summary, ai_affected_segments,
               ai_processed_at
        FROM gtfs_rt_alerts
        WHERE alert_id = $1;
        ",
    )
    .bind(alert_id)
    .fetch_optional(executor)
    .await
    .map_err(convert_error)
}

/// Upsert one alert and replace its informed entities. The enrichment columns
/// carry whatever the caller decided (fresh analysis or preserved values).
pub async fn put_alert(
    pool: &PgPool,
    alert: &Alert,
    enrichment: &AlertEnrichment,
    source: &str,
) -> Result<()> {
    let mut tx = pool.begin().await.map_err(convert_error)?;

    sqlx::query("DELETE FROM gtfs_rt_alert_entities WHERE alert_id = $1;")
        .bind(&alert.alert_id)
        .execute(&mut *tx)
        .await
        .map_err(convert_error)?;

    sqlx::query(
        "
        INSERT INTO gtfs_rt_alerts(
            alert_id, cause, effect, header_text, description_text, url,
            active_period_start, active_period_end, source, timestamp, updated_at,
            ai_severity, ai_status, ai_summary, ai_affected_segments, ai_processed_at
        )
        VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, NOW(), NOW(),
                $10, $11, $12, $13, $14)
        ON CONFLICT (alert_id)
        DO UPDATE SET
            cause = EXCLUDED.cause,
            effect = EXCLUDED.effect,
            header_text = EXCLUDED.header_text,
            description_text = EXCLUDED.description_text,
            url = EXCLUDED.url,
            active_period_start = EXCLUDED.active_period_start,
            active_period_end = EXCLUDED.active_period_end,
            timestamp = EXCLUDED.timestamp,
            updated_at = EXCLUDED.updated_at,
            ai_severity = EXCLUDED.ai_severity,
            ai_status = EXCLUDED.ai_status,
            ai_summary = EXCLUDED.ai_summary,
            ai_affected_segments = EXCLUDED.ai_affected_segments,
            ai_processed_at = EXCLUDED.ai_processed_at;
        ",
    )
    .bind(&alert.alert_id)
    .bind(cause_to_str(alert.cause))
    .bind(effect_to_str(alert.effect))
    .bind(&alert.header_text)
    .bind(&alert.description_text)
    .bind(&alert.url)
    .bind(alert.active_period_start)
    .bind(alert.active_period_end)
    .bind(source)
    .bind(&enrichment.ai_severity)
    .bind(&enrichment.ai_status)
    .bind(&enrichment.ai_summary)
    .bind(&enrichment.ai_affected_segments)
    .bind(enrichment.ai_processed_at)
    .execute(&mut *tx)
    .await
    .map_err(convert_error)?;

    for entity in &alert.informed_entities {
        sqlx::query(
            "
            INSERT INTO gtfs_rt_alert_entities(
                alert_id, route_id, route_short_name, stop_id, trip_id,
                agency_id, route_type
            )
            VALUES ($1, $2, $3, $4, $5, $6, $7);
            ",
        )
        .bind(&alert.alert_id)
        .bind(&entity.route_id)
        .bind(&entity.route_short_name)
        .bind(&entity.stop_id)
        .bind(&entity.trip_id)
        .bind(&entity.agency_id)
        .bind(entity.route_type)
        .execute(&mut *tx)
        .await
        .map_err(convert_error)?;
    }

    tx.commit().await.map_err(convert_error)
}

#[derive(Debug, Default, Clone, Copy)]
pub struct CleanupCounts {
    pub trip_updates: u64,
    pub orphan_stop_time_updates: u64,
    pub expired_alerts: u64,
    pub stale_alerts: u64,
}

/// Evict realtime rows no feed is refreshing anymore. Trip updates cascade to
/// their stop-time updates; the orphan pass covers rows predating the cascade.
pub async fn cleanup_stale(pool: &PgPool) -> Result<CleanupCounts> {
    let trip_updates = sqlx::query(
        "DELETE FROM gtfs_rt_trip_updates WHERE updated_at < NOW() - INTERVAL '2 hours';",
    )
    .execute(pool)
    .await
    .map_err(convert_error)?
    .rows_affected();

    let orphan_stop_time_updates = sqlx::query(
        "
        DELETE FROM gtfs_rt_stop_time_updates
        WHERE trip_id NOT IN (SELECT trip_id FROM gtfs_rt_trip_updates);
        ",
    )
    .execute(pool)
    .await
    .map_err(convert_error)?
    .rows_affected();

    let expired_alerts = sqlx::query(
        "
        DELETE FROM gtfs_rt_alerts
        WHERE active_period_end IS NOT NULL AND active_period_end < NOW();
        ",
    )
    .execute(pool)
    .await
    .map_err(convert_error)?
    .rows_affected();

    let stale_alerts = sqlx::query(
        "
        DELETE FROM gtfs_rt_alerts
        WHERE active_period_end IS NULL
          AND updated_at < NOW() - INTERVAL '12 hours'
          AND source != 'manual';
        ",
    )
    .execute(pool)
    .await
    .map_err(convert_error)?
    .rows_affected();

    Ok(CleanupCounts {
        trip_updates,
        orphan_stop_time_updates,
        expired_alerts,
        stale_alerts,
    })
}

/// One bulk pass copying platforms from vehicle positions into matching
/// stop-time updates of the same trip and stop.
pub async fn correlate_platforms<'c, E>(executor: E) -> Result<u64>
where
    E: Executor<'c, Database = Postgres>,
{
    sqlx::query(
        "
        UPDATE gtfs_rt_stop_time_updates stu
        SET platform = vp.platform
        FROM gtfs_rt_vehicle_positions vp
        WHERE stu.trip_id = vp.trip_id
          AND stu.stop_id = vp.stop_id
          AND stu.platform IS NULL
          AND vp.platform IS NOT NULL
          AND vp.stop_id IS NOT NULL;
        ",
    )
    .execute(executor)
    .await
    .map_err(convert_error)
    .map(|result| result.rows_affected())
}

/// Distinct stops of a prefix still lacking a platform on some update.
pub async fn platformless_stops<'c, E>(executor: E, prefix: &str) -> Result<Vec<String>>
where
    E: Executor<'c, Database = Postgres>,
{
    sqlx::query_scalar(
        "
        SELECT DISTINCT stop_id
        FROM gtfs_rt_stop_time_updates
        WHERE platform IS NULL AND stop_id LIKE $1;
        ",
    )
    .bind(format!("{prefix}%"))
    .fetch_all(executor)
    .await
    .map_err(convert_error)
}

pub async fn set_platform<'c, E>(
    executor: E,
    trip_id: &str,
    stop_id: &str,
    platform: &str,
) -> Result<u64>
where
    E: Executor<'c, Database = Postgres>,
{
    sqlx::query(
        "
        UPDATE gtfs_rt_stop_time_updates
        SET platform = $3
        WHERE trip_id = $1 AND stop_id = $2 AND platform IS NULL;
        ",
    )
    .bind(trip_id)
    .bind(stop_id)
    .bind(platform)
    .execute(executor)
    .await
    .map_err(convert_error)
    .map(|result| result.rows_affected())
}

pub async fn platformless_updates<'c, E>(executor: E) -> Result<Vec<StopTimeUpdateRow>>
where
    E: Executor<'c, Database = Postgres>,
{
    sqlx::query_as(
        "
        SELECT trip_id, stop_id, arrival_delay, arrival_time, departure_delay,
               departure_time, platform, occupancy_percent, occupancy_per_car,
               headsign
        FROM gtfs_rt_stop_time_updates
        WHERE platform IS NULL;
        ",
    )
    .fetch_all(executor)
    .await
    .map_err(convert_error)
}

pub async fn route_id_of_trip<'c, E>(executor: E, trip_id: &str) -> Result<Option<String>>
where
    E: Executor<'c, Database = Postgres>,
{
    sqlx::query_scalar("SELECT route_id FROM gtfs_trips WHERE id = $1;")
        .bind(trip_id)
        .fetch_optional(executor)
        .await
        .map_err(convert_error)
}

pub async fn headsign_of_trip<'c, E>(executor: E, trip_id: &str) -> Result<Option<String>>
where
    E: Executor<'c, Database = Postgres>,
{
    let headsign: Option<Option<String>> =
        sqlx::query_scalar("SELECT headsign FROM gtfs_trips WHERE id = $1;")
            .bind(trip_id)
            .fetch_optional(executor)
            .await
            .map_err(convert_error)?;
    Ok(headsign.flatten())
}

pub async fn vehicle_positions_for_trips<'c, E>(
    executor: E,
    trip_ids: &[String],
) -> Result<Vec<VehiclePosition>>
where
    E: Executor<'c, Database = Postgres>,
{
    let rows: Vec<VehiclePositionRow> = sqlx::query_as(
        "
        SELECT vehicle_id, trip_id, latitude, longitude, current_status,
               stop_id, label, platform, timestamp, updated_at
        FROM gtfs_rt_vehicle_positions
        WHERE trip_id = ANY($1);
        ",
    )
    .bind(trip_ids)
    .fetch_all(executor)
    .await
    .map_err(convert_error)?;
    Ok(rows.into_iter().map(Into::into).collect())
}

pub async fn trip_updates_for_trips<'c, E>(
    executor: E,
    trip_ids: &[String],
) -> Result<Vec<TripUpdate>>
where
    E: Executor<'c, Database = Postgres>,
{
    let rows: Vec<TripUpdateRow> = sqlx::query_as(
        "
        SELECT trip_id, delay, vehicle_id, wheelchair_accessible, timestamp, updated_at
        FROM gtfs_rt_trip_updates
        WHERE trip_id = ANY($1);
        ",
    )
    .bind(trip_ids)
    .fetch_all(executor)
    .await
    .map_err(convert_error)?;
    Ok(rows.into_iter().map(Into::into).collect())
}

pub async fn stop_time_updates_at_stops<'c, E>(
    executor: E,
    trip_ids: &[String],
    stop_ids: &[String],
) -> Result<Vec<StopTimeUpdate>>
where
    E: Executor<'c, Database = Postgres>,
{
    let rows: Vec<StopTimeUpdateRow> = sqlx::query_as(
        "
        SELECT trip_id, stop_id, arrival_delay, arrival_time, departure_delay,
               departure_time, platform, occupancy_percent, occupancy_per_car,
               headsign
        FROM gtfs_rt_stop_time_updates
        WHERE trip_id = ANY($1) AND stop_id = ANY($2);
        ",
    )
    .bind(trip_ids)
    .bind(stop_ids)
    .fetch_all(executor)
    .await
    .map_err(convert_error)?;
    Ok(rows.into_iter().map(Into::into).collect())
}

/// Most recent platform seen per stop. RT trip IDs of some operators never
/// match the static GTFS trips, so a stop-indexed fallback is needed.
pub async fn recent_platforms_by_stop<'c, E>(
    executor: E,
    stop_ids: &[String],
) -> Result<Vec<(String, String)>>
where
    E: Executor<'c, Database = Postgres>,
{
    let rows: Vec<StopTimeUpdateRow> = sqlx::query_as(
        "
        SELECT trip_id, stop_id, arrival_delay, arrival_time, departure_delay,
               departure_time, platform, occupancy_percent, occupancy_per_car,
               headsign
        FROM gtfs_rt_stop_time_updates
        WHERE stop_id = ANY($1) AND platform IS NOT NULL
        ORDER BY arrival_time DESC NULLS LAST
        LIMIT 100;
        ",
    )
    .bind(stop_ids)
    .fetch_all(executor)
    .await
    .map_err(convert_error)?;

    let mut platforms = Vec::new();
    for row in rows {
        if let (Some(stop_id), Some(platform)) = (row.stop_id, row.platform) {
            if !platforms.iter().any(|(existing, _): &(String, String)| existing == &stop_id) {
                platforms.push((stop_id, platform));
            }
        }
    }
    Ok(platforms)
}

/// Alerts currently in their active period.
pub async fn active_alerts<'c, E>(executor: E) -> Result<Vec<Alert>>
where
    E: Executor<'c, Database = Postgres>,
{
    let now = Utc::now();
    let rows: Vec<AlertRow> = sqlx::query_as(
        "
        SELECT alert_id, cause, effect, header_text, description_text, url,
               active_period_start, active_period_end,
               ai_severity, ai_status, ai_summary, ai_affected_segments,
               ai_processed_at
        FROM gtfs_rt_alerts
        WHERE (active_period_start IS NULL OR active_period_start <= $1)
          AND (active_period_end IS NULL OR active_period_end >= $1);
        ",
    )
    .bind(now)
    .fetch_all(executor)
    .await
    .map_err(convert_error)?;
    Ok(rows.into_iter().map(Into::into).collect())
}

pub async fn entities_for_alerts<'c, E>(
    executor: E,
    alert_ids: &[String],
) -> Result<Vec<AlertEntityRow>>
where
    E: Executor<'c, Database = Postgres>,
{
    sqlx::query_as(
        "
        SELECT alert_id, route_id, route_short_name, stop_id, trip_id,
               agency_id, route_type
        FROM gtfs_rt_alert_entities
        WHERE alert_id = ANY($1);
        ",
    )
    .bind(alert_ids)
    .fetch_all(executor)
    .await
    .map_err(convert_error)
}
