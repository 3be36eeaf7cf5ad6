//! Platform-history learning: station × route × headsign → platform counts.

use chrono::{Duration, NaiveDate};
use sqlx::{Executor, Postgres};

use crate::Result;

use super::convert_error;

/// Record one observation. Race safety comes entirely from the database's
/// upsert on the business key.
pub async fn record<'c, E>(
    executor: E,
    stop_id: &str,
    route_short_name: &str,
    headsign: &str,
    platform: &str,
    observation_date: NaiveDate,
) -> Result<()>
where
    E: Executor<'c, Database = Postgres>,
{
    sqlx::query(
        "
        INSERT INTO gtfs_rt_platform_history(
            stop_id, route_short_name, headsign, platform, count,
            observation_date, last_seen
        )
        VALUES ($1, $2, $3, $4, 1, $5, NOW())
        ON CONFLICT (stop_id, route_short_name, headsign, platform, observation_date)
        DO UPDATE SET
            count = gtfs_rt_platform_history.count + 1,
            last_seen = NOW();
        ",
    )
    .bind(stop_id)
    .bind(route_short_name)
    .bind(headsign)
    .bind(platform)
    .bind(observation_date)
    .execute(executor)
    .await
    .map_err(convert_error)?;
    Ok(())
}

/// The platform with the highest total count over all history for a stop and
/// route, requiring at least `min_count` observations before trusting it.
pub async fn predict<'c, E>(
    executor: E,
    stop_id: &str,
    route_short_name: &str,
    min_count: i64,
) -> Result<Option<String>>
where
    E: Executor<'c, Database = Postgres>,
{
    let row: Option<(String, i64)> = sqlx::query_as(
        "
        SELECT platform, SUM(count) AS total
        FROM gtfs_rt_platform_history
        WHERE stop_id = $1 AND route_short_name = $2
        GROUP BY platform
        ORDER BY total DESC
        LIMIT 1;
        ",
    )
    .bind(stop_id)
    .bind(route_short_name)
    .fetch_optional(executor)
    .await
    .map_err(convert_error)?;

    Ok(row.and_then(|(platform, total)| (total >= min_count).then_some(platform)))
}

/// Read-time prediction for the departures board. Tries today with the exact
/// headsign, then today without it, then yesterday, same order.
pub async fn predict_for_departure<'c, E>(
    executor: E,
    stop_id: &str,
    route_short_name: &str,
    headsign: &str,
    today: NaiveDate,
) -> Result<Option<String>>
where
    E: Executor<'c, Database = Postgres>,
{
    let yesterday = today - Duration::days(1);
    let row: Option<(String,)> = sqlx::query_as(
        "
        SELECT platform
        FROM gtfs_rt_platform_history
        WHERE stop_id = $1
          AND route_short_name = $2
          AND observation_date IN ($4, $5)
        ORDER BY
            (observation_date = $4) DESC,
            (headsign = $3) DESC,
            count DESC
        LIMIT 1;
        ",
    )
    .bind(stop_id)
    .bind(route_short_name)
    .bind(headsign)
    .bind(today)
    .bind(yesterday)
    .fetch_optional(executor)
    .await
    .map_err(convert_error)?;
    Ok(row.map(|(platform,)| platform))
}

/// Drop observations older than the retention window (30 days).
pub async fn cleanup<'c, E>(executor: E, keep_days: i64) -> Result<u64>
where
    E: Executor<'c, Database = Postgres>,
{
    sqlx::query(
        "
        DELETE FROM gtfs_rt_platform_history
        WHERE observation_date < CURRENT_DATE - $1::int;
        ",
    )
    .bind(keep_days as i32)
    .execute(executor)
    .await
    .map_err(convert_error)
    .map(|result| result.rows_affected())
}
