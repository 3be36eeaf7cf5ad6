//! Platform post-processing, run after every ingestion tick:
//! 1. correlate platforms from vehicle positions into stop-time updates,
//! 2. fall back to the Renfe visor for stations still missing platforms,
//! 3. predict the remainder from learned history (surfaced as estimates).

use chrono::Utc;
use database::{queries, PgPool};
use utility::holidays::MADRID_TZ;
use utility::ids::{self, Operator};

const MIN_HISTORY_OBSERVATIONS: i64 = 3;

pub async fn post_process(pool: &PgPool, http: &reqwest::Client) {
    match queries::realtime::correlate_platforms(pool).await {
        Ok(0) => {}
        Ok(count) => log::info!("correlated {count} platforms from vehicle positions"),
        Err(why) => log::warn!("platform correlation failed: {why}"),
    }

    match visor_fallback(pool, http).await {
        Ok(0) => {}
        Ok(count) => log::info!("fetched {count} platforms from the Renfe visor"),
        Err(why) => log::warn!("visor fallback failed: {why}"),
    }

    match predict_from_history(pool).await {
        Ok(0) => {}
        Ok(count) => log::info!("predicted {count} platforms from history"),
        Err(why) => log::warn!("platform prediction failed: {why}"),
    }
}

async fn visor_fallback(
    pool: &PgPool,
    http: &reqwest::Client,
) -> Result<u64, database::DatabaseError> {
    let renfe_prefix = Operator::Renfe.prefix();
    let stops = queries::realtime::platformless_stops(pool, renfe_prefix).await?;
    if stops.is_empty() {
        return Ok(0);
    }

    let today = Utc::now().with_timezone(&MADRID_TZ).date_naive();
    let mut count = 0;

    for stop_id in stops {
        let stop_code = stop_id.strip_prefix(renfe_prefix).unwrap_or(&stop_id);
        let departures = match crate::visor::station_departures(http, stop_code).await {
            Ok(departures) => departures,
            Err(why) => {
                log::debug!("visor {stop_code}: {why}");
                continue;
            }
        };

        for departure in departures {
            let (Some(via), Some(trip_id)) = (&departure.via, &departure.trip_id) else {
                continue;
            };
            let updated =
                queries::realtime::set_platform(pool, trip_id, &stop_id, via).await?;
            if updated > 0 {
                count += updated;
                let linea = departure.linea.clone().unwrap_or_default();
                let destino = departure
                    .destino_nombre
                    .clone()
                    .unwrap_or_else(|| "Unknown".to_owned());
                if let Err(why) = queries::history::record(
                    pool, &stop_id, &linea, &destino, via, today,
                )
                .await
                {
                    log::warn!("error recording visor history for {stop_id}: {why}");
                }
            }
        }
    }

    Ok(count)
}

async fn predict_from_history(pool: &PgPool) -> Result<u64, database::DatabaseError> {
    let pending = queries::realtime::platformless_updates(pool).await?;
    if pending.is_empty() {
        return Ok(0);
    }

    let mut count = 0;
    for update in pending {
        let Some(stop_id) = update.stop_id else {
            continue;
        };
        let Some(route_id) =
            queries::realtime::route_id_of_trip(pool, &update.trip_id).await?
        else {
            continue;
        };
        let Some(short_name) = ids::extract_route_short_name(&route_id, None) else {
            continue;
        };
        let Some(platform) = queries::history::predict(
            pool,
            &stop_id,
            &short_name,
            MIN_HISTORY_OBSERVATIONS,
        )
        .await?
        else {
            continue;
        };
        count += queries::realtime::set_platform(pool, &update.trip_id, &stop_id, &platform)
            .await?;
    }

    Ok(count)
}
