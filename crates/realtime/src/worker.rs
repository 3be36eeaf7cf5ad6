//! One fetch pass for one operator: download each configured feed, decode,
//! persist, and record platform history for qualifying positions.

use std::time::Duration;

use chrono::Utc;
use database::{queries, PgPool};
use model::realtime::{Alert, AlertEnrichment, TripUpdate};
use utility::holidays::MADRID_TZ;
use utility::ids::{self, Operator};

use crate::classifier::AlertClassifier;
use crate::decode::{metrovalencia, protobuf, renfe, tmb, DecodedPosition};
use crate::operators::{FeedFormat, OperatorConfig};
use crate::FetchError;

const HTTP_TIMEOUT: Duration = Duration::from_secs(30);
const STATION_TIMEOUT: Duration = Duration::from_secs(10);

#[derive(Debug, Default, Clone, Copy)]
pub struct FetchCounts {
    pub positions: usize,
    pub trip_updates: usize,
    pub alerts: usize,
}

pub async fn fetch_operator(
    pool: &PgPool,
    http: &reqwest::Client,
    config: &OperatorConfig,
    classifier: &dyn AlertClassifier,
) -> Result<FetchCounts, FetchError> {
    let mut counts = FetchCounts::default();

    match config.format {
        FeedFormat::Protobuf => {
            let now = Utc::now();
            if let Some(url) = &config.vehicle_positions_url {
                let body = fetch_bytes(http, url).await?;
                let positions = protobuf::decode_positions(&body, config, now)?;
                counts.positions = persist_positions(pool, config.operator, positions).await;
            }
            if let Some(url) = &config.trip_updates_url {
                let body = fetch_bytes(http, url).await?;
                let updates = protobuf::decode_trip_updates(&body, config, now)?;
                counts.trip_updates = persist_trip_updates(pool, updates).await;
            }
            if let Some(url) = &config.alerts_url {
                let body = fetch_bytes(http, url).await?;
                let alerts = protobuf::decode_alerts(&body, config)?;
                counts.alerts =
                    persist_alerts(pool, config.operator, alerts, classifier).await;
            }
        }
        FeedFormat::RenfeJson => {
            let now = Utc::now();
            if let Some(url) = &config.vehicle_positions_url {
                let body = fetch_bytes(http, url).await?;
                let positions = renfe::decode_positions(&body, now)?;
                counts.positions = persist_positions(pool, config.operator, positions).await;
            }
            if let Some(url) = &config.trip_updates_url {
                let body = fetch_bytes(http, url).await?;
                let updates = renfe::decode_trip_updates(&body, now)?;
                counts.trip_updates = persist_trip_updates(pool, updates).await;
            }
            if let Some(url) = &config.alerts_url {
                let body = fetch_bytes(http, url).await?;
                let alerts = renfe::decode_alerts(&body)?;
                counts.alerts =
                    persist_alerts(pool, config.operator, alerts, classifier).await;
            }
        }
        FeedFormat::TmbApi => {
            if let (Some(url), Some(credentials)) =
                (&config.stations_url, &config.tmb_credentials)
            {
                let response = http
                    .get(url)
                    .query(&[
                        ("app_id", credentials.app_id.as_str()),
                        ("app_key", credentials.app_key.as_str()),
                    ])
                    .timeout(HTTP_TIMEOUT)
                    .send()
                    .await?
                    .error_for_status()?;
                let body = response.bytes().await?;
                let updates = tmb::decode_predictions(&body, Utc::now())?;
                counts.trip_updates = persist_trip_updates(pool, updates).await;
            }
        }
        FeedFormat::MetrovalenciaApi => {
            if let (Some(stations_url), Some(realtime_url)) =
                (&config.stations_url, &config.realtime_url)
            {
                let body = fetch_bytes(http, stations_url).await?;
                let stations = metrovalencia::decode_stations(&body)?;
                counts.trip_updates =
                    fetch_metrovalencia_arrivals(pool, http, realtime_url, stations).await;
            }
        }
    }

    Ok(counts)
}

async fn fetch_bytes(http: &reqwest::Client, url: &str) -> Result<Vec<u8>, FetchError> {
    let response = http
        .get(url)
        .timeout(HTTP_TIMEOUT)
        .send()
        .await?
        .error_for_status()?;
    Ok(response.bytes().await?.to_vec())
}

async fn fetch_metrovalencia_arrivals(
    pool: &PgPool,
    http: &reqwest::Client,
    realtime_url: &str,
    stations: Vec<metrovalencia::FgvStation>,
) -> usize {
    let now = Utc::now();
    let mut count = 0;

    for station in stations {
        let Some(code) = station.codigo.clone() else {
            continue;
        };
        let response = http
            .get(realtime_url)
            .query(&[("estacion", code.as_str())])
            .timeout(STATION_TIMEOUT)
            .send()
            .await;
        let body = match response.and_then(|r| r.error_for_status()) {
            Ok(response) => match response.bytes().await {
                Ok(bytes) => bytes,
                Err(why) => {
                    log::debug!("Metrovalencia station {code}: {why}");
                    continue;
                }
            },
            Err(why) => {
                log::debug!("Metrovalencia station {code}: {why}");
                continue;
            }
        };
        match metrovalencia::decode_arrivals(&body, &station, now) {
            Ok(updates) => count += persist_trip_updates(pool, updates).await,
            Err(why) => log::debug!("Metrovalencia station {code}: {why}"),
        }
    }

    count
}

async fn persist_positions(
    pool: &PgPool,
    operator: Operator,
    positions: Vec<DecodedPosition>,
) -> usize {
    let today = Utc::now().with_timezone(&MADRID_TZ).date_naive();
    let mut count = 0;

    for decoded in positions {
        if let Err(why) =
            queries::realtime::upsert_vehicle_position(pool, &decoded.position).await
        {
            log::warn!("error inserting vehicle position: {why}");
            continue;
        }
        count += 1;

        let position = &decoded.position;
        let at_station = position.status.is_at_station();
        if let (true, Some(stop_id), Some(platform)) =
            (at_station, &position.stop_id, &position.platform)
        {
            record_history(pool, operator, &decoded, stop_id, platform, today).await;
        }
    }

    count
}

async fn record_history(
    pool: &PgPool,
    operator: Operator,
    decoded: &DecodedPosition,
    stop_id: &str,
    platform: &str,
    today: chrono::NaiveDate,
) {
    let Some(route_short_name) = decoded.route_short_name.as_deref() else {
        return;
    };

    let headsign = match operator {
        // Renfe positions carry no destination; the static trip does.
        Operator::Renfe => match &decoded.position.trip_id {
            Some(trip_id) => queries::realtime::headsign_of_trip(pool, trip_id)
                .await
                .ok()
                .flatten(),
            None => None,
        },
        _ => decoded.headsign.clone(),
    };
    let headsign = headsign.unwrap_or_else(|| "Unknown".to_owned());
    let route_short_name = ids::route_variant(route_short_name, Some(&headsign));

    if let Err(why) = queries::history::record(
        pool,
        stop_id,
        &route_short_name,
        &headsign,
        platform,
        today,
    )
    .await
    {
        log::warn!("error recording platform history for {stop_id}: {why}");
    }
}

async fn persist_trip_updates(pool: &PgPool, updates: Vec<TripUpdate>) -> usize {
    let mut count = 0;
    for update in updates {
        match queries::realtime::put_trip_update(pool, &update).await {
            Ok(()) => count += 1,
            Err(why) => log::warn!("error inserting trip update {}: {why}", update.trip_id),
        }
    }
    count
}

async fn persist_alerts(
    pool: &PgPool,
    operator: Operator,
    alerts: Vec<Alert>,
    classifier: &dyn AlertClassifier,
) -> usize {
    let mut count = 0;

    for alert in alerts {
        let existing = match queries::realtime::get_alert(pool, &alert.alert_id).await {
            Ok(existing) => existing,
            Err(why) => {
                log::warn!("error loading alert {}: {why}", alert.alert_id);
                None
            }
        };

        // Classify only new alerts or alerts whose text changed; otherwise
        // the stored analysis is carried forward untouched.
        let text_changed = existing
            .as_ref()
            .map(|row| row.description_text != alert.description_text)
            .unwrap_or(true);

        let mut enrichment = existing
            .as_ref()
            .map(|row| AlertEnrichment {
                ai_severity: row.ai_severity.clone(),
                ai_status: row.ai_status.clone(),
                ai_summary: row.ai_summary.clone(),
                ai_affected_segments: row.ai_affected_segments.clone(),
                ai_processed_at: row.ai_processed_at,
            })
            .unwrap_or_default();

        if text_changed && classifier.is_enabled() {
            match classifier
                .analyze(
                    &alert.alert_id,
                    alert.header_text.as_deref().unwrap_or(""),
                    alert.description_text.as_deref().unwrap_or(""),
                )
                .await
            {
                Ok(analysis) => {
                    enrichment = AlertEnrichment {
                        ai_severity: Some(analysis.severity),
                        ai_status: Some(analysis.status),
                        ai_summary: Some(analysis.summary),
                        ai_affected_segments: analysis.affected_segments,
                        ai_processed_at: Some(Utc::now()),
                    };
                }
                Err(why) => log::error!("alert {} enrichment: {why}", alert.alert_id),
            }
        }

        match queries::realtime::put_alert(pool, &alert, &enrichment, operator.code()).await
        {
            Ok(()) => count += 1,
            Err(why) => log::warn!("error inserting alert {}: {why}", alert.alert_id),
        }
    }

    count
}
