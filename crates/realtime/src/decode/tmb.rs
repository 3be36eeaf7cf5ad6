//! TMB iMetro prediction decoding. The API returns per-station prediction
//! lists rather than trip-keyed GTFS-RT entities, so trip IDs are synthesized
//! from service, line and route code.

use chrono::{DateTime, Duration, TimeZone, Utc};
use model::realtime::{StopTimeUpdate, TripUpdate};
use serde::Deserialize;
use utility::ids::Operator;

use crate::FetchError;

#[derive(Debug, Deserialize)]
struct Station {
    codi_estacio: Option<i64>,
    codi_via: Option<i64>,
    #[serde(default)]
    propers_trens: Vec<Train>,
}

#[derive(Debug, Deserialize)]
struct Train {
    codi_servei: Option<String>,
    /// Unix timestamp in milliseconds.
    temps_arribada: Option<i64>,
    /// Seconds until arrival.
    temps_restant: Option<i64>,
    nom_linia: Option<String>,
    codi_trajecte: Option<String>,
    desti_trajecte: Option<String>,
    info_tren: Option<TrainInfo>,
}

#[derive(Debug, Deserialize)]
struct TrainInfo {
    percentatge_ocupacio: Option<i32>,
    percentatge_ocupacio_cotxes: Option<Vec<Option<i32>>>,
}

pub fn decode_predictions(
    data: &[u8],
    now: DateTime<Utc>,
) -> Result<Vec<TripUpdate>, FetchError> {
    let stations: Vec<Station> =
        serde_json::from_slice(data).map_err(|why| FetchError::Decode(why.to_string()))?;

    let prefix = Operator::TmbMetro.prefix();
    let mut updates = Vec::new();

    for station in stations {
        let Some(station_code) = station.codi_estacio else {
            continue;
        };
        let stop_id = format!("{prefix}{station_code}");
        let platform = station.codi_via.map(|via| via.to_string());

        for train in station.propers_trens {
            let service = train.codi_servei.unwrap_or_default();
            let line = train.nom_linia.unwrap_or_default();
            let route_code = train.codi_trajecte.unwrap_or_default();
            let trip_id = format!("{prefix}{service}_{line}_{route_code}");

            let delay_secs = train.temps_restant.unwrap_or(0) as i32;
            let arrival_time = train
                .temps_arribada
                .filter(|ms| *ms > 0)
                .and_then(|ms| Utc.timestamp_millis_opt(ms).single())
                .or_else(|| {
                    train
                        .temps_restant
                        .map(|secs| now + Duration::seconds(secs))
                });

            let Some(arrival_time) = arrival_time else {
                continue;
            };

            let (occupancy_percent, occupancy_per_car) = match &train.info_tren {
                Some(info) => (
                    info.percentatge_ocupacio,
                    info.percentatge_ocupacio_cotxes
                        .as_ref()
                        .and_then(|cars| serde_json::to_string(cars).ok()),
                ),
                None => (None, None),
            };

            updates.push(TripUpdate {
                trip_id: trip_id.clone(),
                delay_secs,
                vehicle_id: Some(format!("{prefix}train_{service}")),
                wheelchair_accessible: None,
                timestamp: now,
                stop_time_updates: vec![StopTimeUpdate {
                    trip_id,
                    stop_id: Some(stop_id.clone()),
                    arrival_delay: Some(delay_secs),
                    arrival_time: Some(arrival_time),
                    departure_delay: None,
                    departure_time: None,
                    platform: platform.clone(),
                    occupancy_percent,
                    occupancy_per_car,
                    headsign: train.desti_trajecte.clone(),
                }],
            });
        }
    }

    Ok(updates)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn predictions_synthesize_trip_ids() {
        let body = r#"[{
            "codi_linia": 1,
            "codi_via": 1,
            "codi_estacio": 111,
            "propers_trens": [{
                "codi_servei": "118",
                "temps_arribada": 1768730304000,
                "temps_restant": 224,
                "codi_linia": 1,
                "nom_linia": "L1",
                "codi_trajecte": "0011",
                "desti_trajecte": "Fondo",
                "info_tren": {"percentatge_ocupacio": 42,
                              "percentatge_ocupacio_cotxes": [40, 45, 41]}
            }]
        }]"#;
        let updates = decode_predictions(body.as_bytes(), Utc::now()).unwrap();
        assert_eq!(updates.len(), 1);
        let update = &updates[0];
        assert_eq!(update.trip_id, "TMB_METRO_1.118_L1_0011");
        assert_eq!(update.delay_secs, 224);
        let stu = &update.stop_time_updates[0];
        assert_eq!(stu.stop_id.as_deref(), Some("TMB_METRO_1.111"));
        assert_eq!(stu.platform.as_deref(), Some("1"));
        assert_eq!(stu.headsign.as_deref(), Some("Fondo"));
        assert_eq!(stu.occupancy_percent, Some(42));
        assert_eq!(stu.occupancy_per_car.as_deref(), Some("[40,45,41]"));
    }

    #[test]
    fn missing_arrival_timestamp_falls_back_to_remaining_seconds() {
        let now = Utc::now();
        let body = r#"[{
            "codi_estacio": 111,
            "propers_trens": [{
                "codi_servei": "5",
                "temps_restant": 60,
                "nom_linia": "L4",
                "codi_trajecte": "0041"
            }]
        }]"#;
        let updates = decode_predictions(body.as_bytes(), now).unwrap();
        let arrival = updates[0].stop_time_updates[0].arrival_time.unwrap();
        assert_eq!((arrival - now).num_seconds(), 60);
    }

    #[test]
    fn stations_without_code_are_skipped() {
        let body = r#"[{"propers_trens": [{"codi_servei": "1"}]}]"#;
        assert!(decode_predictions(body.as_bytes(), Utc::now())
            .unwrap()
            .is_empty());
    }
}
