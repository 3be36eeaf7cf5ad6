//! Metrovalencia (FGV) prediction decoding: a station list from the open-data
//! portal plus per-station arrival predictions from the geoportal.

use chrono::{DateTime, Duration, Utc};
use model::realtime::{StopTimeUpdate, TripUpdate};
use serde::Deserialize;
use utility::ids::Operator;

use crate::FetchError;

#[derive(Debug, Clone, Deserialize)]
pub struct FgvStation {
    pub codigo: Option<String>,
    pub nombre: Option<String>,
    pub linea: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ArrivalsResponse {
    #[serde(rename = "salidasMetro", default)]
    salidas_metro: Vec<ArrivalJson>,
}

#[derive(Debug, Deserialize)]
struct ArrivalJson {
    linea: Option<String>,
    destino: Option<String>,
    minutos: Option<f64>,
    via: Option<serde_json::Value>,
}

pub fn decode_stations(data: &[u8]) -> Result<Vec<FgvStation>, FetchError> {
    serde_json::from_slice(data).map_err(|why| FetchError::Decode(why.to_string()))
}

/// Decode one station's arrivals into trip updates with a single prediction
/// each. Values under 100 are minutes; anything larger is already seconds.
pub fn decode_arrivals(
    data: &[u8],
    station: &FgvStation,
    now: DateTime<Utc>,
) -> Result<Vec<TripUpdate>, FetchError> {
    let response: ArrivalsResponse =
        serde_json::from_slice(data).map_err(|why| FetchError::Decode(why.to_string()))?;

    let prefix = Operator::Metrovalencia.prefix();
    let station_code = station.codigo.clone().unwrap_or_default();
    let stop_id = format!("{prefix}{station_code}");
    let mut updates = Vec::new();

    for arrival in response.salidas_metro {
        let Some(minutes) = arrival.minutos else {
            continue;
        };
        let delay_secs = if minutes < 100.0 {
            (minutes * 60.0) as i32
        } else {
            minutes as i32
        };

        let line = arrival
            .linea
            .or_else(|| station.linea.clone())
            .unwrap_or_default();
        let destination = arrival.destino.unwrap_or_default();
        let trip_id = format!("{prefix}{line}_{destination}_{station_code}");

        let platform = match arrival.via {
            Some(serde_json::Value::Number(n)) => Some(n.to_string()),
            Some(serde_json::Value::String(s)) if !s.is_empty() => Some(s),
            _ => None,
        };

        updates.push(TripUpdate {
            trip_id: trip_id.clone(),
            delay_secs,
            vehicle_id: Some(format!("{prefix}train_{line}")),
            wheelchair_accessible: None,
            timestamp: now,
            stop_time_updates: vec![StopTimeUpdate {
                trip_id,
                stop_id: Some(stop_id.clone()),
                arrival_delay: Some(delay_secs),
                arrival_time: Some(now + Duration::seconds(delay_secs as i64)),
                departure_delay: None,
                departure_time: None,
                platform,
                occupancy_percent: None,
                occupancy_per_car: None,
                headsign: Some(destination),
            }],
        });
    }

    Ok(updates)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn station() -> FgvStation {
        FgvStation {
            codigo: Some("102".to_owned()),
            nombre: Some("Colón".to_owned()),
            linea: Some("L3".to_owned()),
        }
    }

    #[test]
    fn minutes_are_converted_to_seconds() {
        let body = r#"{"salidasMetro": [
            {"linea": "L3", "destino": "Rafelbunyol", "minutos": 5, "via": 1}
        ]}"#;
        let updates = decode_arrivals(body.as_bytes(), &station(), Utc::now()).unwrap();
        assert_eq!(updates.len(), 1);
        assert_eq!(updates[0].delay_secs, 300);
        assert_eq!(updates[0].trip_id, "METROVALENCIA_L3_Rafelbunyol_102");
        let stu = &updates[0].stop_time_updates[0];
        assert_eq!(stu.stop_id.as_deref(), Some("METROVALENCIA_102"));
        assert_eq!(stu.platform.as_deref(), Some("1"));
    }

    #[test]
    fn large_values_pass_through_as_seconds() {
        let body = r#"{"salidasMetro": [{"destino": "Aeroport", "minutos": 240}]}"#;
        let updates = decode_arrivals(body.as_bytes(), &station(), Utc::now()).unwrap();
        assert_eq!(updates[0].delay_secs, 240);
    }

    #[test]
    fn empty_response_yields_nothing() {
        let updates =
            decode_arrivals(br#"{"salidasMetro": []}"#, &station(), Utc::now()).unwrap();
        assert!(updates.is_empty());
    }
}
