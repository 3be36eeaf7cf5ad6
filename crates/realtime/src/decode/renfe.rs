//! Renfe publishes GTFS-RT semantics as JSON. Entities carry the same fields
//! as the protobuf feed, camelCased, with enum values as strings.

use chrono::{DateTime, TimeZone, Utc};
use model::realtime::{
    Alert, AlertCause, AlertEffect, AlertEntity, StopTimeUpdate, TripUpdate,
    VehiclePosition, VehicleStatus,
};
use serde::Deserialize;
use utility::ids::{self, Operator};

use crate::decode::platform::extract_platform;
use crate::decode::DecodedPosition;
use crate::FetchError;

const OPERATOR: Operator = Operator::Renfe;

#[derive(Debug, Deserialize)]
struct Feed {
    #[serde(default)]
    entity: Vec<Entity>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct Entity {
    id: Option<String>,
    vehicle: Option<VehicleJson>,
    trip_update: Option<TripUpdateJson>,
    alert: Option<AlertJson>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct TripDescriptorJson {
    trip_id: Option<String>,
    route_id: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct VehicleDescriptorJson {
    id: Option<String>,
    label: Option<String>,
    wheelchair_accessible: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct PositionJson {
    latitude: Option<f64>,
    longitude: Option<f64>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct VehicleJson {
    trip: Option<TripDescriptorJson>,
    position: Option<PositionJson>,
    current_status: Option<String>,
    stop_id: Option<String>,
    timestamp: Option<serde_json::Value>,
    vehicle: Option<VehicleDescriptorJson>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct StopTimeEventJson {
    delay: Option<i32>,
    time: Option<serde_json::Value>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct StopTimeUpdateJson {
    stop_id: Option<String>,
    arrival: Option<StopTimeEventJson>,
    departure: Option<StopTimeEventJson>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct TripUpdateJson {
    trip: Option<TripDescriptorJson>,
    vehicle: Option<VehicleDescriptorJson>,
    delay: Option<i32>,
    #[serde(default)]
    stop_time_update: Vec<StopTimeUpdateJson>,
    timestamp: Option<serde_json::Value>,
}

#[derive(Debug, Deserialize)]
struct TranslationJson {
    text: Option<String>,
    language: Option<String>,
}

#[derive(Debug, Deserialize)]
struct TranslatedStringJson {
    #[serde(default)]
    translation: Vec<TranslationJson>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct TimeRangeJson {
    start: Option<serde_json::Value>,
    end: Option<serde_json::Value>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct EntitySelectorJson {
    agency_id: Option<String>,
    route_id: Option<String>,
    route_type: Option<i32>,
    stop_id: Option<String>,
    trip: Option<TripDescriptorJson>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct AlertJson {
    cause: Option<String>,
    effect: Option<String>,
    #[serde(default)]
    active_period: Vec<TimeRangeJson>,
    #[serde(default)]
    informed_entity: Vec<EntitySelectorJson>,
    header_text: Option<TranslatedStringJson>,
    description_text: Option<TranslatedStringJson>,
    url: Option<TranslatedStringJson>,
}

fn parse_feed(data: &[u8]) -> Result<Feed, FetchError> {
    serde_json::from_slice(data).map_err(|why| FetchError::Decode(why.to_string()))
}

/// Timestamps arrive as numbers or numeric strings depending on the endpoint.
fn epoch_seconds(value: &Option<serde_json::Value>) -> Option<i64> {
    match value.as_ref()? {
        serde_json::Value::Number(n) => n.as_i64(),
        serde_json::Value::String(s) => s.parse().ok(),
        _ => None,
    }
}

fn timestamp_or(now: DateTime<Utc>, value: &Option<serde_json::Value>) -> DateTime<Utc> {
    epoch_seconds(value)
        .filter(|s| *s > 0)
        .and_then(|s| Utc.timestamp_opt(s, 0).single())
        .unwrap_or(now)
}

fn preferred_text(translated: Option<&TranslatedStringJson>) -> Option<String> {
    let translations = &translated?.translation;
    translations
        .iter()
        .find(|t| t.language.as_deref() == Some("es"))
        .or_else(|| translations.first())
        .and_then(|t| t.text.clone())
}

pub fn decode_positions(
    data: &[u8],
    now: DateTime<Utc>,
) -> Result<Vec<DecodedPosition>, FetchError> {
    let mut positions = Vec::new();

    for entity in parse_feed(data)?.entity {
        let Some(vp) = entity.vehicle else {
            continue;
        };
        let descriptor = vp.vehicle.as_ref();
        let raw_vehicle_id = descriptor
            .and_then(|v| v.id.clone())
            .or(entity.id)
            .unwrap_or_default();
        let vehicle_id = match ids::prefix_entity(OPERATOR, &raw_vehicle_id) {
            Ok(id) => id,
            Err(why) => {
                log::warn!("skipping Renfe vehicle position: {why}");
                continue;
            }
        };

        let label = descriptor.and_then(|v| v.label.clone());
        let platform = extract_platform(OPERATOR, None, label.as_deref(), None);
        // Labels look like "C7-21811-PLATF.(1)"; the first segment is the line.
        let route_short_name = label
            .as_deref()
            .and_then(|l| l.split('-').next())
            .filter(|s| !s.is_empty())
            .map(str::to_owned);

        let raw_stop_id = vp.stop_id.as_deref().filter(|s| !s.is_empty());
        let stop_id = raw_stop_id.and_then(|raw| ids::prefix_stop(OPERATOR, raw).ok());
        // Renfe trip IDs stay unprefixed so they join the static trip table.
        let trip_id = vp
            .trip
            .as_ref()
            .and_then(|t| t.trip_id.as_deref())
            .and_then(|raw| ids::prefix_trip(OPERATOR, raw).ok());

        let (lat, lon) = vp
            .position
            .as_ref()
            .map(|p| (p.latitude.unwrap_or(0.0), p.longitude.unwrap_or(0.0)))
            .unwrap_or((0.0, 0.0));

        positions.push(DecodedPosition {
            position: VehiclePosition {
                vehicle_id,
                trip_id,
                lat,
                lon,
                status: VehicleStatus::from_str(
                    vp.current_status.as_deref().unwrap_or("IN_TRANSIT_TO"),
                ),
                stop_id,
                label,
                platform,
                timestamp: timestamp_or(now, &vp.timestamp),
            },
            route_short_name,
            headsign: None,
        });
    }

    Ok(positions)
}

pub fn decode_trip_updates(
    data: &[u8],
    now: DateTime<Utc>,
) -> Result<Vec<TripUpdate>, FetchError> {
    let mut updates = Vec::new();

    for entity in parse_feed(data)?.entity {
        let Some(tu) = entity.trip_update else {
            continue;
        };
        let Some(raw_trip_id) = tu
            .trip
            .as_ref()
            .and_then(|t| t.trip_id.as_deref())
            .filter(|s| !s.is_empty())
        else {
            continue;
        };
        let trip_id = match ids::prefix_trip(OPERATOR, raw_trip_id) {
            Ok(id) => id,
            Err(why) => {
                log::warn!("skipping Renfe trip update: {why}");
                continue;
            }
        };

        let delay_secs = tu.delay.unwrap_or_else(|| {
            tu.stop_time_update
                .first()
                .and_then(|first| {
                    first
                        .arrival
                        .as_ref()
                        .and_then(|a| a.delay)
                        .or_else(|| first.departure.as_ref().and_then(|d| d.delay))
                })
                .unwrap_or(0)
        });

        let descriptor = tu.vehicle.as_ref();
        let vehicle_id = descriptor
            .and_then(|v| v.id.as_deref())
            .and_then(|raw| ids::prefix_entity(OPERATOR, raw).ok());
        let wheelchair_accessible = descriptor
            .and_then(|v| v.wheelchair_accessible.as_deref())
            .and_then(|value| match value {
                "WHEELCHAIR_ACCESSIBLE" => Some(true),
                "WHEELCHAIR_INACCESSIBLE" => Some(false),
                _ => None,
            });

        let stop_time_updates = tu
            .stop_time_update
            .iter()
            .map(|stu| StopTimeUpdate {
                trip_id: trip_id.clone(),
                stop_id: stu
                    .stop_id
                    .as_deref()
                    .filter(|s| !s.is_empty())
                    .and_then(|raw| ids::prefix_stop(OPERATOR, raw).ok()),
                arrival_delay: stu.arrival.as_ref().and_then(|a| a.delay),
                arrival_time: stu.arrival.as_ref().and_then(|a| {
                    epoch_seconds(&a.time).and_then(|s| Utc.timestamp_opt(s, 0).single())
                }),
                departure_delay: stu.departure.as_ref().and_then(|d| d.delay),
                departure_time: stu.departure.as_ref().and_then(|d| {
                    epoch_seconds(&d.time).and_then(|s| Utc.timestamp_opt(s, 0).single())
                }),
                platform: None,
                occupancy_percent: None,
                occupancy_per_car: None,
                headsign: None,
            })
            .collect();

        updates.push(TripUpdate {
            trip_id,
            delay_secs,
            vehicle_id,
            wheelchair_accessible,
            timestamp: timestamp_or(now, &tu.timestamp),
            stop_time_updates,
        });
    }

    Ok(updates)
}

fn parse_cause(value: Option<&str>) -> AlertCause {
    match value.unwrap_or("UNKNOWN_CAUSE") {
        "OTHER_CAUSE" => AlertCause::OtherCause,
        "TECHNICAL_PROBLEM" => AlertCause::TechnicalProblem,
        "STRIKE" => AlertCause::Strike,
        "DEMONSTRATION" => AlertCause::Demonstration,
        "ACCIDENT" => AlertCause::Accident,
        "HOLIDAY" => AlertCause::Holiday,
        "WEATHER" => AlertCause::Weather,
        "MAINTENANCE" => AlertCause::Maintenance,
        "CONSTRUCTION" => AlertCause::Construction,
        "POLICE_ACTIVITY" => AlertCause::PoliceActivity,
        "MEDICAL_EMERGENCY" => AlertCause::MedicalEmergency,
        _ => AlertCause::UnknownCause,
    }
}

fn parse_effect(value: Option<&str>) -> AlertEffect {
    match value.unwrap_or("UNKNOWN_EFFECT") {
        "NO_SERVICE" => AlertEffect::NoService,
        "REDUCED_SERVICE" => AlertEffect::ReducedService,
        "SIGNIFICANT_DELAYS" => AlertEffect::SignificantDelays,
        "DETOUR" => AlertEffect::Detour,
        "ADDITIONAL_SERVICE" => AlertEffect::AdditionalService,
        "MODIFIED_SERVICE" => AlertEffect::ModifiedService,
        "OTHER_EFFECT" => AlertEffect::OtherEffect,
        "STOP_MOVED" => AlertEffect::StopMoved,
        _ => AlertEffect::UnknownEffect,
    }
}

pub fn decode_alerts(data: &[u8]) -> Result<Vec<Alert>, FetchError> {
    let mut alerts = Vec::new();

    for entity in parse_feed(data)?.entity {
        let Some(alert) = entity.alert else {
            continue;
        };
        let raw_id = entity.id.unwrap_or_default();
        let alert_id = match ids::prefix_entity(OPERATOR, &raw_id) {
            Ok(id) => id,
            Err(why) => {
                log::warn!("skipping Renfe alert: {why}");
                continue;
            }
        };

        let period = alert.active_period.first();
        let active_period_start = period
            .and_then(|p| epoch_seconds(&p.start))
            .filter(|s| *s > 0)
            .and_then(|s| Utc.timestamp_opt(s, 0).single());
        let active_period_end = period
            .and_then(|p| epoch_seconds(&p.end))
            .filter(|e| *e > 0)
            .and_then(|e| Utc.timestamp_opt(e, 0).single());

        let informed_entities = alert
            .informed_entity
            .iter()
            .map(|selector| {
                let raw_route_id = selector.route_id.as_deref();
                AlertEntity {
                    route_id: raw_route_id
                        .and_then(|raw| ids::prefix_route(OPERATOR, raw).ok()),
                    // Parsed from the raw GTFS route ID, before prefixing.
                    route_short_name: raw_route_id
                        .and_then(|raw| ids::extract_route_short_name(raw, None)),
                    stop_id: selector
                        .stop_id
                        .as_deref()
                        .and_then(|raw| ids::prefix_stop(OPERATOR, raw).ok()),
                    trip_id: selector
                        .trip
                        .as_ref()
                        .and_then(|t| t.trip_id.as_deref())
                        .and_then(|raw| ids::prefix_trip(OPERATOR, raw).ok()),
                    agency_id: selector.agency_id.clone(),
                    route_type: selector.route_type,
                }
            })
            .collect();

        alerts.push(Alert {
            alert_id,
            cause: parse_cause(alert.cause.as_deref()),
            effect: parse_effect(alert.effect.as_deref()),
            header_text: preferred_text(alert.header_text.as_ref()),
            description_text: preferred_text(alert.description_text.as_ref()),
            url: preferred_text(alert.url.as_ref()),
            active_period_start,
            active_period_end,
            informed_entities,
        });
    }

    Ok(alerts)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn positions_decode_with_platform_and_line() {
        let body = r#"{
            "header": {"gtfsRealtimeVersion": "2.0"},
            "entity": [{
                "id": "v1",
                "vehicle": {
                    "trip": {"tripId": "R12345", "routeId": "10T0024C4"},
                    "position": {"latitude": 40.4, "longitude": -3.7},
                    "currentStatus": "STOPPED_AT",
                    "stopId": "17000",
                    "timestamp": "1722510000",
                    "vehicle": {"id": "21811", "label": "C7-21811-PLATF.(1)"}
                }
            }]
        }"#;
        let decoded = decode_positions(body.as_bytes(), Utc::now()).unwrap();
        assert_eq!(decoded.len(), 1);
        let position = &decoded[0].position;
        assert_eq!(position.vehicle_id, "RENFE_21811");
        assert_eq!(position.trip_id.as_deref(), Some("R12345"));
        assert_eq!(position.stop_id.as_deref(), Some("RENFE_17000"));
        assert_eq!(position.status, VehicleStatus::StoppedAt);
        assert_eq!(position.platform.as_deref(), Some("1"));
        assert_eq!(decoded[0].route_short_name.as_deref(), Some("C7"));
    }

    #[test]
    fn aliased_stop_ids_are_remapped() {
        let body = r#"{"entity": [{
            "id": "v2",
            "vehicle": {
                "trip": {"tripId": "X1"},
                "position": {"latitude": 43.5, "longitude": -5.9},
                "currentStatus": "INCOMING_AT",
                "stopId": "5222",
                "vehicle": {"id": "t5"}
            }
        }]}"#;
        let decoded = decode_positions(body.as_bytes(), Utc::now()).unwrap();
        assert_eq!(decoded[0].position.stop_id.as_deref(), Some("RENFE_16403"));
    }

    #[test]
    fn trip_update_delay_falls_back_to_first_stop() {
        let body = r#"{"entity": [{
            "id": "u1",
            "tripUpdate": {
                "trip": {"tripId": "R12345"},
                "stopTimeUpdate": [
                    {"stopId": "17000", "arrival": {"delay": 240}},
                    {"stopId": "17001", "arrival": {"delay": 300}}
                ]
            }
        }]}"#;
        let updates = decode_trip_updates(body.as_bytes(), Utc::now()).unwrap();
        assert_eq!(updates.len(), 1);
        assert_eq!(updates[0].trip_id, "R12345");
        assert_eq!(updates[0].delay_secs, 240);
        assert_eq!(updates[0].stop_time_updates.len(), 2);
        assert_eq!(
            updates[0].stop_time_updates[0].stop_id.as_deref(),
            Some("RENFE_17000")
        );
    }

    #[test]
    fn alerts_prefer_spanish_translations() {
        let body = r#"{"entity": [{
            "id": "a1",
            "alert": {
                "cause": "STRIKE",
                "effect": "REDUCED_SERVICE",
                "activePeriod": [{"start": 1722500000, "end": 1722600000}],
                "headerText": {"translation": [
                    {"text": "Service reduced", "language": "en"},
                    {"text": "Servicio reducido", "language": "es"}
                ]},
                "informedEntity": [{"routeId": "30T0024C5"}]
            }
        }]}"#;
        let alerts = decode_alerts(body.as_bytes()).unwrap();
        assert_eq!(alerts.len(), 1);
        assert_eq!(alerts[0].alert_id, "RENFE_a1");
        assert_eq!(alerts[0].header_text.as_deref(), Some("Servicio reducido"));
        assert_eq!(alerts[0].cause, AlertCause::Strike);
        assert_eq!(
            alerts[0].informed_entities[0].route_short_name.as_deref(),
            Some("C5")
        );
    }

    #[test]
    fn malformed_feed_is_a_decode_failure() {
        assert!(matches!(
            decode_positions(b"not json", Utc::now()),
            Err(FetchError::Decode(_))
        ));
    }

    #[test]
    fn entities_without_trip_ids_are_skipped() {
        let body = r#"{"entity": [{"id": "u2", "tripUpdate": {"trip": {}}}]}"#;
        let updates = decode_trip_updates(body.as_bytes(), Utc::now()).unwrap();
        assert!(updates.is_empty());
    }
}
