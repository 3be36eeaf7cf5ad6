//! Standard GTFS-RT protobuf decoding (Metro Bilbao, Euskotren, FGC).

use chrono::{DateTime, TimeZone, Utc};
use model::realtime::{
    Alert, AlertCause, AlertEffect, AlertEntity, StopTimeUpdate, TripUpdate,
    VehiclePosition, VehicleStatus,
};
use prost::Message;
use utility::ids;

use crate::decode::platform::{extract_platform, route_short_name_from_label};
use crate::decode::DecodedPosition;
use crate::operators::OperatorConfig;
use crate::proto;
use crate::FetchError;

fn feed(data: &[u8]) -> Result<proto::FeedMessage, FetchError> {
    proto::FeedMessage::decode(data).map_err(|why| FetchError::Decode(why.to_string()))
}

fn timestamp_or(now: DateTime<Utc>, seconds: Option<u64>) -> DateTime<Utc> {
    seconds
        .filter(|s| *s > 0)
        .and_then(|s| Utc.timestamp_opt(s as i64, 0).single())
        .unwrap_or(now)
}

fn event_time(event: &Option<proto::trip_update::StopTimeEvent>) -> Option<DateTime<Utc>> {
    event
        .as_ref()
        .and_then(|e| e.time)
        .filter(|t| *t > 0)
        .and_then(|t| Utc.timestamp_opt(t, 0).single())
}

fn event_delay(event: &Option<proto::trip_update::StopTimeEvent>) -> Option<i32> {
    event.as_ref().and_then(|e| e.delay)
}

/// Translations prefer Spanish, falling back to the first entry.
fn preferred_text(translated: Option<&proto::TranslatedString>) -> Option<String> {
    let translations = &translated?.translation;
    translations
        .iter()
        .find(|t| t.language.as_deref() == Some("es"))
        .or_else(|| translations.first())
        .map(|t| t.text.clone())
}

pub fn decode_positions(
    data: &[u8],
    config: &OperatorConfig,
    now: DateTime<Utc>,
) -> Result<Vec<DecodedPosition>, FetchError> {
    let operator = config.operator;
    let mut positions = Vec::new();

    for entity in feed(data)?.entity {
        let Some(vp) = entity.vehicle else {
            continue;
        };

        let raw_vehicle_id = vp
            .vehicle
            .as_ref()
            .and_then(|v| v.id.clone())
            .unwrap_or_else(|| entity.id.clone());
        let vehicle_id = match ids::prefix_entity(operator, &raw_vehicle_id) {
            Ok(id) => id,
            Err(why) => {
                log::warn!("skipping vehicle position: {why}");
                continue;
            }
        };

        let status = match vp.current_status() {
            proto::vehicle_position::VehicleStopStatus::IncomingAt => VehicleStatus::IncomingAt,
            proto::vehicle_position::VehicleStopStatus::StoppedAt => VehicleStatus::StoppedAt,
            proto::vehicle_position::VehicleStopStatus::InTransitTo => VehicleStatus::InTransitTo,
        };

        let raw_stop_id = vp.stop_id.as_deref().filter(|s| !s.is_empty());
        let stop_id = raw_stop_id.and_then(|raw| ids::prefix_stop(operator, raw).ok());
        let trip_id = vp
            .trip
            .as_ref()
            .and_then(|t| t.trip_id.as_deref())
            .and_then(|raw| ids::prefix_trip(operator, raw).ok());
        let direction_id = vp.trip.as_ref().and_then(|t| t.direction_id);
        let label = vp.vehicle.as_ref().and_then(|v| v.label.clone());

        let platform = extract_platform(operator, raw_stop_id, label.as_deref(), direction_id);
        let route_short_name = label.as_deref().and_then(route_short_name_from_label);
        // These feeds put the line identifier in the trip descriptor's
        // route_id; it doubles as the history headsign key.
        let headsign = vp.trip.as_ref().and_then(|t| t.route_id.clone());

        let (lat, lon) = vp
            .position
            .as_ref()
            .map(|p| (p.latitude as f64, p.longitude as f64))
            .unwrap_or((0.0, 0.0));

        positions.push(DecodedPosition {
            position: VehiclePosition {
                vehicle_id,
                trip_id,
                lat,
                lon,
                status,
                stop_id,
                label,
                platform,
                timestamp: timestamp_or(now, vp.timestamp),
            },
            route_short_name,
            headsign,
        });
    }

    Ok(positions)
}

pub fn decode_trip_updates(
    data: &[u8],
    config: &OperatorConfig,
    now: DateTime<Utc>,
) -> Result<Vec<TripUpdate>, FetchError> {
    let operator = config.operator;
    let mut updates = Vec::new();

    for entity in feed(data)?.entity {
        let Some(tu) = entity.trip_update else {
            continue;
        };
        let Some(raw_trip_id) = tu.trip.trip_id.as_deref().filter(|s| !s.is_empty()) else {
            continue;
        };
        let trip_id = match ids::prefix_trip(operator, raw_trip_id) {
            Ok(id) => id,
            Err(why) => {
                log::warn!("skipping trip update: {why}");
                continue;
            }
        };

        let direction_id = tu.trip.direction_id;

        // Trip-level delay when present; otherwise the first stop-time
        // update's arrival (or departure) delay stands in for it.
        let delay_secs = tu
            .delay
            .or_else(|| {
                tu.stop_time_update.first().and_then(|first| {
                    event_delay(&first.arrival).or_else(|| event_delay(&first.departure))
                })
            })
            .unwrap_or(0);

        let vehicle_id = tu
            .vehicle
            .as_ref()
            .and_then(|v| v.id.as_deref())
            .and_then(|raw| ids::prefix_entity(operator, raw).ok());

        let stop_time_updates = tu
            .stop_time_update
            .iter()
            .map(|stu| {
                let raw_stop_id = stu.stop_id.as_deref().filter(|s| !s.is_empty());
                let stop_id = raw_stop_id.and_then(|raw| ids::prefix_stop(operator, raw).ok());
                let platform = extract_platform(operator, raw_stop_id, None, direction_id);
                StopTimeUpdate {
                    trip_id: trip_id.clone(),
                    stop_id,
                    arrival_delay: event_delay(&stu.arrival),
                    arrival_time: event_time(&stu.arrival),
                    departure_delay: event_delay(&stu.departure),
                    departure_time: event_time(&stu.departure),
                    platform,
                    occupancy_percent: None,
                    occupancy_per_car: None,
                    headsign: None,
                }
            })
            .collect();

        updates.push(TripUpdate {
            trip_id,
            delay_secs,
            vehicle_id,
            wheelchair_accessible: None,
            timestamp: timestamp_or(now, tu.timestamp),
            stop_time_updates,
        });
    }

    Ok(updates)
}

fn map_cause(cause: proto::alert::Cause) -> AlertCause {
    match cause {
        proto::alert::Cause::UnknownCause => AlertCause::UnknownCause,
        proto::alert::Cause::OtherCause => AlertCause::OtherCause,
        proto::alert::Cause::TechnicalProblem => AlertCause::TechnicalProblem,
        proto::alert::Cause::Strike => AlertCause::Strike,
        proto::alert::Cause::Demonstration => AlertCause::Demonstration,
        proto::alert::Cause::Accident => AlertCause::Accident,
        proto::alert::Cause::Holiday => AlertCause::Holiday,
        proto::alert::Cause::Weather => AlertCause::Weather,
        proto::alert::Cause::Maintenance => AlertCause::Maintenance,
        proto::alert::Cause::Construction => AlertCause::Construction,
        proto::alert::Cause::PoliceActivity => AlertCause::PoliceActivity,
        proto::alert::Cause::MedicalEmergency => AlertCause::MedicalEmergency,
    }
}

fn map_effect(effect: proto::alert::Effect) -> AlertEffect {
    match effect {
        proto::alert::Effect::NoService => AlertEffect::NoService,
        proto::alert::Effect::ReducedService => AlertEffect::ReducedService,
        proto::alert::Effect::SignificantDelays => AlertEffect::SignificantDelays,
        proto::alert::Effect::Detour => AlertEffect::Detour,
        proto::alert::Effect::AdditionalService => AlertEffect::AdditionalService,
        proto::alert::Effect::ModifiedService => AlertEffect::ModifiedService,
        proto::alert::Effect::OtherEffect => AlertEffect::OtherEffect,
        proto::alert::Effect::UnknownEffect => AlertEffect::UnknownEffect,
        proto::alert::Effect::StopMoved => AlertEffect::StopMoved,
    }
}

pub fn decode_alerts(data: &[u8], config: &OperatorConfig) -> Result<Vec<Alert>, FetchError> {
    let operator = config.operator;
    let mut alerts = Vec::new();

    for entity in feed(data)?.entity {
        let Some(alert) = entity.alert else {
            continue;
        };
        let alert_id = match ids::prefix_entity(operator, &entity.id) {
            Ok(id) => id,
            Err(why) => {
                log::warn!("skipping alert: {why}");
                continue;
            }
        };

        let period = alert.active_period.first();
        let active_period_start = period
            .and_then(|p| p.start)
            .filter(|s| *s > 0)
            .and_then(|s| Utc.timestamp_opt(s as i64, 0).single());
        let active_period_end = period
            .and_then(|p| p.end)
            .filter(|e| *e > 0)
            .and_then(|e| Utc.timestamp_opt(e as i64, 0).single());

        let informed_entities = alert
            .informed_entity
            .iter()
            .map(|selector| AlertEntity {
                route_id: selector
                    .route_id
                    .as_deref()
                    .and_then(|raw| ids::prefix_route(operator, raw).ok()),
                route_short_name: None,
                stop_id: selector
                    .stop_id
                    .as_deref()
                    .and_then(|raw| ids::prefix_stop(operator, raw).ok()),
                trip_id: selector
                    .trip
                    .as_ref()
                    .and_then(|t| t.trip_id.as_deref())
                    .and_then(|raw| ids::prefix_trip(operator, raw).ok()),
                agency_id: selector.agency_id.clone(),
                route_type: selector.route_type,
            })
            .collect();

        alerts.push(Alert {
            alert_id,
            cause: map_cause(alert.cause()),
            effect: map_effect(alert.effect()),
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
