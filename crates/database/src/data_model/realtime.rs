use chrono::{DateTime, NaiveDate, Utc};
use model::realtime::{
    Alert, AlertCause, AlertEffect, AlertEntity, StopTimeUpdate, TripUpdate,
    VehiclePosition, VehicleStatus,
};
use sqlx::FromRow;

#[derive(Debug, Clone, FromRow)]
pub struct VehiclePositionRow {
    pub vehicle_id: String,
    pub trip_id: Option<String>,
    pub latitude: f64,
    pub longitude: f64,
    pub current_status: String,
    pub stop_id: Option<String>,
    pub label: Option<String>,
    pub platform: Option<String>,
    pub timestamp: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl From<VehiclePositionRow> for VehiclePosition {
    fn from(row: VehiclePositionRow) -> Self {
        VehiclePosition {
            vehicle_id: row.vehicle_id,
            trip_id: row.trip_id,
            lat: row.latitude,
            lon: row.longitude,
            status: VehicleStatus::from_str(&row.current_status),
            stop_id: row.stop_id,
            label: row.label,
            platform: row.platform,
            timestamp: row.timestamp,
        }
    }
}

#[derive(Debug, Clone, FromRow)]
pub struct TripUpdateRow {
    pub trip_id: String,
    pub delay: i32,
    pub vehicle_id: Option<String>,
    pub wheelchair_accessible: Option<bool>,
    pub timestamp: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl From<TripUpdateRow> for TripUpdate {
    fn from(row: TripUpdateRow) -> Self {
        TripUpdate {
            trip_id: row.trip_id,
            delay_secs: row.delay,
            vehicle_id: row.vehicle_id,
            wheelchair_accessible: row.wheelchair_accessible,
            timestamp: row.timestamp,
            stop_time_updates: Vec::new(),
        }
    }
}

#[derive(Debug, Clone, FromRow)]
pub struct StopTimeUpdateRow {
    pub trip_id: String,
    pub stop_id: Option<String>,
    pub arrival_delay: Option<i32>,
    pub arrival_time: Option<DateTime<Utc>>,
    pub departure_delay: Option<i32>,
    pub departure_time: Option<DateTime<Utc>>,
    pub platform: Option<String>,
    pub occupancy_percent: Option<i32>,
    pub occupancy_per_car: Option<String>,
    pub headsign: Option<String>,
}

impl From<StopTimeUpdateRow> for StopTimeUpdate {
    fn from(row: StopTimeUpdateRow) -> Self {
        StopTimeUpdate {
            trip_id: row.trip_id,
            stop_id: row.stop_id,
            arrival_delay: row.arrival_delay,
            arrival_time: row.arrival_time,
            departure_delay: row.departure_delay,
            departure_time: row.departure_time,
            platform: row.platform,
            occupancy_percent: row.occupancy_percent,
            occupancy_per_car: row.occupancy_per_car,
            headsign: row.headsign,
        }
    }
}

fn cause_from_str(value: &str) -> AlertCause {
    match value {
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

fn effect_from_str(value: &str) -> AlertEffect {
    match value {
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

pub fn cause_to_str(cause: AlertCause) -> &'static str {
    match cause {
        AlertCause::UnknownCause => "UNKNOWN_CAUSE",
        AlertCause::OtherCause => "OTHER_CAUSE",
        AlertCause::TechnicalProblem => "TECHNICAL_PROBLEM",
        AlertCause::Strike => "STRIKE",
        AlertCause::Demonstration => "DEMONSTRATION",
        AlertCause::Accident => "ACCIDENT",
        AlertCause::Holiday => "HOLIDAY",
        AlertCause::Weather => "WEATHER",
        AlertCause::Maintenance => "MAINTENANCE",
        AlertCause::Construction => "CONSTRUCTION",
        AlertCause::PoliceActivity => "POLICE_ACTIVITY",
        AlertCause::MedicalEmergency => "MEDICAL_EMERGENCY",
    }
}

pub fn effect_to_str(effect: AlertEffect) -> &'static str {
    match effect {
        AlertEffect::UnknownEffect => "UNKNOWN_EFFECT",
        AlertEffect::NoService => "NO_SERVICE",
        AlertEffect::ReducedService => "REDUCED_SERVICE",
        AlertEffect::SignificantDelays => "SIGNIFICANT_DELAYS",
        AlertEffect::Detour => "DETOUR",
        AlertEffect::AdditionalService => "ADDITIONAL_SERVICE",
        AlertEffect::ModifiedService => "MODIFIED_SERVICE",
        AlertEffect::OtherEffect => "OTHER_EFFECT",
        AlertEffect::StopMoved => "STOP_MOVED",
    }
}

#[derive(Debug, Clone, FromRow)]
pub struct AlertRow {
    pub alert_id: String,
    pub cause: String,
    pub effect: String,
    pub header_text: Option<String>,
    pub description_text: Option<String>,
    pub url: Option<String>,
    pub active_period_start: Option<DateTime<Utc>>,
    pub active_period_end: Option<DateTime<Utc>>,
    pub ai_severity: Option<String>,
    pub ai_status: Option<String>,
    pub ai_summary: Option<String>,
    pub ai_affected_segments: Option<String>,
    pub ai_processed_at: Option<DateTime<Utc>>,
}

impl From<AlertRow> for Alert {
    fn from(row: AlertRow) -> Self {
        Alert {
            alert_id: row.alert_id,
            cause: cause_from_str(&row.cause),
            effect: effect_from_str(&row.effect),
            header_text: row.header_text,
            description_text: row.description_text,
            url: row.url,
            active_period_start: row.active_period_start,
            active_period_end: row.active_period_end,
            informed_entities: Vec::new(),
        }
    }
}

#[derive(Debug, Clone, FromRow)]
pub struct AlertEntityRow {
    pub alert_id: String,
    pub route_id: Option<String>,
    pub route_short_name: Option<String>,
    pub stop_id: Option<String>,
    pub trip_id: Option<String>,
    pub agency_id: Option<String>,
    pub route_type: Option<i32>,
}

impl From<AlertEntityRow> for AlertEntity {
    fn from(row: AlertEntityRow) -> Self {
        AlertEntity {
            route_id: row.route_id,
            route_short_name: row.route_short_name,
            stop_id: row.stop_id,
            trip_id: row.trip_id,
            agency_id: row.agency_id,
            route_type: row.route_type,
        }
    }
}

#[derive(Debug, Clone, FromRow)]
pub struct PlatformHistoryRow {
    pub stop_id: String,
    pub route_short_name: String,
    pub headsign: String,
    pub platform: String,
    pub count: i32,
    pub observation_date: NaiveDate,
    pub last_seen: DateTime<Utc>,
}
