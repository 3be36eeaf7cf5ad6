use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum VehicleStatus {
    IncomingAt,
    StoppedAt,
    InTransitTo,
}

impl VehicleStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            VehicleStatus::IncomingAt => "INCOMING_AT",
            VehicleStatus::StoppedAt => "STOPPED_AT",
            VehicleStatus::InTransitTo => "IN_TRANSIT_TO",
        }
    }

    pub fn from_str(value: &str) -> Self {
        match value {
            "INCOMING_AT" => VehicleStatus::IncomingAt,
            "STOPPED_AT" => VehicleStatus::StoppedAt,
            _ => VehicleStatus::InTransitTo,
        }
    }

    /// Statuses that place the vehicle at a specific platform edge, which is
    /// what makes an observation worth recording in platform history.
    pub fn is_at_station(self) -> bool {
        matches!(self, VehicleStatus::StoppedAt | VehicleStatus::IncomingAt)
    }
}

#[serde_with::skip_serializing_none]
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VehiclePosition {
    pub vehicle_id: String,
    pub trip_id: Option<String>,
    pub lat: f64,
    pub lon: f64,
    pub status: VehicleStatus,
    pub stop_id: Option<String>,
    pub label: Option<String>,
    pub platform: Option<String>,
    pub timestamp: DateTime<Utc>,
}

#[serde_with::skip_serializing_none]
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TripUpdate {
    pub trip_id: String,
    pub delay_secs: i32,
    pub vehicle_id: Option<String>,
    pub wheelchair_accessible: Option<bool>,
    pub timestamp: DateTime<Utc>,
    pub stop_time_updates: Vec<StopTimeUpdate>,
}

#[serde_with::skip_serializing_none]
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StopTimeUpdate {
    pub trip_id: String,
    pub stop_id: Option<String>,
    pub arrival_delay: Option<i32>,
    pub arrival_time: Option<DateTime<Utc>>,
    pub departure_delay: Option<i32>,
    pub departure_time: Option<DateTime<Utc>>,
    pub platform: Option<String>,
    pub occupancy_percent: Option<i32>,
    /// Raw JSON array of per-carriage occupancy percentages.
    pub occupancy_per_car: Option<String>,
    pub headsign: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum AlertCause {
    #[default]
    UnknownCause,
    OtherCause,
    TechnicalProblem,
    Strike,
    Demonstration,
    Accident,
    Holiday,
    Weather,
    Maintenance,
    Construction,
    PoliceActivity,
    MedicalEmergency,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum AlertEffect {
    #[default]
    UnknownEffect,
    NoService,
    ReducedService,
    SignificantDelays,
    Detour,
    AdditionalService,
    ModifiedService,
    OtherEffect,
    StopMoved,
}

#[serde_with::skip_serializing_none]
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AlertEntity {
    pub route_id: Option<String>,
    pub route_short_name: Option<String>,
    pub stop_id: Option<String>,
    pub trip_id: Option<String>,
    pub agency_id: Option<String>,
    pub route_type: Option<i32>,
}

#[serde_with::skip_serializing_none]
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Alert {
    pub alert_id: String,
    pub cause: AlertCause,
    pub effect: AlertEffect,
    pub header_text: Option<String>,
    pub description_text: Option<String>,
    pub url: Option<String>,
    pub active_period_start: Option<DateTime<Utc>>,
    pub active_period_end: Option<DateTime<Utc>>,
    pub informed_entities: Vec<AlertEntity>,
}

/// Fields the external classifier fills in for Renfe alerts. Preserved across
/// refreshes unless the alert text changed.
#[serde_with::skip_serializing_none]
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct AlertEnrichment {
    pub ai_severity: Option<String>,
    pub ai_status: Option<String>,
    pub ai_summary: Option<String>,
    pub ai_affected_segments: Option<String>,
    pub ai_processed_at: Option<DateTime<Utc>>,
}
