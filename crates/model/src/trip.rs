use serde::{Deserialize, Serialize};

#[serde_with::skip_serializing_none]
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Trip {
    pub id: String,
    pub route_id: String,
    pub service_id: String,
    pub headsign: Option<String>,
    pub direction_id: Option<i16>,
    pub shape_id: Option<String>,
}

/// One scheduled call of a trip at a stop. The `*_seconds` fields count from
/// local midnight of the service day and may exceed 86 400 for past-midnight
/// calls; keeping them raw preserves sort order across midnight.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StopTime {
    pub trip_id: String,
    pub stop_sequence: i32,
    pub stop_id: String,
    pub arrival_seconds: u32,
    pub departure_seconds: u32,
}
