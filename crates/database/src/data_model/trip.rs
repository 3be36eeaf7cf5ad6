use model::trip::{StopTime, Trip};
use sqlx::FromRow;

#[derive(Debug, Clone, FromRow)]
pub struct TripRow {
    pub id: String,
    pub route_id: String,
    pub service_id: String,
    pub headsign: Option<String>,
    pub direction_id: Option<i16>,
    pub shape_id: Option<String>,
}

impl From<TripRow> for Trip {
    fn from(row: TripRow) -> Self {
        Trip {
            id: row.id,
            route_id: row.route_id,
            service_id: row.service_id,
            headsign: row.headsign,
            direction_id: row.direction_id,
            shape_id: row.shape_id,
        }
    }
}

#[derive(Debug, Clone, FromRow)]
pub struct StopTimeRow {
    pub trip_id: String,
    pub stop_sequence: i32,
    pub stop_id: String,
    pub arrival_seconds: i32,
    pub departure_seconds: i32,
}

impl From<StopTimeRow> for StopTime {
    fn from(row: StopTimeRow) -> Self {
        StopTime {
            trip_id: row.trip_id,
            stop_sequence: row.stop_sequence,
            stop_id: row.stop_id,
            arrival_seconds: row.arrival_seconds.max(0) as u32,
            departure_seconds: row.departure_seconds.max(0) as u32,
        }
    }
}
