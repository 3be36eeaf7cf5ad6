use chrono::DateTime;
use chrono_tz::Tz;
use database::DatabaseError;
use model::occupancy::OccupancyStatus;
use schedule::NotLoaded;
use serde::Serialize;

/// A departures request. The wall clock comes in with the query so day-type
/// and frequency logic stay deterministic under test.
#[derive(Debug, Clone)]
pub struct DepartureQuery {
    pub stop_id: String,
    pub route_id: Option<String>,
    pub limit: usize,
    pub now: DateTime<Tz>,
}

impl DepartureQuery {
    pub fn clamped_limit(&self) -> usize {
        self.limit.clamp(1, 100)
    }
}

#[serde_with::skip_serializing_none]
#[derive(Debug, Clone, Serialize)]
pub struct TrainPosition {
    pub latitude: f64,
    pub longitude: f64,
    pub current_stop_name: Option<String>,
    pub status: String,
}

#[serde_with::skip_serializing_none]
#[derive(Debug, Clone, Serialize)]
pub struct Departure {
    pub trip_id: String,
    pub route_id: String,
    pub route_short_name: String,
    pub route_color: Option<String>,
    pub headsign: Option<String>,
    pub departure_time: String,
    pub departure_seconds: u32,
    pub minutes_until: i64,
    pub stop_sequence: i32,
    pub platform: Option<String>,
    pub platform_estimated: bool,
    pub delay_seconds: Option<i32>,
    pub realtime_departure_time: Option<String>,
    pub realtime_minutes_until: Option<i64>,
    pub is_delayed: bool,
    pub train_position: Option<TrainPosition>,
    pub occupancy_status: Option<OccupancyStatus>,
    pub occupancy_percentage: Option<i32>,
    pub occupancy_per_car: Option<Vec<Option<i32>>>,
    pub is_express: bool,
    pub express_name: Option<String>,
    pub express_color: Option<String>,
    pub frequency_based: bool,
    pub headway_secs: Option<u32>,
}

impl Departure {
    /// Final ordering key: the realtime estimate when present, otherwise the
    /// scheduled wait.
    pub fn sort_minutes(&self) -> i64 {
        self.realtime_minutes_until.unwrap_or(self.minutes_until)
    }
}

#[derive(Debug)]
pub enum DeparturesError {
    /// The stop does not exist.
    NotFound,
    /// The schedule store has not finished its first load.
    NotLoaded,
    /// The database is unreachable or failing.
    Unavailable(DatabaseError),
}

impl std::fmt::Display for DeparturesError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            DeparturesError::NotFound => write!(f, "stop not found"),
            DeparturesError::NotLoaded => write!(f, "schedule not loaded"),
            DeparturesError::Unavailable(why) => write!(f, "departures unavailable: {why}"),
        }
    }
}

impl std::error::Error for DeparturesError {}

impl From<DatabaseError> for DeparturesError {
    fn from(why: DatabaseError) -> Self {
        match why {
            DatabaseError::NotFound => DeparturesError::NotFound,
            other => DeparturesError::Unavailable(other),
        }
    }
}

impl From<NotLoaded> for DeparturesError {
    fn from(_: NotLoaded) -> Self {
        DeparturesError::NotLoaded
    }
}
