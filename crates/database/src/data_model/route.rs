use model::route::{parse_gtfs_time, Route, RouteFrequency, StopRouteSequence};
use sqlx::FromRow;
use utility::holidays::DayType;

#[derive(Debug, Clone, FromRow)]
pub struct RouteRow {
    pub id: String,
    pub agency_id: Option<String>,
    pub network_id: Option<String>,
    pub short_name: Option<String>,
    pub long_name: Option<String>,
    pub route_type: Option<i16>,
    pub color: Option<String>,
    pub text_color: Option<String>,
    pub is_circular: Option<bool>,
}

impl From<RouteRow> for Route {
    fn from(row: RouteRow) -> Self {
        Route {
            id: row.id,
            agency_id: row.agency_id,
            network_id: row.network_id,
            short_name: row.short_name.unwrap_or_default().trim().to_owned(),
            long_name: row.long_name,
            route_type: row.route_type.unwrap_or(0),
            color: row.color,
            text_color: row.text_color,
            is_circular: row.is_circular.unwrap_or(false),
        }
    }
}

#[derive(Debug, Clone, FromRow)]
pub struct RouteFrequencyRow {
    pub route_id: String,
    pub day_type: String,
    /// GTFS time strings; hours may exceed 24 for past-midnight windows.
    pub start_time: String,
    pub end_time: String,
    pub headway_secs: i32,
}

impl RouteFrequencyRow {
    /// Convert to the domain type. Rows with unparsable times or a
    /// non-positive headway are invalid and yield `None`.
    pub fn into_frequency(self) -> Option<RouteFrequency> {
        let day_type = match self.day_type.as_str() {
            "weekday" => DayType::Weekday,
            "friday" => DayType::Friday,
            "saturday" => DayType::Saturday,
            "sunday" => DayType::Sunday,
            _ => return None,
        };
        if self.headway_secs <= 0 {
            return None;
        }
        Some(RouteFrequency {
            route_id: self.route_id,
            day_type,
            start_seconds: parse_gtfs_time(&self.start_time)?,
            end_seconds: parse_gtfs_time(&self.end_time)?,
            headway_secs: self.headway_secs as u32,
        })
    }
}

#[derive(Debug, Clone, FromRow)]
pub struct StopRouteSequenceRow {
    pub route_id: String,
    pub stop_id: String,
    pub sequence: i32,
}

impl From<StopRouteSequenceRow> for StopRouteSequence {
    fn from(row: StopRouteSequenceRow) -> Self {
        StopRouteSequence {
            route_id: row.route_id,
            stop_id: row.stop_id,
            sequence: row.sequence,
        }
    }
}
