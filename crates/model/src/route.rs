use serde::{Deserialize, Serialize};

use utility::holidays::DayType;

#[serde_with::skip_serializing_none]
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Route {
    pub id: String,
    pub agency_id: Option<String>,
    pub network_id: Option<String>,
    pub short_name: String,
    pub long_name: Option<String>,
    /// GTFS route_type (0 tram, 1 metro, 2 rail, …).
    pub route_type: i16,
    pub color: Option<String>,
    pub text_color: Option<String>,
    pub is_circular: bool,
}

/// Prefixes of networks backed by a live GTFS-RT feed. Departures on these
/// networks are never gated by frequency-derived operating hours, since the
/// realtime data already reflects actual service.
pub const GTFS_RT_PREFIXES: [&str; 5] = [
    "RENFE_",
    "TMB_METRO_",
    "FGC_",
    "EUSKOTREN_",
    "METRO_BILBAO_",
];

/// A route whose only data source is the static GTFS import.
pub fn is_static_gtfs_route(route_id: &str) -> bool {
    !GTFS_RT_PREFIXES
        .iter()
        .any(|prefix| route_id.starts_with(prefix))
}

/// One headway window of a frequency-operated route.
///
/// `end_seconds == 0` is overloaded in the source data to mean "until
/// midnight"; values past 86 400 describe past-midnight service. Rows with
/// `start == 0 && end >= 25 h` are whole-day aggregates and are skipped when
/// deriving the first departure of the day.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RouteFrequency {
    pub route_id: String,
    pub day_type: DayType,
    pub start_seconds: u32,
    pub end_seconds: u32,
    pub headway_secs: u32,
}

pub const SECONDS_PER_DAY: u32 = 86_400;

impl RouteFrequency {
    /// End of the window for comparisons, resolving the midnight overload.
    pub fn effective_end_seconds(&self) -> u32 {
        if self.end_seconds == 0 {
            SECONDS_PER_DAY
        } else {
            self.end_seconds
        }
    }

    /// Whole-day aggregate rows summarize service and carry no real window.
    pub fn is_aggregate(&self) -> bool {
        self.start_seconds == 0 && self.end_seconds >= 25 * 3600
    }

    /// Strict upper bound: a query at exactly `end_seconds` is outside.
    pub fn contains(&self, seconds: u32) -> bool {
        self.start_seconds <= seconds && seconds < self.effective_end_seconds()
    }
}

/// Position of a stop along a route, for direction discovery on
/// frequency-operated routes that have no stop_times.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StopRouteSequence {
    pub route_id: String,
    pub stop_id: String,
    pub sequence: i32,
}

pub fn format_seconds(seconds: u32) -> String {
    let hours = seconds / 3600;
    let minutes = (seconds % 3600) / 60;
    let secs = seconds % 60;
    format!("{hours:02}:{minutes:02}:{secs:02}")
}

/// Parse GTFS `HH:MM:SS` (hours may exceed 24) into seconds since midnight
/// of the service day.
pub fn parse_gtfs_time(value: &str) -> Option<u32> {
    let mut parts = value.split(':');
    let hours: u32 = parts.next()?.trim().parse().ok()?;
    let minutes: u32 = parts.next()?.trim().parse().ok()?;
    let seconds: u32 = parts.next().unwrap_or("0").trim().parse().ok()?;
    if minutes >= 60 || seconds >= 60 {
        return None;
    }
    Some(hours * 3600 + minutes * 60 + seconds)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn frequency(start: u32, end: u32) -> RouteFrequency {
        RouteFrequency {
            route_id: "METRO_1".to_owned(),
            day_type: DayType::Weekday,
            start_seconds: start,
            end_seconds: end,
            headway_secs: 180,
        }
    }

    #[test]
    fn end_time_midnight_overload() {
        let f = frequency(6 * 3600, 0);
        assert_eq!(f.effective_end_seconds(), SECONDS_PER_DAY);
        assert!(f.contains(23 * 3600));
    }

    #[test]
    fn window_end_is_exclusive() {
        let f = frequency(7 * 3600, 9 * 3600 + 1800);
        assert!(f.contains(9 * 3600 + 1799));
        assert!(!f.contains(9 * 3600 + 1800));
    }

    #[test]
    fn aggregate_rows_are_detected() {
        assert!(frequency(0, 25 * 3600 + 1800).is_aggregate());
        assert!(!frequency(0, 23 * 3600).is_aggregate());
        assert!(!frequency(6 * 3600, 26 * 3600).is_aggregate());
    }

    #[test]
    fn gtfs_time_parses_past_midnight() {
        assert_eq!(parse_gtfs_time("25:35:00"), Some(25 * 3600 + 35 * 60));
        assert_eq!(parse_gtfs_time("08:00:00"), Some(28_800));
        assert_eq!(parse_gtfs_time("bad"), None);
    }

    #[test]
    fn gtfs_rt_networks_are_not_static() {
        assert!(!is_static_gtfs_route("RENFE_C4a_67"));
        assert!(is_static_gtfs_route("METRO_1"));
        assert!(is_static_gtfs_route("TRAM_SEV_T1"));
    }
}
