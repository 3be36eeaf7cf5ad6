//! GTFS-RT OccupancyStatus buckets and conversions.

use serde_repr::{Deserialize_repr, Serialize_repr};

#[derive(Serialize_repr, Deserialize_repr, Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum OccupancyStatus {
    Empty = 0,
    ManySeatsAvailable = 1,
    FewSeatsAvailable = 2,
    StandingRoomOnly = 3,
    CrushedStandingRoomOnly = 4,
    Full = 5,
    NotAcceptingPassengers = 6,
    NoDataAvailable = 7,
    NotBoardable = 8,
}

/// Bucket a 0-100 occupancy percentage into an OccupancyStatus.
pub fn percentage_to_status(percentage: i32) -> OccupancyStatus {
    match percentage {
        p if p <= 10 => OccupancyStatus::Empty,
        p if p <= 30 => OccupancyStatus::ManySeatsAvailable,
        p if p <= 50 => OccupancyStatus::FewSeatsAvailable,
        p if p <= 70 => OccupancyStatus::StandingRoomOnly,
        p if p <= 85 => OccupancyStatus::CrushedStandingRoomOnly,
        _ => OccupancyStatus::Full,
    }
}

/// Representative percentage for a status, None for non-informative statuses.
pub fn status_to_percentage(status: OccupancyStatus) -> Option<i32> {
    match status {
        OccupancyStatus::Empty => Some(5),
        OccupancyStatus::ManySeatsAvailable => Some(25),
        OccupancyStatus::FewSeatsAvailable => Some(45),
        OccupancyStatus::StandingRoomOnly => Some(65),
        OccupancyStatus::CrushedStandingRoomOnly => Some(80),
        OccupancyStatus::Full => Some(95),
        OccupancyStatus::NotAcceptingPassengers => Some(100),
        OccupancyStatus::NoDataAvailable | OccupancyStatus::NotBoardable => None,
    }
}

/// Parse the per-carriage occupancy JSON array a feed may attach to a
/// stop-time update, e.g. `"[60, 65, 70, 62]"`.
pub fn parse_occupancy_per_car(raw: &str) -> Option<Vec<Option<i32>>> {
    let value: serde_json::Value = serde_json::from_str(raw).ok()?;
    let array = value.as_array()?;
    Some(
        array
            .iter()
            .map(|item| item.as_i64().map(|v| v as i32))
            .collect(),
    )
}

/// Time-of-day fallback used when a feed carries no occupancy at all.
pub fn estimate_occupancy_by_time(hour: u32, is_weekend: bool) -> OccupancyStatus {
    if is_weekend {
        return match hour {
            11..=13 | 18 | 19 => OccupancyStatus::FewSeatsAvailable,
            10 | 14..=17 | 20 => OccupancyStatus::ManySeatsAvailable,
            _ => OccupancyStatus::Empty,
        };
    }
    match hour {
        7 | 8 | 18 | 19 => OccupancyStatus::StandingRoomOnly,
        9 | 17 | 20 => OccupancyStatus::FewSeatsAvailable,
        6 | 10..=16 | 21 => OccupancyStatus::ManySeatsAvailable,
        _ => OccupancyStatus::Empty,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn bucket_boundaries() {
        assert_eq!(percentage_to_status(0), OccupancyStatus::Empty);
        assert_eq!(percentage_to_status(10), OccupancyStatus::Empty);
        assert_eq!(percentage_to_status(11), OccupancyStatus::ManySeatsAvailable);
        assert_eq!(percentage_to_status(30), OccupancyStatus::ManySeatsAvailable);
        assert_eq!(percentage_to_status(50), OccupancyStatus::FewSeatsAvailable);
        assert_eq!(percentage_to_status(70), OccupancyStatus::StandingRoomOnly);
        assert_eq!(percentage_to_status(85), OccupancyStatus::CrushedStandingRoomOnly);
        assert_eq!(percentage_to_status(86), OccupancyStatus::Full);
    }

    #[test]
    fn round_trip_is_monotonic() {
        let mut last = -1;
        for percentage in [5, 25, 45, 65, 80, 95] {
            let status = percentage_to_status(percentage);
            let back = status_to_percentage(status).unwrap();
            assert!(back > last, "{back} after {last}");
            last = back;
        }
    }

    #[test]
    fn per_car_parsing() {
        assert_eq!(
            parse_occupancy_per_car("[60, 65, null, 62]"),
            Some(vec![Some(60), Some(65), None, Some(62)])
        );
        assert_eq!(parse_occupancy_per_car("not json"), None);
        assert_eq!(parse_occupancy_per_car("{\"a\": 1}"), None);
    }
}
