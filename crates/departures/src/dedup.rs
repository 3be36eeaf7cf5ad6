//! Overlapping frequency windows in the source schedule produce duplicate
//! departures seconds apart. Static departures of the same line and
//! destination must be at least [`MIN_GAP_SECONDS`] apart; realtime-backed
//! entries are never touched, two real trains can be that close.

use std::collections::HashMap;

use crate::types::Departure;

pub const MIN_GAP_SECONDS: u32 = 90;

pub fn dedup_departures(departures: Vec<Departure>) -> Vec<Departure> {
    let (realtime, mut statics): (Vec<_>, Vec<_>) = departures
        .into_iter()
        .partition(|departure| departure.delay_seconds.is_some());

    statics.sort_by_key(|departure| departure.departure_seconds);

    let mut last_by_key: HashMap<(String, Option<String>), u32> = HashMap::new();
    let mut kept = Vec::with_capacity(statics.len());
    for departure in statics {
        let key = (
            departure.route_short_name.clone(),
            departure.headsign.clone(),
        );
        match last_by_key.get(&key) {
            Some(last) if departure.departure_seconds - last < MIN_GAP_SECONDS => {}
            _ => {
                last_by_key.insert(key, departure.departure_seconds);
                kept.push(departure);
            }
        }
    }

    let mut result = realtime;
    result.extend(kept);
    result
}

#[cfg(test)]
mod tests {
    use super::*;

    fn departure(short_name: &str, headsign: &str, seconds: u32, delay: Option<i32>) -> Departure {
        Departure {
            trip_id: format!("{short_name}-{seconds}"),
            route_id: short_name.to_owned(),
            route_short_name: short_name.to_owned(),
            route_color: None,
            headsign: Some(headsign.to_owned()),
            departure_time: String::new(),
            departure_seconds: seconds,
            minutes_until: 0,
            stop_sequence: 1,
            platform: None,
            platform_estimated: false,
            delay_seconds: delay,
            realtime_departure_time: None,
            realtime_minutes_until: None,
            is_delayed: false,
            train_position: None,
            occupancy_status: None,
            occupancy_percentage: None,
            occupancy_per_car: None,
            is_express: false,
            express_name: None,
            express_color: None,
            frequency_based: false,
            headway_secs: None,
        }
    }

    #[test]
    fn close_static_duplicates_collapse_keeping_the_earlier() {
        let result = dedup_departures(vec![
            departure("C1", "Lora", 28_800, None),
            departure("C1", "Lora", 28_860, None),
        ]);
        assert_eq!(result.len(), 1);
        assert_eq!(result[0].departure_seconds, 28_800);
    }

    #[test]
    fn ninety_second_gap_survives() {
        let result = dedup_departures(vec![
            departure("C1", "Lora", 28_800, None),
            departure("C1", "Lora", 28_890, None),
        ]);
        assert_eq!(result.len(), 2);
    }

    #[test]
    fn different_headsigns_are_independent() {
        let result = dedup_departures(vec![
            departure("C1", "Lora", 28_800, None),
            departure("C1", "Utrera", 28_830, None),
        ]);
        assert_eq!(result.len(), 2);
    }

    #[test]
    fn realtime_departures_are_never_deduplicated() {
        let result = dedup_departures(vec![
            departure("C1", "Lora", 28_800, Some(0)),
            departure("C1", "Lora", 28_830, Some(60)),
        ]);
        assert_eq!(result.len(), 2);
    }
}
