//! Operating-hours gating from frequency windows.

use model::route::{RouteFrequency, SECONDS_PER_DAY};

/// Derive the `[min_start, max_end]` window of a day's frequency rows.
/// Aggregate rows feed the end bound only; without any non-aggregate row the
/// start defaults to 06:00.
pub fn operating_window(frequencies: &[RouteFrequency]) -> Option<(u32, u32)> {
    if frequencies.is_empty() {
        return None;
    }

    let max_end = frequencies
        .iter()
        .map(RouteFrequency::effective_end_seconds)
        .max()?;

    let min_start = frequencies
        .iter()
        .filter(|frequency| !frequency.is_aggregate())
        .map(|frequency| frequency.start_seconds)
        .min()
        .unwrap_or(6 * 3600);

    Some((min_start, max_end))
}

/// Whether a departure at `seconds` falls inside the route's operating
/// window. No frequency data means the route is assumed to be running.
/// Windows ending past 24 h wrap into the small hours of the next day.
pub fn is_operating(frequencies: &[RouteFrequency], seconds: u32) -> bool {
    let Some((min_start, max_end)) = operating_window(frequencies) else {
        return true;
    };

    if max_end > SECONDS_PER_DAY {
        let late_night_cutoff = max_end - SECONDS_PER_DAY;
        seconds >= min_start || seconds <= late_night_cutoff
    } else {
        min_start <= seconds && seconds <= max_end
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use utility::holidays::DayType;

    fn frequency(start: u32, end: u32) -> RouteFrequency {
        RouteFrequency {
            route_id: "METRO_6".to_owned(),
            day_type: DayType::Weekday,
            start_seconds: start,
            end_seconds: end,
            headway_secs: 240,
        }
    }

    #[test]
    fn no_data_assumes_running() {
        assert!(is_operating(&[], 3 * 3600));
    }

    #[test]
    fn window_bounds_daytime_service() {
        let frequencies = [frequency(6 * 3600, 9 * 3600), frequency(9 * 3600, 23 * 3600)];
        assert!(is_operating(&frequencies, 12 * 3600));
        assert!(!is_operating(&frequencies, 4 * 3600));
        assert!(!is_operating(&frequencies, 23 * 3600 + 60));
    }

    #[test]
    fn aggregate_rows_do_not_shift_the_start() {
        let frequencies = [
            frequency(0, 26 * 3600), // aggregate
            frequency(7 * 3600, 22 * 3600),
        ];
        let (min_start, max_end) = operating_window(&frequencies).unwrap();
        assert_eq!(min_start, 7 * 3600);
        assert_eq!(max_end, 26 * 3600);
    }

    #[test]
    fn overnight_service_wraps_past_midnight() {
        let frequencies = [frequency(6 * 3600, 25 * 3600 + 1800)];
        assert!(is_operating(&frequencies, 23 * 3600));
        assert!(is_operating(&frequencies, 3600)); // 01:00, before the 01:30 cutoff
        assert!(!is_operating(&frequencies, 2 * 3600));
    }

    #[test]
    fn only_aggregates_default_start_to_six() {
        let frequencies = [frequency(0, 25 * 3600)];
        let (min_start, _) = operating_window(&frequencies).unwrap();
        assert_eq!(min_start, 6 * 3600);
    }
}
