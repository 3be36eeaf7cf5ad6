//! Round-based RAPTOR core. Round k holds the earliest arrivals reachable
//! with at most k trips; each round scans the routes serving the stops
//! improved in the previous one, then relaxes footpaths.

use std::collections::{HashMap, HashSet};
use std::sync::Arc;

use schedule::Snapshot;

#[derive(Debug, Clone)]
pub(crate) enum BackPointer {
    Origin,
    Transit {
        trip_id: Arc<str>,
        board_stop: Arc<str>,
        board_seconds: u32,
    },
    Walk {
        from_stop: Arc<str>,
        walk_seconds: u32,
    },
}

pub(crate) struct RaptorResult {
    /// labels[k][stop] = earliest arrival with at most k trips.
    pub labels: Vec<HashMap<Arc<str>, u32>>,
    pub back: Vec<HashMap<Arc<str>, BackPointer>>,
}

/// Earliest-arrival search from a set of origin platforms towards a set of
/// destination platforms, bounded to `max_trips` boardings.
pub(crate) fn run(
    snapshot: &Snapshot,
    origins: &[Arc<str>],
    destinations: &HashSet<Arc<str>>,
    departure_seconds: u32,
    active_services: &HashSet<Arc<str>>,
    max_trips: usize,
) -> RaptorResult {
    let rounds = max_trips + 1;
    let mut labels: Vec<HashMap<Arc<str>, u32>> = vec![HashMap::new(); rounds];
    let mut back: Vec<HashMap<Arc<str>, BackPointer>> = vec![HashMap::new(); rounds];
    let mut best: HashMap<Arc<str>, u32> = HashMap::new();
    let mut marked: HashSet<Arc<str>> = HashSet::new();

    // Round 0: origins, plus footpaths out of them so a journey may start
    // with a walk.
    for origin in origins {
        labels[0].insert(origin.clone(), departure_seconds);
        back[0].insert(origin.clone(), BackPointer::Origin);
        best.insert(origin.clone(), departure_seconds);
        marked.insert(origin.clone());
    }
    for origin in origins {
        for (to_stop, walk_seconds) in snapshot.transfers_from(origin) {
            let arrival = departure_seconds + walk_seconds;
            if best.get(to_stop).map_or(true, |known| arrival < *known) {
                labels[0].insert(to_stop.clone(), arrival);
                back[0].insert(
                    to_stop.clone(),
                    BackPointer::Walk {
                        from_stop: origin.clone(),
                        walk_seconds: *walk_seconds,
                    },
                );
                best.insert(to_stop.clone(), arrival);
                marked.insert(to_stop.clone());
            }
        }
    }

    for round in 1..rounds {
        let carried = labels[round - 1].clone();
        labels[round] = carried;

        // Routes serving any marked stop, paired with the marked stops to
        // try boarding from.
        let mut boardings: HashMap<Arc<str>, Vec<Arc<str>>> = HashMap::new();
        for stop in &marked {
            if let Some(routes) = snapshot.routes_at_stop(stop) {
                for route in routes {
                    boardings.entry(route.clone()).or_default().push(stop.clone());
                }
            }
        }
        marked.clear();

        for (route_id, board_candidates) in boardings {
            for board_stop in board_candidates {
                let Some(ready_at) = labels[round - 1].get(&board_stop).copied() else {
                    continue;
                };
                let Some(mut trip_id) = snapshot
                    .earliest_trip(&route_id, ready_at, active_services)
                    .cloned()
                else {
                    continue;
                };

                let Some(mut stop_times) = snapshot.stop_times(&trip_id) else {
                    continue;
                };
                let Some(mut board_index) = boarding_position(stop_times, &board_stop, ready_at)
                else {
                    continue;
                };
                let mut board_seconds = stop_times[board_index].departure_seconds;
                let mut boarded_at = board_stop.clone();

                let mut index = board_index + 1;
                while index < stop_times.len() {
                    let call = &stop_times[index];
                    let arrival = call.arrival_seconds;

                    // Target pruning: a label is only worth keeping if it
                    // beats both the stop's best and the best arrival at any
                    // destination.
                    let stop_bound = best.get(&call.stop_id).copied().unwrap_or(u32::MAX);
                    let destination_bound = destinations
                        .iter()
                        .filter_map(|destination| best.get(destination))
                        .min()
                        .copied()
                        .unwrap_or(u32::MAX);
                    if arrival < stop_bound.min(destination_bound) {
                        labels[round].insert(call.stop_id.clone(), arrival);
                        back[round].insert(
                            call.stop_id.clone(),
                            BackPointer::Transit {
                                trip_id: trip_id.clone(),
                                board_stop: boarded_at.clone(),
                                board_seconds,
                            },
                        );
                        best.insert(call.stop_id.clone(), arrival);
                        marked.insert(call.stop_id.clone());
                    }

                    // Catch an earlier trip of the same route if the
                    // previous round already reached this stop sooner.
                    if let Some(earlier_ready) = labels[round - 1].get(&call.stop_id) {
                        if *earlier_ready < call.departure_seconds {
                            if let Some(earlier_trip) = snapshot
                                .earliest_trip(&route_id, *earlier_ready, active_services)
                            {
                                if earlier_trip != &trip_id {
                                    if let Some(earlier_times) = snapshot.stop_times(earlier_trip) {
                                        let new_index = boarding_position(
                                            earlier_times,
                                            &call.stop_id,
                                            *earlier_ready,
                                        );
                                        // Strictly earlier boarding only, so
                                        // the switch chain always terminates.
                                        if let Some(new_index) = new_index.filter(|i| {
                                            earlier_times[*i].departure_seconds
                                                < call.departure_seconds
                                        }) {
                                            trip_id = earlier_trip.clone();
                                            stop_times = earlier_times;
                                            board_index = new_index;
                                            board_seconds =
                                                stop_times[board_index].departure_seconds;
                                            boarded_at = call.stop_id.clone();
                                            index = board_index + 1;
                                            continue;
                                        }
                                    }
                                }
                            }
                        }
                    }

                    index += 1;
                }
            }
        }

        // Footpath relaxation from every stop improved this round.
        let relax_from: Vec<Arc<str>> = marked.iter().cloned().collect();
        for stop in relax_from {
            let Some(at) = labels[round].get(&stop).copied() else {
                continue;
            };
            for (to_stop, walk_seconds) in snapshot.transfers_from(&stop) {
                let arrival = at + walk_seconds;
                if best.get(to_stop).map_or(true, |known| arrival < *known) {
                    labels[round].insert(to_stop.clone(), arrival);
                    back[round].insert(
                        to_stop.clone(),
                        BackPointer::Walk {
                            from_stop: stop.clone(),
                            walk_seconds: *walk_seconds,
                        },
                    );
                    best.insert(to_stop.clone(), arrival);
                    marked.insert(to_stop.clone());
                }
            }
        }

        if marked.is_empty() {
            break;
        }
    }

    RaptorResult { labels, back }
}

/// Index of the first call at `stop` whose departure is not before
/// `ready_at`, i.e. the boarding position.
fn boarding_position(
    stop_times: &[schedule::TripStopTime],
    stop: &str,
    ready_at: u32,
) -> Option<usize> {
    stop_times
        .iter()
        .position(|call| &*call.stop_id == stop && call.departure_seconds >= ready_at)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;
    use schedule::Snapshot;

    /// Two rail lines crossing at stop C, plus a footpath from D to X.
    ///
    ///   R1: A --- B --- C --- D
    ///   R2:        C --- E --- F
    ///   walk: D -> X (300 s)
    fn network() -> Snapshot {
        let mut builder = Snapshot::builder();
        for (id, name) in [
            ("A", "Alpha"),
            ("B", "Beta"),
            ("C", "Gamma"),
            ("D", "Delta"),
            ("E", "Epsilon"),
            ("F", "Zeta"),
            ("X", "Chi"),
        ] {
            builder.add_stop(id, name, 0.0, 0.0, None);
        }
        builder.add_route("R1", "L1", None, 2);
        builder.add_route("R2", "L2", None, 2);
        builder.add_calendar("S", [true; 7]);

        // R1 trips every 600 s from 08:00
        for (trip, offset) in [("R1_a", 0u32), ("R1_b", 600), ("R1_c", 1200)] {
            builder.add_trip(trip, "R1", "S", Some("Delta"));
            let base = 28_800 + offset;
            builder.add_stop_time(trip, "A", base, base);
            builder.add_stop_time(trip, "B", base + 300, base + 300);
            builder.add_stop_time(trip, "C", base + 600, base + 600);
            builder.add_stop_time(trip, "D", base + 900, base + 900);
        }
        // R2 trips every 600 s from 08:12
        for (trip, offset) in [("R2_a", 0u32), ("R2_b", 600)] {
            builder.add_trip(trip, "R2", "S", Some("Zeta"));
            let base = 29_520 + offset;
            builder.add_stop_time(trip, "C", base, base);
            builder.add_stop_time(trip, "E", base + 300, base + 300);
            builder.add_stop_time(trip, "F", base + 600, base + 600);
        }
        builder.add_transfer("D", "X", 300);
        builder.build()
    }

    fn arc(value: &str) -> Arc<str> {
        Arc::from(value)
    }

    fn active(snapshot: &Snapshot) -> HashSet<Arc<str>> {
        snapshot.active_services(NaiveDate::from_ymd_opt(2026, 7, 29).unwrap())
    }

    #[test]
    fn direct_trip_is_found_in_round_one() {
        let snapshot = network();
        let destinations: HashSet<Arc<str>> = [arc("D")].into();
        let result = run(
            &snapshot,
            &[arc("A")],
            &destinations,
            28_800,
            &active(&snapshot),
            4,
        );
        assert_eq!(result.labels[1].get("D").copied(), Some(29_700));
    }

    #[test]
    fn transfer_journey_uses_two_rounds() {
        let snapshot = network();
        let destinations: HashSet<Arc<str>> = [arc("F")].into();
        let result = run(
            &snapshot,
            &[arc("A")],
            &destinations,
            28_800,
            &active(&snapshot),
            4,
        );
        // A 08:00 → C 08:10, board R2 08:12 → F 08:22
        assert_eq!(result.labels[2].get("F").copied(), Some(30_120));
        assert!(result.labels[1].get("F").is_none());
    }

    #[test]
    fn footpath_extends_a_transit_round() {
        let snapshot = network();
        let destinations: HashSet<Arc<str>> = [arc("X")].into();
        let result = run(
            &snapshot,
            &[arc("A")],
            &destinations,
            28_800,
            &active(&snapshot),
            4,
        );
        // D at 08:15 plus a 300 s walk
        assert_eq!(result.labels[1].get("X").copied(), Some(30_000));
        assert!(matches!(
            result.back[1].get("X"),
            Some(BackPointer::Walk { walk_seconds: 300, .. })
        ));
    }

    #[test]
    fn later_departure_boards_a_later_trip() {
        let snapshot = network();
        let destinations: HashSet<Arc<str>> = [arc("D")].into();
        let result = run(
            &snapshot,
            &[arc("A")],
            &destinations,
            28_900,
            &active(&snapshot),
            4,
        );
        // 08:01:40 misses the 08:00, catches the 08:10
        assert_eq!(result.labels[1].get("D").copied(), Some(30_300));
    }

    #[test]
    fn unreachable_destination_stays_unlabeled() {
        let snapshot = network();
        let destinations: HashSet<Arc<str>> = [arc("A")].into();
        let result = run(
            &snapshot,
            &[arc("F")],
            &destinations,
            28_800,
            &active(&snapshot),
            4,
        );
        for round in &result.labels {
            assert!(round.get("A").is_none());
        }
    }
}
