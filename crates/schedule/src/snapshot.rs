use std::collections::{HashMap, HashSet};
use std::sync::Arc;

use chrono::{Datelike, NaiveDate, Weekday};

/// Interned string pool. The same stop and service IDs repeat across millions
/// of stop_times rows; sharing one allocation per distinct string keeps the
/// snapshot footprint manageable.
#[derive(Default)]
pub(crate) struct StringPool {
    strings: HashSet<Arc<str>>,
}

impl StringPool {
    pub fn intern(&mut self, value: &str) -> Arc<str> {
        if let Some(existing) = self.strings.get(value) {
            return existing.clone();
        }
        let interned: Arc<str> = Arc::from(value);
        self.strings.insert(interned.clone());
        interned
    }
}

#[derive(Debug, Clone)]
pub struct StopInfo {
    pub name: Arc<str>,
    pub lat: f64,
    pub lon: f64,
}

#[derive(Debug, Clone)]
pub struct RouteInfo {
    pub short_name: Arc<str>,
    pub color: Option<Arc<str>>,
    pub route_type: i16,
}

#[derive(Debug, Clone)]
pub struct TripInfo {
    pub route_id: Arc<str>,
    pub headsign: Option<Arc<str>>,
    pub service_id: Arc<str>,
}

/// One call of a trip. Seconds count from local midnight of the service day
/// and may exceed 86 400 past midnight.
#[derive(Debug, Clone)]
pub struct TripStopTime {
    pub stop_id: Arc<str>,
    pub arrival_seconds: u32,
    pub departure_seconds: u32,
}

#[derive(Debug, Clone, Default)]
pub struct DayExceptions {
    pub added: HashSet<Arc<str>>,
    pub removed: HashSet<Arc<str>>,
}

/// An immutable view of the full schedule, indexed for O(1) RAPTOR access.
#[derive(Debug)]
pub struct Snapshot {
    stops_info: HashMap<Arc<str>, StopInfo>,
    routes_info: HashMap<Arc<str>, RouteInfo>,
    trips_info: HashMap<Arc<str>, TripInfo>,
    stop_times_by_trip: HashMap<Arc<str>, Vec<TripStopTime>>,
    /// Per route: (first_departure_seconds, trip_id), ascending. The trip ID
    /// participates in the sort so equal departures resolve deterministically.
    trips_by_route: HashMap<Arc<str>, Vec<(u32, Arc<str>)>>,
    routes_by_stop: HashMap<Arc<str>, HashSet<Arc<str>>>,
    transfers: HashMap<Arc<str>, Vec<(Arc<str>, u32)>>,
    services_by_weekday: [HashSet<Arc<str>>; 7],
    calendar_exceptions: HashMap<NaiveDate, DayExceptions>,
    children_by_station: HashMap<Arc<str>, Vec<Arc<str>>>,
}

impl Snapshot {
    pub fn builder() -> SnapshotBuilder {
        SnapshotBuilder::default()
    }

    /// Services running on a date: the weekday base set plus added
    /// exceptions, minus removed ones.
    pub fn active_services(&self, date: NaiveDate) -> HashSet<Arc<str>> {
        let mut active =
            self.services_by_weekday[date.weekday().num_days_from_monday() as usize].clone();
        if let Some(exceptions) = self.calendar_exceptions.get(&date) {
            active.extend(exceptions.added.iter().cloned());
            for removed in &exceptions.removed {
                active.remove(removed);
            }
        }
        active
    }

    /// The earliest trip of a route departing at or after `min_departure`
    /// whose service runs today. Linear scan over the per-route list, which
    /// is sorted by (first departure, trip id).
    pub fn earliest_trip(
        &self,
        route_id: &str,
        min_departure: u32,
        active_services: &HashSet<Arc<str>>,
    ) -> Option<&Arc<str>> {
        let trips = self.trips_by_route.get(route_id)?;
        let start = trips.partition_point(|(departure, _)| *departure < min_departure);
        trips[start..].iter().find_map(|(_, trip_id)| {
            let info = self.trips_info.get(trip_id)?;
            active_services.contains(&info.service_id).then_some(trip_id)
        })
    }

    pub fn stop_times(&self, trip_id: &str) -> Option<&[TripStopTime]> {
        self.stop_times_by_trip.get(trip_id).map(Vec::as_slice)
    }

    pub fn routes_at_stop(&self, stop_id: &str) -> Option<&HashSet<Arc<str>>> {
        self.routes_by_stop.get(stop_id)
    }

    pub fn transfers_from(&self, stop_id: &str) -> &[(Arc<str>, u32)] {
        self.transfers.get(stop_id).map(Vec::as_slice).unwrap_or(&[])
    }

    pub fn trip_info(&self, trip_id: &str) -> Option<&TripInfo> {
        self.trips_info.get(trip_id)
    }

    pub fn stop_info(&self, stop_id: &str) -> Option<&StopInfo> {
        self.stops_info.get(stop_id)
    }

    pub fn route_info(&self, route_id: &str) -> Option<&RouteInfo> {
        self.routes_info.get(route_id)
    }

    /// Platform children of a station, empty for plain stops.
    pub fn children(&self, stop_id: &str) -> &[Arc<str>] {
        self.children_by_station
            .get(stop_id)
            .map(Vec::as_slice)
            .unwrap_or(&[])
    }

    pub fn stop_count(&self) -> usize {
        self.stops_info.len()
    }

    pub fn route_count(&self) -> usize {
        self.routes_info.len()
    }

    pub fn trip_count(&self) -> usize {
        self.trips_info.len()
    }

    pub fn transfer_count(&self) -> usize {
        self.transfers.values().map(Vec::len).sum()
    }
}

#[derive(Default)]
pub struct SnapshotBuilder {
    pool: StringPool,
    stops_info: HashMap<Arc<str>, StopInfo>,
    routes_info: HashMap<Arc<str>, RouteInfo>,
    trips_info: HashMap<Arc<str>, TripInfo>,
    stop_times_by_trip: HashMap<Arc<str>, Vec<TripStopTime>>,
    routes_by_stop: HashMap<Arc<str>, HashSet<Arc<str>>>,
    transfers: HashMap<Arc<str>, Vec<(Arc<str>, u32)>>,
    services_by_weekday: [HashSet<Arc<str>>; 7],
    calendar_exceptions: HashMap<NaiveDate, DayExceptions>,
    children_by_station: HashMap<Arc<str>, Vec<Arc<str>>>,
}

impl SnapshotBuilder {
    pub fn add_stop(
        &mut self,
        id: &str,
        name: &str,
        lat: f64,
        lon: f64,
        parent_station_id: Option<&str>,
    ) {
        let id = self.pool.intern(id);
        let name = self.pool.intern(name);
        self.stops_info.insert(id.clone(), StopInfo { name, lat, lon });
        if let Some(parent) = parent_station_id {
            let parent = self.pool.intern(parent);
            self.children_by_station.entry(parent).or_default().push(id);
        }
    }

    pub fn add_route(&mut self, id: &str, short_name: &str, color: Option<&str>, route_type: i16) {
        let id = self.pool.intern(id);
        let short_name = self.pool.intern(short_name.trim());
        let color = color.map(|c| self.pool.intern(c));
        self.routes_info.insert(
            id,
            RouteInfo {
                short_name,
                color,
                route_type,
            },
        );
    }

    pub fn add_trip(&mut self, id: &str, route_id: &str, service_id: &str, headsign: Option<&str>) {
        let id = self.pool.intern(id);
        let route_id = self.pool.intern(route_id);
        let service_id = self.pool.intern(service_id);
        let headsign = headsign.map(|h| self.pool.intern(h));
        self.trips_info.insert(
            id,
            TripInfo {
                route_id,
                headsign,
                service_id,
            },
        );
    }

    /// Append the next call of a trip. Rows must arrive ordered by
    /// (trip_id, stop_sequence); the inverse stop→routes index is built in
    /// the same pass.
    pub fn add_stop_time(
        &mut self,
        trip_id: &str,
        stop_id: &str,
        arrival_seconds: u32,
        departure_seconds: u32,
    ) {
        let trip_id = self.pool.intern(trip_id);
        let stop_id = self.pool.intern(stop_id);

        if let Some(info) = self.trips_info.get(&*trip_id) {
            self.routes_by_stop
                .entry(stop_id.clone())
                .or_default()
                .insert(info.route_id.clone());
        }

        self.stop_times_by_trip
            .entry(trip_id)
            .or_default()
            .push(TripStopTime {
                stop_id,
                arrival_seconds,
                departure_seconds,
            });
    }

    pub fn add_calendar(
        &mut self,
        service_id: &str,
        weekdays: [bool; 7], // monday..sunday
    ) {
        let service_id = self.pool.intern(service_id);
        for (day, runs) in weekdays.into_iter().enumerate() {
            if runs {
                self.services_by_weekday[day].insert(service_id.clone());
            }
        }
    }

    pub fn add_calendar_exception(&mut self, service_id: &str, date: NaiveDate, added: bool) {
        let service_id = self.pool.intern(service_id);
        let entry = self.calendar_exceptions.entry(date).or_default();
        if added {
            entry.added.insert(service_id);
        } else {
            entry.removed.insert(service_id);
        }
    }

    /// Self-transfers and non-positive walk times are data errors; they are
    /// dropped here so the planner can trust every edge.
    pub fn add_transfer(&mut self, from: &str, to: &str, walk_seconds: i64) {
        if from == to || walk_seconds <= 0 {
            return;
        }
        let from = self.pool.intern(from);
        let to = self.pool.intern(to);
        self.transfers
            .entry(from)
            .or_default()
            .push((to, walk_seconds as u32));
    }

    pub fn build(mut self) -> Snapshot {
        let mut trips_by_route: HashMap<Arc<str>, Vec<(u32, Arc<str>)>> = HashMap::new();
        for (trip_id, stop_times) in &self.stop_times_by_trip {
            let Some(first) = stop_times.first() else {
                continue;
            };
            let Some(info) = self.trips_info.get(trip_id) else {
                continue;
            };
            trips_by_route
                .entry(info.route_id.clone())
                .or_default()
                .push((first.departure_seconds, trip_id.clone()));
        }
        for trips in trips_by_route.values_mut() {
            trips.sort_by(|a, b| a.0.cmp(&b.0).then_with(|| a.1.cmp(&b.1)));
        }

        for children in self.children_by_station.values_mut() {
            children.sort();
        }

        Snapshot {
            stops_info: self.stops_info,
            routes_info: self.routes_info,
            trips_info: self.trips_info,
            stop_times_by_trip: std::mem::take(&mut self.stop_times_by_trip),
            trips_by_route,
            routes_by_stop: self.routes_by_stop,
            transfers: self.transfers,
            services_by_weekday: self.services_by_weekday,
            calendar_exceptions: self.calendar_exceptions,
            children_by_station: self.children_by_station,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    fn sample_snapshot() -> Snapshot {
        let mut builder = Snapshot::builder();
        builder.add_stop("A", "Alpha", 40.0, -3.0, None);
        builder.add_stop("B", "Beta", 40.1, -3.1, None);
        builder.add_route("R1", "C1", Some("00ff00"), 2);
        builder.add_calendar("WK", [true, true, true, true, true, false, false]);
        builder.add_calendar("SAT", [false, false, false, false, false, true, false]);
        builder.add_trip("T1", "R1", "WK", Some("Beta"));
        builder.add_trip("T2", "R1", "SAT", None);
        builder.add_trip("T3", "R1", "WK", None);
        builder.add_stop_time("T1", "A", 28_800, 28_800);
        builder.add_stop_time("T1", "B", 29_400, 29_400);
        builder.add_stop_time("T2", "A", 28_900, 28_900);
        builder.add_stop_time("T2", "B", 29_500, 29_500);
        builder.add_stop_time("T3", "A", 30_000, 30_000);
        builder.add_stop_time("T3", "B", 30_600, 30_600);
        builder.add_transfer("A", "B", 300);
        builder.add_transfer("A", "A", 100); // dropped
        builder.add_transfer("B", "A", 0); // dropped
        builder.build()
    }

    #[test]
    fn active_services_apply_exceptions() {
        let mut builder = Snapshot::builder();
        builder.add_calendar("WK", [true, true, true, true, true, false, false]);
        builder.add_calendar_exception("WK", date(2026, 7, 29), false);
        builder.add_calendar_exception("EXTRA", date(2026, 7, 29), true);
        let snapshot = builder.build();

        // Wednesday with WK removed and EXTRA added
        let active = snapshot.active_services(date(2026, 7, 29));
        assert!(!active.contains("WK"));
        assert!(active.contains("EXTRA"));

        // Plain Wednesday
        let active = snapshot.active_services(date(2026, 8, 5));
        assert!(active.contains("WK"));
        assert!(!active.contains("EXTRA"));
    }

    #[test]
    fn earliest_trip_skips_inactive_services() {
        let snapshot = sample_snapshot();
        // Weekday: T2 (saturday service) is not active, so 28 850 lands on T3
        let active = snapshot.active_services(date(2026, 7, 29));
        let trip = snapshot.earliest_trip("R1", 28_850, &active).unwrap();
        assert_eq!(&**trip, "T3");
        // Saturday: T2 qualifies
        let active = snapshot.active_services(date(2026, 8, 1));
        let trip = snapshot.earliest_trip("R1", 28_850, &active).unwrap();
        assert_eq!(&**trip, "T2");
    }

    #[test]
    fn earliest_trip_is_none_past_last_departure() {
        let snapshot = sample_snapshot();
        let active = snapshot.active_services(date(2026, 7, 29));
        assert!(snapshot.earliest_trip("R1", 86_400, &active).is_none());
        assert!(snapshot.earliest_trip("NO_ROUTE", 0, &active).is_none());
    }

    #[test]
    fn trips_by_route_sorted_with_ties_on_trip_id() {
        let mut builder = Snapshot::builder();
        builder.add_route("R", "X", None, 1);
        builder.add_calendar("S", [true; 7]);
        builder.add_trip("T_B", "R", "S", None);
        builder.add_trip("T_A", "R", "S", None);
        builder.add_stop_time("T_B", "A", 100, 100);
        builder.add_stop_time("T_A", "A", 100, 100);
        let snapshot = builder.build();
        let active = snapshot.active_services(date(2026, 7, 29));
        // Tie on departure 100: lexicographically smaller trip wins
        assert_eq!(&**snapshot.earliest_trip("R", 0, &active).unwrap(), "T_A");
    }

    #[test]
    fn invalid_transfers_are_dropped() {
        let snapshot = sample_snapshot();
        assert_eq!(snapshot.transfers_from("A").len(), 1);
        assert!(snapshot.transfers_from("B").is_empty());
    }

    #[test]
    fn past_midnight_departures_keep_order() {
        let mut builder = Snapshot::builder();
        builder.add_route("R", "N1", None, 2);
        builder.add_calendar("S", [true; 7]);
        builder.add_trip("T_LATE", "R", "S", None);
        builder.add_trip("T_EARLY", "R", "S", None);
        builder.add_stop_time("T_LATE", "A", 86_400, 86_400);
        builder.add_stop_time("T_EARLY", "A", 23 * 3600, 23 * 3600);
        let snapshot = builder.build();
        let active = snapshot.active_services(date(2026, 7, 29));
        assert_eq!(
            &**snapshot.earliest_trip("R", 86_000, &active).unwrap(),
            "T_LATE"
        );
    }

    #[test]
    fn children_index_resolves_stations() {
        let mut builder = Snapshot::builder();
        builder.add_stop("METRO_BILBAO_7", "San Inazio", 43.3, -2.9, None);
        builder.add_stop("METRO_BILBAO_7.0", "San Inazio", 43.3, -2.9, Some("METRO_BILBAO_7"));
        builder.add_stop("METRO_BILBAO_7.1", "San Inazio", 43.3, -2.9, Some("METRO_BILBAO_7"));
        let snapshot = builder.build();
        let children = snapshot.children("METRO_BILBAO_7");
        assert_eq!(children.len(), 2);
        assert!(snapshot.children("METRO_BILBAO_7.0").is_empty());
    }
}
