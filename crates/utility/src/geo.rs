pub const EARTH_RADIUS_M: f64 = 6_371_000.0;

/// Great-circle distance between two WGS84 points, in meters.
pub fn haversine_m(lat1: f64, lon1: f64, lat2: f64, lon2: f64) -> f64 {
    let lat1_rad = lat1.to_radians();
    let lat2_rad = lat2.to_radians();
    let dlat = (lat2 - lat1).to_radians();
    let dlon = (lon2 - lon1).to_radians();

    let a = (dlat / 2.0).sin().powi(2)
        + lat1_rad.cos() * lat2_rad.cos() * (dlon / 2.0).sin().powi(2);
    let c = 2.0 * a.sqrt().atan2((1.0 - a).sqrt());

    EARTH_RADIUS_M * c
}

/// Initial compass bearing from the first point towards the second, in
/// degrees [0, 360). Used as the suggested camera heading for map animations.
pub fn initial_bearing(lat1: f64, lon1: f64, lat2: f64, lon2: f64) -> f64 {
    let lat1_rad = lat1.to_radians();
    let lat2_rad = lat2.to_radians();
    let dlon = (lon2 - lon1).to_radians();

    let y = dlon.sin() * lat2_rad.cos();
    let x = lat1_rad.cos() * lat2_rad.sin()
        - lat1_rad.sin() * lat2_rad.cos() * dlon.cos();

    (y.atan2(x).to_degrees() + 360.0) % 360.0
}

/// Bounding box around a center point, for cheap pre-filtering before an
/// exact distance check. Returns ((min_lat, min_lon), (max_lat, max_lon)).
pub fn bounding_box(lat: f64, lon: f64, radius_m: f64) -> ((f64, f64), (f64, f64)) {
    let radius_km = radius_m / 1000.0;
    let lat_delta = radius_km / 111.0;
    let lon_delta = radius_km / (111.0 * lat.to_radians().cos());

    ((lat - lat_delta, lon - lon_delta), (lat + lat_delta, lon + lon_delta))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn haversine_madrid_to_barcelona() {
        // Sol to Plaça Catalunya, roughly 505 km
        let d = haversine_m(40.4168, -3.7038, 41.3870, 2.1701);
        assert!((d - 505_000.0).abs() < 5_000.0, "got {d}");
    }

    #[test]
    fn haversine_zero_for_same_point() {
        assert_eq!(haversine_m(40.0, -3.0, 40.0, -3.0), 0.0);
    }

    #[test]
    fn bearing_due_east() {
        let b = initial_bearing(40.0, -3.0, 40.0, -2.0);
        assert!((b - 90.0).abs() < 1.0, "got {b}");
    }

    #[test]
    fn bounding_box_contains_center() {
        let ((min_lat, min_lon), (max_lat, max_lon)) =
            bounding_box(40.4168, -3.7038, 1_000.0);
        assert!(min_lat < 40.4168 && 40.4168 < max_lat);
        assert!(min_lon < -3.7038 && -3.7038 < max_lon);
    }
}
