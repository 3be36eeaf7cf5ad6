//! CIVIS detection. CIVIS is Renfe's Madrid semi-direct service: same line,
//! fewer calls. A trip qualifies when its route is a known CIVIS route and
//! its stop count falls under that route's threshold.

pub const CIVIS_NAME: &str = "CIVIS";
pub const CIVIS_COLOR: &str = "#2596be";

/// Known CIVIS routes by full route ID, with the stop-count ceiling that
/// distinguishes the express runs from the all-stations ones.
static CIVIS_ROUTES: phf::Map<&'static str, i64> = phf::phf_map! {
    "RENFE_C2_35" => 9,  // Guadalajara - Chamartín
    "RENFE_C3_36" => 9,  // Aranjuez - Chamartín
    "RENFE_C10_42" => 8, // Villalba - Chamartín
};

/// Fallback by (short name, network): Madrid Cercanías is network 10T.
fn threshold_by_short_name(short_name: &str, network_id: &str) -> Option<i64> {
    if network_id != "10T" {
        return None;
    }
    match short_name {
        "C2" | "C3" => Some(9),
        "C10" | "C8a" => Some(8),
        _ => None,
    }
}

/// Returns (is_express, express_name, express_color).
pub fn detect_civis(
    route_id: &str,
    route_short_name: &str,
    stop_count: i64,
    network_id: Option<&str>,
) -> (bool, Option<String>, Option<String>) {
    let threshold = CIVIS_ROUTES.get(route_id).copied().or_else(|| {
        network_id.and_then(|network| threshold_by_short_name(route_short_name, network))
    });

    match threshold {
        Some(max_stops) if stop_count > 0 && stop_count <= max_stops => (
            true,
            Some(CIVIS_NAME.to_owned()),
            Some(CIVIS_COLOR.to_owned()),
        ),
        _ => (false, None, None),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn civis_detected_under_threshold() {
        let (is_express, name, color) = detect_civis("RENFE_C2_35", "C2", 9, Some("10T"));
        assert!(is_express);
        assert_eq!(name.as_deref(), Some("CIVIS"));
        assert_eq!(color.as_deref(), Some("#2596be"));
    }

    #[test]
    fn all_stations_run_is_not_civis() {
        let (is_express, name, color) = detect_civis("RENFE_C2_35", "C2", 15, Some("10T"));
        assert!(!is_express);
        assert!(name.is_none());
        assert!(color.is_none());
    }

    #[test]
    fn short_name_fallback_requires_madrid_network() {
        let (in_madrid, ..) = detect_civis("RENFE_C10_99", "C10", 8, Some("10T"));
        assert!(in_madrid);
        let (elsewhere, ..) = detect_civis("RENFE_C10_99", "C10", 8, Some("51T"));
        assert!(!elsewhere);
    }

    #[test]
    fn zero_stop_count_never_qualifies() {
        let (is_express, ..) = detect_civis("RENFE_C2_35", "C2", 0, Some("10T"));
        assert!(!is_express);
    }
}
