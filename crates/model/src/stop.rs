use serde::{Deserialize, Serialize};
use serde_repr::{Deserialize_repr, Serialize_repr};

/// GTFS location type. Only stops/platforms and stations matter here;
/// entrances and nodes are kept out of the query surface.
#[derive(Serialize_repr, Deserialize_repr, PartialEq, Eq, Debug, Clone, Copy, Default)]
#[repr(u8)]
pub enum LocationType {
    /// A boarding location. Called a platform when it has a parent station.
    #[default]
    StopOrPlatform = 0,
    /// A station grouping one or more platforms.
    Station = 1,
}

impl LocationType {
    pub fn from_i16(value: i16) -> Self {
        match value {
            1 => LocationType::Station,
            _ => LocationType::StopOrPlatform,
        }
    }
}

#[serde_with::skip_serializing_none]
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Stop {
    pub id: String,
    pub name: String,
    pub lat: f64,
    pub lon: f64,
    pub code: Option<String>,
    pub location_type: LocationType,
    pub parent_station_id: Option<String>,
    pub zone_id: Option<String>,
    pub province: Option<String>,
    /// Comma-separated line names serving the stop, from the import.
    pub lineas: Option<String>,
    pub accesibilidad: Option<String>,
    pub cor_bus: Option<String>,
    pub cor_metro: Option<String>,
    pub cor_ml: Option<String>,
    pub cor_cercanias: Option<String>,
    pub cor_tranvia: Option<String>,
}

impl Stop {
    pub fn is_station(&self) -> bool {
        self.location_type == LocationType::Station
    }

    /// A hub is a station served by two or more distinct transport types.
    /// Euskotren lines (E1, TR, …) can appear in `cor_cercanias` without the
    /// stop being a real Cercanías interchange, so those are filtered.
    pub fn is_hub(&self) -> bool {
        let mut kinds = 0;
        if self.cor_metro.as_deref().is_some_and(|s| !s.is_empty()) {
            kinds += 1;
        }
        if has_real_cercanias(self.cor_cercanias.as_deref()) {
            kinds += 1;
        }
        if self.cor_ml.as_deref().is_some_and(|s| !s.is_empty()) {
            kinds += 1;
        }
        if self.cor_tranvia.as_deref().is_some_and(|s| !s.is_empty()) {
            kinds += 1;
        }
        kinds >= 2
    }
}

/// True when the correspondence list contains an actual Renfe line (C* / R*).
pub fn has_real_cercanias(cor_cercanias: Option<&str>) -> bool {
    let Some(lines) = cor_cercanias else {
        return false;
    };
    lines.split(',').any(|line| {
        let line = line.trim();
        let mut chars = line.chars();
        matches!(chars.next(), Some('C') | Some('R'))
            && chars.next().is_some_and(|c| c.is_ascii_digit())
    })
}

/// A named boarding edge inside a station, with its own coordinates.
#[serde_with::skip_serializing_none]
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StopPlatform {
    pub stop_id: String,
    pub lines: Option<String>,
    pub lat: f64,
    pub lon: f64,
    pub color: Option<String>,
    pub source: Option<String>,
}

/// A street-level entrance of a station.
#[serde_with::skip_serializing_none]
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StopAccess {
    pub stop_id: String,
    pub name: Option<String>,
    pub lat: f64,
    pub lon: f64,
}

/// An intermediate concourse connecting accesses with platforms.
#[serde_with::skip_serializing_none]
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StopVestibule {
    pub stop_id: String,
    pub name: Option<String>,
    pub lat: f64,
    pub lon: f64,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn euskotren_lines_are_not_cercanias() {
        assert!(!has_real_cercanias(Some("E1, TR")));
        assert!(has_real_cercanias(Some("C1, C3")));
        assert!(has_real_cercanias(Some("E1, R2")));
        assert!(!has_real_cercanias(None));
    }

    #[test]
    fn hub_needs_two_transport_types() {
        let mut stop = Stop {
            id: "RENFE_18000".to_owned(),
            name: "Atocha".to_owned(),
            lat: 40.4065,
            lon: -3.6895,
            code: None,
            location_type: LocationType::Station,
            parent_station_id: None,
            zone_id: None,
            province: None,
            lineas: None,
            accesibilidad: None,
            cor_bus: None,
            cor_metro: None,
            cor_ml: None,
            cor_cercanias: Some("C1, C2".to_owned()),
            cor_tranvia: None,
        };
        assert!(!stop.is_hub());
        stop.cor_metro = Some("L1".to_owned());
        assert!(stop.is_hub());
    }
}
