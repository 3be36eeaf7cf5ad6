//! Canonical identifier namespace.
//!
//! Every externally visible identifier is `<NETWORK>_<native>`, e.g.
//! `RENFE_17000`, `METRO_BILBAO_7.0`, `TMB_METRO_1.111`. Raw feed identifiers
//! are mapped into this namespace before anything is persisted or served.

use std::fmt;
use std::sync::OnceLock;

use regex::Regex;
use serde::{Deserialize, Serialize};

/// An identifier that is empty or whitespace-only and cannot be normalized.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MalformedId {
    pub raw: String,
}

impl fmt::Display for MalformedId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "malformed identifier: {:?}", self.raw)
    }
}

impl std::error::Error for MalformedId {}

/// The realtime operators this service ingests.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Operator {
    Renfe,
    MetroBilbao,
    Euskotren,
    Fgc,
    TmbMetro,
    Metrovalencia,
}

impl Operator {
    pub const ALL: [Operator; 6] = [
        Operator::Renfe,
        Operator::MetroBilbao,
        Operator::Euskotren,
        Operator::Fgc,
        Operator::TmbMetro,
        Operator::Metrovalencia,
    ];

    pub fn code(self) -> &'static str {
        match self {
            Operator::Renfe => "renfe",
            Operator::MetroBilbao => "metro_bilbao",
            Operator::Euskotren => "euskotren",
            Operator::Fgc => "fgc",
            Operator::TmbMetro => "tmb_metro",
            Operator::Metrovalencia => "metrovalencia",
        }
    }

    pub fn display_name(self) -> &'static str {
        match self {
            Operator::Renfe => "Renfe Cercanías",
            Operator::MetroBilbao => "Metro Bilbao",
            Operator::Euskotren => "Euskotren",
            Operator::Fgc => "FGC",
            Operator::TmbMetro => "TMB Metro Barcelona",
            Operator::Metrovalencia => "Metrovalencia",
        }
    }

    pub fn prefix(self) -> &'static str {
        match self {
            Operator::Renfe => "RENFE_",
            Operator::MetroBilbao => "METRO_BILBAO_",
            Operator::Euskotren => "EUSKOTREN_",
            Operator::Fgc => "FGC_",
            Operator::TmbMetro => "TMB_METRO_1.",
            Operator::Metrovalencia => "METROVALENCIA_",
        }
    }

    /// Whether trip identifiers from this operator carry the canonical prefix.
    ///
    /// Renfe is the exception: its realtime trip IDs must join verbatim with
    /// the static GTFS trip table, which was imported unprefixed.
    pub fn prefixes_trip_ids(self) -> bool {
        !matches!(self, Operator::Renfe)
    }
}

/// Prefixes already in the canonical namespace. An incoming ID that starts
/// with any of these passes through unchanged.
const KNOWN_PREFIXES: [&str; 9] = [
    "RENFE_",
    "METRO_BILBAO_",
    "EUSKOTREN_",
    "FGC_",
    "TMB_METRO_",
    "METROVALENCIA_",
    "METRO_",
    "ML_",
    "TRAM_",
];

/// Operator-side stop-ID churn: the realtime feeds still emit retired codes
/// for a few stations.
static STOP_ALIASES: phf::Map<&'static str, &'static str> = phf::phf_map! {
    // Avilés-CIM was renumbered to Avilés (C3 Asturias)
    "5222" => "16403",
};

fn checked(raw: &str) -> Result<&str, MalformedId> {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return Err(MalformedId { raw: raw.to_owned() });
    }
    Ok(trimmed)
}

fn with_prefix(operator: Operator, raw: &str) -> String {
    if KNOWN_PREFIXES.iter().any(|prefix| raw.starts_with(prefix)) {
        return raw.to_owned();
    }
    format!("{}{}", operator.prefix(), raw)
}

/// Normalize a stop identifier, applying the alias table first.
pub fn prefix_stop(operator: Operator, raw: &str) -> Result<String, MalformedId> {
    let raw = checked(raw)?;
    let mapped = STOP_ALIASES.get(raw).copied().unwrap_or(raw);
    Ok(with_prefix(operator, mapped))
}

/// Normalize a trip identifier. Renfe trips stay unprefixed (see
/// [`Operator::prefixes_trip_ids`]); everything else is prefixed.
pub fn prefix_trip(operator: Operator, raw: &str) -> Result<String, MalformedId> {
    let raw = checked(raw)?;
    if !operator.prefixes_trip_ids() {
        return Ok(raw.to_owned());
    }
    Ok(with_prefix(operator, raw))
}

/// Normalize a route identifier.
pub fn prefix_route(operator: Operator, raw: &str) -> Result<String, MalformedId> {
    let raw = checked(raw)?;
    Ok(with_prefix(operator, raw))
}

/// Normalize a vehicle or alert identifier.
pub fn prefix_entity(operator: Operator, raw: &str) -> Result<String, MalformedId> {
    let raw = checked(raw)?;
    Ok(with_prefix(operator, raw))
}

/// Destinations selecting the "b" variant of a split Madrid line. Anything
/// else falls back to the "a" variant. C4 and C8 do not exist as services,
/// only C4a/C4b and C8a/C8b do.
fn variant_b_keywords(short_name: &str) -> Option<&'static [&'static str]> {
    match short_name {
        "C4" => Some(&["colmenar", "viejo"]),
        "C8" => Some(&["cercedilla"]),
        _ => None,
    }
}

/// Rewrite `C4`/`C8` to the variant the headsign selects. Other names pass
/// through. Idempotent: `C4a` is not a split candidate.
pub fn route_variant(short_name: &str, headsign: Option<&str>) -> String {
    let Some(keywords) = variant_b_keywords(short_name) else {
        return short_name.to_owned();
    };
    if let Some(headsign) = headsign {
        let lowered = headsign.to_lowercase();
        if keywords.iter().any(|keyword| lowered.contains(keyword)) {
            return format!("{short_name}b");
        }
    }
    format!("{short_name}a")
}

fn route_line_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"(?i)([CTR])([0-9]+[a-z]?)$").unwrap())
}

/// Extract a line short name (`C1`, `C8a`, `T1`, `R2`, …) from a Renfe GTFS-RT
/// route ID shaped `<nucleo>T<code><kind><line>`, e.g. `30T0024C5` → `C5`.
/// For C4/C8 the headsign decides the a/b variant.
pub fn extract_route_short_name(route_id: &str, headsign: Option<&str>) -> Option<String> {
    let captures = route_line_regex().captures(route_id)?;
    let short_name = format!(
        "{}{}",
        captures.get(1)?.as_str().to_uppercase(),
        captures.get(2)?.as_str()
    );
    Some(route_variant(&short_name, headsign))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn stop_prefixing_adds_operator_namespace() {
        assert_eq!(
            prefix_stop(Operator::Renfe, "17000").unwrap(),
            "RENFE_17000"
        );
        assert_eq!(
            prefix_stop(Operator::MetroBilbao, "7.0").unwrap(),
            "METRO_BILBAO_7.0"
        );
    }

    #[test]
    fn stop_prefixing_passes_through_known_prefixes() {
        assert_eq!(
            prefix_stop(Operator::Renfe, "RENFE_17000").unwrap(),
            "RENFE_17000"
        );
        assert_eq!(
            prefix_stop(Operator::Fgc, "METRO_BILBAO_7.0").unwrap(),
            "METRO_BILBAO_7.0"
        );
    }

    #[test]
    fn stop_aliases_apply_before_prefixing() {
        assert_eq!(
            prefix_stop(Operator::Renfe, "5222").unwrap(),
            "RENFE_16403"
        );
    }

    #[test]
    fn renfe_trips_stay_unprefixed() {
        assert_eq!(prefix_trip(Operator::Renfe, "R12345").unwrap(), "R12345");
    }

    #[test]
    fn other_operator_trips_are_prefixed() {
        assert_eq!(
            prefix_trip(Operator::Euskotren, "E1_001").unwrap(),
            "EUSKOTREN_E1_001"
        );
        assert_eq!(
            prefix_trip(Operator::Fgc, "FGC_S1_07").unwrap(),
            "FGC_S1_07"
        );
    }

    #[test]
    fn empty_ids_are_malformed() {
        assert!(prefix_stop(Operator::Renfe, "").is_err());
        assert!(prefix_trip(Operator::Fgc, "   ").is_err());
    }

    #[test]
    fn short_name_extraction() {
        assert_eq!(
            extract_route_short_name("30T0024C5", None),
            Some("C5".to_owned())
        );
        assert_eq!(
            extract_route_short_name("31T0009T1", None),
            Some("T1".to_owned())
        );
        assert_eq!(
            extract_route_short_name("51T0025R2", None),
            Some("R2".to_owned())
        );
        assert_eq!(extract_route_short_name("garbage", None), None);
    }

    #[test]
    fn c4_variant_split_by_headsign() {
        assert_eq!(
            extract_route_short_name("10T0030C4", Some("Colmenar Viejo")),
            Some("C4b".to_owned())
        );
        assert_eq!(
            extract_route_short_name("10T0030C4", Some("Alcobendas")),
            Some("C4a".to_owned())
        );
        assert_eq!(
            extract_route_short_name("10T0038C8", Some("Cercedilla")),
            Some("C8b".to_owned())
        );
        // Cotos is C9, not a C8 variant keyword
        assert_eq!(
            extract_route_short_name("10T0038C8", Some("Cotos")),
            Some("C8a".to_owned())
        );
    }

    #[test]
    fn variant_rewrite_is_stable_under_repeat() {
        let once = route_variant("C4", Some("Colmenar Viejo"));
        let twice = route_variant(&once, Some("Colmenar Viejo"));
        assert_eq!(once, "C4b");
        assert_eq!(once, twice);
    }
}
