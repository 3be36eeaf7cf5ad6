//! Platform extraction, polymorphic over the operators' encodings.

use std::sync::OnceLock;

use regex::Regex;
use utility::ids::Operator;

fn label_platform_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    // Renfe/FGC vehicle labels look like "C4-23603-PLATF.(8)"
    RE.get_or_init(|| Regex::new(r"PLATF\.\((\d+)\)").unwrap())
}

fn quay_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    // Euskotren quay IDs look like "ES:Euskotren:Quay:2621_Plataforma_Q1:"
    RE.get_or_init(|| Regex::new(r"_Plataforma_Q(\d+)").unwrap())
}

fn trailing_digits_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    // FGC platform stops carry the platform as a trailing digit: PC2, AB1
    RE.get_or_init(|| Regex::new(r"(\d+)$").unwrap())
}

fn line_label_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"(?i)\b([LSR]\d{1,2})\b").unwrap())
}

/// Extract the platform for one observation, using whatever encoding the
/// operator has.
pub fn extract_platform(
    operator: Operator,
    raw_stop_id: Option<&str>,
    label: Option<&str>,
    direction_id: Option<u32>,
) -> Option<String> {
    if let Some(stop_id) = raw_stop_id {
        if operator == Operator::Euskotren || stop_id.contains("_Plataforma_Q") {
            return quay_regex()
                .captures(stop_id)
                .map(|captures| captures[1].to_owned());
        }
    }

    match operator {
        Operator::MetroBilbao => match direction_id {
            Some(direction @ (1 | 2)) => Some(direction.to_string()),
            _ => None,
        },
        Operator::Renfe => from_label(label),
        Operator::Fgc => from_label(label).or_else(|| {
            raw_stop_id.and_then(|stop_id| {
                trailing_digits_regex()
                    .captures(stop_id)
                    .map(|captures| captures[1].to_owned())
            })
        }),
        // TMB and Metrovalencia carry the platform as an explicit via field,
        // handled by their decoders.
        _ => None,
    }
}

fn from_label(label: Option<&str>) -> Option<String> {
    label.and_then(|label| {
        label_platform_regex()
            .captures(label)
            .map(|captures| captures[1].to_owned())
    })
}

/// FGC vehicle labels embed the line name (L6, S1, R5…).
pub fn route_short_name_from_label(label: &str) -> Option<String> {
    line_label_regex()
        .captures(label)
        .map(|captures| captures[1].to_uppercase())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn renfe_label_platform() {
        assert_eq!(
            extract_platform(Operator::Renfe, None, Some("C4-23603-PLATF.(8)"), None),
            Some("8".to_owned())
        );
        assert_eq!(
            extract_platform(Operator::Renfe, None, Some("C4-23603"), None),
            None
        );
    }

    #[test]
    fn euskotren_quay_platform() {
        assert_eq!(
            extract_platform(
                Operator::Euskotren,
                Some("ES:Euskotren:Quay:2621_Plataforma_Q1:"),
                None,
                None
            ),
            Some("1".to_owned())
        );
        assert_eq!(
            extract_platform(Operator::Euskotren, Some("ES:Euskotren:Quay:2621"), None, None),
            None
        );
    }

    #[test]
    fn metro_bilbao_direction_platform() {
        assert_eq!(
            extract_platform(Operator::MetroBilbao, Some("7.0"), None, Some(2)),
            Some("2".to_owned())
        );
        assert_eq!(
            extract_platform(Operator::MetroBilbao, Some("7.0"), None, Some(0)),
            None
        );
    }

    #[test]
    fn fgc_trailing_digit_platform() {
        assert_eq!(
            extract_platform(Operator::Fgc, Some("PC2"), None, None),
            Some("2".to_owned())
        );
        assert_eq!(extract_platform(Operator::Fgc, Some("PC"), None, None), None);
    }

    #[test]
    fn line_from_fgc_label() {
        assert_eq!(route_short_name_from_label("l6 Sarrià"), Some("L6".to_owned()));
        assert_eq!(route_short_name_from_label("S1"), Some("S1".to_owned()));
        assert_eq!(route_short_name_from_label("Tren 1234"), None);
    }
}
