//! Display-text normalization for GTFS data.

/// Articles and prepositions that stay lowercase in Spanish titles, except at
/// the first position.
const LOWERCASE_WORDS: [&str; 18] = [
    "de", "del", "la", "las", "los", "el", "y", "e", "o", "u", "a", "al", "en",
    "con", "por", "para", "sin", "sobre",
];

fn is_lowercase_word(word: &str) -> bool {
    LOWERCASE_WORDS.contains(&word)
}

fn capitalize(word: &str) -> String {
    let mut chars = word.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect(),
        None => String::new(),
    }
}

fn capitalize_hyphenated(word: &str) -> String {
    word.split('-')
        .map(|part| {
            if part.chars().all(|c| c.is_alphabetic()) {
                capitalize(part)
            } else {
                part.to_uppercase()
            }
        })
        .collect::<Vec<_>>()
        .join("-")
}

/// Normalize an ALL-CAPS headsign to Title Case; mixed-case input passes
/// through untouched, which makes the function idempotent.
///
/// `"PUERTA DEL SUR"` → `"Puerta del Sur"`, `"AEROPUERTO T-4"` →
/// `"Aeropuerto T-4"`.
pub fn normalize_headsign(text: &str) -> String {
    let has_upper = text.chars().any(|c| c.is_uppercase());
    let has_lower = text.chars().any(|c| c.is_lowercase());
    if !has_upper || has_lower {
        return text.to_owned();
    }

    text.to_lowercase()
        .split_whitespace()
        .enumerate()
        .map(|(position, word)| {
            if position > 0 && is_lowercase_word(word) {
                word.to_owned()
            } else if word.contains('-') {
                capitalize_hyphenated(word)
            } else {
                capitalize(word)
            }
        })
        .collect::<Vec<_>>()
        .join(" ")
}

pub fn normalize_headsign_opt(text: Option<&str>) -> Option<String> {
    text.map(normalize_headsign)
}

/// Strip the redundant " RENFE" suffix Renfe appends to station names inside
/// route long names: `"Guadalajara - Chamartín RENFE"` → `"Guadalajara - Chamartín"`.
pub fn normalize_route_long_name(text: &str) -> String {
    let mut result = String::with_capacity(text.len());
    for (index, segment) in text.split(" - ").enumerate() {
        if index > 0 {
            result.push_str(" - ");
        }
        let trimmed = segment.trim_end();
        let stripped = trimmed
            .strip_suffix(" RENFE")
            .or_else(|| trimmed.strip_suffix(" Renfe"))
            .unwrap_or(trimmed);
        result.push_str(stripped);
    }
    result.trim().to_owned()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn all_caps_becomes_title_case() {
        assert_eq!(normalize_headsign("PUERTA DEL SUR"), "Puerta del Sur");
        assert_eq!(normalize_headsign("TRES OLIVOS"), "Tres Olivos");
    }

    #[test]
    fn hyphenated_tokens_keep_digits_upper() {
        assert_eq!(normalize_headsign("AEROPUERTO T-4"), "Aeropuerto T-4");
    }

    #[test]
    fn mixed_case_passes_through() {
        assert_eq!(
            normalize_headsign("Hospital 12 de Octubre"),
            "Hospital 12 de Octubre"
        );
    }

    #[test]
    fn idempotent_on_normalized_output() {
        let once = normalize_headsign("COLMENAR VIEJO");
        let twice = normalize_headsign(&once);
        assert_eq!(once, twice);
    }

    #[test]
    fn particle_at_start_is_capitalized() {
        assert_eq!(normalize_headsign("EL ESCORIAL"), "El Escorial");
    }

    #[test]
    fn renfe_suffix_is_stripped_from_long_names() {
        assert_eq!(
            normalize_route_long_name("Guadalajara - Chamartín RENFE"),
            "Guadalajara - Chamartín"
        );
        assert_eq!(
            normalize_route_long_name("Chamartín RENFE - Aeropuerto T4"),
            "Chamartín - Aeropuerto T4"
        );
        assert_eq!(
            normalize_route_long_name("Parla - Colmenar Viejo"),
            "Parla - Colmenar Viejo"
        );
    }
}
