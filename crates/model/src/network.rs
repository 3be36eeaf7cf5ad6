use serde::{Deserialize, Serialize};

/// How to handle base routes that exist alongside lettered variants when
/// listing a network's lines.
///
/// Cercanías exports carry a phantom C4/C8 next to the real C4a/C4b and
/// C8a/C8b; those bases must be hidden. Metro networks have genuinely
/// independent pairs like L7 and L7B, which must both be listed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum VariantPolicy {
    #[default]
    KeepAll,
    HideBaseWhenVariantsExist,
}

impl VariantPolicy {
    pub fn from_str_or_default(value: Option<&str>) -> Self {
        match value {
            Some("hide_base_when_variants_exist") => {
                VariantPolicy::HideBaseWhenVariantsExist
            }
            _ => VariantPolicy::KeepAll,
        }
    }
}

#[serde_with::skip_serializing_none]
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Network {
    pub code: String,
    pub name: String,
    pub region: Option<String>,
    pub transport_type: Option<String>,
    pub color: Option<String>,
    pub text_color: Option<String>,
    #[serde(default)]
    pub variant_policy: VariantPolicy,
}

#[serde_with::skip_serializing_none]
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Agency {
    pub id: String,
    pub name: String,
    pub url: Option<String>,
    pub timezone: Option<String>,
}

/// Apply a network's variant policy to a list of route short names, returning
/// the base names that should be hidden.
pub fn hidden_base_routes<'a, I>(policy: VariantPolicy, short_names: I) -> Vec<String>
where
    I: IntoIterator<Item = &'a str> + Clone,
{
    if policy != VariantPolicy::HideBaseWhenVariantsExist {
        return Vec::new();
    }

    let names: Vec<&str> = short_names.into_iter().collect();
    let mut hidden = Vec::new();
    for name in &names {
        let Some(last) = name.chars().last() else {
            continue;
        };
        if name.len() > 1 && last.is_ascii_alphabetic() && last.is_lowercase() {
            let base = &name[..name.len() - 1];
            if names.iter().any(|candidate| *candidate == base)
                && !hidden.iter().any(|h| h == base)
            {
                hidden.push(base.to_owned());
            }
        }
    }
    hidden
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn cercanias_bases_are_hidden() {
        let names = ["C4", "C4a", "C4b", "C5"];
        let hidden = hidden_base_routes(
            VariantPolicy::HideBaseWhenVariantsExist,
            names.iter().copied(),
        );
        assert_eq!(hidden, vec!["C4".to_owned()]);
    }

    #[test]
    fn keep_all_hides_nothing() {
        let names = ["L7", "L7B"];
        let hidden = hidden_base_routes(VariantPolicy::KeepAll, names.iter().copied());
        assert!(hidden.is_empty());
    }

    #[test]
    fn uppercase_variants_do_not_hide_bases() {
        // Metro's L7B is an independent line, not a lowercase variant
        let names = ["L7", "L7B"];
        let hidden = hidden_base_routes(
            VariantPolicy::HideBaseWhenVariantsExist,
            names.iter().copied(),
        );
        assert!(hidden.is_empty());
    }
}
