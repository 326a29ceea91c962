//! Human-readable labels for configuration strings.
//!
//! Known configuration strings are mapped to orbital notations written in
//! LaTeX math markup (`$\pi_2^*$`). The report keeps that markup verbatim;
//! the heatmap uses [`plain_text_label`] since it cannot typeset math.

use lazy_static::lazy_static;
use std::collections::HashMap;

lazy_static! {
    static ref BUILTIN_LABELS: HashMap<&'static str, &'static str> = HashMap::from([
        ("2222222u000000", r"$\pi_1^*$"),
        ("222222200u0000", r"$\pi_3^*$"),
        ("22222220u00000", r"$\pi_2^*$"),
        ("22222u22000000", r"$\pi\pi_2^*$+$\pi_2^*$"),
        ("222222200000u0", r"$\pi_4^*$"),
        ("2222222000u000", r"$\sigma_{NO}^*$"),
        ("22222220000u00", r"$\sigma_{{CCl}_1}^*$"),
        ("2222222000000u", r"$\sigma_{{CCl}_2}^*$"),
    ]);
}

/// Maps a configuration string to its built-in label.
///
/// Unknown configurations are returned unchanged.
///
/// ```
/// use cimap::labels::map_config_to_label;
///
/// assert_eq!(map_config_to_label("22222220u00000"), r"$\pi_2^*$");
/// assert_eq!(map_config_to_label("2u222220000000"), "2u222220000000");
/// ```
pub fn map_config_to_label(config: &str) -> &str {
    BUILTIN_LABELS.get(config).copied().unwrap_or(config)
}

/// Label lookup with user-defined overrides on top of the built-in table.
#[derive(Debug, Clone, Default)]
pub struct LabelMapper {
    overrides: HashMap<String, String>,
}

impl LabelMapper {
    /// Creates a mapper that only knows the built-in labels.
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a mapper whose `overrides` take precedence over built-ins.
    pub fn with_overrides(overrides: HashMap<String, String>) -> Self {
        Self { overrides }
    }

    /// Returns the label for `config`, or `config` itself if unknown.
    pub fn label<'a>(&'a self, config: &'a str) -> &'a str {
        match self.overrides.get(config) {
            Some(label) => label.as_str(),
            None => map_config_to_label(config),
        }
    }
}

/// Strips LaTeX markup from a label for plain-text rendering.
///
/// Greek letter commands become their Unicode letters; `$`, braces, and the
/// sub/superscript markers are dropped.
///
/// ```
/// use cimap::labels::plain_text_label;
///
/// assert_eq!(plain_text_label(r"$\pi_2^*$"), "π2*");
/// assert_eq!(plain_text_label(r"$\sigma_{{CCl}_1}^*$"), "σCCl1*");
/// assert_eq!(plain_text_label("22222220u00000"), "22222220u00000");
/// ```
pub fn plain_text_label(label: &str) -> String {
    let mut out = String::with_capacity(label.len());
    let mut chars = label.chars().peekable();

    while let Some(c) = chars.next() {
        match c {
            '$' | '{' | '}' | '_' | '^' => {}
            '\\' => {
                let mut command = String::new();
                while let Some(&next) = chars.peek() {
                    if !next.is_ascii_alphabetic() {
                        break;
                    }
                    command.push(next);
                    chars.next();
                }
                match greek_letter(&command) {
                    Some(letter) => out.push(letter),
                    None => out.push_str(&command),
                }
            }
            _ => out.push(c),
        }
    }

    out
}

fn greek_letter(command: &str) -> Option<char> {
    let letter = match command {
        "alpha" => 'α',
        "beta" => 'β',
        "gamma" => 'γ',
        "delta" => 'δ',
        "pi" => 'π',
        "sigma" => 'σ',
        "phi" => 'φ',
        "psi" => 'ψ',
        "Pi" => 'Π',
        "Sigma" => 'Σ',
        _ => return None,
    };
    Some(letter)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_builtin_labels() {
        assert_eq!(map_config_to_label("2222222u000000"), r"$\pi_1^*$");
        assert_eq!(map_config_to_label("2222222000u000"), r"$\sigma_{NO}^*$");
    }

    #[test]
    fn test_unknown_config_passes_through() {
        let mapper = LabelMapper::new();
        assert_eq!(mapper.label("222222u2000000"), "222222u2000000");
    }

    #[test]
    fn test_overrides_take_precedence() {
        let overrides = HashMap::from([
            ("22222220u00000".to_string(), "S1".to_string()),
            ("2u222220000000".to_string(), "S2".to_string()),
        ]);
        let mapper = LabelMapper::with_overrides(overrides);
        assert_eq!(mapper.label("22222220u00000"), "S1");
        assert_eq!(mapper.label("2u222220000000"), "S2");
        assert_eq!(mapper.label("2222222u000000"), r"$\pi_1^*$");
    }

    #[test]
    fn test_plain_text_label_compound() {
        assert_eq!(
            plain_text_label(r"$\pi\pi_2^*$+$\pi_2^*$"),
            "ππ2*+π2*"
        );
        assert_eq!(plain_text_label(r"$\sigma_{NO}^*$"), "σNO*");
    }

    #[test]
    fn test_plain_text_label_unknown_command_kept() {
        assert_eq!(plain_text_label(r"$\mathrm{n}$"), "mathrmn");
    }
}
