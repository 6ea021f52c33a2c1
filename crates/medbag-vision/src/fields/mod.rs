//! Field parsers: noisy OCR text in, one clean string out.
//!
//! Each parser is an ordered list of [`Rule`]s. Rules are tried in order and the
//! first one that yields a value wins; later rules never run. Every list ends
//! with a rule that cannot miss on non-blank input, and blank input produces an
//! empty string.

use tracing::debug;

mod medicine;
mod name;
mod usage;

pub use medicine::parse_medicine;
pub use name::parse_name;
pub use usage::parse_usage;

/// One named extraction attempt
#[derive(Clone, Copy)]
pub struct Rule {
    pub name: &'static str,
    pub apply: fn(&str) -> Option<String>,
}

/// Run `rules` against `raw` and return the first hit, or an empty string.
pub fn first_match(field: &str, rules: &[Rule], raw: &str) -> String {
    for rule in rules {
        if let Some(value) = (rule.apply)(raw) {
            debug!("{} parsed by rule '{}': '{}'", field, rule.name, value);
            return value;
        }
    }
    debug!("{}: no rule matched", field);
    String::new()
}

/// Trimmed, non-empty lines
pub(crate) fn lines(raw: &str) -> Vec<&str> {
    raw.lines().map(str::trim).filter(|l| !l.is_empty()).collect()
}

/// Final fallback shared by all parsers
pub(crate) fn first_line(raw: &str) -> Option<String> {
    lines(raw).first().map(|l| l.to_string())
}

pub(crate) fn has_cjk(s: &str) -> bool {
    s.chars().any(|c| ('\u{4e00}'..='\u{9fa5}').contains(&c))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn never(_: &str) -> Option<String> {
        None
    }

    fn shout(s: &str) -> Option<String> {
        Some(s.to_uppercase())
    }

    fn whisper(s: &str) -> Option<String> {
        Some(s.to_lowercase())
    }

    #[test]
    fn test_first_match_wins() {
        let rules = [
            Rule { name: "never", apply: never },
            Rule { name: "shout", apply: shout },
            Rule { name: "whisper", apply: whisper },
        ];
        assert_eq!(first_match("test", &rules, "Mixed"), "MIXED");
    }

    #[test]
    fn test_no_match_is_empty() {
        let rules = [Rule { name: "never", apply: never }];
        assert_eq!(first_match("test", &rules, "anything"), "");
    }

    #[test]
    fn test_first_line_skips_blank() {
        assert_eq!(first_line("\n  \n  第一行 \n第二行"), Some("第一行".to_string()));
        assert_eq!(first_line(" \u{3000}\n\t"), None);
    }

    #[test]
    fn test_blank_input_yields_empty_for_every_parser() {
        for raw in ["", "   ", "\n\t\n", "\u{3000}\u{3000}"] {
            assert_eq!(parse_name(raw), "", "name on {:?}", raw);
            assert_eq!(parse_medicine(raw), "", "medicine on {:?}", raw);
            assert_eq!(parse_usage(raw), "", "usage on {:?}", raw);
        }
    }
}
