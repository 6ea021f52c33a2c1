use regex::Regex;
use std::sync::OnceLock;

use medbag_state::cached_regex;

use super::{first_line, first_match, Rule};

static LABELLED: OnceLock<Option<Regex>> = OnceLock::new();
static WITH_HONORIFIC: OnceLock<Option<Regex>> = OnceLock::new();
static IDEOGRAPHS: OnceLock<Option<Regex>> = OnceLock::new();

// The honorific branch is tried first with a lazy name so "王小明先生" keeps its suffix
const LABELLED_PATTERN: &str = r"(?i)(?:姓名|姓\s*名|Name)\s*[:：]\s*(?:([\x{4e00}-\x{9fa5}]{2,4}?)(先生|小姐|女士|君)|([\x{4e00}-\x{9fa5}]{2,4}))";
const WITH_HONORIFIC_PATTERN: &str = r"[\x{4e00}-\x{9fa5}]{2,4}(?:先生|小姐|女士|君)";
const IDEOGRAPHS_PATTERN: &str = r"[\x{4e00}-\x{9fa5}]{2,4}";

const RULES: &[Rule] = &[
    Rule {
        name: "label",
        apply: labelled,
    },
    Rule {
        name: "honorific",
        apply: with_honorific,
    },
    Rule {
        name: "ideographs",
        apply: ideographs,
    },
    Rule {
        name: "first-line",
        apply: first_line,
    },
];

/// Patient name: 2-4 ideographs, keeping an honorific when one follows.
pub fn parse_name(raw: &str) -> String {
    first_match("name", RULES, raw)
}

/// Spaces dropped (line breaks kept), full-width colon normalised
fn compact(raw: &str) -> String {
    raw.chars()
        .filter(|c| *c == '\n' || !c.is_whitespace())
        .map(|c| if c == '：' { ':' } else { c })
        .collect()
}

fn labelled(raw: &str) -> Option<String> {
    let caps = cached_regex(&LABELLED, LABELLED_PATTERN)?.captures(raw)?;
    match (caps.get(1), caps.get(2), caps.get(3)) {
        (Some(given), Some(suffix), _) => Some(format!("{}{}", given.as_str(), suffix.as_str())),
        (_, _, Some(bare)) => Some(bare.as_str().to_string()),
        _ => None,
    }
}

fn with_honorific(raw: &str) -> Option<String> {
    let re = cached_regex(&WITH_HONORIFIC, WITH_HONORIFIC_PATTERN)?;
    re.find(&compact(raw)).map(|m| m.as_str().to_string())
}

fn ideographs(raw: &str) -> Option<String> {
    let re = cached_regex(&IDEOGRAPHS, IDEOGRAPHS_PATTERN)?;
    re.find(&compact(raw)).map(|m| m.as_str().to_string())
}
