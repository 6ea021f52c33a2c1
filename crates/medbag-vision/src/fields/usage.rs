use regex::Regex;
use std::sync::OnceLock;

use medbag_state::cached_regex;

use super::{first_line, first_match, lines, Rule};

static LABELLED: OnceLock<Option<Regex>> = OnceLock::new();
static ADMINISTRATION: OnceLock<Option<Regex>> = OnceLock::new();
static DOSAGE: OnceLock<Option<Regex>> = OnceLock::new();
static KEYWORD_SENTENCE: OnceLock<Option<Regex>> = OnceLock::new();

const LABELLED_PATTERN: &str = r"(?:用法[及/]?用量|用法|用量)[:：]?\s*([^\n]+)";
const ADMINISTRATION_PATTERN: &str = r"(?i)(?:Administration|Directions?)[:：]?\s*([^.。]+)";
const DOSAGE_PATTERN: &str = r"(?i)Dosage[:：]?\s*([^.。]+)";
const KEYWORD_SENTENCE_PATTERN: &str = r"[^\n。]*(?:每|次|餐|飯前|飯後|早|中|晚|睡前)[^。]*";

const RULES: &[Rule] = &[
    Rule {
        name: "label",
        apply: labelled,
    },
    Rule {
        name: "directions",
        apply: directions,
    },
    Rule {
        name: "keyword-sentence",
        apply: keyword_sentence,
    },
    Rule {
        name: "first-line",
        apply: first_spaced_line,
    },
];

/// Usage/dosage instructions. Pattern rules read the region as one line.
pub fn parse_usage(raw: &str) -> String {
    first_match("usage", RULES, raw)
}

/// Full-width spaces become spaces; non-empty lines are trimmed and space-joined.
fn single_line(raw: &str) -> String {
    let spaced = raw.replace('\u{3000}', " ");
    lines(&spaced).join(" ")
}

fn labelled(raw: &str) -> Option<String> {
    let text = single_line(raw);
    let caps = cached_regex(&LABELLED, LABELLED_PATTERN)?.captures(&text)?;
    non_empty(caps.get(1)?.as_str())
}

/// English "Administration"/"Directions" and "Dosage" sentences
fn directions(raw: &str) -> Option<String> {
    let text = single_line(raw);
    let text = text.as_str();
    let segment = |re: Option<&Regex>| {
        re.and_then(|re| re.captures(text))
            .and_then(|caps| caps.get(1))
            .and_then(|m| non_empty(m.as_str()))
    };
    let parts: Vec<String> = [
        segment(cached_regex(&ADMINISTRATION, ADMINISTRATION_PATTERN)),
        segment(cached_regex(&DOSAGE, DOSAGE_PATTERN)),
    ]
    .into_iter()
    .flatten()
    .collect();

    (!parts.is_empty()).then(|| parts.join("；"))
}

/// The first sentence mentioning a frequency, meal or time-of-day term
fn keyword_sentence(raw: &str) -> Option<String> {
    let re = cached_regex(&KEYWORD_SENTENCE, KEYWORD_SENTENCE_PATTERN)?;
    non_empty(re.find(&single_line(raw))?.as_str())
}

fn first_spaced_line(raw: &str) -> Option<String> {
    first_line(&raw.replace('\u{3000}', " "))
}

fn non_empty(s: &str) -> Option<String> {
    let s = s.trim();
    (!s.is_empty()).then(|| s.to_string())
}
