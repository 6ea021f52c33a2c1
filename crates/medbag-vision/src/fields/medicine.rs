use regex::Regex;
use std::sync::OnceLock;

use medbag_state::cached_regex;

use super::{first_line, first_match, has_cjk, lines, Rule};

static CJK_LABEL: OnceLock<Option<Regex>> = OnceLock::new();
static LATIN_LABEL: OnceLock<Option<Regex>> = OnceLock::new();
static UNIT: OnceLock<Option<Regex>> = OnceLock::new();
static UP_TO_COLON: OnceLock<Option<Regex>> = OnceLock::new();

const CJK_LABEL_PATTERN: &str = r"藥名|藥品名稱|商品名|學名";
const LATIN_LABEL_PATTERN: &str = r"(?i)Drug\s*Name|Generic\s*Name|Brand\s*Name";
const UNIT_PATTERN: &str = r"(?i)mg|mcg|g|tab|tablet|capsule|錠|膠囊|片|mL";
const UP_TO_COLON_PATTERN: &str = r".*?[:：]";

/// Joined between candidates
const SEPARATOR: &str = "；";

const RULES: &[Rule] = &[
    Rule {
        name: "candidates",
        apply: candidates,
    },
    Rule {
        name: "first-line",
        apply: first_line,
    },
];

/// Medicine name(s): labelled lines and lines carrying a dosage unit,
/// CJK candidates first.
pub fn parse_medicine(raw: &str) -> String {
    first_match("medicine", RULES, raw)
}

/// Candidate lines split by script
#[derive(Debug, Default, PartialEq)]
struct Candidates {
    cjk: Vec<String>,
    latin: Vec<String>,
}

impl Candidates {
    fn collect(raw: &str) -> Option<Self> {
        let cjk_label = cached_regex(&CJK_LABEL, CJK_LABEL_PATTERN)?;
        let latin_label = cached_regex(&LATIN_LABEL, LATIN_LABEL_PATTERN)?;
        let unit = cached_regex(&UNIT, UNIT_PATTERN)?;

        let mut found = Self::default();
        for line in lines(raw) {
            if cjk_label.is_match(line) {
                if let Some(tail) = strip_label(line) {
                    found.cjk.push(tail);
                    continue;
                }
            }
            if latin_label.is_match(line) {
                if let Some(tail) = strip_label(line) {
                    found.latin.push(tail);
                    continue;
                }
            }
            if unit.is_match(line) {
                if has_cjk(line) {
                    found.cjk.push(line.to_string());
                } else {
                    found.latin.push(line.to_string());
                }
            }
        }

        dedup(&mut found.cjk);
        dedup(&mut found.latin);
        Some(found)
    }

    /// 2 CJK + 2 Latin when both exist, otherwise up to 3 of whichever does
    fn compose(&self) -> Option<String> {
        let picked: Vec<&str> = match (self.cjk.is_empty(), self.latin.is_empty()) {
            (false, false) => self
                .cjk
                .iter()
                .take(2)
                .chain(self.latin.iter().take(2))
                .map(String::as_str)
                .collect(),
            (false, true) => self.cjk.iter().take(3).map(String::as_str).collect(),
            (true, false) => self.latin.iter().take(3).map(String::as_str).collect(),
            (true, true) => return None,
        };
        Some(picked.join(SEPARATOR))
    }
}

fn candidates(raw: &str) -> Option<String> {
    Candidates::collect(raw)?.compose()
}

/// Drop everything up to each colon; `None` when nothing is left.
fn strip_label(line: &str) -> Option<String> {
    let re = cached_regex(&UP_TO_COLON, UP_TO_COLON_PATTERN)?;
    let tail = re.replace_all(line, "");
    let tail = tail.trim();
    (!tail.is_empty()).then(|| tail.to_string())
}

/// Remove repeats, keeping first-seen order
fn dedup(items: &mut Vec<String>) {
    let mut seen = std::collections::HashSet::new();
    items.retain(|item| seen.insert(item.clone()));
}
