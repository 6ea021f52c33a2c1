//! Script handed to the text-to-speech service.
//!
//! The voice only speaks Chinese, so Latin words, parenthesised asides and
//! anything outside CJK text, punctuation and digits are dropped before the
//! fields are stitched into a short, friendly announcement.

use medbag_state::{cached_regex, ExtractionRecord};
use regex::Regex;
use std::sync::OnceLock;

/// Spoken when nothing usable was read off the bag
pub const RETAKE_PROMPT: &str = "不好意思，我看不清楚上面的字，請重新拍一張照片。";

static LATIN_WORD: OnceLock<Option<Regex>> = OnceLock::new();
static ASIDE: OnceLock<Option<Regex>> = OnceLock::new();
static TIMES: OnceLock<Option<Regex>> = OnceLock::new();
static UNIT: OnceLock<Option<Regex>> = OnceLock::new();
static UNSPEAKABLE: OnceLock<Option<Regex>> = OnceLock::new();
static SPACES: OnceLock<Option<Regex>> = OnceLock::new();

const LATIN_WORD_PATTERN: &str = r"[0-9.]*[A-Za-z][A-Za-z0-9.]*";
const ASIDE_PATTERN: &str = r"（.*?）|\(.*?\)";
const TIMES_PATTERN: &str = r"(\d+)\s*次";
const UNIT_PATTERN: &str = r"(\d+)\s*(錠|粒|毫克|毫升|克)";
const UNSPEAKABLE_PATTERN: &str = concat!(
    r"[^\x{4e00}-\x{9fff}\x{3400}-\x{4dbf}",
    r"\x{20000}-\x{2a6df}\x{2a700}-\x{2b73f}\x{2b740}-\x{2b81f}",
    r"\x{2b820}-\x{2ceaf}\x{2ceb0}-\x{2ebef}\x{30000}-\x{3134f}",
    r"，。；、：！？（）《》「」『』—·．\x{ff01}-\x{ff5e}\d％\- ]",
);
const SPACES_PATTERN: &str = r"\s+";

fn replace(text: &str, cell: &'static OnceLock<Option<Regex>>, pattern: &str, with: &str) -> String {
    match cached_regex(cell, pattern) {
        Some(re) => re.replace_all(text, with).into_owned(),
        None => text.to_string(),
    }
}

/// Latin words and asides removed, leftover separators trimmed
fn clean_field(field: &str) -> String {
    let text = replace(field, &LATIN_WORD, LATIN_WORD_PATTERN, " ");
    let text = replace(&text, &ASIDE, ASIDE_PATTERN, "");
    let text = replace(&text, &SPACES, SPACES_PATTERN, " ");
    text.trim_matches(|c: char| c.is_whitespace() || "；;、，,".contains(c))
        .to_string()
}

/// Only CJK, CJK punctuation, digits and single spaces survive
fn keep_chinese(text: &str) -> String {
    let text = text.replace('\u{3000}', " ");
    let text = replace(&text, &UNSPEAKABLE, UNSPEAKABLE_PATTERN, " ");
    replace(&text, &SPACES, SPACES_PATTERN, " ").trim().to_string()
}

/// Build the announcement for one bag.
pub fn build_script(record: &ExtractionRecord) -> String {
    let name = clean_field(&record.patient_name);
    let medicine = clean_field(&record.medicine_name);
    let usage = clean_field(&record.usage_dosage);
    if name.is_empty() && medicine.is_empty() && usage.is_empty() {
        return RETAKE_PROMPT.to_string();
    }

    // Digits read more clearly with a pause before the unit
    let usage = replace(&usage, &TIMES, TIMES_PATTERN, "$1 次");
    let usage = replace(&usage, &UNIT, UNIT_PATTERN, "$1 $2");

    let mut script = if name.is_empty() {
        "您好。".to_string()
    } else {
        format!("{} 您好。", name)
    };
    if medicine.is_empty() {
        script.push_str("這包藥的資訊如下。");
    } else {
        script.push_str(&format!("這包藥是：{}。", medicine));
    }
    if !usage.is_empty() {
        script.push_str(&format!(" 請注意用法：{}。", usage));
    }

    let spoken = keep_chinese(&script);
    if spoken.chars().count() < 5 {
        return RETAKE_PROMPT.to_string();
    }
    spoken
}
