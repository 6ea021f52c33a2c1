use anyhow::{Context, Result};
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::sync::OnceLock;

/// The three fields read off a medication bag.
/// Built once per photo; every field has had its periods stripped.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExtractionRecord {
    pub patient_name: String,
    pub medicine_name: String,
    pub usage_dosage: String,
}

impl ExtractionRecord {
    pub fn new(patient_name: &str, medicine_name: &str, usage_dosage: &str) -> Self {
        Self {
            patient_name: strip_periods(patient_name),
            medicine_name: strip_periods(medicine_name),
            usage_dosage: strip_periods(usage_dosage),
        }
    }

    /// Write as pretty UTF-8 JSON, CJK left unescaped.
    pub fn save(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)
                .with_context(|| format!("Failed to create {}", parent.display()))?;
        }
        let json = serde_json::to_string_pretty(self)?;
        std::fs::write(path, json)
            .with_context(|| format!("Failed to write {}", path.display()))?;
        tracing::info!("Record saved to {}", path.display());
        Ok(())
    }

    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read {}", path.display()))?;
        serde_json::from_str(&content)
            .with_context(|| format!("Failed to parse {}", path.display()))
    }
}

/// Remove full-width and half-width periods, then trim.
pub fn strip_periods(s: &str) -> String {
    s.replace(['。', '.'], "").trim().to_string()
}

/// Compile `pattern` once into `cell`. A pattern that fails to compile stays
/// `None`, so the caller's rule simply never matches.
pub fn cached_regex(cell: &'static OnceLock<Option<Regex>>, pattern: &str) -> Option<&'static Regex> {
    cell.get_or_init(|| Regex::new(pattern).ok()).as_ref()
}

/// Daily administration time
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Slot {
    Morning,
    Noon,
    Evening,
}

impl Slot {
    /// Canonical order
    pub const ALL: [Slot; 3] = [Slot::Morning, Slot::Noon, Slot::Evening];

    /// The single ideograph that names the slot on a bag
    pub fn token(&self) -> char {
        match self {
            Slot::Morning => '早',
            Slot::Noon => '中',
            Slot::Evening => '晚',
        }
    }
}

/// Icon-level schedule derived from the usage text
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct UsageSchedule {
    /// Distinct slots, ordered morning to evening
    pub slots: Vec<Slot>,
    pub after_meal: bool,
}

impl UsageSchedule {
    /// True when neither a slot nor a meal icon would be drawn
    pub fn is_empty(&self) -> bool {
        self.slots.is_empty() && !self.after_meal
    }
}
