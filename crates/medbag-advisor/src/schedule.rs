use medbag_state::{Slot, UsageSchedule};
use tracing::debug;

/// Phrases meaning "with all three meals"
const THREE_MEALS: &[&str] = &["三餐", "每日3餐", "一天三次", "Three times a day"];
const AFTER_MEAL: &[&str] = &["飯後", "餐後"];
const BEFORE_MEAL: &str = "飯前";

/// Derive the icon schedule from a usage string. Total: every input yields a schedule.
pub fn resolve(usage: &str) -> UsageSchedule {
    let slots = if THREE_MEALS.iter().any(|p| usage.contains(p)) {
        Slot::ALL.to_vec()
    } else {
        // Slot::ALL is already in canonical order, so filtering keeps it sorted and distinct
        Slot::ALL
            .into_iter()
            .filter(|slot| usage.contains(slot.token()))
            .collect()
    };

    // "before meal" wins even when both phrases appear
    let after_meal =
        AFTER_MEAL.iter().any(|p| usage.contains(p)) && !usage.contains(BEFORE_MEAL);

    debug!("Usage '{}' → slots {:?}, after_meal {}", usage, slots, after_meal);
    UsageSchedule { slots, after_meal }
}
