//! Turns an extraction record into what the patient actually sees and hears:
//! an icon schedule and a script for the speech synthesizer.

pub mod icons;
pub mod schedule;
pub mod speech;

pub use icons::{compose_icons, save_icons, ComposeError, IconSet};
pub use schedule::resolve;
pub use speech::{build_script, RETAKE_PROMPT};
