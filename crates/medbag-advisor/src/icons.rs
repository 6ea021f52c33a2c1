use image::{DynamicImage, RgbaImage};
use medbag_state::{Slot, UsageSchedule};
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::{debug, info};

#[derive(Debug, Error)]
pub enum ComposeError {
    #[error("missing icon asset {path}: {source}")]
    MissingAsset {
        path: PathBuf,
        #[source]
        source: image::ImageError,
    },
    #[error("schedule has no slots and no meal icon, nothing to render")]
    NothingToRender,
    #[error("failed to write {path}: {source}")]
    Write {
        path: PathBuf,
        #[source]
        source: image::ImageError,
    },
}

/// Icon files for each slot plus the meal plate
#[derive(Debug, Clone)]
pub struct IconSet {
    pub morning: PathBuf,
    pub noon: PathBuf,
    pub evening: PathBuf,
    pub meal: PathBuf,
}

impl IconSet {
    /// Standard file names (`sun.png`, `cloud.png`, `moon.png`, `plate.png`) under `dir`
    pub fn in_dir(dir: &Path) -> Self {
        Self {
            morning: dir.join("sun.png"),
            noon: dir.join("cloud.png"),
            evening: dir.join("moon.png"),
            meal: dir.join("plate.png"),
        }
    }

    pub fn slot(&self, slot: Slot) -> &Path {
        match slot {
            Slot::Morning => &self.morning,
            Slot::Noon => &self.noon,
            Slot::Evening => &self.evening,
        }
    }
}

fn load_icon(path: &Path) -> Result<RgbaImage, ComposeError> {
    image::open(path)
        .map(|img| img.to_rgba8())
        .map_err(|source| ComposeError::MissingAsset {
            path: path.to_path_buf(),
            source,
        })
}

/// Lay the schedule out left to right: one icon per slot, then the plate when
/// the medicine is taken after meals. `skip_last` drops the final slot first.
pub fn compose_icons(
    schedule: &UsageSchedule,
    icons: &IconSet,
    skip_last: bool,
) -> Result<RgbaImage, ComposeError> {
    let mut slots: &[Slot] = &schedule.slots;
    if skip_last && !slots.is_empty() {
        slots = &slots[..slots.len() - 1];
    }

    let mut tiles = Vec::with_capacity(slots.len() + 1);
    for slot in slots {
        tiles.push(load_icon(icons.slot(*slot))?);
    }
    if schedule.after_meal {
        tiles.push(load_icon(&icons.meal)?);
    }
    if tiles.is_empty() {
        return Err(ComposeError::NothingToRender);
    }

    let height = tiles.iter().map(|t| t.height()).max().unwrap_or(0);
    let width = tiles.iter().map(|t| t.width()).sum();
    let mut canvas = RgbaImage::new(width, height);

    let mut x = 0i64;
    for tile in &tiles {
        let y = ((height - tile.height()) / 2) as i64;
        image::imageops::overlay(&mut canvas, tile, x, y);
        x += tile.width() as i64;
    }

    debug!("Composed {} icon(s) into {}x{}", tiles.len(), width, height);
    Ok(canvas)
}

/// Compose and save as an RGB image (transparent areas become black, as in most viewers).
pub fn save_icons(
    schedule: &UsageSchedule,
    icons: &IconSet,
    skip_last: bool,
    path: &Path,
) -> Result<(), ComposeError> {
    let canvas = compose_icons(schedule, icons, skip_last)?;
    let wrap = |source| ComposeError::Write {
        path: path.to_path_buf(),
        source,
    };
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent).map_err(|e| wrap(image::ImageError::IoError(e)))?;
    }
    DynamicImage::ImageRgba8(canvas)
        .to_rgb8()
        .save(path)
        .map_err(wrap)?;
    info!("Usage icons saved to {}", path.display());
    Ok(())
}
