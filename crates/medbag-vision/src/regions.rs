use image::RgbaImage;
use medbag_data::{RegionKind, Template};
use tracing::debug;

use crate::VisionError;

/// The three raw (pre-normalization) field crops of one bag photo
#[derive(Debug, Clone)]
pub struct RegionCrops {
    pub name: RgbaImage,
    pub med: RgbaImage,
    pub usage: RgbaImage,
}

impl RegionCrops {
    pub fn get(&self, kind: RegionKind) -> &RgbaImage {
        match kind {
            RegionKind::Name => &self.name,
            RegionKind::Medicine => &self.med,
            RegionKind::Usage => &self.usage,
        }
    }

    /// Crops keyed by their artifact file stem, in field order
    pub fn named(&self) -> [(&'static str, &RgbaImage); 3] {
        RegionKind::ALL.map(|kind| (kind.crop_stem(), self.get(kind)))
    }
}

/// Crop every template region, shifting all of them by `shift_y` (fraction of height).
pub fn extract_regions(
    image: &RgbaImage,
    template: &Template,
    shift_y: f64,
) -> Result<RegionCrops, VisionError> {
    let crop = |kind: RegionKind| {
        let region = medbag_capture::crop_region(image, template.rect(kind), shift_y)
            .map_err(|source| VisionError::Region { kind, source })?;
        debug!(
            "{} region {}x{} (template {}, shift {:+.3})",
            kind,
            region.width(),
            region.height(),
            template.id,
            shift_y
        );
        Ok::<_, VisionError>(region)
    };

    Ok(RegionCrops {
        name: crop(RegionKind::Name)?,
        med: crop(RegionKind::Medicine)?,
        usage: crop(RegionKind::Usage)?,
    })
}
