use image::{GrayImage, Luma, RgbaImage};
use imageproc::distance_transform::Norm;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::VisionError;

/// Tuning for the OCR preprocessing chain
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct NormalizeOptions {
    /// Bilateral filter radius (2 = 5x5 window, 0 = no smoothing)
    pub bilateral_radius: u32,
    pub sigma_color: f32,
    pub sigma_space: f32,
    /// Radius of the morphological opening; `Some(0)` is a 1x1 element, `None` skips it
    pub open_radius: Option<u8>,
}

impl Default for NormalizeOptions {
    fn default() -> Self {
        Self {
            bilateral_radius: 2,
            sigma_color: 25.0,
            sigma_space: 25.0,
            open_radius: Some(0),
        }
    }
}

/// Pre-process a cropped region for OCR:
/// 1. Convert to grayscale
/// 2. Edge-preserving bilateral smoothing
/// 3. Otsu binarization (bright → 255, dark → 0)
/// 4. Morphological opening to drop isolated specks
pub fn normalize(region: &RgbaImage, opts: &NormalizeOptions) -> Result<GrayImage, VisionError> {
    let (w, h) = region.dimensions();
    if w == 0 || h == 0 {
        return Err(VisionError::EmptyRegion {
            width: w,
            height: h,
        });
    }

    let gray = image::imageops::grayscale(region);
    let smoothed = smooth(&gray, opts);

    let level = imageproc::contrast::otsu_level(&smoothed);
    debug!("Otsu level {} for {}x{} region", level, w, h);
    let binary = GrayImage::from_fn(w, h, |x, y| {
        if smoothed.get_pixel(x, y)[0] > level {
            Luma([255u8])
        } else {
            Luma([0u8])
        }
    });

    Ok(match opts.open_radius {
        Some(k) => imageproc::morphology::open(&binary, Norm::LInf, k),
        None => binary,
    })
}

/// Edge-preserving smoothing over a `2r+1` square window; radius 0 passes through.
fn smooth(gray: &GrayImage, opts: &NormalizeOptions) -> GrayImage {
    if opts.bilateral_radius == 0 {
        return gray.clone();
    }
    imageproc::filter::bilateral_filter(
        gray,
        2 * opts.bilateral_radius + 1,
        opts.sigma_color,
        opts.sigma_space,
    )
}
