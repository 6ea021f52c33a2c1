use image::RgbaImage;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::debug;

pub mod artifacts;

pub use artifacts::{load_label_font, save_crops, save_preview, PREVIEW_COLORS};

/// Rectangle in fractions (0.0-1.0) of the source image size
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct RelativeRect {
    pub x: f64,
    pub y: f64,
    pub width: f64,
    pub height: f64,
}

impl RelativeRect {
    pub const fn new(x: f64, y: f64, width: f64, height: f64) -> Self {
        Self {
            x,
            y,
            width,
            height,
        }
    }

    /// True when the rectangle has positive size and stays inside the unit square.
    pub fn is_within_unit(&self) -> bool {
        let finite = [self.x, self.y, self.width, self.height]
            .iter()
            .all(|v| v.is_finite());
        finite
            && self.x >= 0.0
            && self.y >= 0.0
            && self.width > 0.0
            && self.height > 0.0
            && self.x + self.width <= 1.0 + 1e-9
            && self.y + self.height <= 1.0 + 1e-9
    }

    /// Same rectangle moved vertically by `shift_y`, top edge clamped at 0.
    pub fn shifted(&self, shift_y: f64) -> Self {
        Self {
            y: (self.y + shift_y).max(0.0),
            ..*self
        }
    }
}

/// Pixel box with exclusive right/bottom edges
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PixelBounds {
    pub x1: i64,
    pub y1: i64,
    pub x2: i64,
    pub y2: i64,
}

impl PixelBounds {
    pub fn width(&self) -> i64 {
        self.x2 - self.x1
    }

    pub fn height(&self) -> i64 {
        self.y2 - self.y1
    }
}

impl fmt::Display for PixelBounds {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "x={}..{} y={}..{}", self.x1, self.x2, self.y1, self.y2)
    }
}

#[derive(Debug, Error)]
pub enum CaptureError {
    #[error("cannot open image {path}: {source}")]
    ImageLoadFailed {
        path: PathBuf,
        #[source]
        source: image::ImageError,
    },
    #[error("region maps to an empty or out-of-bounds box ({bounds}) on a {width}x{height} image")]
    InvalidRegion {
        bounds: PixelBounds,
        width: u32,
        height: u32,
    },
    #[error("failed to write {path}: {source}")]
    ArtifactWrite {
        path: PathBuf,
        #[source]
        source: image::ImageError,
    },
}

/// Load a bag photo from disk in any format the `image` decoder supports.
pub fn load_image(path: &Path) -> Result<RgbaImage, CaptureError> {
    let img = image::open(path).map_err(|source| CaptureError::ImageLoadFailed {
        path: path.to_path_buf(),
        source,
    })?;
    let rgba = img.to_rgba8();
    debug!(
        "Loaded {} ({}x{})",
        path.display(),
        rgba.width(),
        rgba.height()
    );
    Ok(rgba)
}

/// Map a relative rectangle (after vertical shift) onto pixel bounds.
///
/// `y' = max(0, y + shift_y)`, left/top edges are floored, the bottom edge is
/// clamped to the image height before flooring and the right edge to the image
/// width after. Boxes with no area are rejected.
pub fn pixel_bounds(
    width: u32,
    height: u32,
    rect: &RelativeRect,
    shift_y: f64,
) -> Result<PixelBounds, CaptureError> {
    let (wf, hf) = (width as f64, height as f64);
    let shifted = rect.shifted(shift_y);

    let to_px = |v: f64| -> i64 {
        if v.is_finite() {
            v.floor() as i64
        } else {
            -1
        }
    };

    let x1 = to_px(shifted.x * wf);
    let y1 = to_px(shifted.y * hf);
    let x2 = to_px((shifted.x + shifted.width) * wf).min(width as i64);
    let y2 = to_px((shifted.y + shifted.height).min(1.0) * hf);

    let bounds = PixelBounds { x1, y1, x2, y2 };
    let inside = x1 >= 0 && y1 >= 0 && x1 < width as i64 && y1 < height as i64;
    if !inside || bounds.width() <= 0 || bounds.height() <= 0 {
        return Err(CaptureError::InvalidRegion {
            bounds,
            width,
            height,
        });
    }
    Ok(bounds)
}

/// Crop a region from the source image using relative coordinates and a vertical shift.
/// The result is an owned copy; later edits never touch the source.
pub fn crop_region(
    image: &RgbaImage,
    rect: &RelativeRect,
    shift_y: f64,
) -> Result<RgbaImage, CaptureError> {
    let bounds = pixel_bounds(image.width(), image.height(), rect, shift_y)?;
    debug!("Cropping {}", bounds);
    Ok(image::imageops::crop_imm(
        image,
        bounds.x1 as u32,
        bounds.y1 as u32,
        bounds.width() as u32,
        bounds.height() as u32,
    )
    .to_image())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_pixel_bounds_floor() {
        let rect = RelativeRect::new(0.25, 0.5, 0.25, 0.125);
        let b = pixel_bounds(1001, 2000, &rect, 0.0).unwrap();
        assert_eq!(
            b,
            PixelBounds {
                x1: 250,
                y1: 1000,
                x2: 500,
                y2: 1250
            }
        );
    }

    #[test]
    fn test_negative_shift_clamps_top() {
        let rect = RelativeRect::new(0.125, 0.0625, 0.5, 0.125);
        let b = pixel_bounds(200, 200, &rect, -0.125).unwrap();
        assert_eq!(b.y1, 0);
        assert_eq!(b.y2, 25);
    }

    #[test]
    fn test_bottom_edge_clamped_to_height() {
        let rect = RelativeRect::new(0.0, 0.9, 0.5, 0.2);
        let b = pixel_bounds(100, 100, &rect, 0.0).unwrap();
        assert_eq!(b.y2, 100);
    }

    #[test]
    fn test_shift_past_bottom_is_invalid() {
        let rect = RelativeRect::new(0.0, 0.9, 0.5, 0.05);
        let err = pixel_bounds(100, 100, &rect, 0.2).unwrap_err();
        assert!(matches!(err, CaptureError::InvalidRegion { .. }));
    }

    #[test]
    fn test_zero_area_is_invalid() {
        let rect = RelativeRect::new(0.5, 0.5, 0.001, 0.2);
        assert!(pixel_bounds(100, 100, &rect, 0.0).is_err());
    }

    #[test]
    fn test_crop_region_is_deterministic_copy() {
        let img = RgbaImage::from_fn(200, 100, |x, y| {
            image::Rgba([(x % 256) as u8, (y % 256) as u8, 7, 255])
        });
        let rect = RelativeRect::new(0.25, 0.5, 0.5, 0.25);
        let a = crop_region(&img, &rect, 0.0).unwrap();
        let mut b = crop_region(&img, &rect, 0.0).unwrap();
        assert_eq!(a.dimensions(), (100, 25));
        assert_eq!(a, b);
        assert_eq!(a.get_pixel(0, 0), img.get_pixel(50, 50));

        b.put_pixel(0, 0, image::Rgba([0, 0, 0, 0]));
        assert_eq!(img.get_pixel(50, 50)[2], 7);
    }

    #[test]
    fn test_load_missing_image() {
        let err = load_image(Path::new("/nonexistent/bag.jpg")).unwrap_err();
        assert!(matches!(err, CaptureError::ImageLoadFailed { .. }));
    }

    #[test]
    fn test_is_within_unit() {
        assert!(RelativeRect::new(0.04, 0.27, 0.86, 0.08).is_within_unit());
        assert!(!RelativeRect::new(0.5, 0.0, 0.6, 0.1).is_within_unit());
        assert!(!RelativeRect::new(0.0, 0.0, 0.0, 0.1).is_within_unit());
    }
}
