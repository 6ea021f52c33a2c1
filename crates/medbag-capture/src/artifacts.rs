//! Debug artifacts for human review: the annotated preview and raw region crops.

use ab_glyph::{FontVec, PxScale};
use image::{DynamicImage, Rgba, RgbaImage};
use imageproc::drawing::{draw_filled_rect_mut, draw_hollow_rect_mut, draw_text_mut};
use imageproc::rect::Rect;
use std::path::Path;
use tracing::{debug, info, warn};

use crate::{CaptureError, RelativeRect};

/// Outline colors for regions 1, 2, 3 (crimson, dodger blue, forest green)
pub const PREVIEW_COLORS: [[u8; 3]; 3] = [[220, 20, 60], [30, 144, 255], [34, 139, 34]];

const STROKE: u32 = 6;
const TAB_WIDTH: u32 = 46;
const TAB_HEIGHT: u32 = 38;
const GLYPH_SCALE: u32 = 6;
const LABEL_PX: f32 = 34.0;

/// 3x5 bitmap digits for when no label font is available, high bit on the left
const DIGITS: [[u8; 5]; 10] = [
    [0b111, 0b101, 0b101, 0b101, 0b111],
    [0b010, 0b110, 0b010, 0b010, 0b111],
    [0b110, 0b001, 0b010, 0b100, 0b111],
    [0b110, 0b001, 0b010, 0b001, 0b110],
    [0b101, 0b101, 0b111, 0b001, 0b001],
    [0b111, 0b100, 0b110, 0b001, 0b110],
    [0b011, 0b100, 0b111, 0b101, 0b111],
    [0b111, 0b001, 0b010, 0b010, 0b010],
    [0b111, 0b101, 0b111, 0b101, 0b111],
    [0b111, 0b101, 0b111, 0b001, 0b110],
];

/// Load the TrueType/OpenType font used for preview labels. Missing or
/// unreadable fonts give `None` and the built-in bitmap digits are drawn.
pub fn load_label_font(path: &Path) -> Option<FontVec> {
    let bytes = match std::fs::read(path) {
        Ok(bytes) => bytes,
        Err(e) => {
            debug!("No label font at {}: {}", path.display(), e);
            return None;
        }
    };
    match FontVec::try_from_vec(bytes) {
        Ok(font) => Some(font),
        Err(e) => {
            warn!("Label font {} is unusable: {}", path.display(), e);
            None
        }
    }
}

/// Draw each region outlined and numbered from 1 on a copy of the source image.
pub fn annotate(image: &RgbaImage, rects: &[RelativeRect], font: Option<&FontVec>) -> RgbaImage {
    let mut canvas = image.clone();
    let (wf, hf) = (image.width() as f64, image.height() as f64);

    for (i, rect) in rects.iter().enumerate() {
        let [r, g, b] = PREVIEW_COLORS[i % PREVIEW_COLORS.len()];
        let color = Rgba([r, g, b, 255]);

        let x1 = (rect.x * wf).floor() as i32;
        let y1 = (rect.y * hf).floor() as i32;
        let x2 = ((rect.x + rect.width) * wf).floor() as i32;
        let y2 = ((rect.y + rect.height) * hf).floor() as i32;
        if x2 <= x1 || y2 <= y1 {
            continue;
        }

        draw_outline(&mut canvas, x1, y1, (x2 - x1) as u32, (y2 - y1) as u32, color);
        draw_filled_rect_mut(
            &mut canvas,
            Rect::at(x1, y1 - TAB_HEIGHT as i32).of_size(TAB_WIDTH, TAB_HEIGHT),
            color,
        );
        match font {
            Some(font) => draw_text_mut(
                &mut canvas,
                Rgba([255, 255, 255, 255]),
                x1 + 10,
                y1 - 36,
                PxScale::from(LABEL_PX),
                font,
                &(i + 1).to_string(),
            ),
            None => draw_digit(&mut canvas, (i + 1) % 10, x1 + 14, y1 - 34),
        }
    }

    canvas
}

fn draw_outline(canvas: &mut RgbaImage, x: i32, y: i32, w: u32, h: u32, color: Rgba<u8>) {
    for i in 0..STROKE {
        let (iw, ih) = (w.saturating_sub(2 * i), h.saturating_sub(2 * i));
        if iw == 0 || ih == 0 {
            break;
        }
        let rect = Rect::at(x + i as i32, y + i as i32).of_size(iw, ih);
        draw_hollow_rect_mut(canvas, rect, color);
    }
}

fn draw_digit(canvas: &mut RgbaImage, digit: usize, x: i32, y: i32) {
    let white = Rgba([255, 255, 255, 255]);
    for (row, bits) in DIGITS[digit].iter().enumerate() {
        for col in 0..3 {
            if bits & (0b100 >> col) == 0 {
                continue;
            }
            let px = x + (col * GLYPH_SCALE) as i32;
            let py = y + (row as u32 * GLYPH_SCALE) as i32;
            draw_filled_rect_mut(
                canvas,
                Rect::at(px, py).of_size(GLYPH_SCALE, GLYPH_SCALE),
                white,
            );
        }
    }
}

/// Save the annotated preview. The format follows the file extension.
pub fn save_preview(
    image: &RgbaImage,
    rects: &[RelativeRect],
    font: Option<&FontVec>,
    path: &Path,
) -> Result<(), CaptureError> {
    let canvas = annotate(image, rects, font);
    write_rgb(&canvas, path)?;
    info!("Preview saved to {}", path.display());
    Ok(())
}

/// Save named crops (`<name>.png`) into `dir`, creating it if needed.
pub fn save_crops(dir: &Path, crops: &[(&str, &RgbaImage)]) -> Result<(), CaptureError> {
    for (name, crop) in crops {
        write_rgb(crop, &dir.join(format!("{}.png", name)))?;
    }
    info!("{} region crop(s) saved to {}", crops.len(), dir.display());
    Ok(())
}

fn write_rgb(image: &RgbaImage, path: &Path) -> Result<(), CaptureError> {
    let wrap = |source| CaptureError::ArtifactWrite {
        path: path.to_path_buf(),
        source,
    };
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent).map_err(|e| wrap(image::ImageError::IoError(e)))?;
    }
    DynamicImage::ImageRgba8(image.clone())
        .to_rgb8()
        .save(path)
        .map_err(wrap)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_annotate_draws_distinct_colors() {
        let img = RgbaImage::from_pixel(400, 400, Rgba([255, 255, 255, 255]));
        let rects = [
            RelativeRect::new(0.0, 0.25, 0.5, 0.125),
            RelativeRect::new(0.0, 0.5, 0.5, 0.125),
            RelativeRect::new(0.0, 0.75, 0.5, 0.125),
        ];
        let out = annotate(&img, &rects, None);

        // Left edge of each outline, below its label tab
        assert_eq!(out.get_pixel(0, 110).0[..3], PREVIEW_COLORS[0]);
        assert_eq!(out.get_pixel(0, 210).0[..3], PREVIEW_COLORS[1]);
        assert_eq!(out.get_pixel(0, 310).0[..3], PREVIEW_COLORS[2]);
        // Interior untouched
        assert_eq!(out.get_pixel(100, 120), &Rgba([255, 255, 255, 255]));
        // Source untouched
        assert_eq!(img.get_pixel(0, 110), &Rgba([255, 255, 255, 255]));
    }

    #[test]
    fn test_bitmap_label_is_white_on_tab() {
        let img = RgbaImage::from_pixel(400, 400, Rgba([0, 0, 0, 255]));
        let out = annotate(&img, &[RelativeRect::new(0.0, 0.25, 0.5, 0.125)], None);
        // Top-left cell of the "1" glyph is empty, the top-middle cell is lit
        assert_eq!(out.get_pixel(14, 66).0[..3], PREVIEW_COLORS[0]);
        assert_eq!(out.get_pixel(21, 67), &Rgba([255, 255, 255, 255]));
    }

    #[test]
    fn test_label_font_fallback() {
        let dir = tempfile::tempdir().unwrap();
        assert!(load_label_font(&dir.path().join("missing.ttf")).is_none());

        let junk = dir.path().join("junk.ttf");
        std::fs::write(&junk, b"not a font").unwrap();
        assert!(load_label_font(&junk).is_none());
    }

    #[test]
    fn test_save_preview_writes_rgb() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("preview.png");
        let img = RgbaImage::from_pixel(200, 200, Rgba([255, 255, 255, 128]));
        save_preview(&img, &[RelativeRect::new(0.25, 0.5, 0.5, 0.25)], None, &path).unwrap();
        let loaded = image::open(&path).unwrap();
        assert!(matches!(loaded, DynamicImage::ImageRgb8(_)));
    }

    #[test]
    fn test_save_crops_writes_pngs() {
        let dir = tempfile::tempdir().unwrap();
        let crop = RgbaImage::from_pixel(4, 3, Rgba([1, 2, 3, 255]));
        save_crops(dir.path(), &[("1_name", &crop), ("2_medicine", &crop)]).unwrap();
        let loaded = image::open(dir.path().join("2_medicine.png")).unwrap();
        assert_eq!((loaded.width(), loaded.height()), (4, 3));
    }
}
