use image::RgbaImage;
use medbag_data::{RegionKind, Template};
use medbag_state::ExtractionRecord;
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

mod error;
pub mod fields;
pub mod normalizer;
pub mod recognizer;
pub mod regions;

pub use error::VisionError;
pub use fields::{parse_medicine, parse_name, parse_usage};
pub use normalizer::{normalize, NormalizeOptions};
pub use recognizer::{OcrSettings, TesseractRecognizer, TextRecognizer};
pub use regions::{extract_regions, RegionCrops};

/// Everything that tunes one extraction besides the template
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ReadOptions {
    /// Vertical shift applied to every region, as a fraction of image height (negative = up)
    pub roi_shift_y: f64,
    pub normalize: NormalizeOptions,
    pub ocr: OcrSettings,
}

/// Unparsed recognizer output per field
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RawTexts {
    pub name: String,
    pub med: String,
    pub usage: String,
}

/// Result of reading one bag photo
#[derive(Debug, Clone)]
pub struct BagReading {
    pub record: ExtractionRecord,
    pub raw: RawTexts,
    /// Pre-normalization crops, kept for the optional ROI artifacts
    pub crops: RegionCrops,
}

/// Crop → normalize → recognize → parse for all three fields.
/// Any stage failing aborts the whole reading; nothing is retried.
pub fn read_bag(
    image: &RgbaImage,
    template: &Template,
    opts: &ReadOptions,
    recognizer: &dyn TextRecognizer,
) -> Result<BagReading, VisionError> {
    let crops = extract_regions(image, template, opts.roi_shift_y)?;

    let recognize = |kind: RegionKind| -> Result<String, VisionError> {
        let binary = normalize(crops.get(kind), &opts.normalize)?;
        let psm = opts.ocr.psm_for(kind);
        let text = recognizer.recognize(&binary, psm, &opts.ocr.lang)?;
        debug!("{} raw text (psm {}): {:?}", kind, psm, text);
        Ok(text)
    };

    let raw = RawTexts {
        name: recognize(RegionKind::Name)?,
        med: recognize(RegionKind::Medicine)?,
        usage: recognize(RegionKind::Usage)?,
    };

    let record = ExtractionRecord::new(
        &parse_name(&raw.name),
        &parse_medicine(&raw.med),
        &parse_usage(&raw.usage),
    );
    info!(
        "Read bag: name='{}' medicine='{}' usage='{}'",
        record.patient_name, record.medicine_name, record.usage_dosage
    );

    Ok(BagReading { record, raw, crops })
}
