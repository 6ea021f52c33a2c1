use image::GrayImage;
use medbag_data::RegionKind;
use serde::{Deserialize, Serialize};
use std::process::Command;
use tracing::{debug, warn};

use crate::VisionError;

/// Converts a binarized region into raw text
pub trait TextRecognizer: Send + Sync {
    fn recognize(&self, image: &GrayImage, psm: u32, lang: &str) -> Result<String, VisionError>;
}

/// Per-field OCR configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct OcrSettings {
    /// Combined script hint, e.g. traditional Chinese + English
    pub lang: String,
    /// Shared page-segmentation mode
    pub psm: u32,
    pub psm_name: Option<u32>,
    pub psm_med: Option<u32>,
    pub psm_usage: Option<u32>,
    /// OCR engine mode (1 = LSTM only)
    pub oem: u32,
}

impl Default for OcrSettings {
    fn default() -> Self {
        Self {
            lang: "chi_tra+eng".to_string(),
            psm: 6,
            psm_name: None,
            psm_med: None,
            psm_usage: None,
            oem: 1,
        }
    }
}

impl OcrSettings {
    /// Page-segmentation mode for a field, falling back to the shared one
    pub fn psm_for(&self, kind: RegionKind) -> u32 {
        let own = match kind {
            RegionKind::Name => self.psm_name,
            RegionKind::Medicine => self.psm_med,
            RegionKind::Usage => self.psm_usage,
        };
        own.unwrap_or(self.psm)
    }
}

/// Runs the `tesseract` binary on each region.
pub struct TesseractRecognizer {
    binary: String,
    oem: u32,
    available: bool,
}

impl TesseractRecognizer {
    pub fn new(oem: u32) -> Self {
        Self::with_binary("tesseract", oem)
    }

    pub fn with_binary(binary: &str, oem: u32) -> Self {
        let available = check_tesseract(binary);
        if available {
            debug!("Tesseract OCR available ({})", binary);
        } else {
            warn!("Tesseract not found. OCR disabled. Install tesseract with the chi_tra language pack");
        }
        Self {
            binary: binary.to_string(),
            oem,
            available,
        }
    }

    /// Check if OCR is available
    pub fn is_available(&self) -> bool {
        self.available
    }
}

impl TextRecognizer for TesseractRecognizer {
    fn recognize(&self, image: &GrayImage, psm: u32, lang: &str) -> Result<String, VisionError> {
        if !self.available {
            return Err(VisionError::RecognitionFailed(format!(
                "{} is not installed",
                self.binary
            )));
        }

        let fail = |what: String| VisionError::RecognitionFailed(what);

        let mut tmp = tempfile::Builder::new()
            .prefix("medbag_ocr_")
            .suffix(".png")
            .tempfile()
            .map_err(|e| fail(format!("temp file: {}", e)))?;
        image
            .write_to(&mut tmp, image::ImageFormat::Png)
            .map_err(|e| fail(format!("temp image: {}", e)))?;

        let output = Command::new(&self.binary)
            .arg(tmp.path())
            .arg("stdout")
            .arg("--oem")
            .arg(self.oem.to_string())
            .arg("--psm")
            .arg(psm.to_string())
            .arg("-l")
            .arg(lang)
            .output()
            .map_err(|e| fail(format!("failed to run {}: {}", self.binary, e)))?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            return Err(fail(format!("{} exited with {}: {}", self.binary, output.status, stderr.trim())));
        }

        let text = String::from_utf8(output.stdout)
            .map_err(|_| fail("output is not valid UTF-8".to_string()))?;
        debug!("OCR result (psm {}): '{}'", psm, text.trim());
        Ok(text)
    }
}

/// Check if Tesseract is installed and accessible
fn check_tesseract(binary: &str) -> bool {
    Command::new(binary)
        .arg("--version")
        .output()
        .map(|o| o.status.success())
        .unwrap_or(false)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_psm_fallback() {
        let settings = OcrSettings {
            psm_usage: Some(4),
            ..OcrSettings::default()
        };
        assert_eq!(settings.psm_for(RegionKind::Name), 6);
        assert_eq!(settings.psm_for(RegionKind::Medicine), 6);
        assert_eq!(settings.psm_for(RegionKind::Usage), 4);
    }

    #[test]
    fn test_missing_binary_fails_recognition() {
        let recognizer = TesseractRecognizer::with_binary("/nonexistent/tesseract", 1);
        assert!(!recognizer.is_available());
        let img = GrayImage::new(4, 4);
        let err = recognizer.recognize(&img, 6, "chi_tra+eng").unwrap_err();
        assert!(matches!(err, VisionError::RecognitionFailed(_)));
    }
}
