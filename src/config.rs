use anyhow::{Context, Result};
use medbag_data::DEFAULT_TEMPLATE;
use medbag_vision::ReadOptions;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Environment variable naming the JSON config file
pub const CONFIG_ENV: &str = "MEDBAG_CONFIG";

/// Everything a run needs, passed explicitly into the pipeline.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ReaderConfig {
    /// Template identifier looked up in the registry
    pub template: String,
    /// `roi_shift_y`, `normalize` and `ocr` sit at the top level of the file
    #[serde(flatten)]
    pub read: ReadOptions,
    pub output: OutputConfig,
    /// Holds `templates.json` and the `icon/` assets
    pub data_dir: PathBuf,
}

impl Default for ReaderConfig {
    fn default() -> Self {
        Self {
            template: DEFAULT_TEMPLATE.to_string(),
            read: ReadOptions::default(),
            output: OutputConfig::default(),
            data_dir: PathBuf::from("data"),
        }
    }
}

/// Which artifacts to write and where
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct OutputConfig {
    pub out_dir: PathBuf,
    pub write_preview: bool,
    pub save_rois: bool,
    pub write_icons: bool,
    pub write_speech: bool,
    /// Drop the final time slot from the icon strip
    pub skip_last_slot: bool,
    /// Preview label font, relative to `data_dir` unless absolute
    pub label_font: PathBuf,
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self {
            out_dir: PathBuf::from("out"),
            write_preview: true,
            save_rois: true,
            write_icons: true,
            write_speech: true,
            skip_last_slot: false,
            label_font: PathBuf::from("DejaVuSans.ttf"),
        }
    }
}

impl ReaderConfig {
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config {}", path.display()))?;
        serde_json::from_str(&content)
            .with_context(|| format!("Failed to parse config {}", path.display()))
    }

    /// Load the file named by `MEDBAG_CONFIG`, or defaults when it is unset.
    pub fn from_env() -> Result<Self> {
        match std::env::var_os(CONFIG_ENV) {
            Some(path) => Self::load(Path::new(&path)),
            None => {
                tracing::debug!("{} not set, using default configuration", CONFIG_ENV);
                Ok(Self::default())
            }
        }
    }

    pub fn icon_dir(&self) -> PathBuf {
        self.data_dir.join("icon")
    }

    pub fn label_font_path(&self) -> PathBuf {
        self.data_dir.join(&self.output.label_font)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = ReaderConfig::default();
        assert_eq!(config.template, "tvgh");
        assert_eq!(config.read.roi_shift_y, 0.0);
        assert_eq!(config.read.ocr.lang, "chi_tra+eng");
        assert_eq!(config.output.out_dir, PathBuf::from("out"));
        assert_eq!(config.icon_dir(), PathBuf::from("data").join("icon"));
        assert_eq!(config.label_font_path(), PathBuf::from("data").join("DejaVuSans.ttf"));
    }

    #[test]
    fn test_partial_file_keeps_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.json");
        std::fs::write(
            &path,
            r#"{
                "roi_shift_y": -0.02,
                "ocr": { "psm_name": 7 },
                "output": { "out_dir": "results", "save_rois": false }
            }"#,
        )
        .unwrap();

        let config = ReaderConfig::load(&path).unwrap();
        assert_eq!(config.template, "tvgh");
        assert_eq!(config.read.roi_shift_y, -0.02);
        assert_eq!(config.read.ocr.psm_name, Some(7));
        assert_eq!(config.read.ocr.psm, 6);
        assert_eq!(config.output.out_dir, PathBuf::from("results"));
        assert!(!config.output.save_rois);
        assert!(config.output.write_preview);
    }

    #[test]
    fn test_bad_file_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.json");
        std::fs::write(&path, "{ not json").unwrap();
        assert!(ReaderConfig::load(&path).is_err());
        assert!(ReaderConfig::load(&dir.path().join("missing.json")).is_err());
    }
}
