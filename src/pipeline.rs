use ab_glyph::FontVec;
use anyhow::{Context, Result};
use medbag_advisor::{build_script, resolve, save_icons, IconSet, RETAKE_PROMPT};
use medbag_data::{Template, TemplateRegistry};
use medbag_state::{ExtractionRecord, UsageSchedule};
use image::RgbaImage;
use medbag_vision::{read_bag, BagReading, TextRecognizer, VisionError};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::{debug, info, warn};

use crate::config::ReaderConfig;

/// What one photo produced
#[derive(Debug, Clone)]
pub struct BagReport {
    pub source: PathBuf,
    /// `out_dir/<image stem>`
    pub out_dir: PathBuf,
    pub record: ExtractionRecord,
    pub schedule: UsageSchedule,
    pub script: String,
}

/// Manages the read → resolve → artifacts pipeline for a batch of photos
pub struct Reader {
    config: ReaderConfig,
    registry: TemplateRegistry,
    recognizer: Arc<dyn TextRecognizer>,
    label_font: Option<FontVec>,
}

impl Reader {
    /// Load the template registry and check the configured template exists.
    pub fn new(config: ReaderConfig, recognizer: Arc<dyn TextRecognizer>) -> Result<Self> {
        let registry = TemplateRegistry::load(&config.data_dir)?;
        if registry.get(&config.template).is_none() {
            return Err(VisionError::UnknownTemplate(config.template.clone()))
                .with_context(|| format!("Known templates: {}", registry.ids().join(", ")));
        }
        let label_font = medbag_capture::load_label_font(&config.label_font_path());
        info!(
            "Reader ready: template '{}', OCR lang {}, label font {}",
            config.template,
            config.read.ocr.lang,
            if label_font.is_some() { "loaded" } else { "built-in" }
        );
        Ok(Self {
            config,
            registry,
            recognizer,
            label_font,
        })
    }

    pub fn config(&self) -> &ReaderConfig {
        &self.config
    }

    fn template(&self) -> Result<&Template> {
        self.registry
            .get(&self.config.template)
            .ok_or_else(|| VisionError::UnknownTemplate(self.config.template.clone()).into())
    }

    /// Read one photo and write its artifacts. Artifacts appear all together
    /// or not at all.
    pub fn process_image(&self, path: &Path) -> Result<BagReport> {
        let template = self.template()?;
        let image = medbag_capture::load_image(path)?;
        let reading = read_bag(&image, template, &self.config.read, self.recognizer.as_ref())
            .with_context(|| format!("Failed to read {}", path.display()))?;

        let stem = path
            .file_stem()
            .map(|s| s.to_string_lossy().into_owned())
            .unwrap_or_else(|| "image".to_string());
        let out_dir = self.config.output.out_dir.join(stem);
        let schedule = resolve(&reading.record.usage_dosage);
        let script = build_script(&reading.record);

        publish_dir(&out_dir, |dir| {
            self.write_artifacts(dir, &image, template, &reading, &schedule, &script)
        })?;

        info!("Processed {} → {}", path.display(), out_dir.display());
        Ok(BagReport {
            source: path.to_path_buf(),
            out_dir,
            record: reading.record,
            schedule,
            script,
        })
    }

    fn write_artifacts(
        &self,
        dir: &Path,
        image: &RgbaImage,
        template: &Template,
        reading: &BagReading,
        schedule: &UsageSchedule,
        script: &str,
    ) -> Result<()> {
        let out = &self.config.output;
        reading.record.save(&dir.join("extract.json"))?;

        if out.write_preview {
            // Outlines show the calibrated template, not the shifted crop
            medbag_capture::save_preview(
                image,
                &template.rects(),
                self.label_font.as_ref(),
                &dir.join("preview.png"),
            )?;
        }
        if out.save_rois {
            medbag_capture::save_crops(&dir.join("rois"), &reading.crops.named())?;
        }

        if out.write_icons {
            if schedule.is_empty() {
                debug!("No schedule in '{}', icons skipped", reading.record.usage_dosage);
            } else if let Err(e) = save_icons(
                schedule,
                &IconSet::in_dir(&self.config.icon_dir()),
                out.skip_last_slot,
                &dir.join("usage.png"),
            ) {
                warn!("Usage icons not written: {}", e);
            }
        }

        if out.write_speech {
            let speech_path = dir.join("speech.txt");
            std::fs::write(&speech_path, script)
                .with_context(|| format!("Failed to write {}", speech_path.display()))?;
        }
        Ok(())
    }

    /// Process every photo concurrently on the blocking pool. Results come
    /// back in input order; one failure does not affect the others.
    pub async fn process_batch(self: Arc<Self>, paths: Vec<PathBuf>) -> Vec<(PathBuf, Result<BagReport>)> {
        let handles: Vec<_> = paths
            .into_iter()
            .map(|path| {
                let reader = self.clone();
                let task_path = path.clone();
                let handle = tokio::task::spawn_blocking(move || reader.process_image(&task_path));
                (path, handle)
            })
            .collect();

        let mut results = Vec::with_capacity(handles.len());
        for (path, handle) in handles {
            let result = match handle.await {
                Ok(result) => result,
                Err(e) => Err(anyhow::anyhow!("Worker for {} failed: {}", path.display(), e)),
            };
            if let Err(e) = &result {
                warn!("{}: {:#}. {}", path.display(), e, RETAKE_PROMPT);
            }
            results.push((path, result));
        }
        results
    }
}

/// Run `write` against a fresh staging directory beside `dest`, then move it
/// into place, replacing any earlier output. On error the staging directory is
/// removed and `dest` is left as it was.
fn publish_dir<F>(dest: &Path, write: F) -> Result<()>
where
    F: FnOnce(&Path) -> Result<()>,
{
    let parent = match dest.parent() {
        Some(p) if !p.as_os_str().is_empty() => p,
        _ => Path::new("."),
    };
    std::fs::create_dir_all(parent)
        .with_context(|| format!("Failed to create {}", parent.display()))?;

    let name = dest
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default();
    let staging = tempfile::Builder::new()
        .prefix(&format!(".{}.", name))
        .tempdir_in(parent)
        .with_context(|| format!("Failed to create staging directory in {}", parent.display()))?;

    write(staging.path())?;

    if dest.is_dir() {
        std::fs::remove_dir_all(dest)
            .with_context(|| format!("Failed to replace {}", dest.display()))?;
    } else if dest.exists() {
        std::fs::remove_file(dest)
            .with_context(|| format!("Failed to replace {}", dest.display()))?;
    }
    std::fs::rename(staging.path(), dest)
        .with_context(|| format!("Failed to move output into {}", dest.display()))?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::{GrayImage, Rgba};
    use medbag_state::Slot;

    /// Answers by page-segmentation mode so concurrent images stay deterministic
    struct FakeRecognizer;

    impl TextRecognizer for FakeRecognizer {
        fn recognize(&self, _image: &GrayImage, psm: u32, _lang: &str) -> Result<String, VisionError> {
            match psm {
                7 => Ok("姓名：王小明先生\n".to_string()),
                8 => Ok("藥名：普拿疼\nGeneric Name: Acetaminophen.\n".to_string()),
                9 => Ok("用法：早晚飯後服用。\n".to_string()),
                _ => Err(VisionError::RecognitionFailed("engine down".to_string())),
            }
        }
    }

    fn write_bag(path: &Path) {
        RgbaImage::from_fn(600, 900, |x, y| {
            if (x / 6 + y / 4) % 5 == 0 {
                Rgba([25, 25, 25, 255])
            } else {
                Rgba([245, 245, 240, 255])
            }
        })
        .save(path)
        .unwrap();
    }

    fn write_icons(dir: &Path) {
        std::fs::create_dir_all(dir).unwrap();
        for name in ["sun.png", "cloud.png", "moon.png", "plate.png"] {
            RgbaImage::from_pixel(16, 16, Rgba([200, 120, 40, 255]))
                .save(dir.join(name))
                .unwrap();
        }
    }

    fn config(root: &Path) -> ReaderConfig {
        let mut config = ReaderConfig::default();
        config.data_dir = root.join("data");
        config.output.out_dir = root.join("out");
        config.read.ocr.psm_name = Some(7);
        config.read.ocr.psm_med = Some(8);
        config.read.ocr.psm_usage = Some(9);
        config
    }

    fn reader(config: ReaderConfig) -> Reader {
        Reader::new(config, Arc::new(FakeRecognizer)).unwrap()
    }

    #[test]
    fn test_process_image_writes_artifacts() {
        let dir = tempfile::tempdir().unwrap();
        let config = config(dir.path());
        write_icons(&config.icon_dir());
        let photo = dir.path().join("bag01.png");
        write_bag(&photo);

        let report = reader(config).process_image(&photo).unwrap();
        assert_eq!(report.record.patient_name, "王小明先生");
        assert_eq!(report.record.medicine_name, "普拿疼；Acetaminophen");
        assert_eq!(report.record.usage_dosage, "早晚飯後服用");
        assert_eq!(report.schedule.slots, vec![Slot::Morning, Slot::Evening]);
        assert!(report.schedule.after_meal);

        let out = dir.path().join("out").join("bag01");
        assert_eq!(report.out_dir, out);
        assert_eq!(ExtractionRecord::load(&out.join("extract.json")).unwrap(), report.record);
        let json = std::fs::read_to_string(out.join("extract.json")).unwrap();
        assert!(json.contains("王小明先生"), "CJK must not be escaped: {}", json);
        assert!(out.join("preview.png").exists());
        for stem in ["1_name", "2_medicine", "3_usage"] {
            assert!(out.join("rois").join(format!("{}.png", stem)).exists());
        }
        let icons = image::open(out.join("usage.png")).unwrap();
        assert_eq!(icons.width(), 48);
        assert_eq!(std::fs::read_to_string(out.join("speech.txt")).unwrap(), report.script);
    }

    #[test]
    fn test_missing_icons_do_not_fail_the_image() {
        let dir = tempfile::tempdir().unwrap();
        let photo = dir.path().join("bag.png");
        write_bag(&photo);

        let report = reader(config(dir.path())).process_image(&photo).unwrap();
        assert!(!report.out_dir.join("usage.png").exists());
        assert!(report.out_dir.join("extract.json").exists());
    }

    #[test]
    fn test_failure_leaves_no_artifacts() {
        let dir = tempfile::tempdir().unwrap();
        let mut config = config(dir.path());
        config.read.ocr.psm_usage = None;
        let photo = dir.path().join("blurry.png");
        write_bag(&photo);

        let err = reader(config).process_image(&photo).unwrap_err();
        assert!(err.to_string().contains("blurry.png"), "{}", err);
        assert!(!dir.path().join("out").join("blurry").exists());
    }

    #[test]
    fn test_unknown_template_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let mut config = config(dir.path());
        config.template = "nowhere".to_string();
        let err = Reader::new(config, Arc::new(FakeRecognizer)).err().unwrap();
        assert!(matches!(
            err.downcast_ref::<VisionError>(),
            Some(VisionError::UnknownTemplate(id)) if id == "nowhere"
        ));
    }

    #[test]
    fn test_skip_last_slot() {
        let dir = tempfile::tempdir().unwrap();
        let mut config = config(dir.path());
        config.output.skip_last_slot = true;
        write_icons(&config.icon_dir());
        let photo = dir.path().join("bag.png");
        write_bag(&photo);

        let report = reader(config).process_image(&photo).unwrap();
        let icons = image::open(report.out_dir.join("usage.png")).unwrap();
        assert_eq!(icons.width(), 32);
    }

    #[test]
    fn test_failed_write_leaves_no_output() {
        let dir = tempfile::tempdir().unwrap();
        let dest = dir.path().join("out").join("bag02");

        let err = publish_dir(&dest, |staging| {
            std::fs::write(staging.join("extract.json"), "{}")?;
            anyhow::bail!("preview encoder failed")
        })
        .unwrap_err();

        assert!(err.to_string().contains("preview encoder failed"));
        assert!(!dest.exists());
        let leftovers = std::fs::read_dir(dir.path().join("out")).unwrap().count();
        assert_eq!(leftovers, 0, "staging directory must be cleaned up");
    }

    #[test]
    fn test_failed_write_keeps_previous_output() {
        let dir = tempfile::tempdir().unwrap();
        let dest = dir.path().join("bag02");
        std::fs::create_dir_all(&dest).unwrap();
        std::fs::write(dest.join("extract.json"), "old").unwrap();

        assert!(publish_dir(&dest, |_| anyhow::bail!("disk full")).is_err());
        assert_eq!(std::fs::read_to_string(dest.join("extract.json")).unwrap(), "old");
    }

    #[test]
    fn test_stale_output_is_replaced() {
        let dir = tempfile::tempdir().unwrap();
        let config = config(dir.path());
        let stale = config.output.out_dir.join("bag02");
        // A directory where the preview file should go used to break the write
        std::fs::create_dir_all(stale.join("preview.png")).unwrap();
        std::fs::write(stale.join("notes.txt"), "stale").unwrap();
        let photo = dir.path().join("bag02.png");
        write_bag(&photo);

        let report = reader(config).process_image(&photo).unwrap();
        assert_eq!(report.out_dir, stale);
        assert!(stale.join("preview.png").is_file());
        assert!(stale.join("extract.json").is_file());
        assert!(!stale.join("notes.txt").exists());
    }

    #[tokio::test]
    async fn test_batch_isolates_failures() {
        let dir = tempfile::tempdir().unwrap();
        let good = dir.path().join("good.png");
        write_bag(&good);
        let missing = dir.path().join("missing.png");

        let reader = Arc::new(reader(config(dir.path())));
        let results = reader.process_batch(vec![missing.clone(), good.clone()]).await;

        assert_eq!(results.len(), 2);
        assert_eq!(results[0].0, missing);
        assert!(results[0].1.is_err());
        assert_eq!(results[1].0, good);
        assert!(results[1].1.is_ok());
    }
}
