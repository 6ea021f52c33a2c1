pub mod config;
pub mod pipeline;

pub use config::{OutputConfig, ReaderConfig, CONFIG_ENV};
pub use pipeline::{BagReport, Reader};

use medbag_vision::TesseractRecognizer;
use std::path::PathBuf;
use std::sync::Arc;
use tracing::{error, info};

/// Read every bag photo named on the command line.
pub fn run() {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| {
                "medbag_reader=debug,medbag_reader_lib=debug,medbag_vision=debug,medbag_capture=info,medbag_advisor=info"
                    .into()
            }),
        )
        .init();

    let paths: Vec<PathBuf> = std::env::args().skip(1).map(PathBuf::from).collect();
    if paths.is_empty() {
        eprintln!("Usage: medbag-reader <bag image>...  (config via {})", CONFIG_ENV);
        std::process::exit(2);
    }

    let failed = match read_all(paths) {
        Ok(failed) => failed,
        Err(e) => {
            error!("{:#}", e);
            std::process::exit(1);
        }
    };
    if failed > 0 {
        std::process::exit(1);
    }
}

/// Returns how many photos could not be read.
fn read_all(paths: Vec<PathBuf>) -> anyhow::Result<usize> {
    let config = ReaderConfig::from_env()?;
    let recognizer = Arc::new(TesseractRecognizer::new(config.read.ocr.oem));
    let reader = Arc::new(Reader::new(config, recognizer)?);

    let runtime = tokio::runtime::Runtime::new()?;
    let results = runtime.block_on(reader.process_batch(paths));

    let mut failed = 0;
    for (path, result) in &results {
        match result {
            Ok(report) => info!(
                "{}: {} / {} / {}",
                path.display(),
                report.record.patient_name,
                report.record.medicine_name,
                report.record.usage_dosage
            ),
            Err(_) => failed += 1,
        }
    }
    info!("{} of {} photo(s) read", results.len() - failed, results.len());
    Ok(failed)
}
