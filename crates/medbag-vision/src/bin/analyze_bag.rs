//! CLI tool to run a saved bag photo through the extraction pipeline step by step.
//! Usage: cargo run --features cli --bin analyze_bag -- <bag.jpg> [template] [output_dir]

use medbag_data::{RegionKind, TemplateRegistry, DEFAULT_TEMPLATE};
use medbag_vision::{normalize, parse_medicine, parse_name, parse_usage, NormalizeOptions};
use medbag_vision::{OcrSettings, TesseractRecognizer, TextRecognizer};
use std::path::{Path, PathBuf};

fn main() {
    // Initialize tracing for debug output
    tracing_subscriber::fmt()
        .with_max_level(tracing::Level::DEBUG)
        .init();

    let args: Vec<String> = std::env::args().collect();
    if args.len() < 2 {
        eprintln!("Usage: {} <bag.jpg> [template] [output_dir]", args[0]);
        std::process::exit(1);
    }

    let input_path = PathBuf::from(&args[1]);
    let template_id = args.get(2).map(String::as_str).unwrap_or(DEFAULT_TEMPLATE);
    let output_dir = args
        .get(3)
        .map(PathBuf::from)
        .unwrap_or_else(|| PathBuf::from("./debug_output"));
    let _ = std::fs::create_dir_all(&output_dir);

    let registry = match TemplateRegistry::load(Path::new("data")) {
        Ok(r) => r,
        Err(e) => {
            eprintln!("Failed to load templates: {:#}", e);
            std::process::exit(1);
        }
    };
    let Some(template) = registry.get(template_id) else {
        eprintln!(
            "Unknown template '{}'. Known: {}",
            template_id,
            registry.ids().join(", ")
        );
        std::process::exit(1);
    };

    println!("Loading image: {}", input_path.display());
    let img = match medbag_capture::load_image(&input_path) {
        Ok(img) => img,
        Err(e) => {
            eprintln!("{}", e);
            std::process::exit(1);
        }
    };
    let (w, h) = img.dimensions();
    println!("Image size: {}x{}", w, h);

    // Regions
    println!("\n=== Regions ({}) ===", template.id);
    let mut binaries = Vec::new();
    for kind in RegionKind::ALL {
        let rect = template.rect(kind);
        match medbag_capture::pixel_bounds(w, h, rect, 0.0) {
            Ok(b) => println!("  {}: {}", kind, b),
            Err(e) => {
                println!("  {}: {}", kind, e);
                continue;
            }
        }
        let Ok(crop) = medbag_capture::crop_region(&img, rect, 0.0) else {
            continue;
        };
        let _ = crop.save(output_dir.join(format!("{}.png", kind.crop_stem())));
        match normalize(&crop, &NormalizeOptions::default()) {
            Ok(binary) => {
                let _ = binary.save(output_dir.join(format!("{}_bin.png", kind.crop_stem())));
                binaries.push((kind, binary));
            }
            Err(e) => println!("  {}: {}", kind, e),
        }
    }
    let font = medbag_capture::load_label_font(Path::new("data/DejaVuSans.ttf"));
    let _ = medbag_capture::save_preview(
        &img,
        &template.rects(),
        font.as_ref(),
        &output_dir.join("preview.png"),
    );

    // OCR
    println!("\n=== OCR Results ===");
    let settings = OcrSettings::default();
    let recognizer = TesseractRecognizer::new(settings.oem);
    if !recognizer.is_available() {
        println!("Tesseract not available! Install tesseract with chi_tra traineddata");
        return;
    }

    for (kind, binary) in &binaries {
        let raw = match recognizer.recognize(binary, settings.psm_for(*kind), &settings.lang) {
            Ok(raw) => raw,
            Err(e) => {
                println!("{}: {}", kind, e);
                continue;
            }
        };
        let parsed = match kind {
            RegionKind::Name => parse_name(&raw),
            RegionKind::Medicine => parse_medicine(&raw),
            RegionKind::Usage => parse_usage(&raw),
        };
        println!("{} raw: {:?}", kind, raw);
        println!("{} parsed: {:?}", kind, parsed);
    }

    println!("\nDebug images saved to: {}", output_dir.display());
}
