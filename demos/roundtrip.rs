//! Round-trip example for the slidecodec crate
//!
//! Imports a PPTX file, dumps the scene model as JSON and writes it back out
//! as both a fresh package and a PDF.
//!
//! Run with: cargo run --example roundtrip <path/to/presentation.pptx>

use slidecodec::{export_presentation, import_presentation, ExportConfig, ExportTarget, ParserConfig, Result};
use std::env;
use std::fs;

fn main() -> Result<()> {
    let args: Vec<String> = env::args().collect();
    let pptx_path = if args.len() > 1 {
        &args[1]
    } else {
        eprintln!("Usage: cargo run --example roundtrip <path/to/presentation.pptx>");
        return Ok(());
    };

    println!("Importing PPTX file: {}", pptx_path);

    let config = ParserConfig::builder()
        .extract_images(true)
        .detect_ellipses(true)
        .build();

    let bytes = fs::read(pptx_path)?;
    let deck = import_presentation(bytes, pptx_path, &config)?;
    println!("Found {} slides", deck.presentation.slides.len());

    fs::write("scene.json", deck.presentation.to_json_pretty()?)?;

    let export_config = ExportConfig::default();
    for target in [ExportTarget::Package, ExportTarget::Flattened] {
        let file = export_presentation(&deck.presentation, target, &export_config)?;
        let name = format!("roundtrip-{}", deck.export_file_name(target));
        fs::write(&name, &file.bytes)?;
        println!("Wrote {} ({}, {} bytes)", name, file.content_type, file.bytes.len());
    }

    Ok(())
}
