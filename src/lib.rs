//! Round-trips PowerPoint (`.pptx`) packages through an editable scene model.
//!
//! The import direction opens a package, walks its slide parts and builds a
//! [`Presentation`] whose geometry lives in pixel space. The export direction
//! walks a [`Presentation`] and writes either a fresh `.pptx` package or a
//! flattened PDF.
//!
//! ```no_run
//! use slidecodec::{export_presentation, import_presentation, ExportConfig, ExportTarget, ParserConfig};
//!
//! let bytes = std::fs::read("deck.pptx")?;
//! let deck = import_presentation(bytes, "deck.pptx", &ParserConfig::default())?;
//! let json = deck.presentation.to_json()?;
//! # let _ = json;
//! let pdf = export_presentation(&deck.presentation, ExportTarget::Flattened, &ExportConfig::default())?;
//! std::fs::write(deck.export_file_name(ExportTarget::Flattened), pdf.bytes)?;
//! # Ok::<(), slidecodec::Error>(())
//! ```

mod constants;
mod container;
mod export;
mod export_config;
mod model;
mod parse_rels;
mod parse_xml;
mod parser_config;
mod slide;
mod theme;
mod types;
pub mod units;

pub use container::{PackageWriter, PptxContainer};
pub use export::{
    serialize, slide_elements, ElementKind, ExportElement, ExportTarget, PdfSink, PptxSink, ShapeSpec, SlideSink, TextSpec,
};
pub use export_config::{ExportConfig, ExportConfigBuilder};
pub use model::*;
pub use parser_config::{ParserConfig, ParserConfigBuilder};
pub use theme::{resolve_color_value, resolve_theme, ThemePalette};
pub use units::Placement;

use rayon::prelude::*;
use std::path::Path;

#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("Corrupt archive: {0}")]
    CorruptArchive(String),

    #[error("Unsupported format: no slide parts found")]
    UnsupportedFormat,

    #[error("Presentation has no slides")]
    EmptyPresentation,

    #[error("Part not found: {0}")]
    PartNotFound(String),

    #[error("Invalid image source: {0}")]
    InvalidImageSource(String),

    #[error("Unknown export target: {0}")]
    UnknownExportTarget(String),

    #[error("Zip error: {0}")]
    Zip(#[from] zip::result::ZipError),

    #[error("XML parse error: {0}")]
    Xml(#[from] roxmltree::Error),

    #[error("UTF-8 conversion error: {0}")]
    Utf8(#[from] std::str::Utf8Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("PDF error: {0}")]
    Pdf(#[from] lopdf::Error),

    #[error("Image error: {0}")]
    Image(#[from] image::ImageError),

    #[error("Base64 error: {0}")]
    Base64(#[from] base64::DecodeError),
}

pub type Result<T> = std::result::Result<T, Error>;

/// A presentation freshly read from an uploaded package.
#[derive(Debug, Clone)]
pub struct ImportedDeck {
    pub presentation: Presentation,
    /// The filename the bytes were uploaded under. Only used for naming exports.
    pub source_name: String,
}

impl ImportedDeck {
    /// Derives a download name such as `quarterly.pdf` from the uploaded name.
    pub fn export_file_name(&self, target: ExportTarget) -> String {
        let stem = Path::new(&self.source_name)
            .file_stem()
            .and_then(|s| s.to_str())
            .filter(|s| !s.is_empty())
            .unwrap_or("presentation");
        format!("{}.{}", stem, target.extension())
    }
}

/// The bytes produced by an export together with their container metadata.
#[derive(Debug, Clone)]
pub struct ExportedFile {
    pub bytes: Vec<u8>,
    pub content_type: &'static str,
    pub extension: &'static str,
}

/// Imports a package from raw bytes.
///
/// Legacy binary decks are accepted as opaque input too; they fail with
/// [`Error::CorruptArchive`] because they are not zip structured.
pub fn import_presentation(
    bytes: Vec<u8>,
    original_filename: &str,
    config: &ParserConfig,
) -> Result<ImportedDeck> {
    let mut container = PptxContainer::from_bytes(bytes, config.clone())?;
    let presentation = container.parse_presentation()?;
    log::info!(
        "imported {} with {} slide(s)",
        original_filename,
        presentation.slides.len()
    );

    Ok(ImportedDeck {
        presentation,
        source_name: original_filename.to_string(),
    })
}

/// Imports several independent packages in parallel.
///
/// Every deck is converted on its own, so one corrupt upload does not affect the
/// others. Results keep the order of `inputs`.
pub fn import_many(inputs: Vec<(Vec<u8>, String)>, config: &ParserConfig) -> Vec<Result<ImportedDeck>> {
    inputs
        .into_par_iter()
        .map(|(bytes, name)| import_presentation(bytes, &name, config))
        .collect()
}

/// Exports a presentation into the requested container.
pub fn export_presentation(
    presentation: &Presentation,
    target: ExportTarget,
    config: &ExportConfig,
) -> Result<ExportedFile> {
    let bytes = serialize(presentation, target, config)?;
    log::info!(
        "exported {} slide(s) as {} ({} bytes)",
        presentation.slides.len(),
        target.extension(),
        bytes.len()
    );

    Ok(ExportedFile {
        bytes,
        content_type: target.content_type(),
        extension: target.extension(),
    })
}
