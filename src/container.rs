use crate::constants::{SLIDES_PREFIX, THEME_PREFIX};
use crate::parser_config::ParserConfig;
use crate::slide::SlidePart;
use crate::theme::{resolve_theme, ThemePalette};
use crate::types::ParsedSlide;
use crate::{Color, Error, Presentation, Result, Slide};
use std::cmp::Ordering;
use std::collections::HashMap;
use std::io::{Cursor, Read, Write};
use std::path::Path;
use zip::write::SimpleFileOptions;
use zip::{CompressionMethod, ZipArchive, ZipWriter};

/// Holds the internal representation of a loaded PowerPoint (pptx) package.
///
/// `PptxContainer` gives random access to the named parts of the package and
/// drives the import of its slides into the scene model. The archive lives in
/// memory and is released when the container is dropped.
pub struct PptxContainer {
    pub config: ParserConfig,
    archive: ZipArchive<Cursor<Vec<u8>>>,
    pub slide_paths: Vec<String>,
    pub slide_count: u32,
}

impl PptxContainer {
    /// Opens a package from raw bytes.
    ///
    /// # Errors
    ///
    /// Returns [`Error::CorruptArchive`] if the bytes are not a zip archive.
    pub fn from_bytes(bytes: Vec<u8>, config: ParserConfig) -> Result<Self> {
        let archive = ZipArchive::new(Cursor::new(bytes))
            .map_err(|e| Error::CorruptArchive(e.to_string()))?;

        let mut container = Self {
            config,
            archive,
            slide_paths: Vec::new(),
            slide_count: 0,
        };
        container.slide_paths = container
            .list_parts(SLIDES_PREFIX)
            .into_iter()
            .filter(|name| name.ends_with(".xml"))
            .collect();
        container.slide_count = container.slide_paths.len() as u32;

        Ok(container)
    }

    /// Opens a pptx file from disk. See [`PptxContainer::from_bytes`].
    pub fn open(path: &Path, config: ParserConfig) -> Result<Self> {
        let bytes = std::fs::read(path)?;
        Self::from_bytes(bytes, config)
    }

    /// Lists the part names starting with `prefix` in natural order, so that
    /// `slide2.xml` sorts before `slide10.xml`.
    pub fn list_parts(&self, prefix: &str) -> Vec<String> {
        let mut names: Vec<String> = self
            .archive
            .file_names()
            .filter(|name| name.starts_with(prefix))
            .map(str::to_string)
            .collect();
        names.sort_by(|a, b| natural_cmp(a, b));
        names
    }

    pub fn has_part(&self, path: &str) -> bool {
        self.archive.index_for_name(path).is_some()
    }

    /// Reads a part from the archive by its internal path.
    ///
    /// # Errors
    ///
    /// [`Error::PartNotFound`] if no such part exists, [`Error::CorruptArchive`]
    /// if the entry cannot be inflated or fails its checksum.
    pub fn read_binary(&mut self, path: &str) -> Result<Vec<u8>> {
        let mut file = match self.archive.by_name(path) {
            Ok(file) => file,
            Err(zip::result::ZipError::FileNotFound) => return Err(Error::PartNotFound(path.to_string())),
            Err(e) => return Err(Error::CorruptArchive(format!("{}: {}", path, e))),
        };
        let mut content = Vec::with_capacity(file.size() as usize);
        file.read_to_end(&mut content)
            .map_err(|e| Error::CorruptArchive(format!("{}: {}", path, e)))?;
        Ok(content)
    }

    /// Reads a part and decodes it as UTF-8.
    pub fn read_text(&mut self, path: &str) -> Result<String> {
        let bytes = self.read_binary(path)?;
        String::from_utf8(bytes).map_err(|e| Error::Utf8(e.utf8_error()))
    }

    /// Parses every slide of the package into the scene model.
    ///
    /// # Errors
    ///
    /// [`Error::UnsupportedFormat`] if the package has no slide parts. Slides
    /// whose XML cannot be parsed become empty slides rather than failing the
    /// whole deck.
    pub fn parse_presentation(&mut self) -> Result<Presentation> {
        if self.slide_paths.is_empty() {
            return Err(Error::UnsupportedFormat);
        }

        let theme = self.load_theme();
        let slides = self.iter_slides().collect::<Result<Vec<_>>>()?;

        Ok(Presentation { slides, theme })
    }

    pub fn iter_slides(&mut self) -> SlideIterator {
        SlideIterator::new(self)
    }

    /// Loads and parses one slide part together with the media it references.
    pub fn load_slide(&mut self, slide_path: &str) -> Result<SlidePart> {
        let slide_data = self.read_binary(slide_path)?;
        let slide_number = SlidePart::extract_slide_number(slide_path).unwrap_or(0);

        let parsed = match crate::parse_xml::parse_slide_xml(&slide_data, &self.config) {
            Ok(parsed) => parsed,
            Err(e) => {
                log::warn!("{}: unreadable slide XML ({}), importing it empty", slide_path, e);
                ParsedSlide { elements: Vec::new(), background: Color::white() }
            },
        };

        let mut images = Vec::new();
        let mut image_data = HashMap::new();

        if self.config.extract_images {
            let rels_path = Self::get_slide_rels_path(slide_path);
            if let Ok(rels_bytes) = self.read_binary(&rels_path) {
                images = crate::parse_rels::parse_slide_rels(&rels_bytes).unwrap_or_else(|e| {
                    log::warn!("{}: unreadable relationships ({})", rels_path, e);
                    Vec::new()
                });
            }

            for img_ref in &images {
                let img_path = Self::resolve_target(slide_path, &img_ref.target);
                match self.read_binary(&img_path) {
                    Ok(data) => {
                        image_data.insert(img_ref.id.clone(), data);
                    },
                    Err(Error::PartNotFound(_)) => {
                        log::debug!("{}: media part {} not found", slide_path, img_path);
                    },
                    Err(e) => {
                        log::warn!("{}: skipping unreadable media part {} ({})", slide_path, img_path, e);
                    },
                }
            }
        }

        let mut slide = SlidePart::new(
            slide_path.to_string(),
            slide_number,
            parsed,
            images,
            image_data,
        );
        slide.link_images();
        Ok(slide)
    }

    /// Resolves the palette of the first theme part, if any.
    fn load_theme(&mut self) -> Option<ThemePalette> {
        let theme_path = self
            .list_parts(THEME_PREFIX)
            .into_iter()
            .find(|name| name.ends_with(".xml"))?;

        match self.read_text(&theme_path).and_then(|xml| resolve_theme(&xml)) {
            Ok(palette) => Some(palette),
            Err(e) => {
                log::warn!("{}: ignoring unreadable theme ({})", theme_path, e);
                None
            },
        }
    }

    /// Constructs the path to the relationships file for a given part.
    ///
    /// ```text
    /// ppt/slides/slide1.xml -> ppt/slides/_rels/slide1.xml.rels
    /// ```
    pub fn get_slide_rels_path(slide_path: &str) -> String {
        let mut rels_path = slide_path.to_string();
        match rels_path.rfind('/') {
            Some(pos) => rels_path.insert_str(pos + 1, "_rels/"),
            None => rels_path.insert_str(0, "_rels/"),
        }
        rels_path.push_str(".rels");
        rels_path
    }

    /// Resolves a relationship target relative to the part that declares it.
    pub fn resolve_target(source_part: &str, target: &str) -> String {
        if let Some(absolute) = target.strip_prefix('/') {
            return absolute.to_string();
        }

        let mut segments: Vec<&str> = source_part
            .rsplit_once('/')
            .map(|(dir, _)| dir.split('/').collect())
            .unwrap_or_default();

        for segment in target.split('/') {
            match segment {
                "" | "." => {},
                ".." => {
                    segments.pop();
                },
                other => segments.push(other),
            }
        }

        segments.join("/")
    }
}

/// An iterator for streaming scene slides from a pptx package, one part at a time.
pub struct SlideIterator<'a> {
    container: &'a mut PptxContainer,
    current_paths: Vec<String>,
    current_index: usize,
}

impl<'a> SlideIterator<'a> {
    fn new(container: &'a mut PptxContainer) -> Self {
        let current_paths = container.slide_paths.clone();
        Self {
            container,
            current_paths,
            current_index: 0,
        }
    }
}

impl<'a> Iterator for SlideIterator<'a> {
    type Item = Result<Slide>;

    fn next(&mut self) -> Option<Self::Item> {
        let slide_path = self.current_paths.get(self.current_index)?;
        self.current_index += 1;

        Some(
            self.container
                .load_slide(slide_path)
                .map(SlidePart::into_scene_slide),
        )
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        let remaining = self.current_paths.len() - self.current_index;
        (remaining, Some(remaining))
    }
}

/// Compares two part names treating runs of ASCII digits as numbers.
pub fn natural_cmp(a: &str, b: &str) -> Ordering {
    let (a, b) = (a.as_bytes(), b.as_bytes());
    let (mut i, mut j) = (0, 0);

    while i < a.len() && j < b.len() {
        if a[i].is_ascii_digit() && b[j].is_ascii_digit() {
            let start_a = i;
            let start_b = j;
            while i < a.len() && a[i].is_ascii_digit() {
                i += 1;
            }
            while j < b.len() && b[j].is_ascii_digit() {
                j += 1;
            }
            let num_a = trim_leading_zeros(&a[start_a..i]);
            let num_b = trim_leading_zeros(&b[start_b..j]);
            let ordering = num_a.len().cmp(&num_b.len()).then_with(|| num_a.cmp(num_b));
            if ordering != Ordering::Equal {
                return ordering;
            }
        } else {
            match a[i].cmp(&b[j]) {
                Ordering::Equal => {
                    i += 1;
                    j += 1;
                },
                other => return other,
            }
        }
    }

    (a.len() - i).cmp(&(b.len() - j)).then_with(|| a.cmp(b))
}

fn trim_leading_zeros(digits: &[u8]) -> &[u8] {
    let first = digits.iter().position(|&d| d != b'0').unwrap_or(digits.len());
    &digits[first..]
}

/// Builds a package in memory, one named part at a time.
pub struct PackageWriter {
    zip: ZipWriter<Cursor<Vec<u8>>>,
    options: SimpleFileOptions,
}

impl PackageWriter {
    pub fn new() -> Self {
        Self {
            zip: ZipWriter::new(Cursor::new(Vec::new())),
            options: SimpleFileOptions::default().compression_method(CompressionMethod::Deflated),
        }
    }

    /// Appends a part. Parts are stored in the order they are written.
    pub fn write(&mut self, part_name: &str, bytes: &[u8]) -> Result<()> {
        self.zip.start_file(part_name, self.options)?;
        self.zip.write_all(bytes)?;
        Ok(())
    }

    /// Finishes the central directory and returns the package bytes.
    pub fn finalize(self) -> Result<Vec<u8>> {
        Ok(self.zip.finish()?.into_inner())
    }
}

impl Default for PackageWriter {
    fn default() -> Self {
        Self::new()
    }
}
