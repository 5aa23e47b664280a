//! Serializes the scene model into an output container.
//!
//! [`slide_elements`] is the only place that knows how scene objects turn into
//! placed output elements. Containers implement [`SlideSink`] and receive the
//! same element stream, so the package and the flattened export cannot drift
//! apart.

mod pdf;
mod pptx;

pub use pdf::PdfSink;
pub use pptx::PptxSink;

use crate::constants::{PDF_CONTENT_TYPE, PPTX_CONTENT_TYPE};
use crate::units::{normalize_placement, Placement};
use crate::{Color, Error, ExportConfig, Geometry, Presentation, Result, SceneObject, Slide, TextAlign};
use std::str::FromStr;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExportTarget {
    /// An editable `.pptx` package.
    Package,
    /// A fixed-layout PDF.
    Flattened,
}

impl ExportTarget {
    pub fn content_type(&self) -> &'static str {
        match self {
            ExportTarget::Package => PPTX_CONTENT_TYPE,
            ExportTarget::Flattened => PDF_CONTENT_TYPE,
        }
    }

    pub fn extension(&self) -> &'static str {
        match self {
            ExportTarget::Package => "pptx",
            ExportTarget::Flattened => "pdf",
        }
    }
}

impl FromStr for ExportTarget {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "pptx" => Ok(ExportTarget::Package),
            "pdf" => Ok(ExportTarget::Flattened),
            _ => Err(Error::UnknownExportTarget(s.to_string())),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct TextSpec {
    pub text: String,
    pub font_size: f64,
    pub font_family: String,
    pub color: Color,
    pub bold: bool,
    pub italic: bool,
    pub underline: bool,
    pub align: TextAlign,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ShapeSpec {
    pub fill: Color,
    pub stroke: Color,
    /// Outline width in pixels.
    pub stroke_width: f64,
}

#[derive(Debug, Clone, PartialEq)]
pub enum ElementKind {
    Text(TextSpec),
    Rectangle(ShapeSpec),
    Ellipse(ShapeSpec),
    Picture { mime: String, data: Vec<u8> },
}

/// One output element, placed as fractions of the canvas.
#[derive(Debug, Clone, PartialEq)]
pub struct ExportElement {
    pub placement: Placement,
    pub kind: ElementKind,
}

/// An output container that slides are rendered into.
pub trait SlideSink {
    fn begin_slide(&mut self, index: usize, slide: &Slide) -> Result<()>;

    fn element(&mut self, element: &ExportElement) -> Result<()>;

    fn end_slide(&mut self) -> Result<()>;

    fn finish(self) -> Result<Vec<u8>>;
}

/// Serializes `presentation` into the byte stream of `target`.
///
/// # Errors
///
/// [`Error::EmptyPresentation`] when there are no slides; container errors
/// otherwise.
pub fn serialize(presentation: &Presentation, target: ExportTarget, config: &ExportConfig) -> Result<Vec<u8>> {
    if presentation.slides.is_empty() {
        return Err(Error::EmptyPresentation);
    }

    match target {
        ExportTarget::Package => render(presentation, PptxSink::new(presentation, config), config),
        ExportTarget::Flattened => render(presentation, PdfSink::new(config), config),
    }
}

fn render<S: SlideSink>(presentation: &Presentation, mut sink: S, config: &ExportConfig) -> Result<Vec<u8>> {
    for (index, slide) in presentation.slides.iter().enumerate() {
        sink.begin_slide(index, slide)?;
        for element in slide_elements(slide, config) {
            sink.element(&element)?;
        }
        sink.end_slide()?;
    }
    sink.finish()
}

/// Maps the objects of a slide to placed output elements, front-most last.
///
/// Images that are not base64 data URIs are dropped with a warning. A slide
/// that ends up with no elements gets a single placeholder text box so the
/// exported page is never blank.
pub fn slide_elements(slide: &Slide, config: &ExportConfig) -> Vec<ExportElement> {
    let mut elements: Vec<ExportElement> = slide.objects.iter().filter_map(map_object).collect();

    if elements.is_empty() {
        elements.push(placeholder(config));
    }

    elements
}

fn map_object(object: &SceneObject) -> Option<ExportElement> {
    let kind = match object {
        SceneObject::TextBox(text) => ElementKind::Text(TextSpec {
            text: text.text.clone(),
            font_size: text.font_size,
            font_family: text.font_family.clone(),
            color: text.fill_color.clone(),
            bold: text.bold,
            italic: text.italic,
            underline: text.underline,
            align: text.align,
        }),
        SceneObject::Rectangle(shape) => ElementKind::Rectangle(shape_spec(shape)),
        SceneObject::Ellipse(shape) => ElementKind::Ellipse(shape_spec(shape)),
        SceneObject::Image(image) => {
            if !image.pixel_data.is_data_uri() {
                log::warn!("dropping image that is not a data URI");
                return None;
            }
            match image.pixel_data.decode() {
                Ok((mime, data)) => ElementKind::Picture { mime, data },
                Err(e) => {
                    log::warn!("dropping undecodable image ({})", e);
                    return None;
                },
            }
        },
    };

    Some(ExportElement {
        placement: normalize_placement(object.geometry()),
        kind,
    })
}

fn shape_spec(shape: &crate::ShapeObject) -> ShapeSpec {
    ShapeSpec {
        fill: shape.fill_color.clone(),
        stroke: shape.stroke_color.clone(),
        stroke_width: shape.stroke_width,
    }
}

fn placeholder(config: &ExportConfig) -> ExportElement {
    ExportElement {
        placement: normalize_placement(&Geometry::new(48.0, 48.0, 480.0, 96.0)),
        kind: ElementKind::Text(TextSpec {
            text: config.placeholder_text.clone(),
            font_size: 24.0,
            font_family: crate::model::DEFAULT_FONT_FAMILY.to_string(),
            color: Color::black(),
            bold: false,
            italic: false,
            underline: false,
            align: TextAlign::Center,
        }),
    }
}

/// Escape XML special characters and drop characters XML 1.0 cannot carry.
pub(crate) fn escape_xml(s: &str) -> String {
    let mut escaped = String::with_capacity(s.len());
    for c in s.chars() {
        match c {
            '&' => escaped.push_str("&amp;"),
            '<' => escaped.push_str("&lt;"),
            '>' => escaped.push_str("&gt;"),
            '"' => escaped.push_str("&quot;"),
            '\'' => escaped.push_str("&apos;"),
            '\t' | '\n' | '\r' => escaped.push(c),
            c if (c as u32) < 0x20 => {},
            '\u{FFFE}' | '\u{FFFF}' => {},
            c => escaped.push(c),
        }
    }
    escaped
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{ImageObject, ImageSource, ShapeObject, TextBox};

    #[test]
    fn test_target_from_str() {
        assert_eq!("pptx".parse::<ExportTarget>().unwrap(), ExportTarget::Package);
        assert_eq!("PDF".parse::<ExportTarget>().unwrap(), ExportTarget::Flattened);
        assert!(matches!("docx".parse::<ExportTarget>(), Err(Error::UnknownExportTarget(_))));
        assert_eq!(ExportTarget::Flattened.content_type(), "application/pdf");
    }

    #[test]
    fn test_empty_slide_gets_one_placeholder() {
        let elements = slide_elements(&Slide::blank(), &ExportConfig::default());
        assert_eq!(elements.len(), 1);
        match &elements[0].kind {
            ElementKind::Text(text) => {
                assert_eq!(text.text, "Empty Slide");
                assert_eq!(text.align, TextAlign::Center);
            },
            other => panic!("expected placeholder text, got {:?}", other),
        }
    }

    #[test]
    fn test_placeholder_text_is_configurable() {
        let config = ExportConfig::builder().placeholder_text("TBD").build();
        match &slide_elements(&Slide::blank(), &config)[0].kind {
            ElementKind::Text(text) => assert_eq!(text.text, "TBD"),
            other => panic!("expected placeholder text, got {:?}", other),
        }
    }

    #[test]
    fn test_objects_keep_order_and_styling() {
        let mut slide = Slide::blank();
        let mut text = TextBox::new("Title", Geometry::new(96.0, 54.0, 480.0, 108.0));
        text.bold = true;
        text.align = TextAlign::Right;
        slide.push_object(SceneObject::TextBox(text));
        slide.push_object(SceneObject::Ellipse(ShapeObject::new(Geometry {
            x: 0.0,
            y: 0.0,
            width: 96.0,
            height: 54.0,
            scale_x: Some(2.0),
            scale_y: Some(0.5),
        })));

        let elements = slide_elements(&slide, &ExportConfig::default());
        assert_eq!(elements.len(), 2);
        assert_eq!(elements[0].placement, Placement { x: 0.1, y: 0.1, w: 0.5, h: 0.2 });
        match &elements[0].kind {
            ElementKind::Text(spec) => {
                assert!(spec.bold);
                assert_eq!(spec.align, TextAlign::Right);
                assert_eq!(spec.font_family, "Arial");
            },
            other => panic!("expected text, got {:?}", other),
        }
        assert_eq!(elements[1].placement, Placement { x: 0.0, y: 0.0, w: 0.2, h: 0.05 });
        assert!(matches!(elements[1].kind, ElementKind::Ellipse(_)));
    }

    #[test]
    fn test_non_data_uri_images_are_rejected() {
        let mut slide = Slide::blank();
        slide.push_object(SceneObject::Image(ImageObject {
            geometry: Geometry::new(0.0, 0.0, 10.0, 10.0),
            pixel_data: ImageSource::from_uri("https://example.com/cat.png"),
        }));
        slide.push_object(SceneObject::Image(ImageObject {
            geometry: Geometry::new(0.0, 0.0, 10.0, 10.0),
            pixel_data: ImageSource::from_bytes("image/png", &[1, 2, 3]),
        }));

        let elements = slide_elements(&slide, &ExportConfig::default());
        assert_eq!(elements.len(), 1);
        match &elements[0].kind {
            ElementKind::Picture { mime, data } => {
                assert_eq!(mime, "image/png");
                assert_eq!(data, &vec![1, 2, 3]);
            },
            other => panic!("expected picture, got {:?}", other),
        }
    }

    #[test]
    fn test_slide_of_only_rejected_images_gets_placeholder() {
        let mut slide = Slide::blank();
        slide.push_object(SceneObject::Image(ImageObject {
            geometry: Geometry::new(0.0, 0.0, 10.0, 10.0),
            pixel_data: ImageSource::from_uri("blob:abc"),
        }));
        let elements = slide_elements(&slide, &ExportConfig::default());
        assert_eq!(elements.len(), 1);
        assert!(matches!(elements[0].kind, ElementKind::Text(_)));
    }

    #[test]
    fn test_empty_presentation_is_an_error() {
        let presentation = Presentation::default();
        for target in [ExportTarget::Package, ExportTarget::Flattened] {
            assert!(matches!(
                serialize(&presentation, target, &ExportConfig::default()),
                Err(Error::EmptyPresentation)
            ));
        }
    }

    #[test]
    fn test_escape_xml() {
        assert_eq!(escape_xml("a < b & \"c\"\u{1}"), "a &lt; b &amp; &quot;c&quot;");
        assert_eq!(escape_xml("keep\u{FFFF}me\u{FFFE}"), "keepme");
    }
}
