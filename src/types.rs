use crate::{Color, Geometry, TextAlign};

/// An element read from a slide's shape tree, before pictures are linked to
/// their media parts.
#[derive(Debug, Clone, PartialEq)]
pub enum SlideElement {
    Text(TextElement),
    Shape(ShapeElement),
    Image(ImageReference),
}

#[derive(Debug, Clone, PartialEq)]
pub struct TextElement {
    pub text: String,
    pub geometry: Geometry,
    pub fill_color: Color,
    pub formatting: Formatting,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Formatting {
    pub bold: bool,
    pub italic: bool,
    pub underlined: bool,
    pub font_size: f64,
    pub font_family: String,
    pub align: TextAlign,
}

impl Default for Formatting {
    fn default() -> Self {
        Self {
            bold: false,
            italic: false,
            underlined: false,
            font_size: crate::model::DEFAULT_FONT_SIZE,
            font_family: crate::model::DEFAULT_FONT_FAMILY.to_string(),
            align: TextAlign::Left,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ShapeKind {
    Rectangle,
    Ellipse,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ShapeElement {
    pub kind: ShapeKind,
    pub geometry: Geometry,
    pub fill_color: Color,
    pub stroke_color: Color,
    pub stroke_width: f64,
}

/// A picture's embed id, resolved to a media part by `SlidePart::link_images`.
#[derive(Debug, Clone, PartialEq)]
pub struct ImageReference {
    pub id: String,
    pub target: String,
    pub geometry: Geometry,
}

/// One `<Relationship>` of a `.rels` part.
#[derive(Debug, Clone, PartialEq)]
pub struct Relationship {
    pub id: String,
    pub rel_type: String,
    pub target: String,
}

/// Everything read from one slide part.
#[derive(Debug, Clone, PartialEq)]
pub struct ParsedSlide {
    pub elements: Vec<SlideElement>,
    pub background: Color,
}
