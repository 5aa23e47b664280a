//! The canonical scene model shared by import, editing and export.
//!
//! Everything here is expressed in pixel space on a 960×540 canvas and
//! serializes to the JSON document the editor consumes.

use crate::theme::ThemePalette;
use crate::units::{CANVAS_HEIGHT_PX, CANVAS_WIDTH_PX};
use crate::{Error, Result};
use base64::{engine::general_purpose, Engine as _};
use serde::{Deserialize, Serialize};
use std::fmt;

pub const DEFAULT_FONT_SIZE: f64 = 12.0;
pub const DEFAULT_FONT_FAMILY: &str = "Arial";

/// A `#RRGGBB` color.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Color(String);

impl Color {
    pub const BLACK: &'static str = "#000000";
    pub const WHITE: &'static str = "#ffffff";

    /// Parses `RRGGBB` or `#RRGGBB`. Hex digits may be in either case.
    pub fn parse(value: &str) -> Option<Color> {
        let hex = value.strip_prefix('#').unwrap_or(value);
        if hex.len() == 6 && hex.chars().all(|c| c.is_ascii_hexdigit()) {
            Some(Color(format!("#{}", hex)))
        } else {
            None
        }
    }

    pub fn black() -> Color {
        Color(Self::BLACK.to_string())
    }

    pub fn white() -> Color {
        Color(Self::WHITE.to_string())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// The six hex digits without the leading `#`, as DrawingML expects them.
    pub fn hex(&self) -> &str {
        &self.0[1..]
    }

    /// Red, green and blue channels in `0.0..=1.0`.
    pub fn to_rgb_f32(&self) -> [f32; 3] {
        let channel = |i: usize| {
            u8::from_str_radix(&self.0[1 + i * 2..3 + i * 2], 16).unwrap_or(0) as f32 / 255.0
        };
        [channel(0), channel(1), channel(2)]
    }
}

impl TryFrom<String> for Color {
    type Error = String;

    fn try_from(value: String) -> std::result::Result<Self, Self::Error> {
        Color::parse(&value).ok_or_else(|| format!("expected #RRGGBB color, got {:?}", value))
    }
}

impl From<Color> for String {
    fn from(color: Color) -> String {
        color.0
    }
}

impl fmt::Display for Color {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// An embedded image as a `data:<mime>;base64,<payload>` URI.
///
/// Sources arriving from the editor are not validated on deserialization, so
/// an `ImageSource` may hold a plain URL. The exporter rejects those.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ImageSource(String);

impl ImageSource {
    pub fn from_bytes(mime: &str, data: &[u8]) -> ImageSource {
        ImageSource(format!(
            "data:{};base64,{}",
            mime,
            general_purpose::STANDARD.encode(data)
        ))
    }

    pub fn from_uri(uri: impl Into<String>) -> ImageSource {
        ImageSource(uri.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn is_data_uri(&self) -> bool {
        self.0.starts_with("data:")
    }

    /// Returns the mime type declared in the URI, if it is a data URI.
    pub fn mime(&self) -> Option<&str> {
        let rest = self.0.strip_prefix("data:")?;
        let header = rest.split_once(',')?.0;
        Some(header.split(';').next().unwrap_or(""))
    }

    /// Decodes the base64 payload of a data URI.
    pub fn decode(&self) -> Result<(String, Vec<u8>)> {
        let rest = self
            .0
            .strip_prefix("data:")
            .ok_or_else(|| Error::InvalidImageSource(preview(&self.0)))?;
        let (header, payload) = rest
            .split_once(',')
            .ok_or_else(|| Error::InvalidImageSource(preview(&self.0)))?;
        let header = header
            .strip_suffix(";base64")
            .ok_or_else(|| Error::InvalidImageSource(preview(&self.0)))?;
        let data = general_purpose::STANDARD.decode(payload.trim())?;
        Ok((header.to_string(), data))
    }
}

fn preview(uri: &str) -> String {
    uri.chars().take(32).collect()
}

/// Position and size in pixels.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Geometry {
    pub x: f64,
    pub y: f64,
    pub width: f64,
    pub height: f64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub scale_x: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub scale_y: Option<f64>,
}

impl Geometry {
    pub fn new(x: f64, y: f64, width: f64, height: f64) -> Self {
        Self { x, y, width, height, scale_x: None, scale_y: None }
    }

    pub fn scale_x(&self) -> f64 {
        self.scale_x.unwrap_or(1.0)
    }

    pub fn scale_y(&self) -> f64 {
        self.scale_y.unwrap_or(1.0)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TextAlign {
    #[default]
    Left,
    Center,
    Right,
    Justify,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TextBox {
    pub text: String,
    pub geometry: Geometry,
    #[serde(default = "default_font_size")]
    pub font_size: f64,
    #[serde(default = "default_font_family")]
    pub font_family: String,
    #[serde(default = "Color::black")]
    pub fill_color: Color,
    #[serde(default)]
    pub bold: bool,
    #[serde(default)]
    pub italic: bool,
    #[serde(default)]
    pub underline: bool,
    #[serde(default)]
    pub align: TextAlign,
}

impl TextBox {
    /// A plain text box with the default font and color.
    pub fn new(text: impl Into<String>, geometry: Geometry) -> Self {
        Self {
            text: text.into(),
            geometry,
            font_size: DEFAULT_FONT_SIZE,
            font_family: DEFAULT_FONT_FAMILY.to_string(),
            fill_color: Color::black(),
            bold: false,
            italic: false,
            underline: false,
            align: TextAlign::Left,
        }
    }
}

/// Fill and outline shared by rectangles and ellipses.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ShapeObject {
    pub geometry: Geometry,
    #[serde(default = "Color::white")]
    pub fill_color: Color,
    #[serde(default = "Color::black")]
    pub stroke_color: Color,
    #[serde(default = "default_stroke_width")]
    pub stroke_width: f64,
}

impl ShapeObject {
    pub fn new(geometry: Geometry) -> Self {
        Self {
            geometry,
            fill_color: Color::white(),
            stroke_color: Color::black(),
            stroke_width: default_stroke_width(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ImageObject {
    pub geometry: Geometry,
    pub pixel_data: ImageSource,
}

/// One visual element on a slide.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum SceneObject {
    TextBox(TextBox),
    Rectangle(ShapeObject),
    Ellipse(ShapeObject),
    Image(ImageObject),
}

impl SceneObject {
    pub fn geometry(&self) -> &Geometry {
        match self {
            SceneObject::TextBox(t) => &t.geometry,
            SceneObject::Rectangle(s) | SceneObject::Ellipse(s) => &s.geometry,
            SceneObject::Image(i) => &i.geometry,
        }
    }

    pub fn kind(&self) -> &'static str {
        match self {
            SceneObject::TextBox(_) => "TextBox",
            SceneObject::Rectangle(_) => "Rectangle",
            SceneObject::Ellipse(_) => "Ellipse",
            SceneObject::Image(_) => "Image",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Slide {
    #[serde(default)]
    pub objects: Vec<SceneObject>,
    #[serde(default = "default_width")]
    pub width: f64,
    #[serde(default = "default_height")]
    pub height: f64,
    #[serde(default = "Color::white")]
    pub background: Color,
}

impl Slide {
    pub fn blank() -> Self {
        Self {
            objects: Vec::new(),
            width: CANVAS_WIDTH_PX,
            height: CANVAS_HEIGHT_PX,
            background: Color::white(),
        }
    }

    pub fn push_object(&mut self, object: SceneObject) {
        self.objects.push(object);
    }

    /// Inserts at `index`, clamped to the end of the stack.
    pub fn insert_object(&mut self, index: usize, object: SceneObject) {
        let index = index.min(self.objects.len());
        self.objects.insert(index, object);
    }

    pub fn remove_object(&mut self, index: usize) -> Option<SceneObject> {
        if index < self.objects.len() {
            Some(self.objects.remove(index))
        } else {
            None
        }
    }

    /// Replaces the object at `index`, returning the previous one.
    pub fn replace_object(&mut self, index: usize, object: SceneObject) -> Option<SceneObject> {
        self.objects
            .get_mut(index)
            .map(|slot| std::mem::replace(slot, object))
    }
}

impl Default for Slide {
    fn default() -> Self {
        Self::blank()
    }
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct Presentation {
    pub slides: Vec<Slide>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub theme: Option<ThemePalette>,
}

impl Presentation {
    /// A new deck with a single blank slide.
    pub fn blank() -> Self {
        Self { slides: vec![Slide::blank()], theme: None }
    }

    pub fn push_slide(&mut self, slide: Slide) {
        self.slides.push(slide);
    }

    /// Swaps in a whole slide. Concurrent editors resolve by last write.
    pub fn replace_slide(&mut self, index: usize, slide: Slide) -> Option<Slide> {
        self.slides
            .get_mut(index)
            .map(|slot| std::mem::replace(slot, slide))
    }

    pub fn from_json(json: &str) -> Result<Self> {
        Ok(serde_json::from_str(json)?)
    }

    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string(self)?)
    }

    pub fn to_json_pretty(&self) -> Result<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }
}

fn default_font_size() -> f64 {
    DEFAULT_FONT_SIZE
}

fn default_font_family() -> String {
    DEFAULT_FONT_FAMILY.to_string()
}

fn default_stroke_width() -> f64 {
    1.0
}

fn default_width() -> f64 {
    CANVAS_WIDTH_PX
}

fn default_height() -> f64 {
    CANVAS_HEIGHT_PX
}
