use super::{ElementKind, ExportElement, ShapeSpec, SlideSink, TextSpec};
use crate::{Color, ExportConfig, Result, Slide, TextAlign};
use lopdf::content::{Content, Operation};
use lopdf::{dictionary, Dictionary, Document, Object, ObjectId, Stream};

/// Page size in points. Same 16:9 aspect as the pixel canvas.
pub const PAGE_WIDTH_PT: f64 = 720.0;
pub const PAGE_HEIGHT_PT: f64 = 405.0;

const PT_PER_PX: f64 = PAGE_WIDTH_PT / crate::units::CANVAS_WIDTH_PX;
const LINE_SPACING: f64 = 1.2;
/// Average Helvetica glyph advance as a fraction of the font size.
const AVERAGE_ADVANCE: f64 = 0.5;
/// Control point distance for approximating a quarter ellipse with a cubic curve.
const KAPPA: f64 = 0.552_284_75;

/// Writes slides as a fixed-layout PDF, one page per slide.
pub struct PdfSink {
    doc: Document,
    pages_id: ObjectId,
    fonts_id: ObjectId,
    author: String,
    page_ids: Vec<ObjectId>,
    page: Option<PageContent>,
}

struct PageContent {
    operations: Vec<Operation>,
    images: Dictionary,
    image_count: usize,
}

impl PdfSink {
    pub fn new(config: &ExportConfig) -> Self {
        let mut doc = Document::with_version("1.5");
        let pages_id = doc.new_object_id();

        let mut fonts = Dictionary::new();
        for (name, base_font) in [
            ("F1", "Helvetica"),
            ("F2", "Helvetica-Bold"),
            ("F3", "Helvetica-Oblique"),
            ("F4", "Helvetica-BoldOblique"),
        ] {
            let font_id = doc.add_object(dictionary! {
                "Type" => "Font",
                "Subtype" => "Type1",
                "BaseFont" => base_font,
                "Encoding" => "WinAnsiEncoding",
            });
            fonts.set(name, font_id);
        }
        let fonts_id = doc.add_object(fonts);

        Self {
            doc,
            pages_id,
            fonts_id,
            author: config.author.clone(),
            page_ids: Vec::new(),
            page: None,
        }
    }
}

impl SlideSink for PdfSink {
    fn begin_slide(&mut self, _index: usize, slide: &Slide) -> Result<()> {
        let mut page = PageContent {
            operations: Vec::new(),
            images: Dictionary::new(),
            image_count: 0,
        };
        set_fill(&mut page.operations, &slide.background);
        page.operations.push(Operation::new(
            "re",
            vec![Object::Integer(0), Object::Integer(0), real(PAGE_WIDTH_PT), real(PAGE_HEIGHT_PT)],
        ));
        page.operations.push(Operation::new("f", vec![]));
        self.page = Some(page);
        Ok(())
    }

    fn element(&mut self, element: &ExportElement) -> Result<()> {
        let Some(mut page) = self.page.take() else {
            return Ok(());
        };

        let (x, top, w, h) = element.placement.to_page_rect(PAGE_WIDTH_PT, PAGE_HEIGHT_PT);
        let y = PAGE_HEIGHT_PT - top - h;

        match &element.kind {
            ElementKind::Text(text) => draw_text(&mut page.operations, (x, top, w), text),
            ElementKind::Rectangle(shape) => {
                let painted = set_shape_paint(&mut page.operations, shape);
                page.operations.push(Operation::new("re", vec![real(x), real(y), real(w), real(h)]));
                page.operations.push(Operation::new(painted, vec![]));
            },
            ElementKind::Ellipse(shape) => {
                let painted = set_shape_paint(&mut page.operations, shape);
                ellipse_path(&mut page.operations, (x, y, w, h));
                page.operations.push(Operation::new(painted, vec![]));
            },
            ElementKind::Picture { data, .. } => match image::load_from_memory(data) {
                Ok(decoded) => {
                    let rgb = decoded.to_rgb8();
                    let (width, height) = rgb.dimensions();
                    let stream = Stream::new(
                        dictionary! {
                            "Type" => "XObject",
                            "Subtype" => "Image",
                            "Width" => width as i64,
                            "Height" => height as i64,
                            "ColorSpace" => "DeviceRGB",
                            "BitsPerComponent" => 8i64,
                        },
                        rgb.into_raw(),
                    );
                    let image_id = self.doc.add_object(stream);
                    page.image_count += 1;
                    let name = format!("Im{}", page.image_count);
                    page.images.set(name.as_str(), image_id);

                    page.operations.push(Operation::new("q", vec![]));
                    page.operations.push(Operation::new(
                        "cm",
                        vec![real(w), Object::Integer(0), Object::Integer(0), real(h), real(x), real(y)],
                    ));
                    page.operations.push(Operation::new("Do", vec![Object::Name(name.into_bytes())]));
                    page.operations.push(Operation::new("Q", vec![]));
                },
                Err(e) => log::warn!("skipping picture that could not be decoded ({})", e),
            },
        }

        self.page = Some(page);
        Ok(())
    }

    fn end_slide(&mut self) -> Result<()> {
        let Some(page) = self.page.take() else {
            return Ok(());
        };

        let content = Content { operations: page.operations };
        let content_id = self.doc.add_object(Stream::new(dictionary! {}, content.encode()?));

        let mut resources = dictionary! {
            "Font" => self.fonts_id,
        };
        if page.image_count > 0 {
            resources.set("XObject", page.images);
        }

        let page_id = self.doc.add_object(dictionary! {
            "Type" => "Page",
            "Parent" => self.pages_id,
            "MediaBox" => vec![Object::Integer(0), Object::Integer(0), real(PAGE_WIDTH_PT), real(PAGE_HEIGHT_PT)],
            "Contents" => content_id,
            "Resources" => resources,
        });
        self.page_ids.push(page_id);
        Ok(())
    }

    fn finish(mut self) -> Result<Vec<u8>> {
        let kids: Vec<Object> = self.page_ids.iter().map(|id| (*id).into()).collect();
        let pages = dictionary! {
            "Type" => "Pages",
            "Kids" => kids,
            "Count" => self.page_ids.len() as i64,
        };
        self.doc.objects.insert(self.pages_id, Object::Dictionary(pages));

        let catalog_id = self.doc.add_object(dictionary! {
            "Type" => "Catalog",
            "Pages" => self.pages_id,
        });
        let info_id = self.doc.add_object(dictionary! {
            "Producer" => Object::string_literal("slidecodec"),
            "Author" => Object::string_literal(to_win_ansi(&self.author)),
        });
        self.doc.trailer.set("Root", catalog_id);
        self.doc.trailer.set("Info", info_id);
        self.doc.compress();

        let mut bytes = Vec::new();
        self.doc.save_to(&mut bytes)?;
        Ok(bytes)
    }
}

fn real(value: f64) -> Object {
    Object::from(value as f32)
}

fn set_fill(operations: &mut Vec<Operation>, color: &Color) {
    let [r, g, b] = color.to_rgb_f32();
    operations.push(Operation::new("rg", vec![r.into(), g.into(), b.into()]));
}

fn set_stroke(operations: &mut Vec<Operation>, color: &Color) {
    let [r, g, b] = color.to_rgb_f32();
    operations.push(Operation::new("RG", vec![r.into(), g.into(), b.into()]));
}

/// Sets fill and outline state and returns the painting operator to close the path with.
fn set_shape_paint(operations: &mut Vec<Operation>, shape: &ShapeSpec) -> &'static str {
    set_fill(operations, &shape.fill);
    if shape.stroke_width > 0.0 {
        set_stroke(operations, &shape.stroke);
        operations.push(Operation::new("w", vec![real(shape.stroke_width * PT_PER_PX)]));
        "B"
    } else {
        "f"
    }
}

fn ellipse_path(operations: &mut Vec<Operation>, (x, y, w, h): (f64, f64, f64, f64)) {
    let (rx, ry) = (w / 2.0, h / 2.0);
    let (cx, cy) = (x + rx, y + ry);
    let (ox, oy) = (rx * KAPPA, ry * KAPPA);

    operations.push(Operation::new("m", vec![real(cx + rx), real(cy)]));
    let curves = [
        [cx + rx, cy + oy, cx + ox, cy + ry, cx, cy + ry],
        [cx - ox, cy + ry, cx - rx, cy + oy, cx - rx, cy],
        [cx - rx, cy - oy, cx - ox, cy - ry, cx, cy - ry],
        [cx + ox, cy - ry, cx + rx, cy - oy, cx + rx, cy],
    ];
    for curve in curves {
        operations.push(Operation::new("c", curve.iter().map(|v| real(*v)).collect()));
    }
    operations.push(Operation::new("h", vec![]));
}

fn font_resource(text: &TextSpec) -> &'static str {
    match (text.bold, text.italic) {
        (false, false) => "F1",
        (true, false) => "F2",
        (false, true) => "F3",
        (true, true) => "F4",
    }
}

/// Draws one line per `\n`. `top` is measured from the top of the page.
fn draw_text(operations: &mut Vec<Operation>, (x, top, w): (f64, f64, f64), text: &TextSpec) {
    let size = if text.font_size > 0.0 { text.font_size } else { crate::model::DEFAULT_FONT_SIZE };
    let line_height = size * LINE_SPACING;

    set_fill(operations, &text.color);
    set_stroke(operations, &text.color);

    for (i, line) in text.text.split('\n').enumerate() {
        let encoded = to_win_ansi(line.trim_end_matches('\r'));
        if encoded.is_empty() {
            continue;
        }

        let line_width = encoded.len() as f64 * size * AVERAGE_ADVANCE;
        let line_x = match text.align {
            TextAlign::Center => x + (w - line_width) / 2.0,
            TextAlign::Right => x + w - line_width,
            TextAlign::Left | TextAlign::Justify => x,
        };
        let baseline = PAGE_HEIGHT_PT - (top + size + i as f64 * line_height);

        operations.push(Operation::new("BT", vec![]));
        operations.push(Operation::new("Tf", vec![font_resource(text).into(), real(size)]));
        operations.push(Operation::new("Td", vec![real(line_x), real(baseline)]));
        operations.push(Operation::new("Tj", vec![Object::string_literal(encoded)]));
        operations.push(Operation::new("ET", vec![]));

        if text.underline {
            let underline_y = baseline - size * 0.12;
            operations.push(Operation::new("w", vec![real((size * 0.05).max(0.5))]));
            operations.push(Operation::new("m", vec![real(line_x), real(underline_y)]));
            operations.push(Operation::new("l", vec![real(line_x + line_width), real(underline_y)]));
            operations.push(Operation::new("S", vec![]));
        }
    }
}

/// WinAnsiEncoding code points in 0x80..=0x9F that differ from Latin-1.
const WIN_ANSI_HIGH: [(char, u8); 27] = [
    ('\u{20AC}', 0x80), ('\u{201A}', 0x82), ('\u{0192}', 0x83), ('\u{201E}', 0x84),
    ('\u{2026}', 0x85), ('\u{2020}', 0x86), ('\u{2021}', 0x87), ('\u{02C6}', 0x88),
    ('\u{2030}', 0x89), ('\u{0160}', 0x8A), ('\u{2039}', 0x8B), ('\u{0152}', 0x8C),
    ('\u{017D}', 0x8E), ('\u{2018}', 0x91), ('\u{2019}', 0x92), ('\u{201C}', 0x93),
    ('\u{201D}', 0x94), ('\u{2022}', 0x95), ('\u{2013}', 0x96), ('\u{2014}', 0x97),
    ('\u{02DC}', 0x98), ('\u{2122}', 0x99), ('\u{0161}', 0x9A), ('\u{203A}', 0x9B),
    ('\u{0153}', 0x9C), ('\u{017E}', 0x9E), ('\u{0178}', 0x9F),
];

/// Maps text onto the single byte encoding of the standard fonts. Characters
/// the encoding lacks become `?`, control characters are dropped.
fn to_win_ansi(text: &str) -> Vec<u8> {
    text.chars()
        .filter(|c| !c.is_control())
        .map(|c| match u8::try_from(u32::from(c)) {
            Ok(byte) => byte,
            Err(_) => WIN_ANSI_HIGH
                .iter()
                .find(|(mapped, _)| *mapped == c)
                .map_or(b'?', |(_, byte)| *byte),
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::units::Placement;

    fn text_spec(text: &str) -> TextSpec {
        TextSpec {
            text: text.to_string(),
            font_size: 20.0,
            font_family: "Arial".to_string(),
            color: Color::black(),
            bold: true,
            italic: true,
            underline: false,
            align: TextAlign::Left,
        }
    }

    #[test]
    fn test_to_win_ansi() {
        assert_eq!(to_win_ansi("Café\u{1}"), vec![b'C', b'a', b'f', 0xE9]);
        assert_eq!(to_win_ansi("→x"), vec![b'?', b'x']);
        assert_eq!(
            to_win_ansi("\u{20AC}5 \u{201C}a\u{201D} \u{2013} \u{2122}"),
            vec![0x80, b'5', b' ', 0x93, b'a', 0x94, b' ', 0x96, b' ', 0x99]
        );
    }

    #[test]
    fn test_font_selection() {
        assert_eq!(font_resource(&text_spec("x")), "F4");
    }

    #[test]
    fn test_text_lines_and_empty_lines() {
        let mut operations = Vec::new();
        draw_text(&mut operations, (10.0, 20.0, 200.0), &text_spec("one\n\nthree"));
        let shown = operations.iter().filter(|op| op.operator == "Tj").count();
        assert_eq!(shown, 2);
    }

    #[test]
    fn test_single_page_document() {
        let mut sink = PdfSink::new(&ExportConfig::default());
        sink.begin_slide(0, &Slide::blank()).unwrap();
        sink.element(&ExportElement {
            placement: Placement { x: 0.1, y: 0.1, w: 0.5, h: 0.2 },
            kind: ElementKind::Ellipse(ShapeSpec { fill: Color::white(), stroke: Color::black(), stroke_width: 1.0 }),
        })
        .unwrap();
        sink.end_slide().unwrap();
        let bytes = sink.finish().unwrap();

        assert!(bytes.starts_with(b"%PDF-1.5"));
        let doc = Document::load_mem(&bytes).unwrap();
        assert_eq!(doc.get_pages().len(), 1);
    }

    #[test]
    fn test_undecodable_picture_is_skipped() {
        let mut sink = PdfSink::new(&ExportConfig::default());
        sink.begin_slide(0, &Slide::blank()).unwrap();
        sink.element(&ExportElement {
            placement: Placement { x: 0.0, y: 0.0, w: 1.0, h: 1.0 },
            kind: ElementKind::Picture { mime: "image/png".to_string(), data: vec![1, 2, 3] },
        })
        .unwrap();
        sink.end_slide().unwrap();
        assert!(sink.finish().unwrap().starts_with(b"%PDF"));
    }
}
