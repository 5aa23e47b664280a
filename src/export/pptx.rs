use super::{escape_xml, ElementKind, ExportElement, ShapeSpec, SlideSink, TextSpec};
use crate::constants::*;
use crate::units::{to_native, SLIDE_HEIGHT_EMU, SLIDE_WIDTH_EMU};
use crate::{Color, ExportConfig, PackageWriter, Presentation, Result, Slide, TextAlign, ThemePalette};
use std::collections::BTreeMap;
use std::fmt::Write as FmtWrite;

const SLIDE_ID_BASE: u32 = 256;

/// Writes slides as an editable `.pptx` package.
///
/// Parts are buffered until [`SlideSink::finish`] so `[Content_Types].xml`
/// can be written first and list every media extension that was used.
pub struct PptxSink {
    author: String,
    theme: ThemePalette,
    parts: Vec<(String, Vec<u8>)>,
    media_types: BTreeMap<String, String>,
    media_count: usize,
    slide_count: usize,
    current: Option<SlideXml>,
}

struct SlideXml {
    background: Color,
    tree: String,
    image_rels: Vec<(String, String)>,
    next_shape_id: u32,
}

impl SlideXml {
    fn next_id(&mut self) -> u32 {
        let id = self.next_shape_id;
        self.next_shape_id += 1;
        id
    }
}

impl PptxSink {
    pub fn new(presentation: &Presentation, config: &ExportConfig) -> Self {
        Self {
            author: config.author.clone(),
            theme: presentation.theme.clone().unwrap_or_default(),
            parts: Vec::new(),
            media_types: BTreeMap::new(),
            media_count: 0,
            slide_count: 0,
            current: None,
        }
    }

    fn add_part(&mut self, name: impl Into<String>, data: impl Into<Vec<u8>>) {
        self.parts.push((name.into(), data.into()));
    }

    /// Stores a media part and returns its file name under `ppt/media/`.
    fn add_media(&mut self, mime: &str, data: &[u8]) -> String {
        let (extension, content_type) = media_type(mime, data);
        self.media_count += 1;
        let file_name = format!("image{}.{}", self.media_count, extension);
        self.media_types.entry(extension).or_insert(content_type);
        self.add_part(format!("ppt/media/{}", file_name), data);
        file_name
    }
}

impl SlideSink for PptxSink {
    fn begin_slide(&mut self, _index: usize, slide: &Slide) -> Result<()> {
        self.current = Some(SlideXml {
            background: slide.background.clone(),
            tree: String::with_capacity(4096),
            image_rels: Vec::new(),
            next_shape_id: 2,
        });
        Ok(())
    }

    fn element(&mut self, element: &ExportElement) -> Result<()> {
        let Some(mut slide) = self.current.take() else {
            return Ok(());
        };

        let (x, y, w, h) = element.placement.to_native_rect(SLIDE_WIDTH_EMU, SLIDE_HEIGHT_EMU);
        let id = slide.next_id();

        match &element.kind {
            ElementKind::Text(text) => write_text(&mut slide.tree, id, (x, y, w, h), text),
            ElementKind::Rectangle(shape) => write_shape(&mut slide.tree, id, "Rectangle", "rect", (x, y, w, h), shape),
            ElementKind::Ellipse(shape) => write_shape(&mut slide.tree, id, "Ellipse", "ellipse", (x, y, w, h), shape),
            ElementKind::Picture { mime, data } => {
                let file_name = self.add_media(mime, data);
                let rel_id = format!("rId{}", slide.image_rels.len() + 2);
                write_picture(&mut slide.tree, id, (x, y, w, h), &rel_id);
                slide.image_rels.push((rel_id, file_name));
            },
        }

        self.current = Some(slide);
        Ok(())
    }

    fn end_slide(&mut self) -> Result<()> {
        let Some(slide) = self.current.take() else {
            return Ok(());
        };
        self.slide_count += 1;
        let number = self.slide_count;

        let mut xml = String::with_capacity(slide.tree.len() + 1024);
        xml.push_str(r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>"#);
        write!(xml, r#"<p:sld xmlns:a="{}" xmlns:r="{}" xmlns:p="{}">"#, A_NAMESPACE, RELS_NAMESPACE, P_NAMESPACE).ok();
        xml.push_str("<p:cSld>");
        write!(
            xml,
            r#"<p:bg><p:bgPr><a:solidFill><a:srgbClr val="{}"/></a:solidFill><a:effectLst/></p:bgPr></p:bg>"#,
            slide.background.hex()
        )
        .ok();
        xml.push_str("<p:spTree>");
        xml.push_str(GROUP_PROPERTIES);
        xml.push_str(&slide.tree);
        xml.push_str("</p:spTree></p:cSld>");
        xml.push_str("<p:clrMapOvr><a:masterClrMapping/></p:clrMapOvr>");
        xml.push_str("</p:sld>");
        self.add_part(format!("ppt/slides/slide{}.xml", number), xml);

        let mut rels = vec![(
            "rId1".to_string(),
            SLIDE_LAYOUT_REL_TYPE,
            "../slideLayouts/slideLayout1.xml".to_string(),
        )];
        rels.extend(
            slide
                .image_rels
                .into_iter()
                .map(|(id, file_name)| (id, IMAGE_REL_TYPE, format!("../media/{}", file_name))),
        );
        self.add_part(format!("ppt/slides/_rels/slide{}.xml.rels", number), relationships_xml(&rels));

        Ok(())
    }

    fn finish(mut self) -> Result<Vec<u8>> {
        let slide_count = self.slide_count;

        let mut package = PackageWriter::new();
        package.write("[Content_Types].xml", self.content_types_xml().as_bytes())?;
        package.write(
            "_rels/.rels",
            relationships_xml(&[
                ("rId1".to_string(), OFFICE_DOCUMENT_REL_TYPE, "ppt/presentation.xml".to_string()),
                ("rId2".to_string(), CORE_PROPS_REL_TYPE, "docProps/core.xml".to_string()),
                ("rId3".to_string(), EXTENDED_PROPS_REL_TYPE, "docProps/app.xml".to_string()),
            ])
            .as_bytes(),
        )?;
        package.write("docProps/core.xml", core_xml(&self.author).as_bytes())?;
        package.write("docProps/app.xml", app_xml(slide_count).as_bytes())?;
        package.write("ppt/presentation.xml", presentation_xml(slide_count).as_bytes())?;

        let mut presentation_rels = vec![
            ("rId1".to_string(), SLIDE_MASTER_REL_TYPE, "slideMasters/slideMaster1.xml".to_string()),
            ("rId2".to_string(), THEME_REL_TYPE, "theme/theme1.xml".to_string()),
        ];
        for n in 1..=slide_count {
            presentation_rels.push((format!("rId{}", n + 2), SLIDE_REL_TYPE, format!("slides/slide{}.xml", n)));
        }
        package.write("ppt/_rels/presentation.xml.rels", relationships_xml(&presentation_rels).as_bytes())?;

        package.write("ppt/slideMasters/slideMaster1.xml", SLIDE_MASTER_XML.as_bytes())?;
        package.write(
            "ppt/slideMasters/_rels/slideMaster1.xml.rels",
            relationships_xml(&[
                ("rId1".to_string(), SLIDE_LAYOUT_REL_TYPE, "../slideLayouts/slideLayout1.xml".to_string()),
                ("rId2".to_string(), THEME_REL_TYPE, "../theme/theme1.xml".to_string()),
            ])
            .as_bytes(),
        )?;
        package.write("ppt/slideLayouts/slideLayout1.xml", SLIDE_LAYOUT_XML.as_bytes())?;
        package.write(
            "ppt/slideLayouts/_rels/slideLayout1.xml.rels",
            relationships_xml(&[(
                "rId1".to_string(),
                SLIDE_MASTER_REL_TYPE,
                "../slideMasters/slideMaster1.xml".to_string(),
            )])
            .as_bytes(),
        )?;
        package.write("ppt/theme/theme1.xml", self.theme.to_theme_xml().as_bytes())?;

        for (name, data) in std::mem::take(&mut self.parts) {
            package.write(&name, &data)?;
        }

        package.finalize()
    }
}

impl PptxSink {
    fn content_types_xml(&self) -> String {
        let mut xml = String::with_capacity(2048);
        xml.push_str(r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>"#);
        write!(xml, r#"<Types xmlns="{}">"#, CONTENT_TYPES_NAMESPACE).ok();
        xml.push_str(r#"<Default Extension="rels" ContentType="application/vnd.openxmlformats-package.relationships+xml"/>"#);
        xml.push_str(r#"<Default Extension="xml" ContentType="application/xml"/>"#);
        for (extension, content_type) in &self.media_types {
            write!(
                xml,
                r#"<Default Extension="{}" ContentType="{}"/>"#,
                escape_xml(extension),
                escape_xml(content_type)
            )
            .ok();
        }
        let overrides = [
            ("/ppt/presentation.xml", "application/vnd.openxmlformats-officedocument.presentationml.presentation.main+xml"),
            ("/ppt/slideMasters/slideMaster1.xml", "application/vnd.openxmlformats-officedocument.presentationml.slideMaster+xml"),
            ("/ppt/slideLayouts/slideLayout1.xml", "application/vnd.openxmlformats-officedocument.presentationml.slideLayout+xml"),
            ("/ppt/theme/theme1.xml", "application/vnd.openxmlformats-officedocument.theme+xml"),
            ("/docProps/core.xml", "application/vnd.openxmlformats-package.core-properties+xml"),
            ("/docProps/app.xml", "application/vnd.openxmlformats-officedocument.extended-properties+xml"),
        ];
        for (part, content_type) in overrides {
            write!(xml, r#"<Override PartName="{}" ContentType="{}"/>"#, part, content_type).ok();
        }
        for n in 1..=self.slide_count {
            write!(
                xml,
                r#"<Override PartName="/ppt/slides/slide{}.xml" ContentType="application/vnd.openxmlformats-officedocument.presentationml.slide+xml"/>"#,
                n
            )
            .ok();
        }
        xml.push_str("</Types>");
        xml
    }
}

const GROUP_PROPERTIES: &str = r#"<p:nvGrpSpPr><p:cNvPr id="1" name=""/><p:cNvGrpSpPr/><p:nvPr/></p:nvGrpSpPr><p:grpSpPr><a:xfrm><a:off x="0" y="0"/><a:ext cx="0" cy="0"/><a:chOff x="0" y="0"/><a:chExt cx="0" cy="0"/></a:xfrm></p:grpSpPr>"#;

const SLIDE_MASTER_XML: &str = concat!(
    r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>"#,
    r#"<p:sldMaster xmlns:a="http://schemas.openxmlformats.org/drawingml/2006/main" xmlns:r="http://schemas.openxmlformats.org/officeDocument/2006/relationships" xmlns:p="http://schemas.openxmlformats.org/presentationml/2006/main">"#,
    r#"<p:cSld><p:bg><p:bgRef idx="1001"><a:schemeClr val="bg1"/></p:bgRef></p:bg><p:spTree>"#,
    r#"<p:nvGrpSpPr><p:cNvPr id="1" name=""/><p:cNvGrpSpPr/><p:nvPr/></p:nvGrpSpPr><p:grpSpPr/>"#,
    r#"</p:spTree></p:cSld>"#,
    r#"<p:clrMap bg1="lt1" tx1="dk1" bg2="lt2" tx2="dk2" accent1="accent1" accent2="accent2" accent3="accent3" accent4="accent4" accent5="accent5" accent6="accent6" hlink="hlink" folHlink="folHlink"/>"#,
    r#"<p:sldLayoutIdLst><p:sldLayoutId id="2147483649" r:id="rId1"/></p:sldLayoutIdLst>"#,
    r#"<p:txStyles><p:titleStyle/><p:bodyStyle/><p:otherStyle/></p:txStyles>"#,
    r#"</p:sldMaster>"#,
);

const SLIDE_LAYOUT_XML: &str = concat!(
    r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>"#,
    r#"<p:sldLayout xmlns:a="http://schemas.openxmlformats.org/drawingml/2006/main" xmlns:r="http://schemas.openxmlformats.org/officeDocument/2006/relationships" xmlns:p="http://schemas.openxmlformats.org/presentationml/2006/main" type="blank" preserve="1">"#,
    r#"<p:cSld name="Blank"><p:spTree>"#,
    r#"<p:nvGrpSpPr><p:cNvPr id="1" name=""/><p:cNvGrpSpPr/><p:nvPr/></p:nvGrpSpPr><p:grpSpPr/>"#,
    r#"</p:spTree></p:cSld>"#,
    r#"<p:clrMapOvr><a:masterClrMapping/></p:clrMapOvr>"#,
    r#"</p:sldLayout>"#,
);

fn write_xfrm(xml: &mut String, (x, y, w, h): (i64, i64, i64, i64)) {
    write!(xml, r#"<a:xfrm><a:off x="{}" y="{}"/><a:ext cx="{}" cy="{}"/></a:xfrm>"#, x, y, w.max(0), h.max(0)).ok();
}

/// One `<a:p>` per line so that line breaks survive re-import.
fn write_text(xml: &mut String, id: u32, rect: (i64, i64, i64, i64), text: &TextSpec) {
    xml.push_str("<p:sp><p:nvSpPr>");
    write!(xml, r#"<p:cNvPr id="{}" name="TextBox {}"/>"#, id, id).ok();
    xml.push_str(r#"<p:cNvSpPr txBox="1"/><p:nvPr/></p:nvSpPr>"#);
    xml.push_str("<p:spPr>");
    write_xfrm(xml, rect);
    xml.push_str(r#"<a:prstGeom prst="rect"><a:avLst/></a:prstGeom><a:noFill/>"#);
    xml.push_str("</p:spPr>");

    xml.push_str(r#"<p:txBody><a:bodyPr wrap="square" rtlCol="0"/><a:lstStyle/>"#);

    let size = ((text.font_size * 100.0).round() as i64).clamp(100, 400_000);
    let algn = match text.align {
        TextAlign::Left => "l",
        TextAlign::Center => "ctr",
        TextAlign::Right => "r",
        TextAlign::Justify => "just",
    };

    for line in text.text.split('\n') {
        let line = line.strip_suffix('\r').unwrap_or(line);
        xml.push_str("<a:p>");
        write!(xml, r#"<a:pPr algn="{}"/>"#, algn).ok();
        if line.is_empty() {
            write!(xml, r#"<a:endParaRPr lang="en-US" sz="{}" dirty="0"/>"#, size).ok();
        } else {
            write!(xml, r#"<a:r><a:rPr lang="en-US" sz="{}""#, size).ok();
            if text.bold {
                xml.push_str(r#" b="1""#);
            }
            if text.italic {
                xml.push_str(r#" i="1""#);
            }
            if text.underline {
                xml.push_str(r#" u="sng""#);
            }
            xml.push_str(r#" dirty="0">"#);
            write!(xml, r#"<a:solidFill><a:srgbClr val="{}"/></a:solidFill>"#, text.color.hex()).ok();
            write!(xml, r#"<a:latin typeface="{}"/>"#, escape_xml(&text.font_family)).ok();
            xml.push_str("</a:rPr>");
            write!(xml, "<a:t>{}</a:t></a:r>", escape_xml(line)).ok();
        }
        xml.push_str("</a:p>");
    }

    xml.push_str("</p:txBody></p:sp>");
}

fn write_shape(xml: &mut String, id: u32, name: &str, preset: &str, rect: (i64, i64, i64, i64), shape: &ShapeSpec) {
    xml.push_str("<p:sp><p:nvSpPr>");
    write!(xml, r#"<p:cNvPr id="{}" name="{} {}"/>"#, id, name, id).ok();
    xml.push_str("<p:cNvSpPr/><p:nvPr/></p:nvSpPr>");
    xml.push_str("<p:spPr>");
    write_xfrm(xml, rect);
    write!(xml, r#"<a:prstGeom prst="{}"><a:avLst/></a:prstGeom>"#, preset).ok();
    write!(xml, r#"<a:solidFill><a:srgbClr val="{}"/></a:solidFill>"#, shape.fill.hex()).ok();
    if shape.stroke_width > 0.0 {
        write!(
            xml,
            r#"<a:ln w="{}"><a:solidFill><a:srgbClr val="{}"/></a:solidFill></a:ln>"#,
            to_native(shape.stroke_width),
            shape.stroke.hex()
        )
        .ok();
    } else {
        xml.push_str(r#"<a:ln w="0"><a:noFill/></a:ln>"#);
    }
    xml.push_str("</p:spPr></p:sp>");
}

fn write_picture(xml: &mut String, id: u32, rect: (i64, i64, i64, i64), rel_id: &str) {
    xml.push_str("<p:pic><p:nvPicPr>");
    write!(xml, r#"<p:cNvPr id="{}" name="Picture {}"/>"#, id, id).ok();
    xml.push_str(r#"<p:cNvPicPr><a:picLocks noChangeAspect="1"/></p:cNvPicPr><p:nvPr/></p:nvPicPr>"#);
    write!(xml, r#"<p:blipFill><a:blip r:embed="{}"/><a:stretch><a:fillRect/></a:stretch></p:blipFill>"#, rel_id).ok();
    xml.push_str("<p:spPr>");
    write_xfrm(xml, rect);
    xml.push_str(r#"<a:prstGeom prst="rect"><a:avLst/></a:prstGeom>"#);
    xml.push_str("</p:spPr></p:pic>");
}

fn relationships_xml(rels: &[(String, &str, String)]) -> String {
    let mut xml = String::with_capacity(256 + rels.len() * 160);
    xml.push_str(r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>"#);
    write!(xml, r#"<Relationships xmlns="{}">"#, PKG_RELS_NAMESPACE).ok();
    for (id, rel_type, target) in rels {
        write!(
            xml,
            r#"<Relationship Id="{}" Type="{}" Target="{}"/>"#,
            id,
            rel_type,
            escape_xml(target)
        )
        .ok();
    }
    xml.push_str("</Relationships>");
    xml
}

fn presentation_xml(slide_count: usize) -> String {
    let mut xml = String::with_capacity(1024 + slide_count * 48);
    xml.push_str(r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>"#);
    write!(xml, r#"<p:presentation xmlns:a="{}" xmlns:r="{}" xmlns:p="{}">"#, A_NAMESPACE, RELS_NAMESPACE, P_NAMESPACE).ok();
    xml.push_str(r#"<p:sldMasterIdLst><p:sldMasterId id="2147483648" r:id="rId1"/></p:sldMasterIdLst>"#);
    xml.push_str("<p:sldIdLst>");
    for n in 1..=slide_count {
        write!(xml, r#"<p:sldId id="{}" r:id="rId{}"/>"#, SLIDE_ID_BASE + n as u32 - 1, n + 2).ok();
    }
    xml.push_str("</p:sldIdLst>");
    write!(xml, r#"<p:sldSz cx="{}" cy="{}"/>"#, SLIDE_WIDTH_EMU, SLIDE_HEIGHT_EMU).ok();
    xml.push_str(r#"<p:notesSz cx="6858000" cy="9144000"/>"#);
    xml.push_str("</p:presentation>");
    xml
}

fn core_xml(author: &str) -> String {
    format!(
        concat!(
            r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>"#,
            r#"<cp:coreProperties xmlns:cp="http://schemas.openxmlformats.org/package/2006/metadata/core-properties" xmlns:dc="http://purl.org/dc/elements/1.1/" xmlns:dcterms="http://purl.org/dc/terms/" xmlns:xsi="http://www.w3.org/2001/XMLSchema-instance">"#,
            "<dc:title>Presentation</dc:title><dc:creator>{0}</dc:creator><cp:lastModifiedBy>{0}</cp:lastModifiedBy>",
            "</cp:coreProperties>"
        ),
        escape_xml(author)
    )
}

fn app_xml(slide_count: usize) -> String {
    format!(
        concat!(
            r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>"#,
            r#"<Properties xmlns="http://schemas.openxmlformats.org/officeDocument/2006/extended-properties">"#,
            "<Application>slidecodec</Application><Slides>{}</Slides>",
            "</Properties>"
        ),
        slide_count
    )
}

/// Picks the media extension and content type, trusting the bytes over the
/// declared mime type.
fn media_type(mime: &str, data: &[u8]) -> (String, String) {
    if let Ok(format) = image::guess_format(data) {
        if let Some(extension) = format.extensions_str().first() {
            let content_type = match *extension {
                "jpg" | "jpeg" => "image/jpeg",
                "tif" | "tiff" => "image/tiff",
                other => return (other.to_string(), format!("image/{}", other)),
            };
            return (extension.to_string(), content_type.to_string());
        }
    }

    let subtype = mime.rsplit('/').next().unwrap_or("");
    let subtype = subtype.split('+').next().unwrap_or("");
    let extension: String = subtype.chars().filter(|c| c.is_ascii_alphanumeric()).collect();
    if extension.is_empty() {
        ("bin".to_string(), "application/octet-stream".to_string())
    } else {
        (extension.to_ascii_lowercase(), mime.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const PNG_SIGNATURE: [u8; 8] = [0x89, b'P', b'N', b'G', 0x0D, 0x0A, 0x1A, 0x0A];

    #[test]
    fn test_media_type_sniffs_bytes() {
        assert_eq!(media_type("image/jpeg", &PNG_SIGNATURE), ("png".to_string(), "image/png".to_string()));
        assert_eq!(media_type("image/gif", b"not an image"), ("gif".to_string(), "image/gif".to_string()));
        assert_eq!(media_type("image/svg+xml", b"<svg/>"), ("svg".to_string(), "image/svg+xml".to_string()));
        assert_eq!(media_type("", b""), ("bin".to_string(), "application/octet-stream".to_string()));
    }

    #[test]
    fn test_text_paragraph_per_line() {
        let mut xml = String::new();
        let spec = TextSpec {
            text: "one\n\nthree & more".to_string(),
            font_size: 18.0,
            font_family: "Arial".to_string(),
            color: Color::parse("#336699").unwrap(),
            bold: true,
            italic: false,
            underline: true,
            align: TextAlign::Center,
        };
        write_text(&mut xml, 2, (0, 0, 10, 10), &spec);
        assert_eq!(xml.matches("<a:p>").count(), 3);
        assert!(xml.contains(r#"<a:rPr lang="en-US" sz="1800" b="1" u="sng" dirty="0">"#));
        assert!(xml.contains(r#"<a:pPr algn="ctr"/>"#));
        assert!(xml.contains("<a:t>three &amp; more</a:t>"));
        assert!(xml.contains(r#"<a:srgbClr val="336699"/>"#));
    }

    #[test]
    fn test_shape_without_outline() {
        let mut xml = String::new();
        let shape = ShapeSpec { fill: Color::white(), stroke: Color::black(), stroke_width: 0.0 };
        write_shape(&mut xml, 3, "Ellipse", "ellipse", (1, 2, 3, 4), &shape);
        assert!(xml.contains(r#"<a:prstGeom prst="ellipse">"#));
        assert!(xml.contains(r#"<a:ln w="0"><a:noFill/></a:ln>"#));
        assert!(xml.contains(r#"<a:off x="1" y="2"/><a:ext cx="3" cy="4"/>"#));
    }

    #[test]
    fn test_presentation_xml_lists_slides() {
        let xml = presentation_xml(2);
        assert!(xml.contains(r#"<p:sldId id="256" r:id="rId3"/>"#));
        assert!(xml.contains(r#"<p:sldId id="257" r:id="rId4"/>"#));
        assert!(xml.contains(r#"<p:sldSz cx="9144000" cy="5143500"/>"#));
    }
}
