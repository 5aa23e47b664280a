use crate::constants::{A_NAMESPACE, P_NAMESPACE, RELS_NAMESPACE};
use crate::parser_config::ParserConfig;
use crate::types::{
    Formatting, ImageReference, ParsedSlide, ShapeElement, ShapeKind, SlideElement, TextElement,
};
use crate::units::to_pixels;
use crate::{Color, Geometry, Result, TextAlign};
use roxmltree::{Document, Node};

/// Native-unit fallbacks for a missing or unparseable `<a:off>`/`<a:ext>` axis.
#[derive(Debug, Clone, Copy)]
struct GeometryDefaults {
    x: i64,
    y: i64,
    cx: i64,
    cy: i64,
}

const TEXT_DEFAULTS: GeometryDefaults = GeometryDefaults { x: 100, y: 100, cx: 200, cy: 50 };
const SHAPE_DEFAULTS: GeometryDefaults = GeometryDefaults { x: 100, y: 100, cx: 200, cy: 100 };
const PICTURE_DEFAULTS: GeometryDefaults = GeometryDefaults { x: 100, y: 100, cx: 200, cy: 200 };

/// Parses raw XML slide data from a pptx file and extracts its shapes and pictures.
///
/// Shapes (`<p:sp>`) are returned first in document order, followed by all
/// pictures (`<p:pic>`) in document order. A picture therefore never ends up
/// behind a shape, even if the source stacks it that way.
///
/// Malformed values inside a shape never fail the slide: geometry, colors and
/// styling fall back to defaults individually.
///
/// # Errors
///
/// Parsing fails only if the data is not valid UTF-8 or not well-formed XML.
pub fn parse_slide_xml(xml_data: &[u8], config: &ParserConfig) -> Result<ParsedSlide> {
    let xml_str = std::str::from_utf8(xml_data)?;
    let doc = Document::parse(xml_str)?;
    let root = doc.root_element();

    let mut elements: Vec<SlideElement> = root
        .descendants()
        .filter(|n| is_p(n, "sp"))
        .map(|sp| parse_sp(&sp, config))
        .collect();

    if config.extract_images {
        elements.extend(
            root.descendants()
                .filter(|n| is_p(n, "pic"))
                .filter_map(|pic| parse_pic(&pic))
                .map(SlideElement::Image),
        );
    }

    Ok(ParsedSlide {
        elements,
        background: parse_background(&root),
    })
}

/// Decides between a text box and a plain shape based on the presence of `<p:txBody>`.
fn parse_sp(sp_node: &Node, config: &ParserConfig) -> SlideElement {
    let sp_pr = p_child(sp_node, "spPr");

    match p_child(sp_node, "txBody") {
        Some(tx_body) => SlideElement::Text(parse_text(sp_pr, &tx_body)),
        None => SlideElement::Shape(parse_shape(sp_pr, config)),
    }
}

/// Joins the runs of every paragraph (`<a:p>`) with one newline per paragraph.
fn parse_text(sp_pr: Option<Node>, tx_body: &Node) -> TextElement {
    let mut text = String::new();
    let mut first_run: Option<Node> = None;

    for p_node in tx_body.children().filter(|n| is_a(n, "p")) {
        for r_node in p_node.children().filter(|n| is_a(n, "r")) {
            first_run.get_or_insert(r_node);
            if let Some(t) = a_child(&r_node, "t").and_then(|t| t.text()) {
                text.push_str(t);
            }
        }
        text.push('\n');
    }
    text.truncate(text.trim_end().len());

    let r_pr = first_run.and_then(|r| a_child(&r, "rPr"));
    let mut formatting = r_pr.map(|r| parse_run_properties(&r)).unwrap_or_default();
    formatting.align = tx_body
        .children()
        .find(|n| is_a(n, "p"))
        .and_then(|p| a_child(&p, "pPr"))
        .and_then(|p_pr| p_pr.attribute("algn"))
        .map(parse_align)
        .unwrap_or_default();

    // Shape fill wins; runs only carry the color when the shape declares none.
    let fill_color = match sp_pr.and_then(|n| a_child(&n, "solidFill")) {
        Some(fill) => solid_fill_color(&fill).unwrap_or_else(|| default_color("text fill", Color::black())),
        None => r_pr
            .and_then(|r| a_child(&r, "solidFill"))
            .and_then(|fill| solid_fill_color(&fill))
            .unwrap_or_else(Color::black),
    };

    TextElement {
        text,
        geometry: parse_geometry(sp_pr, TEXT_DEFAULTS),
        fill_color,
        formatting,
    }
}

/// Extracts _bold_, _italic_, _underlined_, the size and the latin typeface of a run (`<a:rPr>`).
fn parse_run_properties(r_pr: &Node) -> Formatting {
    let mut formatting = Formatting::default();

    if let Some(b_attr) = r_pr.attribute("b") {
        formatting.bold = b_attr == "1" || b_attr.eq_ignore_ascii_case("true");
    }
    if let Some(i_attr) = r_pr.attribute("i") {
        formatting.italic = i_attr == "1" || i_attr.eq_ignore_ascii_case("true");
    }
    if let Some(u_attr) = r_pr.attribute("u") {
        formatting.underlined = u_attr != "none";
    }
    if let Some(sz_attr) = r_pr.attribute("sz") {
        match sz_attr.parse::<u32>() {
            Ok(sz) if sz > 0 => formatting.font_size = sz as f64 / 100.0,
            _ => log::debug!("unparseable font size {:?}, using default", sz_attr),
        }
    }
    if let Some(typeface) = a_child(r_pr, "latin").and_then(|n| n.attribute("typeface")) {
        if !typeface.is_empty() {
            formatting.font_family = typeface.to_string();
        }
    }

    formatting
}

fn parse_align(algn: &str) -> TextAlign {
    match algn {
        "ctr" => TextAlign::Center,
        "r" => TextAlign::Right,
        "just" | "dist" => TextAlign::Justify,
        _ => TextAlign::Left,
    }
}

fn parse_shape(sp_pr: Option<Node>, config: &ParserConfig) -> ShapeElement {
    let is_ellipse = sp_pr
        .and_then(|n| a_child(&n, "prstGeom"))
        .and_then(|n| n.attribute("prst"))
        == Some("ellipse");
    let kind = if config.detect_ellipses && is_ellipse {
        ShapeKind::Ellipse
    } else {
        ShapeKind::Rectangle
    };

    let fill_color = match sp_pr.and_then(|n| a_child(&n, "solidFill")) {
        Some(fill) => solid_fill_color(&fill).unwrap_or_else(|| default_color("shape fill", Color::white())),
        None => Color::white(),
    };

    let line = sp_pr.and_then(|n| a_child(&n, "ln"));
    let stroke_color = match line.and_then(|ln| a_child(&ln, "solidFill")) {
        Some(fill) => solid_fill_color(&fill).unwrap_or_else(|| default_color("stroke", Color::black())),
        None => Color::black(),
    };
    let stroke_width = line
        .and_then(|ln| ln.attribute("w"))
        .and_then(|w| w.parse::<i64>().ok())
        .map(to_pixels)
        .unwrap_or(1.0);

    ShapeElement {
        kind,
        geometry: parse_geometry(sp_pr, SHAPE_DEFAULTS),
        fill_color,
        stroke_color,
        stroke_width,
    }
}

/// Parses a picture node (`<p:pic>`) into a reference to its embedded media.
///
/// Pictures without a `<a:blip r:embed>` have nothing to link and are dropped.
fn parse_pic(pic_node: &Node) -> Option<ImageReference> {
    let embed = pic_node
        .descendants()
        .find(|n| is_a(n, "blip"))
        .and_then(|blip| blip.attribute((RELS_NAMESPACE, "embed")));

    let Some(embed) = embed else {
        log::debug!("picture without an embedded blip, skipping");
        return None;
    };

    Some(ImageReference {
        id: embed.to_string(),
        target: String::new(),
        geometry: parse_geometry(p_child(pic_node, "spPr"), PICTURE_DEFAULTS),
    })
}

/// Reads `<a:xfrm>` offset and extent, converting each axis to pixels.
fn parse_geometry(sp_pr: Option<Node>, defaults: GeometryDefaults) -> Geometry {
    let xfrm = sp_pr.and_then(|n| a_child(&n, "xfrm"));
    let off = xfrm.and_then(|n| a_child(&n, "off"));
    let ext = xfrm.and_then(|n| a_child(&n, "ext"));

    Geometry::new(
        to_pixels(native_attr(off, "x", defaults.x)),
        to_pixels(native_attr(off, "y", defaults.y)),
        to_pixels(native_attr(ext, "cx", defaults.cx)),
        to_pixels(native_attr(ext, "cy", defaults.cy)),
    )
}

fn native_attr(node: Option<Node>, name: &str, default: i64) -> i64 {
    match node.and_then(|n| n.attribute(name)).map(|v| v.trim().parse::<i64>()) {
        Some(Ok(value)) => value,
        _ => {
            log::debug!("missing or invalid {} in <a:xfrm>, using {}", name, default);
            default
        },
    }
}

/// Resolves a `<a:solidFill>` whose child is a direct `<a:srgbClr>`.
///
/// Scheme references, preset and system colors are not resolved here.
fn solid_fill_color(solid_fill: &Node) -> Option<Color> {
    let spec = solid_fill.children().find(|n| n.is_element())?;
    if !is_a(&spec, "srgbClr") {
        return None;
    }
    spec.attribute("val").and_then(Color::parse)
}

fn default_color(what: &str, color: Color) -> Color {
    log::debug!("unsupported {} color spec, using {}", what, color);
    color
}

/// Reads a solid `<p:bg>` fill, defaulting to white.
fn parse_background(root: &Node) -> Color {
    root.descendants()
        .find(|n| is_p(n, "bgPr"))
        .and_then(|bg_pr| a_child(&bg_pr, "solidFill"))
        .and_then(|fill| solid_fill_color(&fill))
        .unwrap_or_else(Color::white)
}

fn is_p(node: &Node, name: &str) -> bool {
    node.is_element() && node.tag_name().name() == name && node.tag_name().namespace() == Some(P_NAMESPACE)
}

fn is_a(node: &Node, name: &str) -> bool {
    node.is_element() && node.tag_name().name() == name && node.tag_name().namespace() == Some(A_NAMESPACE)
}

fn p_child<'a, 'input>(node: &Node<'a, 'input>, name: &str) -> Option<Node<'a, 'input>> {
    node.children().find(|n| is_p(n, name))
}

fn a_child<'a, 'input>(node: &Node<'a, 'input>, name: &str) -> Option<Node<'a, 'input>> {
    node.children().find(|n| is_a(n, name))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn slide_xml(tree: &str) -> Vec<u8> {
        format!(
            r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>
<p:sld xmlns:a="{A_NAMESPACE}" xmlns:r="{RELS_NAMESPACE}" xmlns:p="{P_NAMESPACE}">
  <p:cSld><p:spTree>{tree}</p:spTree></p:cSld>
</p:sld>"#
        )
        .into_bytes()
    }

    fn parse(tree: &str) -> Vec<SlideElement> {
        parse_slide_xml(&slide_xml(tree), &ParserConfig::default()).unwrap().elements
    }

    fn text(element: &SlideElement) -> &TextElement {
        match element {
            SlideElement::Text(text) => text,
            other => panic!("expected text, got {:?}", other),
        }
    }

    fn shape(element: &SlideElement) -> &ShapeElement {
        match element {
            SlideElement::Shape(shape) => shape,
            other => panic!("expected shape, got {:?}", other),
        }
    }

    #[test]
    fn test_text_geometry_in_pixels() {
        let elements = parse(
            r#"<p:sp><p:spPr><a:xfrm><a:off x="914400" y="914400"/><a:ext cx="1828800" cy="914400"/></a:xfrm></p:spPr>
               <p:txBody><a:p><a:r><a:t>Hi</a:t></a:r></a:p></p:txBody></p:sp>"#,
        );
        assert_eq!(text(&elements[0]).geometry, Geometry::new(96.0, 96.0, 192.0, 96.0));
    }

    #[test]
    fn test_text_joins_runs_and_paragraphs() {
        let elements = parse(
            r#"<p:sp><p:txBody>
                 <a:p><a:r><a:t>Hello </a:t></a:r><a:r><a:t>world</a:t></a:r></a:p>
                 <a:p><a:r><a:t>second</a:t></a:r></a:p>
                 <a:p/>
               </p:txBody></p:sp>"#,
        );
        assert_eq!(text(&elements[0]).text, "Hello world\nsecond");
    }

    #[test]
    fn test_missing_geometry_uses_native_defaults() {
        let elements = parse(r#"<p:sp><p:txBody><a:p/></p:txBody></p:sp><p:sp><p:spPr/></p:sp>"#);
        assert_eq!(
            text(&elements[0]).geometry,
            Geometry::new(to_pixels(100), to_pixels(100), to_pixels(200), to_pixels(50))
        );
        assert_eq!(
            shape(&elements[1]).geometry,
            Geometry::new(to_pixels(100), to_pixels(100), to_pixels(200), to_pixels(100))
        );
    }

    #[test]
    fn test_fallback_geometry_is_stable() {
        let tree = r#"<p:sp><p:spPr><a:xfrm><a:ext cx="19050" cy="9525"/></a:xfrm></p:spPr></p:sp>
                      <p:sp><p:spPr><a:xfrm><a:ext cx="19050"/></a:xfrm></p:spPr><p:txBody><a:p/></p:txBody></p:sp>"#;
        let first = parse(tree);
        let second = parse(tree);
        assert_eq!(first, second);
        assert_eq!(
            shape(&first[0]).geometry,
            Geometry::new(to_pixels(100), to_pixels(100), 2.0, 1.0)
        );
        assert_eq!(
            text(&first[1]).geometry,
            Geometry::new(to_pixels(100), to_pixels(100), 2.0, to_pixels(50))
        );
    }

    #[test]
    fn test_unparseable_axis_defaults_individually() {
        let elements = parse(
            r#"<p:sp><p:spPr><a:xfrm><a:off x="abc" y="9525"/><a:ext cx="19050" cy="1.5"/></a:xfrm></p:spPr></p:sp>"#,
        );
        assert_eq!(
            shape(&elements[0]).geometry,
            Geometry::new(to_pixels(100), 1.0, 2.0, to_pixels(100))
        );
    }

    #[test]
    fn test_text_styling() {
        let elements = parse(
            r#"<p:sp><p:txBody>
                 <a:p><a:pPr algn="ctr"/><a:r><a:rPr b="1" i="true" u="sng" sz="2400"><a:solidFill><a:srgbClr val="00FF00"/></a:solidFill><a:latin typeface="Georgia"/></a:rPr><a:t>Styled</a:t></a:r></a:p>
               </p:txBody></p:sp>"#,
        );
        let element = text(&elements[0]);
        assert!(element.formatting.bold);
        assert!(element.formatting.italic);
        assert!(element.formatting.underlined);
        assert_eq!(element.formatting.font_size, 24.0);
        assert_eq!(element.formatting.font_family, "Georgia");
        assert_eq!(element.formatting.align, TextAlign::Center);
        assert_eq!(element.fill_color.as_str(), "#00FF00");
    }

    #[test]
    fn test_text_defaults_without_run_properties() {
        let elements = parse(r#"<p:sp><p:txBody><a:p><a:r><a:t>x</a:t></a:r></a:p></p:txBody></p:sp>"#);
        let element = text(&elements[0]);
        assert_eq!(element.formatting, Formatting::default());
        assert_eq!(element.fill_color.as_str(), "#000000");
    }

    #[test]
    fn test_shape_colors() {
        let elements = parse(
            r#"<p:sp><p:spPr>
                 <a:solidFill><a:srgbClr val="FF0000"/></a:solidFill>
                 <a:ln w="28575"><a:solidFill><a:srgbClr val="0000FF"/></a:solidFill></a:ln>
               </p:spPr></p:sp>"#,
        );
        let element = shape(&elements[0]);
        assert_eq!(element.fill_color.as_str(), "#FF0000");
        assert_eq!(element.stroke_color.as_str(), "#0000FF");
        assert_eq!(element.stroke_width, 3.0);
    }

    #[test]
    fn test_unsupported_fills_fall_back() {
        let elements = parse(
            r#"<p:sp><p:spPr><a:solidFill><a:schemeClr val="accent1"/></a:solidFill></p:spPr></p:sp>
               <p:sp><p:spPr><a:gradFill><a:gsLst/></a:gradFill><a:ln><a:solidFill><a:schemeClr val="tx1"/></a:solidFill></a:ln></p:spPr></p:sp>
               <p:sp><p:spPr><a:solidFill><a:schemeClr val="accent1"/></a:solidFill></p:spPr><p:txBody><a:p/></p:txBody></p:sp>"#,
        );
        assert_eq!(shape(&elements[0]).fill_color.as_str(), "#ffffff");
        assert_eq!(shape(&elements[1]).fill_color.as_str(), "#ffffff");
        assert_eq!(shape(&elements[1]).stroke_color.as_str(), "#000000");
        assert_eq!(text(&elements[2]).fill_color.as_str(), "#000000");
    }

    #[test]
    fn test_ellipse_detection_is_opt_in() {
        let tree = r#"<p:sp><p:spPr><a:prstGeom prst="ellipse"><a:avLst/></a:prstGeom></p:spPr></p:sp>"#;
        assert_eq!(shape(&parse(tree)[0]).kind, ShapeKind::Rectangle);

        let config = ParserConfig::builder().detect_ellipses(true).build();
        let parsed = parse_slide_xml(&slide_xml(tree), &config).unwrap();
        assert_eq!(shape(&parsed.elements[0]).kind, ShapeKind::Ellipse);
    }

    #[test]
    fn test_pictures_follow_shapes() {
        let elements = parse(
            r#"<p:pic><p:blipFill><a:blip r:embed="rId2"/></p:blipFill>
                 <p:spPr><a:xfrm><a:off x="0" y="0"/><a:ext cx="95250" cy="95250"/></a:xfrm></p:spPr></p:pic>
               <p:sp><p:spPr/></p:sp>
               <p:pic><p:blipFill><a:blip/></p:blipFill></p:pic>"#,
        );
        assert_eq!(elements.len(), 2);
        assert!(matches!(elements[0], SlideElement::Shape(_)));
        match &elements[1] {
            SlideElement::Image(image) => {
                assert_eq!(image.id, "rId2");
                assert_eq!(image.geometry, Geometry::new(0.0, 0.0, 10.0, 10.0));
            },
            other => panic!("expected image, got {:?}", other),
        }
    }

    #[test]
    fn test_pictures_skipped_when_extraction_disabled() {
        let tree = r#"<p:pic><p:blipFill><a:blip r:embed="rId2"/></p:blipFill></p:pic>"#;
        let config = ParserConfig::builder().extract_images(false).build();
        assert!(parse_slide_xml(&slide_xml(tree), &config).unwrap().elements.is_empty());
    }

    #[test]
    fn test_group_shapes_are_flattened() {
        let elements = parse(
            r#"<p:grpSp><p:grpSpPr/><p:sp><p:spPr/></p:sp><p:sp><p:spPr/></p:sp></p:grpSp>"#,
        );
        assert_eq!(elements.len(), 2);
    }

    #[test]
    fn test_background() {
        let xml = format!(
            r#"<p:sld xmlns:a="{A_NAMESPACE}" xmlns:p="{P_NAMESPACE}"><p:cSld>
                 <p:bg><p:bgPr><a:solidFill><a:srgbClr val="112233"/></a:solidFill><a:effectLst/></p:bgPr></p:bg>
                 <p:spTree/></p:cSld></p:sld>"#
        );
        let parsed = parse_slide_xml(xml.as_bytes(), &ParserConfig::default()).unwrap();
        assert_eq!(parsed.background.as_str(), "#112233");
        assert!(parsed.elements.is_empty());
    }

    #[test]
    fn test_malformed_xml_is_an_error() {
        assert!(parse_slide_xml(b"<p:sld", &ParserConfig::default()).is_err());
    }
}
