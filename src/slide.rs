use crate::types::{ParsedSlide, Relationship, ShapeKind, SlideElement};
use crate::{ImageObject, ImageSource, SceneObject, ShapeObject, Slide, TextBox};
use std::collections::HashMap;

/// Embedded pictures are always labelled PNG, whatever the media part holds.
/// Browsers sniff the actual bytes, so the label only has to be an image type.
pub const IMPORTED_IMAGE_MIME: &str = "image/png";

/// One slide part after XML parsing, together with the media it references.
#[derive(Debug)]
pub struct SlidePart {
    pub rel_path: String,
    pub slide_number: u32,
    pub parsed: ParsedSlide,
    pub images: Vec<Relationship>,
    image_data: HashMap<String, Vec<u8>>,
}

impl SlidePart {
    pub fn new(
        rel_path: String,
        slide_number: u32,
        parsed: ParsedSlide,
        images: Vec<Relationship>,
        image_data: HashMap<String, Vec<u8>>,
    ) -> Self {
        Self { rel_path, slide_number, parsed, images, image_data }
    }

    pub fn extract_slide_number(path: &str) -> Option<u32> {
        path
            .split('/')
            .last()
            .and_then(|filename| {
                filename
                    .strip_prefix("slide")
                    .and_then(|s| s.strip_suffix(".xml"))
            })
            .and_then(|num_str| num_str.parse::<u32>().ok())
    }

    /// Copies relationship targets onto the picture references of this slide.
    pub fn link_images(&mut self) {
        let id_to_target: HashMap<&str, &str> = self.images
            .iter()
            .map(|rel| (rel.id.as_str(), rel.target.as_str()))
            .collect();

        for element in &mut self.parsed.elements {
            if let SlideElement::Image(ref mut img_ref) = element {
                if let Some(target) = id_to_target.get(img_ref.id.as_str()) {
                    img_ref.target = target.to_string();
                }
            }
        }
    }

    /// Builds the scene slide. Pictures whose media could not be loaded are left out.
    pub fn into_scene_slide(self) -> Slide {
        let mut slide = Slide::blank();
        slide.background = self.parsed.background;

        for element in self.parsed.elements {
            let object = match element {
                SlideElement::Text(text) => SceneObject::TextBox(TextBox {
                    text: text.text,
                    geometry: text.geometry,
                    font_size: text.formatting.font_size,
                    font_family: text.formatting.font_family,
                    fill_color: text.fill_color,
                    bold: text.formatting.bold,
                    italic: text.formatting.italic,
                    underline: text.formatting.underlined,
                    align: text.formatting.align,
                }),
                SlideElement::Shape(shape) => {
                    let object = ShapeObject {
                        geometry: shape.geometry,
                        fill_color: shape.fill_color,
                        stroke_color: shape.stroke_color,
                        stroke_width: shape.stroke_width,
                    };
                    match shape.kind {
                        ShapeKind::Rectangle => SceneObject::Rectangle(object),
                        ShapeKind::Ellipse => SceneObject::Ellipse(object),
                    }
                },
                SlideElement::Image(image_ref) => match self.image_data.get(&image_ref.id) {
                    Some(data) => SceneObject::Image(ImageObject {
                        geometry: image_ref.geometry,
                        pixel_data: ImageSource::from_bytes(IMPORTED_IMAGE_MIME, data),
                    }),
                    None => {
                        if image_ref.target.is_empty() {
                            log::debug!(
                                "slide {}: picture {} has no image relationship, skipping",
                                self.slide_number, image_ref.id
                            );
                        } else {
                            log::debug!(
                                "slide {}: media {} for picture {} is missing, skipping",
                                self.slide_number, image_ref.target, image_ref.id
                            );
                        }
                        continue;
                    },
                },
            };
            slide.push_object(object);
        }

        slide
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{ImageReference, ShapeElement};
    use crate::{Color, Geometry};

    fn image_rel(id: &str, target: &str) -> Relationship {
        Relationship {
            id: id.to_string(),
            rel_type: crate::constants::IMAGE_REL_TYPE.to_string(),
            target: target.to_string(),
        }
    }

    fn picture(id: &str) -> SlideElement {
        SlideElement::Image(ImageReference {
            id: id.to_string(),
            target: String::new(),
            geometry: Geometry::new(0.0, 0.0, 10.0, 10.0),
        })
    }

    #[test]
    fn test_extract_slide_number() {
        assert_eq!(SlidePart::extract_slide_number("ppt/slides/slide12.xml"), Some(12));
        assert_eq!(SlidePart::extract_slide_number("ppt/slides/notes.xml"), None);
    }

    #[test]
    fn test_link_images() {
        let parsed = ParsedSlide { elements: vec![picture("rId2")], background: Color::white() };
        let mut part = SlidePart::new(
            "ppt/slides/slide1.xml".into(),
            1,
            parsed,
            vec![image_rel("rId2", "../media/image1.png")],
            HashMap::new(),
        );
        part.link_images();
        match &part.parsed.elements[0] {
            SlideElement::Image(image) => assert_eq!(image.target, "../media/image1.png"),
            other => panic!("expected image, got {:?}", other),
        }
    }

    #[test]
    fn test_unknown_embed_stays_unlinked() {
        let parsed = ParsedSlide { elements: vec![picture("rId9")], background: Color::white() };
        let mut part = SlidePart::new(
            "ppt/slides/slide3.xml".into(),
            3,
            parsed,
            vec![image_rel("rId2", "../media/image1.png")],
            HashMap::new(),
        );
        part.link_images();
        match &part.parsed.elements[0] {
            SlideElement::Image(image) => assert!(image.target.is_empty()),
            other => panic!("expected image, got {:?}", other),
        }
        assert!(part.into_scene_slide().objects.is_empty());
    }

    #[test]
    fn test_missing_media_is_skipped() {
        let parsed = ParsedSlide {
            elements: vec![
                SlideElement::Shape(ShapeElement {
                    kind: ShapeKind::Ellipse,
                    geometry: Geometry::new(1.0, 2.0, 3.0, 4.0),
                    fill_color: Color::white(),
                    stroke_color: Color::black(),
                    stroke_width: 1.0,
                }),
                picture("rId2"),
                picture("rId3"),
            ],
            background: Color::black(),
        };
        let mut image_data = HashMap::new();
        image_data.insert("rId3".to_string(), vec![0x89, b'P', b'N', b'G']);

        let slide = SlidePart::new("ppt/slides/slide1.xml".into(), 1, parsed, vec![], image_data)
            .into_scene_slide();

        assert_eq!(slide.objects.len(), 2);
        assert_eq!(slide.objects[0].kind(), "Ellipse");
        assert_eq!(slide.background, Color::black());
        match &slide.objects[1] {
            SceneObject::Image(image) => {
                assert_eq!(image.pixel_data.mime(), Some("image/png"));
                assert_eq!(image.pixel_data.decode().unwrap().1, vec![0x89, b'P', b'N', b'G']);
            },
            other => panic!("expected image, got {:?}", other),
        }
    }
}
