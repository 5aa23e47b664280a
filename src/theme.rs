use crate::constants::A_NAMESPACE;
use crate::{Color, Result};
use roxmltree::{Document, Node};
use serde::{Deserialize, Serialize};
use std::fmt::Write as FmtWrite;

/// Color slots of a theme's `<a:clrScheme>`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ThemePalette {
    pub dark1: Color,
    pub light1: Color,
    pub dark2: Color,
    pub light2: Color,
    pub accent1: Color,
    pub accent2: Color,
    pub accent3: Color,
    pub accent4: Color,
    pub accent5: Color,
    pub accent6: Color,
    pub hyperlink: Color,
    pub followed_hyperlink: Color,
}

/// Slot element names in schema order.
const SLOTS: [&str; 12] = [
    "dk1", "lt1", "dk2", "lt2", "accent1", "accent2", "accent3", "accent4", "accent5", "accent6",
    "hlink", "folHlink",
];

impl Default for ThemePalette {
    fn default() -> Self {
        ThemePalette {
            dark1: Color::black(),
            light1: Color::white(),
            dark2: Color::black(),
            light2: Color::white(),
            accent1: Color::black(),
            accent2: Color::black(),
            accent3: Color::black(),
            accent4: Color::black(),
            accent5: Color::black(),
            accent6: Color::black(),
            hyperlink: Color::black(),
            followed_hyperlink: Color::black(),
        }
    }
}

impl ThemePalette {
    /// Looks up a slot by its DrawingML name (`dk1`, `accent3`, `hlink`, ...).
    pub fn slot(&self, name: &str) -> Option<&Color> {
        Some(match name {
            "dk1" => &self.dark1,
            "lt1" => &self.light1,
            "dk2" => &self.dark2,
            "lt2" => &self.light2,
            "accent1" => &self.accent1,
            "accent2" => &self.accent2,
            "accent3" => &self.accent3,
            "accent4" => &self.accent4,
            "accent5" => &self.accent5,
            "accent6" => &self.accent6,
            "hlink" => &self.hyperlink,
            "folHlink" => &self.followed_hyperlink,
            _ => return None,
        })
    }

    fn slot_mut(&mut self, name: &str) -> Option<&mut Color> {
        Some(match name {
            "dk1" => &mut self.dark1,
            "lt1" => &mut self.light1,
            "dk2" => &mut self.dark2,
            "lt2" => &mut self.light2,
            "accent1" => &mut self.accent1,
            "accent2" => &mut self.accent2,
            "accent3" => &mut self.accent3,
            "accent4" => &mut self.accent4,
            "accent5" => &mut self.accent5,
            "accent6" => &mut self.accent6,
            "hlink" => &mut self.hyperlink,
            "folHlink" => &mut self.followed_hyperlink,
            _ => return None,
        })
    }

    /// Renders a minimal theme part carrying this palette.
    pub fn to_theme_xml(&self) -> String {
        let mut xml = String::with_capacity(2048);
        xml.push_str(r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>"#);
        write!(xml, r#"<a:theme xmlns:a="{}" name="Office Theme">"#, A_NAMESPACE).ok();
        xml.push_str("<a:themeElements>");
        xml.push_str(r#"<a:clrScheme name="Office">"#);
        for slot in SLOTS {
            if let Some(color) = self.slot(slot) {
                write!(xml, r#"<a:{slot}><a:srgbClr val="{}"/></a:{slot}>"#, color.hex()).ok();
            }
        }
        xml.push_str("</a:clrScheme>");
        xml.push_str(r#"<a:fontScheme name="Office">"#);
        xml.push_str(r#"<a:majorFont><a:latin typeface="Arial"/><a:ea typeface=""/><a:cs typeface=""/></a:majorFont>"#);
        xml.push_str(r#"<a:minorFont><a:latin typeface="Arial"/><a:ea typeface=""/><a:cs typeface=""/></a:minorFont>"#);
        xml.push_str("</a:fontScheme>");
        xml.push_str(r#"<a:fmtScheme name="Office">"#);
        xml.push_str("<a:fillStyleLst>");
        for _ in 0..3 {
            xml.push_str(r#"<a:solidFill><a:schemeClr val="phClr"/></a:solidFill>"#);
        }
        xml.push_str("</a:fillStyleLst>");
        xml.push_str("<a:lnStyleLst>");
        for w in [6350, 12700, 19050] {
            write!(xml, r#"<a:ln w="{}"><a:solidFill><a:schemeClr val="phClr"/></a:solidFill></a:ln>"#, w).ok();
        }
        xml.push_str("</a:lnStyleLst>");
        xml.push_str("<a:effectStyleLst>");
        for _ in 0..3 {
            xml.push_str("<a:effectStyle><a:effectLst/></a:effectStyle>");
        }
        xml.push_str("</a:effectStyleLst>");
        xml.push_str("<a:bgFillStyleLst>");
        for _ in 0..3 {
            xml.push_str(r#"<a:solidFill><a:schemeClr val="phClr"/></a:solidFill>"#);
        }
        xml.push_str("</a:bgFillStyleLst>");
        xml.push_str("</a:fmtScheme>");
        xml.push_str("</a:themeElements>");
        xml.push_str("</a:theme>");
        xml
    }
}

/// Extracts the color palette from a theme part.
///
/// Only malformed XML is an error. Missing or unreadable slots fall back to
/// black for dark and accent slots and white for light slots.
pub fn resolve_theme(xml: &str) -> Result<ThemePalette> {
    let doc = Document::parse(xml)?;
    let mut palette = ThemePalette::default();

    let Some(scheme) = doc
        .descendants()
        .find(|n| is_a(n, "clrScheme"))
    else {
        log::debug!("theme has no <a:clrScheme>, using default palette");
        return Ok(palette);
    };

    for slot in SLOTS {
        let value = scheme
            .children()
            .find(|n| is_a(n, slot))
            .and_then(|n| n.children().find(|c| c.is_element()))
            .and_then(|spec| match spec.tag_name().name() {
                "srgbClr" => spec.attribute("val"),
                "sysClr" => spec.attribute("lastClr"),
                _ => None,
            });

        if let (Some(raw), Some(target)) = (value, palette.slot_mut(slot)) {
            *target = resolve_color_value(raw);
        }
    }

    Ok(palette)
}

/// Normalizes a raw color attribute into `#RRGGBB`.
///
/// Eight-digit ARGB values keep their last six digits and three-digit
/// shorthand (`F00`) is expanded. Anything else resolves to black.
pub fn resolve_color_value(raw: &str) -> Color {
    let trimmed = raw.trim();
    let hex = trimmed.strip_prefix('#').unwrap_or(trimmed);
    let candidate = match hex.len() {
        8 if hex.is_ascii() => hex[2..].to_string(),
        3 => hex.chars().flat_map(|c| [c, c]).collect(),
        _ => hex.to_string(),
    };

    Color::parse(&candidate).unwrap_or_else(|| {
        log::debug!("unresolvable color value {:?}, using black", raw);
        Color::black()
    })
}

fn is_a(node: &Node, name: &str) -> bool {
    node.is_element()
        && node.tag_name().name() == name
        && node.tag_name().namespace() == Some(A_NAMESPACE)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn theme_xml(scheme: &str) -> String {
        format!(
            r#"<a:theme xmlns:a="{}"><a:themeElements><a:clrScheme name="Test">{}</a:clrScheme></a:themeElements></a:theme>"#,
            A_NAMESPACE, scheme
        )
    }

    #[test]
    fn test_resolve_theme_reads_slots() {
        let xml = theme_xml(
            r#"<a:dk1><a:sysClr val="windowText" lastClr="000000"/></a:dk1>
               <a:lt1><a:sysClr val="window" lastClr="FFFFFF"/></a:lt1>
               <a:accent1><a:srgbClr val="4472C4"/></a:accent1>"#,
        );
        let palette = resolve_theme(&xml).unwrap();
        assert_eq!(palette.dark1.as_str(), "#000000");
        assert_eq!(palette.light1.as_str(), "#FFFFFF");
        assert_eq!(palette.accent1.as_str(), "#4472C4");
        assert_eq!(palette.slot("accent1"), Some(&palette.accent1));
    }

    #[test]
    fn test_missing_slots_use_defaults() {
        let palette = resolve_theme(&theme_xml("")).unwrap();
        assert_eq!(palette.dark1.as_str(), "#000000");
        assert_eq!(palette.light1.as_str(), "#ffffff");
        assert_eq!(palette.light2.as_str(), "#ffffff");
        assert_eq!(palette.accent6.as_str(), "#000000");
        assert_eq!(palette, ThemePalette::default());
    }

    #[test]
    fn test_malformed_slot_fails_soft() {
        let xml = theme_xml(r#"<a:accent2><a:srgbClr val="nope"/></a:accent2>"#);
        let palette = resolve_theme(&xml).unwrap();
        assert_eq!(palette.accent2.as_str(), "#000000");
    }

    #[test]
    fn test_resolve_color_value() {
        assert_eq!(resolve_color_value("FF0000").as_str(), "#FF0000");
        assert_eq!(resolve_color_value("#00ff00").as_str(), "#00ff00");
        assert_eq!(resolve_color_value("FF112233").as_str(), "#112233");
        assert_eq!(resolve_color_value("F00").as_str(), "#FF0000");
        assert_eq!(resolve_color_value("#abc").as_str(), "#aabbcc");
        assert_eq!(resolve_color_value("xyz").as_str(), "#000000");
        assert_eq!(resolve_color_value("abcd").as_str(), "#000000");
        assert_eq!(resolve_color_value("").as_str(), "#000000");
    }

    #[test]
    fn test_malformed_xml_is_an_error() {
        assert!(resolve_theme("<a:theme").is_err());
    }

    #[test]
    fn test_theme_xml_round_trip() {
        let mut palette = ThemePalette::default();
        palette.accent3 = Color::parse("#123456").unwrap();
        let resolved = resolve_theme(&palette.to_theme_xml()).unwrap();
        assert_eq!(resolved.accent3.as_str(), "#123456");
        assert_eq!(resolved.light1.as_str(), "#ffffff");
    }
}
