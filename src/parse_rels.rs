use crate::constants::IMAGE_REL_TYPE;
use crate::types::Relationship;
use crate::Result;
use roxmltree::Document;

/// Parses relationship (`.rels`) XML data of a package part.
///
/// Relationship parts map resource IDs (`rId3`) to their targets. Entries
/// without an `Id` or `Target` are ignored.
///
/// # Errors
///
/// An error is returned if the data is not valid UTF-8 or not well-formed XML.
pub fn parse_rels(xml_data: &[u8]) -> Result<Vec<Relationship>> {
    let xml_str = std::str::from_utf8(xml_data)?;
    let doc = Document::parse(xml_str)?;
    let root = doc.root_element();

    let mut relationships = Vec::new();
    for rel in root.children().filter(|n| n.is_element() && n.tag_name().name() == "Relationship") {
        if let (Some(id), Some(target)) = (rel.attribute("Id"), rel.attribute("Target")) {
            relationships.push(Relationship {
                id: id.to_string(),
                rel_type: rel.attribute("Type").unwrap_or("").to_string(),
                target: target.to_string(),
            });
        }
    }

    Ok(relationships)
}

/// Parses a slide's relationship part and keeps only image relationships.
pub fn parse_slide_rels(xml_data: &[u8]) -> Result<Vec<Relationship>> {
    Ok(parse_rels(xml_data)?
        .into_iter()
        .filter(|rel| rel.rel_type == IMAGE_REL_TYPE)
        .collect())
}
