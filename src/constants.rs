pub const P_NAMESPACE: &str = "http://schemas.openxmlformats.org/presentationml/2006/main";
pub const A_NAMESPACE: &str = "http://schemas.openxmlformats.org/drawingml/2006/main";
pub const RELS_NAMESPACE: &str = "http://schemas.openxmlformats.org/officeDocument/2006/relationships";
pub const PKG_RELS_NAMESPACE: &str = "http://schemas.openxmlformats.org/package/2006/relationships";
pub const CONTENT_TYPES_NAMESPACE: &str = "http://schemas.openxmlformats.org/package/2006/content-types";

pub const IMAGE_REL_TYPE: &str = "http://schemas.openxmlformats.org/officeDocument/2006/relationships/image";
pub const SLIDE_REL_TYPE: &str = "http://schemas.openxmlformats.org/officeDocument/2006/relationships/slide";
pub const SLIDE_LAYOUT_REL_TYPE: &str = "http://schemas.openxmlformats.org/officeDocument/2006/relationships/slideLayout";
pub const SLIDE_MASTER_REL_TYPE: &str = "http://schemas.openxmlformats.org/officeDocument/2006/relationships/slideMaster";
pub const THEME_REL_TYPE: &str = "http://schemas.openxmlformats.org/officeDocument/2006/relationships/theme";
pub const OFFICE_DOCUMENT_REL_TYPE: &str = "http://schemas.openxmlformats.org/officeDocument/2006/relationships/officeDocument";
pub const CORE_PROPS_REL_TYPE: &str = "http://schemas.openxmlformats.org/package/2006/relationships/metadata/core-properties";
pub const EXTENDED_PROPS_REL_TYPE: &str = "http://schemas.openxmlformats.org/officeDocument/2006/relationships/extended-properties";

pub const SLIDES_PREFIX: &str = "ppt/slides/slide";
pub const THEME_PREFIX: &str = "ppt/theme/theme";

pub const PPTX_CONTENT_TYPE: &str = "application/vnd.openxmlformats-officedocument.presentationml.presentation";
pub const PDF_CONTENT_TYPE: &str = "application/pdf";
