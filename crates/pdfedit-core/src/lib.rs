//! PDF edit and compose engine
//!
//! Stateless building blocks for client-side PDF editing, all on top of lopdf:
//! - `coords`: canonical <-> display rotation math
//! - `runs` / `fonts`: rich-text markup to formatted runs, and the 12 bakeable font variants
//! - `model`: text annotations, text patches, images and page rotations per document
//! - `overlay`: display-space boxes for the editing surface
//! - `compose`: bake all of the above into new PDF bytes
//! - `merge` / `split`: page-level document reorganization

pub mod compose;
pub mod config;
pub mod coords;
pub mod error;
pub mod fonts;
pub mod images;
pub mod layout;
pub mod merge;
pub mod model;
pub mod overlay;
pub mod page;
pub mod runs;
pub mod split;

pub use compose::{composite, composite_set};
pub use config::ComposeConfig;
pub use coords::{to_canonical, to_display, Rect, Rotation};
pub use error::{PdfEditError, Result};
pub use fonts::{FontFamily, FontVariant};
pub use merge::merge_into;
pub use model::{
    AnnotationSet, EntityId, ImageAnnotation, PageRotations, TextAnnotation, TextAlign, TextPatch,
    TextStyle,
};
pub use overlay::{project_page, OverlayItem, OverlayKind};
pub use page::PageGeometry;
pub use runs::{plain_text, resolve_runs, runs_to_markup, toggle_format, Format, Run};
pub use split::split_by_page;

/// Parse PDF bytes and return page count
pub fn get_page_count(bytes: &[u8]) -> Result<u32> {
    let doc =
        lopdf::Document::load_mem(bytes).map_err(|e| PdfEditError::ParseError(e.to_string()))?;
    Ok(doc.get_pages().len() as u32)
}

/// Size and stored rotation of every page, in page order
pub fn page_geometries(bytes: &[u8]) -> Result<Vec<PageGeometry>> {
    let doc =
        lopdf::Document::load_mem(bytes).map_err(|e| PdfEditError::ParseError(e.to_string()))?;
    Ok(doc
        .get_pages()
        .values()
        .map(|&page_id| page::page_geometry(&doc, page_id))
        .collect())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_page_count_of_garbage_fails() {
        assert!(matches!(
            get_page_count(b"definitely not a pdf"),
            Err(PdfEditError::ParseError(_))
        ));
    }

    #[test]
    fn test_annotation_set_deserializes_from_json() {
        let json = r##"{
            "next_id": 1,
            "annotations": [{
                "id": 1, "page": 1, "x": 0.1, "y": 0.2, "text": "hi",
                "style": {"bold": true, "font_family": "serif", "text_align": "center"}
            }],
            "patches": [],
            "images": []
        }"##;
        let set = AnnotationSet::from_json(json).unwrap();
        let annotation = &set.annotations()[0];
        assert!(annotation.style.bold);
        assert_eq!(annotation.style.font_family, FontFamily::Serif);
        assert_eq!(annotation.style.text_align, TextAlign::Center);
        assert_eq!(annotation.style.font_size, 12.0);
        assert_eq!(annotation.style.font_variant(), FontVariant::TimesBold);
    }
}
