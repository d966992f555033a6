//! Page dictionary helpers: inherited attributes, resources, content streams

use crate::coords::{normalize_degrees, Rect};
use crate::error::{PdfEditError, Result};
use lopdf::{Dictionary, Document, Object, ObjectId, Stream};

/// Attributes a page may inherit from its ancestors in the page tree
const INHERITABLE: &[&[u8]] = &[b"MediaBox", b"Resources", b"Rotate", b"CropBox"];

/// Guard against cyclic Parent chains
const MAX_TREE_DEPTH: usize = 32;

/// Letter, used when no MediaBox is found anywhere in the chain
const DEFAULT_MEDIA_BOX: [f64; 4] = [0.0, 0.0, 612.0, 792.0];

/// Size, origin and stored rotation of a page in PDF points
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PageGeometry {
    pub media_box: [f64; 4],
    /// Degrees, normalized to `0..360`
    pub rotate: i64,
}

impl PageGeometry {
    pub fn width(&self) -> f64 {
        (self.media_box[2] - self.media_box[0]).abs()
    }

    pub fn height(&self) -> f64 {
        (self.media_box[3] - self.media_box[1]).abs()
    }

    fn origin(&self) -> (f64, f64) {
        (
            self.media_box[0].min(self.media_box[2]),
            self.media_box[1].min(self.media_box[3]),
        )
    }

    /// Canonical rect -> PDF user space rect (x, y of the bottom-left corner)
    pub fn to_points(&self, rect: &Rect) -> Rect {
        let (ox, oy) = self.origin();
        let (w, h) = (self.width(), self.height());
        Rect::new(
            ox + rect.x * w,
            oy + h - rect.y * h - rect.height * h,
            rect.width * w,
            rect.height * h,
        )
    }

    /// PDF user space rect -> canonical rect; inverse of [`PageGeometry::to_points`]
    pub fn to_canonical(&self, rect: &Rect) -> Rect {
        let (ox, oy) = self.origin();
        let (w, h) = (self.width().max(f64::EPSILON), self.height().max(f64::EPSILON));
        Rect::new(
            (rect.x - ox) / w,
            (oy + h - rect.y - rect.height) / h,
            rect.width / w,
            rect.height / h,
        )
    }
}

fn obj_to_f64(obj: &Object) -> Option<f64> {
    match obj {
        Object::Integer(i) => Some(*i as f64),
        Object::Real(f) => Some((*f).into()),
        _ => None,
    }
}

fn resolve<'a>(doc: &'a Document, obj: &'a Object) -> Option<&'a Object> {
    match obj {
        Object::Reference(id) => doc.get_object(*id).ok(),
        other => Some(other),
    }
}

/// Look up `key` on the page, walking up through Parent nodes
pub fn inherited<'a>(doc: &'a Document, page_id: ObjectId, key: &[u8]) -> Option<&'a Object> {
    let mut current = Some(page_id);
    let mut depth = 0;
    while let Some(id) = current {
        if depth > MAX_TREE_DEPTH {
            return None;
        }
        let dict = doc.get_dictionary(id).ok()?;
        if let Ok(value) = dict.get(key) {
            return resolve(doc, value);
        }
        current = dict.get(b"Parent").and_then(|p| p.as_reference()).ok();
        depth += 1;
    }
    None
}

pub fn page_geometry(doc: &Document, page_id: ObjectId) -> PageGeometry {
    let media_box = inherited(doc, page_id, b"MediaBox")
        .and_then(|obj| obj.as_array().ok())
        .and_then(|arr| {
            let values: Vec<f64> = arr
                .iter()
                .filter_map(|o| resolve(doc, o).and_then(obj_to_f64))
                .collect();
            <[f64; 4]>::try_from(values).ok()
        })
        .filter(|b| (b[2] - b[0]).abs() > 0.0 && (b[3] - b[1]).abs() > 0.0)
        .unwrap_or(DEFAULT_MEDIA_BOX);

    let rotate = inherited(doc, page_id, b"Rotate")
        .and_then(obj_to_f64)
        .map(|d| normalize_degrees(d.round() as i64))
        .unwrap_or(0);

    PageGeometry { media_box, rotate }
}

pub fn set_rotation(doc: &mut Document, page_id: ObjectId, degrees: i64) -> Result<()> {
    let dict = page_dict_mut(doc, page_id)?;
    dict.set("Rotate", Object::Integer(normalize_degrees(degrees)));
    Ok(())
}

fn page_dict_mut(doc: &mut Document, page_id: ObjectId) -> Result<&mut Dictionary> {
    doc.get_object_mut(page_id)
        .and_then(|o| o.as_dict_mut())
        .map_err(|e| PdfEditError::OperationError(format!("page {page_id:?}: {e}")))
}

/// Copy inherited attributes onto the page itself so it no longer depends on
/// its ancestors. Needed before a page moves to another page tree.
pub fn materialize_inherited(doc: &mut Document, page_id: ObjectId) -> Result<()> {
    let mut found = Vec::new();
    {
        let own = doc
            .get_dictionary(page_id)
            .map_err(|e| PdfEditError::OperationError(e.to_string()))?;
        for key in INHERITABLE {
            if own.has(key) {
                continue;
            }
            if let Some(value) = inherited(doc, page_id, key) {
                found.push((key.to_vec(), value.clone()));
            }
        }
    }
    let dict = page_dict_mut(doc, page_id)?;
    for (key, value) in found {
        dict.set(key, value);
    }
    Ok(())
}

/// Resolve a sub-dictionary of `resources` (Font, XObject) into an owned copy
fn owned_subdict(doc: &Document, resources: &Dictionary, key: &[u8]) -> Dictionary {
    resources
        .get(key)
        .ok()
        .and_then(|obj| resolve(doc, obj))
        .and_then(|obj| obj.as_dict().ok())
        .cloned()
        .unwrap_or_default()
}

/// Add font and image entries to the page's own resource dictionary.
///
/// The effective resources (possibly inherited or indirect) are copied inline
/// onto the page first, so shared dictionaries of other pages are untouched.
pub fn install_resources(
    doc: &mut Document,
    page_id: ObjectId,
    fonts: &[(String, ObjectId)],
    xobjects: &[(String, ObjectId)],
) -> Result<()> {
    if fonts.is_empty() && xobjects.is_empty() {
        return Ok(());
    }

    let mut resources = inherited(doc, page_id, b"Resources")
        .and_then(|obj| obj.as_dict().ok())
        .cloned()
        .unwrap_or_default();

    let mut font_dict = owned_subdict(doc, &resources, b"Font");
    for (name, id) in fonts {
        font_dict.set(name.as_bytes().to_vec(), Object::Reference(*id));
    }
    let mut xobject_dict = owned_subdict(doc, &resources, b"XObject");
    for (name, id) in xobjects {
        xobject_dict.set(name.as_bytes().to_vec(), Object::Reference(*id));
    }

    if !font_dict.is_empty() {
        resources.set("Font", Object::Dictionary(font_dict));
    }
    if !xobject_dict.is_empty() {
        resources.set("XObject", Object::Dictionary(xobject_dict));
    }

    let dict = page_dict_mut(doc, page_id)?;
    dict.set("Resources", Object::Dictionary(resources));
    Ok(())
}

/// Append drawing content on top of the page.
///
/// The existing content streams are bracketed with `q`/`Q` so a graphics state
/// they leave behind (a CTM, a fill color) cannot leak into the overlay.
pub fn append_overlay(doc: &mut Document, page_id: ObjectId, content: Vec<u8>) -> Result<()> {
    let existing = doc
        .get_dictionary(page_id)
        .map_err(|e| PdfEditError::OperationError(e.to_string()))?
        .get(b"Contents")
        .ok()
        .cloned();

    let overlay_id = doc.add_object(Stream::new(Dictionary::new(), content));

    let mut contents = Vec::new();
    match existing {
        Some(Object::Reference(id)) => {
            contents.push(Object::Reference(doc.add_object(Stream::new(Dictionary::new(), b"q\n".to_vec()))));
            contents.push(Object::Reference(id));
            contents.push(Object::Reference(doc.add_object(Stream::new(Dictionary::new(), b"\nQ\n".to_vec()))));
        }
        Some(Object::Array(arr)) if !arr.is_empty() => {
            contents.push(Object::Reference(doc.add_object(Stream::new(Dictionary::new(), b"q\n".to_vec()))));
            contents.extend(arr);
            contents.push(Object::Reference(doc.add_object(Stream::new(Dictionary::new(), b"\nQ\n".to_vec()))));
        }
        _ => {}
    }
    contents.push(Object::Reference(overlay_id));

    let dict = page_dict_mut(doc, page_id)?;
    dict.set("Contents", Object::Array(contents));
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use lopdf::dictionary;

    /// Page tree whose only page inherits MediaBox, Rotate and Resources
    fn inherited_doc() -> (Document, ObjectId) {
        let mut doc = Document::with_version("1.7");
        let font_id = doc.add_object(dictionary! {
            "Type" => "Font",
            "Subtype" => "Type1",
            "BaseFont" => "Courier",
        });
        let resources_id = doc.add_object(dictionary! {
            "Font" => dictionary! { "F1" => font_id },
        });
        let pages_id = doc.new_object_id();
        let page_id = doc.add_object(dictionary! {
            "Type" => "Page",
            "Parent" => pages_id,
        });
        doc.objects.insert(
            pages_id,
            Object::Dictionary(dictionary! {
                "Type" => "Pages",
                "Kids" => vec![page_id.into()],
                "Count" => 1,
                "MediaBox" => vec![0.into(), 0.into(), 300.into(), 400.into()],
                "Rotate" => 90,
                "Resources" => resources_id,
            }),
        );
        let catalog_id = doc.add_object(dictionary! {
            "Type" => "Catalog",
            "Pages" => pages_id,
        });
        doc.trailer.set("Root", catalog_id);
        (doc, page_id)
    }

    #[test]
    fn test_geometry_is_inherited() {
        let (doc, page_id) = inherited_doc();
        let geometry = page_geometry(&doc, page_id);
        assert_eq!(geometry.width(), 300.0);
        assert_eq!(geometry.height(), 400.0);
        assert_eq!(geometry.rotate, 90);
    }

    #[test]
    fn test_missing_media_box_defaults_to_letter() {
        let mut doc = Document::with_version("1.7");
        let page_id = doc.add_object(dictionary! { "Type" => "Page" });
        let geometry = page_geometry(&doc, page_id);
        assert_eq!(geometry.media_box, DEFAULT_MEDIA_BOX);
    }

    #[test]
    fn test_to_points_flips_y() {
        let geometry = PageGeometry {
            media_box: [0.0, 0.0, 600.0, 800.0],
            rotate: 0,
        };
        let pts = geometry.to_points(&Rect::new(0.1, 0.1, 0.5, 0.25));
        assert!(pts.approx_eq(&Rect::new(60.0, 520.0, 300.0, 200.0), 1e-9));
        let back = geometry.to_canonical(&pts);
        assert!(back.approx_eq(&Rect::new(0.1, 0.1, 0.5, 0.25), 1e-9));
    }

    #[test]
    fn test_to_points_respects_origin() {
        let geometry = PageGeometry {
            media_box: [10.0, 20.0, 110.0, 220.0],
            rotate: 0,
        };
        let pts = geometry.to_points(&Rect::new(0.0, 0.0, 1.0, 1.0));
        assert!(pts.approx_eq(&Rect::new(10.0, 20.0, 100.0, 200.0), 1e-9));
    }

    #[test]
    fn test_install_resources_keeps_inherited_fonts() {
        let (mut doc, page_id) = inherited_doc();
        let new_font = doc.add_object(dictionary! { "Type" => "Font" });
        install_resources(&mut doc, page_id, &[("PEHelvetica".into(), new_font)], &[]).unwrap();

        let page = doc.get_dictionary(page_id).unwrap();
        let fonts = page
            .get(b"Resources")
            .unwrap()
            .as_dict()
            .unwrap()
            .get(b"Font")
            .unwrap()
            .as_dict()
            .unwrap();
        assert!(fonts.has(b"F1"));
        assert!(fonts.has(b"PEHelvetica"));
    }

    #[test]
    fn test_append_overlay_wraps_existing_content() {
        let (mut doc, page_id) = inherited_doc();
        let content_id = doc.add_object(Stream::new(Dictionary::new(), b"1 0 0 rg".to_vec()));
        page_dict_mut(&mut doc, page_id)
            .unwrap()
            .set("Contents", content_id);

        append_overlay(&mut doc, page_id, b"0 0 m".to_vec()).unwrap();
        let contents = doc
            .get_dictionary(page_id)
            .unwrap()
            .get(b"Contents")
            .unwrap()
            .as_array()
            .unwrap()
            .clone();
        assert_eq!(contents.len(), 4);
        assert_eq!(contents[1], Object::Reference(content_id));
    }

    #[test]
    fn test_materialize_copies_inherited_attributes() {
        let (mut doc, page_id) = inherited_doc();
        materialize_inherited(&mut doc, page_id).unwrap();
        let page = doc.get_dictionary(page_id).unwrap();
        assert!(page.has(b"MediaBox"));
        assert!(page.has(b"Rotate"));
        assert!(page.has(b"Resources"));
    }
}
