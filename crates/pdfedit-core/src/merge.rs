//! Merge several documents into one
//!
//! Pages are appended in input order. Nothing on the pages is changed apart
//! from copying inherited attributes onto each page, since every page ends up
//! as a direct child of the first document's page tree root.

use crate::error::{PdfEditError, Result};
use crate::page::materialize_inherited;
use lopdf::{Document, Object, ObjectId};
use tracing::{debug, info, instrument};

/// Combine `inputs` (at least two) into a single document.
///
/// Every input is parsed before any page is copied, so a bad buffer fails
/// the whole merge without partial output.
#[instrument(skip_all, fields(inputs = inputs.len()))]
pub fn merge_into<B: AsRef<[u8]>>(inputs: &[B]) -> Result<Vec<u8>> {
    if inputs.len() < 2 {
        return Err(PdfEditError::Validation(format!(
            "merge needs at least 2 documents, got {}",
            inputs.len()
        )));
    }

    let mut loaded = Vec::with_capacity(inputs.len());
    for (i, bytes) in inputs.iter().enumerate() {
        let mut doc = Document::load_mem(bytes.as_ref()).map_err(|e| {
            PdfEditError::ParseError(format!("Failed to load document {}: {}", i, e))
        })?;
        let page_ids: Vec<ObjectId> = doc.get_pages().values().copied().collect();
        for page_id in page_ids {
            materialize_inherited(&mut doc, page_id)?;
        }
        loaded.push(doc);
    }

    let mut sources = loaded.into_iter();
    let mut dest = match sources.next() {
        Some(doc) => doc,
        None => return Err(PdfEditError::Validation("no documents to merge".into())),
    };
    let mut dest_max_id = dest.max_id;
    let mut page_refs: Vec<ObjectId> = dest.get_pages().values().copied().collect();

    for source in sources {
        let source_pages: Vec<ObjectId> = source.get_pages().values().copied().collect();
        let id_offset = dest_max_id;

        for (old_id, object) in source.objects {
            dest.objects
                .insert((old_id.0 + id_offset, old_id.1), remap_object_refs(object, id_offset));
        }
        page_refs.extend(source_pages.iter().map(|id| (id.0 + id_offset, id.1)));

        dest_max_id = (source.max_id + id_offset).max(dest_max_id);
        debug!(pages = source_pages.len(), id_offset, "appended document");
    }
    dest.max_id = dest_max_id;

    update_page_tree(&mut dest, &page_refs)?;
    dest.prune_objects();
    dest.compress();

    let mut buffer = Vec::new();
    dest.save_to(&mut buffer).map_err(|e| {
        PdfEditError::OperationError(format!("Failed to save merged PDF: {}", e))
    })?;

    info!(pages = page_refs.len(), bytes = buffer.len(), "merge complete");
    Ok(buffer)
}

/// Shift every indirect reference inside `obj` by `offset`
fn remap_object_refs(obj: Object, offset: u32) -> Object {
    match obj {
        Object::Reference(id) => Object::Reference((id.0 + offset, id.1)),
        Object::Array(arr) => Object::Array(
            arr.into_iter()
                .map(|o| remap_object_refs(o, offset))
                .collect(),
        ),
        Object::Dictionary(mut dict) => {
            for (_, value) in dict.iter_mut() {
                *value = remap_object_refs(std::mem::replace(value, Object::Null), offset);
            }
            Object::Dictionary(dict)
        }
        Object::Stream(mut stream) => {
            for (_, value) in stream.dict.iter_mut() {
                *value = remap_object_refs(std::mem::replace(value, Object::Null), offset);
            }
            Object::Stream(stream)
        }
        other => other,
    }
}

/// Point the root page tree node at `page_refs`, flat and in order
fn update_page_tree(doc: &mut Document, page_refs: &[ObjectId]) -> Result<()> {
    let catalog_id = doc
        .trailer
        .get(b"Root")
        .and_then(|o| o.as_reference())
        .map_err(|_| PdfEditError::OperationError("No Root in trailer".into()))?;

    let pages_id = doc
        .get_dictionary(catalog_id)
        .and_then(|catalog| catalog.get(b"Pages"))
        .and_then(|o| o.as_reference())
        .map_err(|_| PdfEditError::OperationError("No Pages in catalog".into()))?;

    match doc.objects.get_mut(&pages_id) {
        Some(Object::Dictionary(pages_dict)) => {
            let kids = page_refs.iter().map(|&id| Object::Reference(id)).collect();
            pages_dict.set("Kids", Object::Array(kids));
            pages_dict.set("Count", Object::Integer(page_refs.len() as i64));
            // Pages carry their own copies now
            for key in ["MediaBox", "CropBox", "Rotate", "Resources"] {
                pages_dict.remove(key.as_bytes());
            }
        }
        _ => {
            return Err(PdfEditError::OperationError(
                "Invalid pages dictionary".into(),
            ))
        }
    }

    for &page_id in page_refs {
        if let Ok(page) = doc.get_object_mut(page_id).and_then(|o| o.as_dict_mut()) {
            page.set("Parent", Object::Reference(pages_id));
        }
    }
    Ok(())
}
