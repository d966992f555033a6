//! Page extraction
//!
//! Extracts pages using "Construction by Whitelist": clone, drop the pages
//! that are not wanted, prune the objects nothing refers to any more.

use crate::error::{PdfEditError, Result};
use lopdf::Document;
use tracing::{debug, info, instrument};

fn load(bytes: &[u8]) -> Result<Document> {
    Document::load_mem(bytes).map_err(|e| PdfEditError::ParseError(e.to_string()))
}

/// Copy of `doc` holding only the 1-based `page`, serialized
fn extract(doc: &Document, page: u32) -> Result<Vec<u8>> {
    let page_count = doc.get_pages().len() as u32;
    let mut page_doc = doc.clone();

    // Delete from the back so the remaining numbers stay valid
    for other in (1..=page_count).rev().filter(|&p| p != page) {
        page_doc.delete_pages(&[other]);
    }

    page_doc.prune_objects();
    page_doc.compress();

    let mut buffer = Vec::new();
    page_doc
        .save_to(&mut buffer)
        .map_err(|e| PdfEditError::OperationError(format!("Save failed: {}", e)))?;
    Ok(buffer)
}

/// One single-page document per page, in page order
#[instrument(skip_all, fields(bytes = bytes.len()))]
pub fn split_by_page(bytes: &[u8]) -> Result<Vec<Vec<u8>>> {
    let doc = load(bytes)?;
    let page_count = doc.get_pages().len() as u32;
    if page_count == 0 {
        return Err(PdfEditError::Validation(
            "document has no pages to split".into(),
        ));
    }

    let mut outputs = Vec::with_capacity(page_count as usize);
    for page in 1..=page_count {
        outputs.push(extract(&doc, page)?);
        debug!(page, "extracted page");
    }
    info!(pages = page_count, "split complete");
    Ok(outputs)
}

#[cfg(test)]
mod tests {
    use super::*;
    use lopdf::{content::Content, content::Operation, Dictionary, Object, Stream};

    /// `num_pages` pages, page n draws "Page n"
    fn create_test_pdf(num_pages: u32) -> Vec<u8> {
        let mut doc = Document::with_version("1.7");
        let pages_id = doc.new_object_id();

        let mut page_ids = Vec::new();
        for i in 0..num_pages {
            let content = Content {
                operations: vec![
                    Operation::new("BT", vec![]),
                    Operation::new(
                        "Tf",
                        vec![Object::Name(b"F1".to_vec()), Object::Integer(12)],
                    ),
                    Operation::new("Td", vec![Object::Integer(100), Object::Integer(700)]),
                    Operation::new(
                        "Tj",
                        vec![Object::String(
                            format!("Page {}", i + 1).into_bytes(),
                            lopdf::StringFormat::Literal,
                        )],
                    ),
                    Operation::new("ET", vec![]),
                ],
            };
            let content_id =
                doc.add_object(Stream::new(Dictionary::new(), content.encode().unwrap()));

            let page = Dictionary::from_iter(vec![
                ("Type", Object::Name(b"Page".to_vec())),
                ("Parent", Object::Reference(pages_id)),
                (
                    "MediaBox",
                    Object::Array(vec![
                        Object::Integer(0),
                        Object::Integer(0),
                        Object::Integer(612),
                        Object::Integer(792),
                    ]),
                ),
                ("Contents", Object::Reference(content_id)),
            ]);
            page_ids.push(doc.add_object(page));
        }

        let pages = Dictionary::from_iter(vec![
            ("Type", Object::Name(b"Pages".to_vec())),
            ("Count", Object::Integer(num_pages as i64)),
            (
                "Kids",
                Object::Array(page_ids.iter().map(|id| Object::Reference(*id)).collect()),
            ),
        ]);
        doc.objects.insert(pages_id, Object::Dictionary(pages));

        let catalog = Dictionary::from_iter(vec![
            ("Type", Object::Name(b"Catalog".to_vec())),
            ("Pages", Object::Reference(pages_id)),
        ]);
        let catalog_id = doc.add_object(catalog);
        doc.trailer.set("Root", Object::Reference(catalog_id));

        let mut buffer = Vec::new();
        doc.save_to(&mut buffer).unwrap();
        buffer
    }

    fn first_text(bytes: &[u8]) -> Vec<u8> {
        let doc = Document::load_mem(bytes).unwrap();
        let page_id = *doc.get_pages().get(&1).unwrap();
        let content = doc.get_and_decode_page_content(page_id).unwrap();
        content
            .operations
            .iter()
            .find(|o| o.operator == "Tj")
            .and_then(|o| o.operands[0].as_str().ok())
            .unwrap()
            .to_vec()
    }

    #[test]
    fn test_split_by_page_keeps_order() {
        let pdf = create_test_pdf(3);
        let parts = split_by_page(&pdf).unwrap();
        assert_eq!(parts.len(), 3);
        for (i, part) in parts.iter().enumerate() {
            let doc = Document::load_mem(part).unwrap();
            assert_eq!(doc.get_pages().len(), 1);
            assert_eq!(first_text(part), format!("Page {}", i + 1).into_bytes());
        }
    }

    #[test]
    fn test_split_parts_drop_other_pages_content() {
        let pdf = create_test_pdf(4);
        let parts = split_by_page(&pdf).unwrap();
        for part in &parts {
            let doc = Document::load_mem(part).unwrap();
            let streams = doc
                .objects
                .values()
                .filter(|o| matches!(o, Object::Stream(_)))
                .count();
            assert_eq!(streams, 1);
        }
    }

    #[test]
    fn test_split_by_page_rejects_garbage() {
        assert!(matches!(
            split_by_page(b"%PDF-nope"),
            Err(PdfEditError::ParseError(_))
        ));
    }

    #[test]
    fn test_split_by_page_rejects_empty_document() {
        let pdf = create_test_pdf(0);
        assert!(matches!(
            split_by_page(&pdf),
            Err(PdfEditError::Validation(_))
        ));
    }
}
