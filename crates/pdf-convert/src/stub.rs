//! Minimal PDF construction and inspection

use crate::{ConvertError, Result};
use lopdf::{dictionary, Document, Object, Stream};

/// A4 width in points
const A4_WIDTH: f64 = 595.28;
/// A4 height in points
const A4_HEIGHT: f64 = 841.89;

/// Build a well-formed, empty, single-page A4 PDF
pub fn blank_pdf() -> Result<Vec<u8>> {
    let mut doc = Document::with_version("1.5");
    let pages_id = doc.new_object_id();

    let contents_id = doc.add_object(Stream::new(dictionary! {}, Vec::new()));
    let page_id = doc.add_object(dictionary! {
        "Type" => "Page",
        "Parent" => pages_id,
        "MediaBox" => vec![0.into(), 0.into(), A4_WIDTH.into(), A4_HEIGHT.into()],
        "Resources" => dictionary! {},
        "Contents" => contents_id,
    });

    doc.objects.insert(
        pages_id,
        Object::Dictionary(dictionary! {
            "Type" => "Pages",
            "Count" => 1,
            "Kids" => vec![page_id.into()],
        }),
    );

    let catalog_id = doc.add_object(dictionary! {
        "Type" => "Catalog",
        "Pages" => pages_id,
    });
    doc.trailer.set("Root", catalog_id);

    let mut buffer = Vec::new();
    doc.save_to(&mut buffer)?;
    Ok(buffer)
}

/// Number of pages in a PDF document
pub fn page_count(pdf: &[u8]) -> Result<usize> {
    if !pdf.starts_with(b"%PDF-") {
        return Err(ConvertError::ParseError("missing %PDF- header".to_string()));
    }
    let doc = Document::load_mem(pdf)?;
    Ok(doc.get_pages().len())
}
