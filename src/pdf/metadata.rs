//! Document information for the `info` command

use std::path::Path;

use lopdf::{Document, Object};

use crate::error::{Error, Result};
use crate::geometry::PageSize;
use crate::pdf::source::{DocumentSource, PdfDocument};

/// PDF metadata
#[derive(Debug, Clone)]
pub struct PdfMetadata {
    pub page_count: usize,
    /// Document title (if present)
    pub title: Option<String>,
    /// Document author (if present)
    pub author: Option<String>,
    /// Visible size of each page, in points
    pub page_sizes: Vec<PageSize>,
}

/// Read a text entry of the Info dictionary
fn info_string(doc: &Document, key: &[u8]) -> Option<String> {
    let info_id = doc.trailer.get(b"Info").ok()?.as_reference().ok()?;
    let info = doc.get_dictionary(info_id).ok()?;

    match info.get(key).ok()? {
        Object::String(bytes, _) => Some(decode_text(bytes)),
        _ => None,
    }
}

/// Decode a PDF text string: UTF-16BE with a byte order mark, else 8-bit
fn decode_text(bytes: &[u8]) -> String {
    match bytes.strip_prefix(&[0xfe, 0xff]) {
        Some(utf16) => {
            let units: Vec<u16> = utf16
                .chunks_exact(2)
                .map(|pair| u16::from_be_bytes([pair[0], pair[1]]))
                .collect();
            String::from_utf16_lossy(&units)
        }
        None => bytes.iter().map(|&b| char::from(b)).collect(),
    }
}

/// Collect metadata from an already loaded document
pub fn document_metadata(source: &PdfDocument) -> Result<PdfMetadata> {
    let page_sizes = source
        .pages()?
        .into_iter()
        .map(|page| source.page_size(page))
        .collect::<Result<Vec<_>>>()?;

    let doc = source.document();
    Ok(PdfMetadata {
        page_count: source.page_count(),
        title: info_string(doc, b"Title"),
        author: info_string(doc, b"Author"),
        page_sizes,
    })
}

/// Extract metadata from a PDF file
pub fn extract_metadata(path: &Path) -> Result<PdfMetadata> {
    let source = PdfDocument::load(path)?;
    document_metadata(&source)
}

/// Count the number of pages in a PDF file
pub fn count_pages(path: &Path) -> Result<usize> {
    if !path.exists() {
        return Err(Error::FileNotFound(path.to_path_buf()));
    }
    Ok(PdfDocument::load(path)?.page_count())
}
