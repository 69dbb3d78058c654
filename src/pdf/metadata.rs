//! PDF inspection: page counts, document info and page text

use std::path::Path;

use lopdf::content::Content;
use lopdf::{Document, Object, ObjectId};

use crate::error::{Error, Result};

/// PDF metadata
#[derive(Debug, Clone)]
pub struct PdfMetadata {
    /// Number of pages in the PDF
    pub page_count: usize,
    /// Document title (if present)
    pub title: Option<String>,
    /// Document author (if present)
    pub author: Option<String>,
}

/// Extract metadata from a PDF file
pub fn extract_metadata(path: &Path) -> Result<PdfMetadata> {
    let doc = load(path)?;

    let mut title = None;
    let mut author = None;

    if let Ok(info) = doc.trailer.get(b"Info").and_then(Object::as_reference) {
        if let Ok(info_dict) = doc.get_dictionary(info) {
            title = info_string(info_dict.get(b"Title").ok());
            author = info_string(info_dict.get(b"Author").ok());
        }
    }

    Ok(PdfMetadata {
        page_count: doc.get_pages().len(),
        title,
        author,
    })
}

fn info_string(object: Option<&Object>) -> Option<String> {
    let bytes = object?.as_str().ok()?;
    String::from_utf8(bytes.to_vec()).ok()
}

/// Count the number of pages in a PDF file (zero is a valid answer)
pub fn count_pages(path: &Path) -> Result<usize> {
    Ok(load(path)?.get_pages().len())
}

/// Strings drawn by the text-showing operators of a page, in stream order
///
/// Bytes are read as Latin-1, which matches WinAnsi for printable ASCII.
pub fn page_text_fragments(doc: &Document, page_id: ObjectId) -> Result<Vec<String>> {
    let content = doc.get_page_content(page_id)?;
    let content = Content::decode(&content)?;

    let mut fragments = Vec::new();
    for operation in &content.operations {
        match operation.operator.as_str() {
            "Tj" | "'" | "\"" => {
                if let Some(Object::String(bytes, _)) = operation.operands.last() {
                    fragments.push(latin1(bytes));
                }
            }
            "TJ" => {
                if let Some(Object::Array(items)) = operation.operands.first() {
                    let text: String = items
                        .iter()
                        .filter_map(|item| match item {
                            Object::String(bytes, _) => Some(latin1(bytes)),
                            _ => None,
                        })
                        .collect();
                    fragments.push(text);
                }
            }
            _ => {}
        }
    }
    Ok(fragments)
}

/// Number of pages whose text fragments include `needle`
pub fn pages_containing(path: &Path, needle: &str) -> Result<usize> {
    let doc = load(path)?;
    let mut count = 0;
    for page_id in doc.get_pages().into_values() {
        if page_text_fragments(&doc, page_id)?.iter().any(|f| f.contains(needle)) {
            count += 1;
        }
    }
    Ok(count)
}

fn latin1(bytes: &[u8]) -> String {
    bytes.iter().map(|&b| char::from(b)).collect()
}

fn load(path: &Path) -> Result<Document> {
    if !path.exists() {
        return Err(Error::FileNotFound(path.to_path_buf()));
    }
    Document::load(path).map_err(|source| Error::PdfRead {
        path: path.to_path_buf(),
        source,
    })
}
