//! Shared helpers for integration tests

#![allow(dead_code)]

use std::fs;
use std::path::{Path, PathBuf};

use doc_watermark::convert::{expected_output, Converter};
use doc_watermark::{Error, Result};
use lopdf::{Dictionary, Document, Object, Stream};

/// Write a simple PDF with `num_pages` pages, each showing "<prefix>-Page-<n>"
pub fn write_test_pdf(path: &Path, num_pages: usize, prefix: &str) {
    let mut doc = Document::with_version("1.5");
    let pages_id = doc.new_object_id();

    let mut font = Dictionary::new();
    font.set("Type", Object::Name(b"Font".to_vec()));
    font.set("Subtype", Object::Name(b"Type1".to_vec()));
    font.set("BaseFont", Object::Name(b"Helvetica".to_vec()));
    let font_id = doc.add_object(Object::Dictionary(font));

    let mut kids = Vec::new();
    for n in 1..=num_pages {
        let content = format!("BT /F1 12 Tf 50 700 Td ({}-Page-{}) Tj ET", prefix, n);
        let content_id = doc.add_object(Stream::new(Dictionary::new(), content.into_bytes()));

        let mut fonts = Dictionary::new();
        fonts.set("F1", Object::Reference(font_id));
        let mut resources = Dictionary::new();
        resources.set("Font", Object::Dictionary(fonts));

        let mut page = Dictionary::new();
        page.set("Type", Object::Name(b"Page".to_vec()));
        page.set("Parent", Object::Reference(pages_id));
        page.set("Contents", Object::Reference(content_id));
        page.set("Resources", Object::Dictionary(resources));
        page.set("MediaBox", Object::Array(vec![
            Object::Integer(0),
            Object::Integer(0),
            Object::Integer(612),
            Object::Integer(792),
        ]));
        kids.push(Object::Reference(doc.add_object(Object::Dictionary(page))));
    }

    let mut pages = Dictionary::new();
    pages.set("Type", Object::Name(b"Pages".to_vec()));
    pages.set("Count", Object::Integer(num_pages as i64));
    pages.set("Kids", Object::Array(kids));
    doc.objects.insert(pages_id, Object::Dictionary(pages));

    let mut catalog = Dictionary::new();
    catalog.set("Type", Object::Name(b"Catalog".to_vec()));
    catalog.set("Pages", Object::Reference(pages_id));
    let catalog_id = doc.add_object(Object::Dictionary(catalog));
    doc.trailer.set("Root", Object::Reference(catalog_id));

    doc.save(path).expect("Failed to write test PDF");
}

/// Stands in for LibreOffice
///
/// A source document holding a number is "converted" into a PDF with that
/// many pages; anything else becomes a file that is not a PDF.
pub struct FakeConverter;

impl Converter for FakeConverter {
    fn convert(&self, input: &Path, output_dir: &Path) -> Result<PathBuf> {
        let produced = expected_output(input, output_dir)?;
        let body = fs::read_to_string(input)?;
        let prefix = input.file_stem().unwrap_or_default().to_string_lossy().into_owned();

        match body.trim().parse::<usize>() {
            Ok(pages) => write_test_pdf(&produced, pages, &prefix),
            Err(_) => fs::write(&produced, b"garbage, not a PDF")?,
        }
        Ok(produced)
    }
}

/// Fails like a converter that is not installed
pub struct MissingConverter;

impl Converter for MissingConverter {
    fn convert(&self, _input: &Path, _output_dir: &Path) -> Result<PathBuf> {
        Err(Error::ConverterNotFound("soffice".to_string()))
    }
}

/// Sorted file names in a directory
pub fn file_names(dir: &Path) -> Vec<String> {
    let mut names: Vec<String> = fs::read_dir(dir)
        .expect("Failed to list directory")
        .map(|e| e.unwrap().file_name().to_string_lossy().into_owned())
        .collect();
    names.sort();
    names
}
