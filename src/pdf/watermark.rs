//! Stamp a watermark overlay onto every page of a PDF

use std::path::Path;

use tracing::info;

use crate::config::WatermarkStyle;
use crate::error::Result;
use super::overlay::WatermarkOverlay;
use super::store::{LopdfStore, PageStore};

/// Watermark every page of `input` and write the result to `output`
///
/// Pages keep their order and original content; the overlay is drawn on top.
/// A document with no pages produces an output with no pages. If `input`
/// cannot be read nothing is written. Returns the number of pages written.
pub fn apply_watermark<S: PageStore>(
    store: &mut S,
    input: &Path,
    output: &Path,
    overlay: &WatermarkOverlay,
) -> Result<usize> {
    let pages = store.load_pages(input)?;

    let merged = pages
        .into_iter()
        .map(|page| store.merge_overlay(page, overlay))
        .collect::<Result<Vec<_>>>()?;
    let page_count = merged.len();

    store.write_pages(output, merged)?;

    info!(
        input = %input.display(),
        output = %output.display(),
        pages = page_count,
        "watermarked PDF"
    );
    Ok(page_count)
}

/// Add `text` as a watermark using the default style
///
/// # Example
///
/// ```no_run
/// use doc_watermark::pdf::add_watermark_to_pdf;
/// use std::path::Path;
///
/// add_watermark_to_pdf(
///     Path::new("report.pdf"),
///     Path::new("report-watermarked.pdf"),
///     "LIBRARY COPY",
/// ).expect("Failed to watermark");
/// ```
pub fn add_watermark_to_pdf(input: &Path, output: &Path, text: &str) -> Result<usize> {
    let overlay = WatermarkOverlay::build(text, &WatermarkStyle::default())?;
    apply_watermark(&mut LopdfStore::new(), input, output, &overlay)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::Error;
    use std::collections::HashMap;
    use std::path::PathBuf;

    /// A page is the list of text layers drawn on it
    type FakePage = Vec<String>;

    /// In-memory stand-in for a PDF library
    #[derive(Default)]
    struct MemoryStore {
        files: HashMap<PathBuf, Vec<FakePage>>,
        merges: usize,
    }

    impl PageStore for MemoryStore {
        type Page = FakePage;

        fn load_pages(&mut self, path: &Path) -> Result<Vec<FakePage>> {
            self.files
                .get(path)
                .cloned()
                .ok_or_else(|| Error::FileNotFound(path.to_path_buf()))
        }

        fn merge_overlay(&mut self, mut page: FakePage, overlay: &WatermarkOverlay) -> Result<FakePage> {
            self.merges += 1;
            page.push(overlay.text().to_string());
            Ok(page)
        }

        fn write_pages(&mut self, path: &Path, pages: Vec<FakePage>) -> Result<()> {
            self.files.insert(path.to_path_buf(), pages);
            Ok(())
        }
    }

    fn overlay(text: &str) -> WatermarkOverlay {
        WatermarkOverlay::build(text, &WatermarkStyle::default()).unwrap()
    }

    #[test]
    fn test_every_page_gets_overlay_in_order() {
        let mut store = MemoryStore::default();
        store.files.insert(
            PathBuf::from("in.pdf"),
            vec![vec!["one".into()], vec!["two".into()], vec!["three".into()]],
        );

        let count = apply_watermark(&mut store, Path::new("in.pdf"), Path::new("out.pdf"), &overlay("COPY")).unwrap();

        assert_eq!(count, 3);
        assert_eq!(store.merges, 3);
        let out = &store.files[Path::new("out.pdf")];
        assert_eq!(out[0], vec!["one".to_string(), "COPY".to_string()]);
        assert_eq!(out[1], vec!["two".to_string(), "COPY".to_string()]);
        assert_eq!(out[2], vec!["three".to_string(), "COPY".to_string()]);
    }

    #[test]
    fn test_zero_pages_writes_empty_document() {
        let mut store = MemoryStore::default();
        store.files.insert(PathBuf::from("empty.pdf"), vec![]);

        let count = apply_watermark(&mut store, Path::new("empty.pdf"), Path::new("out.pdf"), &overlay("COPY")).unwrap();

        assert_eq!(count, 0);
        assert!(store.files[Path::new("out.pdf")].is_empty());
    }

    #[test]
    fn test_read_failure_writes_nothing() {
        let mut store = MemoryStore::default();

        let result = apply_watermark(&mut store, Path::new("missing.pdf"), Path::new("out.pdf"), &overlay("COPY"));

        assert!(result.is_err());
        assert!(!store.files.contains_key(Path::new("out.pdf")));
    }
}
