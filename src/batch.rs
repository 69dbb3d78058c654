//! Folder batch driver: discover documents, convert, watermark, clean up
//!
//! Each eligible document goes through
//! `convert -> watermark -> remove intermediate -> report`, one at a time.
//! A failure on one document is reported and recorded, then the batch moves
//! on. Only a vanished source folder stops the run.

use std::fs;
use std::path::{Path, PathBuf};

use tracing::{info, warn};

use crate::config::BatchConfig;
use crate::convert::{convert_to_pdf, Converter};
use crate::error::{Error, Result};
use crate::pdf::{apply_watermark, PageStore, WatermarkOverlay};

/// Prefix of the intermediate PDF produced by conversion
pub const INTERMEDIATE_PREFIX: &str = "temp_";

/// Observer for per-file progress
pub trait Reporter {
    fn started(&mut self, source: &Path);
    fn saved(&mut self, output: &Path);
    fn failed(&mut self, source: &Path, error: &Error);
}

/// Prints progress lines to the console
#[derive(Debug, Default)]
pub struct ConsoleReporter;

impl Reporter for ConsoleReporter {
    fn started(&mut self, source: &Path) {
        println!("{}", processing_line(source));
    }

    fn saved(&mut self, output: &Path) {
        println!("{}", saved_line(output));
    }

    fn failed(&mut self, source: &Path, error: &Error) {
        eprintln!("{}", failed_line(source, error));
    }
}

/// `Processing: <source>`
pub fn processing_line(source: &Path) -> String {
    format!("Processing: {}", source.display())
}

/// `Saved watermarked document as: <output>`
pub fn saved_line(output: &Path) -> String {
    format!("Saved watermarked document as: {}", output.display())
}

pub fn failed_line(source: &Path, error: &Error) -> String {
    format!("Failed to process {}: {}", source.display(), error)
}

/// Outcome of a batch run
#[derive(Debug, Default)]
pub struct BatchSummary {
    /// Output PDFs written, in processing order
    pub processed: Vec<PathBuf>,
    /// Source documents that failed, with the error message
    pub failures: Vec<(PathBuf, String)>,
}

impl BatchSummary {
    pub fn is_success(&self) -> bool {
        self.failures.is_empty()
    }
}

/// Removes the file when dropped, unless removed explicitly first
#[derive(Debug)]
struct TempFile {
    path: PathBuf,
    armed: bool,
}

impl TempFile {
    fn new(path: PathBuf) -> Self {
        Self { path, armed: true }
    }

    fn path(&self) -> &Path {
        &self.path
    }

    /// Delete now and surface the error
    fn remove(mut self) -> Result<()> {
        self.armed = false;
        match fs::remove_file(&self.path) {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(Error::Io(e)),
        }
    }
}

impl Drop for TempFile {
    fn drop(&mut self) {
        if self.armed && self.path.exists() {
            if let Err(e) = fs::remove_file(&self.path) {
                warn!(path = %self.path.display(), error = %e, "could not remove intermediate PDF");
            }
        }
    }
}

/// Whether a file name is a document to process
///
/// It must end with `extension` and must not be an editor lock file.
pub fn is_eligible(file_name: &str, extension: &str, lock_prefix: &str) -> bool {
    if !lock_prefix.is_empty() && file_name.starts_with(lock_prefix) {
        return false;
    }
    file_name.len() > extension.len() && file_name.ends_with(extension)
}

/// Eligible documents directly inside the source folder, sorted by name
///
/// Only directories are left out before the name check. Symbolic links are
/// followed; a dangling one is still listed so its failure gets reported.
pub fn discover_documents(config: &BatchConfig) -> Result<Vec<PathBuf>> {
    let mut documents = Vec::new();

    for entry in fs::read_dir(&config.source_folder)? {
        let entry = entry?;
        if fs::metadata(entry.path()).map_or(false, |m| m.is_dir()) {
            continue;
        }
        let name = entry.file_name();
        let Some(name) = name.to_str() else {
            warn!(name = ?entry.file_name(), "skipping file with non UTF-8 name");
            continue;
        };
        if is_eligible(name, &config.extension, &config.lock_prefix) {
            documents.push(entry.path());
        }
    }

    documents.sort();
    Ok(documents)
}

/// File name without the configured extension
pub fn document_stem<'a>(source: &'a Path, extension: &str) -> Result<&'a str> {
    source
        .file_name()
        .and_then(|n| n.to_str())
        .and_then(|n| n.strip_suffix(extension))
        .filter(|stem| !stem.is_empty())
        .ok_or_else(|| Error::General(format!("Not a {} document: {}", extension, source.display())))
}

/// `<folder>/temp_<stem>.pdf`
pub fn intermediate_path(folder: &Path, stem: &str) -> PathBuf {
    folder.join(format!("{}{}.pdf", INTERMEDIATE_PREFIX, stem))
}

/// `<folder>/<stem>.pdf`
pub fn output_path(folder: &Path, stem: &str) -> PathBuf {
    folder.join(format!("{}.pdf", stem))
}

/// Convert and watermark every eligible document in the source folder
///
/// # Example
///
/// ```no_run
/// use doc_watermark::batch::{process_folder, ConsoleReporter};
/// use doc_watermark::config::BatchConfig;
/// use doc_watermark::convert::SofficeConverter;
/// use doc_watermark::pdf::LopdfStore;
///
/// let config = BatchConfig::new("documents", "LIBRARY COPY");
/// let summary = process_folder(
///     &config,
///     &SofficeConverter::default(),
///     &mut LopdfStore::new(),
///     &mut ConsoleReporter,
/// ).expect("batch failed");
/// println!("{} done, {} failed", summary.processed.len(), summary.failures.len());
/// ```
pub fn process_folder<C, S, R>(
    config: &BatchConfig,
    converter: &C,
    store: &mut S,
    reporter: &mut R,
) -> Result<BatchSummary>
where
    C: Converter + ?Sized,
    S: PageStore,
    R: Reporter + ?Sized,
{
    let folder = &config.source_folder;
    if !folder.is_dir() {
        return Err(Error::FolderNotFound(folder.clone()));
    }

    let overlay = WatermarkOverlay::build(&config.watermark_text, &config.style)?;
    let documents = discover_documents(config)?;
    info!(folder = %folder.display(), documents = documents.len(), "starting batch");

    let mut summary = BatchSummary::default();

    for source in documents {
        reporter.started(&source);

        match process_document(config, converter, store, &overlay, &source) {
            Ok(output) => {
                reporter.saved(&output);
                summary.processed.push(output);
            }
            Err(error) => {
                warn!(source = %source.display(), error = %error, "document failed");
                reporter.failed(&source, &error);
                summary.failures.push((source, error.to_string()));

                if !folder.is_dir() {
                    return Err(Error::FolderNotFound(folder.clone()));
                }
            }
        }
    }

    info!(
        processed = summary.processed.len(),
        failed = summary.failures.len(),
        "batch finished"
    );
    Ok(summary)
}

/// One document through the pipeline; returns the output path
fn process_document<C, S>(
    config: &BatchConfig,
    converter: &C,
    store: &mut S,
    overlay: &WatermarkOverlay,
    source: &Path,
) -> Result<PathBuf>
where
    C: Converter + ?Sized,
    S: PageStore,
{
    let folder = &config.source_folder;
    let stem = document_stem(source, &config.extension)?;

    // Removed on every exit path
    let intermediate = TempFile::new(intermediate_path(folder, stem));
    let output = output_path(folder, stem);

    convert_to_pdf(converter, source, intermediate.path())?;
    apply_watermark(store, intermediate.path(), &output, overlay)?;
    intermediate.remove()?;

    Ok(output)
}
