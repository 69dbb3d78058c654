//! Error types for the doc-watermark library

use std::path::PathBuf;
use std::process::ExitStatus;
use thiserror::Error;

/// Result type alias using our Error type
pub type Result<T> = std::result::Result<T, Error>;

/// Main error type for the doc-watermark library
#[derive(Error, Debug)]
pub enum Error {
    /// PDF processing error
    #[error("PDF error: {0}")]
    Pdf(#[from] lopdf::Error),

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// File not found
    #[error("File not found: {}", .0.display())]
    FileNotFound(PathBuf),

    /// Source folder missing (at start or vanished mid-run)
    #[error("The folder {} does not exist", .0.display())]
    FolderNotFound(PathBuf),

    /// Conversion tool could not be started
    #[error("Conversion tool not found: {0}")]
    ConverterNotFound(String),

    /// Conversion tool exited unsuccessfully
    #[error("Conversion of {} failed ({status}): {stderr}", .input.display())]
    ConversionFailed {
        input: PathBuf,
        status: ExitStatus,
        stderr: String,
    },

    /// Conversion tool reported success but the expected PDF is not there
    #[error("Converted PDF was not produced: {}", .0.display())]
    ConvertedFileMissing(PathBuf),

    /// Input could not be parsed as a PDF
    #[error("Failed to read PDF {}: {source}", .path.display())]
    PdfRead {
        path: PathBuf,
        #[source]
        source: lopdf::Error,
    },

    /// General error
    #[error("{0}")]
    General(String),
}

impl Error {
    /// Whether this error came from the external conversion step
    pub fn is_conversion_failure(&self) -> bool {
        matches!(
            self,
            Error::ConverterNotFound(_) | Error::ConversionFailed { .. } | Error::ConvertedFileMissing(_)
        )
    }
}
