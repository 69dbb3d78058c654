//! Document Watermark Library
//!
//! Batch-converts office documents to PDF and stamps a diagonal watermark on
//! every page. This library provides functionality to:
//! - Convert documents to PDF through an external tool (LibreOffice)
//! - Build a watermark overlay and merge it onto every page of a PDF
//! - Process a whole folder of documents, cleaning up intermediate files
//! - Inspect PDFs (page counts, metadata, page text)
//!
//! # Example
//!
//! ```no_run
//! use doc_watermark::batch::{process_folder, ConsoleReporter};
//! use doc_watermark::config::BatchConfig;
//! use doc_watermark::convert::SofficeConverter;
//! use doc_watermark::pdf::LopdfStore;
//!
//! let config = BatchConfig::new("documents", "LIBRARY COPY");
//!
//! process_folder(
//!     &config,
//!     &SofficeConverter::default(),
//!     &mut LopdfStore::new(),
//!     &mut ConsoleReporter,
//! ).expect("Failed to process folder");
//! ```

pub mod error;
pub mod config;
pub mod layout;
pub mod convert;
pub mod pdf;
pub mod batch;

// Re-export commonly used items
pub use error::{Error, Result};
pub use config::{BatchConfig, WatermarkStyle};
