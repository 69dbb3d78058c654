//! Batch and watermark configuration

use std::path::PathBuf;

use crate::layout::{PageDimensions, TransformMatrix};

/// Default source document extension
pub const DEFAULT_EXTENSION: &str = ".docx";

/// Prefix office editors use for lock files of open documents
pub const DEFAULT_LOCK_PREFIX: &str = "~$";

/// Visual appearance of the watermark
#[derive(Debug, Clone, PartialEq)]
pub struct WatermarkStyle {
    /// Standard PDF font name (one of the base 14 fonts)
    pub font: String,
    /// Font size in points
    pub font_size: f32,
    /// Fill color as RGB components in 0.0..=1.0
    pub color: (f32, f32, f32),
    /// Fill and stroke opacity in 0.0..=1.0
    pub opacity: f32,
    /// Offset of the text origin from the bottom-left page corner, in points
    pub offset: (f32, f32),
    /// Counter-clockwise rotation applied after the offset, in degrees
    pub angle: f32,
    /// Size of the overlay template page
    pub page: PageDimensions,
}

impl Default for WatermarkStyle {
    fn default() -> Self {
        Self {
            font: "Helvetica".to_string(),
            font_size: 80.0,
            color: (0.5, 0.5, 0.5),
            opacity: 0.5,
            offset: (100.0, 200.0),
            angle: 45.0,
            page: PageDimensions::letter(),
        }
    }
}

impl WatermarkStyle {
    /// Text placement: translate to `offset`, then rotate by `angle`
    pub fn transform(&self) -> TransformMatrix {
        TransformMatrix::translation(self.offset.0, self.offset.1).then_rotate(self.angle)
    }
}

/// Configuration for one batch run over a folder
#[derive(Debug, Clone)]
pub struct BatchConfig {
    /// Folder holding the source documents (not searched recursively)
    pub source_folder: PathBuf,
    /// Text stamped on every page
    pub watermark_text: String,
    /// Eligible file name suffix, e.g. ".docx"
    pub extension: String,
    /// File names starting with this are editor lock files and skipped
    pub lock_prefix: String,
    pub style: WatermarkStyle,
}

impl BatchConfig {
    pub fn new(source_folder: impl Into<PathBuf>, watermark_text: impl Into<String>) -> Self {
        Self {
            source_folder: source_folder.into(),
            watermark_text: watermark_text.into(),
            extension: DEFAULT_EXTENSION.to_string(),
            lock_prefix: DEFAULT_LOCK_PREFIX.to_string(),
            style: WatermarkStyle::default(),
        }
    }

    pub fn with_extension(mut self, extension: impl Into<String>) -> Self {
        self.extension = extension.into();
        self
    }

    pub fn with_lock_prefix(mut self, lock_prefix: impl Into<String>) -> Self {
        self.lock_prefix = lock_prefix.into();
        self
    }

    pub fn with_style(mut self, style: WatermarkStyle) -> Self {
        self.style = style;
        self
    }
}
