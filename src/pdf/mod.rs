//! PDF watermarking module

pub mod overlay;
pub mod store;
pub mod watermark;
pub mod metadata;

// Re-export commonly used items
pub use overlay::WatermarkOverlay;
pub use store::{LopdfStore, PageStore};
pub use watermark::{add_watermark_to_pdf, apply_watermark};
pub use metadata::{count_pages, extract_metadata, page_text_fragments, pages_containing, PdfMetadata};
