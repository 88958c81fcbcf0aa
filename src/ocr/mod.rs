//! Field extraction from single receipt images.
//!
//! Standalone exploration path, not wired into the batch workflow:
//! - Tesseract OCR via command-line, returning plain text
//! - Vision model via chat completions, returning the receipt fields as JSON
//!
//! Both sit behind [`FieldExtractor`] so callers can swap them.

mod backend;
mod model_utils;
mod tesseract;
mod vision;

pub use backend::{ExtractedFields, FieldExtractor, OcrError};
pub use model_utils::check_binary;
pub use tesseract::TesseractExtractor;
pub use vision::VisionExtractor;
