//! Shared utility functions.
//!
//! - `html`: HTML escaping for safe rendering
//! - `mime`: image sniffing for uploaded receipts
//! - `sanitize`: turning free text into storage key fragments

mod html;
mod mime;
mod sanitize;

pub use html::html_escape;
pub use mime::{detect_image_mime, is_image, DEFAULT_IMAGE_MIME};
pub use sanitize::sanitize_filename;
