//! Image type detection from file content.

/// MIME type assumed when the content cannot be identified.
pub const DEFAULT_IMAGE_MIME: &str = "image/jpeg";

/// Check whether the bytes look like an image format we can forward.
pub fn is_image(bytes: &[u8]) -> bool {
    infer::is_image(bytes)
}

/// MIME type of an image, falling back to [`DEFAULT_IMAGE_MIME`].
pub fn detect_image_mime(bytes: &[u8]) -> &'static str {
    infer::get(bytes)
        .filter(|kind| kind.matcher_type() == infer::MatcherType::Image)
        .map(|kind| kind.mime_type())
        .unwrap_or(DEFAULT_IMAGE_MIME)
}
