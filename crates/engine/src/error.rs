//! Engine error taxonomy
//!
//! Finalize-time failures abort a whole overlay commit; draw-time
//! failures are local to one call and never invalidate the session;
//! extraction and recognition failures degrade search instead of
//! aborting it.

use thiserror::Error;

/// Errors raised by overlay session lifecycle operations.
#[derive(Debug, Error)]
pub enum OverlayError {
    /// The document is structurally unsuited for in-place mutation.
    #[error("document is not editable: {0}")]
    NotEditable(String),

    /// The page index no longer resolves to a page object.
    #[error("page {0} does not resolve to a page object")]
    PageMissing(u32),

    /// Unexpected failure inside the object layer during finalize.
    /// The target page is left untouched.
    #[error("engine failure during overlay finalize: {0}")]
    Internal(#[from] lopdf::Error),
}

/// Errors raised by a single draw call. These never invalidate the
/// session or previously issued operators.
#[derive(Debug, Error)]
pub enum DrawError {
    /// Text was requested on a session whose whole font fallback
    /// chain failed to resolve.
    #[error("no fallback font could be resolved for this session")]
    FontUnavailable,

    /// The raster payload handed to an image draw could not be decoded.
    #[error("failed to decode raster payload: {0}")]
    ImageDecode(#[from] image::ImageError),
}

/// Errors raised while extracting a page's structured text.
#[derive(Debug, Error)]
pub enum TextError {
    #[error("page {0} does not resolve to a page object")]
    PageMissing(u32),

    #[error("failed to decode page content: {0}")]
    Content(#[from] lopdf::Error),
}

/// Errors raised by the recognition fallback pass. The pipeline fails
/// closed: any of these degrades the page to empty text.
#[derive(Debug, Error)]
pub enum RecognitionError {
    #[error("recognition support is not compiled into this build")]
    Unavailable,

    #[error("page render for recognition failed: {0}")]
    Render(String),

    #[error("recognition pass failed: {0}")]
    Engine(String),
}
