//! Overlay compositing and text search for plan-set PDFs.
//!
//! The engine covers two workflows over `lopdf` documents:
//!
//! - [`OverlaySession`]: accumulate markup (lines, rects, polygons,
//!   images, text) in an upright view coordinate space and commit it
//!   onto one page without disturbing existing content.
//! - [`search_text`]: structured text extraction with a density-gated
//!   recognition fallback for scanned pages, feeding a substring
//!   matcher that reports positioned hits.

pub mod document;
pub mod error;
pub mod fonts;
pub mod overlay;
pub mod recognition;
pub mod search;
pub mod text_layer;
pub mod transform;

pub use error::{DrawError, OverlayError, RecognitionError, TextError};
pub use overlay::{Color, OverlaySession};
pub use recognition::{
    classify, page_text_with_fallback, recognition_supported, PageKind, PageRecognizer,
    IMAGE_LIKE_CHAR_THRESHOLD,
};
pub use search::{search_page, search_page_text, search_text, SearchHit};
pub use text_layer::{extract_page_text, PageText, Quad, TextBlock, TextChar, TextLine};
pub use transform::{Matrix, PageGeometry, Point};
