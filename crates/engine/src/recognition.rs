//! Density-gated recognition fallback
//!
//! Scanned construction sheets often carry no text layer at all, or
//! only a sparse one (title block stamps on an otherwise rasterized
//! page). Pages are classified by visible character density; image-like
//! pages are handed to an injected [`PageRecognizer`] whose output
//! replaces the native text wholesale.
//!
//! The pipeline fails closed: a recognizer error yields empty page text
//! rather than silently falling back to the sparse native layer, so a
//! miss is never mistaken for a verified absence.

use lopdf::Document;
use tracing::{debug, warn};

use crate::error::{RecognitionError, TextError};
use crate::text_layer::{extract_page_text, PageText};

/// Visible-character count below which a page is treated as image-like.
pub const IMAGE_LIKE_CHAR_THRESHOLD: usize = 100;

/// Density classification of one page's native text layer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PageKind {
    /// Enough native text to trust the text layer as-is.
    TextLike,
    /// Too little native text; the page content is likely rasterized.
    ImageLike,
}

/// Classify a page by its visible character density. Exactly the
/// threshold counts as text-like.
pub fn classify(page_text: &PageText) -> PageKind {
    if page_text.visible_char_count() < IMAGE_LIKE_CHAR_THRESHOLD {
        PageKind::ImageLike
    } else {
        PageKind::TextLike
    }
}

/// A recognition backend that can produce positioned text for one page.
///
/// Implementations rasterize the page and run character recognition
/// over the pixels; quads in the returned [`PageText`] must be in
/// native page space, same as extracted text.
pub trait PageRecognizer {
    fn recognize(&self, doc: &Document, page_index: u32) -> Result<PageText, RecognitionError>;
}

/// Whether this build carries a recognition backend.
pub fn recognition_supported() -> bool {
    cfg!(feature = "ocr")
}

/// Structured text for one page, routing image-like pages through the
/// recognizer when one is supplied.
///
/// Without a recognizer the sparse native text is returned unchanged.
/// With one, its output replaces the native text entirely, and a
/// recognizer failure degrades the page to empty text.
pub fn page_text_with_fallback(
    doc: &Document,
    page_index: u32,
    recognizer: Option<&dyn PageRecognizer>,
) -> Result<PageText, TextError> {
    let native = extract_page_text(doc, page_index)?;
    if classify(&native) == PageKind::TextLike {
        return Ok(native);
    }

    let Some(recognizer) = recognizer else {
        debug!(page_index, "image-like page, no recognizer configured");
        return Ok(native);
    };

    match recognizer.recognize(doc, page_index) {
        Ok(recognized) => {
            debug!(page_index, chars = recognized.char_count(), "recognition replaced page text");
            Ok(recognized)
        }
        Err(error) => {
            warn!(page_index, %error, "recognition failed, degrading page to empty text");
            Ok(PageText::default())
        }
    }
}

/// Recognition backend over `pdfium` rasterization and the `ocrs`
/// engine, available with the `ocr` feature.
#[cfg(feature = "ocr")]
pub mod ocr {
    use std::path::Path;

    use lopdf::Document;
    use ocrs::{DecodeMethod, ImageSource, OcrEngine, OcrEngineParams, TextItem};
    use pdfium_render::prelude::*;
    use rten::Model;
    use tracing::debug;

    use super::PageRecognizer;
    use crate::document::page_object_id;
    use crate::error::RecognitionError;
    use crate::text_layer::{PageText, Quad, TextBlock, TextChar, TextLine};
    use crate::transform::{PageGeometry, Point};

    /// Raster scale used for recognition renders, relative to page units.
    const RENDER_SCALE: f32 = 2.0;

    pub struct OcrsRecognizer {
        engine: OcrEngine,
        pdfium: Pdfium,
    }

    impl OcrsRecognizer {
        /// Build a recognizer from `.rten` model files and the system
        /// pdfium library.
        pub fn new(
            detection_model: &Path,
            recognition_model: &Path,
        ) -> Result<Self, RecognitionError> {
            let detection = Model::load_file(detection_model)
                .map_err(|e| RecognitionError::Engine(e.to_string()))?;
            let recognition = Model::load_file(recognition_model)
                .map_err(|e| RecognitionError::Engine(e.to_string()))?;

            let engine = OcrEngine::new(OcrEngineParams {
                detection_model: Some(detection),
                recognition_model: Some(recognition),
                alphabet: None,
                decode_method: DecodeMethod::Greedy,
                debug: false,
            })
            .map_err(|e| RecognitionError::Engine(e.to_string()))?;

            let pdfium = Pdfium::new(
                Pdfium::bind_to_system_library()
                    .map_err(|e| RecognitionError::Render(format!("pdfium unavailable: {e}")))?,
            );

            Ok(Self { engine, pdfium })
        }
    }

    impl PageRecognizer for OcrsRecognizer {
        fn recognize(
            &self,
            doc: &Document,
            page_index: u32,
        ) -> Result<PageText, RecognitionError> {
            let page_id = page_object_id(doc, page_index)
                .ok_or_else(|| RecognitionError::Render(format!("page {page_index} missing")))?;
            let geometry = PageGeometry::resolve(doc, page_id);

            // pdfium renders from serialized bytes; the lopdf graph has
            // to round-trip through a save.
            let mut bytes = Vec::new();
            let mut copy = doc.clone();
            copy.save_to(&mut bytes)
                .map_err(|e| RecognitionError::Render(e.to_string()))?;

            let rendered = self
                .pdfium
                .load_pdf_from_byte_slice(&bytes, None)
                .map_err(|e| RecognitionError::Render(e.to_string()))?;
            let page = rendered
                .pages()
                .get(page_index as u16)
                .map_err(|e| RecognitionError::Render(e.to_string()))?;

            let pixel_width = (geometry.view_width * RENDER_SCALE) as i32;
            let pixel_height = (geometry.view_height * RENDER_SCALE) as i32;
            let bitmap = page
                .render_with_config(
                    &PdfRenderConfig::new().set_target_size(pixel_width, pixel_height),
                )
                .map_err(|e| RecognitionError::Render(e.to_string()))?;
            let raster = bitmap.as_image().to_rgb8();
            let (raster_width, raster_height) = raster.dimensions();

            let source = ImageSource::from_bytes(raster.as_raw(), raster.dimensions())
                .map_err(|e| RecognitionError::Engine(e.to_string()))?;
            let input = self
                .engine
                .prepare_input(source)
                .map_err(|e| RecognitionError::Engine(e.to_string()))?;

            let word_rects = self
                .engine
                .detect_words(&input)
                .map_err(|e| RecognitionError::Engine(e.to_string()))?;
            let line_rects = self.engine.find_text_lines(&input, &word_rects);
            let recognized = self
                .engine
                .recognize_text(&input, &line_rects)
                .map_err(|e| RecognitionError::Engine(e.to_string()))?;

            // Raster pixels back to native page space: undo the render
            // scale into view units, then apply the view transform.
            let scale_x = geometry.view_width / raster_width as f32;
            let scale_y = geometry.view_height / raster_height as f32;
            let to_native = |px: f32, py: f32| {
                geometry.view_to_native.apply(Point::new(px * scale_x, py * scale_y))
            };

            let mut lines = Vec::new();
            for line in recognized.into_iter().flatten() {
                let text = line.to_string();
                if text.trim().is_empty() {
                    continue;
                }
                let rect = line.rotated_rect().bounding_rect();
                let corners = [
                    to_native(rect.left(), rect.top()),
                    to_native(rect.right(), rect.top()),
                    to_native(rect.right(), rect.bottom()),
                    to_native(rect.left(), rect.bottom()),
                ];
                let line_quad = Quad::enclosing(&corners);

                // Recognition yields line-level geometry; char quads are
                // an even horizontal split of the line box.
                let count = text.chars().count();
                let step = (line_quad.max_x - line_quad.min_x) / count as f32;
                let chars = text
                    .chars()
                    .enumerate()
                    .map(|(i, code)| TextChar {
                        code,
                        quad: Quad::new(
                            line_quad.min_x + step * i as f32,
                            line_quad.min_y,
                            line_quad.min_x + step * (i + 1) as f32,
                            line_quad.max_y,
                        ),
                    })
                    .collect();
                lines.push(TextLine { chars });
            }

            debug!(page_index, lines = lines.len(), "recognition pass complete");
            Ok(PageText { blocks: vec![TextBlock { lines }] })
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::text_layer::{Quad, TextBlock, TextChar, TextLine};

    fn synthetic_page(visible_chars: usize) -> PageText {
        let chars = (0..visible_chars)
            .map(|i| TextChar {
                code: 'x',
                quad: Quad::new(i as f32, 0.0, i as f32 + 1.0, 10.0),
            })
            .collect();
        PageText { blocks: vec![TextBlock { lines: vec![TextLine { chars }] }] }
    }

    struct FixedRecognizer(PageText);

    impl PageRecognizer for FixedRecognizer {
        fn recognize(&self, _: &Document, _: u32) -> Result<PageText, RecognitionError> {
            Ok(self.0.clone())
        }
    }

    struct FailingRecognizer;

    impl PageRecognizer for FailingRecognizer {
        fn recognize(&self, _: &Document, _: u32) -> Result<PageText, RecognitionError> {
            Err(RecognitionError::Engine("model exploded".to_owned()))
        }
    }

    fn one_page_doc_with_text(visible_chars: usize) -> Document {
        use lopdf::content::{Content, Operation};
        use lopdf::{dictionary, Object, Stream, StringFormat};

        let text: String = "x".repeat(visible_chars);
        let operations = vec![
            Operation::new("BT", vec![]),
            Operation::new("Tf", vec![Object::Name(b"F1".to_vec()), Object::Real(12.0)]),
            Operation::new(
                "Td",
                vec![Object::Real(72.0), Object::Real(700.0)],
            ),
            Operation::new(
                "Tj",
                vec![Object::String(text.into_bytes(), StringFormat::Literal)],
            ),
            Operation::new("ET", vec![]),
        ];

        let mut doc = Document::with_version("1.7");
        let encoded = Content { operations }.encode().unwrap();
        let content_id = doc.add_object(Object::Stream(Stream::new(dictionary! {}, encoded)));
        let page_id = doc.add_object(dictionary! {
            "Type" => "Page",
            "MediaBox" => vec![0.into(), 0.into(), 612.into(), 792.into()],
            "Contents" => Object::Reference(content_id),
        });
        let pages_id = doc.add_object(dictionary! {
            "Type" => "Pages",
            "Kids" => vec![Object::Reference(page_id)],
            "Count" => 1,
        });
        if let Ok(page) = doc.get_object_mut(page_id) {
            if let Ok(dict) = page.as_dict_mut() {
                dict.set("Parent", Object::Reference(pages_id));
            }
        }
        let catalog_id = doc.add_object(dictionary! {
            "Type" => "Catalog",
            "Pages" => Object::Reference(pages_id),
        });
        doc.trailer.set("Root", Object::Reference(catalog_id));
        doc
    }

    #[test]
    fn classification_threshold_is_strict() {
        assert_eq!(classify(&synthetic_page(99)), PageKind::ImageLike);
        assert_eq!(classify(&synthetic_page(100)), PageKind::TextLike);
        assert_eq!(classify(&synthetic_page(101)), PageKind::TextLike);
    }

    #[test]
    fn empty_page_is_image_like() {
        assert_eq!(classify(&PageText::default()), PageKind::ImageLike);
    }

    #[test]
    fn text_like_pages_never_invoke_the_recognizer() {
        struct PanickingRecognizer;
        impl PageRecognizer for PanickingRecognizer {
            fn recognize(&self, _: &Document, _: u32) -> Result<PageText, RecognitionError> {
                panic!("recognizer must not run for text-like pages");
            }
        }

        let doc = one_page_doc_with_text(150);
        let text = page_text_with_fallback(&doc, 0, Some(&PanickingRecognizer)).expect("text");
        assert_eq!(text.visible_char_count(), 150);
    }

    #[test]
    fn image_like_page_uses_recognizer_output_wholesale() {
        let doc = one_page_doc_with_text(5);
        let recognized = synthetic_page(40);
        let text = page_text_with_fallback(&doc, 0, Some(&FixedRecognizer(recognized.clone())))
            .expect("text");
        assert_eq!(text, recognized);
    }

    #[test]
    fn recognizer_failure_degrades_to_empty_text() {
        let doc = one_page_doc_with_text(5);
        let text = page_text_with_fallback(&doc, 0, Some(&FailingRecognizer)).expect("text");
        assert!(text.is_empty());
    }

    #[test]
    fn no_recognizer_keeps_sparse_native_text() {
        let doc = one_page_doc_with_text(5);
        let text = page_text_with_fallback(&doc, 0, None).expect("text");
        assert_eq!(text.visible_char_count(), 5);
    }
}
