//! Substring search over a document's text layers
//!
//! Matches are case-sensitive, scoped to a single line (a needle never
//! spans a line break), and reported in document order with the
//! enclosing quadrilateral of the matched characters.

use lopdf::Document;
use tracing::debug;

use crate::document::page_count;
use crate::error::TextError;
use crate::recognition::{page_text_with_fallback, PageRecognizer};
use crate::text_layer::{PageText, Quad};
use crate::transform::Point;

/// One search match.
#[derive(Debug, Clone, PartialEq)]
pub struct SearchHit {
    pub page_index: u32,
    /// The matched text, exactly as it appears on the page.
    pub text: String,
    /// Enclosing box of the matched characters, in native page space.
    pub quad: Quad,
}

impl SearchHit {
    /// Corners in upper-left, upper-right, lower-right, lower-left order.
    pub fn corners(&self) -> [Point; 4] {
        self.quad.corners()
    }
}

/// Search the whole document for a needle, walking pages in order and
/// stopping at `max_results` hits. Image-like pages route through the
/// recognizer when one is supplied.
///
/// An empty needle or a zero cap yields no hits.
pub fn search_text(
    doc: &Document,
    needle: &str,
    max_results: usize,
    recognizer: Option<&dyn PageRecognizer>,
) -> Result<Vec<SearchHit>, TextError> {
    if needle.is_empty() || max_results == 0 {
        return Ok(Vec::new());
    }

    let mut hits = Vec::new();
    for page_index in 0..page_count(doc) {
        let page_text = page_text_with_fallback(doc, page_index, recognizer)?;
        collect_page_hits(&page_text, needle, page_index, max_results, &mut hits);
        if hits.len() >= max_results {
            break;
        }
    }

    debug!(needle, hits = hits.len(), "document search complete");
    Ok(hits)
}

/// Search a single page, chaining extraction, classification and the
/// recognition fallback before matching.
pub fn search_page_text(
    doc: &Document,
    page_index: u32,
    needle: &str,
    max_results: usize,
    recognizer: Option<&dyn PageRecognizer>,
) -> Result<Vec<SearchHit>, TextError> {
    if needle.is_empty() || max_results == 0 {
        return Ok(Vec::new());
    }
    let page_text = page_text_with_fallback(doc, page_index, recognizer)?;
    Ok(search_page(&page_text, needle, page_index, max_results))
}

/// Search one already-extracted page.
pub fn search_page(
    page_text: &PageText,
    needle: &str,
    page_index: u32,
    max_results: usize,
) -> Vec<SearchHit> {
    let mut hits = Vec::new();
    if !needle.is_empty() && max_results > 0 {
        collect_page_hits(page_text, needle, page_index, max_results, &mut hits);
    }
    hits
}

fn collect_page_hits(
    page_text: &PageText,
    needle: &str,
    page_index: u32,
    max_results: usize,
    hits: &mut Vec<SearchHit>,
) {
    let needle_chars: Vec<char> = needle.chars().collect();

    for line in page_text.lines() {
        if hits.len() >= max_results {
            return;
        }
        let chars = &line.chars;
        if chars.len() < needle_chars.len() {
            continue;
        }

        let mut start = 0;
        while start + needle_chars.len() <= chars.len() {
            let window = &chars[start..start + needle_chars.len()];
            let matched = window.iter().zip(&needle_chars).all(|(c, n)| c.code == *n);
            if !matched {
                start += 1;
                continue;
            }

            let quad = window
                .iter()
                .skip(1)
                .fold(window[0].quad, |acc, c| acc.union(&c.quad));
            hits.push(SearchHit {
                page_index,
                text: window.iter().map(|c| c.code).collect(),
                quad,
            });
            if hits.len() >= max_results {
                return;
            }
            // Matches never overlap: resume past the consumed window.
            start += needle_chars.len();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::text_layer::{TextBlock, TextChar, TextLine};

    fn line_of(text: &str, y: f32) -> TextLine {
        let chars = text
            .chars()
            .enumerate()
            .map(|(i, code)| TextChar {
                code,
                quad: Quad::new(i as f32 * 10.0, y, (i + 1) as f32 * 10.0, y + 10.0),
            })
            .collect();
        TextLine { chars }
    }

    fn page_of(lines: Vec<TextLine>) -> PageText {
        PageText { blocks: vec![TextBlock { lines }] }
    }

    #[test]
    fn finds_hits_in_document_order() {
        let page = page_of(vec![line_of("DETAIL A", 100.0), line_of("SEE DETAIL B", 80.0)]);
        let hits = search_page(&page, "DETAIL", 0, 10);

        assert_eq!(hits.len(), 2);
        assert_eq!(hits[0].text, "DETAIL");
        // First hit starts at x = 0, second at the "DETAIL" offset of
        // the second line (char index 4).
        assert_eq!(hits[0].quad.min_x, 0.0);
        assert_eq!(hits[1].quad.min_x, 40.0);
    }

    #[test]
    fn matching_is_case_sensitive() {
        let page = page_of(vec![line_of("Detail detail DETAIL", 0.0)]);
        assert_eq!(search_page(&page, "detail", 0, 10).len(), 1);
    }

    #[test]
    fn matches_never_overlap() {
        let page = page_of(vec![line_of("aaaa", 0.0)]);
        let hits = search_page(&page, "aa", 0, 10);
        assert_eq!(hits.len(), 2);
        assert_eq!(hits[0].quad.min_x, 0.0);
        assert_eq!(hits[1].quad.min_x, 20.0);
    }

    #[test]
    fn needle_does_not_span_lines() {
        let page = page_of(vec![line_of("AB", 20.0), line_of("CD", 0.0)]);
        assert!(search_page(&page, "BC", 0, 10).is_empty());
    }

    #[test]
    fn hit_quad_encloses_all_matched_chars() {
        let page = page_of(vec![line_of("WXYZ", 50.0)]);
        let hits = search_page(&page, "XYZ", 0, 10);

        assert_eq!(hits.len(), 1);
        let quad = hits[0].quad;
        assert_eq!(quad.min_x, 10.0);
        assert_eq!(quad.max_x, 40.0);
        assert_eq!(quad.min_y, 50.0);
        assert_eq!(quad.max_y, 60.0);
    }

    #[test]
    fn corners_come_back_in_clockwise_order_from_upper_left() {
        let page = page_of(vec![line_of("A", 50.0)]);
        let hits = search_page(&page, "A", 0, 10);
        let [ul, ur, lr, ll] = hits[0].corners();

        // Native space is Y-up.
        assert_eq!((ul.x, ul.y), (0.0, 60.0));
        assert_eq!((ur.x, ur.y), (10.0, 60.0));
        assert_eq!((lr.x, lr.y), (10.0, 50.0));
        assert_eq!((ll.x, ll.y), (0.0, 50.0));
    }

    #[test]
    fn result_cap_truncates_and_zero_yields_nothing() {
        let page = page_of(vec![line_of("xx xx xx xx", 0.0)]);
        assert_eq!(search_page(&page, "xx", 0, 3).len(), 3);
        assert!(search_page(&page, "xx", 0, 0).is_empty());
    }

    #[test]
    fn empty_needle_yields_nothing() {
        let page = page_of(vec![line_of("anything", 0.0)]);
        assert!(search_page(&page, "", 0, 10).is_empty());
    }
}
