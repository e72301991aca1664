//! Overlay compositing sessions
//!
//! An [`OverlaySession`] is a single-page, single-use compositing
//! context. Draw calls append operators to a private accumulator and
//! entries to a private resource set; nothing touches the document
//! until [`OverlaySession::end`] commits the whole overlay in one step.
//!
//! The session borrows the document mutably for its entire lifetime and
//! is consumed by `end`, so reuse after commit and concurrent edits of
//! the same page are rejected at compile time.

use std::collections::BTreeMap;

use lopdf::content::{Content, Operation};
use lopdf::{dictionary, Dictionary, Document, Object, ObjectId, Stream, StringFormat};
use tracing::{debug, warn};
use uuid::Uuid;

use crate::document::{is_editable, page_object_id};
use crate::error::{DrawError, OverlayError};
use crate::fonts::{self, BuiltinFont};
use crate::transform::{Matrix, PageGeometry, Point};

/// RGB color for overlay drawing.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Color {
    pub r: u8,
    pub g: u8,
    pub b: u8,
}

impl Color {
    pub const BLACK: Color = Color { r: 0, g: 0, b: 0 };
    pub const WHITE: Color = Color { r: 255, g: 255, b: 255 };
    pub const RED: Color = Color { r: 255, g: 0, b: 0 };

    pub fn new(r: u8, g: u8, b: u8) -> Self {
        Self { r, g, b }
    }

    /// Normalized components for PDF color operators (0-1 range).
    pub fn to_normalized(self) -> (f32, f32, f32) {
        (
            f32::from(self.r) / 255.0,
            f32::from(self.g) / 255.0,
            f32::from(self.b) / 255.0,
        )
    }
}

/// An in-progress overlay on exactly one page of exactly one document.
pub struct OverlaySession<'a> {
    doc: &'a mut Document,
    page_index: u32,
    geometry: PageGeometry,
    ops: Vec<Operation>,
    /// Resource category ("Font", "XObject", "ExtGState") to the
    /// session's private name -> object entries for that category.
    categories: BTreeMap<String, Dictionary>,
    /// Image streams staged by draw calls; they become document objects
    /// only at commit time.
    pending_images: Vec<(String, Stream)>,
    font: Option<&'static BuiltinFont>,
    font_name: Option<String>,
    /// Per-session nonce namespacing every resource name, so two
    /// overlay passes on the same page cannot collide.
    tag: String,
    sequence: u32,
}

impl<'a> OverlaySession<'a> {
    /// Open a compositing session on one page.
    ///
    /// Fails with [`OverlayError::NotEditable`] for documents that
    /// cannot be mutated in place, and [`OverlayError::PageMissing`]
    /// when the index does not resolve. The fallback font chain is
    /// tried here; a session whose chain fails entirely still supports
    /// every non-text draw.
    pub fn begin(doc: &'a mut Document, page_index: u32) -> Result<Self, OverlayError> {
        if !is_editable(doc) {
            return Err(OverlayError::NotEditable("document is encrypted".to_owned()));
        }

        let page_id =
            page_object_id(doc, page_index).ok_or(OverlayError::PageMissing(page_index))?;
        let geometry = PageGeometry::resolve(doc, page_id);

        let font = fonts::resolve_fallback();
        if font.is_none() {
            warn!(page_index, "no fallback font resolved; text draws will fail");
        }

        let tag = Uuid::new_v4().simple().to_string()[..8].to_owned();
        debug!(page_index, %tag, "overlay session opened");

        Ok(Self {
            doc,
            page_index,
            geometry,
            ops: Vec::new(),
            categories: BTreeMap::new(),
            pending_images: Vec::new(),
            font,
            font_name: None,
            tag,
            sequence: 0,
        })
    }

    pub fn page_index(&self) -> u32 {
        self.page_index
    }

    /// Upright view dimensions of the target page, in page units.
    pub fn view_size(&self) -> (f32, f32) {
        (self.geometry.view_width, self.geometry.view_height)
    }

    pub fn has_font(&self) -> bool {
        self.font.is_some()
    }

    /// Stroke a two-point open path.
    pub fn draw_line(
        &mut self,
        from: Point,
        to: Point,
        thickness: f32,
        color: Color,
        alpha: f32,
    ) -> Result<(), DrawError> {
        let state = self.alpha_state(alpha);
        let from = self.geometry.view_to_native.apply(from);
        let to = self.geometry.view_to_native.apply(to);

        self.begin_graphics(&state);
        self.set_stroke(color, thickness);
        self.push_point("m", from);
        self.push_point("l", to);
        self.push("S", vec![]);
        self.end_graphics();
        Ok(())
    }

    /// Draw a closed four-point path; `filled` selects fill over stroke.
    #[allow(clippy::too_many_arguments)]
    pub fn draw_rect(
        &mut self,
        origin: Point,
        width: f32,
        height: f32,
        thickness: f32,
        color: Color,
        alpha: f32,
        filled: bool,
    ) -> Result<(), DrawError> {
        let state = self.alpha_state(alpha);
        // The page may be rotated, so the rectangle is emitted as an
        // explicit path rather than an `re` operator.
        let corners = [
            Point::new(origin.x, origin.y),
            Point::new(origin.x + width, origin.y),
            Point::new(origin.x + width, origin.y + height),
            Point::new(origin.x, origin.y + height),
        ]
        .map(|p| self.geometry.view_to_native.apply(p));

        self.begin_graphics(&state);
        if filled {
            self.set_fill(color);
        } else {
            self.set_stroke(color, thickness);
        }
        self.push_path(&corners);
        self.push(if filled { "f" } else { "s" }, vec![]);
        self.end_graphics();
        Ok(())
    }

    /// Fill a closed polygon with the non-zero rule. Fewer than three
    /// points is a silent no-op.
    pub fn draw_polygon(
        &mut self,
        points: &[Point],
        color: Color,
        alpha: f32,
    ) -> Result<(), DrawError> {
        if points.len() < 3 {
            debug!(count = points.len(), "polygon with fewer than 3 points ignored");
            return Ok(());
        }
        let state = self.alpha_state(alpha);
        let native: Vec<Point> =
            points.iter().map(|p| self.geometry.view_to_native.apply(*p)).collect();

        self.begin_graphics(&state);
        self.set_fill(color);
        self.push_path(&native);
        self.push("f", vec![]);
        self.end_graphics();
        Ok(())
    }

    /// Fill several sub-paths as one even-odd path, so a sub-path fully
    /// inside another cuts a hole instead of painting twice. Sub-paths
    /// with fewer than three points are skipped independently.
    pub fn draw_complex_polygon(
        &mut self,
        sub_paths: &[Vec<Point>],
        color: Color,
        alpha: f32,
    ) -> Result<(), DrawError> {
        let valid: Vec<&Vec<Point>> = sub_paths.iter().filter(|path| path.len() >= 3).collect();
        if valid.is_empty() {
            debug!("complex polygon with no usable sub-paths ignored");
            return Ok(());
        }

        let state = self.alpha_state(alpha);
        let native: Vec<Vec<Point>> = valid
            .iter()
            .map(|path| path.iter().map(|p| self.geometry.view_to_native.apply(*p)).collect())
            .collect();

        self.begin_graphics(&state);
        self.set_fill(color);
        for path in &native {
            self.push_path(path);
        }
        self.push("f*", vec![]);
        self.end_graphics();
        Ok(())
    }

    /// Decode a raster payload and place it into the given view-space
    /// rectangle. The image becomes a document-owned XObject at commit.
    pub fn draw_image(
        &mut self,
        data: &[u8],
        origin: Point,
        width: f32,
        height: f32,
        alpha: f32,
    ) -> Result<(), DrawError> {
        let decoded = image::load_from_memory(data)?;
        let rgb = decoded.to_rgb8();
        let (pixel_width, pixel_height) = rgb.dimensions();

        let name = self.next_name("X");
        let dict = dictionary! {
            "Type" => "XObject",
            "Subtype" => "Image",
            "Width" => pixel_width as i64,
            "Height" => pixel_height as i64,
            "ColorSpace" => "DeviceRGB",
            "BitsPerComponent" => 8,
        };
        self.pending_images.push((name.clone(), Stream::new(dict, rgb.into_raw())));

        // The image operator maps the unit square with the top sample
        // row at y = 1; view space is Y-down, so the unit square is
        // flipped once before scaling to the target rectangle.
        let placement = Matrix::new(1.0, 0.0, 0.0, -1.0, 0.0, 1.0)
            .then(&Matrix::scaling(width, height))
            .then(&Matrix::translation(origin.x, origin.y))
            .then(&self.geometry.view_to_native);

        let state = self.alpha_state(alpha);
        self.begin_graphics(&state);
        self.push("cm", placement.to_operands());
        self.push("Do", vec![Object::Name(name.into_bytes())]);
        self.end_graphics();
        Ok(())
    }

    /// Place a text run with its baseline origin at the given view
    /// point. Fails with [`DrawError::FontUnavailable`] when the whole
    /// fallback chain failed at `begin`.
    pub fn draw_text(
        &mut self,
        origin: Point,
        text: &str,
        size: f32,
        color: Color,
    ) -> Result<(), DrawError> {
        let Some(font) = self.font else {
            return Err(DrawError::FontUnavailable);
        };

        let font_name = match &self.font_name {
            Some(name) => name.clone(),
            None => {
                let name = self.next_name("F");
                self.category_mut("Font")
                    .set(name.clone(), Object::Dictionary(font.resource_dictionary()));
                self.font_name = Some(name.clone());
                name
            }
        };

        // The session transform already flips Y once on the way to
        // native space; the run flips once more locally so the two
        // cancel and glyphs come out upright.
        let run = Matrix::scaling(size, -size)
            .then(&Matrix::translation(origin.x, origin.y))
            .then(&self.geometry.view_to_native);

        let (r, g, b) = color.to_normalized();
        self.push("q", vec![]);
        self.push("rg", vec![r.into(), g.into(), b.into()]);
        self.push("BT", vec![]);
        self.push("Tf", vec![Object::Name(font_name.into_bytes()), Object::Real(1.0)]);
        self.push("Tm", run.to_operands());
        self.push(
            "Tj",
            vec![Object::String(text.as_bytes().to_vec(), StringFormat::Literal)],
        );
        self.push("ET", vec![]);
        self.push("Q", vec![]);
        Ok(())
    }

    /// Advance width of a text run at the given size. Pure; never
    /// mutates anything. Returns 0.0 for an empty string or a session
    /// without a resolved font.
    pub fn measure_text(&self, text: &str, size: f32) -> f32 {
        match self.font {
            Some(font) => font.string_width(text, size),
            None => 0.0,
        }
    }

    /// Commit the overlay into the target page and consume the session.
    ///
    /// Everything fallible runs before the first document mutation, so
    /// any failure leaves the page exactly as it was. Session-owned
    /// state is released unconditionally on every path (the session is
    /// consumed by value).
    pub fn end(self) -> Result<(), OverlayError> {
        let OverlaySession { doc, page_index, ops, mut categories, pending_images, tag, .. } =
            self;

        let operation_count = ops.len();
        let encoded = Content { operations: ops }.encode()?;
        let page_id =
            page_object_id(doc, page_index).ok_or(OverlayError::PageMissing(page_index))?;

        // Staged image streams become document objects only now.
        if !pending_images.is_empty() {
            let xobjects = categories.entry("XObject".to_owned()).or_insert_with(Dictionary::new);
            for (name, stream) in pending_images {
                let id = doc.add_object(Object::Stream(stream));
                xobjects.set(name, Object::Reference(id));
            }
        }

        let content_id = doc.add_object(Object::Stream(Stream::new(dictionary! {}, encoded)));

        merge_resources(doc, page_id, categories)?;
        append_content(doc, page_id, content_id)?;

        debug!(page_index, %tag, operation_count, "overlay committed");
        Ok(())
    }
}

// Operator plumbing.
impl OverlaySession<'_> {
    fn push(&mut self, operator: &str, operands: Vec<Object>) {
        self.ops.push(Operation::new(operator, operands));
    }

    fn push_point(&mut self, operator: &str, p: Point) {
        self.push(operator, vec![Object::Real(p.x), Object::Real(p.y)]);
    }

    /// Emit one closed sub-path from already-native points.
    fn push_path(&mut self, points: &[Point]) {
        let Some((first, rest)) = points.split_first() else {
            return;
        };
        self.push_point("m", *first);
        for point in rest {
            self.push_point("l", *point);
        }
        self.push("h", vec![]);
    }

    fn begin_graphics(&mut self, state_name: &str) {
        self.push("q", vec![]);
        self.push("gs", vec![Object::Name(state_name.as_bytes().to_vec())]);
    }

    fn end_graphics(&mut self) {
        self.push("Q", vec![]);
    }

    fn set_stroke(&mut self, color: Color, thickness: f32) {
        let (r, g, b) = color.to_normalized();
        self.push("RG", vec![r.into(), g.into(), b.into()]);
        self.push("w", vec![thickness.into()]);
    }

    fn set_fill(&mut self, color: Color) {
        let (r, g, b) = color.to_normalized();
        self.push("rg", vec![r.into(), g.into(), b.into()]);
    }

    fn next_name(&mut self, kind: &str) -> String {
        let name = format!("OV{}{}{}", self.tag, kind, self.sequence);
        self.sequence += 1;
        name
    }

    fn category_mut(&mut self, category: &str) -> &mut Dictionary {
        self.categories.entry(category.to_owned()).or_insert_with(Dictionary::new)
    }

    /// Register an ExtGState entry carrying stroke and fill alpha and
    /// return its resource name.
    fn alpha_state(&mut self, alpha: f32) -> String {
        let alpha = alpha.clamp(0.0, 1.0);
        let name = self.next_name("G");
        let state = dictionary! {
            "Type" => "ExtGState",
            "CA" => alpha,
            "ca" => alpha,
        };
        self.category_mut("ExtGState").set(name.clone(), Object::Dictionary(state));
        name
    }
}

/// Where a page keeps its resource dictionary.
enum ResourceTarget {
    /// Directly inside the page dictionary.
    Page,
    /// Behind an indirect reference.
    Object(ObjectId),
}

/// Merge the session's private resources into the page, category by
/// category. Entries within a category overwrite same-named entries
/// (names are session-namespaced, so collisions only involve other
/// overlay passes); pre-existing categories and entries are never
/// dropped.
fn merge_resources(
    doc: &mut Document,
    page_id: ObjectId,
    categories: BTreeMap<String, Dictionary>,
) -> Result<(), OverlayError> {
    if categories.is_empty() {
        return Ok(());
    }

    let probed = {
        let page = doc.get_dictionary(page_id)?;
        match page.get(b"Resources") {
            Ok(Object::Reference(id)) => Some(ResourceTarget::Object(*id)),
            Ok(_) => Some(ResourceTarget::Page),
            Err(_) => None,
        }
    };
    let target = match probed {
        Some(target) => target,
        None => {
            doc.get_object_mut(page_id)?
                .as_dict_mut()?
                .set("Resources", Object::Dictionary(Dictionary::new()));
            ResourceTarget::Page
        }
    };

    for (category, additions) in categories {
        // An existing category may itself live behind a reference;
        // resolve that before deciding how to merge.
        let existing_ref = {
            let resources = resources_dict(doc, page_id, &target)?;
            match resources.get(category.as_bytes()) {
                Ok(Object::Reference(id)) => Some(*id),
                _ => None,
            }
        };

        if let Some(id) = existing_ref {
            let existing = doc.get_object_mut(id)?.as_dict_mut()?;
            for (name, value) in additions.iter() {
                existing.set(name.clone(), value.clone());
            }
            continue;
        }

        let resources = resources_dict_mut(doc, page_id, &target)?;
        let merged_in_place = match resources.get_mut(category.as_bytes()) {
            Ok(Object::Dictionary(existing)) => {
                for (name, value) in additions.iter() {
                    existing.set(name.clone(), value.clone());
                }
                true
            }
            _ => false,
        };
        if !merged_in_place {
            resources.set(category.as_bytes().to_vec(), Object::Dictionary(additions));
        }
    }

    Ok(())
}

fn resources_dict<'a>(
    doc: &'a Document,
    page_id: ObjectId,
    target: &ResourceTarget,
) -> Result<&'a Dictionary, lopdf::Error> {
    match target {
        ResourceTarget::Page => doc.get_dictionary(page_id)?.get(b"Resources")?.as_dict(),
        ResourceTarget::Object(id) => doc.get_object(*id)?.as_dict(),
    }
}

fn resources_dict_mut<'a>(
    doc: &'a mut Document,
    page_id: ObjectId,
    target: &ResourceTarget,
) -> Result<&'a mut Dictionary, lopdf::Error> {
    match target {
        ResourceTarget::Page => doc
            .get_object_mut(page_id)?
            .as_dict_mut()?
            .get_mut(b"Resources")?
            .as_dict_mut(),
        ResourceTarget::Object(id) => doc.get_object_mut(*id)?.as_dict_mut(),
    }
}

/// How the page currently stores its content.
enum ContentShape {
    Empty,
    DirectArray,
    ArrayBehindRef(ObjectId),
    SingleStream(ObjectId),
    InlineStream,
}

/// Append the overlay stream after every pre-existing content entry,
/// so the overlay always renders on top of the original page content.
fn append_content(
    doc: &mut Document,
    page_id: ObjectId,
    content_id: ObjectId,
) -> Result<(), OverlayError> {
    let shape = {
        let page = doc.get_dictionary(page_id)?;
        match page.get(b"Contents") {
            Err(_) => ContentShape::Empty,
            Ok(Object::Array(_)) => ContentShape::DirectArray,
            Ok(Object::Reference(id)) => match doc.get_object(*id) {
                Ok(Object::Array(_)) => ContentShape::ArrayBehindRef(*id),
                _ => ContentShape::SingleStream(*id),
            },
            Ok(Object::Stream(_)) => ContentShape::InlineStream,
            Ok(_) => ContentShape::Empty,
        }
    };

    match shape {
        ContentShape::Empty => {
            doc.get_object_mut(page_id)?
                .as_dict_mut()?
                .set("Contents", Object::Reference(content_id));
        }
        ContentShape::DirectArray => {
            doc.get_object_mut(page_id)?
                .as_dict_mut()?
                .get_mut(b"Contents")?
                .as_array_mut()?
                .push(Object::Reference(content_id));
        }
        ContentShape::ArrayBehindRef(id) => {
            doc.get_object_mut(id)?.as_array_mut()?.push(Object::Reference(content_id));
        }
        ContentShape::SingleStream(id) => {
            doc.get_object_mut(page_id)?.as_dict_mut()?.set(
                "Contents",
                Object::Array(vec![Object::Reference(id), Object::Reference(content_id)]),
            );
        }
        ContentShape::InlineStream => {
            // Hoist the inline stream into its own object first so the
            // original keeps rendering before the overlay.
            let taken = doc.get_object_mut(page_id)?.as_dict_mut()?.remove(b"Contents");
            let Some(existing) = taken else {
                return Err(OverlayError::PageMissing(0));
            };
            let existing_id = doc.add_object(existing);
            doc.get_object_mut(page_id)?.as_dict_mut()?.set(
                "Contents",
                Object::Array(vec![
                    Object::Reference(existing_id),
                    Object::Reference(content_id),
                ]),
            );
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn single_page_doc() -> (Document, ObjectId) {
        let mut doc = Document::with_version("1.7");
        let page_id = doc.add_object(dictionary! {
            "Type" => "Page",
            "MediaBox" => vec![0.into(), 0.into(), 612.into(), 792.into()],
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
        (doc, page_id)
    }

    fn operators(session: &OverlaySession<'_>) -> Vec<String> {
        session.ops.iter().map(|op| op.operator.clone()).collect()
    }

    #[test]
    fn begin_rejects_encrypted_documents() {
        let (mut doc, _) = single_page_doc();
        doc.trailer.set("Encrypt", Object::Reference((99, 0)));

        let err = OverlaySession::begin(&mut doc, 0).err().expect("begin should fail");
        assert!(matches!(err, OverlayError::NotEditable(_)));
    }

    #[test]
    fn begin_rejects_out_of_range_page() {
        let (mut doc, _) = single_page_doc();
        let err = OverlaySession::begin(&mut doc, 7).err().expect("begin should fail");
        assert!(matches!(err, OverlayError::PageMissing(7)));
    }

    #[test]
    fn polygon_below_three_points_is_a_silent_no_op() {
        let (mut doc, _) = single_page_doc();
        let mut session = OverlaySession::begin(&mut doc, 0).expect("begin");

        session
            .draw_polygon(&[Point::new(0.0, 0.0), Point::new(10.0, 0.0)], Color::RED, 1.0)
            .expect("short polygon should not error");
        assert!(session.ops.is_empty());
        assert!(session.categories.is_empty());
    }

    #[test]
    fn complex_polygon_uses_even_odd_fill() {
        let (mut doc, _) = single_page_doc();
        let mut session = OverlaySession::begin(&mut doc, 0).expect("begin");

        let outer = vec![
            Point::new(0.0, 0.0),
            Point::new(100.0, 0.0),
            Point::new(100.0, 100.0),
            Point::new(0.0, 100.0),
        ];
        let hole = vec![
            Point::new(25.0, 25.0),
            Point::new(75.0, 25.0),
            Point::new(75.0, 75.0),
            Point::new(25.0, 75.0),
        ];
        let degenerate = vec![Point::new(1.0, 1.0)];

        session
            .draw_complex_polygon(&[outer, degenerate, hole], Color::BLACK, 1.0)
            .expect("draw");

        let ops = operators(&session);
        assert_eq!(ops.iter().filter(|op| op.as_str() == "f*").count(), 1);
        // Two usable sub-paths: two move-tos, two closes, one fill.
        assert_eq!(ops.iter().filter(|op| op.as_str() == "m").count(), 2);
        assert_eq!(ops.iter().filter(|op| op.as_str() == "h").count(), 2);
        assert!(!ops.contains(&"f".to_owned()));
    }

    #[test]
    fn rect_fill_and_stroke_are_mutually_exclusive() {
        let (mut doc, _) = single_page_doc();
        let mut session = OverlaySession::begin(&mut doc, 0).expect("begin");

        session
            .draw_rect(Point::new(10.0, 10.0), 50.0, 20.0, 1.0, Color::RED, 1.0, true)
            .expect("filled rect");
        let filled_ops = operators(&session);
        assert!(filled_ops.contains(&"f".to_owned()));
        assert!(!filled_ops.contains(&"s".to_owned()));

        session
            .draw_rect(Point::new(10.0, 40.0), 50.0, 20.0, 1.0, Color::RED, 1.0, false)
            .expect("stroked rect");
        let all_ops = operators(&session);
        assert!(all_ops.contains(&"s".to_owned()));
    }

    #[test]
    fn text_requires_a_resolved_font_and_registers_it_once() {
        let (mut doc, _) = single_page_doc();
        let mut session = OverlaySession::begin(&mut doc, 0).expect("begin");
        assert!(session.has_font());

        session.draw_text(Point::new(10.0, 20.0), "first", 12.0, Color::BLACK).expect("text");
        session.draw_text(Point::new(10.0, 40.0), "second", 12.0, Color::BLACK).expect("text");

        let fonts = session.categories.get("Font").expect("font category");
        assert_eq!(fonts.len(), 1);
    }

    #[test]
    fn text_run_matrix_flips_vertically() {
        let (mut doc, _) = single_page_doc();
        let mut session = OverlaySession::begin(&mut doc, 0).expect("begin");
        session.draw_text(Point::new(0.0, 0.0), "x", 10.0, Color::BLACK).expect("text");

        let tm = session
            .ops
            .iter()
            .find(|op| op.operator == "Tm")
            .expect("Tm operator");
        // Local (+size, -size) flip composed with the session's Y-flip
        // yields an upright run: positive d component in native space.
        let d = match tm.operands[3] {
            Object::Real(v) => v,
            _ => panic!("Tm operand should be numeric"),
        };
        assert!(d > 0.0, "text must render upright, got d={d}");
    }

    #[test]
    fn measure_text_is_zero_for_empty_and_monotonic() {
        let (mut doc, _) = single_page_doc();
        let session = OverlaySession::begin(&mut doc, 0).expect("begin");

        assert_eq!(session.measure_text("", 12.0), 0.0);
        let short = session.measure_text("ab", 12.0);
        let long = session.measure_text("abc", 12.0);
        assert!(short > 0.0);
        assert!(long > short);
    }

    #[test]
    fn draw_error_does_not_invalidate_the_session() {
        let (mut doc, _) = single_page_doc();
        let mut session = OverlaySession::begin(&mut doc, 0).expect("begin");

        let err = session
            .draw_image(b"not an image", Point::new(0.0, 0.0), 10.0, 10.0, 1.0)
            .err()
            .expect("bogus payload should fail");
        assert!(matches!(err, DrawError::ImageDecode(_)));

        // The failed call left no partial operators behind and the
        // session keeps accepting draws.
        assert!(session.ops.iter().all(|op| op.operator != "Do"));
        session
            .draw_line(Point::new(0.0, 0.0), Point::new(5.0, 5.0), 1.0, Color::BLACK, 1.0)
            .expect("session still usable");
        session.end().expect("commit");
    }
}
