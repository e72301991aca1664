//! Page coordinate transforms
//!
//! Maps between a page's native coordinate space (Y-up, possibly rotated
//! and offset by its crop boundary) and the upright view space callers
//! draw in (top-left origin, Y-down, unscaled page units).

use crate::document::inherited_page_attr;
use lopdf::{Document, Object, ObjectId};

/// A point in either native or view coordinates.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct Point {
    pub x: f32,
    pub y: f32,
}

impl Point {
    pub fn new(x: f32, y: f32) -> Self {
        Self { x, y }
    }
}

/// 2x3 affine matrix in PDF operand order (a b c d e f).
///
/// A point maps as `x' = a*x + c*y + e`, `y' = b*x + d*y + f`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Matrix {
    pub a: f32,
    pub b: f32,
    pub c: f32,
    pub d: f32,
    pub e: f32,
    pub f: f32,
}

impl Matrix {
    pub const IDENTITY: Matrix = Matrix { a: 1.0, b: 0.0, c: 0.0, d: 1.0, e: 0.0, f: 0.0 };

    pub fn new(a: f32, b: f32, c: f32, d: f32, e: f32, f: f32) -> Self {
        Self { a, b, c, d, e, f }
    }

    pub fn translation(tx: f32, ty: f32) -> Self {
        Self::new(1.0, 0.0, 0.0, 1.0, tx, ty)
    }

    pub fn scaling(sx: f32, sy: f32) -> Self {
        Self::new(sx, 0.0, 0.0, sy, 0.0, 0.0)
    }

    /// Compose `self` with `after`: the result applies `self` first,
    /// then `after` (row-vector convention, same as the PDF `cm` operator).
    pub fn then(&self, after: &Matrix) -> Matrix {
        Matrix {
            a: self.a * after.a + self.b * after.c,
            b: self.a * after.b + self.b * after.d,
            c: self.c * after.a + self.d * after.c,
            d: self.c * after.b + self.d * after.d,
            e: self.e * after.a + self.f * after.c + after.e,
            f: self.e * after.b + self.f * after.d + after.f,
        }
    }

    pub fn apply(&self, p: Point) -> Point {
        Point {
            x: self.a * p.x + self.c * p.y + self.e,
            y: self.b * p.x + self.d * p.y + self.f,
        }
    }

    /// Exact inverse. Returns `None` for a singular matrix.
    pub fn inverse(&self) -> Option<Matrix> {
        let det = self.a * self.d - self.b * self.c;
        if det.abs() < f32::EPSILON {
            return None;
        }
        let inv_det = 1.0 / det;
        Some(Matrix {
            a: self.d * inv_det,
            b: -self.b * inv_det,
            c: -self.c * inv_det,
            d: self.a * inv_det,
            e: (self.c * self.f - self.d * self.e) * inv_det,
            f: (self.b * self.e - self.a * self.f) * inv_det,
        })
    }

    /// Operand list for a `cm` or `Tm` operator.
    pub fn to_operands(&self) -> Vec<Object> {
        vec![
            Object::Real(self.a),
            Object::Real(self.b),
            Object::Real(self.c),
            Object::Real(self.d),
            Object::Real(self.e),
            Object::Real(self.f),
        ]
    }
}

/// Resolved transform pair for one page.
#[derive(Debug, Clone, Copy)]
pub struct PageGeometry {
    /// Width of the upright view in page units.
    pub view_width: f32,
    /// Height of the upright view in page units.
    pub view_height: f32,
    /// Native page space to view space.
    pub native_to_view: Matrix,
    /// View space back to native page space. Always the exact inverse
    /// of `native_to_view`.
    pub view_to_native: Matrix,
}

impl PageGeometry {
    /// Resolve the transform for a page from its effective boundary
    /// (`CropBox` falling back to `MediaBox`) and `/Rotate` entry, both
    /// honoring page-tree inheritance.
    ///
    /// There is no error path: a degenerate boundary still yields a
    /// well-defined matrix pair; callers reject degenerate pages upstream.
    pub fn resolve(doc: &Document, page_id: ObjectId) -> PageGeometry {
        let (x0, y0, x1, y1) = effective_boundary(doc, page_id);
        let rotation = effective_rotation(doc, page_id);
        let width = x1 - x0;
        let height = y1 - y0;

        // Viewport construction at scale 1: rotate the page upright,
        // flip Y so view space is top-left-origin Y-down, and shift the
        // boundary origin to (0, 0).
        let (native_to_view, view_width, view_height) = match rotation {
            90 => (Matrix::new(0.0, 1.0, 1.0, 0.0, -y0, -x0), height, width),
            180 => (Matrix::new(-1.0, 0.0, 0.0, 1.0, x1, -y0), width, height),
            270 => (Matrix::new(0.0, -1.0, -1.0, 0.0, y1, x1), height, width),
            _ => (Matrix::new(1.0, 0.0, 0.0, -1.0, -x0, y1), width, height),
        };

        // The rotation component of every arm above has determinant -1,
        // so the inverse always exists.
        let view_to_native = native_to_view.inverse().unwrap_or(Matrix::IDENTITY);

        PageGeometry { view_width, view_height, native_to_view, view_to_native }
    }
}

/// US-Letter fallback when a page carries no boundary at all.
const DEFAULT_BOUNDARY: (f32, f32, f32, f32) = (0.0, 0.0, 612.0, 792.0);

fn effective_boundary(doc: &Document, page_id: ObjectId) -> (f32, f32, f32, f32) {
    let rect = inherited_page_attr(doc, page_id, b"CropBox")
        .or_else(|| inherited_page_attr(doc, page_id, b"MediaBox"));

    let Some(rect) = rect else {
        return DEFAULT_BOUNDARY;
    };

    let values: Option<Vec<f32>> = rect
        .as_array()
        .ok()
        .filter(|array| array.len() == 4)
        .map(|array| array.iter().filter_map(|v| v.as_float().ok()).collect());

    match values.as_deref() {
        Some([x0, y0, x1, y1]) => (x0.min(*x1), y0.min(*y1), x0.max(*x1), y0.max(*y1)),
        _ => DEFAULT_BOUNDARY,
    }
}

fn effective_rotation(doc: &Document, page_id: ObjectId) -> i64 {
    let rotation = inherited_page_attr(doc, page_id, b"Rotate")
        .and_then(|obj| obj.as_i64().ok())
        .unwrap_or(0);

    // Normalize to one of the four legal values; anything else in the
    // wild is treated as unrotated.
    match rotation.rem_euclid(360) {
        90 => 90,
        180 => 180,
        270 => 270,
        _ => 0,
    }
}
