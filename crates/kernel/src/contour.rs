//! Boundary extraction from a rendered mask.

use imageproc::contours::{BorderType, find_contours};
use serde::{Deserialize, Serialize};
use tracing::{debug, instrument};

use crate::geometry::point::{Point2d, ring_signed_area2};
use crate::mask::Mask;

/// Default intensity threshold: darker pixels are shadow.
pub const DEFAULT_THRESHOLD: u8 = 128;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum BorderKind {
    /// Boundary between background and the outside of a shadow region.
    Outer,
    /// Boundary of a light hole inside a shadow region.
    Hole,
}

/// Closed boundary in mask-pixel coordinates. The closing edge from the last
/// point back to the first is implicit.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Contour {
    points: Vec<Point2d>,
    kind: BorderKind,
}

impl Contour {
    /// A repeated first point at the end of `points` is dropped.
    pub fn new(mut points: Vec<Point2d>, kind: BorderKind) -> Self {
        if points.len() > 1 && points.first() == points.last() {
            points.pop();
        }
        Self { points, kind }
    }

    pub fn points(&self) -> &[Point2d] {
        &self.points
    }

    pub fn kind(&self) -> BorderKind {
        self.kind
    }

    pub fn len(&self) -> usize {
        self.points.len()
    }

    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }

    /// Edges as point pairs, closing edge last.
    pub fn edges(&self) -> impl Iterator<Item = (Point2d, Point2d)> + '_ {
        let n = self.points.len();
        (0..n).map(move |i| (self.points[i], self.points[(i + 1) % n]))
    }

    pub fn perimeter(&self) -> f64 {
        if self.points.len() < 2 {
            return 0.0;
        }
        self.edges().map(|(a, b)| a.distance_to(&b)).sum()
    }

    /// Signed enclosed area in pixel units. Image rows grow downwards, so a ring
    /// that looks clockwise on screen has positive area here.
    pub fn signed_area(&self) -> f64 {
        ring_signed_area2(&self.points) * 0.5
    }

    pub fn area(&self) -> f64 {
        self.signed_area().abs()
    }

    /// The same contour with every coordinate multiplied by `k`.
    pub fn scaled(&self, k: f64) -> Self {
        Self {
            points: self.points.iter().map(|p| p.scaled(k)).collect(),
            kind: self.kind,
        }
    }
}

/// Contours of one mask, longest perimeter first.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ContourSet {
    contours: Vec<Contour>,
}

impl ContourSet {
    /// Contours with fewer than three points are discarded. Order is preserved.
    pub fn new(contours: Vec<Contour>) -> Self {
        Self {
            contours: contours.into_iter().filter(|c| c.len() >= 3).collect(),
        }
    }

    pub fn len(&self) -> usize {
        self.contours.len()
    }

    pub fn is_empty(&self) -> bool {
        self.contours.is_empty()
    }

    pub fn iter(&self) -> std::slice::Iter<'_, Contour> {
        self.contours.iter()
    }

    pub fn get(&self, index: usize) -> Option<&Contour> {
        self.contours.get(index)
    }

    pub fn outer(&self) -> impl Iterator<Item = &Contour> {
        self.contours.iter().filter(|c| c.kind == BorderKind::Outer)
    }
}

impl<'a> IntoIterator for &'a ContourSet {
    type Item = &'a Contour;
    type IntoIter = std::slice::Iter<'a, Contour>;

    fn into_iter(self) -> Self::IntoIter {
        self.contours.iter()
    }
}

/// Trace every shadow boundary in `mask`. Pixels darker than `threshold` are
/// foreground. Contours come back ordered by decreasing perimeter; equal
/// perimeters keep raster discovery order.
#[instrument(skip(mask), fields(width = mask.width(), height = mask.height()))]
pub fn extract(mask: &Mask, threshold: u8) -> ContourSet {
    let foreground = mask.binarize(threshold);
    let traced = find_contours::<u32>(&foreground);

    let contours: Vec<Contour> = traced
        .into_iter()
        .map(|c| {
            let kind = match c.border_type {
                BorderType::Outer => BorderKind::Outer,
                BorderType::Hole => BorderKind::Hole,
            };
            let points = c
                .points
                .iter()
                .map(|p| Point2d::new(f64::from(p.x), f64::from(p.y)))
                .collect();
            Contour::new(points, kind)
        })
        .collect();

    let mut keyed: Vec<(f64, Contour)> = ContourSet::new(contours)
        .contours
        .into_iter()
        .map(|c| (c.perimeter(), c))
        .collect();
    keyed.sort_by(|a, b| b.0.total_cmp(&a.0));

    let set = ContourSet {
        contours: keyed.into_iter().map(|(_, c)| c).collect(),
    };
    debug!(contours = set.len(), "extracted contours");
    set
}

#[cfg(test)]
mod tests {
    use super::*;

    fn square_mask(size: u32, lo: u32, hi: u32) -> Mask {
        Mask::from_fn(size, size, |x, y| {
            if (lo..=hi).contains(&x) && (lo..=hi).contains(&y) { 0 } else { 255 }
        })
    }

    #[test]
    fn test_blank_mask_has_no_contours() {
        let mask = Mask::from_fn(16, 16, |_, _| 255);
        assert!(extract(&mask, DEFAULT_THRESHOLD).is_empty());
    }

    #[test]
    fn test_single_square() {
        let set = extract(&square_mask(20, 5, 14), DEFAULT_THRESHOLD);
        assert_eq!(set.len(), 1);
        let c = set.get(0).unwrap();
        assert_eq!(c.kind(), BorderKind::Outer);
        // Pixel-center boundary of a 10x10 block: a 9x9 square.
        assert!((c.area() - 81.0).abs() < 1e-9);
        assert!((c.perimeter() - 36.0).abs() < 1e-9);
    }

    #[test]
    fn test_ring_yields_hole() {
        let mask = Mask::from_fn(30, 30, |x, y| {
            let outer = (5..25).contains(&x) && (5..25).contains(&y);
            let inner = (10..20).contains(&x) && (10..20).contains(&y);
            if outer && !inner { 0 } else { 255 }
        });
        let set = extract(&mask, DEFAULT_THRESHOLD);
        assert_eq!(set.len(), 2);
        assert_eq!(set.get(0).unwrap().kind(), BorderKind::Outer);
        assert_eq!(set.get(1).unwrap().kind(), BorderKind::Hole);
        assert_eq!(set.outer().count(), 1);
    }

    #[test]
    fn test_tiny_blobs_dropped() {
        // A lone pixel and a two-pixel run trace to fewer than three points.
        let mask = Mask::from_fn(10, 10, |x, y| match (x, y) {
            (2, 2) | (6, 6) | (7, 6) => 0,
            _ => 255,
        });
        assert!(extract(&mask, DEFAULT_THRESHOLD).is_empty());
    }

    #[test]
    fn test_sorted_by_perimeter() {
        let mask = Mask::from_fn(40, 40, |x, y| {
            let small = (2..6).contains(&x) && (2..6).contains(&y);
            let large = (15..35).contains(&x) && (15..35).contains(&y);
            if small || large { 0 } else { 255 }
        });
        let set = extract(&mask, DEFAULT_THRESHOLD);
        assert_eq!(set.len(), 2);
        assert!(set.get(0).unwrap().perimeter() > set.get(1).unwrap().perimeter());
    }

    #[test]
    fn test_equal_perimeters_keep_raster_order() {
        // Same-size squares: the upper one is met first by the row scan even
        // though it sits further right.
        let mask = Mask::from_fn(40, 40, |x, y| {
            let upper = (25..30).contains(&x) && (3..8).contains(&y);
            let lower = (3..8).contains(&x) && (20..25).contains(&y);
            if upper || lower { 0 } else { 255 }
        });
        let set = extract(&mask, DEFAULT_THRESHOLD);
        assert_eq!(set.len(), 2);
        let (first, second) = (set.get(0).unwrap(), set.get(1).unwrap());
        assert_eq!(first.perimeter(), second.perimeter());
        let min_y = |c: &Contour| c.points().iter().map(|p| p.y).fold(f64::INFINITY, f64::min);
        assert_eq!(min_y(first), 3.0);
        assert_eq!(min_y(second), 20.0);
    }

    #[test]
    fn test_closing_point_stripped() {
        let pts = vec![
            Point2d::new(0.0, 0.0),
            Point2d::new(1.0, 0.0),
            Point2d::new(1.0, 1.0),
            Point2d::new(0.0, 0.0),
        ];
        assert_eq!(Contour::new(pts, BorderKind::Outer).len(), 3);
    }
}
