//! Mapping pixel contours into the canonical extrusion frame.
//!
//! The canonical frame has its origin at the silhouette's area centroid, y up,
//! and is scaled so the largest coordinate magnitude equals the canonical
//! extent. Pixel resolution and shadow size therefore do not change the result.

use serde::{Deserialize, Serialize};
use tracing::{debug, instrument};

use crate::contour::{BorderKind, Contour, ContourSet};
use crate::default_tolerance;
use crate::geometry::point::{Point2d, ring_centroid, ring_signed_area2};

/// Largest coordinate magnitude of a canonical polygon.
pub const CANONICAL_EXTENT: f64 = 100.0;

/// Polygon in the canonical frame. Assumed simple; never checked.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CanonicalPolygon {
    points: Vec<Point2d>,
}

impl CanonicalPolygon {
    /// Wrap already-canonical points. A repeated first point at the end is dropped.
    pub fn from_points(mut points: Vec<Point2d>) -> Self {
        if points.len() > 1 && points.first() == points.last() {
            points.pop();
        }
        Self { points }
    }

    pub fn points(&self) -> &[Point2d] {
        &self.points
    }

    pub fn len(&self) -> usize {
        self.points.len()
    }

    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }

    pub fn max_magnitude(&self) -> f64 {
        self.points.iter().map(Point2d::max_abs_coord).fold(0.0, f64::max)
    }

    pub fn centroid(&self) -> Point2d {
        ring_centroid(&self.points)
    }

    /// Twice the signed area; positive for counter-clockwise rings.
    pub fn signed_area2(&self) -> f64 {
        ring_signed_area2(&self.points)
    }
}

/// Which contours become parts of the monster.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum ContourPolicy {
    /// Only the largest contour.
    #[default]
    LargestOnly,
    /// The largest contour plus every other non-degenerate outer contour.
    AllOuter,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PolygonNormalizer {
    pub canonical_extent: f64,
    pub policy: ContourPolicy,
}

impl Default for PolygonNormalizer {
    fn default() -> Self {
        Self {
            canonical_extent: CANONICAL_EXTENT,
            policy: ContourPolicy::LargestOnly,
        }
    }
}

/// Pixel-to-canonical mapping derived from the primary contour.
struct Frame {
    origin: Point2d,
    scale: f64,
}

impl Frame {
    fn apply(&self, p: &Point2d) -> Point2d {
        Point2d::new((p.x - self.origin.x) * self.scale, (self.origin.y - p.y) * self.scale)
    }

    fn map(&self, contour: &Contour) -> CanonicalPolygon {
        CanonicalPolygon {
            points: contour.points().iter().map(|p| self.apply(p)).collect(),
        }
    }
}

impl PolygonNormalizer {
    pub fn new(canonical_extent: f64, policy: ContourPolicy) -> Self {
        Self {
            canonical_extent,
            policy,
        }
    }

    /// Canonical form of the largest non-degenerate contour. Ties go to the
    /// contour that comes first in the set.
    pub fn normalize(&self, contours: &ContourSet) -> Option<CanonicalPolygon> {
        let (_, primary) = self.primary(contours)?;
        let frame = self.frame(primary)?;
        Some(frame.map(primary))
    }

    /// Polygons for every part the policy selects, primary first. Secondary parts
    /// share the primary's frame so their relative placement is kept.
    #[instrument(skip(self, contours), fields(contours = contours.len(), policy = ?self.policy))]
    pub fn normalize_parts(&self, contours: &ContourSet) -> Vec<CanonicalPolygon> {
        let Some((primary_index, primary)) = self.primary(contours) else {
            debug!("no usable contour");
            return Vec::new();
        };
        let Some(frame) = self.frame(primary) else {
            return Vec::new();
        };

        let tol = default_tolerance();
        let mut parts = vec![frame.map(primary)];
        if self.policy == ContourPolicy::AllOuter {
            parts.extend(
                contours
                    .iter()
                    .enumerate()
                    .filter(|(i, c)| {
                        *i != primary_index && c.kind() == BorderKind::Outer && !tol.is_zero_area(c.area())
                    })
                    .map(|(_, c)| frame.map(c)),
            );
        }
        debug!(parts = parts.len(), "normalized contours");
        parts
    }

    fn primary<'a>(&self, contours: &'a ContourSet) -> Option<(usize, &'a Contour)> {
        let tol = default_tolerance();
        let mut best: Option<(usize, &Contour, f64)> = None;
        for (i, contour) in contours.iter().enumerate() {
            let area = contour.area();
            if tol.is_zero_area(area) {
                continue;
            }
            if best.is_none_or(|(_, _, a)| area > a) {
                best = Some((i, contour, area));
            }
        }
        best.map(|(i, c, _)| (i, c))
    }

    fn frame(&self, primary: &Contour) -> Option<Frame> {
        if !(self.canonical_extent.is_finite() && self.canonical_extent > 0.0) {
            return None;
        }
        let origin = ring_centroid(primary.points());
        let magnitude = primary
            .points()
            .iter()
            .map(|p| (p.x - origin.x).abs().max((p.y - origin.y).abs()))
            .fold(0.0, f64::max);
        if magnitude <= 0.0 || !magnitude.is_finite() {
            return None;
        }
        Some(Frame {
            origin,
            scale: self.canonical_extent / magnitude,
        })
    }
}

/// [`PolygonNormalizer::normalize`] with the default extent and policy.
pub fn normalize(contours: &ContourSet) -> Option<CanonicalPolygon> {
    PolygonNormalizer::default().normalize(contours)
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    fn rect(x0: f64, y0: f64, x1: f64, y1: f64) -> Contour {
        Contour::new(
            vec![
                Point2d::new(x0, y0),
                Point2d::new(x1, y0),
                Point2d::new(x1, y1),
                Point2d::new(x0, y1),
            ],
            BorderKind::Outer,
        )
    }

    #[test]
    fn test_empty_set_gives_none() {
        assert!(normalize(&ContourSet::default()).is_none());
    }

    #[test]
    fn test_degenerate_contours_skipped() {
        let line = Contour::new(
            vec![Point2d::new(0.0, 0.0), Point2d::new(5.0, 0.0), Point2d::new(10.0, 0.0)],
            BorderKind::Outer,
        );
        assert!(normalize(&ContourSet::new(vec![line.clone()])).is_none());

        let set = ContourSet::new(vec![line, rect(0.0, 0.0, 4.0, 2.0)]);
        let poly = normalize(&set).unwrap();
        assert_eq!(poly.len(), 4);
    }

    #[test]
    fn test_centered_flipped_and_scaled() {
        let set = ContourSet::new(vec![rect(10.0, 20.0, 50.0, 40.0)]);
        let poly = normalize(&set).unwrap();
        assert_relative_eq!(poly.max_magnitude(), CANONICAL_EXTENT, epsilon = 1e-9);
        let c = poly.centroid();
        assert_relative_eq!(c.x, 0.0, epsilon = 1e-9);
        assert_relative_eq!(c.y, 0.0, epsilon = 1e-9);
        // The top-left image corner stays top-left once y points up.
        let first = poly.points()[0];
        assert_relative_eq!(first.x, -100.0, epsilon = 1e-9);
        assert_relative_eq!(first.y, 50.0, epsilon = 1e-9);
        // The y flip reverses the winding sign.
        assert!(poly.signed_area2() < 0.0);
    }

    #[test]
    fn test_non_positive_extent_gives_none() {
        let set = ContourSet::new(vec![rect(0.0, 0.0, 4.0, 2.0)]);
        for extent in [0.0, -50.0, f64::NAN] {
            let normalizer = PolygonNormalizer::new(extent, ContourPolicy::LargestOnly);
            assert!(normalizer.normalize(&set).is_none());
            assert!(normalizer.normalize_parts(&set).is_empty());
        }
    }

    #[test]
    fn test_largest_area_wins_ties_to_first() {
        let a = rect(0.0, 0.0, 10.0, 10.0);
        let b = rect(100.0, 100.0, 110.0, 110.0);
        let small = rect(0.0, 0.0, 2.0, 2.0);
        let set = ContourSet::new(vec![small, a, b]);
        let normalizer = PolygonNormalizer::default();
        let (index, _) = normalizer.primary(&set).unwrap();
        assert_eq!(index, 1);
    }

    #[test]
    fn test_all_outer_keeps_relative_layout() {
        let body = rect(0.0, 0.0, 20.0, 20.0);
        let hole = Contour::new(rect(5.0, 5.0, 8.0, 8.0).points().to_vec(), BorderKind::Hole);
        let arm = rect(30.0, 0.0, 35.0, 5.0);
        let set = ContourSet::new(vec![body, hole, arm]);

        let largest = PolygonNormalizer::default().normalize_parts(&set);
        assert_eq!(largest.len(), 1);

        let all = PolygonNormalizer::new(CANONICAL_EXTENT, ContourPolicy::AllOuter).normalize_parts(&set);
        assert_eq!(all.len(), 2);
        // Body spans 10 pixels either side of its centroid: 10 units per pixel.
        assert_relative_eq!(all[1].points()[0].x, 200.0, epsilon = 1e-9);
        assert_relative_eq!(all[1].points()[0].y, 100.0, epsilon = 1e-9);
    }
}
