//! Prism extrusion of canonical polygons.
//!
//! A [`Solid`] is laid out so that depth is the only thing that varies between
//! two extrusions of the same polygon:
//!
//! - vertices: front cap (`n`), back cap (`n`), then four per side wall (`4n`)
//! - triangles: front cap, back cap (same count), then two per side wall
//!
//! Every vertex's z coordinate is `+depth/2` or `-depth/2`, decided by its slot
//! alone, so [`Solid::apply_depth`] can rewrite it without touching anything
//! else.

use std::sync::Arc;

use geo::{Coord, LineString, Polygon as GeoPolygon, TriangulateEarcut};
use parking_lot::{Mutex, MutexGuard};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{info, instrument};

use crate::geometry::point::{Point2d, Point3d};
use crate::geometry::transform::BoundingBox;
use crate::geometry::vector::Vec3;
use crate::normalize::CanonicalPolygon;

#[derive(Debug, Error, Clone, PartialEq)]
pub enum ExtrudeError {
    #[error("extrusion depth must be finite and positive, got {depth}")]
    InvalidDepth { depth: f64 },
    #[error("polygon needs at least 3 points, got {provided}")]
    DegeneratePolygon { provided: usize },
}

pub fn validate_depth(depth: f64) -> Result<(), ExtrudeError> {
    if depth.is_finite() && depth > 0.0 {
        Ok(())
    } else {
        Err(ExtrudeError::InvalidDepth { depth })
    }
}

/// Extruded prism, centered on z = 0.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Solid {
    positions: Vec<Point3d>,
    normals: Vec<Vec3>,
    triangles: Vec<[u32; 3]>,
    ring_len: usize,
    cap_triangle_count: usize,
    depth: f64,
}

impl Solid {
    pub fn positions(&self) -> &[Point3d] {
        &self.positions
    }

    pub fn normals(&self) -> &[Vec3] {
        &self.normals
    }

    pub fn triangles(&self) -> &[[u32; 3]] {
        &self.triangles
    }

    pub fn depth(&self) -> f64 {
        self.depth
    }

    /// Number of polygon points, which is also the vertex count of each cap.
    pub fn ring_len(&self) -> usize {
        self.ring_len
    }

    pub fn vertex_count(&self) -> usize {
        self.positions.len()
    }

    pub fn triangle_count(&self) -> usize {
        self.triangles.len()
    }

    pub fn front_cap_triangles(&self) -> &[[u32; 3]] {
        &self.triangles[..self.cap_triangle_count]
    }

    pub fn back_cap_triangles(&self) -> &[[u32; 3]] {
        &self.triangles[self.cap_triangle_count..2 * self.cap_triangle_count]
    }

    pub fn wall_triangles(&self) -> &[[u32; 3]] {
        &self.triangles[2 * self.cap_triangle_count..]
    }

    pub fn bounds(&self) -> BoundingBox {
        BoundingBox::from_points(&self.positions)
    }

    /// Set every vertex's z from its slot. Depth must already be validated.
    pub(crate) fn apply_depth(&mut self, depth: f64) {
        let n = self.ring_len;
        let h = depth * 0.5;
        for p in &mut self.positions[..n] {
            p.z = h;
        }
        for p in &mut self.positions[n..2 * n] {
            p.z = -h;
        }
        for wall in self.positions[2 * n..].chunks_exact_mut(4) {
            wall[0].z = h;
            wall[1].z = h;
            wall[2].z = -h;
            wall[3].z = -h;
        }
        self.depth = depth;
    }
}

/// Extrude `polygon` into a fresh solid.
pub fn build_solid(polygon: &CanonicalPolygon, depth: f64) -> Result<Solid, ExtrudeError> {
    validate_depth(depth)?;
    let ring = polygon.points();
    let n = ring.len();
    if n < 3 {
        return Err(ExtrudeError::DegeneratePolygon { provided: n });
    }

    let ccw = polygon.signed_area2() >= 0.0;
    let front = cap_triangles(ring);

    let mut positions = Vec::with_capacity(6 * n);
    let mut normals = Vec::with_capacity(6 * n);
    let mut triangles = Vec::with_capacity(2 * front.len() + 2 * n);

    // Caps.
    for p in ring {
        positions.push(Point3d::new(p.x, p.y, 0.0));
        normals.push(Vec3::Z);
    }
    for p in ring {
        positions.push(Point3d::new(p.x, p.y, 0.0));
        normals.push(-Vec3::Z);
    }
    triangles.extend(front.iter().copied());
    let offset = n as u32;
    triangles.extend(front.iter().map(|&[a, b, c]| [a + offset, c + offset, b + offset]));

    // Side walls, one quad per edge including the closing edge.
    let sign = if ccw { 1.0 } else { -1.0 };
    for i in 0..n {
        let a = ring[i];
        let b = ring[(i + 1) % n];
        let outward = (Vec3::new(b.y - a.y, a.x - b.x, 0.0) * sign)
            .normalized()
            .unwrap_or(Vec3::ZERO);
        let base = positions.len() as u32;
        for p in [a, b, b, a] {
            positions.push(Point3d::new(p.x, p.y, 0.0));
            normals.push(outward);
        }
        let [b0, b1, b2, b3] = [base, base + 1, base + 2, base + 3];
        if ccw {
            triangles.push([b3, b2, b1]);
            triangles.push([b3, b1, b0]);
        } else {
            triangles.push([b3, b1, b2]);
            triangles.push([b3, b0, b1]);
        }
    }

    let mut solid = Solid {
        positions,
        normals,
        triangles,
        ring_len: n,
        cap_triangle_count: front.len(),
        depth,
    };
    solid.apply_depth(depth);
    Ok(solid)
}

/// Ear-clipped front cap, counter-clockwise seen from +Z.
///
/// Earcut emits every triangle with the same winding, so the orientation is
/// decided once for the whole cap. Slivers across collinear runs have an area
/// sign that is rounding noise and must follow their neighbours.
fn cap_triangles(ring: &[Point2d]) -> Vec<[u32; 3]> {
    let n = ring.len();
    let coords: Vec<Coord<f64>> = ring.iter().map(|p| Coord { x: p.x, y: p.y }).collect();
    let raw = GeoPolygon::new(LineString::new(coords), Vec::new()).earcut_triangles_raw();

    // The closed exterior repeats the first point at index n.
    let mut tris: Vec<[u32; 3]> = raw
        .triangle_indices
        .chunks_exact(3)
        .map(|tri| [(tri[0] % n) as u32, (tri[1] % n) as u32, (tri[2] % n) as u32])
        .collect();

    let area2: f64 = tris
        .iter()
        .map(|&[a, b, c]| {
            let (pa, pb, pc) = (ring[a as usize], ring[b as usize], ring[c as usize]);
            (pb.x - pa.x) * (pc.y - pa.y) - (pc.x - pa.x) * (pb.y - pa.y)
        })
        .sum();
    if area2 < 0.0 {
        for tri in &mut tris {
            tri.swap(1, 2);
        }
    }
    tris
}

/// A live solid together with the polygon it was extruded from. Clones share
/// the same solid.
#[derive(Debug, Clone)]
pub struct ExtrusionHandle {
    solid: Arc<Mutex<Solid>>,
    polygon: Arc<CanonicalPolygon>,
}

impl ExtrusionHandle {
    pub fn polygon(&self) -> &CanonicalPolygon {
        &self.polygon
    }

    pub fn depth(&self) -> f64 {
        self.solid.lock().depth
    }

    /// Copy of the current solid.
    pub fn solid(&self) -> Solid {
        self.solid.lock().clone()
    }

    /// Run `f` against the current solid without copying it.
    pub fn with_solid<R>(&self, f: impl FnOnce(&Solid) -> R) -> R {
        f(&self.solid.lock())
    }

    pub fn shares_solid_with(&self, other: &ExtrusionHandle) -> bool {
        Arc::ptr_eq(&self.solid, &other.solid)
    }

    pub(crate) fn lock_solid(&self) -> MutexGuard<'_, Solid> {
        self.solid.lock()
    }
}

/// Extrude `polygon` by `depth` and keep both behind a handle.
#[instrument(skip(polygon), fields(points = polygon.len()))]
pub fn extrude(polygon: CanonicalPolygon, depth: f64) -> Result<ExtrusionHandle, ExtrudeError> {
    let solid = build_solid(&polygon, depth)?;
    info!(
        vertices = solid.vertex_count(),
        triangles = solid.triangle_count(),
        "extruded polygon"
    );
    Ok(ExtrusionHandle {
        solid: Arc::new(Mutex::new(solid)),
        polygon: Arc::new(polygon),
    })
}
