use std::sync::Arc;

use crate::geometry::point::Point3d;
use crate::geometry::transform::{BoundingBox, Transform};
use crate::geometry::vector::Vec3;
use crate::scene::shape::Shape;

/// Hits closer than this along a ray are ignored, so a surface never shadows itself.
pub const RAY_EPSILON: f64 = 1e-7;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Ray {
    pub origin: Point3d,
    pub dir: Vec3,
}

impl Ray {
    pub fn new(origin: Point3d, dir: Vec3) -> Self {
        Self { origin, dir }
    }

    pub fn at(&self, t: f64) -> Point3d {
        self.origin + self.dir * t
    }
}

/// Two-sided Möller–Trumbore test. Returns the ray parameter of the hit.
pub fn intersect_triangle(origin: &Point3d, dir: &Vec3, tri: &[Point3d; 3]) -> Option<f64> {
    let e1 = tri[1] - tri[0];
    let e2 = tri[2] - tri[0];
    let p = dir.cross(&e2);
    let det = e1.dot(&p);
    if det.abs() < 1e-14 {
        return None;
    }
    let inv_det = 1.0 / det;
    let s = *origin - tri[0];
    let u = s.dot(&p) * inv_det;
    if !(0.0..=1.0).contains(&u) {
        return None;
    }
    let q = s.cross(&e1);
    let v = dir.dot(&q) * inv_det;
    if v < 0.0 || u + v > 1.0 {
        return None;
    }
    Some(e2.dot(&q) * inv_det)
}

/// Tessellated shape in its local frame, shared between renders.
#[derive(Debug, Clone)]
pub struct PreparedMesh {
    pub triangles: Vec<[Point3d; 3]>,
    pub bounds: BoundingBox,
}

impl PreparedMesh {
    pub fn from_shape(shape: &Shape) -> Self {
        let triangles = shape.triangles();
        let mut bounds = BoundingBox::empty();
        for tri in &triangles {
            for p in tri {
                bounds.expand_to_include(p);
            }
        }
        Self { triangles, bounds }
    }
}

/// A prepared mesh placed in the world for one render.
#[derive(Debug, Clone)]
pub struct Instance {
    mesh: Arc<PreparedMesh>,
    local_from_world: Transform,
    pub casts_shadow: bool,
}

impl Instance {
    /// Returns None when the placement cannot be inverted (zero scale); such an
    /// instance has no visible extent.
    pub fn new(mesh: Arc<PreparedMesh>, world_from_local: &Transform, casts_shadow: bool) -> Option<Self> {
        Some(Self {
            mesh,
            local_from_world: world_from_local.inverse()?,
            casts_shadow,
        })
    }

    /// Nearest hit with parameter in `(RAY_EPSILON, t_max)`. The ray is moved into
    /// the local frame without renormalizing, so parameters stay comparable
    /// between instances.
    pub fn intersect(&self, ray: &Ray, t_max: f64) -> Option<f64> {
        if !self.mesh.bounds.is_valid() {
            return None;
        }
        let origin = self.local_from_world.transform_point(&ray.origin);
        let dir = self.local_from_world.transform_vector(&ray.dir);
        let (_, hi) = self
            .mesh
            .bounds
            .ray_interval(&origin, &dir, RAY_EPSILON, t_max)?;

        let limit = hi + RAY_EPSILON;
        let mut best: Option<f64> = None;
        for tri in &self.mesh.triangles {
            if let Some(t) = intersect_triangle(&origin, &dir, tri) {
                if t > RAY_EPSILON && t < t_max.min(limit) && best.is_none_or(|b| t < b) {
                    best = Some(t);
                }
            }
        }
        best
    }

    pub fn occludes(&self, ray: &Ray, t_max: f64) -> bool {
        self.intersect(ray, t_max).is_some()
    }
}
