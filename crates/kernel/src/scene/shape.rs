use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::geometry::point::Point3d;
use crate::geometry::transform::BoundingBox;

/// Latitude bands used when tessellating a sphere.
pub const SPHERE_RINGS: usize = 12;
/// Longitude slices used when tessellating a sphere.
pub const SPHERE_SEGMENTS: usize = 24;

/// Opaque geometry of a scene element, in the element's local frame.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Shape {
    /// Axis-aligned box centered on the local origin.
    Box { width: f64, height: f64, length: f64 },
    /// Sphere centered on the local origin.
    Sphere { radius: f64 },
    /// Rectangle in the local XY plane facing +Z.
    Plane { width: f64, height: f64 },
    /// Caller-supplied triangles.
    Mesh(MeshAsset),
}

/// A triangle mesh handed over as plain data. The id names the geometry: two
/// assets with the same id are assumed to hold the same triangles.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MeshAsset {
    pub id: Uuid,
    pub positions: Vec<Point3d>,
    pub triangles: Vec<[u32; 3]>,
}

/// Identity of a shape's geometry, used to key cached render resources.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum AssetKey {
    Box([u64; 3]),
    Sphere(u64),
    Plane([u64; 2]),
    Mesh(Uuid),
}

impl Shape {
    pub fn asset_key(&self) -> AssetKey {
        match self {
            Shape::Box { width, height, length } => {
                AssetKey::Box([width.to_bits(), height.to_bits(), length.to_bits()])
            }
            Shape::Sphere { radius } => AssetKey::Sphere(radius.to_bits()),
            Shape::Plane { width, height } => AssetKey::Plane([width.to_bits(), height.to_bits()]),
            Shape::Mesh(asset) => AssetKey::Mesh(asset.id),
        }
    }

    /// Bounds in the local frame.
    pub fn local_bounds(&self) -> BoundingBox {
        match self {
            Shape::Box { width, height, length } => {
                let h = Point3d::new(width / 2.0, height / 2.0, length / 2.0);
                BoundingBox::new(Point3d::new(-h.x, -h.y, -h.z), h)
            }
            Shape::Sphere { radius } => BoundingBox::new(
                Point3d::new(-radius, -radius, -radius),
                Point3d::new(*radius, *radius, *radius),
            ),
            Shape::Plane { width, height } => BoundingBox::new(
                Point3d::new(-width / 2.0, -height / 2.0, 0.0),
                Point3d::new(width / 2.0, height / 2.0, 0.0),
            ),
            Shape::Mesh(asset) => BoundingBox::from_points(&asset.positions),
        }
    }

    /// Triangulate the shape in its local frame.
    pub fn triangles(&self) -> Vec<[Point3d; 3]> {
        match self {
            Shape::Box { width, height, length } => box_triangles(*width, *height, *length),
            Shape::Sphere { radius } => sphere_triangles(*radius),
            Shape::Plane { width, height } => {
                let (hw, hh) = (width / 2.0, height / 2.0);
                let c = [
                    Point3d::new(-hw, -hh, 0.0),
                    Point3d::new(hw, -hh, 0.0),
                    Point3d::new(hw, hh, 0.0),
                    Point3d::new(-hw, hh, 0.0),
                ];
                vec![[c[0], c[1], c[2]], [c[0], c[2], c[3]]]
            }
            Shape::Mesh(asset) => asset
                .triangles
                .iter()
                .filter_map(|&[a, b, c]| {
                    let p = |i: u32| asset.positions.get(i as usize).copied();
                    Some([p(a)?, p(b)?, p(c)?])
                })
                .collect(),
        }
    }
}

fn box_triangles(width: f64, height: f64, length: f64) -> Vec<[Point3d; 3]> {
    let (x, y, z) = (width / 2.0, height / 2.0, length / 2.0);
    let v = [
        Point3d::new(-x, -y, -z),
        Point3d::new(x, -y, -z),
        Point3d::new(x, y, -z),
        Point3d::new(-x, y, -z),
        Point3d::new(-x, -y, z),
        Point3d::new(x, -y, z),
        Point3d::new(x, y, z),
        Point3d::new(-x, y, z),
    ];
    // Outward CCW quads.
    let quads: [[usize; 4]; 6] = [
        [0, 3, 2, 1], // back  (-z)
        [4, 5, 6, 7], // front (+z)
        [0, 4, 7, 3], // left  (-x)
        [1, 2, 6, 5], // right (+x)
        [0, 1, 5, 4], // bottom (-y)
        [3, 7, 6, 2], // top    (+y)
    ];
    quads
        .iter()
        .flat_map(|q| [[v[q[0]], v[q[1]], v[q[2]]], [v[q[0]], v[q[2]], v[q[3]]]])
        .collect()
}

fn sphere_triangles(radius: f64) -> Vec<[Point3d; 3]> {
    use std::f64::consts::{PI, TAU};

    let point = |ring: usize, seg: usize| {
        let theta = PI * ring as f64 / SPHERE_RINGS as f64;
        let phi = TAU * seg as f64 / SPHERE_SEGMENTS as f64;
        Point3d::new(
            radius * theta.sin() * phi.cos(),
            radius * theta.cos(),
            radius * theta.sin() * phi.sin(),
        )
    };

    let mut tris = Vec::with_capacity(SPHERE_RINGS * SPHERE_SEGMENTS * 2);
    for ring in 0..SPHERE_RINGS {
        for seg in 0..SPHERE_SEGMENTS {
            let a = point(ring, seg);
            let b = point(ring + 1, seg);
            let c = point(ring + 1, seg + 1);
            let d = point(ring, seg + 1);
            if ring != 0 {
                tris.push([a, c, d]);
            }
            if ring != SPHERE_RINGS - 1 {
                tris.push([a, b, c]);
            }
        }
    }
    tris
}
