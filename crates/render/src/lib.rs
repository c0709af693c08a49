//! Raster snapshots of generated monsters.
//!
//! Triangles are projected through a pinhole camera on the +Z axis, flat shaded
//! against a fixed directional light and resolved with a z-buffer. Pixels no
//! triangle covers stay fully transparent.

use image::{Rgba, RgbaImage};
use shadow_kernel::extrude::Solid;
use shadow_kernel::geometry::point::Point3d;
use shadow_kernel::geometry::transform::BoundingBox;
use shadow_kernel::geometry::vector::Vec3;
use shadow_tessellation::{TriangleMesh, mesh_from_solid};
use tracing::debug;

/// Snapshot side length used by the gallery.
pub const DEFAULT_SNAPSHOT_SIZE: u32 = 512;

/// Camera distance from the bounding-box center, in bounding-box diagonals.
const FRAMING_DISTANCE: f64 = 2.5;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SnapshotStyle {
    pub size: u32,
    pub base_color: [u8; 3],
    /// Direction the light travels.
    pub light_dir: Vec3,
    pub fov_degrees: f64,
}

impl Default for SnapshotStyle {
    fn default() -> Self {
        Self {
            size: DEFAULT_SNAPSHOT_SIZE,
            base_color: [96, 64, 160],
            light_dir: Vec3::new(0.3, -0.5, -0.8),
            fov_degrees: 60.0,
        }
    }
}

/// Snapshot of a solid at `size` x `size` with the default style.
pub fn snapshot_solid(solid: &Solid, size: u32) -> RgbaImage {
    let style = SnapshotStyle {
        size,
        ..SnapshotStyle::default()
    };
    snapshot_mesh(&mesh_from_solid(solid), &style)
}

pub fn snapshot_mesh(mesh: &TriangleMesh, style: &SnapshotStyle) -> RgbaImage {
    let size = style.size;
    let mut image = RgbaImage::from_pixel(size, size, Rgba([0, 0, 0, 0]));
    if size == 0 || mesh.indices.is_empty() {
        return image;
    }

    let vertex = |i: u32| {
        let b = i as usize * 3;
        Point3d::new(
            f64::from(mesh.positions[b]),
            f64::from(mesh.positions[b + 1]),
            f64::from(mesh.positions[b + 2]),
        )
    };
    let bounds = BoundingBox::from_points(&(0..mesh.vertex_count() as u32).map(vertex).collect::<Vec<_>>());
    let center = bounds.center();
    let diagonal = bounds.size().length().max(1e-9);
    let eye = center + Vec3::Z * (FRAMING_DISTANCE * diagonal);

    let focal = 1.0 / (style.fov_degrees.to_radians() * 0.5).tan();
    let half = f64::from(size) * 0.5;
    // Screen position and view depth; None behind the camera.
    let project = |p: Point3d| -> Option<(f64, f64, f64)> {
        let v = p - eye;
        let depth = -v.z;
        if depth <= 1e-9 {
            return None;
        }
        let x = v.x / depth * focal;
        let y = v.y / depth * focal;
        Some((half + x * half, half - y * half, depth))
    };

    let to_light = (-style.light_dir).normalized().unwrap_or(Vec3::Z);
    let mut zbuf = vec![f64::INFINITY; (size as usize) * (size as usize)];
    let mut drawn = 0usize;

    for tri in mesh.indices.chunks_exact(3) {
        let p = [vertex(tri[0]), vertex(tri[1]), vertex(tri[2])];
        let Some(normal) = (p[1] - p[0]).cross(&(p[2] - p[0])).normalized() else {
            continue;
        };
        let centroid = Point3d::new(
            (p[0].x + p[1].x + p[2].x) / 3.0,
            (p[0].y + p[1].y + p[2].y) / 3.0,
            (p[0].z + p[1].z + p[2].z) / 3.0,
        );
        if normal.dot(&(eye - centroid)) <= 0.0 {
            continue;
        }
        let (Some(a), Some(b), Some(c)) = (project(p[0]), project(p[1]), project(p[2])) else {
            continue;
        };

        let brightness = 0.3 + 0.7 * normal.dot(&to_light).max(0.0);
        let color = Rgba([
            (f64::from(style.base_color[0]) * brightness) as u8,
            (f64::from(style.base_color[1]) * brightness) as u8,
            (f64::from(style.base_color[2]) * brightness) as u8,
            255,
        ]);
        drawn += rasterize(&mut image, &mut zbuf, [a, b, c], color);
    }
    debug!(size, pixels = drawn, "rendered snapshot");
    image
}

/// Fill a projected triangle, keeping the nearest depth per pixel. Returns the
/// number of pixels written.
fn rasterize(image: &mut RgbaImage, zbuf: &mut [f64], v: [(f64, f64, f64); 3], color: Rgba<u8>) -> usize {
    let size = image.width();
    let area = edge(v[0], v[1], v[2].0, v[2].1);
    if area.abs() < 1e-12 {
        return 0;
    }
    let min_x = v.iter().map(|p| p.0).fold(f64::INFINITY, f64::min).floor().max(0.0) as u32;
    let max_x = v.iter().map(|p| p.0).fold(f64::NEG_INFINITY, f64::max).ceil().min(f64::from(size - 1)) as u32;
    let min_y = v.iter().map(|p| p.1).fold(f64::INFINITY, f64::min).floor().max(0.0) as u32;
    let max_y = v.iter().map(|p| p.1).fold(f64::NEG_INFINITY, f64::max).ceil().min(f64::from(size - 1)) as u32;

    let mut written = 0;
    for y in min_y..=max_y {
        for x in min_x..=max_x {
            let (px, py) = (f64::from(x) + 0.5, f64::from(y) + 0.5);
            let w0 = edge(v[1], v[2], px, py) / area;
            let w1 = edge(v[2], v[0], px, py) / area;
            let w2 = edge(v[0], v[1], px, py) / area;
            if w0 < 0.0 || w1 < 0.0 || w2 < 0.0 {
                continue;
            }
            let depth = w0 * v[0].2 + w1 * v[1].2 + w2 * v[2].2;
            let slot = &mut zbuf[(y * size + x) as usize];
            if depth < *slot {
                *slot = depth;
                image.put_pixel(x, y, color);
                written += 1;
            }
        }
    }
    written
}

fn edge(a: (f64, f64, f64), b: (f64, f64, f64), px: f64, py: f64) -> f64 {
    (b.0 - a.0) * (py - a.1) - (b.1 - a.1) * (px - a.0)
}
