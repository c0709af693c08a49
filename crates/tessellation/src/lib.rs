use std::collections::HashMap;

use serde::{Deserialize, Serialize};
use shadow_kernel::extrude::Solid;
use shadow_kernel::geometry::point::Point3d;
use shadow_kernel::geometry::vector::Vec3;
use shadow_kernel::parts::PartTree;
use tracing::debug;

/// A triangle mesh for rendering.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TriangleMesh {
    /// Vertex positions [x, y, z, x, y, z, ...]
    pub positions: Vec<f32>,
    /// Vertex normals [nx, ny, nz, ...]
    pub normals: Vec<f32>,
    /// Triangle indices [i0, i1, i2, ...]
    pub indices: Vec<u32>,
}

impl TriangleMesh {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn vertex_count(&self) -> usize {
        self.positions.len() / 3
    }

    pub fn triangle_count(&self) -> usize {
        self.indices.len() / 3
    }

    pub fn add_vertex(&mut self, pos: Point3d, normal: Vec3) -> u32 {
        let idx = self.vertex_count() as u32;
        self.positions.push(pos.x as f32);
        self.positions.push(pos.y as f32);
        self.positions.push(pos.z as f32);
        self.normals.push(normal.x as f32);
        self.normals.push(normal.y as f32);
        self.normals.push(normal.z as f32);
        idx
    }

    pub fn add_triangle(&mut self, i0: u32, i1: u32, i2: u32) {
        self.indices.push(i0);
        self.indices.push(i1);
        self.indices.push(i2);
    }

    pub fn merge(&mut self, other: &TriangleMesh) {
        let offset = self.vertex_count() as u32;
        self.positions.extend_from_slice(&other.positions);
        self.normals.extend_from_slice(&other.normals);
        for &idx in &other.indices {
            self.indices.push(idx + offset);
        }
    }

    fn position(&self, i: u32) -> [f32; 3] {
        let b = i as usize * 3;
        [self.positions[b], self.positions[b + 1], self.positions[b + 2]]
    }
}

/// Copy a solid's buffers into GPU-ready arrays. Vertex order and indices are
/// kept as they are in the solid.
pub fn mesh_from_solid(solid: &Solid) -> TriangleMesh {
    let mut mesh = TriangleMesh::new();
    for (p, n) in solid.positions().iter().zip(solid.normals()) {
        mesh.add_vertex(*p, *n);
    }
    for &[a, b, c] in solid.triangles() {
        mesh.add_triangle(a, b, c);
    }
    mesh
}

/// One mesh holding every extruded part of `tree`, depth-first.
pub fn mesh_from_parts(tree: &PartTree) -> TriangleMesh {
    let mut mesh = TriangleMesh::new();
    for handle in tree.handles() {
        handle.with_solid(|solid| mesh.merge(&mesh_from_solid(solid)));
    }
    debug!(
        vertices = mesh.vertex_count(),
        triangles = mesh.triangle_count(),
        "merged part meshes"
    );
    mesh
}

/// Topology report for a triangle mesh. Vertices at bit-identical positions are
/// treated as one, so split-normal seams do not count as boundaries.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct MeshValidation {
    /// Edges used by exactly one triangle.
    pub boundary_edges: usize,
    /// Edges used by more than two triangles.
    pub non_manifold_edges: usize,
    /// Edges whose two triangles traverse it in the same direction.
    pub inconsistent_edges: usize,
    /// Divergence-theorem volume; positive when faces point outward.
    pub signed_volume: f64,
}

impl MeshValidation {
    pub fn is_watertight(&self) -> bool {
        self.boundary_edges == 0 && self.non_manifold_edges == 0
    }

    /// Closed, consistently wound and facing outward.
    pub fn is_printable(&self) -> bool {
        self.is_watertight() && self.inconsistent_edges == 0 && self.signed_volume > 0.0
    }
}

pub fn validate_mesh(mesh: &TriangleMesh) -> MeshValidation {
    // Weld by exact position.
    let mut welded: HashMap<[u32; 3], u32> = HashMap::new();
    let mut remap = Vec::with_capacity(mesh.vertex_count());
    for i in 0..mesh.vertex_count() as u32 {
        let key = mesh.position(i).map(f32::to_bits);
        let next = welded.len() as u32;
        remap.push(*welded.entry(key).or_insert(next));
    }

    // Undirected edge -> (uses, net direction).
    let mut edges: HashMap<(u32, u32), (usize, i32)> = HashMap::new();
    let mut signed_volume = 0.0f64;
    for tri in mesh.indices.chunks_exact(3) {
        let w = [remap[tri[0] as usize], remap[tri[1] as usize], remap[tri[2] as usize]];
        for k in 0..3 {
            let (a, b) = (w[k], w[(k + 1) % 3]);
            if a == b {
                continue;
            }
            let entry = edges.entry((a.min(b), a.max(b))).or_insert((0, 0));
            entry.0 += 1;
            entry.1 += if a < b { 1 } else { -1 };
        }

        let p = [tri[0], tri[1], tri[2]].map(|i| mesh.position(i).map(f64::from));
        let cross = [
            p[1][1] * p[2][2] - p[1][2] * p[2][1],
            p[1][2] * p[2][0] - p[1][0] * p[2][2],
            p[1][0] * p[2][1] - p[1][1] * p[2][0],
        ];
        signed_volume += (p[0][0] * cross[0] + p[0][1] * cross[1] + p[0][2] * cross[2]) / 6.0;
    }

    let mut report = MeshValidation {
        boundary_edges: 0,
        non_manifold_edges: 0,
        inconsistent_edges: 0,
        signed_volume,
    };
    for &(uses, net) in edges.values() {
        match uses {
            1 => report.boundary_edges += 1,
            2 if net != 0 => report.inconsistent_edges += 1,
            2 => {}
            _ => report.non_manifold_edges += 1,
        }
    }
    report
}
