//! Indexed triangle geometry plus a few procedural primitives used by demos and tests.

use bytemuck::{Pod, Zeroable};
use serde::{Deserialize, Serialize};

#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq, Pod, Zeroable)]
pub struct Vertex {
    pub pos: [f32; 3],
    pub normal: [f32; 3],
}

/// Attribute arrays of one mesh. `surface_ids` is the per-vertex id color
/// written by [`crate::surface::assign_surface_ids`].
#[derive(Debug, Clone, Default)]
pub struct Geometry {
    pub positions: Vec<[f32; 3]>,
    pub normals: Vec<[f32; 3]>,
    pub indices: Option<Vec<u32>>,
    pub surface_ids: Option<Vec<[f32; 4]>>,
}

impl Geometry {
    pub fn from_vertices(vertices: &[Vertex], indices: Vec<u32>) -> Self {
        Self {
            positions: vertices.iter().map(|v| v.pos).collect(),
            normals: vertices.iter().map(|v| v.normal).collect(),
            indices: Some(indices),
            surface_ids: None,
        }
    }

    pub fn vertex_count(&self) -> usize { self.positions.len() }

    pub fn triangle_count(&self) -> usize {
        self.indices.as_ref().map_or(0, |i| i.len() / 3)
    }

    /// Geometry moved by `offset`. Attributes other than positions are kept.
    pub fn translated(mut self, offset: [f32; 3]) -> Self {
        for p in &mut self.positions {
            p[0] += offset[0];
            p[1] += offset[1];
            p[2] += offset[2];
        }
        self
    }

    /// Append `other`, re-basing its indices. The id attribute is dropped since
    /// the merged topology has not been segmented.
    pub fn merge(mut self, other: &Geometry) -> Self {
        let base = self.positions.len() as u32;
        self.positions.extend_from_slice(&other.positions);
        self.normals.extend_from_slice(&other.normals);
        let mut indices = self.indices.take().unwrap_or_default();
        if let Some(o) = &other.indices {
            indices.extend(o.iter().map(|i| i + base));
        }
        self.indices = Some(indices);
        self.surface_ids = None;
        self
    }
}

/// Matte material: `base_color * (0.5 + (n.z * 0.5 + 0.5) * normal_scale)`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Material {
    pub base_color: [f32; 3],
    pub normal_scale: f32,
}

impl Default for Material {
    fn default() -> Self {
        let c = 0xb0 as f32 / 255.0;
        Self { base_color: [c, c, c], normal_scale: 0.9 }
    }
}

// Generate a unit-radius UV sphere centered at origin, scaled by radius.
// stacks: latitude segments (>= 3), slices: longitude segments (>= 3)
pub fn generate_uv_sphere(radius: f32, stacks: u32, slices: u32) -> Geometry {
    let stacks = stacks.max(3);
    let slices = slices.max(3);
    let mut vertices = Vec::new();
    let mut indices = Vec::new();

    for i in 0..=stacks {
        let theta = i as f32 / stacks as f32 * std::f32::consts::PI;
        let (sin_t, cos_t) = theta.sin_cos();
        for j in 0..=slices {
            let phi = j as f32 / slices as f32 * std::f32::consts::TAU;
            let (sin_p, cos_p) = phi.sin_cos();
            let normal = [sin_t * cos_p, cos_t, sin_t * sin_p];
            let pos = [radius * normal[0], radius * normal[1], radius * normal[2]];
            vertices.push(Vertex { pos, normal });
        }
    }

    // The seam column (j = slices) duplicates j = 0 by position only.
    let stride = slices + 1;
    for i in 0..stacks {
        for j in 0..slices {
            let a = i * stride + j;
            let b = a + 1;
            let c = a + stride;
            let d = c + 1;
            indices.extend_from_slice(&[a, c, b]);
            indices.extend_from_slice(&[b, c, d]);
        }
    }

    Geometry::from_vertices(&vertices, indices)
}

/// Axis-aligned cube centered at origin with 4 unshared vertices per face.
pub fn generate_cube(size: f32) -> Geometry {
    let h = size * 0.5;
    // (normal, u axis, v axis); corners are n*h +/- u*h +/- v*h, counter-clockwise seen from outside.
    let faces: [([f32; 3], [f32; 3], [f32; 3]); 6] = [
        ([0.0, 0.0, 1.0], [1.0, 0.0, 0.0], [0.0, 1.0, 0.0]),
        ([0.0, 0.0, -1.0], [-1.0, 0.0, 0.0], [0.0, 1.0, 0.0]),
        ([1.0, 0.0, 0.0], [0.0, 0.0, -1.0], [0.0, 1.0, 0.0]),
        ([-1.0, 0.0, 0.0], [0.0, 0.0, 1.0], [0.0, 1.0, 0.0]),
        ([0.0, 1.0, 0.0], [1.0, 0.0, 0.0], [0.0, 0.0, -1.0]),
        ([0.0, -1.0, 0.0], [1.0, 0.0, 0.0], [0.0, 0.0, 1.0]),
    ];
    let mut vertices = Vec::with_capacity(24);
    let mut indices = Vec::with_capacity(36);
    for (n, u, v) in faces {
        let base = vertices.len() as u32;
        for (su, sv) in [(-1.0, -1.0), (1.0, -1.0), (1.0, 1.0), (-1.0, 1.0)] {
            let pos = [
                (n[0] + su * u[0] + sv * v[0]) * h,
                (n[1] + su * u[1] + sv * v[1]) * h,
                (n[2] + su * u[2] + sv * v[2]) * h,
            ];
            vertices.push(Vertex { pos, normal: n });
        }
        indices.extend_from_slice(&[base, base + 1, base + 2, base, base + 2, base + 3]);
    }
    Geometry::from_vertices(&vertices, indices)
}

/// Plane in XY facing +Z, centered at origin, split into a segment grid.
pub fn generate_plane(width: f32, height: f32, w_segments: u32, h_segments: u32) -> Geometry {
    let ws = w_segments.max(1);
    let hs = h_segments.max(1);
    let mut vertices = Vec::new();
    let mut indices = Vec::new();
    for y in 0..=hs {
        for x in 0..=ws {
            let px = (x as f32 / ws as f32 - 0.5) * width;
            let py = (y as f32 / hs as f32 - 0.5) * height;
            vertices.push(Vertex { pos: [px, py, 0.0], normal: [0.0, 0.0, 1.0] });
        }
    }
    let stride = ws + 1;
    for y in 0..hs {
        for x in 0..ws {
            let a = y * stride + x;
            let b = a + 1;
            let c = a + stride;
            let d = c + 1;
            indices.extend_from_slice(&[a, b, d]);
            indices.extend_from_slice(&[a, d, c]);
        }
    }
    Geometry::from_vertices(&vertices, indices)
}
