//! Surface segmentation: partitions a mesh's triangles into connected islands
//! and exposes the grouping as a per-vertex id color.
//!
//! Adjacency is geometric: triangle edges are matched by welded vertex
//! positions, so duplicated vertices at UV or normal seams still connect.
//! Ids are threaded explicitly through consecutive calls so a whole scene gets
//! unique ids without shared counters.

pub mod encoding;

use std::collections::{HashMap, VecDeque};

use glam::Vec3;
use log::{debug, trace};
use serde::{Deserialize, Serialize};

use crate::error::GeometryError;
use crate::scene::{Geometry, Scene};

pub use encoding::{decode_surface_id, encode_surface_id, IdNormalizer, MAX_ENCODABLE_ID};

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SegmentOptions {
    /// Grid size used to weld positions before matching edges.
    pub weld_tolerance: f32,
    /// When set, the flood does not cross edges whose face normals differ by more than this.
    pub crease_angle_deg: Option<f32>,
}

impl Default for SegmentOptions {
    fn default() -> Self { Self { weld_tolerance: 1e-5, crease_angle_deg: None } }
}

#[derive(Debug, Clone, PartialEq)]
pub struct SurfaceSegmentation {
    pub vertex_colors: Vec<[f32; 4]>,
    pub triangle_surfaces: Vec<u32>,
    pub surface_count: u32,
    pub next_id: u32,
}

pub fn compute_surface_ids(geometry: &Geometry, start_id: u32) -> Result<SurfaceSegmentation, GeometryError> {
    compute_surface_ids_with(geometry, start_id, &SegmentOptions::default())
}

pub fn compute_surface_ids_with(
    geometry: &Geometry,
    start_id: u32,
    opts: &SegmentOptions,
) -> Result<SurfaceSegmentation, GeometryError> {
    let indices = geometry.indices.as_deref().ok_or(GeometryError::MissingIndices)?;
    if indices.len() % 3 != 0 {
        return Err(GeometryError::RaggedIndices(indices.len()));
    }
    let tri_count = indices.len() / 3;
    if tri_count == 0 {
        return Ok(SurfaceSegmentation { vertex_colors: Vec::new(), triangle_surfaces: Vec::new(), surface_count: 0, next_id: start_id });
    }
    let positions = &geometry.positions;
    if positions.is_empty() {
        return Err(GeometryError::MissingPositions);
    }
    if let Some(&index) = indices.iter().find(|&&i| i as usize >= positions.len()) {
        return Err(GeometryError::IndexOutOfRange { index, vertex_count: positions.len() });
    }

    let welded = weld_positions(positions, opts.weld_tolerance);
    let mut edge_tris: HashMap<(u32, u32), Vec<usize>> = HashMap::new();
    for t in 0..tri_count {
        for key in triangle_edges(indices, &welded, t) {
            edge_tris.entry(key).or_default().push(t);
        }
    }

    let crease_cos = opts.crease_angle_deg.map(|deg| deg.clamp(0.0, 180.0).to_radians().cos());
    let face_normals: Vec<Vec3> = match crease_cos {
        Some(_) => (0..tri_count).map(|t| face_normal(positions, indices, t)).collect(),
        None => Vec::new(),
    };
    let joins = |a: usize, b: usize| match crease_cos {
        None => true,
        Some(limit) => {
            let (na, nb) = (face_normals[a], face_normals[b]);
            // Degenerate faces have no orientation to disagree with.
            na == Vec3::ZERO || nb == Vec3::ZERO || na.dot(nb) >= limit
        }
    };

    const UNASSIGNED: u32 = u32::MAX;
    let mut tri_surface = vec![UNASSIGNED; tri_count];
    let mut vertex_surface: Vec<Option<u32>> = vec![None; positions.len()];
    let mut next_id = start_id;
    let mut queue = VecDeque::new();

    for seed in 0..tri_count {
        if tri_surface[seed] != UNASSIGNED { continue; }
        let id = next_id;
        if id > MAX_ENCODABLE_ID {
            return Err(GeometryError::IdOverflow(id));
        }
        next_id += 1;
        tri_surface[seed] = id;
        queue.push_back(seed);
        while let Some(t) = queue.pop_front() {
            for &v in &indices[3 * t..3 * t + 3] {
                vertex_surface[v as usize].get_or_insert(id);
            }
            for key in triangle_edges(indices, &welded, t) {
                let Some(neighbours) = edge_tris.get(&key) else { continue; };
                for &n in neighbours {
                    if tri_surface[n] == UNASSIGNED && joins(t, n) {
                        tri_surface[n] = id;
                        queue.push_back(n);
                    }
                }
            }
        }
    }

    let vertex_colors = vertex_surface.iter().map(|s| encode_surface_id(s.unwrap_or(start_id))).collect();
    Ok(SurfaceSegmentation {
        vertex_colors,
        triangle_surfaces: tri_surface,
        surface_count: next_id - start_id,
        next_id,
    })
}

/// Segment every mesh of `scene` in traversal order, writing the id attribute
/// onto each geometry. Returns the next free id, i.e. the value to hand to
/// `OutlineCompositor::update_max_surface_id`.
pub fn assign_surface_ids(scene: &mut Scene, start_id: u32) -> Result<u32, GeometryError> {
    assign_surface_ids_with(scene, start_id, &SegmentOptions::default())
}

pub fn assign_surface_ids_with(scene: &mut Scene, start_id: u32, opts: &SegmentOptions) -> Result<u32, GeometryError> {
    let mut next_id = start_id;
    let mut meshes = 0usize;
    scene.try_for_each_mesh_mut(|_, name, mesh| {
        let seg = compute_surface_ids_with(&mesh.geometry, next_id, opts).map_err(|e| e.in_mesh(name))?;
        trace!("mesh '{}': {} triangles -> {} surfaces (ids {}..{})", name, seg.triangle_surfaces.len(), seg.surface_count, next_id, seg.next_id);
        next_id = seg.next_id;
        mesh.geometry.surface_ids = Some(seg.vertex_colors);
        meshes += 1;
        Ok(())
    })?;
    debug!("assigned surface ids {}..{} across {} meshes", start_id, next_id, meshes);
    Ok(next_id)
}

fn weld_positions(positions: &[[f32; 3]], tolerance: f32) -> Vec<u32> {
    let tol = if tolerance.is_finite() && tolerance > 0.0 { tolerance as f64 } else { f32::EPSILON as f64 };
    let cell_of = |p: [f64; 3]| p.map(|c| (c / tol).floor() as i64);
    // Representatives per grid cell. A match within `tol` can sit in any of
    // the 27 cells around the query, so every one of them is searched.
    let mut cells: HashMap<[i64; 3], Vec<u32>> = HashMap::with_capacity(positions.len());
    let mut reps: Vec<[f64; 3]> = Vec::new();
    positions
        .iter()
        .map(|p| {
            let p = p.map(f64::from);
            let [cx, cy, cz] = cell_of(p);
            let mut found = None;
            'search: for dx in -1..=1 {
                for dy in -1..=1 {
                    for dz in -1..=1 {
                        let Some(list) = cells.get(&[cx + dx, cy + dy, cz + dz]) else { continue; };
                        if let Some(&r) = list.iter().find(|&&r| {
                            let q = reps[r as usize];
                            (0..3).all(|k| (q[k] - p[k]).abs() <= tol)
                        }) {
                            found = Some(r);
                            break 'search;
                        }
                    }
                }
            }
            found.unwrap_or_else(|| {
                let r = reps.len() as u32;
                reps.push(p);
                cells.entry([cx, cy, cz]).or_default().push(r);
                r
            })
        })
        .collect()
}

fn triangle_edges(indices: &[u32], welded: &[u32], t: usize) -> impl Iterator<Item = (u32, u32)> {
    let w = [
        welded[indices[3 * t] as usize],
        welded[indices[3 * t + 1] as usize],
        welded[indices[3 * t + 2] as usize],
    ];
    [(w[0], w[1]), (w[1], w[2]), (w[2], w[0])]
        .into_iter()
        .filter(|(a, b)| a != b)
        .map(|(a, b)| (a.min(b), a.max(b)))
}

fn face_normal(positions: &[[f32; 3]], indices: &[u32], t: usize) -> Vec3 {
    let p = |k: usize| Vec3::from(positions[indices[3 * t + k] as usize]);
    (p(1) - p(0)).cross(p(2) - p(0)).normalize_or_zero()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::scene::mesh::{generate_cube, generate_plane, generate_uv_sphere};
    use crate::scene::Mesh;
    use glam::Mat4;
    use std::collections::HashSet;

    fn distinct(seg: &SurfaceSegmentation) -> HashSet<u32> {
        seg.triangle_surfaces.iter().copied().collect()
    }

    #[test]
    fn unit_quad_is_one_surface() {
        let quad = generate_plane(1.0, 1.0, 1, 1);
        let seg = compute_surface_ids(&quad, 0).expect("segment");
        assert_eq!(seg.surface_count, 1);
        assert_eq!(distinct(&seg).len(), 1);
        assert_eq!(seg.next_id, 1);
    }

    #[test]
    fn disjoint_components_get_two_ids_in_any_order() {
        let a = generate_plane(1.0, 1.0, 2, 2);
        let b = generate_plane(1.0, 1.0, 2, 2).translated([5.0, 0.0, 0.0]);
        let merged = a.merge(&b);
        let seg = compute_surface_ids(&merged, 0).expect("segment");
        assert_eq!(distinct(&seg).len(), 2);

        let mut reversed = merged.clone();
        let idx = reversed.indices.take().expect("indices");
        let tris: Vec<&[u32]> = idx.chunks(3).rev().collect();
        reversed.indices = Some(tris.concat());
        let seg = compute_surface_ids(&reversed, 0).expect("segment");
        assert_eq!(distinct(&seg).len(), 2);
        assert_eq!(seg.surface_count, 2);
    }

    #[test]
    fn seam_duplicates_are_welded() {
        // 24 unshared vertices, yet every face meets its neighbours by position.
        let seg = compute_surface_ids(&generate_cube(1.0), 0).expect("segment");
        assert_eq!(seg.surface_count, 1);
        let seg = compute_surface_ids(&generate_uv_sphere(1.0, 6, 12), 0).expect("segment");
        assert_eq!(seg.surface_count, 1);
    }

    #[test]
    fn near_duplicate_seam_vertices_weld_across_grid_cells() {
        // Shared edge duplicated at x = 1e-5 +/- 1e-7: within tolerance but
        // on opposite sides of a grid line.
        let (a, b) = (1.01e-5f32, 0.99e-5f32);
        let geom = Geometry {
            positions: vec![[-1.0, -1.0, 0.0], [a, -1.0, 0.0], [a, 1.0, 0.0], [b, -1.0, 0.0], [1.0, 1.0, 0.0], [b, 1.0, 0.0]],
            normals: vec![[0.0, 0.0, 1.0]; 6],
            indices: Some(vec![0, 1, 2, 3, 4, 5]),
            surface_ids: None,
        };
        let seg = compute_surface_ids(&geom, 0).expect("segment");
        assert_eq!(seg.surface_count, 1);

        let far = Geometry {
            positions: vec![[-1.0, -1.0, 0.0], [0.0, -1.0, 0.0], [0.0, 1.0, 0.0], [3e-5, -1.0, 0.0], [1.0, 1.0, 0.0], [3e-5, 1.0, 0.0]],
            ..geom
        };
        assert_eq!(compute_surface_ids(&far, 0).expect("segment").surface_count, 2);
    }

    #[test]
    fn crease_angle_splits_cube_faces() {
        let opts = SegmentOptions { crease_angle_deg: Some(30.0), ..Default::default() };
        let seg = compute_surface_ids_with(&generate_cube(1.0), 10, &opts).expect("segment");
        assert_eq!(seg.surface_count, 6);
        assert_eq!(seg.next_id, 16);
    }

    #[test]
    fn every_triangle_and_vertex_is_labelled_consistently() {
        let sphere = generate_uv_sphere(1.0, 8, 16);
        let opts = SegmentOptions { crease_angle_deg: Some(10.0), ..Default::default() };
        let seg = compute_surface_ids_with(&sphere, 3, &opts).expect("segment");
        let idx = sphere.indices.as_ref().expect("indices");
        assert_eq!(seg.triangle_surfaces.len(), idx.len() / 3);
        assert!(seg.triangle_surfaces.iter().all(|&s| (3..seg.next_id).contains(&s)));
        assert_eq!(seg.vertex_colors.len(), sphere.vertex_count());
        for (v, color) in seg.vertex_colors.iter().enumerate() {
            let id = decode_surface_id(*color).expect("decodes");
            let incident = idx
                .chunks(3)
                .enumerate()
                .any(|(t, tri)| tri.contains(&(v as u32)) && seg.triangle_surfaces[t] == id);
            let referenced = idx.contains(&(v as u32));
            assert!(incident || !referenced, "vertex {v} has id {id} from no incident triangle");
        }
    }

    #[test]
    fn segmentation_is_idempotent() {
        let geom = generate_plane(1.0, 1.0, 3, 3).merge(&generate_cube(0.5).translated([4.0, 0.0, 0.0]));
        let first = compute_surface_ids(&geom, 7).expect("segment");
        let second = compute_surface_ids(&geom, 7).expect("segment");
        assert_eq!(first, second);
    }

    #[test]
    fn empty_and_degenerate_inputs() {
        let empty = Geometry { indices: Some(Vec::new()), ..Default::default() };
        let seg = compute_surface_ids(&empty, 4).expect("segment");
        assert!(seg.vertex_colors.is_empty());
        assert_eq!(seg.next_id, 4);

        // A zero-area sliver glued to a quad, plus a lone triangle far away.
        let mut geom = generate_plane(1.0, 1.0, 1, 1);
        geom.positions.extend_from_slice(&[[0.5, 0.5, 0.0], [0.5, 0.5, 0.0], [10.0, 0.0, 0.0], [11.0, 0.0, 0.0], [10.0, 1.0, 0.0]]);
        geom.normals.extend_from_slice(&[[0.0, 0.0, 1.0]; 5]);
        let idx = geom.indices.as_mut().expect("indices");
        idx.extend_from_slice(&[1, 3, 4, 6, 7, 8]);
        let seg = compute_surface_ids(&geom, 0).expect("segment");
        assert_eq!(seg.surface_count, 2);
        assert_eq!(seg.triangle_surfaces[2], seg.triangle_surfaces[0]);
        assert_eq!(seg.triangle_surfaces[3], 1);
    }

    #[test]
    fn malformed_geometry_is_reported() {
        let mut geom = generate_plane(1.0, 1.0, 1, 1);
        geom.indices = None;
        assert_eq!(compute_surface_ids(&geom, 0), Err(GeometryError::MissingIndices));

        let no_pos = Geometry { indices: Some(vec![0, 1, 2]), ..Default::default() };
        assert_eq!(compute_surface_ids(&no_pos, 0), Err(GeometryError::MissingPositions));

        let mut bad = generate_plane(1.0, 1.0, 1, 1);
        bad.indices = Some(vec![0, 1, 9]);
        assert!(matches!(compute_surface_ids(&bad, 0), Err(GeometryError::IndexOutOfRange { index: 9, .. })));

        bad.indices = Some(vec![0, 1]);
        assert_eq!(compute_surface_ids(&bad, 0), Err(GeometryError::RaggedIndices(2)));
    }

    #[test]
    fn scene_assignment_threads_the_counter() {
        let mut scene = Scene::new();
        let root = scene.root_id();
        scene.add_mesh(root, "left", Mesh::new(generate_cube(1.0)), Mat4::IDENTITY);
        scene.add_mesh(root, "right", Mesh::new(generate_cube(1.0)), Mat4::IDENTITY);
        let next = assign_surface_ids(&mut scene, 0).expect("assign");
        assert_eq!(next, 2);

        let mut ids = Vec::new();
        scene
            .try_for_each_mesh_mut::<(), _>(|_, _, mesh| {
                let colors = mesh.geometry.surface_ids.as_ref().expect("attribute");
                ids.push(decode_surface_id(colors[0]).expect("decodes"));
                Ok(())
            })
            .expect("pass");
        assert_eq!(ids, vec![0, 1]);
    }

    #[test]
    fn scene_assignment_names_the_broken_mesh() {
        let mut scene = Scene::new();
        let root = scene.root_id();
        let mut broken = generate_cube(1.0);
        broken.indices = None;
        scene.add_mesh(root, "ok", Mesh::new(generate_cube(1.0)), Mat4::IDENTITY);
        scene.add_mesh(root, "broken", Mesh::new(broken), Mat4::IDENTITY);
        let err = assign_surface_ids(&mut scene, 0).expect_err("must fail");
        assert_eq!(err.to_string(), "mesh 'broken': geometry has no index data");
    }
}
