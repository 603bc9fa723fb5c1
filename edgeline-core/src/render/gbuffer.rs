//! Geometry pass: rasterizes the scene once into depth, normal, surface-id,
//! object-id and shaded color targets.

use glam::{Mat3, Mat4, Vec3, Vec4};
use log::{debug, warn};

use crate::render::shading::shade_matte;
use crate::render::target::{ColorTarget, Extent, RenderTarget};
use crate::scene::{Camera, Material, Mesh, Node, ObjectId, Scene, SceneVisitor};
use crate::surface::{decode_surface_id, IdNormalizer};

pub struct GBuffer {
    /// Linear view-space depth; `INFINITY` where nothing was drawn.
    pub depth: RenderTarget<f32>,
    /// View-space unit normal; zero where nothing was drawn.
    pub normal: RenderTarget<[f32; 3]>,
    /// `(id + 1) / max_surface_id`; 0 for background and meshes without ids.
    pub surface_id: RenderTarget<f32>,
    pub object: RenderTarget<Option<ObjectId>>,
    pub color: ColorTarget,
}

impl GBuffer {
    pub fn new(extent: Extent) -> Self {
        Self {
            depth: RenderTarget::new(extent, f32::INFINITY),
            normal: RenderTarget::new(extent, [0.0; 3]),
            surface_id: RenderTarget::new(extent, 0.0),
            object: RenderTarget::new(extent, None),
            color: RenderTarget::new(extent, [0.0, 0.0, 0.0, 1.0]),
        }
    }

    pub fn extent(&self) -> Extent { self.depth.extent() }

    pub fn resize(&mut self, extent: Extent) {
        self.depth.resize(extent, f32::INFINITY);
        self.normal.resize(extent, [0.0; 3]);
        self.surface_id.resize(extent, 0.0);
        self.object.resize(extent, None);
        self.color.resize(extent, [0.0, 0.0, 0.0, 1.0]);
    }

    pub fn clear(&mut self, background: [f32; 3]) {
        self.depth.clear(f32::INFINITY);
        self.normal.clear([0.0; 3]);
        self.surface_id.clear(0.0);
        self.object.clear(None);
        self.color.clear([background[0], background[1], background[2], 1.0]);
    }

    pub fn is_covered(&self, x: u32, y: u32) -> bool { self.depth.get(x, y).is_finite() }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct GeometryStats {
    pub meshes: usize,
    pub triangles: usize,
    pub meshes_without_ids: usize,
}

/// Clear `gbuf` and draw every visible mesh of `scene` into it.
pub fn render_gbuffer(
    gbuf: &mut GBuffer,
    scene: &Scene,
    camera: &Camera,
    normalizer: IdNormalizer,
    background: [f32; 3],
    activity: f32,
) -> GeometryStats {
    gbuf.clear(background);
    let extent = gbuf.extent();
    let mut pass = GeometryPass {
        view: camera.view_matrix(),
        proj: camera.projection_matrix(extent.aspect()),
        near: camera.near(),
        extent,
        normalizer,
        activity,
        gbuf,
        stats: GeometryStats::default(),
    };
    scene.walk(&mut pass);
    let stats = pass.stats;
    debug!("geometry pass {}x{}: {:?}", extent.width, extent.height, stats);
    stats
}

struct GeometryPass<'a> {
    view: Mat4,
    proj: Mat4,
    near: f32,
    extent: Extent,
    normalizer: IdNormalizer,
    activity: f32,
    gbuf: &'a mut GBuffer,
    stats: GeometryStats,
}

impl SceneVisitor for GeometryPass<'_> {
    fn visit_mesh(&mut self, node: &Node, mesh: &Mesh, world: &Mat4) {
        self.draw_mesh(node, mesh, world);
    }
}

#[derive(Clone, Copy)]
struct ClipVertex {
    screen: Vec3, // x, y in pixels; z = 1/w
    view_depth: f32,
    normal: Vec3,
}

impl GeometryPass<'_> {
    fn draw_mesh(&mut self, node: &Node, mesh: &Mesh, world: &Mat4) {
        let geom = &mesh.geometry;
        let Some(indices) = geom.indices.as_deref() else {
            debug!("mesh '{}' has no index data; not drawn", node.name);
            return;
        };
        let model_view = self.view * *world;
        let normal_mat = Mat3::from_mat4(model_view).inverse().transpose();
        let has_normals = geom.normals.len() == geom.positions.len();
        let ids = geom.surface_ids.as_deref().filter(|c| c.len() == geom.positions.len());
        if ids.is_none() {
            // Degraded: id discontinuities are not detected for this mesh.
            warn!("mesh '{}' has no usable surface-id attribute; id seams are not outlined", node.name);
            self.stats.meshes_without_ids += 1;
        }
        self.stats.meshes += 1;

        let clip_mat = self.proj * model_view;
        for tri in indices.chunks_exact(3) {
            let [a, b, c] = [tri[0] as usize, tri[1] as usize, tri[2] as usize];
            if a.max(b).max(c) >= geom.positions.len() { continue; }
            let corners = [a, b, c].map(|i| Vec3::from(geom.positions[i]));

            let face_normal = {
                let v = corners.map(|p| model_view.transform_point3(p));
                (v[1] - v[0]).cross(v[2] - v[0]).normalize_or_zero()
            };
            let mut verts = [ClipVertex { screen: Vec3::ZERO, view_depth: 0.0, normal: Vec3::ZERO }; 3];
            let mut visible = true;
            for (k, &i) in [a, b, c].iter().enumerate() {
                let clip = clip_mat * corners[k].extend(1.0);
                // Whole-triangle rejection against the near and far planes.
                if clip.w <= f32::EPSILON || clip.z < 0.0 || clip.z > clip.w {
                    visible = false;
                    break;
                }
                let normal = if has_normals {
                    (normal_mat * Vec3::from(geom.normals[i])).normalize_or_zero()
                } else {
                    face_normal
                };
                verts[k] = ClipVertex {
                    screen: self.to_screen(clip),
                    view_depth: -model_view.transform_point3(corners[k]).z,
                    normal,
                };
            }
            if !visible { continue; }

            let surface = ids.and_then(|cols| majority([a, b, c].map(|i| decode_surface_id(cols[i]))));
            let id_value = surface.map_or(0.0, |id| self.normalizer.normalize(id));
            self.raster_triangle(&verts, node.id(), &mesh.material, id_value);
            self.stats.triangles += 1;
        }
    }

    fn to_screen(&self, clip: Vec4) -> Vec3 {
        let inv_w = 1.0 / clip.w;
        let ndc_x = clip.x * inv_w;
        let ndc_y = clip.y * inv_w;
        Vec3::new(
            (ndc_x * 0.5 + 0.5) * self.extent.width as f32,
            (0.5 - ndc_y * 0.5) * self.extent.height as f32,
            inv_w,
        )
    }

    fn raster_triangle(&mut self, v: &[ClipVertex; 3], object: ObjectId, material: &Material, id_value: f32) {
        let (p0, p1, p2) = (v[0].screen, v[1].screen, v[2].screen);
        let area = edge(p0, p1, p2.x, p2.y);
        if area.abs() < 1e-9 || !area.is_finite() { return; }

        let w = self.extent.width as f32;
        let h = self.extent.height as f32;
        let min_x = p0.x.min(p1.x).min(p2.x).floor().max(0.0);
        let max_x = p0.x.max(p1.x).max(p2.x).ceil().min(w - 1.0);
        let min_y = p0.y.min(p1.y).min(p2.y).floor().max(0.0);
        let max_y = p0.y.max(p1.y).max(p2.y).ceil().min(h - 1.0);
        if min_x > max_x || min_y > max_y { return; }

        for y in min_y as u32..=max_y as u32 {
            for x in min_x as u32..=max_x as u32 {
                let (px, py) = (x as f32 + 0.5, y as f32 + 0.5);
                let b0 = edge(p1, p2, px, py) / area;
                let b1 = edge(p2, p0, px, py) / area;
                let b2 = edge(p0, p1, px, py) / area;
                if b0 < 0.0 || b1 < 0.0 || b2 < 0.0 { continue; }

                // Perspective-correct weights: barycentrics scaled by 1/w.
                let q = [b0 * p0.z, b1 * p1.z, b2 * p2.z];
                let sum = q[0] + q[1] + q[2];
                if sum <= 0.0 { continue; }
                let depth = (q[0] * v[0].view_depth + q[1] * v[1].view_depth + q[2] * v[2].view_depth) / sum;
                if depth < self.near || depth >= self.gbuf.depth.get(x, y) { continue; }

                let normal = ((v[0].normal * q[0] + v[1].normal * q[1] + v[2].normal * q[2]) / sum).normalize_or_zero();
                self.gbuf.depth.set(x, y, depth);
                self.gbuf.normal.set(x, y, normal.to_array());
                self.gbuf.surface_id.set(x, y, id_value);
                self.gbuf.object.set(x, y, Some(object));
                self.gbuf.color.set(x, y, shade_matte(material, normal, self.activity));
            }
        }
    }
}

fn edge(a: Vec3, b: Vec3, px: f32, py: f32) -> f32 {
    (b.x - a.x) * (py - a.y) - (b.y - a.y) * (px - a.x)
}

/// Id shared by at least two corners, else the first corner's.
fn majority(ids: [Option<u32>; 3]) -> Option<u32> {
    let [a, b, c] = ids;
    if a == b || a == c { a } else if b == c { b } else { a }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::scene::mesh::generate_plane;
    use crate::surface::assign_surface_ids;

    fn facing_plane_scene() -> (Scene, Camera) {
        let mut scene = Scene::new();
        let root = scene.root_id();
        scene.add_mesh(root, "plane", Mesh::new(generate_plane(2.0, 2.0, 2, 2)), Mat4::IDENTITY);
        let cam = Camera::perspective(40.0, 0.01, 100.0).looking_at(Vec3::new(0.0, 0.0, 4.0), Vec3::ZERO);
        (scene, cam)
    }

    #[test]
    fn plane_fills_center_with_constant_depth() {
        let (mut scene, cam) = facing_plane_scene();
        let n = assign_surface_ids(&mut scene, 0).expect("ids");
        let mut gbuf = GBuffer::new(Extent::new(32, 32));
        let stats = render_gbuffer(&mut gbuf, &scene, &cam, IdNormalizer::new(n), [0.0; 3], 1.0);
        assert_eq!(stats.meshes, 1);
        assert_eq!(stats.meshes_without_ids, 0);
        assert!(gbuf.is_covered(16, 16));
        assert!(!gbuf.is_covered(0, 0));
        assert!((gbuf.depth.get(16, 16) - 4.0).abs() < 1e-3);
        assert!((gbuf.depth.get(12, 19) - gbuf.depth.get(16, 16)).abs() < 1e-3);
        let nz = gbuf.normal.get(16, 16)[2];
        assert!((nz - 1.0).abs() < 1e-4);
        assert_eq!(IdNormalizer::new(n).denormalize(gbuf.surface_id.get(16, 16)), Some(0));
    }

    #[test]
    fn meshes_without_ids_write_no_id() {
        let (scene, cam) = facing_plane_scene();
        let mut gbuf = GBuffer::new(Extent::new(16, 16));
        let stats = render_gbuffer(&mut gbuf, &scene, &cam, IdNormalizer::new(4), [0.0; 3], 1.0);
        assert_eq!(stats.meshes_without_ids, 1);
        assert!(gbuf.is_covered(8, 8));
        assert_eq!(gbuf.surface_id.get(8, 8), 0.0);
    }

    #[test]
    fn nearer_mesh_wins_depth_test() {
        let (mut scene, cam) = facing_plane_scene();
        let root = scene.root_id();
        let front = scene
            .add_mesh(root, "front", Mesh::new(generate_plane(0.5, 0.5, 1, 1)), Mat4::from_translation(Vec3::new(0.0, 0.0, 1.0)))
            .expect("mesh");
        let mut gbuf = GBuffer::new(Extent::new(32, 32));
        render_gbuffer(&mut gbuf, &scene, &cam, IdNormalizer::default(), [0.0; 3], 1.0);
        assert_eq!(gbuf.object.get(16, 16), Some(front));
        assert!((gbuf.depth.get(16, 16) - 3.0).abs() < 1e-3);
    }

    #[test]
    fn geometry_behind_camera_is_rejected() {
        let (scene, _) = facing_plane_scene();
        let cam = Camera::default().looking_at(Vec3::new(0.0, 0.0, -4.0), Vec3::new(0.0, 0.0, -8.0));
        let mut gbuf = GBuffer::new(Extent::new(16, 16));
        let stats = render_gbuffer(&mut gbuf, &scene, &cam, IdNormalizer::default(), [0.0; 3], 1.0);
        assert_eq!(stats.triangles, 0);
        assert!(gbuf.depth.pixels().iter().all(|d| d.is_infinite()));
    }

    #[test]
    fn majority_vote_prefers_shared_id() {
        assert_eq!(majority([Some(1), Some(2), Some(2)]), Some(2));
        assert_eq!(majority([Some(3), Some(1), Some(2)]), Some(3));
        assert_eq!(majority([None, Some(4), Some(4)]), Some(4));
    }
}
