use clap::ValueEnum;
use edgeline_core::scene::mesh::{generate_cube, generate_plane, generate_uv_sphere};
use edgeline_core::scene::{Camera, Light, LightKind, Mesh, Scene};
use glam::{Mat4, Quat, Vec3};

#[derive(ValueEnum, Clone, Copy, Debug)]
pub enum DemoScene {
    /// Two unit cubes touching face to face
    Cubes,
    /// Subdivided flat plane
    Plane,
    /// UV sphere
    Sphere,
    /// Cubes and a sphere standing on a floor
    Showcase,
}

impl DemoScene {
    pub fn build(self) -> (Scene, Camera) {
        let mut scene = Scene::new();
        let root = scene.root_id();
        let camera = match self {
            DemoScene::Cubes => {
                scene.add_mesh(root, "left", Mesh::new(generate_cube(1.0)), Mat4::from_translation(Vec3::new(-0.5, 0.0, 0.0)));
                scene.add_mesh(root, "right", Mesh::new(generate_cube(1.0)), Mat4::from_translation(Vec3::new(0.5, 0.0, 0.0)));
                Camera::default().looking_at(Vec3::new(1.5, 1.5, 4.0), Vec3::ZERO)
            }
            DemoScene::Plane => {
                scene.add_mesh(root, "plane", Mesh::new(generate_plane(2.0, 2.0, 8, 8)), Mat4::IDENTITY);
                Camera::default().looking_at(Vec3::new(0.0, -1.0, 3.0), Vec3::ZERO)
            }
            DemoScene::Sphere => {
                scene.add_mesh(root, "sphere", Mesh::new(generate_uv_sphere(1.0, 24, 48)), Mat4::IDENTITY);
                Camera::default().looking_at(Vec3::new(0.0, 0.5, 4.0), Vec3::ZERO)
            }
            DemoScene::Showcase => {
                let floor = Mat4::from_rotation_translation(Quat::from_rotation_x(-std::f32::consts::FRAC_PI_2), Vec3::new(0.0, -0.5, 0.0));
                scene.add_mesh(root, "floor", Mesh::new(generate_plane(6.0, 6.0, 4, 4)), floor);
                if let Some(props) = scene.add_group(root, "props", Mat4::IDENTITY) {
                    scene.add_mesh(props, "crate-a", Mesh::new(generate_cube(1.0)), Mat4::from_translation(Vec3::new(-1.0, 0.0, 0.0)));
                    scene.add_mesh(props, "crate-b", Mesh::new(generate_cube(1.0)), Mat4::from_translation(Vec3::new(0.0, 0.0, 0.0)));
                    scene.add_mesh(props, "ball", Mesh::new(generate_uv_sphere(0.5, 16, 32)), Mat4::from_translation(Vec3::new(1.3, 0.0, 0.3)));
                }
                scene.add_light(root, "sun", Light {
                    kind: LightKind::Directional { direction: Vec3::new(-0.4, -1.0, -0.3).normalize() },
                    color: [1.0; 3],
                    intensity: 1.0,
                });
                Camera::default().looking_at(Vec3::new(3.0, 2.5, 5.0), Vec3::ZERO)
            }
        };
        (scene, camera)
    }
}
