//! Matte "blueprint" shading for the base scene color.

use glam::Vec3;

use crate::scene::Material;

/// Clear color behind the model (0x404040).
pub const DEFAULT_BACKGROUND: [f32; 3] = [64.0 / 255.0, 64.0 / 255.0, 64.0 / 255.0];

/// `base * (0.5 + (n.z * 0.5 + 0.5) * normal_scale * activity)`, `n` in view space.
pub fn shade_matte(material: &Material, view_normal: Vec3, activity: f32) -> [f32; 4] {
    let facing = view_normal.z * 0.5 + 0.5;
    let k = 0.5 + facing * material.normal_scale * activity;
    let [r, g, b] = material.base_color;
    [(r * k).clamp(0.0, 1.0), (g * k).clamp(0.0, 1.0), (b * k).clamp(0.0, 1.0), 1.0]
}
