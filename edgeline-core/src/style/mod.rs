//! YAML style files. Every section is optional and falls back to defaults.

pub mod schema;

use std::convert::Infallible;

use anyhow::{Context, Result};
use log::debug;

use crate::scene::Scene;
pub use schema::Style;

pub fn load_from_yaml_str(s: &str) -> Result<Style> {
    let style: Style = serde_yaml::from_str(s)?;
    Ok(Style { outline: style.outline.sanitized(), ..style })
}

pub fn load_from_path<P: AsRef<std::path::Path>>(path: P) -> Result<Style> {
    let path = path.as_ref();
    let data = std::fs::read_to_string(path).with_context(|| format!("reading style {}", path.display()))?;
    let style = load_from_yaml_str(&data).with_context(|| format!("parsing style {}", path.display()))?;
    debug!("loaded style '{}' from {}", style.id, path.display());
    Ok(style)
}

impl Style {
    /// Give every mesh in `scene` this style's material.
    pub fn apply_material(&self, scene: &mut Scene) {
        let material = self.material;
        let _ = scene.try_for_each_mesh_mut::<Infallible, _>(|_, _, mesh| {
            mesh.material = material;
            Ok(())
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::render::outline::DebugView;
    use crate::scene::mesh::generate_cube;
    use crate::scene::Mesh;
    use glam::Mat4;

    const SAMPLE: &str = r#"
id: night
background: [0.0, 0.0, 0.1]
material: { base_color: [0.2, 0.4, 0.6] }
outline:
  color: [1.0, 0.5, 0.0]
  width_px: 2.0
  crease_angle_deg: 30.0
  debug_view: outline_only
segmentation: { crease_angle_deg: 60.0 }
"#;

    #[test]
    fn parses_partial_style() {
        let s = load_from_yaml_str(SAMPLE).expect("parse");
        assert_eq!(s.id, "night");
        assert_eq!(s.material.base_color, [0.2, 0.4, 0.6]);
        assert_eq!(s.material.normal_scale, 0.9);
        assert_eq!(s.outline.width_px, 2.0);
        assert_eq!(s.outline.depth_threshold, 0.05);
        assert_eq!(s.outline.debug_view, DebugView::OutlineOnly);
        assert_eq!(s.segmentation.crease_angle_deg, Some(60.0));
        assert_eq!(s.segmentation.weld_tolerance, 1e-5);
    }

    #[test]
    fn empty_document_is_default_style() {
        let s = load_from_yaml_str("{}").expect("parse");
        assert_eq!(s, Style::default());
    }

    #[test]
    fn out_of_range_outline_values_are_clamped() {
        let s = load_from_yaml_str("outline: { width_px: -4.0, intensity: 3.0 }").expect("parse");
        assert_eq!(s.outline.width_px, 0.0);
        assert_eq!(s.outline.intensity, 1.0);
    }

    #[test]
    fn malformed_yaml_is_an_error() {
        assert!(load_from_yaml_str("outline: [1, 2").is_err());
        assert!(load_from_path("/definitely/not/here.yaml").is_err());
    }

    #[test]
    fn apply_material_reaches_every_mesh() {
        let mut scene = Scene::new();
        let root = scene.root_id();
        let g = scene.add_group(root, "g", Mat4::IDENTITY).expect("group");
        scene.add_mesh(g, "a", Mesh::new(generate_cube(1.0)), Mat4::IDENTITY);
        let style = load_from_yaml_str(SAMPLE).expect("parse");
        style.apply_material(&mut scene);
        let mut colors = Vec::new();
        let _ = scene.try_for_each_mesh_mut::<Infallible, _>(|_, _, m| {
            colors.push(m.material.base_color);
            Ok(())
        });
        assert_eq!(colors, vec![[0.2, 0.4, 0.6]]);
    }
}
