//! Frame metadata written next to exported images.

use anyhow::Result;

use crate::render::compositor::OutlineCompositor;
use crate::render::outline::DebugView;

#[derive(Debug, Clone, PartialEq, serde::Serialize)]
pub struct FrameMeta {
    pub width: u32,
    pub height: u32,
    pub max_surface_id: u32,
    pub edge_pixels: usize,
    pub activity: f32,
    pub view: DebugView,
}

impl FrameMeta {
    pub fn from_compositor(c: &OutlineCompositor) -> Self {
        let extent = c.extent();
        Self {
            width: extent.width,
            height: extent.height,
            max_surface_id: c.max_surface_id(),
            edge_pixels: c.edge_pixel_count(),
            activity: c.activity(),
            view: c.params().debug_view,
        }
    }

    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn meta_reflects_compositor_state() {
        let mut c = OutlineCompositor::new(12, 8);
        c.update_max_surface_id(5);
        c.set_activity(0.3);
        let meta = FrameMeta::from_compositor(&c);
        assert_eq!((meta.width, meta.height, meta.max_surface_id), (12, 8, 5));
        let json: serde_json::Value = serde_json::from_str(&meta.to_json().expect("json")).expect("valid");
        assert_eq!(json["view"], "composite");
        assert_eq!(json["edge_pixels"], 0);
    }
}
