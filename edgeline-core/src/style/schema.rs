use serde::{Deserialize, Serialize};

use crate::render::outline::OutlineParams;
use crate::render::shading::DEFAULT_BACKGROUND;
use crate::scene::Material;
use crate::surface::SegmentOptions;

/// A viewer look: background, matte material, outline tuning and segmentation options.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Style {
    pub id: String,
    pub background: [f32; 3],
    pub material: Material,
    pub outline: OutlineParams,
    pub segmentation: SegmentOptions,
}

impl Default for Style {
    fn default() -> Self {
        Self {
            id: "blueprint".into(),
            background: DEFAULT_BACKGROUND,
            material: Material::default(),
            outline: OutlineParams::default(),
            segmentation: SegmentOptions::default(),
        }
    }
}
