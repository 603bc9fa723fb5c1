//! Edge-detection pass over the G-buffer plus the shared outline parameters.
//!
//! A pixel pair is discontinuous when its depth, normal or surface id differ
//! beyond the configured thresholds. Each discontinuous pair marks exactly one
//! of its pixels (the nearer one, ties going to the pixel whose neighbour sits
//! at +x/+y), which keeps strokes one sample wide.

use glam::Vec3;
use log::warn;
use serde::{Deserialize, Serialize};

use crate::render::gbuffer::GBuffer;
use crate::render::target::RenderTarget;
use crate::surface::IdNormalizer;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DebugView {
    #[default]
    Composite,
    SceneColor,
    Depth,
    Normal,
    SurfaceId,
    OutlineOnly,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct OutlineParams {
    pub color: [f32; 3],
    /// Sampling offset in pixels; 0 disables outlines.
    pub width_px: f32,
    /// Relative depth step, scaled by the nearer depth of the pair.
    pub depth_threshold: f32,
    /// Normals further apart than this (degrees) form a crease edge.
    pub crease_angle_deg: f32,
    /// Minimum id distance counted as a seam; anything up to 1 means "ids differ".
    pub surface_id_threshold: f32,
    pub intensity: f32,
    /// Draws the silhouette of the selected objects in this color when set.
    pub selection_color: Option<[f32; 3]>,
    pub debug_view: DebugView,
}

impl Default for OutlineParams {
    fn default() -> Self {
        Self {
            color: [1.0, 1.0, 1.0],
            width_px: 1.0,
            depth_threshold: 0.05,
            crease_angle_deg: 42.0,
            surface_id_threshold: 1.0,
            intensity: 1.0,
            selection_color: None,
            debug_view: DebugView::Composite,
        }
    }
}

impl OutlineParams {
    /// Clamp every field into its valid range. Non-finite values fall back to defaults.
    pub fn sanitized(self) -> Self {
        let d = Self::default();
        let fix = |v: f32, fallback: f32, lo: f32, hi: f32| if v.is_finite() { v.clamp(lo, hi) } else { fallback };
        let fix_rgb = |c: [f32; 3], fallback: [f32; 3]| {
            [fix(c[0], fallback[0], 0.0, 1.0), fix(c[1], fallback[1], 0.0, 1.0), fix(c[2], fallback[2], 0.0, 1.0)]
        };
        let out = Self {
            color: fix_rgb(self.color, d.color),
            width_px: fix(self.width_px, d.width_px, 0.0, 64.0),
            depth_threshold: fix(self.depth_threshold, d.depth_threshold, 0.0, f32::MAX),
            crease_angle_deg: fix(self.crease_angle_deg, d.crease_angle_deg, 0.0, 180.0),
            surface_id_threshold: fix(self.surface_id_threshold, d.surface_id_threshold, 0.0, f32::MAX),
            intensity: fix(self.intensity, d.intensity, 0.0, 1.0),
            selection_color: self.selection_color.map(|c| fix_rgb(c, d.color)),
            debug_view: self.debug_view,
        };
        if out != self {
            warn!("outline parameters clamped: {:?} -> {:?}", self, out);
        }
        out
    }

    /// Neighbourhood radius in whole pixels, `None` when outlines are disabled.
    pub fn radius(&self) -> Option<i64> {
        if self.width_px <= 0.0 { None } else { Some((self.width_px.round() as i64).max(1)) }
    }
}

const CROSS: [(i64, i64); 4] = [(1, 0), (-1, 0), (0, 1), (0, -1)];

/// Fill `mask` with 1.0 on edge pixels and 0.0 elsewhere; returns the edge count.
pub fn detect_edges(gbuf: &GBuffer, params: &OutlineParams, normalizer: IdNormalizer, mask: &mut RenderTarget<f32>) -> usize {
    mask.clear(0.0);
    let Some(r) = params.radius() else { return 0; };
    let cos_limit = params.crease_angle_deg.to_radians().cos();
    let extent = gbuf.extent();
    let mut count = 0;

    for y in 0..extent.height {
        for x in 0..extent.width {
            let p = Sample::read(gbuf, normalizer, x as i64, y as i64);
            let Some(p) = p else { continue; };
            let owns_any = CROSS.iter().any(|&(dx, dy)| {
                let Some(q) = Sample::read(gbuf, normalizer, x as i64 + dx * r, y as i64 + dy * r) else { return false; };
                if p.depth.is_infinite() && q.depth.is_infinite() { return false; }
                if !discontinuous(&p, &q, params, cos_limit) { return false; }
                if p.depth != q.depth { p.depth < q.depth } else { dx > 0 || dy > 0 }
            });
            if owns_any {
                mask.set(x, y, 1.0);
                count += 1;
            }
        }
    }
    count
}

struct Sample {
    depth: f32,
    normal: Vec3,
    id: Option<u32>,
}

impl Sample {
    fn read(gbuf: &GBuffer, normalizer: IdNormalizer, x: i64, y: i64) -> Option<Self> {
        let depth = gbuf.depth.sample(x, y)?;
        let normal = Vec3::from(gbuf.normal.sample(x, y)?);
        let id = normalizer.denormalize(gbuf.surface_id.sample(x, y)?);
        Some(Self { depth, normal, id })
    }
}

fn discontinuous(p: &Sample, q: &Sample, params: &OutlineParams, cos_limit: f32) -> bool {
    // Foreground against background is always a silhouette.
    if p.depth.is_infinite() != q.depth.is_infinite() { return true; }
    let near = p.depth.min(q.depth);
    if (p.depth - q.depth).abs() > params.depth_threshold * near { return true; }
    if p.normal != Vec3::ZERO && q.normal != Vec3::ZERO && p.normal.dot(q.normal) < cos_limit { return true; }
    match (p.id, q.id) {
        (Some(a), Some(b)) if a != b => a.abs_diff(b) as f32 >= params.surface_id_threshold,
        _ => false,
    }
}
