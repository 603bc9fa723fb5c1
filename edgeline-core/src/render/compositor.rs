//! Per-viewer outline compositor: geometry pass, edge detection, composite.
//!
//! Every instance owns its targets and parameters, so several viewers (for
//! example the focused and neighbouring items of a carousel) never influence
//! each other's output.

use std::collections::HashSet;

use log::{debug, warn};

use crate::render::gbuffer::{render_gbuffer, GBuffer, GeometryStats};
use crate::render::outline::{detect_edges, DebugView, OutlineParams};
use crate::render::shading::DEFAULT_BACKGROUND;
use crate::render::target::{ColorTarget, Extent, RenderTarget};
use crate::scene::{Camera, ObjectId, Scene};
use crate::style::Style;
use crate::surface::IdNormalizer;

/// Largest physical target side; bigger requests are clamped.
pub const MAX_TARGET_SIDE: u32 = 16384;
pub const MAX_PIXEL_RATIO: f32 = 8.0;

/// Viewport in device-independent pixels plus the device pixel ratio.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Viewport {
    pub width: u32,
    pub height: u32,
    pub pixel_ratio: f32,
}

impl Viewport {
    pub fn physical(&self) -> Extent {
        let ratio = if self.pixel_ratio.is_finite() && self.pixel_ratio > 0.0 { self.pixel_ratio } else { 1.0 };
        let scale = |v: u32| (v as f64 * ratio as f64).round().min(MAX_TARGET_SIDE as f64) as u32;
        let extent = Extent::new(scale(self.width), scale(self.height));
        if extent.width == MAX_TARGET_SIDE || extent.height == MAX_TARGET_SIDE {
            warn!("viewport {}x{} @{} clamped to {}x{}", self.width, self.height, ratio, extent.width, extent.height);
        }
        extent
    }
}

pub struct OutlineCompositor {
    viewport: Viewport,
    params: OutlineParams,
    background: [f32; 3],
    normalizer: IdNormalizer,
    activity: f32,
    selection: Vec<ObjectId>,
    gbuffer: GBuffer,
    edges: RenderTarget<f32>,
    output: ColorTarget,
    edge_pixels: usize,
    last_stats: GeometryStats,
}

impl OutlineCompositor {
    pub fn new(width: u32, height: u32) -> Self {
        let viewport = Viewport { width: width.max(1), height: height.max(1), pixel_ratio: 1.0 };
        let extent = viewport.physical();
        Self {
            viewport,
            params: OutlineParams::default(),
            background: DEFAULT_BACKGROUND,
            normalizer: IdNormalizer::default(),
            activity: 1.0,
            selection: Vec::new(),
            gbuffer: GBuffer::new(extent),
            edges: RenderTarget::new(extent, 0.0),
            output: RenderTarget::new(extent, [0.0, 0.0, 0.0, 1.0]),
            edge_pixels: 0,
            last_stats: GeometryStats::default(),
        }
    }

    pub fn from_style(style: &Style, width: u32, height: u32) -> Self {
        let mut c = Self::new(width, height);
        c.set_params(style.outline);
        c.set_background(style.background);
        c
    }

    /// Reallocate every target for the new viewport size. Zero is clamped to 1.
    /// Previous content is discarded until the next [`render`](Self::render).
    pub fn resize(&mut self, width: u32, height: u32) {
        self.viewport.width = width.max(1);
        self.viewport.height = height.max(1);
        let extent = self.viewport.physical();
        self.gbuffer.resize(extent);
        self.edges.resize(extent, 0.0);
        self.output.resize(extent, [0.0, 0.0, 0.0, 1.0]);
        self.edge_pixels = 0;
        debug!("compositor resized to {}x{} ({}x{} physical)", self.viewport.width, self.viewport.height, extent.width, extent.height);
    }

    /// Takes effect immediately by reallocating at the current viewport size.
    pub fn set_pixel_ratio(&mut self, ratio: f32) {
        let clamped = if ratio.is_finite() && ratio > 0.0 { ratio.min(MAX_PIXEL_RATIO) } else { 1.0 };
        if clamped != ratio {
            warn!("pixel ratio {} clamped to {}", ratio, clamped);
        }
        self.viewport.pixel_ratio = clamped;
        self.resize(self.viewport.width, self.viewport.height);
    }

    pub fn viewport(&self) -> Viewport { self.viewport }
    pub fn extent(&self) -> Extent { self.output.extent() }

    /// `n` is the number of surface ids handed out so far (ids live in `0..n`).
    pub fn update_max_surface_id(&mut self, n: u32) {
        self.normalizer = IdNormalizer::new(n);
        debug!("max surface id set to {}", self.normalizer.max_surface_id());
    }

    pub fn max_surface_id(&self) -> u32 { self.normalizer.max_surface_id() }

    /// Objects (and their descendants) outlined by the selection overlay.
    pub fn set_selection(&mut self, objects: &[ObjectId]) { self.selection = objects.to_vec(); }
    pub fn selection(&self) -> &[ObjectId] { &self.selection }

    pub fn set_params(&mut self, params: OutlineParams) { self.params = params.sanitized(); }
    pub fn params(&self) -> &OutlineParams { &self.params }

    pub fn set_background(&mut self, rgb: [f32; 3]) { self.background = rgb.map(|c| if c.is_finite() { c.clamp(0.0, 1.0) } else { 0.0 }); }

    /// 1 = focused viewer, 0 = outline fully suppressed and shading flattened.
    pub fn set_activity(&mut self, factor: f32) {
        self.activity = if factor.is_finite() { factor.clamp(0.0, 1.0) } else { 1.0 };
    }
    pub fn activity(&self) -> f32 { self.activity }

    pub fn gbuffer(&self) -> &GBuffer { &self.gbuffer }
    pub fn edge_mask(&self) -> &RenderTarget<f32> { &self.edges }
    pub fn output(&self) -> &ColorTarget { &self.output }
    pub fn edge_pixel_count(&self) -> usize { self.edge_pixels }
    pub fn last_geometry_stats(&self) -> GeometryStats { self.last_stats }

    /// Run the whole frame against the current scene, camera and parameters.
    pub fn render(&mut self, scene: &Scene, camera: &Camera) -> &ColorTarget {
        self.last_stats = render_gbuffer(&mut self.gbuffer, scene, camera, self.normalizer, self.background, self.activity);
        self.edge_pixels = detect_edges(&self.gbuffer, &self.params, self.normalizer, &mut self.edges);
        let selected: HashSet<ObjectId> = self.selection.iter().flat_map(|&id| scene.subtree_ids(id)).collect();
        self.composite(&selected);
        debug!("frame composited: {} edge pixels, view {:?}", self.edge_pixels, self.params.debug_view);
        &self.output
    }

    fn composite(&mut self, selected: &HashSet<ObjectId>) {
        let extent = self.output.extent();
        let g = &self.gbuffer;
        let p = &self.params;
        let strength = p.intensity * self.activity;
        let radius = p.radius().unwrap_or(1);
        let near = g.depth.pixels().iter().copied().filter(|d| d.is_finite()).fold(f32::INFINITY, f32::min);

        for y in 0..extent.height {
            for x in 0..extent.width {
                let scene = g.color.get(x, y);
                let mask = self.edges.get(x, y);
                let mut px = match p.debug_view {
                    DebugView::Composite => mix(scene, p.color, mask * strength),
                    DebugView::SceneColor => scene,
                    DebugView::Depth => {
                        let d = g.depth.get(x, y);
                        let v = if d.is_finite() { (near / d).clamp(0.0, 1.0) } else { 0.0 };
                        [v, v, v, 1.0]
                    }
                    DebugView::Normal => {
                        let n = g.normal.get(x, y);
                        if g.is_covered(x, y) { [n[0] * 0.5 + 0.5, n[1] * 0.5 + 0.5, n[2] * 0.5 + 0.5, 1.0] } else { [0.0, 0.0, 0.0, 1.0] }
                    }
                    DebugView::SurfaceId => {
                        let v = g.surface_id.get(x, y);
                        [v, v, v, 1.0]
                    }
                    DebugView::OutlineOnly => {
                        let v = 1.0 - mask;
                        [v, v, v, 1.0]
                    }
                };
                if let Some(sel) = p.selection_color {
                    if p.debug_view == DebugView::Composite && on_selection_border(g, selected, x, y, radius) {
                        px = mix(px, sel, self.activity);
                    }
                }
                self.output.set(x, y, px);
            }
        }
    }
}

fn mix(base: [f32; 4], color: [f32; 3], t: f32) -> [f32; 4] {
    let t = t.clamp(0.0, 1.0);
    let s = 1.0 - t;
    [base[0] * s + color[0] * t, base[1] * s + color[1] * t, base[2] * s + color[2] * t, base[3]]
}

fn on_selection_border(g: &GBuffer, selected: &HashSet<ObjectId>, x: u32, y: u32, r: i64) -> bool {
    let inside = |o: Option<ObjectId>| o.is_some_and(|id| selected.contains(&id));
    if selected.is_empty() || !inside(g.object.get(x, y)) { return false; }
    [(r, 0), (-r, 0), (0, r), (0, -r)]
        .iter()
        .any(|&(dx, dy)| g.object.sample(x as i64 + dx, y as i64 + dy).is_some_and(|o| !inside(o)))
}
