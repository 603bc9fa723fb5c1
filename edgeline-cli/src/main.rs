mod scenes;

use std::path::PathBuf;

use anyhow::{anyhow, Context, Result};
use clap::{Args, Parser, Subcommand, ValueEnum};
use edgeline_core::export::FrameMeta;
use edgeline_core::render::{DebugView, OutlineCompositor, OutlineParams};
use edgeline_core::scene::{Camera, Scene};
use edgeline_core::style::{self, Style};
use edgeline_core::surface::{assign_surface_ids_with, compute_surface_ids_with, SegmentOptions};
use edgeline_core::{GeometryError, VERSION};
use log::info;
use scenes::DemoScene;

#[derive(Parser, Debug)]
#[command(name = "edgeline", version = VERSION, about = "Surface-aware outline rendering tools")]
struct Cli {
    #[command(subcommand)]
    cmd: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Load and inspect a style YAML
    Inspect { path: PathBuf },
    /// Segment a demo scene and print per-mesh surface counts
    Segment {
        #[arg(value_enum, default_value_t = DemoScene::Cubes)]
        scene: DemoScene,
        /// Split surfaces at creases sharper than this angle (degrees)
        #[arg(long)]
        crease: Option<f32>,
    },
    /// Render a demo scene with outlines and write PNG plus frame metadata
    Render {
        #[command(flatten)]
        frame: FrameArgs,
        #[arg(long, value_enum)]
        view: Option<ViewArg>,
        /// Name of a node whose silhouette gets the selection color
        #[arg(long)]
        select: Option<String>,
        #[arg(long, default_value = "out.png")]
        out: PathBuf,
    },
    /// Write depth, normal, surface-id and edge-mask visualisations
    Buffers {
        #[command(flatten)]
        frame: FrameArgs,
        #[arg(long, default_value = "buf")]
        out_prefix: String,
    },
}

#[derive(Args, Debug)]
struct FrameArgs {
    #[arg(value_enum, default_value_t = DemoScene::Showcase)]
    scene: DemoScene,
    #[arg(long)]
    style: Option<PathBuf>,
    #[arg(long, default_value_t = 512)]
    width: u32,
    #[arg(long, default_value_t = 512)]
    height: u32,
    #[arg(long, default_value_t = 1.0)]
    pixel_ratio: f32,
    #[arg(long, default_value_t = 1.0)]
    activity: f32,
}

#[derive(ValueEnum, Clone, Copy, Debug)]
enum ViewArg {
    Composite,
    Scene,
    Depth,
    Normal,
    SurfaceId,
    Outline,
}

impl From<ViewArg> for DebugView {
    fn from(v: ViewArg) -> Self {
        match v {
            ViewArg::Composite => DebugView::Composite,
            ViewArg::Scene => DebugView::SceneColor,
            ViewArg::Depth => DebugView::Depth,
            ViewArg::Normal => DebugView::Normal,
            ViewArg::SurfaceId => DebugView::SurfaceId,
            ViewArg::Outline => DebugView::OutlineOnly,
        }
    }
}

struct Prepared {
    scene: Scene,
    camera: Camera,
    compositor: OutlineCompositor,
}

fn prepare(args: &FrameArgs) -> Result<Prepared> {
    let style = match &args.style {
        Some(p) => style::load_from_path(p)?,
        None => Style::default(),
    };
    let (mut scene, camera) = args.scene.build();
    style.apply_material(&mut scene);
    let next_id = assign_surface_ids_with(&mut scene, 0, &style.segmentation)?;
    let mut compositor = OutlineCompositor::from_style(&style, args.width, args.height);
    compositor.set_pixel_ratio(args.pixel_ratio);
    compositor.set_activity(args.activity);
    compositor.update_max_surface_id(next_id);
    info!("scene {:?}: {} meshes, {} surfaces, style '{}'", args.scene, scene.mesh_count(), next_id, style.id);
    Ok(Prepared { scene, camera, compositor })
}

fn save_png(c: &OutlineCompositor, path: &str) -> Result<()> {
    let extent = c.extent();
    let img = image::RgbaImage::from_raw(extent.width, extent.height, c.output().to_rgba8())
        .ok_or_else(|| anyhow!("Failed to create image from raw"))?;
    img.save(path).with_context(|| format!("writing {}", path))?;
    Ok(())
}

fn main() -> Result<()> {
    env_logger::init();
    let cli = Cli::parse();
    match cli.cmd {
        Command::Inspect { path } => {
            let s = style::load_from_path(&path)?;
            let o = &s.outline;
            println!("Loaded style: {}", s.id);
            println!("  background: {:?}", s.background);
            println!("  material: base={:?}, normal_scale={:.2}", s.material.base_color, s.material.normal_scale);
            println!("  outline: color={:?}, width={:.1}px, intensity={:.2}", o.color, o.width_px, o.intensity);
            println!("  thresholds: depth={:.3}, crease={:.0}°, surface id={:.1}", o.depth_threshold, o.crease_angle_deg, o.surface_id_threshold);
            println!("  selection: {:?}, view: {:?}", o.selection_color, o.debug_view);
            match s.segmentation.crease_angle_deg {
                Some(a) => println!("  segmentation: split at {:.0}°, weld {:e}", a, s.segmentation.weld_tolerance),
                None => println!("  segmentation: connectivity only, weld {:e}", s.segmentation.weld_tolerance),
            }
        }
        Command::Segment { scene, crease } => {
            let opts = SegmentOptions { crease_angle_deg: crease, ..Default::default() };
            let (mut s, _) = scene.build();
            let mut next_id = 0;
            s.try_for_each_mesh_mut(|_, name, mesh| {
                let seg = compute_surface_ids_with(&mesh.geometry, next_id, &opts).map_err(|e| e.in_mesh(name))?;
                println!("{:<10} {:>6} triangles  {:>4} surfaces  ids {}..{}", name, mesh.geometry.triangle_count(), seg.surface_count, next_id, seg.next_id);
                next_id = seg.next_id;
                Ok::<_, GeometryError>(())
            })?;
            println!("total surfaces: {}", next_id);
        }
        Command::Render { frame, view, select, out } => {
            let Prepared { scene, camera, mut compositor } = prepare(&frame)?;
            let mut params = *compositor.params();
            if let Some(v) = view {
                params.debug_view = v.into();
            }
            if let Some(name) = select {
                let id = scene.find_by_name(&name).ok_or_else(|| anyhow!("no node named '{}'", name))?;
                compositor.set_selection(&[id]);
                params.selection_color.get_or_insert([1.0, 0.6, 0.1]);
            }
            compositor.set_params(params);
            compositor.render(&scene, &camera);
            let out = out.to_string_lossy().into_owned();
            save_png(&compositor, &out)?;
            let meta = FrameMeta::from_compositor(&compositor);
            let meta_path = format!("{}.json", out.trim_end_matches(".png"));
            std::fs::write(&meta_path, meta.to_json()?).with_context(|| format!("writing {}", meta_path))?;
            let extent = compositor.extent();
            println!("Wrote {}x{} image to {} ({} edge pixels)", extent.width, extent.height, out, meta.edge_pixels);
        }
        Command::Buffers { frame, out_prefix } => {
            let Prepared { scene, camera, mut compositor } = prepare(&frame)?;
            let base = *compositor.params();
            for (view, suffix) in [
                (DebugView::Depth, "depth"),
                (DebugView::Normal, "normal"),
                (DebugView::SurfaceId, "id"),
                (DebugView::OutlineOnly, "edges"),
            ] {
                compositor.set_params(OutlineParams { debug_view: view, ..base });
                compositor.render(&scene, &camera);
                let path = format!("{}-{}.png", out_prefix, suffix);
                save_png(&compositor, &path)?;
                println!("Wrote {}", path);
            }
        }
    }
    Ok(())
}
