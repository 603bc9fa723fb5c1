//! Outline pipeline: G-buffer -> edge detection -> composite.

pub mod compositor;
pub mod gbuffer;
pub mod outline;
pub mod shading;
pub mod target;

pub use compositor::{OutlineCompositor, Viewport};
pub use outline::{DebugView, OutlineParams};
pub use target::{ColorTarget, Extent, RenderTarget};
