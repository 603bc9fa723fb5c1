pub mod error;
pub mod export;
pub mod render;
pub mod scene;
pub mod style;
pub mod surface;

pub use error::GeometryError;

pub const VERSION: &str = env!("CARGO_PKG_VERSION");
