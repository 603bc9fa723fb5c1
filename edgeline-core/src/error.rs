use thiserror::Error;

/// Geometry that cannot be segmented. Fatal for the mesh it was raised on.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum GeometryError {
    #[error("geometry has no position data")] MissingPositions,
    #[error("geometry has no index data")] MissingIndices,
    #[error("index count {0} is not a multiple of 3")] RaggedIndices(usize),
    #[error("index {index} out of range for {vertex_count} vertices")]
    IndexOutOfRange { index: u32, vertex_count: usize },
    #[error("surface id {0} does not fit the 24-bit id encoding")] IdOverflow(u32),
    #[error("mesh '{name}': {source}")]
    InMesh { name: String, #[source] source: Box<GeometryError> },
}

impl GeometryError {
    pub fn in_mesh(self, name: &str) -> Self {
        GeometryError::InMesh { name: name.to_string(), source: Box::new(self) }
    }
}
