//! Surface id <-> color packing.
//!
//! The vertex attribute stores the raw id split over three 8-bit normalized
//! channels, so it is exact regardless of how many ids the scene holds. The
//! compositor's id target instead stores `(id + 1) / n`, where `n` is the
//! maximum surface id it was told about; 0 means "no id".

pub const MAX_ENCODABLE_ID: u32 = 0x00ff_ffff;

pub fn encode_surface_id(id: u32) -> [f32; 4] {
    let id = id.min(MAX_ENCODABLE_ID);
    [
        (id & 0xff) as f32 / 255.0,
        ((id >> 8) & 0xff) as f32 / 255.0,
        ((id >> 16) & 0xff) as f32 / 255.0,
        1.0,
    ]
}

/// `None` for colors that were not produced by [`encode_surface_id`].
pub fn decode_surface_id(color: [f32; 4]) -> Option<u32> {
    if !color.iter().all(|c| c.is_finite()) || color[3] < 0.5 {
        return None;
    }
    let mut id = 0u32;
    for (shift, c) in [0u32, 8, 16].into_iter().zip(&color[..3]) {
        let byte = (c * 255.0).round();
        if !(0.0..=255.0).contains(&byte) { return None; }
        id |= (byte as u32) << shift;
    }
    Some(id)
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct IdNormalizer {
    max_surface_id: u32,
}

impl Default for IdNormalizer {
    fn default() -> Self { Self::new(1) }
}

impl IdNormalizer {
    pub fn new(max_surface_id: u32) -> Self { Self { max_surface_id: max_surface_id.max(1) } }

    pub fn max_surface_id(&self) -> u32 { self.max_surface_id }

    /// Ids at or beyond the maximum saturate to 1.0 and alias with each other.
    pub fn normalize(&self, id: u32) -> f32 {
        ((id as f64 + 1.0) / self.max_surface_id as f64).min(1.0) as f32
    }

    pub fn denormalize(&self, value: f32) -> Option<u32> {
        if !value.is_finite() || value <= 0.0 { return None; }
        let scaled = (value as f64 * self.max_surface_id as f64).round();
        if scaled < 1.0 { return None; }
        Some(scaled as u32 - 1)
    }
}
