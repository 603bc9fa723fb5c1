//! CPU render targets: one typed value per pixel, row-major, top row first.

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Extent {
    pub width: u32,
    pub height: u32,
}

impl Extent {
    /// Zero dimensions are clamped to 1 so targets are never empty.
    pub fn new(width: u32, height: u32) -> Self {
        Self { width: width.max(1), height: height.max(1) }
    }

    pub fn pixel_count(&self) -> usize { self.width as usize * self.height as usize }

    pub fn aspect(&self) -> f32 { self.width as f32 / self.height as f32 }
}

#[derive(Debug, Clone, PartialEq)]
pub struct RenderTarget<T> {
    extent: Extent,
    data: Vec<T>,
}

pub type ColorTarget = RenderTarget<[f32; 4]>;

impl<T: Copy> RenderTarget<T> {
    pub fn new(extent: Extent, clear: T) -> Self {
        Self { extent, data: vec![clear; extent.pixel_count()] }
    }

    /// Reallocate at `extent`; every pixel is reset to `clear`.
    pub fn resize(&mut self, extent: Extent, clear: T) {
        self.extent = extent;
        self.data.clear();
        self.data.resize(extent.pixel_count(), clear);
    }

    pub fn clear(&mut self, value: T) { self.data.fill(value); }

    pub fn extent(&self) -> Extent { self.extent }
    pub fn width(&self) -> u32 { self.extent.width }
    pub fn height(&self) -> u32 { self.extent.height }

    fn index(&self, x: u32, y: u32) -> usize { y as usize * self.extent.width as usize + x as usize }

    pub fn get(&self, x: u32, y: u32) -> T { self.data[self.index(x, y)] }

    /// Signed lookup for neighbourhood sampling; `None` outside the target.
    pub fn sample(&self, x: i64, y: i64) -> Option<T> {
        if x < 0 || y < 0 || x >= self.extent.width as i64 || y >= self.extent.height as i64 {
            return None;
        }
        Some(self.get(x as u32, y as u32))
    }

    pub fn set(&mut self, x: u32, y: u32, value: T) {
        let i = self.index(x, y);
        self.data[i] = value;
    }

    pub fn pixels(&self) -> &[T] { &self.data }
    pub fn pixels_mut(&mut self) -> &mut [T] { &mut self.data }
}

impl ColorTarget {
    /// Tightly packed RGBA8, ready for PNG encoding.
    pub fn to_rgba8(&self) -> Vec<u8> {
        let px: Vec<[u8; 4]> = self
            .data
            .iter()
            .map(|c| c.map(|v| (v.clamp(0.0, 1.0) * 255.0).round() as u8))
            .collect();
        bytemuck::cast_slice::<[u8; 4], u8>(&px).to_vec()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn resize_reallocates_and_clears() {
        let mut t = RenderTarget::new(Extent::new(4, 3), 0u8);
        t.set(3, 2, 9);
        assert_eq!(t.get(3, 2), 9);
        t.resize(Extent::new(2, 5), 1);
        assert_eq!((t.width(), t.height()), (2, 5));
        assert!(t.pixels().iter().all(|&v| v == 1));
    }

    #[test]
    fn zero_extent_clamps() {
        let e = Extent::new(0, 0);
        assert_eq!((e.width, e.height), (1, 1));
    }

    #[test]
    fn sample_rejects_out_of_bounds() {
        let t = RenderTarget::new(Extent::new(2, 2), 1.0f32);
        assert_eq!(t.sample(-1, 0), None);
        assert_eq!(t.sample(1, 2), None);
        assert_eq!(t.sample(1, 1), Some(1.0));
    }

    #[test]
    fn rgba8_packs_in_row_order() {
        let mut t = ColorTarget::new(Extent::new(2, 1), [0.0, 0.0, 0.0, 1.0]);
        t.set(1, 0, [1.0, 0.5, 2.0, 1.0]);
        assert_eq!(t.to_rgba8(), vec![0, 0, 0, 255, 255, 128, 255, 255]);
    }
}
