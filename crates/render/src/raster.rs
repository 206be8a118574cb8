//! RGBA raster buffers
//!
//! A `Raster` is used both as an off-screen scratch buffer that a painter
//! draws into and as the persistent surface an item is displayed from.

/// Bytes per pixel (RGBA8)
pub const BYTES_PER_PIXEL: usize = 4;

/// An RGBA8 pixel buffer
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Raster {
    width: u32,
    height: u32,
    pixels: Vec<u8>,
}

impl Raster {
    /// Create a zeroed raster
    pub fn new(width: u32, height: u32) -> Self {
        Self { width, height, pixels: vec![0; Self::byte_len_for(width, height)] }
    }

    fn byte_len_for(width: u32, height: u32) -> usize {
        width as usize * height as usize * BYTES_PER_PIXEL
    }

    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }

    pub fn pixels(&self) -> &[u8] {
        &self.pixels
    }

    pub fn pixels_mut(&mut self) -> &mut [u8] {
        &mut self.pixels
    }

    /// Size of the pixel data in bytes
    pub fn byte_len(&self) -> usize {
        self.pixels.len()
    }

    /// Bytes reserved by the backing allocation
    pub fn capacity_bytes(&self) -> usize {
        self.pixels.capacity()
    }

    /// Resize to `width` x `height` reusing the existing allocation.
    ///
    /// Contents are cleared to transparent black. The backing vector only
    /// grows when the new size exceeds its capacity; shrinking never frees.
    pub fn resize_in_place(&mut self, width: u32, height: u32) {
        let len = Self::byte_len_for(width, height);
        self.pixels.clear();
        self.pixels.resize(len, 0);
        self.width = width;
        self.height = height;
    }

    /// Fill every pixel with a single RGBA value
    pub fn fill(&mut self, rgba: [u8; 4]) {
        for px in self.pixels.chunks_exact_mut(BYTES_PER_PIXEL) {
            px.copy_from_slice(&rgba);
        }
    }

    /// Read a pixel, `None` when out of bounds
    pub fn pixel(&self, x: u32, y: u32) -> Option<[u8; 4]> {
        if x >= self.width || y >= self.height {
            return None;
        }
        let offset = (y as usize * self.width as usize + x as usize) * BYTES_PER_PIXEL;
        let mut out = [0u8; 4];
        out.copy_from_slice(&self.pixels[offset..offset + BYTES_PER_PIXEL]);
        Some(out)
    }

    /// Replace this raster's contents with `source` in one copy
    pub fn copy_from(&mut self, source: &Raster) {
        if self.width != source.width || self.height != source.height {
            self.resize_in_place(source.width, source.height);
        }
        self.pixels.copy_from_slice(&source.pixels);
    }
}
